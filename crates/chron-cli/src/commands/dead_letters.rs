use std::path::Path;

use chron_config::ChronicleConfig;
use chron_pipeline::dead_letter::{journal_days, read_day};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::DeadLetterArgs;
use crate::output::output;

/// Handle `chronicle dead-letters`: one day's letters, or the days on file.
pub fn handle(
    args: &DeadLetterArgs,
    config: &ChronicleConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let dir = Path::new(&config.pipeline.dead_letter_dir);
    match args.day {
        Some(day) => {
            let mut letters = read_day(dir, day)?;
            if let Some(limit) = flags.limit {
                letters.truncate(usize::try_from(limit)?);
            }
            output(&letters, flags.format)
        }
        None => {
            let days = journal_days(dir)?
                .into_iter()
                .map(|day| day.format("%Y-%m-%d").to_string())
                .collect::<Vec<_>>();
            output(&days, flags.format)
        }
    }
}

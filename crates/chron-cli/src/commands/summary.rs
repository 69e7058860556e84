use chron_config::ChronicleConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::SummaryCommands;
use crate::output::output;

/// Handle `chronicle summary`.
pub async fn handle(
    action: &SummaryCommands,
    config: &ChronicleConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let store = bootstrap::open_audit(config).await?;
    match action {
        SummaryCommands::Groups => output(&store.group_summaries(flags.limit).await?, flags.format),
        SummaryCommands::Tasks { group } => output(
            &store.task_summaries(group.as_deref(), flags.limit).await?,
            flags.format,
        ),
    }
}

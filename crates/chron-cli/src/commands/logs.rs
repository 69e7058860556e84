use chron_config::ChronicleConfig;

use crate::bootstrap;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::LogsCommands;
use crate::output::output;

/// Handle `chronicle logs`.
pub async fn handle(
    action: &LogsCommands,
    config: &ChronicleConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let store = bootstrap::open_audit(config).await?;
    let records = match action {
        LogsCommands::Group { id } => store.query_by_group(id, flags.limit).await?,
        LogsCommands::Task { id } => store.query_by_task(id, flags.limit).await?,
        LogsCommands::Recent => store.recent(flags.limit).await?,
    };
    output(&records, flags.format)
}

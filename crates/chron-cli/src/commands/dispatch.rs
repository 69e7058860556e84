use chron_config::ChronicleConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: &ChronicleConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Run => commands::pipeline::run_all(config).await,
        Commands::Ingest => commands::pipeline::run_ingest(config).await,
        Commands::Export => commands::pipeline::run_export(config).await,
        Commands::Logs { action } => commands::logs::handle(&action, config, flags).await,
        Commands::Summary { action } => commands::summary::handle(&action, config, flags).await,
        Commands::Snapshots { action } => commands::snapshots::handle(&action, config, flags).await,
        Commands::DeadLetters(args) => commands::dead_letters::handle(&args, config, flags),
    }
}

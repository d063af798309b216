use anyhow::Result;
use tracing::{info, error};

use focused_crawler::cli;
use focused_crawler::utils::{default_log_file, init_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = cli::parse_args();

    let log_file = args.log_file.clone().or_else(|| args.save_log.then(default_log_file));
    init_logging(args.verbose, log_file.as_deref())?;

    info!("Starting Focused Crawler v{}", env!("CARGO_PKG_VERSION"));

    match cli::process_command(args).await {
        Ok(_) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            Err(e)
        }
    }
}

use std::process::ExitCode;

use artworks_report::cli::{run, Cli};
use artworks_report::logging;
use artworks_report_core::error::PipelineError;
use clap::Parser;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment
    dotenvy::dotenv().ok();

    logging::init(logging::DEFAULT_LOG_LEVEL);
    tracing::info!("CLI application startup: tracing initialised, environment loaded");

    // Usage errors exit with 1 so that 2 always means a config-stage failure.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };
    tracing::info!("CLI arguments parsed, invoking run");
    match run(cli).await {
        Ok(()) => {
            tracing::info!("CLI completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            let code = e
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1);
            tracing::error!(error = %e, code, "CLI exited with error");
            eprintln!("{e}");
            ExitCode::from(code as u8)
        }
    }
}

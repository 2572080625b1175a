//! # artworks-report CLI Interface
//!
//! Argument parsing and wiring of the production collaborators. Everything
//! that touches the search API, templates, the PDF engine or SMTP lives in
//! `artworks-report-core`; this module only builds those pieces, hands them
//! to the pipeline and prints the outcome.
//!
//! For programmatic or test use call [`run`] with a constructed [`Cli`].

use std::path::PathBuf;

use anyhow::Result;
use artworks_report_core::config::RunContext;
use artworks_report_core::convert::{DocumentConverter, WkhtmltopdfEngine};
use artworks_report_core::error::PipelineError;
use artworks_report_core::notify::{Notifier, SmtpMailer, SmtpSettings, DEFAULT_SMTP_TIMEOUT};
use artworks_report_core::pipeline::{Delivery, Pipeline, RunReport};
use artworks_report_core::query::{
    ArtworkQueryClient, ReqwestFetcher, DEFAULT_QUERY_TIMEOUT, DEFAULT_SEARCH_URL,
};
use artworks_report_core::render::{ReportRenderer, DEFAULT_TEMPLATE};
use clap::{Parser, Subcommand};

/// CLI for artworks-report: search the artworks API and mail the result as a PDF.
#[derive(Parser, Debug)]
#[clap(
    name = "artworks-report",
    version,
    about = "Build a PDF report from an artworks search and email it to the report's recipients",
    after_help = "Exit codes: 0 success, 1 usage or other error, 2 config, 3 query, 4 render, 5 convert, 6 notify"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the first report defined in the given config file
    Run {
        /// Path to the YAML report definition
        #[clap(long)]
        config: PathBuf,

        /// Directory that receives query.json, report.html and report.pdf
        #[clap(long)]
        out: PathBuf,

        /// Produce every artifact but do not send email
        #[clap(long)]
        dry_run: bool,

        /// Artwork search endpoint
        #[clap(long, env = "ARTWORKS_API_URL", default_value = DEFAULT_SEARCH_URL)]
        api_url: String,

        /// Directory holding a custom `report.html` template
        #[clap(long)]
        templates: Option<PathBuf>,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Run {
            config,
            out,
            dry_run,
            api_url,
            templates,
        } => {
            tracing::info!(command = "run", config = %config.display(), dry_run, "Starting report run");

            let fetcher = ReqwestFetcher::new(DEFAULT_QUERY_TIMEOUT).map_err(PipelineError::from)?;
            let query = ArtworkQueryClient::with_base_url(fetcher, api_url);
            let renderer = match templates {
                Some(dir) => ReportRenderer::from_dir(dir, DEFAULT_TEMPLATE),
                None => ReportRenderer::builtin().map_err(PipelineError::from)?,
            };
            let converter = DocumentConverter::new(WkhtmltopdfEngine::from_env());
            let notifier = if dry_run { None } else { smtp_notifier() };

            let pipeline = Pipeline::new(query, renderer, converter, notifier);
            let ctx = RunContext::new(out, dry_run);
            let outcome = pipeline.run_recorded(&config, &ctx).await;
            let states: Vec<String> = outcome.states.iter().map(ToString::to_string).collect();
            tracing::debug!(command = "run", states = %states.join(" -> "), "Run state history");
            match outcome.result {
                Ok(report) => {
                    tracing::info!(command = "run", run_id = %report.run_id, "Report run complete");
                    print_summary(&report);
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(command = "run", error = %e, "Report run failed");
                    Err(e.into())
                }
            }
        }
    }
}

/// Builds the SMTP notifier from the environment.
///
/// Returns `None` when the settings are unusable; the pipeline then reports
/// the notifier as not configured once the report definition has been
/// validated.
fn smtp_notifier() -> Option<Notifier<SmtpMailer>> {
    let settings = match SmtpSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "SMTP settings unavailable, email delivery disabled");
            return None;
        }
    };
    match SmtpMailer::new(&settings, DEFAULT_SMTP_TIMEOUT) {
        Ok(mailer) => Some(Notifier::new(mailer, settings.from)),
        Err(e) => {
            tracing::error!(error = %e, host = %settings.host, "Could not build SMTP transport");
            None
        }
    }
}

fn print_summary(report: &RunReport) {
    println!("Report:   {}", report.report_name);
    println!("Run id:   {}", report.run_id);
    println!(
        "Records:  {} (of {} received)",
        report.record_count, report.total_received
    );
    println!("Query:    {}", report.raw_response_path.display());
    println!("HTML:     {}", report.rendered.html_path.display());
    println!("PDF:      {}", report.rendered.pdf_path.display());
    match &report.delivery {
        Delivery::Notified { recipients } => println!("Emailed:  {}", recipients.join(", ")),
        Delivery::DryRunSkipped => println!("Emailed:  skipped (dry run)"),
    }
}

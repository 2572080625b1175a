//! High-level pipeline: orchestrates config → query → shape → render → convert → notify.
//!
//! # Major Types
//! - [`Pipeline`]: owns the collaborators for one run, built by the caller and injected
//! - [`RunState`]: states the run moves through; `Failed` is reachable from any of them
//! - [`RunReport`]: what a successful run produced and where it went
//! - [`RunOutcome`]: the result plus every state visited, including `Failed`
//!
//! # Responsibilities
//! - Fail-fast orchestration: the first failing stage stops the run and is
//!   returned as a stage-labelled [`PipelineError`]
//! - Artifacts written by earlier stages are left on disk for debugging
//! - Dry-run stops after the PDF exists and never touches the notifier
//!
//! # Callable From
//! - The CLI crate and integration tests, with real or mocked collaborators

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{ReportDefinition, RunContext};
use crate::contract::{Mailer, PdfEngine, SearchFetcher};
use crate::convert::DocumentConverter;
use crate::error::{ConfigError, NotifyError, PipelineError, Stage};
use crate::load_config::load_config;
use crate::notify::Notifier;
use crate::query::ArtworkQueryClient;
use crate::render::ReportRenderer;
use crate::shape::shape;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Init,
    ConfigLoaded,
    Queried,
    Shaped,
    Rendered,
    Converted,
    Notified,
    DryRunSkipped,
    Done,
    Failed { stage: Stage, cause: String },
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Init => f.write_str("init"),
            RunState::ConfigLoaded => f.write_str("config_loaded"),
            RunState::Queried => f.write_str("queried"),
            RunState::Shaped => f.write_str("shaped"),
            RunState::Rendered => f.write_str("rendered"),
            RunState::Converted => f.write_str("converted"),
            RunState::Notified => f.write_str("notified"),
            RunState::DryRunSkipped => f.write_str("dry_run_skipped"),
            RunState::Done => f.write_str("done"),
            RunState::Failed { stage, .. } => write!(f, "failed({stage})"),
        }
    }
}

/// Paths of the rendered documents for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Notified { recipients: Vec<String> },
    DryRunSkipped,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: Uuid,
    pub report_name: String,
    /// Records in the report after limiting.
    pub record_count: usize,
    /// Records the API returned before limiting.
    pub total_received: usize,
    pub raw_response_path: PathBuf,
    pub rendered: RenderedReport,
    pub delivery: Delivery,
    /// Every state visited, starting at `Init` and ending at `Done`.
    pub states: Vec<RunState>,
}

/// Result of a run together with every state it visited.
///
/// On failure the last state is [`RunState::Failed`].
#[derive(Debug)]
pub struct RunOutcome {
    pub states: Vec<RunState>,
    pub result: Result<RunReport, PipelineError>,
}

struct StateTracker {
    history: Vec<RunState>,
}

impl StateTracker {
    fn new() -> Self {
        Self {
            history: vec![RunState::Init],
        }
    }

    fn current(&self) -> &RunState {
        // history always starts with Init
        &self.history[self.history.len() - 1]
    }

    fn advance(&mut self, next: RunState) {
        info!(from = %self.current(), to = %next, "Pipeline state transition");
        self.history.push(next);
    }

    fn fail(&mut self, err: &PipelineError) {
        let failed = RunState::Failed {
            stage: err.stage(),
            cause: err.to_string(),
        };
        error!(from = %self.current(), stage = %err.stage(), error = %err, "Pipeline failed");
        self.history.push(failed);
    }
}

pub struct Pipeline<F, E, M> {
    query: ArtworkQueryClient<F>,
    renderer: ReportRenderer,
    converter: DocumentConverter<E>,
    notifier: Option<Notifier<M>>,
}

impl<F, E, M> Pipeline<F, E, M>
where
    F: SearchFetcher,
    E: PdfEngine,
    M: Mailer,
{
    /// `notifier` may be `None` for runs that are always dry-run.
    pub fn new(
        query: ArtworkQueryClient<F>,
        renderer: ReportRenderer,
        converter: DocumentConverter<E>,
        notifier: Option<Notifier<M>>,
    ) -> Self {
        Self {
            query,
            renderer,
            converter,
            notifier,
        }
    }

    /// Runs every stage for the report defined in `config_path`.
    pub async fn run(&self, config_path: &Path, ctx: &RunContext) -> Result<RunReport, PipelineError> {
        self.run_recorded(config_path, ctx).await.result
    }

    /// Like [`Pipeline::run`], but also returns the state history when the run fails.
    pub async fn run_recorded(&self, config_path: &Path, ctx: &RunContext) -> RunOutcome {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "report_run",
            %run_id,
            out = %ctx.output_directory.display(),
            dry_run = ctx.dry_run
        );
        let mut tracker = StateTracker::new();
        let result = self
            .execute(run_id, config_path, ctx, &mut tracker)
            .instrument(span)
            .await;
        if let Err(e) = &result {
            tracker.fail(e);
        }
        RunOutcome {
            states: tracker.history,
            result,
        }
    }

    async fn execute(
        &self,
        run_id: Uuid,
        config_path: &Path,
        ctx: &RunContext,
        tracker: &mut StateTracker,
    ) -> Result<RunReport, PipelineError> {
        info!("[RUN] Starting report pipeline");

        // --- Stage 1: config ---
        let definition = load_config(config_path)?;
        let notifier = self.delivery_preconditions(&definition, ctx)?;
        tracker.advance(RunState::ConfigLoaded);
        clear_stale_artifacts(ctx);

        // --- Stage 2: query ---
        let result = self
            .query
            .search(
                &definition.search,
                &definition.fields,
                definition.max_items,
                &ctx.output_directory,
            )
            .await?;
        tracker.advance(RunState::Queried);

        // --- Stage 3: shape ---
        let shaped = shape(&result.records, &definition.fields);
        tracker.advance(RunState::Shaped);

        // --- Stage 4: render ---
        let created_at = Utc::now();
        let html_path = self.renderer.render_to_file(
            &shaped,
            &definition.fields,
            &definition.name,
            created_at,
            &ctx.output_directory,
        )?;
        tracker.advance(RunState::Rendered);

        // --- Stage 5: convert ---
        let pdf_path = ctx.pdf_path();
        self.converter.convert(&html_path, &pdf_path).await?;
        tracker.advance(RunState::Converted);

        // --- Stage 6: deliver ---
        let delivery = match notifier {
            Some(notifier) => {
                notifier
                    .notify(
                        &definition.recipients,
                        &definition.name,
                        &definition.search,
                        &pdf_path,
                    )
                    .await?;
                tracker.advance(RunState::Notified);
                Delivery::Notified {
                    recipients: definition.recipients.clone(),
                }
            }
            None => {
                info!(report = %definition.name, "[RUN] Dry run, skipping email delivery");
                tracker.advance(RunState::DryRunSkipped);
                Delivery::DryRunSkipped
            }
        };
        tracker.advance(RunState::Done);

        info!(
            report = %definition.name,
            records = shaped.len(),
            pdf = %pdf_path.display(),
            "[RUN] Report pipeline complete"
        );

        Ok(RunReport {
            run_id,
            report_name: definition.name,
            record_count: shaped.len(),
            total_received: result.total_received,
            raw_response_path: result.raw_response_path,
            rendered: RenderedReport {
                html_path,
                pdf_path,
                created_at,
            },
            delivery,
            states: tracker.history.clone(),
        })
    }

    /// Returns the notifier to use, or `None` for a dry run.
    fn delivery_preconditions(
        &self,
        definition: &ReportDefinition,
        ctx: &RunContext,
    ) -> Result<Option<&Notifier<M>>, PipelineError> {
        if ctx.dry_run {
            return Ok(None);
        }
        if definition.recipients.is_empty() {
            return Err(ConfigError::NoRecipients.into());
        }
        match &self.notifier {
            Some(notifier) => Ok(Some(notifier)),
            None => Err(NotifyError::NotConfigured.into()),
        }
    }
}

/// Removes artifacts left by an earlier run in the same directory, so every
/// file present after a failure was written by this run.
fn clear_stale_artifacts(ctx: &RunContext) {
    for path in [ctx.query_path(), ctx.html_path(), ctx.pdf_path()] {
        if path.is_file() {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "Removed artifact from previous run"),
                Err(e) => warn!(error = ?e, path = %path.display(), "Could not remove artifact from previous run"),
            }
        }
    }
}

//! Pipeline Orchestrator.
//!
//! `generate` runs aggregate -> render -> rasterize strictly in order; any
//! error stops the sequence, is logged once with its stage and user, and is
//! handed back typed. Translating it into a public message is left to
//! `PipelineError::public_message`.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::cv::{GENERIC_FAILURE, PDF_CONTENT_TYPE};
use crate::engine::{DocumentEngine, EngineError};
use crate::profile::{AggregateError, ProfileAggregator, ProjectSelection, RenderContext};
use crate::render::{CvRenderer, TemplateError};

/// A finished CV, ready to be sent as an attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: &'static str,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The generation task panicked or was torn down by the runtime.
    #[error("generation task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Aggregate(_) => "aggregate",
            PipelineError::Template(_) => "render",
            PipelineError::Engine(_) => "rasterize",
            PipelineError::Task(_) => "task",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            PipelineError::Aggregate(AggregateError::ProfileNotFound(_))
        )
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self, PipelineError::Engine(EngineError::Overloaded { .. }))
    }

    /// What may be shown to the caller. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        if self.is_not_found() {
            "Profile not found"
        } else {
            GENERIC_FAILURE
        }
    }
}

pub struct CvPipeline {
    aggregator: ProfileAggregator,
    renderer: Arc<CvRenderer>,
    engine: DocumentEngine,
    default_projects: ProjectSelection,
}

impl CvPipeline {
    pub fn new(
        aggregator: ProfileAggregator,
        renderer: CvRenderer,
        engine: DocumentEngine,
        default_projects: ProjectSelection,
    ) -> Self {
        Self {
            aggregator,
            renderer: Arc::new(renderer),
            engine,
            default_projects,
        }
    }

    pub fn engine(&self) -> &DocumentEngine {
        &self.engine
    }

    /// The context the CV would be rendered from, without rasterizing.
    pub async fn preview(
        &self,
        user_id: Uuid,
        projects: Option<ProjectSelection>,
    ) -> Result<RenderContext, PipelineError> {
        self.aggregator
            .aggregate(user_id, projects.unwrap_or(self.default_projects))
            .await
            .map_err(|e| {
                let err = PipelineError::from(e);
                log_failure(user_id, &err);
                err
            })
    }

    /// Runs the generation on its own task. Dropping the returned future
    /// cancels the task, which still closes its engine process.
    pub async fn generate_cv(
        self: &Arc<Self>,
        user_id: Uuid,
        projects: Option<ProjectSelection>,
    ) -> Result<GeneratedDocument, PipelineError> {
        let cancel = CancellationToken::new();
        let guard = cancel.clone().drop_guard();

        let pipeline = Arc::clone(self);
        let task =
            tokio::spawn(async move { pipeline.generate(user_id, projects, &cancel).await });

        let joined = task.await;
        guard.disarm();

        joined.unwrap_or_else(|e| {
            let err = PipelineError::Task(e.to_string());
            log_failure(user_id, &err);
            Err(err)
        })
    }

    pub async fn generate(
        &self,
        user_id: Uuid,
        projects: Option<ProjectSelection>,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, PipelineError> {
        let started = Instant::now();
        let result = self.run(user_id, projects, cancel).await;

        match &result {
            Ok(doc) => info!(
                user_id = %user_id,
                bytes = doc.bytes.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "CV generated"
            ),
            Err(err) => log_failure(user_id, err),
        }
        result
    }

    async fn run(
        &self,
        user_id: Uuid,
        projects: Option<ProjectSelection>,
        cancel: &CancellationToken,
    ) -> Result<GeneratedDocument, PipelineError> {
        let context = self
            .aggregator
            .aggregate(user_id, projects.unwrap_or(self.default_projects))
            .await?;
        let filename = cv_filename(&context.profile.name);

        let renderer = Arc::clone(&self.renderer);
        let html = tokio::task::spawn_blocking(move || renderer.render(&context))
            .await
            .map_err(|e| PipelineError::Task(format!("render task failed: {e}")))??;

        let bytes = self.engine.rasterize(&html, cancel).await?;

        Ok(GeneratedDocument {
            bytes,
            filename,
            content_type: PDF_CONTENT_TYPE,
        })
    }
}

fn log_failure(user_id: Uuid, err: &PipelineError) {
    match err {
        PipelineError::Engine(engine_err) => error!(
            user_id = %user_id,
            stage = err.stage(),
            kind = engine_err.kind(),
            retryable = engine_err.is_retryable(),
            "CV generation failed: {err}"
        ),
        _ => error!(
            user_id = %user_id,
            stage = err.stage(),
            "CV generation failed: {err}"
        ),
    }
}

/// `"Ada Lovelace"` -> `"ada-lovelace-cv.pdf"`, `"José García"` -> `"josé-garcía-cv.pdf"`.
///
/// Whitespace runs become one hyphen and letters are lower-cased in any
/// script. Quotes, slashes, control characters and other punctuation are
/// dropped.
pub fn cv_filename(display_name: &str) -> String {
    let slug = display_name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    let slug = slug.trim_matches(|c| c == '.' || c == '-');

    if slug.is_empty() {
        "cv.pdf".to_string()
    } else {
        format!("{slug}-cv.pdf")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Test wiring
// ────────────────────────────────────────────────────────────────────────────


// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

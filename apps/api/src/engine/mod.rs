//! Document Engine: HTML in, PDF bytes out, via an isolated headless browser.
//!
//! The engine is split along the browser's own lifecycle so every resource has
//! exactly one owner:
//! - `EngineLauncher` starts one process per rasterization
//! - `EngineProcess` owns the process and opens pages
//! - `EnginePage` owns one page/context
//!
//! `close` / `shutdown` take `self: Box<Self>`, so a handle cannot be closed twice.
//! `DocumentEngine` (controller.rs) drives them and guarantees teardown.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod chromium;
pub mod controller;
pub mod limiter;
#[cfg(test)]
pub mod mock;
pub mod options;

pub use chromium::ChromiumLauncher;
pub use controller::DocumentEngine;
pub use limiter::EngineLimiter;
pub use options::{Margins, PageFormat, RenderOptions};

// ────────────────────────────────────────────────────────────────────────────
// Lifecycle traits
// ────────────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait EngineLauncher: Send + Sync {
    async fn launch(&self, options: &RenderOptions) -> anyhow::Result<Box<dyn EngineProcess>>;
}

#[async_trait]
pub trait EngineProcess: Send {
    async fn open_page(&mut self) -> anyhow::Result<Box<dyn EnginePage>>;

    /// Terminates the process and releases everything it holds.
    async fn shutdown(self: Box<Self>) -> anyhow::Result<()>;
}

#[async_trait]
pub trait EnginePage: Send {
    async fn load_html(&mut self, html: &str) -> anyhow::Result<()>;

    /// Resolves once the document, its fonts and its images have finished loading.
    async fn wait_until_idle(&mut self) -> anyhow::Result<()>;

    async fn print_pdf(&mut self, options: &RenderOptions) -> anyhow::Result<Vec<u8>>;

    async fn close(self: Box<Self>) -> anyhow::Result<()>;
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

/// The step of a rasterization an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Queue,
    Launch,
    OpenPage,
    LoadContent,
    Print,
    Capture,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Queue => "queue",
            Stage::Launch => "launch",
            Stage::OpenPage => "open_page",
            Stage::LoadContent => "load_content",
            Stage::Print => "print",
            Stage::Capture => "capture",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not start. Usually an environment problem worth alerting on.
    #[error("engine process failed to launch: {0}")]
    Launch(String),

    #[error("content load failed at {stage}: {detail}")]
    ContentLoad { stage: Stage, detail: String },

    /// Retryable by the caller; never retried here.
    #[error("{stage} step exceeded {}ms", .after.as_millis())]
    Timeout { stage: Stage, after: Duration },

    #[error("rasterization produced no usable output at {stage}: {detail}")]
    Rasterization { stage: Stage, detail: String },

    #[error("all {bound} engine slots are busy")]
    Overloaded { bound: usize },

    #[error("rasterization cancelled during {stage}")]
    Cancelled { stage: Stage },
}

impl EngineError {
    /// Classifies a backend failure by the step it happened in.
    pub fn at(stage: Stage, err: anyhow::Error) -> Self {
        let detail = format!("{err:#}");
        match stage {
            Stage::Launch => EngineError::Launch(detail),
            Stage::Queue | Stage::OpenPage | Stage::LoadContent => {
                EngineError::ContentLoad { stage, detail }
            }
            Stage::Print | Stage::Capture => EngineError::Rasterization { stage, detail },
        }
    }

    /// Short machine-readable name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Launch(_) => "launch_failure",
            EngineError::ContentLoad { .. } => "content_load_failure",
            EngineError::Timeout { .. } => "rasterization_timeout",
            EngineError::Rasterization { .. } => "rasterization_failure",
            EngineError::Overloaded { .. } => "overloaded",
            EngineError::Cancelled { .. } => "cancelled",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Timeout { .. } | EngineError::Overloaded { .. }
        )
    }
}

//! Document Engine Controller.
//!
//! One rasterization = one slot from the limiter + one freshly launched
//! process + one page. The scope functions below each acquire one resource,
//! run the inner scope, then release it whatever the inner result was:
//!
//! ```text
//! rasterize      -> limiter permit
//!   in_process   -> launch ... shutdown
//!     in_page    -> open_page ... close
//!       drive    -> load_html, wait_until_idle, print_pdf, validate
//! ```
//!
//! The first error wins. Release failures are logged at warn and dropped.
//! Every step races its timeout and the caller's cancellation token; if the
//! whole future is dropped instead, the backend's own Drop kills the process.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::bail;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::engine::limiter::EngineLimiter;
use crate::engine::{EngineError, EngineLauncher, EnginePage, EngineProcess, RenderOptions, Stage};

/// Upper bound on each release step. A release that hangs longer is abandoned
/// and the backend's Drop takes over.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(5);

/// How far from the end of the file the `%%EOF` marker may sit.
const EOF_SEARCH_WINDOW: usize = 1024;

#[derive(Clone)]
pub struct DocumentEngine {
    launcher: Arc<dyn EngineLauncher>,
    limiter: EngineLimiter,
    options: RenderOptions,
}

impl DocumentEngine {
    pub fn new(
        launcher: Arc<dyn EngineLauncher>,
        limiter: EngineLimiter,
        options: RenderOptions,
    ) -> Self {
        Self {
            launcher,
            limiter,
            options,
        }
    }

    pub fn limiter(&self) -> &EngineLimiter {
        &self.limiter
    }

    /// Renders `html` to PDF bytes. Never returns partial output.
    pub async fn rasterize(
        &self,
        html: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EngineError> {
        let _permit = self.limiter.acquire(cancel).await?;
        let started = Instant::now();

        let pdf = self.in_process(html, cancel).await?;

        info!(
            "Rasterized {} bytes of HTML to {} bytes of PDF in {}ms",
            html.len(),
            pdf.len(),
            started.elapsed().as_millis()
        );
        Ok(pdf)
    }

    async fn in_process(
        &self,
        html: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EngineError> {
        let mut process = self
            .step(
                Stage::Launch,
                self.options.launch_timeout,
                cancel,
                self.launcher.launch(&self.options),
            )
            .await?;
        debug!("Engine process launched");

        let outcome = self.in_page(process.as_mut(), html, cancel).await;

        match tokio::time::timeout(CLEANUP_TIMEOUT, process.shutdown()).await {
            Ok(Ok(())) => debug!("Engine process shut down"),
            Ok(Err(e)) => warn!("Engine process shutdown failed: {e:#}"),
            Err(_) => warn!(
                "Engine process shutdown exceeded {}ms, leaving it to drop",
                CLEANUP_TIMEOUT.as_millis()
            ),
        }

        outcome
    }

    async fn in_page(
        &self,
        process: &mut dyn EngineProcess,
        html: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EngineError> {
        let mut page = self
            .step(
                Stage::OpenPage,
                self.options.navigation_timeout,
                cancel,
                process.open_page(),
            )
            .await?;

        let outcome = self.drive(page.as_mut(), html, cancel).await;

        match tokio::time::timeout(CLEANUP_TIMEOUT, page.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Page close failed: {e:#}"),
            Err(_) => warn!("Page close exceeded {}ms", CLEANUP_TIMEOUT.as_millis()),
        }

        outcome
    }

    async fn drive(
        &self,
        page: &mut dyn EnginePage,
        html: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, EngineError> {
        self.step(
            Stage::LoadContent,
            self.options.navigation_timeout,
            cancel,
            async {
                page.load_html(html).await?;
                page.wait_until_idle().await
            },
        )
        .await?;

        let pdf = self
            .step(
                Stage::Print,
                self.options.render_timeout,
                cancel,
                page.print_pdf(&self.options),
            )
            .await?;

        validate_pdf(&pdf).map_err(|e| EngineError::at(Stage::Capture, e))?;
        Ok(pdf)
    }

    /// Runs one fallible step under its timeout and the cancellation token.
    async fn step<T, F>(
        &self,
        stage: Stage,
        limit: Duration,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<T, EngineError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Rasterization cancelled during {stage}");
                Err(EngineError::Cancelled { stage })
            }
            result = tokio::time::timeout(limit, fut) => match result {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => Err(EngineError::at(stage, e)),
                Err(_) => Err(EngineError::Timeout { stage, after: limit }),
            },
        }
    }
}

/// A usable PDF starts with the `%PDF` signature and carries an `%%EOF` marker
/// near its end; anything else is truncated or not a PDF at all.
fn validate_pdf(bytes: &[u8]) -> anyhow::Result<()> {
    if bytes.is_empty() {
        bail!("engine returned an empty document");
    }
    if !bytes.starts_with(b"%PDF") {
        bail!("output does not start with the %PDF signature");
    }
    let tail = &bytes[bytes.len().saturating_sub(EOF_SEARCH_WINDOW)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        bail!("output has no %%EOF marker, document looks truncated");
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

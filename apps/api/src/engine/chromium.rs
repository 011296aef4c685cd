//! Headless Chromium backend over the DevTools protocol (chromiumoxide).
//!
//! Every launch gets its own throwaway profile directory, so no cookies,
//! cache or storage survive from one rasterization to the next.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::engine::{EngineLauncher, EnginePage, EngineProcess, Margins, RenderOptions};

/// Flags for stable text and colour output in print.
const BROWSER_ARGS: &[&str] = &[
    "--disable-gpu",
    "--disable-dev-shm-usage",
    "--font-render-hinting=medium",
    "--force-color-profile=srgb",
    "--hide-scrollbars",
    "--mute-audio",
];

/// Resolves when the document, its web fonts and every image have settled.
const IDLE_SCRIPT: &str = r#"
(async () => {
  if (document.readyState !== "complete") {
    await new Promise((resolve) => window.addEventListener("load", resolve, { once: true }));
  }
  if (document.fonts && document.fonts.ready) {
    await document.fonts.ready;
  }
  await Promise.all(
    Array.from(document.images)
      .filter((img) => !img.complete)
      .map((img) => new Promise((resolve) => {
        img.addEventListener("load", resolve, { once: true });
        img.addEventListener("error", resolve, { once: true });
      }))
  );
  return true;
})()
"#;

#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    /// Falls back to chromiumoxide's own lookup when unset.
    executable: Option<PathBuf>,
    /// Needed when running as root inside a container.
    no_sandbox: bool,
}

impl ChromiumLauncher {
    pub fn new(executable: Option<PathBuf>, no_sandbox: bool) -> Self {
        Self {
            executable,
            no_sandbox,
        }
    }

    fn config(&self, options: &RenderOptions, profile_dir: &TempDir) -> Result<BrowserConfig> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(profile_dir.path())
            .window_size(options.viewport.width, options.viewport.height)
            .viewport(Viewport {
                width: options.viewport.width,
                height: options.viewport.height,
                ..Viewport::default()
            })
            .launch_timeout(options.launch_timeout)
            .request_timeout(options.render_timeout.max(options.navigation_timeout));

        for arg in BROWSER_ARGS {
            builder = builder.arg(*arg);
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }

        builder
            .build()
            .map_err(|e| anyhow!("invalid browser config: {e}"))
    }
}

#[async_trait]
impl EngineLauncher for ChromiumLauncher {
    async fn launch(&self, options: &RenderOptions) -> Result<Box<dyn EngineProcess>> {
        let profile_dir = tempfile::Builder::new()
            .prefix("cv-engine-")
            .tempdir()
            .context("creating browser profile directory")?;
        let config = self.config(options, &profile_dir)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("starting headless chromium")?;

        // The handler drives the websocket; the browser is dead without it.
        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium event loop ended: {e}");
                    break;
                }
            }
        });

        debug!("Chromium launched with profile {}", profile_dir.path().display());
        Ok(Box::new(ChromiumProcess {
            browser,
            events,
            _profile_dir: profile_dir,
        }))
    }
}

struct ChromiumProcess {
    browser: Browser,
    events: JoinHandle<()>,
    // Removed from disk on drop, after the browser is gone.
    _profile_dir: TempDir,
}

#[async_trait]
impl EngineProcess for ChromiumProcess {
    async fn open_page(&mut self) -> Result<Box<dyn EnginePage>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("opening browser page")?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn shutdown(mut self: Box<Self>) -> Result<()> {
        let closed = self.browser.close().await;
        if let Err(e) = &closed {
            warn!("Graceful browser close failed, killing: {e}");
            if let Some(Err(kill_err)) = self.browser.kill().await {
                return Err(anyhow!("killing browser process: {kill_err}"));
            }
        }
        self.browser
            .wait()
            .await
            .context("waiting for browser process to exit")?;
        self.events.abort();
        closed.map(|_| ()).context("closing browser")
    }
}

impl Drop for ChromiumProcess {
    fn drop(&mut self) {
        self.events.abort();
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl EnginePage for ChromiumPage {
    async fn load_html(&mut self, html: &str) -> Result<()> {
        self.page
            .set_content(html)
            .await
            .context("setting page content")?;
        Ok(())
    }

    async fn wait_until_idle(&mut self) -> Result<()> {
        let params = EvaluateParams::builder()
            .expression(IDLE_SCRIPT)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| anyhow!("building idle probe: {e}"))?;
        self.page
            .evaluate_expression(params)
            .await
            .context("waiting for fonts and images")?;
        Ok(())
    }

    async fn print_pdf(&mut self, options: &RenderOptions) -> Result<Vec<u8>> {
        self.page
            .pdf(print_params(options))
            .await
            .context("printing to PDF")
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("closing page")
    }
}

fn print_params(options: &RenderOptions) -> PrintToPdfParams {
    let (width, height) = options.page_format.size_in();
    let Margins {
        top,
        right,
        bottom,
        left,
    } = options.margins;

    PrintToPdfParams {
        print_background: Some(options.print_background),
        prefer_css_page_size: Some(options.prefer_css_page_size),
        paper_width: Some(width),
        paper_height: Some(height),
        margin_top: Some(Margins::px_to_in(top)),
        margin_right: Some(Margins::px_to_in(right)),
        margin_bottom: Some(Margins::px_to_in(bottom)),
        margin_left: Some(Margins::px_to_in(left)),
        ..PrintToPdfParams::default()
    }
}

//! Scripted engine for tests: counts every lifecycle call and can be told to
//! fail or hang at any step.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{EngineLauncher, EnginePage, EngineProcess, RenderOptions};

pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\ntrailer << >>\n%%EOF\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub launch: bool,
    pub open_page: bool,
    pub load: bool,
    pub hang_on_load: bool,
    pub print: bool,
    pub empty_pdf: bool,
    pub garbage_pdf: bool,
    pub close_page: bool,
    pub shutdown: bool,
}

#[derive(Debug, Default)]
pub struct EngineSpy {
    pub launches: AtomicUsize,
    pub pages_opened: AtomicUsize,
    pub pages_closed: AtomicUsize,
    pub processes_closed: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub last_html: Mutex<Option<String>>,
}

impl EngineSpy {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
    pub fn pages_opened(&self) -> usize {
        self.pages_opened.load(Ordering::SeqCst)
    }
    pub fn pages_closed(&self) -> usize {
        self.pages_closed.load(Ordering::SeqCst)
    }
    pub fn processes_closed(&self) -> usize {
        self.processes_closed.load(Ordering::SeqCst)
    }
    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
    pub fn last_html(&self) -> Option<String> {
        self.last_html.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MockLauncher {
    pub spy: Arc<EngineSpy>,
    pub faults: Faults,
    /// Time spent "printing", so concurrent calls overlap.
    pub print_delay: Duration,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            faults,
            ..Self::default()
        }
    }
}

#[async_trait]
impl EngineLauncher for MockLauncher {
    async fn launch(&self, _options: &RenderOptions) -> Result<Box<dyn EngineProcess>> {
        self.spy.launches.fetch_add(1, Ordering::SeqCst);
        if self.faults.launch {
            return Err(anyhow!("browser binary not found"));
        }
        let now = self.spy.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.spy.max_active.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(MockProcess {
            launcher: self.clone(),
        }))
    }
}

struct MockProcess {
    launcher: MockLauncher,
}

#[async_trait]
impl EngineProcess for MockProcess {
    async fn open_page(&mut self) -> Result<Box<dyn EnginePage>> {
        if self.launcher.faults.open_page {
            return Err(anyhow!("target closed"));
        }
        self.launcher.spy.pages_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockPage {
            launcher: self.launcher.clone(),
        }))
    }

    async fn shutdown(self: Box<Self>) -> Result<()> {
        let spy = &self.launcher.spy;
        spy.processes_closed.fetch_add(1, Ordering::SeqCst);
        spy.active.fetch_sub(1, Ordering::SeqCst);
        if self.launcher.faults.shutdown {
            return Err(anyhow!("browser did not exit cleanly"));
        }
        Ok(())
    }
}

struct MockPage {
    launcher: MockLauncher,
}

#[async_trait]
impl EnginePage for MockPage {
    async fn load_html(&mut self, html: &str) -> Result<()> {
        *self.launcher.spy.last_html.lock().unwrap() = Some(html.to_string());
        if self.launcher.faults.load {
            return Err(anyhow!("navigation failed"));
        }
        if self.launcher.faults.hang_on_load {
            std::future::pending::<()>().await;
        }
        Ok(())
    }

    async fn wait_until_idle(&mut self) -> Result<()> {
        Ok(())
    }

    async fn print_pdf(&mut self, _options: &RenderOptions) -> Result<Vec<u8>> {
        if !self.launcher.print_delay.is_zero() {
            tokio::time::sleep(self.launcher.print_delay).await;
        }
        let faults = self.launcher.faults;
        if faults.print {
            return Err(anyhow!("Printing failed"));
        }
        if faults.empty_pdf {
            return Ok(Vec::new());
        }
        if faults.garbage_pdf {
            return Ok(b"<html>not a pdf</html>".to_vec());
        }
        Ok(FAKE_PDF.to_vec())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.launcher.spy.pages_closed.fetch_add(1, Ordering::SeqCst);
        if self.launcher.faults.close_page {
            return Err(anyhow!("page already detached"));
        }
        Ok(())
    }
}

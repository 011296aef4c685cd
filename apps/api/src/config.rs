use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::engine::RenderOptions;
use crate::profile::ProjectSelection;
use crate::render::DEFAULT_TEMPLATE;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    /// Chromium/Chrome binary; autodetected when unset.
    pub chrome_path: Option<PathBuf>,
    /// Runs Chromium without its sandbox. Only for containers that require it.
    pub chrome_no_sandbox: bool,
    pub engine_max_concurrent: usize,
    /// How long a request waits for an engine slot. Zero rejects immediately.
    pub engine_queue_timeout: Duration,
    pub engine_launch_timeout: Duration,
    pub engine_navigation_timeout: Duration,
    pub engine_render_timeout: Duration,
    pub cv_template: String,
    pub cv_projects: ProjectSelection,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            database_url: var("DATABASE_URL").with_context(|| {
                "Required environment variable 'DATABASE_URL' is not set".to_string()
            })?,
            db_max_connections: parse_or(var("DB_MAX_CONNECTIONS"), "DB_MAX_CONNECTIONS", 10)?,
            port: parse_or(var("PORT"), "PORT", 8080)?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            chrome_path: var("CHROME_PATH").map(PathBuf::from),
            chrome_no_sandbox: match var("CHROME_NO_SANDBOX") {
                Some(raw) => parse_bool(&raw)
                    .with_context(|| "CHROME_NO_SANDBOX must be true or false".to_string())?,
                None => false,
            },
            engine_max_concurrent: parse_or(
                var("ENGINE_MAX_CONCURRENT"),
                "ENGINE_MAX_CONCURRENT",
                2,
            )?,
            engine_queue_timeout: millis_or(
                var("ENGINE_QUEUE_TIMEOUT_MS"),
                "ENGINE_QUEUE_TIMEOUT_MS",
                10_000,
            )?,
            engine_launch_timeout: millis_or(
                var("ENGINE_LAUNCH_TIMEOUT_MS"),
                "ENGINE_LAUNCH_TIMEOUT_MS",
                60_000,
            )?,
            engine_navigation_timeout: millis_or(
                var("ENGINE_NAVIGATION_TIMEOUT_MS"),
                "ENGINE_NAVIGATION_TIMEOUT_MS",
                60_000,
            )?,
            engine_render_timeout: millis_or(
                var("ENGINE_RENDER_TIMEOUT_MS"),
                "ENGINE_RENDER_TIMEOUT_MS",
                60_000,
            )?,
            cv_template: var("CV_TEMPLATE").unwrap_or_else(|| DEFAULT_TEMPLATE.to_string()),
            cv_projects: match var("CV_PROJECTS") {
                Some(raw) => raw
                    .parse::<ProjectSelection>()
                    .map_err(|e| anyhow!("CV_PROJECTS: {e}"))?,
                None => ProjectSelection::All,
            },
        })
    }

    /// Engine options: A4, backgrounds on, 20px margins, 1920x1080 viewport,
    /// with the timeouts taken from the environment.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            launch_timeout: self.engine_launch_timeout,
            navigation_timeout: self.engine_navigation_timeout,
            render_timeout: self.engine_render_timeout,
            ..RenderOptions::default()
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{value}'")),
        None => Ok(default),
    }
}

fn millis_or(raw: Option<String>, key: &str, default_ms: u64) -> Result<Duration> {
    parse_or(raw, key, default_ms).map(Duration::from_millis)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

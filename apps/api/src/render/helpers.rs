//! Template helpers available to every CV template.
//!
//! | name           | kind     | usage                                   |
//! |----------------|----------|-----------------------------------------|
//! | `format_date`  | filter   | `{{ edu.start | format_date }}` → `Sep 2010` |
//! | `current_date` | function | `{{ current_date() }}` → `October 19, 2026` |
//! | `exists`       | tester   | `{% if profile.phone is exists %}`      |
//!
//! `format_date` never fails: null, non-string and unparseable input render as "".

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use tera::{Tera, Value};

/// Source of "today" for `current_date()`.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always returns the same day. Renders made with it are reproducible.
#[cfg(test)]
pub struct FixedClock(pub NaiveDate);

#[cfg(test)]
impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// The helper set installed into a renderer's Tera instance.
#[derive(Clone)]
pub struct HelperRegistry {
    clock: Arc<dyn Clock>,
}

impl HelperRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn install(&self, tera: &mut Tera) {
        tera.register_filter(
            "format_date",
            |value: &Value, _args: &HashMap<String, Value>| -> tera::Result<Value> {
                Ok(Value::String(format_date(value)))
            },
        );

        let clock = Arc::clone(&self.clock);
        tera.register_function(
            "current_date",
            move |_args: &HashMap<String, Value>| -> tera::Result<Value> {
                Ok(Value::String(long_date(clock.today())))
            },
        );

        tera.register_tester(
            "exists",
            |value: Option<&Value>, _args: &[Value]| -> tera::Result<bool> { Ok(exists(value)) },
        );
    }
}

/// `"2024-03-15"` → `"Mar 2024"`. Accepts plain dates, RFC 3339 timestamps and
/// naive `YYYY-MM-DDTHH:MM:SS` timestamps.
pub fn format_date(value: &Value) -> String {
    value
        .as_str()
        .and_then(parse_date)
        .map(month_year)
        .unwrap_or_default()
}

pub fn month_year(date: NaiveDate) -> String {
    date.format("%b %Y").to_string()
}

pub fn long_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn exists(value: Option<&Value>) -> bool {
    !matches!(value, None | Some(Value::Null))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|ts| ts.date())
}

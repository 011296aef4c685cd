use std::time::Duration;

use serde::{Deserialize, Serialize};

/// CSS pixels per inch; Chromium's print API takes inches.
const CSS_PX_PER_INCH: f64 = 96.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    A4,
    Letter,
    Legal,
}

impl PageFormat {
    /// (width, height) in inches.
    pub fn size_in(&self) -> (f64, f64) {
        match self {
            PageFormat::A4 => (8.27, 11.69),
            PageFormat::Letter => (8.5, 11.0),
            PageFormat::Legal => (8.5, 14.0),
        }
    }
}

/// Page margins in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(px: f64) -> Self {
        Self {
            top: px,
            right: px,
            bottom: px,
            left: px,
        }
    }

    pub fn px_to_in(px: f64) -> f64 {
        px / CSS_PX_PER_INCH
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

/// Everything the controller and backend need to turn HTML into a PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub page_format: PageFormat,
    pub print_background: bool,
    /// Let `@page { size: ... }` in the document override `page_format`.
    pub prefer_css_page_size: bool,
    pub margins: Margins,
    pub viewport: ViewportSize,
    pub launch_timeout: Duration,
    /// Covers opening the page and loading content until idle.
    pub navigation_timeout: Duration,
    /// Covers printing the PDF.
    pub render_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            page_format: PageFormat::A4,
            print_background: true,
            prefer_css_page_size: true,
            margins: Margins::uniform(20.0),
            viewport: ViewportSize {
                width: 1920,
                height: 1080,
            },
            launch_timeout: Duration::from_millis(60_000),
            navigation_timeout: Duration::from_millis(60_000),
            render_timeout: Duration::from_millis(60_000),
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Theme colour used when the profile has none, or an unusable one.
pub const DEFAULT_THEME_COLOR: &str = "#4F46E5";

/// Everything the CV template sees. Every field is always present: text the
/// user never filled in is an empty string, open-ended periods have `end: None`,
/// and missing sections are empty lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub profile: ProfileSection,
    pub education: Vec<EducationItem>,
    pub experience: Vec<ExperienceItem>,
    pub projects: Vec<ProjectItem>,
    pub skills: Vec<SkillItem>,
    pub languages: Vec<LanguageItem>,
    pub theme_color: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSection {
    pub name: String,
    pub headline: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub website: String,
    pub bio: String,
    pub social: SocialLinks,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialLinks {
    pub linkedin: String,
    pub github: String,
    pub twitter: String,
    pub instagram: String,
    pub behance: String,
    pub dribbble: String,
}

impl SocialLinks {
    /// Reads the profile's `social` JSON object; unknown keys and non-string
    /// values are ignored.
    pub fn from_json(value: Option<&serde_json::Value>) -> Self {
        let field = |key: &str| {
            value
                .and_then(|v| v.get(key))
                .and_then(|v| v.as_str())
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        SocialLinks {
            linkedin: field("linkedin"),
            github: field("github"),
            twitter: field("twitter"),
            instagram: field("instagram"),
            behance: field("behance"),
            dribbble: field("dribbble"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EducationItem {
    pub school: String,
    pub degree: String,
    pub field_of_study: String,
    pub location: String,
    pub description: String,
    pub start: NaiveDate,
    /// `None` while the entry is current.
    pub end: Option<NaiveDate>,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceItem {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub employment_type: String,
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub live_url: String,
    pub github_url: String,
    pub featured: bool,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkillItem {
    pub name: String,
    pub level: u8,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageItem {
    pub name: String,
    pub proficiency: String,
}

/// Accepts `#rgb` and `#rrggbb` literals only; anything else would end up
/// inside the template's stylesheet.
pub fn normalize_theme_color(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(color)
            if (color.len() == 4 || color.len() == 7)
                && color.starts_with('#')
                && color[1..].chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            color.to_string()
        }
        _ => DEFAULT_THEME_COLOR.to_string(),
    }
}

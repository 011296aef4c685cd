//! CV template renderer.
//!
//! Templates are registered by name at construction (the built-in set is
//! embedded in the binary). Rendering is a pure function of the
//! `RenderContext` and the helper registry: the same inputs give the same bytes.

use std::error::Error as _;

use tera::{Context, Tera};
use thiserror::Error;

use crate::profile::context::RenderContext;
use crate::render::helpers::HelperRegistry;

pub const DEFAULT_TEMPLATE: &str = "cv-classic";

/// Templates shipped with the binary: (name, source).
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[(
    "cv-classic",
    include_str!("../../templates/cv-classic.html"),
)];

/// Template failures. Kept apart from data errors so "no template deployed"
/// and "bad profile data" are distinguishable in logs.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template '{0}' is not registered")]
    NotFound(String),

    #[error("template '{name}' failed to compile: {detail}")]
    Compile { name: String, detail: String },

    #[error("template '{name}' failed to render: {detail}")]
    Render { name: String, detail: String },
}

pub struct CvRenderer {
    tera: Tera,
    default_template: String,
}

impl CvRenderer {
    /// Renderer over the built-in templates.
    pub fn new(helpers: &HelperRegistry, default_template: &str) -> Result<Self, TemplateError> {
        Self::with_templates(helpers, BUILTIN_TEMPLATES, default_template)
    }

    pub fn with_templates(
        helpers: &HelperRegistry,
        templates: &[(&str, &str)],
        default_template: &str,
    ) -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        helpers.install(&mut tera);

        for (name, source) in templates {
            tera.add_raw_template(&file_name(name), source)
                .map_err(|e| TemplateError::Compile {
                    name: name.to_string(),
                    detail: error_chain(&e),
                })?;
        }

        let renderer = Self {
            tera,
            default_template: default_template.to_string(),
        };
        if !renderer.has_template(default_template) {
            return Err(TemplateError::NotFound(default_template.to_string()));
        }
        Ok(renderer)
    }

    pub fn default_template(&self) -> &str {
        &self.default_template
    }

    pub fn has_template(&self, name: &str) -> bool {
        let file = file_name(name);
        self.tera.get_template_names().any(|n| n == file)
    }

    pub fn render(&self, context: &RenderContext) -> Result<String, TemplateError> {
        self.render_named(&self.default_template, context)
    }

    pub fn render_named(&self, name: &str, context: &RenderContext) -> Result<String, TemplateError> {
        if !self.has_template(name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }

        let ctx = Context::from_serialize(context).map_err(|e| TemplateError::Render {
            name: name.to_string(),
            detail: error_chain(&e),
        })?;

        self.tera
            .render(&file_name(name), &ctx)
            .map_err(|e| TemplateError::Render {
                name: name.to_string(),
                detail: error_chain(&e),
            })
    }
}

/// The `.html` suffix turns on Tera's HTML autoescaping.
fn file_name(name: &str) -> String {
    format!("{name}.html")
}

/// Tera's top-level message is usually just "Failed to render 'x'"; the
/// useful part sits in the source chain.
fn error_chain(err: &tera::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::profile::context::{
        EducationItem, ExperienceItem, ProfileSection, SkillItem, DEFAULT_THEME_COLOR,
    };
    use crate::render::helpers::FixedClock;

    fn helpers() -> HelperRegistry {
        HelperRegistry::new(Arc::new(FixedClock(
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        )))
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ada() -> RenderContext {
        RenderContext {
            profile: ProfileSection {
                name: "Ada Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                ..Default::default()
            },
            education: vec![EducationItem {
                school: "Analytical Institute".to_string(),
                degree: "BSc".to_string(),
                field_of_study: "Mathematics".to_string(),
                location: String::new(),
                description: String::new(),
                start: date("2010-09-01"),
                end: Some(date("2014-06-01")),
                current: false,
            }],
            experience: vec![],
            projects: vec![],
            skills: vec![SkillItem {
                name: "Rust".to_string(),
                level: 4,
                category: "technical".to_string(),
            }],
            languages: vec![],
            theme_color: DEFAULT_THEME_COLOR.to_string(),
        }
    }

    #[test]
    fn test_renders_dates_and_name() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let html = renderer.render(&ada()).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Ada Lovelace"));
        assert!(html.contains("Sep 2010"));
        assert!(html.contains("Jun 2014"));
        assert!(html.contains("Rust"));
        assert!(html.contains("Generated on October 19, 2026"));
        assert!(html.contains(DEFAULT_THEME_COLOR));
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let first = renderer.render(&ada()).unwrap();
        let second = renderer.render(&ada().clone()).unwrap();
        assert_eq!(first.as_bytes(), second.as_bytes());
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let mut ctx = ada();
        ctx.education.clear();
        ctx.skills.clear();

        let html = renderer.render(&ctx).unwrap();
        assert!(!html.contains("<h2>Education</h2>"));
        assert!(!html.contains("<h2>Experience</h2>"));
        assert!(!html.contains("<h2>Skills</h2>"));
    }

    #[test]
    fn test_open_ended_entry_renders_present() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let mut ctx = ada();
        ctx.experience.push(ExperienceItem {
            title: "Engineer".to_string(),
            company: "Difference Engines Ltd".to_string(),
            location: String::new(),
            description: String::new(),
            employment_type: "full-time".to_string(),
            start: date("2015-01-01"),
            end: None,
            current: true,
        });

        let html = renderer.render(&ctx).unwrap();
        assert!(html.contains("Jan 2015 &ndash; Present"));
    }

    #[test]
    fn test_user_text_is_escaped() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let mut ctx = ada();
        ctx.profile.bio = "<script>alert(1)</script>".to_string();

        let html = renderer.render(&ctx).unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_unknown_template_is_not_found() {
        let renderer = CvRenderer::new(&helpers(), DEFAULT_TEMPLATE).unwrap();
        let err = renderer.render_named("cv-missing", &ada()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(name) if name == "cv-missing"));
    }

    #[test]
    fn test_unknown_default_template_fails_at_construction() {
        let result = CvRenderer::new(&helpers(), "cv-nope");
        assert!(matches!(result, Err(TemplateError::NotFound(_))));
    }

    #[test]
    fn test_broken_template_is_compile_error() {
        let result = CvRenderer::with_templates(
            &helpers(),
            &[("broken", "{% for x in %}")],
            "broken",
        );
        assert!(matches!(result, Err(TemplateError::Compile { .. })));
    }

    #[test]
    fn test_templates_swappable_by_name() {
        let renderer = CvRenderer::with_templates(
            &helpers(),
            &[
                ("cv-classic", BUILTIN_TEMPLATES[0].1),
                ("plain", "{{ profile.name }} / {{ education | length }}"),
            ],
            "cv-classic",
        )
        .unwrap();

        assert_eq!(renderer.render_named("plain", &ada()).unwrap(), "Ada Lovelace / 1");
        assert_eq!(renderer.default_template(), "cv-classic");
    }
}

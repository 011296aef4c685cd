//! Profile Aggregator: loads a user's profile and related collections and
//! normalizes them into a `RenderContext`.
//!
//! Ordering rules:
//! - education / experience: start date descending (newest first)
//! - projects: creation time descending, optionally featured-only and capped
//! - skills / languages: store order

use std::cmp::Reverse;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::profile::{EducationRow, ExperienceRow, ProfileRow, ProjectRow};
use crate::profile::context::{
    normalize_theme_color, EducationItem, ExperienceItem, LanguageItem, ProfileSection,
    ProjectItem, RenderContext, SkillItem, SocialLinks,
};
use crate::profile::store::{ProfileStore, RelatedRows};

/// Featured projects shown on the compact CV.
pub const FEATURED_PROJECT_LIMIT: usize = 3;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no profile exists for user {0}")]
    ProfileNotFound(Uuid),

    #[error("profile {profile_id} is inconsistent: {reason}")]
    DataIntegrity { profile_id: Uuid, reason: String },

    #[error("profile store failure: {0:#}")]
    Store(#[from] anyhow::Error),
}

/// Which projects end up on the CV. Chosen by the caller per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProjectSelection {
    #[default]
    All,
    Featured { limit: usize },
}

impl ProjectSelection {
    pub fn featured() -> Self {
        ProjectSelection::Featured {
            limit: FEATURED_PROJECT_LIMIT,
        }
    }
}

impl FromStr for ProjectSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(ProjectSelection::All),
            "featured" => Ok(ProjectSelection::featured()),
            other => Err(format!("unknown project selection '{other}'")),
        }
    }
}

#[derive(Clone)]
pub struct ProfileAggregator {
    store: Arc<dyn ProfileStore>,
}

impl ProfileAggregator {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    pub async fn aggregate(
        &self,
        user_id: Uuid,
        projects: ProjectSelection,
    ) -> Result<RenderContext, AggregateError> {
        let (profile, mut related) = self
            .store
            .load_snapshot(user_id)
            .await?
            .ok_or(AggregateError::ProfileNotFound(user_id))?;

        let owner = profile.owner().ok_or_else(|| AggregateError::DataIntegrity {
            profile_id: profile.id,
            reason: "owning user record is missing".to_string(),
        })?;
        if owner.id != user_id || profile.user_id != user_id {
            return Err(AggregateError::DataIntegrity {
                profile_id: profile.id,
                reason: "profile is linked to a different user".to_string(),
            });
        }

        drop_foreign_rows(&profile, &mut related);

        let context = build_context(&profile, owner.name, owner.email, related, projects);

        info!(
            "Aggregated profile {} for user {user_id}: {} education, {} experience, {} projects",
            profile.id,
            context.education.len(),
            context.experience.len(),
            context.projects.len()
        );

        Ok(context)
    }
}

/// Removes any row whose `profile_id` is not this profile's. A correct store
/// never returns one; a leak here would put another user's data on the CV.
fn drop_foreign_rows(profile: &ProfileRow, related: &mut RelatedRows) {
    let before = related.education.len()
        + related.experience.len()
        + related.projects.len()
        + related.skills.len()
        + related.languages.len();

    related.education.retain(|r| r.profile_id == profile.id);
    related.experience.retain(|r| r.profile_id == profile.id);
    related.projects.retain(|r| r.profile_id == profile.id);
    related.skills.retain(|r| r.profile_id == profile.id);
    related.languages.retain(|r| r.profile_id == profile.id);

    let after = related.education.len()
        + related.experience.len()
        + related.projects.len()
        + related.skills.len()
        + related.languages.len();

    if after < before {
        warn!(
            "Dropped {} rows not owned by profile {}; check the store's filters",
            before - after,
            profile.id
        );
    }
}

fn build_context(
    profile: &ProfileRow,
    name: String,
    email: String,
    related: RelatedRows,
    selection: ProjectSelection,
) -> RenderContext {
    let RelatedRows {
        mut education,
        mut experience,
        projects,
        skills,
        languages,
    } = related;

    education.sort_by_key(|e| Reverse((e.start_date, e.created_at)));
    experience.sort_by_key(|e| Reverse((e.start_date, e.created_at)));

    RenderContext {
        profile: ProfileSection {
            name,
            headline: text(&profile.headline),
            email,
            phone: text(&profile.phone),
            location: text(&profile.location),
            website: text(&profile.website),
            bio: text(&profile.bio),
            social: SocialLinks::from_json(profile.social.as_ref()),
        },
        education: education.into_iter().map(education_item).collect(),
        experience: experience.into_iter().map(experience_item).collect(),
        projects: select_projects(projects, selection)
            .into_iter()
            .map(project_item)
            .collect(),
        skills: skills
            .into_iter()
            .map(|s| SkillItem {
                name: s.name,
                level: s.level.clamp(1, 5) as u8,
                category: s.category,
            })
            .collect(),
        languages: languages
            .into_iter()
            .map(|l| LanguageItem {
                name: l.name,
                proficiency: l.proficiency,
            })
            .collect(),
        theme_color: normalize_theme_color(profile.cv_color.as_deref()),
    }
}

fn select_projects(mut projects: Vec<ProjectRow>, selection: ProjectSelection) -> Vec<ProjectRow> {
    projects.sort_by_key(|p| Reverse(p.created_at));
    match selection {
        ProjectSelection::All => projects,
        ProjectSelection::Featured { limit } => projects
            .into_iter()
            .filter(|p| p.featured)
            .take(limit)
            .collect(),
    }
}

fn education_item(row: EducationRow) -> EducationItem {
    EducationItem {
        end: if row.current { None } else { row.end_date },
        school: row.school,
        degree: row.degree,
        field_of_study: row.field_of_study,
        location: text(&row.location),
        description: text(&row.description),
        start: row.start_date,
        current: row.current,
    }
}

fn experience_item(row: ExperienceRow) -> ExperienceItem {
    ExperienceItem {
        end: if row.current { None } else { row.end_date },
        title: row.title,
        company: row.company,
        location: text(&row.location),
        description: text(&row.description),
        employment_type: row.employment_type,
        start: row.start_date,
        current: row.current,
    }
}

fn project_item(row: ProjectRow) -> ProjectItem {
    ProjectItem {
        title: row.title,
        description: row.description,
        technologies: row.technologies,
        live_url: text(&row.live_url),
        github_url: text(&row.github_url),
        featured: row.featured,
        start: row.start_date,
        end: row.end_date,
    }
}

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

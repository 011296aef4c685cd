use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::user::ProfileOwner;

/// A profile row joined with its owning user. The owner columns come from a
/// LEFT JOIN, so they are `None` when the user record is gone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    /// `{ "linkedin": "...", "github": "...", ... }`
    pub social: Option<Value>,
    pub cv_color: Option<String>,
    pub owner_id: Option<Uuid>,
    pub owner_name: Option<String>,
    pub owner_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn owner(&self) -> Option<ProfileOwner> {
        match (&self.owner_id, &self.owner_name, &self.owner_email) {
            (Some(id), Some(name), Some(email)) => Some(ProfileOwner {
                id: *id,
                name: name.clone(),
                email: email.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EducationRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub school: String,
    pub degree: String,
    pub field_of_study: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExperienceRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub current: bool,
    pub description: Option<String>,
    /// full-time | part-time | internship | freelance | contract | volunteer
    pub employment_type: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub title: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
    pub featured: bool,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SkillRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    /// 1 – 5
    pub level: i16,
    /// technical | soft | language | other
    pub category: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LanguageRow {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub name: String,
    /// beginner | intermediate | advanced | fluent | native
    pub proficiency: String,
    pub created_at: DateTime<Utc>,
}

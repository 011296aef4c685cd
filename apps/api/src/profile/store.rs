//! Profile persistence seam.
//!
//! `ProfileStore` is the contract the aggregator reads through; `PgProfileStore`
//! is the Postgres implementation. Every related-collection query is filtered
//! by `profile_id`, never a scan of the whole table.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::profile::{
    EducationRow, ExperienceRow, LanguageRow, ProfileRow, ProjectRow, SkillRow,
};

/// All collections hanging off one profile, read together.
#[derive(Debug, Clone, Default)]
pub struct RelatedRows {
    pub education: Vec<EducationRow>,
    pub experience: Vec<ExperienceRow>,
    pub projects: Vec<ProjectRow>,
    pub skills: Vec<SkillRow>,
    pub languages: Vec<LanguageRow>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The profile owned by `user_id`, joined with its owner.
    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<ProfileRow>>;

    async fn education_by_profile(&self, profile_id: Uuid) -> Result<Vec<EducationRow>>;
    async fn experience_by_profile(&self, profile_id: Uuid) -> Result<Vec<ExperienceRow>>;
    async fn projects_by_profile(&self, profile_id: Uuid) -> Result<Vec<ProjectRow>>;
    async fn skills_by_profile(&self, profile_id: Uuid) -> Result<Vec<SkillRow>>;
    async fn languages_by_profile(&self, profile_id: Uuid) -> Result<Vec<LanguageRow>>;

    /// The profile and all five collections. Backends that can read them from a
    /// single snapshot should override this.
    async fn load_snapshot(&self, user_id: Uuid) -> Result<Option<(ProfileRow, RelatedRows)>> {
        let Some(profile) = self.find_profile_by_user(user_id).await? else {
            return Ok(None);
        };
        let related = self.load_related(profile.id).await?;
        Ok(Some((profile, related)))
    }

    async fn load_related(&self, profile_id: Uuid) -> Result<RelatedRows> {
        let (education, experience, projects, skills, languages) = tokio::try_join!(
            self.education_by_profile(profile_id),
            self.experience_by_profile(profile_id),
            self.projects_by_profile(profile_id),
            self.skills_by_profile(profile_id),
            self.languages_by_profile(profile_id),
        )?;
        Ok(RelatedRows {
            education,
            experience,
            projects,
            skills,
            languages,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Postgres
// ────────────────────────────────────────────────────────────────────────────

const PROFILE_BY_USER_SQL: &str = r#"
    SELECT p.id, p.user_id, p.headline, p.bio, p.location, p.website, p.phone,
           p.social, p.cv_color, p.created_at,
           u.id AS owner_id, u.name AS owner_name, u.email AS owner_email
    FROM profiles p
    LEFT JOIN users u ON u.id = p.user_id
    WHERE p.user_id = $1
"#;

const EDUCATION_SQL: &str =
    "SELECT * FROM education WHERE profile_id = $1 ORDER BY start_date DESC, created_at DESC";
const EXPERIENCE_SQL: &str =
    "SELECT * FROM experience WHERE profile_id = $1 ORDER BY start_date DESC, created_at DESC";
const PROJECTS_SQL: &str =
    "SELECT * FROM projects WHERE profile_id = $1 ORDER BY created_at DESC";
const SKILLS_SQL: &str = "SELECT * FROM skills WHERE profile_id = $1 ORDER BY created_at ASC";
const LANGUAGES_SQL: &str =
    "SELECT * FROM languages WHERE profile_id = $1 ORDER BY created_at ASC";

#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn find_profile_by_user(&self, user_id: Uuid) -> Result<Option<ProfileRow>> {
        sqlx::query_as::<_, ProfileRow>(PROFILE_BY_USER_SQL)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("loading profile for user {user_id}"))
    }

    async fn education_by_profile(&self, profile_id: Uuid) -> Result<Vec<EducationRow>> {
        Ok(sqlx::query_as::<_, EducationRow>(EDUCATION_SQL)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn experience_by_profile(&self, profile_id: Uuid) -> Result<Vec<ExperienceRow>> {
        Ok(sqlx::query_as::<_, ExperienceRow>(EXPERIENCE_SQL)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn projects_by_profile(&self, profile_id: Uuid) -> Result<Vec<ProjectRow>> {
        Ok(sqlx::query_as::<_, ProjectRow>(PROJECTS_SQL)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn skills_by_profile(&self, profile_id: Uuid) -> Result<Vec<SkillRow>> {
        Ok(sqlx::query_as::<_, SkillRow>(SKILLS_SQL)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn languages_by_profile(&self, profile_id: Uuid) -> Result<Vec<LanguageRow>> {
        Ok(sqlx::query_as::<_, LanguageRow>(LANGUAGES_SQL)
            .bind(profile_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Reads the profile and every collection inside one read-only REPEATABLE
    /// READ transaction, so a concurrent edit cannot produce a CV mixing two states.
    async fn load_snapshot(&self, user_id: Uuid) -> Result<Option<(ProfileRow, RelatedRows)>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await?;

        let Some(profile) = sqlx::query_as::<_, ProfileRow>(PROFILE_BY_USER_SQL)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await
            .with_context(|| format!("loading profile for user {user_id}"))?
        else {
            tx.commit().await?;
            return Ok(None);
        };
        let profile_id = profile.id;

        let education = sqlx::query_as::<_, EducationRow>(EDUCATION_SQL)
            .bind(profile_id)
            .fetch_all(&mut *tx)
            .await
            .context("loading education")?;
        let experience = sqlx::query_as::<_, ExperienceRow>(EXPERIENCE_SQL)
            .bind(profile_id)
            .fetch_all(&mut *tx)
            .await
            .context("loading experience")?;
        let projects = sqlx::query_as::<_, ProjectRow>(PROJECTS_SQL)
            .bind(profile_id)
            .fetch_all(&mut *tx)
            .await
            .context("loading projects")?;
        let skills = sqlx::query_as::<_, SkillRow>(SKILLS_SQL)
            .bind(profile_id)
            .fetch_all(&mut *tx)
            .await
            .context("loading skills")?;
        let languages = sqlx::query_as::<_, LanguageRow>(LANGUAGES_SQL)
            .bind(profile_id)
            .fetch_all(&mut *tx)
            .await
            .context("loading languages")?;

        tx.commit().await?;

        let related = RelatedRows {
            education,
            experience,
            projects,
            skills,
            languages,
        };
        debug!(
            "Loaded profile {profile_id}: {} education, {} experience, {} projects",
            related.education.len(),
            related.experience.len(),
            related.projects.len()
        );
        Ok(Some((profile, related)))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory store for tests
// ────────────────────────────────────────────────────────────────────────────


#[cfg(test)]
mod tests {
    use super::memory::*;
    use super::*;

    #[tokio::test]
    async fn test_snapshot_pairs_profile_with_its_rows() {
        let user_id = Uuid::new_v4();
        let profile = make_profile(user_id, "Ada");
        let pid = profile.id;
        let store = MemoryProfileStore::new();
        store.profiles.lock().unwrap().push(profile);
        {
            let mut rows = store.rows.lock().unwrap();
            rows.education.push(make_education(pid, "Mine", "2010-09-01", None));
            rows.education.push(make_education(Uuid::new_v4(), "Theirs", "2011-09-01", None));
        }

        let (loaded, related) = store.load_snapshot(user_id).await.unwrap().unwrap();

        assert_eq!(loaded.id, pid);
        assert_eq!(related.education.len(), 1);
        assert_eq!(related.education[0].school, "Mine");
    }

    #[tokio::test]
    async fn test_snapshot_of_unknown_user_is_none() {
        let store = MemoryProfileStore::new();
        store
            .rows
            .lock()
            .unwrap()
            .skills
            .push(make_skill(Uuid::new_v4(), "Rust", "technical"));

        assert!(store.load_snapshot(Uuid::new_v4()).await.unwrap().is_none());
    }
}

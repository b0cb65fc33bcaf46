use crate::error::{Error, Result};
use crate::models::catalog::{Grade, Question, QuestionOption, Subject, Topic, Unit};
use sqlx::PgPool;

/// Filter for the eligible-question query. `topic_id`/`unit_id` narrow the
/// scope when set; `difficulty_level` of `None` means any difficulty.
#[derive(Debug, Clone)]
pub struct EligibilityFilter {
    pub grade_id: i32,
    pub subject_id: i32,
    pub unit_id: Option<i32>,
    pub topic_id: Option<i32>,
    pub difficulty_level: Option<String>,
}

/// Read-only access to the grade/subject/unit/topic hierarchy and the
/// question bank.
#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_grades(&self) -> Result<Vec<Grade>> {
        let grades = sqlx::query_as::<_, Grade>(
            "SELECT id, name, level, description FROM grades WHERE is_active = TRUE ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(grades)
    }

    pub async fn list_subjects(&self, grade_id: i32) -> Result<Vec<Subject>> {
        let subjects = sqlx::query_as::<_, Subject>(
            r#"
            SELECT id, grade_id, name, code, description
            FROM subjects
            WHERE grade_id = $1 AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .bind(grade_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(subjects)
    }

    pub async fn list_units(&self, subject_id: i32) -> Result<Vec<Unit>> {
        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT id, subject_id, name, description
            FROM units
            WHERE subject_id = $1 AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .bind(subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(units)
    }

    pub async fn list_topics(&self, unit_id: i32) -> Result<Vec<Topic>> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT id, unit_id, name, description
            FROM topics
            WHERE unit_id = $1 AND is_active = TRUE
            ORDER BY name
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(topics)
    }

    pub async fn require_grade(&self, grade_id: i32) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM grades WHERE id = $1 AND is_active = TRUE)",
        )
        .bind(grade_id)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(Error::NotFound(format!("Grade {} not found", grade_id)));
        }
        Ok(())
    }

    pub async fn require_subject(&self, subject_id: i32, grade_id: i32) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM subjects
                WHERE id = $1 AND grade_id = $2 AND is_active = TRUE
            )
            "#,
        )
        .bind(subject_id)
        .bind(grade_id)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(Error::NotFound(format!(
                "Subject {} not found for grade {}",
                subject_id, grade_id
            )));
        }
        Ok(())
    }

    pub async fn require_user(&self, user_id: i32) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND is_active = TRUE)",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if !exists {
            return Err(Error::NotFound(format!("User {} not found", user_id)));
        }
        Ok(())
    }

    /// Every active question inside the scope that has at least two active
    /// options. A question without a real choice set must never be served.
    pub async fn find_eligible_questions(
        &self,
        filter: &EligibilityFilter,
    ) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT q.id, q.grade_id, q.subject_id, q.unit_id, q.topic_id,
                   q.question_text, q.explanation, q.difficulty_level,
                   q.points, q.is_active
            FROM questions q
            JOIN question_options o ON o.question_id = q.id AND o.is_active = TRUE
            WHERE q.is_active = TRUE
              AND q.grade_id = $1
              AND q.subject_id = $2
              AND ($3::int IS NULL OR q.unit_id = $3)
              AND ($4::int IS NULL OR q.topic_id = $4)
              AND ($5::text IS NULL OR q.difficulty_level = $5)
            GROUP BY q.id
            HAVING COUNT(o.id) >= 2
            "#,
        )
        .bind(filter.grade_id)
        .bind(filter.subject_id)
        .bind(filter.unit_id)
        .bind(filter.topic_id)
        .bind(filter.difficulty_level.as_deref())
        .fetch_all(&self.pool)
        .await?;
        Ok(questions)
    }

    pub async fn list_active_options(&self, question_id: i32) -> Result<Vec<QuestionOption>> {
        let options = sqlx::query_as::<_, QuestionOption>(
            r#"
            SELECT id, question_id, option_text, is_correct, display_order, is_active
            FROM question_options
            WHERE question_id = $1 AND is_active = TRUE
            ORDER BY display_order
            "#,
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(options)
    }
}

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use crate::error::{Error, Result};
use crate::models::quiz_session::QuizSession;
use crate::models::session_question::SessionQuestion;

/// Session row to insert. Aggregate columns start NULL; the initial
/// `remaining_time_seconds` is derived from the timer settings.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub session_token: String,
    pub user_id: i32,
    pub grade_id: i32,
    pub subject_id: i32,
    pub unit_id: Option<i32>,
    pub topic_id: Option<i32>,
    pub difficulty_level: String,
    pub timer_enabled: bool,
    pub timer_duration_minutes: i32,
    pub quiz_mode: String,
    pub question_count: i32,
}

/// Everything scoring needs about one question slot, joined in a single
/// query so the report never goes back to the database per question.
#[derive(Debug, Clone, FromRow)]
pub struct SessionAnswerRow {
    pub question_id: i32,
    pub question_order: i32,
    pub question_text: String,
    pub difficulty_level: String,
    pub explanation: Option<String>,
    pub subject_name: String,
    pub topic_name: Option<String>,
    pub selected_option_id: Option<i32>,
    pub is_correct: Option<bool>,
    pub time_spent_seconds: Option<i32>,
    pub answered_at: Option<DateTime<Utc>>,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
}

const SESSION_COLUMNS: &str = r#"
    id, session_token, user_id, grade_id, subject_id, unit_id, topic_id,
    difficulty_level, timer_enabled, timer_duration_minutes, quiz_mode,
    question_count, status, start_time, end_time, remaining_time_seconds,
    total_score, correct_answers, completion_time_seconds, created_at, updated_at
"#;

#[derive(Clone)]
pub struct SessionStore {
    pool: PgPool,
}

impl SessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert the session and its ordered question assignments in one
    /// transaction. Either everything lands or nothing does.
    pub async fn create_with_questions(
        &self,
        new: &NewSession,
        question_ids: &[i32],
    ) -> Result<QuizSession> {
        let initial_remaining = if new.timer_enabled {
            Some(new.timer_duration_minutes * 60)
        } else {
            None
        };

        let mut tx = self.pool.begin().await?;

        let session = sqlx::query_as::<_, QuizSession>(&format!(
            r#"
            INSERT INTO quiz_sessions (
                session_token, user_id, grade_id, subject_id, unit_id, topic_id,
                difficulty_level, timer_enabled, timer_duration_minutes,
                quiz_mode, question_count, remaining_time_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            SESSION_COLUMNS
        ))
        .bind(&new.session_token)
        .bind(new.user_id)
        .bind(new.grade_id)
        .bind(new.subject_id)
        .bind(new.unit_id)
        .bind(new.topic_id)
        .bind(&new.difficulty_level)
        .bind(new.timer_enabled)
        .bind(new.timer_duration_minutes)
        .bind(&new.quiz_mode)
        .bind(new.question_count)
        .bind(initial_remaining)
        .fetch_one(&mut *tx)
        .await?;

        for (idx, question_id) in question_ids.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO quiz_session_questions (session_id, question_id, question_order)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(session.id)
            .bind(question_id)
            .bind((idx as i32) + 1)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(session)
    }

    pub async fn find_by_token(&self, session_token: &str) -> Result<QuizSession> {
        let session = sqlx::query_as::<_, QuizSession>(&format!(
            "SELECT {} FROM quiz_sessions WHERE session_token = $1",
            SESSION_COLUMNS
        ))
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_token)))?;
        Ok(session)
    }

    pub async fn list_questions(&self, session_id: i32) -> Result<Vec<SessionQuestion>> {
        let rows = sqlx::query_as::<_, SessionQuestion>(
            r#"
            SELECT id, session_id, question_id, question_order, selected_option_id,
                   is_correct, points_earned, time_spent_seconds, answered_at,
                   created_at, updated_at
            FROM quiz_session_questions
            WHERE session_id = $1
            ORDER BY question_order
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Record (or overwrite) the answer for one slot. Returns false when the
    /// question does not belong to the session.
    pub async fn update_answer(
        &self,
        session_id: i32,
        question_id: i32,
        selected_option_id: Option<i32>,
        is_correct: bool,
        points_earned: i32,
        time_spent_seconds: Option<i32>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_session_questions
            SET selected_option_id = $3,
                is_correct = $4,
                points_earned = $5,
                time_spent_seconds = $6,
                answered_at = NOW(),
                updated_at = NOW()
            WHERE session_id = $1 AND question_id = $2
            "#,
        )
        .bind(session_id)
        .bind(question_id)
        .bind(selected_option_id)
        .bind(is_correct)
        .bind(points_earned)
        .bind(time_spent_seconds)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn count_answered(&self, session_id: i32) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM quiz_session_questions
            WHERE session_id = $1 AND answered_at IS NOT NULL
            "#,
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Compare-and-set completion: only the caller that still sees `active`
    /// wins and persists the aggregates. Returns false for the losers.
    pub async fn finalize(
        &self,
        session_id: i32,
        end_time: DateTime<Utc>,
        total_score: Decimal,
        correct_answers: i32,
        completion_time_seconds: i32,
        points_per_question: i32,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE quiz_sessions
            SET status = 'completed',
                end_time = $2,
                total_score = $3,
                correct_answers = $4,
                completion_time_seconds = $5,
                updated_at = NOW()
            WHERE id = $1 AND status = 'active'
            "#,
        )
        .bind(session_id)
        .bind(end_time)
        .bind(total_score)
        .bind(correct_answers)
        .bind(completion_time_seconds)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r#"
            UPDATE quiz_session_questions
            SET points_earned = $2, updated_at = NOW()
            WHERE session_id = $1 AND is_correct = TRUE
            "#,
        )
        .bind(session_id)
        .bind(points_per_question)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn update_timer(&self, session_id: i32, remaining_time_seconds: i32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE quiz_sessions
            SET remaining_time_seconds = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(session_id)
        .bind(remaining_time_seconds)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Join of slots, question text, subject/topic names and both answer
    /// texts, in ordinal order. Input for the scoring engine.
    pub async fn load_answer_rows(&self, session_id: i32) -> Result<Vec<SessionAnswerRow>> {
        let rows = sqlx::query_as::<_, SessionAnswerRow>(
            r#"
            SELECT sq.question_id,
                   sq.question_order,
                   q.question_text,
                   q.difficulty_level,
                   q.explanation,
                   s.name AS subject_name,
                   t.name AS topic_name,
                   sq.selected_option_id,
                   sq.is_correct,
                   sq.time_spent_seconds,
                   sq.answered_at,
                   uo.option_text AS user_answer,
                   co.option_text AS correct_answer
            FROM quiz_session_questions sq
            JOIN questions q ON q.id = sq.question_id
            JOIN subjects s ON s.id = q.subject_id
            LEFT JOIN topics t ON t.id = q.topic_id
            LEFT JOIN question_options uo ON uo.id = sq.selected_option_id
            LEFT JOIN question_options co
                   ON co.question_id = q.id AND co.is_correct = TRUE AND co.is_active = TRUE
            WHERE sq.session_id = $1
            ORDER BY sq.question_order
            "#,
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

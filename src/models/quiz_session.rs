use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One quiz attempt. The question set is fixed at creation; `status` moves
/// `active -> completed` exactly once and aggregate columns stay NULL until
/// the completion pass writes them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuizSession {
    pub id: i32,
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
    pub status: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub remaining_time_seconds: Option<i32>,
    pub total_score: Option<Decimal>,
    pub correct_answers: Option<i32>,
    pub completion_time_seconds: Option<i32>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

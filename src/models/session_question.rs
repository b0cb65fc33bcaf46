use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One question slot inside a session. `question_order` is the fixed 1..N
/// position; answer columns stay NULL until the slot is answered.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionQuestion {
    pub id: i32,
    pub session_id: i32,
    pub question_id: i32,
    pub question_order: i32,
    pub selected_option_id: Option<i32>,
    pub is_correct: Option<bool>,
    pub points_earned: Option<i32>,
    pub time_spent_seconds: Option<i32>,
    pub answered_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Grade {
    pub id: i32,
    pub name: String,
    pub level: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subject {
    pub id: i32,
    pub grade_id: i32,
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Unit {
    pub id: i32,
    pub subject_id: i32,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Topic {
    pub id: i32,
    pub unit_id: i32,
    pub name: String,
    pub description: Option<String>,
}

/// A bank question. Only rows with `is_active` and at least two active
/// options are eligible for selection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i32,
    pub grade_id: i32,
    pub subject_id: i32,
    pub unit_id: Option<i32>,
    pub topic_id: Option<i32>,
    pub question_text: String,
    pub explanation: Option<String>,
    pub difficulty_level: String,
    pub points: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionOption {
    pub id: i32,
    pub question_id: i32,
    pub option_text: String,
    pub is_correct: bool,
    pub display_order: i32,
    pub is_active: bool,
}

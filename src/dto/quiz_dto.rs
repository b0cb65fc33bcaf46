use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartSessionRequest {
    pub user_id: Option<i32>,
    pub grade_id: Option<i32>,
    pub subject_id: Option<i32>,
    pub unit_id: Option<i32>,
    pub topic_id: Option<i32>,
    pub difficulty_level: Option<String>,
    pub timer_enabled: Option<bool>,
    #[validate(range(min = 1, max = 180))]
    pub timer_duration_minutes: Option<i32>,
    pub quiz_mode: Option<String>,
    #[validate(range(min = 1, max = 50))]
    pub question_count: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_token: String,
    pub questions_count: i32,
    pub timer_enabled: bool,
    pub timer_duration_minutes: i32,
    pub quiz_mode: String,
}

/// Progress of one slot as exposed in session info. Correctness is not
/// included; feedback flows through the answer and results endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSlotState {
    pub question_id: i32,
    pub question_order: i32,
    pub answered: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfoResponse {
    pub session_token: String,
    pub status: String,
    pub grade_id: i32,
    pub subject_id: i32,
    pub unit_id: Option<i32>,
    pub topic_id: Option<i32>,
    pub difficulty_level: String,
    pub timer_enabled: bool,
    pub timer_duration_minutes: i32,
    pub quiz_mode: String,
    pub question_count: i32,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub questions: Vec<SessionSlotState>,
}

/// One randomized option as shown to the taker. Correctness is never
/// serialized here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionView {
    pub id: i32,
    pub option_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuestionView {
    pub question_id: i32,
    pub question_order: i32,
    pub question_text: String,
    pub difficulty_level: String,
    pub options: Vec<OptionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionQuestionsResponse {
    pub session_token: String,
    pub questions: Vec<SessionQuestionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitAnswerRequest {
    pub question_id: i32,
    pub selected_option_id: Option<i32>,
    #[validate(range(min = 0))]
    pub time_spent_seconds: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAnswerResponse {
    pub question_id: i32,
    pub is_correct: bool,
    pub correct_answer: Option<String>,
    pub points_earned: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateTimerRequest {
    #[validate(range(min = 0))]
    pub remaining_time_seconds: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub remaining_time_seconds: Option<i32>,
    pub questions_answered: i32,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_text: String,
    pub subject: String,
    pub topic: Option<String>,
    pub difficulty: String,
    pub status: String,
    pub time_spent_seconds: i32,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub icon: String,
    pub title: String,
    pub description: String,
    pub action_text: String,
    pub action_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultSessionInfo {
    pub session_token: String,
    pub grade_id: i32,
    pub subject_id: i32,
    pub difficulty_level: String,
    pub quiz_mode: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResult {
    pub total_score: f64,
    pub score_percentage: f64,
    pub correct_answers: i32,
    pub correct_percentage: f64,
    pub total_questions: i32,
    pub answered_questions: i32,
    pub completion_time_seconds: i32,
    pub average_difficulty: String,
    pub questions: Vec<QuestionReview>,
    pub subjects: BTreeMap<String, f64>,
    pub difficulty: BTreeMap<String, f64>,
    pub recommendations: Vec<Recommendation>,
    pub session_info: ResultSessionInfo,
}

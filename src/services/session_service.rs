use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::config::get_config;
use crate::dto::quiz_dto::{
    OptionView, ResultSessionInfo, SessionInfoResponse, SessionQuestionView,
    SessionQuestionsResponse, SessionResult, SessionSlotState, StartSessionRequest,
    StartSessionResponse, StatusResponse, SubmitAnswerRequest, SubmitAnswerResponse,
};
use crate::error::{Error, Result};
use crate::models::quiz_session::QuizSession;
use crate::services::catalog_service::{CatalogService, EligibilityFilter};
use crate::services::question_selector::QuestionSelector;
use crate::services::scoring::{ScoreSummary, ScoringEngine};
use crate::services::session_store::{NewSession, SessionStore};
use crate::utils::token::generate_session_token;

const DIFFICULTY_LEVELS: [&str; 5] = ["random", "easy", "medium", "hard", "expert"];
const QUIZ_MODES: [&str; 2] = ["educational", "exam"];

/// Fully typed session configuration with defaults applied at construction.
#[derive(Debug, Clone)]
pub struct SessionConfig {
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

impl SessionConfig {
    pub fn from_request(req: StartSessionRequest) -> Result<Self> {
        let user_id = req
            .user_id
            .ok_or_else(|| Error::BadRequest("user_id is required".to_string()))?;
        let grade_id = req
            .grade_id
            .ok_or_else(|| Error::BadRequest("grade_id is required".to_string()))?;
        let subject_id = req
            .subject_id
            .ok_or_else(|| Error::BadRequest("subject_id is required".to_string()))?;

        let difficulty_level = req
            .difficulty_level
            .unwrap_or_else(|| "random".to_string());
        if !DIFFICULTY_LEVELS.contains(&difficulty_level.as_str()) {
            return Err(Error::BadRequest(format!(
                "Unknown difficulty level: {}",
                difficulty_level
            )));
        }

        let quiz_mode = req.quiz_mode.unwrap_or_else(|| "educational".to_string());
        if !QUIZ_MODES.contains(&quiz_mode.as_str()) {
            return Err(Error::BadRequest(format!("Unknown quiz mode: {}", quiz_mode)));
        }

        Ok(Self {
            user_id,
            grade_id,
            subject_id,
            unit_id: req.unit_id,
            topic_id: req.topic_id,
            difficulty_level,
            timer_enabled: req.timer_enabled.unwrap_or(true),
            timer_duration_minutes: req.timer_duration_minutes.unwrap_or(30),
            quiz_mode,
            question_count: req.question_count.unwrap_or(10),
        })
    }

    fn eligibility_filter(&self) -> EligibilityFilter {
        EligibilityFilter {
            grade_id: self.grade_id,
            subject_id: self.subject_id,
            unit_id: self.unit_id,
            topic_id: self.topic_id,
            difficulty_level: if self.difficulty_level == "random" {
                None
            } else {
                Some(self.difficulty_level.clone())
            },
        }
    }
}

/// Session lifecycle controller: start, answer, complete, report. All
/// collaborators are injected once at process start.
#[derive(Clone)]
pub struct SessionService {
    store: SessionStore,
    selector: QuestionSelector,
    catalog: CatalogService,
}

impl SessionService {
    pub fn new(store: SessionStore, selector: QuestionSelector, catalog: CatalogService) -> Self {
        Self {
            store,
            selector,
            catalog,
        }
    }

    pub async fn start_session(&self, config: SessionConfig) -> Result<StartSessionResponse> {
        self.catalog.require_user(config.user_id).await?;
        self.catalog.require_grade(config.grade_id).await?;
        self.catalog
            .require_subject(config.subject_id, config.grade_id)
            .await?;

        let requested = config
            .question_count
            .min(get_config().max_question_count as i32);
        let questions = self
            .selector
            .select(&config.eligibility_filter(), requested as usize)
            .await?;
        let question_ids: Vec<i32> = questions.iter().map(|q| q.id).collect();

        let new = NewSession {
            session_token: generate_session_token(),
            user_id: config.user_id,
            grade_id: config.grade_id,
            subject_id: config.subject_id,
            unit_id: config.unit_id,
            topic_id: config.topic_id,
            difficulty_level: config.difficulty_level,
            timer_enabled: config.timer_enabled,
            timer_duration_minutes: config.timer_duration_minutes,
            quiz_mode: config.quiz_mode,
            question_count: questions.len() as i32,
        };
        let session = self.store.create_with_questions(&new, &question_ids).await?;

        tracing::info!(
            session_token = %session.session_token,
            user_id = session.user_id,
            questions = session.question_count,
            "quiz session started"
        );

        Ok(StartSessionResponse {
            session_token: session.session_token,
            questions_count: session.question_count,
            timer_enabled: session.timer_enabled,
            timer_duration_minutes: session.timer_duration_minutes,
            quiz_mode: session.quiz_mode,
        })
    }

    pub async fn get_session_info(&self, token: &str) -> Result<SessionInfoResponse> {
        let session = self.store.find_by_token(token).await?;
        let slots: Vec<SessionSlotState> = self
            .store
            .list_questions(session.id)
            .await?
            .into_iter()
            .map(|sq| SessionSlotState {
                question_id: sq.question_id,
                question_order: sq.question_order,
                answered: sq.answered_at.is_some(),
            })
            .collect();
        let answered = slots.iter().filter(|s| s.answered).count() as i32;

        Ok(SessionInfoResponse {
            session_token: session.session_token,
            status: session.status,
            grade_id: session.grade_id,
            subject_id: session.subject_id,
            unit_id: session.unit_id,
            topic_id: session.topic_id,
            difficulty_level: session.difficulty_level,
            timer_enabled: session.timer_enabled,
            timer_duration_minutes: session.timer_duration_minutes,
            quiz_mode: session.quiz_mode,
            question_count: session.question_count,
            start_time: session.start_time,
            total_questions: session.question_count,
            answered_questions: answered,
            questions: slots,
        })
    }

    /// Assigned questions in ordinal order; options re-shuffled per fetch and
    /// stripped of correctness flags.
    pub async fn get_session_questions(&self, token: &str) -> Result<SessionQuestionsResponse> {
        let session = self.store.find_by_token(token).await?;
        let rows = self.store.load_answer_rows(session.id).await?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut options = self.catalog.list_active_options(row.question_id).await?;
            options.shuffle(&mut rand::thread_rng());
            questions.push(SessionQuestionView {
                question_id: row.question_id,
                question_order: row.question_order,
                question_text: row.question_text.clone(),
                difficulty_level: row.difficulty_level.clone(),
                options: options
                    .into_iter()
                    .map(|o| OptionView {
                        id: o.id,
                        option_text: o.option_text,
                    })
                    .collect(),
            });
        }

        Ok(SessionQuestionsResponse {
            session_token: session.session_token,
            questions,
        })
    }

    pub async fn submit_answer(
        &self,
        token: &str,
        req: SubmitAnswerRequest,
    ) -> Result<SubmitAnswerResponse> {
        let session = self.store.find_by_token(token).await?;
        if session.status != "active" {
            return Err(Error::InvalidState("Session is not active".to_string()));
        }

        let options = self.catalog.list_active_options(req.question_id).await?;
        let correct = options.iter().find(|o| o.is_correct);

        if let Some(selected_id) = req.selected_option_id {
            if !options.iter().any(|o| o.id == selected_id) {
                return Err(Error::BadRequest(format!(
                    "Option {} does not belong to question {}",
                    selected_id, req.question_id
                )));
            }
        }

        // Absent selection records a skip, which scores as incorrect.
        let is_correct = match (req.selected_option_id, correct) {
            (Some(selected), Some(correct)) => selected == correct.id,
            _ => false,
        };

        let updated = self
            .store
            .update_answer(
                session.id,
                req.question_id,
                req.selected_option_id,
                is_correct,
                0,
                req.time_spent_seconds,
            )
            .await?;
        if !updated {
            return Err(Error::NotFound(format!(
                "Question {} is not part of this session",
                req.question_id
            )));
        }

        // Exam mode withholds the correct answer until the final report.
        let correct_answer = if session.quiz_mode == "educational" {
            correct.map(|o| o.option_text.clone())
        } else {
            None
        };

        Ok(SubmitAnswerResponse {
            question_id: req.question_id,
            is_correct,
            correct_answer,
            points_earned: 0,
        })
    }

    /// Compare-and-set completion. The winner persists the aggregates; every
    /// other caller reproduces the same report from the frozen rows and the
    /// stored aggregate columns.
    pub async fn complete_session(&self, token: &str) -> Result<SessionResult> {
        let session = self.store.find_by_token(token).await?;

        if session.status == "active" {
            let rows = self.store.load_answer_rows(session.id).await?;
            let summary = ScoringEngine::score(&rows);

            let end_time = Utc::now();
            let completion_seconds = (end_time - session.start_time).num_seconds().max(0) as i32;
            let total_score = Decimal::from_f64(summary.total_score)
                .ok_or_else(|| Error::Internal("Score is not representable".to_string()))?;

            let won = self
                .store
                .finalize(
                    session.id,
                    end_time,
                    total_score,
                    summary.correct_answers,
                    completion_seconds,
                    summary.points_per_question,
                )
                .await?;

            if won {
                tracing::info!(
                    session_token = %session.session_token,
                    total_score = summary.total_score,
                    correct = summary.correct_answers,
                    "quiz session completed"
                );
                let score = summary.total_score;
                let correct = summary.correct_answers;
                return Ok(build_result(
                    &session,
                    summary,
                    score,
                    correct,
                    completion_seconds,
                    Some(end_time),
                ));
            }
        }

        // Already completed, or lost the race: report from frozen state.
        let session = self.store.find_by_token(token).await?;
        self.result_from_completed(&session).await
    }

    pub async fn get_session_results(&self, token: &str) -> Result<SessionResult> {
        let session = self.store.find_by_token(token).await?;
        if session.status != "completed" {
            return Err(Error::InvalidState(
                "Session is not completed yet".to_string(),
            ));
        }
        self.result_from_completed(&session).await
    }

    pub async fn get_status(&self, token: &str) -> Result<StatusResponse> {
        let session = self.store.find_by_token(token).await?;
        let answered = self.store.count_answered(session.id).await? as i32;

        Ok(StatusResponse {
            status: session.status,
            start_time: session.start_time,
            remaining_time_seconds: session.remaining_time_seconds,
            questions_answered: answered,
            total_questions: session.question_count,
        })
    }

    /// Store the client-reported countdown. Nothing is enforced server-side;
    /// an expired timer is a client-observed condition.
    pub async fn update_timer(&self, token: &str, remaining_time_seconds: i32) -> Result<StatusResponse> {
        let session = self.store.find_by_token(token).await?;
        if session.status != "active" {
            return Err(Error::InvalidState("Session is not active".to_string()));
        }

        self.store
            .update_timer(session.id, remaining_time_seconds)
            .await?;

        let answered = self.store.count_answered(session.id).await? as i32;
        Ok(StatusResponse {
            status: session.status,
            start_time: session.start_time,
            remaining_time_seconds: Some(remaining_time_seconds),
            questions_answered: answered,
            total_questions: session.question_count,
        })
    }

    async fn result_from_completed(&self, session: &QuizSession) -> Result<SessionResult> {
        let rows = self.store.load_answer_rows(session.id).await?;
        let summary = ScoringEngine::score(&rows);

        let total_score = session
            .total_score
            .as_ref()
            .and_then(|d| d.to_f64())
            .unwrap_or(summary.total_score);
        let correct_answers = session.correct_answers.unwrap_or(summary.correct_answers);
        let completion_seconds = session.completion_time_seconds.unwrap_or(0);
        let end_time = session.end_time;

        Ok(build_result(
            session,
            summary,
            total_score,
            correct_answers,
            completion_seconds,
            end_time,
        ))
    }
}

fn build_result(
    session: &QuizSession,
    summary: ScoreSummary,
    total_score: f64,
    correct_answers: i32,
    completion_time_seconds: i32,
    end_time: Option<DateTime<Utc>>,
) -> SessionResult {
    SessionResult {
        total_score,
        score_percentage: total_score,
        correct_answers,
        correct_percentage: summary.correct_percentage,
        total_questions: summary.total_questions,
        answered_questions: summary.answered_questions,
        completion_time_seconds,
        average_difficulty: summary.average_difficulty,
        questions: summary.questions,
        subjects: summary.subjects,
        difficulty: summary.difficulty,
        recommendations: summary.recommendations,
        session_info: ResultSessionInfo {
            session_token: session.session_token.clone(),
            grade_id: session.grade_id,
            subject_id: session.subject_id,
            difficulty_level: session.difficulty_level.clone(),
            quiz_mode: session.quiz_mode.clone(),
            start_time: session.start_time,
            end_time,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request() -> StartSessionRequest {
        StartSessionRequest {
            user_id: Some(1),
            grade_id: Some(5),
            subject_id: Some(1),
            unit_id: None,
            topic_id: None,
            difficulty_level: None,
            timer_enabled: None,
            timer_duration_minutes: None,
            quiz_mode: None,
            question_count: None,
        }
    }

    #[test]
    fn config_applies_documented_defaults() {
        let config = SessionConfig::from_request(base_request()).expect("valid request");

        assert_eq!(config.difficulty_level, "random");
        assert!(config.timer_enabled);
        assert_eq!(config.timer_duration_minutes, 30);
        assert_eq!(config.quiz_mode, "educational");
        assert_eq!(config.question_count, 10);
    }

    #[test]
    fn config_requires_grade_and_subject() {
        let mut req = base_request();
        req.grade_id = None;
        assert!(matches!(
            SessionConfig::from_request(req),
            Err(Error::BadRequest(_))
        ));

        let mut req = base_request();
        req.subject_id = None;
        assert!(matches!(
            SessionConfig::from_request(req),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn config_rejects_unknown_enums() {
        let mut req = base_request();
        req.difficulty_level = Some("impossible".to_string());
        assert!(matches!(
            SessionConfig::from_request(req),
            Err(Error::BadRequest(_))
        ));

        let mut req = base_request();
        req.quiz_mode = Some("speedrun".to_string());
        assert!(matches!(
            SessionConfig::from_request(req),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn random_difficulty_means_no_filter() {
        let config = SessionConfig::from_request(base_request()).expect("valid request");
        assert_eq!(config.eligibility_filter().difficulty_level, None);

        let mut req = base_request();
        req.difficulty_level = Some("hard".to_string());
        let config = SessionConfig::from_request(req).expect("valid request");
        assert_eq!(
            config.eligibility_filter().difficulty_level,
            Some("hard".to_string())
        );
    }
}

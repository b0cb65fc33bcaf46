use std::collections::HashMap;
use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, patch, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup_app() -> (Router, PgPool) {
    dotenvy::dotenv().ok();
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("QUIZ_API_RPS", "1000");
    env::set_var("MAX_QUESTION_COUNT", "50");

    // Several tests share the binary; only the first init wins.
    let _ = quiz_backend::config::init_config();

    let pool = quiz_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");

    let app_state = quiz_backend::AppState::new(pool.clone());
    let app = Router::new()
        .route(
            "/api/quiz/session/start",
            post(quiz_backend::routes::quiz::start_session),
        )
        .route(
            "/api/quiz/session/:token",
            get(quiz_backend::routes::quiz::get_session),
        )
        .route(
            "/api/quiz/session/:token/questions",
            get(quiz_backend::routes::quiz::get_session_questions),
        )
        .route(
            "/api/quiz/session/:token/answer",
            post(quiz_backend::routes::quiz::submit_answer),
        )
        .route(
            "/api/quiz/session/:token/complete",
            post(quiz_backend::routes::quiz::complete_session),
        )
        .route(
            "/api/quiz/session/:token/results",
            get(quiz_backend::routes::quiz::get_session_results),
        )
        .route(
            "/api/quiz/session/:token/status",
            get(quiz_backend::routes::quiz::get_session_status),
        )
        .route(
            "/api/quiz/session/:token/timer",
            patch(quiz_backend::routes::quiz::update_timer),
        )
        .route(
            "/api/quiz/grades",
            get(quiz_backend::routes::catalog::list_grades),
        )
        .layer(axum::middleware::from_fn_with_state(
            quiz_backend::middleware::rate_limit::new_rps_state(1000),
            quiz_backend::middleware::rate_limit::rps_middleware,
        ))
        .with_state(app_state);

    (app, pool)
}

struct SeededCatalog {
    user_id: i32,
    grade_id: i32,
    subject_id: i32,
    /// question id -> id of its correct option
    correct_options: HashMap<i32, i32>,
}

async fn seed_catalog(pool: &PgPool, question_count: usize) -> SeededCatalog {
    let tag = Uuid::new_v4().simple().to_string();

    let grade_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO grades (name, level) VALUES ($1, 5) RETURNING id",
    )
    .bind(format!("Grade {}", tag))
    .fetch_one(pool)
    .await
    .expect("seed grade");

    let subject_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO subjects (grade_id, name, code) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(grade_id)
    .bind("Mathematics")
    .bind(format!("MATH-{}", tag))
    .fetch_one(pool)
    .await
    .expect("seed subject");

    let user_id = sqlx::query_scalar::<_, i32>(
        "INSERT INTO users (username, email) VALUES ($1, $2) RETURNING id",
    )
    .bind(format!("learner_{}", tag))
    .bind(format!("learner_{}@example.com", tag))
    .fetch_one(pool)
    .await
    .expect("seed user");

    let mut correct_options = HashMap::new();
    for n in 0..question_count {
        let question_id = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO questions (grade_id, subject_id, question_text, difficulty_level, explanation)
            VALUES ($1, $2, $3, 'medium', 'Worked example.')
            RETURNING id
            "#,
        )
        .bind(grade_id)
        .bind(subject_id)
        .bind(format!("What is {} + {}?", n, n))
        .fetch_one(pool)
        .await
        .expect("seed question");

        for (order, text) in ["A", "B", "C", "D"].iter().enumerate() {
            let is_correct = order == 0;
            let option_id = sqlx::query_scalar::<_, i32>(
                r#"
                INSERT INTO question_options (question_id, option_text, is_correct, display_order)
                VALUES ($1, $2, $3, $4)
                RETURNING id
                "#,
            )
            .bind(question_id)
            .bind(format!("Answer {}", text))
            .bind(is_correct)
            .bind(order as i32)
            .fetch_one(pool)
            .await
            .expect("seed option");

            if is_correct {
                correct_options.insert(question_id, option_id);
            }
        }
    }

    SeededCatalog {
        user_id,
        grade_id,
        subject_id,
        correct_options,
    }
}

async fn post_json(app: &Router, uri: &str, body: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, value)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null);
    (status, value)
}

#[tokio::test]
async fn quiz_flow_end_to_end() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 20).await;

    let (status, started) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id,
            "question_count": 5,
            "difficulty_level": "random"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["questions_count"], 5);
    assert_eq!(started["quiz_mode"], "educational");
    let token = started["session_token"].as_str().expect("token").to_string();

    let (status, questions) =
        get_json(&app, &format!("/api/quiz/session/{}/questions", token)).await;
    assert_eq!(status, StatusCode::OK);
    let question_list = questions["questions"].as_array().expect("questions");
    assert_eq!(question_list.len(), 5);
    for q in question_list {
        let options = q["options"].as_array().expect("options");
        assert_eq!(options.len(), 4);
        // Correctness must never leak into the taking view.
        assert!(options.iter().all(|o| o.get("is_correct").is_none()));
    }

    // Answer the first three correctly, leave two untouched.
    for q in question_list.iter().take(3) {
        let question_id = q["question_id"].as_i64().expect("question id") as i32;
        let correct_option = seeded.correct_options[&question_id];
        let (status, answer) = post_json(
            &app,
            &format!("/api/quiz/session/{}/answer", token),
            json!({
                "question_id": question_id,
                "selected_option_id": correct_option,
                "time_spent_seconds": 9
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(answer["is_correct"], true);
        assert_eq!(answer["points_earned"], 0);
        assert!(answer["correct_answer"].is_string());
    }

    let (status, session_status) =
        get_json(&app, &format!("/api/quiz/session/{}/status", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session_status["status"], "active");
    assert_eq!(session_status["questions_answered"], 3);
    assert_eq!(session_status["total_questions"], 5);

    let (status, info) = get_json(&app, &format!("/api/quiz/session/{}", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["answered_questions"], 3);
    let slots = info["questions"].as_array().expect("slot states");
    assert_eq!(slots.len(), 5);
    assert_eq!(
        slots.iter().filter(|s| s["answered"] == true).count(),
        3
    );

    let (status, result) = post_json(
        &app,
        &format!("/api/quiz/session/{}/complete", token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(result["total_score"], 60.0);
    assert_eq!(result["correct_answers"], 3);
    assert_eq!(result["correct_percentage"], 60.0);
    assert_eq!(result["total_questions"], 5);
    assert_eq!(result["answered_questions"], 3);
    assert_eq!(result["recommendations"].as_array().unwrap().len(), 3);
    assert_eq!(result["subjects"]["Mathematics"], 60.0);

    let statuses: Vec<&str> = result["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses.iter().filter(|s| **s == "correct").count(), 3);
    assert_eq!(statuses.iter().filter(|s| **s == "skipped").count(), 2);

    // Completing again yields the same aggregates.
    let (status, again) = post_json(
        &app,
        &format!("/api/quiz/session/{}/complete", token),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["total_score"], 60.0);
    assert_eq!(again["correct_answers"], 3);
    assert_eq!(again["completion_time_seconds"], result["completion_time_seconds"]);

    let (status, fetched) = get_json(&app, &format!("/api/quiz/session/{}/results", token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["total_score"], 60.0);

    // Answering after completion is rejected.
    let question_id = question_list[4]["question_id"].as_i64().unwrap() as i32;
    let (status, _) = post_json(
        &app,
        &format!("/api/quiz/session/{}/answer", token),
        json!({
            "question_id": question_id,
            "selected_option_id": seeded.correct_options[&question_id]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn degraded_start_uses_all_eligible_questions() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 4).await;

    let (status, started) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id,
            "question_count": 10
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(started["questions_count"], 4);
}

#[tokio::test]
async fn empty_scope_fails_with_not_found_and_persists_nothing() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 0).await;

    let (status, body) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id
        }),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"]
        .as_str()
        .unwrap_or_default()
        .contains("No questions"));

    let sessions = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM quiz_sessions WHERE user_id = $1",
    )
    .bind(seeded.user_id)
    .fetch_one(&pool)
    .await
    .expect("count sessions");
    assert_eq!(sessions, 0);
}

#[tokio::test]
async fn resubmission_overwrites_previous_answer() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 2).await;

    let (status, started) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id,
            "question_count": 2
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = started["session_token"].as_str().unwrap().to_string();

    let (_, questions) = get_json(&app, &format!("/api/quiz/session/{}/questions", token)).await;
    let first = &questions["questions"][0];
    let question_id = first["question_id"].as_i64().unwrap() as i32;
    let correct_option = seeded.correct_options[&question_id];
    let wrong_option = first["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_i64().unwrap() as i32)
        .find(|id| *id != correct_option)
        .expect("a wrong option");

    let (_, answer) = post_json(
        &app,
        &format!("/api/quiz/session/{}/answer", token),
        json!({"question_id": question_id, "selected_option_id": wrong_option}),
    )
    .await;
    assert_eq!(answer["is_correct"], false);

    let (_, answer) = post_json(
        &app,
        &format!("/api/quiz/session/{}/answer", token),
        json!({"question_id": question_id, "selected_option_id": correct_option}),
    )
    .await;
    assert_eq!(answer["is_correct"], true);

    let (_, result) = post_json(
        &app,
        &format!("/api/quiz/session/{}/complete", token),
        json!({}),
    )
    .await;
    assert_eq!(result["correct_answers"], 1);
    assert_eq!(result["total_score"], 50.0);
}

#[tokio::test]
async fn skip_and_timer_updates_are_recorded() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 2).await;

    let (status, started) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id,
            "question_count": 2,
            "timer_duration_minutes": 10
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = started["session_token"].as_str().unwrap().to_string();

    let (_, questions) = get_json(&app, &format!("/api/quiz/session/{}/questions", token)).await;
    let question_id = questions["questions"][0]["question_id"].as_i64().unwrap() as i32;

    // No selected option: an explicit skip, scored incorrect.
    let (status, answer) = post_json(
        &app,
        &format!("/api/quiz/session/{}/answer", token),
        json!({"question_id": question_id, "time_spent_seconds": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(answer["is_correct"], false);

    let (status, timer) = {
        let req = Request::builder()
            .method("PATCH")
            .uri(format!("/api/quiz/session/{}/timer", token))
            .header("content-type", "application/json")
            .body(Body::from(json!({"remaining_time_seconds": 123}).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice::<JsonValue>(&bytes).unwrap())
    };
    assert_eq!(status, StatusCode::OK);
    assert_eq!(timer["remaining_time_seconds"], 123);

    let (_, session_status) = get_json(&app, &format!("/api/quiz/session/{}/status", token)).await;
    assert_eq!(session_status["remaining_time_seconds"], 123);
    assert_eq!(session_status["questions_answered"], 1);

    let (_, result) = post_json(
        &app,
        &format!("/api/quiz/session/{}/complete", token),
        json!({}),
    )
    .await;
    assert_eq!(result["correct_answers"], 0);
    assert_eq!(result["answered_questions"], 1);
    let statuses: Vec<&str> = result["questions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"skipped"));
}

#[tokio::test]
async fn results_require_a_completed_session() {
    let (app, pool) = setup_app().await;
    let seeded = seed_catalog(&pool, 2).await;

    let (_, started) = post_json(
        &app,
        "/api/quiz/session/start",
        json!({
            "user_id": seeded.user_id,
            "grade_id": seeded.grade_id,
            "subject_id": seeded.subject_id,
            "question_count": 2
        }),
    )
    .await;
    let token = started["session_token"].as_str().unwrap().to_string();

    let (status, _) = get_json(&app, &format!("/api/quiz/session/{}/results", token)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = get_json(&app, "/api/quiz/session/quiz_missing/results").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

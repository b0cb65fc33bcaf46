use std::collections::BTreeMap;

use crate::dto::quiz_dto::{QuestionReview, Recommendation};
use crate::services::session_store::SessionAnswerRow;

/// Aggregate pass output. `total_score` is normalized to a 0..100 scale
/// regardless of question count; `points_per_question` is the rounded
/// per-slot share written back to correct rows at finalization.
#[derive(Debug, Clone)]
pub struct ScoreSummary {
    pub total_questions: i32,
    pub answered_questions: i32,
    pub correct_answers: i32,
    pub total_score: f64,
    pub score_percentage: f64,
    pub correct_percentage: f64,
    pub points_per_question: i32,
    pub average_difficulty: String,
    pub subjects: BTreeMap<String, f64>,
    pub difficulty: BTreeMap<String, f64>,
    pub questions: Vec<QuestionReview>,
    pub recommendations: Vec<Recommendation>,
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Full aggregate pass over a session's answer rows. Pure: any missing
    /// catalog data (e.g. no correct option on file) degrades to incorrect
    /// instead of failing the completion.
    pub fn score(rows: &[SessionAnswerRow]) -> ScoreSummary {
        let total_questions = rows.len() as i32;
        let answered_questions = rows.iter().filter(|r| r.answered_at.is_some()).count() as i32;
        let correct_answers = rows
            .iter()
            .filter(|r| r.is_correct == Some(true))
            .count() as i32;

        let points_per_question_f = if total_questions > 0 {
            100.0 / f64::from(total_questions)
        } else {
            0.0
        };
        let total_score = round2(f64::from(correct_answers) * points_per_question_f);
        let score_percentage = total_score;
        let correct_percentage = if total_questions > 0 {
            round2(f64::from(correct_answers) / f64::from(total_questions) * 100.0)
        } else {
            0.0
        };

        let subjects = subject_accuracy(rows);
        let difficulty = difficulty_distribution(rows);
        let recommendations = build_recommendations(score_percentage, &subjects, &difficulty);

        ScoreSummary {
            total_questions,
            answered_questions,
            correct_answers,
            total_score,
            score_percentage,
            correct_percentage,
            points_per_question: points_per_question_f.round() as i32,
            average_difficulty: average_difficulty_label(rows),
            subjects,
            difficulty,
            questions: rows.iter().map(question_review).collect(),
            recommendations,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn difficulty_rank(level: &str) -> f64 {
    match level {
        "easy" => 1.0,
        "medium" => 2.0,
        "hard" => 3.0,
        "expert" => 4.0,
        _ => 2.0,
    }
}

/// Mean ordinal difficulty bucketed into a label with half-integer
/// boundaries: <=1.5 easy, <=2.5 medium, <=3.5 hard, else expert.
fn average_difficulty_label(rows: &[SessionAnswerRow]) -> String {
    if rows.is_empty() {
        return "medium".to_string();
    }
    let sum: f64 = rows.iter().map(|r| difficulty_rank(&r.difficulty_level)).sum();
    let avg = sum / rows.len() as f64;

    let label = if avg <= 1.5 {
        "easy"
    } else if avg <= 2.5 {
        "medium"
    } else if avg <= 3.5 {
        "hard"
    } else {
        "expert"
    };
    label.to_string()
}

/// Accuracy per subject name. Skipped slots count in the denominator but
/// never in the numerator.
fn subject_accuracy(rows: &[SessionAnswerRow]) -> BTreeMap<String, f64> {
    let mut totals: BTreeMap<String, (i32, i32)> = BTreeMap::new();
    for row in rows {
        let entry = totals.entry(row.subject_name.clone()).or_insert((0, 0));
        entry.0 += 1;
        if row.is_correct == Some(true) {
            entry.1 += 1;
        }
    }

    totals
        .into_iter()
        .map(|(name, (total, correct))| {
            (name, round2(f64::from(correct) / f64::from(total) * 100.0))
        })
        .collect()
}

/// Share of questions at each difficulty level. A distribution of what was
/// encountered, not an accuracy measure.
fn difficulty_distribution(rows: &[SessionAnswerRow]) -> BTreeMap<String, f64> {
    if rows.is_empty() {
        return BTreeMap::new();
    }
    let mut counts: BTreeMap<String, i32> = BTreeMap::new();
    for row in rows {
        *counts.entry(row.difficulty_level.clone()).or_insert(0) += 1;
    }

    let total = rows.len() as f64;
    counts
        .into_iter()
        .map(|(level, count)| (level, round2(f64::from(count) / total * 100.0)))
        .collect()
}

fn question_review(row: &SessionAnswerRow) -> QuestionReview {
    let status = if row.selected_option_id.is_none() {
        "skipped"
    } else if row.is_correct == Some(true) {
        "correct"
    } else {
        "incorrect"
    };

    QuestionReview {
        question_text: row.question_text.clone(),
        subject: row.subject_name.clone(),
        topic: row.topic_name.clone(),
        difficulty: row.difficulty_level.clone(),
        status: status.to_string(),
        time_spent_seconds: row.time_spent_seconds.unwrap_or(0),
        user_answer: row.user_answer.clone(),
        correct_answer: row.correct_answer.clone(),
        explanation: row.explanation.clone(),
    }
}

fn recommendation(
    icon: &str,
    title: &str,
    description: String,
    action_text: &str,
    action_url: &str,
) -> Recommendation {
    Recommendation {
        icon: icon.to_string(),
        title: title.to_string(),
        description,
        action_text: action_text.to_string(),
        action_url: action_url.to_string(),
    }
}

/// Always exactly three recommendations, in generation order: score-based
/// first, then weakest subject, then difficulty profile, then generic
/// backfill.
fn build_recommendations(
    score_percentage: f64,
    subjects: &BTreeMap<String, f64>,
    difficulty: &BTreeMap<String, f64>,
) -> Vec<Recommendation> {
    let mut recs: Vec<Recommendation> = Vec::new();

    if score_percentage < 60.0 {
        recs.push(recommendation(
            "book",
            "Keep Practicing",
            format!(
                "You scored {:.1}%. Reviewing the material and retrying will raise it quickly.",
                score_percentage
            ),
            "Start a practice quiz",
            "/quiz/start",
        ));
    } else if score_percentage >= 85.0 {
        recs.push(recommendation(
            "trophy",
            "Excellent Performance",
            format!(
                "You scored {:.1}%. Move up a difficulty level to keep being challenged.",
                score_percentage
            ),
            "Try a harder quiz",
            "/quiz/start?difficulty=hard",
        ));
    }

    let weakest = subjects
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .filter(|(_, accuracy)| **accuracy < 70.0);
    if let Some((subject, accuracy)) = weakest {
        recs.push(recommendation(
            "target",
            "Focus Your Weakest Subject",
            format!(
                "Your accuracy in {} was {:.1}%. Targeted practice there will pay off most.",
                subject, accuracy
            ),
            &format!("Practice {}", subject),
            "/quiz/start",
        ));
    }

    if difficulty.get("hard").copied().unwrap_or(0.0) > 50.0 {
        recs.push(recommendation(
            "star",
            "Strong on Hard Questions",
            "More than half of this quiz was hard questions. You handle difficulty well."
                .to_string(),
            "Take on expert questions",
            "/quiz/start?difficulty=expert",
        ));
    }

    let backfill = [
        recommendation(
            "list",
            "Review Your Mistakes",
            "Walk through the questions you missed and read the explanations.".to_string(),
            "Review answers",
            "/quiz/results",
        ),
        recommendation(
            "calendar",
            "Stay Consistent",
            "A short quiz every day builds lasting mastery.".to_string(),
            "Start today's quiz",
            "/quiz/start",
        ),
        recommendation(
            "compass",
            "Explore New Topics",
            "Branch out into topics you have not covered yet.".to_string(),
            "Browse topics",
            "/quiz/start",
        ),
    ];
    for rec in backfill {
        if recs.len() >= 3 {
            break;
        }
        recs.push(rec);
    }

    recs.truncate(3);
    recs
}

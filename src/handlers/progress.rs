use axum::{
    extract::{Path, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::AnswerEvent,
    extractors::AuthGuard,
    hierarchy, names,
    rejections::{AppError, ResultExt},
    utils, AppState,
};
use crate::models::{FreeStyleProgress, GuidedProgress, SaveOutcome};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(names::SAVE_PROGRESS_URL, post(save_progress))
        .route(names::GUIDED_SYNC_URL, post(guided_sync))
        .route(names::FREE_STYLE_SYNC_URL, post(free_style_sync))
        .route(
            "/api/progress/guided-learning/{plan_id}",
            get(get_guided_progress),
        )
        .route(names::FREE_STYLE_PROGRESS_URL, get(get_free_style_progress))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveProgressBody {
    user_id: String,
    #[serde(default)]
    #[allow(dead_code)]
    session_id: Option<String>,
    // Older clients send snake_case here
    #[serde(default, alias = "question_id")]
    question_id: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    answer: Option<serde_json::Value>,
    #[serde(default)]
    is_correct: Option<bool>,
    #[serde(default)]
    time_spent: Option<i64>,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    timestamp: Option<String>,
    #[serde(default)]
    learning_mode: Option<String>,
    #[serde(default)]
    plan_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SaveProgressResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress_id: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
}

/// Record one answer event. The durable insert is soft-fail: a backend error
/// degrades to a success response with a warning so the learner's flow is
/// never blocked. The plan-counter side effect is soft-fail as well.
async fn save_progress(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<SaveProgressBody>,
) -> Result<impl IntoResponse, AppError> {
    // Asserted identity must match the authenticated principal, regardless of
    // payload validity.
    if body.user_id != user.id {
        return Err(AppError::AuthMismatch);
    }

    let question_id = body
        .question_id
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("questionId is required".to_string()))?;
    let is_correct = body
        .is_correct
        .ok_or_else(|| AppError::Validation("isCorrect is required".to_string()))?;

    let outcome = match state
        .db
        .record_answer(AnswerEvent {
            user_id: &user.id,
            question_id,
            is_correct,
            time_spent: body.time_spent,
            section: body.section.as_deref(),
            difficulty: body.difficulty.as_deref(),
            learning_mode: body.learning_mode.as_deref(),
            plan_id: body.plan_id.as_deref(),
        })
        .await
    {
        Ok(progress_id) => SaveOutcome::Persisted(progress_id),
        Err(e) => {
            tracing::error!("progress insert failed, degrading to soft success: {e}");
            SaveOutcome::Degraded("progress accepted but not confirmed durable".to_string())
        }
    };

    if body.learning_mode.as_deref() == Some(names::GUIDED_MODE) {
        if let Some(plan_id) = body.plan_id.as_deref() {
            match state.db.increment_plan_progress(plan_id).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("plan {plan_id} not found, skipping counter update");
                }
                Err(e) => {
                    tracing::warn!("plan counter update failed for {plan_id}: {e}");
                }
            }
        }
    }

    let (progress_id, warning) = match outcome {
        SaveOutcome::Persisted(id) => (Some(id), None),
        SaveOutcome::Degraded(reason) => (None, Some(reason)),
    };

    let summary = match state.db.user_progress_stats(&user.id).await {
        Ok(stats) => format!("{}:{}", stats.total_answered, stats.total_correct),
        Err(_) => "0:0".to_string(),
    };
    let cookie = utils::cookie(
        names::PROGRESS_SUMMARY_COOKIE_NAME,
        &summary,
        names::PROGRESS_SUMMARY_COOKIE_MAX_AGE,
        state.secure_cookies,
    );

    Ok((
        [(SET_COOKIE, cookie)],
        Json(SaveProgressResponse {
            success: true,
            progress_id,
            message: "progress saved".to_string(),
            warning,
        }),
    ))
}

#[derive(Serialize)]
struct SyncResponse {
    success: bool,
}

/// Accept a guided-mode progress record pushed up from a client outbox.
/// Re-sends are absorbed by the upsert; the stored position is clamped
/// against the plan's current hierarchy shape.
async fn guided_sync(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<GuidedProgress>,
) -> Result<Json<SyncResponse>, AppError> {
    if body.plan_id.is_empty() {
        return Err(AppError::Validation("planId is required".to_string()));
    }

    state
        .db
        .get_plan(&body.plan_id)
        .await
        .reject("could not look up plan")?
        .ok_or(AppError::NotFound)?;

    let tree = state
        .db
        .plan_hierarchy(&body.plan_id)
        .await
        .reject("could not assemble plan hierarchy")?;
    let position = hierarchy::clamp_position(&body.current_position, &tree);

    state
        .db
        .upsert_plan_progress(&user.id, &body, &position)
        .await
        .reject("could not upsert plan progress")?;

    Ok(Json(SyncResponse { success: true }))
}

async fn free_style_sync(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Json(body): Json<FreeStyleProgress>,
) -> Result<Json<SyncResponse>, AppError> {
    state
        .db
        .upsert_free_style_progress(&user.id, &body)
        .await
        .reject("could not upsert free-style progress")?;

    Ok(Json(SyncResponse { success: true }))
}

#[derive(Serialize)]
struct GuidedProgressResponse {
    success: bool,
    data: Option<GuidedProgress>,
}

async fn get_guided_progress(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
    Path(plan_id): Path<String>,
) -> Result<Json<GuidedProgressResponse>, AppError> {
    let data = state
        .db
        .get_plan_progress(&user.id, &plan_id)
        .await
        .reject("could not read plan progress")?;

    Ok(Json(GuidedProgressResponse {
        success: true,
        data,
    }))
}

#[derive(Serialize)]
struct FreeStyleProgressResponse {
    success: bool,
    data: Option<FreeStyleProgress>,
}

async fn get_free_style_progress(
    AuthGuard(user): AuthGuard,
    State(state): State<AppState>,
) -> Result<Json<FreeStyleProgressResponse>, AppError> {
    let data = state
        .db
        .get_free_style_progress(&user.id)
        .await
        .reject("could not read free-style progress")?;

    Ok(Json(FreeStyleProgressResponse {
        success: true,
        data,
    }))
}

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use common::{create_test_db, make_card, seed_user};
use prepdeck::{db::Db, names, router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app(db: Db) -> axum::Router {
    router(AppState {
        db,
        secure_cookies: false,
    })
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// --- Hierarchy endpoint ---

#[tokio::test]
async fn hierarchy_of_unknown_plan_is_404() {
    let app = app(create_test_db().await);
    let resp = app
        .oneshot(get(&names::plan_hierarchy_url("missing")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn hierarchy_of_empty_plan_is_success_with_empty_data() {
    let db = create_test_db().await;
    let plan_id = db.create_plan("Empty", None, &[]).await.unwrap();

    let resp = app(db)
        .oneshot(get(&names::plan_hierarchy_url(&plan_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn hierarchy_returns_nested_tree() {
    let db = create_test_db().await;
    let card_id = db.load_card(make_card("React", 1, 1, 2)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    let resp = app(db)
        .oneshot(get(&names::plan_hierarchy_url(&plan_id)))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let questions = &body["data"][0]["categories"][0]["topics"][0]["questions"];
    assert_eq!(questions.as_array().unwrap().len(), 2);
    assert_eq!(questions[0]["options"][0]["isCorrect"], json!(true));
}

// --- Progress save endpoint ---

fn save_body(user_id: &str) -> Value {
    json!({
        "userId": user_id,
        "questionId": "q-1",
        "isCorrect": true,
        "timeSpent": 30,
        "section": "react",
        "difficulty": "easy",
    })
}

#[tokio::test]
async fn save_progress_requires_authentication() {
    let app = app(create_test_db().await);
    let resp = app
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            None,
            &save_body("someone"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn save_progress_rejects_mismatched_user_id() {
    let db = create_test_db().await;
    let (_, token) = seed_user(&db).await;

    let resp = app(db)
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &save_body("someone-else"),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn save_progress_rejects_mismatched_user_even_with_invalid_payload() {
    let db = create_test_db().await;
    let (_, token) = seed_user(&db).await;

    // No questionId, no isCorrect: the auth boundary still comes first
    let resp = app(db)
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &json!({"userId": "someone-else"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn save_progress_validates_required_fields() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;

    let mut body = save_body(&user_id);
    body.as_object_mut().unwrap().remove("questionId");
    let resp = app(db.clone())
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut body = save_body(&user_id);
    body.as_object_mut().unwrap().remove("isCorrect");
    let resp = app(db)
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn save_progress_persists_and_sets_summary_cookie() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;

    let resp = app(db.clone())
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &save_body(&user_id),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get(header::SET_COOKIE)
        .expect("progress-summary cookie should be set")
        .to_str()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with(names::PROGRESS_SUMMARY_COOKIE_NAME));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("HttpOnly"));
    assert!(
        !cookie.contains("Secure"),
        "Secure only applies with secure_cookies on"
    );

    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["progressId"].is_string());
    assert!(body.get("warning").is_none());

    let stats = db.user_progress_stats(&user_id).await.unwrap();
    assert_eq!(stats.total_answered, 1);
    assert_eq!(stats.total_correct, 1);
}

#[tokio::test]
async fn save_progress_degrades_to_warning_when_insert_fails() {
    let (db, path) = common::create_test_db_with_path().await;
    let (user_id, token) = seed_user(&db).await;

    // Sever the durable path underneath the running app
    let raw = libsql::Builder::new_local(&path).build().await.unwrap();
    raw.connect()
        .unwrap()
        .execute("DROP TABLE progress_log", ())
        .await
        .unwrap();

    let resp = app(db)
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &save_body(&user_id),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK, "the learner is never blocked");

    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["warning"].is_string(), "degraded save carries a warning");
    assert!(
        body.get("progressId").is_none(),
        "no id without a confirmed insert"
    );
}

#[tokio::test]
async fn save_progress_accepts_snake_case_question_id() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;

    let body = json!({
        "userId": user_id,
        "question_id": "q-legacy",
        "isCorrect": false,
    });
    let resp = app(db)
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn free_style_save_does_not_touch_plan_counter() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;
    let card_id = db.load_card(make_card("F", 1, 1, 2)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    let mut body = save_body(&user_id);
    body.as_object_mut().unwrap().insert(
        "learningMode".to_string(),
        json!(names::FREE_STYLE_MODE),
    );
    body.as_object_mut()
        .unwrap()
        .insert("planId".to_string(), json!(plan_id));

    let resp = app(db.clone())
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let plan = db.get_plan(&plan_id).await.unwrap().unwrap();
    assert_eq!(plan.questions_completed, 0, "only guided mode advances plans");
}

#[tokio::test]
async fn deleted_session_token_no_longer_authenticates() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;

    let resp = app(db.clone())
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &save_body(&user_id),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    db.delete_session_token(&token).await.unwrap();

    let resp = app(db)
        .oneshot(post_json(
            names::SAVE_PROGRESS_URL,
            Some(&token),
            &save_body(&user_id),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn guided_save_with_missing_plan_still_succeeds() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;

    let mut body = save_body(&user_id);
    body.as_object_mut().unwrap().insert(
        "learningMode".to_string(),
        json!(names::GUIDED_MODE),
    );
    body.as_object_mut()
        .unwrap()
        .insert("planId".to_string(), json!("no-such-plan"));

    let resp = app(db.clone())
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let response = json_body(resp).await;
    assert_eq!(response["success"], json!(true));

    // The answer itself still landed in the log
    let stats = db.user_progress_stats(&user_id).await.unwrap();
    assert_eq!(stats.total_answered, 1);
}

#[tokio::test]
async fn guided_save_advances_plan_counter() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;
    let card_id = db.load_card(make_card("C", 1, 1, 2)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    let mut body = save_body(&user_id);
    body.as_object_mut().unwrap().insert(
        "learningMode".to_string(),
        json!(names::GUIDED_MODE),
    );
    body.as_object_mut()
        .unwrap()
        .insert("planId".to_string(), json!(plan_id));

    let resp = app(db.clone())
        .oneshot(post_json(names::SAVE_PROGRESS_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let plan = db.get_plan(&plan_id).await.unwrap().unwrap();
    assert_eq!(plan.questions_completed, 1);
    assert_eq!(plan.progress, 50);
}

// --- Sync endpoints ---

#[tokio::test]
async fn guided_sync_is_idempotent() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;
    let card_id = db.load_card(make_card("S", 1, 1, 3)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    let body = json!({
        "planId": plan_id,
        "completedQuestions": ["q1", "q2"],
        "correctAnswers": ["q1"],
        "currentPosition": {
            "cardIndex": 0, "categoryIndex": 0, "topicIndex": 0, "questionIndex": 2
        },
        "lastUpdated": "2026-08-20 10:00:00",
    });

    for _ in 0..2 {
        let resp = app(db.clone())
            .oneshot(post_json(names::GUIDED_SYNC_URL, Some(&token), &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    assert_eq!(db.plan_progress_count(&user_id).await.unwrap(), 1);
    let stored = db
        .get_plan_progress(&user_id, &plan_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.completed_questions, vec!["q1", "q2"]);
    assert_eq!(stored.current_position.question_index, 2);
}

#[tokio::test]
async fn guided_sync_clamps_out_of_range_position() {
    let db = create_test_db().await;
    let (user_id, token) = seed_user(&db).await;
    let card_id = db.load_card(make_card("S", 1, 1, 2)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    // Content shrank since the record was written; indices point past the end
    let body = json!({
        "planId": plan_id,
        "currentPosition": {
            "cardIndex": 4, "categoryIndex": 7, "topicIndex": 3, "questionIndex": 10
        },
    });

    let resp = app(db.clone())
        .oneshot(post_json(names::GUIDED_SYNC_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = db
        .get_plan_progress(&user_id, &plan_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.current_position.card_index, 0);
    assert_eq!(stored.current_position.category_index, 0);
    assert_eq!(stored.current_position.topic_index, 0);
    assert_eq!(stored.current_position.question_index, 1);
}

#[tokio::test]
async fn guided_progress_read_back() {
    let db = create_test_db().await;
    let (_, token) = seed_user(&db).await;
    let card_id = db.load_card(make_card("R", 1, 1, 2)).await.unwrap();
    let plan_id = db.create_plan("Plan", None, &[card_id]).await.unwrap();

    // Nothing synced yet: success with null data
    let req = Request::builder()
        .method(Method::GET)
        .uri(names::guided_progress_url(&plan_id))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app(db.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["data"].is_null());

    let sync_body = json!({
        "planId": plan_id,
        "completedQuestions": ["q1"],
        "correctAnswers": ["q1"],
    });
    let resp = app(db.clone())
        .oneshot(post_json(names::GUIDED_SYNC_URL, Some(&token), &sync_body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method(Method::GET)
        .uri(names::guided_progress_url(&plan_id))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app(db).oneshot(req).await.unwrap();
    let body = json_body(resp).await;
    assert_eq!(body["data"]["planId"], json!(plan_id));
    assert_eq!(body["data"]["completedQuestions"], json!(["q1"]));
}

#[tokio::test]
async fn guided_sync_of_unknown_plan_is_404() {
    let db = create_test_db().await;
    let (_, token) = seed_user(&db).await;

    let resp = app(db)
        .oneshot(post_json(
            names::GUIDED_SYNC_URL,
            Some(&token),
            &json!({"planId": "missing"}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn free_style_sync_and_read_back() {
    let db = create_test_db().await;
    let (_, token) = seed_user(&db).await;

    let body = json!({
        "lastQuestionIndex": 4,
        "lastQuestionId": "q4",
        "answeredQuestions": ["q1", "q4"],
        "answeredQuestionsData": {"q4": {"correct": false}},
    });
    let resp = app(db.clone())
        .oneshot(post_json(names::FREE_STYLE_SYNC_URL, Some(&token), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let req = Request::builder()
        .method(Method::GET)
        .uri(names::FREE_STYLE_PROGRESS_URL)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let resp = app(db).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let stored = json_body(resp).await;
    assert_eq!(stored["data"]["lastQuestionIndex"], json!(4));
    assert_eq!(stored["data"]["answeredQuestions"], json!(["q1", "q4"]));
}

#[tokio::test]
async fn sync_endpoints_require_authentication() {
    let db = create_test_db().await;

    for uri in [names::GUIDED_SYNC_URL, names::FREE_STYLE_SYNC_URL] {
        let resp = app(db.clone())
            .oneshot(post_json(uri, None, &json!({"planId": "p"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "for {uri}");
    }
}

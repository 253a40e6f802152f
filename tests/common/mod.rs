// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use prepdeck::db::Db;
use prepdeck::models::{NewCard, NewCategory, NewQuestion, NewTopic, QuestionOption};

pub async fn create_test_db() -> Db {
    create_test_db_with_path().await.0
}

/// Like `create_test_db`, but also hands back the database file path so a
/// test can open a second raw connection to the same file.
pub async fn create_test_db_with_path() -> (Db, std::path::PathBuf) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let path =
        std::env::temp_dir().join(format!("prepdeck_test_{}_{}.db", std::process::id(), id));
    // Clean up leftover file from previous runs
    let _ = std::fs::remove_file(&path);
    let url = format!("file:{}", path.display());
    let db = Db::new(url, String::new())
        .await
        .expect("failed to create test database");
    (db, path)
}

/// Create a user with a session token; returns (user_id, token).
pub async fn seed_user(db: &Db) -> (String, String) {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::SeqCst);
    let user_id = db
        .create_user(&format!("learner{n}@example.com"), "Learner")
        .await
        .expect("create user");
    let token = db
        .create_session_token(&user_id)
        .await
        .expect("create session token");
    (user_id, token)
}

pub fn make_question(n: usize) -> NewQuestion {
    NewQuestion {
        title: format!("Question {n}"),
        content: format!("What is the answer to question {n}?"),
        question_type: "multiple-choice".to_string(),
        options: vec![
            QuestionOption {
                id: "a".to_string(),
                text: "Right".to_string(),
                is_correct: true,
                explanation: Some("Because it is".to_string()),
            },
            QuestionOption {
                id: "b".to_string(),
                text: "Wrong".to_string(),
                is_correct: false,
                explanation: None,
            },
        ],
        correct_answer: None,
        explanation: None,
        difficulty: Some("medium".to_string()),
        points: 1,
        tags: vec!["sample".to_string()],
    }
}

/// One card with `categories` categories, each holding `topics` topics of
/// `questions` questions.
pub fn make_card(title: &str, categories: usize, topics: usize, questions: usize) -> NewCard {
    let mut question_n = 0;
    NewCard {
        title: title.to_string(),
        card_type: "general".to_string(),
        description: None,
        color: None,
        icon: None,
        order_index: 0,
        categories: (0..categories)
            .map(|c| NewCategory {
                name: format!("{title} category {c}"),
                order_index: c as i64,
                topics: (0..topics)
                    .map(|t| NewTopic {
                        name: format!("{title} topic {c}.{t}"),
                        order_index: t as i64,
                        questions: (0..questions)
                            .map(|_| {
                                question_n += 1;
                                make_question(question_n)
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

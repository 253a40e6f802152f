// Database row structs, deserialized via `libsql::de::from_row`.
// SQLite booleans arrive as integers; flags stay i64 here and become bool at
// the read-model boundary.

use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Clone, Deserialize)]
pub struct CardRow {
    pub id: String,
    pub title: String,
    pub card_type: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub order_index: i64,
    pub is_active: i64,
}

/// A category together with the card it was reached through. `direct` rows
/// come from the `learning_card_id` foreign key, junction rows from
/// `card_categories`.
#[derive(Clone, Deserialize)]
pub struct LinkedCategoryRow {
    pub id: String,
    pub name: String,
    pub order_index: i64,
    pub created_at: String,
    pub parent_id: String,
}

#[derive(Clone, Deserialize)]
pub struct LinkedTopicRow {
    pub id: String,
    pub name: String,
    pub order_index: i64,
    pub created_at: String,
    pub parent_id: String,
}

#[derive(Clone, Deserialize)]
pub struct LinkedQuestionRow {
    pub id: String,
    pub title: String,
    pub content: String,
    pub question_type: String,
    pub options: String,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
    pub difficulty: Option<String>,
    pub points: i64,
    pub tags: String,
    pub created_at: String,
    // Insertion order; breaks created_at ties
    pub rowid: i64,
    pub parent_id: String,
}

#[derive(Clone, Deserialize)]
pub struct PlanRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub questions_completed: i64,
    pub total_questions: i64,
    pub progress: i64,
    pub created_at: String,
}

#[derive(Clone, Deserialize)]
pub struct PlanProgressRow {
    pub user_id: String,
    pub plan_id: String,
    pub completed_questions: String,
    pub completed_topics: String,
    pub completed_categories: String,
    pub completed_cards: String,
    pub correct_answers: String,
    pub position: String,
    pub last_updated: String,
}

#[derive(Clone, Deserialize)]
pub struct FreeStyleProgressRow {
    pub user_id: String,
    pub last_question_index: i64,
    pub last_question_id: Option<String>,
    pub answered_questions: String,
    pub answered_data: String,
    pub last_updated: String,
}

#[derive(Clone, Copy, Deserialize)]
pub struct UserProgressStats {
    pub total_answered: i64,
    pub total_correct: i64,
}

// API-facing payload types. Everything on the wire is camelCase.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPosition {
    #[serde(default)]
    pub card_index: usize,
    #[serde(default)]
    pub category_index: usize,
    #[serde(default)]
    pub topic_index: usize,
    #[serde(default)]
    pub question_index: usize,
}

/// Guided-mode progress record, mirrored between the client outbox and the
/// `plan_progress` table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidedProgress {
    pub plan_id: String,
    #[serde(default)]
    pub completed_questions: Vec<String>,
    #[serde(default)]
    pub completed_topics: Vec<String>,
    #[serde(default)]
    pub completed_categories: Vec<String>,
    #[serde(default)]
    pub completed_cards: Vec<String>,
    #[serde(default)]
    pub correct_answers: Vec<String>,
    #[serde(default)]
    pub current_position: CurrentPosition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Free-style progress record, one per user.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeStyleProgress {
    #[serde(default)]
    pub last_question_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_question_id: Option<String>,
    #[serde(default)]
    pub answered_questions: Vec<String>,
    #[serde(default)]
    pub answered_questions_data: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

// ---------------------------------------------------------------------------
// Assembled hierarchy read model
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardNode {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub card_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub order_index: i64,
    pub is_active: bool,
    pub categories: Vec<CategoryNode>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub order_index: i64,
    pub topics: Vec<TopicNode>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicNode {
    pub id: String,
    pub name: String,
    pub order_index: i64,
    pub questions: Vec<QuestionNode>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionNode {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub options: Vec<QuestionOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub points: i64,
    pub tags: Vec<String>,
}

// ---------------------------------------------------------------------------
// Content input (admin loading / test seeding)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCard {
    pub title: String,
    #[serde(default = "default_card_type", rename = "type")]
    pub card_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub categories: Vec<NewCategory>,
}

fn default_card_type() -> String {
    "general".to_string()
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub topics: Vec<NewTopic>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub name: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub questions: Vec<NewQuestion>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuestion {
    pub title: String,
    pub content: String,
    #[serde(default = "default_question_type", rename = "type")]
    pub question_type: String,
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default = "default_points")]
    pub points: i64,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_question_type() -> String {
    "multiple-choice".to_string()
}

fn default_points() -> i64 {
    1
}

/// Outcome of recording one answer event. `Degraded` means the caller was told
/// "success" even though the durable insert failed; the reason is only visible
/// here and in the logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Persisted(String),
    Degraded(String),
}

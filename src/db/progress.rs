use color_eyre::Result;
use libsql::params;
use ulid::Ulid;

use super::helpers::{query_one, query_optional};
use super::models::{FreeStyleProgressRow, PlanProgressRow, UserProgressStats};
use super::Db;
use crate::models::{CurrentPosition, FreeStyleProgress, GuidedProgress};

/// One answer event, as recorded in the append-only log.
pub struct AnswerEvent<'a> {
    pub user_id: &'a str,
    pub question_id: &'a str,
    pub is_correct: bool,
    pub time_spent: Option<i64>,
    pub section: Option<&'a str>,
    pub difficulty: Option<&'a str>,
    pub learning_mode: Option<&'a str>,
    pub plan_id: Option<&'a str>,
}

impl Db {
    /// Append one row to the progress log. Repeated answers to the same
    /// question create new rows; there is no upsert at this layer.
    pub async fn record_answer(&self, event: AnswerEvent<'_>) -> Result<String> {
        let progress_id = Ulid::new().to_string();
        let conn = self.connect()?;

        conn.execute(
            r#"
            INSERT INTO progress_log
                (id, user_id, question_id, is_correct, time_spent, section,
                 difficulty, learning_mode, plan_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                progress_id.clone(),
                event.user_id,
                event.question_id,
                event.is_correct as i64,
                event.time_spent,
                event.section,
                event.difficulty,
                event.learning_mode,
                event.plan_id
            ],
        )
        .await?;

        tracing::info!(
            "answer recorded for user={} question={}: correct={}",
            event.user_id,
            event.question_id,
            event.is_correct
        );

        Ok(progress_id)
    }

    /// Idempotent upsert of a guided-mode progress record. Re-sending an
    /// already-synced record overwrites the same row.
    pub async fn upsert_plan_progress(
        &self,
        user_id: &str,
        progress: &GuidedProgress,
        position: &CurrentPosition,
    ) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            r#"
            INSERT INTO plan_progress
                (user_id, plan_id, completed_questions, completed_topics,
                 completed_categories, completed_cards, correct_answers,
                 position, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, COALESCE(?, datetime('now')))
            ON CONFLICT (user_id, plan_id) DO UPDATE SET
                completed_questions = excluded.completed_questions,
                completed_topics = excluded.completed_topics,
                completed_categories = excluded.completed_categories,
                completed_cards = excluded.completed_cards,
                correct_answers = excluded.correct_answers,
                position = excluded.position,
                last_updated = excluded.last_updated
            "#,
            params![
                user_id,
                progress.plan_id.clone(),
                serde_json::to_string(&progress.completed_questions)?,
                serde_json::to_string(&progress.completed_topics)?,
                serde_json::to_string(&progress.completed_categories)?,
                serde_json::to_string(&progress.completed_cards)?,
                serde_json::to_string(&progress.correct_answers)?,
                serde_json::to_string(position)?,
                progress.last_updated.clone()
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_plan_progress(
        &self,
        user_id: &str,
        plan_id: &str,
    ) -> Result<Option<GuidedProgress>> {
        let conn = self.connect()?;
        let row = query_optional::<PlanProgressRow>(
            &conn,
            r#"
            SELECT user_id, plan_id, completed_questions, completed_topics,
                   completed_categories, completed_cards, correct_answers,
                   position, last_updated
            FROM plan_progress WHERE user_id = ? AND plan_id = ?
            "#,
            params![user_id, plan_id],
        )
        .await?;

        row.map(|row| {
            Ok(GuidedProgress {
                plan_id: row.plan_id,
                completed_questions: serde_json::from_str(&row.completed_questions)?,
                completed_topics: serde_json::from_str(&row.completed_topics)?,
                completed_categories: serde_json::from_str(&row.completed_categories)?,
                completed_cards: serde_json::from_str(&row.completed_cards)?,
                correct_answers: serde_json::from_str(&row.correct_answers)?,
                current_position: serde_json::from_str(&row.position)?,
                last_updated: Some(row.last_updated),
            })
        })
        .transpose()
    }

    pub async fn plan_progress_count(&self, user_id: &str) -> Result<i64> {
        let conn = self.connect()?;
        let count = conn
            .query(
                "SELECT COUNT(*) FROM plan_progress WHERE user_id = ?",
                params![user_id],
            )
            .await?
            .next()
            .await?
            .map(|row| row.get::<i64>(0))
            .transpose()?
            .unwrap_or(0);
        Ok(count)
    }

    pub async fn upsert_free_style_progress(
        &self,
        user_id: &str,
        progress: &FreeStyleProgress,
    ) -> Result<()> {
        let conn = self.connect()?;

        conn.execute(
            r#"
            INSERT INTO free_style_progress
                (user_id, last_question_index, last_question_id,
                 answered_questions, answered_data, last_updated)
            VALUES (?, ?, ?, ?, ?, COALESCE(?, datetime('now')))
            ON CONFLICT (user_id) DO UPDATE SET
                last_question_index = excluded.last_question_index,
                last_question_id = excluded.last_question_id,
                answered_questions = excluded.answered_questions,
                answered_data = excluded.answered_data,
                last_updated = excluded.last_updated
            "#,
            params![
                user_id,
                progress.last_question_index,
                progress.last_question_id.clone(),
                serde_json::to_string(&progress.answered_questions)?,
                serde_json::to_string(&progress.answered_questions_data)?,
                progress.last_updated.clone()
            ],
        )
        .await?;

        Ok(())
    }

    pub async fn get_free_style_progress(
        &self,
        user_id: &str,
    ) -> Result<Option<FreeStyleProgress>> {
        let conn = self.connect()?;
        let row = query_optional::<FreeStyleProgressRow>(
            &conn,
            r#"
            SELECT user_id, last_question_index, last_question_id,
                   answered_questions, answered_data, last_updated
            FROM free_style_progress WHERE user_id = ?
            "#,
            params![user_id],
        )
        .await?;

        row.map(|row| {
            Ok(FreeStyleProgress {
                last_question_index: row.last_question_index,
                last_question_id: row.last_question_id,
                answered_questions: serde_json::from_str(&row.answered_questions)?,
                answered_questions_data: serde_json::from_str(&row.answered_data)?,
                last_updated: Some(row.last_updated),
            })
        })
        .transpose()
    }

    /// Totals over the answer log, used for the progress-summary cookie.
    pub async fn user_progress_stats(&self, user_id: &str) -> Result<UserProgressStats> {
        let conn = self.connect()?;
        query_one::<UserProgressStats>(
            &conn,
            r#"
            SELECT COUNT(*) AS total_answered,
                   COALESCE(SUM(CASE WHEN is_correct != 0 THEN 1 ELSE 0 END), 0) AS total_correct
            FROM progress_log WHERE user_id = ?
            "#,
            params![user_id],
        )
        .await
    }
}

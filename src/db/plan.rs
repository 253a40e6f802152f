use color_eyre::Result;
use libsql::params;
use ulid::Ulid;

use super::helpers::query_optional;
use super::models::PlanRow;
use super::Db;
use crate::hierarchy;
use crate::models::CardNode;

impl Db {
    /// Create a plan over an ordered list of existing cards. The total
    /// question count is computed from the reachable hierarchy up front.
    pub async fn create_plan(
        &self,
        name: &str,
        description: Option<&str>,
        card_ids: &[String],
    ) -> Result<String> {
        let plan_id = Ulid::new().to_string();
        let conn = self.connect()?;

        conn.execute(
            "INSERT INTO plans (id, name, description) VALUES (?, ?, ?)",
            params![plan_id.clone(), name, description],
        )
        .await?;

        for (order_index, card_id) in card_ids.iter().enumerate() {
            conn.execute(
                "INSERT INTO plan_cards (plan_id, card_id, order_index) VALUES (?, ?, ?)",
                params![plan_id.clone(), card_id.clone(), order_index as i64],
            )
            .await?;
        }

        let tree = self.plan_hierarchy(&plan_id).await?;
        let total: usize = tree
            .iter()
            .flat_map(|c| &c.categories)
            .flat_map(|c| &c.topics)
            .map(|t| t.questions.len())
            .sum();

        conn.execute(
            "UPDATE plans SET total_questions = ? WHERE id = ?",
            params![total as i64, plan_id.clone()],
        )
        .await?;

        tracing::info!("new plan created: id={plan_id} with {total} questions");
        Ok(plan_id)
    }

    pub async fn get_plan(&self, plan_id: &str) -> Result<Option<PlanRow>> {
        let conn = self.connect()?;
        query_optional::<PlanRow>(
            &conn,
            r#"
            SELECT id, name, description, questions_completed, total_questions,
                   progress, created_at
            FROM plans WHERE id = ?
            "#,
            params![plan_id],
        )
        .await
    }

    /// Card ids selected by the plan, in plan order.
    pub(crate) async fn plan_card_ids(&self, plan_id: &str) -> Result<Vec<String>> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                "SELECT card_id FROM plan_cards WHERE plan_id = ? ORDER BY order_index",
                params![plan_id],
            )
            .await?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await? {
            ids.push(row.get::<String>(0)?);
        }
        Ok(ids)
    }

    /// Assemble the full Card -> Category -> Topic -> Question tree for a
    /// plan. Any fetch failure aborts the whole assembly; no partial tree is
    /// returned.
    pub async fn plan_hierarchy(&self, plan_id: &str) -> Result<Vec<CardNode>> {
        let card_ids = self.plan_card_ids(plan_id).await?;
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }

        let cards = self.cards_by_ids(&card_ids).await?;
        let categories = self.categories_for_cards(&card_ids).await?;
        let category_ids: Vec<String> = categories.iter().map(|c| c.id.clone()).collect();
        let topics = self.topics_for_categories(&category_ids).await?;
        let topic_ids: Vec<String> = topics.iter().map(|t| t.id.clone()).collect();
        let questions = self.questions_for_topics(&topic_ids).await?;

        hierarchy::assemble(&card_ids, cards, categories, topics, questions)
    }

    /// Bump the plan's completed counter and recompute its percentage.
    /// Returns false when the plan does not exist; the caller decides whether
    /// that is fatal.
    pub async fn increment_plan_progress(&self, plan_id: &str) -> Result<bool> {
        let conn = self.connect()?;
        let affected = conn
            .execute(
                r#"
                UPDATE plans
                SET questions_completed = questions_completed + 1,
                    progress = CASE
                        WHEN total_questions > 0
                        THEN MIN(100, (questions_completed + 1) * 100 / total_questions)
                        ELSE 0
                    END
                WHERE id = ?
                "#,
                params![plan_id],
            )
            .await?;

        Ok(affected > 0)
    }
}

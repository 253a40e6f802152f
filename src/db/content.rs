use color_eyre::{eyre::bail, Result};
use libsql::params;
use ulid::Ulid;

use super::helpers::{id_params, in_placeholders, query_all};
use super::models::{CardRow, LinkedCategoryRow, LinkedQuestionRow, LinkedTopicRow};
use super::Db;
use crate::hierarchy;
use crate::models::NewCard;

/// Which legacy junction tables exist in this database. Probed once and
/// cached for the process lifetime so a missing table is never confused with
/// a query failure.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct JunctionSupport {
    pub card_categories: bool,
    pub category_topics: bool,
    pub topic_questions: bool,
}

impl Db {
    pub(crate) async fn junction_support(&self) -> Result<JunctionSupport> {
        let support = self
            .junctions
            .get_or_try_init(|| async {
                let support = JunctionSupport {
                    card_categories: self.table_exists("card_categories").await?,
                    category_topics: self.table_exists("category_topics").await?,
                    topic_questions: self.table_exists("topic_questions").await?,
                };
                tracing::debug!(?support, "probed junction table support");
                Ok::<_, color_eyre::Report>(support)
            })
            .await?;
        Ok(*support)
    }

    async fn table_exists(&self, name: &str) -> Result<bool> {
        let conn = self.connect()?;
        let row = conn
            .query(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
                params![name],
            )
            .await?
            .next()
            .await?;
        Ok(row.is_some())
    }

    /// Categories reachable from the given cards, junction links merged with
    /// direct foreign keys. The direct relationship wins a conflicting parent
    /// claim.
    pub(crate) async fn categories_for_cards(
        &self,
        card_ids: &[String],
    ) -> Result<Vec<LinkedCategoryRow>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let ph = in_placeholders(card_ids.len());

        let junction = if self.junction_support().await?.card_categories {
            query_all::<LinkedCategoryRow>(
                &conn,
                &format!(
                    r#"
                    SELECT c.id, c.name, c.order_index, c.created_at, cc.card_id AS parent_id
                    FROM card_categories cc
                    JOIN categories c ON c.id = cc.category_id
                    WHERE cc.card_id IN ({ph})
                    "#
                ),
                id_params(card_ids),
            )
            .await?
        } else {
            Vec::new()
        };

        let direct = query_all::<LinkedCategoryRow>(
            &conn,
            &format!(
                r#"
                SELECT id, name, order_index, created_at, learning_card_id AS parent_id
                FROM categories
                WHERE learning_card_id IN ({ph})
                "#
            ),
            id_params(card_ids),
        )
        .await?;

        Ok(hierarchy::merge_by_id(junction, direct, |c| c.id.clone()))
    }

    pub(crate) async fn topics_for_categories(
        &self,
        category_ids: &[String],
    ) -> Result<Vec<LinkedTopicRow>> {
        if category_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let ph = in_placeholders(category_ids.len());

        let junction = if self.junction_support().await?.category_topics {
            query_all::<LinkedTopicRow>(
                &conn,
                &format!(
                    r#"
                    SELECT t.id, t.name, t.order_index, t.created_at, ct.category_id AS parent_id
                    FROM category_topics ct
                    JOIN topics t ON t.id = ct.topic_id
                    WHERE ct.category_id IN ({ph})
                    "#
                ),
                id_params(category_ids),
            )
            .await?
        } else {
            Vec::new()
        };

        let direct = query_all::<LinkedTopicRow>(
            &conn,
            &format!(
                r#"
                SELECT id, name, order_index, created_at, category_id AS parent_id
                FROM topics
                WHERE category_id IN ({ph})
                "#
            ),
            id_params(category_ids),
        )
        .await?;

        Ok(hierarchy::merge_by_id(junction, direct, |t| t.id.clone()))
    }

    pub(crate) async fn questions_for_topics(
        &self,
        topic_ids: &[String],
    ) -> Result<Vec<LinkedQuestionRow>> {
        if topic_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let ph = in_placeholders(topic_ids.len());

        let junction = if self.junction_support().await?.topic_questions {
            query_all::<LinkedQuestionRow>(
                &conn,
                &format!(
                    r#"
                    SELECT q.id, q.title, q.content, q.question_type, q.options,
                           q.correct_answer, q.explanation, q.difficulty, q.points,
                           q.tags, q.created_at, q.rowid AS rowid, tq.topic_id AS parent_id
                    FROM topic_questions tq
                    JOIN questions q ON q.id = tq.question_id
                    WHERE tq.topic_id IN ({ph})
                    "#
                ),
                id_params(topic_ids),
            )
            .await?
        } else {
            Vec::new()
        };

        let direct = query_all::<LinkedQuestionRow>(
            &conn,
            &format!(
                r#"
                SELECT id, title, content, question_type, options,
                       correct_answer, explanation, difficulty, points,
                       tags, created_at, rowid AS rowid, topic_id AS parent_id
                FROM questions
                WHERE topic_id IN ({ph})
                "#
            ),
            id_params(topic_ids),
        )
        .await?;

        Ok(hierarchy::merge_by_id(junction, direct, |q| q.id.clone()))
    }

    pub(crate) async fn cards_by_ids(&self, card_ids: &[String]) -> Result<Vec<CardRow>> {
        if card_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.connect()?;
        let ph = in_placeholders(card_ids.len());

        query_all::<CardRow>(
            &conn,
            &format!(
                r#"
                SELECT id, title, card_type, description, color, icon, order_index, is_active
                FROM learning_cards
                WHERE id IN ({ph})
                "#
            ),
            id_params(card_ids),
        )
        .await
    }

    /// Insert a card with its nested categories, topics and questions in one
    /// transaction. Returns the new card id.
    pub async fn load_card(&self, card: NewCard) -> Result<String> {
        for category in &card.categories {
            for topic in &category.topics {
                for question in &topic.questions {
                    validate_options(question)?;
                }
            }
        }

        let conn = self.connect()?;
        let tx = conn.transaction().await?;

        let card_id = Ulid::new().to_string();
        tx.execute(
            r#"
            INSERT INTO learning_cards (id, title, card_type, description, color, icon, order_index)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                card_id.clone(),
                card.title,
                card.card_type,
                card.description,
                card.color,
                card.icon,
                card.order_index
            ],
        )
        .await?;

        let mut question_count = 0usize;
        for category in card.categories {
            let category_id = Ulid::new().to_string();
            tx.execute(
                "INSERT INTO categories (id, name, learning_card_id, order_index) VALUES (?, ?, ?, ?)",
                params![
                    category_id.clone(),
                    category.name,
                    card_id.clone(),
                    category.order_index
                ],
            )
            .await?;

            for topic in category.topics {
                let topic_id = Ulid::new().to_string();
                tx.execute(
                    "INSERT INTO topics (id, name, category_id, order_index) VALUES (?, ?, ?, ?)",
                    params![
                        topic_id.clone(),
                        topic.name,
                        category_id.clone(),
                        topic.order_index
                    ],
                )
                .await?;

                for question in topic.questions {
                    question_count += 1;
                    tx.execute(
                        r#"
                        INSERT INTO questions
                            (id, title, content, question_type, options, correct_answer,
                             explanation, difficulty, points, topic_id, tags)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                        params![
                            Ulid::new().to_string(),
                            question.title,
                            question.content,
                            question.question_type,
                            serde_json::to_string(&question.options)?,
                            question.correct_answer,
                            question.explanation,
                            question.difficulty,
                            question.points,
                            topic_id.clone(),
                            serde_json::to_string(&question.tags)?
                        ],
                    )
                    .await?;
                }
            }
        }

        tx.commit().await?;
        tracing::info!("new card loaded: id={card_id} with {question_count} questions");
        Ok(card_id)
    }

    /// Create a standalone category, optionally linked directly to a card.
    pub async fn create_category(
        &self,
        name: &str,
        card_id: Option<&str>,
        order_index: i64,
    ) -> Result<String> {
        let id = Ulid::new().to_string();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO categories (id, name, learning_card_id, order_index) VALUES (?, ?, ?, ?)",
            params![id.clone(), name, card_id, order_index],
        )
        .await?;
        Ok(id)
    }

    pub async fn create_topic(
        &self,
        name: &str,
        category_id: Option<&str>,
        order_index: i64,
    ) -> Result<String> {
        let id = Ulid::new().to_string();
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO topics (id, name, category_id, order_index) VALUES (?, ?, ?, ?)",
            params![id.clone(), name, category_id, order_index],
        )
        .await?;
        Ok(id)
    }

    pub async fn create_question(
        &self,
        question: crate::models::NewQuestion,
        topic_id: Option<&str>,
    ) -> Result<String> {
        validate_options(&question)?;
        let id = Ulid::new().to_string();
        let conn = self.connect()?;
        conn.execute(
            r#"
            INSERT INTO questions
                (id, title, content, question_type, options, correct_answer,
                 explanation, difficulty, points, topic_id, tags)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id.clone(),
                question.title,
                question.content,
                question.question_type,
                serde_json::to_string(&question.options)?,
                question.correct_answer,
                question.explanation,
                question.difficulty,
                question.points,
                topic_id,
                serde_json::to_string(&question.tags)?
            ],
        )
        .await?;
        Ok(id)
    }

    // Legacy junction-table writes, kept for data migrated from the
    // many-to-many layout.

    pub async fn link_card_category(&self, card_id: &str, category_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO card_categories (card_id, category_id) VALUES (?, ?)",
            params![card_id, category_id],
        )
        .await?;
        Ok(())
    }

    pub async fn link_category_topic(&self, category_id: &str, topic_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO category_topics (category_id, topic_id) VALUES (?, ?)",
            params![category_id, topic_id],
        )
        .await?;
        Ok(())
    }

    pub async fn link_topic_question(&self, topic_id: &str, question_id: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT OR IGNORE INTO topic_questions (topic_id, question_id) VALUES (?, ?)",
            params![topic_id, question_id],
        )
        .await?;
        Ok(())
    }
}

/// Single-answer multiple choice must carry exactly one correct option.
fn validate_options(question: &crate::models::NewQuestion) -> Result<()> {
    if question.question_type == "multiple-choice" && !question.options.is_empty() {
        let correct = question.options.iter().filter(|o| o.is_correct).count();
        if correct != 1 {
            bail!(
                "question '{}' must have exactly one correct option, found {correct}",
                question.title
            );
        }
    }
    Ok(())
}

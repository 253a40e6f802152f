//! Pure assembly of the Card -> Category -> Topic -> Question read model.
//! All database access happens in `db`; this module only merges, orders and
//! nests the fetched rows.

use std::collections::HashMap;

use color_eyre::Result;

use crate::db::models::{CardRow, LinkedCategoryRow, LinkedQuestionRow, LinkedTopicRow};
use crate::models::{CardNode, CategoryNode, CurrentPosition, QuestionNode, TopicNode};

/// Merge junction-table rows with direct foreign-key rows, deduplicating by
/// id. The direct relationship is authoritative: on conflict its row (and
/// therefore its parent claim) replaces the junction one.
pub fn merge_by_id<T>(
    junction: Vec<T>,
    direct: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(junction.len() + direct.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in junction.into_iter().chain(direct) {
        let id = id_of(&row);
        match index.get(&id) {
            Some(&i) => merged[i] = row,
            None => {
                index.insert(id, merged.len());
                merged.push(row);
            }
        }
    }

    merged
}

/// Nest the fetched rows into the plan's tree. `card_order` is the plan's
/// card id list in plan order; cards/categories/topics/questions arrive flat.
pub fn assemble(
    card_order: &[String],
    cards: Vec<CardRow>,
    categories: Vec<LinkedCategoryRow>,
    topics: Vec<LinkedTopicRow>,
    questions: Vec<LinkedQuestionRow>,
) -> Result<Vec<CardNode>> {
    let mut questions_by_topic: HashMap<String, Vec<QuestionNode>> = HashMap::new();
    let mut sorted_questions = questions;
    sorted_questions.sort_by(|a, b| {
        (a.created_at.as_str(), a.rowid).cmp(&(b.created_at.as_str(), b.rowid))
    });
    for row in sorted_questions {
        let parent = row.parent_id.clone();
        questions_by_topic
            .entry(parent)
            .or_default()
            .push(question_node(row)?);
    }

    let mut topics_by_category: HashMap<String, Vec<TopicNode>> = HashMap::new();
    let mut sorted_topics = topics;
    sorted_topics.sort_by_key(|t| (t.order_index, t.created_at.clone()));
    for row in sorted_topics {
        topics_by_category
            .entry(row.parent_id.clone())
            .or_default()
            .push(TopicNode {
                questions: questions_by_topic.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                order_index: row.order_index,
            });
    }

    let mut categories_by_card: HashMap<String, Vec<CategoryNode>> = HashMap::new();
    let mut sorted_categories = categories;
    sorted_categories.sort_by_key(|c| (c.order_index, c.created_at.clone()));
    for row in sorted_categories {
        categories_by_card
            .entry(row.parent_id.clone())
            .or_default()
            .push(CategoryNode {
                topics: topics_by_category.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                order_index: row.order_index,
            });
    }

    let mut cards_by_id: HashMap<String, CardRow> =
        cards.into_iter().map(|c| (c.id.clone(), c)).collect();

    let mut tree = Vec::with_capacity(card_order.len());
    for card_id in card_order {
        let Some(card) = cards_by_id.remove(card_id) else {
            continue;
        };
        tree.push(CardNode {
            categories: categories_by_card.remove(&card.id).unwrap_or_default(),
            id: card.id,
            title: card.title,
            card_type: card.card_type,
            description: card.description,
            color: card.color,
            icon: card.icon,
            order_index: card.order_index,
            is_active: card.is_active != 0,
        });
    }

    Ok(tree)
}

fn question_node(row: LinkedQuestionRow) -> Result<QuestionNode> {
    Ok(QuestionNode {
        id: row.id,
        title: row.title,
        content: row.content,
        question_type: row.question_type,
        options: serde_json::from_str(&row.options)?,
        correct_answer: row.correct_answer,
        explanation: row.explanation,
        difficulty: row.difficulty,
        points: row.points,
        tags: serde_json::from_str(&row.tags)?,
    })
}

/// Clamp a stored position against the current shape of the tree. Content can
/// shrink independently of saved progress, so out-of-range indices land on
/// the last element of each level instead of erroring. An empty tree resets
/// to zeros.
pub fn clamp_position(position: &CurrentPosition, tree: &[CardNode]) -> CurrentPosition {
    if tree.is_empty() {
        return CurrentPosition::default();
    }

    let card_index = position.card_index.min(tree.len() - 1);
    let categories = &tree[card_index].categories;
    if categories.is_empty() {
        return CurrentPosition {
            card_index,
            ..Default::default()
        };
    }

    let category_index = position.category_index.min(categories.len() - 1);
    let topics = &categories[category_index].topics;
    if topics.is_empty() {
        return CurrentPosition {
            card_index,
            category_index,
            ..Default::default()
        };
    }

    let topic_index = position.topic_index.min(topics.len() - 1);
    let questions = &topics[topic_index].questions;
    let question_index = if questions.is_empty() {
        0
    } else {
        position.question_index.min(questions.len() - 1)
    };

    CurrentPosition {
        card_index,
        category_index,
        topic_index,
        question_index,
    }
}

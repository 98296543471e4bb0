use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use strum::{Display, EnumString};

use super::{
    item::{Identified, ItemId},
    mutation::{MutationKind, OptimisticPatch},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTopic {
    pub id: ItemId,
    pub topic_name: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningPlan {
    pub id: ItemId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_completion_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub topics: Vec<PlanTopic>,
}

impl Identified for LearningPlan {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

impl LearningPlan {
    pub fn completed_topics(&self) -> usize {
        self.topics.iter().filter(|t| t.completed).count()
    }

    /// Completed topics as a rounded percentage, 0 for a plan without topics
    pub fn progress(&self) -> u8 {
        if self.topics.is_empty() {
            return 0;
        }
        let ratio = self.completed_topics() as f64 / self.topics.len() as f64;
        (ratio * 100.0).round() as u8
    }

    pub fn is_complete(&self) -> bool {
        !self.topics.is_empty() && self.completed_topics() == self.topics.len()
    }

    /// Sets the completion flag of one topic, other topics are untouched
    pub fn with_topic_completed(&self, topic_id: &ItemId, completed: bool) -> LearningPlan {
        let mut plan = self.clone();
        if let Some(topic) = plan.topics.iter_mut().find(|t| &t.id == topic_id) {
            topic.completed = completed;
        }
        plan
    }

    pub fn topic(&self, topic_id: &ItemId) -> Option<&PlanTopic> {
        self.topics.iter().find(|t| &t.id == topic_id)
    }
}

/// Dashboard orderings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlanSort {
    #[default]
    Date,
    Progress,
    Name,
    Category,
}

impl PlanSort {
    /// Ascending comparator for use with `DedupSet::sort_by`.
    /// Plans without a target date or category sort before the rest.
    pub fn comparator(self) -> fn(&LearningPlan, &LearningPlan) -> Ordering {
        match self {
            PlanSort::Date => |a: &LearningPlan, b: &LearningPlan| {
                a.target_completion_date.cmp(&b.target_completion_date)
            },
            PlanSort::Progress => |a: &LearningPlan, b: &LearningPlan| a.progress().cmp(&b.progress()),
            PlanSort::Name => |a: &LearningPlan, b: &LearningPlan| {
                a.title.to_lowercase().cmp(&b.title.to_lowercase())
            },
            PlanSort::Category => |a: &LearningPlan, b: &LearningPlan| {
                let category = |p: &LearningPlan| p.category.as_deref().map(str::to_lowercase);
                category(a).cmp(&category(b))
            },
        }
    }
}

/// Marks one topic of `plan` completed. The server only ever sets the flag,
/// so reverting restores whatever the topic had before.
/// Returns `None` if the plan has no such topic.
pub fn complete_topic(
    plan: &LearningPlan,
    topic_id: &ItemId,
    user_id: &str,
) -> Option<OptimisticPatch<LearningPlan>> {
    let previous = plan.topic(topic_id)?.completed;
    let payload = json!({ "topicId": topic_id, "userId": user_id });
    let forward_id = topic_id.clone();
    let inverse_id = topic_id.clone();

    Some(
        OptimisticPatch::new(
            plan.id.clone(),
            MutationKind::CompleteTopic,
            move |plan: &LearningPlan| plan.with_topic_completed(&forward_id, true),
            move |plan: &LearningPlan| plan.with_topic_completed(&inverse_id, previous),
        )
        .with_payload(payload),
    )
}

//! Deal Entity
//!
//! A card on the sales pipeline board. Its stage picks the column and its
//! order index sorts it within that column.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::stage::Stage;

/// Opaque deal identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DealId(String);

impl DealId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DealId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DealId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Deal priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "low" => Priority::Low,
            "high" => Priority::High,
            _ => Priority::Medium,
        }
    }
}

/// A pipeline deal (work item)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    /// Unique identifier
    pub id: DealId,
    /// Display name
    pub title: String,
    /// Monetary value
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub priority: Priority,
    /// Associated contact
    #[serde(default)]
    pub contact_name: Option<String>,
    /// Column the deal sits in
    pub stage: Stage,
    /// Sort key within the column, no business meaning
    #[serde(default)]
    pub order_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Create a deal with default payload values
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        stage: Stage,
        order_index: i64,
    ) -> Self {
        Self {
            id: DealId::new(id),
            title: title.into(),
            value: 0.0,
            priority: Priority::default(),
            contact_name: None,
            stage,
            order_index,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = value;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_contact(mut self, contact_name: impl Into<String>) -> Self {
        self.contact_name = Some(contact_name.into());
        self
    }
}

impl Entity for Deal {
    type Id = DealId;
    type Filter = DealFilter;
    type Patch = DealPatch;

    fn id(&self) -> Self::Id {
        self.id.clone()
    }
}

/// Sort deals the way every store returns them: order index, then id
pub fn sort_canonical(deals: &mut [Deal]) {
    deals.sort_by(|a, b| a.order_index.cmp(&b.order_index).then_with(|| a.id.cmp(&b.id)));
}

/// Partial update of a deal; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

impl DealPatch {
    /// Move to another stage at the given order index
    pub fn position(stage: Stage, order_index: i64) -> Self {
        Self {
            stage: Some(stage),
            order_index: Some(order_index),
            ..Default::default()
        }
    }

    /// Change only the order index
    pub fn order(order_index: i64) -> Self {
        Self {
            order_index: Some(order_index),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(&self, deal: &mut Deal) {
        if let Some(title) = &self.title {
            deal.title = title.clone();
        }
        if let Some(value) = self.value {
            deal.value = value;
        }
        if let Some(priority) = self.priority {
            deal.priority = priority;
        }
        if let Some(contact_name) = &self.contact_name {
            deal.contact_name = Some(contact_name.clone());
        }
        if let Some(stage) = &self.stage {
            deal.stage = stage.clone();
        }
        if let Some(order_index) = self.order_index {
            deal.order_index = order_index;
        }
    }
}

/// Filter for list queries
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DealFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_name: Option<String>,
}

impl DealFilter {
    /// Every deal on the board
    pub fn all() -> Self {
        Self::default()
    }

    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn matches(&self, deal: &Deal) -> bool {
        self.stage.as_ref().map_or(true, |s| *s == deal.stage)
            && self
                .contact_name
                .as_ref()
                .map_or(true, |c| deal.contact_name.as_ref() == Some(c))
    }
}

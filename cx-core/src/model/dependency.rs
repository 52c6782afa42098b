//! Directed, typed dependency edges between entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of relationship an edge expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepType {
    Calls,
    UsesType,
    Implements,
    Extends,
    Imports,
}

impl DepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::UsesType => "uses_type",
            Self::Implements => "implements",
            Self::Extends => "extends",
            Self::Imports => "imports",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "calls" => Some(Self::Calls),
            "uses_type" => Some(Self::UsesType),
            "implements" => Some(Self::Implements),
            "extends" => Some(Self::Extends),
            "imports" => Some(Self::Imports),
            _ => None,
        }
    }
}

/// A directed edge `from_id → to_id`. `(from_id, to_id, dep_type)` is the
/// composite key; re-inserting the same triple only refreshes `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub from_id: String,
    pub to_id: String,
    pub dep_type: DepType,
    pub created_at: DateTime<Utc>,
}

impl Dependency {
    pub fn new(from_id: impl Into<String>, to_id: impl Into<String>, dep_type: DepType) -> Self {
        Self {
            from_id: from_id.into(),
            to_id: to_id.into(),
            dep_type,
            created_at: Utc::now(),
        }
    }
}

//! The `Entity` record — a named addressable code construct produced by an
//! extractor, with content-derived identity and lifecycle status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ident;

/// Broad classification of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Function,
    Type,
    Constant,
    Enum,
    Var,
    Import,
}

impl EntityType {
    /// Stable snake_case name used in ids and the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Type => "type",
            Self::Constant => "constant",
            Self::Enum => "enum",
            Self::Var => "var",
            Self::Import => "import",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "function" => Some(Self::Function),
            "type" => Some(Self::Type),
            "constant" => Some(Self::Constant),
            "enum" => Some(Self::Enum),
            "var" => Some(Self::Var),
            "import" => Some(Self::Import),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Pub,
    Priv,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pub => "pub",
            Self::Priv => "priv",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "pub" => Self::Pub,
            _ => Self::Priv,
        }
    }
}

/// Lifecycle status. Archiving is a soft delete: the row stays addressable
/// and historically queryable but is excluded from active views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    Active,
    Archived,
}

impl EntityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "archived" => Self::Archived,
            _ => Self::Active,
        }
    }
}

/// A code entity. `id` is content-derived (`sa-<kind>-<filehash6>-<name>`)
/// and stable across rescans of the same path and name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    pub entity_type: EntityType,
    /// Finer-grained kind (struct, interface, alias, method, ...).
    pub kind: String,
    pub visibility: Visibility,
    pub language: String,
    pub file_path: String,
    pub line_start: u32,
    pub line_end: Option<u32>,
    pub signature: String,
    /// 8 hex chars over `signature`. Changes iff the signature changes.
    pub sig_hash: String,
    /// 8 hex chars over the body bytes. Changes iff the body changes.
    pub body_hash: String,
    /// Receiver type for methods.
    pub receiver: Option<String>,
    /// Opaque JSON describing type shape.
    pub fields: Option<serde_json::Value>,
    pub body_text: Option<String>,
    pub doc_comment: Option<String>,
    /// Signature + doc + body placeholder, for display and search.
    pub skeleton: Option<String>,
    pub status: EntityStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Construct an entity with derived id and hashes. The body is hashed
    /// from `body_text` (empty body hashes the empty string).
    pub fn new(
        name: impl Into<String>,
        entity_type: EntityType,
        file_path: impl Into<String>,
        line_start: u32,
        signature: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let file_path = file_path.into();
        let signature = signature.into();
        let now = Utc::now();
        Self {
            id: ident::entity_id(entity_type, &file_path, &name),
            sig_hash: ident::sig_hash(&signature),
            body_hash: ident::body_hash(b""),
            name,
            entity_type,
            kind: String::new(),
            visibility: Visibility::Priv,
            language: String::new(),
            file_path,
            line_start,
            line_end: None,
            signature,
            receiver: None,
            fields: None,
            body_text: None,
            doc_comment: None,
            skeleton: None,
            status: EntityStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the body text and recompute `body_hash` from its bytes.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body_hash = ident::body_hash(body.as_bytes());
        self.body_text = Some(body);
        self
    }
}

/// A partial update applied to an existing entity. `None` fields are left
/// untouched; hashes are recomputed when the corresponding source changes.
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub signature: Option<String>,
    pub body_text: Option<String>,
    pub doc_comment: Option<String>,
    pub line_start: Option<u32>,
    pub line_end: Option<Option<u32>>,
    pub visibility: Option<Visibility>,
    pub status: Option<EntityStatus>,
}

/// Filter for entity queries. Empty filter matches all active entities.
#[derive(Debug, Clone, Default)]
pub struct EntityFilter {
    pub entity_type: Option<EntityType>,
    pub file_path: Option<String>,
    pub name_like: Option<String>,
    pub language: Option<String>,
    /// None means active-only (the default view); Some filters explicitly.
    pub status: Option<EntityStatus>,
    pub include_archived: bool,
    pub limit: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_stable_for_same_path_and_name() {
        let a = Entity::new("parse", EntityType::Function, "src/lexer.rs", 10, "fn parse()");
        let b = Entity::new("parse", EntityType::Function, "src/lexer.rs", 99, "fn parse() -> X");
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("sa-function-"));
    }

    #[test]
    fn id_differs_across_files() {
        let a = Entity::new("parse", EntityType::Function, "src/a.rs", 1, "fn parse()");
        let b = Entity::new("parse", EntityType::Function, "src/b.rs", 1, "fn parse()");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn sig_hash_tracks_signature_only() {
        let a = Entity::new("f", EntityType::Function, "m.rs", 1, "fn f(x: u32)");
        let b = Entity::new("f", EntityType::Function, "m.rs", 1, "fn f(x: u64)");
        assert_ne!(a.sig_hash, b.sig_hash);

        let c = a.clone().with_body("x + 1");
        assert_eq!(a.sig_hash, c.sig_hash);
        assert_ne!(a.body_hash, c.body_hash);
    }
}

//! Typed rows for the three taxonomy tables.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

pub type TermId = i64;
pub type TermTaxonomyId = i64;
pub type ObjectId = i64;

/// Term name or slug exactly as stored.
///
/// Legacy imports leave bytes that are not valid UTF-8 in these columns.
/// Equality and hashing work on the raw bytes; display and JSON use a lossy
/// UTF-8 rendering.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct TermText(Vec<u8>);

impl TermText {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<Vec<u8>> for TermText {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for TermText {
    fn from(text: String) -> Self {
        Self(text.into_bytes())
    }
}

impl From<&str> for TermText {
    fn from(text: &str) -> Self {
        Self(text.as_bytes().to_vec())
    }
}

impl PartialEq<str> for TermText {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for TermText {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for TermText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.to_string_lossy())
    }
}

impl fmt::Debug for TermText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl Serialize for TermText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for TermText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Canonical term identity, independent of any taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub term_id: TermId,
    pub name: TermText,
    pub slug: TermText,
}

/// Binds a term to one taxonomy and carries hierarchy and the cached count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermTaxonomy {
    pub term_taxonomy_id: TermTaxonomyId,
    pub term_id: TermId,
    pub taxonomy: String,
    /// Parent *term id*; zero (or NULL in the host table) marks a root.
    pub parent: TermId,
    pub count: i64,
}

impl TermTaxonomy {
    pub fn has_parent(&self) -> bool {
        self.parent != 0
    }
}

/// Join row linking a content object to a term taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub object_id: ObjectId,
    pub term_taxonomy_id: TermTaxonomyId,
}

/// Full copy of the three tables, rows in table scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub terms: Vec<Term>,
    pub term_taxonomies: Vec<TermTaxonomy>,
    pub relationships: Vec<Relationship>,
}

//! Row model for the `Tag_Mapping` table.
//!
//! Field names on the wire follow the remote table's column names
//! (`Old_Tag`, `AI_Reasoning`, ...). Rust-side names are snake case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Stable row identifier assigned by the remote store.
pub type RowId = i64;

/// Review decision for a row.
///
/// `Unset` is stored remotely as `null` (or an empty string in older rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Action {
    Approved,
    Reject,
    #[default]
    Unset,
}

impl Action {
    /// All legal values, in the order the review UI cycles through them.
    pub const ALL: [Self; 3] = [Self::Unset, Self::Approved, Self::Reject];

    /// Wire value, or `None` for unset.
    #[must_use]
    pub const fn wire_value(self) -> Option<&'static str> {
        match self {
            Self::Approved => Some("Approved"),
            Self::Reject => Some("Reject"),
            Self::Unset => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reject => "reject",
            Self::Unset => "unset",
        }
    }

    /// Next value in the review cycle: unset -> approved -> reject -> unset.
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::Unset => Self::Approved,
            Self::Approved => Self::Reject,
            Self::Reject => Self::Unset,
        }
    }

    #[must_use]
    pub const fn is_unset(self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Lenient conversion for values read back from the remote store.
    ///
    /// Anything outside the enumeration is coerced to [`Action::Unset`].
    #[must_use]
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Unset,
            Some(value) => value.parse().unwrap_or_else(|err: ParseActionError| {
                tracing::warn!("coercing unknown action to unset: {err}");
                Self::Unset
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when text does not name a legal [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid action '{got}': expected one of approved, reject, unset")]
pub struct ParseActionError {
    pub got: String,
}

impl FromStr for Action {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "approve" => Ok(Self::Approved),
            "reject" | "rejected" => Ok(Self::Reject),
            "unset" | "none" | "" => Ok(Self::Unset),
            _ => Err(ParseActionError { got: s.to_string() }),
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.wire_value() {
            Some(value) => serializer.serialize_str(value),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Action {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_wire(raw.as_deref()))
    }
}

/// One row of the `Tag_Mapping` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagMapping {
    pub id: RowId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "Old_Tag", default)]
    pub old_tag: Option<String>,
    #[serde(rename = "New_Tag", default)]
    pub new_tag: Option<String>,
    #[serde(rename = "Action", default)]
    pub action: Action,
    #[serde(rename = "Frequency", default)]
    pub frequency: Option<i64>,
    #[serde(rename = "AI_Suggestion", default)]
    pub ai_suggestion: Option<String>,
    #[serde(rename = "AI_New_Name", default)]
    pub ai_new_name: Option<String>,
    #[serde(rename = "AI_Reasoning", default)]
    pub ai_reasoning: Option<String>,
    #[serde(rename = "Notes", default)]
    pub notes: Option<String>,
}

impl TagMapping {
    /// A row with only an id; everything else empty.
    #[must_use]
    pub const fn new(id: RowId) -> Self {
        Self {
            id,
            created_at: None,
            old_tag: None,
            new_tag: None,
            action: Action::Unset,
            frequency: None,
            ai_suggestion: None,
            ai_new_name: None,
            ai_reasoning: None,
            notes: None,
        }
    }

    /// Notes with absent normalized to the empty string.
    #[must_use]
    pub fn notes_text(&self) -> &str {
        self.notes.as_deref().unwrap_or("")
    }
}

/// Column the remote listing is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Frequency,
}

impl SortColumn {
    /// Remote column name.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Frequency => "Frequency",
        }
    }
}

/// Ordering requested from [`crate::store::RemoteStore::list_rows`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOrder {
    pub column: SortColumn,
    pub descending: bool,
}

impl RowOrder {
    /// Review order: most frequent tags first.
    pub const FREQUENCY_DESC: Self = Self {
        column: SortColumn::Frequency,
        descending: true,
    };
}

/// Update body for one row: only the fields that are pending are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartialRowUpdate {
    #[serde(rename = "Action", skip_serializing_if = "Option::is_none")]
    pub action: Option<Action>,
    #[serde(
        rename = "Notes",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_notes"
    )]
    pub notes: Option<String>,
}

impl PartialRowUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.action.is_none() && self.notes.is_none()
    }
}

// Cleared notes are written as null, matching how unset actions are stored.
#[allow(clippy::ref_option)]
fn serialize_notes<S: Serializer>(notes: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    match notes.as_deref() {
        Some("") | None => serializer.serialize_none(),
        Some(text) => serializer.serialize_str(text),
    }
}

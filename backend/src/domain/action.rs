//! Action records: the append-only ledger's unit of truth.
//!
//! Every completed, verifiable action (event attendance, logged climate
//! action) becomes one immutable [`ActionRecord`] tagged with a
//! deterministic [`DedupeKey`]. The ledger owns truth: reputation, scores,
//! ranks, and badges are all derived views rebuildable by replaying these
//! records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::ids::{ActionId, CommunityId, UserId};

/// Kind of climate action, shared by events and directly logged actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    Cleanup,
    TreePlantation,
    Recycling,
    Awareness,
}

impl ActionKind {
    /// All kinds, in catalogue order.
    pub const ALL: [Self; 4] = [
        Self::Cleanup,
        Self::TreePlantation,
        Self::Recycling,
        Self::Awareness,
    ];

    /// Canonical kebab-case name used in dedupe keys and storage.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cleanup => "cleanup",
            Self::TreePlantation => "tree-plantation",
            Self::Recycling => "recycling",
            Self::Awareness => "awareness",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown action kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action kind: {0}")]
pub struct ParseActionKindError(pub String);

impl FromStr for ActionKind {
    type Err = ParseActionKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cleanup" => Ok(Self::Cleanup),
            "tree-plantation" => Ok(Self::TreePlantation),
            "recycling" => Ok(Self::Recycling),
            "awareness" => Ok(Self::Awareness),
            other => Err(ParseActionKindError(other.to_owned())),
        }
    }
}

/// Raw numeric measurements attached to an action.
///
/// Stored as an ordered map so canonical serialisation (and therefore the
/// derived dedupe fingerprint) is independent of insertion order. Values
/// must be finite and non-negative.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawMetrics(BTreeMap<String, f64>);

/// Validation errors for [`RawMetrics`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RawMetricsError {
    #[error("metric name must not be blank")]
    BlankName,
    #[error("metric {name} must be a finite, non-negative number, got {value}")]
    InvalidValue { name: String, value: f64 },
}

impl RawMetrics {
    /// Validate and construct metrics from `(name, value)` pairs.
    pub fn try_new(
        entries: impl IntoIterator<Item = (String, f64)>,
    ) -> Result<Self, RawMetricsError> {
        let mut map = BTreeMap::new();
        for (name, value) in entries {
            if name.trim().is_empty() {
                return Err(RawMetricsError::BlankName);
            }
            if !value.is_finite() || value < 0.0 {
                return Err(RawMetricsError::InvalidValue { name, value });
            }
            map.insert(name, value);
        }
        Ok(Self(map))
    }

    /// Look up a single metric.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Iterate over `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Scalar impact contribution of these metrics before weighting.
    ///
    /// The aggregation core multiplies this by the community's clamped
    /// weighting multiplier; the sum of units over a window is the
    /// snapshot's `weighted_impact` input.
    #[must_use]
    pub fn impact_units(&self) -> f64 {
        self.0.values().sum()
    }

    /// True when no measurements were supplied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Deterministic duplicate-action guard.
///
/// The platform's sole dedupe mechanism: the same user performing the same
/// action kind within the same UTC calendar day collapses to one canonical
/// key, so completion handlers stay idempotent under retry. Derived keys
/// are SHA-256 fingerprints; caller-supplied keys are accepted verbatim
/// after validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DedupeKey(String);

/// Validation errors for caller-supplied dedupe keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DedupeKeyError {
    #[error("dedupe key must not be blank")]
    Blank,
    #[error("dedupe key must be at most {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

impl DedupeKey {
    /// Maximum accepted key length.
    pub const MAX_LEN: usize = 128;

    /// Validate a caller-supplied key.
    pub fn new(key: impl Into<String>) -> Result<Self, DedupeKeyError> {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DedupeKeyError::Blank);
        }
        if key.len() > Self::MAX_LEN {
            return Err(DedupeKeyError::TooLong {
                max: Self::MAX_LEN,
                actual: key.len(),
            });
        }
        Ok(Self(key))
    }

    /// Derive the canonical key for `(user, kind, occurred_at)`.
    ///
    /// The fingerprint covers the user id, the action kind, and the UTC
    /// calendar day of `occurred_at`, so any two submissions of the same
    /// action within one rolling day share a key.
    #[must_use]
    pub fn derive(user_id: UserId, kind: ActionKind, occurred_at: DateTime<Utc>) -> Self {
        let day = occurred_at.date_naive();
        let mut hasher = Sha256::new();
        hasher.update(user_id.as_uuid().as_bytes());
        hasher.update(b":");
        hasher.update(kind.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(day.to_string().as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Borrow the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DedupeKey {
    type Error = DedupeKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DedupeKey> for String {
    fn from(value: DedupeKey) -> Self {
        value.0
    }
}

/// Payload for a ledger append; the ledger assigns the [`ActionId`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewActionRecord {
    pub dedupe_key: DedupeKey,
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub kind: ActionKind,
    pub raw_metrics: RawMetrics,
    pub occurred_at: DateTime<Utc>,
}

/// Immutable, append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRecord {
    pub id: ActionId,
    pub dedupe_key: DedupeKey,
    pub user_id: UserId,
    pub community_id: CommunityId,
    pub kind: ActionKind,
    pub raw_metrics: RawMetrics,
    pub occurred_at: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

impl ActionRecord {
    /// Materialise a record from its append payload.
    #[must_use]
    pub fn from_new(new: NewActionRecord, id: ActionId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id,
            dedupe_key: new.dedupe_key,
            user_id: new.user_id,
            community_id: new.community_id,
            kind: new.kind,
            raw_metrics: new.raw_metrics,
            occurred_at: new.occurred_at,
            recorded_at,
        }
    }
}

//! The portable backup file.
//!
//! On disk an artifact is one JSON object: a key per collection mapping
//! document ids to encoded bodies, plus a `metadata` object describing who
//! produced it and when.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use optivault_core::{CollectionName, DocumentId};

use crate::error::{BackupError, RestoreError};

/// Encoded documents of one collection, by id.
pub type CollectionData = BTreeMap<DocumentId, JsonValue>;

const METADATA_KEY: &str = "metadata";

/// Ownership and provenance of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    /// Tenant that produced the artifact. Empty means nobody may restore it.
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_id: String,
    /// Advisory only.
    #[serde(default, deserialize_with = "lenient_string")]
    pub owner_email: String,
    #[serde(default, with = "created_at")]
    pub created_at: Option<DateTime<Utc>>,
    /// Collections included, in restore order.
    pub collections: Vec<CollectionName>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_documents: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub security_level: String,
}

/// A parsed or freshly assembled backup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub metadata: ArtifactMetadata,
    #[serde(flatten)]
    pub collections: BTreeMap<CollectionName, CollectionData>,
}

impl Artifact {
    /// Parse and structurally check an artifact.
    ///
    /// `metadata.collections` must be a list of names. Every listed
    /// collection must be an object; a listed collection that is absent or
    /// `null` is treated as empty. Top-level keys not listed in the
    /// metadata are ignored.
    pub fn parse(bytes: &[u8]) -> Result<Self, RestoreError> {
        let root: JsonValue = serde_json::from_slice(bytes)
            .map_err(|e| RestoreError::Parse(format!("not a JSON document: {e}")))?;
        let JsonValue::Object(mut root) = root else {
            return Err(RestoreError::Parse("top level is not an object".into()));
        };

        let metadata = match root.remove(METADATA_KEY) {
            Some(JsonValue::Object(metadata)) => metadata,
            Some(_) => return Err(RestoreError::Parse("metadata is not an object".into())),
            None => return Err(RestoreError::Parse("metadata is missing".into())),
        };
        match metadata.get("collections") {
            Some(JsonValue::Array(_)) => {}
            Some(JsonValue::Null) | None => {
                return Err(RestoreError::Parse(
                    "metadata.collections is missing".into(),
                ));
            }
            Some(_) => {
                return Err(RestoreError::Parse(
                    "metadata.collections is not a list".into(),
                ));
            }
        }
        let metadata: ArtifactMetadata = serde_json::from_value(JsonValue::Object(metadata))
            .map_err(|e| RestoreError::Parse(format!("invalid metadata: {e}")))?;

        let mut collections = BTreeMap::new();
        for name in &metadata.collections {
            if collections.contains_key(name) {
                continue;
            }
            let documents = match root.remove(name.as_str()) {
                Some(JsonValue::Object(documents)) => documents
                    .into_iter()
                    .map(|(id, body)| (DocumentId::from(id), body))
                    .collect(),
                Some(JsonValue::Null) | None => {
                    warn!(collection = %name, "listed collection is absent from backup, treating as empty");
                    CollectionData::new()
                }
                Some(_) => {
                    return Err(RestoreError::Parse(format!(
                        "collection {name} is not an object"
                    )));
                }
            };
            collections.insert(name.clone(), documents);
        }
        if !root.is_empty() {
            debug!(ignored = root.len(), "backup carries unlisted top-level keys");
        }

        Ok(Self {
            metadata,
            collections,
        })
    }

    /// Serialize the artifact as pretty-printed JSON.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, BackupError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Documents of one collection, if the collection is present.
    #[must_use]
    pub fn collection(&self, name: &CollectionName) -> Option<&CollectionData> {
        self.collections.get(name)
    }

    /// Number of documents actually present across all collections.
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.collections.values().map(BTreeMap::len).sum()
    }

    /// Summarize the artifact without touching storage.
    #[must_use]
    pub fn preview(&self) -> ArtifactPreview {
        ArtifactPreview {
            owner_id: self.metadata.owner_id.clone(),
            owner_email: self.metadata.owner_email.clone(),
            created_at: self.metadata.created_at,
            version: self.metadata.version.clone(),
            security_level: self.metadata.security_level.clone(),
            declared_documents: self.metadata.total_documents,
            counted_documents: self.document_count(),
            collections: self
                .metadata
                .collections
                .iter()
                .map(|name| CollectionCount {
                    name: name.clone(),
                    documents: self.collection(name).map_or(0, BTreeMap::len),
                })
                .collect(),
        }
    }
}

/// What an artifact contains, for display before a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactPreview {
    pub owner_id: String,
    pub owner_email: String,
    pub created_at: Option<DateTime<Utc>>,
    pub version: String,
    pub security_level: String,
    /// `metadata.totalDocuments` as written by the exporter.
    pub declared_documents: u64,
    /// Documents actually present in the file.
    pub counted_documents: usize,
    pub collections: Vec<CollectionCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionCount {
    pub name: CollectionName,
    pub documents: usize,
}

/// Parse an artifact and summarize it. No ownership decision is made.
pub fn inspect(bytes: &[u8]) -> Result<ArtifactPreview, RestoreError> {
    Artifact::parse(bytes).map(|artifact| artifact.preview())
}

/// Suggested file name, `backup_<email>_<YYYY-MM-DD_HH-MM-SS>.json`.
///
/// Characters outside `[A-Za-z0-9._-]` in the email are replaced with `_`.
#[must_use]
pub fn default_file_name(email: &str, now: DateTime<Utc>) -> String {
    let sanitized: String = if email.trim().is_empty() {
        "unknown".to_owned()
    } else {
        email
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    };
    format!("backup_{sanitized}_{}.json", now.format("%Y-%m-%d_%H-%M-%S"))
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(JsonValue::deserialize(deserializer)?
        .as_u64()
        .unwrap_or_default())
}

/// `createdAt` is written tagged and read through the normalizer, so
/// artifacts from older exporters keep their creation time.
mod created_at {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value as JsonValue;

    use optivault_core::Value;

    use crate::normalize;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map_or(Value::Null, Value::Timestamp).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        Ok(normalize::from_serializable(&raw, Some("createdAt")).and_then(|v| v.as_timestamp()))
    }
}

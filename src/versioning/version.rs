//! Version - Immutable file version
//!
//! A version is an immutable snapshot of a file's content:
//! - Numbered from 1, contiguous per file
//! - Content never changes once created
//! - Updates create new versions only
//!
//! All fields are private to enforce immutability.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A single immutable file version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// Sequence number, starting at 1.
    number: u64,
    /// Content snapshot, base64 in documents.
    #[serde(serialize_with = "serialize_content", deserialize_with = "deserialize_content")]
    content: Vec<u8>,
    created_at: DateTime<Utc>,
    modified_at: DateTime<Utc>,
}

impl Version {
    /// Creates a new version stamped with the current time.
    ///
    /// After construction, the version cannot be modified.
    pub fn new(number: u64, content: Vec<u8>) -> Self {
        let now = Utc::now();
        Self {
            number,
            content,
            created_at: now,
            modified_at: now,
        }
    }

    /// Returns the sequence number.
    #[inline]
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Returns the content snapshot.
    #[inline]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Consumes the version, returning its content.
    pub fn into_content(self) -> Vec<u8> {
        self.content
    }

    #[inline]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn modified_at(&self) -> DateTime<Utc> {
        self.modified_at
    }
}

fn serialize_content<S: Serializer>(content: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(content))
}

fn deserialize_content<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let text = String::deserialize(deserializer)?;
    base64::engine::general_purpose::STANDARD
        .decode(text)
        .map_err(serde::de::Error::custom)
}

/// The complete version history of one file.
///
/// This is the persisted document shape: one history per storage key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionHistory {
    filename: String,
    versions: Vec<Version>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl VersionHistory {
    /// Creates an empty history for the given filename.
    pub fn new(filename: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            filename: filename.into(),
            versions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[inline]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns all versions in ascending order.
    #[inline]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    pub fn into_versions(self) -> Vec<Version> {
        self.versions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn latest(&self) -> Option<&Version> {
        self.versions.last()
    }

    /// Number of the latest version, 0 when empty.
    pub fn latest_number(&self) -> u64 {
        self.latest().map(Version::number).unwrap_or(0)
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Appends the next version.
    ///
    /// Fails with the expected number if `version` does not directly follow
    /// the current latest.
    pub fn push(&mut self, version: Version) -> Result<(), u64> {
        let expected = self.latest_number() + 1;
        if version.number() != expected {
            return Err(expected);
        }
        self.updated_at = version.created_at();
        self.versions.push(version);
        Ok(())
    }

    /// Checks that numbers run 1..=n without gaps or duplicates.
    pub fn validate(&self) -> Result<(), String> {
        for (index, version) in self.versions.iter().enumerate() {
            let expected = index as u64 + 1;
            if version.number() != expected {
                return Err(format!(
                    "history of '{}' has version {} at position {}",
                    self.filename,
                    version.number(),
                    expected
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_accessors() {
        let version = Version::new(1, b"hello".to_vec());

        assert_eq!(version.number(), 1);
        assert_eq!(version.content(), b"hello");
        assert_eq!(version.created_at(), version.modified_at());
    }

    #[test]
    fn test_version_serializes_content_as_base64() {
        let version = Version::new(3, vec![0, 159, 146, 150]);
        let json = serde_json::to_value(&version).unwrap();

        assert_eq!(json["number"], 3);
        assert_eq!(json["content"], "AJ+Slg==");

        let decoded: Version = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, version);
    }

    #[test]
    fn test_history_push_enforces_contiguity() {
        let mut history = VersionHistory::new("notes.txt");
        assert_eq!(history.latest_number(), 0);

        history.push(Version::new(1, b"a".to_vec())).unwrap();
        history.push(Version::new(2, b"b".to_vec())).unwrap();

        assert_eq!(history.push(Version::new(2, b"dup".to_vec())), Err(3));
        assert_eq!(history.push(Version::new(5, b"gap".to_vec())), Err(3));
        assert_eq!(history.len(), 2);
        assert_eq!(history.latest_number(), 2);
    }

    #[test]
    fn test_validate_detects_gaps() {
        let json = serde_json::json!({
            "filename": "f",
            "versions": [
                serde_json::to_value(Version::new(1, vec![])).unwrap(),
                serde_json::to_value(Version::new(3, vec![])).unwrap(),
            ],
            "created_at": Utc::now(),
            "updated_at": Utc::now(),
        });
        let history: VersionHistory = serde_json::from_value(json).unwrap();
        assert!(history.validate().is_err());
    }
}

//! Document checksums
//!
//! A document's checksum is the CRC32 of its compact JSON encoding. The
//! encoding of a `serde_json::Value` is stable across a write/read cycle, so
//! a reloaded document hashes to the same value unless its file was altered.

use serde_json::Value;

use super::errors::{MetadataError, MetadataResult};

/// CRC32 of the compact encoding of `document`.
pub fn document_checksum(document: &Value) -> MetadataResult<u32> {
    let canonical = serde_json::to_vec(document).map_err(|e| MetadataError::Corrupted {
        target: "<document>".to_string(),
        reason: e.to_string(),
    })?;
    Ok(crc32fast::hash(&canonical))
}

/// Fails with `Corrupted` naming `target` when `document` no longer matches
/// the checksum it was stored with.
pub fn verify_document(target: &str, document: &Value, stored: u32) -> MetadataResult<()> {
    let computed = document_checksum(document)?;
    if computed != stored {
        return Err(MetadataError::Corrupted {
            target: target.to_string(),
            reason: format!(
                "checksum mismatch: stored {:08x}, computed {:08x}",
                stored, computed
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_is_stable_across_reparse() {
        let doc = json!({"filename": "notes.txt", "versions": [1, 2, 3]});
        let reparsed: Value = serde_json::from_slice(&serde_json::to_vec(&doc).unwrap()).unwrap();

        assert_eq!(
            document_checksum(&doc).unwrap(),
            document_checksum(&reparsed).unwrap()
        );
    }

    #[test]
    fn test_altered_document_is_corrupted() {
        let doc = json!({"latest_version": 2});
        let stored = document_checksum(&doc).unwrap();

        assert!(verify_document("files/a", &doc, stored).is_ok());

        let altered = json!({"latest_version": 3});
        let err = verify_document("files/a", &altered, stored).unwrap_err();
        assert!(matches!(err, MetadataError::Corrupted { ref target, .. } if target == "files/a"));
    }
}

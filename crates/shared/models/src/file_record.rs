use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{FileRecordId, UserId};

/// §4.5 step 5, §6.5 "persisted state layout... and file records". The
/// object store itself is an external collaborator (out of scope, §1); the
/// core only owns the pointer row so tools can be told what's attached.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FileRecord {
    pub id: FileRecordId,
    pub user_id: UserId,
    pub filename: String,
    pub url: String,
    pub mime_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    #[must_use]
    pub fn new(user_id: UserId, filename: impl Into<String>, url: impl Into<String>, mime_type: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: FileRecordId::generate(),
            user_id,
            filename: filename.into(),
            url: url.into(),
            mime_type,
            created_at: now,
        }
    }
}

/// §4.5 step 5: enrich the user-visible message with a parenthetical
/// listing of attached files so tools know what's available.
#[must_use]
pub fn describe_attachments(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }
    let listing = records
        .iter()
        .map(|r| format!("{} ({})", r.filename, r.url))
        .collect::<Vec<_>>()
        .join(", ");
    format!(" (attached files, available to tools by URL: {listing})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_attachments_produces_empty_suffix() {
        assert_eq!(describe_attachments(&[]), "");
    }

    #[test]
    fn attachments_are_listed_by_filename_and_url() {
        let record = FileRecord::new(UserId::generate(), "report.pdf", "https://files/x", None, Utc::now());
        let suffix = describe_attachments(&[record]);
        assert!(suffix.contains("report.pdf"));
        assert!(suffix.contains("https://files/x"));
    }
}

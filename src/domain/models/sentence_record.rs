use serde::{Deserialize, Serialize};

/// Separator placed between sentences when a collection is read back as a blob.
pub const BLOB_SEPARATOR: &str = " ";

/// One persisted sentence and its 0-based position within the source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    n: u64,
    sent: String,
}

impl SentenceRecord {
    pub fn new(n: u64, sent: impl Into<String>) -> Self {
        Self {
            n,
            sent: sent.into(),
        }
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn sent(&self) -> &str {
        &self.sent
    }
}

/// Joins sentences that are already in `n` order.
pub fn join_blob<I, S>(sentences: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut blob = String::new();
    for (i, sent) in sentences.into_iter().enumerate() {
        if i > 0 {
            blob.push_str(BLOB_SEPARATOR);
        }
        blob.push_str(sent.as_ref());
    }
    blob
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_uses_single_space() {
        assert_eq!(join_blob(["Sun is hot.", "It is bright."]), "Sun is hot. It is bright.");
        assert_eq!(join_blob(Vec::<String>::new()), "");
    }

    #[test]
    fn record_serializes_as_n_and_sent() {
        let json = serde_json::to_value(SentenceRecord::new(4, "Hi.")).unwrap();
        assert_eq!(json, serde_json::json!({"n": 4, "sent": "Hi."}));
    }
}

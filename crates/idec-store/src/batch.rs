//! Bundle decoding shared by the backends.
//!
//! Every entry is decoded before any backend writes anything, so a malformed
//! entry never leaves a half-applied batch behind it.

use std::collections::HashSet;

use idec_core::{validate_echoarea, BundleEntry, Message, MsgId};

/// A bundle entry that decoded cleanly.
#[derive(Debug, Clone)]
pub(crate) struct PreparedEntry {
    pub echoarea: String,
    pub msgid: MsgId,
    pub record: String,
}

/// Decode a bundle, dropping malformed entries and repeated msgids.
pub(crate) fn prepare_batch(entries: &[BundleEntry]) -> Vec<PreparedEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    let mut prepared = Vec::with_capacity(entries.len());

    for entry in entries {
        if !seen.insert(entry.msgid.clone()) {
            continue;
        }
        let record = match entry.decode_record() {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(msgid = %entry.msgid, "skipping undecodable bundle entry: {}", e);
                continue;
            }
        };
        let echoarea = match Message::echoarea_of(&record) {
            Ok(echoarea) => echoarea.to_string(),
            Err(e) => {
                tracing::warn!(msgid = %entry.msgid, "skipping malformed bundle entry: {}", e);
                continue;
            }
        };
        if let Err(e) = validate_echoarea(&echoarea) {
            tracing::warn!(msgid = %entry.msgid, "skipping bundle entry: {}", e);
            continue;
        }
        prepared.push(PreparedEntry {
            echoarea,
            msgid: entry.msgid.clone(),
            record,
        });
    }

    prepared
}

#[cfg(test)]
mod tests {
    use super::*;
    use idec_core::msgid_for;

    fn entry(record: &str) -> BundleEntry {
        BundleEntry::from_record(msgid_for(record), record)
    }

    #[test]
    fn test_prepare_extracts_echoarea() {
        let record = "ii/ok\nchat\n1\nchat\nbob\n1\nAll\nhi\n\nhello";
        let prepared = prepare_batch(&[entry(record)]);
        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].echoarea, "chat");
        assert_eq!(prepared[0].record, record);
    }

    #[test]
    fn test_prepare_drops_repeats_and_garbage() {
        let record = "ii/ok\nchat\n1\nchat\nbob\n1\nAll\nhi\n\nhello";
        let garbage = BundleEntry {
            msgid: MsgId::parse("AAAAAAAAAAAAAAAAAAAA").unwrap(),
            encoded: "%%%".to_string(),
        };
        let traversal = entry("ii/ok\n../escape\n1\nx\nbob\n1\nAll\nhi\n\nhello");
        let prepared = prepare_batch(&[entry(record), entry(record), garbage, traversal]);
        assert_eq!(prepared.len(), 1);
    }
}

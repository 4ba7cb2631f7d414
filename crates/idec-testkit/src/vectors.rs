//! Golden test vectors for deterministic verification.
//!
//! Msgids and authstrs are derived, never stored, so every node on the
//! network has to compute the exact same strings. These vectors pin them.

use serde::{Deserialize, Serialize};

use idec_core::{derive_authstr, msgid_for};

/// A record and the msgid every node must derive for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: String,
    /// The canonical record text.
    pub record: String,
    /// Expected msgid.
    pub expected_msgid: String,
}

/// A username/nonce pair and the authstr derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthstrVector {
    pub username: String,
    pub nonce: u32,
    pub expected_authstr: String,
}

fn vector(name: &str, record: &str, expected_msgid: &str) -> GoldenVector {
    GoldenVector {
        name: name.to_string(),
        record: record.to_string(),
        expected_msgid: expected_msgid.to_string(),
    }
}

/// Get all golden msgid vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        vector(
            "plain message",
            "ii/ok\nii.test.14\n1600000000\nii.test.14\nbob\n1\nAll\nhi\n\nhello",
            "LUzYMFEcWgATmtEYJvAw",
        ),
        vector(
            "reply with two body lines",
            "ii/ok/repto/AbCdEfGhIjKlMnOpQrSt\nchat\n1700000000\nchat\nalice\n2\nbob\nRe: hi\n\nline one\nline two",
            "1eDBNydrbOC00MqGmXaB",
        ),
        vector(
            "empty subject and body",
            "ii/ok\nempty.body\n0\nempty.body\nx\n7\nAll\n\n\n",
            "oWUCF74uP3qZl3AdAvss",
        ),
        vector("empty record", "", "47DEQpj8HBSaAzTImWA5"),
    ]
}

/// Get all golden authstr vectors.
pub fn authstr_vectors() -> Vec<AuthstrVector> {
    [("alice", 42, "4p4KGQnD"), ("bob", 999_999_999, "dwWkNBih")]
        .into_iter()
        .map(|(username, nonce, expected)| AuthstrVector {
            username: username.to_string(),
            nonce,
            expected_authstr: expected.to_string(),
        })
        .collect()
}

/// Check every vector against this implementation.
///
/// Returns `(name, passed, computed)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    let msgids = all_vectors().into_iter().map(|v| {
        let computed = msgid_for(&v.record).to_string();
        (v.name, computed == v.expected_msgid, computed)
    });
    let authstrs = authstr_vectors().into_iter().map(|v| {
        let computed = derive_authstr(&v.username, v.nonce);
        (
            format!("authstr {}/{}", v.username, v.nonce),
            computed == v.expected_authstr,
            computed,
        )
    });
    msgids.chain(authstrs).collect()
}

/// The vector table as JSON, for other implementations to check against.
pub fn vectors_json() -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Table {
        msgids: Vec<GoldenVector>,
        authstrs: Vec<AuthstrVector>,
    }
    serde_json::to_string_pretty(&Table {
        msgids: all_vectors(),
        authstrs: authstr_vectors(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_vectors_pass() {
        for (name, passed, computed) in verify_all_vectors() {
            assert!(passed, "{name}: computed {computed}");
        }
    }

    #[test]
    fn test_vector_names_are_unique() {
        let vectors = all_vectors();
        let mut names: Vec<_> = vectors.iter().map(|v| v.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), vectors.len());
    }

    #[test]
    fn test_json_table_survives_a_reload() {
        let json = vectors_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let msgids: Vec<GoldenVector> =
            serde_json::from_value(value["msgids"].clone()).unwrap();
        let authstrs: Vec<AuthstrVector> =
            serde_json::from_value(value["authstrs"].clone()).unwrap();
        assert_eq!(msgids, all_vectors());
        assert_eq!(authstrs, authstr_vectors());
    }
}

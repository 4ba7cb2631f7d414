//! Digest-derived tokens: msgids and point authstrs.
//!
//! Both are a SHA-256 digest rendered as URL-safe base64 with `-` replaced by
//! `A` and `_` replaced by `z`, then cut to length. The substitution keeps the
//! tokens alphanumeric so they are safe in file names and URL paths.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::types::{MsgId, MSGID_LEN};

/// Length of a point authstr.
pub const AUTHSTR_LEN: usize = 8;

/// Upper bound (inclusive) of the random nonce mixed into an authstr.
pub const AUTHSTR_NONCE_MAX: u32 = 999_999_999;

/// SHA-256 of `data` as substituted URL-safe base64 (44 chars, `=` padded).
fn digest_token(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    URL_SAFE.encode(digest).replace('-', "A").replace('_', "z")
}

/// Compute the msgid of a canonical record.
///
/// Identical record bytes always give the same id. This is a deduplication
/// key, not a defence against deliberately colliding records.
pub fn msgid_for(record: &str) -> MsgId {
    let token = digest_token(record.as_bytes());
    MsgId::from_valid(token[..MSGID_LEN].to_string())
}

/// Derive an authstr from a username and a nonce.
pub fn derive_authstr(username: &str, nonce: u32) -> String {
    let token = digest_token(format!("{username}{nonce}").as_bytes());
    let cut = &token[..AUTHSTR_LEN.min(token.len())];
    format!("{cut:A<width$}", width = AUTHSTR_LEN)
}

/// Generate a fresh authstr for a username with a random nonce.
pub fn generate_authstr<R: Rng + ?Sized>(username: &str, rng: &mut R) -> String {
    let nonce = rng.gen_range(1..=AUTHSTR_NONCE_MAX);
    derive_authstr(username, nonce)
}

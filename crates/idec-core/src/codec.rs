//! Message codec: canonicalization, admission and bundle bodies.
//!
//! Admission is the pure half of tossing. It builds the canonical record from
//! a point's submission, enforces the size limit and derives the msgid. The
//! caller persists the result; nothing here touches storage, so a rejected
//! submission can never leave a partial write behind.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::crypto::msgid_for;
use crate::error::{CoreError, Result};
use crate::message::{Message, BASE_TAGS};
use crate::submission::Submission;
use crate::types::{MsgId, PointIdentity};

/// Largest admissible canonical record, in bytes.
pub const MAX_MESSAGE_SIZE: usize = 65535;

/// Decoder that accepts what legacy peers actually send: either alphabet,
/// with or without padding.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// A submission that passed admission and is ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admitted {
    pub echoarea: String,
    pub record: String,
    pub msgid: MsgId,
}

/// Build the canonical message for a submission.
///
/// `date` is the admitting node's clock; submitters never choose it.
pub fn canonicalize(point: &PointIdentity, submission: &Submission, date: i64) -> Message {
    let tags = match &submission.repto {
        Some(repto) => format!("{BASE_TAGS}/repto/{repto}"),
        None => BASE_TAGS.to_string(),
    };
    Message {
        tags,
        echoarea: submission.echoarea.clone(),
        date,
        distribution: submission.echoarea.clone(),
        from: point.name.clone(),
        address: point.address.clone(),
        to: submission.to.clone(),
        subject: submission.subject.clone(),
        body: submission.body.clone(),
    }
}

/// Validate, canonicalize, size-check and hash a submission.
pub fn admit(point: &PointIdentity, submission: &Submission, date: i64) -> Result<Admitted> {
    submission.validate()?;
    let record = canonicalize(point, submission, date).to_record();
    if record.len() > MAX_MESSAGE_SIZE {
        return Err(CoreError::TooLarge {
            size: record.len(),
            limit: MAX_MESSAGE_SIZE,
        });
    }
    let msgid = msgid_for(&record);
    Ok(Admitted {
        echoarea: submission.echoarea.clone(),
        record,
        msgid,
    })
}

/// Decode base64 text leniently and require UTF-8.
///
/// Spaces are mapped back to `+` because form decoding turns an unescaped `+`
/// into a space; line breaks are dropped.
pub fn decode_base64_text(encoded: &str) -> Result<String> {
    let normalized: String = encoded
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\n' | '\r' | '\t'))
        .map(|c| match c {
            ' ' | '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();
    let bytes = LENIENT
        .decode(normalized.as_bytes())
        .map_err(|e| CoreError::Decoding(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
}

/// One `msgid:base64(record)` pair of a sync bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntry {
    pub msgid: MsgId,
    pub encoded: String,
}

impl BundleEntry {
    /// Encode a stored record for a bundle.
    pub fn from_record(msgid: MsgId, record: &str) -> Self {
        Self {
            msgid,
            encoded: URL_SAFE.encode(record),
        }
    }

    /// Decode the record text carried by this entry.
    pub fn decode_record(&self) -> Result<String> {
        decode_base64_text(&self.encoded)
    }
}

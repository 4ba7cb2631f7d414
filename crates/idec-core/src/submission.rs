//! Point submissions (the `tmsg` payload).
//!
//! A point sends base64 of:
//!
//! ```text
//! echoarea
//! to
//! subject
//!
//! @repto:<msgid>     (optional)
//! body...
//! ```
//!
//! The blank line after the subject is what every legacy client sends, but it
//! is optional on input.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::codec::decode_base64_text;
use crate::error::{CoreError, Result};
use crate::types::{validate_echoarea, MsgId};

const REPTO_PREFIX: &str = "@repto:";

/// A message as submitted by a point, before the node canonicalizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub echoarea: String,
    pub to: String,
    pub subject: String,
    pub repto: Option<MsgId>,
    pub body: String,
}

impl Submission {
    pub fn new(
        echoarea: impl Into<String>,
        to: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            echoarea: echoarea.into(),
            to: to.into(),
            subject: subject.into(),
            repto: None,
            body: body.into(),
        }
    }

    /// Mark this submission as a reply to `msgid`.
    pub fn reply_to(mut self, msgid: MsgId) -> Self {
        self.repto = Some(msgid);
        self
    }

    /// Decode the transport form (base64 of the payload).
    pub fn decode(tmsg: &str) -> Result<Self> {
        let payload = decode_base64_text(tmsg)
            .map_err(|e| CoreError::MalformedSubmission(e.to_string()))?;
        Self::from_payload(&payload)
    }

    /// Parse the decoded payload text.
    pub fn from_payload(payload: &str) -> Result<Self> {
        let (echoarea, rest) = header_line(payload, "echoarea")?;
        let (to, rest) = header_line(rest.unwrap_or_default(), "recipient")?;
        let (subject, rest) = header_line(rest.unwrap_or_default(), "subject")?;
        let mut rest = rest.unwrap_or_default();

        if let Some(after_blank) = rest.strip_prefix('\n') {
            rest = after_blank;
        } else if let Some(after_blank) = rest.strip_prefix("\r\n") {
            rest = after_blank;
        }

        let mut repto = None;
        if let Some(marked) = rest.strip_prefix(REPTO_PREFIX) {
            let (line, after) = match marked.split_once('\n') {
                Some((line, after)) => (line, after),
                None => (marked, ""),
            };
            let id = MsgId::parse(line.trim())
                .map_err(|_| CoreError::MalformedSubmission(format!("bad repto {:?}", line)))?;
            repto = Some(id);
            rest = after;
        }

        let submission = Self {
            echoarea: echoarea.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            repto,
            body: rest.to_string(),
        };
        submission.validate()?;
        Ok(submission)
    }

    /// Render the payload text, including the blank separator line.
    pub fn to_payload(&self) -> String {
        let mut payload = format!("{}\n{}\n{}\n\n", self.echoarea, self.to, self.subject);
        if let Some(repto) = &self.repto {
            payload.push_str(REPTO_PREFIX);
            payload.push_str(repto.as_str());
            payload.push('\n');
        }
        payload.push_str(&self.body);
        payload
    }

    /// Encode for transport (URL-safe base64, padded).
    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.to_payload())
    }

    /// Check the fields that end up as single header lines.
    pub fn validate(&self) -> Result<()> {
        validate_echoarea(&self.echoarea)
            .map_err(|e| CoreError::MalformedSubmission(e.to_string()))?;
        if self.to.is_empty() {
            return Err(CoreError::MalformedSubmission("empty recipient".into()));
        }
        for (field, value) in [("recipient", &self.to), ("subject", &self.subject)] {
            if value.contains('\n') || value.contains('\r') {
                return Err(CoreError::MalformedSubmission(format!(
                    "{field} spans multiple lines"
                )));
            }
        }
        Ok(())
    }
}

/// Split off one header line, tolerating a CRLF ending.
fn header_line<'a>(s: &'a str, what: &str) -> Result<(&'a str, Option<&'a str>)> {
    if s.is_empty() && what != "subject" {
        return Err(CoreError::MalformedSubmission(format!("missing {what}")));
    }
    let (line, rest) = match s.split_once('\n') {
        Some((line, rest)) => (line, Some(rest)),
        None => (s, None),
    };
    Ok((line.strip_suffix('\r').unwrap_or(line), rest))
}

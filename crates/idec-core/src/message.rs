//! The canonical echomail record.
//!
//! On the wire a message is eight newline-separated header fields, a blank
//! line and the body:
//!
//! ```text
//! tags
//! echoarea
//! date
//! echoarea      (distribution position, same value for locally tossed mail)
//! from
//! address
//! to
//! subject
//!
//! body...
//! ```
//!
//! The record text is what gets hashed into the msgid, so [`Message::to_record`]
//! must reproduce it byte for byte.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Tags carried by every locally tossed message.
pub const BASE_TAGS: &str = "ii/ok";

/// Number of header lines before the blank separator.
const HEADER_LINES: usize = 8;

/// A canonical message split into its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub tags: String,
    /// Echoarea the message was written to (line 2).
    pub echoarea: String,
    /// Unix timestamp in seconds, assigned by the admitting node.
    pub date: i64,
    /// Echoarea in the distribution position (line 4).
    ///
    /// Kept separate from `echoarea` because the legacy layout carries both;
    /// locally tossed messages set them to the same value.
    pub distribution: String,
    pub from: String,
    pub address: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Message {
    /// Render the canonical record text.
    pub fn to_record(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n{}\n{}\n\n{}",
            self.tags,
            self.echoarea,
            self.date,
            self.distribution,
            self.from,
            self.address,
            self.to,
            self.subject,
            self.body
        )
    }

    /// Parse a canonical record.
    pub fn parse(record: &str) -> Result<Self> {
        let mut parts = record.splitn(HEADER_LINES + 2, '\n');
        let mut header = Vec::with_capacity(HEADER_LINES);
        for _ in 0..HEADER_LINES {
            let line = parts.next().ok_or_else(|| {
                CoreError::MalformedRecord(format!(
                    "expected {} header lines, got {}",
                    HEADER_LINES,
                    header.len()
                ))
            })?;
            header.push(line);
        }

        match parts.next() {
            Some("") => {}
            Some(other) => {
                return Err(CoreError::MalformedRecord(format!(
                    "expected blank line after subject, got {other:?}"
                )))
            }
            None => {
                return Err(CoreError::MalformedRecord(
                    "missing blank line after subject".into(),
                ))
            }
        }
        let body = parts.next().unwrap_or_default();

        let date = header[2]
            .trim()
            .parse::<i64>()
            .map_err(|_| CoreError::MalformedRecord(format!("bad date {:?}", header[2])))?;

        Ok(Self {
            tags: header[0].to_string(),
            echoarea: header[1].to_string(),
            date,
            distribution: header[3].to_string(),
            from: header[4].to_string(),
            address: header[5].to_string(),
            to: header[6].to_string(),
            subject: header[7].to_string(),
            body: body.to_string(),
        })
    }

    /// Extract the echoarea (line 2) without parsing the rest of the record.
    pub fn echoarea_of(record: &str) -> Result<&str> {
        record
            .split('\n')
            .nth(1)
            .ok_or_else(|| CoreError::MalformedRecord("record has no echoarea line".into()))
    }

    /// The reply-to msgid carried in the tags, if any.
    pub fn repto(&self) -> Option<&str> {
        let mut fields = self.tags.split('/');
        while let Some(field) = fields.next() {
            if field == "repto" {
                return fields.next();
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            tags: BASE_TAGS.to_string(),
            echoarea: "ii.test.14".to_string(),
            date: 1_600_000_000,
            distribution: "ii.test.14".to_string(),
            from: "bob".to_string(),
            address: "1".to_string(),
            to: "All".to_string(),
            subject: "hi".to_string(),
            body: "hello".to_string(),
        }
    }

    #[test]
    fn test_record_layout() {
        assert_eq!(
            sample().to_record(),
            "ii/ok\nii.test.14\n1600000000\nii.test.14\nbob\n1\nAll\nhi\n\nhello"
        );
    }

    #[test]
    fn test_parse_multiline_body() {
        let mut msg = sample();
        msg.body = "line one\n\nline three\n".to_string();
        let parsed = Message::parse(&msg.to_record()).unwrap();
        assert_eq!(parsed, msg);
    }

    #[test]
    fn test_parse_empty_body_and_subject() {
        let record = "ii/ok\nempty.body\n0\nempty.body\nx\n7\nAll\n\n\n";
        let parsed = Message::parse(record).unwrap();
        assert_eq!(parsed.subject, "");
        assert_eq!(parsed.body, "");
        assert_eq!(parsed.to_record(), record);
    }

    #[test]
    fn test_distribution_is_independent() {
        let mut msg = sample();
        msg.distribution = "relay.area".to_string();
        let parsed = Message::parse(&msg.to_record()).unwrap();
        assert_eq!(parsed.echoarea, "ii.test.14");
        assert_eq!(parsed.distribution, "relay.area");
    }

    #[test]
    fn test_parse_rejects_short_record() {
        assert!(matches!(
            Message::parse("ii/ok\nchat\n1"),
            Err(CoreError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let record = "ii/ok\nchat\n1\nchat\nbob\n1\nAll\nhi\nhello";
        assert!(Message::parse(record).is_err());
    }

    #[test]
    fn test_parse_rejects_bad_date() {
        let record = "ii/ok\nchat\nyesterday\nchat\nbob\n1\nAll\nhi\n\nhello";
        assert!(Message::parse(record).is_err());
    }

    #[test]
    fn test_echoarea_of() {
        assert_eq!(Message::echoarea_of(&sample().to_record()).unwrap(), "ii.test.14");
        assert!(Message::echoarea_of("only-tags").is_err());
    }

    #[test]
    fn test_repto() {
        let mut msg = sample();
        assert_eq!(msg.repto(), None);
        msg.tags = "ii/ok/repto/AbCdEfGhIjKlMnOpQrSt".to_string();
        assert_eq!(msg.repto(), Some("AbCdEfGhIjKlMnOpQrSt"));
    }
}

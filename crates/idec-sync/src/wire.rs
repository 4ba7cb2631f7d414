//! IDEC wire format: request paths, response rendering and parsing.
//!
//! Every response is plain text, one item per line. List responses end with
//! an empty line (`\n\n`) as legacy nodes send them. Parsers are forgiving:
//! empty lines are skipped, and index parsers drop echoarea header lines and
//! anything else that is not a msgid.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use idec_core::{BundleEntry, MsgId};

use crate::error::{Result, SyncError};

/// Path of the echoarea list.
pub const LIST_TXT_PATH: &str = "/list.txt";

/// Path of the blacklist.
pub const BLACKLIST_PATH: &str = "/blacklist.txt";

/// Path points POST their messages to.
pub const POINT_PATH: &str = "/u/point";

// ─────────────────────────────────────────────────────────────────────────────
// Index slices
// ─────────────────────────────────────────────────────────────────────────────

/// The optional `start:count` suffix of a universal index request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSlice {
    /// First position. Negative values count back from the end.
    pub start: i64,
    /// Maximum number of ids to return.
    pub count: usize,
}

impl IndexSlice {
    pub fn new(start: i64, count: usize) -> Self {
        Self { start, count }
    }

    /// The trailing `n` ids (`-n:n`).
    pub fn last(n: usize) -> Self {
        Self {
            start: -(n as i64),
            count: n,
        }
    }

    /// Parse a `start:count` path segment.
    pub fn parse(segment: &str) -> Option<Self> {
        let (start, count) = segment.split_once(':')?;
        Some(Self {
            start: start.trim().parse().ok()?,
            count: count.trim().parse().ok()?,
        })
    }

    /// Select the slice out of one echoarea's index.
    ///
    /// A negative start is clamped at 0. A start past the end selects the last
    /// `count` items.
    ///
    /// Legacy nodes answer two cases differently, and this node does not
    /// follow them. A start past the end yields an empty slice there. A
    /// negative start whose `start + count` is positive (`-2:5`) is cut as
    /// `index[start:start + count]`, which treats the sum as an absolute
    /// position and usually yields nothing. Here `count` always counts items
    /// from `begin`, so `-2:5` is the last two ids.
    pub fn apply<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let len = items.len();
        let begin = if self.start < 0 {
            len.saturating_sub(self.start.unsigned_abs() as usize)
        } else if self.start as usize > len {
            len.saturating_sub(self.count)
        } else {
            self.start as usize
        };
        let end = begin.saturating_add(self.count).min(len);
        &items[begin..end]
    }
}

impl fmt::Display for IndexSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.count)
    }
}

/// Split the tail of a `/u/e/` path into echoarea names and an optional slice.
pub fn split_universal_index(tail: &str) -> (Vec<String>, Option<IndexSlice>) {
    let mut segments: Vec<&str> = tail.split('/').filter(|s| !s.is_empty()).collect();
    let slice = match segments.last() {
        Some(last) if last.contains(':') => {
            let slice = IndexSlice::parse(last);
            segments.pop();
            slice
        }
        _ => None,
    };
    (segments.into_iter().map(str::to_string).collect(), slice)
}

/// Split a `/`-separated path tail into its non-empty segments.
pub fn split_segments(tail: &str) -> Vec<String> {
    tail.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Request paths
// ─────────────────────────────────────────────────────────────────────────────

pub fn echoarea_path(echoarea: &str) -> String {
    format!("/e/{}", echoarea)
}

pub fn message_path(msgid: &MsgId) -> String {
    format!("/m/{}", msgid)
}

pub fn universal_index_path(echoareas: &[String], slice: Option<IndexSlice>) -> String {
    let mut path = format!("/u/e/{}", echoareas.join("/"));
    if let Some(slice) = slice {
        path.push('/');
        path.push_str(&slice.to_string());
    }
    path
}

pub fn universal_bundle_path(msgids: &[MsgId]) -> String {
    let ids: Vec<&str> = msgids.iter().map(MsgId::as_str).collect();
    format!("/u/m/{}", ids.join("/"))
}

pub fn counts_path(echoareas: &[String]) -> String {
    format!("/x/c/{}", echoareas.join("/"))
}

/// GET form of a point submission.
pub fn point_path(pauth: &str, tmsg: &str) -> String {
    format!("{}/{}/{}", POINT_PATH, pauth, tmsg)
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

/// One `list.txt` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoareaInfo {
    pub name: String,
    pub count: usize,
    pub description: String,
}

/// Join lines and terminate with an empty line.
pub fn render_lines<I, T>(lines: I) -> String
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    let lines: Vec<String> = lines.into_iter().map(|l| l.to_string()).collect();
    let mut out = lines.join("\n");
    out.push_str("\n\n");
    out
}

pub fn render_index(msgids: &[MsgId]) -> String {
    render_lines(msgids)
}

/// Universal index: each echoarea name followed by its ids.
pub fn render_universal_index(sections: &[(String, Vec<MsgId>)]) -> String {
    render_lines(sections.iter().flat_map(|(echoarea, ids)| {
        std::iter::once(echoarea.clone()).chain(ids.iter().map(MsgId::to_string))
    }))
}

pub fn render_bundle(entries: &[BundleEntry]) -> String {
    render_lines(
        entries
            .iter()
            .map(|entry| format!("{}:{}", entry.msgid, entry.encoded)),
    )
}

pub fn render_counts(counts: &[(String, usize)]) -> String {
    render_lines(counts.iter().map(|(name, count)| format!("{}:{}", name, count)))
}

pub fn render_list_txt(echoareas: &[EchoareaInfo]) -> String {
    render_lines(
        echoareas
            .iter()
            .map(|e| format!("{}:{}:{}", e.name, e.count, e.description)),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Parse an `/e/` or `/u/e/` response into msgids.
pub fn parse_index(text: &str) -> Vec<MsgId> {
    lines(text)
        .filter(|line| !line.contains('.'))
        .filter_map(|line| MsgId::parse(line).ok())
        .collect()
}

/// Parse a `/u/m/` response. Lines without a valid msgid are skipped.
pub fn parse_bundle(text: &str) -> Vec<BundleEntry> {
    let mut entries = Vec::new();
    for line in lines(text) {
        let Some((msgid, encoded)) = line.split_once(':') else {
            tracing::warn!(line = %line, "skipping bundle line without separator");
            continue;
        };
        match MsgId::parse(msgid) {
            Ok(msgid) => entries.push(BundleEntry {
                msgid,
                encoded: encoded.to_string(),
            }),
            Err(_) => tracing::warn!(msgid = %msgid, "skipping bundle line with bad msgid"),
        }
    }
    entries
}

/// Parse an `/x/c/` response.
pub fn parse_counts(text: &str) -> Result<BTreeMap<String, usize>> {
    let mut counts = BTreeMap::new();
    for line in lines(text) {
        let (name, count) = line
            .split_once(':')
            .ok_or_else(|| SyncError::InvalidResponse(format!("count line {:?}", line)))?;
        let count = count
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidResponse(format!("count line {:?}", line)))?;
        counts.insert(name.to_string(), count);
    }
    Ok(counts)
}

/// Parse `list.txt`. Descriptions may themselves contain `:`.
pub fn parse_list_txt(text: &str) -> Result<Vec<EchoareaInfo>> {
    let mut echoareas = Vec::new();
    for line in lines(text) {
        let mut fields = line.splitn(3, ':');
        let name = fields.next().unwrap_or_default();
        let count = fields
            .next()
            .and_then(|c| c.trim().parse().ok())
            .ok_or_else(|| SyncError::InvalidResponse(format!("list.txt line {:?}", line)))?;
        echoareas.push(EchoareaInfo {
            name: name.to_string(),
            count,
            description: fields.next().unwrap_or_default().to_string(),
        });
    }
    Ok(echoareas)
}

/// Parse `blacklist.txt`.
pub fn parse_blacklist(text: &str) -> BTreeSet<MsgId> {
    lines(text).filter_map(|line| MsgId::parse(line).ok()).collect()
}

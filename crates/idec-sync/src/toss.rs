//! Tossing: admitting point submissions into the store.

use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use idec_core::{admit, CoreError, MsgId, PointIdentity, Submission};
use idec_store::Store;

use crate::error::{Result, SyncError};

/// Outcome of a toss, rendered as the legacy status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TossResponse {
    /// Stored (or already stored) under this msgid.
    Accepted(MsgId),
    /// The canonical record exceeds the size limit. Nothing was written.
    TooLarge,
    /// The authstr does not belong to any point.
    NoAuth,
    /// The transport payload could not be decoded into a submission.
    WrongMessage,
}

impl TossResponse {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TossResponse::Accepted(_))
    }

    pub fn msgid(&self) -> Option<&MsgId> {
        match self {
            TossResponse::Accepted(msgid) => Some(msgid),
            _ => None,
        }
    }
}

impl fmt::Display for TossResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TossResponse::Accepted(msgid) => write!(f, "msg ok:{}", msgid),
            TossResponse::TooLarge => f.write_str("error: msg big!"),
            TossResponse::NoAuth => f.write_str("error: no auth"),
            TossResponse::WrongMessage => f.write_str("error: wrong message"),
        }
    }
}

/// Accepts messages written by authenticated points.
pub struct TossingService<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for TossingService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store + ?Sized> TossingService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Toss a submission, dated now.
    pub async fn toss(
        &self,
        point: &PointIdentity,
        submission: &Submission,
    ) -> Result<TossResponse> {
        self.toss_at(point, submission, unix_now()).await
    }

    /// Toss a submission with an explicit date.
    ///
    /// A malformed submission is an error; an oversized one is
    /// [`TossResponse::TooLarge`]. Re-tossing identical content is accepted
    /// with the same msgid and writes nothing.
    pub async fn toss_at(
        &self,
        point: &PointIdentity,
        submission: &Submission,
        date: i64,
    ) -> Result<TossResponse> {
        let admitted = match admit(point, submission, date) {
            Ok(admitted) => admitted,
            Err(CoreError::TooLarge { size, limit }) => {
                tracing::info!(point = %point.name, size, limit, "rejected oversized message");
                return Ok(TossResponse::TooLarge);
            }
            Err(e) => return Err(e.into()),
        };

        let result = self
            .store
            .put(&admitted.echoarea, &admitted.msgid, &admitted.record)
            .await?;
        tracing::debug!(
            point = %point.name,
            msgid = %admitted.msgid,
            echoarea = %admitted.echoarea,
            inserted = result.is_inserted(),
            "tossed message"
        );
        Ok(TossResponse::Accepted(admitted.msgid))
    }

    /// Toss a message in transport form (`pauth` + base64 `tmsg`).
    pub async fn toss_encoded(&self, authstr: &str, tmsg: &str) -> Result<TossResponse> {
        let Some(point) = self.store.authenticate(authstr).await? else {
            return Ok(TossResponse::NoAuth);
        };
        let submission = match Submission::decode(tmsg) {
            Ok(submission) => submission,
            Err(e) => {
                tracing::debug!(point = %point.name, "undecodable submission: {}", e);
                return Ok(TossResponse::WrongMessage);
            }
        };
        match self.toss(&point, &submission).await {
            Err(SyncError::Codec(CoreError::MalformedSubmission(_))) => {
                Ok(TossResponse::WrongMessage)
            }
            other => other,
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

//! Remote calendar client.
//!
//! A calendar aggregates submitted digests into Merkle trees, anchors the
//! roots in Bitcoin, and later serves an upgraded proof. The client speaks
//! the two calendar RPCs: submit a digest, fetch the proof for a
//! commitment.

use reqwest::{header, StatusCode};
use thiserror::Error;
use tracing::{debug, warn};

use crate::attestation::Attestation;
use crate::error::Result as ProofResult;
use crate::ser::Deserializer;
use crate::timestamp::Timestamp;

/// Calendar used when the caller does not name one.
pub const DEFAULT_CALENDAR: &str = "https://alice.btc.calendar.opentimestamps.org";

const ACCEPT: &str = "application/vnd.opentimestamps.v1";
const USER_AGENT: &str = concat!("opentimestamps-rs/", env!("CARGO_PKG_VERSION"));

/// Errors from the calendar RPCs.
#[derive(Error, Debug)]
pub enum CalendarError {
    /// HTTP transport failure.
    #[error("calendar transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The calendar answered with a non-200 status.
    #[error("calendar returned {status}: {body:?}")]
    BadStatus { status: StatusCode, body: String },
    /// The response body was not a valid proof tree.
    #[error(transparent)]
    Proof(#[from] crate::error::Error),
}

/// Client for one calendar server.
#[derive(Debug, Clone)]
pub struct RemoteCalendar {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteCalendar {
    /// A client for the calendar at `base_url`. A trailing slash is added
    /// if missing.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Submit a digest for aggregation. The calendar answers with a proof
    /// tree rooted at the digest, ending in a pending attestation.
    pub async fn submit(&self, digest: &[u8]) -> Result<Timestamp, CalendarError> {
        let url = self.url("digest");
        debug!(%url, digest = %hex::encode(digest), "submitting digest");
        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
            .body(digest.to_vec())
            .send()
            .await?;
        let body = success_body(response).await?;
        Ok(Timestamp::decode(
            &mut Deserializer::new(body.as_slice()),
            digest.to_vec(),
        )?)
    }

    /// Fetch the proof the calendar holds for a commitment.
    pub async fn get_timestamp(&self, commitment: &[u8]) -> Result<Timestamp, CalendarError> {
        let url = self.url(&format!("timestamp/{}", hex::encode(commitment)));
        debug!(%url, "fetching timestamp");
        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, ACCEPT)
            .header(header::USER_AGENT, USER_AGENT)
            .send()
            .await?;
        let body = success_body(response).await?;
        Ok(Timestamp::decode(
            &mut Deserializer::new(body.as_slice()),
            commitment.to_vec(),
        )?)
    }
}

async fn success_body(response: reqwest::Response) -> Result<Vec<u8>, CalendarError> {
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        warn!(%status, "calendar request failed");
        return Err(CalendarError::BadStatus { status, body });
    }
    Ok(response.bytes().await?.to_vec())
}

/// A node still awaiting a calendar's stronger proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimestamp {
    /// The message of the node carrying the pending attestation.
    pub message: Vec<u8>,
    /// The calendar that owes the proof.
    pub uri: String,
}

impl PendingTimestamp {
    /// Ask the owing calendar for the upgraded proof of this commitment.
    pub async fn fetch_upgrade(&self) -> Result<Timestamp, CalendarError> {
        RemoteCalendar::new(self.uri.clone())
            .get_timestamp(&self.message)
            .await
    }
}

/// Every pending attestation in the tree, with the message it commits to.
pub fn pending_timestamps(ts: &Timestamp) -> Vec<PendingTimestamp> {
    let mut res = Vec::new();
    ts.walk(&mut |node| {
        for attestation in node.attestations() {
            if let Attestation::Pending { uri } = attestation {
                res.push(PendingTimestamp {
                    message: node.message().to_vec(),
                    uri: uri.clone(),
                });
            }
        }
    });
    res
}

/// Graft an upgraded proof into the tree at the node that carried the
/// pending attestation, dropping that attestation. Sibling attestations and
/// edges are preserved.
pub fn merge_upgrade(
    ts: &mut Timestamp,
    pending: &PendingTimestamp,
    upgraded: Timestamp,
) -> ProofResult<()> {
    let removed = Attestation::Pending {
        uri: pending.uri.clone(),
    };
    let mut result = Ok(());
    ts.walk_mut(&mut |node| {
        if node.message() != &pending.message[..] || !node.attestations().contains(&removed) {
            return;
        }
        node.attestations.retain(|a| a != &removed);
        if let Err(e) = node.merge(upgraded.clone()) {
            result = Err(e);
        }
    });
    result
}

/// Per-attestation result of an upgrade pass.
#[derive(Debug)]
pub struct UpgradeOutcome {
    pub pending: PendingTimestamp,
    pub result: Result<(), CalendarError>,
}

/// Upgrade every pending attestation in the tree, merging each calendar's
/// answer in place. Failures are reported per attestation; the rest of the
/// tree is untouched by a failed fetch.
pub async fn upgrade_pending(ts: &mut Timestamp) -> Vec<UpgradeOutcome> {
    let mut outcomes = Vec::new();
    for pending in pending_timestamps(ts) {
        let result = match pending.fetch_upgrade().await {
            Ok(upgraded) => merge_upgrade(ts, &pending, upgraded).map_err(CalendarError::from),
            Err(e) => Err(e),
        };
        outcomes.push(UpgradeOutcome { pending, result });
    }
    outcomes
}

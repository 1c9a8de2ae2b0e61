use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context};
use opentimestamps::calendar::upgrade_pending;
use opentimestamps::DetachedTimestamp;
use tracing::{info, warn};

pub(crate) async fn upgrade(file: PathBuf) -> anyhow::Result<()> {
    let mut detached = DetachedTimestamp::from_path(&file)
        .with_context(|| format!("decoding {}", file.display()))?;

    let outcomes = upgrade_pending(detached.timestamp_mut()).await;
    if outcomes.is_empty() {
        bail!("no pending attestations found");
    }

    let mut upgraded = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(()) => {
                upgraded += 1;
                println!(
                    "upgraded {} via {}",
                    hex::encode(&outcome.pending.message),
                    outcome.pending.uri
                );
            }
            Err(e) => warn!(uri = %outcome.pending.uri, "upgrade failed: {e}"),
        }
    }
    if upgraded == 0 {
        bail!("no pending attestation could be upgraded");
    }

    fs::write(&file, detached.to_vec()?)
        .with_context(|| format!("rewriting {}", file.display()))?;
    info!(
        upgraded,
        pending = outcomes.len() - upgraded,
        "timestamp updated"
    );
    Ok(())
}

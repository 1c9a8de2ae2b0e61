use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::Context;
use opentimestamps::calendar::RemoteCalendar;
use opentimestamps::detached::file_sha256;
use opentimestamps::{CryptOp, DetachedTimestamp};
use tracing::info;

pub(crate) async fn stamp(file: PathBuf, calendar: String) -> anyhow::Result<()> {
    let input = File::open(&file).with_context(|| format!("opening {}", file.display()))?;
    let digest = file_sha256(input)?;
    info!(
        file = %file.display(),
        digest = %hex::encode(&digest),
        calendar,
        "submitting digest"
    );

    let timestamp = RemoteCalendar::new(calendar)
        .submit(&digest)
        .await
        .context("submitting digest to calendar")?;
    let detached = DetachedTimestamp::new(CryptOp::Sha256, timestamp)?;

    let mut out_path = file.into_os_string();
    out_path.push(".ots");
    let out_path = PathBuf::from(out_path);
    fs::write(&out_path, detached.to_vec()?)
        .with_context(|| format!("writing {}", out_path.display()))?;
    info!(out = %out_path.display(), "wrote detached timestamp");
    Ok(())
}

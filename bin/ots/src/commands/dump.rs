use std::path::PathBuf;

use anyhow::Context;
use opentimestamps::DetachedTimestamp;

pub(crate) fn dump(file: PathBuf) -> anyhow::Result<()> {
    let detached = DetachedTimestamp::from_path(&file)
        .with_context(|| format!("decoding {}", file.display()))?;
    print!("{}", detached.dump());
    Ok(())
}

use std::path::PathBuf;

use anyhow::Context;
use bitcoin::block::Header;
use bitcoin::BlockHash;
use bitcoincore_rpc::{Auth, Client, RpcApi};
use opentimestamps::verifier::{BitcoinVerifier, BlockHeaderSource};
use opentimestamps::DetachedTimestamp;

/// Bitcoin Core as a block header source.
struct RpcHeaderSource {
    client: Client,
}

impl BlockHeaderSource for RpcHeaderSource {
    fn block_hash(&self, height: u64) -> anyhow::Result<BlockHash> {
        Ok(self.client.get_block_hash(height)?)
    }

    fn block_header(&self, hash: &BlockHash) -> anyhow::Result<Header> {
        Ok(self.client.get_block_header(hash)?)
    }
}

pub(crate) fn verify(
    file: PathBuf,
    btc_host: String,
    btc_user: String,
    btc_pass: String,
) -> anyhow::Result<()> {
    let detached = DetachedTimestamp::from_path(&file)
        .with_context(|| format!("decoding {}", file.display()))?;

    let client = Client::new(
        &format!("http://{btc_host}"),
        Auth::UserPass(btc_user, btc_pass),
    )
    .context("connecting to bitcoin rpc")?;
    let verifier = BitcoinVerifier::new(RpcHeaderSource { client });

    match verifier.verify_timestamp(detached.timestamp())? {
        Some(time) => println!("attested time: {}", time.to_rfc3339()),
        None => println!("no bitcoin-verifiable timestamps found"),
    }
    Ok(())
}

use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_with::{base64::Base64, serde_as, DisplayFromStr};

use crate::error::LcdError;

use super::LcdClient;

/// Summary of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub height: i64,
    pub block_hash: String,
    pub timestamp: DateTime<Utc>,
    /// Hashes of the transactions in the block, in the same form as [crate::Tx::hash].
    pub txhashes: Vec<String>,
    pub chain_id: String,
}

/// Information about the node we're talking to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// Chain ID served by the node
    pub network: String,
    pub moniker: String,
    /// Tendermint/CometBFT version
    pub version: String,
    pub app_name: String,
    pub app_version: String,
    pub cosmos_sdk_version: String,
}

#[derive(Deserialize)]
struct NodeInfoResponse {
    default_node_info: DefaultNodeInfo,
    #[serde(default)]
    application_version: ApplicationVersion,
}

#[derive(Deserialize)]
struct DefaultNodeInfo {
    network: String,
    #[serde(default)]
    moniker: String,
    #[serde(default)]
    version: String,
}

#[derive(Deserialize, Default)]
struct ApplicationVersion {
    #[serde(default)]
    app_name: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    cosmos_sdk_version: String,
}

#[derive(Deserialize)]
struct BlockResponse {
    block_id: BlockId,
    block: Block,
}

#[serde_as]
#[derive(Deserialize)]
struct BlockId {
    #[serde_as(as = "Base64")]
    hash: Vec<u8>,
}

#[derive(Deserialize)]
struct Block {
    header: Header,
    data: BlockData,
}

#[serde_as]
#[derive(Deserialize)]
struct Header {
    chain_id: String,
    #[serde_as(as = "DisplayFromStr")]
    height: i64,
    time: DateTime<Utc>,
}

#[derive(Deserialize)]
struct BlockData {
    #[serde(default)]
    txs: Option<Vec<String>>,
}

impl BlockResponse {
    fn into_block_info(self) -> Result<BlockInfo> {
        let mut txhashes = vec![];
        for tx in self.block.data.txs.unwrap_or_default() {
            use sha2::{Digest, Sha256};
            let tx = base64::engine::general_purpose::STANDARD
                .decode(&tx)
                .with_context(|| format!("Invalid base64 transaction in block: {tx}"))?;
            let mut hasher = Sha256::new();
            hasher.update(tx);
            let digest = hasher.finalize();
            txhashes.push(hex::encode_upper(digest));
        }
        let header = self.block.header;
        Ok(BlockInfo {
            height: header.height,
            block_hash: hex::encode_upper(self.block_id.hash),
            timestamp: header.time,
            txhashes,
            chain_id: header.chain_id,
        })
    }
}

impl LcdClient {
    pub async fn node_info(&self) -> Result<NodeInfo, LcdError> {
        let res: NodeInfoResponse = self
            .get("/cosmos/base/tendermint/v1beta1/node_info", &[])
            .await?;
        Ok(NodeInfo {
            network: res.default_node_info.network,
            moniker: res.default_node_info.moniker,
            version: res.default_node_info.version,
            app_name: res.application_version.app_name,
            app_version: res.application_version.version,
            cosmos_sdk_version: res.application_version.cosmos_sdk_version,
        })
    }

    pub async fn latest_block_info(&self) -> Result<BlockInfo> {
        let res: BlockResponse = self
            .get("/cosmos/base/tendermint/v1beta1/blocks/latest", &[])
            .await?;
        res.into_block_info()
    }

    pub async fn block_info(&self, height: i64) -> Result<BlockInfo> {
        let res: BlockResponse = self
            .get(&format!("/cosmos/base/tendermint/v1beta1/blocks/{height}"), &[])
            .await?;
        let info = res.into_block_info()?;
        anyhow::ensure!(
            height == info.height,
            "Mismatched height from blockchain. Got {}, expected {height}",
            info.height
        );
        Ok(info)
    }

    /// Earliest block still available on the node, which may be pruned.
    pub async fn earliest_block_info(&self) -> Result<BlockInfo> {
        let res: Result<BlockResponse, LcdError> = self
            .get("/cosmos/base/tendermint/v1beta1/blocks/1", &[])
            .await;
        let err = match res {
            Ok(x) => return x.into_block_info(),
            Err(err) => err,
        };
        let height = err.endpoint_message().and_then(lowest_height);
        match height {
            Some(height) => self.block_info(height).await,
            None => Err(err.into()),
        }
    }
}

/// Pull the lowest available height out of a pruned node's error message.
fn lowest_height(message: &str) -> Option<i64> {
    ["lowest height is", "base height: "]
        .into_iter()
        .find_map(|needle| {
            let trimmed = message.split(needle).nth(1)?.trim();
            let stripped = trimmed.strip_suffix(')').unwrap_or(trimmed);
            stripped.parse().ok()
        })
}

//! Payload shapes reported by connected nodes.
//!
//! Field names mirror the wire JSON exactly; every field is defaulted
//! so a sparse payload (including the bare `{}` some clients send for
//! `info`) still decodes.

use serde::{Deserialize, Serialize};

/// Node identity and environment, carried in the `hello` frame's
/// `info` field. `name` becomes the session's node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeInfo {
    /// Display name; the collector uses it as the node ID.
    pub name: String,
    /// Enode / node string.
    pub node: String,
    /// Listening port.
    pub port: u16,
    /// Network ID.
    #[serde(rename = "net")]
    pub network: String,
    /// Protocol version string.
    pub protocol: String,
    /// Exposed API description.
    pub api: String,
    /// Operating system.
    pub os: String,
    /// Operating system version.
    #[serde(rename = "os_v")]
    pub os_version: String,
    /// Client software and version.
    pub client: String,
    /// Whether the node can serve history updates.
    #[serde(rename = "canUpdateHistory")]
    pub can_update_history: bool,
}

/// Rolling liveness statistics from the `stats` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStats {
    /// Whether the node considers itself active.
    pub active: bool,
    /// Whether the node is syncing.
    pub syncing: bool,
    /// Whether the node is mining.
    pub mining: bool,
    /// Current hashrate.
    pub hashrate: i64,
    /// Connected peer count.
    pub peers: i64,
    /// Gas price the node would use.
    #[serde(rename = "gasPrice")]
    pub gas_price: i64,
    /// Node uptime percentage.
    pub uptime: i64,
}

/// A transaction reference inside a block report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxStats {
    /// Transaction hash.
    pub hash: String,
}

/// A full block report from the `block` frame.
///
/// Difficulty values travel as decimal strings on the wire; they are
/// kept as strings here since the core never does arithmetic on them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    /// Block height.
    pub number: i64,
    /// Block hash.
    pub hash: String,
    /// Parent block hash.
    #[serde(rename = "parentHash")]
    pub parent_hash: String,
    /// Unix timestamp.
    pub timestamp: i64,
    /// Coinbase address.
    pub miner: String,
    /// Gas used by the block.
    #[serde(rename = "gasUsed")]
    pub gas_used: u64,
    /// Block gas limit.
    #[serde(rename = "gasLimit")]
    pub gas_limit: u64,
    /// Block difficulty.
    pub difficulty: String,
    /// Cumulative chain difficulty.
    #[serde(rename = "totalDifficulty")]
    pub total_difficulty: String,
    /// Included transactions.
    pub transactions: Vec<TxStats>,
    /// Transactions trie root.
    #[serde(rename = "transactionsRoot")]
    pub transactions_root: String,
    /// State trie root.
    #[serde(rename = "stateRoot")]
    pub state_root: String,
    /// Uncle blocks.
    pub uncles: Vec<Block>,
}

/// Minimal block reference used by reorg notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockStub {
    /// Parent block hash.
    #[serde(rename = "parent_hash")]
    pub parent_hash: String,
    /// Block hash.
    pub hash: String,
    /// Block height.
    pub number: i64,
}

/// Chain-head change notification from the `headEvent` frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadEvent {
    /// Blocks added to the canonical chain.
    pub added: Vec<BlockStub>,
    /// Blocks removed by a reorg.
    pub removed: Vec<BlockStub>,
    /// Event kind reported by the node.
    #[serde(rename = "type")]
    pub kind: String,
}

//! Standard event handlers for the known frame tags.
//!
//! Each handler decodes its typed payload and logs it; a storage or
//! aggregation backend would hang off these same seams. Tags without a
//! handler (latency, pending, history) fall through to the router's
//! default case.

use async_trait::async_trait;
use nodewatch_core::{Block, Envelope, HeadEvent, NodeInfo, NodeStats};
use nodewatch_server::dispatch::{EventHandler, EventRouter, HandlerError};
use tracing::info;

/// Router covering every tag the daemon understands.
pub fn default_router() -> EventRouter {
    let mut router = EventRouter::new();
    router.register("hello", HelloHandler);
    router.register("stats", StatsHandler);
    router.register("block", BlockHandler);
    router.register("headEvent", HeadEventHandler);
    router
}

struct HelloHandler;

#[async_trait]
impl EventHandler for HelloHandler {
    async fn handle(&self, node_id: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let info: NodeInfo = envelope.decode_field("info")?;
        info!(
            node = node_id,
            client = %info.client,
            network = %info.network,
            os = %info.os,
            "node joined"
        );
        Ok(())
    }
}

struct StatsHandler;

#[async_trait]
impl EventHandler for StatsHandler {
    async fn handle(&self, node_id: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let stats: NodeStats = envelope.decode_field("stats")?;
        info!(
            node = node_id,
            active = stats.active,
            syncing = stats.syncing,
            peers = stats.peers,
            uptime = stats.uptime,
            "node stats"
        );
        Ok(())
    }
}

struct BlockHandler;

#[async_trait]
impl EventHandler for BlockHandler {
    async fn handle(&self, node_id: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let block: Block = envelope.decode_field("block")?;
        info!(
            node = node_id,
            number = block.number,
            hash = %block.hash,
            txs = block.transactions.len(),
            "new block"
        );
        Ok(())
    }
}

struct HeadEventHandler;

#[async_trait]
impl EventHandler for HeadEventHandler {
    async fn handle(&self, node_id: &str, envelope: &Envelope) -> Result<(), HandlerError> {
        let event: HeadEvent = envelope.decode_field("event")?;
        info!(
            node = node_id,
            kind = %event.kind,
            added = event.added.len(),
            removed = event.removed.len(),
            "head event"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_covers_the_known_tags() {
        let router = default_router();
        assert_eq!(router.tags(), vec!["block", "headEvent", "hello", "stats"]);
        assert!(!router.has_handler("node-ping"));
        assert!(!router.has_handler("latency"));
    }

    #[tokio::test]
    async fn hello_handler_decodes_info() {
        let envelope = Envelope::decode(
            r#"{"emit":["hello",{"secret":"s","info":{"name":"n","client":"bor/v0.2"}}]}"#,
        )
        .unwrap();
        HelloHandler.handle("n", &envelope).await.unwrap();
    }

    #[tokio::test]
    async fn stats_handler_rejects_missing_payload() {
        let envelope = Envelope::decode(r#"{"emit":["stats",{"other":{}}]}"#).unwrap();
        assert!(StatsHandler.handle("n", &envelope).await.is_err());
    }

    #[tokio::test]
    async fn block_handler_decodes_block() {
        let envelope = Envelope::decode(
            r#"{"emit":["block",{"block":{"number":12,"hash":"0xab","transactions":[]}}]}"#,
        )
        .unwrap();
        BlockHandler.handle("n", &envelope).await.unwrap();
    }

    #[tokio::test]
    async fn head_event_handler_decodes_event() {
        let envelope = Envelope::decode(
            r#"{"emit":["headEvent",{"event":{"added":[{"hash":"0x1","number":3}],"removed":[],"type":"head"}}]}"#,
        )
        .unwrap();
        HeadEventHandler.handle("n", &envelope).await.unwrap();
    }
}

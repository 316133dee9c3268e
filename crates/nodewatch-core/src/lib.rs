//! # nodewatch-core
//!
//! Wire protocol vocabulary shared by the collector server and its
//! consumers:
//!
//! - **Envelope codec**: the `{"emit": [tag, fields]}` frame format with
//!   lazy, per-field payload decoding
//! - **Payload types**: `NodeInfo`, `NodeStats`, `Block`, `HeadEvent` as
//!   reported by connected nodes
//! - **Fixed frames**: the `ready` and `node-pong` acknowledgements the
//!   server writes back
//!
//! This crate is pure data — no I/O, no runtime.

#![deny(unsafe_code)]

pub mod envelope;
pub mod types;

pub use envelope::{Envelope, EnvelopeError, PONG_FRAME, READY_FRAME};
pub use types::{Block, BlockStub, HeadEvent, NodeInfo, NodeStats, TxStats};

//! # nodewatch-server
//!
//! The collector service: accepts persistent WebSocket connections from
//! nodes, authenticates each one, decodes the `{"emit":[tag,fields]}`
//! envelope, and routes events to a pluggable session manager while
//! optionally mirroring raw traffic to an upstream observer.
//!
//! - `collector`: per-connection handshake / keepalive / dispatch loop
//! - `relay`: reconnecting best-effort mirror to the upstream observer
//! - `dispatch`: the session-manager seam and the tag-keyed handler
//!   registry
//! - `server`: axum assembly (`/` upgrade, `/health`, `/metrics`) with
//!   graceful shutdown

#![deny(unsafe_code)]

pub mod collector;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod relay;
pub mod server;
pub mod session;

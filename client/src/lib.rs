//! # Aster Client
//! Client networking: handshake against the server, heartbeat emission,
//! and the inbound/outbound queues the prediction loop drains.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod network;

pub use network::{ClientConfig, ClientNetworkManager};

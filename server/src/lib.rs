//! # Aster Server
//! The authoritative game server: a fixed-size connection slot table, a
//! network I/O thread over one UDP socket, and the tick-driven replication
//! loop on top of `aster-game`.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod config;
mod network;
mod slots;

pub use config::ServerConfig;
pub use network::ServerNetworkManager;
pub use slots::{ConnectOutcome, ConnectionSlot, SlotTable};

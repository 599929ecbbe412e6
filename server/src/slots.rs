//! The fixed-size connection slot table. Pure bookkeeping, no sockets:
//! the I/O loop drives it and the tests exercise it directly.

use std::collections::HashMap;
use std::net::SocketAddr;

use aster_shared::PlayerId;
use log::{debug, info};

/// One connection bucket.
#[derive(Debug, Clone)]
pub struct ConnectionSlot {
    pub player_id: PlayerId,
    pub client_id: u32,
    pub endpoint: SocketAddr,
    pub player_name: String,
    pub last_heartbeat_ms: u64,
    pub sequence: u32,
    pub active: bool,
}

/// Outcome of a CLIENT_CONNECT against the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A fresh slot was allocated.
    Accepted(PlayerId),
    /// The endpoint already held a slot; its heartbeat was refreshed.
    AlreadyConnected(PlayerId),
    /// Every slot is taken.
    ServerFull,
}

/// Fixed-size table of connection slots plus an endpoint index.
pub struct SlotTable {
    slots: Vec<Option<ConnectionSlot>>,
    by_endpoint: HashMap<SocketAddr, usize>,
    next_player_id: PlayerId,
}

impl SlotTable {
    pub fn new(max_players: u32) -> Self {
        let mut slots = Vec::with_capacity(max_players as usize);
        slots.resize_with(max_players as usize, || None);
        Self {
            slots,
            by_endpoint: HashMap::new(),
            next_player_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.active)
            .count()
    }

    pub fn active_players(&self) -> Vec<PlayerId> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.active)
            .map(|slot| slot.player_id)
            .collect()
    }

    pub fn player_at(&self, endpoint: SocketAddr) -> Option<PlayerId> {
        self.by_endpoint
            .get(&endpoint)
            .and_then(|&index| self.slots[index].as_ref())
            .filter(|slot| slot.active)
            .map(|slot| slot.player_id)
    }

    pub fn endpoint_of(&self, player_id: PlayerId) -> Option<SocketAddr> {
        self.slots
            .iter()
            .flatten()
            .find(|slot| slot.active && slot.player_id == player_id)
            .map(|slot| slot.endpoint)
    }

    pub fn endpoints_except(&self, excluded: Option<PlayerId>) -> Vec<SocketAddr> {
        self.slots
            .iter()
            .flatten()
            .filter(|slot| slot.active && Some(slot.player_id) != excluded)
            .map(|slot| slot.endpoint)
            .collect()
    }

    /// Handles a CLIENT_CONNECT from `endpoint`.
    pub fn connect(
        &mut self,
        endpoint: SocketAddr,
        client_id: u32,
        player_name: &str,
        now_ms: u64,
    ) -> ConnectOutcome {
        if let Some(&index) = self.by_endpoint.get(&endpoint) {
            if let Some(slot) = self.slots[index].as_mut() {
                slot.last_heartbeat_ms = now_ms;
                slot.active = true;
                debug!("reconnect from {} reuses slot {}", endpoint, index);
                return ConnectOutcome::AlreadyConnected(slot.player_id);
            }
        }

        let Some(index) = self.slots.iter().position(Option::is_none) else {
            return ConnectOutcome::ServerFull;
        };
        let player_id = self.next_player_id;
        self.next_player_id += 1;
        self.slots[index] = Some(ConnectionSlot {
            player_id,
            client_id,
            endpoint,
            player_name: player_name.to_owned(),
            last_heartbeat_ms: now_ms,
            sequence: 0,
            active: true,
        });
        self.by_endpoint.insert(endpoint, index);
        info!(
            "slot {}: player {} '{}' from {}",
            index, player_id, player_name, endpoint
        );
        ConnectOutcome::Accepted(player_id)
    }

    /// Refreshes the heartbeat timestamp of the slot behind `endpoint`.
    pub fn heartbeat(&mut self, endpoint: SocketAddr, now_ms: u64) -> bool {
        match self.by_endpoint.get(&endpoint) {
            Some(&index) => match self.slots[index].as_mut() {
                Some(slot) => {
                    slot.last_heartbeat_ms = now_ms;
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    /// Tears down the slot behind `endpoint`, returning its player id.
    pub fn disconnect(&mut self, endpoint: SocketAddr) -> Option<PlayerId> {
        let index = self.by_endpoint.remove(&endpoint)?;
        let slot = self.slots[index].take()?;
        info!("slot {}: player {} disconnected", index, slot.player_id);
        Some(slot.player_id)
    }

    /// Evicts every slot whose last heartbeat is older than `timeout_ms`.
    /// Returns the evicted player ids, one per eviction.
    pub fn evict_timed_out(&mut self, now_ms: u64, timeout_ms: u64) -> Vec<PlayerId> {
        let mut evicted = Vec::new();
        for index in 0..self.slots.len() {
            let timed_out = match &self.slots[index] {
                Some(slot) if slot.active => {
                    now_ms.saturating_sub(slot.last_heartbeat_ms) > timeout_ms
                }
                _ => false,
            };
            if !timed_out {
                continue;
            }
            if let Some(slot) = self.slots[index].take() {
                self.by_endpoint.remove(&slot.endpoint);
                info!(
                    "slot {}: player {} timed out ({} ms silent)",
                    index,
                    slot.player_id,
                    now_ms.saturating_sub(slot.last_heartbeat_ms)
                );
                evicted.push(slot.player_id);
            }
        }
        evicted
    }

    /// Next outgoing sequence number for the slot behind `endpoint`.
    pub fn next_sequence(&mut self, endpoint: SocketAddr) -> u32 {
        match self.by_endpoint.get(&endpoint) {
            Some(&index) => match self.slots[index].as_mut() {
                Some(slot) => {
                    let sequence = slot.sequence;
                    slot.sequence = slot.sequence.wrapping_add(1);
                    sequence
                }
                None => 0,
            },
            None => 0,
        }
    }
}

//! Role-aware fixed-timestep game driver. Runs on the main thread, pulls
//! inbound packets, steps the ECS and pushes outbound packets; the network
//! managers own the only other thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{info, warn};

use aster_shared::{DestroyReason, Packet, PlayerId, TickAccumulator, TickConfig};

use crate::coordinator::Coordinator;
use crate::events::OutboundPacket;

/// Which role this process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
    Standalone,
}

impl Role {
    /// Whether this role runs the authoritative simulation.
    pub fn is_authoritative(self) -> bool {
        !matches!(self, Role::Client)
    }
}

/// Connection lifecycle changes surfaced by the server network manager.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    Connected {
        player_id: PlayerId,
        player_name: String,
    },
    Disconnected {
        player_id: PlayerId,
        timed_out: bool,
    },
}

/// What the driver needs from the server network manager.
pub trait ServerNet {
    /// Drains connection lifecycle events observed by the I/O thread.
    fn poll_events(&mut self) -> Vec<ConnectionEvent>;
    /// Drains the inbound queue: packets plus the slot they arrived from.
    fn fetch_incoming(&mut self) -> Vec<(Packet, PlayerId)>;
    /// Enqueues one packet with its fan-out.
    fn queue_outgoing(&mut self, packet: OutboundPacket);
    /// Player ids of every active slot.
    fn connected_players(&self) -> Vec<PlayerId>;
}

/// What the driver needs from the client network manager.
pub trait ClientNet {
    fn fetch_incoming(&mut self) -> Vec<Packet>;
    fn queue_outgoing(&mut self, packet: Packet);
    fn is_connected(&self) -> bool;
}

/// No-op network for the standalone role.
#[derive(Default)]
pub struct NullNet;

impl ServerNet for NullNet {
    fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        Vec::new()
    }

    fn fetch_incoming(&mut self) -> Vec<(Packet, PlayerId)> {
        Vec::new()
    }

    fn queue_outgoing(&mut self, _packet: OutboundPacket) {}

    fn connected_players(&self) -> Vec<PlayerId> {
        Vec::new()
    }
}

/// The fixed-timestep loop around a coordinator.
pub struct GameDriver {
    coordinator: Coordinator,
    accumulator: TickAccumulator,
    tick_config: TickConfig,
    running: Arc<AtomicBool>,
}

impl GameDriver {
    pub fn new(role: Role, with_render: bool, tick_config: TickConfig) -> Self {
        Self {
            coordinator: Coordinator::new(role, with_render),
            accumulator: TickAccumulator::new(tick_config),
            tick_config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator {
        &mut self.coordinator
    }

    /// Flag shared with signal handlers; clearing it stops the loop at the
    /// next iteration.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Blocking server loop: connection events, then due ticks, then sleep
    /// until the next tick boundary.
    pub fn run_server(&mut self, net: &mut impl ServerNet) {
        let dt = self.tick_config.budget.as_secs_f32();
        info!(
            "server loop started ({} ms tick budget)",
            self.tick_config.budget_ms()
        );
        while self.is_running() {
            let ticks = self.accumulator.advance();
            for _ in 0..ticks {
                self.server_tick(net, dt);
            }
            thread::sleep(
                self.accumulator
                    .until_next_tick()
                    .min(Duration::from_millis(2)),
            );
        }
        self.coordinator.world_mut().stop_running();
        info!("server loop stopped");
    }

    /// One authoritative tick.
    pub fn server_tick(&mut self, net: &mut impl ServerNet, dt: f32) {
        let mut out: Vec<OutboundPacket> = Vec::new();

        for event in net.poll_events() {
            match event {
                ConnectionEvent::Connected {
                    player_id,
                    player_name,
                } => {
                    info!("player {} ('{}') connected", player_id, player_name);
                    self.coordinator.on_player_connected(player_id, &mut out);
                }
                ConnectionEvent::Disconnected {
                    player_id,
                    timed_out,
                } => {
                    let reason = if timed_out {
                        DestroyReason::TimeoutDespawn
                    } else {
                        DestroyReason::LevelTransition
                    };
                    self.coordinator
                        .on_player_disconnected(player_id, reason, &mut out);
                }
            }
        }

        for (packet, source) in net.fetch_incoming() {
            self.coordinator.process_server_packet(&packet, source);
        }

        self.coordinator.step(dt);

        self.coordinator
            .maybe_start_game(&net.connected_players(), &mut out);
        self.coordinator.build_server_packets(&mut out);

        for packet in out {
            net.queue_outgoing(packet);
        }
    }

    /// Blocking client loop. The host application is expected to interleave
    /// its own rendering via [`GameDriver::client_tick`] instead when it
    /// drives a window; this loop is the headless variant.
    pub fn run_client(&mut self, net: &mut impl ClientNet) {
        let dt = self.tick_config.budget.as_secs_f32();
        info!(
            "client loop started ({} ms tick budget)",
            self.tick_config.budget_ms()
        );
        while self.is_running() {
            if !net.is_connected() {
                warn!("server connection lost, stopping client loop");
                break;
            }
            let ticks = self.accumulator.advance();
            for _ in 0..ticks {
                self.client_tick(net, dt);
            }
            thread::sleep(
                self.accumulator
                    .until_next_tick()
                    .min(Duration::from_millis(2)),
            );
        }
        self.coordinator.world_mut().stop_running();
        info!("client loop stopped");
    }

    /// One predicted tick: apply authoritative state, simulate locally,
    /// emit input.
    pub fn client_tick(&mut self, net: &mut impl ClientNet, dt: f32) {
        for packet in net.fetch_incoming() {
            self.coordinator.process_client_packet(&packet);
        }

        self.coordinator.step(dt);

        let mut out: Vec<Packet> = Vec::new();
        self.coordinator.build_client_packets(&mut out);
        for packet in out {
            net.queue_outgoing(packet);
        }
    }

    /// Standalone: the server path against a null network.
    pub fn run_standalone(&mut self) {
        let mut net = NullNet;
        self.run_server(&mut net);
    }
}

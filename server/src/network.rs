//! The server network manager: owns the UDP socket and the I/O thread,
//! maintains the connection slot table and handles all control packets in
//! place. Gameplay packets cross to the main thread through the inbound
//! queue; outbound packets cross back with their fan-out.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use aster_game::{Addressing, ConnectionEvent, OutboundPacket, ServerNet};
use aster_shared::{
    codec, flags, ClientConnect, ClientDisconnect, GameClock, Heartbeat, Packet, PacketType, Ping,
    PlayerId, Pong, RejectCode, ServerAccept, ServerError, ServerReject, UdpTransport,
    PROTOCOL_VERSION,
};

use crate::config::ServerConfig;
use crate::slots::{ConnectOutcome, SlotTable};

/// State crossing between the main thread and the I/O thread: three
/// queues and the running flag, nothing else.
struct SharedQueues {
    inbound: Mutex<VecDeque<(Packet, PlayerId)>>,
    outbound: Mutex<VecDeque<OutboundPacket>>,
    events: Mutex<VecDeque<ConnectionEvent>>,
    running: AtomicBool,
}

impl SharedQueues {
    fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(VecDeque::new()),
            events: Mutex::new(VecDeque::new()),
            running: AtomicBool::new(false),
        }
    }

    fn lock<'a, T>(queue: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        match queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub struct ServerNetworkManager {
    config: ServerConfig,
    game_instance_id: u32,
    shared: Arc<SharedQueues>,
    io_thread: Option<JoinHandle<()>>,
    /// Main-thread mirror of the active player set, maintained from
    /// connection events.
    connected: Vec<PlayerId>,
}

impl ServerNetworkManager {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            game_instance_id: fastrand::u32(1..),
            shared: Arc::new(SharedQueues::new()),
            io_thread: None,
            connected: Vec::new(),
        }
    }

    pub fn game_instance_id(&self) -> u32 {
        self.game_instance_id
    }

    /// Binds the socket and launches the I/O thread.
    pub fn start(&mut self) -> Result<(), ServerError> {
        let transport = UdpTransport::bind(("0.0.0.0", self.config.port))?;
        let local = transport.local_addr()?;
        info!("server listening on {}", local);

        self.shared.running.store(true, Ordering::SeqCst);
        let mut io = IoLoop {
            transport,
            slots: SlotTable::new(self.config.max_players),
            clock: GameClock::new(),
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            game_instance_id: self.game_instance_id,
        };
        self.io_thread = Some(
            thread::Builder::new()
                .name("aster-net-io".to_owned())
                .spawn(move || io.run())
                .map_err(|_| ServerError::IoThreadPanicked)?,
        );
        Ok(())
    }

    /// Flips the running flag and joins the I/O thread.
    pub fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.io_thread.take() {
            if handle.join().is_err() {
                error!("network I/O thread panicked during shutdown");
            }
        }
        info!("server network manager stopped");
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }
}

impl ServerNet for ServerNetworkManager {
    fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        let drained: Vec<ConnectionEvent> =
            SharedQueues::lock(&self.shared.events).drain(..).collect();
        for event in &drained {
            match event {
                ConnectionEvent::Connected { player_id, .. } => {
                    if !self.connected.contains(player_id) {
                        self.connected.push(*player_id);
                    }
                }
                ConnectionEvent::Disconnected { player_id, .. } => {
                    self.connected.retain(|p| p != player_id);
                }
            }
        }
        drained
    }

    fn fetch_incoming(&mut self) -> Vec<(Packet, PlayerId)> {
        SharedQueues::lock(&self.shared.inbound).drain(..).collect()
    }

    fn queue_outgoing(&mut self, packet: OutboundPacket) {
        SharedQueues::lock(&self.shared.outbound).push_back(packet);
    }

    fn connected_players(&self) -> Vec<PlayerId> {
        self.connected.clone()
    }
}

impl Drop for ServerNetworkManager {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

/// The I/O thread body. Owns the transport and the slot table outright.
struct IoLoop {
    transport: UdpTransport,
    slots: SlotTable,
    clock: GameClock,
    shared: Arc<SharedQueues>,
    config: ServerConfig,
    game_instance_id: u32,
}

impl IoLoop {
    fn run(&mut self) {
        info!("network I/O thread started");
        let timeout_ms = self.config.heartbeat_timeout.as_millis() as u64;
        while self.shared.running.load(Ordering::SeqCst) {
            let mut idle = true;
            let now_ms = u64::from(self.clock.elapsed_ms());

            for player_id in self.slots.evict_timed_out(now_ms, timeout_ms) {
                SharedQueues::lock(&self.shared.events).push_back(ConnectionEvent::Disconnected {
                    player_id,
                    timed_out: true,
                });
            }

            loop {
                match self.transport.receive_from() {
                    Ok(Some((bytes, sender))) => {
                        idle = false;
                        self.handle_datagram(&bytes, sender);
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!("receive error: {}", error);
                        break;
                    }
                }
            }

            loop {
                let next = SharedQueues::lock(&self.shared.outbound).pop_front();
                match next {
                    Some(outbound) => {
                        idle = false;
                        self.fan_out(outbound);
                    }
                    None => break,
                }
            }

            if idle {
                thread::sleep(Duration::from_millis(1));
            }
        }
        info!("network I/O thread stopped");
    }

    fn handle_datagram(&mut self, bytes: &[u8], sender: SocketAddr) {
        let packet = match Packet::deserialize(bytes) {
            Ok(packet) => packet,
            Err(error) => {
                warn!("malformed datagram from {}: {}", sender, error);
                return;
            }
        };
        let packet_type = match codec::process_packet(&packet) {
            Ok(packet_type) => packet_type,
            Err(error) => {
                warn!("invalid packet from {}: {}", sender, error);
                return;
            }
        };
        if packet_type.is_control() {
            self.handle_control(packet_type, &packet, sender);
            return;
        }
        match self.slots.player_at(sender) {
            Some(player_id) => {
                SharedQueues::lock(&self.shared.inbound).push_back((packet, player_id));
            }
            None => {
                debug!(
                    "dropping {:?} from unconnected endpoint {}",
                    packet_type, sender
                );
            }
        }
    }

    fn handle_control(&mut self, packet_type: PacketType, packet: &Packet, sender: SocketAddr) {
        let now_ms = u64::from(self.clock.elapsed_ms());
        match packet_type {
            PacketType::ClientConnect => self.handle_client_connect(packet, sender, now_ms),
            PacketType::ClientDisconnect => {
                let _ = ClientDisconnect::parse(&packet.payload);
                if let Some(player_id) = self.slots.disconnect(sender) {
                    SharedQueues::lock(&self.shared.events).push_back(
                        ConnectionEvent::Disconnected {
                            player_id,
                            timed_out: false,
                        },
                    );
                }
            }
            PacketType::Heartbeat => {
                if let Ok(heartbeat) = Heartbeat::parse(&packet.payload) {
                    if !self.slots.heartbeat(sender, now_ms) {
                        debug!(
                            "heartbeat for player {} from unknown endpoint {}",
                            heartbeat.player_id, sender
                        );
                    }
                }
            }
            PacketType::Ping => {
                if let Ok(ping) = Ping::parse(&packet.payload) {
                    let pong = Pong {
                        client_timestamp: ping.client_timestamp,
                        server_timestamp: self.clock.elapsed_ms(),
                    };
                    self.send_control(PacketType::Pong, 0, pong.write(), sender);
                }
            }
            PacketType::Ack => {
                debug!("ack from {}: seq {:?}", sender, packet.header.sequence_number);
            }
            other => {
                debug!("unexpected control packet {:?} from {}", other, sender);
            }
        }
    }

    fn handle_client_connect(&mut self, packet: &Packet, sender: SocketAddr, now_ms: u64) {
        let Ok(connect) = ClientConnect::parse(&packet.payload) else {
            return;
        };
        if connect.protocol_version != PROTOCOL_VERSION {
            self.send_reject(
                sender,
                RejectCode::IncompatibleProtocol,
                "protocol version mismatch",
            );
            return;
        }
        if connect.player_name.trim().is_empty() {
            self.send_reject(sender, RejectCode::InvalidPlayerName, "empty player name");
            return;
        }
        match self
            .slots
            .connect(sender, connect.client_id, &connect.player_name, now_ms)
        {
            ConnectOutcome::Accepted(player_id) => {
                self.send_accept(sender, player_id);
                SharedQueues::lock(&self.shared.events).push_back(ConnectionEvent::Connected {
                    player_id,
                    player_name: connect.player_name,
                });
            }
            ConnectOutcome::AlreadyConnected(player_id) => {
                // Duplicate connect (lost accept, eager retry): re-accept
                // without re-spawning anything.
                self.send_accept(sender, player_id);
            }
            ConnectOutcome::ServerFull => {
                self.send_reject(sender, RejectCode::ServerFull, "server is full");
            }
        }
    }

    fn send_accept(&mut self, sender: SocketAddr, player_id: PlayerId) {
        let accept = ServerAccept {
            assigned_player_id: player_id,
            max_players: self.config.max_players.min(255) as u8,
            game_instance_id: self.game_instance_id,
            server_tickrate: self.config.tick_rate.min(u32::from(u16::MAX)) as u16,
        };
        self.send_control(
            PacketType::ServerAccept,
            flags::RELIABLE,
            accept.write(),
            sender,
        );
    }

    fn send_reject(&mut self, sender: SocketAddr, code: RejectCode, reason: &str) {
        warn!("rejecting {}: {} ({:?})", sender, reason, code);
        let reject = ServerReject {
            reject_code: code,
            reason_message: reason.to_owned(),
        };
        self.send_control(
            PacketType::ServerReject,
            flags::RELIABLE,
            reject.write(),
            sender,
        );
    }

    fn send_control(
        &mut self,
        packet_type: PacketType,
        header_flags: u8,
        payload: Vec<u8>,
        sender: SocketAddr,
    ) {
        let sequence = self.slots.next_sequence(sender);
        let packet = codec::make_packet(
            packet_type,
            header_flags,
            sequence,
            self.clock.elapsed_ms(),
            payload,
        );
        if let Err(error) = self.transport.send_to(&packet.serialize(), sender) {
            warn!("send to {} failed: {}", sender, error);
        }
    }

    /// Sends one outbound packet to every endpoint its addressing selects.
    fn fan_out(&mut self, outbound: OutboundPacket) {
        let bytes = outbound.packet.serialize();
        let targets: Vec<SocketAddr> = match outbound.addressing {
            Addressing::Broadcast => self.slots.endpoints_except(None),
            Addressing::To(player_id) => match self.slots.endpoint_of(player_id) {
                Some(endpoint) => vec![endpoint],
                None => Vec::new(),
            },
            Addressing::Except(player_id) => self.slots.endpoints_except(Some(player_id)),
        };
        for endpoint in targets {
            if let Err(error) = self.transport.send_to(&bytes, endpoint) {
                warn!("fan-out to {} failed: {}", endpoint, error);
            }
        }
    }
}

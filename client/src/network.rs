//! The client network manager: one ephemeral UDP socket, one I/O thread.
//! Phase one waits for SERVER_ACCEPT / SERVER_REJECT; phase two forwards
//! gameplay packets, answers control traffic and emits heartbeats.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use aster_game::ClientNet;
use aster_shared::{
    codec, flags, BaseConnection, ClientConnect, ClientDisconnect, ConnectionConfig,
    DisconnectReason, GameClock, Heartbeat, Packet, PacketType, Ping, PlayerId, Pong, ClientError,
    ServerAccept, ServerReject, Timer, UdpTransport, PROTOCOL_VERSION,
};

/// Client connection settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: SocketAddr,
    pub player_name: String,
    /// How long to wait for SERVER_ACCEPT before reporting failure.
    pub connect_timeout: Duration,
    pub connection: ConnectionConfig,
}

impl ClientConfig {
    pub fn new(server_addr: SocketAddr, player_name: impl Into<String>) -> Self {
        Self {
            server_addr,
            player_name: player_name.into(),
            connect_timeout: Duration::from_secs(15),
            connection: ConnectionConfig::default(),
        }
    }
}

struct SharedState {
    inbound: Mutex<VecDeque<Packet>>,
    outbound: Mutex<VecDeque<Packet>>,
    rejection: Mutex<Option<(u8, String)>>,
    running: AtomicBool,
    connected: AtomicBool,
    player_id: AtomicU32,
}

impl SharedState {
    fn new() -> Self {
        Self {
            inbound: Mutex::new(VecDeque::new()),
            outbound: Mutex::new(VecDeque::new()),
            rejection: Mutex::new(None),
            running: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            player_id: AtomicU32::new(0),
        }
    }

    fn lock<'a, T>(queue: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        match queue.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

pub struct ClientNetworkManager {
    config: ClientConfig,
    shared: Arc<SharedState>,
    io_thread: Option<JoinHandle<()>>,
}

impl ClientNetworkManager {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            shared: Arc::new(SharedState::new()),
            io_thread: None,
        }
    }

    /// Binds an ephemeral port, launches the I/O thread and blocks until
    /// the server accepts, rejects, or the connect timeout elapses.
    pub fn connect(&mut self) -> Result<PlayerId, ClientError> {
        let transport = UdpTransport::bind("0.0.0.0:0").map_err(ClientError::Network)?;
        info!(
            "connecting to {} as '{}'",
            self.config.server_addr, self.config.player_name
        );

        self.shared.running.store(true, Ordering::SeqCst);
        let mut io = IoLoop {
            transport,
            clock: GameClock::new(),
            connection: BaseConnection::new(&self.config.connection),
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
        };
        self.io_thread = Some(
            thread::Builder::new()
                .name("aster-net-io".to_owned())
                .spawn(move || io.run())
                .map_err(|_| ClientError::NotConnected)?,
        );

        let deadline = Timer::new(self.config.connect_timeout);
        loop {
            if self.shared.connected.load(Ordering::SeqCst) {
                let player_id = self.shared.player_id.load(Ordering::SeqCst);
                info!("connected, assigned player id {}", player_id);
                return Ok(player_id);
            }
            let rejection = SharedState::lock(&self.shared.rejection).take();
            if let Some((code, reason)) = rejection {
                self.stop();
                return Err(ClientError::Rejected { code, reason });
            }
            if deadline.ringing() {
                self.stop();
                return Err(ClientError::ConnectTimeout(
                    self.config.connect_timeout.as_millis() as u64,
                ));
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    /// Announces departure and tears the connection down.
    pub fn disconnect(&mut self) {
        if self.shared.connected.load(Ordering::SeqCst) {
            let player_id = self.shared.player_id.load(Ordering::SeqCst);
            let payload = ClientDisconnect {
                client_id: player_id,
                reason: DisconnectReason::Normal,
            };
            let packet = codec::make_packet(
                PacketType::ClientDisconnect,
                flags::RELIABLE,
                0,
                0,
                payload.write(),
            );
            SharedState::lock(&self.shared.outbound).push_back(packet);
            // One I/O iteration to flush the farewell.
            thread::sleep(Duration::from_millis(10));
        }
        self.stop();
    }

    fn stop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        if let Some(handle) = self.io_thread.take() {
            if handle.join().is_err() {
                error!("client I/O thread panicked during shutdown");
            }
        }
    }

    pub fn player_id(&self) -> PlayerId {
        self.shared.player_id.load(Ordering::SeqCst)
    }
}

impl ClientNet for ClientNetworkManager {
    fn fetch_incoming(&mut self) -> Vec<Packet> {
        SharedState::lock(&self.shared.inbound).drain(..).collect()
    }

    fn queue_outgoing(&mut self, packet: Packet) {
        SharedState::lock(&self.shared.outbound).push_back(packet);
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }
}

impl Drop for ClientNetworkManager {
    fn drop(&mut self) {
        if self.shared.running.load(Ordering::SeqCst) {
            self.stop();
        }
    }
}

struct IoLoop {
    transport: UdpTransport,
    clock: GameClock,
    connection: BaseConnection,
    shared: Arc<SharedState>,
    config: ClientConfig,
}

impl IoLoop {
    fn run(&mut self) {
        info!("client I/O thread started");
        if self.await_accept() {
            self.steady_state();
        }
        info!("client I/O thread stopped");
    }

    /// Phase one: send CLIENT_CONNECT (re-sent each second against loss)
    /// and wait for the server's verdict.
    fn await_accept(&mut self) -> bool {
        let mut resend = Timer::new(Duration::from_secs(1));
        self.send_connect();
        while self.shared.running.load(Ordering::SeqCst) {
            if resend.ringing() {
                resend.reset();
                self.send_connect();
            }
            match self.transport.receive_from() {
                Ok(Some((bytes, sender))) => {
                    if sender != self.config.server_addr {
                        debug!("ignoring datagram from stranger {}", sender);
                        continue;
                    }
                    if self.handle_handshake_packet(&bytes) {
                        return self.shared.connected.load(Ordering::SeqCst);
                    }
                }
                Ok(None) => thread::sleep(Duration::from_millis(1)),
                Err(error) => warn!("receive error during handshake: {}", error),
            }
            self.drain_outbound();
        }
        false
    }

    /// Returns true once the handshake is decided either way.
    fn handle_handshake_packet(&mut self, bytes: &[u8]) -> bool {
        let Ok(packet) = Packet::deserialize(bytes) else {
            return false;
        };
        match PacketType::from_u8(packet.header.packet_type) {
            Some(PacketType::ServerAccept) => {
                let Ok(accept) = ServerAccept::parse(&packet.payload) else {
                    return false;
                };
                info!(
                    "accepted: player {} of {}, instance {:#x}, {} Hz",
                    accept.assigned_player_id,
                    accept.max_players,
                    accept.game_instance_id,
                    accept.server_tickrate
                );
                self.shared
                    .player_id
                    .store(accept.assigned_player_id, Ordering::SeqCst);
                self.shared.connected.store(true, Ordering::SeqCst);
                self.connection.mark_heard();
                true
            }
            Some(PacketType::ServerReject) => {
                let (code, reason) = match ServerReject::parse(&packet.payload) {
                    Ok(reject) => (reject.reject_code as u8, reject.reason_message),
                    Err(_) => (0xFF, "malformed rejection".to_owned()),
                };
                warn!("rejected by server: {} (code {})", reason, code);
                *SharedState::lock(&self.shared.rejection) = Some((code, reason));
                self.shared.running.store(false, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }

    /// Phase two: forward gameplay packets, answer control, heartbeat.
    fn steady_state(&mut self) {
        while self.shared.running.load(Ordering::SeqCst) {
            let mut idle = true;

            if self.connection.should_drop() {
                warn!("server went silent, reporting disconnection");
                self.shared.connected.store(false, Ordering::SeqCst);
                self.shared.running.store(false, Ordering::SeqCst);
                break;
            }

            loop {
                match self.transport.receive_from() {
                    Ok(Some((bytes, sender))) => {
                        if sender != self.config.server_addr {
                            continue;
                        }
                        idle = false;
                        self.connection.mark_heard();
                        self.handle_datagram(&bytes);
                    }
                    Ok(None) => break,
                    Err(error) => {
                        warn!("receive error: {}", error);
                        break;
                    }
                }
            }

            if self.connection.should_send_heartbeat() {
                self.connection.mark_heartbeat_sent();
                let payload = Heartbeat {
                    player_id: self.shared.player_id.load(Ordering::SeqCst),
                };
                self.send(PacketType::Heartbeat, 0, payload.write());
                idle = false;
            }

            if self.drain_outbound() {
                idle = false;
            }

            if idle {
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn handle_datagram(&mut self, bytes: &[u8]) {
        let packet = match Packet::deserialize(bytes) {
            Ok(packet) => packet,
            Err(error) => {
                warn!("malformed datagram: {}", error);
                return;
            }
        };
        let packet_type = match codec::process_packet(&packet) {
            Ok(packet_type) => packet_type,
            Err(error) => {
                warn!("invalid packet: {}", error);
                return;
            }
        };
        if !packet_type.is_control() {
            SharedState::lock(&self.shared.inbound).push_back(packet);
            return;
        }
        match packet_type {
            PacketType::ClientDisconnect => {
                info!("server closed the connection");
                self.shared.connected.store(false, Ordering::SeqCst);
                self.shared.running.store(false, Ordering::SeqCst);
            }
            PacketType::Ping => {
                if let Ok(ping) = Ping::parse(&packet.payload) {
                    let pong = Pong {
                        client_timestamp: ping.client_timestamp,
                        server_timestamp: self.clock.elapsed_ms(),
                    };
                    self.send(PacketType::Pong, 0, pong.write());
                }
            }
            PacketType::Heartbeat | PacketType::Pong | PacketType::Ack => {
                // Liveness already recorded by mark_heard.
            }
            PacketType::ServerAccept => {
                debug!("duplicate SERVER_ACCEPT ignored");
            }
            other => debug!("unexpected control packet {:?}", other),
        }
    }

    fn send_connect(&mut self) {
        let payload = ClientConnect {
            protocol_version: PROTOCOL_VERSION,
            player_name: self.config.player_name.clone(),
            client_id: process_client_id(),
        };
        self.send(PacketType::ClientConnect, 0, payload.write());
    }

    fn send(&mut self, packet_type: PacketType, header_flags: u8, payload: Vec<u8>) {
        let packet = codec::make_packet(
            packet_type,
            header_flags,
            self.connection.next_sequence(),
            self.clock.elapsed_ms(),
            payload,
        );
        if let Err(error) = self
            .transport
            .send_to(&packet.serialize(), self.config.server_addr)
        {
            warn!("send failed: {}", error);
        }
    }

    fn drain_outbound(&mut self) -> bool {
        let mut sent_any = false;
        loop {
            let next = SharedState::lock(&self.shared.outbound).pop_front();
            let Some(mut packet) = next else { break };
            packet.header.sequence_number = self.connection.next_sequence();
            packet.header.timestamp = self.clock.elapsed_ms();
            if let Err(error) = self
                .transport
                .send_to(&packet.serialize(), self.config.server_addr)
            {
                warn!("send failed: {}", error);
            }
            sent_any = true;
        }
        sent_any
    }
}

/// A process-unique client id for the handshake. The server keys on the
/// endpoint; this only disambiguates logs.
fn process_client_id() -> u32 {
    std::process::id()
}

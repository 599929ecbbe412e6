//! Single-socket UDP transport. One socket per endpoint, owned by that
//! endpoint's network I/O thread; non-blocking reads and writes only.

use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use log::trace;

use crate::error::NetworkError;
use crate::protocol::{HEADER_SIZE, MAX_DATAGRAM_SIZE};

/// Non-blocking UDP socket with a single receive buffer sized for the
/// largest possible datagram, plus a cached last-sender address for reply
/// semantics.
pub struct UdpTransport {
    socket: UdpSocket,
    recv_buffer: Box<[u8]>,
    last_sender: Option<SocketAddr>,
}

impl UdpTransport {
    /// Binds the socket and switches it to non-blocking mode. Port 0 binds
    /// an ephemeral port (client side).
    pub fn bind<A: ToSocketAddrs + std::fmt::Debug>(addr: A) -> Result<Self, NetworkError> {
        let socket = UdpSocket::bind(&addr).map_err(|source| NetworkError::Bind {
            addr: format!("{:?}", addr),
            source,
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| NetworkError::Bind {
                addr: format!("{:?}", addr),
                source,
            })?;
        Ok(Self {
            socket,
            recv_buffer: vec![0u8; MAX_DATAGRAM_SIZE].into_boxed_slice(),
            last_sender: None,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.socket.local_addr().map_err(NetworkError::Receive)
    }

    /// Attempts to receive one datagram. Returns `Ok(None)` when nothing is
    /// pending. Datagrams below header size are dropped with an error so
    /// the caller can log and continue.
    pub fn receive_from(&mut self) -> Result<Option<(Vec<u8>, SocketAddr)>, NetworkError> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((size, sender)) => {
                if size < HEADER_SIZE {
                    return Err(NetworkError::DatagramTooShort {
                        size,
                        expected: HEADER_SIZE,
                    });
                }
                self.last_sender = Some(sender);
                trace!("recv {} bytes from {}", size, sender);
                Ok(Some((self.recv_buffer[..size].to_vec(), sender)))
            }
            Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(error) => Err(NetworkError::Receive(error)),
        }
    }

    /// Sends one datagram to the given peer.
    pub fn send_to(&self, bytes: &[u8], target: SocketAddr) -> Result<usize, NetworkError> {
        let sent = self
            .socket
            .send_to(bytes, target)
            .map_err(NetworkError::Send)?;
        trace!("sent {} bytes to {}", sent, target);
        Ok(sent)
    }

    /// Sends back to whoever we last received from.
    pub fn send_reply(&self, bytes: &[u8]) -> Result<usize, NetworkError> {
        let target = self.last_sender.ok_or(NetworkError::NoLastSender)?;
        self.send_to(bytes, target)
    }

    pub fn last_sender(&self) -> Option<SocketAddr> {
        self.last_sender
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_receive_send_loopback() {
        let mut server = UdpTransport::bind("127.0.0.1:0").unwrap();
        let client = UdpTransport::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();

        // Nothing pending yet.
        assert!(matches!(server.receive_from(), Ok(None)));

        let datagram = vec![0xAB; HEADER_SIZE + 4];
        client.send_to(&datagram, server_addr).unwrap();

        // Non-blocking: poll until the datagram lands.
        let mut received = None;
        for _ in 0..100 {
            if let Some(packet) = server.receive_from().unwrap() {
                received = Some(packet);
                break;
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
        let (bytes, sender) = received.expect("datagram should arrive on loopback");
        assert_eq!(bytes, datagram);
        assert_eq!(sender, client.local_addr().unwrap());
        assert_eq!(server.last_sender(), Some(sender));

        server.send_reply(&datagram).unwrap();
    }

    #[test]
    fn short_datagram_is_reported_not_panicked() {
        let mut server = UdpTransport::bind("127.0.0.1:0").unwrap();
        let client = UdpTransport::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();

        client.send_to(&[1, 2, 3], server_addr).unwrap();
        let mut saw_error = false;
        for _ in 0..100 {
            match server.receive_from() {
                Err(NetworkError::DatagramTooShort { size: 3, .. }) => {
                    saw_error = true;
                    break;
                }
                Ok(None) => std::thread::sleep(std::time::Duration::from_millis(1)),
                other => panic!("unexpected result: {:?}", other.map(|_| ())),
            }
        }
        assert!(saw_error);
    }
}

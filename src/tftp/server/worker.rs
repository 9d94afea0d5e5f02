use std::fmt;
use std::io::{self, Cursor};
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use crate::tftp::core::{DATAGRAM_SIZE, DataStream, ErrorCode, Packet, ReadReq};

/// Why a transfer ended before the whole payload was acknowledged.
#[derive(Debug)]
pub enum TransferError {
    /// The payload source failed mid-read.
    Source(io::Error),
    Send(io::Error),
    /// A receive fault other than the ACK timeout.
    Recv(io::Error),
    /// The client sent an ERROR packet; the session stops immediately.
    Peer { code: ErrorCode, message: String },
    /// The retry budget for one block ran out with no matching ACK.
    RetriesExhausted,
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Source(e) => write!(f, "reading payload: {}", e),
            TransferError::Send(e) => write!(f, "write: {}", e),
            TransferError::Recv(e) => write!(f, "waiting for ACK: {}", e),
            TransferError::Peer { code, message } => {
                write!(f, "peer error {:?}: {}", code, message)
            }
            TransferError::RetriesExhausted => write!(f, "exhausted retries"),
        }
    }
}

impl std::error::Error for TransferError {}

/// One download session.
///
/// The worker owns a socket bound to an ephemeral port and connected to
/// the requesting client, so the OS picks the transfer ID and filters
/// out datagrams from other peers. It also owns a private cursor over
/// the shared payload. [`Worker::serve`] consumes the worker, a
/// finished session cannot touch the network again.
pub struct Worker {
    socket: UdpSocket,
    peer: SocketAddr,
    request: ReadReq,
    stream: DataStream<Cursor<Arc<[u8]>>>,
    retries: u8,
}

impl Worker {
    pub fn new(
        peer: SocketAddr,
        request: ReadReq,
        payload: Arc<[u8]>,
        retries: u8,
        timeout: Duration,
    ) -> io::Result<Self> {
        // The session socket must share the peer's address family, the
        // listener may be bound to IPv6.
        let bind_addr = if peer.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(peer)?;
        socket.set_read_timeout(Some(timeout))?;

        Ok(Self {
            socket,
            peer,
            request,
            stream: DataStream::new(Cursor::new(payload)),
            retries,
        })
    }

    /// Runs the transfer to completion and logs the outcome.
    pub fn serve(mut self) {
        log::info!("[{}] read request: {}", self.peer, self.request.filename);

        match self.transfer() {
            Ok(blocks) => log::info!("[{}] sent {} blocks", self.peer, blocks),
            Err(TransferError::Peer { message, .. }) => {
                log::error!("[{}] received error: {}", self.peer, message);
            }
            Err(err) => log::error!("[{}] {}", self.peer, err),
        }
    }

    /// Lock-step send loop. Returns the number of the final block once
    /// the client has acknowledged a short datagram.
    fn transfer(&mut self) -> Result<u16, TransferError> {
        loop {
            let datagram = self.stream.next_block().map_err(TransferError::Source)?;
            let block = self.stream.block();

            let mut acked = false;
            for _ in 0..self.retries {
                self.socket.send(&datagram).map_err(TransferError::Send)?;

                let mut buf = [0u8; DATAGRAM_SIZE];
                let n = match self.socket.recv(&mut buf) {
                    Ok(n) => n,
                    Err(e)
                        if e.kind() == io::ErrorKind::WouldBlock
                            || e.kind() == io::ErrorKind::TimedOut =>
                    {
                        // No ACK within the deadline, resend.
                        continue;
                    }
                    Err(e) => return Err(TransferError::Recv(e)),
                };

                match Packet::deserialize(&buf[..n]) {
                    Ok(Packet::Ack(ack)) if ack == block => {
                        acked = true;
                        break;
                    }
                    Ok(Packet::Ack(ack)) => {
                        // Duplicate ACK for an earlier block; costs one
                        // attempt like a timeout does.
                        log::debug!("[{}] stale ack {} (expected {})", self.peer, ack, block);
                    }
                    Ok(Packet::Error { code, message }) => {
                        return Err(TransferError::Peer { code, message });
                    }
                    _ => log::warn!("[{}] bad packet", self.peer),
                }
            }

            if !acked {
                return Err(TransferError::RetriesExhausted);
            }

            // A short datagram is the final one.
            if datagram.len() < DATAGRAM_SIZE {
                return Ok(block);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::thread;

    fn spawn_worker(
        peer: SocketAddr,
        payload: &[u8],
        retries: u8,
        timeout: Duration,
    ) -> thread::JoinHandle<Result<u16, TransferError>> {
        let worker = Worker::new(
            peer,
            ReadReq::new("payload"),
            Arc::from(payload),
            retries,
            timeout,
        )
        .unwrap();

        thread::spawn(move || {
            let mut worker = worker;
            worker.transfer()
        })
    }

    #[test]
    fn test_transfer_completes_after_final_ack() {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let handle = spawn_worker(
            client.local_addr().unwrap(),
            b"hello",
            3,
            Duration::from_millis(500),
        );

        let mut buf = [0u8; DATAGRAM_SIZE];
        let (n, from) = client.recv_from(&mut buf).unwrap();
        assert_eq!(buf[..4], [0x00, 0x03, 0x00, 0x01]);
        assert_eq!(&buf[4..n], b"hello");

        client.send_to(&Packet::Ack(1).serialize(), from).unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_transfer_resends_after_stale_ack() {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let handle = spawn_worker(
            client.local_addr().unwrap(),
            b"hello",
            3,
            Duration::from_millis(500),
        );

        let mut buf = [0u8; DATAGRAM_SIZE];
        let (_, from) = client.recv_from(&mut buf).unwrap();
        client.send_to(&Packet::Ack(0).serialize(), from).unwrap();

        // The stale ack must trigger a resend of block 1.
        let (n, _) = client.recv_from(&mut buf).unwrap();
        assert_eq!(buf[..4], [0x00, 0x03, 0x00, 0x01]);
        assert_eq!(&buf[4..n], b"hello");

        client.send_to(&Packet::Ack(1).serialize(), from).unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_transfer_resends_after_bad_packet() {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let handle = spawn_worker(
            client.local_addr().unwrap(),
            b"hello",
            3,
            Duration::from_millis(500),
        );

        let mut buf = [0u8; DATAGRAM_SIZE];
        let (_, from) = client.recv_from(&mut buf).unwrap();
        client.send_to(&[0xde, 0xad, 0xbe, 0xef], from).unwrap();

        // An undecodable reply must trigger a resend of block 1 from the
        // same session socket.
        let (n, resender) = client.recv_from(&mut buf).unwrap();
        assert_eq!(resender, from);
        assert_eq!(buf[..4], [0x00, 0x03, 0x00, 0x01]);
        assert_eq!(&buf[4..n], b"hello");

        client.send_to(&Packet::Ack(1).serialize(), from).unwrap();

        assert_eq!(handle.join().unwrap().unwrap(), 1);
    }

    #[test]
    fn test_transfer_aborts_on_peer_error() {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let handle = spawn_worker(
            client.local_addr().unwrap(),
            b"hello",
            3,
            Duration::from_millis(500),
        );

        let mut buf = [0u8; DATAGRAM_SIZE];
        let (_, from) = client.recv_from(&mut buf).unwrap();
        let error = Packet::Error {
            code: ErrorCode::DiskFull,
            message: "disk full".to_string(),
        };
        client.send_to(&error.serialize(), from).unwrap();

        match handle.join().unwrap() {
            Err(TransferError::Peer { code, message }) => {
                assert_eq!(code, ErrorCode::DiskFull);
                assert_eq!(message, "disk full");
            }
            other => panic!("expected peer error, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_exhausts_retries_without_acks() {
        let client = UdpSocket::bind("127.0.0.1:0").unwrap();
        client
            .set_read_timeout(Some(Duration::from_millis(600)))
            .unwrap();

        let handle = spawn_worker(
            client.local_addr().unwrap(),
            b"hello",
            3,
            Duration::from_millis(100),
        );

        // Never ack: block 1 must arrive exactly `retries` times.
        let mut sends = 0;
        let mut buf = [0u8; DATAGRAM_SIZE];
        while client.recv_from(&mut buf).is_ok() {
            assert_eq!(buf[..4], [0x00, 0x03, 0x00, 0x01]);
            sends += 1;
        }
        assert_eq!(sends, 3);

        match handle.join().unwrap() {
            Err(TransferError::RetriesExhausted) => {}
            other => panic!("expected exhausted retries, got {:?}", other),
        }
    }

    #[test]
    fn test_transfer_aborts_on_refused_peer() {
        let vacated = UdpSocket::bind("127.0.0.1:0").unwrap();
        let peer = vacated.local_addr().unwrap();
        drop(vacated);

        let handle = spawn_worker(peer, b"hello", 3, Duration::from_millis(500));

        // The loopback port-unreachable rejection surfaces as a socket
        // fault on the read or the next write, not as a timeout.
        match handle.join().unwrap() {
            Err(TransferError::Recv(_)) | Err(TransferError::Send(_)) => {}
            other => panic!("expected transport fault, got {:?}", other),
        }
    }
}

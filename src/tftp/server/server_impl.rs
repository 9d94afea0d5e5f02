use std::net::UdpSocket;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use super::config::{DEFAULT_RETRIES, DEFAULT_TIMEOUT};
use super::worker::Worker;
use crate::tftp::core::{DATAGRAM_SIZE, ReadReq};

/// Read-only TFTP server: every read request is answered with the same
/// shared payload, whatever filename the client asked for.
pub struct Server {
    payload: Arc<[u8]>,
    retries: u8,
    timeout: Duration,
}

impl Server {
    pub fn new(payload: impl Into<Arc<[u8]>>) -> Self {
        Self {
            payload: payload.into(),
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Per-block retransmission budget. Zero falls back to the default
    /// when serving starts.
    pub fn with_retries(mut self, retries: u8) -> Self {
        self.retries = retries;
        self
    }

    /// How long a session waits for an ACK before retransmitting. Zero
    /// falls back to the default when serving starts.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Binds `addr` and serves until the socket fails.
    pub fn listen_and_serve(&self, addr: &str) -> Result<()> {
        let socket = UdpSocket::bind(addr).with_context(|| format!("binding {}", addr))?;
        log::info!("Listening on {} ...", socket.local_addr()?);

        self.serve(socket)
    }

    /// Accept loop: decode incoming read requests and hand each one to
    /// its own worker thread. Returns only when receiving on the socket
    /// fails; malformed requests are logged and dropped.
    pub fn serve(&self, socket: UdpSocket) -> Result<()> {
        if self.payload.is_empty() {
            bail!("payload is required");
        }

        let retries = if self.retries == 0 {
            DEFAULT_RETRIES
        } else {
            self.retries
        };
        let timeout = if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        };

        let mut buf = [0u8; DATAGRAM_SIZE];
        loop {
            let (n, addr) = socket.recv_from(&mut buf).context("receiving request")?;

            match ReadReq::deserialize(&buf[..n]) {
                Ok(request) => {
                    let payload = Arc::clone(&self.payload);
                    thread::spawn(move || {
                        match Worker::new(addr, request, payload, retries, timeout) {
                            Ok(worker) => worker.serve(),
                            Err(err) => log::error!("[{}] connect: {}", addr, err),
                        }
                    });
                }
                Err(err) => {
                    log::error!("[{}] bad request: {}", addr, err);
                }
            }
        }
    }
}

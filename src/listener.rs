use std::net::SocketAddr;

use anyhow::Result;
use log::{info, warn};
use tokio::net::UdpSocket;

use crate::bridge::MidiBridge;
use crate::dispatch;

/// Receive size for one control packet.
const RECV_BUF_LEN: usize = 1024;

/// UDP listener accepting control packets for the bridge.
pub struct NetworkListener {
    socket: UdpSocket,
}

impl NetworkListener {
    /// Binds the control socket on all interfaces. A bind failure is fatal
    /// at startup.
    pub async fn bind(port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await?;
        info!("Listening for control packets on {}", socket.local_addr()?);
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Serves datagrams forever, spawning one dispatch task per packet.
    ///
    /// Dispatch is not awaited: packets are handled concurrently, with no
    /// ordering and no backpressure. A receive error is logged and the loop
    /// keeps serving; losing one datagram must not take the instrument down.
    pub async fn run(&self, bridge: MidiBridge) {
        let mut buf = [0u8; RECV_BUF_LEN];
        loop {
            match self.socket.recv_from(&mut buf).await {
                Ok((n, addr)) => {
                    info!("Received {} from {}", String::from_utf8_lossy(&buf[..n]), addr);
                    // The receive buffer is reused; each task gets its own copy.
                    let packet = buf[..n].to_vec();
                    tokio::spawn(dispatch::dispatch(bridge.clone(), packet));
                }
                Err(e) => {
                    warn!("UDP receive failed: {}", e);
                }
            }
        }
    }
}

// net/udp.rs — datagram endpoint bound per session
use crate::errors::LinkError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{UdpSocket, lookup_host};
use tracing::{debug, trace};

/// One unconnected datagram socket plus the single peer it talks to.
/// Recreated for every session.
#[derive(Debug, Clone)]
pub struct Endpoint {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl Endpoint {
    pub async fn open(bind_addr: &str, peer: SocketAddr) -> Result<Self, LinkError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        debug!(local = ?socket.local_addr().ok(), %peer, "endpoint open");
        Ok(Self { socket: Arc::new(socket), peer })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn send(&self, datagram: &[u8]) -> Result<(), LinkError> {
        trace!(bytes = %hex::encode(datagram), peer = %self.peer, "tx");
        self.socket.send_to(datagram, self.peer).await?;
        Ok(())
    }

    pub async fn recv_from(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }
}

/// Accepts `host:port`, or a bare host that gets `default_port`.
pub async fn resolve(target: &str, default_port: u16) -> Result<SocketAddr, LinkError> {
    if let Ok(addr) = target.parse::<SocketAddr>() {
        return Ok(addr);
    }
    let mut addrs = lookup_host((target, default_port))
        .await
        .map_err(|_| LinkError::Resolve(target.to_string()))?;
    addrs.next().ok_or_else(|| LinkError::Resolve(target.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_accepts_bare_host_and_full_address() {
        let a = resolve("127.0.0.1", 4321).await.unwrap();
        assert_eq!(a, "127.0.0.1:4321".parse().unwrap());
        let b = resolve("127.0.0.1:9000", 4321).await.unwrap();
        assert_eq!(b.port(), 9000);
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let ep = Endpoint::open("127.0.0.1:0", peer.local_addr().unwrap()).await.unwrap();
        ep.send(&[4, 1]).await.unwrap();
        let mut buf = [0u8; 8];
        let (n, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[4, 1]);
    }
}

// net/udp.rs
use crate::errors::SimError;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use tracing::{info, trace};

pub async fn bind(bind_addr: &str) -> Result<UdpSocket, SimError> {
    let sock = UdpSocket::bind(bind_addr).await?;
    info!(local = ?sock.local_addr().ok(), "vehicle listening");
    Ok(sock)
}

pub async fn send(sock: &UdpSocket, datagram: &[u8], to: SocketAddr) -> Result<(), SimError> {
    trace!(bytes = %hex::encode(datagram), %to, "tx");
    sock.send_to(datagram, to).await?;
    Ok(())
}

// net/dispatch.rs — single reader of the session endpoint, routing replies to
// whichever exchange is waiting and everything else to the telemetry loop
use crate::{errors::LinkError, net::udp::Endpoint};
use dashmap::DashMap;
use link_protocol::{MAX_DATAGRAM_SIZE, ReplyKey, Request};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, MutexGuard, mpsc, oneshot};
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

const RECV_ERROR_BACKOFF: Duration = Duration::from_millis(10);

/// Set while a handshake or config write owns the endpoint.
#[derive(Debug, Clone, Default)]
pub struct PauseFlag(Arc<AtomicBool>);

impl PauseFlag {
    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn set(&self, on: bool) {
        self.0.store(on, Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub tries: u32,
    pub timeout: Duration,
}

/// Exclusive hold on request/reply traffic. The pause flag is cleared on drop,
/// including when an exchange aborts early.
pub struct PauseGuard<'a> {
    _gate: MutexGuard<'a, ()>,
    paused: &'a PauseFlag,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.paused.set(false);
    }
}

pub struct Exchange {
    endpoint: Endpoint,
    waiters: DashMap<ReplyKey, oneshot::Sender<Vec<u8>>>,
    paused: PauseFlag,
    gate: Mutex<()>,
}

impl Exchange {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            waiters: DashMap::new(),
            paused: PauseFlag::default(),
            gate: Mutex::new(()),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn pause_flag(&self) -> PauseFlag {
        self.paused.clone()
    }

    /// Wait for any other exchange to finish, then pause the loops.
    pub async fn hold(&self) -> PauseGuard<'_> {
        let gate = self.gate.lock().await;
        self.paused.set(true);
        PauseGuard { _gate: gate, paused: &self.paused }
    }

    /// Send `request` and wait for its reply, resending up to `policy.tries`
    /// times. `accept` validates a reply; a rejected reply ends that attempt.
    pub async fn request<T, F>(
        &self,
        _held: &PauseGuard<'_>,
        request: &Request,
        policy: RetryPolicy,
        mut accept: F,
    ) -> Result<T, LinkError>
    where
        F: FnMut(&[u8]) -> Result<T, LinkError>,
    {
        let key = request.reply_key();
        let bytes = request.encode();
        let mut last = LinkError::Timeout(policy.timeout);

        for attempt in 1..=policy.tries {
            let (tx, rx) = oneshot::channel();
            self.waiters.insert(key, tx);

            if let Err(e) = self.endpoint.send(&bytes).await {
                self.waiters.remove(&key);
                warn!(?key, attempt, error = %e, "request send failed");
                last = e;
                continue;
            }

            match time::timeout(policy.timeout, rx).await {
                Ok(Ok(reply)) => match accept(&reply) {
                    Ok(v) => {
                        trace!(?key, attempt, "reply accepted");
                        return Ok(v);
                    }
                    Err(e) => {
                        debug!(?key, attempt, error = %e, "discarding reply");
                        last = e;
                    }
                },
                Ok(Err(_closed)) => return Err(LinkError::SessionClosed),
                Err(_elapsed) => {
                    self.waiters.remove(&key);
                    debug!(?key, attempt, "no reply");
                    last = LinkError::Timeout(policy.timeout);
                }
            }
        }

        warn!(?key, tries = policy.tries, error = %last, "request gave up");
        Err(last)
    }

    /// Hand a datagram to the exchange waiting for it. Returns it back when
    /// nobody is waiting.
    pub fn deliver(&self, datagram: Vec<u8>) -> Option<Vec<u8>> {
        let Some(key) = ReplyKey::of(&datagram) else {
            return Some(datagram);
        };
        match self.waiters.remove(&key) {
            Some((_, tx)) => tx.send(datagram).err(),
            None => Some(datagram),
        }
    }

    /// Drop all waiters; pending requests fail with `SessionClosed`.
    pub fn close(&self) {
        self.waiters.clear();
    }
}

/// Owns every read of the endpoint for one session.
pub async fn run_dispatcher(
    exchange: Arc<Exchange>,
    inbound: mpsc::Sender<Vec<u8>>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let peer = exchange.endpoint().peer();

    loop {
        let received = tokio::select! {
            _ = cancel.cancelled() => break,
            r = exchange.endpoint().recv_from(&mut buf) => r,
        };
        let (n, from) = match received {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "recv error");
                time::sleep(RECV_ERROR_BACKOFF).await;
                continue;
            }
        };
        if from != peer {
            debug!(%from, "dropping datagram from unexpected source");
            continue;
        }

        let datagram = buf[..n].to_vec();
        trace!(bytes = %hex::encode(&datagram), "rx");
        if let Some(unclaimed) = exchange.deliver(datagram) {
            if let Err(mpsc::error::TrySendError::Full(_)) = inbound.try_send(unclaimed) {
                debug!("inbound queue full; dropping datagram");
            }
        }
    }

    exchange.close();
    debug!("dispatcher stopped");
}

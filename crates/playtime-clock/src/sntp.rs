//! SNTP time authority over UDP

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::time::{Duration, Instant, SystemTime};
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use crate::packet::{client_request, parse_reply, NTP_PACKET_LEN};
use crate::{SyncError, SyncResult, TimeAuthority};

/// Queries a single SNTP server
pub struct SntpAuthority {
    server: String,
    timeout: Duration,
}

impl SntpAuthority {
    /// `server` is a `host:port` pair, e.g. `pool.ntp.org:123`
    pub fn new(server: impl Into<String>, timeout: Duration) -> Self {
        Self {
            server: server.into(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn resolve(&self) -> SyncResult<SocketAddr> {
        let mut addrs = lookup_host(self.server.as_str())
            .await
            .map_err(|e| SyncError::Resolve {
                server: self.server.clone(),
                reason: e.to_string(),
            })?;

        addrs.next().ok_or_else(|| SyncError::Resolve {
            server: self.server.clone(),
            reason: "no addresses".into(),
        })
    }

    async fn exchange(&self) -> SyncResult<DateTime<Utc>> {
        let addr = self.resolve().await?;
        let bind_addr = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(addr).await?;

        let request = client_request(DateTime::<Utc>::from(SystemTime::now()));
        let sent = Instant::now();
        socket.send(&request).await?;

        let mut buf = [0u8; NTP_PACKET_LEN * 2];
        loop {
            let len = socket.recv(&mut buf).await?;
            let round_trip = sent.elapsed();

            match parse_reply(&buf[..len], &request) {
                Ok(server_time) => {
                    let half_trip = chrono::Duration::from_std(round_trip / 2)
                        .unwrap_or_else(|_| chrono::Duration::zero());
                    debug!(
                        server = %self.server,
                        addr = %addr,
                        round_trip_ms = round_trip.as_millis() as u64,
                        "SNTP reply received"
                    );
                    return Ok(server_time + half_trip);
                }
                // A stray datagram is not our answer; keep waiting
                Err(SyncError::InvalidReply(reason)) if len < NTP_PACKET_LEN => {
                    debug!(server = %self.server, reason = %reason, "Ignoring short datagram");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl TimeAuthority for SntpAuthority {
    async fn query(&self) -> SyncResult<DateTime<Utc>> {
        tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| SyncError::Timeout(self.timeout))?
    }

    fn name(&self) -> &str {
        &self.server
    }
}

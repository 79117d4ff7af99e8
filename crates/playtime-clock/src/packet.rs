//! SNTP (RFC 4330) packet encoding and reply validation

use chrono::{DateTime, Utc};

use crate::SyncError;

pub const NTP_PACKET_LEN: usize = 48;

/// Seconds between the NTP epoch (1900) and the Unix epoch (1970)
pub const NTP_UNIX_OFFSET_SECS: i64 = 2_208_988_800;

/// Seconds in one NTP era
const NTP_ERA_SECS: i64 = 1 << 32;

/// LI = 0 (no warning), VN = 3, Mode = 3 (client)
const CLIENT_HEADER: u8 = 0x1b;

const MODE_MASK: u8 = 0x07;
const MODE_SERVER: u8 = 4;

const ORIGINATE_OFFSET: usize = 24;
const TRANSMIT_OFFSET: usize = 40;

/// Encode a timestamp as 32-bit seconds plus 32-bit fraction since 1900
pub fn encode_timestamp(t: DateTime<Utc>) -> [u8; 8] {
    let secs = (t.timestamp() + NTP_UNIX_OFFSET_SECS).rem_euclid(NTP_ERA_SECS) as u32;
    let frac = ((u64::from(t.timestamp_subsec_nanos()) << 32) / 1_000_000_000) as u32;

    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&secs.to_be_bytes());
    out[4..].copy_from_slice(&frac.to_be_bytes());
    out
}

/// Decode an NTP timestamp. Returns `None` for the all-zero "unset" value.
///
/// Seconds with the high bit clear are read as era 1 (2036 onwards).
pub fn decode_timestamp(bytes: &[u8; 8]) -> Option<DateTime<Utc>> {
    let secs = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let frac = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if secs == 0 && frac == 0 {
        return None;
    }

    let mut ntp_secs = i64::from(secs);
    if secs & 0x8000_0000 == 0 {
        ntp_secs += NTP_ERA_SECS;
    }
    let nanos = ((u64::from(frac) * 1_000_000_000) >> 32) as u32;

    DateTime::from_timestamp(ntp_secs - NTP_UNIX_OFFSET_SECS, nanos)
}

/// Build a client request carrying `sent_at` as its transmit timestamp
pub fn client_request(sent_at: DateTime<Utc>) -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = CLIENT_HEADER;
    packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8].copy_from_slice(&encode_timestamp(sent_at));
    packet
}

/// Validate a server reply to `request` and return the server transmit time
pub fn parse_reply(
    reply: &[u8],
    request: &[u8; NTP_PACKET_LEN],
) -> Result<DateTime<Utc>, SyncError> {
    if reply.len() < NTP_PACKET_LEN {
        return Err(SyncError::InvalidReply(format!(
            "short packet ({} bytes)",
            reply.len()
        )));
    }

    let mode = reply[0] & MODE_MASK;
    if mode != MODE_SERVER {
        return Err(SyncError::InvalidReply(format!("unexpected mode {}", mode)));
    }

    // Stratum 0 is a kiss-o'-death packet
    if reply[1] == 0 {
        return Err(SyncError::InvalidReply("stratum 0 (kiss-o'-death)".into()));
    }

    if reply[ORIGINATE_OFFSET..ORIGINATE_OFFSET + 8] != request[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8]
    {
        return Err(SyncError::InvalidReply(
            "originate timestamp does not match request".into(),
        ));
    }

    let mut transmit = [0u8; 8];
    transmit.copy_from_slice(&reply[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8]);
    decode_timestamp(&transmit)
        .ok_or_else(|| SyncError::InvalidReply("transmit timestamp not set".into()))
}

/// Build a server reply to `request`. Used by test responders.
pub fn server_reply(
    request: &[u8],
    stratum: u8,
    transmit: DateTime<Utc>,
) -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    // LI = 0, VN = 3, Mode = 4
    packet[0] = 0x1c;
    packet[1] = stratum;
    if request.len() >= NTP_PACKET_LEN {
        packet[ORIGINATE_OFFSET..ORIGINATE_OFFSET + 8]
            .copy_from_slice(&request[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8]);
    }
    packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 8].copy_from_slice(&encode_timestamp(transmit));
    packet
}

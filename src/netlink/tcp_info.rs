//! `tcp_info` record decoding with kernel version compatibility
//!
//! This module decodes the kernel's `struct tcp_info` from the raw bytes of
//! an `INET_DIAG_INFO` attribute. The key challenge: the record's size varies
//! across kernel versions. The kernel appends fields over time but never
//! removes or reorders them, so:
//!
//! - An older kernel hands us a record *shorter* than the layout we know
//!   about. That is not corruption; every field past the end of the buffer
//!   simply stays at its zero value.
//! - A newer kernel hands us a record *longer* than our layout. Trailing
//!   bytes we do not understand are ignored.
//!
//! Each field lives at a fixed offset equal to the cumulative width of all
//! preceding fields. Rather than hardcoding one read per field, the decoder
//! walks a single ordered [`LAYOUT`] table and advances a cursor by each
//! field's width, so the offsets are a derived property of the table and the
//! short-read rule exists in exactly one place.
//!
//! Two of the leading bytes are bit-packed composites carrying two values
//! each:
//!
//! - window-scale byte: send scale in the upper nibble, receive scale in the
//!   lower nibble;
//! - rate-limit/fastopen byte: bit 7 is the delivery-rate-app-limited flag,
//!   bits 5-6 are the fastopen-client-fail code.
//!
//! Multi-byte integers in the record follow the byte order of the host the
//! kernel runs on. That platform coupling is made explicit through the
//! [`ByteOrder`] parameter instead of being an ambient assumption, which also
//! lets tests exercise both orders deterministically.

use serde::{Deserialize, Serialize};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// A field was cut mid-way through its bytes.
///
/// Distinct from clean truncation: a buffer ending exactly at a field
/// boundary means "older kernel, fewer fields" and decodes successfully,
/// but a buffer ending *inside* a field can only mean the input was
/// corrupted or mis-framed, and silently zero-filling it would mask that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncatedFieldError {
    /// Byte offset of the field that could not be fully read.
    pub offset: usize,
    /// Width in bytes the field requires.
    pub width: usize,
    /// Bytes actually remaining at that offset (always 1..width).
    pub available: usize,
}

impl std::fmt::Display for TruncatedFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "truncated tcp_info field at offset {}: need {} bytes, {} available",
            self.offset, self.width, self.available
        )
    }
}

impl std::error::Error for TruncatedFieldError {}

// ============================================================================
// BYTE ORDER
// ============================================================================

/// Byte order of multi-byte integers in the encoded record.
///
/// The kernel writes `tcp_info` in the host's native order; the record is
/// not portable across byte-order boundaries. [`ByteOrder::native`] is the
/// order to use for records read from the local kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the platform this crate was compiled for.
    #[must_use]
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            ByteOrder::BigEndian
        } else {
            ByteOrder::LittleEndian
        }
    }

    fn read_u32(self, b: &[u8]) -> u32 {
        let raw = [b[0], b[1], b[2], b[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    fn read_u64(self, b: &[u8]) -> u64 {
        let raw = [b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]];
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

// ============================================================================
// TCP INFO RECORD
// ============================================================================

/// Decoded `struct tcp_info` snapshot.
///
/// One field per kernel field, in kernel declaration order, with the two
/// bit-packed bytes already split into their sub-values (`snd_wscale` /
/// `rcv_wscale` and `delivery_rate_app_limited` / `fastopen_client_fail`).
///
/// A zero value in any field means either "the kernel reported zero" or
/// "the kernel predates this field"; the record does not distinguish the
/// two. Callers that need to know which fields were actually present can
/// compare the input buffer length against the field offsets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TcpInfo {
    pub state: u8,
    pub ca_state: u8,
    pub retransmits: u8,
    pub probes: u8,
    pub backoff: u8,
    pub options: u8,
    /// Send window scale, upper nibble of the window-scale byte.
    pub snd_wscale: u8,
    /// Receive window scale, lower nibble of the window-scale byte.
    pub rcv_wscale: u8,
    /// Bit 7 of the rate-limit/fastopen byte.
    pub delivery_rate_app_limited: u8,
    /// Bits 5-6 of the rate-limit/fastopen byte.
    pub fastopen_client_fail: u8,
    pub rto: u32,
    pub ato: u32,
    pub snd_mss: u32,
    pub rcv_mss: u32,
    pub unacked: u32,
    pub sacked: u32,
    pub lost: u32,
    pub retrans: u32,
    pub fackets: u32,
    pub last_data_sent: u32,
    pub last_ack_sent: u32,
    pub last_data_recv: u32,
    pub last_ack_recv: u32,
    pub pmtu: u32,
    pub rcv_ssthresh: u32,
    /// Round-trip time in microseconds.
    pub rtt: u32,
    pub rttvar: u32,
    pub snd_ssthresh: u32,
    pub snd_cwnd: u32,
    pub advmss: u32,
    pub reordering: u32,
    pub rcv_rtt: u32,
    pub rcv_space: u32,
    pub total_retrans: u32,
    pub pacing_rate: u64,
    pub max_pacing_rate: u64,
    /// RFC 4898 tcpEStatsAppHCThruOctetsAcked.
    pub bytes_acked: u64,
    /// RFC 4898 tcpEStatsAppHCThruOctetsReceived.
    pub bytes_received: u64,
    pub segs_out: u32,
    pub segs_in: u32,
    pub notsent_bytes: u32,
    pub min_rtt: u32,
    pub data_segs_in: u32,
    pub data_segs_out: u32,
    pub delivery_rate: u64,
    /// Time (usec) busy sending data.
    pub busy_time: u64,
    /// Time (usec) limited by receive window.
    pub rwnd_limited: u64,
    /// Time (usec) limited by send buffer.
    pub sndbuf_limited: u64,
    pub delivered: u32,
    pub delivered_ce: u32,
    /// RFC 4898 tcpEStatsPerfHCDataOctetsOut.
    pub bytes_sent: u64,
    /// RFC 4898 tcpEStatsPerfOctetsRetrans.
    pub bytes_retrans: u64,
    pub dsack_dups: u32,
    pub reord_seen: u32,
    /// Out-of-order packets received.
    pub rcv_ooopack: u32,
    /// Peer's advertised receive window after scaling (bytes).
    pub snd_wnd: u32,
}

// ============================================================================
// BIT-PACKED BYTES
// ============================================================================

/// Split the window-scale byte into (send scale, receive scale).
///
/// Send scale is the upper 4 bits, receive scale the lower 4.
#[must_use]
pub const fn unpack_window_scales(byte: u8) -> (u8, u8) {
    (byte >> 4, byte & 0x0f)
}

/// Split the rate-limit/fastopen byte into
/// (delivery-rate-app-limited flag, fastopen-client-fail code).
///
/// The flag is bit 7; the fail code is bits 5-6.
#[must_use]
pub const fn unpack_rate_fastopen(byte: u8) -> (u8, u8) {
    (byte >> 7, (byte >> 5) & 0x3)
}

// ============================================================================
// FIELD LAYOUT TABLE
// ============================================================================

/// How one layout entry is decoded from the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    /// Plain 1-byte integer.
    U8,
    /// Plain 4-byte integer, decoded per the requested byte order.
    U32,
    /// Plain 8-byte integer, decoded per the requested byte order.
    U64,
    /// The bit-packed window-scale byte (two nibbles).
    WindowScales,
    /// The bit-packed rate-limit/fastopen byte (flag + 2-bit code).
    RateFastopen,
}

impl FieldKind {
    const fn width(self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::WindowScales | FieldKind::RateFastopen => 1,
            FieldKind::U32 => 4,
            FieldKind::U64 => 8,
        }
    }
}

/// One entry in the layout table: how to read the field and where to put it.
///
/// `store` receives the raw decoded value widened to `u64` (for the packed
/// kinds, the raw byte) and writes the record field(s).
struct FieldSpec {
    kind: FieldKind,
    store: fn(&mut TcpInfo, u64),
}

impl FieldSpec {
    const fn u8(store: fn(&mut TcpInfo, u64)) -> Self {
        Self {
            kind: FieldKind::U8,
            store,
        }
    }

    const fn u32(store: fn(&mut TcpInfo, u64)) -> Self {
        Self {
            kind: FieldKind::U32,
            store,
        }
    }

    const fn u64(store: fn(&mut TcpInfo, u64)) -> Self {
        Self {
            kind: FieldKind::U64,
            store,
        }
    }
}

/// Ordered field layout of the target `struct tcp_info`.
///
/// The entry order IS the wire layout: each field's offset is the sum of the
/// widths of every entry before it. Reordering any two entries shifts the
/// offset of everything after them, so this table must track the kernel's
/// declaration order exactly.
const LAYOUT: &[FieldSpec] = &[
    FieldSpec::u8(|r, v| r.state = v as u8),
    FieldSpec::u8(|r, v| r.ca_state = v as u8),
    FieldSpec::u8(|r, v| r.retransmits = v as u8),
    FieldSpec::u8(|r, v| r.probes = v as u8),
    FieldSpec::u8(|r, v| r.backoff = v as u8),
    FieldSpec::u8(|r, v| r.options = v as u8),
    FieldSpec {
        kind: FieldKind::WindowScales,
        store: |r, v| {
            let (snd, rcv) = unpack_window_scales(v as u8);
            r.snd_wscale = snd;
            r.rcv_wscale = rcv;
        },
    },
    FieldSpec {
        kind: FieldKind::RateFastopen,
        store: |r, v| {
            let (limited, fail) = unpack_rate_fastopen(v as u8);
            r.delivery_rate_app_limited = limited;
            r.fastopen_client_fail = fail;
        },
    },
    FieldSpec::u32(|r, v| r.rto = v as u32),
    FieldSpec::u32(|r, v| r.ato = v as u32),
    FieldSpec::u32(|r, v| r.snd_mss = v as u32),
    FieldSpec::u32(|r, v| r.rcv_mss = v as u32),
    FieldSpec::u32(|r, v| r.unacked = v as u32),
    FieldSpec::u32(|r, v| r.sacked = v as u32),
    FieldSpec::u32(|r, v| r.lost = v as u32),
    FieldSpec::u32(|r, v| r.retrans = v as u32),
    FieldSpec::u32(|r, v| r.fackets = v as u32),
    FieldSpec::u32(|r, v| r.last_data_sent = v as u32),
    FieldSpec::u32(|r, v| r.last_ack_sent = v as u32),
    FieldSpec::u32(|r, v| r.last_data_recv = v as u32),
    FieldSpec::u32(|r, v| r.last_ack_recv = v as u32),
    FieldSpec::u32(|r, v| r.pmtu = v as u32),
    FieldSpec::u32(|r, v| r.rcv_ssthresh = v as u32),
    FieldSpec::u32(|r, v| r.rtt = v as u32),
    FieldSpec::u32(|r, v| r.rttvar = v as u32),
    FieldSpec::u32(|r, v| r.snd_ssthresh = v as u32),
    FieldSpec::u32(|r, v| r.snd_cwnd = v as u32),
    FieldSpec::u32(|r, v| r.advmss = v as u32),
    FieldSpec::u32(|r, v| r.reordering = v as u32),
    FieldSpec::u32(|r, v| r.rcv_rtt = v as u32),
    FieldSpec::u32(|r, v| r.rcv_space = v as u32),
    FieldSpec::u32(|r, v| r.total_retrans = v as u32),
    FieldSpec::u64(|r, v| r.pacing_rate = v),
    FieldSpec::u64(|r, v| r.max_pacing_rate = v),
    FieldSpec::u64(|r, v| r.bytes_acked = v),
    FieldSpec::u64(|r, v| r.bytes_received = v),
    FieldSpec::u32(|r, v| r.segs_out = v as u32),
    FieldSpec::u32(|r, v| r.segs_in = v as u32),
    FieldSpec::u32(|r, v| r.notsent_bytes = v as u32),
    FieldSpec::u32(|r, v| r.min_rtt = v as u32),
    FieldSpec::u32(|r, v| r.data_segs_in = v as u32),
    FieldSpec::u32(|r, v| r.data_segs_out = v as u32),
    FieldSpec::u64(|r, v| r.delivery_rate = v),
    FieldSpec::u64(|r, v| r.busy_time = v),
    FieldSpec::u64(|r, v| r.rwnd_limited = v),
    FieldSpec::u64(|r, v| r.sndbuf_limited = v),
    FieldSpec::u32(|r, v| r.delivered = v as u32),
    FieldSpec::u32(|r, v| r.delivered_ce = v as u32),
    FieldSpec::u64(|r, v| r.bytes_sent = v),
    FieldSpec::u64(|r, v| r.bytes_retrans = v),
    FieldSpec::u32(|r, v| r.dsack_dups = v as u32),
    FieldSpec::u32(|r, v| r.reord_seen = v as u32),
    FieldSpec::u32(|r, v| r.rcv_ooopack = v as u32),
    FieldSpec::u32(|r, v| r.snd_wnd = v as u32),
];

/// Full encoded length of the record this decoder targets: the sum of all
/// layout widths (232 bytes for the kernels we track). Derived from the
/// table so it can never drift from the layout.
pub const TCP_INFO_LEN: usize = {
    let mut len = 0;
    let mut i = 0;
    while i < LAYOUT.len() {
        len += LAYOUT[i].kind.width();
        i += 1;
    }
    len
};

// ============================================================================
// DECODING
// ============================================================================

/// Read cursor over the input buffer.
///
/// `take` distinguishes the two ways a buffer can end:
/// - exactly at a field boundary (zero bytes remain) -> `Ok(None)`,
///   decoding stops successfully;
/// - inside a field (1..width bytes remain) -> `Err`, the input is
///   malformed.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, width: usize) -> Result<Option<&'a [u8]>, TruncatedFieldError> {
        let available = self.data.len() - self.pos;
        if available == 0 {
            return Ok(None);
        }
        if available < width {
            return Err(TruncatedFieldError {
                offset: self.pos,
                width,
                available,
            });
        }
        let bytes = &self.data[self.pos..self.pos + width];
        self.pos += width;
        Ok(Some(bytes))
    }
}

/// Decode a `tcp_info` record into `out`, in place.
///
/// Fields are written strictly in layout order. Decoding stops successfully
/// at the first field boundary the buffer cannot reach past: every field not
/// yet written keeps whatever value `out` already held (callers pass a
/// zeroed record, so "left at zero"). Bytes beyond the last known field are
/// ignored. The input is only read; decoding the same buffer into two fresh
/// records yields identical results.
///
/// # Errors
///
/// [`TruncatedFieldError`] if the buffer ends partway through a field.
/// `out` is left with every field before the damaged one already decoded.
pub fn parse_tcp_info_into(
    data: &[u8],
    order: ByteOrder,
    out: &mut TcpInfo,
) -> Result<(), TruncatedFieldError> {
    let mut cursor = Cursor::new(data);

    for field in LAYOUT {
        let Some(bytes) = cursor.take(field.kind.width())? else {
            break; // clean truncation: older kernel, fewer fields
        };

        // The packed kinds consume exactly one byte; both sub-values come
        // from that same byte, the cursor is never advanced twice for it.
        let value = match field.kind {
            FieldKind::U8 | FieldKind::WindowScales | FieldKind::RateFastopen => {
                u64::from(bytes[0])
            }
            FieldKind::U32 => u64::from(order.read_u32(bytes)),
            FieldKind::U64 => order.read_u64(bytes),
        };

        (field.store)(out, value);
    }

    Ok(())
}

/// Decode a `tcp_info` record from an `INET_DIAG_INFO` attribute payload.
///
/// Convenience wrapper over [`parse_tcp_info_into`] for the common case:
/// a record produced by the local kernel (native byte order) decoded into
/// a fresh zero record.
///
/// # Errors
///
/// [`TruncatedFieldError`] if the buffer ends partway through a field.
pub fn parse_tcp_info(data: &[u8]) -> Result<TcpInfo, TruncatedFieldError> {
    let mut info = TcpInfo::default();
    parse_tcp_info_into(data, ByteOrder::native(), &mut info)?;
    Ok(info)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference record with a distinct non-zero value in every field.
    fn sample() -> TcpInfo {
        TcpInfo {
            state: 1,
            ca_state: 2,
            retransmits: 3,
            probes: 4,
            backoff: 5,
            options: 6,
            snd_wscale: 10,
            rcv_wscale: 3,
            delivery_rate_app_limited: 1,
            fastopen_client_fail: 2,
            rto: 204_000,
            ato: 40_000,
            snd_mss: 1448,
            rcv_mss: 536,
            unacked: 7,
            sacked: 8,
            lost: 9,
            retrans: 10,
            fackets: 11,
            last_data_sent: 12,
            last_ack_sent: 13,
            last_data_recv: 14,
            last_ack_recv: 15,
            pmtu: 1500,
            rcv_ssthresh: 64_088,
            rtt: 45_000,
            rttvar: 5_000,
            snd_ssthresh: 100,
            snd_cwnd: 10,
            advmss: 1448,
            reordering: 3,
            rcv_rtt: 16,
            rcv_space: 14_600,
            total_retrans: 17,
            pacing_rate: 2_500_000,
            max_pacing_rate: u64::MAX,
            bytes_acked: 1_000_001,
            bytes_received: 2_000_002,
            segs_out: 800,
            segs_in: 700,
            notsent_bytes: 18,
            min_rtt: 40_000,
            data_segs_in: 600,
            data_segs_out: 500,
            delivery_rate: 1_250_000,
            busy_time: 500_000,
            rwnd_limited: 100_000,
            sndbuf_limited: 50_000,
            delivered: 801,
            delivered_ce: 19,
            bytes_sent: 1_100_000,
            bytes_retrans: 14_480,
            dsack_dups: 20,
            reord_seen: 21,
            rcv_ooopack: 22,
            snd_wnd: 65_535,
        }
    }

    /// Test-only encoder: serialize a record in layout order so the decoder
    /// can be checked against a known byte image.
    fn encode(info: &TcpInfo, order: ByteOrder) -> Vec<u8> {
        let mut buf = Vec::with_capacity(TCP_INFO_LEN);

        let push_u32 = |buf: &mut Vec<u8>, v: u32| match order {
            ByteOrder::LittleEndian => buf.extend_from_slice(&v.to_le_bytes()),
            ByteOrder::BigEndian => buf.extend_from_slice(&v.to_be_bytes()),
        };
        let push_u64 = |buf: &mut Vec<u8>, v: u64| match order {
            ByteOrder::LittleEndian => buf.extend_from_slice(&v.to_le_bytes()),
            ByteOrder::BigEndian => buf.extend_from_slice(&v.to_be_bytes()),
        };

        buf.extend_from_slice(&[
            info.state,
            info.ca_state,
            info.retransmits,
            info.probes,
            info.backoff,
            info.options,
            (info.snd_wscale << 4) | (info.rcv_wscale & 0x0f),
            (info.delivery_rate_app_limited << 7) | ((info.fastopen_client_fail & 0x3) << 5),
        ]);

        for v in [
            info.rto,
            info.ato,
            info.snd_mss,
            info.rcv_mss,
            info.unacked,
            info.sacked,
            info.lost,
            info.retrans,
            info.fackets,
            info.last_data_sent,
            info.last_ack_sent,
            info.last_data_recv,
            info.last_ack_recv,
            info.pmtu,
            info.rcv_ssthresh,
            info.rtt,
            info.rttvar,
            info.snd_ssthresh,
            info.snd_cwnd,
            info.advmss,
            info.reordering,
            info.rcv_rtt,
            info.rcv_space,
            info.total_retrans,
        ] {
            push_u32(&mut buf, v);
        }

        for v in [
            info.pacing_rate,
            info.max_pacing_rate,
            info.bytes_acked,
            info.bytes_received,
        ] {
            push_u64(&mut buf, v);
        }

        for v in [
            info.segs_out,
            info.segs_in,
            info.notsent_bytes,
            info.min_rtt,
            info.data_segs_in,
            info.data_segs_out,
        ] {
            push_u32(&mut buf, v);
        }

        for v in [
            info.delivery_rate,
            info.busy_time,
            info.rwnd_limited,
            info.sndbuf_limited,
        ] {
            push_u64(&mut buf, v);
        }

        push_u32(&mut buf, info.delivered);
        push_u32(&mut buf, info.delivered_ce);
        push_u64(&mut buf, info.bytes_sent);
        push_u64(&mut buf, info.bytes_retrans);

        for v in [
            info.dsack_dups,
            info.reord_seen,
            info.rcv_ooopack,
            info.snd_wnd,
        ] {
            push_u32(&mut buf, v);
        }

        assert_eq!(buf.len(), TCP_INFO_LEN);
        buf
    }

    /// Byte offset of the layout entry at `index`, computed cumulatively.
    fn offset_of(index: usize) -> usize {
        LAYOUT[..index].iter().map(|f| f.kind.width()).sum()
    }

    #[test]
    fn test_full_round_trip_native() {
        let reference = sample();
        let buf = encode(&reference, ByteOrder::native());
        let decoded = parse_tcp_info(&buf).expect("full buffer should decode");
        assert_eq!(decoded, reference);
    }

    #[test]
    fn test_full_round_trip_both_orders() {
        let reference = sample();
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let buf = encode(&reference, order);
            let mut decoded = TcpInfo::default();
            parse_tcp_info_into(&buf, order, &mut decoded).expect("should decode");
            assert_eq!(decoded, reference, "round trip failed for {:?}", order);
        }
    }

    #[test]
    fn test_truncation_at_every_field_boundary() {
        // Every prefix cut at a field boundary must decode successfully,
        // reproduce exactly the fields it contains, and leave the rest zero.
        // Re-encoding the decoded record makes that check byte-exact: the
        // first k bytes must match the prefix, the tail must be zeros.
        let reference = sample();
        let full = encode(&reference, ByteOrder::native());

        for i in 0..=LAYOUT.len() {
            let cut = offset_of(i);
            let mut decoded = TcpInfo::default();
            parse_tcp_info_into(&full[..cut], ByteOrder::native(), &mut decoded)
                .unwrap_or_else(|e| panic!("boundary cut at {} failed: {}", cut, e));

            let reencoded = encode(&decoded, ByteOrder::native());
            assert_eq!(
                &reencoded[..cut],
                &full[..cut],
                "fields before cut at {} not reproduced",
                cut
            );
            assert!(
                reencoded[cut..].iter().all(|&b| b == 0),
                "fields after cut at {} not zero",
                cut
            );
        }
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        let decoded = parse_tcp_info(&[]).expect("empty buffer is clean truncation");
        assert_eq!(decoded, TcpInfo::default());
    }

    #[test]
    fn test_single_byte_sets_state_only() {
        let decoded = parse_tcp_info(&[0x01]).expect("one full field should decode");
        let expected = TcpInfo {
            state: 1,
            ..TcpInfo::default()
        };
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_partial_field_is_an_error() {
        // Cut two bytes into the first u32 (rto at offset 8): not a field
        // boundary, must be reported rather than zero-filled.
        let full = encode(&sample(), ByteOrder::native());
        let err = parse_tcp_info(&full[..10]).expect_err("partial field must fail");
        assert_eq!(
            err,
            TruncatedFieldError {
                offset: 8,
                width: 4,
                available: 2,
            }
        );
    }

    #[test]
    fn test_partial_field_keeps_earlier_fields() {
        let full = encode(&sample(), ByteOrder::native());
        let mut decoded = TcpInfo::default();
        let result = parse_tcp_info_into(&full[..10], ByteOrder::native(), &mut decoded);
        assert!(result.is_err());
        // The eight leading bytes decoded before the damage was hit.
        assert_eq!(decoded.state, 1);
        assert_eq!(decoded.snd_wscale, 10);
        assert_eq!(decoded.rto, 0);
    }

    #[test]
    fn test_oversized_input_ignores_trailing_bytes() {
        let reference = sample();
        let mut buf = encode(&reference, ByteOrder::native());
        buf.extend_from_slice(&[0xAB; 24]); // fields from a kernel newer than us
        let decoded = parse_tcp_info(&buf).expect("trailing bytes are ignored");
        assert_eq!(decoded, reference);
    }

    #[test]
    fn test_window_scale_byte() {
        assert_eq!(unpack_window_scales(0xA3), (10, 3));
        assert_eq!(unpack_window_scales(0x00), (0, 0));
        assert_eq!(unpack_window_scales(0xFF), (15, 15));

        let decoded = parse_tcp_info(&[0, 0, 0, 0, 0, 0, 0xA3]).expect("should decode");
        assert_eq!(decoded.snd_wscale, 10);
        assert_eq!(decoded.rcv_wscale, 3);
    }

    #[test]
    fn test_rate_fastopen_byte() {
        // bit 7 set, bits 5-6 = 0b10 -> limited=1, fail=2
        let byte = (1u8 << 7) | (2u8 << 5);
        assert_eq!(byte, 0xC0);
        assert_eq!(unpack_rate_fastopen(byte), (1, 2));
        assert_eq!(unpack_rate_fastopen(0x00), (0, 0));
        // bits outside 5-7 must not leak into either sub-value
        assert_eq!(unpack_rate_fastopen(0x1F), (0, 0));

        let decoded = parse_tcp_info(&[0, 0, 0, 0, 0, 0, 0, byte]).expect("should decode");
        assert_eq!(decoded.delivery_rate_app_limited, 1);
        assert_eq!(decoded.fastopen_client_fail, 2);
    }

    #[test]
    fn test_decode_is_idempotent_and_pure() {
        let buf = encode(&sample(), ByteOrder::native());
        let before = buf.clone();

        let first = parse_tcp_info(&buf).expect("should decode");
        let second = parse_tcp_info(&buf).expect("should decode");
        assert_eq!(first, second);
        assert_eq!(buf, before, "decode must not mutate its input");
    }

    #[test]
    fn test_layout_offsets_are_cumulative() {
        // Landmark offsets of the kernel ABI. If any entry's width in the
        // layout table is wrong, everything after it shifts and this fails.
        assert_eq!(offset_of(8), 8, "rto follows the eight packed bytes");
        assert_eq!(offset_of(23), 68, "rtt");
        assert_eq!(offset_of(31), 100, "total_retrans");
        assert_eq!(offset_of(32), 104, "pacing_rate starts the u64 block");
        assert_eq!(offset_of(38), 144, "notsent_bytes");
        assert_eq!(offset_of(48), 200, "bytes_sent");
        assert_eq!(offset_of(LAYOUT.len()), TCP_INFO_LEN);
        assert_eq!(TCP_INFO_LEN, 232);
    }

    #[test]
    fn test_byte_orders_disagree_on_multibyte_fields() {
        // Sanity check that the ByteOrder parameter actually matters.
        let reference = sample();
        let buf = encode(&reference, ByteOrder::LittleEndian);
        let mut wrong = TcpInfo::default();
        parse_tcp_info_into(&buf, ByteOrder::BigEndian, &mut wrong).expect("should decode");
        assert_eq!(wrong.state, reference.state, "u8 fields are order-free");
        assert_ne!(wrong.rto, reference.rto);
        assert_eq!(wrong.rto, reference.rto.swap_bytes());
    }
}

//! Binary structures for the Netlink `SOCK_DIAG` protocol
//!
//! Every struct here is `#[repr(C)]` so its memory layout matches the kernel
//! headers byte for byte. Netlink headers and lengths are host byte order;
//! addresses and ports inside `InetDiagSockId` are network byte order
//! (big-endian), exactly as the kernel stores them.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

// NETLINK MESSAGE HEADER

/// Netlink message header (16 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct NlMsgHdr {
    pub nlmsg_len: u32,
    pub nlmsg_type: u16,
    pub nlmsg_flags: u16,
    pub nlmsg_seq: u32,
    pub nlmsg_pid: u32,
}

// SOCKET IDENTIFICATION

/// Socket identification structure (48 bytes).
///
/// Addresses occupy four 32-bit words: IPv4 uses only the first word,
/// IPv6 uses all four. Ports and address words are network byte order.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InetDiagSockId {
    pub idiag_sport: u16,
    pub idiag_dport: u16,
    pub idiag_src: [u32; 4],
    pub idiag_dst: [u32; 4],
    pub idiag_if: u32,
    pub idiag_cookie: [u32; 2],
}

// INET_DIAG REQUEST

/// `inet_diag_req_v2` request structure (56 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InetDiagReqV2 {
    pub sdiag_family: u8,
    pub sdiag_protocol: u8,
    pub idiag_ext: u8,
    pub pad: u8,
    pub idiag_states: u32,
    pub id: InetDiagSockId,
}

// INET_DIAG RESPONSE

/// `inet_diag_msg` response payload (72 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct InetDiagMsg {
    pub idiag_family: u8,
    pub idiag_state: u8,
    pub idiag_timer: u8,
    pub idiag_retrans: u8,
    pub id: InetDiagSockId,
    pub idiag_expires: u32,
    pub idiag_rqueue: u32,
    pub idiag_wqueue: u32,
    pub idiag_uid: u32,
    pub idiag_inode: u32,
}

// ROUTING ATTRIBUTE HEADER

/// Routing attribute header (4 bytes), the TLV header of each attribute.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RtAttr {
    pub rta_len: u16,
    pub rta_type: u16,
}

// CONSTANTS

// Netlink message types
pub const NLMSG_NOOP: u16 = 1;
pub const NLMSG_ERROR: u16 = 2;
pub const NLMSG_DONE: u16 = 3;
pub const NLMSG_OVERRUN: u16 = 4;
pub const SOCK_DIAG_BY_FAMILY: u16 = 20;

// Netlink flags
pub const NLM_F_REQUEST: u16 = 1;
pub const NLM_F_MULTI: u16 = 2;
pub const NLM_F_ACK: u16 = 4;

// Dump request flags
pub const NLM_F_ROOT: u16 = 0x100;
pub const NLM_F_MATCH: u16 = 0x200;
pub const NLM_F_DUMP: u16 = NLM_F_ROOT | NLM_F_MATCH;

// Address families
pub const AF_INET: u8 = 2;
pub const AF_INET6: u8 = 10;

// Protocol numbers
pub const IPPROTO_TCP: u8 = 6;

// TCP states, matching kernel tcp_states.h
pub const TCP_ESTABLISHED: u32 = 1;
pub const TCP_SYN_SENT: u32 = 2;
pub const TCP_SYN_RECV: u32 = 3;
pub const TCP_FIN_WAIT1: u32 = 4;
pub const TCP_FIN_WAIT2: u32 = 5;
pub const TCP_TIME_WAIT: u32 = 6;
pub const TCP_CLOSE: u32 = 7;
pub const TCP_CLOSE_WAIT: u32 = 8;
pub const TCP_LAST_ACK: u32 = 9;
pub const TCP_LISTEN: u32 = 10;
pub const TCP_CLOSING: u32 = 11;

/// State mask selecting every TCP state (bits 1..=11).
pub const TCP_ALL_STATES: u32 = (1 << (TCP_CLOSING + 1)) - 2;

// INET_DIAG attribute types
pub const INET_DIAG_NONE: u16 = 0;
pub const INET_DIAG_MEMINFO: u16 = 1;
pub const INET_DIAG_INFO: u16 = 2;
pub const INET_DIAG_VEGASINFO: u16 = 3;
pub const INET_DIAG_CONG: u16 = 4;

// HELPER FUNCTIONS

/// Align length to the netlink 4-byte boundary.
#[must_use]
pub const fn nlmsg_align(len: usize) -> usize {
    (len + 3) & !3
}

/// Total message length for a payload (header included).
#[must_use]
pub const fn nlmsg_length(payload_len: usize) -> u32 {
    (std::mem::size_of::<NlMsgHdr>() + payload_len) as u32
}

/// Aligned space one message occupies in a buffer.
#[must_use]
pub const fn nlmsg_space(payload_len: usize) -> usize {
    nlmsg_align(std::mem::size_of::<NlMsgHdr>() + payload_len)
}

/// Align attribute length to a 4-byte boundary.
#[must_use]
pub const fn rta_align(len: usize) -> usize {
    (len + 3) & !3
}

// ADDRESS WORD PACKING

/// Pack an IP address into the four 32-bit words of `idiag_src`/`idiag_dst`.
///
/// The kernel stores the address's raw network-order bytes; an IPv4 address
/// fills only the first word.
#[must_use]
pub fn addr_to_words(addr: &IpAddr) -> [u32; 4] {
    let mut words = [0u32; 4];
    match addr {
        IpAddr::V4(v4) => {
            words[0] = u32::from_ne_bytes(v4.octets());
        }
        IpAddr::V6(v6) => {
            let octets = v6.octets();
            for (word, chunk) in words.iter_mut().zip(octets.chunks_exact(4)) {
                *word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            }
        }
    }
    words
}

/// Reconstruct an IP address from the diag address words, driven by the
/// message's address family.
#[must_use]
pub fn words_to_addr(family: u8, words: &[u32; 4]) -> IpAddr {
    if family == AF_INET6 {
        let mut octets = [0u8; 16];
        for (i, word) in words.iter().enumerate() {
            octets[i * 4..i * 4 + 4].copy_from_slice(&word.to_ne_bytes());
        }
        IpAddr::V6(Ipv6Addr::from(octets))
    } else {
        IpAddr::V4(Ipv4Addr::from(words[0].to_ne_bytes()))
    }
}

/// Address family constant for a socket address.
#[must_use]
pub const fn family_of(addr: &SocketAddr) -> u8 {
    match addr {
        SocketAddr::V4(_) => AF_INET,
        SocketAddr::V6(_) => AF_INET6,
    }
}

// SOCKET ID BUILDERS

/// Build an `InetDiagSockId` matching one exact 4-tuple.
#[must_use]
pub fn build_exact_socket_id(local: SocketAddr, remote: SocketAddr) -> InetDiagSockId {
    InetDiagSockId {
        idiag_sport: local.port().to_be(),
        idiag_dport: remote.port().to_be(),
        idiag_src: addr_to_words(&local.ip()),
        idiag_dst: addr_to_words(&remote.ip()),
        idiag_if: 0,
        idiag_cookie: [0, 0],
    }
}

/// Build the wildcard `InetDiagSockId` used for full dumps.
#[must_use]
pub const fn build_dump_all_socket_id() -> InetDiagSockId {
    InetDiagSockId {
        idiag_sport: 0,
        idiag_dport: 0,
        idiag_src: [0, 0, 0, 0],
        idiag_dst: [0, 0, 0, 0],
        idiag_if: 0,
        idiag_cookie: [0, 0],
    }
}

// TESTS

//! High-level TCP socket diagnostics
//!
//! Ties the lower layers together: opens a [`NetlinkSocket`], sends an
//! `inet_diag_req_v2` request, walks the multi-part response, and returns
//! decoded sockets with their `tcp_info` records.
//!
//! Two entry points:
//! - [`list_tcp_sockets`] dumps every TCP socket in a family matching a
//!   state mask, the same data `ss -ti` shows.
//! - [`query_tcp_socket`] looks up one connection by its exact 4-tuple.

use crate::netlink::message::{
    build_inet_diag_request, parse_netlink_messages, MessageError, ParsedMessage,
};
use crate::netlink::socket::{NetlinkSocket, SocketError};
use crate::netlink::structures::*;
use crate::netlink::tcp_info::{parse_tcp_info, TcpInfo, TruncatedFieldError};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

// ============================================================================
// PUBLIC TYPES
// ============================================================================

/// The 4-tuple plus kernel bookkeeping that identifies one socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketId {
    pub source_port: u16,
    pub destination_port: u16,
    pub source: IpAddr,
    pub destination: IpAddr,
    /// Interface index the socket is bound to, 0 for any.
    pub interface: u32,
    /// Kernel socket cookie, stable for the socket's lifetime.
    pub cookie: [u32; 2],
}

/// One socket as reported by the kernel, minus the extension attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Socket {
    /// Address family, `AF_INET` or `AF_INET6`.
    pub family: u8,
    /// TCP state, 1 (`ESTABLISHED`) through 11 (`CLOSING`).
    pub state: u8,
    pub timer: u8,
    pub retrans: u8,
    pub id: SocketId,
    /// Milliseconds until the active timer expires, 0 if none.
    pub expires: u32,
    pub rqueue: u32,
    pub wqueue: u32,
    pub uid: u32,
    pub inode: u32,
}

/// A socket together with its decoded `tcp_info` record.
///
/// `tcp_info` is `None` when the kernel did not attach the extension, which
/// happens for sockets in some transient states.
#[derive(Debug, Clone, Serialize)]
pub struct TcpSocketInfo {
    pub socket: Socket,
    pub tcp_info: Option<TcpInfo>,
}

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Failure of a diagnostic query at any layer.
#[derive(Debug)]
pub enum DiagError {
    /// Netlink socket creation, send, or receive failed.
    Socket(SocketError),
    /// The kernel's response had malformed framing.
    Message(MessageError),
    /// A `tcp_info` attribute ended mid-field.
    Decode(TruncatedFieldError),
    /// The requested connection does not exist (ENOENT).
    NotFound,
    /// The kernel refused the query (EACCES / EPERM).
    PermissionDenied,
    /// Any other kernel errno.
    Kernel(i32),
}

impl std::fmt::Display for DiagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Socket(e) => write!(f, "netlink socket error: {}", e),
            Self::Message(e) => write!(f, "netlink message error: {}", e),
            Self::Decode(e) => write!(f, "tcp_info decode error: {}", e),
            Self::NotFound => write!(f, "no matching socket found"),
            Self::PermissionDenied => write!(f, "permission denied by kernel"),
            Self::Kernel(errno) => write!(f, "kernel returned errno {}", errno),
        }
    }
}

impl std::error::Error for DiagError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Socket(e) => Some(e),
            Self::Message(e) => Some(e),
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SocketError> for DiagError {
    fn from(e: SocketError) -> Self {
        Self::Socket(e)
    }
}

impl From<MessageError> for DiagError {
    fn from(e: MessageError) -> Self {
        Self::Message(e)
    }
}

impl From<TruncatedFieldError> for DiagError {
    fn from(e: TruncatedFieldError) -> Self {
        Self::Decode(e)
    }
}

impl DiagError {
    fn from_errno(errno: i32) -> Self {
        match errno {
            libc::ENOENT => Self::NotFound,
            libc::EACCES | libc::EPERM => Self::PermissionDenied,
            other => Self::Kernel(other),
        }
    }
}

// ============================================================================
// RESPONSE CONVERSION
// ============================================================================

/// Convert a raw `inet_diag_msg` into the public [`Socket`] type.
///
/// Ports arrive in network byte order; address words are unpacked according
/// to the message's family.
#[must_use]
pub fn socket_from_msg(msg: &InetDiagMsg) -> Socket {
    Socket {
        family: msg.idiag_family,
        state: msg.idiag_state,
        timer: msg.idiag_timer,
        retrans: msg.idiag_retrans,
        id: SocketId {
            source_port: u16::from_be(msg.id.idiag_sport),
            destination_port: u16::from_be(msg.id.idiag_dport),
            source: words_to_addr(msg.idiag_family, &msg.id.idiag_src),
            destination: words_to_addr(msg.idiag_family, &msg.id.idiag_dst),
            interface: msg.id.idiag_if,
            cookie: msg.id.idiag_cookie,
        },
        expires: msg.idiag_expires,
        rqueue: msg.idiag_rqueue,
        wqueue: msg.idiag_wqueue,
        uid: msg.idiag_uid,
        inode: msg.idiag_inode,
    }
}

fn sockets_from_messages(
    messages: Vec<ParsedMessage>,
) -> Result<Vec<TcpSocketInfo>, DiagError> {
    let mut sockets = Vec::new();

    for message in messages {
        match message {
            ParsedMessage::SockDiag { msg, attributes } => {
                let tcp_info = match attributes.get(&INET_DIAG_INFO) {
                    Some(raw) => Some(parse_tcp_info(raw)?),
                    None => None,
                };
                sockets.push(TcpSocketInfo {
                    socket: socket_from_msg(&msg),
                    tcp_info,
                });
            }
            ParsedMessage::Done => break,
            ParsedMessage::Error(0) => {} // ACK
            ParsedMessage::Error(errno) => return Err(DiagError::from_errno(errno)),
        }
    }

    Ok(sockets)
}

// ============================================================================
// QUERIES
// ============================================================================

fn run_query(req: &InetDiagReqV2) -> Result<Vec<TcpSocketInfo>, DiagError> {
    let socket = NetlinkSocket::new()?;

    let request = build_inet_diag_request(req, std::process::id());
    socket.send(&request)?;

    let response = socket.recv_all()?;
    let messages = parse_netlink_messages(&response)?;

    sockets_from_messages(messages)
}

/// Dump all TCP sockets of one address family matching a state mask.
///
/// `family` is `AF_INET` or `AF_INET6`; `states` is a bitmask over TCP
/// states, e.g. `1 << TCP_ESTABLISHED` or [`TCP_ALL_STATES`].
///
/// # Errors
///
/// [`DiagError`] on socket failure, malformed response framing, a partial
/// `tcp_info` field, or a kernel error reply.
pub fn list_tcp_sockets(family: u8, states: u32) -> Result<Vec<TcpSocketInfo>, DiagError> {
    let req = InetDiagReqV2 {
        sdiag_family: family,
        sdiag_protocol: IPPROTO_TCP,
        idiag_ext: 1 << (INET_DIAG_INFO - 1),
        pad: 0,
        idiag_states: states,
        id: build_dump_all_socket_id(),
    };

    run_query(&req)
}

/// Look up one TCP connection by its exact local/remote address pair.
///
/// # Errors
///
/// [`DiagError::NotFound`] when no socket matches the 4-tuple, otherwise as
/// [`list_tcp_sockets`].
pub fn query_tcp_socket(
    local: SocketAddr,
    remote: SocketAddr,
) -> Result<TcpSocketInfo, DiagError> {
    let req = InetDiagReqV2 {
        sdiag_family: family_of(&local),
        sdiag_protocol: IPPROTO_TCP,
        idiag_ext: 1 << (INET_DIAG_INFO - 1),
        pad: 0,
        idiag_states: TCP_ALL_STATES,
        id: build_exact_socket_id(local, remote),
    };

    // The kernel may answer a dump-flagged request with more sockets than
    // the one asked for, so the 4-tuple is re-checked here.
    run_query(&req)?
        .into_iter()
        .find(|entry| {
            let id = &entry.socket.id;
            id.source_port == local.port()
                && id.destination_port == remote.port()
                && id.source == local.ip()
                && id.destination == remote.ip()
        })
        .ok_or(DiagError::NotFound)
}

// ============================================================================
// TESTS
// ============================================================================

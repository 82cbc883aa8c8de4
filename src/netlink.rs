//! Netlink `SOCK_DIAG` client for TCP socket diagnostics
//!
//! Layered bottom up: `structures` holds the kernel ABI types, `tcp_info`
//! decodes the `struct tcp_info` record, `socket` owns the raw netlink
//! socket, `message` frames requests and responses, and `diag` exposes the
//! query API.
//!
//! The decoder (`structures`, `tcp_info`) is pure and builds everywhere;
//! the transport layers need a Linux kernel.

pub mod structures;
pub mod tcp_info;

#[cfg(target_os = "linux")]
pub mod message;
#[cfg(target_os = "linux")]
pub mod socket;

#[cfg(target_os = "linux")]
pub mod diag;

pub use self::tcp_info::{
    parse_tcp_info, parse_tcp_info_into, ByteOrder, TcpInfo, TruncatedFieldError, TCP_INFO_LEN,
};

#[cfg(target_os = "linux")]
pub use self::diag::{
    list_tcp_sockets, query_tcp_socket, DiagError, Socket, SocketId, TcpSocketInfo,
};

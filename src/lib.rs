//! tcpdiag: TCP socket diagnostics over Netlink `SOCK_DIAG`
//!
//! Queries live TCP connection statistics straight from the kernel, the
//! same channel `ss -ti` uses, without spawning a process or reading
//! `/proc`. Each socket comes back with its full `struct tcp_info` record
//! decoded into a typed [`netlink::TcpInfo`].
//!
//! ```no_run
//! use tcpdiag::netlink::{list_tcp_sockets, structures};
//!
//! let sockets = list_tcp_sockets(
//!     structures::AF_INET,
//!     1 << structures::TCP_ESTABLISHED,
//! )?;
//! for entry in &sockets {
//!     if let Some(info) = &entry.tcp_info {
//!         println!("{} rtt={}us", entry.socket.id.destination, info.rtt);
//!     }
//! }
//! # Ok::<(), tcpdiag::netlink::DiagError>(())
//! ```
//!
//! The `tcp_info` decoder itself is a pure function over a byte slice and
//! builds on every platform; only the netlink transport is Linux-specific.

pub mod netlink;

/// Human-readable name for a kernel TCP state number.
#[must_use]
pub fn tcp_state_name(state: u8) -> &'static str {
    match state {
        1 => "ESTABLISHED",
        2 => "SYN_SENT",
        3 => "SYN_RECV",
        4 => "FIN_WAIT1",
        5 => "FIN_WAIT2",
        6 => "TIME_WAIT",
        7 => "CLOSE",
        8 => "CLOSE_WAIT",
        9 => "LAST_ACK",
        10 => "LISTEN",
        11 => "CLOSING",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tcp_state_names() {
        assert_eq!(tcp_state_name(1), "ESTABLISHED");
        assert_eq!(tcp_state_name(10), "LISTEN");
        assert_eq!(tcp_state_name(11), "CLOSING");
        assert_eq!(tcp_state_name(0), "UNKNOWN");
        assert_eq!(tcp_state_name(12), "UNKNOWN");
    }
}

// ============================================================================
// tcpdiag - TCP Socket Diagnostics CLI
// ============================================================================
//
// Dumps live TCP socket statistics from the kernel over a netlink SOCK_DIAG
// socket and prints them as JSON. Each entry carries the socket's 4-tuple,
// state, queue depths, and the full decoded tcp_info record (rtt, cwnd,
// retransmits, delivery rate, and the rest).
//
// Usage:
//   tcpdiag                     established sockets, IPv4 + IPv6
//   tcpdiag --all               every state, including LISTEN and TIME_WAIT
//   tcpdiag -4 / -6             restrict to one address family
//   tcpdiag query LOCAL REMOTE  one connection by exact addresses,
//                               e.g. tcpdiag query 10.0.0.1:44312 1.2.3.4:443
//
// ============================================================================

use std::process::ExitCode;

#[cfg(target_os = "linux")]
fn run() -> ExitCode {
    use std::env;
    use std::net::SocketAddr;
    use tcpdiag::netlink::structures::{AF_INET, AF_INET6, TCP_ALL_STATES, TCP_ESTABLISHED};
    use tcpdiag::netlink::{list_tcp_sockets, query_tcp_socket, TcpSocketInfo};

    let args: Vec<String> = env::args().skip(1).collect();

    // ========================================================================
    // QUERY MODE: one connection by exact local/remote address
    // ========================================================================
    if args.first().map(String::as_str) == Some("query") {
        if args.len() != 3 {
            eprintln!("usage: tcpdiag query LOCAL_ADDR:PORT REMOTE_ADDR:PORT");
            return ExitCode::FAILURE;
        }

        let local: SocketAddr = match args[1].parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("invalid local address: {}", args[1]);
                return ExitCode::FAILURE;
            }
        };
        let remote: SocketAddr = match args[2].parse() {
            Ok(addr) => addr,
            Err(_) => {
                eprintln!("invalid remote address: {}", args[2]);
                return ExitCode::FAILURE;
            }
        };

        return match query_tcp_socket(local, remote) {
            Ok(entry) => print_json(&entry),
            Err(e) => {
                eprintln!("query failed: {e}");
                ExitCode::FAILURE
            }
        };
    }

    // ========================================================================
    // LIST MODE: dump sockets per family and state mask
    // ========================================================================
    let mut states = 1 << TCP_ESTABLISHED;
    let mut families = vec![AF_INET, AF_INET6];

    for arg in &args {
        match arg.as_str() {
            "--all" => states = TCP_ALL_STATES,
            "-4" => families = vec![AF_INET],
            "-6" => families = vec![AF_INET6],
            "--help" | "-h" => {
                println!("usage: tcpdiag [--all] [-4 | -6] | tcpdiag query LOCAL REMOTE");
                return ExitCode::SUCCESS;
            }
            other => {
                eprintln!("unknown argument: {other}");
                return ExitCode::FAILURE;
            }
        }
    }

    let mut sockets: Vec<TcpSocketInfo> = Vec::new();
    for family in families {
        match list_tcp_sockets(family, states) {
            Ok(mut entries) => sockets.append(&mut entries),
            Err(e) => {
                eprintln!("socket dump failed: {e}");
                return ExitCode::FAILURE;
            }
        }
    }

    print_json(&sockets)
}

#[cfg(target_os = "linux")]
fn print_json<T: serde::Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to serialize output: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn run() -> ExitCode {
    eprintln!("tcpdiag requires a Linux kernel (netlink SOCK_DIAG)");
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    run()
}

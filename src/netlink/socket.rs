//! Netlink socket transport
//!
//! RAII wrapper around an `AF_NETLINK`/`NETLINK_SOCK_DIAG` socket. The
//! descriptor is opened in `new()`, closed in `Drop`, and never exposed, so
//! there is no path that leaks it. All syscalls go through `libc`; each
//! unsafe block is limited to the call itself plus the struct it passes.
//!
//! Linux only: netlink does not exist on other platforms.

use std::io;
use std::os::unix::io::RawFd;

/// Receive buffer for kernel responses. A full-state dump with many sockets
/// arrives in chunks of at most this size.
const RECV_BUF_SIZE: usize = 32768;

/// Upper bound on a single assembled multi-part response.
const MAX_RESPONSE_BYTES: usize = 10_000_000;

/// Error from a netlink socket syscall, with the failing call named.
#[derive(Debug)]
pub struct SocketError {
    message: String,
    kind: io::ErrorKind,
}

impl SocketError {
    fn new(message: String, kind: io::ErrorKind) -> Self {
        Self { message, kind }
    }

    fn from_io_error(context: &str, err: io::Error) -> Self {
        Self {
            message: format!("{}: {}", context, err),
            kind: err.kind(),
        }
    }

    /// The underlying `io::ErrorKind`, for callers that branch on it.
    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.kind
    }
}

impl std::fmt::Display for SocketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SocketError {}

/// Diagnostic netlink socket with automatic close on drop.
///
/// # Example
///
/// ```no_run
/// use tcpdiag::netlink::socket::NetlinkSocket;
///
/// let socket = NetlinkSocket::new()?;
/// # let request = vec![0u8; 72];
/// socket.send(&request)?;
/// let response = socket.recv_all()?;
/// # Ok::<(), tcpdiag::netlink::socket::SocketError>(())
/// ```
pub struct NetlinkSocket {
    fd: RawFd,
}

impl NetlinkSocket {
    /// Open a `NETLINK_SOCK_DIAG` socket, bind it, and set receive options.
    ///
    /// The receive buffer is enlarged so large dumps are not dropped, and a
    /// one-second receive timeout bounds `recv()` when the kernel delivers
    /// `NLMSG_DONE` in a separate datagram.
    ///
    /// # Errors
    ///
    /// `SocketError` if `socket()`, `bind()`, or `setsockopt()` fails.
    /// Older kernels require `CAP_NET_ADMIN` for diag queries; this shows
    /// up as a permission error here or as an errno reply later.
    pub fn new() -> Result<Self, SocketError> {
        unsafe {
            let fd = libc::socket(libc::AF_NETLINK, libc::SOCK_RAW, libc::NETLINK_SOCK_DIAG);
            if fd < 0 {
                let err = io::Error::last_os_error();
                return Err(SocketError::from_io_error("socket() failed", err));
            }

            // nl_pid = 0 lets the kernel pick a unique port id.
            let mut addr: libc::sockaddr_nl = std::mem::zeroed();
            addr.nl_family = libc::AF_NETLINK as u16;
            addr.nl_pid = 0;
            addr.nl_groups = 0;

            let ret = libc::bind(
                fd,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_nl>() as u32,
            );
            if ret < 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(SocketError::from_io_error("bind() failed", err));
            }

            let rcvbuf: libc::c_int = RECV_BUF_SIZE as libc::c_int;
            let ret = libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVBUF,
                &rcvbuf as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::c_int>() as u32,
            );
            if ret < 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(SocketError::from_io_error(
                    "setsockopt(SO_RCVBUF) failed",
                    err,
                ));
            }

            let timeout = libc::timeval {
                tv_sec: 1,
                tv_usec: 0,
            };
            let ret = libc::setsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_RCVTIMEO,
                &timeout as *const _ as *const libc::c_void,
                std::mem::size_of::<libc::timeval>() as u32,
            );
            if ret < 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(SocketError::from_io_error(
                    "setsockopt(SO_RCVTIMEO) failed",
                    err,
                ));
            }

            Ok(Self { fd })
        }
    }

    /// Send one complete request message to the kernel (nl_pid 0).
    ///
    /// # Errors
    ///
    /// `SocketError` if `sendto()` fails or sends fewer bytes than given.
    pub fn send(&self, data: &[u8]) -> Result<(), SocketError> {
        unsafe {
            let mut addr: libc::sockaddr_nl = std::mem::zeroed();
            addr.nl_family = libc::AF_NETLINK as u16;
            addr.nl_pid = 0;
            addr.nl_groups = 0;

            let ret = libc::sendto(
                self.fd,
                data.as_ptr() as *const libc::c_void,
                data.len(),
                0,
                &addr as *const _ as *const libc::sockaddr,
                std::mem::size_of::<libc::sockaddr_nl>() as u32,
            );

            if ret < 0 {
                let err = io::Error::last_os_error();
                return Err(SocketError::from_io_error("sendto() failed", err));
            }

            if ret as usize != data.len() {
                return Err(SocketError::new(
                    format!("short send: sent {} of {} bytes", ret, data.len()),
                    io::ErrorKind::WriteZero,
                ));
            }

            Ok(())
        }
    }

    /// Receive one datagram into `buffer`, returning the byte count.
    ///
    /// # Errors
    ///
    /// `SocketError` if `recv()` fails; a timeout surfaces as
    /// `WouldBlock`/`TimedOut` and is expected at the end of a multi-part
    /// response.
    pub fn recv(&self, buffer: &mut [u8]) -> Result<usize, SocketError> {
        unsafe {
            let ret = libc::recv(
                self.fd,
                buffer.as_mut_ptr() as *mut libc::c_void,
                buffer.len(),
                0,
            );

            if ret < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut
                {
                    return Err(SocketError::new("recv() timeout".to_string(), err.kind()));
                }
                return Err(SocketError::from_io_error("recv() failed", err));
            }

            Ok(ret as usize)
        }
    }

    /// Receive a complete multi-part response.
    ///
    /// Reads datagrams until one contains `NLMSG_DONE` or the receive
    /// timeout fires after data has already arrived (the kernel sometimes
    /// ships the done marker in its own datagram). The concatenated bytes
    /// are returned for message parsing.
    ///
    /// # Errors
    ///
    /// `SocketError` on a receive failure, or if the assembled response
    /// exceeds [`MAX_RESPONSE_BYTES`].
    pub fn recv_all(&self) -> Result<Vec<u8>, SocketError> {
        let mut all_data = Vec::with_capacity(RECV_BUF_SIZE);
        let mut buffer = vec![0u8; RECV_BUF_SIZE];

        loop {
            match self.recv(&mut buffer) {
                Ok(received) => {
                    let chunk = &buffer[..received];
                    all_data.extend_from_slice(chunk);

                    if Self::contains_done_message(chunk) {
                        break;
                    }
                }
                Err(e) => {
                    let timed_out = e.kind == io::ErrorKind::WouldBlock
                        || e.kind == io::ErrorKind::TimedOut;
                    if timed_out && !all_data.is_empty() {
                        break;
                    }
                    return Err(e);
                }
            }

            if all_data.len() > MAX_RESPONSE_BYTES {
                return Err(SocketError::new(
                    format!("response larger than {} bytes", MAX_RESPONSE_BYTES),
                    io::ErrorKind::OutOfMemory,
                ));
            }
        }

        Ok(all_data)
    }

    /// Whether a received chunk carries an `NLMSG_DONE` message.
    ///
    /// The done marker may be packed at the end of a datagram after other
    /// messages, so every header in the chunk is inspected, not just the
    /// first. A header with a bogus length stops the walk; the message
    /// parser reports that case properly.
    fn contains_done_message(data: &[u8]) -> bool {
        use crate::netlink::structures::{nlmsg_align, NLMSG_DONE, NlMsgHdr};

        let header_size = std::mem::size_of::<NlMsgHdr>();
        let mut offset = 0;

        while offset + header_size <= data.len() {
            // SAFETY: length checked above; NlMsgHdr is a repr(C) POD type
            // and read_unaligned imposes no alignment requirement on the
            // source.
            let nlh =
                unsafe { std::ptr::read_unaligned(data[offset..].as_ptr() as *const NlMsgHdr) };

            if nlh.nlmsg_type == NLMSG_DONE {
                return true;
            }

            let msg_len = nlh.nlmsg_len as usize;
            if msg_len < header_size {
                break;
            }
            offset += nlmsg_align(msg_len);
        }

        false
    }
}

impl Drop for NetlinkSocket {
    fn drop(&mut self) {
        // Errors are unreportable from a destructor and double-close of a
        // descriptor we own cannot happen: fd is set once in new().
        unsafe {
            libc::close(self.fd);
        }
    }
}

//! Netlink message construction and parsing
//!
//! Builds `SOCK_DIAG_BY_FAMILY` request messages and parses the kernel's
//! multi-part responses. A message is a 16-byte [`NlMsgHdr`] followed by a
//! payload, padded to the 4-byte netlink alignment; responses may carry
//! several messages back to back, terminated by `NLMSG_DONE`.
//!
//! Attributes after the `inet_diag_msg` payload use TLV encoding: a 4-byte
//! [`RtAttr`] header (length + type), payload, padding. The attribute of
//! interest here is `INET_DIAG_INFO`, whose payload is the raw `tcp_info`
//! record handed to the decoder in [`crate::netlink::tcp_info`].
//!
//! Binary reads go through `ptr::read_unaligned` on `repr(C)` POD types;
//! every read is preceded by a length check.

use crate::netlink::structures::*;
use std::collections::HashMap;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Malformed netlink framing: bad lengths, truncated messages.
#[derive(Debug)]
pub struct MessageError {
    message: String,
}

impl MessageError {
    fn new(message: String) -> Self {
        Self { message }
    }
}

impl std::fmt::Display for MessageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for MessageError {}

// ============================================================================
// MESSAGE CONSTRUCTION
// ============================================================================

/// View a repr(C) POD struct as its raw bytes.
///
/// SAFETY requirement on T: `#[repr(C)]`, primitive fields only, no padding
/// holes that would leak uninitialized memory. Every struct passed here is
/// one of the kernel ABI types from `structures`, which satisfy that.
fn as_bytes<T>(value: &T) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts((value as *const T).cast::<u8>(), std::mem::size_of::<T>())
    }
}

/// Build a complete `SOCK_DIAG_BY_FAMILY` request message.
///
/// Layout: `NlMsgHdr` (16 bytes) + `InetDiagReqV2` (56 bytes) + padding to
/// the 4-byte boundary; 72 bytes total. `NLM_F_DUMP` is set so the kernel
/// answers with every matching socket in a multi-part response — for an
/// exact 4-tuple that is simply a dump with one element.
///
/// `seq` is echoed back by the kernel and lets a caller correlate
/// responses; any value works for one-shot queries.
#[must_use]
pub fn build_inet_diag_request(req: &InetDiagReqV2, seq: u32) -> Vec<u8> {
    let payload_size = std::mem::size_of::<InetDiagReqV2>();
    let mut buffer = Vec::with_capacity(nlmsg_space(payload_size));

    let nlh = NlMsgHdr {
        nlmsg_len: nlmsg_length(payload_size),
        nlmsg_type: SOCK_DIAG_BY_FAMILY,
        nlmsg_flags: NLM_F_REQUEST | NLM_F_DUMP,
        nlmsg_seq: seq,
        nlmsg_pid: 0, // kernel assigns
    };

    buffer.extend_from_slice(as_bytes(&nlh));
    buffer.extend_from_slice(as_bytes(req));

    // Pad to the netlink 4-byte boundary.
    buffer.resize(nlmsg_align(buffer.len()), 0);

    buffer
}

// ============================================================================
// MESSAGE PARSING
// ============================================================================

/// One message out of a multi-part response.
#[derive(Debug)]
pub enum ParsedMessage {
    /// An `inet_diag_msg` payload plus its trailing attributes, keyed by
    /// attribute type (`INET_DIAG_INFO` carries the raw `tcp_info` bytes).
    SockDiag {
        msg: InetDiagMsg,
        attributes: HashMap<u16, Vec<u8>>,
    },

    /// End of the multi-part response; nothing follows.
    Done,

    /// Kernel error reply. Carries errno as a positive number; zero is an
    /// ACK, not a failure.
    Error(i32),
}

/// Parse a concatenated multi-part response into individual messages.
///
/// Walks the buffer message by message, advancing by each message's aligned
/// length. Stops at `NLMSG_DONE` or at a non-ACK error reply.
///
/// # Errors
///
/// `MessageError` if a message declares a length smaller than its header or
/// larger than the remaining buffer.
pub fn parse_netlink_messages(data: &[u8]) -> Result<Vec<ParsedMessage>, MessageError> {
    let header_size = std::mem::size_of::<NlMsgHdr>();
    let mut messages = Vec::new();
    let mut offset = 0;

    while offset + header_size <= data.len() {
        // SAFETY: at least header_size bytes remain at offset.
        let nlh =
            unsafe { std::ptr::read_unaligned(data[offset..].as_ptr() as *const NlMsgHdr) };

        let msg_len = nlh.nlmsg_len as usize;

        // A length below the header size would loop forever; one past the
        // buffer would read out of bounds. Both mean corrupt framing.
        if msg_len < header_size {
            return Err(MessageError::new(format!(
                "invalid message length {} (minimum {})",
                msg_len, header_size
            )));
        }
        if offset + msg_len > data.len() {
            return Err(MessageError::new(format!(
                "message length {} exceeds buffer (offset {}, buffer {})",
                msg_len,
                offset,
                data.len()
            )));
        }

        match nlh.nlmsg_type {
            NLMSG_DONE => {
                messages.push(ParsedMessage::Done);
                break;
            }

            NLMSG_ERROR => {
                let errno = parse_error_message(&data[offset..offset + msg_len])?;
                messages.push(ParsedMessage::Error(errno));
                if errno != 0 {
                    break; // real error ends the response; 0 is an ACK
                }
            }

            SOCK_DIAG_BY_FAMILY => {
                let msg_start = offset + header_size;
                let msg_size = std::mem::size_of::<InetDiagMsg>();

                if msg_start + msg_size > offset + msg_len {
                    return Err(MessageError::new(
                        "message too small for inet_diag_msg".to_string(),
                    ));
                }

                // SAFETY: bounds checked against the buffer just above;
                // InetDiagMsg is a repr(C) POD type.
                let diag_msg = unsafe {
                    std::ptr::read_unaligned(data[msg_start..].as_ptr() as *const InetDiagMsg)
                };

                let attr_start = msg_start + msg_size;
                let attr_end = offset + msg_len;
                let attributes = if attr_end > attr_start {
                    parse_attributes(&data[attr_start..attr_end])?
                } else {
                    HashMap::new()
                };

                messages.push(ParsedMessage::SockDiag {
                    msg: diag_msg,
                    attributes,
                });
            }

            NLMSG_NOOP | NLMSG_OVERRUN => {}

            other => {
                eprintln!("ignoring unknown netlink message type {}", other);
            }
        }

        offset += nlmsg_align(msg_len);
    }

    Ok(messages)
}

/// Parse the TLV attribute region that follows an `inet_diag_msg`.
///
/// Returns attribute type -> payload bytes. An attribute length smaller
/// than its own header marks the end of the region.
///
/// # Errors
///
/// `MessageError` if an attribute length reaches past the buffer.
pub fn parse_attributes(data: &[u8]) -> Result<HashMap<u16, Vec<u8>>, MessageError> {
    let attr_header = std::mem::size_of::<RtAttr>();
    let mut attrs = HashMap::new();
    let mut offset = 0;

    while offset + attr_header <= data.len() {
        // SAFETY: at least attr_header bytes remain at offset.
        let rta = unsafe { std::ptr::read_unaligned(data[offset..].as_ptr() as *const RtAttr) };

        let attr_len = rta.rta_len as usize;
        if attr_len < attr_header {
            break; // end of attribute region
        }
        if offset + attr_len > data.len() {
            return Err(MessageError::new(format!(
                "attribute length {} exceeds buffer (offset {}, buffer {})",
                attr_len,
                offset,
                data.len()
            )));
        }

        let payload = data[offset + attr_header..offset + attr_len].to_vec();
        attrs.insert(rta.rta_type, payload);

        offset += rta_align(attr_len);
    }

    Ok(attrs)
}

/// Extract errno from an `NLMSG_ERROR` reply (header bytes included).
///
/// The kernel stores errno negated right after the header; the positive
/// value is returned (0 means ACK).
///
/// # Errors
///
/// `MessageError` if the message is too short to hold an errno.
pub fn parse_error_message(data: &[u8]) -> Result<i32, MessageError> {
    let header_size = std::mem::size_of::<NlMsgHdr>();

    if data.len() < header_size + 4 {
        return Err(MessageError::new("error message too small".to_string()));
    }

    let b = &data[header_size..header_size + 4];
    let errno = i32::from_ne_bytes([b[0], b[1], b[2], b[3]]);

    Ok(-errno)
}

// ============================================================================
// TESTS
// ============================================================================

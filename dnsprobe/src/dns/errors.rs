//! # DNS Error Taxonomy
//!
//! Every protocol-level failure the client can observe is one variant of [`DnsErrors`].
//! The set is closed: a response either decodes into a `Response` or maps to exactly one
//! of these kinds. Each variant keeps the raw bytes that caused it so callers can dump
//! the offending packet.
//!
//! | Variant             | Trigger                                                  |
//! |---------------------|----------------------------------------------------------|
//! | `Format`            | RCODE 1, or a query name that fails label validation     |
//! | `Server`            | RCODE 2                                                  |
//! | `InvalidName`       | RCODE 3 (NXDOMAIN)                                       |
//! | `ServerRefused`     | RCODE 5                                                  |
//! | `ResponseTruncated` | TC flag set                                              |
//! | `ResponsePacket`    | structural inconsistency, or a reserved RCODE (4, 6-15)  |
//! | `TimeoutExceeded`   | no reply after every allowed attempt                     |
use thiserror::Error;

/// Closed set of DNS failures, each carrying the raw payload for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsErrors {
    #[error("format error: {reason}")]
    Format { reason: String, payload: Vec<u8> },

    #[error("the name server was unable to process the query (RCODE 2)")]
    Server { payload: Vec<u8> },

    #[error("the domain name referenced in the query does not exist (RCODE 3)")]
    InvalidName { payload: Vec<u8> },

    #[error("the name server refused to answer the query (RCODE 5)")]
    ServerRefused { payload: Vec<u8> },

    #[error("the response was truncated (TC flag set)")]
    ResponseTruncated { payload: Vec<u8> },

    #[error("malformed response packet: {reason}")]
    ResponsePacket { reason: String, payload: Vec<u8> },

    #[error("no response after {attempts} attempt(s)")]
    TimeoutExceeded { attempts: u32, payload: Vec<u8> },
}

/// Payload-free discriminant of [`DnsErrors`], handy for matching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ErrorKind {
    Format,
    Server,
    InvalidName,
    ServerRefused,
    ResponseTruncated,
    ResponsePacket,
    TimeoutExceeded,
}

impl DnsErrors {
    /// Maps a response code to its taxonomy error.
    ///
    /// Returns `None` for RCODE 0. Reserved codes never count as success.
    pub fn from_rcode(rcode: u8, payload: &[u8]) -> Option<DnsErrors> {
        let payload = payload.to_vec();
        match rcode & 0b1111 {
            0 => None,
            1 => Some(DnsErrors::Format {
                reason: "the name server was unable to interpret the query (RCODE 1)".into(),
                payload,
            }),
            2 => Some(DnsErrors::Server { payload }),
            3 => Some(DnsErrors::InvalidName { payload }),
            5 => Some(DnsErrors::ServerRefused { payload }),
            other => Some(DnsErrors::ResponsePacket {
                reason: format!("reserved or unsupported RCODE {}", other),
                payload,
            }),
        }
    }

    pub(crate) fn packet(reason: impl Into<String>, payload: &[u8]) -> DnsErrors {
        DnsErrors::ResponsePacket {
            reason: reason.into(),
            payload: payload.to_vec(),
        }
    }

    pub(crate) fn format(reason: impl Into<String>, payload: &[u8]) -> DnsErrors {
        DnsErrors::Format {
            reason: reason.into(),
            payload: payload.to_vec(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DnsErrors::Format { .. } => ErrorKind::Format,
            DnsErrors::Server { .. } => ErrorKind::Server,
            DnsErrors::InvalidName { .. } => ErrorKind::InvalidName,
            DnsErrors::ServerRefused { .. } => ErrorKind::ServerRefused,
            DnsErrors::ResponseTruncated { .. } => ErrorKind::ResponseTruncated,
            DnsErrors::ResponsePacket { .. } => ErrorKind::ResponsePacket,
            DnsErrors::TimeoutExceeded { .. } => ErrorKind::TimeoutExceeded,
        }
    }

    /// The raw bytes attached to this error.
    ///
    /// Response bytes for decode errors, the rejected name for encode-time format errors,
    /// and the query that went unanswered for [`DnsErrors::TimeoutExceeded`].
    pub fn payload(&self) -> &[u8] {
        match self {
            DnsErrors::Format { payload, .. }
            | DnsErrors::Server { payload }
            | DnsErrors::InvalidName { payload }
            | DnsErrors::ServerRefused { payload }
            | DnsErrors::ResponseTruncated { payload }
            | DnsErrors::ResponsePacket { payload, .. }
            | DnsErrors::TimeoutExceeded { payload, .. } => payload,
        }
    }
}

//! # DNS Name Compressor
//!
//! Reads and writes domain names in RFC 1035 wire format.
//!
//! Names are written as plain length-prefixed labels (queries carry a single name, so
//! there is nothing to point back to). Names are read with full support for
//! compression pointers (RFC 1035 §4.1.4):
//!
//! ```text
//!   +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//!   | 1  1|                OFFSET                   |
//!   +--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+--+
//! ```
//!
//! `OFFSET` counts from the first octet of the message header. A name may be a pointer,
//! a run of labels ending in the zero octet, or a run of labels ending in a pointer.
//!
//! ## Bounds
//!
//! Responses are untrusted input, so [`MessageCompressor::read_name`] is iterative and
//! fails closed when:
//! - a pointer does not point strictly backwards from its own position,
//! - more than [`MAX_POINTER_HOPS`] pointers are followed,
//! - the resolved name exceeds 255 octets, which also caps a name at 127 labels,
//! - any read runs past the end of the buffer.
use crate::utils::sanitize::{MAX_LABEL_LEN, MAX_NAME_LEN};
use thiserror::Error;
use tracing::trace;

/// Upper bound on pointers followed while decoding one name.
pub const MAX_POINTER_HOPS: usize = 64;

const POINTER_TAG: u8 = 0b1100_0000;

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct MessageCompressor {}

/// Errors raised while writing or reading a wire-format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompressorErrors {
    #[error("label too long (>63): {0}")]
    LabelTooLong(String),
    #[error("name is too long (>255): {0}")]
    InvalidName(String),
    #[error("name runs past the end of the message at offset {0}")]
    UnexpectedEnd(usize),
    #[error("compression pointer at offset {at} does not point backwards (target {target})")]
    ForwardPointer { at: usize, target: usize },
    #[error("more than {0} compression pointers followed")]
    TooManyPointers(usize),
    #[error("decoded name exceeds 255 octets at offset {0}")]
    NameTooLong(usize),
    #[error("reserved label type {octet:#04x} at offset {at}")]
    ReservedLabelType { at: usize, octet: u8 },
    #[error("label at offset {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

impl MessageCompressor {
    /// Appends `labels` to `message` as length-prefixed labels plus the root terminator.
    pub fn write_labels(labels: &[&str], message: &mut Vec<u8>) -> Result<(), CompressorErrors> {
        let wire_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
        if wire_len > MAX_NAME_LEN {
            return Err(CompressorErrors::InvalidName(labels.join(".")));
        }

        for label in labels {
            if label.len() > MAX_LABEL_LEN {
                return Err(CompressorErrors::LabelTooLong(label.to_string()));
            }
            message.push(label.len() as u8);
            message.extend_from_slice(label.as_bytes());
        }

        message.push(0);
        Ok(())
    }

    /// Decodes the name starting at `offset` inside the full `message`.
    ///
    /// Returns the dotted name (empty for the root) and the offset right after the name
    /// in the caller's frame: past the terminator when no pointer was met, or past the
    /// first pointer otherwise.
    pub fn read_name(message: &[u8], offset: usize) -> Result<(String, usize), CompressorErrors> {
        let mut labels: Vec<String> = Vec::new();
        let mut position = offset;
        let mut resume: Option<usize> = None;
        let mut hops = 0;
        // the root terminator octet
        let mut wire_len = 1;

        loop {
            let octet = *message
                .get(position)
                .ok_or(CompressorErrors::UnexpectedEnd(position))?;

            match octet & POINTER_TAG {
                POINTER_TAG => {
                    let low = *message
                        .get(position + 1)
                        .ok_or(CompressorErrors::UnexpectedEnd(position + 1))?;
                    let target = u16::from_be_bytes([octet & !POINTER_TAG, low]) as usize;

                    if target >= position {
                        return Err(CompressorErrors::ForwardPointer {
                            at: position,
                            target,
                        });
                    }

                    hops += 1;
                    if hops > MAX_POINTER_HOPS {
                        return Err(CompressorErrors::TooManyPointers(MAX_POINTER_HOPS));
                    }

                    trace!(from = position, to = target, "following compression pointer");
                    resume.get_or_insert(position + 2);
                    position = target;
                }
                0 if octet == 0 => {
                    let end = resume.unwrap_or(position + 1);
                    return Ok((labels.join("."), end));
                }
                0 => {
                    let len = octet as usize;
                    let start = position + 1;
                    let bytes = message
                        .get(start..start + len)
                        .ok_or(CompressorErrors::UnexpectedEnd(message.len()))?;

                    wire_len += len + 1;
                    if wire_len > MAX_NAME_LEN {
                        return Err(CompressorErrors::NameTooLong(position));
                    }

                    let label =
                        std::str::from_utf8(bytes).map_err(|_| CompressorErrors::InvalidUtf8(position))?;
                    labels.push(label.to_owned());
                    position = start + len;
                }
                _ => {
                    return Err(CompressorErrors::ReservedLabelType {
                        at: position,
                        octet,
                    });
                }
            }
        }
    }
}

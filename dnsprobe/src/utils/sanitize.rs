//! # Domain Name Sanitization
//!
//! Query names are checked against a list of composable filters ([`Sanitize`]) before a
//! single byte is encoded. Filters run in order and short-circuit on the first failure,
//! returning a [`LabelErrors`] that describes what went wrong.
//!
//! ## Rules
//! - Every label is 1..=63 octets long ([`Sanitize::LabelLength`]).
//! - Every label matches `[A-Za-z0-9-]+` ([`Sanitize::Charset`]).
//! - No label starts or ends with `-` ([`Sanitize::NoEdgeHyphen`]).
//! - The encoded name fits in 255 octets ([`Sanitize::NameLength`]).
//! - Optionally, the first label must equal a fixed string ([`Sanitize::FirstLabel`]);
//!   older callers required `www` for `A` queries.
//!
//! A single trailing `.` (fully-qualified form) is dropped before the labels are split.
//!
//! ## Example
//! ```rust
//! use dnsprobe::utils::{Sanitize, LabelErrors};
//!
//! let labels = Sanitize::execute("www.example.com", &Sanitize::standard()).unwrap();
//! assert_eq!(labels, vec!["www", "example", "com"]);
//!
//! let err = Sanitize::execute("-bad.com", &Sanitize::standard()).unwrap_err();
//! assert!(matches!(err, LabelErrors::EdgeHyphen { .. }));
//! ```
use thiserror::Error;

/// Longest label allowed by RFC 1035 §2.3.4.
pub const MAX_LABEL_LEN: usize = 63;
/// Longest encoded name allowed by RFC 1035 §2.3.4.
pub const MAX_NAME_LEN: usize = 255;

/// A validation filter applied to a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sanitize {
    Charset,
    NoEdgeHyphen,
    LabelLength(usize),
    NameLength(usize),
    FirstLabel(String),
}

trait Validate {
    fn validate(&self, labels: &[&str]) -> Result<(), LabelErrors>;
}

/// Reasons a domain name is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelErrors {
    #[error("empty label in domain name {0:?}")]
    EmptyLabel(String),
    #[error("invalid character(s) {chars:?} in domain name {name}")]
    InvalidCharacters { chars: String, name: String },
    #[error("label {label:?} in domain name {name} starts or ends with '-'")]
    EdgeHyphen { label: String, name: String },
    #[error("label too long (>{max}): {label}")]
    LabelTooLong { label: String, max: usize },
    #[error("domain name too long (>{max}): {name}")]
    NameTooLong { name: String, max: usize },
    #[error("domain name {name} must start with label {expected:?}")]
    UnexpectedFirstLabel { name: String, expected: String },
}

/// Splits a name into labels, ignoring one trailing root dot.
pub fn split_labels(name: &str) -> Vec<&str> {
    name.strip_suffix('.').unwrap_or(name).split('.').collect()
}

impl Sanitize {
    /// The filters every query name goes through.
    pub fn standard() -> Vec<Sanitize> {
        vec![
            Sanitize::LabelLength(MAX_LABEL_LEN),
            Sanitize::Charset,
            Sanitize::NoEdgeHyphen,
            Sanitize::NameLength(MAX_NAME_LEN),
        ]
    }

    /// Runs `filters` in order against `name`.
    ///
    /// Returns the split labels when every filter passes, the first error otherwise.
    pub fn execute<'a>(name: &'a str, filters: &[Sanitize]) -> Result<Vec<&'a str>, LabelErrors> {
        let labels = split_labels(name);

        for filter in filters {
            filter.validate(&labels)?;
        }
        Ok(labels)
    }
}

impl Validate for Sanitize {
    fn validate(&self, labels: &[&str]) -> Result<(), LabelErrors> {
        match self {
            Sanitize::Charset => {
                for label in labels {
                    let bad: String = label
                        .chars()
                        .filter(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
                        .collect();
                    if !bad.is_empty() {
                        return Err(LabelErrors::InvalidCharacters {
                            chars: bad,
                            name: labels.join("."),
                        });
                    }
                }
                Ok(())
            }
            Sanitize::NoEdgeHyphen => {
                match labels
                    .iter()
                    .find(|l| l.starts_with('-') || l.ends_with('-'))
                {
                    Some(label) => Err(LabelErrors::EdgeHyphen {
                        label: label.to_string(),
                        name: labels.join("."),
                    }),
                    None => Ok(()),
                }
            }
            Sanitize::LabelLength(max) => {
                for label in labels {
                    if label.is_empty() {
                        return Err(LabelErrors::EmptyLabel(labels.join(".")));
                    }
                    if label.len() > *max {
                        return Err(LabelErrors::LabelTooLong {
                            label: label.to_string(),
                            max: *max,
                        });
                    }
                }
                Ok(())
            }
            Sanitize::NameLength(max) => {
                // length octet per label plus the root terminator
                let wire_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
                if wire_len > *max {
                    Err(LabelErrors::NameTooLong {
                        name: labels.join("."),
                        max: *max,
                    })
                } else {
                    Ok(())
                }
            }
            Sanitize::FirstLabel(expected) => match labels.first() {
                Some(first) if first == expected => Ok(()),
                _ => Err(LabelErrors::UnexpectedFirstLabel {
                    name: labels.join("."),
                    expected: expected.clone(),
                }),
            },
        }
    }
}

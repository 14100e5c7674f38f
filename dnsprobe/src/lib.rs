#![cfg_attr(docsrs, feature(doc_cfg))]
//! # dnsprobe
//!
//! A minimal DNS client: build a query, send it over UDP, decode the reply and retry on
//! timeout.
//!
//! ## Features
//!
//! - **Label Sanitization** - composable filters that reject malformed names before any
//!   byte is encoded (`utils`).
//! - **DNS message codec** - query encoding and response decoding, including compressed
//!   names, with a closed error taxonomy (`dns`).
//! - **Blocking resolver** (`std`, default) - one socket per query, bounded wait per
//!   attempt and a fixed attempt budget.
//! - **Serialization** (`serde`) - `Serialize` for responses, records and configuration.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! dnsprobe = { version = "0.1", features = ["std"] }
//! dnsprobe = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,no_run
//! # #[cfg(feature = "std")]
//! # {
//! use dnsprobe::dns::resolver::{Query, Question, RecordType, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::from_env().unwrap()).unwrap();
//! let query = Query::builder(dnsprobe::dns::resolver::generate_id())
//!     .question("example.com", RecordType::A)
//!     .build()
//!     .unwrap();
//!
//! let outcome = resolver.query(&query, "8.8.8.8".parse().unwrap()).unwrap();
//! println!("{} timeouts before the answer", outcome.attempts);
//! # }
//! ```
//!
//! ### Name validation
//!
//! ```rust
//! use dnsprobe::utils::Sanitize;
//!
//! assert!(Sanitize::execute("mail.example.com", &Sanitize::standard()).is_ok());
//! assert!(Sanitize::execute("bad-.com", &Sanitize::standard()).is_err());
//! ```
//!
//! ## Logging
//!
//! The crate emits `tracing` events (sends, receives, timeouts, pointer hops) and never
//! installs a subscriber itself.

pub mod dns;
pub mod utils;

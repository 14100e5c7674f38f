//! # dnsprobe DNS
//!
//! RFC 1035 client building blocks, leaf first:
//!
//! - `compressor`: reads and writes wire-format names, following compression pointers
//!   with hard bounds.
//! - `errors`: the closed set of protocol failures, each carrying the bytes involved.
//! - `resolver`: query encoding, response decoding and (with `std`) the blocking UDP
//!   resolver with its retry loop.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "std")]
//! # {
//! use dnsprobe::dns::resolver::{RecordType, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::default()).unwrap();
//! let outcome = resolver
//!     .lookup("example.com", RecordType::Mx, "1.1.1.1".parse().unwrap())
//!     .unwrap();
//! println!("{:#?}", outcome.response.answers());
//! # }
//! ```

pub mod compressor;
pub mod errors;
pub mod resolver;

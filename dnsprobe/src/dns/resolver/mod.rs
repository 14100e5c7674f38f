//! # dnsprobe Resolver
//!
//! A small, blocking DNS client over UDP following [RFC 1035](https://datatracker.ietf.org/doc/html/rfc1035).
//!
//! ## Features
//!
//! | Feature | Description                                                              |
//! |---------|--------------------------------------------------------------------------|
//! | `std`   | Enables [`Resolver`], its configuration and the UDP transporter.         |
//! | `serde` | Derives `Serialize` for responses, records and configuration.            |
//!
//! Without `std` only the message codec ([`Query`], [`Response`]) is compiled, so the
//! encoding and decoding can be driven by any I/O layer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "std")]
//! # {
//! use dnsprobe::dns::resolver::{RecordType, Resolver, ResolverConfig};
//!
//! let resolver = Resolver::new(ResolverConfig::default()).unwrap();
//! match resolver.lookup("example.com", RecordType::A, "8.8.8.8".parse().unwrap()) {
//!     Ok(outcome) => {
//!         for answer in outcome.response.answers() {
//!             println!("{} {} {}", answer.name, answer.ttl, answer.data);
//!         }
//!     }
//!     Err(e) => eprintln!("DNS resolution failed: {e}"),
//! }
//! # }
//! ```
//!
//! ## Retries
//!
//! Each attempt sends the exact same bytes and waits up to `timeout` for a reply. Only
//! a timed-out attempt is retried, up to `max_retries` attempts in total. A reply that
//! decodes into a [`DnsErrors`](crate::dns::errors::DnsErrors) ends the query immediately, as does any socket error.
//!
//! ## Error Handling
//!
//! - [`ResolverErrors`]: top-level errors from the public API.
//! - [`DnsErrors`](crate::dns::errors::DnsErrors): protocol failures, each carrying the raw bytes involved.
//! - [`TransportErrors`](transporter::TransportErrors): socket failures.
//! - [`ConfigErrors`]: rejected configuration.

mod standard;

pub use self::standard::{
    CLASS_IN, DnsHeaderFlags, HEADER_LEN, HeaderSection, MAX_UDP_PAYLOAD, OpCodeOptions, Query,
    QueryBuilder, Question, QuestionMode, RecordData, RecordType, ResourceRecord, Response,
    UnsupportedRecordType, generate_id,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "std")] {
        mod config;
        pub mod transporter;

        pub use self::config::{ConfigErrors, MAX_ATTEMPTS, MAX_TIMEOUT, ResolverConfig};

        use crate::dns::errors::DnsErrors;
        use std::net::{IpAddr, SocketAddr};
        use std::time::{Duration, Instant};
        use thiserror::Error;
        use tracing::{debug, warn};
        use transporter::{Transport, TransportErrors, UdpTransport};

        /// A successful exchange.
        #[derive(Debug, Clone, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        pub struct QueryOutcome {
            pub response: Response,
            /// Attempts that timed out before the one that got the reply.
            pub attempts: u32,
            /// Time from the first send until the reply was decoded.
            pub elapsed: Duration,
        }

        /// Blocking resolver. Holds no socket between calls.
        #[derive(Debug, Clone)]
        pub struct Resolver {
            config: ResolverConfig,
        }

        impl Resolver {
            /// # Errors
            /// [`ResolverErrors::Config`] if `config` fails [`ResolverConfig::validate`].
            pub fn new(config: ResolverConfig) -> Result<Self, ResolverErrors> {
                config.validate()?;
                Ok(Self { config })
            }

            pub fn config(&self) -> &ResolverConfig {
                &self.config
            }

            /// Sends `query` to `server` on the configured port and waits for the answer.
            ///
            /// A fresh UDP socket is bound for this call and closed before it returns.
            pub fn query(&self, query: &Query, server: IpAddr) -> Result<QueryOutcome, ResolverErrors> {
                let server = SocketAddr::new(server, self.config.port);
                let mut transport = UdpTransport::bind(self.config.bind_addr_for(&server))?;
                self.exchange(&mut transport, query, server)
            }

            /// Single-question query with a random id.
            pub fn lookup(
                &self,
                name: &str,
                record_type: RecordType,
                server: IpAddr,
            ) -> Result<QueryOutcome, ResolverErrors> {
                let query = Query::new(generate_id(), vec![Question::new(name, record_type)])?;
                self.query(&query, server)
            }

            /// Runs the send/receive/retry loop for `query` over `transport`.
            pub fn exchange<T: Transport>(
                &self,
                transport: &mut T,
                query: &Query,
                server: SocketAddr,
            ) -> Result<QueryOutcome, ResolverErrors> {
                let started = Instant::now();
                let payload = query.payload();
                let mut buf = [0u8; MAX_UDP_PAYLOAD];
                let mut timeouts = 0u32;

                while timeouts < self.config.max_retries {
                    transport.send_to(payload, server)?;

                    match transport.receive(&mut buf, self.config.timeout) {
                        Ok(len) => {
                            let response =
                                Response::decode_with(&buf[..len], query, self.config.question_mode)?;
                            let elapsed = started.elapsed();
                            debug!(id = query.id(), attempts = timeouts, ?elapsed, "query answered");
                            return Ok(QueryOutcome {
                                response,
                                attempts: timeouts,
                                elapsed,
                            });
                        }
                        Err(TransportErrors::Timeout) => {
                            timeouts += 1;
                            warn!(
                                id = query.id(),
                                %server,
                                attempt = timeouts,
                                max = self.config.max_retries,
                                "query timed out"
                            );
                        }
                        Err(e) => return Err(e.into()),
                    }
                }

                Err(DnsErrors::TimeoutExceeded {
                    attempts: timeouts,
                    payload: payload.to_vec(),
                }
                .into())
            }
        }

        /// Top-level errors returned by [`Resolver`].
        #[derive(Debug, Error)]
        pub enum ResolverErrors {
            #[error(transparent)]
            Dns(#[from] DnsErrors),
            #[error("transport failure: {0}")]
            Transport(#[from] TransportErrors),
            #[error("invalid configuration: {0}")]
            Config(#[from] ConfigErrors),
        }

        impl ResolverErrors {
            /// The protocol error, if this is one.
            pub fn as_dns(&self) -> Option<&DnsErrors> {
                match self {
                    ResolverErrors::Dns(e) => Some(e),
                    _ => None,
                }
            }
        }
    }
}

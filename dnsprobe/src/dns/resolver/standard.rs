//! # DNS Message Codec
//!
//! Wire-level building blocks for the resolver: the 12-byte header and its flags, the
//! question and resource-record types, query encoding and response decoding.
//!
//! - [`Query`] is validated and encoded once, when it is built. The encoded bytes are
//!   kept and re-sent verbatim on every retry.
//! - [`Response::decode`] turns a received datagram into an immutable [`Response`], or
//!   into exactly one [`DnsErrors`] kind. No partially decoded response is ever returned.
//!
//! ```rust
//! use dnsprobe::dns::resolver::{Query, Question, RecordType};
//!
//! let query = Query::new(1, vec![Question::new("example.com", RecordType::A)]).unwrap();
//! assert_eq!(query.payload().len(), 12 + 13 + 4);
//! ```
use crate::dns::compressor::MessageCompressor;
use crate::dns::errors::DnsErrors;
use crate::utils::sanitize::{Sanitize, split_labels};
use std::fmt::Display;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

/// Size of the fixed DNS header.
pub const HEADER_LEN: usize = 12;
/// Largest DNS message carried over plain UDP (no EDNS).
pub const MAX_UDP_PAYLOAD: usize = 512;
/// The Internet class, the only class this client understands.
pub const CLASS_IN: u16 = 1;

/// Generates a random 16-bit ID for a DNS query.
pub fn generate_id() -> u16 {
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    let mut thread_rng = rand::rng();
    let mut rng = SmallRng::from_rng(&mut thread_rng);
    rng.random::<u16>()
}

/// The header section of a DNS message (RFC 1035 §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderSection {
    /// Identifier to match requests and responses.
    pub id: u16,
    /// Flags and control bits, see [`DnsHeaderFlags`].
    pub flags: u16,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl HeaderSection {
    /// Converts the header into its 12 network-order bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        let words = [
            self.id,
            self.flags,
            self.qd_count,
            self.an_count,
            self.ns_count,
            self.ar_count,
        ];
        for (chunk, word) in bytes.chunks_exact_mut(2).zip(words) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }

    /// Reads a header from the first 12 bytes of `bytes`, if there are that many.
    pub fn from_bytes(bytes: &[u8]) -> Option<HeaderSection> {
        let header = bytes.get(..HEADER_LEN)?;
        let word = |i: usize| u16::from_be_bytes([header[i], header[i + 1]]);

        Some(HeaderSection {
            id: word(0),
            flags: word(2),
            qd_count: word(4),
            an_count: word(6),
            ns_count: word(8),
            ar_count: word(10),
        })
    }
}

/// The 16-bit DNS flags field (RFC 1035 §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DnsHeaderFlags {
    /// Query (false) or response (true)
    pub qr: bool,
    /// Operation code, see [`OpCodeOptions`]
    pub opcode: u8,
    /// Authoritative Answer
    pub aa: bool,
    /// Truncation
    pub tc: bool,
    /// Recursion Desired
    pub rd: bool,
    /// Recursion Available
    pub ra: bool,
    /// Reserved, zero in queries
    pub z: u8,
    /// Response code
    pub rcode: u8,
}

impl DnsHeaderFlags {
    pub fn to_u16(self) -> u16 {
        ((self.qr as u16) << 15)
            | ((self.opcode as u16 & 0b1111) << 11)
            | ((self.aa as u16) << 10)
            | ((self.tc as u16) << 9)
            | ((self.rd as u16) << 8)
            | ((self.ra as u16) << 7)
            | ((self.z as u16 & 0b111) << 4)
            | (self.rcode as u16 & 0b1111)
    }

    pub fn from_u16(value: u16) -> Self {
        let bit = |shift: u16| (value >> shift) & 1 != 0;
        Self {
            qr: bit(15),
            opcode: ((value >> 11) & 0b1111) as u8,
            aa: bit(10),
            tc: bit(9),
            rd: bit(8),
            ra: bit(7),
            z: ((value >> 4) & 0b111) as u8,
            rcode: (value & 0b1111) as u8,
        }
    }
}

/// Operation codes (RFC 1035 §4.1.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpCodeOptions {
    #[default]
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    /// Any other 4-bit value, sent as is. Bits above the low four are dropped.
    Other(u8),
}

impl OpCodeOptions {
    pub fn to_u8(self) -> u8 {
        match self {
            OpCodeOptions::StandardQuery => 0,
            OpCodeOptions::InverseQuery => 1,
            OpCodeOptions::ServerStatusRequest => 2,
            OpCodeOptions::Other(value) => value & 0b1111,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value & 0b1111 {
            0 => OpCodeOptions::StandardQuery,
            1 => OpCodeOptions::InverseQuery,
            2 => OpCodeOptions::ServerStatusRequest,
            other => OpCodeOptions::Other(other),
        }
    }
}

/// Record types the client can ask for and decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecordType {
    /// A host address
    A = 1,
    /// An authoritative name server
    Ns = 2,
    /// The canonical name for an alias
    Cname = 5,
    /// Mail exchange
    Mx = 15,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported record type {0}")]
pub struct UnsupportedRecordType(pub String);

impl RecordType {
    /// Encode the record type as a 2-byte big-endian value.
    pub fn to_bytes(self) -> [u8; 2] {
        (self as u16).to_be_bytes()
    }
}

impl TryFrom<u16> for RecordType {
    type Error = UnsupportedRecordType;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RecordType::A),
            2 => Ok(RecordType::Ns),
            5 => Ok(RecordType::Cname),
            15 => Ok(RecordType::Mx),
            other => Err(UnsupportedRecordType(other.to_string())),
        }
    }
}

impl FromStr for RecordType {
    type Err = UnsupportedRecordType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "NS" => Ok(RecordType::Ns),
            "CNAME" => Ok(RecordType::Cname),
            "MX" => Ok(RecordType::Mx),
            _ => Err(UnsupportedRecordType(s.to_string())),
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordType::A => "A",
            RecordType::Ns => "NS",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
        };
        write!(f, "{}", name)
    }
}

/// One entry of the question section.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Question {
    /// The domain name being queried.
    pub name: String,
    pub record_type: RecordType,
}

impl Question {
    pub fn new(name: impl Into<String>, record_type: RecordType) -> Self {
        Question {
            name: name.into(),
            record_type,
        }
    }

    /// Decodes the question starting at `offset` of `message`.
    ///
    /// Returns the question and the offset of the first byte after it.
    pub fn decode(message: &[u8], offset: usize) -> Result<(Question, usize), DnsErrors> {
        let mut reader = RecordReader {
            message,
            position: offset,
        };
        let question = reader.question()?;
        Ok((question, reader.position))
    }
}

/// A validated, encoded DNS query.
///
/// The wire payload is produced once by [`QueryBuilder::build`] and never changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    id: u16,
    opcode: OpCodeOptions,
    authoritative: bool,
    recursion_desired: bool,
    questions: Vec<Question>,
    payload: Vec<u8>,
}

/// Builder for [`Query`]. Recursion is desired by default.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    id: u16,
    opcode: OpCodeOptions,
    authoritative: bool,
    recursion_desired: bool,
    questions: Vec<Question>,
    legacy_www_rule: bool,
}

impl Query {
    /// Builds a standard recursive query for `questions`.
    ///
    /// # Errors
    /// [`DnsErrors::Format`] if any name fails validation.
    pub fn new(id: u16, questions: Vec<Question>) -> Result<Query, DnsErrors> {
        Query::builder(id).questions(questions).build()
    }

    pub fn builder(id: u16) -> QueryBuilder {
        QueryBuilder {
            id,
            opcode: OpCodeOptions::StandardQuery,
            authoritative: false,
            recursion_desired: true,
            questions: Vec::new(),
            legacy_www_rule: false,
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn opcode(&self) -> OpCodeOptions {
        self.opcode
    }

    pub fn authoritative(&self) -> bool {
        self.authoritative
    }

    pub fn recursion_desired(&self) -> bool {
        self.recursion_desired
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The encoded wire bytes of this query.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl QueryBuilder {
    pub fn question(mut self, name: impl Into<String>, record_type: RecordType) -> Self {
        self.questions.push(Question::new(name, record_type));
        self
    }

    pub fn questions(mut self, questions: impl IntoIterator<Item = Question>) -> Self {
        self.questions.extend(questions);
        self
    }

    pub fn opcode(mut self, opcode: OpCodeOptions) -> Self {
        self.opcode = opcode;
        self
    }

    pub fn authoritative(mut self, authoritative: bool) -> Self {
        self.authoritative = authoritative;
        self
    }

    pub fn recursion_desired(mut self, recursion_desired: bool) -> Self {
        self.recursion_desired = recursion_desired;
        self
    }

    /// Requires `A` questions to start with the label `www`, as early versions of the
    /// client did. Off by default.
    pub fn legacy_www_rule(mut self, enabled: bool) -> Self {
        self.legacy_www_rule = enabled;
        self
    }

    /// Validates every name and encodes the query.
    pub fn build(self) -> Result<Query, DnsErrors> {
        for question in &self.questions {
            let mut filters = Sanitize::standard();
            if self.legacy_www_rule && question.record_type == RecordType::A {
                filters.push(Sanitize::FirstLabel("www".to_string()));
            }
            Sanitize::execute(&question.name, &filters)
                .map_err(|e| DnsErrors::format(e.to_string(), question.name.as_bytes()))?;
        }

        let payload = self.encode()?;
        debug!(id = self.id, len = payload.len(), "encoded query");

        Ok(Query {
            id: self.id,
            opcode: self.opcode,
            authoritative: self.authoritative,
            recursion_desired: self.recursion_desired,
            questions: self.questions,
            payload,
        })
    }

    fn encode(&self) -> Result<Vec<u8>, DnsErrors> {
        let qd_count = u16::try_from(self.questions.len())
            .map_err(|_| DnsErrors::format("too many questions", &[]))?;

        let header = HeaderSection {
            id: self.id,
            flags: DnsHeaderFlags {
                qr: false,
                opcode: self.opcode.to_u8(),
                aa: self.authoritative,
                rd: self.recursion_desired,
                ..DnsHeaderFlags::default()
            }
            .to_u16(),
            qd_count,
            an_count: 0,
            ns_count: 0,
            ar_count: 0,
        };

        let mut message = Vec::with_capacity(HEADER_LEN + 32 * self.questions.len());
        message.extend_from_slice(&header.to_bytes());

        for question in &self.questions {
            MessageCompressor::write_labels(&split_labels(&question.name), &mut message)
                .map_err(|e| DnsErrors::format(e.to_string(), question.name.as_bytes()))?;
            message.extend_from_slice(&question.record_type.to_bytes());
            message.extend_from_slice(&CLASS_IN.to_be_bytes());
        }

        if message.len() > MAX_UDP_PAYLOAD {
            return Err(DnsErrors::format(
                format!("query is {} bytes, over the {} byte UDP limit", message.len(), MAX_UDP_PAYLOAD),
                &message,
            ));
        }
        Ok(message)
    }
}

/// How the decoder gets past the echoed question section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QuestionMode {
    /// Skip as many bytes as the query occupied. Assumes the server echoed the question
    /// byte-for-byte.
    #[default]
    Skip,
    /// Decode every echoed question and continue after it.
    Reparse,
}

/// Type-specific RDATA of a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum RecordData {
    A(Ipv4Addr),
    Ns(String),
    Cname(String),
    Mx { preference: u16, exchange: String },
    /// RDATA of a type this client does not interpret, kept verbatim.
    Unknown(Vec<u8>),
}

impl Display for RecordData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordData::A(addr) => write!(f, "{}", addr),
            RecordData::Ns(name) | RecordData::Cname(name) => write!(f, "{}", name),
            RecordData::Mx {
                preference,
                exchange,
            } => write!(f, "{} {}", preference, exchange),
            RecordData::Unknown(bytes) => write!(f, "\\# {}", bytes.len()),
        }
    }
}

/// One answer, authority or additional record with every name fully resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResourceRecord {
    /// The domain name that owns this record.
    pub name: String,
    /// Numeric TYPE as received.
    pub rtype: u16,
    /// Time-to-live in seconds.
    pub ttl: u32,
    pub data: RecordData,
}

impl ResourceRecord {
    /// The record type, if it is one this client decodes.
    pub fn record_type(&self) -> Option<RecordType> {
        RecordType::try_from(self.rtype).ok()
    }
}

/// A decoded DNS response.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Response {
    id: u16,
    recursion_available: bool,
    authoritative_answer: bool,
    truncated: bool,
    answer_count: u16,
    authority_count: u16,
    additional_count: u16,
    questions: Vec<Question>,
    answers: Vec<ResourceRecord>,
    authority: Vec<ResourceRecord>,
    additional: Vec<ResourceRecord>,
}

impl Response {
    /// Decodes `raw` as the reply to `query`, skipping the question section by the
    /// query's encoded length.
    pub fn decode(raw: &[u8], query: &Query) -> Result<Response, DnsErrors> {
        Response::decode_with(raw, query, QuestionMode::Skip)
    }

    /// Decodes `raw` as the reply to `query`.
    ///
    /// # Errors
    /// - the RCODE kind when RCODE is not 0 (checked first),
    /// - [`DnsErrors::ResponseTruncated`] when TC is set,
    /// - [`DnsErrors::ResponsePacket`] for any structural problem.
    pub fn decode_with(raw: &[u8], query: &Query, mode: QuestionMode) -> Result<Response, DnsErrors> {
        let header = HeaderSection::from_bytes(raw).ok_or_else(|| {
            DnsErrors::packet(
                format!("{} bytes is shorter than the DNS header", raw.len()),
                raw,
            )
        })?;
        let flags = DnsHeaderFlags::from_u16(header.flags);

        if let Some(err) = DnsErrors::from_rcode(flags.rcode, raw) {
            return Err(err);
        }
        if flags.tc {
            return Err(DnsErrors::ResponseTruncated {
                payload: raw.to_vec(),
            });
        }
        if header.id != query.id() {
            warn!(
                expected = query.id(),
                received = header.id,
                "response id does not match the query id"
            );
        }

        let mut reader = RecordReader {
            message: raw,
            position: HEADER_LEN,
        };

        let questions = match mode {
            QuestionMode::Skip => {
                let end = query.payload().len();
                if end > raw.len() {
                    return Err(DnsErrors::packet(
                        "question section runs past the end of the response",
                        raw,
                    ));
                }
                reader.position = end;
                Vec::new()
            }
            QuestionMode::Reparse => (0..header.qd_count)
                .map(|_| reader.question())
                .collect::<Result<Vec<_>, _>>()?,
        };

        let answers = reader.records(header.an_count)?;
        let authority = reader.records(header.ns_count)?;
        let additional = reader.records(header.ar_count)?;

        debug!(
            id = header.id,
            answers = answers.len(),
            authority = authority.len(),
            additional = additional.len(),
            "decoded response"
        );

        Ok(Response {
            id: header.id,
            recursion_available: flags.ra,
            authoritative_answer: flags.aa,
            truncated: flags.tc,
            answer_count: header.an_count,
            authority_count: header.ns_count,
            additional_count: header.ar_count,
            questions,
            answers,
            authority,
            additional,
        })
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn recursion_available(&self) -> bool {
        self.recursion_available
    }

    pub fn authoritative_answer(&self) -> bool {
        self.authoritative_answer
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn answer_count(&self) -> u16 {
        self.answer_count
    }

    pub fn authority_count(&self) -> u16 {
        self.authority_count
    }

    pub fn additional_count(&self) -> u16 {
        self.additional_count
    }

    /// Echoed questions; only populated with [`QuestionMode::Reparse`].
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &[ResourceRecord] {
        &self.answers
    }

    pub fn authority(&self) -> &[ResourceRecord] {
        &self.authority
    }

    pub fn additional(&self) -> &[ResourceRecord] {
        &self.additional
    }
}

/// Cursor over a full response message.
struct RecordReader<'a> {
    message: &'a [u8],
    position: usize,
}

impl RecordReader<'_> {
    fn malformed(&self, reason: impl Into<String>) -> DnsErrors {
        DnsErrors::packet(reason, self.message)
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DnsErrors> {
        let message = self.message;
        let bytes = message
            .get(self.position..self.position + N)
            .ok_or_else(|| {
                self.malformed(format!(
                    "unexpected end of message at offset {}",
                    self.position
                ))
            })?;
        self.position += N;
        // the slice is exactly N bytes long
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u16(&mut self) -> Result<u16, DnsErrors> {
        self.take::<2>().map(u16::from_be_bytes)
    }

    fn u32(&mut self) -> Result<u32, DnsErrors> {
        self.take::<4>().map(u32::from_be_bytes)
    }

    fn name(&mut self) -> Result<String, DnsErrors> {
        let (name, next) = MessageCompressor::read_name(self.message, self.position)
            .map_err(|e| self.malformed(e.to_string()))?;
        self.position = next;
        Ok(name)
    }

    fn question(&mut self) -> Result<Question, DnsErrors> {
        let name = self.name()?;
        let qtype = self.u16()?;
        let qclass = self.u16()?;

        if qclass != CLASS_IN {
            return Err(self.malformed(format!(
                "invalid CLASS {} on question for {}",
                qclass, name
            )));
        }
        let record_type = RecordType::try_from(qtype).map_err(|e| self.malformed(e.to_string()))?;
        Ok(Question { name, record_type })
    }

    fn records(&mut self, count: u16) -> Result<Vec<ResourceRecord>, DnsErrors> {
        (0..count).map(|_| self.record()).collect()
    }

    fn record(&mut self) -> Result<ResourceRecord, DnsErrors> {
        let name = self.name()?;
        let rtype = self.u16()?;
        let class = self.u16()?;
        let ttl = self.u32()?;
        let rd_length = self.u16()? as usize;

        if class != CLASS_IN {
            return Err(self.malformed(format!(
                "invalid CLASS {} on response for name {}",
                class, name
            )));
        }

        let start = self.position;
        let end = start + rd_length;
        let rdata = self.message.get(start..end).ok_or_else(|| {
            self.malformed(format!(
                "RDATA of record for {} overruns the message ({} bytes at offset {})",
                name, rd_length, start
            ))
        })?;

        let data = match RecordType::try_from(rtype) {
            Ok(RecordType::A) => {
                let octets: [u8; 4] = rdata.try_into().map_err(|_| {
                    self.malformed(format!("A record for {} has RDLENGTH {}", name, rd_length))
                })?;
                RecordData::A(Ipv4Addr::from(octets))
            }
            Ok(RecordType::Ns) => RecordData::Ns(self.rdata_name(start, end)?),
            Ok(RecordType::Cname) => RecordData::Cname(self.rdata_name(start, end)?),
            Ok(RecordType::Mx) => {
                if rd_length < 3 {
                    return Err(self.malformed(format!(
                        "MX record for {} has RDLENGTH {}",
                        name, rd_length
                    )));
                }
                RecordData::Mx {
                    preference: u16::from_be_bytes([rdata[0], rdata[1]]),
                    exchange: self.rdata_name(start + 2, end)?,
                }
            }
            Err(_) => RecordData::Unknown(rdata.to_vec()),
        };

        // RDLENGTH decides where the next record starts, not the name decoder
        self.position = end;

        Ok(ResourceRecord {
            name,
            rtype,
            ttl,
            data,
        })
    }

    /// Reads a name embedded in RDATA spanning `start..end`.
    fn rdata_name(&self, start: usize, end: usize) -> Result<String, DnsErrors> {
        let (name, next) = MessageCompressor::read_name(self.message, start)
            .map_err(|e| self.malformed(e.to_string()))?;
        if next > end {
            return Err(self.malformed(format!(
                "name {} runs past its RDATA (ends at {}, RDATA ends at {})",
                name, next, end
            )));
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::errors::ErrorKind;

    const OK_FLAGS: u16 = 0x8180; // QR RD RA
    const POINTER_TO_QNAME: [u8; 2] = [0xC0, 0x0C];

    fn a_query() -> Query {
        Query::new(0x1234, vec![Question::new("example.com", RecordType::A)]).unwrap()
    }

    fn record(name: &[u8], rtype: u16, class: u16, ttl: u32, rdata: &[u8]) -> Vec<u8> {
        let mut bytes = name.to_vec();
        bytes.extend_from_slice(&rtype.to_be_bytes());
        bytes.extend_from_slice(&class.to_be_bytes());
        bytes.extend_from_slice(&ttl.to_be_bytes());
        bytes.extend_from_slice(&(rdata.len() as u16).to_be_bytes());
        bytes.extend_from_slice(rdata);
        bytes
    }

    /// Echoes the query, patches the header and appends `records`.
    fn response(query: &Query, flags: u16, counts: (u16, u16, u16), records: &[Vec<u8>]) -> Vec<u8> {
        let mut bytes = query.payload().to_vec();
        let header = HeaderSection {
            id: query.id(),
            flags,
            qd_count: query.questions().len() as u16,
            an_count: counts.0,
            ns_count: counts.1,
            ar_count: counts.2,
        };
        bytes[..HEADER_LEN].copy_from_slice(&header.to_bytes());
        for r in records {
            bytes.extend_from_slice(r);
        }
        bytes
    }

    #[test]
    fn test_record_type_to_bytes() {
        assert_eq!(RecordType::A.to_bytes(), [0x00, 0x01]);
        assert_eq!(RecordType::Mx.to_bytes(), [0x00, 0x0F]);
    }

    #[test]
    fn test_record_type_parsing() {
        assert_eq!("cname".parse::<RecordType>().unwrap(), RecordType::Cname);
        assert_eq!(RecordType::try_from(2).unwrap(), RecordType::Ns);
        assert!("AAAA".parse::<RecordType>().is_err());
        assert!(RecordType::try_from(28).is_err());
        assert_eq!(RecordType::Mx.to_string(), "MX");
    }

    #[test]
    fn test_dns_header_flags_encode_decode() {
        let flags = DnsHeaderFlags {
            qr: true,
            opcode: OpCodeOptions::ServerStatusRequest.to_u8(),
            aa: true,
            tc: false,
            rd: true,
            ra: false,
            z: 3,
            rcode: 5,
        };

        assert_eq!(DnsHeaderFlags::from_u16(flags.to_u16()), flags);
        assert_eq!(DnsHeaderFlags::from_u16(OK_FLAGS).rcode, 0);
        assert!(DnsHeaderFlags::from_u16(OK_FLAGS).ra);
    }

    #[test]
    fn test_header_bytes_round_trip() {
        let header = HeaderSection {
            id: 0xBEEF,
            flags: 0x0100,
            qd_count: 1,
            an_count: 2,
            ns_count: 3,
            ar_count: 4,
        };
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..4], &[0xBE, 0xEF, 0x01, 0x00]);
        assert_eq!(HeaderSection::from_bytes(&bytes), Some(header));
        assert_eq!(HeaderSection::from_bytes(&bytes[..11]), None);
    }

    #[test]
    fn test_query_encode_exact_bytes() {
        let query = Query::new(1, vec![Question::new("example.com", RecordType::A)]).unwrap();

        let expected = [
            0x00, 0x01, // id
            0x01, 0x00, // RD
            0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // counts
            7, b'e', b'x', b'a', b'm', b'p', b'l', b'e', 3, b'c', b'o', b'm', 0, // qname
            0x00, 0x01, // A
            0x00, 0x01, // IN
        ];
        assert_eq!(query.payload(), &expected);
    }

    #[test]
    fn test_query_flags_follow_builder() {
        let query = Query::builder(7)
            .question("example.com", RecordType::Ns)
            .opcode(OpCodeOptions::InverseQuery)
            .authoritative(true)
            .recursion_desired(false)
            .build()
            .unwrap();

        let flags = DnsHeaderFlags::from_u16(u16::from_be_bytes([query.payload()[2], query.payload()[3]]));
        assert!(!flags.qr);
        assert_eq!(flags.opcode, 1);
        assert!(flags.aa);
        assert!(!flags.rd);
        assert!(!flags.tc);
    }

    #[test]
    fn test_query_reserved_opcode() {
        let query = Query::builder(7)
            .question("example.com", RecordType::A)
            .opcode(OpCodeOptions::Other(5))
            .build()
            .unwrap();

        let flags = DnsHeaderFlags::from_u16(u16::from_be_bytes([query.payload()[2], query.payload()[3]]));
        assert_eq!(flags.opcode, 5);
        assert!(flags.rd);
        assert_eq!(query.opcode(), OpCodeOptions::Other(5));
        assert_eq!(OpCodeOptions::from_u8(flags.opcode), OpCodeOptions::Other(5));
        assert_eq!(OpCodeOptions::from_u8(2), OpCodeOptions::ServerStatusRequest);
        assert_eq!(OpCodeOptions::Other(0x1F).to_u8(), 0x0F);
    }

    #[test]
    fn test_question_round_trip() {
        let query = Query::new(1, vec![Question::new("example.com", RecordType::A)]).unwrap();
        let (question, next) = Question::decode(query.payload(), HEADER_LEN).unwrap();

        assert_eq!(question, Question::new("example.com", RecordType::A));
        assert_eq!(next, query.payload().len());
    }

    #[test]
    fn test_empty_question_list_is_header_only() {
        let query = Query::new(9, Vec::new()).unwrap();
        assert_eq!(query.payload().len(), HEADER_LEN);
        assert_eq!(HeaderSection::from_bytes(query.payload()).unwrap().qd_count, 0);
    }

    #[test]
    fn test_multiple_questions_kept_in_order() {
        let query = Query::builder(2)
            .question("example.com", RecordType::Mx)
            .question("example.org", RecordType::Ns)
            .build()
            .unwrap();

        let (first, next) = Question::decode(query.payload(), HEADER_LEN).unwrap();
        let (second, end) = Question::decode(query.payload(), next).unwrap();
        assert_eq!(first, Question::new("example.com", RecordType::Mx));
        assert_eq!(second, Question::new("example.org", RecordType::Ns));
        assert_eq!(end, query.payload().len());
    }

    #[test]
    fn test_invalid_names_fail_before_encoding() {
        for name in ["-bad.com", "bad-.com", "bad_name.com", "a..b"] {
            let err = Query::new(1, vec![Question::new(name, RecordType::A)]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Format, "{}", name);
            assert_eq!(err.payload(), name.as_bytes());
        }
    }

    #[test]
    fn test_legacy_www_rule_is_opt_in() {
        assert!(Query::new(1, vec![Question::new("google.com", RecordType::A)]).is_ok());

        let err = Query::builder(1)
            .question("google.com", RecordType::A)
            .legacy_www_rule(true)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);

        let ok = Query::builder(1)
            .question("www.google.com", RecordType::A)
            .question("google.com", RecordType::Mx)
            .legacy_www_rule(true)
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_generate_id_produces_varied_ids() {
        let ids: std::collections::HashSet<u16> = (0..32).map(|_| generate_id()).collect();
        assert!(ids.len() > 1);
    }

    #[test]
    fn test_decode_rcode_errors() {
        let query = a_query();
        let cases = [
            (1u16, ErrorKind::Format),
            (2, ErrorKind::Server),
            (3, ErrorKind::InvalidName),
            (5, ErrorKind::ServerRefused),
            (4, ErrorKind::ResponsePacket),
            (9, ErrorKind::ResponsePacket),
        ];

        for (rcode, kind) in cases {
            let raw = response(&query, OK_FLAGS | rcode, (0, 0, 0), &[]);
            let err = Response::decode(&raw, &query).unwrap_err();
            assert_eq!(err.kind(), kind, "rcode {}", rcode);
            assert_eq!(err.payload(), raw.as_slice());
        }
    }

    #[test]
    fn test_rcode_checked_before_truncation() {
        let query = a_query();
        let raw = response(&query, OK_FLAGS | 0x0200 | 3, (0, 0, 0), &[]);
        let err = Response::decode(&raw, &query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidName);
    }

    #[test]
    fn test_truncated_response_is_an_error() {
        let query = a_query();
        let raw = response(&query, OK_FLAGS | 0x0200, (0, 0, 0), &[]);
        let err = Response::decode(&raw, &query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponseTruncated);
    }

    #[test]
    fn test_short_message_is_packet_error() {
        let query = a_query();
        let err = Response::decode(&[0x12, 0x34, 0x81], &query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponsePacket);

        // header only, but the query's question section is missing
        let mut header_only = response(&query, OK_FLAGS, (0, 0, 0), &[]);
        header_only.truncate(HEADER_LEN);
        let err = Response::decode(&header_only, &query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponsePacket);
    }

    #[test]
    fn test_decode_a_answers() {
        let query = a_query();
        let raw = response(
            &query,
            OK_FLAGS | 0x0400,
            (2, 0, 0),
            &[
                record(&POINTER_TO_QNAME, 1, 1, 300, &[93, 184, 216, 34]),
                record(&POINTER_TO_QNAME, 1, 1, 60, &[10, 0, 0, 1]),
            ],
        );

        let response = Response::decode(&raw, &query).unwrap();
        assert!(response.recursion_available());
        assert!(response.authoritative_answer());
        assert!(!response.truncated());
        assert_eq!(response.id(), 0x1234);
        assert_eq!(response.answer_count(), 2);
        assert_eq!(response.additional_count(), 0);

        let answers = response.answers();
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].name, "example.com");
        assert_eq!(answers[0].ttl, 300);
        assert_eq!(answers[0].record_type(), Some(RecordType::A));
        assert_eq!(answers[0].data, RecordData::A(Ipv4Addr::new(93, 184, 216, 34)));
        assert_eq!(answers[1].data, RecordData::A(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(response.questions().is_empty());
    }

    #[test]
    fn test_decode_cname_mx_ns_with_compression() {
        let query = a_query();
        let qlen = query.payload().len();

        // CNAME www.example.com -> "www" + pointer to example.com
        let cname = record(&POINTER_TO_QNAME, 5, 1, 100, &[3, b'w', b'w', b'w', 0xC0, 0x0C]);
        // MX 10 mail.example.com
        let mx = record(
            &POINTER_TO_QNAME,
            15,
            1,
            200,
            &[0x00, 0x0A, 4, b'm', b'a', b'i', b'l', 0xC0, 0x0C],
        );
        // NS whose RDATA points at the CNAME target written inside the first record
        let cname_target = qlen + cname.len() - 6;
        let ns = record(
            &POINTER_TO_QNAME,
            2,
            1,
            400,
            &[0xC0 | (cname_target >> 8) as u8, cname_target as u8],
        );

        let raw = response(&query, OK_FLAGS, (2, 0, 1), &[cname, mx, ns]);
        let response = Response::decode(&raw, &query).unwrap();

        assert_eq!(
            response.answers()[0].data,
            RecordData::Cname("www.example.com".to_string())
        );
        assert_eq!(
            response.answers()[1].data,
            RecordData::Mx {
                preference: 10,
                exchange: "mail.example.com".to_string()
            }
        );
        assert_eq!(response.additional().len(), 1);
        assert_eq!(
            response.additional()[0].data,
            RecordData::Ns("www.example.com".to_string())
        );
        assert_eq!(response.additional()[0].ttl, 400);
    }

    #[test]
    fn test_rdlength_decides_next_record() {
        let query = a_query();
        // CNAME RDATA with two padding bytes after the name
        let padded = record(&POINTER_TO_QNAME, 5, 1, 1, &[0xC0, 0x0C, 0xFF, 0xFF]);
        let next = record(&POINTER_TO_QNAME, 1, 1, 2, &[1, 2, 3, 4]);

        let raw = response(&query, OK_FLAGS, (2, 0, 0), &[padded, next]);
        let response = Response::decode(&raw, &query).unwrap();

        assert_eq!(
            response.answers()[0].data,
            RecordData::Cname("example.com".to_string())
        );
        assert_eq!(response.answers()[1].data, RecordData::A(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_non_internet_class_rejected() {
        let query = a_query();
        let raw = response(
            &query,
            OK_FLAGS,
            (1, 0, 0),
            &[record(&POINTER_TO_QNAME, 1, 3, 300, &[1, 1, 1, 1])],
        );

        let err = Response::decode(&raw, &query).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResponsePacket);
        assert!(err.to_string().contains("CLASS 3"));
    }

    #[test]
    fn test_structural_errors() {
        let query = a_query();

        // RDLENGTH claims more bytes than the datagram holds
        let mut overrun = record(&POINTER_TO_QNAME, 1, 1, 300, &[1, 1, 1, 1]);
        overrun.truncate(overrun.len() - 2);
        // A record with a 3 byte address
        let short_a = record(&POINTER_TO_QNAME, 1, 1, 300, &[1, 1, 1]);
        // fewer records than ANCOUNT announces
        let missing = Vec::new();
        // CNAME whose name runs past its RDATA
        let long_name = record(&POINTER_TO_QNAME, 5, 1, 300, &[3, b'w', b'w']);
        // MX with a preference but no exchange name
        let short_mx = record(&POINTER_TO_QNAME, 15, 1, 300, &[0x00, 0x0A]);

        for body in [overrun, short_a, missing, long_name, short_mx] {
            let raw = response(&query, OK_FLAGS, (1, 0, 0), &[body]);
            let err = Response::decode(&raw, &query).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ResponsePacket);
        }
    }

    #[test]
    fn test_unknown_types_are_kept_and_authority_is_decoded() {
        let query = a_query();
        let soa = record(&POINTER_TO_QNAME, 6, 1, 900, &[0xAA; 22]);
        let glue = record(&POINTER_TO_QNAME, 1, 1, 30, &[192, 0, 2, 1]);

        let raw = response(&query, OK_FLAGS, (0, 1, 1), &[soa, glue]);
        let response = Response::decode(&raw, &query).unwrap();

        assert!(response.answers().is_empty());
        assert_eq!(response.authority_count(), 1);
        assert_eq!(response.authority()[0].rtype, 6);
        assert_eq!(response.authority()[0].record_type(), None);
        assert_eq!(response.authority()[0].data, RecordData::Unknown(vec![0xAA; 22]));
        assert_eq!(response.additional()[0].data, RecordData::A(Ipv4Addr::new(192, 0, 2, 1)));
    }

    #[test]
    fn test_mismatched_id_still_decodes() {
        let query = a_query();
        let mut raw = response(&query, OK_FLAGS, (0, 0, 0), &[]);
        raw[0] = 0xFF;
        let response = Response::decode(&raw, &query).unwrap();
        assert_eq!(response.id(), 0xFF34);
    }

    #[test]
    fn test_reparse_mode_follows_the_echoed_question() {
        let query = a_query();

        // the server echoes a longer question than the one sent
        let mut raw = HeaderSection {
            id: query.id(),
            flags: OK_FLAGS,
            qd_count: 1,
            an_count: 1,
            ns_count: 0,
            ar_count: 0,
        }
        .to_bytes()
        .to_vec();
        MessageCompressor::write_labels(&["www", "example", "com"], &mut raw).unwrap();
        raw.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        raw.extend_from_slice(&record(&POINTER_TO_QNAME, 1, 1, 5, &[127, 0, 0, 1]));

        let response = Response::decode_with(&raw, &query, QuestionMode::Reparse).unwrap();
        assert_eq!(
            response.questions(),
            &[Question::new("www.example.com", RecordType::A)]
        );
        assert_eq!(response.answers()[0].name, "www.example.com");
        assert_eq!(response.answers()[0].data, RecordData::A(Ipv4Addr::LOCALHOST));
    }
}

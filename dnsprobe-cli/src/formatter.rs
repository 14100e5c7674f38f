use dnsprobe::dns::errors::DnsErrors;
use dnsprobe::dns::resolver::{QueryOutcome, RecordData, RecordType, ResolverErrors, ResourceRecord};
use serde_json::json;
use std::net::IpAddr;

/// What the user asked for, echoed back in the output.
#[derive(Debug, Clone)]
pub struct Request {
    pub server: IpAddr,
    pub name: String,
    pub record_type: RecordType,
}

/// Turns the result of one query into printable output.
pub trait OutcomeFormatter {
    /// Printed before the query is sent. Empty by default.
    fn format_request(&self, _request: &Request) -> String {
        String::new()
    }

    fn format_outcome(&self, request: &Request, outcome: &QueryOutcome) -> String;

    fn format_error(&self, request: &Request, err: &ResolverErrors) -> String;
}

/// Tab separated, one line per record.
pub struct TextFormatter;
/// One JSON document per query.
pub struct JsonFormatter;

impl Default for TextFormatter {
    fn default() -> Self {
        Self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self
    }
}

/// One line describing `err`, distinct for every error kind.
pub fn describe_error(err: &ResolverErrors) -> String {
    match err {
        ResolverErrors::Dns(dns) => match dns {
            DnsErrors::Format { reason, .. } => format!("Format error: {}", reason),
            DnsErrors::Server { .. } => {
                "Server failure: the name server was unable to process this query".to_string()
            }
            DnsErrors::InvalidName { .. } => {
                "Name error: the domain name referenced in the query does not exist".to_string()
            }
            DnsErrors::ServerRefused { .. } => {
                "Refused: the name server refuses to perform the requested operation".to_string()
            }
            DnsErrors::ResponseTruncated { .. } => {
                "Truncated: the response did not fit in a single UDP datagram".to_string()
            }
            DnsErrors::ResponsePacket { reason, .. } => format!("Unexpected response: {}", reason),
            DnsErrors::TimeoutExceeded { attempts, .. } => {
                format!("Maximum number of retries {} exceeded", attempts)
            }
        },
        ResolverErrors::Transport(e) => format!("Socket error: {}", e),
        ResolverErrors::Config(e) => format!("Invalid configuration: {}", e),
    }
}

fn record_line(record: &ResourceRecord, authoritative: bool) -> String {
    let body = match &record.data {
        RecordData::A(addr) => format!("IP\t{}", addr),
        RecordData::Ns(name) => format!("NS\t{}", name),
        RecordData::Cname(name) => format!("CNAME\t{}", name),
        RecordData::Mx {
            preference,
            exchange,
        } => format!("MX\t{}\t{}", exchange, preference),
        RecordData::Unknown(bytes) => format!("TYPE{}\t\\# {}", record.rtype, bytes.len()),
    };
    let auth = if authoritative { "auth" } else { "nonauth" };
    format!("{}\t{}\t{}", body, record.ttl, auth)
}

fn section(lines: &mut Vec<String>, header: String, records: &[ResourceRecord], authoritative: bool) {
    lines.push(header);
    lines.extend(records.iter().map(|r| record_line(r, authoritative)));
}

impl OutcomeFormatter for TextFormatter {
    fn format_request(&self, request: &Request) -> String {
        format!(
            "DnsClient sending request for {}\nServer: {}\nRequest type: {}",
            request.name, request.server, request.record_type
        )
    }

    fn format_outcome(&self, _request: &Request, outcome: &QueryOutcome) -> String {
        let response = &outcome.response;
        let aa = response.authoritative_answer();
        let mut lines = vec![format!(
            "Response received after {:.3} seconds ({} retries)",
            outcome.elapsed.as_secs_f64(),
            outcome.attempts
        )];

        if response.answers().is_empty() {
            lines.push("NOTFOUND".to_string());
        } else {
            section(
                &mut lines,
                format!("***\tAnswer Section ({} records)\t***", response.answers().len()),
                response.answers(),
                aa,
            );
        }

        if !response.authority().is_empty() {
            section(
                &mut lines,
                format!("***Authority Section ({} records)***", response.authority().len()),
                response.authority(),
                aa,
            );
        }

        if !response.additional().is_empty() {
            section(
                &mut lines,
                format!("***Additional Section ({} records)***", response.additional().len()),
                response.additional(),
                aa,
            );
        }

        lines.join("\n")
    }

    fn format_error(&self, _request: &Request, err: &ResolverErrors) -> String {
        format!("ERROR\t{}", describe_error(err))
    }
}

impl OutcomeFormatter for JsonFormatter {
    fn format_outcome(&self, request: &Request, outcome: &QueryOutcome) -> String {
        json!({
            "server": request.server,
            "name": request.name,
            "type": request.record_type,
            "attempts": outcome.attempts,
            "elapsed_ms": outcome.elapsed.as_secs_f64() * 1000.0,
            "response": outcome.response,
        })
        .to_string()
    }

    fn format_error(&self, request: &Request, err: &ResolverErrors) -> String {
        json!({
            "server": request.server,
            "name": request.name,
            "type": request.record_type,
            "error": {
                "kind": err.as_dns().map(|e| e.kind()),
                "message": describe_error(err),
            },
        })
        .to_string()
    }
}

mod formatter;

use clap::Parser;
use dnsprobe::dns::resolver::{
    ConfigErrors, QuestionMode, QueryOutcome, RecordType, Resolver, ResolverConfig, ResolverErrors,
};
use formatter::{JsonFormatter, OutcomeFormatter, Request, TextFormatter};
use std::net::IpAddr;
use std::process::ExitCode;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Send one DNS query over UDP and print the answer.
#[derive(Parser, Debug)]
#[command(name = "dnsprobe", version, about)]
struct Args {
    /// DNS server address, optionally prefixed with '@'
    #[arg(value_parser = parse_server)]
    server: IpAddr,

    /// Domain name to query
    name: String,

    /// Record type (A, NS, CNAME or MX)
    #[arg(short = 't', long = "type", default_value = "A")]
    record_type: RecordType,

    /// Seconds to wait for each reply
    #[arg(long)]
    timeout: Option<f64>,

    /// Total number of attempts
    #[arg(long)]
    max_retries: Option<u32>,

    /// Server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Decode the echoed question section instead of skipping it
    #[arg(long)]
    reparse_question: bool,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,

    /// Log resolver activity to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_server(value: &str) -> Result<IpAddr, String> {
    let trimmed = value.strip_prefix('@').unwrap_or(value);
    trimmed
        .parse()
        .map_err(|_| format!("'{}' is not an IPv4 or IPv6 address", value))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment first, then command-line flags on top.
fn build_config(args: &Args) -> Result<ResolverConfig, ConfigErrors> {
    let mut config = ResolverConfig::from_env()?;

    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(seconds) = args.timeout {
        config.timeout = Duration::try_from_secs_f64(seconds)
            .map_err(|_| ConfigErrors::InvalidTimeout(seconds.to_string()))?;
    }
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    if args.reparse_question {
        config.question_mode = QuestionMode::Reparse;
    }

    config.validate()?;
    debug!(?config, "effective resolver configuration");
    Ok(config)
}

fn run(args: &Args) -> Result<QueryOutcome, ResolverErrors> {
    let resolver = Resolver::new(build_config(args)?)?;
    debug!(server = %args.server, name = %args.name, rtype = %args.record_type, "sending lookup");
    resolver.lookup(&args.name, args.record_type, args.server)
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let formatter: Box<dyn OutcomeFormatter> = if args.json {
        Box::new(JsonFormatter)
    } else {
        Box::new(TextFormatter)
    };

    let request = Request {
        server: args.server,
        name: args.name.clone(),
        record_type: args.record_type,
    };

    let preamble = formatter.format_request(&request);
    if !preamble.is_empty() {
        println!("{}", preamble);
    }

    match run(&args) {
        Ok(outcome) => {
            println!("{}", formatter.format_outcome(&request, &outcome));
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", formatter.format_error(&request, &e));
            ExitCode::FAILURE
        }
    }
}

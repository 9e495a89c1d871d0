//! CLI for drawkit — run draws, audit bit sequences, follow live job feeds.

mod commands;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "drawkit")]
#[command(about = "drawkit — verifiable random draws and randomness audits")]
#[command(version = drawkit_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the backend lives. Flags override `DRAWKIT_HTTP_BASE` / `DRAWKIT_WS_BASE`.
#[derive(Args, Clone)]
pub struct BackendArgs {
    /// HTTP API base (default: $DRAWKIT_HTTP_BASE or http://localhost:8000)
    #[arg(long)]
    api: Option<String>,

    /// Page location the stream origin is derived from
    #[arg(long, default_value = "http://localhost:5173/")]
    page: String,

    /// Stream origin override, e.g. wss://draw.example (default: $DRAWKIT_WS_BASE)
    #[arg(long)]
    ws_base: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the real-time URL a page at --page would connect to
    Url {
        /// Feed path, with or without leading slash
        #[arg(default_value = "/")]
        path: String,

        /// Page location
        #[arg(long, default_value = "http://localhost:5173/")]
        page: String,

        /// Stream origin override (default: $DRAWKIT_WS_BASE)
        #[arg(long)]
        ws_base: Option<String>,
    },

    /// Print the page route table, or resolve navigations against it
    Routes {
        /// Paths to navigate to, in order
        #[arg(long = "navigate")]
        navigate: Vec<String>,
    },

    /// Start a draw, follow its feed and print the result
    Draw {
        /// Comma-separated entropy source ids
        #[arg(long, default_value = "clock_jitter")]
        sources: String,

        /// Bits to harvest
        #[arg(long, default_value = "4096")]
        bits: u64,

        /// How many numbers to draw
        #[arg(long, default_value = "6")]
        numbers: u64,

        /// Upper bound of each number
        #[arg(long, default_value = "49")]
        max_number: u64,

        /// Feed transport
        #[arg(long, default_value = "ws", value_parser = ["ws", "sse", "none"])]
        transport: String,

        /// Also fetch and print the underlying bit string
        #[arg(long)]
        show_bits: bool,

        /// Write the feed as a JSON results log
        #[arg(long)]
        output: Option<String>,

        /// Print the final result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Audit a bit sequence or a list of numbers
    Audit {
        /// Bit string ('0'/'1', whitespace ignored)
        #[arg(long, conflicts_with_all = ["bits_file", "numbers"])]
        bits: Option<String>,

        /// File containing a bit string
        #[arg(long, conflicts_with = "numbers")]
        bits_file: Option<String>,

        /// Comma-separated integers
        #[arg(long)]
        numbers: Option<String>,

        /// Run as an asynchronous NIST job and fetch its report
        #[arg(long)]
        nist: bool,

        /// With --nist, follow the job feed before fetching the report
        #[arg(long, requires = "nist")]
        follow: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Fetch the NIST report of an audit job
    Report {
        /// Job id returned when the audit started
        job_id: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },

    /// Run the local development server (/api proxy + page routes)
    Proxy {
        /// Port to listen on
        #[arg(long, default_value = "5173")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Backend origin (default: $DRAWKIT_HTTP_BASE or http://localhost:8000)
        #[arg(long)]
        target: Option<String>,

        /// Additional allowed Host header values
        #[arg(long = "allow-host")]
        allow_hosts: Vec<String>,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Url {
            path,
            page,
            ws_base,
        } => commands::url::run(&path, &page, ws_base.as_deref()),
        Commands::Routes { navigate } => commands::routes::run(&navigate),
        Commands::Draw {
            sources,
            bits,
            numbers,
            max_number,
            transport,
            show_bits,
            output,
            json,
            backend,
        } => commands::draw::run(commands::draw::DrawCommandConfig {
            sources: &sources,
            bits,
            numbers,
            max_number,
            transport: &transport,
            show_bits,
            output_path: output.as_deref(),
            json,
            backend: &backend,
        }),
        Commands::Audit {
            bits,
            bits_file,
            numbers,
            nist,
            follow,
            json,
            backend,
        } => commands::audit::run(commands::audit::AuditCommandConfig {
            bits: bits.as_deref(),
            bits_file: bits_file.as_deref(),
            numbers: numbers.as_deref(),
            nist,
            follow,
            json,
            backend: &backend,
        }),
        Commands::Report {
            job_id,
            json,
            backend,
        } => commands::report::run(&job_id, json, &backend),
        Commands::Proxy {
            port,
            host,
            target,
            allow_hosts,
        } => commands::proxy::run(&host, port, target.as_deref(), &allow_hosts),
    }
}

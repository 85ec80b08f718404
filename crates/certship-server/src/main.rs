//! Certship CLI - HTTP job-runner for certbot-backed certificate issuance

mod handlers;
mod serve;

use clap::{Parser, Subcommand};
use serve::ServeCommand;
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "CERTSHIP_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "CERTSHIP_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve(ServeCommand),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.clone();

    // If RUST_LOG is set, use it directly; otherwise use our default filter
    // with all certship crates at the requested level and noisy
    // dependencies at warn
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .expect("Invalid RUST_LOG environment variable")
    } else {
        tracing_subscriber::EnvFilter::new(format!(
            "certship_server={level},\
             certship_core={level},\
             certship_secrets={level},\
             certship_storage={level},\
             certship_issuer={level},\
             certbot={level},\
             aws_config=warn,\
             aws_sdk_s3=warn,\
             aws_sdk_secretsmanager=warn,\
             aws_smithy_runtime=warn,\
             hyper=warn,\
             tower=warn,\
             h2=warn,\
             rustls=warn",
            level = log_level
        ))
    };

    let fmt_layer = match cli.log_format.as_str() {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer() // "compact" or any other value
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set global default subscriber");

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
    }
}

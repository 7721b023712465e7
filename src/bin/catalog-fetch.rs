use std::path::PathBuf;

use catalog_http::config::{load_config, ClientConfig};
use catalog_http::context::ContextHeader;
use catalog_http::http::{CatalogClient, ReqwestTransport, RequestOptions, Verb};
use catalog_http::observability::{logging, metrics};
use clap::Parser;

#[derive(Parser)]
#[command(name = "catalog-fetch")]
#[command(about = "Issue one resilient request against a catalog service", long_about = None)]
struct Cli {
    /// Target URL
    url: String,

    /// HTTP verb (GET, HEAD or DELETE)
    #[arg(short = 'X', long, default_value = "GET")]
    verb: Verb,

    /// Client configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Context header as a JSON object
    #[arg(long)]
    context: Option<String>,

    /// Fail fast when the service is unreachable
    #[arg(long)]
    no_offline_retry: bool,

    /// Expose Prometheus metrics on this address while running
    #[arg(long)]
    metrics: Option<std::net::SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };
    logging::init_logging(&config.observability.log_level);

    if let Some(addr) = cli.metrics {
        metrics::init_metrics(addr);
    } else if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if cli.verb.has_body() {
        return Err(format!("{} needs a body; use GET, HEAD or DELETE", cli.verb).into());
    }

    let mut options = RequestOptions::new();
    if let Some(raw) = &cli.context {
        let context: ContextHeader = serde_json::from_str(raw)?;
        options = options.context(context);
    }
    if cli.no_offline_retry {
        options = options.skip_retry_on_offline_codes();
    }

    let transport = ReqwestTransport::new(&config.transport)?;
    let client = CatalogClient::new(transport, &config);

    tracing::info!(verb = %cli.verb, url = %cli.url, "Sending request");
    match client.execute(cli.verb, &cli.url, None, options).await {
        Ok(resp) => {
            println!("{}", resp.status);
            if !resp.body.is_empty() {
                match resp.json::<serde_json::Value>() {
                    Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                    Err(_) => println!("{}", resp.body),
                }
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(resp) = e.response() {
                eprintln!("{}", resp.body);
            }
            std::process::exit(1);
        }
    }
}

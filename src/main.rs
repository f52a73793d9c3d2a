//! Edge request-transformation layer.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────┐
//!                          │                 EDGE BOOSTER                 │
//!     Client Request       │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!     ─────────────────────┼─▶│ signals │──▶│  access  │──▶│  origin   │  │
//!                          │  │         │   │  filter  │   │ selector  │  │
//!                          │  └─────────┘   └────┬─────┘   └─────┬─────┘  │
//!                          │               403 ◀─┘               ▼        │
//!                          │                             ┌──────────────┐ │
//!                          │                             │   request    │ │
//!                          │                             │   rewriter   │ │
//!                          │                             └──────┬───────┘ │
//!     Client Response      │  ┌──────────┐               ┌──────▼───────┐ │
//!     ◀────────────────────┼──│ response │◀──────────────│    fetch     │◀┼──── Upstream
//!                          │  │ rewriter │               │ (streaming)  │ │     Mirror
//!                          │  └──────────┘               └──────────────┘ │
//!                          └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::{body::Body, http::Request};
use clap::{Parser, Subcommand};

use edge_booster::http::pipeline;
use edge_booster::lifecycle::startup;
use edge_booster::RoutingConfig;

#[derive(Parser)]
#[command(name = "edge-booster")]
#[command(version, about = "Edge layer routing clients to regional upstream mirrors", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve traffic (default)
    Serve {
        /// Reload the configuration file when it changes
        #[arg(long)]
        watch: bool,
    },
    /// Validate the configuration and print a summary
    Check,
    /// Show how a request would be handled, without sending it
    Explain {
        /// Region code signalled by the hosting environment
        #[arg(long)]
        region: Option<String>,

        /// Client IP address
        #[arg(long)]
        address: Option<String>,

        /// User-Agent header
        #[arg(long, default_value = "")]
        user_agent: String,

        /// Request path and query
        #[arg(long, default_value = "/")]
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = startup::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve { watch: false }) {
        Commands::Serve { watch } => {
            let watch_path = if watch {
                if cli.config.is_none() {
                    eprintln!("--watch needs --config; serving built-in defaults without reload");
                }
                cli.config.as_deref()
            } else {
                None
            };
            startup::serve(config, watch_path).await?;
        }
        Commands::Check => {
            let routing = RoutingConfig::from_config(&config)
                .map_err(edge_booster::config::ConfigError::Validation)?;
            println!("configuration OK");
            println!("  default upstream : {}", routing.default_upstream);
            println!("  mobile upstream  : {}", routing.mobile_upstream);
            let mut regions: Vec<_> = routing.region_routes.iter().collect();
            regions.sort();
            for (region, url) in regions {
                println!("  route {region}         : {url}");
            }
            println!("  blocked regions  : {}", routing.blocked_regions.len());
            println!("  blocked addresses: {}", routing.blocked_addresses.len());
            println!("  marker header    : {}", routing.marker_header);
        }
        Commands::Explain {
            region,
            address,
            user_agent,
            path,
        } => {
            let routing = RoutingConfig::from_config(&config)
                .map_err(edge_booster::config::ConfigError::Validation)?;

            let mut request = Request::builder().uri(path.as_str()).header("user-agent", user_agent);
            if let Some(region) = region {
                request = request.header(&routing.signals.region, region);
            }
            if let Some(address) = address {
                request = request.header(&routing.signals.address, address);
            }
            let request = request.body(Body::empty())?;

            let decision = pipeline::decide(&routing, &request, None)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
    }

    Ok(())
}

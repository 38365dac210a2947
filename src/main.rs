use std::path::PathBuf;

use clap::Parser;

use issuance_gateway::lifecycle::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "issuance-gateway")]
#[command(about = "Routing gateway in front of the credential issuance server", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG", default_value = "gateway.toml")]
    config: PathBuf,

    /// Deployment branch whose profile is overlaid on the base configuration.
    #[arg(short, long, env = "GATEWAY_BRANCH")]
    branch: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    lifecycle::run(StartupOptions {
        config_path: args.config,
        branch: args.branch,
    })
    .await?;

    Ok(())
}

//! Dirauth - Directory Authentication Gateway
//!
//! Verifies user credentials against an LDAP / Active Directory server and
//! returns a normalized identity profile over HTTP.

use clap::{Parser, Subcommand};
use dirauth_api::GatewayServer;
use dirauth_core::config::{GatewayConfig, ProfileLookup};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "dirauth")]
#[command(author = "Dirauth Team")]
#[command(version = dirauth_core::VERSION)]
#[command(about = "Directory authentication gateway", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (TOML)
    #[arg(short, long, global = true, env = "DIRAUTH_CONFIG")]
    config: Option<String>,

    /// Bind address
    #[arg(long, env = "DIRAUTH_BIND_ADDRESS")]
    bind: Option<String>,

    /// Port number
    #[arg(short, long, env = "DIRAUTH_PORT")]
    port: Option<u16>,

    /// Directory server host
    #[arg(long, env = "DIRAUTH_LDAP_HOST")]
    ldap_host: Option<String>,

    /// Directory domain appended to usernames when binding
    #[arg(long, env = "DIRAUTH_LDAP_DOMAIN")]
    domain: Option<String>,

    /// Search base DN
    #[arg(long, env = "DIRAUTH_LDAP_BASE_DN")]
    base_dn: Option<String>,

    /// Service account principal used for profile lookups and listings
    #[arg(long, env = "DIRAUTH_SERVICE_PRINCIPAL")]
    service_principal: Option<String>,

    /// Search profiles on the user's own session instead of the service account
    #[arg(long)]
    bound_user_lookup: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DIRAUTH_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format (pretty, json)
    #[arg(long, env = "DIRAUTH_LOG_FORMAT")]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Server,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("dirauth {}", dirauth_core::VERSION);
        return Ok(());
    }

    let config = load_config(cli)?;
    init_logging(&config);

    print_banner();
    run_server(config).await
}

/// File (if any), then `DIRAUTH_*` variables, then command-line flags
fn load_config(cli: Cli) -> anyhow::Result<GatewayConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = GatewayConfig::from_file(path)?;
            config.apply_env(|key| std::env::var(key).ok());
            config
        }
        None => GatewayConfig::from_env(),
    };

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = cli.ldap_host {
        config.directory.host = host;
    }
    if let Some(domain) = cli.domain {
        config.directory.domain = domain;
    }
    if let Some(base_dn) = cli.base_dn {
        config.directory.base_dn = base_dn;
    }
    if let Some(principal) = cli.service_principal {
        config.directory.service_principal = principal;
    }
    if cli.bound_user_lookup {
        config.directory.profile_lookup = ProfileLookup::BoundUser;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }

    config.validate()?;
    Ok(config)
}

fn init_logging(config: &GatewayConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.logging.format == "json" {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

fn print_banner() {
    println!(
        r#"
    ____  _                 _   _
   |  _ \(_)_ __ __ _ _   _| |_| |__
   | | | | | '__/ _` | | | | __| '_ \
   | |_| | | | | (_| | |_| | |_| | | |
   |____/|_|_|  \__,_|\__,_|\__|_| |_|

   Directory Authentication Gateway
   Version: {}
"#,
        dirauth_core::VERSION
    );
}

async fn run_server(config: GatewayConfig) -> anyhow::Result<()> {
    info!("Starting Dirauth gateway...");
    info!(
        "Directory: {} (domain {})",
        config.directory.url(),
        config.directory.domain
    );

    let server = GatewayServer::new(config);
    server.run().await?;

    Ok(())
}

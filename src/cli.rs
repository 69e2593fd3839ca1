use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_ENVIRONMENT;

#[derive(Parser, Debug)]
#[command(
    name = "phonedesk",
    version,
    about = "Browse free phone numbers and register endpoints"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(long, global = true, help = "Config file (default: <config dir>/phonedesk/config.toml)")]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

/// Selects a connection through admin discovery
#[derive(Args, Debug, Clone)]
pub struct Target {
    #[arg(long, default_value = DEFAULT_ENVIRONMENT, help = "Environment from the config file")]
    pub env: String,
    #[arg(long, help = "Organization name, domain or id")]
    pub org: String,
    #[arg(long, help = "Connection id")]
    pub connection: String,
    #[arg(long, help = "Workspace id (default: the one owning the connection)")]
    pub workspace: Option<String>,
    #[arg(long, help = "Provider (default: the connection's provider)")]
    pub provider: Option<String>,
}

/// Optional discovery selection; static `[api]` mode when `--org` is absent
#[derive(Args, Debug, Clone)]
pub struct DiscoveryArgs {
    #[arg(long, requires = "connection", help = "Organization (discovery mode)")]
    pub org: Option<String>,
    #[arg(long, requires = "org", help = "Connection id (discovery mode)")]
    pub connection: Option<String>,
    #[arg(long)]
    pub workspace: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    #[arg(long, default_value = DEFAULT_ENVIRONMENT)]
    pub env: String,
}

impl DiscoveryArgs {
    pub fn into_target(self) -> Option<Target> {
        match (self.org, self.connection) {
            (Some(org), Some(connection)) => Some(Target {
                env: self.env,
                org,
                connection,
                workspace: self.workspace,
                provider: self.provider,
            }),
            _ => None,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch free numbers for the configured connection
    Fetch {
        #[arg(long, help = "API URL (base or .../phone-numbers)")]
        url: Option<String>,
        #[arg(long, help = "Bearer token")]
        token: Option<String>,
        #[arg(long, help = "Page size")]
        limit: Option<usize>,
        #[arg(long, default_value_t = false, help = "Keep a CSV snapshot of the result")]
        save_csv: bool,
        #[arg(long, default_value_t = 20, help = "Numbers to print (0 for all)")]
        preview: usize,
    },
    /// List organization names
    Orgs {
        #[arg(long, default_value = DEFAULT_ENVIRONMENT)]
        env: String,
    },
    /// List workspace connections of an organization
    Connections {
        #[arg(long)]
        org: String,
        #[arg(long, default_value = DEFAULT_ENVIRONMENT)]
        env: String,
    },
    /// Fetch free numbers for a discovered connection
    Numbers {
        #[command(flatten)]
        target: Target,
        #[arg(long, help = "Only show numbers containing this text")]
        search: Option<String>,
        #[arg(long, default_value_t = false)]
        save_csv: bool,
    },
    /// Check whether numbers are free
    Check {
        #[arg(required = true)]
        numbers: Vec<String>,
        #[arg(
            long,
            default_value_t = false,
            conflicts_with = "org",
            help = "Use the CSV snapshot instead of a live fetch"
        )]
        csv: bool,
        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
    /// Register numbers as endpoints
    Create {
        #[arg(required = true)]
        numbers: Vec<String>,
        #[arg(long, help = "Base URL the endpoints resource hangs off")]
        base_url: Option<String>,
        #[arg(long)]
        token: Option<String>,
        #[command(flatten)]
        discovery: DiscoveryArgs,
        #[arg(long, default_value_t = false, help = "Only create numbers that are currently free")]
        check: bool,
    },
    /// Prefix statistics over free numbers
    Stats {
        #[arg(
            long,
            default_value_t = false,
            conflicts_with = "org",
            help = "Use the CSV snapshot instead of a live fetch"
        )]
        csv: bool,
        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
}

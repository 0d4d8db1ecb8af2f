//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// ValutaTrade Hub - simulated currency portfolio with cached exchange rates.
#[derive(Parser, Debug)]
#[command(name = "valuta-hub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // === Global flags ===
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit JSON logs to stderr
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (TOML)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding users, portfolios and rate caches
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account
    Register {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// Log in; the session is kept until `logout`
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },

    /// End the current session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Add USD to the wallet
    Deposit {
        #[arg(long)]
        amount: f64,
    },

    /// Buy a currency with USD
    Buy {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: f64,
        /// Use cached rates only
        #[arg(long)]
        offline: bool,
    },

    /// Sell a currency for USD
    Sell {
        #[arg(long)]
        currency: String,
        #[arg(long)]
        amount: f64,
        /// Use cached rates only
        #[arg(long)]
        offline: bool,
    },

    /// Show wallets valued in a base currency
    ShowPortfolio {
        #[arg(long, default_value = "USD")]
        base: String,
        /// Use cached rates only
        #[arg(long)]
        offline: bool,
    },

    /// Show the exchange rate between two currencies
    GetRate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Use cached rates only, never call the APIs
        #[arg(long)]
        offline: bool,
    },

    /// List supported currencies
    ListCurrencies,

    /// Fetch fresh rates from the APIs
    UpdateRates {
        /// Only this source (coingecko, exchangerate)
        #[arg(long)]
        source: Option<String>,
    },

    /// Show cached rates
    ShowRates {
        /// Only rows for this currency
        #[arg(long)]
        currency: Option<String>,
        /// The N most expensive cryptocurrencies
        #[arg(long)]
        top: Option<usize>,
        #[arg(long, default_value = "USD")]
        base: String,
    },

    /// Refresh rates periodically until Ctrl-C
    Schedule {
        /// Seconds between updates (default from config)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        interval: Option<u64>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_get_rate_with_offline() {
        let cli = Cli::parse_from(["valuta-hub", "get-rate", "--from", "btc", "--to", "usd", "--offline"]);
        match cli.command {
            Commands::GetRate { from, to, offline } => {
                assert_eq!(from, "btc");
                assert_eq!(to, "usd");
                assert!(offline);
            }
            other => panic!("Expected GetRate, got: {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["valuta-hub", "show-rates", "--top", "2", "-v", "--data-dir", "/tmp/x"]);
        assert!(cli.verbose);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::ShowRates { top, base, .. } => {
                assert_eq!(top, Some(2));
                assert_eq!(base, "USD");
            }
            other => panic!("Expected ShowRates, got: {other:?}"),
        }
    }
}

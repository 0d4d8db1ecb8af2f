//! valuta-hub - ValutaTrade Hub command line.

#![forbid(unsafe_code)]

mod args;
mod logging;
mod render;

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use args::{Cli, Commands};
use valuta_hub_core::config::HubConfig;
use valuta_hub_core::services::resolver::RefreshPolicy;
use valuta_hub_core::ValutaHub;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = logging::resolve_level(
        cli.log_level.as_deref(),
        logging::parse_log_level_from_env(),
        cli.verbose,
    );
    let format = if cli.json_logs {
        logging::LogFormat::Json
    } else {
        logging::parse_log_format_from_env().unwrap_or_default()
    };
    logging::init(level, format, logging::parse_log_file_from_env());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn policy(offline: bool) -> RefreshPolicy {
    if offline {
        RefreshPolicy::CacheOnly
    } else {
        RefreshPolicy::RefreshOnMiss
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = HubConfig::load(cli.config.as_deref(), cli.data_dir.as_deref())
        .context("Failed to load configuration")?;
    let hub = ValutaHub::new(config)?;

    match cli.command {
        Commands::Register { username, password } => {
            let user = hub.register(&username, &password)?;
            println!(
                "User '{}' registered (id={}). Log in with: login --username {} --password ****",
                user.username, user.user_id, user.username
            );
        }

        Commands::Login { username, password } => {
            let user = hub.login(&username, &password)?;
            println!("Logged in as '{}'", user.username);
        }

        Commands::Logout => {
            if hub.logout()? {
                println!("Logged out");
            } else {
                println!("Nobody is logged in");
            }
        }

        Commands::Whoami => {
            let session = hub.whoami()?;
            println!(
                "{} (id={}), logged in at {}",
                session.username,
                session.user_id,
                valuta_hub_core::models::timestamp::format(&session.logged_in_at)
            );
        }

        Commands::Deposit { amount } => {
            let receipt = hub.deposit(amount)?;
            println!("{}", render::deposit_line(&receipt));
        }

        Commands::Buy {
            currency,
            amount,
            offline,
        } => {
            let receipt = hub.buy(&currency, amount, policy(offline)).await?;
            println!("{}", render::buy_line(&receipt));
        }

        Commands::Sell {
            currency,
            amount,
            offline,
        } => {
            let receipt = hub.sell(&currency, amount, policy(offline)).await?;
            println!("{}", render::sell_line(&receipt));
        }

        Commands::ShowPortfolio { base, offline } => {
            let session = hub.whoami()?;
            let summary = hub.portfolio_summary(&base, policy(offline)).await?;
            println!("{}", render::portfolio_table(&session.username, &summary));
        }

        Commands::GetRate { from, to, offline } => {
            let rate = hub.get_rate(&from, &to, policy(offline)).await?;
            println!("{}", render::rate_line(&rate));
        }

        Commands::ListCurrencies => {
            println!("{}", render::currencies_list(&hub.list_currencies()));
        }

        Commands::UpdateRates { source } => {
            let report = hub.update_rates(source.as_deref()).await?;
            println!("{}", render::update_summary(&report));
            if !report.ok {
                anyhow::bail!("No rates were updated");
            }
        }

        Commands::ShowRates {
            currency,
            top,
            base,
        } => {
            let rows = hub.show_rates(currency.as_deref(), top, &base)?;
            let snapshot = hub.rates_snapshot();
            if let Some(ts) = snapshot.last_refresh {
                println!(
                    "Rates from cache (updated at {}):",
                    valuta_hub_core::models::timestamp::format(&ts)
                );
            }
            println!("{}", render::rates_table(&rows));
        }

        Commands::Schedule { interval } => {
            let scheduler = hub.scheduler(interval.map(Duration::from_secs));
            scheduler.start();
            println!(
                "Updating rates every {}s. Press Ctrl-C to stop.",
                scheduler.interval().as_secs()
            );
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            scheduler.stop().await;
            println!("Scheduler stopped");
        }
    }

    Ok(())
}

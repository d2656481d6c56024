// SPDX-FileCopyrightText: 2026 Styleforge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Styleforge - chat-driven AI image generation.
//!
//! This is the binary entry point: configuration, tracing, and the
//! administrative balance commands.

use clap::{Parser, Subcommand};
use styleforge_catalog::StyleCatalog;
use styleforge_config::StyleforgeConfig;
use styleforge_core::{AccountId, StyleforgeError};
use styleforge_ledger::BalanceLedger;
use styleforge_storage::{Database, queries};
use tracing_subscriber::EnvFilter;

/// Styleforge - chat-driven AI image generation.
#[derive(Parser, Debug)]
#[command(name = "styleforge", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the loaded configuration summary and style catalog.
    Status,
    /// Read or adjust an account balance.
    Balance {
        /// Numeric account id.
        account: i64,
        /// Set the balance to this exact amount.
        #[arg(long)]
        set: Option<f64>,
        /// Add this amount to the balance.
        #[arg(long, conflicts_with = "set")]
        credit: Option<f64>,
    },
    /// Show or reset an account's generation overrides.
    Overrides {
        /// Numeric account id.
        account: i64,
        /// Remove the overrides, reverting the account to the defaults.
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match styleforge_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            styleforge_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config);

    if let Err(e) = run(cli, config).await {
        eprintln!("styleforge: {e}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the configured `service.log_level`.
fn init_tracing(config: &StyleforgeConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli, config: StyleforgeConfig) -> Result<(), StyleforgeError> {
    match cli.command {
        Some(Commands::Status) => {
            let catalog = StyleCatalog::from_config(&config);
            println!("service: {}", config.service.name);
            println!("database: {}", config.storage.database_path);
            println!("endpoints: {:?}", config.generation.endpoints);
            println!(
                "cost per job: {:.2}, starting balance: {:.2}",
                config.billing.cost_per_job, config.billing.starting_balance
            );
            println!("styles:");
            for style in catalog.primary_styles() {
                println!("  {} ({}, weight {})", style.name, style.id, style.weight);
            }
            println!("secondary styles:");
            for style in catalog.secondary_styles() {
                println!("  {} ({}, weight {})", style.name, style.id, style.weight);
            }
            Ok(())
        }
        Some(Commands::Balance {
            account,
            set,
            credit,
        }) => {
            let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;
            let ledger = BalanceLedger::new(db.clone(), &config.billing);
            let account = AccountId(account);

            if let Some(amount) = set {
                ledger.set_balance(account, amount).await?;
            } else if let Some(amount) = credit {
                ledger.credit(account, amount).await?;
            }

            let balance = ledger.balance(account).await?;
            println!("account {account}: balance {balance:.2}");
            db.close().await?;
            Ok(())
        }
        Some(Commands::Overrides { account, clear }) => {
            let db = Database::open(&config.storage.database_path, config.storage.wal_mode).await?;

            if clear {
                queries::overrides::clear_overrides(&db, account).await?;
            }

            match queries::overrides::get_overrides(&db, account).await? {
                Some(row) => {
                    println!("account {account}: overrides");
                    if let Some(size) = &row.image_size {
                        println!("  image_size: {size}");
                    }
                    if let Some(steps) = row.steps {
                        println!("  steps: {steps}");
                    }
                    if let Some(scale) = row.guidance_scale {
                        println!("  guidance_scale: {scale}");
                    }
                    if let Some(count) = row.image_count {
                        println!("  image_count: {count}");
                    }
                }
                None => println!("account {account}: no overrides (defaults apply)"),
            }
            db.close().await?;
            Ok(())
        }
        None => {
            println!("styleforge: use --help for available commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_balance_flags() {
        let cli = Cli::try_parse_from(["styleforge", "balance", "42", "--credit", "5"]).unwrap();
        match cli.command {
            Some(Commands::Balance {
                account,
                set,
                credit,
            }) => {
                assert_eq!(account, 42);
                assert_eq!(set, None);
                assert_eq!(credit, Some(5.0));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_overrides_clear() {
        let cli = Cli::try_parse_from(["styleforge", "overrides", "42", "--clear"]).unwrap();
        match cli.command {
            Some(Commands::Overrides { account, clear }) => {
                assert_eq!(account, 42);
                assert!(clear);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_set_and_credit_together() {
        let result =
            Cli::try_parse_from(["styleforge", "balance", "42", "--set", "1", "--credit", "2"]);
        assert!(result.is_err());
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config =
            styleforge_config::load_and_validate().expect("default config should be valid");
        assert_eq!(config.service.name, "styleforge");
    }
}

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clickrelay::config::Config;
use clickrelay::models::{EventName, SettingsUpdate, UpsertOrderRequest};
use clickrelay::storage::{self, load_settings_for_update};

#[derive(Parser)]
#[command(name = "clickrelay-admin")]
#[command(about = "Clickrelay settings management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change tracking settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// List the accepted event names
    Events,
    /// Manage orders used for conversion values
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the current settings (token masked)
    Show,
    /// Update settings; omitted options keep their value
    Set {
        /// Ad account (pixel) id, non-digits are dropped
        #[arg(long)]
        account_id: Option<String>,
        /// Conversions API access token
        #[arg(long)]
        access_token: Option<String>,
        /// One of the names printed by `events`
        #[arg(long)]
        event_name: Option<String>,
        /// Test event code; pass an empty string to clear it
        #[arg(long)]
        test_event_code: Option<String>,
        #[arg(long)]
        ecommerce: Option<bool>,
        #[arg(long)]
        include_user_data: Option<bool>,
        #[arg(long)]
        debug_logging: Option<bool>,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// Insert or replace an order
    Put {
        id: i64,
        /// ISO 4217 currency code
        currency: String,
        total: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let storage = storage::connect(&config.database).await?;

    match cli.command {
        Commands::Settings {
            action: SettingsAction::Show,
        } => {
            let settings = storage.load_settings().await?;
            println!("{}", serde_json::to_string_pretty(&settings.masked())?);
        }
        Commands::Settings {
            action:
                SettingsAction::Set {
                    account_id,
                    access_token,
                    event_name,
                    test_event_code,
                    ecommerce,
                    include_user_data,
                    debug_logging,
                },
        } => {
            let current = load_settings_for_update(storage.as_ref()).await?;
            let settings = SettingsUpdate {
                account_id,
                access_token,
                event_name,
                test_event_code,
                ecommerce_enabled: ecommerce,
                include_user_data,
                debug_logging,
            }
            .apply(&current)?;
            storage.save_settings(&settings).await?;

            println!("✓ Settings saved");
            if !settings.is_complete() {
                println!("⚠ Account id and access token are both required before conversions are sent");
            }
        }
        Commands::Events => {
            println!("{:<24} {}", "Value", "Label");
            println!("{}", "-".repeat(48));
            for event in EventName::ALL {
                println!("{:<24} {}", event.as_str(), event.label());
            }
        }
        Commands::Order {
            action: OrderAction::Put { id, currency, total },
        } => {
            let order = UpsertOrderRequest { currency, total }.into_order(id)?;
            storage
                .upsert_order(&order)
                .await
                .with_context(|| format!("failed to store order {id}"))?;
            println!("✓ Stored order {} ({} {:.2})", order.id, order.currency, order.total);
        }
    }

    Ok(())
}

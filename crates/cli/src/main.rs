//! Counsel CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Put a template in the cart
//! counsel cart add --id t1 --title "Rental Agreement" --category Property --price 500
//!
//! # Pay for the cart
//! counsel checkout --name "Asha Rao" --email asha@example.in --phone 9876543210
//!
//! # List completed purchases and download one again
//! counsel purchases --email asha@example.in
//! counsel fulfill --order 665f --item t1 --email asha@example.in
//! ```
//!
//! # Commands
//!
//! - `cart` - List and edit the local cart
//! - `checkout` - Place an order and pay through the terminal gateway
//! - `purchases` - Completed orders for an email
//! - `order show` - One order by id
//! - `fulfill` - Download or contact for a purchased item

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::print_stdout)]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use counsel_storefront::StorefrontConfig;
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "counsel")]
#[command(author, version, about = "Counsel storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the local cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Place an order for the cart and pay for it
    Checkout {
        /// Full name (letters and spaces)
        #[arg(short, long)]
        name: String,

        /// Email address for the receipt and downloads
        #[arg(short, long)]
        email: String,

        /// Mobile number
        #[arg(short, long)]
        phone: String,
    },
    /// List completed purchases for an email
    Purchases {
        #[arg(short, long)]
        email: String,
    },
    /// Look up orders
    Order {
        #[command(subcommand)]
        action: OrderAction,
    },
    /// Fulfill a purchased item again (download, schedule or contact)
    Fulfill {
        /// Order id
        #[arg(short, long)]
        order: String,

        /// Item id within the order
        #[arg(short, long)]
        item: String,

        /// Email the order was placed with
        #[arg(short, long)]
        email: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show cart contents and subtotal
    List,
    /// Add an item (merges with an existing line of the same id)
    Add {
        #[arg(long)]
        id: String,

        #[arg(long)]
        title: String,

        #[arg(long, default_value = "")]
        category: String,

        /// Unit price in major units
        #[arg(long)]
        price: Decimal,

        #[arg(long, default_value_t = 1)]
        quantity: u32,

        /// Mark as a custom service with this option name
        #[arg(long)]
        custom: Option<String>,

        /// Scheduling link for a custom service
        #[arg(long)]
        schedule_link: Option<String>,

        /// Contact address for a custom service
        #[arg(long)]
        contact_email: Option<String>,

        /// Catalog file name
        #[arg(long)]
        file_name: Option<String>,
    },
    /// Remove a line
    Remove {
        #[arg(long)]
        id: String,
    },
    /// Change a line's quantity by a signed amount (never below 1)
    Qty {
        #[arg(long)]
        id: String,

        #[arg(long, allow_hyphen_values = true)]
        delta: i64,
    },
    /// Empty the cart
    Clear,
}

#[derive(Subcommand)]
enum OrderAction {
    /// Show one order
    Show {
        #[arg(long)]
        id: String,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing_subscriber::fmt::init();
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    // Sentry before the subscriber so the tracing layer has a client
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "counsel_storefront=info,counsel_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    // No process::exit past this point: the Sentry guard flushes on drop
    ExitCode::from(finish(run(cli, config).await))
}

/// Report a command's result and pick the exit status.
fn finish(result: Result<(), commands::CommandError>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            println!("{}", e.user_message());
            1
        }
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Cart { action } => {
            let cart = commands::cart::open(&config);
            match action {
                CartAction::List => commands::cart::list(&cart)?,
                CartAction::Add {
                    id,
                    title,
                    category,
                    price,
                    quantity,
                    custom,
                    schedule_link,
                    contact_email,
                    file_name,
                } => commands::cart::add(
                    &cart,
                    &config,
                    commands::cart::NewItem {
                        id,
                        title,
                        category,
                        price,
                        quantity,
                        custom,
                        schedule_link,
                        contact_email,
                        file_name,
                    },
                )?,
                CartAction::Remove { id } => commands::cart::remove(&cart, &id)?,
                CartAction::Qty { id, delta } => commands::cart::update_quantity(&cart, &id, delta)?,
                CartAction::Clear => commands::cart::clear(&cart)?,
            }
        }
        Commands::Checkout { name, email, phone } => {
            commands::checkout::run(&config, name, email, phone).await?;
        }
        Commands::Purchases { email } => commands::purchases::list(&config, &email).await?,
        Commands::Order { action } => match action {
            OrderAction::Show { id } => commands::purchases::show_order(&config, &id).await?,
        },
        Commands::Fulfill { order, item, email } => {
            commands::purchases::fulfill(&config, &order, &item, &email).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_command_returns_status() {
        assert_eq!(finish(Ok(())), 0);
        assert_eq!(
            finish(Err(commands::CommandError::Input("Unknown item".to_string()))),
            1
        );
    }
}

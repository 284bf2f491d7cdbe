//! # Till Session Runner
//!
//! Seeds a catalog, replays a scripted cart session and prints the settled
//! cart.
//!
//! ## Usage
//! ```bash
//! # Built-in demo session
//! cargo run -p till-cli
//!
//! # Replay a seed file
//! cargo run -p till-cli -- --seed ./session.toml
//!
//! # Explicit config file
//! cargo run -p till-cli -- --config ./till.toml
//! ```
//!
//! ## Flow
//! ```text
//! TillConfig::load ──► init_tracing ──► SeedFile ──► Catalog
//!                                                       │
//!                     stdout ◄── CartTotals ◄── replay(Cart, steps)
//! ```

mod config;
mod error;
mod seed;
mod session;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use till_core::{Cart, Catalog, CartTotals};

use crate::config::{TillConfig, DEFAULT_LOG_FILTER};
use crate::error::{CliError, CliResult};
use crate::seed::SeedFile;

// =============================================================================
// Arguments
// =============================================================================

const USAGE: &str = "\
Till Session Runner

Usage: till [OPTIONS]

Options:
  -c, --config <PATH>  Config file (default: platform config dir/till.toml)
  -s, --seed <PATH>    Seed file to replay, .toml or .json (default: demo)
  -h, --help           Show this help message";

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    config: Option<PathBuf>,
    seed: Option<PathBuf>,
    help: bool,
}

impl Args {
    /// Parses flags, excluding the program name.
    fn parse<I>(args: I) -> CliResult<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut parsed = Args::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => parsed.config = Some(Self::value(&arg, args.next())?),
                "--seed" | "-s" => parsed.seed = Some(Self::value(&arg, args.next())?),
                "--help" | "-h" => parsed.help = true,
                other => {
                    return Err(CliError::InvalidArgument(format!("unknown flag: {}", other)))
                }
            }
        }

        Ok(parsed)
    }

    fn value(flag: &str, next: Option<String>) -> CliResult<PathBuf> {
        match next {
            Some(value) if !value.starts_with('-') => Ok(PathBuf::from(value)),
            _ => Err(CliError::InvalidArgument(format!("{} requires a path", flag))),
        }
    }
}

// =============================================================================
// Entry Point
// =============================================================================

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Session failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let args = Args::parse(env::args().skip(1))?;
    if args.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut config = TillConfig::load(args.config)?;
    if let Some(seed) = args.seed {
        config.seed.path = Some(seed);
        config.validate()?;
    }

    init_tracing(&config.log.filter);
    info!(config = ?config.source, "Starting Till session runner");

    let seed = match config.seed.path {
        Some(ref path) => SeedFile::load(path)?,
        None => {
            info!("No seed file configured, using the demo session");
            SeedFile::demo()
        }
    };

    let catalog = seed.build_catalog()?;
    info!(
        products = catalog.products().len(),
        discounts = catalog.discounts().len(),
        promotions = catalog.promotions().len(),
        "Catalog seeded"
    );

    let mut cart = Cart::new();
    session::replay(&catalog, &mut cart, &seed.steps)?;

    let totals = cart.totals(&catalog)?;
    info!(
        subtotal = totals.subtotal.cents(),
        total = totals.total.cents(),
        "Session settled"
    );

    if config.output.json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
    } else {
        print!("{}", render_summary(&catalog, &totals));
    }

    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise the configured filter, falling back to the
/// default when that filter does not parse. Logs go to stderr so stdout
/// carries only the summary.
fn init_tracing(filter: &str) {
    let mut rejected = None;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|e| {
            rejected = Some(e);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        });

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(e) = rejected {
        warn!(filter = %filter, error = %e, "Invalid log filter, using default");
    }
}

// =============================================================================
// Text Summary
// =============================================================================

fn render_summary(catalog: &Catalog, totals: &CartTotals) -> String {
    let mut out = format!("Cart {}\n", totals.cart_id);

    for item in &totals.items {
        let name = catalog
            .product(item.product_id())
            .map(|p| p.name().to_string())
            .unwrap_or_else(|_| item.product_id().to_string());
        out.push_str(&format!(
            "  {:<24} x{:<6} free {:<6}\n",
            name,
            item.quantity(),
            item.free_quantity()
        ));
    }

    out.push_str(&format!(
        "Items: {} unique, {} total\n",
        totals.unique_count, totals.total_items
    ));
    out.push_str(&format!("Subtotal: {}\n", totals.subtotal));
    if !totals.discounts.is_empty() {
        out.push_str(&format!("Discounts: {}\n", totals.discounts.join(", ")));
    }
    out.push_str(&format!("Total: {}\n", totals.total));
    out
}

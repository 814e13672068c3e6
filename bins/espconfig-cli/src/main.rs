//! Command-line front end for espconfig files.
//!
//! Operates on a host directory laid out like the device's flash
//! filesystem, e.g. an unpacked LittleFS image:
//!
//! ```text
//! espconfig --root ./flash --app myapp set wifi_ssid HomeNet
//! espconfig --root ./flash --app myapp get wifi_ssid
//! espconfig --root ./flash --device relay1 list
//! ```
//!
//! Mutating commands save immediately.

use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use espconfig_core::ConfigStore;
use espconfig_hostfs::HostFs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "espconfig", about = "Inspect and edit espconfig files", version)]
struct Cli {
    /// Host directory standing in for the flash filesystem root.
    #[arg(long, default_value = "./flash", env = "ESPCONFIG_ROOT")]
    root: PathBuf,

    /// Application name selecting `/config/<app>.cfg`.
    #[arg(long, default_value = "espconfig", env = "ESPCONFIG_APP")]
    app: String,

    /// Use the device-scoped config for this device instead of `--app`.
    #[arg(long)]
    device: Option<String>,

    /// Create the root directory if it does not exist.
    #[arg(long)]
    format: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the value of an entry.
    Get {
        name: String,
        /// Printed when the entry is absent.
        #[arg(long, default_value = "")]
        default: String,
    },
    /// Set an entry and save.
    Set { name: String, value: String },
    /// Remove an entry and save.
    Unset { name: String },
    /// Remove every entry and save.
    Clear,
    /// Print every entry as `name=value`.
    List,
    /// Print every entry as JSON.
    Dump,
    /// Print the backing file path.
    Path,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let fs = if cli.format {
        HostFs::with_format(&cli.root)
    } else {
        HostFs::new(&cli.root)
    };
    let mut store = match &cli.device {
        Some(device) => ConfigStore::for_device(device, fs),
        None => ConfigStore::new(cli.app.clone(), fs),
    };
    store.setup();

    if !store.littlefs_mounted() {
        bail!(
            "{} is not a usable filesystem root (pass --format to create it)",
            cli.root.display()
        );
    }

    run(cli.command, &mut store)
}

fn run(command: Command, store: &mut ConfigStore<HostFs>) -> anyhow::Result<()> {
    match command {
        Command::Get { name, default } => {
            println!("{}", store.get_value_or(&name, &default));
        }
        Command::Set { name, value } => {
            store.set_value(name, value);
        }
        Command::Unset { name } => {
            if !store.unset_value(&name) {
                tracing::info!(%name, "Entry not present");
            }
        }
        Command::Clear => store.unset_all(),
        Command::List => {
            for entry in store.entries() {
                println!("{}={}", entry.name, entry.value);
            }
        }
        Command::Dump => {
            println!("{}", serde_json::to_string_pretty(store.entries())?);
        }
        Command::Path => {
            println!("{}", store.file_name());
        }
    }

    if store.has_changed() {
        let path = store.file_name();
        store.save().with_context(|| format!("saving {}", path))?;
    }
    Ok(())
}

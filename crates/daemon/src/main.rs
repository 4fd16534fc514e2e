//! barcode-daemon
//!
//! Hotplug-aware reader for keyboard-emulation barcode scanners and PN533
//! NFC readers. Scans are printed to stdout, diagnostics go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use common::{ScanSink, StdoutSink, create_hotplug_bridge, setup_logging};
use daemon::adapters::{DeviceLauncher, SpawnRequest};
use daemon::config::{self, DaemonConfig};
use daemon::hotplug::{self, Filters, spawn_decision, spawn_hotplug_monitor};
use daemon::registry::TaskRegistry;
use daemon::supervisor::Supervisor;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "barcode-daemon")]
#[command(
    author,
    version,
    about = "Barcode daemon - Print scans from hotplugged barcode scanners and NFC readers"
)]
#[command(long_about = "
Watches for barcode scanners and NFC readers, starts a reader for every
device matching the configured vendor/product ids, and prints each scan to
stdout as:

    <identity> found <label> : <payload>

where <identity> comes from CB_BARCODE_IDENTITY and <label> is `bar` for
barcodes and `NFC` for contactless tags.

EXAMPLES:
    # Keyboard-style scanner, any product of vendor 05e0
    barcode-daemon --hid-vendor-product 05e0

    # PN533 reader plus barcodes typed on stdin
    barcode-daemon --nfc-vendor-product 04cc:2533 --read-stdin

    # Show attached input and usb devices with their ids
    barcode-daemon --list-devices

CONFIGURATION:
    The daemon looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/barcode-daemon/daemon.toml
    3. /etc/barcode-daemon/daemon.toml
    4. Built-in defaults
    Command-line flags override values from the file.
")]
struct Args {
    /// Keyboard-emulation scanner to read, as vvvv[:pppp] in hex
    #[arg(short = 'H', long, value_name = "VID[:PID]")]
    hid_vendor_product: Option<String>,

    /// NFC reader to read, as vvvv[:pppp] in hex
    #[arg(short = 'N', long, value_name = "VID[:PID]")]
    nfc_vendor_product: Option<String>,

    /// Serial scanner (reserved, not supported yet)
    #[arg(short = 'S', long, value_name = "SPEC")]
    serial: Option<String>,

    /// Also read newline-separated barcodes from stdin
    #[arg(short, long)]
    read_stdin: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Save the effective configuration and exit
    #[arg(long)]
    save_config: bool,

    /// List input and usb devices and exit
    #[arg(long)]
    list_devices: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

impl Args {
    /// Override config values with the flags given; bad filters are errors
    fn apply_to(&self, config: &mut DaemonConfig) -> Result<()> {
        if let Some(hid) = &self.hid_vendor_product {
            config.scanners.hid_vendor_product =
                Some(config::parse_filter("--hid-vendor-product", hid)?);
        }
        if let Some(nfc) = &self.nfc_vendor_product {
            config.scanners.nfc_vendor_product =
                Some(config::parse_filter("--nfc-vendor-product", nfc)?);
        }
        if let Some(serial) = &self.serial {
            config.scanners.serial = Some(serial.clone());
        }
        if self.read_stdin {
            config.scanners.read_stdin = true;
        }
        if let Some(level) = &self.log_level {
            config.daemon.log_level = level.clone();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DaemonConfig::load(Some(path.clone())).context("Failed to load configuration")?,
        None => DaemonConfig::load_or_default().context("Failed to load configuration")?,
    };
    args.apply_to(&mut config).context("Invalid command line")?;
    config.validate().context("Invalid configuration")?;

    if args.save_config {
        let path = args
            .config
            .as_deref()
            .map(config::expand_path)
            .unwrap_or_else(DaemonConfig::default_path);
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    setup_logging(&config.daemon.log_level).context("Failed to setup logging")?;

    info!("barcode-daemon v{}", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", config.daemon.log_level);

    if args.list_devices {
        return list_devices_mode(&config);
    }

    if let Some(serial) = &config.scanners.serial {
        warn!("Serial scanners are not supported, ignoring '{}'", serial);
    }

    spawn_interrupt_handler().context("Failed to install signal handlers")?;

    run_daemon(config).await
}

/// Print attached input and usb devices and exit
fn list_devices_mode(config: &DaemonConfig) -> Result<()> {
    let filters = filters_from(config);
    let devices = hotplug::list_devices().context("Failed to enumerate devices")?;
    let devices: Vec<_> = devices
        .into_iter()
        .filter(|d| d.device_path.is_some() && d.vendor_id.is_some())
        .collect();

    if devices.is_empty() {
        println!("No input or usb devices found.");
        return Ok(());
    }

    println!("Found {} device(s):\n", devices.len());
    for device in devices {
        let marker = match spawn_decision(&device, &filters) {
            Some(request) => format!("  <- {} scanner", request.kind),
            None => String::new(),
        };
        println!(
            "  {:<5} {}:{}  {}{}",
            device.subsystem.as_str(),
            device.vendor_id.as_deref().unwrap_or("????"),
            device.product_id.as_deref().unwrap_or("????"),
            device
                .device_path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            marker
        );
    }

    Ok(())
}

/// Exit immediately on Ctrl+C or SIGTERM; running adapters are not drained
fn spawn_interrupt_handler() -> Result<()> {
    let mut sigterm = unix_signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            result = signal::ctrl_c() => match result {
                Ok(()) => info!("Received Ctrl+C, exiting"),
                Err(e) => {
                    error!("Error waiting for Ctrl+C: {}", e);
                    return;
                }
            },
            _ = sigterm.recv() => info!("Received SIGTERM, exiting"),
        }
        std::process::exit(0);
    });

    Ok(())
}

fn filters_from(config: &DaemonConfig) -> Filters {
    Filters::new(
        config.scanners.hid_vendor_product.clone(),
        config.scanners.nfc_vendor_product.clone(),
    )
}

/// Start the configured sources and wait for every adapter to finish
async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let sink: Arc<dyn ScanSink> = Arc::new(StdoutSink::stdout());
    let filters = filters_from(&config);
    let launcher = DeviceLauncher::new(sink, config.nfc.clone(), filters.nfc.clone());
    let registry = TaskRegistry::new();
    let supervisor = Supervisor::new(filters.clone(), registry.clone(), launcher);

    if config.scanners.read_stdin {
        info!("Reading barcodes from stdin");
        supervisor.start(&SpawnRequest::stdin());
    }

    if filters.is_empty() {
        if !config.scanners.read_stdin {
            warn!("No scanner configured, nothing to do");
        }
    } else {
        if let Some(hid) = &filters.hid {
            info!("Watching for HID scanners {}", hid);
        }
        if let Some(nfc) = &filters.nfc {
            info!("Watching for NFC readers {}", nfc);
        }

        let (feed, publisher) = create_hotplug_bridge();
        let monitor =
            spawn_hotplug_monitor(publisher).context("Failed to start hotplug monitor thread")?;

        supervisor.run(feed).await;

        match monitor.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Hotplug monitor failed: {}", e),
            Err(e) => error!("Hotplug monitor thread panicked: {:?}", e),
        }
    }

    registry.join_all().await;
    info!("All adapters finished");
    Ok(())
}

mod error;
mod trigger_pin;

use clap::{Parser, ValueEnum};
use error::FirmwareResult;
use spxprobe_signer_lib::serial::DEFAULT_BAUD;
use spxprobe_signer_lib::server::{listen, write_banner};
use spxprobe_signer_lib::{
    CommandTable, SHAKE_256S_TARGET, SerialPort, TINY_TARGET, Target, TargetConfig, serve,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Partial-resign SPHINCS+ measurement target
#[derive(Parser, Debug)]
#[command(name = "spxprobe-firmware")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Serial device the measurement host is attached to
    #[arg(long, short, default_value = "/dev/ttyAMA0")]
    port: PathBuf,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD)]
    baud: u32,

    /// Serve over TCP on this address instead of the serial device
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// GPIO character device holding the trigger line
    #[arg(long, default_value = trigger_pin::DEFAULT_GPIO_CHIP_PATH)]
    gpio_chip: String,

    /// GPIO line driven high around each measured computation
    #[arg(long)]
    trigger_line: Option<u32>,

    /// Parameter set and partial-signing layers
    #[arg(long, value_enum, default_value_t = Profile::Shake256s)]
    profile: Profile,

    /// Do not write the startup banner (hosts then need --no-banner)
    #[arg(long)]
    no_banner: bool,

    /// Log every command
    #[arg(long, short)]
    verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Profile {
    /// sphincs-shake256-256s-robust, layers 5 and 6
    Shake256s,
    /// Reduced parameter set for bring-up
    Tiny,
}

impl Profile {
    fn config(self) -> TargetConfig {
        match self {
            Profile::Shake256s => SHAKE_256S_TARGET,
            Profile::Tiny => TINY_TARGET,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Err(e) = ctrlc::set_handler(|| {
        log::info!("Received Ctrl+C, shutting down...");
        std::process::exit(0);
    }) {
        log::error!("Failed to set Ctrl-C handler: {e}");
    }

    if let Err(e) = run(&cli) {
        log::error!("FATAL: {e}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> FirmwareResult<()> {
    let config = cli.profile.config();
    let mut target = Target::new(config);
    if let Some(line) = cli.trigger_line {
        let trigger = trigger_pin::open_trigger(&cli.gpio_chip, line)?;
        target = target.with_trigger(Box::new(trigger));
    } else {
        log::warn!("No trigger line configured");
    }

    let table = CommandTable::new(&config.params);
    log::debug!(
        "Commands: {}",
        table
            .commands()
            .map(|c| char::from(c.id()))
            .collect::<String>()
    );

    if let Some(address) = cli.listen {
        listen(address, &mut target, &table, !cli.no_banner)?;
        return Ok(());
    }

    let mut port = SerialPort::open(&cli.port, cli.baud)?;
    if !cli.no_banner {
        write_banner(&mut port)?;
    }
    let handled = serve(&mut port, &mut target, &table)?;
    log::info!("Serial line closed after {handled} commands");
    Ok(())
}

//! Links to the measurement target

use anyhow::{Context, Result};
use spxprobe_signer_lib::serial::{DEFAULT_BAUD, SerialPort};
use spxprobe_signer_lib::{SHAKE_256S_TARGET, TINY_TARGET, TargetClient, TargetConfig};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::PathBuf;
use std::time::Duration;

/// Byte stream to the target
pub trait Transport: Read + Write {}

impl<T: Read + Write> Transport for T {}

/// Client over whichever link was configured
pub type Client = TargetClient<Box<dyn Transport>>;

/// Build profile of the target being driven
#[derive(clap::ValueEnum, Clone, Copy, Debug, Default)]
pub enum Profile {
    /// sphincs-shake256-256s-robust, layers 5 and 6
    #[default]
    Shake256s,
    /// Reduced parameter set
    Tiny,
}

impl Profile {
    pub fn config(self) -> TargetConfig {
        match self {
            Profile::Shake256s => SHAKE_256S_TARGET,
            Profile::Tiny => TINY_TARGET,
        }
    }
}

/// How to reach the target
#[derive(clap::Args, Debug, Clone)]
pub struct LinkOptions {
    /// Serial device of the target
    #[arg(long, short, global = true, default_value = crate::constants::DEFAULT_PORT)]
    pub port: PathBuf,

    /// Serial baud rate
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// Connect over TCP to a target started with --listen
    #[arg(long, global = true)]
    pub connect: Option<SocketAddr>,

    /// Target build profile
    #[arg(long, global = true, value_enum, default_value_t = Profile::Shake256s)]
    pub profile: Profile,

    /// Expect the startup banner before the first command
    #[arg(long, global = true, conflicts_with = "no_banner")]
    pub banner: bool,

    /// Target was started with --no-banner; never wait for the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

impl LinkOptions {
    /// Whether the link starts with a banner
    ///
    /// A TCP target sends one on every accept unless started without it. A
    /// serial target sends it once at startup, so a reopened port only sees
    /// it when asked for.
    pub fn expects_banner(&self) -> bool {
        !self.no_banner && (self.banner || self.connect.is_some())
    }
}

/// Open the configured link
pub fn open(options: &LinkOptions) -> Result<Client> {
    let stream: Box<dyn Transport> = if let Some(address) = options.connect {
        let socket = TcpStream::connect_timeout(&address, Duration::from_secs(5))
            .with_context(|| format!("Failed to connect to {address}"))?;
        socket.set_nodelay(true)?;
        log::debug!("Connected to {address}");
        Box::new(socket)
    } else {
        Box::new(SerialPort::open(&options.port, options.baud)?)
    };

    let mut client = TargetClient::new(stream, options.profile.config().params);
    if options.expects_banner() {
        client.read_banner().context("Target did not send its banner")?;
    }
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        link: LinkOptions,
    }

    fn link(args: &[&str]) -> LinkOptions {
        TestCli::parse_from(std::iter::once("spxprobe").chain(args.iter().copied())).link
    }

    #[test]
    fn test_serial_banner_only_on_request() {
        assert!(!link(&[]).expects_banner());
        assert!(link(&["--banner"]).expects_banner());
    }

    #[test]
    fn test_tcp_banner_unless_disabled() {
        assert!(link(&["--connect", "127.0.0.1:4000"]).expects_banner());
        assert!(!link(&["--connect", "127.0.0.1:4000", "--no-banner"]).expects_banner());
    }

    #[test]
    fn test_banner_flags_conflict() {
        let parsed = TestCli::try_parse_from(["spxprobe", "--banner", "--no-banner"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_defaults() {
        let options = link(&[]);
        assert_eq!(options.port, PathBuf::from(crate::constants::DEFAULT_PORT));
        assert_eq!(options.baud, DEFAULT_BAUD);
        assert!(options.connect.is_none());
    }
}

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use std::path::PathBuf;

use connection::LinkOptions;
use spxprobe_signer_lib::{CacheOutcome, PackedAddress};
use utils::print_title_bar;

mod campaign;
mod connection;
mod constants;
mod progress;
mod selftest;
mod utils;

/// Measurement host for the partial-resign SPHINCS+ target
#[derive(Parser, Debug)]
#[command(name = "spxprobe")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    link: LinkOptions,

    /// Display detailed diagnostic information
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Install key material: secret seed, PRF key, public seed as hex
    InstallKey {
        /// 3N bytes of hex
        material: String,
    },
    /// Print the public root and public seed
    PublicKey,
    /// Print the secret seed and PRF key
    SecretKey,
    /// Resign at the straight layer
    SignStraight {
        /// Packed address as hex
        address: String,
    },
    /// Insert an address tag into the target cache without signing
    FillCache {
        /// Packed address as hex
        address: String,
    },
    /// Resign at the cached layer unless the address tag is cached
    SignCached {
        /// Packed address as hex
        address: String,
    },
    /// Read the last result from the signature buffer
    ReadSignature {
        /// Bytes to read; defaults to one partial resign
        #[arg(long)]
        len: Option<usize>,
    },
    /// Check the target against host-side computation
    SelfTest {
        /// Skip the checks that need the diagnostic commands
        #[arg(long)]
        no_diagnostics: bool,
    },
    /// Run a fault-injection query campaign
    Campaign {
        /// Partial signer to drive
        #[arg(long, value_enum, default_value_t = campaign::Mode::Cached)]
        mode: campaign::Mode,

        /// Independent experiments
        #[arg(long, default_value_t = 1)]
        experiments: u32,

        /// Queries per experiment
        #[arg(long, default_value_t = 1000)]
        queries: u32,

        /// Seed of the address generator
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Directory for the campaign log
        #[arg(long, default_value = constants::DEFAULT_LOG_DIR)]
        log_dir: PathBuf,
    },
    /// Print shell completion script to stdout
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let Some(command) = cli.command else {
        // No subcommand provided, print help
        Cli::command().print_help()?;
        std::process::exit(0);
    };

    if let Commands::Completions { shell } = command {
        clap_complete::generate(shell, &mut Cli::command(), "spxprobe", &mut std::io::stdout());
        return Ok(());
    }

    let target = cli.link.profile.config();
    let params = target.params;
    let mut client = progress::run_step("Connecting to target", || connection::open(&cli.link))?;

    match command {
        Commands::InstallKey { material } => {
            let material = zeroize::Zeroizing::new(utils::parse_hex(
                &material,
                params.key_material_bytes(),
            )?);
            progress::run_step("Installing key", || Ok(client.install_key(&material)?))?;
            let public = client.public_key()?;
            utils::hex_line("root", &public[..params.n]);
        }
        Commands::PublicKey => {
            let public = client.public_key()?;
            print_title_bar("Public key");
            utils::hex_line("root", &public[..params.n]);
            utils::hex_line("pub_seed", &public[params.n..]);
        }
        Commands::SecretKey => {
            let secret = client.secret_key()?;
            print_title_bar("Secret key");
            utils::warning("Secret material follows");
            utils::hex_line("sk_seed", &secret[..params.n]);
            utils::hex_line("sk_prf", &secret[params.n..]);
        }
        Commands::SignStraight { address } => {
            let packed = PackedAddress::new(utils::parse_packed_address(&address)?);
            progress::run_step(&format!("Straight resign {packed}"), || {
                Ok(client.sign_straight(packed)?)
            })?;
        }
        Commands::FillCache { address } => {
            let packed = PackedAddress::new(utils::parse_packed_address(&address)?);
            progress::run_step(&format!("Caching tag {:#04x}", packed.tag()), || {
                Ok(client.fill_cache(packed)?)
            })?;
        }
        Commands::SignCached { address } => {
            let packed = PackedAddress::new(utils::parse_packed_address(&address)?);
            match client.sign_cached(packed)? {
                CacheOutcome::Signed => utils::success(&format!("Cache miss, resigned {packed}")),
                CacheOutcome::Cached => utils::info(&format!("Cache hit for {packed}")),
            }
        }
        Commands::ReadSignature { len } => {
            let len = len.unwrap_or(params.layer_bytes());
            let bytes = progress::run_step("Reading signature buffer", || {
                Ok(client.read_signature(len)?)
            })?;
            for (index, chunk) in bytes.chunks(params.n).enumerate() {
                utils::hex_line(&format!("{index:04}"), chunk);
            }
        }
        Commands::SelfTest { no_diagnostics } => {
            print_title_bar("Self-test");
            selftest::run(&mut client, &target, !no_diagnostics)?;
        }
        Commands::Campaign {
            mode,
            experiments,
            queries,
            seed,
            log_dir,
        } => {
            print_title_bar(&format!("Campaign ({mode:?})"));
            let config = campaign::CampaignConfig {
                mode,
                experiments,
                queries,
                seed,
                log_dir,
            };
            let path = campaign::run(&mut client, &target, &config)?;
            println!(
                "  {} Log written to {}",
                "→".cyan(),
                path.display().to_string().bold()
            );
        }
        Commands::Completions { .. } => unreachable!("handled before connecting"),
    }

    Ok(())
}

//! Fault-injection query campaigns
//!
//! A campaign sends partial-resign requests for random addresses, reads
//! back every freshly computed result and groups the results by the
//! one-time key they came from. Several distinct results for one key mean a
//! computation went wrong at least once.
//!
//! In cached mode the host mirrors the target's address cache, so every
//! reply can be checked against the predicted hit or miss. When the two
//! disagree the target cache is rewritten from the mirror.

use anyhow::{Context, Result};
use chrono::Local;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spxprobe_signer_lib::{CacheOutcome, PackedAddress, TargetCache, TargetConfig};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::connection::Client;
use crate::constants::{ADDRESS_RANDOM_BYTES, ADDRESS_ZERO_PAD};
use crate::progress;

/// Which partial signer the campaign drives
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Cache-gated resign
    Cached,
    /// Unconditional resign
    Straight,
}

/// Campaign settings
#[derive(Debug, Clone)]
pub struct CampaignConfig {
    /// Partial signer to drive
    pub mode: Mode,
    /// Independent experiments
    pub experiments: u32,
    /// Queries per experiment
    pub queries: u32,
    /// Seed of the address generator
    pub seed: u64,
    /// Directory for the log file
    pub log_dir: PathBuf,
}

/// Host copy of the target cache
///
/// Applies the same check-then-insert rule as the target.
#[derive(Debug, Default)]
pub struct CacheMirror {
    cache: TargetCache,
}

impl CacheMirror {
    /// Predict whether `packed` hits, recording it on a miss
    pub fn predict(&mut self, packed: PackedAddress) -> bool {
        let tag = packed.tag();
        if self.cache.contains(tag) {
            return true;
        }
        self.cache.insert(tag);
        false
    }

    /// Tags in the order that rebuilds the same eviction order on the target
    pub fn refill_tags(&self) -> Vec<u8> {
        self.cache.iter_oldest_first().collect()
    }
}

/// Results grouped by one-time key
#[derive(Debug, Default)]
pub struct Collections {
    by_key: BTreeMap<u64, Vec<Vec<u8>>>,
}

impl Collections {
    /// Record a result for one-time key `key`
    pub fn record(&mut self, key: u64, result: Vec<u8>) {
        self.by_key.entry(key).or_default().push(result);
    }

    /// Keys with more than one distinct result
    pub fn inconsistent(&self) -> Vec<(u64, usize)> {
        self.by_key
            .iter()
            .filter_map(|(&key, results)| {
                let distinct = results.iter().collect::<BTreeSet<_>>().len();
                (distinct > 1).then_some((key, distinct))
            })
            .collect()
    }

    /// Number of results collected
    pub fn result_count(&self) -> usize {
        self.by_key.values().map(Vec::len).sum()
    }
}

/// Campaign address: zero padding followed by random bytes
pub fn random_address(rng: &mut StdRng) -> PackedAddress {
    let mut bytes = [0u8; ADDRESS_ZERO_PAD + ADDRESS_RANDOM_BYTES];
    rng.fill(&mut bytes[ADDRESS_ZERO_PAD..]);
    PackedAddress::from_be_bytes(bytes)
}

/// One-time key a partial resign signs with: the leaf one layer up
pub fn wots_key(packed: PackedAddress, tree_height: u32) -> u64 {
    let upper = packed.split(tree_height).parent(tree_height);
    PackedAddress::from_position(upper, tree_height).raw()
}

struct CampaignLog {
    writer: BufWriter<File>,
}

impl CampaignLog {
    fn create(dir: &Path) -> Result<(Self, PathBuf)> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
        let name = Local::now()
            .format("%Y-%m-%d_%H-%M-%S_spxprobe.txt")
            .to_string();
        let path = dir.join(name);
        let file =
            File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok((
            Self {
                writer: BufWriter::new(file),
            },
            path,
        ))
    }

    fn line(&mut self, message: &str) -> Result<()> {
        let now = Local::now().format("%Y/%m/%d %H:%M:%S");
        writeln!(self.writer, "{now}: {message}")?;
        log::debug!("{message}");
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Run a campaign; returns the path of its log
pub fn run(client: &mut Client, target: &TargetConfig, config: &CampaignConfig) -> Result<PathBuf> {
    let (mut log_file, path) = CampaignLog::create(&config.log_dir)?;
    log_file.line(&format!(
        "spxprobe {:?} campaign: {} experiments x {} queries, seed {}",
        config.mode, config.experiments, config.queries, config.seed
    ))?;
    log_file.line(&"=".repeat(80))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    for experiment in 1..=config.experiments {
        log_file.line(&format!(
            "({experiment:02}/{:02}) Launching experiment",
            config.experiments
        ))?;
        let collections = run_experiment(client, target, config, &mut rng, &mut log_file)?;

        let inconsistent = collections.inconsistent();
        log_file.line(&format!(
            "({experiment:02}/{:02}) Finished: {} results, {} inconsistent keys",
            config.experiments,
            collections.result_count(),
            inconsistent.len()
        ))?;
        for (key, distinct) in inconsistent {
            log_file.line(&format!("  key {key:#x}: {distinct} distinct results"))?;
        }
        log_file.flush()?;
    }

    Ok(path)
}

fn run_experiment(
    client: &mut Client,
    target: &TargetConfig,
    config: &CampaignConfig,
    rng: &mut StdRng,
    log_file: &mut CampaignLog,
) -> Result<Collections> {
    let params = target.params;
    let tree_height = params.tree_height();
    let total = config.queries;
    let mut mirror = CacheMirror::default();
    let mut collections = Collections::default();
    let bar = progress::create_query_bar(u64::from(total));

    for query in 1..=total {
        bar.inc(1);
        let packed = random_address(rng);
        log_file.line(&format!("[{query:04}/{total}] Sending ... {packed}"))?;

        match config.mode {
            Mode::Straight => client.sign_straight(packed)?,
            Mode::Cached => {
                let predicted = mirror.predict(packed);
                let outcome = client.sign_cached(packed)?;
                let hit = outcome == CacheOutcome::Cached;
                log_file.line(&format!(
                    "[{query:04}/{total}] CACHE {} (HIT PREDICTION={predicted})",
                    if hit { "HIT" } else { "MISS" }
                ))?;
                if hit != predicted {
                    log_file.line(&format!("[{query:04}/{total}] Cache mismatch, refilling ..."))?;
                    bar.set_message("refilling cache");
                    refill(client, &mirror)?;
                    bar.set_message("");
                }
                if hit {
                    continue;
                }
            }
        }

        let result = client.read_signature(params.layer_bytes())?;
        log_file.line(&format!(
            "[{query:04}/{total}] Received ... {}",
            result
                .chunks(params.n)
                .map(hex::encode)
                .collect::<Vec<_>>()
                .join(" ")
        ))?;
        collections.record(wots_key(packed, tree_height), result);
    }

    bar.finish_and_clear();
    Ok(collections)
}

fn refill(client: &mut Client, mirror: &CacheMirror) -> Result<()> {
    for tag in mirror.refill_tags() {
        let mut bytes = [0u8; ADDRESS_ZERO_PAD + ADDRESS_RANDOM_BYTES];
        bytes[ADDRESS_ZERO_PAD] = tag;
        client.fill_cache(PackedAddress::from_be_bytes(bytes))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spxprobe_signer_lib::{CACHE_SIZE, TINY_TARGET, Target};

    #[test]
    fn test_random_address_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            assert!(random_address(&mut rng).raw() < 1 << 16);
        }
    }

    #[test]
    fn test_same_seed_same_addresses() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        for _ in 0..8 {
            assert_eq!(random_address(&mut a), random_address(&mut b));
        }
    }

    #[test]
    fn test_mirror_tracks_target() {
        let mut mirror = CacheMirror::default();
        let mut target = Target::new(TINY_TARGET);
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..(CACHE_SIZE + 40) {
            let packed = random_address(&mut rng);
            let predicted = mirror.predict(packed);
            let outcome = target.sign_cached(packed).unwrap();
            assert_eq!(predicted, outcome == CacheOutcome::Cached);
        }
    }

    #[test]
    fn test_refill_reproduces_eviction_order() {
        let mut mirror = CacheMirror::default();
        for tag in 1..=200u8 {
            mirror.predict(PackedAddress::new(u64::from(tag) << 8));
        }
        let mut target = Target::new(TINY_TARGET);
        for tag in mirror.refill_tags() {
            target.fill_cache(PackedAddress::new(u64::from(tag) << 8));
        }
        let rebuilt: Vec<u8> = target.cache().iter_oldest_first().collect();
        assert_eq!(rebuilt, mirror.refill_tags());
    }

    #[test]
    fn test_wots_key_drops_base_leaf() {
        assert_eq!(wots_key(PackedAddress::new(0xABCD), 8), 0xAB);
        assert_eq!(wots_key(PackedAddress::new(0xAB00), 8), 0xAB);
    }

    #[test]
    fn test_inconsistent_keys() {
        let mut collections = Collections::default();
        collections.record(1, vec![1]);
        collections.record(1, vec![1]);
        collections.record(2, vec![1]);
        collections.record(2, vec![9]);
        assert_eq!(collections.inconsistent(), vec![(2, 2)]);
        assert_eq!(collections.result_count(), 4);
    }
}

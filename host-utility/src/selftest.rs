//! End-to-end checks of a running target
//!
//! Every check talks to the target and compares its answer with what the
//! host computes or verifies independently.

use anyhow::{Result, bail};
use spxprobe_primitives::verify;
use spxprobe_signer_lib::protocol::{SIGN_MESSAGE_BYTES, TRIGGER_ECHO};
use spxprobe_signer_lib::{
    CacheOutcome, KeyStore, PackedAddress, TargetConfig, sign_adjacent_layers,
};
use zeroize::Zeroizing;

use crate::connection::Client;
use crate::progress::run_step;
use crate::utils;

const SELF_TEST_MESSAGE: [u8; SIGN_MESSAGE_BYTES] = *b"spxprobe self-test message 0001!";

/// Summary of a self-test run
#[derive(Debug, Default)]
pub struct Report {
    /// Checks that passed
    pub passed: usize,
    /// Names of checks that failed
    pub failed: Vec<&'static str>,
}

impl Report {
    fn record(&mut self, name: &'static str, ok: bool) {
        if ok {
            self.passed += 1;
        } else {
            utils::warning(&format!("{name} failed"));
            self.failed.push(name);
        }
    }
}

/// Rebuild the target's key store from its exported secret and public seed
fn local_keys(target: &TargetConfig, secret: &[u8], pub_seed: &[u8]) -> Result<KeyStore> {
    let mut material = Zeroizing::new(Vec::with_capacity(secret.len() + pub_seed.len()));
    material.extend_from_slice(secret);
    material.extend_from_slice(pub_seed);
    Ok(KeyStore::new(target.params, &material)?)
}

/// Run every check against the connected target
///
/// `diagnostics` selects the checks that need the diagnostic command set.
pub fn run(client: &mut Client, target: &TargetConfig, diagnostics: bool) -> Result<Report> {
    let params = target.params;
    let mut report = Report::default();

    let public = run_step("Reading public key", || Ok(client.public_key()?))?;
    let (root, pub_seed) = public.split_at(params.n);
    utils::hex_line("root", root);

    // The secret lets the host reproduce partial resigns bit for bit
    let secret = run_step("Reading secret key", || Ok(client.secret_key()?))?;
    let local = local_keys(target, &secret, pub_seed)?;
    report.record("public root", local.pk_root() == root);

    let packed = PackedAddress::new(0x1234);
    let straight = run_step("Straight resign", || {
        client.sign_straight(packed)?;
        Ok(client.read_signature(params.layer_bytes())?)
    })?;
    let expected = sign_adjacent_layers(&local, packed, target.straight_layer)?.to_bytes();
    report.record("straight resign", straight == expected);

    let cached = run_step("Cached resign", || {
        let first = client.sign_cached(packed)?;
        let second = client.sign_cached(packed)?;
        Ok((first, second))
    })?;
    report.record("cache hit on repeat", cached.1 == CacheOutcome::Cached);

    if diagnostics {
        let signature = run_step("Full signature", || {
            let mut signature = client.test_sign(&SELF_TEST_MESSAGE)?;
            signature.extend(client.read_signature(params.sig_body_bytes())?);
            Ok(signature)
        })?;
        report.record(
            "full signature verifies",
            verify(&params, pub_seed, root, &SELF_TEST_MESSAGE, &signature),
        );

        let echo = run_step("Trigger", || Ok(client.test_trigger(1)?))?;
        report.record("trigger echo", echo == TRIGGER_ECHO);
    }

    if report.failed.is_empty() {
        utils::success(&format!("{} checks passed", report.passed));
        Ok(report)
    } else {
        bail!("{} of {} checks failed", report.failed.len(), report.passed + report.failed.len())
    }
}

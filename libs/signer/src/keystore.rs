//! Key and context store
//!
//! Holds the secret seed, PRF key, public seed and public root. The public
//! root is always derived from the seeds, so installing key material is the
//! only way to change any of them.

use crate::signer::{Result, SignerError};
use spxprobe_primitives::{Context, Params, merkle_gen_root};
use std::fmt;
use zeroize::Zeroizing;

/// Compiled-in secret seed
const DEFAULT_SK_SEED: [u8; 32] = [
    0x07, 0xad, 0x58, 0xd9, 0xa7, 0xb1, 0xf8, 0x56, 0xa1, 0xc6, 0x64, 0xb8, 0x6f, 0xf2, 0xa7, 0x39,
    0x05, 0xc4, 0xbe, 0x0a, 0x62, 0x82, 0x1e, 0x8a, 0x6a, 0x51, 0xe0, 0x34, 0x12, 0xfa, 0x89, 0x3a,
];

/// Compiled-in PRF key
const DEFAULT_SK_PRF: [u8; 32] = [
    0xfd, 0xb9, 0x5f, 0x27, 0xbd, 0xec, 0xcc, 0x57, 0x70, 0xc0, 0x77, 0x0c, 0x96, 0x52, 0x03, 0x8f,
    0xea, 0x65, 0xa0, 0x82, 0xb9, 0x98, 0x84, 0x77, 0x12, 0x9e, 0xab, 0xa3, 0x13, 0xa2, 0xad, 0xc8,
];

/// Compiled-in public seed
const DEFAULT_PUB_SEED: [u8; 32] = [
    0x1a, 0x3d, 0x9c, 0xcc, 0x1e, 0x6c, 0xd4, 0xa4, 0xbe, 0xbe, 0x2c, 0x60, 0x30, 0x84, 0x04, 0xe4,
    0xa3, 0x50, 0xa8, 0x7e, 0xf4, 0x47, 0xe4, 0x9a, 0xa7, 0xee, 0x50, 0x61, 0x13, 0x1b, 0xab, 0x63,
];

/// Signing key material plus derived state
pub struct KeyStore {
    params: Params,
    ctx: Context,
    sk_prf: Zeroizing<Vec<u8>>,
    pk_root: Vec<u8>,
}

impl KeyStore {
    /// Build from `3N` bytes: secret seed, PRF key, public seed
    pub fn new(params: Params, material: &[u8]) -> Result<Self> {
        let n = params.n;
        if material.len() != params.key_material_bytes() {
            return Err(SignerError::InvalidKeyLength {
                expected: params.key_material_bytes(),
                actual: material.len(),
            });
        }
        let (sk_seed, rest) = material.split_at(n);
        let (sk_prf, pub_seed) = rest.split_at(n);
        Ok(Self::from_parts(params, sk_seed, sk_prf, pub_seed))
    }

    /// Build from the compiled-in key material
    ///
    /// Parameter sets with `N` below 32 use a prefix of each default.
    #[must_use]
    pub fn with_defaults(params: Params) -> Self {
        let sk_seed = default_part(&DEFAULT_SK_SEED, params.n);
        let sk_prf = default_part(&DEFAULT_SK_PRF, params.n);
        let pub_seed = default_part(&DEFAULT_PUB_SEED, params.n);
        Self::from_parts(params, &sk_seed, &sk_prf, &pub_seed)
    }

    fn from_parts(params: Params, sk_seed: &[u8], sk_prf: &[u8], pub_seed: &[u8]) -> Self {
        let ctx = Context::new(sk_seed, pub_seed);
        let pk_root = merkle_gen_root(&params, &ctx);
        Self {
            params,
            ctx,
            sk_prf: Zeroizing::new(sk_prf.to_vec()),
            pk_root,
        }
    }

    /// Replace all key material and recompute the public root
    ///
    /// On error the current keys are kept.
    pub fn install_key(&mut self, material: &[u8]) -> Result<()> {
        *self = Self::new(self.params, material)?;
        log::info!("Installed key, public root {}", hex::encode(&self.pk_root));
        Ok(())
    }

    /// Secret seed followed by PRF key
    #[must_use]
    pub fn export_secret(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(Vec::with_capacity(2 * self.params.n));
        out.extend_from_slice(self.ctx.sk_seed());
        out.extend_from_slice(&self.sk_prf);
        out
    }

    /// Public root followed by public seed
    #[must_use]
    pub fn export_public(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 * self.params.n);
        out.extend_from_slice(&self.pk_root);
        out.extend_from_slice(self.pub_seed());
        out
    }

    /// Parameter set
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Seeds and hashing state
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Message PRF key
    #[must_use]
    pub fn sk_prf(&self) -> &[u8] {
        &self.sk_prf
    }

    /// Public seed
    #[must_use]
    pub fn pub_seed(&self) -> &[u8] {
        self.ctx.hash().pub_seed()
    }

    /// Public root
    #[must_use]
    pub fn pk_root(&self) -> &[u8] {
        &self.pk_root
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("params", &self.params)
            .field("pub_seed", &hex::encode(self.pub_seed()))
            .field("pk_root", &hex::encode(&self.pk_root))
            .finish_non_exhaustive()
    }
}

fn default_part(default: &[u8; 32], n: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(default.iter().cycle().take(n).copied().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spxprobe_primitives::SHAKE_TINY;

    #[test]
    fn test_install_key_splits_material() {
        let params = SHAKE_TINY;
        let material: Vec<u8> = (0..48).collect();
        let keys = KeyStore::new(params, &material).unwrap();

        assert_eq!(keys.export_secret().as_slice(), &material[..32]);
        assert_eq!(keys.pub_seed(), &material[32..]);
        assert_eq!(&keys.export_public()[16..], &material[32..]);
        assert_eq!(&keys.export_public()[..16], keys.pk_root());
    }

    #[test]
    fn test_install_key_is_idempotent() {
        let mut keys = KeyStore::with_defaults(SHAKE_TINY);
        let material = [0x42u8; 48];
        keys.install_key(&material).unwrap();
        let first = keys.pk_root().to_vec();
        keys.install_key(&material).unwrap();
        assert_eq!(keys.pk_root(), first.as_slice());
    }

    #[test]
    fn test_root_depends_on_secret_seed() {
        let mut material = [0u8; 48];
        let a = KeyStore::new(SHAKE_TINY, &material).unwrap();
        material[0] = 1;
        let b = KeyStore::new(SHAKE_TINY, &material).unwrap();
        assert_ne!(a.pk_root(), b.pk_root());
    }

    #[test]
    fn test_wrong_length_rejected_and_state_kept() {
        let mut keys = KeyStore::with_defaults(SHAKE_TINY);
        let before = keys.export_public();
        let err = keys.install_key(&[0u8; 47]).unwrap_err();
        assert!(matches!(
            err,
            SignerError::InvalidKeyLength {
                expected: 48,
                actual: 47
            }
        ));
        assert_eq!(keys.export_public(), before);
    }

    #[test]
    fn test_defaults_use_compiled_material() {
        let keys = KeyStore::with_defaults(SHAKE_TINY);
        assert_eq!(&keys.export_secret()[..16], &DEFAULT_SK_SEED[..16]);
        assert_eq!(&keys.export_secret()[16..], &DEFAULT_SK_PRF[..16]);
        assert_eq!(keys.pub_seed(), &DEFAULT_PUB_SEED[..16]);
    }

    #[test]
    fn test_debug_hides_secrets() {
        let keys = KeyStore::with_defaults(SHAKE_TINY);
        let debug = format!("{keys:?}");
        assert!(!debug.contains(&hex::encode(&DEFAULT_SK_PRF[..16])));
    }
}

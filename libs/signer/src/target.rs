//! Target state and operations
//!
//! [`Target`] owns everything the command handlers touch: key material,
//! the address cache, the read-back buffer and the trigger. It is created
//! once by the receive loop and lent to each handler by `&mut`.

use crate::address::PackedAddress;
use crate::buffer::SignatureBuffer;
use crate::cache::TargetCache;
use crate::keystore::KeyStore;
use crate::partial::sign_validated;
use crate::signer::{Result, SignerError, TargetConfig, check_position};
use crate::trigger::{NullTrigger, Trigger, TriggerGuard};
use zeroize::Zeroizing;

#[cfg(feature = "diagnostics")]
use crate::address::LayerPosition;
#[cfg(feature = "diagnostics")]
use crate::protocol::TRIGGER_ECHO;
#[cfg(feature = "diagnostics")]
use spxprobe_primitives::{Address, WotsLeafGen, fors_sign, merkle_sign};

/// Address words hashed under by the diagnostic tweakable-hash command
#[cfg(feature = "diagnostics")]
pub const DIAGNOSTIC_ADDRESS_WORDS: [u32; 8] = [
    0x44a5_9bfe,
    0xeaef_a8a4,
    0x3263_2228,
    0x5767_6ded,
    0x21d9_e7fa,
    0xc1f4_f13d,
    0x775f_5069,
    0xffb9_3335,
];

/// Spin iterations per unit of the trigger command's argument
#[cfg(feature = "diagnostics")]
const TRIGGER_SPIN_UNIT: u32 = 1000;

/// Result of a cache-gated partial resign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Tag was new; it is now cached and the buffer holds fresh output
    Signed,
    /// Tag was already cached; nothing was computed
    Cached,
}

/// Firmware state
pub struct Target {
    config: TargetConfig,
    keys: KeyStore,
    cache: TargetCache,
    buffer: SignatureBuffer,
    trigger: Box<dyn Trigger>,
}

impl Target {
    /// Target with the compiled-in keys and no trigger line
    #[must_use]
    pub fn new(config: TargetConfig) -> Self {
        let keys = KeyStore::with_defaults(config.params);
        log::info!(
            "Target ready: n={}, layers {}/{}, public root {}",
            config.params.n,
            config.straight_layer,
            config.cached_layer,
            hex::encode(keys.pk_root())
        );
        Self {
            config,
            keys,
            cache: TargetCache::new(),
            buffer: SignatureBuffer::new(config.params.n),
            trigger: Box::new(NullTrigger),
        }
    }

    /// Replace the trigger
    #[must_use]
    pub fn with_trigger(mut self, trigger: Box<dyn Trigger>) -> Self {
        self.trigger = trigger;
        self
    }

    /// Build profile
    #[must_use]
    pub fn config(&self) -> &TargetConfig {
        &self.config
    }

    /// Current keys
    #[must_use]
    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Address cache
    #[must_use]
    pub fn cache(&self) -> &TargetCache {
        &self.cache
    }

    /// Read-back buffer
    #[must_use]
    pub fn buffer(&self) -> &SignatureBuffer {
        &self.buffer
    }

    /// Install `3N` bytes of key material
    pub fn install_key(&mut self, material: &[u8]) -> Result<()> {
        self.keys.install_key(material)
    }

    /// Root followed by public seed
    #[must_use]
    pub fn public_key(&self) -> Vec<u8> {
        self.keys.export_public()
    }

    /// Secret seed followed by PRF key
    #[must_use]
    pub fn secret_key(&self) -> Zeroizing<Vec<u8>> {
        self.keys.export_secret()
    }

    /// Partial resign at the straight layer
    pub fn sign_straight(&mut self, packed: PackedAddress) -> Result<()> {
        let layer = self.config.straight_layer;
        check_position(&self.config.params, packed, layer)?;
        self.sign_partial(packed, layer);
        Ok(())
    }

    /// Partial resign at the cached layer, unless the address tag is cached
    ///
    /// The tag is inserted before signing. A hit does no hashing, leaves the
    /// trigger alone and keeps the buffer as it was.
    pub fn sign_cached(&mut self, packed: PackedAddress) -> Result<CacheOutcome> {
        let layer = self.config.cached_layer;
        check_position(&self.config.params, packed, layer)?;

        let tag = packed.tag();
        if self.cache.contains(tag) {
            log::debug!("Tag {tag:#04x} cached, skipping {packed}");
            return Ok(CacheOutcome::Cached);
        }
        self.cache.insert(tag);
        self.sign_partial(packed, layer);
        Ok(CacheOutcome::Signed)
    }

    /// Insert the tag of `packed` without signing
    pub fn fill_cache(&mut self, packed: PackedAddress) {
        let tag = packed.tag();
        self.cache.insert(tag);
        log::debug!("Filled tag {tag:#04x}, cursor {}", self.cache.cursor());
    }

    /// Chunk `index` of the last result
    pub fn signature_chunk(&self, index: u16) -> Result<&[u8]> {
        self.buffer
            .chunk(index)
            .ok_or(SignerError::ChunkOutOfRange {
                index,
                available: self.buffer.chunk_count(),
            })
    }

    /// Resign at `layer`; callers have validated `packed` for it
    fn sign_partial(&mut self, packed: PackedAddress, layer: u32) {
        let signature = {
            let _guard = TriggerGuard::new(self.trigger.as_mut());
            sign_validated(&self.keys, packed, layer)
        };
        self.buffer.replace(signature.to_bytes());
    }
}

#[cfg(feature = "diagnostics")]
impl Target {
    /// Tweakable hash of one `N`-byte block under [`DIAGNOSTIC_ADDRESS_WORDS`]
    #[must_use]
    pub fn test_thash(&mut self, block: &[u8]) -> Vec<u8> {
        let addr = Address::from_le_words(DIAGNOSTIC_ADDRESS_WORDS);
        let _guard = TriggerGuard::new(self.trigger.as_mut());
        self.keys.context().thash(block, &addr)
    }

    /// Generate leaf 0 of the diagnostic subtree, signing `msg` on the way
    ///
    /// Returns the leaf; the captured one-time signature goes to the buffer.
    pub fn test_wots(&mut self, msg: &[u8]) -> Vec<u8> {
        let subtree = Address::from_le_words(DIAGNOSTIC_ADDRESS_WORDS);
        let params = self.keys.params();
        let mut leaf_gen = WotsLeafGen::new(params, self.keys.context(), &subtree).signing(0, msg);
        let leaf = {
            let _guard = TriggerGuard::new(self.trigger.as_mut());
            leaf_gen.gen_leaf(0)
        };
        self.buffer.replace(leaf_gen.into_signature());
        leaf
    }

    /// Sign `msg` with leaf 0 of tree 0 at layer 0
    ///
    /// Returns the tree root; the buffer gets the one-time signature
    /// followed by the authentication path, as one full-signature layer.
    pub fn test_merkle(&mut self, msg: &[u8]) -> Vec<u8> {
        let (tree_addr, wots_addr) =
            crate::partial::layer_addresses(0, LayerPosition { tree: 0, leaf: 0 });
        let signed = {
            let _guard = TriggerGuard::new(self.trigger.as_mut());
            merkle_sign(
                self.keys.params(),
                self.keys.context(),
                msg,
                &wots_addr,
                &tree_addr,
                0,
            )
        };
        let mut out = signed.wots_sig;
        out.extend_from_slice(&signed.auth_path);
        self.buffer.replace(out);
        signed.root
    }

    /// FORS signature of `msg` under the all-zero address
    ///
    /// Returns the FORS public key; the buffer gets the signature.
    pub fn test_fors(&mut self, msg: &[u8]) -> Vec<u8> {
        let fors_addr = Address::default();
        let signed = {
            let _guard = TriggerGuard::new(self.trigger.as_mut());
            fors_sign(self.keys.params(), self.keys.context(), msg, &fors_addr)
        };
        self.buffer.replace(signed.signature);
        signed.public_key
    }

    /// Full signature of `message`
    ///
    /// Returns the randomizer `R`; the buffer gets the signature body.
    pub fn test_sign(&mut self, message: &[u8]) -> Vec<u8> {
        let signature = {
            let _guard = TriggerGuard::new(self.trigger.as_mut());
            crate::full::sign(&self.keys, message)
        };
        self.buffer.replace(signature.body());
        signature.randomizer
    }

    /// Hold the trigger high for `rounds` spin units
    pub fn test_trigger(&mut self, rounds: u8) -> [u8; 2] {
        let _guard = TriggerGuard::new(self.trigger.as_mut());
        let mut acc = 0u32;
        for i in 0..u32::from(rounds) * TRIGGER_SPIN_UNIT {
            acc = std::hint::black_box(acc.wrapping_add(i));
        }
        TRIGGER_ECHO
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("config", &self.config)
            .field("keys", &self.keys)
            .field("cache_cursor", &self.cache.cursor())
            .field("buffer_len", &self.buffer.len())
            .finish_non_exhaustive()
    }
}

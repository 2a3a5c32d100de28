//! Signing errors and target profiles
//!
//! A [`TargetConfig`] fixes the parameter set together with the two layers
//! the partial signers reconstruct. These are build-time constants: buffer
//! layouts and the range check on packed addresses derive from them.

use crate::address::PackedAddress;
use spxprobe_primitives::{Params, SHAKE_256S, SHAKE_TINY};
use thiserror::Error;

/// Signer errors
#[derive(Error, Debug)]
pub enum SignerError {
    /// Key material of the wrong size
    #[error("Invalid key material length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Required length (3N)
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Packed address selects a key pair outside the hypertree
    #[error("Packed address {address} out of range for layer {layer}")]
    AddressOutOfRange {
        /// Offending address
        address: PackedAddress,
        /// Lowest reconstructed layer
        layer: u32,
    },

    /// No layer above the requested base layer
    #[error("Layer {layer} has no layer above it (hypertree has {layers} layers)")]
    LayerOutOfRange {
        /// Requested base layer
        layer: u32,
        /// Number of hypertree layers
        layers: u32,
    },

    /// Command payload of the wrong size
    #[error("Invalid payload length: expected {expected}, got {actual}")]
    PayloadLength {
        /// Fixed length for the command
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Chunk read past the valid bytes of the last result
    #[error("Chunk {index} out of range ({available} available)")]
    ChunkOutOfRange {
        /// Requested chunk
        index: u16,
        /// Complete chunks held
        available: usize,
    },
}

/// Result type for signing operations
pub type Result<T> = std::result::Result<T, SignerError>;

/// Parameter set and partial-signing layers of a target build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetConfig {
    /// SPHINCS+ parameter set
    pub params: Params,
    /// Base layer reconstructed by `sign_straight`
    pub straight_layer: u32,
    /// Base layer reconstructed by `sign_cached`
    pub cached_layer: u32,
}

impl TargetConfig {
    /// Both partial-signing layers have a layer above them
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.straight_layer + 1 < self.params.d && self.cached_layer + 1 < self.params.d
    }
}

/// `sphincs-shake256-256s-robust`: the one-time keys of layers 6 and 7
pub const SHAKE_256S_TARGET: TargetConfig = TargetConfig {
    params: SHAKE_256S,
    straight_layer: 5,
    cached_layer: 6,
};

/// Reduced parameter set for tests and quick host-side checks
pub const TINY_TARGET: TargetConfig = TargetConfig {
    params: SHAKE_TINY,
    straight_layer: 1,
    cached_layer: 2,
};

const _: () = assert!(SHAKE_256S_TARGET.is_valid());
const _: () = assert!(TINY_TARGET.is_valid());

/// Reject packed addresses and layers the hypertree cannot hold
pub(crate) fn check_position(params: &Params, packed: PackedAddress, layer: u32) -> Result<()> {
    if layer + 1 >= params.d {
        return Err(SignerError::LayerOutOfRange {
            layer,
            layers: params.d,
        });
    }
    if !packed.fits(params, layer) {
        return Err(SignerError::AddressOutOfRange {
            address: packed,
            layer,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_position() {
        let params = SHAKE_256S;
        assert!(check_position(&params, PackedAddress::new(0xFFFF), 6).is_ok());
        assert!(matches!(
            check_position(&params, PackedAddress::new(0x1_0000), 6),
            Err(SignerError::AddressOutOfRange { layer: 6, .. })
        ));
        assert!(matches!(
            check_position(&params, PackedAddress::new(0), 7),
            Err(SignerError::LayerOutOfRange { layer: 7, layers: 8 })
        ));
    }
}

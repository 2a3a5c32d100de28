//! Packed hypertree addresses
//!
//! A packed address is the 64-bit big-endian value a host sends to select
//! a one-time key pair: the low `tree_height` bits are the leaf index at the
//! lowest reconstructed layer and the remaining high bits are the tree
//! index at that layer. Shifting right by `tree_height` moves up one layer.

use spxprobe_primitives::Params;
use std::fmt;

/// Wire size of a packed address
pub const PACKED_ADDRESS_BYTES: usize = 8;

/// Position of a key pair within one hypertree layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerPosition {
    /// Tree index within the layer
    pub tree: u64,
    /// Leaf (key pair) index within the tree
    pub leaf: u32,
}

impl LayerPosition {
    /// Position of the signing leaf one layer up
    #[must_use]
    pub fn parent(self, tree_height: u32) -> Self {
        PackedAddress(self.tree).split(tree_height)
    }
}

/// 64-bit packed hypertree address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PackedAddress(u64);

impl PackedAddress {
    /// Wrap a raw value
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Decode the wire form
    #[must_use]
    pub const fn from_be_bytes(bytes: [u8; PACKED_ADDRESS_BYTES]) -> Self {
        Self(u64::from_be_bytes(bytes))
    }

    /// Encode to the wire form
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; PACKED_ADDRESS_BYTES] {
        self.0.to_be_bytes()
    }

    /// Raw value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Split into (tree, leaf) at the lowest reconstructed layer
    #[must_use]
    pub fn split(self, tree_height: u32) -> LayerPosition {
        let mask = (1u64 << tree_height) - 1;
        LayerPosition {
            tree: self.0 >> tree_height,
            leaf: u32::try_from(self.0 & mask).unwrap_or(u32::MAX),
        }
    }

    /// Inverse of [`PackedAddress::split`]
    #[must_use]
    pub fn from_position(position: LayerPosition, tree_height: u32) -> Self {
        Self((position.tree << tree_height) | u64::from(position.leaf))
    }

    /// Cache tag: bits [8:16) of the raw value
    #[must_use]
    pub const fn tag(self) -> u8 {
        self.0.to_be_bytes()[6]
    }

    /// Whether the address names an existing key pair when `base_layer` is
    /// the lowest reconstructed layer.
    ///
    /// Layer `base_layer` has `d - base_layer - 1` layers above it, so the
    /// tree and leaf indices together span `(d - base_layer) * tree_height`
    /// bits.
    #[must_use]
    pub fn fits(self, params: &Params, base_layer: u32) -> bool {
        let bits = params.full_height - base_layer.min(params.d) * params.tree_height();
        self.0.checked_shr(bits).unwrap_or(0) == 0
    }
}

impl From<[u8; PACKED_ADDRESS_BYTES]> for PackedAddress {
    fn from(bytes: [u8; PACKED_ADDRESS_BYTES]) -> Self {
        Self::from_be_bytes(bytes)
    }
}

impl fmt::Display for PackedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_be_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spxprobe_primitives::{SHAKE_256S, SHAKE_TINY};

    #[test]
    fn test_decode_big_endian() {
        let packed = PackedAddress::from_be_bytes([0, 0, 0, 0, 0, 0, 0x12, 0x34]);
        assert_eq!(packed.raw(), 0x1234);
        let pos = packed.split(8);
        assert_eq!(pos.leaf, 0x34);
        assert_eq!(pos.tree, 0x12);
    }

    #[test]
    fn test_tag_is_second_lowest_byte() {
        let packed = PackedAddress::new(0x00AB_CDEF);
        assert_eq!(packed.tag(), 0xCD);
        assert_eq!(u64::from(packed.tag()), (packed.raw() >> 8) & 0xFF);
    }

    #[test]
    fn test_peel_two_layers() {
        let packed = PackedAddress::new(0x0003_0201);
        let lower = packed.split(8);
        let upper = lower.parent(8);
        assert_eq!(lower.leaf, 0x01);
        assert_eq!(upper.leaf, 0x02);
        assert_eq!(upper.tree, 0x03);
    }

    #[test]
    fn test_fits_at_layer() {
        let params = SHAKE_256S;
        // Layer 6 of 8 leaves two layers of 8 bits
        assert!(PackedAddress::new(0xFFFF).fits(&params, 6));
        assert!(!PackedAddress::new(0x1_0000).fits(&params, 6));
        // Layer 0 covers all 64 bits
        assert!(PackedAddress::new(u64::MAX).fits(&params, 0));
        // Layer 5 on the reduced set: 3 layers of 3 bits
        assert!(PackedAddress::new(0x1FF).fits(&SHAKE_TINY, 5));
        assert!(!PackedAddress::new(0x200).fits(&SHAKE_TINY, 5));
    }

    #[test]
    fn test_display_is_hex() {
        assert_eq!(PackedAddress::new(0x0102).to_string(), "0000000000000102");
    }
}

//! Parameter sets and the byte sizes derived from them.

/// A SPHINCS+ parameter set.
///
/// Only the SHAKE256 "robust" instantiation is implemented, so the set is
/// fully described by its tree geometry and Winternitz parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    /// Security parameter: hash output length in bytes
    pub n: usize,
    /// Total hypertree height
    pub full_height: u32,
    /// Number of hypertree layers
    pub d: u32,
    /// Height of each FORS tree
    pub fors_height: u32,
    /// Number of FORS trees
    pub fors_trees: u32,
    /// Winternitz parameter (4, 16 or 256)
    pub w: u32,
}

/// `sphincs-shake256-256s-robust`
pub const SHAKE_256S: Params = Params {
    n: 32,
    full_height: 64,
    d: 8,
    fors_height: 14,
    fors_trees: 22,
    w: 16,
};

/// Reduced geometry with the same layer count as [`SHAKE_256S`].
///
/// Keeps eight hypertree layers so layer-indexed code paths are exercised,
/// but shrinks every tree so a full signature costs milliseconds.
pub const SHAKE_TINY: Params = Params {
    n: 16,
    full_height: 24,
    d: 8,
    fors_height: 4,
    fors_trees: 6,
    w: 16,
};

impl Params {
    /// Height of one hypertree layer
    #[must_use]
    pub const fn tree_height(&self) -> u32 {
        self.full_height / self.d
    }

    /// Number of leaves in one hypertree layer tree
    #[must_use]
    pub const fn leaves_per_tree(&self) -> u32 {
        1 << self.tree_height()
    }

    /// `log2(w)`
    #[must_use]
    pub const fn log_w(&self) -> u32 {
        self.w.trailing_zeros()
    }

    /// Number of message chains
    #[must_use]
    pub const fn wots_len1(&self) -> usize {
        8 * self.n / self.log_w() as usize
    }

    /// Number of checksum chains
    #[must_use]
    pub const fn wots_len2(&self) -> usize {
        let max_csum = self.wots_len1() as u32 * (self.w - 1);
        let floor_log2 = 31 - max_csum.leading_zeros();
        (floor_log2 / self.log_w()) as usize + 1
    }

    /// Total number of chains
    #[must_use]
    pub const fn wots_len(&self) -> usize {
        self.wots_len1() + self.wots_len2()
    }

    /// One-time signature size
    #[must_use]
    pub const fn wots_bytes(&self) -> usize {
        self.wots_len() * self.n
    }

    /// Authentication path size for one hypertree layer
    #[must_use]
    pub const fn auth_path_bytes(&self) -> usize {
        self.tree_height() as usize * self.n
    }

    /// One layer of a full signature: one-time signature plus authentication path
    #[must_use]
    pub const fn layer_bytes(&self) -> usize {
        self.wots_bytes() + self.auth_path_bytes()
    }

    /// Bytes of message digest consumed by FORS
    #[must_use]
    pub const fn fors_msg_bytes(&self) -> usize {
        (self.fors_height as usize * self.fors_trees as usize).div_ceil(8)
    }

    /// FORS signature size
    #[must_use]
    pub const fn fors_bytes(&self) -> usize {
        (self.fors_height as usize + 1) * self.fors_trees as usize * self.n
    }

    /// Bits of digest selecting the bottom-layer tree
    #[must_use]
    pub const fn tree_bits(&self) -> u32 {
        self.tree_height() * (self.d - 1)
    }

    /// Bytes of digest selecting the bottom-layer tree
    #[must_use]
    pub const fn tree_bytes(&self) -> usize {
        (self.tree_bits() as usize).div_ceil(8)
    }

    /// Bytes of digest selecting the leaf in the bottom-layer tree
    #[must_use]
    pub const fn leaf_bytes(&self) -> usize {
        (self.tree_height() as usize).div_ceil(8)
    }

    /// Total message digest length
    #[must_use]
    pub const fn digest_bytes(&self) -> usize {
        self.fors_msg_bytes() + self.tree_bytes() + self.leaf_bytes()
    }

    /// Signature body without the randomizer: FORS plus every layer
    #[must_use]
    pub const fn sig_body_bytes(&self) -> usize {
        self.fors_bytes() + self.d as usize * self.layer_bytes()
    }

    /// Complete signature: randomizer followed by the body
    #[must_use]
    pub const fn sig_bytes(&self) -> usize {
        self.n + self.sig_body_bytes()
    }

    /// Secret seed, PRF key and public seed
    #[must_use]
    pub const fn key_material_bytes(&self) -> usize {
        3 * self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shake_256s_sizes() {
        let p = SHAKE_256S;
        assert_eq!(p.tree_height(), 8);
        assert_eq!(p.wots_len1(), 64);
        assert_eq!(p.wots_len2(), 3);
        assert_eq!(p.wots_len(), 67);
        assert_eq!(p.wots_bytes(), 2144);
        assert_eq!(p.layer_bytes(), 2400);
        assert_eq!(p.fors_msg_bytes(), 39);
        assert_eq!(p.fors_bytes(), 10560);
        assert_eq!(p.tree_bytes(), 7);
        assert_eq!(p.leaf_bytes(), 1);
        assert_eq!(p.digest_bytes(), 47);
        assert_eq!(p.sig_bytes(), 29792);
    }

    #[test]
    fn test_tiny_sizes() {
        let p = SHAKE_TINY;
        assert_eq!(p.tree_height(), 3);
        assert_eq!(p.wots_len(), 35);
        assert_eq!(p.fors_msg_bytes(), 3);
        assert_eq!(p.tree_bits(), 21);
        assert_eq!(p.digest_bytes(), 7);
    }
}

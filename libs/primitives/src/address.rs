//! 32-byte hash address.
//!
//! Byte layout:
//!   [0:4]   layer (only byte 3 is written)
//!   [8:16]  tree index, big-endian
//!   [19]    address type
//!   [22:24] key pair index
//!   [27]    chain index / tree height
//!   [28:32] hash index (byte 31) / tree index (big-endian)

/// Length of an address in bytes
pub const ADDRESS_BYTES: usize = 32;

const OFFSET_LAYER: usize = 3;
const OFFSET_TREE: usize = 8;
const OFFSET_TYPE: usize = 19;
const OFFSET_KP_HIGH: usize = 22;
const OFFSET_KP_LOW: usize = 23;
const OFFSET_CHAIN: usize = 27;
const OFFSET_HASH: usize = 31;
const OFFSET_TREE_HEIGHT: usize = 27;
const OFFSET_TREE_INDEX: usize = 28;

/// Domain separator stored in the address type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AddressType {
    /// Chain hashing inside a one-time key
    Wots = 0,
    /// Compression of one-time public key chains
    WotsPk = 1,
    /// Internal Merkle tree node
    HashTree = 2,
    /// FORS tree node or leaf
    ForsTree = 3,
    /// Compression of FORS roots
    ForsPk = 4,
    /// One-time secret key derivation
    WotsPrf = 5,
    /// FORS secret key derivation
    ForsPrf = 6,
}

/// A hash address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Address([u8; ADDRESS_BYTES]);

impl Address {
    /// Build an address from eight 32-bit words stored in little-endian order
    #[must_use]
    pub fn from_le_words(words: [u32; 8]) -> Self {
        let mut bytes = [0u8; ADDRESS_BYTES];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Self(bytes)
    }

    /// Raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Set the hypertree layer
    pub fn set_layer(&mut self, layer: u32) {
        self.0[OFFSET_LAYER] = layer.to_be_bytes()[3];
    }

    /// Set the tree index within the layer
    pub fn set_tree(&mut self, tree: u64) {
        self.0[OFFSET_TREE..OFFSET_TREE + 8].copy_from_slice(&tree.to_be_bytes());
    }

    /// Set the type byte. Other fields are left untouched.
    pub fn set_type(&mut self, kind: AddressType) {
        self.0[OFFSET_TYPE] = kind as u8;
    }

    /// Set the key pair (leaf) index
    pub fn set_keypair(&mut self, keypair: u32) {
        let be = keypair.to_be_bytes();
        self.0[OFFSET_KP_HIGH] = be[2];
        self.0[OFFSET_KP_LOW] = be[3];
    }

    /// Set the chain index inside a one-time key
    pub fn set_chain(&mut self, chain: u32) {
        self.0[OFFSET_CHAIN] = chain.to_be_bytes()[3];
    }

    /// Set the position inside a chain
    pub fn set_hash(&mut self, hash: u32) {
        self.0[OFFSET_HASH] = hash.to_be_bytes()[3];
    }

    /// Set the node height inside a Merkle or FORS tree
    pub fn set_tree_height(&mut self, height: u32) {
        self.0[OFFSET_TREE_HEIGHT] = height.to_be_bytes()[3];
    }

    /// Set the node index inside a Merkle or FORS tree
    pub fn set_tree_index(&mut self, index: u32) {
        self.0[OFFSET_TREE_INDEX..OFFSET_TREE_INDEX + 4].copy_from_slice(&index.to_be_bytes());
    }

    /// Copy layer and tree fields from `other`
    pub fn copy_subtree_from(&mut self, other: &Address) {
        self.0[..OFFSET_TREE + 8].copy_from_slice(&other.0[..OFFSET_TREE + 8]);
    }

    /// Copy layer, tree and key pair fields from `other`
    pub fn copy_keypair_from(&mut self, other: &Address) {
        self.copy_subtree_from(other);
        self.0[OFFSET_KP_HIGH] = other.0[OFFSET_KP_HIGH];
        self.0[OFFSET_KP_LOW] = other.0[OFFSET_KP_LOW];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets() {
        let mut addr = Address::default();
        addr.set_layer(5);
        addr.set_tree(0x0102_0304_0506_0708);
        addr.set_type(AddressType::HashTree);
        addr.set_keypair(0x1234);
        addr.set_tree_height(3);
        addr.set_tree_index(0xAABB_CCDD);

        let b = addr.as_bytes();
        assert_eq!(&b[0..4], &[0, 0, 0, 5]);
        assert_eq!(&b[8..16], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(b[19], 2);
        assert_eq!(&b[22..24], &[0x12, 0x34]);
        assert_eq!(b[27], 3);
        assert_eq!(&b[28..32], &[0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[test]
    fn test_set_type_keeps_other_fields() {
        let mut addr = Address::default();
        addr.set_keypair(7);
        addr.set_chain(9);
        addr.set_type(AddressType::WotsPrf);
        assert_eq!(addr.as_bytes()[23], 7);
        assert_eq!(addr.as_bytes()[27], 9);
        assert_eq!(addr.as_bytes()[19], 5);
    }

    #[test]
    fn test_copy_keypair_leaves_tail_alone() {
        let mut src = Address::default();
        src.set_layer(2);
        src.set_tree(99);
        src.set_keypair(300);
        src.set_chain(4);

        let mut dst = Address::default();
        dst.set_type(AddressType::ForsPk);
        dst.copy_keypair_from(&src);

        assert_eq!(dst.as_bytes()[..16], src.as_bytes()[..16]);
        assert_eq!(dst.as_bytes()[22..24], src.as_bytes()[22..24]);
        assert_eq!(dst.as_bytes()[19], AddressType::ForsPk as u8);
        assert_eq!(dst.as_bytes()[27], 0);
    }

    #[test]
    fn test_from_le_words() {
        let addr = Address::from_le_words([0x44a5_9bfe, 0, 0, 0, 0, 0, 0, 0xffb9_3335]);
        assert_eq!(&addr.as_bytes()[0..4], &[0xfe, 0x9b, 0xa5, 0x44]);
        assert_eq!(&addr.as_bytes()[28..32], &[0x35, 0x33, 0xb9, 0xff]);
    }
}

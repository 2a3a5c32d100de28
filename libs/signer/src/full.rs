//! Full hypertree signing walk.

use crate::address::{LayerPosition, PackedAddress};
use crate::keystore::KeyStore;
use crate::partial::layer_addresses;
use spxprobe_primitives::{
    Address, AddressType, MessageDigest, fors_sign, gen_message_random, hash_message, merkle_sign,
};

/// One hypertree layer of a full signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerSignature {
    /// One-time signature of the root below (or of the FORS key at layer 0)
    pub wots_sig: Vec<u8>,
    /// Authentication path of the signing leaf
    pub auth_path: Vec<u8>,
}

/// A complete signature together with the digest it was derived from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSignature {
    /// Digest randomizer `R`
    pub randomizer: Vec<u8>,
    /// FORS signature
    pub fors: Vec<u8>,
    /// Layers from the bottom of the hypertree up
    pub layers: Vec<LayerSignature>,
    /// Message digest and signing position
    pub digest: MessageDigest,
}

impl FullSignature {
    /// FORS signature followed by every layer as one-time signature then path
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let layer_bytes: usize = self
            .layers
            .iter()
            .map(|l| l.wots_sig.len() + l.auth_path.len())
            .sum();
        let mut out = Vec::with_capacity(self.fors.len() + layer_bytes);
        out.extend_from_slice(&self.fors);
        for layer in &self.layers {
            out.extend_from_slice(&layer.wots_sig);
            out.extend_from_slice(&layer.auth_path);
        }
        out
    }

    /// Standard encoding: randomizer followed by [`FullSignature::body`]
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.randomizer.clone();
        out.extend_from_slice(&self.body());
        out
    }

    /// Packed address of the signing leaf when `layer` is the lowest
    /// reconstructed layer
    #[must_use]
    pub fn packed_address_at(&self, layer: u32, tree_height: u32) -> PackedAddress {
        let mut position = LayerPosition {
            tree: self.digest.tree,
            leaf: self.digest.leaf,
        };
        for _ in 0..layer {
            position = position.parent(tree_height);
        }
        PackedAddress::from_position(position, tree_height)
    }
}

/// Sign `message` with the stored keys.
///
/// The randomizer is derived with an all-zero `optrand`, so signing is
/// deterministic.
#[must_use]
pub fn sign(keys: &KeyStore, message: &[u8]) -> FullSignature {
    let params = keys.params();
    let ctx = keys.context();
    let tree_height = params.tree_height();

    let optrand = vec![0u8; params.n];
    let randomizer = gen_message_random(keys.sk_prf(), &optrand, message);
    let digest = hash_message(params, &randomizer, keys.pub_seed(), keys.pk_root(), message);

    let mut fors_addr = Address::default();
    fors_addr.set_type(AddressType::Wots);
    fors_addr.set_tree(digest.tree);
    fors_addr.set_keypair(digest.leaf);
    let fors = fors_sign(params, ctx, &digest.fors_msg, &fors_addr);
    log::debug!(
        "FORS signed for tree {:#x}, leaf {}",
        digest.tree,
        digest.leaf
    );

    let mut position = LayerPosition {
        tree: digest.tree,
        leaf: digest.leaf,
    };
    let mut root = fors.public_key;
    let mut layers = Vec::with_capacity(params.d as usize);

    for layer in 0..params.d {
        let (tree_addr, wots_addr) = layer_addresses(layer, position);
        let signed = merkle_sign(params, ctx, &root, &wots_addr, &tree_addr, position.leaf);
        layers.push(LayerSignature {
            wots_sig: signed.wots_sig,
            auth_path: signed.auth_path,
        });
        root = signed.root;
        position = position.parent(tree_height);
    }

    FullSignature {
        randomizer,
        fors: fors.signature,
        layers,
        digest,
    }
}

//! Two-layer partial resign
//!
//! Reconstructs exactly the part of a hypertree signature that links two
//! adjacent layers: the authentication path of a leaf at `base_layer`, and
//! the one-time signature that the layer above puts on that tree's root.

use crate::address::{LayerPosition, PackedAddress};
use crate::keystore::KeyStore;
use crate::signer::{Result, check_position};
use spxprobe_primitives::{Address, AddressType, WotsLeafGen, merkle_sign};

/// Output of a partial resign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSignature {
    /// Authentication path at the base layer
    pub auth_path: Vec<u8>,
    /// One-time signature of `subtree_root` one layer up
    pub wots_sig: Vec<u8>,
    /// Root of the base-layer tree
    pub subtree_root: Vec<u8>,
    /// One-time public key (compressed) that produced `wots_sig`
    pub wots_leaf: Vec<u8>,
}

impl PartialSignature {
    /// Wire layout: authentication path followed by the one-time signature
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.auth_path.len() + self.wots_sig.len());
        out.extend_from_slice(&self.auth_path);
        out.extend_from_slice(&self.wots_sig);
        out
    }
}

/// Resign layers `base_layer` and `base_layer + 1` for `packed`
pub fn sign_adjacent_layers(
    keys: &KeyStore,
    packed: PackedAddress,
    base_layer: u32,
) -> Result<PartialSignature> {
    check_position(keys.params(), packed, base_layer)?;
    Ok(sign_validated(keys, packed, base_layer))
}

/// [`sign_adjacent_layers`] for a position already passed through
/// `check_position`
pub(crate) fn sign_validated(
    keys: &KeyStore,
    packed: PackedAddress,
    base_layer: u32,
) -> PartialSignature {
    let params = keys.params();
    let ctx = keys.context();
    let tree_height = params.tree_height();

    let lower = packed.split(tree_height);
    log::debug!(
        "Partial resign at layer {base_layer}: tree {:#x}, leaf {}",
        lower.tree,
        lower.leaf
    );

    let (tree_addr, wots_addr) = layer_addresses(base_layer, lower);
    // The one-time signature produced here is discarded; only the path and root matter
    let signed = merkle_sign(
        params,
        ctx,
        &vec![0u8; params.n],
        &wots_addr,
        &tree_addr,
        lower.leaf,
    );

    let upper = lower.parent(tree_height);
    let (_, wots_addr) = layer_addresses(base_layer + 1, upper);
    let mut leaf_gen =
        WotsLeafGen::new(params, ctx, &wots_addr).signing(upper.leaf, &signed.root);
    let wots_leaf = leaf_gen.gen_leaf(upper.leaf);

    PartialSignature {
        auth_path: signed.auth_path,
        wots_sig: leaf_gen.into_signature(),
        subtree_root: signed.root,
        wots_leaf,
    }
}

/// Tree and one-time key addresses for `position` at `layer`
pub(crate) fn layer_addresses(layer: u32, position: LayerPosition) -> (Address, Address) {
    let mut tree_addr = Address::default();
    tree_addr.set_type(AddressType::HashTree);
    tree_addr.set_layer(layer);
    tree_addr.set_tree(position.tree);

    let mut wots_addr = Address::default();
    wots_addr.set_type(AddressType::Wots);
    wots_addr.copy_subtree_from(&tree_addr);
    wots_addr.set_keypair(position.leaf);
    (tree_addr, wots_addr)
}

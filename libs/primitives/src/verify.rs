//! Full signature verification.

use crate::address::{Address, AddressType};
use crate::fors::fors_pk_from_sig;
use crate::hash::{TweakHash, hash_message};
use crate::merkle::compute_root;
use crate::params::Params;
use crate::wots::pk_from_sig;

/// Check `sig` (randomizer, FORS signature, then one layer per hypertree level)
/// over `msg` against the public seed and root.
#[must_use]
pub fn verify(params: &Params, pub_seed: &[u8], root: &[u8], msg: &[u8], sig: &[u8]) -> bool {
    if sig.len() != params.sig_bytes() || pub_seed.len() != params.n || root.len() != params.n {
        return false;
    }

    let hash = TweakHash::new(pub_seed);
    let (randomizer, rest) = sig.split_at(params.n);
    let (fors_sig, layers) = rest.split_at(params.fors_bytes());
    let digest = hash_message(params, randomizer, pub_seed, root, msg);

    let mut wots_addr = Address::default();
    let mut tree_addr = Address::default();
    wots_addr.set_type(AddressType::Wots);
    tree_addr.set_type(AddressType::HashTree);
    wots_addr.set_tree(digest.tree);
    wots_addr.set_keypair(digest.leaf);

    let mut node = fors_pk_from_sig(params, &hash, fors_sig, &digest.fors_msg, &wots_addr);
    let mut tree = digest.tree;
    let mut leaf = digest.leaf;
    let leaf_mask = u64::from(params.leaves_per_tree() - 1);

    for (layer, block) in (0..params.d).zip(layers.chunks_exact(params.layer_bytes())) {
        let (wots_sig, auth_path) = block.split_at(params.wots_bytes());
        tree_addr.set_layer(layer);
        tree_addr.set_tree(tree);
        wots_addr.copy_subtree_from(&tree_addr);
        wots_addr.set_keypair(leaf);

        let wots_pk = pk_from_sig(params, &hash, wots_sig, &node, &wots_addr);
        node = compute_root(&hash, &wots_pk, leaf, 0, auth_path, &tree_addr);

        leaf = u32::try_from(tree & leaf_mask).unwrap_or(u32::MAX);
        tree >>= params.tree_height();
    }

    node == root
}

//! Merkle trees over generated leaves: root and authentication path
//! computation, and root reconstruction from a path.

use crate::address::{Address, AddressType};
use crate::hash::{Context, TweakHash};
use crate::params::Params;
use crate::wots::WotsLeafGen;

/// Root of a tree together with the authentication path of one leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHash {
    /// Tree root
    pub root: Vec<u8>,
    /// Sibling nodes from the leaf level upwards
    pub auth_path: Vec<u8>,
}

/// Build a tree of height `tree_height` bottom-up.
///
/// Leaves are produced by `gen_leaf(idx_offset + i)`. Internal nodes are
/// hashed under `tree_addr` with their height and absolute index set. The
/// authentication path is collected for `leaf_idx` when one is given.
pub fn treehash<F>(
    hash: &TweakHash,
    tree_height: u32,
    leaf_idx: Option<u32>,
    idx_offset: u32,
    mut tree_addr: Address,
    mut gen_leaf: F,
) -> TreeHash
where
    F: FnMut(u32) -> Vec<u8>,
{
    let n = hash.n();
    let mut auth_path = vec![0u8; tree_height as usize * n];
    let mut stack: Vec<(u32, Vec<u8>)> = Vec::with_capacity(tree_height as usize + 1);

    for idx in 0..(1u32 << tree_height) {
        let mut node = gen_leaf(idx + idx_offset);
        let mut height = 0u32;
        let mut index = idx;

        loop {
            let is_sibling = leaf_idx
                .is_some_and(|leaf| height < tree_height && (index ^ (leaf >> height)) == 1);
            if is_sibling {
                let h = height as usize;
                auth_path[h * n..(h + 1) * n].copy_from_slice(&node);
            }

            let left = match stack.last() {
                Some((h, _)) if *h == height => stack.pop().map(|(_, left)| left),
                _ => None,
            };
            let Some(mut pair) = left else {
                break;
            };

            index >>= 1;
            height += 1;
            tree_addr.set_tree_height(height);
            tree_addr.set_tree_index(index + (idx_offset >> height));
            pair.extend_from_slice(&node);
            node = hash.thash(&pair, &tree_addr);
        }
        stack.push((height, node));
    }

    let root = stack.pop().map(|(_, root)| root).unwrap_or_default();
    TreeHash { root, auth_path }
}

/// Output of signing one hypertree layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleSignature {
    /// One-time signature of the message by leaf `idx_leaf`
    pub wots_sig: Vec<u8>,
    /// Authentication path of `idx_leaf`
    pub auth_path: Vec<u8>,
    /// Root of the signing tree, the message for the layer above
    pub root: Vec<u8>,
}

/// Sign `msg` with leaf `idx_leaf` of the tree selected by `tree_addr`.
///
/// `wots_addr` supplies the layer and tree for leaf generation.
#[must_use]
pub fn merkle_sign(
    params: &Params,
    ctx: &Context,
    msg: &[u8],
    wots_addr: &Address,
    tree_addr: &Address,
    idx_leaf: u32,
) -> MerkleSignature {
    let mut tree_addr = *tree_addr;
    tree_addr.set_type(AddressType::HashTree);

    let mut leaf_gen = WotsLeafGen::new(params, ctx, wots_addr).signing(idx_leaf, msg);
    let TreeHash { root, auth_path } = treehash(
        ctx.hash(),
        params.tree_height(),
        Some(idx_leaf),
        0,
        tree_addr,
        |idx| leaf_gen.gen_leaf(idx),
    );

    MerkleSignature {
        wots_sig: leaf_gen.into_signature(),
        auth_path,
        root,
    }
}

/// Root of the single tree in the top hypertree layer: the public root
#[must_use]
pub fn merkle_gen_root(params: &Params, ctx: &Context) -> Vec<u8> {
    let mut top = Address::default();
    top.set_layer(params.d - 1);
    let mut tree_addr = top;
    tree_addr.set_type(AddressType::HashTree);

    let mut leaf_gen = WotsLeafGen::new(params, ctx, &top);
    treehash(
        ctx.hash(),
        params.tree_height(),
        None,
        0,
        tree_addr,
        |idx| leaf_gen.gen_leaf(idx),
    )
    .root
}

/// Recompute a tree root from a leaf and its authentication path
#[must_use]
pub fn compute_root(
    hash: &TweakHash,
    leaf: &[u8],
    leaf_idx: u32,
    idx_offset: u32,
    auth_path: &[u8],
    addr: &Address,
) -> Vec<u8> {
    let n = hash.n();
    let mut addr = *addr;
    let mut node = leaf.to_vec();
    let mut index = leaf_idx;
    let mut offset = idx_offset;

    for (level, sibling) in auth_path.chunks_exact(n).enumerate() {
        let mut pair = Vec::with_capacity(2 * n);
        if index & 1 == 1 {
            pair.extend_from_slice(sibling);
            pair.extend_from_slice(&node);
        } else {
            pair.extend_from_slice(&node);
            pair.extend_from_slice(sibling);
        }
        index >>= 1;
        offset >>= 1;
        addr.set_tree_height(u32::try_from(level + 1).unwrap_or(u32::MAX));
        addr.set_tree_index(index + offset);
        node = hash.thash(&pair, &addr);
    }
    node
}

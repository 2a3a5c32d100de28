//! FORS few-time signatures.

use crate::address::{Address, AddressType};
use crate::hash::{Context, TweakHash};
use crate::merkle::{compute_root, treehash};
use crate::params::Params;

/// Leaf indices selected by `msg`, least significant bit first within each tree
#[must_use]
pub fn message_to_indices(params: &Params, msg: &[u8]) -> Vec<u32> {
    let mut offset = 0usize;
    (0..params.fors_trees)
        .map(|_| {
            let mut index = 0u32;
            for bit in 0..params.fors_height {
                let byte = msg.get(offset >> 3).copied().unwrap_or(0);
                index ^= u32::from((byte >> (offset & 7)) & 1) << bit;
                offset += 1;
            }
            index
        })
        .collect()
}

/// FORS signature and the public key it authenticates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForsSignature {
    /// Per tree: secret leaf value followed by its authentication path
    pub signature: Vec<u8>,
    /// Compressed tree roots
    pub public_key: Vec<u8>,
}

/// Sign `msg` (the FORS part of a message digest) under the key pair in `fors_addr`
#[must_use]
pub fn fors_sign(params: &Params, ctx: &Context, msg: &[u8], fors_addr: &Address) -> ForsSignature {
    let n = params.n;
    let mut tree_addr = Address::default();
    let mut leaf_addr = Address::default();
    let mut pk_addr = Address::default();
    tree_addr.copy_keypair_from(fors_addr);
    leaf_addr.copy_keypair_from(fors_addr);
    pk_addr.copy_keypair_from(fors_addr);
    pk_addr.set_type(AddressType::ForsPk);

    let mut signature = Vec::with_capacity(params.fors_bytes());
    let mut roots = Vec::with_capacity(params.fors_trees as usize * n);

    for (tree, &index) in (0..params.fors_trees).zip(&message_to_indices(params, msg)) {
        let idx_offset = tree << params.fors_height;

        tree_addr.set_tree_height(0);
        tree_addr.set_tree_index(index + idx_offset);
        tree_addr.set_type(AddressType::ForsPrf);
        signature.extend_from_slice(&ctx.prf_addr(&tree_addr));
        tree_addr.set_type(AddressType::ForsTree);

        let out = treehash(
            ctx.hash(),
            params.fors_height,
            Some(index),
            idx_offset,
            tree_addr,
            |idx| {
                leaf_addr.set_tree_index(idx);
                leaf_addr.set_type(AddressType::ForsPrf);
                let sk = ctx.prf_addr(&leaf_addr);
                leaf_addr.set_type(AddressType::ForsTree);
                ctx.thash(&sk, &leaf_addr)
            },
        );
        signature.extend_from_slice(&out.auth_path);
        roots.extend_from_slice(&out.root);
    }

    ForsSignature {
        signature,
        public_key: ctx.thash(&roots, &pk_addr),
    }
}

/// Recover the FORS public key from a signature of `msg`
#[must_use]
pub fn fors_pk_from_sig(
    params: &Params,
    hash: &TweakHash,
    sig: &[u8],
    msg: &[u8],
    fors_addr: &Address,
) -> Vec<u8> {
    let n = params.n;
    let per_tree = (params.fors_height as usize + 1) * n;
    let mut tree_addr = Address::default();
    let mut pk_addr = Address::default();
    tree_addr.copy_keypair_from(fors_addr);
    pk_addr.copy_keypair_from(fors_addr);
    tree_addr.set_type(AddressType::ForsTree);
    pk_addr.set_type(AddressType::ForsPk);

    let mut roots = Vec::with_capacity(params.fors_trees as usize * n);
    let indices = message_to_indices(params, msg);
    for ((tree, &index), block) in (0..params.fors_trees)
        .zip(&indices)
        .zip(sig.chunks_exact(per_tree))
    {
        let idx_offset = tree << params.fors_height;
        let (sk, auth_path) = block.split_at(n);

        tree_addr.set_tree_height(0);
        tree_addr.set_tree_index(index + idx_offset);
        let leaf = hash.thash(sk, &tree_addr);
        roots.extend_from_slice(&compute_root(
            hash, &leaf, index, idx_offset, auth_path, &tree_addr,
        ));
    }
    hash.thash(&roots, &pk_addr)
}

//! Winternitz one-time signatures.

use crate::address::{Address, AddressType};
use crate::hash::{Context, TweakHash};
use crate::params::Params;

/// Split `input` into `out_len` base-`w` digits, most significant first
fn base_w(params: &Params, input: &[u8], out_len: usize) -> Vec<u32> {
    let log_w = params.log_w();
    let mask = params.w - 1;
    let mut out = Vec::with_capacity(out_len);
    let mut bytes = input.iter();
    let mut total = 0u32;
    let mut bits = 0u32;

    for _ in 0..out_len {
        if bits == 0 {
            total = bytes.next().copied().map_or(0, u32::from);
            bits = 8;
        }
        bits -= log_w;
        out.push((total >> bits) & mask);
    }
    out
}

/// Chain lengths for signing `msg`: message digits followed by checksum digits
#[must_use]
pub fn chain_lengths(params: &Params, msg: &[u8]) -> Vec<u32> {
    let mut lengths = base_w(params, msg, params.wots_len1());

    let len2_bits = params.wots_len2() as u32 * params.log_w();
    let mut csum: u32 = lengths.iter().map(|&l| params.w - 1 - l).sum();
    csum <<= (8 - len2_bits % 8) % 8;
    let csum_bytes = csum.to_be_bytes();
    let used = (len2_bits as usize).div_ceil(8);
    lengths.extend(base_w(params, &csum_bytes[4 - used..], params.wots_len2()));
    lengths
}

/// Generates one-time public key leaves for a Merkle tree.
///
/// When configured with [`WotsLeafGen::signing`], generating the chosen leaf
/// also captures its one-time signature.
pub struct WotsLeafGen<'a> {
    params: &'a Params,
    ctx: &'a Context,
    leaf_addr: Address,
    pk_addr: Address,
    sign_leaf: Option<u32>,
    steps: Vec<u32>,
    signature: Vec<u8>,
}

impl<'a> WotsLeafGen<'a> {
    /// Leaf generator for the tree whose layer and index are taken from `subtree`
    #[must_use]
    pub fn new(params: &'a Params, ctx: &'a Context, subtree: &Address) -> Self {
        let mut leaf_addr = Address::default();
        let mut pk_addr = Address::default();
        leaf_addr.set_type(AddressType::Wots);
        pk_addr.set_type(AddressType::WotsPk);
        leaf_addr.copy_subtree_from(subtree);
        pk_addr.copy_subtree_from(subtree);

        Self {
            params,
            ctx,
            leaf_addr,
            pk_addr,
            sign_leaf: None,
            steps: Vec::new(),
            signature: vec![0u8; params.wots_bytes()],
        }
    }

    /// Capture the signature of `msg` while generating leaf `leaf_idx`
    #[must_use]
    pub fn signing(mut self, leaf_idx: u32, msg: &[u8]) -> Self {
        self.sign_leaf = Some(leaf_idx);
        self.steps = chain_lengths(self.params, msg);
        self
    }

    /// Compute the compressed one-time public key at `leaf_idx`
    pub fn gen_leaf(&mut self, leaf_idx: u32) -> Vec<u8> {
        let n = self.params.n;
        let capture = self.sign_leaf == Some(leaf_idx);
        let mut pk_buffer = Vec::with_capacity(self.params.wots_bytes());

        self.leaf_addr.set_keypair(leaf_idx);
        self.pk_addr.set_keypair(leaf_idx);

        for chain in 0..self.params.wots_len() {
            let chain_idx = u32::try_from(chain).unwrap_or(u32::MAX);
            self.leaf_addr.set_chain(chain_idx);
            self.leaf_addr.set_hash(0);
            self.leaf_addr.set_type(AddressType::WotsPrf);
            let mut node = self.ctx.prf_addr(&self.leaf_addr).to_vec();
            self.leaf_addr.set_type(AddressType::Wots);

            let target = capture.then(|| self.steps[chain]);
            for k in 0.. {
                if target == Some(k) {
                    self.signature[chain * n..(chain + 1) * n].copy_from_slice(&node);
                }
                if k == self.params.w - 1 {
                    break;
                }
                self.leaf_addr.set_hash(k);
                node = self.ctx.thash(&node, &self.leaf_addr);
            }
            pk_buffer.extend_from_slice(&node);
        }

        self.ctx.thash(&pk_buffer, &self.pk_addr)
    }

    /// The captured signature (all zero if the signing leaf was never generated)
    #[must_use]
    pub fn into_signature(self) -> Vec<u8> {
        self.signature
    }
}

/// Recover the compressed one-time public key from a signature of `msg`.
///
/// `addr` must carry the layer, tree and key pair of the signing leaf.
#[must_use]
pub fn pk_from_sig(
    params: &Params,
    hash: &TweakHash,
    sig: &[u8],
    msg: &[u8],
    addr: &Address,
) -> Vec<u8> {
    let n = params.n;
    let lengths = chain_lengths(params, msg);
    let mut chain_addr = *addr;
    chain_addr.set_type(AddressType::Wots);
    let mut pk_addr = Address::default();
    pk_addr.copy_keypair_from(addr);
    pk_addr.set_type(AddressType::WotsPk);

    let mut pk_buffer = Vec::with_capacity(params.wots_bytes());
    for (chain, (&start, block)) in lengths.iter().zip(sig.chunks_exact(n)).enumerate() {
        chain_addr.set_chain(u32::try_from(chain).unwrap_or(u32::MAX));
        let mut node = block.to_vec();
        for k in start..params.w - 1 {
            chain_addr.set_hash(k);
            node = hash.thash(&node, &chain_addr);
        }
        pk_buffer.extend_from_slice(&node);
    }
    hash.thash(&pk_buffer, &pk_addr)
}

//! SHAKE256 tweakable hash, PRFs and message hashing.

use crate::address::Address;
use crate::params::Params;
use sha3::Shake256;
use sha3::digest::{ExtendableOutput, Update, XofReader};
use zeroize::Zeroizing;

/// Public-seed keyed hashing.
///
/// The SHAKE256 state has already absorbed the public seed, so each call
/// clones it instead of re-absorbing the seed.
#[derive(Clone)]
pub struct TweakHash {
    pub_seed: Vec<u8>,
    seeded: Shake256,
}

impl TweakHash {
    /// Prepare hashing state for `pub_seed`
    #[must_use]
    pub fn new(pub_seed: &[u8]) -> Self {
        let mut seeded = Shake256::default();
        seeded.update(pub_seed);
        Self {
            pub_seed: pub_seed.to_vec(),
            seeded,
        }
    }

    /// Output length in bytes
    #[must_use]
    pub fn n(&self) -> usize {
        self.pub_seed.len()
    }

    /// The public seed this state was built from
    #[must_use]
    pub fn pub_seed(&self) -> &[u8] {
        &self.pub_seed
    }

    /// Robust tweakable hash over `input` (a whole number of `n`-byte blocks)
    #[must_use]
    pub fn thash(&self, input: &[u8], addr: &Address) -> Vec<u8> {
        let mut masked = vec![0u8; input.len()];
        let mut xof = self.seeded.clone();
        xof.update(addr.as_bytes());
        xof.finalize_xof().read(&mut masked);
        for (m, b) in masked.iter_mut().zip(input) {
            *m ^= b;
        }

        let mut xof = self.seeded.clone();
        xof.update(addr.as_bytes());
        xof.update(&masked);
        let mut out = vec![0u8; self.n()];
        xof.finalize_xof().read(&mut out);
        out
    }

    /// Address-keyed PRF over a secret seed
    #[must_use]
    pub fn prf_addr(&self, sk_seed: &[u8], addr: &Address) -> Zeroizing<Vec<u8>> {
        let mut xof = self.seeded.clone();
        xof.update(addr.as_bytes());
        xof.update(sk_seed);
        let mut out = Zeroizing::new(vec![0u8; self.n()]);
        xof.finalize_xof().read(&mut out);
        out
    }
}

/// Secret seed together with the public-seed hashing state
#[derive(Clone)]
pub struct Context {
    sk_seed: Zeroizing<Vec<u8>>,
    hash: TweakHash,
}

impl Context {
    /// Build a context from seeds of equal length
    #[must_use]
    pub fn new(sk_seed: &[u8], pub_seed: &[u8]) -> Self {
        Self {
            sk_seed: Zeroizing::new(sk_seed.to_vec()),
            hash: TweakHash::new(pub_seed),
        }
    }

    /// Secret seed
    #[must_use]
    pub fn sk_seed(&self) -> &[u8] {
        &self.sk_seed
    }

    /// Public-seed hashing state
    #[must_use]
    pub fn hash(&self) -> &TweakHash {
        &self.hash
    }

    /// See [`TweakHash::thash`]
    #[must_use]
    pub fn thash(&self, input: &[u8], addr: &Address) -> Vec<u8> {
        self.hash.thash(input, addr)
    }

    /// Secret value for the chain or FORS leaf selected by `addr`
    #[must_use]
    pub fn prf_addr(&self, addr: &Address) -> Zeroizing<Vec<u8>> {
        self.hash.prf_addr(&self.sk_seed, addr)
    }
}

/// Digest randomizer `R = SHAKE256(sk_prf || optrand || msg)`
#[must_use]
pub fn gen_message_random(sk_prf: &[u8], optrand: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut xof = Shake256::default();
    xof.update(sk_prf);
    xof.update(optrand);
    xof.update(msg);
    let mut out = vec![0u8; sk_prf.len()];
    xof.finalize_xof().read(&mut out);
    out
}

/// Message digest split into its FORS and hypertree parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDigest {
    /// Bytes signed by FORS
    pub fors_msg: Vec<u8>,
    /// Tree index at the bottom hypertree layer
    pub tree: u64,
    /// Leaf index within that tree
    pub leaf: u32,
}

/// Derive the FORS message and signing position from `R`, the public key and `msg`
#[must_use]
pub fn hash_message(
    params: &Params,
    randomizer: &[u8],
    pub_seed: &[u8],
    root: &[u8],
    msg: &[u8],
) -> MessageDigest {
    let mut xof = Shake256::default();
    xof.update(randomizer);
    xof.update(pub_seed);
    xof.update(root);
    xof.update(msg);
    let mut buf = vec![0u8; params.digest_bytes()];
    xof.finalize_xof().read(&mut buf);

    let (fors_msg, rest) = buf.split_at(params.fors_msg_bytes());
    let (tree_bytes, leaf_bytes) = rest.split_at(params.tree_bytes());

    let tree = bytes_to_u64(tree_bytes) & low_mask(params.tree_bits());
    let leaf_mask = low_mask(params.tree_height());
    let leaf = u32::try_from(bytes_to_u64(leaf_bytes) & leaf_mask).unwrap_or(u32::MAX);

    MessageDigest {
        fors_msg: fors_msg.to_vec(),
        tree,
        leaf,
    }
}

fn bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn low_mask(bits: u32) -> u64 {
    u64::MAX.checked_shr(64 - bits).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AddressType;
    use crate::params::{SHAKE_256S, SHAKE_TINY};

    #[test]
    fn test_thash_matches_unseeded_construction() {
        let pub_seed = [7u8; 32];
        let mut addr = Address::default();
        addr.set_type(AddressType::HashTree);
        let input = [0x5Au8; 64];

        let mut mask = [0u8; 64];
        let mut xof = Shake256::default();
        xof.update(&pub_seed);
        xof.update(addr.as_bytes());
        xof.finalize_xof().read(&mut mask);
        let masked: Vec<u8> = input.iter().zip(mask).map(|(a, b)| a ^ b).collect();
        let mut expected = [0u8; 32];
        let mut xof = Shake256::default();
        xof.update(&pub_seed);
        xof.update(addr.as_bytes());
        xof.update(&masked);
        xof.finalize_xof().read(&mut expected);

        assert_eq!(TweakHash::new(&pub_seed).thash(&input, &addr), expected);
    }

    #[test]
    fn test_thash_depends_on_address() {
        let hash = TweakHash::new(&[1u8; 16]);
        let a = Address::default();
        let mut b = Address::default();
        b.set_hash(1);
        assert_ne!(hash.thash(&[0u8; 16], &a), hash.thash(&[0u8; 16], &b));
    }

    #[test]
    fn test_prf_addr_length() {
        let ctx = Context::new(&[3u8; 32], &[4u8; 32]);
        assert_eq!(ctx.prf_addr(&Address::default()).len(), 32);
    }

    #[test]
    fn test_hash_message_masks_indices() {
        for params in [SHAKE_256S, SHAKE_TINY] {
            for m in 0u8..16 {
                let digest = hash_message(
                    &params,
                    &vec![m; params.n],
                    &vec![1u8; params.n],
                    &vec![2u8; params.n],
                    &[m],
                );
                assert_eq!(digest.fors_msg.len(), params.fors_msg_bytes());
                assert!(digest.tree >> params.tree_bits() == 0);
                assert!(digest.leaf < params.leaves_per_tree());
            }
        }
    }

    #[test]
    fn test_gen_message_random_is_deterministic() {
        let r1 = gen_message_random(&[9u8; 32], &[0u8; 32], b"msg");
        let r2 = gen_message_random(&[9u8; 32], &[0u8; 32], b"msg");
        assert_eq!(r1, r2);
        assert_ne!(r1, gen_message_random(&[9u8; 32], &[0u8; 32], b"msh"));
    }
}

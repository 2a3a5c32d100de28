//! Known-answer and round-trip properties of the building blocks
//!
//! Every signing primitive has a matching recovery function; recovering
//! from a fresh signature must land on the value the signer committed to.

use proptest::prelude::*;
use spxprobe_primitives::fors::fors_pk_from_sig;
use spxprobe_primitives::merkle::compute_root;
use spxprobe_primitives::wots::pk_from_sig;
use spxprobe_primitives::{
    Address, AddressType, Context, SHAKE_256S, SHAKE_TINY, WotsLeafGen, fors_sign,
    merkle_gen_root, merkle_sign,
};

const SK_SEED_HEX: &str = "07ad58d9a7b1f856a1c664b86ff2a73905c4be0a62821e8a6a51e03412fa893a";
const PUB_SEED_HEX: &str = "1a3d9ccc1e6cd4a4bebe2c60308404e4a350a87ef447e49aa7ee5061131bab63";
const SHAKE_256S_ROOT_HEX: &str =
    "db089af94297289989a7bacc7d73841eaecffb7f78c178a02a64226a2aff07be";

fn tiny_ctx() -> Context {
    Context::new(&[0x3Cu8; 16], &[0xC3u8; 16])
}

#[test]
fn test_shake_256s_root_known_answer() {
    let sk_seed = hex::decode(SK_SEED_HEX).unwrap();
    let pub_seed = hex::decode(PUB_SEED_HEX).unwrap();
    let ctx = Context::new(&sk_seed, &pub_seed);
    let root = merkle_gen_root(&SHAKE_256S, &ctx);
    assert_eq!(hex::encode(root), SHAKE_256S_ROOT_HEX);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn wots_signature_recovers_leaf(
        msg in proptest::array::uniform16(any::<u8>()),
        layer in 0u32..8,
        tree in 0u64..1 << 20,
        leaf in 0u32..8,
    ) {
        let params = SHAKE_TINY;
        let ctx = tiny_ctx();
        let mut subtree = Address::default();
        subtree.set_layer(layer);
        subtree.set_tree(tree);

        let mut leaf_gen = WotsLeafGen::new(&params, &ctx, &subtree).signing(leaf, &msg);
        let expected = leaf_gen.gen_leaf(leaf);
        let sig = leaf_gen.into_signature();

        let mut addr = subtree;
        addr.set_keypair(leaf);
        prop_assert_eq!(pk_from_sig(&params, ctx.hash(), &sig, &msg, &addr), expected);
    }

    #[test]
    fn merkle_path_recomputes_root(
        msg in proptest::array::uniform16(any::<u8>()),
        tree in 0u64..1 << 18,
        leaf in 0u32..8,
    ) {
        let params = SHAKE_TINY;
        let ctx = tiny_ctx();
        let mut tree_addr = Address::default();
        tree_addr.set_layer(2);
        tree_addr.set_tree(tree);
        tree_addr.set_type(AddressType::HashTree);
        let mut wots_addr = Address::default();
        wots_addr.set_type(AddressType::Wots);
        wots_addr.copy_subtree_from(&tree_addr);
        wots_addr.set_keypair(leaf);

        let signed = merkle_sign(&params, &ctx, &msg, &wots_addr, &tree_addr, leaf);
        let wots_leaf = pk_from_sig(&params, ctx.hash(), &signed.wots_sig, &msg, &wots_addr);
        let root = compute_root(ctx.hash(), &wots_leaf, leaf, 0, &signed.auth_path, &tree_addr);
        prop_assert_eq!(root, signed.root);
    }

    #[test]
    fn fors_signature_recovers_public_key(
        msg in proptest::collection::vec(any::<u8>(), SHAKE_TINY.fors_msg_bytes()),
        keypair in 0u32..8,
    ) {
        let params = SHAKE_TINY;
        let ctx = tiny_ctx();
        let mut fors_addr = Address::default();
        fors_addr.set_tree(0x15);
        fors_addr.set_keypair(keypair);

        let signed = fors_sign(&params, &ctx, &msg, &fors_addr);
        prop_assert_eq!(signed.signature.len(), params.fors_bytes());
        prop_assert_eq!(
            fors_pk_from_sig(&params, ctx.hash(), &signed.signature, &msg, &fors_addr),
            signed.public_key
        );
    }
}

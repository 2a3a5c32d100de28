//! SPHINCS+ building blocks at sub-operation granularity
//!
//! Implements the round-3 `shake256-robust` construction split into the
//! pieces a measurement target needs to drive individually: the tweakable
//! hash, WOTS+ leaf generation with signature capture, Merkle tree hashing,
//! FORS, message hashing and verification.
//!
//! Every function here is deterministic and infallible; callers are expected
//! to pass buffers sized according to [`Params`].

#![warn(missing_docs)]

pub mod address;
pub mod fors;
pub mod hash;
pub mod merkle;
pub mod params;
pub mod verify;
pub mod wots;

pub use address::{Address, AddressType};
pub use fors::{ForsSignature, fors_sign};
pub use hash::{Context, MessageDigest, TweakHash, gen_message_random, hash_message};
pub use merkle::{MerkleSignature, merkle_gen_root, merkle_sign};
pub use params::{Params, SHAKE_256S, SHAKE_TINY};
pub use verify::verify;
pub use wots::{WotsLeafGen, chain_lengths};

//! Partial-resign SPHINCS+ measurement target
//!
//! Firmware logic for a device under side-channel and fault analysis. The
//! target holds one SPHINCS+ key and, on command, regenerates exactly the
//! part of a signature that links two adjacent hypertree layers for a
//! host-chosen address, raising a trigger line around the computation.
//!
//! # Components
//!
//! - `address`: packed 64-bit hypertree addresses and their cache tags
//! - `cache`: FIFO ring of tags gating the cached partial signer
//! - `keystore`: seeds, PRF key and derived public root
//! - `partial` / `full`: two-layer resign and the full signing walk
//! - `protocol` / `server`: fixed-length command protocol and receive loop
//! - `client`: the host side of the protocol
//!
//! # Example
//!
//! ```rust
//! use spxprobe_signer_lib::{CacheOutcome, PackedAddress, TINY_TARGET, Target};
//!
//! let mut target = Target::new(TINY_TARGET);
//! let packed = PackedAddress::new(0x0301);
//!
//! assert_eq!(target.sign_cached(packed).unwrap(), CacheOutcome::Signed);
//! assert_eq!(target.sign_cached(packed).unwrap(), CacheOutcome::Cached);
//! assert_eq!(target.buffer().len(), TINY_TARGET.params.layer_bytes());
//! ```

#![warn(missing_docs)]

pub mod address;
pub mod buffer;
pub mod cache;
pub mod client;
pub mod full;
pub mod keystore;
pub mod partial;
pub mod protocol;
pub mod serial;
pub mod server;
pub mod signer;
pub mod target;
/// Test doubles for triggers and streams
pub mod test_utils;
pub mod trigger;

// Re-export commonly used types
pub use address::{LayerPosition, PackedAddress};
pub use buffer::SignatureBuffer;
pub use cache::{AddressCache, CACHE_SIZE, TargetCache};
pub use client::{ClientError, TargetClient};
pub use full::{FullSignature, LayerSignature};
pub use keystore::KeyStore;
pub use partial::{PartialSignature, sign_adjacent_layers};
pub use protocol::{BANNER, Command, ProtocolError, Reply, Status};
pub use serial::{SerialError, SerialPort};
pub use server::{CommandTable, ServerError, serve};
pub use signer::{SHAKE_256S_TARGET, SignerError, TINY_TARGET, TargetConfig};
pub use target::{CacheOutcome, Target};
pub use trigger::{NullTrigger, PinTrigger, Trigger, TriggerGuard};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

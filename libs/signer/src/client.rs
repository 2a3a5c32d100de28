//! Host side of the command protocol
//!
//! [`TargetClient`] frames requests, checks status bytes and reads back the
//! fixed-length outputs. It is used by the measurement host utility and by
//! the integration tests.

use crate::address::PackedAddress;
use crate::protocol::{
    BANNER, Command, ProtocolError, Reply, SIGN_MESSAGE_BYTES, Status, encode_chunk_index,
    encode_request,
};
use crate::target::CacheOutcome;
use spxprobe_primitives::Params;
use std::io::{self, Read, Write};
use thiserror::Error;
use zeroize::Zeroizing;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Framing or decoding failed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Target answered with a non-success status
    #[error("{command:?} failed with status {status:?}")]
    Status {
        /// Command sent
        command: Command,
        /// Status received
        status: Status,
    },

    /// Requested read-back is not a whole number of chunks
    #[error("Signature length {len} is not a multiple of {chunk}")]
    ChunkAlignment {
        /// Requested length
        len: usize,
        /// Chunk size
        chunk: usize,
    },

    /// Read-back needs more chunks than the index can address
    #[error("Signature length {0} needs too many chunks")]
    TooManyChunks(usize),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Protocol driver over a connected stream
#[derive(Debug)]
pub struct TargetClient<S> {
    stream: S,
    params: Params,
}

impl<S: Read + Write> TargetClient<S> {
    /// Client for a target running `params`
    pub fn new(stream: S, params: Params) -> Self {
        Self { stream, params }
    }

    /// Parameter set the client frames requests for
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Release the stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Consume the startup banner
    pub fn read_banner(&mut self) -> Result<()> {
        let mut banner = vec![0u8; BANNER.len()];
        self.stream.read_exact(&mut banner)?;
        if banner != BANNER {
            return Err(ProtocolError::Banner(banner).into());
        }
        log::debug!("Target banner received");
        Ok(())
    }

    /// Send one command and read its reply
    ///
    /// Non-success statuses are returned, not turned into errors.
    pub fn execute(&mut self, command: Command, payload: &[u8]) -> Result<Reply> {
        let request = encode_request(&self.params, command, payload)?;
        self.stream.write_all(&request)?;
        self.stream.flush()?;

        let mut status = [0u8; 1];
        self.stream.read_exact(&mut status)?;
        let status = Status::try_from(status[0])?;
        if status != Status::Ok {
            log::debug!("{command:?} -> {status:?}");
            return Ok(Reply::status(status));
        }

        let mut output = vec![0u8; command.output_len(&self.params)];
        self.stream.read_exact(&mut output)?;
        Ok(Reply::ok(output))
    }

    fn expect_ok(&mut self, command: Command, payload: &[u8]) -> Result<Vec<u8>> {
        let reply = self.execute(command, payload)?;
        match reply.status {
            Status::Ok => Ok(reply.output),
            status => Err(ClientError::Status { command, status }),
        }
    }

    /// Install secret seed, PRF key and public seed
    pub fn install_key(&mut self, material: &[u8]) -> Result<()> {
        self.expect_ok(Command::InstallKey, material).map(drop)
    }

    /// Public root followed by public seed
    pub fn public_key(&mut self) -> Result<Vec<u8>> {
        self.expect_ok(Command::GetPublic, &[])
    }

    /// Secret seed followed by PRF key
    pub fn secret_key(&mut self) -> Result<Zeroizing<Vec<u8>>> {
        self.expect_ok(Command::GetSecret, &[]).map(Zeroizing::new)
    }

    /// Partial resign at the straight layer
    pub fn sign_straight(&mut self, packed: PackedAddress) -> Result<()> {
        self.expect_ok(Command::SignStraight, &packed.to_be_bytes()).map(drop)
    }

    /// Insert the tag of `packed` into the target cache
    pub fn fill_cache(&mut self, packed: PackedAddress) -> Result<()> {
        self.expect_ok(Command::FillCache, &packed.to_be_bytes()).map(drop)
    }

    /// Cache-gated partial resign at the cached layer
    pub fn sign_cached(&mut self, packed: PackedAddress) -> Result<CacheOutcome> {
        let command = Command::SignCached;
        match self.execute(command, &packed.to_be_bytes())?.status {
            Status::Ok => Ok(CacheOutcome::Signed),
            Status::Cached => Ok(CacheOutcome::Cached),
            status => Err(ClientError::Status { command, status }),
        }
    }

    /// One `N`-byte chunk of the last result
    pub fn signature_chunk(&mut self, index: u16) -> Result<Vec<u8>> {
        self.expect_ok(Command::GetSignatureChunk, &encode_chunk_index(index))
    }

    /// First `len` bytes of the last result, read chunk by chunk
    pub fn read_signature(&mut self, len: usize) -> Result<Vec<u8>> {
        let chunk = self.params.n;
        if len % chunk != 0 {
            return Err(ClientError::ChunkAlignment { len, chunk });
        }
        let chunks = u16::try_from(len / chunk).map_err(|_| ClientError::TooManyChunks(len))?;
        let mut out = Vec::with_capacity(len);
        for index in 0..chunks {
            out.extend_from_slice(&self.signature_chunk(index)?);
        }
        Ok(out)
    }

    /// Tweakable hash of `block` under the diagnostic address
    pub fn test_thash(&mut self, block: &[u8]) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestThash, block)
    }

    /// Diagnostic one-time key leaf signing `msg`
    pub fn test_wots(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestWots, msg)
    }

    /// Diagnostic Merkle signing of `msg`; returns the tree root
    pub fn test_merkle(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestMerkle, msg)
    }

    /// Diagnostic FORS signing of `msg`; returns the FORS public key
    pub fn test_fors(&mut self, msg: &[u8]) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestFors, msg)
    }

    /// Diagnostic full signature of a 32-byte message; returns `R`
    pub fn test_sign(&mut self, message: &[u8; SIGN_MESSAGE_BYTES]) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestSign, message)
    }

    /// Hold the trigger high for `rounds` spin units
    pub fn test_trigger(&mut self, rounds: u8) -> Result<Vec<u8>> {
        self.expect_ok(Command::TestTrigger, &[rounds])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedStream;
    use spxprobe_primitives::SHAKE_TINY;

    #[test]
    fn test_banner_mismatch() {
        let stream = ScriptedStream::new(b"SPHINX+\n\0".to_vec());
        let mut client = TargetClient::new(stream, SHAKE_TINY);
        assert!(matches!(
            client.read_banner(),
            Err(ClientError::Protocol(ProtocolError::Banner(_)))
        ));
    }

    #[test]
    fn test_cached_status_is_not_an_error() {
        let mut client = TargetClient::new(ScriptedStream::new(vec![0x01]), SHAKE_TINY);
        assert_eq!(
            client.sign_cached(PackedAddress::new(0x100)).unwrap(),
            CacheOutcome::Cached
        );
        let sent = client.into_inner();
        assert_eq!(sent.written(), &[b'z', 0, 0, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_rejected_status_is_an_error() {
        let mut client = TargetClient::new(ScriptedStream::new(vec![0x02]), SHAKE_TINY);
        assert!(matches!(
            client.signature_chunk(9),
            Err(ClientError::Status {
                status: Status::Rejected,
                ..
            })
        ));
    }

    #[test]
    fn test_read_signature_alignment() {
        let mut client = TargetClient::new(ScriptedStream::new(Vec::new()), SHAKE_TINY);
        assert!(matches!(
            client.read_signature(SHAKE_TINY.n + 1),
            Err(ClientError::ChunkAlignment { .. })
        ));
    }
}

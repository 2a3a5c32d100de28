//! Binary command protocol between measurement host and target
//!
//! A request is a single command byte followed by a payload whose length is
//! fixed per command (and per parameter set); nothing on the wire describes
//! its own length. A response is one status byte followed, when the status
//! is [`Status::Ok`], by the command's fixed-length output.
//!
//! On startup the target writes [`BANNER`] before serving requests.

use spxprobe_primitives::Params;
use thiserror::Error;

/// Written once by the target before its receive loop starts
pub const BANNER: &[u8] = b"SPHINCS+\n";

/// Message length accepted by the diagnostic full-sign command
pub const SIGN_MESSAGE_BYTES: usize = 32;

/// Output of the diagnostic trigger command
pub const TRIGGER_ECHO: [u8; 2] = [0xEF, 0x01];

/// Protocol errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Unknown command byte
    #[error("Unknown command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Unknown status byte
    #[error("Unknown status byte: 0x{0:02X}")]
    UnknownStatus(u8),

    /// Payload does not match the command's fixed length
    #[error("Invalid payload for {command:?}: expected {expected} bytes, got {actual}")]
    PayloadLength {
        /// Command being encoded
        command: Command,
        /// Fixed payload length
        expected: usize,
        /// Length supplied
        actual: usize,
    },

    /// Target did not greet with the expected banner
    #[error("Unexpected banner: {0:02X?}")]
    Banner(Vec<u8>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Commands understood by the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Install secret seed, PRF key and public seed
    /// Id: `k`
    InstallKey,
    /// Read public root and public seed
    /// Id: `p`
    GetPublic,
    /// Read one `N`-byte chunk of the last signing result
    /// Id: `r`
    GetSignatureChunk,
    /// Read secret seed and PRF key
    /// Id: `s`
    GetSecret,
    /// Partial resign at the straight layer
    /// Id: `x`
    SignStraight,
    /// Insert an address tag into the cache without signing
    /// Id: `q`
    FillCache,
    /// Cache-gated partial resign at the cached layer
    /// Id: `z`
    SignCached,
    /// Tweakable hash of one block under the fixed diagnostic address
    /// Id: `a`
    TestThash,
    /// One-time key leaf generation with signature capture
    /// Id: `b`
    TestWots,
    /// Merkle signing of the first bottom-layer tree
    /// Id: `c`
    TestMerkle,
    /// FORS signing under the all-zero address
    /// Id: `d`
    TestFors,
    /// Full signature of a 32-byte message
    /// Id: `e`
    TestSign,
    /// Busy-loop with the trigger raised
    /// Id: `t`
    TestTrigger,
}

impl Command {
    /// Every command, core commands first
    pub const ALL: [Command; 13] = [
        Command::InstallKey,
        Command::GetPublic,
        Command::GetSignatureChunk,
        Command::GetSecret,
        Command::SignStraight,
        Command::FillCache,
        Command::SignCached,
        Command::TestThash,
        Command::TestWots,
        Command::TestMerkle,
        Command::TestFors,
        Command::TestSign,
        Command::TestTrigger,
    ];

    /// Wire identifier
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Command::InstallKey => b'k',
            Command::GetPublic => b'p',
            Command::GetSignatureChunk => b'r',
            Command::GetSecret => b's',
            Command::SignStraight => b'x',
            Command::FillCache => b'q',
            Command::SignCached => b'z',
            Command::TestThash => b'a',
            Command::TestWots => b'b',
            Command::TestMerkle => b'c',
            Command::TestFors => b'd',
            Command::TestSign => b'e',
            Command::TestTrigger => b't',
        }
    }

    /// Look up a command by wire identifier
    #[must_use]
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.id() == id)
    }

    /// Only registered in diagnostic builds
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(
            self,
            Command::TestThash
                | Command::TestWots
                | Command::TestMerkle
                | Command::TestFors
                | Command::TestSign
                | Command::TestTrigger
        )
    }

    /// Fixed request payload length
    #[must_use]
    pub const fn payload_len(self, params: &Params) -> usize {
        match self {
            Command::InstallKey => params.key_material_bytes(),
            Command::GetPublic | Command::GetSecret => 0,
            Command::GetSignatureChunk => 2,
            Command::SignStraight | Command::FillCache | Command::SignCached => {
                crate::address::PACKED_ADDRESS_BYTES
            }
            Command::TestThash | Command::TestWots | Command::TestMerkle => params.n,
            Command::TestFors => params.fors_msg_bytes(),
            Command::TestSign => SIGN_MESSAGE_BYTES,
            Command::TestTrigger => 1,
        }
    }

    /// Fixed response output length on success
    #[must_use]
    pub const fn output_len(self, params: &Params) -> usize {
        match self {
            Command::InstallKey
            | Command::SignStraight
            | Command::FillCache
            | Command::SignCached => 0,
            Command::GetPublic | Command::GetSecret => 2 * params.n,
            Command::GetSignatureChunk
            | Command::TestThash
            | Command::TestWots
            | Command::TestMerkle
            | Command::TestFors
            | Command::TestSign => params.n,
            Command::TestTrigger => TRIGGER_ECHO.len(),
        }
    }
}

impl TryFrom<u8> for Command {
    type Error = ProtocolError;

    fn try_from(id: u8) -> Result<Self> {
        Self::from_id(id).ok_or(ProtocolError::UnknownCommand(id))
    }
}

/// Response status byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    /// Done; output follows
    Ok = 0x00,
    /// Address tag already cached; nothing computed
    Cached = 0x01,
    /// Argument out of range; nothing changed
    Rejected = 0x02,
    /// Command byte not registered
    UnknownCommand = 0xFF,
}

impl Status {
    /// Wire value
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Status {
    type Error = ProtocolError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(Status::Ok),
            0x01 => Ok(Status::Cached),
            0x02 => Ok(Status::Rejected),
            0xFF => Ok(Status::UnknownCommand),
            other => Err(ProtocolError::UnknownStatus(other)),
        }
    }
}

/// A handler's answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Outcome
    pub status: Status,
    /// Output bytes, sent only with [`Status::Ok`]
    pub output: Vec<u8>,
}

impl Reply {
    /// Success carrying `output`
    #[must_use]
    pub fn ok(output: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            output,
        }
    }

    /// Success without output
    #[must_use]
    pub fn done() -> Self {
        Self::ok(Vec::new())
    }

    /// Non-success status
    #[must_use]
    pub fn status(status: Status) -> Self {
        Self {
            status,
            output: Vec::new(),
        }
    }

    /// Wire form
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.output.len());
        out.push(self.status.as_byte());
        if self.status == Status::Ok {
            out.extend_from_slice(&self.output);
        }
        out
    }
}

/// Frame a request, checking the payload length
pub fn encode_request(params: &Params, command: Command, payload: &[u8]) -> Result<Vec<u8>> {
    let expected = command.payload_len(params);
    if payload.len() != expected {
        return Err(ProtocolError::PayloadLength {
            command,
            expected,
            actual: payload.len(),
        });
    }
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(command.id());
    out.extend_from_slice(payload);
    Ok(out)
}

/// Chunk index payload (little-endian)
#[must_use]
pub const fn encode_chunk_index(index: u16) -> [u8; 2] {
    index.to_le_bytes()
}

/// Decode a chunk index payload
#[must_use]
pub fn decode_chunk_index(payload: &[u8]) -> Option<u16> {
    <[u8; 2]>::try_from(payload).ok().map(u16::from_le_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spxprobe_primitives::SHAKE_256S;

    #[test]
    fn test_command_ids_unique() {
        for (i, a) in Command::ALL.iter().enumerate() {
            for b in &Command::ALL[i + 1..] {
                assert_ne!(a.id(), b.id(), "{a:?} and {b:?}");
            }
            assert_eq!(Command::from_id(a.id()), Some(*a));
        }
    }

    #[test]
    fn test_shake_256s_lengths() {
        let p = SHAKE_256S;
        assert_eq!(Command::InstallKey.payload_len(&p), 96);
        assert_eq!(Command::GetSignatureChunk.payload_len(&p), 2);
        assert_eq!(Command::SignCached.payload_len(&p), 8);
        assert_eq!(Command::TestFors.payload_len(&p), 39);
        assert_eq!(Command::TestSign.payload_len(&p), 32);
        assert_eq!(Command::GetPublic.output_len(&p), 64);
        assert_eq!(Command::TestTrigger.output_len(&p), 2);
    }

    #[test]
    fn test_unknown_bytes() {
        assert!(matches!(
            Command::try_from(b'w'),
            Err(ProtocolError::UnknownCommand(b'w'))
        ));
        assert!(matches!(
            Status::try_from(0x03),
            Err(ProtocolError::UnknownStatus(0x03))
        ));
    }

    #[test]
    fn test_reply_output_only_on_success() {
        assert_eq!(Reply::ok(vec![1, 2]).encode(), vec![0x00, 1, 2]);
        assert_eq!(Reply::status(Status::Cached).encode(), vec![0x01]);
    }

    #[test]
    fn test_encode_request_checks_length() {
        let p = SHAKE_256S;
        assert_eq!(
            encode_request(&p, Command::GetSignatureChunk, &encode_chunk_index(0x0102)).unwrap(),
            vec![b'r', 0x02, 0x01]
        );
        assert!(matches!(
            encode_request(&p, Command::SignCached, &[0; 7]),
            Err(ProtocolError::PayloadLength {
                expected: 8,
                actual: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_chunk_index_little_endian() {
        assert_eq!(decode_chunk_index(&[0x4A, 0x00]), Some(74));
        assert_eq!(decode_chunk_index(&[0x4A]), None);
    }
}

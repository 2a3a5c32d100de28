//! Command dispatch and receive loop
//!
//! [`serve`] runs the target's single-threaded loop over any byte stream:
//! read a command byte, look it up in the [`CommandTable`], read its fixed
//! payload, run the handler to completion and write the reply. Only
//! transport errors end the loop; rejected arguments are answered with
//! [`Status::Rejected`].

use crate::address::{PACKED_ADDRESS_BYTES, PackedAddress};
use crate::protocol::{BANNER, Command, Reply, Status, decode_chunk_index};
use crate::signer::SignerError;
use crate::target::{CacheOutcome, Target};
use spxprobe_primitives::Params;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use zeroize::Zeroizing;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Outcome of a handler; errors are answered with [`Status::Rejected`]
pub type HandlerResult = std::result::Result<Reply, SignerError>;

/// Command handler: runs to completion on the target
pub type Handler = fn(&mut Target, &[u8]) -> HandlerResult;

/// One registered command
#[derive(Clone, Copy)]
pub struct CommandEntry {
    /// Command
    pub command: Command,
    /// Fixed payload length read before dispatch
    pub payload_len: usize,
    handler: Handler,
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("command", &self.command)
            .field("payload_len", &self.payload_len)
            .finish_non_exhaustive()
    }
}

/// Command byte to (payload length, handler)
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    /// Table for `params`; diagnostic commands are included only with the
    /// `diagnostics` feature
    #[must_use]
    pub fn new(params: &Params) -> Self {
        let mut table = Self {
            entries: Vec::with_capacity(Command::ALL.len()),
        };
        table.register(params, Command::InstallKey, handle_install_key);
        table.register(params, Command::GetPublic, handle_get_public);
        table.register(params, Command::GetSignatureChunk, handle_signature_chunk);
        table.register(params, Command::GetSecret, handle_get_secret);
        table.register(params, Command::SignStraight, handle_sign_straight);
        table.register(params, Command::FillCache, handle_fill_cache);
        table.register(params, Command::SignCached, handle_sign_cached);

        #[cfg(feature = "diagnostics")]
        {
            table.register(params, Command::TestThash, diagnostics::handle_thash);
            table.register(params, Command::TestWots, diagnostics::handle_wots);
            table.register(params, Command::TestMerkle, diagnostics::handle_merkle);
            table.register(params, Command::TestFors, diagnostics::handle_fors);
            table.register(params, Command::TestSign, diagnostics::handle_sign);
            table.register(params, Command::TestTrigger, diagnostics::handle_trigger);
        }

        table
    }

    fn register(&mut self, params: &Params, command: Command, handler: Handler) {
        self.entries.push(CommandEntry {
            command,
            payload_len: command.payload_len(params),
            handler,
        });
    }

    /// Entry for a command byte
    #[must_use]
    pub fn lookup(&self, id: u8) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.command.id() == id)
    }

    /// Registered commands in registration order
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.entries.iter().map(|e| e.command)
    }

    /// Run one command on `target`
    ///
    /// Signer errors become [`Status::Rejected`]. Unregistered bytes get
    /// [`Status::UnknownCommand`].
    pub fn dispatch(&self, target: &mut Target, id: u8, payload: &[u8]) -> Reply {
        let Some(entry) = self.lookup(id) else {
            log::warn!("Unknown command 0x{id:02X}");
            return Reply::status(Status::UnknownCommand);
        };
        match (entry.handler)(target, payload) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("{:?} rejected: {e}", entry.command);
                Reply::status(Status::Rejected)
            }
        }
    }
}

/// Write the startup banner
pub fn write_banner<W: Write>(stream: &mut W) -> Result<()> {
    stream.write_all(BANNER)?;
    stream.flush()?;
    Ok(())
}

/// Serve requests from `stream` until it reaches end of stream
///
/// Returns the number of commands handled.
pub fn serve<S: Read + Write>(
    stream: &mut S,
    target: &mut Target,
    table: &CommandTable,
) -> Result<u64> {
    let mut handled = 0u64;
    loop {
        let Some(id) = read_command(stream)? else {
            log::debug!("Stream closed after {handled} commands");
            return Ok(handled);
        };

        #[cfg(feature = "perf-trace")]
        let request_start = std::time::Instant::now();

        let reply = match table.lookup(id) {
            Some(entry) => {
                let mut payload = Zeroizing::new(vec![0u8; entry.payload_len]);
                stream.read_exact(&mut payload)?;
                log::debug!("<= {:?} ({} byte payload)", entry.command, payload.len());
                table.dispatch(target, id, &payload)
            }
            // No payload is consumed for unknown commands
            None => table.dispatch(target, id, &[]),
        };

        #[cfg(feature = "perf-trace")]
        eprintln!("[PERF] Command 0x{id:02X}: {:?}", request_start.elapsed());

        stream.write_all(&reply.encode())?;
        stream.flush()?;
        log::debug!("=> {:?}, {} output bytes", reply.status, reply.output.len());
        handled += 1;
    }
}

/// Read one command byte. Returns None at end of stream.
fn read_command<R: Read>(stream: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    match stream.read_exact(&mut byte) {
        Ok(()) => Ok(Some(byte[0])),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Accept TCP connections one at a time and serve each to completion
///
/// Target state carries over between connections, as it does across host
/// sessions on a serial line.
pub fn listen(
    address: SocketAddr,
    target: &mut Target,
    table: &CommandTable,
    banner: bool,
) -> Result<()> {
    let listener = TcpListener::bind(address)?;
    log::info!("Listening on {address}");
    serve_listener(&listener, target, table, banner)
}

/// Serve connections from an already bound `listener`
///
/// Returns only on an accept or socket setup error.
pub fn serve_listener(
    listener: &TcpListener,
    target: &mut Target,
    table: &CommandTable,
    banner: bool,
) -> Result<()> {
    loop {
        let (mut socket, peer) = listener.accept()?;
        log::info!("Host connected from {peer}");
        configure_socket(&socket)?;
        if banner {
            write_banner(&mut socket)?;
        }
        match serve(&mut socket, target, table) {
            Ok(handled) => log::info!("Host {peer} disconnected after {handled} commands"),
            Err(e) => log::warn!("Connection error from {peer}: {e}"),
        }
    }
}

fn configure_socket(socket: &TcpStream) -> Result<()> {
    socket.set_nodelay(true)?;
    Ok(())
}

fn packed_address(payload: &[u8]) -> std::result::Result<PackedAddress, SignerError> {
    <[u8; PACKED_ADDRESS_BYTES]>::try_from(payload)
        .map(PackedAddress::from_be_bytes)
        .map_err(|_| SignerError::PayloadLength {
            expected: PACKED_ADDRESS_BYTES,
            actual: payload.len(),
        })
}

fn handle_install_key(target: &mut Target, payload: &[u8]) -> HandlerResult {
    target.install_key(payload)?;
    Ok(Reply::done())
}

fn handle_get_public(target: &mut Target, _: &[u8]) -> HandlerResult {
    Ok(Reply::ok(target.public_key()))
}

fn handle_get_secret(target: &mut Target, _: &[u8]) -> HandlerResult {
    Ok(Reply::ok(target.secret_key().to_vec()))
}

fn handle_signature_chunk(target: &mut Target, payload: &[u8]) -> HandlerResult {
    let index = decode_chunk_index(payload).ok_or(SignerError::PayloadLength {
        expected: 2,
        actual: payload.len(),
    })?;
    Ok(Reply::ok(target.signature_chunk(index)?.to_vec()))
}

fn handle_sign_straight(target: &mut Target, payload: &[u8]) -> HandlerResult {
    target.sign_straight(packed_address(payload)?)?;
    Ok(Reply::done())
}

fn handle_fill_cache(target: &mut Target, payload: &[u8]) -> HandlerResult {
    target.fill_cache(packed_address(payload)?);
    Ok(Reply::done())
}

fn handle_sign_cached(target: &mut Target, payload: &[u8]) -> HandlerResult {
    Ok(match target.sign_cached(packed_address(payload)?)? {
        CacheOutcome::Signed => Reply::done(),
        CacheOutcome::Cached => Reply::status(Status::Cached),
    })
}

#[cfg(feature = "diagnostics")]
mod diagnostics {
    use super::{HandlerResult, Reply, Target};

    pub(super) fn handle_thash(target: &mut Target, payload: &[u8]) -> HandlerResult {
        Ok(Reply::ok(target.test_thash(payload)))
    }

    pub(super) fn handle_wots(target: &mut Target, payload: &[u8]) -> HandlerResult {
        Ok(Reply::ok(target.test_wots(payload)))
    }

    pub(super) fn handle_merkle(target: &mut Target, payload: &[u8]) -> HandlerResult {
        Ok(Reply::ok(target.test_merkle(payload)))
    }

    pub(super) fn handle_fors(target: &mut Target, payload: &[u8]) -> HandlerResult {
        Ok(Reply::ok(target.test_fors(payload)))
    }

    pub(super) fn handle_sign(target: &mut Target, payload: &[u8]) -> HandlerResult {
        Ok(Reply::ok(target.test_sign(payload)))
    }

    pub(super) fn handle_trigger(target: &mut Target, payload: &[u8]) -> HandlerResult {
        let rounds = payload.first().copied().unwrap_or(0);
        Ok(Reply::ok(target.test_trigger(rounds).to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_chunk_index;
    use crate::signer::TINY_TARGET;
    use crate::test_utils::{ScriptedStream, script};

    fn run(input: Vec<u8>) -> (ScriptedStream, Target, u64) {
        let mut target = Target::new(TINY_TARGET);
        let table = CommandTable::new(&TINY_TARGET.params);
        let mut stream = ScriptedStream::new(input);
        let handled = serve(&mut stream, &mut target, &table).unwrap();
        (stream, target, handled)
    }

    #[test]
    fn test_empty_stream_ends_cleanly() {
        let (stream, _, handled) = run(Vec::new());
        assert_eq!(handled, 0);
        assert!(stream.written().is_empty());
    }

    #[test]
    fn test_unknown_command_consumes_no_payload() {
        let (stream, _, handled) = run(script(&[b"w", b"p"]));
        assert_eq!(handled, 2);
        let out = stream.written();
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[1], 0x00);
        assert_eq!(out.len(), 2 + 2 * TINY_TARGET.params.n);
    }

    #[test]
    fn test_sign_then_read_chunk() {
        let packed = PackedAddress::new(0x42).to_be_bytes();
        let (stream, target, _) = run(script(&[b"x", &packed, b"r", &encode_chunk_index(0)]));
        let n = TINY_TARGET.params.n;
        let out = stream.written();
        assert_eq!(out[0], 0x00);
        assert_eq!(out[1], 0x00);
        assert_eq!(&out[2..], &target.buffer().as_bytes()[..n]);
        assert_eq!(stream.flushes(), 2);
    }

    #[test]
    fn test_rejections_are_reported() {
        let (stream, _, _) = run(script(&[
            b"r",
            &encode_chunk_index(0),
            b"x",
            &u64::MAX.to_be_bytes(),
        ]));
        assert_eq!(stream.written(), &[0x02, 0x02]);
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let mut target = Target::new(TINY_TARGET);
        let table = CommandTable::new(&TINY_TARGET.params);
        let mut stream = ScriptedStream::new(vec![b'z', 0, 0]);
        let err = serve(&mut stream, &mut target, &table).unwrap_err();
        assert!(matches!(err, ServerError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_diagnostics_registration_follows_feature() {
        let table = CommandTable::new(&TINY_TARGET.params);
        assert_eq!(table.lookup(b'e').is_some(), cfg!(feature = "diagnostics"));
        assert_eq!(table.commands().filter(|c| !c.is_diagnostic()).count(), 7);
    }
}

//! Host and target talking over real byte streams
//!
//! A connected socket pair stands in for the serial line: the target runs
//! its receive loop on one end in a background thread and the host drives
//! it through `TargetClient` on the other.

use spxprobe_primitives::verify;
use spxprobe_signer_lib::full::sign;
use spxprobe_signer_lib::server::{serve_listener, write_banner};
use spxprobe_signer_lib::{
    CacheOutcome, ClientError, CommandTable, KeyStore, PackedAddress, Status, TINY_TARGET, Target,
    TargetClient, serve,
};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::os::unix::net::UnixStream;
use std::thread::{self, JoinHandle};
use std::time::Duration;

fn spawn_target(mut stream: UnixStream) -> JoinHandle<u64> {
    thread::spawn(move || {
        let mut target = Target::new(TINY_TARGET);
        let table = CommandTable::new(&TINY_TARGET.params);
        write_banner(&mut stream).unwrap();
        serve(&mut stream, &mut target, &table).unwrap()
    })
}

fn connect() -> (TargetClient<UnixStream>, JoinHandle<u64>) {
    let (host, device) = UnixStream::pair().unwrap();
    let handle = spawn_target(device);
    let mut client = TargetClient::new(host, TINY_TARGET.params);
    client.read_banner().unwrap();
    (client, handle)
}

#[test]
fn test_key_round_trip() {
    let (mut client, handle) = connect();
    let material: Vec<u8> = (100u8..148).collect();

    client.install_key(&material).unwrap();
    let public = client.public_key().unwrap();
    let secret = client.secret_key().unwrap();
    drop(client);

    let local = KeyStore::new(TINY_TARGET.params, &material).unwrap();
    assert_eq!(public, local.export_public());
    assert_eq!(&secret[..], &material[..32]);
    assert_eq!(handle.join().unwrap(), 3);
}

#[test]
fn test_wrong_key_length_rejected() {
    let (mut client, handle) = connect();
    let err = client.install_key(&[0u8; 48][..47]).unwrap_err();
    // Framing refuses the short payload before anything is sent
    assert!(matches!(err, ClientError::Protocol(_)));
    drop(client);
    assert_eq!(handle.join().unwrap(), 0);
}

#[test]
fn test_sign_cached_then_read_back() {
    let (mut client, handle) = connect();
    let params = TINY_TARGET.params;
    let packed = PackedAddress::new(0x0910);

    assert_eq!(client.sign_cached(packed).unwrap(), CacheOutcome::Signed);
    let first = client.read_signature(params.layer_bytes()).unwrap();
    assert_eq!(client.sign_cached(packed).unwrap(), CacheOutcome::Cached);
    let second = client.read_signature(params.layer_bytes()).unwrap();
    assert_eq!(first, second);

    let err = client
        .signature_chunk(u16::try_from(params.layer_bytes() / params.n).unwrap())
        .unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status {
            status: Status::Rejected,
            ..
        }
    ));
    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_fill_cache_suppresses_signing() {
    let (mut client, handle) = connect();
    let packed = PackedAddress::new(0x2200);
    client.fill_cache(packed).unwrap();
    assert_eq!(client.sign_cached(packed).unwrap(), CacheOutcome::Cached);
    drop(client);
    handle.join().unwrap();
}

#[test]
fn test_out_of_range_address_rejected() {
    let (mut client, handle) = connect();
    let err = client.sign_straight(PackedAddress::new(1 << 40)).unwrap_err();
    assert!(matches!(
        err,
        ClientError::Status {
            status: Status::Rejected,
            ..
        }
    ));
    // The loop keeps serving after a rejection
    assert_eq!(client.public_key().unwrap().len(), 2 * TINY_TARGET.params.n);
    drop(client);
    handle.join().unwrap();
}

#[cfg(feature = "diagnostics")]
#[test]
fn test_diagnostic_full_sign_verifies() {
    let (mut client, handle) = connect();
    let params = TINY_TARGET.params;
    let message = [0x5Au8; 32];

    let public = client.public_key().unwrap();
    let randomizer = client.test_sign(&message).unwrap();
    let body = client.read_signature(params.sig_body_bytes()).unwrap();
    drop(client);
    handle.join().unwrap();

    let mut signature = randomizer;
    signature.extend_from_slice(&body);
    let (root, pub_seed) = public.split_at(params.n);
    assert!(verify(&params, pub_seed, root, &message, &signature));

    let keys = KeyStore::with_defaults(params);
    assert_eq!(signature, sign(&keys, &message).to_bytes());
}

#[cfg(feature = "diagnostics")]
#[test]
fn test_diagnostic_trigger_echo() {
    let (mut client, handle) = connect();
    assert_eq!(client.test_trigger(1).unwrap(), vec![0xEF, 0x01]);
    drop(client);
    handle.join().unwrap();
}

fn spawn_listener(banner: bool) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut target = Target::new(TINY_TARGET);
        let table = CommandTable::new(&TINY_TARGET.params);
        serve_listener(&listener, &mut target, &table, banner).expect("listener stopped");
    });
    addr
}

fn tcp_client(addr: SocketAddr) -> TargetClient<TcpStream> {
    let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(5)).unwrap();
    // A missing banner must fail the test rather than hang it
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    TargetClient::new(stream, TINY_TARGET.params)
}

#[test]
fn test_tcp_listener_keeps_state_between_connections() {
    let addr = spawn_listener(true);
    let packed = PackedAddress::new(0x3300);
    {
        let mut client = tcp_client(addr);
        client.read_banner().unwrap();
        assert_eq!(client.sign_cached(packed).unwrap(), CacheOutcome::Signed);
    }

    let mut client = tcp_client(addr);
    client.read_banner().unwrap();
    assert_eq!(client.sign_cached(packed).unwrap(), CacheOutcome::Cached);
}

#[test]
fn test_tcp_listener_without_banner() {
    let addr = spawn_listener(false);
    let mut client = tcp_client(addr);
    // First bytes on the socket are the reply, not a banner
    let public = client.public_key().unwrap();
    assert_eq!(public, KeyStore::with_defaults(TINY_TARGET.params).export_public());
}

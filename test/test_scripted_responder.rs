//! Drives an initiating engine against a hand-rolled remote responder,
//! controlling every padding length on the wire.

use byteorder::{BigEndian, ByteOrder};
use crypto::rc4::Rc4;
use crypto::symmetriccipher::SynchronousStreamCipher;

use mse_handshake::bt::ShaHashBuilder;
use mse_handshake::cipher::dh::DhKeys;
use mse_handshake::cipher::{derive_stream, KEY_A, KEY_B};
use mse_handshake::{
    Encryption, EncryptionMode, Handshake, HandshakeStatus, InfoHash, PeerIo, PeerId, SocketKind,
};

use crate::{any_addr, outcome_slot, recording_callback, registry_with, take_output, OutcomeSlot};

const HASH: [u8; 20] = [0x11u8; 20];
const OUR_PID: [u8; 20] = [0x21u8; 20];
const REMOTE_PID: [u8; 20] = [0x42u8; 20];

fn process(stream: &mut Rc4, bytes: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bytes.len()];
    stream.process(bytes, &mut out);

    out
}

fn remote_handshake_message() -> Vec<u8> {
    let mut message = Vec::with_capacity(68);
    message.extend_from_slice(b"\x13BitTorrent protocol");
    message.extend_from_slice(&[0u8; 8]);
    message.extend_from_slice(&HASH);
    message.extend_from_slice(&REMOTE_PID);

    message
}

fn start_initiator() -> (Handshake, OutcomeSlot, Vec<u8>) {
    let hash = InfoHash::from(HASH);
    let slot = outcome_slot();

    let mut handshake = Handshake::new(
        PeerIo::new_outgoing(any_addr(), SocketKind::Tcp, hash),
        EncryptionMode::Preferred,
        registry_with(hash, PeerId::from(OUR_PID)),
        recording_callback(slot.clone()),
    );

    let opening = take_output(&mut handshake);

    (handshake, slot, opening)
}

/// Feed Yb + PadB, verify message 3, then answer with message 4 and the
/// responder's handshake.
fn run_resync(pad_b_len: usize, pad_d_len: usize) {
    let hash = InfoHash::from(HASH);
    let (mut handshake, slot, opening) = start_initiator();

    // Ya plus 0..=511 bytes of pad a
    assert!(opening.len() >= 96 && opening.len() < 96 + 512);
    let ya = &opening[..96];

    let remote_keys = DhKeys::generate();
    let secret = remote_keys.compute_secret(ya).unwrap();

    let mut reply = Vec::new();
    reply.extend_from_slice(remote_keys.public_key());
    reply.extend_from_slice(&vec![0x5Au8; pad_b_len]);

    handshake.io_mut().push_received(&reply);
    assert_eq!(HandshakeStatus::InProgress, handshake.handle_readable());

    // message 3: req1 and req2 xor req3 in the clear, negotiation encrypted
    let out = take_output(&mut handshake);

    let req1 = ShaHashBuilder::new().add_bytes(b"req1").add_bytes(&secret).build();
    assert_eq!(req1.as_ref(), &out[..20]);

    let req2 = ShaHashBuilder::new().add_bytes(b"req2").add_bytes(&HASH[..]).build();
    let req3 = ShaHashBuilder::new().add_bytes(b"req3").add_bytes(&secret).build();
    assert_eq!((req2 ^ req3).as_ref(), &out[20..40]);

    let mut initiator_stream = derive_stream(KEY_A, &secret, &hash);
    let tail = process(&mut initiator_stream, &out[40..]);

    assert_eq!(&[0u8; 8][..], &tail[..8]);
    assert_eq!(2, BigEndian::read_u32(&tail[8..12]));
    assert_eq!(0, BigEndian::read_u16(&tail[12..14]));
    assert_eq!(68, BigEndian::read_u16(&tail[14..16]));

    let ia = &tail[16..];
    assert_eq!(68, ia.len());
    assert_eq!(&b"\x13BitTorrent protocol"[..], &ia[..20]);
    assert_eq!(&HASH[..], &ia[28..48]);
    assert_eq!(&OUR_PID[..], &ia[48..68]);

    // message 4 plus our handshake, all under the responder stream
    let mut responder_stream = derive_stream(KEY_B, &secret, &hash);

    let mut message = Vec::new();
    message.extend_from_slice(&[0u8; 8]);

    let mut select = [0u8; 4];
    BigEndian::write_u32(&mut select, 2);
    message.extend_from_slice(&select);

    let mut pad_len = [0u8; 2];
    BigEndian::write_u16(&mut pad_len, pad_d_len as u16);
    message.extend_from_slice(&pad_len);
    message.extend_from_slice(&vec![0x99u8; pad_d_len]);

    message.extend_from_slice(&remote_handshake_message());

    let wire = process(&mut responder_stream, &message);
    handshake.io_mut().push_received(&wire);
    assert_eq!(HandshakeStatus::Finished, handshake.handle_readable());

    let outcome = slot.borrow().clone().unwrap();
    assert!(outcome.is_ok);
    assert_eq!(Some(PeerId::from(REMOTE_PID)), outcome.peer_id);
    assert_eq!(Encryption::Rc4, handshake.io().encryption());
    assert_eq!(Some(&hash), handshake.io().info_hash());
}

#[test]
fn positive_resync_no_padding() {
    run_resync(0, 0);
}

#[test]
fn positive_resync_max_pad_b() {
    run_resync(511, 0);
}

#[test]
fn positive_resync_max_pad_d() {
    run_resync(0, 511);
}

#[test]
fn positive_resync_max_padding() {
    run_resync(511, 511);
}

#[test]
fn negative_crypto_select_not_offered() {
    let hash = InfoHash::from(HASH);
    let (mut handshake, slot, opening) = start_initiator();

    let remote_keys = DhKeys::generate();
    let secret = remote_keys.compute_secret(&opening[..96]).unwrap();

    handshake.io_mut().push_received(remote_keys.public_key());
    assert_eq!(HandshakeStatus::InProgress, handshake.handle_readable());
    take_output(&mut handshake);

    // we offered crypto only; select plaintext anyway
    let mut responder_stream = derive_stream(KEY_B, &secret, &hash);

    let mut message = Vec::new();
    message.extend_from_slice(&[0u8; 8]);

    let mut select = [0u8; 4];
    BigEndian::write_u32(&mut select, 1);
    message.extend_from_slice(&select);
    message.extend_from_slice(&[0u8; 2]);

    let wire = process(&mut responder_stream, &message);
    handshake.io_mut().push_received(&wire);
    assert_eq!(HandshakeStatus::Finished, handshake.handle_readable());

    assert!(!slot.borrow().as_ref().unwrap().is_ok);
}

#[test]
fn negative_oversized_pad_d_rejected() {
    let hash = InfoHash::from(HASH);
    let (mut handshake, slot, opening) = start_initiator();

    let remote_keys = DhKeys::generate();
    let secret = remote_keys.compute_secret(&opening[..96]).unwrap();

    handshake.io_mut().push_received(remote_keys.public_key());
    assert_eq!(HandshakeStatus::InProgress, handshake.handle_readable());
    take_output(&mut handshake);

    let mut responder_stream = derive_stream(KEY_B, &secret, &hash);

    let mut message = Vec::new();
    message.extend_from_slice(&[0u8; 8]);

    let mut select = [0u8; 4];
    BigEndian::write_u32(&mut select, 2);
    message.extend_from_slice(&select);

    let mut pad_len = [0u8; 2];
    BigEndian::write_u16(&mut pad_len, 513);
    message.extend_from_slice(&pad_len);

    let wire = process(&mut responder_stream, &message);
    handshake.io_mut().push_received(&wire);
    assert_eq!(HandshakeStatus::Finished, handshake.handle_readable());

    assert!(!slot.borrow().as_ref().unwrap().is_ok);
}

#[test]
fn positive_plaintext_peer_during_key_exchange() {
    // the peer ignores our Ya and answers with a plaintext handshake
    let (mut handshake, slot, _opening) = start_initiator();

    handshake.io_mut().push_received(&remote_handshake_message());
    assert_eq!(HandshakeStatus::Finished, handshake.handle_readable());

    let outcome = slot.borrow().clone().unwrap();
    assert!(outcome.is_ok);
    assert_eq!(Some(PeerId::from(REMOTE_PID)), outcome.peer_id);
    assert_eq!(Encryption::Plain, handshake.io().encryption());

    // we answered with our own plaintext handshake
    let reply = take_output(&mut handshake);
    assert_eq!(68, reply.len());
    assert_eq!(&b"\x13BitTorrent protocol"[..], &reply[..20]);
    assert_eq!(&OUR_PID[..], &reply[48..68]);
}

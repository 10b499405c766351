use mse_handshake::{Encryption, EncryptionMode, Handshake, InfoHash, PeerIo, PeerId, SocketKind};

use crate::{any_addr, outcome_slot, pump_pair, recording_callback, registry_with};

#[test]
fn positive_preferred_pair_settles_on_crypto() {
    let hash = InfoHash::from([0x11u8; 20]);
    let pid_one = PeerId::from([1u8; 20]);
    let pid_two = PeerId::from([2u8; 20]);

    let outcome_one = outcome_slot();
    let outcome_two = outcome_slot();

    let mut one = Handshake::new(
        PeerIo::new_outgoing(any_addr(), SocketKind::Tcp, hash),
        EncryptionMode::Preferred,
        registry_with(hash, pid_one),
        recording_callback(outcome_one.clone()),
    );
    let mut two = Handshake::new(
        PeerIo::new_incoming(any_addr(), SocketKind::Tcp),
        EncryptionMode::Preferred,
        registry_with(hash, pid_two),
        recording_callback(outcome_two.clone()),
    );

    pump_pair(&mut one, &mut two);

    let outcome_one = outcome_one.borrow().clone().unwrap();
    let outcome_two = outcome_two.borrow().clone().unwrap();

    assert!(outcome_one.is_ok);
    assert!(outcome_two.is_ok);
    assert_eq!(Some(pid_two), outcome_one.peer_id);
    assert_eq!(Some(pid_one), outcome_two.peer_id);

    // both sides stayed encrypted and agreed on the hash
    assert_eq!(Encryption::Rc4, one.io().encryption());
    assert_eq!(Encryption::Rc4, two.io().encryption());
    assert_eq!(Some(&hash), one.io().info_hash());
    assert_eq!(Some(&hash), two.io().info_hash());
    assert_eq!(Some(&pid_two), one.io().peer_id());
    assert_eq!(Some(&pid_one), two.io().peer_id());

    // ltep and fast are always advertised, dht only when enabled
    assert!(one.io().supports_ltep());
    assert!(one.io().supports_fext());
    assert!(!one.io().supports_dht());
}

#[test]
fn positive_required_pair_settles_on_crypto() {
    let hash = InfoHash::from([0x22u8; 20]);

    let outcome_one = outcome_slot();
    let outcome_two = outcome_slot();

    let mut one = Handshake::new(
        PeerIo::new_outgoing(any_addr(), SocketKind::Tcp, hash),
        EncryptionMode::Required,
        registry_with(hash, PeerId::from([1u8; 20])),
        recording_callback(outcome_one.clone()),
    );
    let mut two = Handshake::new(
        PeerIo::new_incoming(any_addr(), SocketKind::Tcp),
        EncryptionMode::Required,
        registry_with(hash, PeerId::from([2u8; 20])),
        recording_callback(outcome_two.clone()),
    );

    pump_pair(&mut one, &mut two);

    assert!(outcome_one.borrow().as_ref().unwrap().is_ok);
    assert!(outcome_two.borrow().as_ref().unwrap().is_ok);
    assert_eq!(Encryption::Rc4, one.io().encryption());
    assert_eq!(Encryption::Rc4, two.io().encryption());
}

#[test]
fn positive_dht_flag_advertised_when_enabled() {
    let hash = InfoHash::from([0x33u8; 20]);

    let registry_one = registry_with(hash, PeerId::from([1u8; 20]));
    let registry_two = registry_with(hash, PeerId::from([2u8; 20]));
    registry_one.set_dht_enabled(true);

    let outcome_two = outcome_slot();

    let mut one = Handshake::new(
        PeerIo::new_outgoing(any_addr(), SocketKind::Tcp, hash),
        EncryptionMode::Preferred,
        registry_one,
        recording_callback(outcome_slot()),
    );
    let mut two = Handshake::new(
        PeerIo::new_incoming(any_addr(), SocketKind::Tcp),
        EncryptionMode::Preferred,
        registry_two,
        recording_callback(outcome_two.clone()),
    );

    pump_pair(&mut one, &mut two);

    assert!(outcome_two.borrow().as_ref().unwrap().is_ok);
    // side two saw side one's dht bit, side one saw none from side two
    assert!(two.io().supports_dht());
    assert!(!one.io().supports_dht());
}

#[test]
fn positive_outgoing_clear_preferred_plaintext_pair() {
    let hash = InfoHash::from([0x44u8; 20]);

    let outcome_one = outcome_slot();
    let outcome_two = outcome_slot();

    let mut one = Handshake::new(
        PeerIo::new_outgoing(any_addr(), SocketKind::Tcp, hash),
        EncryptionMode::ClearPreferred,
        registry_with(hash, PeerId::from([1u8; 20])),
        recording_callback(outcome_one.clone()),
    );
    let mut two = Handshake::new(
        PeerIo::new_incoming(any_addr(), SocketKind::Tcp),
        EncryptionMode::ClearPreferred,
        registry_with(hash, PeerId::from([2u8; 20])),
        recording_callback(outcome_two.clone()),
    );

    pump_pair(&mut one, &mut two);

    assert!(outcome_one.borrow().as_ref().unwrap().is_ok);
    assert!(outcome_two.borrow().as_ref().unwrap().is_ok);
    assert_eq!(Encryption::Plain, one.io().encryption());
    assert_eq!(Encryption::Plain, two.io().encryption());
}

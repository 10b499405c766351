use std::cell::RefCell;
use std::net::SocketAddr;
use std::rc::Rc;

use mse_handshake::{
    DoneCallback, Handshake, HandshakeOutcome, InfoHash, PeerId, Torrent, TorrentRegistry,
};

mod test_connect_encrypted;
mod test_scripted_responder;

//----------------------------------------------------------------------------------//

pub type OutcomeSlot = Rc<RefCell<Option<HandshakeOutcome>>>;

pub fn outcome_slot() -> OutcomeSlot {
    Rc::new(RefCell::new(None))
}

/// Completion callback recording the outcome into the given slot.
pub fn recording_callback(slot: OutcomeSlot) -> DoneCallback {
    Box::new(move |_, outcome| {
        *slot.borrow_mut() = Some(outcome.clone());
        true
    })
}

pub fn any_addr() -> SocketAddr {
    "127.0.0.1:51413".parse().unwrap()
}

pub fn registry_with(hash: InfoHash, peer_id: PeerId) -> TorrentRegistry {
    let registry = TorrentRegistry::new();
    registry.register(Torrent::new(hash, peer_id));

    registry
}

//----------------------------------------------------------------------------------//

/// Move queued output from one engine to the other's inbound queue.
pub fn transfer(from: &mut Handshake, to: &mut Handshake) -> bool {
    let bytes = from.io().pending_write().to_vec();

    if bytes.is_empty() {
        return false;
    }

    from.io_mut().consume_written(bytes.len());
    to.io_mut().push_received(&bytes);

    true
}

/// Drain and return everything the engine has queued for the wire.
pub fn take_output(handshake: &mut Handshake) -> Vec<u8> {
    let bytes = handshake.io().pending_write().to_vec();
    handshake.io_mut().consume_written(bytes.len());

    bytes
}

/// Pump two in-process engines head to head until both finish.
pub fn pump_pair(one: &mut Handshake, two: &mut Handshake) {
    for _ in 0..64 {
        let moved_to_two = transfer(one, two);
        if moved_to_two {
            two.handle_readable();
        }

        let moved_to_one = transfer(two, one);
        if moved_to_one {
            one.handle_readable();
        }

        if one.is_finished() && two.is_finished() {
            return;
        }

        if !moved_to_two && !moved_to_one {
            break;
        }
    }

    panic!("handshake pump failed to converge");
}

use std::io;

use log::debug;

use crate::machine::{EncryptionMode, HandshakeMachine, HandshakeState};
use crate::pipe::{PeerIo, SocketKind};
use crate::registry::TorrentRegistry;

/// What to re-send after a successful reconnect.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Resend {
    /// Restart the encrypted exchange.
    Ya,
    /// Fall back to a plaintext handshake.
    PlainHandshake,
}

/// Decide whether a transport error is worth a reconnect over TCP.
///
/// The ladder is utp encrypted, then tcp encrypted, then tcp plaintext.
/// The utp plaintext combination is skipped; no notable client accepts
/// plaintext peers while refusing tcp.
pub(crate) fn decide(
    machine: &HandshakeMachine,
    io: &PeerIo,
    registry: &TorrentRegistry,
    error: &io::Error,
) -> Option<Resend> {
    let mut resend_plain = false;
    let state = machine.state();

    if io.socket_kind() == SocketKind::Utp
        && !io.is_incoming()
        && (state == HandshakeState::AwaitingYb
            || (state == HandshakeState::AwaitingHandshake && !machine.have_read_anything()))
    {
        // this peer probably doesn't speak utp
        debug!(
            "mse_handshake: utp {} handshake failed",
            if state == HandshakeState::AwaitingYb { "encrypted" } else { "plaintext" }
        );

        // Only a connect failure is proof enough to skip utp on future
        // attempts to this peer.
        let connect_failure = match error.kind() {
            io::ErrorKind::TimedOut | io::ErrorKind::ConnectionRefused => true,
            _ => false,
        };
        let known_torrent = io.info_hash().map_or(false, |hash| registry.find(hash).is_some());

        if connect_failure && known_torrent {
            debug!("mse_handshake: marking peer as not supporting utp");
            registry.mark_utp_failed(io.addr().ip());
        }

        if state == HandshakeState::AwaitingYb {
            // encrypted utp failed, retry as encrypted tcp
            return Some(Resend::Ya);
        }

        resend_plain = true;
    }

    // An error while we were sending our public key may just mean the
    // peer does not do encryption at all.
    if io.socket_kind() == SocketKind::Tcp && state == HandshakeState::AwaitingYb {
        debug!("mse_handshake: encrypted tcp handshake failed");
        resend_plain = true;
    }

    if resend_plain && machine.mode() != EncryptionMode::Required {
        return Some(Resend::PlainHandshake);
    }

    None
}

use std::io;
use std::net::SocketAddr;

use log::debug;

use crate::bt::PeerId;
use crate::machine::{Advance, EncryptionMode, HandshakeMachine, HandshakeState};
use crate::pipe::{PeerIo, SocketKind};
use crate::registry::TorrentRegistry;

pub mod retry;
pub mod timer;

use self::retry::Resend;

/// Summary handed to the completion callback, and retrievable afterwards.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HandshakeOutcome {
    /// Whether the handshake completed successfully.
    pub is_ok: bool,
    /// Whether any byte was ever consumed from the peer.
    pub have_read_anything: bool,
    /// The peer's identity, when the handshake got far enough to read it.
    pub peer_id: Option<PeerId>,
}

/// Completion hook invoked exactly once per handshake.
///
/// The callback may steal the pipe off the session. Its return value
/// tells the driver whether buffered post handshake bytes should be
/// processed right away.
pub type DoneCallback = Box<dyn FnOnce(&mut Handshake, &HandshakeOutcome) -> bool>;

/// Progress report from feeding buffered bytes to the session.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HandshakeStatus {
    InProgress,
    Finished,
}

/// What the driver should do about a transport error.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ErrorDisposition {
    /// The session failed terminally; the completion callback has fired.
    Failed,
    /// Reconnect over TCP, then call `resume_after_reconnect` (or
    /// `reconnect_failed` if the reconnect does not come up).
    Reconnect,
}

//----------------------------------------------------------------------------------//

/// A single peer handshake from transport establishment to the point
/// where ordinary wire messages may flow.
///
/// The session is sans-io: received bytes are queued on its pipe and
/// `handle_readable` runs the state machine over them; replies
/// accumulate in the pipe's outbound queue. Transport errors and the
/// deadline enter through `handle_error` and `handle_timeout`.
pub struct Handshake {
    io: Option<PeerIo>,
    machine: HandshakeMachine,
    registry: TorrentRegistry,
    done: Option<DoneCallback>,
    outcome: Option<HandshakeOutcome>,
    pending_resend: Option<Resend>,
}

impl Handshake {
    /// Create a new `Handshake` session over the given pipe.
    ///
    /// Outgoing sessions immediately queue their opening message: the
    /// key exchange for `Required`/`Preferred`, the plaintext handshake
    /// for `ClearPreferred`. A session may finish (and fire its
    /// callback) during construction if that first message cannot be
    /// built.
    pub fn new(io: PeerIo, mode: EncryptionMode, registry: TorrentRegistry, done: DoneCallback) -> Handshake {
        let mut handshake = Handshake {
            io: Some(io),
            machine: HandshakeMachine::new(mode),
            registry,
            done: Some(done),
            outcome: None,
            pending_resend: None,
        };

        let sent = {
            let Handshake {
                ref mut io,
                ref mut machine,
                ref registry,
                ..
            } = handshake;
            let io = io.as_mut().expect("mse_handshake: Handshake Created Without A Pipe");

            debug!(
                "mse_handshake: new {} handshake requested",
                match io.socket_kind() {
                    SocketKind::Utp => "utp",
                    SocketKind::Tcp => "tcp",
                }
            );

            if io.is_incoming() {
                // passively await either a plaintext prefix or a key exchange
                true
            } else if mode != EncryptionMode::ClearPreferred {
                machine.send_ya(io);
                true
            } else {
                machine.send_plaintext_handshake(io, registry)
            }
        };

        if !sent {
            handshake.finish(false);
        }

        handshake
    }

    //----------------------------------------------------------------------------------//

    /// Run the state machine over the bytes buffered on the pipe.
    pub fn handle_readable(&mut self) -> HandshakeStatus {
        if self.is_finished() {
            return HandshakeStatus::Finished;
        }

        let advance = {
            let Handshake {
                ref mut io,
                ref mut machine,
                ref registry,
                ..
            } = *self;
            let io = io.as_mut().expect("mse_handshake: Readable After The Pipe Was Stolen");

            machine.advance(io, registry)
        };

        match advance {
            Advance::NeedMoreBytes => HandshakeStatus::InProgress,
            Advance::Completed { is_ok } => {
                self.finish(is_ok);
                HandshakeStatus::Finished
            }
        }
    }

    /// React to a transport error per the fallback ladder.
    pub fn handle_error(&mut self, error: &io::Error) -> ErrorDisposition {
        if self.is_finished() {
            return ErrorDisposition::Failed;
        }

        debug!("mse_handshake: transport error: {}", error);

        let decision = {
            let Handshake {
                ref io,
                ref machine,
                ref registry,
                ..
            } = *self;

            io.as_ref().and_then(|io| retry::decide(machine, io, registry, error))
        };

        match decision {
            Some(resend) => {
                self.pending_resend = Some(resend);
                ErrorDisposition::Reconnect
            }
            None => {
                debug!("mse_handshake: giving up on peer...");
                self.finish(false);
                ErrorDisposition::Failed
            }
        }
    }

    /// Continue after the reconnect requested by `handle_error` came up.
    ///
    /// The pipe is reset to a cleartext TCP connection and the retry
    /// message queued. May finish the session if the plaintext handshake
    /// cannot be built.
    pub fn resume_after_reconnect(&mut self) {
        let resend = match self.pending_resend.take() {
            Some(resend) => resend,
            None => return,
        };

        let sent = {
            let Handshake {
                ref mut io,
                ref mut machine,
                ref registry,
                ..
            } = *self;
            let io = io.as_mut().expect("mse_handshake: Reconnect After The Pipe Was Stolen");

            io.reset_for_reconnect(SocketKind::Tcp);

            match resend {
                Resend::Ya => {
                    debug!("mse_handshake: retrying with encrypted tcp handshake...");
                    machine.send_ya(io);
                    true
                }
                Resend::PlainHandshake => {
                    debug!("mse_handshake: retrying with plaintext tcp handshake...");
                    machine.send_plaintext_handshake(io, registry)
                }
            }
        };

        if !sent {
            self.finish(false);
        }
    }

    /// Give up after the reconnect requested by `handle_error` failed.
    pub fn reconnect_failed(&mut self) {
        self.pending_resend = None;
        self.finish(false);
    }

    /// React to the handshake deadline expiring.
    pub fn handle_timeout(&mut self) {
        debug!("mse_handshake: handshake timed out, aborting");
        self.finish(false);
    }

    /// Abort the handshake. Safe to call more than once; only the first
    /// call has observable effect.
    pub fn abort(&mut self) {
        self.finish(false);
    }

    //----------------------------------------------------------------------------------//

    /// Replace the completion callback installed at construction.
    ///
    /// Has no effect once the session finished (the original callback
    /// already fired).
    pub fn set_done_callback(&mut self, done: DoneCallback) {
        if !self.is_finished() {
            self.done = Some(done);
        }
    }

    /// Transfer the pipe to the caller, usually on successful completion.
    pub fn steal_io(&mut self) -> PeerIo {
        self.io
            .take()
            .expect("mse_handshake: Handshake Pipe Already Stolen")
    }

    /// Remote address of the underlying connection.
    pub fn addr(&self) -> SocketAddr {
        self.io().addr()
    }

    /// Remote port of the underlying connection.
    pub fn port(&self) -> u16 {
        self.io().port()
    }

    /// Current state of the underlying state machine.
    pub fn state(&self) -> HandshakeState {
        self.machine.state()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Outcome of the session once it finished.
    pub fn outcome(&self) -> Option<&HandshakeOutcome> {
        self.outcome.as_ref()
    }

    /// Access the session's pipe.
    pub fn io(&self) -> &PeerIo {
        self.io
            .as_ref()
            .expect("mse_handshake: Handshake Pipe Already Stolen")
    }

    pub fn io_mut(&mut self) -> &mut PeerIo {
        self.io
            .as_mut()
            .expect("mse_handshake: Handshake Pipe Already Stolen")
    }

    /// Whether the pipe is still owned by the session.
    pub fn has_io(&self) -> bool {
        self.io.is_some()
    }

    //----------------------------------------------------------------------------------//

    /// Funnel for every terminal path: record the outcome and fire the
    /// completion callback exactly once.
    fn finish(&mut self, is_ok: bool) -> bool {
        if self.outcome.is_some() {
            return false;
        }

        debug!(
            "mse_handshake: handshake done: {}",
            if is_ok { "connected" } else { "aborting" }
        );

        let peer_id = if is_ok && self.machine.have_peer_id() {
            self.io.as_ref().and_then(|io| io.peer_id().cloned())
        } else {
            None
        };

        let outcome = HandshakeOutcome {
            is_ok,
            have_read_anything: self.machine.have_read_anything(),
            peer_id,
        };
        self.outcome = Some(outcome.clone());

        match self.done.take() {
            Some(done) => done(self, &outcome),
            None => false,
        }
    }
}

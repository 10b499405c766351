use std::io;
use std::mem;
use std::net::SocketAddr;

use futures::{Async, Future, Poll};
use log::{debug, warn};
use tokio_core::reactor::Handle;
use tokio_io::{AsyncRead, AsyncWrite};
use tokio_timer::Sleep;

use crate::bt::{InfoHash, PeerId};
use crate::config::HandshakerConfig;
use crate::error::HandshakeError;
use crate::handshake::timer::HandshakeTimer;
use crate::handshake::{DoneCallback, ErrorDisposition, Handshake};
use crate::machine::EncryptionMode;
use crate::pipe::{PeerIo, SocketKind};
use crate::registry::TorrentRegistry;
use crate::transport::Transport;

/// Message containing a completed handshake.
///
/// Carries the pipe (crypto state, leftover received bytes, negotiated
/// metadata) together with the socket it was speaking over; the peer
/// session takes over both.
pub struct CompleteMessage<S> {
    io: PeerIo,
    sock: S,
}

impl<S> CompleteMessage<S> {
    fn new(io: PeerIo, sock: S) -> CompleteMessage<S> {
        CompleteMessage { io, sock }
    }

    /// Hash that was agreed during the handshake.
    pub fn hash(&self) -> &InfoHash {
        self.io
            .info_hash()
            .expect("mse_handshake: Completed Handshake Without A Bound Hash")
    }

    /// Id that the peer has given itself.
    pub fn peer_id(&self) -> &PeerId {
        self.io
            .peer_id()
            .expect("mse_handshake: Completed Handshake Without A Peer Id")
    }

    /// Address the peer is connected to us on.
    pub fn address(&self) -> SocketAddr {
        self.io.addr()
    }

    /// Pipe the handshake ran over, including any bytes the peer sent
    /// past the handshake.
    pub fn io(&self) -> &PeerIo {
        &self.io
    }

    /// Socket of some type S, that we use to communicate with the peer.
    pub fn socket(&self) -> &S {
        &self.sock
    }

    /// Break the `CompleteMessage` into its parts.
    pub fn into_parts(self) -> (PeerIo, S) {
        (self.io, self.sock)
    }
}

//----------------------------------------------------------------------------------//

enum ConnState<T>
where
    T: Transport,
{
    Connecting(T::FutureSocket),
    Active(T::Socket),
    Reconnecting(T::FutureSocket),
    Finished,
}

enum Pump {
    WouldBlock,
    Finished,
}

/// Future driving one handshake session over a transport.
///
/// Shuttles bytes between the socket and the session's pipe, arms the
/// handshake deadline, and walks the reconnect ladder when the session
/// asks for it. Resolves with a `CompleteMessage` or a `HandshakeError`;
/// either way the completion callback has fired exactly once.
pub struct PendingHandshake<T>
where
    T: Transport,
{
    session: Handshake,
    conn: ConnState<T>,
    transport: Option<(T, Handle)>,
    addr: SocketAddr,
    timeout: Sleep,
    recv_buffer: Vec<u8>,
}

impl<T> PendingHandshake<T>
where
    T: Transport,
{
    /// Initiate a handshake with the peer at the given address.
    pub fn initiate(
        transport: T,
        addr: &SocketAddr,
        hash: InfoHash,
        mode: EncryptionMode,
        registry: TorrentRegistry,
        config: HandshakerConfig,
        handle: &Handle,
    ) -> io::Result<PendingHandshake<T>> {
        let connect = transport.connect(addr, handle)?;
        let io = PeerIo::new_outgoing(*addr, transport.socket_kind(), hash);
        let session = Handshake::new(io, mode, registry, Box::new(|_, _| true));

        Ok(PendingHandshake {
            session,
            conn: ConnState::Connecting(connect),
            transport: Some((transport, handle.clone())),
            addr: *addr,
            timeout: HandshakeTimer::with_duration(config.handshake_timeout()).sleep(),
            recv_buffer: vec![0u8; config.receive_buffer_size()],
        })
    }

    /// Complete a handshake on a connection accepted from the given address.
    pub fn accept(
        sock: T::Socket,
        addr: SocketAddr,
        kind: SocketKind,
        mode: EncryptionMode,
        registry: TorrentRegistry,
        config: HandshakerConfig,
    ) -> PendingHandshake<T> {
        let io = PeerIo::new_incoming(addr, kind);
        let session = Handshake::new(io, mode, registry, Box::new(|_, _| true));

        PendingHandshake {
            session,
            conn: ConnState::Active(sock),
            transport: None,
            addr,
            timeout: HandshakeTimer::with_duration(config.handshake_timeout()).sleep(),
            recv_buffer: vec![0u8; config.receive_buffer_size()],
        }
    }

    /// Replace the completion callback installed on the session.
    ///
    /// The callback must leave the pipe on the session; the resolved
    /// future carries it.
    pub fn with_done_callback(mut self, done: DoneCallback) -> PendingHandshake<T> {
        self.session.set_done_callback(done);
        self
    }

    /// Access the session being driven.
    pub fn session(&self) -> &Handshake {
        &self.session
    }

    fn on_transport_error(&mut self, error: io::Error) -> Result<(), HandshakeError> {
        match self.session.handle_error(&error) {
            ErrorDisposition::Failed => Err(HandshakeError::Io(error)),
            ErrorDisposition::Reconnect => {
                let reconnect = match self.transport {
                    Some((ref transport, ref handle)) => transport.connect(&self.addr, handle),
                    None => {
                        self.session.reconnect_failed();
                        return Err(HandshakeError::Io(error));
                    }
                };

                match reconnect {
                    Ok(connect) => {
                        debug!("mse_handshake: reconnecting to {}", self.addr);
                        self.conn = ConnState::Reconnecting(connect);
                        Ok(())
                    }
                    Err(connect_error) => {
                        self.session.reconnect_failed();
                        Err(HandshakeError::Io(connect_error))
                    }
                }
            }
        }
    }

    fn pump(&mut self, sock: &mut T::Socket) -> Result<Pump, io::Error> {
        loop {
            // push queued output to the socket first
            while !self.session.io().pending_write().is_empty() {
                match sock.poll_write(self.session.io().pending_write())? {
                    Async::Ready(0) => return Err(io::Error::from(io::ErrorKind::WriteZero)),
                    Async::Ready(written) => self.session.io_mut().consume_written(written),
                    Async::NotReady => break,
                }
            }

            let _ = sock.poll_flush()?;

            if self.session.is_finished() {
                // don't resolve until our last reply is fully on the wire
                if self.session.io().pending_write().is_empty() {
                    return Ok(Pump::Finished);
                }

                return Ok(Pump::WouldBlock);
            }

            // pull in whatever arrived and feed it to the session
            let received = match sock.poll_read(&mut self.recv_buffer)? {
                Async::Ready(0) => {
                    // peer hung up; enters the same ladder as a socket error
                    return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
                }
                Async::Ready(received) => received,
                Async::NotReady => return Ok(Pump::WouldBlock),
            };

            self.session.io_mut().push_received(&self.recv_buffer[..received]);
            self.session.handle_readable();
        }
    }
}

impl<T> Future for PendingHandshake<T>
where
    T: Transport,
{
    type Item = CompleteMessage<T::Socket>;
    type Error = HandshakeError;

    fn poll(&mut self) -> Poll<Self::Item, Self::Error> {
        match self.timeout.poll() {
            Ok(Async::Ready(())) => {
                self.session.handle_timeout();
                self.conn = ConnState::Finished;
                return Err(HandshakeError::TimedOut);
            }
            Ok(Async::NotReady) => (),
            Err(error) => warn!("mse_handshake: handshake deadline unavailable: {}", error),
        }

        loop {
            // the session can finish during construction or a reconnect
            let failed = self.session.outcome().map_or(false, |outcome| !outcome.is_ok);
            if failed {
                self.conn = ConnState::Finished;
                return Err(HandshakeError::Failed);
            }

            match mem::replace(&mut self.conn, ConnState::Finished) {
                ConnState::Connecting(mut connect) => match connect.poll() {
                    Ok(Async::Ready(sock)) => {
                        self.conn = ConnState::Active(sock);
                    }
                    Ok(Async::NotReady) => {
                        self.conn = ConnState::Connecting(connect);
                        return Ok(Async::NotReady);
                    }
                    Err(error) => {
                        self.on_transport_error(error)?;
                    }
                },
                ConnState::Reconnecting(mut connect) => match connect.poll() {
                    Ok(Async::Ready(sock)) => {
                        self.session.resume_after_reconnect();
                        self.conn = ConnState::Active(sock);
                    }
                    Ok(Async::NotReady) => {
                        self.conn = ConnState::Reconnecting(connect);
                        return Ok(Async::NotReady);
                    }
                    Err(error) => {
                        self.session.reconnect_failed();
                        return Err(HandshakeError::Io(error));
                    }
                },
                ConnState::Active(mut sock) => match self.pump(&mut sock) {
                    Ok(Pump::WouldBlock) => {
                        self.conn = ConnState::Active(sock);
                        return Ok(Async::NotReady);
                    }
                    Ok(Pump::Finished) => {
                        let is_ok = self.session.outcome().map_or(false, |outcome| outcome.is_ok);

                        if is_ok {
                            let io = self.session.steal_io();
                            return Ok(Async::Ready(CompleteMessage::new(io, sock)));
                        }

                        return Err(HandshakeError::Failed);
                    }
                    Err(error) => {
                        self.on_transport_error(error)?;
                    }
                },
                ConnState::Finished => {
                    panic!("mse_handshake: PendingHandshake Polled After Completion")
                }
            }
        }
    }
}

use std::io;
use std::net::SocketAddr;

use crate::local_addr::LocalAddr;
use crate::pipe::SocketKind;

use futures::future::Future;
use futures::stream::Stream;
use futures::Poll;
use tokio_core::net::{Incoming, TcpListener, TcpStream, TcpStreamNew};
use tokio_core::reactor::Handle;
use tokio_io::{AsyncRead, AsyncWrite};

/// Trait for initializing connections over an abstract `Transport`.
pub trait Transport {
    /// Concrete socket.
    type Socket: AsyncRead + AsyncWrite + 'static;

    /// Future `Self::Socket`.
    type FutureSocket: Future<Item = Self::Socket, Error = io::Error> + 'static;

    /// Concrete listener.
    type Listener: Stream<Item = (Self::Socket, SocketAddr), Error = io::Error>
        + LocalAddr
        + 'static;

    /// Connect to the given address over this transport, using the supplied
    /// `Handle`.
    fn connect(&self, addr: &SocketAddr, handle: &Handle) -> io::Result<Self::FutureSocket>;

    /// Listen to the given address for this transport, using the supplied
    /// `Handle`.
    fn listen(&self, addr: &SocketAddr, handle: &Handle) -> io::Result<Self::Listener>;

    /// Kind of socket this transport produces, as seen by the
    /// handshake fallback ladder.
    fn socket_kind(&self) -> SocketKind;
}

//----------------------------------------------------------------------------------//

/// Defines a `Transport` operating over TCP.
pub struct TcpTransport;

impl Transport for TcpTransport {
    type Socket = TcpStream;
    type FutureSocket = TcpStreamNew;
    type Listener = TcpListenerStream<Incoming>;

    fn connect(&self, addr: &SocketAddr, handle: &Handle) -> io::Result<Self::FutureSocket> {
        Ok(TcpStream::connect(addr, handle))
    }

    fn listen(&self, addr: &SocketAddr, handle: &Handle) -> io::Result<Self::Listener> {
        let listener = TcpListener::bind(addr, handle)?;
        let listen_addr = listener.local_addr()?;

        Ok(TcpListenerStream::new(listen_addr, listener.incoming()))
    }

    fn socket_kind(&self) -> SocketKind {
        SocketKind::Tcp
    }
}

/// Convenient object that wraps a listener stream `L`, and also implements
/// `LocalAddr`.
pub struct TcpListenerStream<L> {
    listen_addr: SocketAddr,
    listener: L,
}

impl<L> TcpListenerStream<L> {
    fn new(listen_addr: SocketAddr, listener: L) -> TcpListenerStream<L> {
        TcpListenerStream {
            listen_addr,
            listener,
        }
    }
}

impl<L> Stream for TcpListenerStream<L>
where
    L: Stream,
{
    type Item = L::Item;
    type Error = L::Error;

    fn poll(&mut self) -> Poll<Option<Self::Item>, Self::Error> {
        self.listener.poll()
    }
}

impl<L> LocalAddr for TcpListenerStream<L> {
    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.listen_addr)
    }
}

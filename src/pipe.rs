use std::net::SocketAddr;

use byteorder::{BigEndian, ByteOrder};
use bytes::BytesMut;

use crate::bt::{InfoHash, PeerId};
use crate::cipher::HandshakeCrypto;

/// Transport kind a connection was opened over.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum SocketKind {
    Tcp,
    Utp,
}

/// Encryption discipline applied to bytes crossing the pipe.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Encryption {
    Plain,
    Rc4,
}

/// Byte pipe for a single peer connection.
///
/// Bytes received off the wire are queued as-is; reads and drains apply
/// the current encryption discipline as bytes leave the queue. Writes
/// apply it as bytes enter the outbound queue, so the queue always holds
/// exactly what goes on the wire and flipping the discipline never
/// touches bytes queued earlier.
pub struct PeerIo {
    addr: SocketAddr,
    kind: SocketKind,
    incoming: bool,
    encryption: Encryption,
    crypto: HandshakeCrypto,
    read_buf: BytesMut,
    write_buf: BytesMut,
    info_hash: Option<InfoHash>,
    peer_id: Option<PeerId>,
    dht: bool,
    ltep: bool,
    fext: bool,
}

impl PeerIo {
    /// Create a pipe for a connection we initiated for the given torrent.
    pub fn new_outgoing(addr: SocketAddr, kind: SocketKind, hash: InfoHash) -> PeerIo {
        PeerIo::new(addr, kind, false, Some(hash))
    }

    /// Create a pipe for a connection accepted from a remote peer.
    pub fn new_incoming(addr: SocketAddr, kind: SocketKind) -> PeerIo {
        PeerIo::new(addr, kind, true, None)
    }

    fn new(addr: SocketAddr, kind: SocketKind, incoming: bool, info_hash: Option<InfoHash>) -> PeerIo {
        PeerIo {
            addr,
            kind,
            incoming,
            encryption: Encryption::Plain,
            crypto: HandshakeCrypto::new(),
            read_buf: BytesMut::new(),
            write_buf: BytesMut::new(),
            info_hash,
            peer_id: None,
            dht: false,
            ltep: false,
            fext: false,
        }
    }

    //----------------------------------------------------------------------------------//

    /// Queue bytes received off the wire.
    pub fn push_received(&mut self, bytes: &[u8]) {
        self.read_buf.extend_from_slice(bytes);
    }

    /// Number of received bytes not yet consumed.
    pub fn buffered(&self) -> usize {
        self.read_buf.len()
    }

    /// Look at received bytes without consuming them or advancing any stream.
    pub fn peek(&self, len: usize) -> &[u8] {
        &self.read_buf[..len]
    }

    /// Consume bytes into the given slice, decrypting if the pipe is encrypted.
    pub fn read_bytes(&mut self, out: &mut [u8]) {
        let taken = self.read_buf.split_to(out.len());
        out.copy_from_slice(&taken);

        if self.encryption == Encryption::Rc4 {
            self.crypto.decrypt(out);
        }
    }

    /// Consume a big endian u32.
    pub fn read_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.read_bytes(&mut bytes);

        BigEndian::read_u32(&bytes)
    }

    /// Consume a big endian u16.
    pub fn read_u16(&mut self) -> u16 {
        let mut bytes = [0u8; 2];
        self.read_bytes(&mut bytes);

        BigEndian::read_u16(&bytes)
    }

    /// Consume and discard bytes, advancing the inbound stream if the
    /// pipe is encrypted.
    pub fn drain(&mut self, len: usize) {
        let mut taken = self.read_buf.split_to(len);

        if self.encryption == Encryption::Rc4 {
            self.crypto.decrypt(&mut taken);
        }
    }

    /// Discard raw received bytes without touching any stream state.
    ///
    /// Used while resynchronizing, where the inbound stream is restarted
    /// separately for each candidate alignment.
    pub fn consume_raw(&mut self, len: usize) {
        self.read_buf.split_to(len);
    }

    /// Decrypt the first `len` received bytes in place, as if they had
    /// been received in the clear.
    pub fn decrypt_buf_in_place(&mut self, len: usize) {
        let PeerIo {
            ref mut crypto,
            ref mut read_buf,
            ..
        } = *self;

        crypto.decrypt(&mut read_buf[..len]);
    }

    //----------------------------------------------------------------------------------//

    /// Queue bytes for the wire, encrypting if the pipe is encrypted.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        match self.encryption {
            Encryption::Plain => self.write_buf.extend_from_slice(bytes),
            Encryption::Rc4 => {
                let mut owned = bytes.to_vec();
                self.crypto.encrypt(&mut owned);
                self.write_buf.extend_from_slice(&owned);
            }
        }
    }

    /// Bytes queued for the wire but not yet sent.
    pub fn pending_write(&self) -> &[u8] {
        &self.write_buf[..]
    }

    /// Discard the first `len` queued bytes after they hit the wire.
    pub fn consume_written(&mut self, len: usize) {
        self.write_buf.split_to(len);
    }

    //----------------------------------------------------------------------------------//

    /// Set the encryption discipline for bytes crossing the pipe from now on.
    pub fn set_encryption(&mut self, encryption: Encryption) {
        self.encryption = encryption;
    }

    pub fn encryption(&self) -> Encryption {
        self.encryption
    }

    pub fn is_encrypted(&self) -> bool {
        self.encryption == Encryption::Rc4
    }

    /// Access the connection's cryptographic context.
    pub fn crypto(&self) -> &HandshakeCrypto {
        &self.crypto
    }

    pub fn crypto_mut(&mut self) -> &mut HandshakeCrypto {
        &mut self.crypto
    }

    //----------------------------------------------------------------------------------//

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn socket_kind(&self) -> SocketKind {
        self.kind
    }

    pub fn is_incoming(&self) -> bool {
        self.incoming
    }

    pub fn info_hash(&self) -> Option<&InfoHash> {
        self.info_hash.as_ref()
    }

    pub fn has_info_hash(&self) -> bool {
        self.info_hash.is_some()
    }

    /// Bind the torrent hash agreed during the handshake.
    pub fn set_info_hash(&mut self, hash: InfoHash) {
        self.info_hash = Some(hash);
    }

    pub fn peer_id(&self) -> Option<&PeerId> {
        self.peer_id.as_ref()
    }

    /// Record the identity the peer sent at the end of the handshake.
    pub fn set_peer_id(&mut self, pid: PeerId) {
        self.peer_id = Some(pid);
    }

    pub fn enable_dht(&mut self, enabled: bool) {
        self.dht = enabled;
    }

    pub fn enable_ltep(&mut self, enabled: bool) {
        self.ltep = enabled;
    }

    pub fn enable_fext(&mut self, enabled: bool) {
        self.fext = enabled;
    }

    pub fn supports_dht(&self) -> bool {
        self.dht
    }

    pub fn supports_ltep(&self) -> bool {
        self.ltep
    }

    pub fn supports_fext(&self) -> bool {
        self.fext
    }

    //----------------------------------------------------------------------------------//

    /// Reset the pipe after a reconnect over a (possibly different) transport.
    ///
    /// Both byte queues are discarded and the pipe goes back to the
    /// clear; key exchange state survives so the same public key is
    /// offered again.
    pub fn reset_for_reconnect(&mut self, kind: SocketKind) {
        self.kind = kind;
        self.encryption = Encryption::Plain;
        self.crypto.clear_streams();
        self.read_buf.clear();
        self.write_buf.clear();
    }
}

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use crate::bt::{self, PeerId, ShaHash, ShaHashBuilder};
use crate::cipher::dh::KEY_LEN;
use crate::message::extensions::{Extension, Extensions};
use crate::message::handshake::{self, HandshakeMessage};
use crate::message::mse::{self, CRYPTO_PROVIDE_CRYPTO, CRYPTO_PROVIDE_PLAINTEXT, VC_LENGTH};
use crate::pipe::{Encryption, PeerIo};
use crate::registry::TorrentRegistry;

/// Encryption policy for a connection.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum EncryptionMode {
    /// Only encrypted sessions are acceptable.
    Required,
    /// Encrypted preferred, plaintext accepted.
    Preferred,
    /// Plaintext preferred, encrypted accepted.
    ClearPreferred,
}

/// Crypto bits we offer when initiating an encrypted handshake.
pub(crate) fn crypto_provide(mode: EncryptionMode) -> u32 {
    match mode {
        EncryptionMode::Required | EncryptionMode::Preferred => CRYPTO_PROVIDE_CRYPTO,
        // Clear preferred connections skip the encrypted exchange and go
        // straight to a plaintext handshake.
        EncryptionMode::ClearPreferred => {
            panic!("mse_handshake: Crypto Provide Requested For Clear Preferred Mode")
        }
    }
}

/// First offered crypto bit acceptable under the given policy.
pub(crate) fn select_crypto(mode: EncryptionMode, crypto_provide: u32) -> Option<u32> {
    let choices: &[u32] = match mode {
        EncryptionMode::Required => &[CRYPTO_PROVIDE_CRYPTO],
        EncryptionMode::Preferred => &[CRYPTO_PROVIDE_CRYPTO, CRYPTO_PROVIDE_PLAINTEXT],
        EncryptionMode::ClearPreferred => &[CRYPTO_PROVIDE_PLAINTEXT, CRYPTO_PROVIDE_CRYPTO],
    };

    choices.iter().cloned().find(|choice| crypto_provide & choice != 0)
}

//----------------------------------------------------------------------------------//

/// States of the handshake, named for what the peer owes us next.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum HandshakeState {
    // either direction; also entered after an encrypted exchange settles
    AwaitingHandshake,
    AwaitingPeerId,
    // responding side of an encrypted exchange
    AwaitingYa,
    AwaitingPadA,
    AwaitingCryptoProvide,
    AwaitingPadC,
    AwaitingIa,
    // initiating side of an encrypted exchange
    AwaitingYb,
    AwaitingVc,
    AwaitingCryptoSelect,
    AwaitingPadD,
}

impl HandshakeState {
    pub fn name(&self) -> &'static str {
        match *self {
            HandshakeState::AwaitingHandshake => "awaiting handshake",
            HandshakeState::AwaitingPeerId => "awaiting peer id",
            HandshakeState::AwaitingYa => "awaiting ya",
            HandshakeState::AwaitingPadA => "awaiting pad a",
            HandshakeState::AwaitingCryptoProvide => "awaiting crypto provide",
            HandshakeState::AwaitingPadC => "awaiting pad c",
            HandshakeState::AwaitingIa => "awaiting ia",
            HandshakeState::AwaitingYb => "awaiting yb",
            HandshakeState::AwaitingVc => "awaiting vc",
            HandshakeState::AwaitingCryptoSelect => "awaiting crypto select",
            HandshakeState::AwaitingPadD => "awaiting pad d",
        }
    }
}

/// Result of running a single transition.
enum ReadState {
    /// Progress was made, run the next transition immediately.
    Now,
    /// Not enough buffered bytes, wait for the pipe.
    Later,
    /// Terminal, successfully or not.
    Done(bool),
}

/// Result of running the machine against the currently buffered bytes.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Advance {
    NeedMoreBytes,
    Completed { is_ok: bool },
}

//----------------------------------------------------------------------------------//

/// The handshake state machine for one connection.
///
/// Each transition consumes bytes from the pipe or asks for more; side
/// effects (replies, encryption flips, hash binding) land on the pipe.
pub struct HandshakeMachine {
    state: HandshakeState,
    mode: EncryptionMode,
    have_read_anything: bool,
    have_peer_id: bool,
    have_sent_bt_handshake: bool,
    pad_c_len: u16,
    pad_d_len: u16,
    ia_len: u16,
    crypto_provide: u32,
    crypto_select: u32,
    my_req1: Option<ShaHash>,
}

impl HandshakeMachine {
    /// Create a new machine awaiting the peer's first message.
    pub fn new(mode: EncryptionMode) -> HandshakeMachine {
        HandshakeMachine {
            state: HandshakeState::AwaitingHandshake,
            mode,
            have_read_anything: false,
            have_peer_id: false,
            have_sent_bt_handshake: false,
            pad_c_len: 0,
            pad_d_len: 0,
            ia_len: 0,
            crypto_provide: 0,
            crypto_select: 0,
            my_req1: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    pub fn mode(&self) -> EncryptionMode {
        self.mode
    }

    pub fn have_read_anything(&self) -> bool {
        self.have_read_anything
    }

    pub fn have_peer_id(&self) -> bool {
        self.have_peer_id
    }

    fn set_state(&mut self, state: HandshakeState) {
        debug!("mse_handshake: setting to state [{}]", state.name());
        self.state = state;
    }

    //----------------------------------------------------------------------------------//

    /// Open an encrypted exchange: our public key followed by padding.
    pub fn send_ya(&mut self, io: &mut PeerIo) {
        let mut message = Vec::with_capacity(KEY_LEN + mse::PAD_MAXLEN);
        message.extend_from_slice(io.crypto().public_key());
        message.extend_from_slice(&mse::generate_pad());

        debug!("mse_handshake: send_ya: writing {} bytes", message.len());
        self.set_state(HandshakeState::AwaitingYb);
        io.write_bytes(&message);
    }

    /// Open (or answer with) a plaintext handshake.
    ///
    /// Returns false if our side of the handshake cannot be built.
    pub fn send_plaintext_handshake(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> bool {
        let message = match self.build_handshake_message(io, registry) {
            Some(message) => message,
            None => return false,
        };

        self.have_sent_bt_handshake = true;
        self.set_state(HandshakeState::AwaitingHandshake);
        io.write_bytes(&message.to_bytes());

        true
    }

    /// Run transitions until one asks for more bytes or terminates.
    pub fn advance(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> Advance {
        loop {
            debug!("mse_handshake: handling readable; state is [{}]", self.state.name());

            let next = match self.state {
                HandshakeState::AwaitingHandshake => self.read_handshake(io, registry),
                // Terminal state: on success the pipe moves on to the peer
                // session, so control goes straight back to the caller
                // instead of looping here.
                HandshakeState::AwaitingPeerId => {
                    return match self.read_peer_id(io, registry) {
                        ReadState::Done(is_ok) => Advance::Completed { is_ok },
                        _ => Advance::NeedMoreBytes,
                    };
                }
                HandshakeState::AwaitingYa => self.read_ya(io),
                HandshakeState::AwaitingPadA => self.read_pad_a(io),
                HandshakeState::AwaitingCryptoProvide => self.read_crypto_provide(io, registry),
                HandshakeState::AwaitingPadC => self.read_pad_c(io),
                HandshakeState::AwaitingIa => self.read_ia(io, registry),
                HandshakeState::AwaitingYb => self.read_yb(io, registry),
                HandshakeState::AwaitingVc => self.read_vc(io),
                HandshakeState::AwaitingCryptoSelect => self.read_crypto_select(io),
                HandshakeState::AwaitingPadD => self.read_pad_d(io),
            };

            match next {
                ReadState::Now => continue,
                ReadState::Later => return Advance::NeedMoreBytes,
                ReadState::Done(is_ok) => return Advance::Completed { is_ok },
            }
        }
    }

    //----------------------------------------------------------------------------------//
    // either direction

    fn read_handshake(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> ReadState {
        if io.buffered() < handshake::HEAD_LEN {
            return ReadState::Later;
        }

        self.have_read_anything = true;

        // Peek, don't read; these bytes may belong to an encrypted
        // exchange instead and get handed to the awaiting-ya transition.
        let is_encrypted = io.peek(handshake::PROTOCOL_NAME_LEN) != handshake::PROTOCOL_NAME;

        if !is_encrypted {
            if self.mode == EncryptionMode::Required {
                debug!("mse_handshake: peer is unencrypted, and we're disallowing that");
                return ReadState::Done(false);
            }
            if io.is_encrypted() {
                debug!("mse_handshake: peer is unencrypted, and that does not agree with our handshake");
                return ReadState::Done(false);
            }
        } else {
            if io.is_incoming() && !io.has_info_hash() {
                debug!("mse_handshake: peer appears to be starting an encrypted handshake");
                self.set_state(HandshakeState::AwaitingYa);
                return ReadState::Now;
            }
            if !io.is_encrypted() {
                debug!("mse_handshake: peer is encrypted, and that does not agree with our handshake");
                return ReadState::Done(false);
            }
        }

        let mut head = [0u8; handshake::HEAD_LEN];
        io.read_bytes(&mut head);

        let (ext, hash) = match handshake::parse_head(&head) {
            Ok((_, parsed)) => parsed,
            Err(_) => {
                debug!("mse_handshake: handshake prefix not correct");
                return ReadState::Done(false);
            }
        };

        io.enable_dht(ext.contains(Extension::Dht));
        io.enable_ltep(ext.contains(Extension::ExtensionProtocol));
        io.enable_fext(ext.contains(Extension::FastExtension));

        if io.is_incoming() && !io.has_info_hash() {
            // incoming plaintext handshake; find out whether we serve this torrent
            let torrent = match registry.find(&hash) {
                Some(torrent) => torrent,
                None => {
                    debug!("mse_handshake: peer is trying to connect to us for a torrent we don't have");
                    return ReadState::Done(false);
                }
            };

            if !torrent.is_running() {
                debug!("mse_handshake: peer is trying to connect to us for a torrent not running");
                return ReadState::Done(false);
            }

            io.set_info_hash(hash);
        } else {
            // outgoing, or the hash was already agreed during the encrypted exchange
            let matches = io.info_hash().map_or(false, |bound| *bound == hash);

            if !matches {
                debug!("mse_handshake: peer returned the wrong hash");
                return ReadState::Done(false);
            }
        }

        if !self.have_sent_bt_handshake {
            let message = match self.build_handshake_message(io, registry) {
                Some(message) => message,
                None => return ReadState::Done(false),
            };

            io.write_bytes(&message.to_bytes());
            self.have_sent_bt_handshake = true;
        }

        self.set_state(HandshakeState::AwaitingPeerId);
        ReadState::Now
    }

    fn read_peer_id(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> ReadState {
        if io.buffered() < bt::PEER_ID_LEN {
            return ReadState::Later;
        }

        let mut pid_bytes = [0u8; bt::PEER_ID_LEN];
        io.read_bytes(&mut pid_bytes);

        let pid = PeerId::from(pid_bytes);
        io.set_peer_id(pid);
        self.have_peer_id = true;

        // if we've somehow connected to ourselves, don't keep the connection
        let hash = *io
            .info_hash()
            .expect("mse_handshake: Peer Id Read Without A Bound Torrent Hash");
        let connected_to_self = registry.find(&hash).map_or(false, |torrent| *torrent.peer_id() == pid);

        if connected_to_self {
            debug!("mse_handshake: peer id matches our own, dropping self connection");
        }

        ReadState::Done(!connected_to_self)
    }

    //----------------------------------------------------------------------------------//
    // responding side

    fn read_ya(&mut self, io: &mut PeerIo) -> ReadState {
        debug!("mse_handshake: in read_ya... need {}, have {}", KEY_LEN, io.buffered());

        if io.buffered() < KEY_LEN {
            return ReadState::Later;
        }

        let mut ya = [0u8; KEY_LEN];
        io.read_bytes(&mut ya);

        if !io.crypto_mut().compute_secret(&ya) {
            return ReadState::Done(false);
        }

        // precomputed so the pad a scan can look for it
        self.my_req1 = Some(io.crypto().secret_hash(b"req1"));

        debug!("mse_handshake: sending b->a: diffie hellman yb, pad b");
        let mut message = Vec::with_capacity(KEY_LEN + mse::PAD_MAXLEN);
        message.extend_from_slice(io.crypto().public_key());
        message.extend_from_slice(&mse::generate_pad());

        self.set_state(HandshakeState::AwaitingPadA);
        io.write_bytes(&message);
        ReadState::Now
    }

    fn read_pad_a(&mut self, io: &mut PeerIo) -> ReadState {
        // resynchronizing on HASH('req1', S)
        let req1 = self
            .my_req1
            .expect("mse_handshake: Pad A Scan Without A Computed Secret");

        let buffered = io.buffered();
        let found = find_subslice(io.peek(buffered), req1.as_ref());

        match found {
            Some(position) => {
                io.consume_raw(position);
                debug!("mse_handshake: found the req1 marker");
                self.set_state(HandshakeState::AwaitingCryptoProvide);
                ReadState::Now
            }
            None => {
                // keep a tail that may be a prefix of the marker
                if buffered > bt::SHA_HASH_LEN {
                    io.consume_raw(buffered - bt::SHA_HASH_LEN);
                }

                ReadState::Later
            }
        }
    }

    fn read_crypto_provide(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> ReadState {
        // HASH('req1', S), HASH('req2', SKEY) xor HASH('req3', S),
        // ENCRYPT(VC, crypto_provide, len(PadC))
        let needlen = bt::SHA_HASH_LEN + bt::SHA_HASH_LEN + VC_LENGTH + 4 + 2;

        if io.buffered() < needlen {
            return ReadState::Later;
        }

        // the req1 marker was already matched by the pad a scan
        io.consume_raw(bt::SHA_HASH_LEN);

        // xor with our own HASH('req3', S) to recover the obfuscated hash
        debug!("mse_handshake: reading obfuscated torrent hash...");
        let mut xored = [0u8; bt::SHA_HASH_LEN];
        io.read_bytes(&mut xored);

        let obfuscated = ShaHash::from(xored) ^ io.crypto().secret_hash(b"req3");

        let torrent = match registry.find_obfuscated(&obfuscated) {
            Some(torrent) => torrent,
            None => {
                debug!("mse_handshake: can't find that torrent...");
                return ReadState::Done(false);
            }
        };

        let client_is_seed = torrent.is_seed();
        let peer_is_seed = registry.peer_is_seed(torrent.hash(), io.addr().ip());

        io.set_info_hash(*torrent.hash());

        if !torrent.is_running() {
            debug!("mse_handshake: we are not running that torrent...");
            return ReadState::Done(false);
        }

        if client_is_seed && peer_is_seed {
            debug!("mse_handshake: another seed tried to reconnect to us!");
            return ReadState::Done(false);
        }

        // remainder of the exchange is encrypted in both directions
        let skey = *torrent.hash();
        let incoming = io.is_incoming();
        io.crypto_mut().decrypt_init(incoming, &skey);
        io.crypto_mut().encrypt_init(incoming, &skey);
        io.set_encryption(Encryption::Rc4);

        let mut vc_in = [0u8; VC_LENGTH];
        io.read_bytes(&mut vc_in);
        // TODO: verify the decrypted vc is all zero before trusting the stream

        self.crypto_provide = io.read_u32();
        debug!("mse_handshake: crypto_provide is {}", self.crypto_provide);

        let pad_c_len = io.read_u16();
        debug!("mse_handshake: padc len is {}", pad_c_len);

        if pad_c_len as usize > mse::PAD_MAXLEN {
            warn!("mse_handshake: peer's pad c is too big");
            return ReadState::Done(false);
        }

        self.pad_c_len = pad_c_len;
        self.set_state(HandshakeState::AwaitingPadC);
        ReadState::Now
    }

    fn read_pad_c(&mut self, io: &mut PeerIo) -> ReadState {
        let needlen = self.pad_c_len as usize + 2;

        if io.buffered() < needlen {
            return ReadState::Later;
        }

        // throwaway pad c, drained through the stream to keep it aligned
        io.drain(self.pad_c_len as usize);

        let ia_len = io.read_u16();
        debug!("mse_handshake: ia_len is {}", ia_len);

        if ia_len as usize > mse::PAD_MAXLEN {
            warn!("mse_handshake: peer's initial payload is too big");
            return ReadState::Done(false);
        }

        self.ia_len = ia_len;
        self.set_state(HandshakeState::AwaitingIa);
        ReadState::Now
    }

    fn read_ia(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> ReadState {
        let needlen = self.ia_len as usize;

        debug!("mse_handshake: reading ia... have {}, need {}", io.buffered(), needlen);

        if io.buffered() < needlen {
            return ReadState::Later;
        }

        // Pick the mode before queueing any reply byte; refusing the
        // offer must not put anything on the wire.
        let crypto_select = match select_crypto(self.mode, self.crypto_provide) {
            Some(crypto_select) => crypto_select,
            None => {
                debug!("mse_handshake: peer didn't offer an encryption mode we like");
                return ReadState::Done(false);
            }
        };
        self.crypto_select = crypto_select;
        debug!("mse_handshake: selecting crypto mode {}", crypto_select);

        let message = match self.build_handshake_message(io, registry) {
            Some(message) => message,
            None => return ReadState::Done(false),
        };

        // B->A: ENCRYPT(VC, crypto_select, len(PadD), PadD)
        io.write_bytes(&mse::VC);

        let mut select_bytes = [0u8; 4];
        BigEndian::write_u32(&mut select_bytes, crypto_select);
        io.write_bytes(&select_bytes);

        // PadD is an extension slot; standard practice is zero length
        io.write_bytes(&[0u8; 2]);

        if crypto_select == CRYPTO_PROVIDE_PLAINTEXT {
            // The reply above is already ciphertext in the outbound
            // queue, but the initial payload sitting in the inbound
            // queue was encrypted by the peer. Decrypt it in place
            // before dropping the pipe back to the clear.
            io.decrypt_buf_in_place(needlen);
            io.set_encryption(Encryption::Plain);
        }

        io.write_bytes(&message.to_bytes());
        self.have_sent_bt_handshake = true;

        // the initial payload is the peer's own handshake
        self.set_state(HandshakeState::AwaitingHandshake);
        ReadState::Now
    }

    //----------------------------------------------------------------------------------//
    // initiating side

    fn read_yb(&mut self, io: &mut PeerIo, registry: &TorrentRegistry) -> ReadState {
        if io.buffered() < handshake::PROTOCOL_NAME_LEN {
            return ReadState::Later;
        }

        if io.peek(handshake::PROTOCOL_NAME_LEN) == handshake::PROTOCOL_NAME {
            // peer ignored our key exchange and answered in plaintext
            debug!("mse_handshake: got a plain handshake");
            self.set_state(HandshakeState::AwaitingHandshake);
            return ReadState::Now;
        }

        if io.buffered() < KEY_LEN {
            return ReadState::Later;
        }

        self.have_read_anything = true;

        let mut yb = [0u8; KEY_LEN];
        io.read_bytes(&mut yb);

        if !io.crypto_mut().compute_secret(&yb) {
            return ReadState::Done(false);
        }

        let skey = *io
            .info_hash()
            .expect("mse_handshake: Outgoing Connection Without A Torrent Hash");

        let message = match self.build_handshake_message(io, registry) {
            Some(message) => message,
            None => return ReadState::Done(false),
        };

        // HASH('req1', S) and HASH('req2', SKEY) xor HASH('req3', S) go
        // out in the clear
        let req1 = io.crypto().secret_hash(b"req1");
        io.write_bytes(req1.as_ref());

        let req2 = ShaHashBuilder::new()
            .add_bytes(b"req2")
            .add_bytes(skey.as_ref())
            .build();
        let req3 = io.crypto().secret_hash(b"req3");
        io.write_bytes((req2 ^ req3).as_ref());

        // Everything from here on is encrypted. The inbound stream is
        // initialized later, while resynchronizing on the vc.
        let incoming = io.is_incoming();
        io.crypto_mut().encrypt_init(incoming, &skey);
        io.set_encryption(Encryption::Rc4);

        // ENCRYPT(VC, crypto_provide, len(PadC), len(IA)), ENCRYPT(IA)
        io.write_bytes(&mse::VC);

        let mut provide_bytes = [0u8; 4];
        BigEndian::write_u32(&mut provide_bytes, crypto_provide(self.mode));
        io.write_bytes(&provide_bytes);

        // PadC is an extension slot; standard practice is zero length
        io.write_bytes(&[0u8; 2]);

        let mut ia_len_bytes = [0u8; 2];
        BigEndian::write_u16(&mut ia_len_bytes, handshake::MESSAGE_LEN as u16);
        io.write_bytes(&ia_len_bytes);

        io.write_bytes(&message.to_bytes());
        self.have_sent_bt_handshake = true;

        self.set_state(HandshakeState::AwaitingVc);
        ReadState::Later
    }

    fn read_vc(&mut self, io: &mut PeerIo) -> ReadState {
        // The length of pad b is unknown, so we resynchronize on
        // ENCRYPT(VC): trial-decrypt eight bytes at every alignment
        // until they come out all zero.
        let skey = *io
            .info_hash()
            .expect("mse_handshake: Vc Scan Without A Torrent Hash");
        let incoming = io.is_incoming();

        loop {
            if io.buffered() < VC_LENGTH {
                debug!("mse_handshake: not enough bytes... returning read_more");
                return ReadState::Later;
            }

            let mut candidate = [0u8; VC_LENGTH];
            candidate.copy_from_slice(io.peek(VC_LENGTH));

            // Restart the inbound stream for every candidate so the
            // keystream offset always matches the head of the buffer.
            io.crypto_mut().decrypt_init(incoming, &skey);
            io.crypto_mut().decrypt(&mut candidate);

            if candidate == mse::VC {
                break;
            }

            io.consume_raw(1);
        }

        debug!("mse_handshake: got it!");
        // the matching trial already advanced the fresh stream past the vc
        io.consume_raw(VC_LENGTH);
        self.set_state(HandshakeState::AwaitingCryptoSelect);
        ReadState::Now
    }

    fn read_crypto_select(&mut self, io: &mut PeerIo) -> ReadState {
        let needlen = 4 + 2;

        if io.buffered() < needlen {
            return ReadState::Later;
        }

        let crypto_select = io.read_u32();
        self.crypto_select = crypto_select;
        debug!("mse_handshake: crypto select is {}", crypto_select);

        if crypto_select & crypto_provide(self.mode) == 0 {
            debug!("mse_handshake: peer selected an encryption option we didn't offer");
            return ReadState::Done(false);
        }

        let pad_d_len = io.read_u16();
        debug!("mse_handshake: pad_d_len is {}", pad_d_len);

        if pad_d_len as usize > mse::PAD_MAXLEN {
            warn!("mse_handshake: peer's pad d is too big");
            return ReadState::Done(false);
        }

        self.pad_d_len = pad_d_len;
        self.set_state(HandshakeState::AwaitingPadD);
        ReadState::Now
    }

    fn read_pad_d(&mut self, io: &mut PeerIo) -> ReadState {
        let needlen = self.pad_d_len as usize;

        debug!("mse_handshake: pad d: need {}, got {}", needlen, io.buffered());

        if io.buffered() < needlen {
            return ReadState::Later;
        }

        io.drain(needlen);

        // possibly downgrade the pipe if the peer selected plaintext
        if self.crypto_select == CRYPTO_PROVIDE_PLAINTEXT {
            io.set_encryption(Encryption::Plain);
        } else {
            io.set_encryption(Encryption::Rc4);
        }

        self.set_state(HandshakeState::AwaitingHandshake);
        ReadState::Now
    }

    //----------------------------------------------------------------------------------//

    /// Build our 68 byte handshake for the bound torrent.
    ///
    /// Fails if no hash is bound, or the torrent is gone or stopped.
    fn build_handshake_message(&self, io: &PeerIo, registry: &TorrentRegistry) -> Option<HandshakeMessage> {
        let hash = *io.info_hash()?;
        let torrent = registry.find(&hash)?;

        if !torrent.is_running() {
            return None;
        }

        let mut ext = Extensions::new();
        ext.add(Extension::ExtensionProtocol);
        ext.add(Extension::FastExtension);

        // We don't accept DHT peers for a private torrent, but we
        // participate in the DHT regardless.
        if registry.dht_enabled() {
            ext.add(Extension::Dht);
        }

        Some(HandshakeMessage::from_parts(ext, hash, *torrent.peer_id()))
    }
}

/// Position of the first occurrence of `needle` in `haystack`.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }

    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::{crypto_provide, find_subslice, select_crypto, EncryptionMode};
    use crate::message::mse::{CRYPTO_PROVIDE_CRYPTO, CRYPTO_PROVIDE_PLAINTEXT};

    #[test]
    fn positive_provide_is_crypto_only() {
        assert_eq!(CRYPTO_PROVIDE_CRYPTO, crypto_provide(EncryptionMode::Required));
        assert_eq!(CRYPTO_PROVIDE_CRYPTO, crypto_provide(EncryptionMode::Preferred));
    }

    #[test]
    #[should_panic]
    fn negative_provide_for_clear_preferred() {
        crypto_provide(EncryptionMode::ClearPreferred);
    }

    #[test]
    fn positive_select_prefers_policy_order() {
        let both = CRYPTO_PROVIDE_CRYPTO | CRYPTO_PROVIDE_PLAINTEXT;

        assert_eq!(Some(CRYPTO_PROVIDE_CRYPTO), select_crypto(EncryptionMode::Required, both));
        assert_eq!(Some(CRYPTO_PROVIDE_CRYPTO), select_crypto(EncryptionMode::Preferred, both));
        assert_eq!(
            Some(CRYPTO_PROVIDE_PLAINTEXT),
            select_crypto(EncryptionMode::ClearPreferred, both)
        );
    }

    #[test]
    fn positive_select_falls_back_to_second_choice() {
        // a clear preferred responder still accepts a crypto only offer
        assert_eq!(
            Some(CRYPTO_PROVIDE_CRYPTO),
            select_crypto(EncryptionMode::ClearPreferred, CRYPTO_PROVIDE_CRYPTO)
        );
        assert_eq!(
            Some(CRYPTO_PROVIDE_PLAINTEXT),
            select_crypto(EncryptionMode::Preferred, CRYPTO_PROVIDE_PLAINTEXT)
        );
    }

    #[test]
    fn negative_select_nothing_acceptable() {
        // a required responder refuses a plaintext only offer
        assert_eq!(None, select_crypto(EncryptionMode::Required, CRYPTO_PROVIDE_PLAINTEXT));
        assert_eq!(None, select_crypto(EncryptionMode::Preferred, 0));
    }

    #[test]
    fn positive_find_subslice() {
        assert_eq!(Some(0), find_subslice(b"abcdef", b"abc"));
        assert_eq!(Some(3), find_subslice(b"abcdef", b"def"));
        assert_eq!(None, find_subslice(b"abcdef", b"deg"));
        assert_eq!(None, find_subslice(b"ab", b"abc"));
    }
}

use crypto::rc4::Rc4;
use crypto::symmetriccipher::SynchronousStreamCipher;

use crate::bt::{InfoHash, ShaHash, ShaHashBuilder};
use crate::cipher::dh::{DhKeys, KEY_LEN};

pub mod dh;

/// Key prefix of the RC4 stream written by the initiating side.
pub const KEY_A: &[u8] = b"keyA";

/// Key prefix of the RC4 stream written by the responding side.
pub const KEY_B: &[u8] = b"keyB";

/// Number of leading RC4 keystream bytes both sides discard.
const RC4_DISCARD_LEN: usize = 1024;

/// Derive the RC4 stream `RC4(SHA1(prefix, S, SKEY))` with its first
/// 1024 keystream bytes discarded.
pub fn derive_stream(prefix: &[u8], secret: &[u8], skey: &InfoHash) -> Rc4 {
    let key = ShaHashBuilder::new()
        .add_bytes(prefix)
        .add_bytes(secret)
        .add_bytes(skey.as_ref())
        .build();

    let mut stream = Rc4::new(key.as_ref());

    let discard_in = [0u8; RC4_DISCARD_LEN];
    let mut discard_out = [0u8; RC4_DISCARD_LEN];
    stream.process(&discard_in, &mut discard_out);

    stream
}

//----------------------------------------------------------------------------------//

/// Cryptographic context bound to a single peer connection.
///
/// Owns the key exchange state and, once initialized, the RC4 streams
/// used by the byte pipe. Stream initialization is explicit because the
/// handshake needs to restart the inbound stream while resynchronizing.
pub struct HandshakeCrypto {
    keys: DhKeys,
    secret: Option<[u8; KEY_LEN]>,
    encrypt: Option<Rc4>,
    decrypt: Option<Rc4>,
}

impl HandshakeCrypto {
    /// Create a new `HandshakeCrypto` with a fresh key pair.
    pub fn new() -> HandshakeCrypto {
        HandshakeCrypto {
            keys: DhKeys::generate(),
            secret: None,
            encrypt: None,
            decrypt: None,
        }
    }

    /// Our public key for the key exchange.
    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        self.keys.public_key()
    }

    /// Compute and store the shared secret from the peer's public key.
    ///
    /// Returns false if the peer's key is rejected.
    pub fn compute_secret(&mut self, peer_public: &[u8]) -> bool {
        match self.keys.compute_secret(peer_public) {
            Some(secret) => {
                self.secret = Some(secret);
                true
            }
            None => false,
        }
    }

    /// Shared secret computed for this connection.
    pub fn secret(&self) -> &[u8] {
        self.secret
            .as_ref()
            .map(|secret| &secret[..])
            .expect("mse_handshake: Crypto Secret Accessed Before Key Exchange")
    }

    /// Compute `SHA1(prefix, S)` over the shared secret.
    pub fn secret_hash(&self, prefix: &[u8]) -> ShaHash {
        ShaHashBuilder::new().add_bytes(prefix).add_bytes(self.secret()).build()
    }

    /// Initialize the outbound RC4 stream.
    pub fn encrypt_init(&mut self, incoming: bool, skey: &InfoHash) {
        let prefix = if incoming { KEY_B } else { KEY_A };

        self.encrypt = Some(derive_stream(prefix, self.secret(), skey));
    }

    /// Initialize (or restart) the inbound RC4 stream.
    pub fn decrypt_init(&mut self, incoming: bool, skey: &InfoHash) {
        let prefix = if incoming { KEY_A } else { KEY_B };

        self.decrypt = Some(derive_stream(prefix, self.secret(), skey));
    }

    /// Drop both RC4 streams, keeping the key exchange state.
    pub fn clear_streams(&mut self) {
        self.encrypt = None;
        self.decrypt = None;
    }

    /// Encrypt the given bytes in place, advancing the outbound stream.
    pub fn encrypt(&mut self, buffer: &mut [u8]) {
        let stream = self
            .encrypt
            .as_mut()
            .expect("mse_handshake: Encrypt Stream Used Before Initialization");

        process_in_place(stream, buffer);
    }

    /// Decrypt the given bytes in place, advancing the inbound stream.
    pub fn decrypt(&mut self, buffer: &mut [u8]) {
        let stream = self
            .decrypt
            .as_mut()
            .expect("mse_handshake: Decrypt Stream Used Before Initialization");

        process_in_place(stream, buffer);
    }
}

fn process_in_place(stream: &mut Rc4, buffer: &mut [u8]) {
    let input = buffer.to_vec();

    stream.process(&input, buffer);
}

#[cfg(test)]
mod tests {
    use super::{derive_stream, HandshakeCrypto, KEY_A};
    use crate::bt::{InfoHash, ShaHashBuilder};

    use crypto::symmetriccipher::SynchronousStreamCipher;

    fn paired_crypto() -> (HandshakeCrypto, HandshakeCrypto) {
        let mut crypto_a = HandshakeCrypto::new();
        let mut crypto_b = HandshakeCrypto::new();

        let public_a = *crypto_a.public_key();
        let public_b = *crypto_b.public_key();

        assert!(crypto_a.compute_secret(&public_b));
        assert!(crypto_b.compute_secret(&public_a));

        (crypto_a, crypto_b)
    }

    #[test]
    fn positive_streams_agree_across_sides() {
        let (mut crypto_a, mut crypto_b) = paired_crypto();
        let skey = InfoHash::from([7u8; 20]);

        // initiator encrypts with keyA, responder decrypts with keyA
        crypto_a.encrypt_init(false, &skey);
        crypto_b.decrypt_init(true, &skey);

        let mut buffer = *b"initial payload.";
        crypto_a.encrypt(&mut buffer);
        crypto_b.decrypt(&mut buffer);

        assert_eq!(b"initial payload.", &buffer);
    }

    #[test]
    fn positive_stream_restart_is_fresh() {
        let (mut crypto_a, _) = paired_crypto();
        let skey = InfoHash::from([7u8; 20]);

        let mut first = [0xABu8; 8];
        crypto_a.decrypt_init(false, &skey);
        crypto_a.decrypt(&mut first);

        let mut second = [0xABu8; 8];
        crypto_a.decrypt_init(false, &skey);
        crypto_a.decrypt(&mut second);

        assert_eq!(first, second);
    }

    #[test]
    fn positive_secret_hash_matches_builder() {
        let (crypto_a, _) = paired_crypto();

        let expected = ShaHashBuilder::new()
            .add_bytes(b"req1")
            .add_bytes(crypto_a.secret())
            .build();

        assert_eq!(expected, crypto_a.secret_hash(b"req1"));
    }

    #[test]
    fn positive_derived_stream_discards_keystream() {
        let (crypto_a, crypto_b) = paired_crypto();
        let skey = InfoHash::from([7u8; 20]);

        let mut stream_one = derive_stream(KEY_A, crypto_a.secret(), &skey);
        let mut stream_two = derive_stream(KEY_A, crypto_b.secret(), &skey);

        let input = [0x55u8; 16];
        let mut out_one = [0u8; 16];
        let mut out_two = [0u8; 16];
        stream_one.process(&input, &mut out_one);
        stream_two.process(&input, &mut out_two);

        assert_eq!(out_one, out_two);
        assert_ne!(input, out_one);
    }
}

use num::bigint::BigUint;
use num::One;
use rand::{self, Rng};

/// Length in bytes of a public key and of the computed shared secret.
pub const KEY_LEN: usize = 96;

/// Length in bytes of a private key.
const PRIVATE_KEY_LEN: usize = 20;

/// 768 bit safe prime of the MSE key exchange group.
const DH_P: [u8; KEY_LEN] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xC9, 0x0F, 0xDA, 0xA2, 0x21, 0x68, 0xC2, 0x34,
    0xC4, 0xC6, 0x62, 0x8B, 0x80, 0xDC, 0x1C, 0xD1, 0x29, 0x02, 0x4E, 0x08, 0x8A, 0x67, 0xCC, 0x74,
    0x02, 0x0B, 0xBE, 0xA6, 0x3B, 0x13, 0x9B, 0x22, 0x51, 0x4A, 0x08, 0x79, 0x8E, 0x34, 0x04, 0xDD,
    0xEF, 0x95, 0x19, 0xB3, 0xCD, 0x3A, 0x43, 0x1B, 0x30, 0x2B, 0x0A, 0x6D, 0xF2, 0x5F, 0x14, 0x37,
    0x4F, 0xE1, 0x35, 0x6D, 0x6D, 0x51, 0xC2, 0x45, 0xE4, 0x85, 0xB5, 0x76, 0x62, 0x5E, 0x7E, 0xC6,
    0xF4, 0x4C, 0x42, 0xE9, 0xA6, 0x3A, 0x36, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x05, 0x63,
];

/// Generator of the MSE key exchange group.
const DH_G: u32 = 2;

/// Key pair for one side of an MSE key exchange.
pub struct DhKeys {
    private: BigUint,
    public: [u8; KEY_LEN],
}

impl DhKeys {
    /// Generate a new random key pair.
    pub fn generate() -> DhKeys {
        let mut private_bytes = [0u8; PRIVATE_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut private_bytes);

        let prime = BigUint::from_bytes_be(&DH_P);
        let private = BigUint::from_bytes_be(&private_bytes);
        let public = BigUint::from(DH_G).modpow(&private, &prime);

        DhKeys {
            private,
            public: to_key_bytes(&public),
        }
    }

    /// Our public key, padded to the exchange key length.
    pub fn public_key(&self) -> &[u8; KEY_LEN] {
        &self.public
    }

    /// Compute the shared secret from the remote side's public key.
    ///
    /// Degenerate public keys (zero, one, or not below the group prime)
    /// are rejected.
    pub fn compute_secret(&self, peer_public: &[u8]) -> Option<[u8; KEY_LEN]> {
        if peer_public.len() != KEY_LEN {
            return None;
        }

        let prime = BigUint::from_bytes_be(&DH_P);
        let peer = BigUint::from_bytes_be(peer_public);

        if peer <= BigUint::one() || peer >= prime {
            return None;
        }

        let secret = peer.modpow(&self.private, &prime);

        Some(to_key_bytes(&secret))
    }
}

/// Serialize the given value big endian, left padded to the key length.
fn to_key_bytes(value: &BigUint) -> [u8; KEY_LEN] {
    let raw = value.to_bytes_be();
    let mut bytes = [0u8; KEY_LEN];

    bytes[KEY_LEN - raw.len()..].copy_from_slice(&raw);

    bytes
}

use std::ops::BitXor;

use crypto::digest::Digest;
use crypto::sha1::Sha1;

/// Length of a SHA-1 hash.
pub const SHA_HASH_LEN: usize = 20;

/// Length of a peer id.
pub const PEER_ID_LEN: usize = SHA_HASH_LEN;

/// Length of an info hash.
pub const INFO_HASH_LEN: usize = SHA_HASH_LEN;

/// Peer id exchanged in the trailing 20 bytes of a handshake.
pub type PeerId = ShaHash;

/// Torrent info hash.
pub type InfoHash = ShaHash;

/// SHA-1 hash wrapper type for performing operations on the hash.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ShaHash {
    hash: [u8; SHA_HASH_LEN],
}

impl ShaHash {
    /// Create a ShaHash by hashing the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> ShaHash {
        ShaHashBuilder::new().add_bytes(bytes).build()
    }

    /// Create a ShaHash directly from the given hash.
    ///
    /// Returns None if the slice is not exactly hash sized.
    pub fn from_hash(hash: &[u8]) -> Option<ShaHash> {
        if hash.len() != SHA_HASH_LEN {
            None
        } else {
            let mut my_hash = [0u8; SHA_HASH_LEN];
            my_hash.copy_from_slice(hash);

            Some(ShaHash { hash: my_hash })
        }
    }

    pub fn len() -> usize {
        SHA_HASH_LEN
    }
}

impl AsRef<[u8]> for ShaHash {
    fn as_ref(&self) -> &[u8] {
        &self.hash
    }
}

impl From<[u8; SHA_HASH_LEN]> for ShaHash {
    fn from(sha_hash: [u8; SHA_HASH_LEN]) -> ShaHash {
        ShaHash { hash: sha_hash }
    }
}

impl Into<[u8; SHA_HASH_LEN]> for ShaHash {
    fn into(self) -> [u8; SHA_HASH_LEN] {
        self.hash
    }
}

impl PartialEq<[u8]> for ShaHash {
    fn eq(&self, other: &[u8]) -> bool {
        other.len() == self.hash.len() && self.hash.iter().zip(other.iter()).all(|(h, o)| h == o)
    }
}

impl BitXor<ShaHash> for ShaHash {
    type Output = ShaHash;

    fn bitxor(mut self, rhs: ShaHash) -> ShaHash {
        for (src, dst) in rhs.hash.iter().zip(self.hash.iter_mut()) {
            *dst = *src ^ *dst;
        }

        self
    }
}

//----------------------------------------------------------------------------------//

/// Building `ShaHash` objects by adding byte slices to the hash.
#[derive(Clone)]
pub struct ShaHashBuilder {
    sha: Sha1,
}

impl ShaHashBuilder {
    /// Create a new `ShaHashBuilder`.
    pub fn new() -> ShaHashBuilder {
        ShaHashBuilder { sha: Sha1::new() }
    }

    /// Add bytes to the `ShaHashBuilder`.
    pub fn add_bytes(mut self, bytes: &[u8]) -> ShaHashBuilder {
        self.sha.input(bytes);

        self
    }

    /// Build the ShaHash from the `ShaHashBuilder`.
    pub fn build(&self) -> ShaHash {
        let mut buffer = [0u8; SHA_HASH_LEN];

        self.sha.clone().result(&mut buffer);

        buffer.into()
    }
}

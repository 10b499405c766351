use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use crate::bt::{InfoHash, PeerId, ShaHash, ShaHashBuilder};

/// Compute the obfuscated form of an info hash, `SHA1("req2", hash)`.
///
/// Encrypted handshakes identify the torrent by this value so a passive
/// observer cannot match the exchange against a known info hash.
pub fn obfuscated_hash(hash: &InfoHash) -> ShaHash {
    ShaHashBuilder::new()
        .add_bytes(b"req2")
        .add_bytes(hash.as_ref())
        .build()
}

/// Locally registered torrent.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Torrent {
    hash: InfoHash,
    peer_id: PeerId,
    running: bool,
    seed: bool,
}

impl Torrent {
    /// Create a new running `Torrent` with the peer id we advertise for it.
    pub fn new(hash: InfoHash, peer_id: PeerId) -> Torrent {
        Torrent {
            hash,
            peer_id,
            running: true,
            seed: false,
        }
    }

    /// Set whether the torrent is currently running.
    pub fn with_running(mut self, running: bool) -> Torrent {
        self.running = running;
        self
    }

    /// Set whether we are seeding the torrent.
    pub fn with_seed(mut self, seed: bool) -> Torrent {
        self.seed = seed;
        self
    }

    pub fn hash(&self) -> &InfoHash {
        &self.hash
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_seed(&self) -> bool {
        self.seed
    }
}

//----------------------------------------------------------------------------------//

/// Shared registry of local torrents and per-peer bookkeeping.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct TorrentRegistry {
    inner: Arc<RwLock<InnerRegistry>>,
}

struct InnerRegistry {
    torrents: HashMap<InfoHash, Torrent>,
    obfuscated: HashMap<ShaHash, InfoHash>,
    seed_peers: HashSet<(InfoHash, IpAddr)>,
    utp_failed: HashSet<IpAddr>,
    dht_enabled: bool,
}

impl TorrentRegistry {
    /// Create a new empty `TorrentRegistry`.
    pub fn new() -> TorrentRegistry {
        TorrentRegistry {
            inner: Arc::new(RwLock::new(InnerRegistry {
                torrents: HashMap::new(),
                obfuscated: HashMap::new(),
                seed_peers: HashSet::new(),
                utp_failed: HashSet::new(),
                dht_enabled: false,
            })),
        }
    }

    /// Register a torrent, indexing it by hash and by obfuscated hash.
    pub fn register(&self, torrent: Torrent) {
        let mut inner = self.inner.write().unwrap();

        inner.obfuscated.insert(obfuscated_hash(torrent.hash()), *torrent.hash());
        inner.torrents.insert(*torrent.hash(), torrent);
    }

    /// Deregister the torrent with the given hash.
    pub fn deregister(&self, hash: &InfoHash) {
        let mut inner = self.inner.write().unwrap();

        inner.obfuscated.remove(&obfuscated_hash(hash));
        inner.torrents.remove(hash);
    }

    /// Look a torrent up by its info hash.
    pub fn find(&self, hash: &InfoHash) -> Option<Torrent> {
        self.inner.read().unwrap().torrents.get(hash).cloned()
    }

    /// Look a torrent up by the obfuscated hash an encrypted handshake carries.
    pub fn find_obfuscated(&self, obfuscated: &ShaHash) -> Option<Torrent> {
        let inner = self.inner.read().unwrap();

        inner
            .obfuscated
            .get(obfuscated)
            .and_then(|hash| inner.torrents.get(hash))
            .cloned()
    }

    /// Flip the running flag of a registered torrent.
    pub fn set_running(&self, hash: &InfoHash, running: bool) {
        let mut inner = self.inner.write().unwrap();

        if let Some(torrent) = inner.torrents.get_mut(hash) {
            torrent.running = running;
        }
    }

    //----------------------------------------------------------------------------------//

    /// Record that the peer at the given address is a seed for the torrent.
    pub fn mark_peer_seed(&self, hash: &InfoHash, addr: IpAddr) {
        self.inner.write().unwrap().seed_peers.insert((*hash, addr));
    }

    /// Whether the peer at the given address is known to seed the torrent.
    pub fn peer_is_seed(&self, hash: &InfoHash, addr: IpAddr) -> bool {
        self.inner.read().unwrap().seed_peers.contains(&(*hash, addr))
    }

    /// Record that the peer at the given address does not speak uTP.
    pub fn mark_utp_failed(&self, addr: IpAddr) {
        self.inner.write().unwrap().utp_failed.insert(addr);
    }

    /// Whether the peer at the given address is known to not speak uTP.
    pub fn utp_failed(&self, addr: IpAddr) -> bool {
        self.inner.read().unwrap().utp_failed.contains(&addr)
    }

    /// Advertise DHT support in our handshakes.
    pub fn set_dht_enabled(&self, enabled: bool) {
        self.inner.write().unwrap().dht_enabled = enabled;
    }

    pub fn dht_enabled(&self) -> bool {
        self.inner.read().unwrap().dht_enabled
    }
}

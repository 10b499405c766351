//! Peer handshake engine for bittorrent connections.
//!
//! Negotiates a usable session with a remote peer from the moment a byte
//! stream transport is established until ordinary wire messages may
//! flow, speaking both the plaintext handshake and the message stream
//! encryption (MSE) exchange, with fallback from utp to tcp and from
//! encrypted to plaintext where policy allows.

pub mod bt;
pub mod cipher;
pub mod message;

mod config;
mod connect;
mod error;
mod handshake;
mod local_addr;
mod machine;
mod pipe;
mod registry;
mod transport;

pub use crate::bt::{InfoHash, PeerId};
pub use crate::config::HandshakerConfig;
pub use crate::connect::{CompleteMessage, PendingHandshake};
pub use crate::error::HandshakeError;
pub use crate::handshake::timer::HandshakeTimer;
pub use crate::handshake::{
    DoneCallback, ErrorDisposition, Handshake, HandshakeOutcome, HandshakeStatus,
};
pub use crate::local_addr::LocalAddr;
pub use crate::machine::{EncryptionMode, HandshakeState};
pub use crate::message::extensions::{Extension, Extensions};
pub use crate::pipe::{Encryption, PeerIo, SocketKind};
pub use crate::registry::{obfuscated_hash, Torrent, TorrentRegistry};
pub use crate::transport::{TcpTransport, Transport};

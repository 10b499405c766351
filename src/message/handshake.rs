use std::io;
use std::io::Write;

use crate::bt::{self, InfoHash, PeerId};
use crate::message::extensions::{self, Extensions};

use nom::{call, do_parse, error_node_position, error_position, tag, take, IResult};

/// Protocol name carried by every handshake, including its length prefix.
pub const PROTOCOL_NAME: &[u8] = b"\x13BitTorrent protocol";

/// Length of the protocol name with its length prefix.
pub const PROTOCOL_NAME_LEN: usize = 20;

/// Total length of a handshake message.
pub const MESSAGE_LEN: usize = PROTOCOL_NAME_LEN + extensions::NUM_EXTENSION_BYTES + bt::INFO_HASH_LEN + bt::PEER_ID_LEN;

/// Length of a handshake message up to, but excluding, the peer id.
///
/// This is the prefix both sides can act on before the peer id arrives.
pub const HEAD_LEN: usize = MESSAGE_LEN - bt::PEER_ID_LEN;

/// Complete 68 byte handshake message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct HandshakeMessage {
    ext: Extensions,
    hash: InfoHash,
    pid: PeerId,
}

impl HandshakeMessage {
    /// Create a new `HandshakeMessage` from the given components.
    pub fn from_parts(ext: Extensions, hash: InfoHash, pid: PeerId) -> HandshakeMessage {
        HandshakeMessage { ext, hash, pid }
    }

    /// Parse a complete `HandshakeMessage` from the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> IResult<&[u8], HandshakeMessage> {
        parse_remote_handshake(bytes)
    }

    /// Write the `HandshakeMessage` to the given writer.
    pub fn write_bytes<W>(&self, mut writer: W) -> io::Result<()>
    where
        W: Write,
    {
        writer.write_all(PROTOCOL_NAME)?;
        self.ext.write_bytes(&mut writer)?;
        writer.write_all(self.hash.as_ref())?;
        writer.write_all(self.pid.as_ref())?;

        Ok(())
    }

    /// Serialize the `HandshakeMessage` into a fresh buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(MESSAGE_LEN);

        self.write_bytes(&mut buffer)
            .expect("mse_handshake: HandshakeMessage Write To Buffer Failed");

        buffer
    }

    pub fn write_len(&self) -> usize {
        MESSAGE_LEN
    }

    pub fn into_parts(self) -> (Extensions, InfoHash, PeerId) {
        (self.ext, self.hash, self.pid)
    }
}

/// Parse the head of a handshake message, verifying the protocol name.
pub fn parse_head(bytes: &[u8]) -> IResult<&[u8], (Extensions, InfoHash)> {
    do_parse!(
        bytes,
        tag!(PROTOCOL_NAME)
            >> ext: call!(Extensions::from_bytes)
            >> hash: call!(parse_remote_hash)
            >> ((ext, hash))
    )
}

fn parse_remote_handshake(bytes: &[u8]) -> IResult<&[u8], HandshakeMessage> {
    do_parse!(
        bytes,
        head: call!(parse_head)
            >> pid: call!(parse_remote_pid)
            >> (HandshakeMessage::from_parts(head.0, head.1, pid))
    )
}

fn parse_remote_hash(bytes: &[u8]) -> IResult<&[u8], InfoHash> {
    do_parse!(
        bytes,
        hash: take!(bt::INFO_HASH_LEN) >> (InfoHash::from_hash(hash).unwrap())
    )
}

fn parse_remote_pid(bytes: &[u8]) -> IResult<&[u8], PeerId> {
    do_parse!(
        bytes,
        pid: take!(bt::PEER_ID_LEN) >> (PeerId::from_hash(pid).unwrap())
    )
}

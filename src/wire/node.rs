//! One peer connection: frame codec, checksummed send/receive, and the
//! dispatch loop.
//!
//! A [`Node`] owns a single blocking byte stream and the magic value of
//! the network it expects. [`Node::run`] reads frames and hands each
//! decoded message to a [`Handler`]; handlers default to ignoring
//! everything, so an implementation overrides only the messages it cares
//! about and replies through the node it is given.
//!
//! Any decoding failure, checksum mismatch or I/O error terminates the
//! loop; the caller is expected to drop the node. Unknown commands are
//! not errors.

use std::io::{Read, Write};
use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{trace, warn};
use sha2::{Digest, Sha256};

use crate::chain::{BlockHeader, Tx};
use crate::error::{Error, Result};
use crate::serial::{LimitedSource, Tap, WireRead, WireWrite};
use crate::wire::constants::{Network, PROTOCOL_VERSION};
use crate::wire::message::{
    AddrEntry, AlertMessage, BlockMessage, FilterLoadMessage, GetBlocksMessage, InventoryVector,
    MerkleBlockMessage, Message, NetworkAddress, RejectMessage, Services, VersionMessage,
};

/// The 24-byte frame header preceding every payload:
///
/// ```text
/// +-----------+--------------+---------------+--------------+
/// | magic (4) | command (12) | length (4 LE) | checksum (4) |
/// +-----------+--------------+---------------+--------------+
/// ```
///
/// The checksum is the first 4 bytes of `SHA256(SHA256(payload))`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MessageHeader {
    pub magic: u32,
    pub command: [u8; 12],
    pub length: u32,
    pub checksum: [u8; 4],
}

impl MessageHeader {
    pub const SIZE: usize = 24;

    pub fn read<R: Read>(r: &mut R) -> Result<MessageHeader> {
        Ok(MessageHeader {
            magic: r.read_u32_le("header magic")?,
            command: r.read_array("header command")?,
            length: r.read_u32_le("header length")?,
            checksum: r.read_array("header checksum")?,
        })
    }

    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.magic)?;
        w.write_all(&self.command)?;
        w.write_u32_le(self.length)?;
        w.write_all(&self.checksum)?;
        Ok(())
    }
}

/// Per-message callbacks invoked by [`Node::run`], one per protocol
/// command. Every method defaults to a no-op; returning an error stops
/// the loop.
#[allow(unused_variables)]
pub trait Handler<S: Read + Write> {
    fn on_version(&mut self, node: &mut Node<S>, msg: VersionMessage) -> Result<()> {
        Ok(())
    }
    fn on_verack(&mut self, node: &mut Node<S>) -> Result<()> {
        Ok(())
    }
    fn on_addr(&mut self, node: &mut Node<S>, entries: Vec<AddrEntry>) -> Result<()> {
        Ok(())
    }
    fn on_inv(&mut self, node: &mut Node<S>, inventory: Vec<InventoryVector>) -> Result<()> {
        Ok(())
    }
    fn on_getdata(&mut self, node: &mut Node<S>, inventory: Vec<InventoryVector>) -> Result<()> {
        Ok(())
    }
    fn on_notfound(&mut self, node: &mut Node<S>, inventory: Vec<InventoryVector>) -> Result<()> {
        Ok(())
    }
    fn on_getblocks(&mut self, node: &mut Node<S>, msg: GetBlocksMessage) -> Result<()> {
        Ok(())
    }
    fn on_getheaders(&mut self, node: &mut Node<S>, msg: GetBlocksMessage) -> Result<()> {
        Ok(())
    }
    fn on_tx(&mut self, node: &mut Node<S>, tx: Tx) -> Result<()> {
        Ok(())
    }
    fn on_block(&mut self, node: &mut Node<S>, msg: BlockMessage) -> Result<()> {
        Ok(())
    }
    fn on_headers(&mut self, node: &mut Node<S>, headers: Vec<BlockHeader>) -> Result<()> {
        Ok(())
    }
    fn on_getaddr(&mut self, node: &mut Node<S>) -> Result<()> {
        Ok(())
    }
    fn on_mempool(&mut self, node: &mut Node<S>) -> Result<()> {
        Ok(())
    }
    fn on_ping(&mut self, node: &mut Node<S>, nonce: u64) -> Result<()> {
        Ok(())
    }
    fn on_pong(&mut self, node: &mut Node<S>, nonce: u64) -> Result<()> {
        Ok(())
    }
    fn on_reject(&mut self, node: &mut Node<S>, msg: RejectMessage) -> Result<()> {
        Ok(())
    }
    fn on_filterload(&mut self, node: &mut Node<S>, msg: FilterLoadMessage) -> Result<()> {
        Ok(())
    }
    fn on_filteradd(&mut self, node: &mut Node<S>, data: Vec<u8>) -> Result<()> {
        Ok(())
    }
    fn on_filterclear(&mut self, node: &mut Node<S>) -> Result<()> {
        Ok(())
    }
    fn on_merkleblock(&mut self, node: &mut Node<S>, msg: MerkleBlockMessage) -> Result<()> {
        Ok(())
    }
    fn on_alert(&mut self, node: &mut Node<S>, msg: AlertMessage) -> Result<()> {
        Ok(())
    }
    fn on_unsupported(
        &mut self,
        node: &mut Node<S>,
        command: [u8; 12],
        data: Vec<u8>,
    ) -> Result<()> {
        Ok(())
    }
}

/// One connection to one peer.
pub struct Node<S> {
    stream: S,
    network: Network,
}

impl<S: Read + Write> Node<S> {
    pub fn new(network: Network, stream: S) -> Node<S> {
        Node { stream, network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Builds the `version` message opening a handshake with the peer at
    /// `peer_addr` (for a `TcpStream`, its `peer_addr()`).
    pub fn version_message(&self, peer_addr: SocketAddr) -> Result<VersionMessage> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
            .as_secs() as i64;
        Ok(VersionMessage {
            version: PROTOCOL_VERSION,
            services: Services::NONE,
            timestamp,
            addr_recv: NetworkAddress::from_socket_addr(peer_addr, Services::NODE_NETWORK),
            addr_from: NetworkAddress::UNSPECIFIED,
            nonce: clock_ticks(),
            user_agent: String::new(),
            start_height: -1,
            relay: true,
        })
    }

    /// Serializes `msg`, derives length and checksum from the payload,
    /// and emits the frame in one coalesced write.
    pub fn send(&mut self, msg: &Message) -> Result<()> {
        let mut payload = Vec::new();
        msg.encode(&mut payload)?;
        let length =
            u32::try_from(payload.len()).map_err(|_| Error::Overflow("message payload length"))?;
        let checksum = Sha256::digest(Sha256::digest(&payload));
        let header = MessageHeader {
            magic: self.network.magic(),
            command: msg.command(),
            length,
            checksum: [checksum[0], checksum[1], checksum[2], checksum[3]],
        };
        let mut frame = Vec::with_capacity(MessageHeader::SIZE + payload.len());
        header.write(&mut frame)?;
        frame.extend_from_slice(&payload);
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        trace!(
            "sending {} ({} bytes)",
            command_label(&header.command),
            frame.len()
        );
        Ok(())
    }

    /// Reads one frame: header, payload bounded to the advertised length
    /// and hashed as it is parsed, then the trailing consistency checks.
    pub fn recv(&mut self) -> Result<Message> {
        let header = MessageHeader::read(&mut self.stream)?;
        if header.magic != self.network.magic() {
            return Err(Error::InvalidMagic {
                got: header.magic,
                want: self.network.magic(),
            });
        }
        let mut hasher = Sha256::new();
        let mut src = LimitedSource::new(
            Tap::new(&mut self.stream, &mut hasher),
            u64::from(header.length),
        );
        let msg = Message::decode(&header.command, &mut src)?;
        let remaining = src.remaining();
        drop(src);
        if remaining != 0 {
            return Err(Error::InvalidFormat("received message contains extraneous data"));
        }
        let checksum = Sha256::digest(hasher.finalize());
        if checksum[..4] != header.checksum {
            return Err(Error::InvalidChecksum("message frame"));
        }
        trace!(
            "received {} ({} bytes)",
            command_label(&header.command),
            MessageHeader::SIZE + header.length as usize
        );
        Ok(msg)
    }

    /// Receives and dispatches messages until the stream fails or a
    /// handler returns an error. Dispatch order follows the peer's send
    /// order exactly.
    pub fn run<H: Handler<S>>(&mut self, handler: &mut H) -> Result<()> {
        loop {
            match self.recv()? {
                Message::Version(msg) => handler.on_version(self, msg)?,
                Message::Verack => handler.on_verack(self)?,
                Message::Addr(entries) => handler.on_addr(self, entries)?,
                Message::Inv(inventory) => handler.on_inv(self, inventory)?,
                Message::GetData(inventory) => handler.on_getdata(self, inventory)?,
                Message::NotFound(inventory) => handler.on_notfound(self, inventory)?,
                Message::GetBlocks(msg) => handler.on_getblocks(self, msg)?,
                Message::GetHeaders(msg) => handler.on_getheaders(self, msg)?,
                Message::Tx(tx) => handler.on_tx(self, tx)?,
                Message::Block(msg) => handler.on_block(self, msg)?,
                Message::Headers(headers) => handler.on_headers(self, headers)?,
                Message::GetAddr => handler.on_getaddr(self)?,
                Message::MemPool => handler.on_mempool(self)?,
                Message::Ping(nonce) => handler.on_ping(self, nonce)?,
                Message::Pong(nonce) => handler.on_pong(self, nonce)?,
                Message::Reject(msg) => handler.on_reject(self, msg)?,
                Message::FilterLoad(msg) => handler.on_filterload(self, msg)?,
                Message::FilterAdd(data) => handler.on_filteradd(self, data)?,
                Message::FilterClear => handler.on_filterclear(self)?,
                Message::MerkleBlock(msg) => handler.on_merkleblock(self, msg)?,
                Message::Alert(msg) => handler.on_alert(self, msg)?,
                Message::Unsupported { command, data } => {
                    warn!("received unsupported message: {:?}", command_label(&command));
                    handler.on_unsupported(self, command, data)?;
                }
            }
        }
    }
}

/// Monotonic-clock tick count, used as the handshake nonce so that a
/// connection to ourselves can be recognised.
fn clock_ticks() -> u64 {
    static ANCHOR: OnceLock<Instant> = OnceLock::new();
    let anchor = *ANCHOR.get_or_init(Instant::now);
    Instant::now().duration_since(anchor).as_nanos() as u64
}

fn command_label(command: &[u8; 12]) -> String {
    let end = command.iter().position(|&b| b == 0).unwrap_or(12);
    String::from_utf8_lossy(&command[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor};
    use std::net::{IpAddr, Ipv4Addr};

    /// A half-duplex stream: reads come from a canned input, writes land
    /// in a buffer.
    struct TestStream {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl TestStream {
        fn new(input: Vec<u8>) -> TestStream {
            TestStream {
                input: Cursor::new(input),
                output: Vec::new(),
            }
        }
    }

    impl Read for TestStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for TestStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn frame(network: Network, command: &[u8], payload: &[u8]) -> Vec<u8> {
        let checksum = Sha256::digest(Sha256::digest(payload));
        let mut cmd = [0u8; 12];
        cmd[..command.len()].copy_from_slice(command);
        let header = MessageHeader {
            magic: network.magic(),
            command: cmd,
            length: payload.len() as u32,
            checksum: [checksum[0], checksum[1], checksum[2], checksum[3]],
        };
        let mut bytes = Vec::new();
        header.write(&mut bytes).unwrap();
        bytes.extend_from_slice(payload);
        bytes
    }

    const VERACK_FRAME: [u8; 24] = [
        0xF9, 0xBE, 0xB4, 0xD9, // magic
        0x76, 0x65, 0x72, 0x61, 0x63, 0x6B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // "verack"
        0x00, 0x00, 0x00, 0x00, // length
        0x5D, 0xF6, 0xE0, 0xE2, // SHA256d("")[0..4]
    ];

    #[test]
    fn verack_frame_parses_and_reserializes_byte_identically() {
        let mut node = Node::new(Network::Main, TestStream::new(VERACK_FRAME.to_vec()));
        assert_eq!(node.recv().unwrap(), Message::Verack);

        node.send(&Message::Verack).unwrap();
        assert_eq!(node.into_inner().output, VERACK_FRAME);
    }

    #[test]
    fn frame_with_foreign_magic_is_rejected() {
        let bytes = frame(Network::Testnet3, b"verack", &[]);
        let mut node = Node::new(Network::Main, TestStream::new(bytes));
        assert!(matches!(
            node.recv(),
            Err(Error::InvalidMagic {
                got: 0x0709_110B,
                want: 0xD9B4_BEF9,
            })
        ));
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut bytes = frame(Network::Main, b"ping", &7u64.to_le_bytes());
        bytes[20] ^= 0xFF; // flip a checksum byte
        let mut node = Node::new(Network::Main, TestStream::new(bytes));
        assert!(matches!(
            node.recv(),
            Err(Error::InvalidChecksum("message frame"))
        ));
    }

    #[test]
    fn extraneous_payload_bytes_are_rejected() {
        // A verack with a one-byte payload: nothing consumes it.
        let bytes = frame(Network::Main, b"verack", &[0x00]);
        let mut node = Node::new(Network::Main, TestStream::new(bytes));
        assert!(matches!(
            node.recv(),
            Err(Error::InvalidFormat("received message contains extraneous data"))
        ));
    }

    #[test]
    fn truncated_payload_reports_eof() {
        let mut bytes = frame(Network::Main, b"ping", &7u64.to_le_bytes());
        bytes.truncate(bytes.len() - 3);
        let mut node = Node::new(Network::Main, TestStream::new(bytes));
        assert!(matches!(node.recv(), Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn unknown_command_still_consumes_and_checksums_the_payload() {
        let bytes = frame(Network::Main, b"sendheaders", &[1, 2, 3]);
        let mut node = Node::new(Network::Main, TestStream::new(bytes));
        assert_eq!(
            node.recv().unwrap(),
            Message::Unsupported {
                command: *b"sendheaders\0",
                data: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn version_message_is_populated_for_the_handshake() {
        let node = Node::new(Network::Main, TestStream::new(Vec::new()));
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9)), 8333);
        let msg = node.version_message(peer).unwrap();
        assert_eq!(msg.version, PROTOCOL_VERSION);
        assert_eq!(msg.services, Services::NONE);
        assert_eq!(msg.addr_recv.to_string(), "203.0.113.9:8333");
        assert_eq!(msg.addr_from, NetworkAddress::UNSPECIFIED);
        assert_eq!(msg.start_height, -1);
        assert!(msg.relay);
        assert!(msg.timestamp > 0);
    }

    /// Replies to pings and counts what it saw.
    #[derive(Default)]
    struct PingPong {
        pings: Vec<u64>,
        unsupported: Vec<String>,
    }

    impl Handler<TestStream> for PingPong {
        fn on_ping(&mut self, node: &mut Node<TestStream>, nonce: u64) -> Result<()> {
            self.pings.push(nonce);
            node.send(&Message::Pong(nonce))
        }

        fn on_unsupported(
            &mut self,
            _node: &mut Node<TestStream>,
            command: [u8; 12],
            _data: Vec<u8>,
        ) -> Result<()> {
            self.unsupported.push(command_label(&command));
            Ok(())
        }
    }

    #[test]
    fn run_dispatches_in_receive_order_until_eof() {
        let mut input = frame(Network::Main, b"ping", &41u64.to_le_bytes());
        input.extend(frame(Network::Main, b"sendcmpct", &[0x00, 0x01]));
        input.extend(frame(Network::Main, b"ping", &42u64.to_le_bytes()));

        let mut node = Node::new(Network::Main, TestStream::new(input));
        let mut handler = PingPong::default();
        // The canned input runs dry after the second ping.
        assert!(matches!(
            node.run(&mut handler),
            Err(Error::UnexpectedEof("header magic"))
        ));
        assert_eq!(handler.pings, vec![41, 42]);
        assert_eq!(handler.unsupported, vec!["sendcmpct".to_string()]);

        let mut expected = frame(Network::Main, b"pong", &41u64.to_le_bytes());
        expected.extend(frame(Network::Main, b"pong", &42u64.to_le_bytes()));
        assert_eq!(node.into_inner().output, expected);
    }

    #[test]
    fn handler_errors_stop_the_loop() {
        struct Quitter;
        impl Handler<TestStream> for Quitter {
            fn on_ping(&mut self, _node: &mut Node<TestStream>, _nonce: u64) -> Result<()> {
                Err(Error::InvalidFormat("done"))
            }
        }
        let input = frame(Network::Main, b"ping", &1u64.to_le_bytes());
        let mut node = Node::new(Network::Main, TestStream::new(input));
        assert!(matches!(
            node.run(&mut Quitter),
            Err(Error::InvalidFormat("done"))
        ));
    }
}

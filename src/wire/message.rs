//! Typed P2P messages and their payload codecs.
//!
//! Each variant of [`Message`] corresponds to one protocol command; the
//! fallback [`Message::Unsupported`] captures the raw payload of anything
//! the crate does not recognise, so unknown commands never kill a
//! connection.
//!
//! Payload layouts follow the pre-SegWit protocol (version 70001):
//! https://developer.bitcoin.org/reference/p2p_networking.html

use std::fmt;
use std::io::{Read, Write};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use crate::bloom::BloomFilter;
use crate::chain::{BlockHeader, Tx};
use crate::error::{Error, Result};
use crate::serial::{LimitedSource, WireRead, WireWrite};
use crate::wire::constants::{VERSION_WITH_HEIGHT, VERSION_WITH_RELAY, VERSION_WITH_SENDER};

/// Service flags, a `u64` bitfield transmitted in the `version` message
/// and inside every network address.
///
/// Unknown bits are preserved; the flags are forward-compatible.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Services(u64);

impl Services {
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if all bits in `other` are set.
    pub const fn contains(self, other: Services) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Not a full node; may only relay transactions it originates.
    pub const NONE: Services = Services(0);

    /// A full node that can be asked for full blocks.
    pub const NODE_NETWORK: Services = Services(1 << 0);

    /// Answers `getutxo` requests (BIP 64).
    pub const NODE_GETUTXO: Services = Services(1 << 1);

    /// Supports bloom-filtered connections (BIP 111).
    pub const NODE_BLOOM: Services = Services(1 << 2);

    pub fn names(self) -> Vec<&'static str> {
        if self.is_empty() {
            return vec!["NONE"];
        }
        let mut names = Vec::new();
        if self.contains(Self::NODE_NETWORK) {
            names.push("NODE_NETWORK");
        }
        if self.contains(Self::NODE_GETUTXO) {
            names.push("NODE_GETUTXO");
        }
        if self.contains(Self::NODE_BLOOM) {
            names.push("NODE_BLOOM");
        }
        names
    }
}

impl From<u64> for Services {
    fn from(bits: u64) -> Self {
        Services::new(bits)
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Services(NONE)");
        }
        write!(f, "Services({}) [{:#018x}]", self.names().join(" | "), self.0)
    }
}

/// The 26-byte network address used inside `version` and `addr` payloads:
/// services, a 16-byte IPv6 address (IPv4 as `::ffff:a.b.c.d`), and a
/// big-endian port. The port is one of the protocol's two big-endian
/// fields.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NetworkAddress {
    pub services: Services,
    pub addr: Ipv6Addr,
    pub port: u16,
}

impl NetworkAddress {
    pub const UNSPECIFIED: NetworkAddress = NetworkAddress {
        services: Services::NONE,
        addr: Ipv6Addr::UNSPECIFIED,
        port: 0,
    };

    pub fn from_socket_addr(sa: SocketAddr, services: Services) -> NetworkAddress {
        let addr = match sa.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };
        NetworkAddress {
            services,
            addr,
            port: sa.port(),
        }
    }

    pub fn decode<R: Read>(r: &mut R) -> Result<NetworkAddress> {
        Ok(NetworkAddress {
            services: Services::new(r.read_u64_le("net_addr services")?),
            addr: Ipv6Addr::from(r.read_array::<16>("net_addr ip")?),
            port: r.read_u16_be("net_addr port")?,
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u64_le(self.services.bits())?;
        w.write_all(&self.addr.octets())?;
        w.write_u16_be(self.port)
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr.to_ipv4_mapped() {
            Some(v4) => write!(f, "{}:{}", v4, self.port),
            None => write!(f, "[{}]:{}", self.addr, self.port),
        }
    }
}

/// One entry of an `addr` message: a network address plus the last time
/// the advertising peer saw it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AddrEntry {
    pub timestamp: u32,
    pub address: NetworkAddress,
}

/// Inventory object types used in `inv`, `getdata` and `notfound`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum InventoryType {
    Error = 0,
    Tx = 1,
    Block = 2,
    /// Filtered block (BIP 37).
    FilteredBlock = 3,
}

impl InventoryType {
    fn from_u32(v: u32) -> Option<InventoryType> {
        match v {
            0 => Some(InventoryType::Error),
            1 => Some(InventoryType::Tx),
            2 => Some(InventoryType::Block),
            3 => Some(InventoryType::FilteredBlock),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct InventoryVector {
    pub kind: InventoryType,
    pub hash: [u8; 32],
}

impl InventoryVector {
    fn decode<R: Read>(r: &mut R) -> Result<InventoryVector> {
        let raw = r.read_u32_le("inventory type")?;
        Ok(InventoryVector {
            kind: InventoryType::from_u32(raw)
                .ok_or(Error::InvalidFormat("unknown inventory type"))?,
            hash: r.read_array("inventory hash")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.kind as u32)?;
        w.write_all(&self.hash)?;
        Ok(())
    }
}

/// The `version` handshake payload.
///
/// Fields past `addr_recv` exist only for sufficiently new protocol
/// versions; both codec directions gate on the `version` field itself, so
/// a payload from an ancient peer simply leaves the later fields at their
/// defaults.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct VersionMessage {
    pub version: u32,
    pub services: Services,
    /// Unix timestamp, seconds.
    pub timestamp: i64,
    pub addr_recv: NetworkAddress,
    pub addr_from: NetworkAddress,
    pub nonce: u64,
    pub user_agent: String,
    pub start_height: i32,
    pub relay: bool,
}

impl VersionMessage {
    pub fn decode<R: Read>(r: &mut R) -> Result<VersionMessage> {
        let version = r.read_u32_le("version")?;
        let mut msg = VersionMessage {
            version,
            services: Services::new(r.read_u64_le("version services")?),
            timestamp: r.read_i64_le("version timestamp")?,
            addr_recv: NetworkAddress::decode(r)?,
            addr_from: NetworkAddress::UNSPECIFIED,
            nonce: 0,
            user_agent: String::new(),
            start_height: 0,
            relay: false,
        };
        if version >= VERSION_WITH_SENDER {
            msg.addr_from = NetworkAddress::decode(r)?;
            msg.nonce = r.read_u64_le("version nonce")?;
            msg.user_agent = r.read_var_string("version user_agent")?;
            if version >= VERSION_WITH_HEIGHT {
                msg.start_height = r.read_i32_le("version start_height")?;
                if version >= VERSION_WITH_RELAY {
                    msg.relay = r.read_u8("version relay")? != 0;
                }
            }
        }
        Ok(msg)
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.version)?;
        w.write_u64_le(self.services.bits())?;
        w.write_i64_le(self.timestamp)?;
        self.addr_recv.encode(w)?;
        if self.version >= VERSION_WITH_SENDER {
            self.addr_from.encode(w)?;
            w.write_u64_le(self.nonce)?;
            w.write_var_string(&self.user_agent)?;
            if self.version >= VERSION_WITH_HEIGHT {
                w.write_i32_le(self.start_height)?;
                if self.version >= VERSION_WITH_RELAY {
                    w.write_u8(u8::from(self.relay))?;
                }
            }
        }
        Ok(())
    }
}

/// Shared payload of `getblocks` and `getheaders`: a block locator plus a
/// stop hash (zero for "as many as you have").
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct GetBlocksMessage {
    pub version: u32,
    pub locator_hashes: Vec<[u8; 32]>,
    pub hash_stop: [u8; 32],
}

impl GetBlocksMessage {
    fn decode<R: Read>(r: &mut R) -> Result<GetBlocksMessage> {
        Ok(GetBlocksMessage {
            version: r.read_u32_le("locator version")?,
            locator_hashes: decode_hashes(r, "locator hashes")?,
            hash_stop: r.read_array("locator hash_stop")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.version)?;
        encode_hashes(w, &self.locator_hashes)?;
        w.write_all(&self.hash_stop)?;
        Ok(())
    }
}

/// A full block: header plus its transactions.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BlockMessage {
    pub header: BlockHeader,
    pub txns: Vec<Tx>,
}

impl BlockMessage {
    fn decode<R: Read>(r: &mut R) -> Result<BlockMessage> {
        let header = BlockHeader::decode(r)?;
        let count = r.read_varint_len("block tx count")?;
        let mut txns = Vec::with_capacity(count);
        for _ in 0..count {
            txns.push(Tx::decode(r)?);
        }
        Ok(BlockMessage { header, txns })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        self.header.encode(w)?;
        w.write_varint(self.txns.len() as u64)?;
        for tx in &self.txns {
            tx.encode(w)?;
        }
        Ok(())
    }
}

/// The `reject` payload. The trailing `data` field extends to the end of
/// the frame, so decoding needs the payload boundary.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RejectMessage {
    /// Command the rejection refers to.
    pub message: String,
    pub ccode: u8,
    pub reason: String,
    pub data: Vec<u8>,
}

impl RejectMessage {
    pub const REJECT_MALFORMED: u8 = 0x01;
    pub const REJECT_INVALID: u8 = 0x10;
    pub const REJECT_OBSOLETE: u8 = 0x11;
    pub const REJECT_DUPLICATE: u8 = 0x12;
    pub const REJECT_NONSTANDARD: u8 = 0x40;
    pub const REJECT_DUST: u8 = 0x41;
    pub const REJECT_INSUFFICIENTFEE: u8 = 0x42;
    pub const REJECT_CHECKPOINT: u8 = 0x43;

    fn decode<R: Read>(src: &mut LimitedSource<R>) -> Result<RejectMessage> {
        Ok(RejectMessage {
            message: src.read_var_string("reject message")?,
            ccode: src.read_u8("reject ccode")?,
            reason: src.read_var_string("reject reason")?,
            data: src.read_remaining("reject data")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_var_string(&self.message)?;
        w.write_u8(self.ccode)?;
        w.write_var_string(&self.reason)?;
        w.write_all(&self.data)?;
        Ok(())
    }
}

/// The `filterload` payload (BIP 37).
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct FilterLoadMessage {
    pub filter: BloomFilter,
    pub flags: u8,
}

impl FilterLoadMessage {
    pub const BLOOM_UPDATE_NONE: u8 = 0;
    pub const BLOOM_UPDATE_ALL: u8 = 1 << 0;
    pub const BLOOM_UPDATE_P2PUBKEY_ONLY: u8 = 1 << 1;

    fn decode<R: Read>(r: &mut R) -> Result<FilterLoadMessage> {
        Ok(FilterLoadMessage {
            filter: BloomFilter::decode(r)?,
            flags: r.read_u8("filterload flags")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        self.filter.encode(w)?;
        w.write_u8(self.flags)
    }
}

/// The `merkleblock` payload (BIP 37): a header plus the partial merkle
/// tree proving which transactions matched the peer's filter.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MerkleBlockMessage {
    pub header: BlockHeader,
    pub total_transactions: u32,
    pub hashes: Vec<[u8; 32]>,
    pub flags: Vec<u8>,
}

impl MerkleBlockMessage {
    fn decode<R: Read>(r: &mut R) -> Result<MerkleBlockMessage> {
        Ok(MerkleBlockMessage {
            header: BlockHeader::decode(r)?,
            total_transactions: r.read_u32_le("merkleblock total_transactions")?,
            hashes: decode_hashes(r, "merkleblock hashes")?,
            flags: r.read_var_bytes("merkleblock flags")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        self.header.encode(w)?;
        w.write_u32_le(self.total_transactions)?;
        encode_hashes(w, &self.hashes)?;
        w.write_var_bytes(&self.flags)
    }
}

/// The `alert` envelope: an opaque signed payload. [`AlertPayload`]
/// decodes the inner bytes.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct AlertMessage {
    pub payload: Vec<u8>,
    pub signature: Vec<u8>,
}

impl AlertMessage {
    fn decode<R: Read>(r: &mut R) -> Result<AlertMessage> {
        Ok(AlertMessage {
            payload: r.read_var_bytes("alert payload")?,
            signature: r.read_var_bytes("alert signature")?,
        })
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_var_bytes(&self.payload)?;
        w.write_var_bytes(&self.signature)
    }
}

/// The decoded alert body. Only version 1 has a defined layout; any other
/// version carries no further fields.
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct AlertPayload {
    pub version: u32,
    pub relay_until: i64,
    pub expiration: i64,
    pub id: u32,
    pub cancel: u32,
    pub set_cancel: Vec<u32>,
    pub min_ver: u32,
    pub max_ver: u32,
    pub set_sub_ver: Vec<u32>,
    pub priority: u32,
    pub comment: String,
    pub status_bar: String,
    pub reserved: String,
}

impl AlertPayload {
    pub fn decode<R: Read>(r: &mut R) -> Result<AlertPayload> {
        let mut payload = AlertPayload {
            version: r.read_u32_le("alert version")?,
            ..AlertPayload::default()
        };
        if payload.version == 1 {
            payload.relay_until = r.read_i64_le("alert relay_until")?;
            payload.expiration = r.read_i64_le("alert expiration")?;
            payload.id = r.read_u32_le("alert id")?;
            payload.cancel = r.read_u32_le("alert cancel")?;
            payload.set_cancel = decode_u32_vec(r, "alert set_cancel")?;
            payload.min_ver = r.read_u32_le("alert min_ver")?;
            payload.max_ver = r.read_u32_le("alert max_ver")?;
            payload.set_sub_ver = decode_u32_vec(r, "alert set_sub_ver")?;
            payload.priority = r.read_u32_le("alert priority")?;
            payload.comment = r.read_var_string("alert comment")?;
            payload.status_bar = r.read_var_string("alert status_bar")?;
            payload.reserved = r.read_var_string("alert reserved")?;
        }
        Ok(payload)
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_u32_le(self.version)?;
        if self.version == 1 {
            w.write_i64_le(self.relay_until)?;
            w.write_i64_le(self.expiration)?;
            w.write_u32_le(self.id)?;
            w.write_u32_le(self.cancel)?;
            encode_u32_vec(w, &self.set_cancel)?;
            w.write_u32_le(self.min_ver)?;
            w.write_u32_le(self.max_ver)?;
            encode_u32_vec(w, &self.set_sub_ver)?;
            w.write_u32_le(self.priority)?;
            w.write_var_string(&self.comment)?;
            w.write_var_string(&self.status_bar)?;
            w.write_var_string(&self.reserved)?;
        }
        Ok(())
    }
}

fn decode_hashes<R: Read>(r: &mut R, ctx: &'static str) -> Result<Vec<[u8; 32]>> {
    let count = r.read_varint_len(ctx)?;
    let mut hashes = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        hashes.push(r.read_array(ctx)?);
    }
    Ok(hashes)
}

fn encode_hashes<W: Write>(w: &mut W, hashes: &[[u8; 32]]) -> Result<()> {
    w.write_varint(hashes.len() as u64)?;
    for hash in hashes {
        w.write_all(hash)?;
    }
    Ok(())
}

fn decode_u32_vec<R: Read>(r: &mut R, ctx: &'static str) -> Result<Vec<u32>> {
    let count = r.read_varint_len(ctx)?;
    let mut values = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        values.push(r.read_u32_le(ctx)?);
    }
    Ok(values)
}

fn encode_u32_vec<W: Write>(w: &mut W, values: &[u32]) -> Result<()> {
    w.write_varint(values.len() as u64)?;
    for &v in values {
        w.write_u32_le(v)?;
    }
    Ok(())
}

/// The 21 protocol commands this crate understands. The 12-byte
/// NUL-padded spellings are a wire contract.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Version,
    Verack,
    Addr,
    Inv,
    GetData,
    NotFound,
    GetBlocks,
    GetHeaders,
    Tx,
    Block,
    Headers,
    GetAddr,
    MemPool,
    Ping,
    Pong,
    Reject,
    FilterLoad,
    FilterAdd,
    FilterClear,
    MerkleBlock,
    Alert,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Version => "version",
            Command::Verack => "verack",
            Command::Addr => "addr",
            Command::Inv => "inv",
            Command::GetData => "getdata",
            Command::NotFound => "notfound",
            Command::GetBlocks => "getblocks",
            Command::GetHeaders => "getheaders",
            Command::Tx => "tx",
            Command::Block => "block",
            Command::Headers => "headers",
            Command::GetAddr => "getaddr",
            Command::MemPool => "mempool",
            Command::Ping => "ping",
            Command::Pong => "pong",
            Command::Reject => "reject",
            Command::FilterLoad => "filterload",
            Command::FilterAdd => "filteradd",
            Command::FilterClear => "filterclear",
            Command::MerkleBlock => "merkleblock",
            Command::Alert => "alert",
        }
    }

    /// Parses a 12-byte command field. `None` for anything unknown or not
    /// properly NUL-padded; the caller treats those as unsupported.
    pub fn from_bytes(bytes: &[u8; 12]) -> Option<Command> {
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(12);
        if bytes[end..].iter().any(|&b| b != 0) {
            return None;
        }
        match &bytes[..end] {
            b"version" => Some(Command::Version),
            b"verack" => Some(Command::Verack),
            b"addr" => Some(Command::Addr),
            b"inv" => Some(Command::Inv),
            b"getdata" => Some(Command::GetData),
            b"notfound" => Some(Command::NotFound),
            b"getblocks" => Some(Command::GetBlocks),
            b"getheaders" => Some(Command::GetHeaders),
            b"tx" => Some(Command::Tx),
            b"block" => Some(Command::Block),
            b"headers" => Some(Command::Headers),
            b"getaddr" => Some(Command::GetAddr),
            b"mempool" => Some(Command::MemPool),
            b"ping" => Some(Command::Ping),
            b"pong" => Some(Command::Pong),
            b"reject" => Some(Command::Reject),
            b"filterload" => Some(Command::FilterLoad),
            b"filteradd" => Some(Command::FilterAdd),
            b"filterclear" => Some(Command::FilterClear),
            b"merkleblock" => Some(Command::MerkleBlock),
            b"alert" => Some(Command::Alert),
            _ => None,
        }
    }

    /// The command field as transmitted: ASCII, NUL-padded to 12 bytes.
    pub fn as_bytes(self) -> [u8; 12] {
        let mut padded = [0u8; 12];
        let name = self.name().as_bytes();
        padded[..name.len()].copy_from_slice(name);
        padded
    }
}

/// A decoded P2P message.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Message {
    Version(VersionMessage),
    Verack,
    Addr(Vec<AddrEntry>),
    Inv(Vec<InventoryVector>),
    GetData(Vec<InventoryVector>),
    NotFound(Vec<InventoryVector>),
    GetBlocks(GetBlocksMessage),
    GetHeaders(GetBlocksMessage),
    Tx(Tx),
    Block(BlockMessage),
    Headers(Vec<BlockHeader>),
    GetAddr,
    MemPool,
    Ping(u64),
    Pong(u64),
    Reject(RejectMessage),
    FilterLoad(FilterLoadMessage),
    FilterAdd(Vec<u8>),
    FilterClear,
    MerkleBlock(MerkleBlockMessage),
    Alert(AlertMessage),
    /// A command outside the table above; the raw payload is preserved so
    /// the full advertised length is always consumed.
    Unsupported { command: [u8; 12], data: Vec<u8> },
}

impl Message {
    /// Decodes one payload. The source must be limited to exactly the
    /// frame's advertised payload length, since `reject` and unsupported
    /// payloads extend to the end of the frame.
    pub fn decode<R: Read>(command: &[u8; 12], src: &mut LimitedSource<R>) -> Result<Message> {
        let Some(command) = Command::from_bytes(command) else {
            return Ok(Message::Unsupported {
                command: *command,
                data: src.read_remaining("unsupported payload")?,
            });
        };
        Ok(match command {
            Command::Version => Message::Version(VersionMessage::decode(src)?),
            Command::Verack => Message::Verack,
            Command::Addr => {
                let count = src.read_varint_len("addr count")?;
                let mut entries = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    entries.push(AddrEntry {
                        timestamp: src.read_u32_le("addr timestamp")?,
                        address: NetworkAddress::decode(src)?,
                    });
                }
                Message::Addr(entries)
            }
            Command::Inv => Message::Inv(decode_inventory(src)?),
            Command::GetData => Message::GetData(decode_inventory(src)?),
            Command::NotFound => Message::NotFound(decode_inventory(src)?),
            Command::GetBlocks => Message::GetBlocks(GetBlocksMessage::decode(src)?),
            Command::GetHeaders => Message::GetHeaders(GetBlocksMessage::decode(src)?),
            Command::Tx => Message::Tx(Tx::decode(src)?),
            Command::Block => Message::Block(BlockMessage::decode(src)?),
            Command::Headers => {
                let count = src.read_varint_len("headers count")?;
                let mut headers = Vec::with_capacity(count.min(2048));
                for _ in 0..count {
                    headers.push(BlockHeader::decode(src)?);
                    // Each header in a `headers` message drags along a
                    // transaction count that must be zero.
                    if src.read_varint("headers tx count")? != 0 {
                        return Err(Error::InvalidFormat(
                            "block header has non-zero transaction count in headers message",
                        ));
                    }
                }
                Message::Headers(headers)
            }
            Command::GetAddr => Message::GetAddr,
            Command::MemPool => Message::MemPool,
            Command::Ping => Message::Ping(src.read_u64_le("ping nonce")?),
            Command::Pong => Message::Pong(src.read_u64_le("pong nonce")?),
            Command::Reject => Message::Reject(RejectMessage::decode(src)?),
            Command::FilterLoad => Message::FilterLoad(FilterLoadMessage::decode(src)?),
            Command::FilterAdd => Message::FilterAdd(src.read_var_bytes("filteradd data")?),
            Command::FilterClear => Message::FilterClear,
            Command::MerkleBlock => Message::MerkleBlock(MerkleBlockMessage::decode(src)?),
            Command::Alert => Message::Alert(AlertMessage::decode(src)?),
        })
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        match self {
            Message::Version(msg) => msg.encode(w),
            Message::Verack | Message::GetAddr | Message::MemPool | Message::FilterClear => Ok(()),
            Message::Addr(entries) => {
                w.write_varint(entries.len() as u64)?;
                for entry in entries {
                    w.write_u32_le(entry.timestamp)?;
                    entry.address.encode(w)?;
                }
                Ok(())
            }
            Message::Inv(inv) | Message::GetData(inv) | Message::NotFound(inv) => {
                w.write_varint(inv.len() as u64)?;
                for item in inv {
                    item.encode(w)?;
                }
                Ok(())
            }
            Message::GetBlocks(msg) | Message::GetHeaders(msg) => msg.encode(w),
            Message::Tx(tx) => tx.encode(w),
            Message::Block(msg) => msg.encode(w),
            Message::Headers(headers) => {
                w.write_varint(headers.len() as u64)?;
                for header in headers {
                    header.encode(w)?;
                    w.write_varint(0)?;
                }
                Ok(())
            }
            Message::Ping(nonce) | Message::Pong(nonce) => w.write_u64_le(*nonce),
            Message::Reject(msg) => msg.encode(w),
            Message::FilterLoad(msg) => msg.encode(w),
            Message::FilterAdd(data) => w.write_var_bytes(data),
            Message::MerkleBlock(msg) => msg.encode(w),
            Message::Alert(msg) => msg.encode(w),
            Message::Unsupported { data, .. } => {
                w.write_all(data)?;
                Ok(())
            }
        }
    }

    /// The 12-byte command field for this message.
    pub fn command(&self) -> [u8; 12] {
        match self {
            Message::Version(_) => Command::Version.as_bytes(),
            Message::Verack => Command::Verack.as_bytes(),
            Message::Addr(_) => Command::Addr.as_bytes(),
            Message::Inv(_) => Command::Inv.as_bytes(),
            Message::GetData(_) => Command::GetData.as_bytes(),
            Message::NotFound(_) => Command::NotFound.as_bytes(),
            Message::GetBlocks(_) => Command::GetBlocks.as_bytes(),
            Message::GetHeaders(_) => Command::GetHeaders.as_bytes(),
            Message::Tx(_) => Command::Tx.as_bytes(),
            Message::Block(_) => Command::Block.as_bytes(),
            Message::Headers(_) => Command::Headers.as_bytes(),
            Message::GetAddr => Command::GetAddr.as_bytes(),
            Message::MemPool => Command::MemPool.as_bytes(),
            Message::Ping(_) => Command::Ping.as_bytes(),
            Message::Pong(_) => Command::Pong.as_bytes(),
            Message::Reject(_) => Command::Reject.as_bytes(),
            Message::FilterLoad(_) => Command::FilterLoad.as_bytes(),
            Message::FilterAdd(_) => Command::FilterAdd.as_bytes(),
            Message::FilterClear => Command::FilterClear.as_bytes(),
            Message::MerkleBlock(_) => Command::MerkleBlock.as_bytes(),
            Message::Alert(_) => Command::Alert.as_bytes(),
            Message::Unsupported { command, .. } => *command,
        }
    }
}

fn decode_inventory<R: Read>(r: &mut R) -> Result<Vec<InventoryVector>> {
    let count = r.read_varint_len("inventory count")?;
    let mut inv = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        inv.push(InventoryVector::decode(r)?);
    }
    Ok(inv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{OutPoint, TxIn, TxOut};
    use crate::script::Script;
    use std::io::Cursor;
    use std::net::Ipv4Addr;

    /// Encodes a message and decodes it back through a payload-bounded
    /// source, checking the payload is consumed exactly.
    fn roundtrip(msg: &Message) -> Message {
        let mut payload = Vec::new();
        msg.encode(&mut payload).unwrap();
        let command = msg.command();
        let mut src = LimitedSource::new(Cursor::new(&payload), payload.len() as u64);
        let decoded = Message::decode(&command, &mut src).unwrap();
        assert_eq!(src.remaining(), 0, "payload not fully consumed");
        decoded
    }

    fn sample_net_addr() -> NetworkAddress {
        NetworkAddress {
            services: Services::NODE_NETWORK,
            addr: Ipv4Addr::new(192, 168, 1, 1).to_ipv6_mapped(),
            port: 8333,
        }
    }

    fn sample_header() -> BlockHeader {
        BlockHeader {
            version: 2,
            parent_block_hash: [0x11; 32],
            merkle_root_hash: [0x22; 32],
            time: 1_355_317_200,
            bits: 0x1D00_FFFF,
            nonce: 42,
        }
    }

    fn sample_version() -> VersionMessage {
        VersionMessage {
            version: 70001,
            services: Services::NODE_NETWORK,
            timestamp: 1_355_000_000,
            addr_recv: sample_net_addr(),
            addr_from: NetworkAddress::UNSPECIFIED,
            nonce: 0x1234_5678_9ABC_DEF0,
            user_agent: "/Satoshi:0.8.1/".to_string(),
            start_height: 212_672,
            relay: true,
        }
    }

    fn sample_tx() -> Tx {
        let mut script = Script::new();
        script.push_int(1);
        Tx {
            version: 1,
            inputs: vec![TxIn {
                prevout: OutPoint {
                    tx_hash: [0xAB; 32],
                    txout_idx: 0,
                },
                script: script.clone(),
                seq_num: 0xFFFF_FFFF,
            }],
            outputs: vec![TxOut {
                amount: 1_0000_0000,
                script,
            }],
            lock_time: 0,
        }
    }

    #[test]
    fn every_variant_roundtrips() {
        let messages = vec![
            Message::Version(sample_version()),
            Message::Verack,
            Message::Addr(vec![
                AddrEntry {
                    timestamp: 1_355_000_100,
                    address: sample_net_addr(),
                },
                AddrEntry {
                    timestamp: 1_355_000_200,
                    address: NetworkAddress::UNSPECIFIED,
                },
            ]),
            Message::Inv(vec![InventoryVector {
                kind: InventoryType::Tx,
                hash: [0xCD; 32],
            }]),
            Message::GetData(vec![InventoryVector {
                kind: InventoryType::FilteredBlock,
                hash: [0x01; 32],
            }]),
            Message::NotFound(vec![]),
            Message::GetBlocks(GetBlocksMessage {
                version: 70001,
                locator_hashes: vec![[0x0A; 32], [0x0B; 32]],
                hash_stop: [0; 32],
            }),
            Message::GetHeaders(GetBlocksMessage {
                version: 70001,
                locator_hashes: vec![[0x0C; 32]],
                hash_stop: [0xFF; 32],
            }),
            Message::Tx(sample_tx()),
            Message::Block(BlockMessage {
                header: sample_header(),
                txns: vec![sample_tx(), sample_tx()],
            }),
            Message::Headers(vec![sample_header(), sample_header()]),
            Message::GetAddr,
            Message::MemPool,
            Message::Ping(7),
            Message::Pong(7),
            Message::Reject(RejectMessage {
                message: "tx".to_string(),
                ccode: RejectMessage::REJECT_INSUFFICIENTFEE,
                reason: "insufficient fee".to_string(),
                data: vec![0xEE; 32],
            }),
            Message::FilterLoad(FilterLoadMessage {
                filter: BloomFilter::new(16, 11, 0xCAFE),
                flags: FilterLoadMessage::BLOOM_UPDATE_ALL,
            }),
            Message::FilterAdd(vec![1, 2, 3]),
            Message::FilterClear,
            Message::MerkleBlock(MerkleBlockMessage {
                header: sample_header(),
                total_transactions: 7,
                hashes: vec![[0x0D; 32], [0x0E; 32]],
                flags: vec![0b1011_0001],
            }),
            Message::Alert(AlertMessage {
                payload: vec![1, 0, 0, 0],
                signature: vec![0x30, 0x44],
            }),
            Message::Unsupported {
                command: *b"sendheaders\0",
                data: vec![9, 9, 9],
            },
        ];
        for msg in messages {
            assert_eq!(roundtrip(&msg), msg);
        }
    }

    #[test]
    fn version_fields_are_gated_by_the_version_value() {
        // A pre-106 version carries only the first four fields.
        let ancient = VersionMessage {
            version: 105,
            nonce: 0,
            user_agent: String::new(),
            start_height: 0,
            relay: false,
            addr_from: NetworkAddress::UNSPECIFIED,
            ..sample_version()
        };
        let mut payload = Vec::new();
        ancient.encode(&mut payload).unwrap();
        assert_eq!(payload.len(), 4 + 8 + 8 + 26);
        assert_eq!(
            VersionMessage::decode(&mut Cursor::new(&payload)).unwrap(),
            ancient
        );

        // 106..209 adds the sender block but no start_height.
        let mid = VersionMessage {
            version: 200,
            start_height: 0,
            relay: false,
            addr_from: sample_net_addr(),
            ..sample_version()
        };
        let mut payload = Vec::new();
        mid.encode(&mut payload).unwrap();
        assert_eq!(
            payload.len(),
            4 + 8 + 8 + 26 + 26 + 8 + 1 + mid.user_agent.len()
        );
        assert_eq!(
            VersionMessage::decode(&mut Cursor::new(&payload)).unwrap(),
            mid
        );

        // 209..70001 adds start_height but no relay flag.
        let pre_relay = VersionMessage {
            version: 60002,
            relay: false,
            addr_from: sample_net_addr(),
            ..sample_version()
        };
        let mut payload = Vec::new();
        pre_relay.encode(&mut payload).unwrap();
        assert_eq!(
            VersionMessage::decode(&mut Cursor::new(&payload)).unwrap(),
            pre_relay
        );
    }

    #[test]
    fn headers_reject_inline_transactions() {
        let mut payload = Vec::new();
        payload.write_varint(1).unwrap();
        sample_header().encode(&mut payload).unwrap();
        payload.write_varint(1).unwrap(); // non-zero tx count
        let mut src = LimitedSource::new(Cursor::new(&payload), payload.len() as u64);
        assert!(matches!(
            Message::decode(&Command::Headers.as_bytes(), &mut src),
            Err(Error::InvalidFormat(
                "block header has non-zero transaction count in headers message"
            ))
        ));
    }

    #[test]
    fn inventory_rejects_unknown_type_values() {
        let mut payload = Vec::new();
        payload.write_varint(1).unwrap();
        payload.write_u32_le(4).unwrap();
        payload.extend_from_slice(&[0u8; 32]);
        let mut src = LimitedSource::new(Cursor::new(&payload), payload.len() as u64);
        assert!(matches!(
            Message::decode(&Command::Inv.as_bytes(), &mut src),
            Err(Error::InvalidFormat("unknown inventory type"))
        ));
    }

    #[test]
    fn reject_tail_extends_to_the_frame_boundary() {
        let msg = RejectMessage {
            message: "block".to_string(),
            ccode: RejectMessage::REJECT_INVALID,
            reason: "bad-blk".to_string(),
            data: vec![0xAA; 32],
        };
        let mut payload = Vec::new();
        msg.encode(&mut payload).unwrap();
        // Truncating the payload shrinks the decoded tail rather than
        // erroring; the tail is defined by the frame length.
        let short = &payload[..payload.len() - 10];
        let mut src = LimitedSource::new(Cursor::new(short), short.len() as u64);
        let Message::Reject(decoded) =
            Message::decode(&Command::Reject.as_bytes(), &mut src).unwrap()
        else {
            panic!("expected reject");
        };
        assert_eq!(decoded.data.len(), 22);
    }

    #[test]
    fn alert_payload_v1_roundtrips() {
        let payload = AlertPayload {
            version: 1,
            relay_until: 1_329_620_535,
            expiration: 1_329_792_435,
            id: 1010,
            cancel: 1009,
            set_cancel: vec![1001, 1002],
            min_ver: 10000,
            max_ver: 70001,
            set_sub_ver: vec![0],
            priority: 100,
            comment: String::new(),
            status_bar: "URGENT: upgrade required".to_string(),
            reserved: String::new(),
        };
        let mut buf = Vec::new();
        payload.encode(&mut buf).unwrap();
        assert_eq!(AlertPayload::decode(&mut Cursor::new(&buf)).unwrap(), payload);
    }

    #[test]
    fn alert_payload_with_unknown_version_has_no_body() {
        let payload = AlertPayload {
            version: 2,
            ..AlertPayload::default()
        };
        let mut buf = Vec::new();
        payload.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 4);
        assert_eq!(AlertPayload::decode(&mut Cursor::new(&buf)).unwrap(), payload);
    }

    #[test]
    fn unknown_commands_capture_the_whole_payload() {
        let command = *b"wtfmessage\0\0";
        let payload = [1u8, 2, 3];
        let mut src = LimitedSource::new(Cursor::new(&payload[..]), payload.len() as u64);
        let msg = Message::decode(&command, &mut src).unwrap();
        assert_eq!(src.remaining(), 0);
        assert_eq!(
            msg,
            Message::Unsupported {
                command,
                data: vec![1, 2, 3],
            }
        );
    }

    #[test]
    fn command_spellings_are_nul_padded() {
        assert_eq!(&Command::Version.as_bytes(), b"version\0\0\0\0\0");
        assert_eq!(&Command::FilterClear.as_bytes(), b"filterclear\0");
        assert_eq!(
            Command::from_bytes(b"merkleblock\0"),
            Some(Command::MerkleBlock)
        );
        // Garbage after the NUL terminator is not a valid command.
        assert_eq!(Command::from_bytes(b"verack\0zzzzz"), None);
        assert_eq!(Command::from_bytes(b"nonsense\0\0\0\0"), None);
    }

    #[test]
    fn net_addr_displays_mapped_ipv4_as_ipv4() {
        assert_eq!(sample_net_addr().to_string(), "192.168.1.1:8333");
        let v6 = NetworkAddress {
            services: Services::NONE,
            addr: "2001:db8::1".parse().unwrap(),
            port: 8333,
        };
        assert_eq!(v6.to_string(), "[2001:db8::1]:8333");
    }

    #[test]
    fn net_addr_port_is_big_endian_on_the_wire() {
        let mut buf = Vec::new();
        sample_net_addr().encode(&mut buf).unwrap();
        assert_eq!(buf.len(), 26);
        // 8333 = 0x208D, most significant byte first.
        assert_eq!(&buf[24..], &[0x20, 0x8D]);
    }

    #[test]
    fn services_debug_names_known_bits() {
        let services = Services::new(Services::NODE_NETWORK.bits() | Services::NODE_BLOOM.bits());
        assert_eq!(services.names(), vec!["NODE_NETWORK", "NODE_BLOOM"]);
        assert!(Services::NONE.is_empty());
        assert!(services.contains(Services::NODE_NETWORK));
        assert!(!services.contains(Services::NODE_GETUTXO));
    }
}

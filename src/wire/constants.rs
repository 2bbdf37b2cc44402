/// Networks this crate can speak to, identified by the 4-byte magic value
/// prefixing every P2P message.
///
/// The magic acts as a message boundary marker in the TCP stream; a frame
/// carrying the wrong magic means the peer is on a different network and
/// the connection is torn down.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Network {
    /// Mainnet, magic `0xD9B4BEF9` (`F9 BE B4 D9` on the wire).
    Main,
    /// Testnet3, magic `0x0709110B`.
    Testnet3,
}

impl Network {
    pub const fn magic(self) -> u32 {
        match self {
            Network::Main => 0xD9B4_BEF9,
            Network::Testnet3 => 0x0709_110B,
        }
    }

    pub fn from_magic(magic: u32) -> Option<Network> {
        match magic {
            0xD9B4_BEF9 => Some(Network::Main),
            0x0709_110B => Some(Network::Testnet3),
            _ => None,
        }
    }
}

/// Protocol version sent in the `version` message during handshake.
///
/// 70001 is the last pre-SegWit version, with BIP 37 filtering and the
/// `relay` flag. A list of notable versions:
/// https://developer.bitcoin.org/reference/p2p_networking.html#protocol-versions
pub const PROTOCOL_VERSION: u32 = 70001;

/// Protocol version that added `addr_from`, `nonce` and `user_agent` to
/// the `version` payload.
pub const VERSION_WITH_SENDER: u32 = 106;

/// Protocol version that added `start_height`.
pub const VERSION_WITH_HEIGHT: u32 = 209;

/// Protocol version that added the BIP 37 `relay` flag.
pub const VERSION_WITH_RELAY: u32 = 70001;

/// Bitcoin mainnet difficulty-1 target in compact `nBits` form, the
/// `nBits` value of the genesis block.
pub const MAINNET_MAX_TARGET_BITS: u32 = 0x1D00_FFFF;

/// The mainnet genesis block hash, in wire (little-endian) byte order.
/// Block explorers display it reversed:
/// `000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f`.
pub const GENESIS_BLOCK_HASH_MAINNET: [u8; 32] = [
    0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, 0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63, 0xf7, 0x4f,
    0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, 0x68, 0xd6, 0x19, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// DNS seed hostnames for mainnet peer discovery, from Bitcoin Core's
/// chain parameters:
/// https://github.com/bitcoin/bitcoin/blob/master/src/kernel/chainparams.cpp
pub const MAINNET_DNS_SEEDS: &[&str] = &[
    "seed.bitcoin.sipa.be:8333",
    "dnsseed.bluematt.me:8333",
    "seed.bitcoin.jonasschnelli.ch:8333",
    "seed.btc.petertodd.net:8333",
    "seed.bitcoin.sprovoost.nl:8333",
    "dnsseed.emzy.de:8333",
    "seed.bitcoin.wiz.biz:8333",
    "seed.mainnet.achownodes.xyz:8333",
];

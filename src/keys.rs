//! Private keys (WIF), SEC1 public keys and Base58Check addresses.
//!
//! Elliptic-curve arithmetic is delegated to the `secp256k1` crate; this
//! module owns the encodings: WIF's version byte and compression flag,
//! the SEC1 point prefixes, and the 21-byte address payload with its
//! script templates.

use std::fmt;
use std::io::{Cursor, Read, Write};
use std::str::FromStr;

use ripemd::Ripemd160;
use secp256k1::Secp256k1;
use sha2::{Digest, Sha256};

use crate::base58check;
use crate::error::{Error, Result};
use crate::script::{Opcode, Script};
use crate::serial::WireRead;

/// WIF version byte prefixing the serialized scalar.
const WIF_VERSION: u8 = 0x80;

/// Flag bits stored alongside a private key.
///
/// Only the compression bit is assigned; anything else in a decoded WIF
/// string is an error.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct KeyFlags(u8);

impl KeyFlags {
    pub const NONE: KeyFlags = KeyFlags(0);
    /// Derive the compressed SEC1 form of the public key.
    pub const COMPRESS: KeyFlags = KeyFlags(1 << 0);
    pub const MASK: KeyFlags = Self::COMPRESS;

    pub const fn new(bits: u8) -> KeyFlags {
        KeyFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: KeyFlags) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for KeyFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "KeyFlags(NONE)")
        } else if *self == Self::COMPRESS {
            write!(f, "KeyFlags(COMPRESS)")
        } else {
            write!(f, "KeyFlags({:#04x})", self.0)
        }
    }
}

/// A secp256k1 private key: the 256-bit scalar in big-endian form plus
/// its flags.
///
/// The codec does not range-check the scalar; derivation does, since the
/// curve collaborator rejects zero and values at or above the group
/// order.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PrivateKey {
    pub d: [u8; 32],
    pub flags: KeyFlags,
}

impl PrivateKey {
    /// Decodes Wallet Import Format: Base58Check over
    /// `0x80 || d || [flags]`, where the flags byte may be absent.
    pub fn decode_wif(s: &str) -> Result<PrivateKey> {
        let bytes = base58check::decode(s)?;
        let flags = match bytes.len() {
            33 => KeyFlags::NONE,
            34 => {
                let flags = KeyFlags::new(bytes[33]);
                if flags.bits() & !KeyFlags::MASK.bits() != 0 {
                    return Err(Error::InvalidFormat("unrecognized flags in private key"));
                }
                flags
            }
            _ => return Err(Error::InvalidFormat("expected WIF private key")),
        };
        if bytes[0] != WIF_VERSION {
            return Err(Error::InvalidFormat("expected WIF private key"));
        }
        let mut d = [0u8; 32];
        d.copy_from_slice(&bytes[1..33]);
        Ok(PrivateKey { d, flags })
    }

    /// Encodes to WIF. The flags byte is emitted only when non-zero.
    pub fn encode_wif(&self) -> String {
        let mut bytes = Vec::with_capacity(34);
        bytes.push(WIF_VERSION);
        bytes.extend_from_slice(&self.d);
        if !self.flags.is_empty() {
            bytes.push(self.flags.bits());
        }
        base58check::encode(&bytes)
    }

    /// Derives the public key by scalar multiplication of the generator.
    /// The key's compression flag carries over to the public key's
    /// encoded form.
    pub fn public_key(&self) -> Result<PublicKey> {
        let secp = Secp256k1::new();
        let sk = secp256k1::SecretKey::from_slice(&self.d)
            .map_err(|_| Error::InvalidFormat("private key scalar out of range"))?;
        let point = secp256k1::PublicKey::from_secret_key(&secp, &sk);
        let ser = point.serialize_uncompressed();
        let mut x = [0u8; 32];
        let mut y = [0u8; 32];
        x.copy_from_slice(&ser[1..33]);
        y.copy_from_slice(&ser[33..65]);
        Ok(PublicKey {
            x,
            y: PointY::Coord(y),
            compress: self.flags.contains(KeyFlags::COMPRESS),
        })
    }
}

impl FromStr for PrivateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<PrivateKey> {
        PrivateKey::decode_wif(s)
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode_wif())
    }
}

/// Y coordinate of a public key point: either the parity carried by a
/// compressed encoding, or the full coordinate.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum PointY {
    /// Only the parity bit from a 0x02/0x03 prefix is known.
    Parity(bool),
    Coord([u8; 32]),
}

/// A secp256k1 public key plus the flag controlling its encoded form.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PublicKey {
    x: [u8; 32],
    y: PointY,
    pub compress: bool,
}

impl PublicKey {
    pub fn x(&self) -> &[u8; 32] {
        &self.x
    }

    /// The full Y coordinate, if the point has been decompressed.
    pub fn y(&self) -> Option<&[u8; 32]> {
        match &self.y {
            PointY::Coord(y) => Some(y),
            PointY::Parity(_) => None,
        }
    }

    /// Reads a SEC1 encoding: `0x02`/`0x03` prefix plus X for compressed
    /// points (the prefix's low bit is the Y parity), `0x04` plus X and Y
    /// for uncompressed.
    pub fn decode<R: Read>(r: &mut R) -> Result<PublicKey> {
        let prefix = r.read_u8("public key prefix")?;
        match prefix {
            0x02 | 0x03 => Ok(PublicKey {
                x: r.read_array("public key x")?,
                y: PointY::Parity(prefix & 1 == 1),
                compress: true,
            }),
            0x04 => Ok(PublicKey {
                x: r.read_array("public key x")?,
                y: PointY::Coord(r.read_array("public key y")?),
                compress: false,
            }),
            _ => Err(Error::InvalidFormat("expected SEC1 public key prefix")),
        }
    }

    /// Writes the SEC1 encoding selected by the `compress` flag.
    /// Emitting the uncompressed form of a compressed point solves for Y
    /// on the fly.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        if self.compress {
            let odd = match self.y {
                PointY::Parity(odd) => odd,
                PointY::Coord(y) => y[31] & 1 == 1,
            };
            w.write_all(&[if odd { 0x03 } else { 0x02 }])?;
            w.write_all(&self.x)?;
        } else {
            let y = match self.y {
                PointY::Coord(y) => y,
                PointY::Parity(odd) => solve_y(&self.x, odd)?,
            };
            w.write_all(&[0x04])?;
            w.write_all(&self.x)?;
            w.write_all(&y)?;
        }
        Ok(())
    }

    /// Recovers the full Y coordinate of a compressed point, choosing the
    /// square root whose parity matches the prefix bit.
    pub fn decompress(&mut self) -> Result<()> {
        if let PointY::Parity(odd) = self.y {
            self.y = PointY::Coord(solve_y(&self.x, odd)?);
        }
        Ok(())
    }

    /// Parses the lowercase-hex SEC1 text form.
    pub fn from_hex(s: &str) -> Result<PublicKey> {
        let bytes = hex::decode(s).map_err(|_| Error::InvalidFormat("invalid hex in public key"))?;
        let mut cursor = Cursor::new(bytes.as_slice());
        let pubkey = PublicKey::decode(&mut cursor)?;
        if cursor.position() != bytes.len() as u64 {
            return Err(Error::InvalidFormat("trailing bytes after public key"));
        }
        Ok(pubkey)
    }

    pub fn to_hex(&self) -> Result<String> {
        let mut bytes = Vec::with_capacity(if self.compress { 33 } else { 65 });
        self.encode(&mut bytes)?;
        Ok(hex::encode(bytes))
    }
}

/// Solves `y² = x³ + 7` over the secp256k1 field via the curve
/// collaborator, picking the root with the requested parity.
fn solve_y(x: &[u8; 32], odd: bool) -> Result<[u8; 32]> {
    let mut sec = [0u8; 33];
    sec[0] = if odd { 0x03 } else { 0x02 };
    sec[1..].copy_from_slice(x);
    let point = secp256k1::PublicKey::from_slice(&sec)
        .map_err(|_| Error::InvalidFormat("public key x coordinate is not on the curve"))?;
    let ser = point.serialize_uncompressed();
    let mut y = [0u8; 32];
    y.copy_from_slice(&ser[33..65]);
    Ok(y)
}

fn hash160(data: &[u8]) -> [u8; 20] {
    Ripemd160::digest(Sha256::digest(data)).into()
}

/// Address version bytes. The discriminant doubles as the wire value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum AddressKind {
    PubkeyHash = 0,
    ScriptHash = 5,
    TestnetPubkeyHash = 111,
    TestnetScriptHash = 196,
}

impl AddressKind {
    pub fn from_u8(byte: u8) -> Option<AddressKind> {
        match byte {
            0 => Some(AddressKind::PubkeyHash),
            5 => Some(AddressKind::ScriptHash),
            111 => Some(AddressKind::TestnetPubkeyHash),
            196 => Some(AddressKind::TestnetScriptHash),
            _ => None,
        }
    }
}

/// A Bitcoin address: a version byte plus a 20-byte hash.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Address {
    pub kind: AddressKind,
    pub hash: [u8; 20],
}

impl Address {
    /// Decodes a Base58Check address string.
    pub fn decode(s: &str) -> Result<Address> {
        let bytes = base58check::decode(s)?;
        if bytes.len() != 21 {
            return Err(Error::InvalidFormat("address payload must be 21 bytes"));
        }
        let kind = AddressKind::from_u8(bytes[0])
            .ok_or(Error::InvalidFormat("unknown address version byte"))?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&bytes[1..]);
        Ok(Address { kind, hash })
    }

    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(21);
        bytes.push(self.kind as u8);
        bytes.extend_from_slice(&self.hash);
        base58check::encode(&bytes)
    }

    /// The canonical output script paying to this address.
    pub fn to_script(&self) -> Script {
        let mut script = Script::new();
        match self.kind {
            AddressKind::PubkeyHash | AddressKind::TestnetPubkeyHash => {
                script.push_opcode(Opcode::OP_DUP);
                script.push_opcode(Opcode::OP_HASH160);
                script
                    .push_data(&self.hash)
                    .expect("20-byte pushes never overflow");
                script.push_opcode(Opcode::OP_EQUALVERIFY);
                script.push_opcode(Opcode::OP_CHECKSIG);
            }
            AddressKind::ScriptHash | AddressKind::TestnetScriptHash => {
                script.push_opcode(Opcode::OP_HASH160);
                script
                    .push_data(&self.hash)
                    .expect("20-byte pushes never overflow");
                script.push_opcode(Opcode::OP_EQUAL);
            }
        }
        script
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Address> {
        Address::decode(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Hashes the SEC1 form of `pubkey` (honoring its compression flag) into
/// a pay-to-pubkey-hash address.
pub fn pubkey_to_address(pubkey: &PublicKey, testnet: bool) -> Result<Address> {
    let mut sec1 = Vec::with_capacity(65);
    pubkey.encode(&mut sec1)?;
    Ok(Address {
        kind: if testnet {
            AddressKind::TestnetPubkeyHash
        } else {
            AddressKind::PubkeyHash
        },
        hash: hash160(&sec1),
    })
}

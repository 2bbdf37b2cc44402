//! Bitcoin script binary format: opcodes, push-data encoding and the
//! sign-magnitude numeric codec.
//!
//! Scripts are parsed and built, never executed. A [`Script`] wraps the
//! raw byte vector; [`Script::instructions`] walks it one instruction at a
//! time, borrowing payload slices from the underlying bytes.
//!
//! Push lengths use an uncommon mix of byte orders: the single-byte forms
//! are plain, while the `OP_PUSHDATA2` and `OP_PUSHDATA4` length prefixes
//! are big-endian.

use std::fmt;
use std::io::{Read, Write};

use crate::error::{Error, Result};
use crate::serial::{WireRead, WireWrite};

/// A script opcode. Every byte value is an opcode; values `0x01..=0x4B`
/// are direct pushes of that many bytes and carry no mnemonic.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u8);

#[rustfmt::skip]
impl Opcode {
    // constants
    pub const OP_0: Opcode = Opcode(0x00);
    pub const OP_FALSE: Opcode = Self::OP_0;
    pub const OP_PUSHDATA1: Opcode = Opcode(0x4C);
    pub const OP_PUSHDATA2: Opcode = Opcode(0x4D);
    pub const OP_PUSHDATA4: Opcode = Opcode(0x4E);
    pub const OP_1NEGATE: Opcode = Opcode(0x4F);
    pub const OP_RESERVED: Opcode = Opcode(0x50);
    pub const OP_1: Opcode = Opcode(0x51);
    pub const OP_TRUE: Opcode = Self::OP_1;
    pub const OP_2: Opcode = Opcode(0x52);
    pub const OP_3: Opcode = Opcode(0x53);
    pub const OP_4: Opcode = Opcode(0x54);
    pub const OP_5: Opcode = Opcode(0x55);
    pub const OP_6: Opcode = Opcode(0x56);
    pub const OP_7: Opcode = Opcode(0x57);
    pub const OP_8: Opcode = Opcode(0x58);
    pub const OP_9: Opcode = Opcode(0x59);
    pub const OP_10: Opcode = Opcode(0x5A);
    pub const OP_11: Opcode = Opcode(0x5B);
    pub const OP_12: Opcode = Opcode(0x5C);
    pub const OP_13: Opcode = Opcode(0x5D);
    pub const OP_14: Opcode = Opcode(0x5E);
    pub const OP_15: Opcode = Opcode(0x5F);
    pub const OP_16: Opcode = Opcode(0x60);

    // flow control
    pub const OP_NOP: Opcode = Opcode(0x61);
    pub const OP_VER: Opcode = Opcode(0x62);
    pub const OP_IF: Opcode = Opcode(0x63);
    pub const OP_NOTIF: Opcode = Opcode(0x64);
    pub const OP_VERIF: Opcode = Opcode(0x65);
    pub const OP_VERNOTIF: Opcode = Opcode(0x66);
    pub const OP_ELSE: Opcode = Opcode(0x67);
    pub const OP_ENDIF: Opcode = Opcode(0x68);
    pub const OP_VERIFY: Opcode = Opcode(0x69);
    pub const OP_RETURN: Opcode = Opcode(0x6A);

    // stack
    pub const OP_TOALTSTACK: Opcode = Opcode(0x6B);
    pub const OP_FROMALTSTACK: Opcode = Opcode(0x6C);
    pub const OP_2DROP: Opcode = Opcode(0x6D);
    pub const OP_2DUP: Opcode = Opcode(0x6E);
    pub const OP_3DUP: Opcode = Opcode(0x6F);
    pub const OP_2OVER: Opcode = Opcode(0x70);
    pub const OP_2ROT: Opcode = Opcode(0x71);
    pub const OP_2SWAP: Opcode = Opcode(0x72);
    pub const OP_IFDUP: Opcode = Opcode(0x73);
    pub const OP_DEPTH: Opcode = Opcode(0x74);
    pub const OP_DROP: Opcode = Opcode(0x75);
    pub const OP_DUP: Opcode = Opcode(0x76);
    pub const OP_NIP: Opcode = Opcode(0x77);
    pub const OP_OVER: Opcode = Opcode(0x78);
    pub const OP_PICK: Opcode = Opcode(0x79);
    pub const OP_ROLL: Opcode = Opcode(0x7A);
    pub const OP_ROT: Opcode = Opcode(0x7B);
    pub const OP_SWAP: Opcode = Opcode(0x7C);
    pub const OP_TUCK: Opcode = Opcode(0x7D);

    // splice
    pub const OP_CAT: Opcode = Opcode(0x7E);
    pub const OP_SUBSTR: Opcode = Opcode(0x7F);
    pub const OP_LEFT: Opcode = Opcode(0x80);
    pub const OP_RIGHT: Opcode = Opcode(0x81);
    pub const OP_SIZE: Opcode = Opcode(0x82);

    // bitwise
    pub const OP_INVERT: Opcode = Opcode(0x83);
    pub const OP_AND: Opcode = Opcode(0x84);
    pub const OP_OR: Opcode = Opcode(0x85);
    pub const OP_XOR: Opcode = Opcode(0x86);
    pub const OP_EQUAL: Opcode = Opcode(0x87);
    pub const OP_EQUALVERIFY: Opcode = Opcode(0x88);
    pub const OP_RESERVED1: Opcode = Opcode(0x89);
    pub const OP_RESERVED2: Opcode = Opcode(0x8A);

    // arithmetic
    pub const OP_1ADD: Opcode = Opcode(0x8B);
    pub const OP_1SUB: Opcode = Opcode(0x8C);
    pub const OP_2MUL: Opcode = Opcode(0x8D);
    pub const OP_2DIV: Opcode = Opcode(0x8E);
    pub const OP_NEGATE: Opcode = Opcode(0x8F);
    pub const OP_ABS: Opcode = Opcode(0x90);
    pub const OP_NOT: Opcode = Opcode(0x91);
    pub const OP_0NOTEQUAL: Opcode = Opcode(0x92);
    pub const OP_ADD: Opcode = Opcode(0x93);
    pub const OP_SUB: Opcode = Opcode(0x94);
    pub const OP_MUL: Opcode = Opcode(0x95);
    pub const OP_DIV: Opcode = Opcode(0x96);
    pub const OP_MOD: Opcode = Opcode(0x97);
    pub const OP_LSHIFT: Opcode = Opcode(0x98);
    pub const OP_RSHIFT: Opcode = Opcode(0x99);
    pub const OP_BOOLAND: Opcode = Opcode(0x9A);
    pub const OP_BOOLOR: Opcode = Opcode(0x9B);
    pub const OP_NUMEQUAL: Opcode = Opcode(0x9C);
    pub const OP_NUMEQUALVERIFY: Opcode = Opcode(0x9D);
    pub const OP_NUMNOTEQUAL: Opcode = Opcode(0x9E);
    pub const OP_LESSTHAN: Opcode = Opcode(0x9F);
    pub const OP_GREATERTHAN: Opcode = Opcode(0xA0);
    pub const OP_LESSTHANOREQUAL: Opcode = Opcode(0xA1);
    pub const OP_GREATERTHANOREQUAL: Opcode = Opcode(0xA2);
    pub const OP_MIN: Opcode = Opcode(0xA3);
    pub const OP_MAX: Opcode = Opcode(0xA4);
    pub const OP_WITHIN: Opcode = Opcode(0xA5);

    // crypto
    pub const OP_RIPEMD160: Opcode = Opcode(0xA6);
    pub const OP_SHA1: Opcode = Opcode(0xA7);
    pub const OP_SHA256: Opcode = Opcode(0xA8);
    pub const OP_HASH160: Opcode = Opcode(0xA9);
    pub const OP_HASH256: Opcode = Opcode(0xAA);
    pub const OP_CODESEPARATOR: Opcode = Opcode(0xAB);
    pub const OP_CHECKSIG: Opcode = Opcode(0xAC);
    pub const OP_CHECKSIGVERIFY: Opcode = Opcode(0xAD);
    pub const OP_CHECKMULTISIG: Opcode = Opcode(0xAE);
    pub const OP_CHECKMULTISIGVERIFY: Opcode = Opcode(0xAF);

    // expansion
    pub const OP_NOP1: Opcode = Opcode(0xB0);
    pub const OP_NOP2: Opcode = Opcode(0xB1);
    pub const OP_NOP3: Opcode = Opcode(0xB2);
    pub const OP_NOP4: Opcode = Opcode(0xB3);
    pub const OP_NOP5: Opcode = Opcode(0xB4);
    pub const OP_NOP6: Opcode = Opcode(0xB5);
    pub const OP_NOP7: Opcode = Opcode(0xB6);
    pub const OP_NOP8: Opcode = Opcode(0xB7);
    pub const OP_NOP9: Opcode = Opcode(0xB8);
    pub const OP_NOP10: Opcode = Opcode(0xB9);

    // template matching
    pub const OP_SMALLDATA: Opcode = Opcode(0xF9);
    pub const OP_SMALLINTEGER: Opcode = Opcode(0xFA);
    pub const OP_PUBKEYS: Opcode = Opcode(0xFB);
    pub const OP_PUBKEYHASH: Opcode = Opcode(0xFD);
    pub const OP_PUBKEY: Opcode = Opcode(0xFE);
    pub const OP_INVALIDOPCODE: Opcode = Opcode(0xFF);
}

impl Opcode {
    pub const fn from_u8(byte: u8) -> Opcode {
        Opcode(byte)
    }

    pub const fn to_u8(self) -> u8 {
        self.0
    }

    /// The standard mnemonic, or `None` for direct pushes and unassigned
    /// values.
    pub fn mnemonic(self) -> Option<&'static str> {
        Some(match self {
            Self::OP_0 => "OP_0",
            Self::OP_PUSHDATA1 => "OP_PUSHDATA1",
            Self::OP_PUSHDATA2 => "OP_PUSHDATA2",
            Self::OP_PUSHDATA4 => "OP_PUSHDATA4",
            Self::OP_1NEGATE => "OP_1NEGATE",
            Self::OP_RESERVED => "OP_RESERVED",
            Self::OP_1 => "OP_1",
            Self::OP_2 => "OP_2",
            Self::OP_3 => "OP_3",
            Self::OP_4 => "OP_4",
            Self::OP_5 => "OP_5",
            Self::OP_6 => "OP_6",
            Self::OP_7 => "OP_7",
            Self::OP_8 => "OP_8",
            Self::OP_9 => "OP_9",
            Self::OP_10 => "OP_10",
            Self::OP_11 => "OP_11",
            Self::OP_12 => "OP_12",
            Self::OP_13 => "OP_13",
            Self::OP_14 => "OP_14",
            Self::OP_15 => "OP_15",
            Self::OP_16 => "OP_16",
            Self::OP_NOP => "OP_NOP",
            Self::OP_VER => "OP_VER",
            Self::OP_IF => "OP_IF",
            Self::OP_NOTIF => "OP_NOTIF",
            Self::OP_VERIF => "OP_VERIF",
            Self::OP_VERNOTIF => "OP_VERNOTIF",
            Self::OP_ELSE => "OP_ELSE",
            Self::OP_ENDIF => "OP_ENDIF",
            Self::OP_VERIFY => "OP_VERIFY",
            Self::OP_RETURN => "OP_RETURN",
            Self::OP_TOALTSTACK => "OP_TOALTSTACK",
            Self::OP_FROMALTSTACK => "OP_FROMALTSTACK",
            Self::OP_2DROP => "OP_2DROP",
            Self::OP_2DUP => "OP_2DUP",
            Self::OP_3DUP => "OP_3DUP",
            Self::OP_2OVER => "OP_2OVER",
            Self::OP_2ROT => "OP_2ROT",
            Self::OP_2SWAP => "OP_2SWAP",
            Self::OP_IFDUP => "OP_IFDUP",
            Self::OP_DEPTH => "OP_DEPTH",
            Self::OP_DROP => "OP_DROP",
            Self::OP_DUP => "OP_DUP",
            Self::OP_NIP => "OP_NIP",
            Self::OP_OVER => "OP_OVER",
            Self::OP_PICK => "OP_PICK",
            Self::OP_ROLL => "OP_ROLL",
            Self::OP_ROT => "OP_ROT",
            Self::OP_SWAP => "OP_SWAP",
            Self::OP_TUCK => "OP_TUCK",
            Self::OP_CAT => "OP_CAT",
            Self::OP_SUBSTR => "OP_SUBSTR",
            Self::OP_LEFT => "OP_LEFT",
            Self::OP_RIGHT => "OP_RIGHT",
            Self::OP_SIZE => "OP_SIZE",
            Self::OP_INVERT => "OP_INVERT",
            Self::OP_AND => "OP_AND",
            Self::OP_OR => "OP_OR",
            Self::OP_XOR => "OP_XOR",
            Self::OP_EQUAL => "OP_EQUAL",
            Self::OP_EQUALVERIFY => "OP_EQUALVERIFY",
            Self::OP_RESERVED1 => "OP_RESERVED1",
            Self::OP_RESERVED2 => "OP_RESERVED2",
            Self::OP_1ADD => "OP_1ADD",
            Self::OP_1SUB => "OP_1SUB",
            Self::OP_2MUL => "OP_2MUL",
            Self::OP_2DIV => "OP_2DIV",
            Self::OP_NEGATE => "OP_NEGATE",
            Self::OP_ABS => "OP_ABS",
            Self::OP_NOT => "OP_NOT",
            Self::OP_0NOTEQUAL => "OP_0NOTEQUAL",
            Self::OP_ADD => "OP_ADD",
            Self::OP_SUB => "OP_SUB",
            Self::OP_MUL => "OP_MUL",
            Self::OP_DIV => "OP_DIV",
            Self::OP_MOD => "OP_MOD",
            Self::OP_LSHIFT => "OP_LSHIFT",
            Self::OP_RSHIFT => "OP_RSHIFT",
            Self::OP_BOOLAND => "OP_BOOLAND",
            Self::OP_BOOLOR => "OP_BOOLOR",
            Self::OP_NUMEQUAL => "OP_NUMEQUAL",
            Self::OP_NUMEQUALVERIFY => "OP_NUMEQUALVERIFY",
            Self::OP_NUMNOTEQUAL => "OP_NUMNOTEQUAL",
            Self::OP_LESSTHAN => "OP_LESSTHAN",
            Self::OP_GREATERTHAN => "OP_GREATERTHAN",
            Self::OP_LESSTHANOREQUAL => "OP_LESSTHANOREQUAL",
            Self::OP_GREATERTHANOREQUAL => "OP_GREATERTHANOREQUAL",
            Self::OP_MIN => "OP_MIN",
            Self::OP_MAX => "OP_MAX",
            Self::OP_WITHIN => "OP_WITHIN",
            Self::OP_RIPEMD160 => "OP_RIPEMD160",
            Self::OP_SHA1 => "OP_SHA1",
            Self::OP_SHA256 => "OP_SHA256",
            Self::OP_HASH160 => "OP_HASH160",
            Self::OP_HASH256 => "OP_HASH256",
            Self::OP_CODESEPARATOR => "OP_CODESEPARATOR",
            Self::OP_CHECKSIG => "OP_CHECKSIG",
            Self::OP_CHECKSIGVERIFY => "OP_CHECKSIGVERIFY",
            Self::OP_CHECKMULTISIG => "OP_CHECKMULTISIG",
            Self::OP_CHECKMULTISIGVERIFY => "OP_CHECKMULTISIGVERIFY",
            Self::OP_NOP1 => "OP_NOP1",
            Self::OP_NOP2 => "OP_NOP2",
            Self::OP_NOP3 => "OP_NOP3",
            Self::OP_NOP4 => "OP_NOP4",
            Self::OP_NOP5 => "OP_NOP5",
            Self::OP_NOP6 => "OP_NOP6",
            Self::OP_NOP7 => "OP_NOP7",
            Self::OP_NOP8 => "OP_NOP8",
            Self::OP_NOP9 => "OP_NOP9",
            Self::OP_NOP10 => "OP_NOP10",
            Self::OP_SMALLDATA => "OP_SMALLDATA",
            Self::OP_SMALLINTEGER => "OP_SMALLINTEGER",
            Self::OP_PUBKEYS => "OP_PUBKEYS",
            Self::OP_PUBKEYHASH => "OP_PUBKEYHASH",
            Self::OP_PUBKEY => "OP_PUBKEY",
            Self::OP_INVALIDOPCODE => "OP_INVALIDOPCODE",
            _ => return None,
        })
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One parsed instruction, borrowing its payload from the script.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Instruction<'a> {
    opcode: Opcode,
    data: &'a [u8],
    raw: &'a [u8],
}

impl<'a> Instruction<'a> {
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Push payload; empty for non-push instructions.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Total encoded length of the instruction within the script,
    /// including the opcode and any length prefix.
    pub fn encoded_len(&self) -> usize {
        self.raw.len()
    }

    /// Decodes the instruction as a script number.
    ///
    /// Small-integer opcodes map directly; push payloads use the
    /// sign-magnitude convention, where a set top bit in the most
    /// significant byte marks the value negative and the magnitude is the
    /// little-endian bytes with that bit cleared. An empty payload is
    /// zero.
    pub fn int_value(&self) -> i64 {
        let op = self.opcode.to_u8();
        if (0x51..=0x60).contains(&op) {
            return i64::from(op - 0x50);
        }
        if self.opcode == Opcode::OP_1NEGATE {
            return -1;
        }
        if self.data.is_empty() {
            return 0;
        }
        let n = self.data.len().min(8);
        let mut mag = [0u8; 8];
        mag[..n].copy_from_slice(&self.data[..n]);
        let negative = mag[n - 1] & 0x80 != 0;
        mag[n - 1] &= 0x7F;
        let magnitude = u64::from_le_bytes(mag) as i64;
        if negative {
            -magnitude
        } else {
            magnitude
        }
    }
}

impl fmt::Debug for Instruction<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.data.is_empty() {
            write!(f, "{}", self.opcode)
        } else {
            write!(f, "{}(0x{})", self.opcode, hex::encode(self.data))
        }
    }
}

/// Lazy, single-pass instruction iterator. A push whose declared payload
/// overruns the script yields an error and ends the iteration.
pub struct Instructions<'a> {
    rest: &'a [u8],
}

impl<'a> Iterator for Instructions<'a> {
    type Item = Result<Instruction<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (&op, _) = self.rest.split_first()?;
        let (data_off, data_len): (usize, usize) = match op {
            len @ 0x00..=0x4B => (1, len as usize),
            0x4C => match self.rest.get(1) {
                Some(&len) => (2, len as usize),
                None => (2, 0),
            },
            0x4D => match self.rest.get(1..3) {
                Some(len) => (3, u16::from_be_bytes([len[0], len[1]]) as usize),
                None => (3, 0),
            },
            0x4E => match self.rest.get(1..5) {
                Some(len) => (
                    5,
                    u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize,
                ),
                None => (5, 0),
            },
            _ => (1, 0),
        };
        let total = match data_off.checked_add(data_len) {
            Some(total) if total <= self.rest.len() => total,
            _ => {
                self.rest = &[];
                return Some(Err(Error::UnexpectedEof("script push data")));
            }
        };
        let raw = &self.rest[..total];
        let inst = Instruction {
            opcode: Opcode(op),
            data: &raw[data_off..],
            raw,
        };
        self.rest = &self.rest[total..];
        Some(Ok(inst))
    }
}

/// A Bitcoin script: an ordered byte sequence of opcodes and push
/// payloads.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Script {
    bytes: Vec<u8>,
}

impl Script {
    pub fn new() -> Script {
        Script::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Script {
        Script { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    pub fn instructions(&self) -> Instructions<'_> {
        Instructions { rest: &self.bytes }
    }

    /// True iff every push instruction's declared payload is fully
    /// contained in the script.
    pub fn valid(&self) -> bool {
        self.instructions().all(|inst| inst.is_ok())
    }

    pub fn push_opcode(&mut self, opcode: Opcode) {
        self.bytes.push(opcode.to_u8());
    }

    /// Appends a push of `value` in the minimal script-number encoding:
    /// the dedicated small-integer opcodes where they exist, otherwise a
    /// sign-magnitude little-endian payload.
    pub fn push_int(&mut self, value: i64) {
        match value {
            0 => self.push_opcode(Opcode::OP_0),
            1..=16 => self.bytes.push(0x50 + value as u8),
            -1 => self.push_opcode(Opcode::OP_1NEGATE),
            _ => {
                let negative = value < 0;
                let magnitude = value.unsigned_abs();
                // Minimal length leaving the top bit of the last byte
                // free for the sign.
                let bits = 64 - magnitude.leading_zeros() as usize;
                let len = bits / 8 + 1;
                let mut buf = [0u8; 9];
                buf[..8].copy_from_slice(&magnitude.to_le_bytes());
                if negative {
                    buf[len - 1] |= 0x80;
                }
                self.bytes.push(len as u8);
                self.bytes.extend_from_slice(&buf[..len]);
            }
        }
    }

    /// Appends a push of raw bytes, choosing the shortest of the direct,
    /// `OP_PUSHDATA1`, `OP_PUSHDATA2` and `OP_PUSHDATA4` forms. The two
    /// wider length prefixes are big-endian.
    pub fn push_data(&mut self, data: &[u8]) -> Result<()> {
        let len = data.len();
        if len <= 0x4B {
            self.bytes.push(len as u8);
        } else if len <= 0xFF {
            self.push_opcode(Opcode::OP_PUSHDATA1);
            self.bytes.push(len as u8);
        } else if len <= 0xFFFF {
            self.push_opcode(Opcode::OP_PUSHDATA2);
            self.bytes.extend_from_slice(&(len as u16).to_be_bytes());
        } else if u32::try_from(len).is_ok() {
            self.push_opcode(Opcode::OP_PUSHDATA4);
            self.bytes.extend_from_slice(&(len as u32).to_be_bytes());
        } else {
            return Err(Error::LengthOverflow);
        }
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Appends an already-encoded instruction verbatim.
    pub fn push_copy(&mut self, inst: &Instruction<'_>) {
        self.bytes.extend_from_slice(inst.raw);
    }

    /// Reads a script in its wire form: a CompactSize length followed by
    /// the raw bytes.
    pub fn decode<R: Read>(r: &mut R) -> Result<Script> {
        Ok(Script::from_bytes(r.read_var_bytes("script")?))
    }

    pub fn encode<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_var_bytes(&self.bytes)
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.valid() {
            return f.write_str("(invalid)");
        }
        let mut first = true;
        for inst in self.instructions() {
            let Ok(inst) = inst else {
                return Ok(());
            };
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            let op = inst.opcode().to_u8();
            if op == 0x00 || op == 0x4F || (0x51..=0x60).contains(&op) {
                write!(f, "{}", inst.int_value())?;
            } else if !inst.data().is_empty() {
                write!(f, "0x{}", hex::encode(inst.data()))?;
            } else {
                write!(f, "{}", inst.opcode())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({self})")
    }
}

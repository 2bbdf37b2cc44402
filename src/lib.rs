//! A wire-faithful implementation of the pre-SegWit Bitcoin P2P protocol
//! (version 70001) and its supporting data model.
//!
//! The crate is organised leaves-first:
//! - [`serial`] — endian-explicit primitives, CompactSize varints, and
//!   the bounded/tapped stream adapters the frame reader is built from
//! - [`script`] — the script binary format: opcodes, push encodings and
//!   the sign-magnitude numeric codec (no execution)
//! - [`chain`] — transactions and block headers as wire records
//! - [`bloom`] — the BIP 37 filter and MurmurHash3
//! - [`base58check`] — the checksummed text encoding behind addresses
//!   and WIF keys
//! - [`keys`] — WIF private keys, SEC1 public keys and addresses
//! - [`wire`] — message payloads, framing and the connection loop
//!
//! Everything is blocking, synchronous std-io; the socket, digest and
//! elliptic-curve collaborators are external.

pub mod base58check;
pub mod bloom;
pub mod chain;
pub mod error;
pub mod keys;
pub mod script;
pub mod serial;
pub mod wire;

pub use error::{Error, Result};

//! The Bitcoin P2P wire protocol (pre-SegWit, version 70001).
//!
//! This module provides:
//! - the 24-byte message frame with magic, command, length and SHA256d
//!   checksum ([`node::MessageHeader`])
//! - strongly typed payloads for the 21 protocol commands
//!   ([`message::Message`])
//! - a per-connection [`node::Node`] that reads, verifies and dispatches
//!   frames to a [`node::Handler`]
//!
//! Protocol reference:
//! https://developer.bitcoin.org/reference/p2p_networking.html

pub mod constants;
pub mod message;
pub mod node;

pub use constants::Network;
pub use message::{Command, Message, VersionMessage};
pub use node::{Handler, MessageHeader, Node};

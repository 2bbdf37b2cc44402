use clap::{Parser, Subcommand};
use rand::Rng;
use std::error::Error;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use btc_p2p::wire::node::Handler;
use btc_p2p::wire::{Message, Network, Node};

#[derive(Parser)]
#[command(name = "handshake")]
struct Cli {
    /// Peer to connect to, as host:port.
    #[arg(long)]
    node: String,

    /// Speak testnet3 instead of mainnet.
    #[arg(long)]
    testnet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handshake, ping once, wait for the matching pong.
    Ping,
    /// Handshake, then keep printing what the peer sends.
    Watch,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let addr = cli
        .node
        .to_socket_addrs()?
        .next()
        .ok_or("could not resolve address")?;
    let network = if cli.testnet {
        Network::Testnet3
    } else {
        Network::Main
    };

    println!("Connecting to {addr}");
    let stream = TcpStream::connect_timeout(&addr, Duration::from_secs(30))?;
    stream.set_read_timeout(Some(Duration::from_secs(60)))?;
    stream.set_write_timeout(Some(Duration::from_secs(10)))?;
    let peer = stream.peer_addr()?;

    let mut node = Node::new(network, stream);
    handshake(&mut node, peer)?;
    println!("Handshake complete");

    match cli.command {
        Commands::Ping => ping(&mut node)?,
        Commands::Watch => node.run(&mut Watcher)?,
    }

    Ok(())
}

/// version/verack exchange: send our version, then wait until the peer
/// has sent both its version and its verack.
fn handshake(node: &mut Node<TcpStream>, peer: std::net::SocketAddr) -> Result<(), Box<dyn Error>> {
    let version = node.version_message(peer)?;
    node.send(&Message::Version(version))?;

    let mut got_version = false;
    let mut got_verack = false;
    while !(got_version && got_verack) {
        match node.recv()? {
            Message::Version(v) => {
                println!(
                    "Peer is \"{}\" (protocol {}, height {})",
                    v.user_agent, v.version, v.start_height
                );
                got_version = true;
                node.send(&Message::Verack)?;
            }
            Message::Verack => got_verack = true,
            _ => {}
        }
    }
    Ok(())
}

fn ping(node: &mut Node<TcpStream>) -> Result<(), Box<dyn Error>> {
    let nonce: u64 = rand::thread_rng().gen();
    println!("Sending ping");
    node.send(&Message::Ping(nonce))?;

    loop {
        match node.recv()? {
            Message::Pong(returned) if returned == nonce => {
                println!("Received matching pong");
                return Ok(());
            }
            Message::Ping(theirs) => node.send(&Message::Pong(theirs))?,
            _ => {}
        }
    }
}

/// Prints traffic and keeps the connection alive by answering pings.
struct Watcher;

impl Handler<TcpStream> for Watcher {
    fn on_ping(&mut self, node: &mut Node<TcpStream>, nonce: u64) -> btc_p2p::Result<()> {
        node.send(&Message::Pong(nonce))
    }

    fn on_inv(
        &mut self,
        _node: &mut Node<TcpStream>,
        inventory: Vec<btc_p2p::wire::message::InventoryVector>,
    ) -> btc_p2p::Result<()> {
        println!("inv: {} items", inventory.len());
        for item in inventory.iter().take(5) {
            println!("  {:?} {}", item.kind, hex::encode(item.hash));
        }
        Ok(())
    }

    fn on_addr(
        &mut self,
        _node: &mut Node<TcpStream>,
        entries: Vec<btc_p2p::wire::message::AddrEntry>,
    ) -> btc_p2p::Result<()> {
        println!("addr: {} peers", entries.len());
        Ok(())
    }

    fn on_unsupported(
        &mut self,
        _node: &mut Node<TcpStream>,
        command: [u8; 12],
        data: Vec<u8>,
    ) -> btc_p2p::Result<()> {
        let end = command.iter().position(|&b| b == 0).unwrap_or(12);
        println!(
            "unsupported command {:?} ({} bytes)",
            String::from_utf8_lossy(&command[..end]),
            data.len()
        );
        Ok(())
    }
}

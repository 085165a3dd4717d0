//! Minimal console simulator: answers status, name and fader queries and
//! remembers whatever is written to it.
//!
//! Run with:
//!   cargo run --example console-sim -- 127.0.0.1:20023
//!
//! In another terminal:
//!   cargo run --features cli -- --remote 127.0.0.1:20023 status
//!   cargo run --features cli -- --remote 127.0.0.1:20023 fade 0 0.75 --duration 2s

use std::collections::HashMap;
use std::net::UdpSocket;

use faderlink::osc::{decode, Message};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:20023".to_string());
    let socket = UdpSocket::bind(&addr)?;
    eprintln!("Console simulator listening on {}", socket.local_addr()?);

    let mut levels: HashMap<String, f32> = HashMap::new();
    let mut names: HashMap<String, String> = HashMap::new();
    let mut buf = [0u8; 512];

    loop {
        let (len, from) = socket.recv_from(&mut buf)?;
        let message = match decode(&buf[..len]) {
            Ok(message) => message,
            Err(e) => {
                eprintln!("Dropped malformed packet from {from}: {e}");
                continue;
            }
        };
        let path = message.address_str().unwrap_or_default().to_string();

        if path == "/info" {
            let reply = Message::new("/info")
                .with_string("V2.07")
                .with_string("console-sim")
                .with_string("X32")
                .with_string("4.06");
            socket.send_to(&reply.encode()?, from)?;
        } else if path.ends_with("/config/name") {
            match message.strings().into_iter().next() {
                Some(name) => {
                    eprintln!("{path} <- {name:?}");
                    names.insert(path, name);
                }
                None => {
                    let name = names.get(&path).cloned().unwrap_or_default();
                    let reply = Message::new(&path).with_string(name);
                    socket.send_to(&reply.encode()?, from)?;
                }
            }
        } else if path.ends_with("fader") {
            match message.first_float() {
                Some(level) => {
                    eprintln!("{path} <- {level:.3}");
                    levels.insert(path, level);
                }
                None => {
                    let level = levels.get(&path).copied().unwrap_or(0.0);
                    let reply = Message::new(&path).with_float(level);
                    socket.send_to(&reply.encode()?, from)?;
                }
            }
        } else {
            eprintln!("Ignoring {message}");
        }
    }
}

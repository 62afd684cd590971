//! CURVE-encrypted REQ/REP over TCP.
//!
//! Run with: `cargo run --example curve_pair`

use std::time::Duration;
use zbaton::prelude::*;

fn main() -> zbaton::Result<()> {
    zbaton::dev_tracing::init_tracing();

    if zmq::has("curve") != Some(true) {
        eprintln!("libzmq was built without CURVE support");
        return Ok(());
    }

    let ctx = Context::new();
    let reactor = PollReactor::spawn()?;
    let url = SocketUrl::parse("tcp://127.0.0.1:5591")?;

    let server_keys = KeyPair::generate();
    let server_public = *server_keys.public();
    println!("server key: {}", server_public);

    let config = SocketConfig::new().with_linger(Duration::ZERO);
    let mut server = ParkedSocket::new(
        &ctx,
        SocketType::Rep,
        Role::Server,
        config.clone().with_key_pair(server_keys),
        reactor.clone(),
    )?;
    server.bind(&url)?;

    let mut client = ParkedSocket::new(
        &ctx,
        SocketType::Req,
        Role::Client,
        config.with_key_pair(KeyPair::generate()),
        reactor,
    )?;
    client.set_peer_public_key(&url, server_public)?;
    client.connect(&url)?;

    client.send_one("ping")?;
    let request = server.recv_one(Some(Duration::from_secs(5)))?;
    println!("server got: {}", request.read_str()?);

    server.send_one("pong")?;
    let reply = client.recv_one(Some(Duration::from_secs(5)))?;
    println!("client got: {}", reply.read_str()?);
    Ok(())
}

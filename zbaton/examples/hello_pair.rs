//! Hello/world over a PAIR socket pair with each calling convention.
//!
//! Run with: `RUST_LOG=zbaton=debug cargo run --example hello_pair`

use std::thread;
use std::time::Duration;
use zbaton::prelude::*;

fn main() -> zbaton::Result<()> {
    zbaton::dev_tracing::init_tracing();

    let ctx = Context::new();
    let reactor = PollReactor::spawn()?;
    let config = SocketConfig::new().with_linger(Duration::ZERO);

    // Parked threads.
    let mut server = ParkedSocket::new(&ctx, SocketType::Pair, Role::Server, config.clone(), reactor.clone())?;
    server.bind("inproc://hello-parked")?;
    let mut client = ParkedSocket::new(&ctx, SocketType::Pair, Role::Client, config.clone(), reactor.clone())?;
    client.connect("inproc://hello-parked")?;

    let sender = thread::spawn(move || client.send_multiple(&["hello", "world"]));
    let [hello, world] = server.recv_array::<2>(Some(Duration::from_secs(1)))?;
    sender.join().expect("sender thread panicked")?;
    println!("parked:   {} {}", hello.read_str()?, world.read_str()?);

    // Futures on any executor.
    let mut server = AsyncSocket::new(&ctx, SocketType::Pair, Role::Server, config.clone(), reactor.clone())?;
    server.bind("inproc://hello-async")?;
    let mut client = AsyncSocket::new(&ctx, SocketType::Pair, Role::Client, config.clone(), reactor.clone())?;
    client.connect("inproc://hello-async")?;

    let frames = futures::executor::block_on(async {
        client.send_multiple(&["hello", "world"]).await?;
        server.recv_multiple(Some(Duration::from_secs(1))).await
    })?;
    println!("async:    {:?}", frames);

    // Direct calls, no reactor.
    let mut server = BlockingSocket::new(&ctx, SocketType::Pair, Role::Server, config.clone())?;
    server.bind("inproc://hello-blocking")?;
    let mut client = BlockingSocket::new(&ctx, SocketType::Pair, Role::Client, config)?;
    client.connect("inproc://hello-blocking")?;

    client.send_multiple(&["hello", "world"])?;
    let frames = server.recv_multiple(Some(Duration::from_secs(1)))?;
    println!("blocking: {:?}", frames);

    match server.recv_one(Some(Duration::from_millis(50))) {
        Err(Error::Timeout) => println!("nothing else pending"),
        other => println!("unexpected: {:?}", other),
    }
    Ok(())
}

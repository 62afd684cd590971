//! Round-trip latency per calling convention over inproc and tcp.
//!
//! Each iteration is one REQ send plus the REP echo and the reply.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::thread;
use std::time::Duration;
use zbaton::prelude::*;

const MESSAGE_SIZES: &[usize] = &[64, 1024];

fn config() -> SocketConfig {
    SocketConfig::new().with_linger(Duration::ZERO)
}

fn endpoints() -> Vec<(&'static str, String)> {
    let port = portpicker::pick_unused_port().expect("no free port");
    vec![
        ("inproc", "inproc://bench-roundtrip".to_string()),
        ("tcp", format!("tcp://127.0.0.1:{port}")),
    ]
}

/// Echo every message until the peer sends an empty frame.
fn spawn_echo(mut rep: ParkedSocket) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        let Ok(msg) = rep.recv_one(None) else { break };
        let stop = msg.is_empty();
        if rep.send_one(&msg).is_err() || stop {
            break;
        }
    })
}

fn blocking_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip/blocking");
    group.measurement_time(Duration::from_secs(5));

    for (transport, url) in endpoints() {
        let ctx = Context::new();
        let reactor = PollReactor::spawn().unwrap();
        let mut rep = ParkedSocket::new(&ctx, SocketType::Rep, Role::Server, config(), reactor).unwrap();
        rep.bind(url.as_str()).unwrap();
        let echo = spawn_echo(rep);

        let mut req = BlockingSocket::new(&ctx, SocketType::Req, Role::Client, config()).unwrap();
        req.connect(url.as_str()).unwrap();

        for &size in MESSAGE_SIZES {
            let payload = vec![1u8; size];
            group.bench_with_input(BenchmarkId::new(transport, size), &payload, |b, payload| {
                b.iter(|| {
                    req.send_one(black_box(payload)).unwrap();
                    black_box(req.recv_one(None).unwrap());
                });
            });
        }
        req.send_one("").unwrap();
        let _ = req.recv_one(Some(Duration::from_secs(1)));
        echo.join().unwrap();
    }
    group.finish();
}

fn parked_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip/parked");
    group.measurement_time(Duration::from_secs(5));

    for (transport, url) in endpoints() {
        let ctx = Context::new();
        let reactor = PollReactor::spawn().unwrap();
        let mut rep = ParkedSocket::new(&ctx, SocketType::Rep, Role::Server, config(), reactor.clone()).unwrap();
        rep.bind(url.as_str()).unwrap();
        let echo = spawn_echo(rep);

        let mut req = ParkedSocket::new(&ctx, SocketType::Req, Role::Client, config(), reactor).unwrap();
        req.connect(url.as_str()).unwrap();

        for &size in MESSAGE_SIZES {
            let payload = vec![1u8; size];
            group.bench_with_input(BenchmarkId::new(transport, size), &payload, |b, payload| {
                b.iter(|| {
                    req.send_one(black_box(payload)).unwrap();
                    black_box(req.recv_one(None).unwrap());
                });
            });
        }
        req.send_one("").unwrap();
        let _ = req.recv_one(Some(Duration::from_secs(1)));
        echo.join().unwrap();
    }
    group.finish();
}

fn async_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip/async");
    group.measurement_time(Duration::from_secs(5));

    for (transport, url) in endpoints() {
        let ctx = Context::new();
        let reactor = PollReactor::spawn().unwrap();
        let mut rep = ParkedSocket::new(&ctx, SocketType::Rep, Role::Server, config(), reactor.clone()).unwrap();
        rep.bind(url.as_str()).unwrap();
        let echo = spawn_echo(rep);

        let mut req = AsyncSocket::new(&ctx, SocketType::Req, Role::Client, config(), reactor).unwrap();
        req.connect(url.as_str()).unwrap();

        for &size in MESSAGE_SIZES {
            let payload = vec![1u8; size];
            group.bench_with_input(BenchmarkId::new(transport, size), &payload, |b, payload| {
                b.iter(|| {
                    futures::executor::block_on(async {
                        req.send_one(black_box(payload)).await.unwrap();
                        black_box(req.recv_one(None).await.unwrap());
                    });
                });
            });
        }
        futures::executor::block_on(async {
            req.send_one("").await.unwrap();
            let _ = req.recv_one(Some(Duration::from_secs(1))).await;
        });
        echo.join().unwrap();
    }
    group.finish();
}

criterion_group!(benches, blocking_round_trip, parked_round_trip, async_round_trip);
criterion_main!(benches);

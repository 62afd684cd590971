//! Integration tests for `Socket<Async>`, driven by `futures::executor`.

use futures::executor::block_on;
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::thread;
use std::time::{Duration, Instant};
use zbaton::prelude::*;

fn config() -> SocketConfig {
    SocketConfig::new().with_linger(Duration::ZERO)
}

fn reactor(name: &str) -> Arc<PollReactor> {
    zbaton::dev_tracing::init_tracing();
    PollReactor::with_name(name).unwrap()
}

#[test]
fn test_hello_world_scenario() {
    let ctx = Context::new();
    let reactor = reactor("async-hello");
    let port = portpicker::pick_unused_port().expect("no free port");
    let url = format!("tcp://127.0.0.1:{port}");

    let mut a = AsyncSocket::new(&ctx, SocketType::Pair, Role::Server, config(), reactor.clone()).unwrap();
    a.bind(&url).unwrap();
    let mut b = AsyncSocket::new(&ctx, SocketType::Pair, Role::Client, config(), reactor.clone()).unwrap();
    b.connect(&url).unwrap();

    block_on(async {
        b.send_multiple(&["hello", "world"]).await.unwrap();
        let [hello, world] = a.recv_array::<2>(Some(Duration::from_secs(5))).await.unwrap();
        assert_eq!(hello, "hello");
        assert_eq!(world, "world");

        let err = a.recv_one(Some(Duration::from_millis(50))).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
    });
}

#[test]
fn test_recv_before_send_completes() {
    let ctx = Context::new();
    let reactor = reactor("async-early-recv");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-early").unwrap();
    let mut client = BlockingSocket::new(&ctx, SocketType::Push, Role::Client, config()).unwrap();
    client.connect("inproc://async-early").unwrap();

    let sender = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        client.send_one("ping").unwrap();
        client
    });

    let msg = block_on(server.recv_one(None)).unwrap();
    assert_eq!(msg, "ping");
    drop(sender.join().unwrap());
}

#[test]
fn test_timeout_then_normal_receive() {
    let ctx = Context::new();
    let reactor = reactor("async-timeout");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-timeout").unwrap();
    let mut client = AsyncSocket::new(&ctx, SocketType::Push, Role::Client, config(), reactor.clone()).unwrap();
    client.connect("inproc://async-timeout").unwrap();

    block_on(async {
        let start = Instant::now();
        let err = server.recv_one(Some(Duration::from_millis(50))).await.unwrap_err();
        assert!(matches!(err, Error::Timeout));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500), "timed out late: {elapsed:?}");

        client.send_one("after").await.unwrap();
        let msg = server.recv_one(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(msg, "after");
    });
}

#[test]
fn test_two_sockets_in_one_task() {
    let ctx = Context::new();
    let reactor = reactor("async-join");

    let mut server = AsyncSocket::new(&ctx, SocketType::Rep, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-join").unwrap();
    let mut client = AsyncSocket::new(&ctx, SocketType::Req, Role::Client, config(), reactor.clone()).unwrap();
    client.connect("inproc://async-join").unwrap();

    let serve = async {
        for _ in 0..20 {
            let frames = server.recv_multiple(None).await.unwrap();
            server.send_multiple(&frames).await.unwrap();
        }
    };
    let call = async {
        for i in 0..20u8 {
            client.send_one([i]).await.unwrap();
            let reply = client.recv_one(Some(Duration::from_secs(5))).await.unwrap();
            assert_eq!(&reply[..], &[i]);
        }
    };
    block_on(futures::future::join(serve, call));
}

#[test]
fn test_drain_and_close() {
    let ctx = Context::new();
    let reactor = reactor("async-drain");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-drain").unwrap();
    let mut client = AsyncSocket::new(&ctx, SocketType::Push, Role::Client, config(), reactor.clone()).unwrap();
    client.connect("inproc://async-drain").unwrap();
    assert_eq!(reactor.registrations(), 2);

    block_on(async {
        for i in 0..4 {
            client.send_one(format!("{i}")).await.unwrap();
        }
        let frames = server.drain(Some(Duration::from_millis(100))).await.unwrap();
        assert_eq!(frames.len(), 4);
        assert!(server.drain(None).await.unwrap().is_empty());

        server.close();
        server.close();
        assert!(matches!(server.recv_one(None).await, Err(Error::Closed)));
    });
    assert_eq!(reactor.registrations(), 1);
}

#[test]
fn test_send_dropped_before_first_frame_keeps_socket_usable() {
    let ctx = Context::new();
    let reactor = reactor("async-cancel-send");

    // No peer yet: the first frame cannot be queued.
    let mut push = AsyncSocket::new(
        &ctx,
        SocketType::Push,
        Role::Server,
        config().with_send_hwm(1),
        reactor.clone(),
    )
    .unwrap();
    push.bind("inproc://async-cancel-send").unwrap();

    {
        let mut send = pin!(push.send_multiple(&["a", "b"]));
        let mut cx = TaskContext::from_waker(futures::task::noop_waker_ref());
        assert!(send.as_mut().poll(&mut cx).is_pending());
    }
    assert!(!push.handle().is_poisoned());

    let mut pull = BlockingSocket::new(&ctx, SocketType::Pull, Role::Client, config()).unwrap();
    pull.connect("inproc://async-cancel-send").unwrap();

    let sent = block_on(push.send_multiple(&["c", "d"])).unwrap();
    assert_eq!(sent, 2);
    let frames = pull.recv_multiple(Some(Duration::from_secs(1))).unwrap();
    assert_eq!(frames, vec![Message::from("c"), Message::from("d")]);
}

#[test]
fn test_completed_waits_leave_no_timers() {
    let ctx = Context::new();
    let reactor = reactor("async-timers");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-timers").unwrap();
    let mut client = AsyncSocket::new(&ctx, SocketType::Push, Role::Client, config(), reactor.clone()).unwrap();
    client.connect("inproc://async-timers").unwrap();

    for i in 0..200u32 {
        // The receive is polled first, so it suspends with its timer queued.
        let (msg, sent) = block_on(futures::future::join(
            server.recv_one(Some(Duration::from_secs(3600))),
            client.send_one(i.to_be_bytes()),
        ));
        assert_eq!(&msg.unwrap()[..], &i.to_be_bytes());
        sent.unwrap();
    }
    assert_eq!(reactor.pending_timers(), 0);
}

#[test]
fn test_dropped_timed_recv_cancels_timer() {
    let ctx = Context::new();
    let reactor = reactor("async-drop-timer");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-drop-timer").unwrap();

    {
        let mut recv = pin!(server.recv_one(Some(Duration::from_secs(3600))));
        let mut cx = TaskContext::from_waker(futures::task::noop_waker_ref());
        assert!(recv.as_mut().poll(&mut cx).is_pending());
        assert_eq!(reactor.pending_timers(), 1);
    }
    assert_eq!(reactor.pending_timers(), 0);
}

#[test]
fn test_dropped_recv_releases_slot() {
    let ctx = Context::new();
    let reactor = reactor("async-cancel");

    let mut server = AsyncSocket::new(&ctx, SocketType::Pull, Role::Server, config(), reactor.clone()).unwrap();
    server.bind("inproc://async-cancel").unwrap();
    let mut client = BlockingSocket::new(&ctx, SocketType::Push, Role::Client, config()).unwrap();
    client.connect("inproc://async-cancel").unwrap();

    {
        let mut recv = pin!(server.recv_one(None));
        let mut cx = TaskContext::from_waker(futures::task::noop_waker_ref());
        assert!(matches!(recv.as_mut().poll(&mut cx), Poll::Pending));
    }

    // A fresh receive must be able to take the slot again.
    client.send_one("again").unwrap();
    let msg = block_on(server.recv_one(Some(Duration::from_secs(1)))).unwrap();
    assert_eq!(msg, "again");
}

//! Integration tests for `Socket<Blocking>` over real libzmq sockets.

use std::time::{Duration, Instant};
use zbaton::prelude::*;
use zbaton::ProtocolError;

fn config() -> SocketConfig {
    SocketConfig::new().with_linger(Duration::ZERO)
}

fn pair(ctx: &Context, name: &str) -> (BlockingSocket, BlockingSocket) {
    let url = format!("inproc://{name}");
    let mut server = BlockingSocket::new(ctx, SocketType::Pair, Role::Server, config()).unwrap();
    server.bind(url.as_str()).unwrap();
    let mut client = BlockingSocket::new(ctx, SocketType::Pair, Role::Client, config()).unwrap();
    client.connect(url.as_str()).unwrap();
    (server, client)
}

#[test]
fn test_hello_world_over_tcp() {
    zbaton::dev_tracing::init_tracing();
    let ctx = Context::new();
    let port = portpicker::pick_unused_port().expect("no free port");
    let url = format!("tcp://127.0.0.1:{port}");

    let mut server = BlockingSocket::new(&ctx, SocketType::Rep, Role::Server, config()).unwrap();
    server.bind(&url).unwrap();
    let mut client = BlockingSocket::new(&ctx, SocketType::Req, Role::Client, config()).unwrap();
    client.connect(&url).unwrap();

    client.send_one("hello").unwrap();
    let request = server.recv_one(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(request, "hello");
    assert!(!server.has_more());

    server.send_one("world").unwrap();
    let reply = client.recv_one(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(reply, "world");
}

#[test]
fn test_fixed_count_receive() {
    let ctx = Context::new();
    let (mut server, mut client) = pair(&ctx, "blocking-fixed");

    client.send_multiple(&["a", "b", "c"]).unwrap();
    let [a, b, c] = server.recv_array::<3>(Some(Duration::from_secs(1))).unwrap();
    assert_eq!((a, b, c), (Message::from("a"), Message::from("b"), Message::from("c")));

    client.send_multiple(&["a", "b", "c"]).unwrap();
    let err = server.recv_array::<2>(Some(Duration::from_secs(1))).unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::UnexpectedContinuation { expected: 2 })
    ));
    // The rest of that message is still queued.
    assert_eq!(server.recv_one(Some(Duration::from_secs(1))).unwrap(), "c");

    client.send_multiple(&["a", "b"]).unwrap();
    let mut frames = vec![Message::new(); 3];
    let err = server
        .recv_into(&mut frames, Some(Duration::from_secs(1)))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::UnexpectedEnd { received: 2, expected: 3 })
    ));
    assert_eq!(frames[0], "a");
    assert_eq!(frames[1], "b");
}

#[test]
fn test_recv_timeout_then_recovers() {
    let ctx = Context::new();
    let (mut server, mut client) = pair(&ctx, "blocking-timeout");

    let start = Instant::now();
    let err = server.recv_one(Some(Duration::from_millis(50))).unwrap_err();
    assert!(matches!(err, Error::Timeout));
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500), "timed out late: {elapsed:?}");

    client.send_one("late").unwrap();
    assert_eq!(server.recv_one(Some(Duration::from_secs(1))).unwrap(), "late");
}

#[test]
fn test_drain_buffered_messages() {
    let ctx = Context::new();
    let (mut server, mut client) = pair(&ctx, "blocking-drain");

    for i in 0..5 {
        client.send_one(format!("msg-{i}")).unwrap();
    }
    let frames = server.drain(Some(Duration::from_millis(100))).unwrap();
    assert_eq!(frames.len(), 5);
    assert_eq!(frames[4], "msg-4");

    assert!(server.drain(None).unwrap().is_empty());
}

#[test]
fn test_send_multiple_sets_more_flags() {
    let ctx = Context::new();
    let (mut server, mut client) = pair(&ctx, "blocking-more");

    let frame = [7u8; 16];
    let sent = client.send_multiple(&[frame, frame, frame]).unwrap();
    assert_eq!(sent, 48);

    for expect_more in [true, true, false] {
        let msg = server.recv_one(Some(Duration::from_secs(1))).unwrap();
        assert_eq!(msg.len(), 16);
        assert_eq!(server.has_more(), expect_more);
    }
}

#[test]
fn test_recv_multiple_takes_whole_message() {
    let ctx = Context::new();
    let (mut server, mut client) = pair(&ctx, "blocking-whole");

    client.send_more("header").unwrap();
    client.send_multiple(&["body", "trailer"]).unwrap();
    client.send_one("next").unwrap();

    let frames = server.recv_multiple(Some(Duration::from_secs(1))).unwrap();
    assert_eq!(frames, vec![Message::from("header"), Message::from("body"), Message::from("trailer")]);
    let frames = server.recv_multiple(Some(Duration::from_secs(1))).unwrap();
    assert_eq!(frames, vec![Message::from("next")]);
}

#[test]
fn test_close_is_idempotent() {
    let ctx = Context::new();
    let (mut server, _client) = pair(&ctx, "blocking-close");

    server.close();
    server.close();
    assert!(!server.is_open());
    assert!(matches!(server.recv_one(None), Err(Error::Closed)));
    assert!(matches!(server.send_one("x"), Err(Error::Closed)));
    assert!(matches!(server.drain(None), Err(Error::Closed)));
    assert!(matches!(server.bind("inproc://again"), Err(Error::Closed)));
    assert!(matches!(
        server.get_option(SocketOption::Linger),
        Err(Error::Closed)
    ));
}

#[test]
fn test_nonblocking_without_deadline_times_out() {
    let ctx = Context::new();
    let mut socket = BlockingSocket::new(
        &ctx,
        SocketType::Pull,
        Role::Server,
        config().nonblocking(true),
    )
    .unwrap();
    socket.bind("inproc://blocking-nonblocking").unwrap();
    assert!(socket.is_nonblocking());
    assert!(matches!(socket.recv_one(None), Err(Error::Timeout)));
}

#[test]
fn test_role_checks() {
    let ctx = Context::new();
    let mut client = BlockingSocket::new(&ctx, SocketType::Dealer, Role::Client, config()).unwrap();
    assert!(matches!(
        client.bind("inproc://blocking-role"),
        Err(Error::Role { op: "bind", role: Role::Client })
    ));
    let mut server = BlockingSocket::new(&ctx, SocketType::Router, Role::Server, config()).unwrap();
    assert!(matches!(
        server.connect("inproc://blocking-role"),
        Err(Error::Role { op: "connect", role: Role::Server })
    ));
}

#[test]
fn test_options_and_keep_alive() {
    let ctx = Context::new();
    let socket = BlockingSocket::new(&ctx, SocketType::Dealer, Role::Client, config()).unwrap();

    socket.set_option(SocketOption::SendHwm, 42_i32).unwrap();
    assert_eq!(socket.get_option(SocketOption::SendHwm).unwrap().as_int(), Some(42));
    assert_eq!(socket.get_option(SocketOption::Linger).unwrap().as_int(), Some(0));

    socket
        .set_keep_alive(
            KeepAlive::enabled()
                .with_idle(Duration::from_secs(30))
                .with_count(3)
                .with_interval(Duration::from_secs(5)),
        )
        .unwrap();
    assert_eq!(socket.get_option(SocketOption::TcpKeepAlive).unwrap().as_int(), Some(1));
    assert_eq!(
        socket.get_option(SocketOption::TcpKeepAliveIdle).unwrap().as_int(),
        Some(30)
    );
}

#[test]
fn test_bad_endpoint_reports_url() {
    let ctx = Context::new();
    let mut server = BlockingSocket::new(&ctx, SocketType::Pull, Role::Server, config()).unwrap();
    let err = server.bind("tcp://not-a-host:xyz").unwrap_err();
    assert!(matches!(err, Error::Endpoint { ref url, .. } if url == "tcp://not-a-host:xyz"));
}

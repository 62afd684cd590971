//! Poll-based reactor thread.
//!
//! [`PollReactor`] runs one dedicated thread blocked in `zmq::poll` on:
//! - every registration with a non-empty interest
//! - the read end of a self-notification socket pair, written whenever the
//!   registry changes so the poll set is rebuilt
//! - the earliest timer deadline (as the poll timeout)
//!
//! Dispatch is one-shot: the bits that fired are cleared from the
//! registration before its callback runs. Callbacks and timer wakers run on
//! the reactor thread with the registry lock released, under the dispatch
//! lock that `deregister` waits on.

use hashbrown::HashMap;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::Waker;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;
use tracing::{debug, error, trace};
use zbaton_core::prelude::*;
use zbaton_core::Result;

use crate::engine::poll_timeout_ms;

struct Entry {
    fd: RawFd,
    interest: Readiness,
    callback: ReadyCallback,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<Token, Entry>,
    /// Pending timers in firing order
    timers: BTreeMap<(Instant, TimerId), Waker>,
    /// Deadline of each pending timer, for cancellation
    deadlines: HashMap<TimerId, Instant>,
    next_token: u64,
    next_timer: u64,
}

impl Registry {
    fn timer_id(&mut self) -> TimerId {
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        id
    }
}

struct Shared {
    registry: Mutex<Registry>,
    /// Held by the reactor thread while callbacks run
    dispatch: Mutex<()>,
    running: AtomicBool,
    notify_tx: UnixStream,
    notify_rx: UnixStream,
    thread_id: Mutex<Option<ThreadId>>,
}

impl Shared {
    /// Interrupt the poll so the thread picks up registry changes.
    fn notify(&self) {
        match (&self.notify_tx).write(&[1]) {
            Ok(_) => {}
            // A full pipe already guarantees a wakeup.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {}
            Err(e) => error!("[REACTOR] failed to signal poll thread: {}", e),
        }
    }

    fn drain_notifications(&self) {
        let mut buf = [0u8; 64];
        loop {
            match (&self.notify_rx).read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    }

    fn on_reactor_thread(&self) -> bool {
        *self.thread_id.lock() == Some(thread::current().id())
    }
}

/// Reactor backed by a dedicated `zmq::poll` thread.
pub struct PollReactor {
    shared: Arc<Shared>,
    name: String,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PollReactor {
    /// Start a reactor thread named `zbaton-reactor`.
    pub fn spawn() -> Result<Arc<Self>> {
        Self::with_name("zbaton-reactor")
    }

    /// Start a reactor thread with the given name.
    pub fn with_name(name: impl Into<String>) -> Result<Arc<Self>> {
        let name = name.into();
        let (notify_tx, notify_rx) = UnixStream::pair()?;
        notify_tx.set_nonblocking(true)?;
        notify_rx.set_nonblocking(true)?;

        let shared = Arc::new(Shared {
            registry: Mutex::new(Registry::default()),
            dispatch: Mutex::new(()),
            running: AtomicBool::new(true),
            notify_tx,
            notify_rx,
            thread_id: Mutex::new(None),
        });

        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(&thread_shared))?;
        *shared.thread_id.lock() = Some(handle.thread().id());

        debug!("[REACTOR] {} started", name);
        Ok(Arc::new(Self {
            shared,
            name,
            thread: Mutex::new(Some(handle)),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Number of live descriptor registrations.
    pub fn registrations(&self) -> usize {
        self.shared.registry.lock().entries.len()
    }

    /// Number of timers that have neither fired nor been cancelled.
    pub fn pending_timers(&self) -> usize {
        self.shared.registry.lock().timers.len()
    }

    /// Stop the thread. Idempotent; joins unless called from the reactor
    /// thread itself.
    pub fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        self.shared.notify();
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            if self.shared.on_reactor_thread() {
                debug!("[REACTOR] {} stopping from its own thread", self.name);
                return;
            }
            if handle.join().is_err() {
                error!("[REACTOR] {} thread panicked", self.name);
            }
        }
        // Nobody will fire the remaining timers.
        let timers = {
            let mut registry = self.shared.registry.lock();
            registry.deadlines.clear();
            std::mem::take(&mut registry.timers)
        };
        for waker in timers.into_values() {
            waker.wake();
        }
        debug!("[REACTOR] {} stopped", self.name);
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_running() {
            Ok(())
        } else {
            Err(ReactorError::Shutdown)
        }
    }
}

impl Reactor for PollReactor {
    fn register(&self, fd: RawFd, interest: Readiness, callback: ReadyCallback) -> Result<Token> {
        self.ensure_running()?;
        let token = {
            let mut registry = self.shared.registry.lock();
            let token = Token(registry.next_token);
            registry.next_token += 1;
            registry.entries.insert(
                token,
                Entry {
                    fd,
                    interest,
                    callback,
                },
            );
            token
        };
        trace!("[REACTOR] registered fd {} as {} ({})", fd, token, interest);
        self.shared.notify();
        Ok(token)
    }

    fn set_interest(&self, token: Token, interest: Readiness) -> Result<()> {
        self.ensure_running()?;
        {
            let mut registry = self.shared.registry.lock();
            let entry = registry
                .entries
                .get_mut(&token)
                .ok_or(ReactorError::UnknownToken(token))?;
            entry.interest = interest;
        }
        self.shared.notify();
        Ok(())
    }

    fn deregister(&self, token: Token) -> Result<()> {
        let removed = self.shared.registry.lock().entries.remove(&token);
        if removed.is_none() {
            return Err(ReactorError::UnknownToken(token));
        }
        self.shared.notify();
        // Wait out a dispatch that may still hold the callback.
        if !self.shared.on_reactor_thread() {
            drop(self.shared.dispatch.lock());
        }
        trace!("[REACTOR] deregistered {}", token);
        Ok(())
    }

    fn wake_at(&self, deadline: Instant, waker: Waker) -> TimerId {
        let mut registry = self.shared.registry.lock();
        let id = registry.timer_id();
        if !self.is_running() {
            drop(registry);
            waker.wake();
            return id;
        }
        registry.timers.insert((deadline, id), waker);
        registry.deadlines.insert(id, deadline);
        drop(registry);
        self.shared.notify();
        id
    }

    fn cancel_timer(&self, id: TimerId) {
        let mut registry = self.shared.registry.lock();
        if let Some(deadline) = registry.deadlines.remove(&id) {
            registry.timers.remove(&(deadline, id));
            trace!("[REACTOR] timer {} cancelled", id.0);
        }
    }
}

impl Drop for PollReactor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PollReactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollReactor")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("registrations", &self.registrations())
            .finish()
    }
}

fn to_poll_events(interest: Readiness) -> zmq::PollEvents {
    let mut events = zmq::PollEvents::empty();
    if interest.is_readable() {
        events |= zmq::POLLIN;
    }
    if interest.is_writable() {
        events |= zmq::POLLOUT;
    }
    events
}

/// What fired for a registration with interest `armed`. An error condition
/// wakes every armed interest so the waiter finds out by attempting.
fn fired(revents: zmq::PollEvents, armed: Readiness) -> Readiness {
    if revents.contains(zmq::POLLERR) {
        return armed;
    }
    let mut fired = Readiness::EMPTY;
    if revents.contains(zmq::POLLIN) {
        fired |= Readiness::READABLE;
    }
    if revents.contains(zmq::POLLOUT) {
        fired |= Readiness::WRITABLE;
    }
    fired.intersection(armed)
}

fn run(shared: &Shared) {
    let notify_fd = shared.notify_rx.as_raw_fd();
    let mut watched: Vec<(Token, RawFd, Readiness)> = Vec::new();

    while shared.running.load(Ordering::Acquire) {
        let next_deadline = {
            let registry = shared.registry.lock();
            watched.clear();
            watched.extend(
                registry
                    .entries
                    .iter()
                    .filter(|(_, entry)| !entry.interest.is_empty())
                    .map(|(token, entry)| (*token, entry.fd, entry.interest)),
            );
            registry.timers.keys().next().map(|(deadline, _)| *deadline)
        };

        let mut items = Vec::with_capacity(watched.len() + 1);
        items.push(zmq::PollItem::from_fd(notify_fd, zmq::POLLIN));
        for (_, fd, interest) in &watched {
            items.push(zmq::PollItem::from_fd(*fd, to_poll_events(*interest)));
        }

        match zmq::poll(&mut items, poll_timeout_ms(next_deadline)) {
            Ok(_) => {}
            Err(zmq::Error::EINTR) => continue,
            Err(e) => {
                error!("[REACTOR] poll failed: {}", e);
                // A descriptor closed under us; the owner deregisters next.
                thread::yield_now();
                continue;
            }
        }

        if items[0].is_readable() {
            shared.drain_notifications();
        }

        // Held from collection until the last callback returns.
        let dispatch = shared.dispatch.lock();
        let mut ready: SmallVec<[(ReadyCallback, Readiness); 8]> = SmallVec::new();
        let mut due: SmallVec<[Waker; 4]> = SmallVec::new();
        {
            let mut guard = shared.registry.lock();
            let registry = &mut *guard;
            for (item, (token, _, _)) in items[1..].iter().zip(&watched) {
                let revents = item.get_revents();
                if revents.is_empty() {
                    continue;
                }
                let Some(entry) = registry.entries.get_mut(token) else {
                    continue;
                };
                let hit = fired(revents, entry.interest);
                if hit.is_empty() {
                    continue;
                }
                entry.interest = entry.interest.difference(hit);
                ready.push((Arc::clone(&entry.callback), hit));
            }

            let now = Instant::now();
            while let Some(entry) = registry.timers.first_entry() {
                if entry.key().0 > now {
                    break;
                }
                let ((_, id), waker) = entry.remove_entry();
                registry.deadlines.remove(&id);
                due.push(waker);
            }
        }

        for (callback, hit) in ready {
            callback(hit);
        }
        drop(dispatch);
        for waker in due {
            waker.wake();
        }
    }
    trace!("[REACTOR] poll loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;
    use std::time::Duration;

    fn counting_callback() -> (ReadyCallback, mpsc::Receiver<Readiness>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let callback: ReadyCallback = Arc::new(move |fired| {
            let _ = tx.lock().send(fired);
        });
        (callback, rx)
    }

    #[test]
    fn test_one_shot_dispatch() {
        let reactor = PollReactor::with_name("test-one-shot").unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        let (callback, fired) = counting_callback();
        let token = reactor.register(a.as_raw_fd(), Readiness::READABLE, callback).unwrap();

        b.write_all(b"x").unwrap();
        let got = fired.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(got, Readiness::READABLE);

        // Still readable, but disarmed: no second callback.
        assert!(fired.recv_timeout(Duration::from_millis(100)).is_err());

        // Re-arming delivers the level again.
        reactor.set_interest(token, Readiness::READABLE).unwrap();
        assert_eq!(
            fired.recv_timeout(Duration::from_secs(2)).unwrap(),
            Readiness::READABLE
        );
        reactor.deregister(token).unwrap();
    }

    #[test]
    fn test_empty_interest_is_not_polled() {
        let reactor = PollReactor::spawn().unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        let (callback, fired) = counting_callback();
        let token = reactor.register(a.as_raw_fd(), Readiness::EMPTY, callback).unwrap();
        b.write_all(b"x").unwrap();
        assert!(fired.recv_timeout(Duration::from_millis(100)).is_err());
        assert_eq!(reactor.registrations(), 1);
        reactor.deregister(token).unwrap();
        assert_eq!(reactor.registrations(), 0);
    }

    #[test]
    fn test_unknown_token() {
        let reactor = PollReactor::spawn().unwrap();
        assert!(matches!(
            reactor.deregister(Token(99)),
            Err(ReactorError::UnknownToken(Token(99)))
        ));
        assert!(matches!(
            reactor.set_interest(Token(99), Readiness::ALL),
            Err(ReactorError::UnknownToken(_))
        ));
    }

    #[test]
    fn test_timers_fire_in_order() {
        struct Recorder {
            id: usize,
            log: Arc<Mutex<Vec<usize>>>,
            count: Arc<AtomicUsize>,
        }
        impl futures::task::ArcWake for Recorder {
            fn wake_by_ref(arc_self: &Arc<Self>) {
                arc_self.log.lock().push(arc_self.id);
                arc_self.count.fetch_add(1, Ordering::SeqCst);
            }
        }

        let reactor = PollReactor::spawn().unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));
        let count = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();
        for (id, ms) in [(2, 60), (1, 30)] {
            let recorder = Arc::new(Recorder {
                id,
                log: Arc::clone(&log),
                count: Arc::clone(&count),
            });
            reactor.wake_at(start + Duration::from_millis(ms), futures::task::waker(recorder));
        }

        while count.load(Ordering::SeqCst) < 2 {
            assert!(start.elapsed() < Duration::from_secs(2), "timers never fired");
            thread::sleep(Duration::from_millis(5));
        }
        assert!(start.elapsed() >= Duration::from_millis(60));
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    struct CountingWaker(AtomicUsize);

    impl futures::task::ArcWake for CountingWaker {
        fn wake_by_ref(arc_self: &Arc<Self>) {
            arc_self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_cancelled_timer_never_fires() {
        let reactor = PollReactor::spawn().unwrap();
        let wakes = Arc::new(CountingWaker(AtomicUsize::new(0)));
        let soon = Instant::now() + Duration::from_millis(20);

        let cancelled = reactor.wake_at(soon, futures::task::waker(Arc::clone(&wakes)));
        let kept = reactor.wake_at(soon, futures::task::waker(Arc::clone(&wakes)));
        assert_ne!(cancelled, kept);
        assert_eq!(reactor.pending_timers(), 2);

        reactor.cancel_timer(cancelled);
        reactor.cancel_timer(cancelled);
        assert_eq!(reactor.pending_timers(), 1);

        thread::sleep(Duration::from_millis(80));
        assert_eq!(wakes.0.load(Ordering::SeqCst), 1);
        assert_eq!(reactor.pending_timers(), 0);
        // Already fired: ignored.
        reactor.cancel_timer(kept);
    }

    #[test]
    fn test_many_cancelled_timers_do_not_accumulate() {
        let reactor = PollReactor::spawn().unwrap();
        let far = Instant::now() + Duration::from_secs(3600);
        for _ in 0..500 {
            let id = reactor.wake_at(far, futures::task::noop_waker());
            reactor.cancel_timer(id);
        }
        assert_eq!(reactor.pending_timers(), 0);
    }

    #[test]
    fn test_no_callback_after_deregister() {
        let reactor = PollReactor::spawn().unwrap();
        let (a, mut b) = UnixStream::pair().unwrap();
        // Stays readable: every re-arm dispatches again.
        b.write_all(b"x").unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let callback: ReadyCallback = Arc::new(move |_| {
            thread::sleep(Duration::from_micros(200));
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let token = reactor.register(a.as_raw_fd(), Readiness::READABLE, callback).unwrap();
        let start = Instant::now();
        let mut rounds = 0;
        while rounds < 200 || calls.load(Ordering::SeqCst) == 0 {
            assert!(start.elapsed() < Duration::from_secs(2), "never dispatched");
            reactor.set_interest(token, Readiness::READABLE).unwrap();
            thread::yield_now();
            rounds += 1;
        }
        reactor.deregister(token).unwrap();

        let after = calls.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(30));
        assert_eq!(calls.load(Ordering::SeqCst), after);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let reactor = PollReactor::spawn().unwrap();
        assert!(reactor.is_running());
        reactor.shutdown();
        reactor.shutdown();
        assert!(!reactor.is_running());
        let (callback, _fired) = counting_callback();
        assert!(matches!(
            reactor.register(0, Readiness::READABLE, callback),
            Err(ReactorError::Shutdown)
        ));
    }
}

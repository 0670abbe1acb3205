//! Timer/clock adapter.
//!
//! The dispatcher consumes only the [`Clock`] trait: `schedule` and
//! `cancel`, no error channel, cancellation of an already-fired or
//! cancelled handle is a no-op. [`ManualClock`] is the deterministic test
//! double used by the dispatcher's own test suite; [`CooperativeClock`] is
//! host glue for the demo binary, a background-thread-per-timer that only
//! ever posts a handle id across the channel. The callback itself always
//! runs on the foreground thread that calls [`CooperativeClock::poll`],
//! preserving the single-threaded cooperative scheduling model.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

pub trait Clock {
    fn schedule(&self, delay: Duration, cb: Box<dyn FnOnce()>) -> TimerHandle;
    fn cancel(&self, handle: TimerHandle);
}

/// Deterministic clock for tests: time only advances when told to, and
/// `advance` fires every callback whose deadline has passed, in deadline
/// order.
#[derive(Default)]
pub struct ManualClock {
    next_id: AtomicU64,
    now_ms: RefCell<u64>,
    pending: RefCell<Vec<(TimerHandle, u64, Option<Box<dyn FnOnce()>>)>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now_ms(&self) -> u64 {
        *self.now_ms.borrow()
    }

    /// Advances virtual time by `ms` and fires any callback whose deadline
    /// now lies at or before the new time, earliest deadline first.
    pub fn advance(&self, ms: u64) {
        let target = *self.now_ms.borrow() + ms;
        *self.now_ms.borrow_mut() = target;
        loop {
            let next_due = {
                let pending = self.pending.borrow();
                pending
                    .iter()
                    .filter(|(_, deadline, cb)| *deadline <= target && cb.is_some())
                    .map(|(h, d, _)| (*h, *d))
                    .min_by_key(|(_, d)| *d)
            };
            let Some((handle, _)) = next_due else {
                break;
            };
            let cb = {
                let mut pending = self.pending.borrow_mut();
                pending
                    .iter_mut()
                    .find(|(h, _, _)| *h == handle)
                    .and_then(|(_, _, cb)| cb.take())
            };
            self.pending.borrow_mut().retain(|(h, _, _)| *h != handle);
            if let Some(cb) = cb {
                cb();
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl Clock for ManualClock {
    fn schedule(&self, delay: Duration, cb: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TimerHandle(id);
        let deadline = *self.now_ms.borrow() + delay.as_millis() as u64;
        self.pending
            .borrow_mut()
            .push((handle, deadline, Some(cb)));
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending.borrow_mut().retain(|(h, _, _)| *h != handle);
    }
}

/// Host-glue clock for a real event loop: schedules a short-lived OS thread
/// per timer, which sleeps and then posts the handle id back over an
/// unbounded channel. The callback itself is kept on the foreground thread
/// and only invoked from [`poll`](Self::poll).
pub struct CooperativeClock {
    next_id: AtomicU64,
    pending: RefCell<HashMap<TimerHandle, Box<dyn FnOnce()>>>,
    tx: Sender<TimerHandle>,
    rx: Receiver<TimerHandle>,
}

impl Default for CooperativeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CooperativeClock {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        CooperativeClock {
            next_id: AtomicU64::new(0),
            pending: RefCell::new(HashMap::new()),
            tx,
            rx,
        }
    }

    /// Drains any timers that have fired since the last poll, invoking
    /// their callbacks on the calling thread. Returns how many fired.
    pub fn poll(&self) -> usize {
        let mut fired = 0;
        while let Ok(handle) = self.rx.try_recv() {
            if let Some(cb) = self.pending.borrow_mut().remove(&handle) {
                cb();
                fired += 1;
            }
        }
        fired
    }
}

impl Clock for CooperativeClock {
    fn schedule(&self, delay: Duration, cb: Box<dyn FnOnce()>) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = TimerHandle(id);
        self.pending.borrow_mut().insert(handle, cb);
        let tx = self.tx.clone();
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(handle);
        });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.pending.borrow_mut().remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn fires_in_deadline_order() {
        let clock = ManualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        clock.schedule(Duration::from_millis(50), Box::new(move || l1.borrow_mut().push("a")));
        let l2 = Rc::clone(&log);
        clock.schedule(Duration::from_millis(10), Box::new(move || l2.borrow_mut().push("b")));
        clock.advance(100);
        assert_eq!(*log.borrow(), vec!["b", "a"]);
    }

    #[test]
    fn cancel_is_noop_after_fire() {
        let clock = ManualClock::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let h = clock.schedule(Duration::from_millis(10), Box::new(move || f.set(true)));
        clock.advance(20);
        assert!(fired.get());
        clock.cancel(h); // no panic, no-op
    }

    #[test]
    fn cancel_before_fire_suppresses_callback() {
        let clock = ManualClock::new();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let h = clock.schedule(Duration::from_millis(10), Box::new(move || f.set(true)));
        clock.cancel(h);
        clock.advance(20);
        assert!(!fired.get());
    }
}

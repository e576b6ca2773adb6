use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Once};

use crate::logger;
use crate::platform::hotkey;
use crate::sleep;

/// State shared by every worker: the pause gate, shutdown flag and
/// cross-account counters. Passed around explicitly as an `Arc`.
pub struct ControlPlane {
    paused: Mutex<bool>,
    resumed: Condvar,
    shutdown: AtomicBool,
    workers: AtomicUsize,
    rounds_done: AtomicU64,
    units_replaced: AtomicU64,
    watchers: Once,
}

impl ControlPlane {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            paused: Mutex::new(false),
            resumed: Condvar::new(),
            shutdown: AtomicBool::new(false),
            workers: AtomicUsize::new(0),
            rounds_done: AtomicU64::new(0),
            units_replaced: AtomicU64::new(0),
            watchers: Once::new(),
        })
    }

    /// Claim the next worker index.
    pub fn register_worker(&self) -> usize {
        self.workers.fetch_add(1, Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::SeqCst)
    }

    pub fn toggle_pause(&self) {
        let mut paused = self.paused.lock().unwrap();
        *paused = !*paused;
        if *paused {
            logger::warn("paused; press the hotkey again to resume");
        } else {
            logger::warn("resumed");
            self.resumed.notify_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock().unwrap()
    }

    /// Block the calling worker at its next safe point until unpaused.
    pub fn wait_if_paused(&self) {
        let mut paused = self.paused.lock().unwrap();
        while *paused {
            paused = self.resumed.wait(paused).unwrap();
        }
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub fn note_round(&self) -> u64 {
        self.rounds_done.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn rounds_done(&self) -> u64 {
        self.rounds_done.load(Ordering::SeqCst)
    }

    pub fn note_unit_replaced(&self) {
        self.units_replaced.fetch_add(1, Ordering::SeqCst);
    }

    pub fn units_replaced(&self) -> u64 {
        self.units_replaced.load(Ordering::SeqCst)
    }

    /// Run `f` exactly once across all workers, whichever registers
    /// first. Used to start the process-wide watcher threads.
    pub fn start_watchers_once(&self, f: impl FnOnce()) {
        self.watchers.call_once(f);
    }
}

/// Hook the global pause hotkey up to the pause gate. The listener
/// only latches a flag; this thread turns each press into a toggle.
pub fn spawn_pause_watcher(control: Arc<ControlPlane>) {
    let pressed = Arc::new(AtomicBool::new(false));
    hotkey::start_hotkey_listener(Arc::clone(&pressed));
    std::thread::spawn(move || loop {
        if control.is_shutdown() {
            return;
        }
        if pressed.swap(false, Ordering::AcqRel) {
            control.toggle_pause();
        }
        sleep::sleep_ms(100);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn worker_indices_are_sequential() {
        let control = ControlPlane::new();
        assert_eq!(control.register_worker(), 0);
        assert_eq!(control.register_worker(), 1);
        assert_eq!(control.worker_count(), 2);
    }

    #[test]
    fn pause_gate_blocks_until_resumed() {
        let control = ControlPlane::new();
        control.toggle_pause();
        assert!(control.is_paused());

        let c = Arc::clone(&control);
        let handle = std::thread::spawn(move || {
            c.wait_if_paused();
        });
        std::thread::sleep(Duration::from_millis(100));
        assert!(!handle.is_finished());

        control.toggle_pause();
        std::thread::sleep(Duration::from_millis(100));
        assert!(handle.is_finished());
        handle.join().unwrap();
    }

    #[test]
    fn unpaused_gate_does_not_block() {
        let control = ControlPlane::new();
        control.wait_if_paused();
    }

    #[test]
    fn watchers_start_exactly_once() {
        let control = ControlPlane::new();
        let mut starts = 0;
        control.start_watchers_once(|| starts += 1);
        control.start_watchers_once(|| starts += 1);
        assert_eq!(starts, 1);
    }
}

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::capture::FrameSource;
use crate::catalog::{self, Catalog};
use crate::control::{self, ControlPlane};
use crate::error::MatchError;
use crate::input::{InputInjector, InputTarget};
use crate::logger;
use crate::perception::{OnTimeout, Perception, Trigger};
use crate::platform::Platform;
use crate::routines::{self, Role};
use crate::rules::{self, RuleError, Scratch, TickOutcome};
use crate::settings::{AccountConfig, RunPolicy};
use crate::sleep;
use crate::types::WindowId;

/// Anchor that must be on screen before a worker starts driving.
const HOME_TIMEOUT: Duration = Duration::from_secs(100);
/// How often the invite watcher looks for a co-op invite.
const INVITE_SCAN_SECS: u64 = 10;
/// Bounded sub-task grace, in ticks of `SUBTASK_TICK`.
const SUBTASK_GRACE_TICKS: u32 = 30;
const SUBTASK_TICK: Duration = Duration::from_secs(1);
/// Give up on a round after this many consecutive tick errors.
const MAX_TICK_ERRORS: u32 = 10;

pub const HOME_ANCHOR: &str = "home/anchor";

/// How a worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// All configured rounds ran.
    Completed,
    /// A hard wait timed out; the process should stop.
    GaveUp,
}

/// One account's scheduler: runs the account's rule list round after
/// round on its own thread, pausing at the shared gate.
pub struct Worker {
    prefix: String,
    config: AccountConfig,
    window_id: WindowId,
    platform: Arc<dyn Platform>,
    control: Arc<ControlPlane>,
    catalog: Catalog,
    policy: RunPolicy,
    perception: Perception,
    injector: InputInjector,
    scratch: Scratch,
}

impl Worker {
    pub fn new(
        platform: Arc<dyn Platform>,
        window_id: WindowId,
        config: AccountConfig,
        catalog: Catalog,
        control: Arc<ControlPlane>,
        policy: RunPolicy,
    ) -> Self {
        let index = control.register_worker();
        let prefix = format!("worker-{}", index);
        let color = match index % 3 {
            0 => logger::COLOR_BLUE,
            1 => logger::COLOR_GREEN,
            _ => logger::COLOR_YELLOW,
        };
        logger::register_prefix(&prefix, color);

        let frames = FrameSource::new(platform.open(window_id), config.nested_client, &prefix);
        let perception = Perception::new(frames, catalog.clone());
        let target = match &config.device_serial {
            Some(serial) => InputTarget::Device {
                serial: Some(serial.clone()),
            },
            None => InputTarget::Window,
        };
        let injector = InputInjector::new(platform.open(window_id), target);

        Self {
            prefix,
            config,
            window_id,
            platform,
            control,
            catalog,
            policy,
            perception,
            injector,
            scratch: Scratch::default(),
        }
    }

    pub fn spawn(self) -> JoinHandle<WorkerExit> {
        std::thread::spawn(move || self.run())
    }

    pub fn run(mut self) -> WorkerExit {
        // Process-wide watchers ride on whichever worker gets here first.
        {
            let control = Arc::clone(&self.control);
            let platform = Arc::clone(&self.platform);
            let catalog = self.catalog.clone();
            let window_id = self.window_id;
            let nested = self.config.nested_client;
            self.control.start_watchers_once(move || {
                control::spawn_pause_watcher(Arc::clone(&control));
                spawn_invite_watcher(platform, window_id, catalog, nested, control);
            });
        }

        self.injector.activate();

        let anchor = Trigger::correlation(HOME_ANCHOR, 0.9);
        let on_timeout = if self.policy.quit_on_timeout {
            OnTimeout::GiveUp
        } else {
            OnTimeout::Carry
        };
        match self.perception.wait_until_visible(&anchor, HOME_TIMEOUT, on_timeout) {
            Ok(Some(_)) => {}
            Ok(None) => logger::warn_p(&self.prefix, "home anchor not seen; driving blind"),
            Err(e) => {
                logger::error_p(&self.prefix, &format!("cannot reach home screen: {}", e));
                self.save_failure_screenshot();
                return WorkerExit::GaveUp;
            }
        }

        let role = Role {
            leader: self.config.leader,
            main_damage: self.config.main_damage,
        };
        let rules =
            routines::rules_for(self.config.routine, role, self.policy.replace_saturated_units);

        for round in 1..=self.config.rounds {
            self.control.wait_if_paused();
            if self.control.is_shutdown() {
                break;
            }
            logger::info_p(
                &self.prefix,
                &format!("round {}/{}", round, self.config.rounds),
            );
            match self.run_round(&rules) {
                Ok(()) => {
                    let total = self.control.note_round();
                    logger::info_p(
                        &self.prefix,
                        &format!("round done ({} across all accounts)", total),
                    );
                }
                Err(RuleError::Match(MatchError::Timeout(what))) => {
                    logger::error_p(&self.prefix, &format!("gave up waiting for \"{}\"", what));
                    self.save_failure_screenshot();
                    return WorkerExit::GaveUp;
                }
                Err(e) => {
                    logger::error_p(&self.prefix, &format!("round abandoned: {}", e));
                    sleep::sleep_jitter(3.0);
                }
            }
        }
        logger::info_p(&self.prefix, "all rounds finished");
        WorkerExit::Completed
    }

    fn run_round(&mut self, rules: &[rules::Rule]) -> Result<(), RuleError> {
        let mut consecutive_errors = 0u32;
        loop {
            self.control.wait_if_paused();
            if self.control.is_shutdown() {
                return Ok(());
            }
            let outcome = match rules::evaluate(
                rules,
                &self.prefix,
                &mut self.perception,
                &self.injector,
                &mut self.scratch,
            ) {
                Ok(outcome) => {
                    consecutive_errors = 0;
                    outcome
                }
                Err(e @ RuleError::Match(MatchError::Timeout(_))) => return Err(e),
                Err(e) => {
                    consecutive_errors += 1;
                    if consecutive_errors >= MAX_TICK_ERRORS {
                        return Err(e);
                    }
                    logger::warn_p(&self.prefix, &format!("tick failed: {}", e));
                    sleep::sleep_jitter(2.0);
                    continue;
                }
            };
            match outcome {
                TickOutcome::RoundDone => return Ok(()),
                TickOutcome::ReplaceUnits => self.replace_units(),
                TickOutcome::Fired(_) => sleep::sleep_jitter(0.5),
                TickOutcome::Idle => sleep::sleep_jitter(1.0),
            }
        }
    }

    /// Keep a picture of what the screen looked like when the worker
    /// gave up.
    fn save_failure_screenshot(&mut self) {
        let dir = self.policy.screenshots_dir.clone();
        match self.perception.frames_mut().save_screenshot(&dir) {
            Ok(path) => logger::info_p(
                &self.prefix,
                &format!("screen saved to {}", path.display()),
            ),
            Err(e) => logger::warn_p(&self.prefix, &format!("could not save screen: {}", e)),
        }
    }

    fn replace_units(&mut self) {
        let task = ReplaceUnitTask {
            platform: Arc::clone(&self.platform),
            window_id: self.window_id,
            catalog: self.catalog.clone(),
            nested_client: self.config.nested_client,
            prefix: format!("{}-swap", self.prefix),
        };
        let running = task.start();
        match running.await_bounded(SUBTASK_GRACE_TICKS, SUBTASK_TICK) {
            Some(true) => {
                self.control.note_unit_replaced();
                logger::info_p(&self.prefix, "unit replaced");
            }
            Some(false) => logger::warn_p(&self.prefix, "unit replacement made no swap"),
            None => logger::error_p(&self.prefix, "unit replacement task lost"),
        }
    }
}

/// Swaps a saturated unit for a fresh one through the roster screen.
/// Runs on its own thread with its own capture and input resources;
/// checks its cancellation token between UI steps.
pub struct ReplaceUnitTask {
    pub platform: Arc<dyn Platform>,
    pub window_id: WindowId,
    pub catalog: Catalog,
    pub nested_client: bool,
    pub prefix: String,
}

impl ReplaceUnitTask {
    pub fn start(self) -> RunningTask {
        spawn_subtask(move |cancel| self.run(cancel))
    }

    fn run(&self, cancel: &AtomicBool) -> bool {
        let frames = FrameSource::new(
            self.platform.open(self.window_id),
            self.nested_client,
            &self.prefix,
        );
        let mut perception = Perception::new(frames, self.catalog.clone());
        let injector = InputInjector::new(self.platform.open(self.window_id), InputTarget::Window);

        let steps: [(&'static str, Trigger); 4] = [
            ("roster tab", Trigger::correlation(catalog::UNIT_ROSTER_TAB, 0.9)),
            ("saturated unit", Trigger::correlation(catalog::UNIT_SATURATED, 0.9)),
            ("fresh candidate", Trigger::correlation(catalog::UNIT_CANDIDATE, 0.9)),
            ("confirm", Trigger::correlation(catalog::UNIT_CONFIRM, 0.9)),
        ];
        for (what, trigger) in steps {
            if cancel.load(Ordering::Acquire) {
                logger::warn_p(&self.prefix, "cancelled");
                return false;
            }
            let found = perception.wait_until_visible(
                &trigger,
                Duration::from_secs(5),
                OnTimeout::Carry,
            );
            match found {
                Ok(Some(p)) => {
                    if injector.tap_background(p).is_err() {
                        logger::warn_p(&self.prefix, &format!("tap on {} failed", what));
                        return false;
                    }
                    sleep::sleep_jitter(1.0);
                }
                Ok(None) => {
                    logger::warn_p(&self.prefix, &format!("{} never showed up", what));
                    return false;
                }
                Err(e) => {
                    logger::warn_p(&self.prefix, &format!("{} lookup failed: {}", what, e));
                    return false;
                }
            }
        }
        true
    }
}

/// A spawned sub-task and the tokens that bound it.
pub struct RunningTask {
    handle: JoinHandle<bool>,
    cancel: Arc<AtomicBool>,
    started: Arc<AtomicBool>,
    done: Arc<AtomicBool>,
}

/// Run `body` on its own thread. The body gets the cancellation token
/// and must poll it between steps.
pub fn spawn_subtask<F>(body: F) -> RunningTask
where
    F: FnOnce(&AtomicBool) -> bool + Send + 'static,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let started = Arc::new(AtomicBool::new(false));
    let done = Arc::new(AtomicBool::new(false));
    let handle = {
        let cancel = Arc::clone(&cancel);
        let started = Arc::clone(&started);
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            started.store(true, Ordering::Release);
            let result = body(&cancel);
            done.store(true, Ordering::Release);
            result
        })
    };
    RunningTask {
        handle,
        cancel,
        started,
        done,
    }
}

impl RunningTask {
    /// Wait up to `grace` ticks for the task to come alive, then up to
    /// `grace` more for it to finish. Whatever is still running after
    /// that is cancelled and joined, never left behind.
    pub fn await_bounded(self, grace: u32, tick: Duration) -> Option<bool> {
        let mut waited = 0;
        while !self.started.load(Ordering::Acquire) && waited < grace {
            std::thread::sleep(tick);
            waited += 1;
        }
        waited = 0;
        while !self.done.load(Ordering::Acquire) && waited < grace {
            std::thread::sleep(tick);
            waited += 1;
        }
        if !self.done.load(Ordering::Acquire) {
            self.cancel.store(true, Ordering::Release);
        }
        self.handle.join().ok()
    }
}

/// Every `INVITE_SCAN_SECS` seconds, decline any co-op invite sitting
/// over the watched window. Started once, by the first worker.
pub fn spawn_invite_watcher(
    platform: Arc<dyn Platform>,
    window_id: WindowId,
    catalog: Catalog,
    nested_client: bool,
    control: Arc<ControlPlane>,
) {
    std::thread::spawn(move || {
        logger::register_prefix("invites", logger::COLOR_GRAY);
        let frames = FrameSource::new(platform.open(window_id), nested_client, "invites");
        let mut perception = Perception::new(frames, catalog);
        let injector = InputInjector::new(platform.open(window_id), InputTarget::Window);
        let trigger = Trigger::correlation(catalog::COOP_INVITE, 0.9);
        loop {
            if control.is_shutdown() {
                return;
            }
            sleep::sleep_ms(INVITE_SCAN_SECS * 1000);
            control.wait_if_paused();
            match perception.locate(&trigger) {
                Ok(Some(_)) => {
                    logger::info_p("invites", "declining co-op invite");
                    if let Err(e) = injector.tap_background(catalog::COOP_DECLINE) {
                        logger::warn_p("invites", &format!("decline tap failed: {}", e));
                    }
                }
                Ok(None) => {}
                Err(e) => logger::warn_p("invites", &format!("invite scan failed: {}", e)),
            }
        }
    });
}

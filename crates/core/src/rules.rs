use std::collections::HashSet;
use std::time::Duration;

use thiserror::Error;

use crate::error::{InputError, MatchError};
use crate::input::InputInjector;
use crate::logger;
use crate::perception::{OnTimeout, Perception, Trigger};
use crate::sleep;
use crate::types::{Point, Rect};

/// Per-account scratch flags the rules can gate on and flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    InBattle,
    InRoom,
    BossFound,
}

/// Where a step's tap lands.
#[derive(Debug, Clone, Copy)]
pub enum Target {
    /// The point the rule's first visible trigger matched at.
    Hit,
    At(Point),
    Within(Rect),
}

#[derive(Debug, Clone, Copy)]
pub enum Condition {
    Visible(Trigger),
    Absent(Trigger),
    FlagSet(Flag),
    FlagClear(Flag),
}

#[derive(Debug, Clone, Copy)]
pub enum Step {
    Tap(Target),
    TapBackground(Target),
    /// Keep tapping `target` while `trigger` stays on screen.
    TapUntilGone {
        trigger: Trigger,
        target: Target,
        max_taps: u32,
    },
    Swipe {
        from: Point,
        to: Point,
        step_delay_ms: u64,
    },
    /// Swipe in the scratch direction; flips after repeated misses.
    SlideSearch {
        from: Point,
        to: Point,
    },
    WaitVisible {
        trigger: Trigger,
        timeout_secs: u64,
        on_timeout: OnTimeout,
    },
    Sleep {
        secs: f64,
    },
    Set(Flag),
    Clear(Flag),
    /// Hand control to the unit-replacement sub-task. Must be the
    /// last step of its rule.
    ReplaceUnits,
    /// This round is over. Must be the last step of its rule.
    FinishRound,
}

/// One detect-then-act rule. Rules are plain data; the interpreter
/// below is the only thing that runs them.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub when: Vec<Condition>,
    pub steps: Vec<Step>,
}

impl Rule {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            when: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn visible(mut self, trigger: Trigger) -> Self {
        self.when.push(Condition::Visible(trigger));
        self
    }

    pub fn absent(mut self, trigger: Trigger) -> Self {
        self.when.push(Condition::Absent(trigger));
        self
    }

    pub fn flag_set(mut self, flag: Flag) -> Self {
        self.when.push(Condition::FlagSet(flag));
        self
    }

    pub fn flag_clear(mut self, flag: Flag) -> Self {
        self.when.push(Condition::FlagClear(flag));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Mutable per-account state the interpreter threads through ticks.
#[derive(Debug, Default)]
pub struct Scratch {
    flags: HashSet<Flag>,
    /// Misses since the last hit; drives slide-search direction.
    pub misses: u32,
}

impl Scratch {
    pub fn set(&mut self, flag: Flag) {
        self.flags.insert(flag);
    }

    pub fn clear(&mut self, flag: Flag) {
        self.flags.remove(&flag);
    }

    pub fn is_set(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }
}

/// What one pass over the rule list produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Named rule matched and ran to completion.
    Fired(&'static str),
    /// No rule matched this tick.
    Idle,
    /// A rule asked for the unit-replacement sub-task.
    ReplaceUnits,
    /// A rule declared the round finished.
    RoundDone,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Match(#[from] MatchError),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Evaluate `rules` top to bottom against fresh captures; the first
/// rule whose conditions all hold runs its steps and ends the tick.
pub fn evaluate(
    rules: &[Rule],
    prefix: &str,
    perception: &mut Perception,
    injector: &InputInjector,
    scratch: &mut Scratch,
) -> Result<TickOutcome, RuleError> {
    'rules: for rule in rules {
        let mut hit: Option<Point> = None;
        for condition in &rule.when {
            match condition {
                Condition::Visible(trigger) => match perception.locate(trigger)? {
                    Some(p) => {
                        if hit.is_none() {
                            hit = Some(p);
                        }
                    }
                    None => continue 'rules,
                },
                Condition::Absent(trigger) => {
                    if perception.locate(trigger)?.is_some() {
                        continue 'rules;
                    }
                }
                Condition::FlagSet(flag) => {
                    if !scratch.is_set(*flag) {
                        continue 'rules;
                    }
                }
                Condition::FlagClear(flag) => {
                    if scratch.is_set(*flag) {
                        continue 'rules;
                    }
                }
            }
        }

        logger::info_p(prefix, &format!("rule \"{}\" fired", rule.name));
        for step in &rule.steps {
            match run_step(step, &mut hit, prefix, perception, injector, scratch)? {
                Some(outcome) => return Ok(outcome),
                None => {}
            }
        }
        return Ok(TickOutcome::Fired(rule.name));
    }
    Ok(TickOutcome::Idle)
}

fn resolve(target: Target, hit: Option<Point>) -> Point {
    match target {
        Target::Hit => hit.unwrap_or(Point::ZERO),
        Target::At(p) => p,
        Target::Within(rect) => {
            // randomized inside the injector for Within taps
            Point::new(rect.l, rect.t)
        }
    }
}

fn run_step(
    step: &Step,
    hit: &mut Option<Point>,
    prefix: &str,
    perception: &mut Perception,
    injector: &InputInjector,
    scratch: &mut Scratch,
) -> Result<Option<TickOutcome>, RuleError> {
    match step {
        Step::Tap(target) => match target {
            Target::Within(rect) => injector.tap_within(*rect)?,
            _ => injector.tap(resolve(*target, *hit))?,
        },
        Step::TapBackground(target) => match target {
            Target::Within(rect) => injector.tap_background_within(*rect)?,
            _ => injector.tap_background(resolve(*target, *hit))?,
        },
        Step::TapUntilGone {
            trigger,
            target,
            max_taps,
        } => {
            let mut taps = 0;
            while let Some(p) = perception.locate(trigger)? {
                let at = match target {
                    Target::Hit => p,
                    other => resolve(*other, *hit),
                };
                match target {
                    Target::Within(rect) => injector.tap_background_within(*rect)?,
                    _ => injector.tap_background(at)?,
                }
                taps += 1;
                if taps >= *max_taps {
                    logger::warn_p(prefix, "tap-until-gone hit its cap");
                    break;
                }
                sleep::sleep_jitter(1.0);
            }
        }
        Step::Swipe {
            from,
            to,
            step_delay_ms,
        } => {
            injector.drag_background(*from, *to, Duration::from_millis(*step_delay_ms))?;
        }
        Step::SlideSearch { from, to } => {
            if scratch.misses >= 6 {
                scratch.misses = 0;
            }
            let reversed = scratch.misses > 3;
            let (a, b) = if reversed { (*to, *from) } else { (*from, *to) };
            injector.drag_background(a, b, Duration::from_millis(100))?;
            scratch.misses += 1;
        }
        Step::WaitVisible {
            trigger,
            timeout_secs,
            on_timeout,
        } => {
            // a successful wait becomes the hit for later taps
            if let Some(p) = perception.wait_until_visible(
                trigger,
                Duration::from_secs(*timeout_secs),
                *on_timeout,
            )? {
                *hit = Some(p);
            }
        }
        Step::Sleep { secs } => sleep::sleep_jitter(*secs),
        Step::Set(flag) => scratch.set(*flag),
        Step::Clear(flag) => scratch.clear(*flag),
        Step::ReplaceUnits => return Ok(Some(TickOutcome::ReplaceUnits)),
        Step::FinishRound => return Ok(Some(TickOutcome::RoundDone)),
    }
    Ok(None)
}

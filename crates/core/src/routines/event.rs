use crate::catalog::*;
use crate::perception::Trigger;
use crate::rules::{Flag, Rule, Step, Target};

/// Event targeting. Event banners are redrawn per event with varying
/// scale and backdrop, so the banner is located by keypoint matching
/// instead of a straight correlation.
pub fn rules() -> Vec<Rule> {
    vec![
        Rule::new("collect-reward")
            .visible(Trigger::correlation(BATTLE_REWARD, 0.9))
            .step(Step::TapUntilGone {
                trigger: Trigger::correlation(BATTLE_REWARD, 0.9),
                target: Target::Within(REWARD_DISMISS),
                max_taps: 10,
            })
            .step(Step::Clear(Flag::InBattle))
            .step(Step::FinishRound),
        Rule::new("confirm-ready")
            .visible(Trigger::correlation(BATTLE_READY, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
        Rule::new("open-event-target")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::feature(EVENT_BANNER, 6))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Sleep { secs: 2.0 }),
    ]
}

use crate::catalog::*;
use crate::perception::Trigger;
use crate::rules::{Flag, Rule, Step, Target};

/// Matchmade challenge queue: challenge, ready up, collect, repeat.
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
        Rule::new("queue-challenge")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(SEAL_CHALLENGE, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Sleep { secs: 2.0 }),
    ]
}

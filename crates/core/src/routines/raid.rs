use crate::catalog::*;
use crate::perception::{OnTimeout, Trigger};
use crate::rules::{Flag, Rule, Step, Target};

/// Raid sweep: attack every target on the board, refresh when the
/// board is empty.
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
        Rule::new("accept-defeat")
            .visible(Trigger::correlation(BATTLE_FAILED, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Clear(Flag::InBattle))
            .step(Step::FinishRound),
        Rule::new("confirm-ready")
            .visible(Trigger::correlation(BATTLE_READY, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
        Rule::new("attack-target")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(RAID_ATTACK, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
        Rule::new("refresh-board")
            .flag_clear(Flag::InBattle)
            .absent(Trigger::correlation(RAID_ATTACK, 0.9))
            .visible(Trigger::correlation(RAID_REFRESH, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::WaitVisible {
                trigger: Trigger::correlation(RAID_REFRESH_CONFIRM, 0.9),
                timeout_secs: 5,
                on_timeout: OnTimeout::Carry,
            })
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Sleep { secs: 2.0 }),
    ]
}

use crate::catalog::*;
use crate::perception::{OnTimeout, Trigger};
use crate::rules::{Flag, Rule, Step, Target};

use super::Role;

/// Exploration map: fight through mobs, kill the boss, leave. The map
/// scrolls, so when nothing is visible the list falls through to a
/// slide search whose direction flips after repeated misses.
pub fn rules(role: Role, solo: bool) -> Vec<Rule> {
    let mut rules = Vec::new();

    rules.push(
        Rule::new("collect-reward")
            .visible(Trigger::correlation(BATTLE_REWARD, 0.9))
            .step(Step::TapUntilGone {
                trigger: Trigger::correlation(BATTLE_REWARD, 0.9),
                target: Target::Within(REWARD_DISMISS),
                max_taps: 10,
            })
            .step(Step::Clear(Flag::InBattle)),
    );

    // Boss rewarded: the run is done once we are back on the map.
    rules.push(
        Rule::new("leave-cleared-map")
            .flag_set(Flag::BossFound)
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(EXPLORE_EXIT, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::WaitVisible {
                trigger: Trigger::correlation(EXPLORE_EXIT_CONFIRM, 0.9),
                timeout_secs: 5,
                on_timeout: OnTimeout::Carry,
            })
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Clear(Flag::BossFound))
            .step(Step::FinishRound),
    );

    rules.push(
        Rule::new("confirm-ready")
            .visible(Trigger::correlation(BATTLE_READY, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
    );

    rules.push(
        Rule::new("engage-boss")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(EXPLORE_BOSS, 0.9))
            .step(Step::Set(Flag::BossFound))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
    );

    rules.push(
        Rule::new("engage-mob")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(EXPLORE_FIGHT, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
    );

    if !solo && role.leader {
        rules.push(
            Rule::new("invite-teammates")
                .flag_clear(Flag::InBattle)
                .visible(Trigger::correlation(ROOM_INVITE_SLOT, 0.9))
                .step(Step::TapBackground(Target::Hit))
                .step(Step::Sleep { secs: 1.0 }),
        );
    }
    if !solo && !role.leader {
        rules.push(
            Rule::new("accept-room-invite")
                .visible(Trigger::correlation(ROOM_ACCEPT, 0.9))
                .step(Step::TapBackground(Target::Hit)),
        );
    }

    rules.push(
        Rule::new("enter-exploration")
            .flag_clear(Flag::InBattle)
            .visible(Trigger::correlation(EXPLORE_ENTER, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Sleep { secs: 2.0 }),
    );

    // Nothing on screen: scroll the map.
    rules.push(
        Rule::new("slide-map")
            .flag_clear(Flag::InBattle)
            .absent(Trigger::correlation(EXPLORE_FIGHT, 0.9))
            .absent(Trigger::correlation(EXPLORE_BOSS, 0.9))
            .absent(Trigger::correlation(EXPLORE_ENTER, 0.9))
            .step(Step::SlideSearch {
                from: SLIDE_RIGHT_FROM,
                to: SLIDE_RIGHT_TO,
            })
            .step(Step::Sleep { secs: 1.0 }),
    );

    rules
}

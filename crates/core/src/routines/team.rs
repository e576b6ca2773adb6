use crate::catalog::*;
use crate::perception::Trigger;
use crate::rules::{Flag, Rule, Step, Target};

use super::Role;

/// Room-based team battles. The leader fills the room and starts each
/// battle; everyone else just accepts and fights.
pub fn rules(role: Role, replace_units: bool) -> Vec<Rule> {
    let mut rules = Vec::new();

    // End-of-battle states come first so a finished battle is never
    // mistaken for a room waiting to start.
    rules.push(
        Rule::new("collect-reward")
            .visible(Trigger::correlation(BATTLE_REWARD, 0.9))
            .step(Step::TapUntilGone {
                trigger: Trigger::correlation(BATTLE_REWARD, 0.9),
                target: Target::Within(REWARD_DISMISS),
                max_taps: 10,
            })
            .step(Step::Clear(Flag::InBattle))
            .step(Step::FinishRound),
    );
    rules.push(
        Rule::new("accept-defeat")
            .visible(Trigger::correlation(BATTLE_FAILED, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Clear(Flag::InBattle))
            .step(Step::FinishRound),
    );

    rules.push(
        Rule::new("confirm-ready")
            .visible(Trigger::correlation(BATTLE_READY, 0.9))
            .step(Step::TapBackground(Target::Hit))
            .step(Step::Set(Flag::InBattle)),
    );

    if role.main_damage && replace_units {
        rules.push(
            Rule::new("swap-saturated-unit")
                .flag_clear(Flag::InBattle)
                .visible(Trigger::correlation(UNIT_SATURATED, 0.9).in_region(PARTY_SLOTS))
                .step(Step::ReplaceUnits),
        );
    }

    if role.leader {
        rules.push(
            Rule::new("invite-teammates")
                .flag_clear(Flag::InBattle)
                .visible(Trigger::correlation(ROOM_INVITE_SLOT, 0.9))
                .step(Step::TapBackground(Target::Hit))
                .step(Step::Sleep { secs: 1.0 }),
        );
        rules.push(
            Rule::new("start-battle")
                .flag_clear(Flag::InBattle)
                .visible(Trigger::correlation(ROOM_START, 0.9))
                .absent(Trigger::correlation(ROOM_INVITE_SLOT, 0.9))
                .step(Step::TapBackground(Target::Within(ROOM_START_AREA)))
                .step(Step::Set(Flag::InBattle)),
        );
    } else {
        rules.push(
            Rule::new("accept-room-invite")
                .visible(Trigger::correlation(ROOM_ACCEPT, 0.9))
                .step(Step::TapBackground(Target::Hit))
                .step(Step::Set(Flag::InRoom)),
        );
    }

    rules
}

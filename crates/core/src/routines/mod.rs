mod event;
mod explore;
mod raid;
mod seal;
mod team;

use serde::{Deserialize, Serialize};

use crate::rules::Rule;

/// The six supported workflows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutineKind {
    /// Multi-player room battles farmed in a loop.
    TeamCoordination,
    /// Exploration run in a party.
    ExplorationParty,
    /// Exploration run alone.
    ExplorationSolo,
    /// Attack-and-refresh raid sweep.
    Raid,
    /// Matchmade challenge queue.
    Matchmaking,
    /// Tap whatever the current event banner points at.
    EventTarget,
}

/// What this account does inside the party.
#[derive(Debug, Clone, Copy, Default)]
pub struct Role {
    pub leader: bool,
    pub main_damage: bool,
}

/// Build the rule list for one account. Order is priority: the
/// interpreter fires the first satisfied rule each tick.
/// `replace_units` allows the saturated-unit swap; with it off no rule
/// ever yields a replacement.
pub fn rules_for(kind: RoutineKind, role: Role, replace_units: bool) -> Vec<Rule> {
    match kind {
        RoutineKind::TeamCoordination => team::rules(role, replace_units),
        RoutineKind::ExplorationParty => explore::rules(role, false),
        RoutineKind::ExplorationSolo => explore::rules(role, true),
        RoutineKind::Raid => raid::rules(),
        RoutineKind::Matchmaking => seal::rules(),
        RoutineKind::EventTarget => event::rules(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Step;

    fn finishes(rules: &[Rule]) -> bool {
        rules
            .iter()
            .any(|r| r.steps.iter().any(|s| matches!(s, Step::FinishRound)))
    }

    #[test]
    fn every_routine_can_finish_a_round() {
        let kinds = [
            RoutineKind::TeamCoordination,
            RoutineKind::ExplorationParty,
            RoutineKind::ExplorationSolo,
            RoutineKind::Raid,
            RoutineKind::Matchmaking,
            RoutineKind::EventTarget,
        ];
        for kind in kinds {
            for leader in [false, true] {
                let role = Role { leader, main_damage: leader };
                assert!(
                    finishes(&rules_for(kind, role, true)),
                    "{:?} (leader={}) has no finishing rule",
                    kind,
                    leader
                );
            }
        }
    }

    #[test]
    fn unit_replacement_can_be_switched_off() {
        let role = Role {
            leader: false,
            main_damage: true,
        };
        let swaps = |rules: &[Rule]| {
            rules
                .iter()
                .any(|r| r.steps.iter().any(|s| matches!(s, Step::ReplaceUnits)))
        };
        assert!(swaps(&rules_for(RoutineKind::TeamCoordination, role, true)));
        assert!(!swaps(&rules_for(RoutineKind::TeamCoordination, role, false)));
    }

    #[test]
    fn terminal_steps_are_last_in_their_rule() {
        for kind in [
            RoutineKind::TeamCoordination,
            RoutineKind::ExplorationParty,
            RoutineKind::ExplorationSolo,
            RoutineKind::Raid,
            RoutineKind::Matchmaking,
            RoutineKind::EventTarget,
        ] {
            for rule in rules_for(kind, Role { leader: true, main_damage: true }, true) {
                for (i, step) in rule.steps.iter().enumerate() {
                    if matches!(step, Step::FinishRound | Step::ReplaceUnits) {
                        assert_eq!(i, rule.steps.len() - 1, "rule {}", rule.name);
                    }
                }
            }
        }
    }
}

use std::path::{Path, PathBuf};

use crate::types::{Point, Rect};

/// Resolves reference-image names to files under one root directory.
/// Names may carry subdirectories, e.g. `battle/ready`.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{}.png", name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

// Reference names shared by the routines.
pub const BATTLE_READY: &str = "battle/ready";
pub const BATTLE_FINISHED: &str = "battle/finished";
pub const BATTLE_REWARD: &str = "battle/reward";
pub const BATTLE_FAILED: &str = "battle/failed";
pub const ROOM_START: &str = "room/start";
pub const ROOM_INVITE_SLOT: &str = "room/invite_slot";
pub const ROOM_ACCEPT: &str = "room/accept";
pub const COOP_INVITE: &str = "room/coop_invite";
pub const EXPLORE_ENTER: &str = "explore/enter";
pub const EXPLORE_BOSS: &str = "explore/boss";
pub const EXPLORE_FIGHT: &str = "explore/fight";
pub const EXPLORE_EXIT: &str = "explore/exit";
pub const EXPLORE_EXIT_CONFIRM: &str = "explore/exit_confirm";
pub const RAID_ATTACK: &str = "raid/attack";
pub const RAID_REFRESH: &str = "raid/refresh";
pub const RAID_REFRESH_CONFIRM: &str = "raid/refresh_confirm";
pub const SEAL_CHALLENGE: &str = "seal/challenge";
pub const EVENT_BANNER: &str = "event/banner";
pub const UNIT_SATURATED: &str = "unit/saturated";
pub const UNIT_ROSTER_TAB: &str = "unit/roster_tab";
pub const UNIT_CANDIDATE: &str = "unit/candidate";
pub const UNIT_CONFIRM: &str = "unit/confirm";

// Fixed coordinates the original UI keeps stable across rounds.
/// Decline button of the co-op invite dialog.
pub const COOP_DECLINE: Point = Point { x: 749, y: 453 };
/// Where the reward screen tolerates dismissal taps.
pub const REWARD_DISMISS: Rect = Rect { l: 300, t: 520, w: 560, h: 60 };
/// Start-battle button area inside the room.
pub const ROOM_START_AREA: Rect = Rect { l: 1064, t: 563, w: 110, h: 48 };
/// Horizontal swipe endpoints used while scanning the explore map.
pub const SLIDE_RIGHT_FROM: Point = Point { x: 1000, y: 350 };
pub const SLIDE_RIGHT_TO: Point = Point { x: 300, y: 350 };
/// Saturation badge scan area over the active party slots.
pub const PARTY_SLOTS: Rect = Rect { l: 380, t: 580, w: 520, h: 90 };

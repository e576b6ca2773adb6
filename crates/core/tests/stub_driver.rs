//! End-to-end checks through the stub platform: reference files on
//! disk, frames out of the synthetic screen, taps recorded.

use std::path::PathBuf;

use image::RgbImage;
use rand::{rngs::StdRng, Rng, SeedableRng};

use marionette_core::capture::FrameSource;
use marionette_core::catalog::{self, Catalog};
use marionette_core::input::{InputInjector, InputTarget};
use marionette_core::perception::{Perception, Trigger};
use marionette_core::platform::stub::{InputEvent, StubPlatform};
use marionette_core::platform::{MouseMessage, Platform};
use marionette_core::routines::{rules_for, Role, RoutineKind};
use marionette_core::rules::{evaluate, Scratch, TickOutcome};
use marionette_core::types::Point;

/// Distinct deterministic 12x12 tile per seed.
fn tile(seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(12, 12, |_, _| image::Rgb([rng.gen(), rng.gen(), rng.gen()]))
}

fn fresh_catalog_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "marionette-test-{}-{}",
        tag,
        std::process::id()
    ));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_reference(root: &PathBuf, name: &str, img: &RgbImage) {
    let path = root.join(format!("{}.png", name));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    img.save(path).unwrap();
}

fn paste(screen: &mut RgbImage, img: &RgbImage, at: (u32, u32)) {
    for y in 0..img.height() {
        for x in 0..img.width() {
            screen.put_pixel(at.0 + x, at.1 + y, *img.get_pixel(x, y));
        }
    }
}

fn noise_screen(w: u32, h: u32, seed: u64) -> RgbImage {
    let mut rng = StdRng::seed_from_u64(seed);
    RgbImage::from_fn(w, h, |_, _| image::Rgb([rng.gen(), rng.gen(), rng.gen()]))
}

#[test]
fn block_in_frame_is_located_centered_and_raw() {
    let root = fresh_catalog_dir("locate");
    let block = tile(1);
    write_reference(&root, "block", &block);

    let mut screen = noise_screen(100, 100, 2);
    paste(&mut screen, &block, (40, 30));

    let platform = StubPlatform::with_screen(screen);
    let frames = FrameSource::new(platform.open(1), false, "e2e");
    let mut perception = Perception::new(frames, Catalog::new(&root));

    let trigger = Trigger::correlation("block", 0.9);
    assert_eq!(
        perception.locate(&trigger).unwrap(),
        Some(Point::new(46, 36))
    );
    assert_eq!(
        perception.locate(&trigger.uncentered()).unwrap(),
        Some(Point::new(40, 30))
    );
}

#[test]
fn raid_routine_attacks_then_refreshes_an_empty_board() {
    let root = fresh_catalog_dir("raid");
    let attack = tile(10);
    let refresh = tile(11);
    let confirm = tile(12);
    write_reference(&root, catalog::RAID_ATTACK, &attack);
    write_reference(&root, catalog::RAID_REFRESH, &refresh);
    write_reference(&root, catalog::RAID_REFRESH_CONFIRM, &confirm);
    write_reference(&root, catalog::BATTLE_REWARD, &tile(13));
    write_reference(&root, catalog::BATTLE_FAILED, &tile(14));
    write_reference(&root, catalog::BATTLE_READY, &tile(15));

    let mut board = noise_screen(300, 200, 20);
    paste(&mut board, &attack, (120, 80));

    let platform = StubPlatform::with_screen(board);
    let frames = FrameSource::new(platform.open(1), false, "e2e");
    let mut perception = Perception::new(frames, Catalog::new(&root));
    let injector = InputInjector::new(platform.open(1), InputTarget::Window);
    let rules = rules_for(RoutineKind::Raid, Role::default(), true);
    let mut scratch = Scratch::default();

    let outcome = evaluate(&rules, "e2e", &mut perception, &injector, &mut scratch).unwrap();
    assert_eq!(outcome, TickOutcome::Fired("attack-target"));
    // tap landed on the attack tile center
    assert_eq!(
        platform.events()[0],
        InputEvent::Posted(MouseMessage::Move, Point::new(126, 86))
    );

    // battle flag is now set, so an unchanged board does nothing
    platform.clear_events();
    let outcome = evaluate(&rules, "e2e", &mut perception, &injector, &mut scratch).unwrap();
    assert_eq!(outcome, TickOutcome::Idle);

    // board cleared, refresh offered: the refresh rule taps both the
    // refresh button and its confirmation
    let mut cleared = noise_screen(300, 200, 21);
    paste(&mut cleared, &refresh, (200, 150));
    paste(&mut cleared, &confirm, (140, 90));
    platform.set_screen(cleared);
    scratch.clear(marionette_core::rules::Flag::InBattle);
    platform.clear_events();

    let outcome = evaluate(&rules, "e2e", &mut perception, &injector, &mut scratch).unwrap();
    assert_eq!(outcome, TickOutcome::Fired("refresh-board"));
    let events = platform.events();
    let taps: Vec<Point> = events
        .iter()
        .filter_map(|e| match e {
            InputEvent::Posted(MouseMessage::LeftDown, p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(taps, vec![Point::new(206, 156), Point::new(146, 96)]);
}

#[test]
fn team_reward_rule_finishes_the_round() {
    let root = fresh_catalog_dir("team");
    let reward = tile(30);
    write_reference(&root, catalog::BATTLE_REWARD, &reward);
    write_reference(&root, catalog::BATTLE_FAILED, &tile(31));

    let mut screen = noise_screen(1280, 720, 32);
    paste(&mut screen, &reward, (600, 400));

    let platform = StubPlatform::with_screen(screen);
    let frames = FrameSource::new(platform.open(1), false, "e2e");
    let mut perception = Perception::new(frames, Catalog::new(&root));
    let injector = InputInjector::new(platform.open(1), InputTarget::Window);
    let rules = rules_for(RoutineKind::TeamCoordination, Role::default(), true);
    let mut scratch = Scratch::default();

    // swap the screen out from under the tap-until-gone loop after a
    // short delay, as the real UI would
    let cleared = noise_screen(1280, 720, 33);
    let outcome = {
        let platform_for_swap = &platform;
        std::thread::scope(|s| {
            s.spawn(|| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                platform_for_swap.set_screen(cleared.clone());
            });
            evaluate(&rules, "e2e", &mut perception, &injector, &mut scratch).unwrap()
        })
    };
    assert_eq!(outcome, TickOutcome::RoundDone);
    // the dismissal taps stayed inside the tolerated rect
    for e in platform.events() {
        if let InputEvent::Posted(MouseMessage::LeftDown, p) = e {
            assert!(catalog::REWARD_DISMISS.contains(p), "tap at {:?}", p);
        }
    }
}

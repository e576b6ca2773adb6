use std::path::PathBuf;

use anyhow::{bail, Result};

use marionette_core::catalog::Catalog;
use marionette_core::control::ControlPlane;
use marionette_core::logger;
use marionette_core::platform;
use marionette_core::settings::Settings;
use marionette_core::sleep;
use marionette_core::worker::{Worker, WorkerExit};

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let force_stub = args.iter().any(|a| a == "--stub");
    let settings_path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("settings.json"));

    let settings = Settings::load(&settings_path);
    logger::init(&settings.logs_dir);
    logger::info(&format!("settings loaded from {}", settings_path.display()));

    if settings.accounts.is_empty() {
        // leave a template behind so there is something to edit
        settings.save(&settings_path);
        bail!("no accounts configured in {}", settings_path.display());
    }

    let platform = platform::create_platform(force_stub);
    let control = ControlPlane::new();
    let catalog = Catalog::new(&settings.references_dir);

    let mut handles = Vec::new();
    for account in &settings.accounts {
        let windows = platform.find_windows(&account.window_title);
        let Some((window_id, title)) = windows.into_iter().next() else {
            logger::error(&format!(
                "no window matches \"{}\", skipping account",
                account.window_title
            ));
            continue;
        };
        logger::info(&format!(
            "driving \"{}\" ({:?}, {} rounds)",
            title, account.routine, account.rounds
        ));
        let worker = Worker::new(
            platform.clone(),
            window_id,
            account.clone(),
            catalog.clone(),
            control.clone(),
            settings.policy(),
        );
        handles.push(worker.spawn());
    }
    if handles.is_empty() {
        bail!("no account window found; nothing to do");
    }

    // Collect workers as they finish. A worker that gave up pulls the
    // shutdown flag so the rest stop at their next tick.
    let mut gave_up = false;
    while !handles.is_empty() {
        if let Some(i) = handles.iter().position(|h| h.is_finished()) {
            let handle = handles.swap_remove(i);
            match handle.join() {
                Ok(WorkerExit::GaveUp) => {
                    gave_up = true;
                    control.request_shutdown();
                }
                Ok(WorkerExit::Completed) => {}
                Err(_) => logger::error("a worker panicked"),
            }
            continue;
        }
        sleep::sleep_ms(200);
    }

    logger::info(&format!(
        "done: {} rounds, {} units replaced",
        control.rounds_done(),
        control.units_replaced()
    ));
    if gave_up {
        std::process::exit(2);
    }
    Ok(())
}

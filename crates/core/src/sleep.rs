use rand::Rng;
use std::thread;
use std::time::Duration;

/// Sleep for `secs` seconds with +/-30% random jitter.
pub fn sleep_jitter(secs: f64) {
    let jitter = secs * 0.3;
    let actual = secs + rand::thread_rng().gen_range(-jitter..jitter);
    thread::sleep(Duration::from_secs_f64(actual.max(0.01)));
}

/// Sleep for exact milliseconds (no jitter).
pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

/// Sleep for a uniformly random duration in `[min_ms, max_ms)`.
/// Used for humanized button holds and pacing.
pub fn sleep_range_ms(min_ms: u64, max_ms: u64) {
    let ms = rand::thread_rng().gen_range(min_ms..max_ms);
    thread::sleep(Duration::from_millis(ms));
}

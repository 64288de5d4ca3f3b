//! Progress reporting for the library check phase.
//!
//! Interactive runs get an indicatif bar. With `--log-only` the bar stays
//! hidden and a `[phase] n/total (pct%)` line goes to stderr about every
//! twentieth item, which survives redirection to a log file.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

static LOG_ONLY: AtomicBool = AtomicBool::new(false);

/// Switch every tracker created afterwards to plain log lines.
pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// `"4.2s"` under a minute, `"1.5m"` above.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Counts finished items for one phase. `tick` may be called from rayon
/// workers.
pub struct PhaseProgress {
    phase: &'static str,
    bar: ProgressBar,
    total: u64,
    every: u64,
    done: AtomicU64,
    log_only: bool,
}

impl PhaseProgress {
    pub fn new(phase: &'static str, total: u64, msg: &str) -> Self {
        let log_only = is_log_only();
        let bar = ProgressBar::new(total);
        if log_only {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        } else {
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} {per_sec}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
        }
        bar.set_message(msg.to_string());

        Self {
            phase,
            bar,
            total,
            every: (total / 20).max(1),
            done: AtomicU64::new(0),
            log_only,
        }
    }

    /// Record one finished item; returns how many are done so far.
    pub fn tick(&self) -> u64 {
        self.bar.inc(1);
        let n = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        if self.log_only && self.should_log(n) {
            let pct = 100.0 * n as f64 / self.total as f64;
            eprintln!("[{}] {}/{} ({:.1}%)", self.phase, n, self.total, pct);
        }
        n
    }

    fn should_log(&self, n: u64) -> bool {
        self.total > 0 && (n % self.every == 0 || n == self.total)
    }

    pub fn finish(self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

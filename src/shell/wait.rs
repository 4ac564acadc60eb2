//! Blocking wait for an external process to go away.
//!
//! Installers launched with [`launch_detached`](super::launch_detached) are
//! observed only through liveness polling. The wait has no timeout: it ends
//! when the polled process is gone, or when the operator kills this process.

use crate::error::Result;
use std::time::Duration;

/// Source of the pause between liveness checks.
pub trait Ticker {
    /// Block for one interval.
    fn tick(&mut self, interval: Duration);
}

/// Ticker that sleeps the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SleepTicker;

impl Ticker for SleepTicker {
    fn tick(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// What a completed wait observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitReport {
    /// Number of liveness checks performed, including the final negative one.
    pub checks: u64,
    /// Number of intervals slept.
    pub ticks: u64,
}

/// Poll `is_alive` every `interval` until it reports false.
///
/// Liveness is checked before the first pause, so a process that is already
/// gone returns after a single check. A process that is seen alive on checks
/// `1..=n` returns after check `n + 1` having slept `n` intervals. Errors
/// from the liveness check end the wait immediately. The polled process is
/// never signalled.
pub fn wait_until_gone<T, F>(
    interval: Duration,
    ticker: &mut T,
    mut is_alive: F,
) -> Result<WaitReport>
where
    T: Ticker + ?Sized,
    F: FnMut() -> Result<bool>,
{
    let mut report = WaitReport { checks: 0, ticks: 0 };

    loop {
        report.checks += 1;
        if !is_alive()? {
            tracing::debug!(
                "Process gone after {} checks ({} intervals)",
                report.checks,
                report.ticks
            );
            return Ok(report);
        }
        ticker.tick(interval);
        report.ticks += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiteprepError;

    /// Ticker that records intervals instead of sleeping.
    #[derive(Default)]
    struct CountingTicker {
        intervals: Vec<Duration>,
    }

    impl Ticker for CountingTicker {
        fn tick(&mut self, interval: Duration) {
            self.intervals.push(interval);
        }
    }

    /// Liveness source that stays alive for `alive_for` checks.
    fn alive_for(n: u64) -> impl FnMut() -> Result<bool> {
        let mut seen = 0;
        move || {
            seen += 1;
            Ok(seen <= n)
        }
    }

    #[test]
    fn already_gone_returns_after_one_check() {
        let mut ticker = CountingTicker::default();
        let report = wait_until_gone(Duration::from_secs(5), &mut ticker, alive_for(0)).unwrap();
        assert_eq!(report, WaitReport { checks: 1, ticks: 0 });
        assert!(ticker.intervals.is_empty());
    }

    #[test]
    fn returns_on_check_after_last_alive() {
        for n in [1, 3, 10] {
            let mut ticker = CountingTicker::default();
            let report =
                wait_until_gone(Duration::from_secs(5), &mut ticker, alive_for(n)).unwrap();
            assert_eq!(report.checks, n + 1);
            assert_eq!(report.ticks, n);
            assert_eq!(ticker.intervals.len() as u64, n);
        }
    }

    #[test]
    fn uses_configured_interval() {
        let mut ticker = CountingTicker::default();
        wait_until_gone(Duration::from_millis(250), &mut ticker, alive_for(2)).unwrap();
        assert!(ticker
            .intervals
            .iter()
            .all(|i| *i == Duration::from_millis(250)));
    }

    #[test]
    fn liveness_error_stops_wait() {
        let mut ticker = CountingTicker::default();
        let mut calls = 0;
        let result = wait_until_gone(Duration::from_secs(1), &mut ticker, || {
            calls += 1;
            if calls == 2 {
                Err(SiteprepError::CommandFailed {
                    command: "tasklist".into(),
                    code: Some(1),
                })
            } else {
                Ok(true)
            }
        });
        assert!(result.is_err());
        assert_eq!(calls, 2);
        assert_eq!(ticker.intervals.len(), 1);
    }

    #[test]
    fn sleep_ticker_sleeps() {
        let mut ticker = SleepTicker;
        let start = std::time::Instant::now();
        ticker.tick(Duration::from_millis(10));
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}

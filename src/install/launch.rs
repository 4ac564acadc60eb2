//! Launch an installer and block until its process is gone.

use crate::error::Result;
use crate::shell::{
    display_command, launch_detached, wait_until_gone, HostProcessProbe, ProcessProbe, SleepTicker,
    Ticker, WaitReport,
};
use std::path::Path;
use std::time::Duration;

/// Starts external programs without waiting for them.
pub trait Launcher {
    /// Start `program`, returning its process id.
    fn launch(&mut self, program: &Path, args: &[String]) -> Result<u32>;
}

/// Launcher that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostLauncher;

impl Launcher for HostLauncher {
    fn launch(&mut self, program: &Path, args: &[String]) -> Result<u32> {
        launch_detached(program, args)
    }
}

/// Everything needed to run an installer to completion.
pub struct InstallHost {
    pub launcher: Box<dyn Launcher>,
    pub probe: Box<dyn ProcessProbe>,
    pub ticker: Box<dyn Ticker>,
    pub interval: Duration,
}

impl InstallHost {
    /// Real processes, polled every `interval`.
    pub fn system(interval: Duration) -> Self {
        Self {
            launcher: Box::new(HostLauncher),
            probe: Box::new(HostProcessProbe),
            ticker: Box::new(SleepTicker),
            interval,
        }
    }

    /// Launch `program` and wait until no process named `process_name` runs.
    ///
    /// The installer's exit code is never read; completion is the
    /// disappearance of the process.
    pub fn launch_and_wait(
        &mut self,
        program: &Path,
        args: &[String],
        process_name: &str,
    ) -> Result<WaitReport> {
        let pid = self.launcher.launch(program, args)?;
        tracing::info!("Started {} (pid {})", display_command(program, args), pid);

        let probe = &mut self.probe;
        let report = wait_until_gone(self.interval, &mut *self.ticker, || {
            probe.is_running(process_name)
        })?;

        tracing::info!(
            "{} finished after {} checks",
            process_name,
            report.checks
        );
        Ok(report)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fakes shared by the installer driver tests.

    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    /// Programs launched, in order.
    pub type LaunchLog = Rc<RefCell<Vec<(PathBuf, Vec<String>)>>>;

    pub struct RecordingLauncher {
        pub log: LaunchLog,
    }

    impl Launcher for RecordingLauncher {
        fn launch(&mut self, program: &Path, args: &[String]) -> Result<u32> {
            self.log
                .borrow_mut()
                .push((program.to_path_buf(), args.to_vec()));
            Ok(4242)
        }
    }

    /// Reports every process alive for `alive_checks` checks, then gone.
    pub struct CountdownProbe {
        pub alive_checks: u64,
        pub seen: u64,
    }

    impl ProcessProbe for CountdownProbe {
        fn is_running(&mut self, _name: &str) -> Result<bool> {
            self.seen += 1;
            if self.seen > self.alive_checks {
                self.seen = 0;
                Ok(false)
            } else {
                Ok(true)
            }
        }
    }

    pub struct NoopTicker;

    impl Ticker for NoopTicker {
        fn tick(&mut self, _interval: Duration) {}
    }

    /// A host that records launches and sees each process alive twice.
    pub fn fake_host() -> (InstallHost, LaunchLog) {
        let log: LaunchLog = Rc::default();
        let host = InstallHost {
            launcher: Box::new(RecordingLauncher { log: log.clone() }),
            probe: Box::new(CountdownProbe {
                alive_checks: 2,
                seen: 0,
            }),
            ticker: Box::new(NoopTicker),
            interval: Duration::from_secs(5),
        };
        (host, log)
    }
}

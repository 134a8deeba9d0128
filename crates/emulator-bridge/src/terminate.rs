//! Emulator termination routine
//!
//! Stops emulators politely through their console (`adb emu kill`) and, if
//! that hangs, kills the qemu processes outright. Killing is a last resort:
//! the emulator exits without saving any internal state.

use std::path::Path;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::adb::{AdbClient, AdbError};
use crate::process::{CommandSpec, ProcessError, ProcessLauncher};

/// Refuse to SIGKILL more emulator processes than this in one sweep
pub const MAX_BRUTAL_KILLS: usize = 5;

const QEMU_PROCESS: &str = "qemu-system-x86_64";

/// Termination errors
#[derive(Debug, thiserror::Error)]
pub enum TerminateError {
    #[error("emulator serial and AVD name must be given together")]
    IncompleteTarget,
    #[error("pid list is too big. not killing whole server {0:?}")]
    TooManyProcesses(Vec<u32>),
    #[error("did not find any emulator process to kill")]
    NoEmulatorProcess,
    #[error("Failed to list processes: {0}")]
    ProcessList(String),
    #[error("Failed to kill pid {pid}: {message}")]
    KillFailed { pid: u32, message: String },
    #[error(transparent)]
    Adb(#[from] AdbError),
    #[error(transparent)]
    Process(#[from] ProcessError),
}

/// One specific emulator to stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorTarget {
    /// adb serial, e.g. `emulator-5554`
    pub serial: String,
    /// AVD name, e.g. `android28`
    pub avd_name: String,
}

impl EmulatorTarget {
    /// Both or neither must be given
    pub fn from_parts(
        serial: Option<String>,
        avd_name: Option<String>,
    ) -> Result<Option<Self>, TerminateError> {
        match (serial, avd_name) {
            (Some(serial), Some(avd_name)) => Ok(Some(Self { serial, avd_name })),
            (None, None) => Ok(None),
            _ => Err(TerminateError::IncompleteTarget),
        }
    }
}

/// What a sweep did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Serials sent `emu kill`
    pub stopped: Vec<String>,
    /// Pids killed with SIGKILL
    pub killed: Vec<u32>,
}

/// Emulator terminator
pub struct EmulatorTerminator<'a, L: ProcessLauncher + ?Sized> {
    launcher: &'a L,
    adb: AdbClient<'a, L>,
    timeout: Duration,
}

impl<'a, L: ProcessLauncher + ?Sized> EmulatorTerminator<'a, L> {
    pub fn new(launcher: &'a L, adb_home: &Path, timeout: Duration) -> Self {
        Self {
            launcher,
            adb: AdbClient::new(launcher, adb_home),
            timeout,
        }
    }

    /// Stop `target`, or every attached emulator when `target` is `None`.
    pub async fn stop_emulators(
        &self,
        target: Option<&EmulatorTarget>,
    ) -> Result<TerminationReport, TerminateError> {
        let mut report = TerminationReport::default();
        let avd_name = target.map(|t| t.avd_name.as_str());

        let serials = match target {
            Some(t) => vec![t.serial.clone()],
            None => {
                info!("Get emulator list");
                match self.adb.list_emulators(self.timeout).await {
                    Ok(serials) => serials,
                    Err(e) if e.is_timeout() => {
                        warn!("got timeout in listing devices. going to kill brutal");
                        report.killed = self.kill_brutal(avd_name).await?;
                        return Ok(report);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        };

        if serials.is_empty() {
            warn!("No emulators running!");
            return Ok(report);
        }

        let mut all_stopped = true;
        for serial in &serials {
            info!("terminating {}", serial);
            match self.adb.emu_kill(serial, self.timeout).await {
                Ok(()) => report.stopped.push(serial.clone()),
                Err(e) if e.is_timeout() => {
                    error!("got timeout exception: {}", e);
                    all_stopped = false;
                }
                Err(e) => return Err(e.into()),
            }
        }

        if !all_stopped {
            report.killed = self.kill_brutal(avd_name).await?;
        }

        Ok(report)
    }

    /// SIGKILL the emulator's qemu processes, optionally only those for
    /// `avd_name`.
    pub async fn kill_brutal(&self, avd_name: Option<&str>) -> Result<Vec<u32>, TerminateError> {
        info!("killing all emulators");

        let ps = self
            .launcher
            .run(&CommandSpec::new("ps").args(["-eo", "pid,args"]))
            .await?;
        if !ps.success() {
            return Err(TerminateError::ProcessList(ps.stderr.trim().to_string()));
        }

        let pids = emulator_pids(&ps.stdout, avd_name);
        if pids.len() > MAX_BRUTAL_KILLS {
            return Err(TerminateError::TooManyProcesses(pids));
        }
        if pids.is_empty() {
            return Err(TerminateError::NoEmulatorProcess);
        }

        for &pid in &pids {
            info!("going to kill {}", pid);
            let output = self
                .launcher
                .run(&CommandSpec::new("kill").arg("-KILL").arg(pid.to_string()))
                .await?;
            if !output.success() {
                return Err(TerminateError::KillFailed {
                    pid,
                    message: output.stderr.trim().to_string(),
                });
            }
        }

        Ok(pids)
    }
}

fn emulator_pids(ps_output: &str, avd_name: Option<&str>) -> Vec<u32> {
    ps_output
        .lines()
        .filter(|line| line.contains(QEMU_PROCESS))
        .filter(|line| avd_name.map_or(true, |avd| line.contains(avd)))
        .filter_map(|line| line.split_whitespace().next()?.parse().ok())
        .collect()
}

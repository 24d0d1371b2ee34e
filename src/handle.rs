//! Target process resolution and liveness.
//!
//! A target is either spawned by the monitor or attached to by pid. Both
//! are wrapped in one [`ProcessHandle`] that answers [`Liveness`] queries.
//!
//! # Platform liveness
//!
//! Two checks exist and they are not equivalent, so both are kept:
//!
//! - [`LivenessCheck::ZombieState`] (Unix): the target counts as exited once
//!   it is gone from the process table *or* is a zombie. A spawned child
//!   stays a zombie until the monitor reaps it, so "present in the table"
//!   alone would never report exit for it.
//! - [`LivenessCheck::RunningFlag`] (other platforms): the target counts as
//!   running while it is present in the process table and, for a spawned
//!   child, has not reported an exit status.
//!
//! An attached process in uninterruptible sleep or stopped by a debugger is
//! still "running" under both checks.

use crate::error::{MonitorError, Result};
use std::fmt;
use std::process::{Child, Command, ExitStatus};
use sysinfo::{Pid, ProcessRefreshKind, ProcessStatus, ProcessesToUpdate, System};
use tracing::{debug, info};

/// What the monitor was asked to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchSpec {
    /// Spawn `program` with `args` and watch it.
    Spawn {
        /// Executable path or name resolved through `PATH`.
        program: String,
        /// Arguments passed to the program.
        args: Vec<String>,
    },
    /// Watch an already running process.
    Attach {
        /// Process id.
        pid: u32,
    },
}

impl LaunchSpec {
    /// Interprets positional arguments.
    ///
    /// A single argument that parses as a pid means attach; anything else is
    /// a program followed by its arguments.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidLaunch`] for an empty argument list or
    /// an empty program name.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        if let [only] = args {
            if let Ok(pid) = only.as_ref().trim().parse::<u32>() {
                return Ok(Self::Attach { pid });
            }
        }

        match args {
            [] => Err(MonitorError::InvalidLaunch(
                "expected an executable with arguments or a process id".to_string(),
            )),
            [program, rest @ ..] => {
                let program = program.as_ref();
                if program.trim().is_empty() {
                    return Err(MonitorError::InvalidLaunch("empty program name".to_string()));
                }
                Ok(Self::Spawn {
                    program: program.to_string(),
                    args: rest.iter().map(|a| a.as_ref().to_string()).collect(),
                })
            }
        }
    }

    /// Short human-readable description of the target.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Spawn { program, .. } => program.clone(),
            Self::Attach { pid } => format!("PID {pid}"),
        }
    }
}

impl fmt::Display for LaunchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// How liveness is decided on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessCheck {
    /// Exited when missing or in the zombie state.
    ZombieState,
    /// Running while present and, for a child, without an exit status.
    RunningFlag,
}

impl LivenessCheck {
    /// The check used on the platform this binary was built for.
    #[must_use]
    pub fn for_platform() -> Self {
        if cfg!(unix) {
            Self::ZombieState
        } else {
            Self::RunningFlag
        }
    }
}

/// Liveness queries the monitoring loop needs from its target.
pub trait Liveness {
    /// Process id of the target.
    fn pid(&self) -> u32;

    /// Returns true while the target is still executing.
    fn is_running(&mut self) -> bool;
}

/// How the handle came to exist.
#[derive(Debug)]
pub enum HandleKind {
    /// Spawned by the monitor; the child is reaped when monitoring ends.
    Spawned(Child),
    /// Attached by pid; the monitor does not own it.
    Attached,
}

/// A resolved target process.
pub struct ProcessHandle {
    kind: HandleKind,
    pid: Pid,
    check: LivenessCheck,
    system: System,
}

impl ProcessHandle {
    /// Spawns or attaches according to `spec`, using the platform check.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::SpawnFailed`] if the program cannot be started
    /// and [`MonitorError::ProcessNotFound`] if the process is not visible to
    /// process accounting.
    pub fn resolve(spec: &LaunchSpec) -> Result<Self> {
        Self::resolve_with(spec, LivenessCheck::for_platform())
    }

    /// Like [`resolve`](Self::resolve) with an explicit liveness check.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn resolve_with(spec: &LaunchSpec, check: LivenessCheck) -> Result<Self> {
        match spec {
            LaunchSpec::Spawn { program, args } => Self::spawn(program, args, check),
            LaunchSpec::Attach { pid } => Self::attach(*pid, check),
        }
    }

    /// Spawns `program` with `args`.
    ///
    /// # Errors
    ///
    /// See [`resolve`](Self::resolve).
    pub fn spawn(program: &str, args: &[String], check: LivenessCheck) -> Result<Self> {
        let mut child = Command::new(program).args(args).spawn().map_err(|source| {
            MonitorError::SpawnFailed { program: program.to_string(), source }
        })?;
        let pid = Pid::from_u32(child.id());
        info!(pid = pid.as_u32(), program, "spawned target");

        let mut handle = Self { kind: HandleKind::Attached, pid, check, system: System::new() };
        let visible = handle.refresh();
        // A child that already exited may have been dropped from the table on
        // some platforms; that is a short run, not a startup failure.
        let exited = matches!(child.try_wait(), Ok(Some(_)));
        handle.kind = HandleKind::Spawned(child);

        if !visible && !exited {
            return Err(MonitorError::ProcessNotFound(pid.as_u32()));
        }
        Ok(handle)
    }

    /// Attaches to a running process.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::ProcessNotFound`] if no such process exists.
    pub fn attach(pid: u32, check: LivenessCheck) -> Result<Self> {
        let mut handle = Self {
            kind: HandleKind::Attached,
            pid: Pid::from_u32(pid),
            check,
            system: System::new(),
        };
        if !handle.refresh() {
            return Err(MonitorError::ProcessNotFound(pid));
        }
        info!(pid, "attached to target");
        Ok(handle)
    }

    /// Returns true if the monitor spawned this process.
    #[must_use]
    pub fn is_spawned(&self) -> bool {
        matches!(self.kind, HandleKind::Spawned(_))
    }

    /// The liveness check in use.
    #[must_use]
    pub fn check(&self) -> LivenessCheck {
        self.check
    }

    /// Reaps a spawned child that has exited.
    ///
    /// Returns the exit status if the child was reaped. Attached processes
    /// and children that are still running return `None` and are left alone.
    pub fn reap(&mut self) -> Option<ExitStatus> {
        let HandleKind::Spawned(child) = &mut self.kind else {
            return None;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                info!(pid = self.pid.as_u32(), %status, "target exited");
                Some(status)
            }
            Ok(None) => {
                debug!(pid = self.pid.as_u32(), "target still running, not reaped");
                None
            }
            Err(e) => {
                debug!(pid = self.pid.as_u32(), "could not reap target: {e}");
                None
            }
        }
    }

    /// Refreshes the target's entry; returns true if it is in the table.
    fn refresh(&mut self) -> bool {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            true,
            ProcessRefreshKind::nothing(),
        );
        self.system.process(self.pid).is_some()
    }

    fn status(&self) -> Option<ProcessStatus> {
        self.system.process(self.pid).map(sysinfo::Process::status)
    }
}

impl Liveness for ProcessHandle {
    fn pid(&self) -> u32 {
        self.pid.as_u32()
    }

    fn is_running(&mut self) -> bool {
        if !self.refresh() {
            return false;
        }
        match self.check {
            LivenessCheck::ZombieState => {
                !matches!(self.status(), Some(ProcessStatus::Zombie | ProcessStatus::Dead) | None)
            }
            LivenessCheck::RunningFlag => match &mut self.kind {
                HandleKind::Spawned(child) => matches!(child.try_wait(), Ok(None)),
                HandleKind::Attached => true,
            },
        }
    }
}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("kind", &self.kind)
            .field("pid", &self.pid.as_u32())
            .field("check", &self.check)
            .finish_non_exhaustive()
    }
}

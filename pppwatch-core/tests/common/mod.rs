//! Scripted stand-ins for the supervisor's collaborators
//!
//! Every fake appends to a shared event log so tests can assert ordering
//! across the command runner, probe and status light.

#![allow(dead_code)]

use pppwatch_core::config::{Jitter, LinkConfig, TimingPolicy};
use pppwatch_core::error::CommandError;
use pppwatch_core::exec::{CommandRunner, Credentials};
use pppwatch_core::indicator::{DutyCycle, Light};
use pppwatch_core::link::{AddressSource, InterfaceCycler, ProcessTable};
use pppwatch_core::probe::{Probe, ProbeResult};
use pppwatch_core::supervisor::{RecoveryPlan, Supervisor};
use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REAUTH: &str = "portal-login";

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.events().iter().filter(|e| *e == event).count()
    }

    /// Index of the first occurrence of `event`
    pub fn position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .position(|e| e == event)
            .unwrap_or_else(|| panic!("{:?} not in {:?}", event, self.events()))
    }

    /// Index of the last occurrence of `event`
    pub fn last_position(&self, event: &str) -> usize {
        self.events()
            .iter()
            .rposition(|e| e == event)
            .unwrap_or_else(|| panic!("{:?} not in {:?}", event, self.events()))
    }
}

pub fn ip(last: u8) -> Ipv4Addr {
    Ipv4Addr::new(10, 64, 0, last)
}

/// Returns scripted addresses in order, then `None` forever
#[derive(Clone, Default)]
pub struct ScriptedAddresses {
    script: Arc<Mutex<VecDeque<Option<Ipv4Addr>>>>,
    reads: Arc<AtomicU32>,
}

impl ScriptedAddresses {
    pub fn new(script: impl IntoIterator<Item = Option<Ipv4Addr>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(script.into_iter().collect())),
            reads: Arc::default(),
        }
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl AddressSource for ScriptedAddresses {
    fn current_address(&self) -> Option<Ipv4Addr> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.script.lock().unwrap().pop_front().flatten()
    }
}

/// Records every command line; fails for one chosen program
#[derive(Clone, Default)]
pub struct RecordingRunner {
    log: EventLog,
    credentials: Arc<Mutex<Vec<(String, Option<Credentials>)>>>,
    fail_program: Option<String>,
}

impl RecordingRunner {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            ..Self::default()
        }
    }

    pub fn failing_on(log: EventLog, program: &str) -> Self {
        Self {
            log,
            fail_program: Some(program.to_string()),
            ..Self::default()
        }
    }

    pub fn credentials_for(&self, program: &str) -> Vec<Option<Credentials>> {
        self.credentials
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == program)
            .map(|(_, c)| *c)
            .collect()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        argv: &[String],
        credentials: Option<Credentials>,
    ) -> Result<(), CommandError> {
        let program = argv.first().cloned().ok_or(CommandError::Empty)?;
        self.log.push(format!("run:{}", argv.join(" ")));
        self.credentials
            .lock()
            .unwrap()
            .push((program.clone(), credentials));

        if self.fail_program.as_deref() == Some(program.as_str()) {
            return Err(CommandError::Failed {
                program,
                status: "exit status: 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Reports the dialer as running for a fixed number of checks
#[derive(Clone, Default)]
pub struct CountdownProcesses {
    running_for: Arc<AtomicU32>,
    checks: Arc<AtomicU32>,
}

impl CountdownProcesses {
    pub fn running_for(checks: u32) -> Self {
        Self {
            running_for: Arc::new(AtomicU32::new(checks)),
            checks: Arc::default(),
        }
    }

    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ProcessTable for CountdownProcesses {
    fn is_running(&self, _name: &str) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.running_for
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// Returns scripted probe results, then `Clear` forever
pub struct ScriptedProbe {
    log: EventLog,
    results: Mutex<VecDeque<ProbeResult>>,
}

impl ScriptedProbe {
    pub fn new(log: EventLog, results: impl IntoIterator<Item = ProbeResult>) -> Self {
        Self {
            log,
            results: Mutex::new(results.into_iter().collect()),
        }
    }
}

impl Probe for ScriptedProbe {
    async fn probe(&self) -> ProbeResult {
        self.log.push("probe");
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(ProbeResult::Clear)
    }
}

#[derive(Clone, Default)]
pub struct RecordingLight {
    log: EventLog,
}

impl RecordingLight {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl Light for RecordingLight {
    fn on(&mut self) -> io::Result<()> {
        self.log.push("light:on");
        Ok(())
    }

    fn off(&mut self) -> io::Result<()> {
        self.log.push("light:off");
        Ok(())
    }
}

pub fn link_config() -> LinkConfig {
    LinkConfig::default()
}

pub fn cycler<R: CommandRunner>(
    runner: R,
    processes: CountdownProcesses,
) -> InterfaceCycler<R, CountdownProcesses> {
    InterfaceCycler::new(runner, processes, &link_config(), &TimingPolicy::fast())
}

pub fn invoking_user() -> Credentials {
    Credentials::new(1000, 1000)
}

pub fn recovery_plan() -> RecoveryPlan {
    RecoveryPlan {
        command: vec![REAUTH.to_string(), "--quiet".to_string()],
        credentials: Some(invoking_user()),
        duty: DutyCycle {
            on: Duration::from_millis(3),
            off: Duration::from_millis(1),
        },
    }
}

pub type TestSupervisor =
    Supervisor<ScriptedAddresses, RecordingRunner, CountdownProcesses, ScriptedProbe, RecordingLight>;

pub fn supervisor(
    addresses: ScriptedAddresses,
    runner: RecordingRunner,
    probe: ScriptedProbe,
    light: RecordingLight,
) -> TestSupervisor {
    Supervisor::new(
        addresses,
        cycler(runner, CountdownProcesses::default()),
        probe,
        light,
        recovery_plan(),
        Jitter::from_millis(1, 2),
    )
}

//! Connection supervisor
//!
//! One iteration of the loop:
//!
//! 1. No address on the PPP interface: cycle the interface and go again
//!    without sleeping.
//! 2. Same address as last time: sleep a jittered interval.
//! 3. New address: remember it and probe. If intercepted, recover: blink the
//!    status light, run the re-authentication command, probe again, and if
//!    still intercepted force a full cycle and forget the address so the
//!    next one is probed from scratch.
//!
//! Command failures during recovery or cycling are fatal and propagate out
//! of [`Supervisor::run`]; the status light is always stopped and joined
//! first.

use crate::config::Jitter;
use crate::error::{IndicatorError, WatchError};
use crate::exec::{describe, CommandRunner, Credentials};
use crate::indicator::{self, DutyCycle, Light};
use crate::link::{AddressSource, CycleOutcome, InterfaceCycler, ProcessTable};
use crate::probe::Probe;
use crate::progress::{self, Progress};
use std::convert::Infallible;
use std::net::Ipv4Addr;
use tracing::{info, warn};

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Iteration {
    /// No address was present; the interface was cycled
    Cycled(CycleOutcome),

    /// The address was unchanged; the supervisor slept
    Unchanged,

    /// A new address was probed and found clear
    Clear(Ipv4Addr),

    /// A new address was intercepted and re-authentication cleared it
    Recovered(Ipv4Addr),

    /// Re-authentication did not clear interception; the interface was cycled
    ForcedCycle(CycleOutcome),
}

/// State carried from one iteration to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupervisorState {
    last_address: Option<Ipv4Addr>,
}

impl SupervisorState {
    pub fn last_address(&self) -> Option<Ipv4Addr> {
        self.last_address
    }
}

/// How to recover from interception
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryPlan {
    /// Re-authentication command line
    pub command: Vec<String>,

    /// Identity to run the command as; `None` runs it unchanged
    pub credentials: Option<Credentials>,

    /// Blink pattern shown while recovery runs
    pub duty: DutyCycle,
}

/// The supervisor loop and its collaborators
pub struct Supervisor<A, R, T, P, L> {
    addresses: A,
    cycler: InterfaceCycler<R, T>,
    probe: P,
    light: Option<L>,
    recovery: RecoveryPlan,
    poll: Jitter,
    state: SupervisorState,
}

impl<A, R, T, P, L> Supervisor<A, R, T, P, L>
where
    A: AddressSource,
    R: CommandRunner,
    T: ProcessTable,
    P: Probe,
    L: Light,
{
    pub fn new(
        addresses: A,
        cycler: InterfaceCycler<R, T>,
        probe: P,
        light: L,
        recovery: RecoveryPlan,
        poll: Jitter,
    ) -> Self {
        Self {
            addresses,
            cycler,
            probe,
            light: Some(light),
            recovery,
            poll,
            state: SupervisorState::default(),
        }
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    /// Run until a fatal error
    pub async fn run(&mut self) -> Result<Infallible, WatchError> {
        info!(
            interface = %self.cycler.interface(),
            command = %describe(&self.recovery.command),
            "Supervising link"
        );
        loop {
            self.step().await?;
        }
    }

    /// Run a single iteration
    pub async fn step(&mut self) -> Result<Iteration, WatchError> {
        let Some(address) = self.addresses.current_address() else {
            info!("No address on link, cycling interface");
            let outcome = self.cycler.cycle(&self.addresses).await?;
            return Ok(Iteration::Cycled(outcome));
        };

        if self.state.last_address == Some(address) {
            self.poll.sleep().await;
            return Ok(Iteration::Unchanged);
        }

        self.state.last_address = Some(address);
        progress::mark(&format!("Address {}", address));

        if !self.probe.probe().await.is_intercepted() {
            return Ok(Iteration::Clear(address));
        }
        self.recover(address).await
    }

    /// Bracket a recovery attempt with the status indicator
    async fn recover(&mut self, address: Ipv4Addr) -> Result<Iteration, WatchError> {
        progress::mark(&format!("Link {} is intercepted", address));

        let light = self.light.take().ok_or(IndicatorError::Unavailable)?;
        let indicator = indicator::start(light, self.recovery.duty).await;

        let attempt = self.reauthenticate(address).await;

        match indicator.stop().await {
            Ok(light) => self.light = Some(light),
            Err(e) if attempt.is_ok() => return Err(e.into()),
            Err(e) => warn!(error = %e, "Status indicator failed during a failed recovery"),
        }
        attempt
    }

    async fn reauthenticate(&mut self, address: Ipv4Addr) -> Result<Iteration, WatchError> {
        let progress = Progress::start("Re-authenticating");
        let result = self
            .cycler
            .runner()
            .run(&self.recovery.command, self.recovery.credentials)
            .await;
        match result {
            Ok(()) => progress.done(),
            Err(e) => {
                progress.fail();
                return Err(e.into());
            }
        }

        if !self.probe.probe().await.is_intercepted() {
            info!(%address, "Interception cleared");
            return Ok(Iteration::Recovered(address));
        }

        warn!(%address, "Still intercepted after re-authentication, cycling interface");
        let outcome = self.cycler.cycle(&self.addresses).await?;
        self.state.last_address = None;
        Ok(Iteration::ForcedCycle(outcome))
    }
}

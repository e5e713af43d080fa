//! Interface bring-down / bring-up
//!
//! A cycle is strictly two-phase. Down: run the bring-down command, then
//! wait for the dialer to exit (no limit). Up: run the bring-up command, then
//! wait a bounded number of polls for the PPP address. Running out of polls
//! is a soft failure reported as [`CycleOutcome::TimedOut`]; a command that
//! exits non-zero is an error.

use crate::config::{LinkConfig, TimingPolicy};
use crate::error::CommandError;
use crate::exec::CommandRunner;
use crate::link::address::AddressSource;
use crate::link::modem::ModemDevice;
use crate::link::process::ProcessTable;
use crate::progress::Progress;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::info;

/// Result of a bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The PPP interface was assigned this address
    Up(Ipv4Addr),

    /// No address appeared within the poll budget
    TimedOut,
}

impl CycleOutcome {
    pub fn is_up(&self) -> bool {
        matches!(self, CycleOutcome::Up(_))
    }
}

/// Cycles the monitored interface
#[derive(Debug)]
pub struct InterfaceCycler<R, T> {
    runner: R,
    processes: T,
    interface: String,
    bring_up: Vec<String>,
    bring_down: Vec<String>,
    dialer: String,
    modem: Option<ModemDevice>,
    dialer_poll: Duration,
    address_poll: Duration,
    address_attempts: u32,
}

impl<R: CommandRunner, T: ProcessTable> InterfaceCycler<R, T> {
    pub fn new(runner: R, processes: T, link: &LinkConfig, timing: &TimingPolicy) -> Self {
        let modem = link
            .modem_device
            .as_ref()
            .map(|path| ModemDevice::new(path, link.hotplug_trigger.clone()));

        Self {
            runner,
            processes,
            interface: link.interface.clone(),
            bring_up: link.bring_up.clone(),
            bring_down: link.bring_down.clone(),
            dialer: link.dialer.clone(),
            modem,
            dialer_poll: timing.dialer_poll(),
            address_poll: timing.address_poll(),
            address_attempts: timing.address_attempts,
        }
    }

    /// The runner used for interface commands
    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Full down-then-up pass
    pub async fn cycle<A: AddressSource>(
        &self,
        addresses: &A,
    ) -> Result<CycleOutcome, CommandError> {
        self.bring_down().await?;
        self.bring_up(addresses).await
    }

    /// Take the interface down and wait for the dialer to exit
    #[tracing::instrument(skip(self), fields(interface = %self.interface))]
    pub async fn bring_down(&self) -> Result<(), CommandError> {
        let mut progress = Progress::start(format!("Bringing down {}", self.interface));
        if let Err(e) = self.runner.run(&self.command(&self.bring_down), None).await {
            progress.fail();
            return Err(e);
        }

        while self.processes.is_running(&self.dialer) {
            progress.ping();
            tokio::time::sleep(self.dialer_poll).await;
        }
        progress.done();
        Ok(())
    }

    /// Bring the interface up and wait for an address
    #[tracing::instrument(skip(self, addresses), fields(interface = %self.interface))]
    pub async fn bring_up<A: AddressSource>(
        &self,
        addresses: &A,
    ) -> Result<CycleOutcome, CommandError> {
        if let Some(modem) = &self.modem {
            modem.ensure_present(&self.runner, self.dialer_poll).await?;
        }

        let mut progress = Progress::start(format!("Bringing up {}", self.interface));
        if let Err(e) = self.runner.run(&self.command(&self.bring_up), None).await {
            progress.fail();
            return Err(e);
        }

        for attempt in 1..=self.address_attempts {
            if let Some(address) = addresses.current_address() {
                progress.done_with(&address.to_string());
                info!(%address, attempt, "Link is up");
                return Ok(CycleOutcome::Up(address));
            }
            progress.ping();
            if attempt < self.address_attempts {
                tokio::time::sleep(self.address_poll).await;
            }
        }

        progress.fail();
        Ok(CycleOutcome::TimedOut)
    }

    fn command(&self, base: &[String]) -> Vec<String> {
        let mut argv = base.to_vec();
        argv.push(self.interface.clone());
        argv
    }
}

//! Link state and interface control
//!
//! Reads the PPP address, scans the process table for the dialer, waits for
//! the modem device node and cycles the interface down and up.

pub mod address;
pub mod cycler;
pub mod modem;
pub mod process;

// Public re-exports
pub use address::{AddressSource, InterfaceAddresses};
pub use cycler::{CycleOutcome, InterfaceCycler};
pub use process::{ProcFs, ProcessTable};

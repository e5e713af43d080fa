//! Background operation for the supervisor
//!
//! Detaches `pppwatch run --daemon` from the terminal and guards against a
//! second instance through a PID file.

pub mod process;

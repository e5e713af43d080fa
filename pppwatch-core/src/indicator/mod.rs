//! Recovery status indicator
//!
//! While a recovery attempt runs, a keyboard LED blinks on a fixed duty
//! cycle: on for 2.5 s, off for 0.5 s. The blinking runs as its own task
//! that owns the LED outright; the supervisor gets the device back only
//! once the task has finished and left the LED off.

pub mod led;

pub use led::LedDevice;

use crate::config::IndicatorConfig;
use crate::error::IndicatorError;
use std::io;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A two-state visual signal
pub trait Light: Send + 'static {
    fn on(&mut self) -> io::Result<()>;
    fn off(&mut self) -> io::Result<()>;
}

/// On/off periods of the blink pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycle {
    pub on: Duration,
    pub off: Duration,
}

impl DutyCycle {
    pub fn from_config(config: &IndicatorConfig) -> Self {
        Self {
            on: Duration::from_millis(config.on_ms),
            off: Duration::from_millis(config.off_ms),
        }
    }
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self::from_config(&IndicatorConfig::default())
    }
}

/// Start blinking `light` until the returned handle is stopped
///
/// Resolves once the task has switched the light on, so anything the caller
/// does afterwards is already bracketed by the indicator. Must be called
/// from within a tokio runtime.
pub async fn start<L: Light>(light: L, duty: DutyCycle) -> IndicatorHandle<L> {
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let (ready_tx, ready_rx) = oneshot::channel();
    let task = tokio::spawn(blink(light, duty, ready_tx, cancel_rx));

    // Only fails if the task died before its first toggle; stop() reports that
    let _ = ready_rx.await;
    debug!(?duty, "Status indicator started");

    IndicatorHandle {
        cancel: cancel_tx,
        task,
    }
}

/// Owner side of a running indicator
///
/// Dropping the handle without calling [`stop`](Self::stop) also cancels
/// the task, which still switches the light off, but nobody waits for it.
#[must_use = "the indicator must be stopped and joined"]
pub struct IndicatorHandle<L> {
    cancel: oneshot::Sender<()>,
    task: JoinHandle<(L, io::Result<()>)>,
}

impl<L: Light> IndicatorHandle<L> {
    /// Signal the task and wait until it has switched the light off
    ///
    /// Returns the device for the next recovery attempt.
    pub async fn stop(self) -> Result<L, IndicatorError> {
        // The receiver is gone only if the task already ended
        let _ = self.cancel.send(());

        match self.task.await {
            Ok((light, Ok(()))) => {
                debug!("Status indicator stopped");
                Ok(light)
            }
            Ok((_, Err(e))) => Err(IndicatorError::SwitchOffFailed {
                reason: e.to_string(),
            }),
            Err(e) => Err(IndicatorError::TaskAborted {
                reason: e.to_string(),
            }),
        }
    }
}

async fn blink<L: Light>(
    mut light: L,
    duty: DutyCycle,
    ready: oneshot::Sender<()>,
    mut cancel: oneshot::Receiver<()>,
) -> (L, io::Result<()>) {
    let mut ready = Some(ready);
    let mut cycles = 0u32;
    loop {
        if let Err(e) = light.on() {
            warn!(error = %e, "Failed to switch status light on");
        }
        if let Some(ready) = ready.take() {
            let _ = ready.send(());
        }
        cycles += 1;
        if cancelled_within(duty.on, &mut cancel).await {
            break;
        }

        if let Err(e) = light.off() {
            warn!(error = %e, "Failed to switch status light off");
        }
        if cancelled_within(duty.off, &mut cancel).await {
            break;
        }
    }

    let result = light.off();
    debug!(cycles, "Status indicator finished");
    (light, result)
}

/// Sleep for `period` unless cancellation arrives first
///
/// A dropped sender counts as cancellation.
async fn cancelled_within(period: Duration, cancel: &mut oneshot::Receiver<()>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(period) => false,
        _ = cancel => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Debug, Default)]
    struct RecordingLight {
        states: Arc<Mutex<Vec<bool>>>,
        fail_final_off: bool,
    }

    impl RecordingLight {
        fn states(&self) -> Vec<bool> {
            self.states.lock().unwrap().clone()
        }
    }

    impl Light for RecordingLight {
        fn on(&mut self) -> io::Result<()> {
            self.states.lock().unwrap().push(true);
            Ok(())
        }

        fn off(&mut self) -> io::Result<()> {
            let mut states = self.states.lock().unwrap();
            states.push(false);
            if self.fail_final_off {
                return Err(io::Error::new(io::ErrorKind::Other, "led gone"));
            }
            Ok(())
        }
    }

    fn fast_duty() -> DutyCycle {
        DutyCycle {
            on: Duration::from_millis(4),
            off: Duration::from_millis(2),
        }
    }

    #[test]
    fn test_default_duty_cycle() {
        let duty = DutyCycle::default();
        assert_eq!(duty.on, Duration::from_millis(2500));
        assert_eq!(duty.off, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_light_is_off_after_stop_for_any_toggle_count() {
        for run_ms in [0u64, 1, 3, 5, 9, 17, 30] {
            let light = RecordingLight::default();
            let handle = start(light.clone(), fast_duty()).await;
            tokio::time::sleep(Duration::from_millis(run_ms)).await;
            handle.stop().await.unwrap();

            let states = light.states();
            assert_eq!(states.last(), Some(&false), "run of {}ms", run_ms);
        }
    }

    #[tokio::test]
    async fn test_starts_with_light_on() {
        let light = RecordingLight::default();
        let handle = start(light.clone(), fast_duty()).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        handle.stop().await.unwrap();

        assert_eq!(light.states().first(), Some(&true));
    }

    #[tokio::test]
    async fn test_blinks_while_running() {
        let light = RecordingLight::default();
        let handle = start(light.clone(), fast_duty()).await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        handle.stop().await.unwrap();

        let ons = light.states().iter().filter(|on| **on).count();
        assert!(ons >= 2, "expected several on phases, got {}", ons);
    }

    #[tokio::test]
    async fn test_stop_returns_the_device() {
        let light = RecordingLight::default();
        let handle = start(light.clone(), fast_duty()).await;
        let returned = handle.stop().await.unwrap();
        assert!(Arc::ptr_eq(&returned.states, &light.states));
    }

    #[tokio::test]
    async fn test_final_off_failure_is_reported() {
        let light = RecordingLight {
            fail_final_off: true,
            ..RecordingLight::default()
        };
        let handle = start(light, fast_duty()).await;
        let err = handle.stop().await.unwrap_err();
        assert!(matches!(err, IndicatorError::SwitchOffFailed { .. }));
    }

    #[tokio::test]
    async fn test_dropped_handle_still_switches_off() {
        let light = RecordingLight::default();
        let handle = start(light.clone(), fast_duty()).await;
        drop(handle);

        for _ in 0..100 {
            if light.states().last() == Some(&false) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("light was left on: {:?}", light.states());
    }
}

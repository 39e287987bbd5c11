//! [`SensorPoller`] – the fixed-cadence loop that owns behavior completion.
//!
//! Every period it snapshots the sensors and ticks the
//! [`BehaviorMachine`].  A fatal fault ends the loop: the shared state is
//! halted so no further behavior can be armed, the drive is stopped, the
//! indicators go red and a `Fault` event is published on the alerts topic.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use fetchbot_types::{Event, EventPayload, FetchError, IndicatorColor};
use tracing::{error, info, trace, warn};

use crate::behavior::{BehaviorMachine, TickOutcome};

const SOURCE: &str = "fetchbot-runtime::poller";

pub struct SensorPoller {
    machine: BehaviorMachine,
}

impl SensorPoller {
    pub fn new(machine: BehaviorMachine) -> Self {
        Self { machine }
    }

    /// One poll: read the sensors and tick the machine.
    pub fn poll_once(&self) -> Result<TickOutcome, FetchError> {
        let snapshot = self.machine.hardware().snapshot()?;
        self.machine.tick(snapshot)
    }

    /// Poll until `shutdown` is raised or a fatal fault occurs.
    ///
    /// # Errors
    ///
    /// The fatal fault that stopped the loop, after the robot was halted.
    pub fn run(&self, shutdown: &AtomicBool) -> Result<(), FetchError> {
        let period = self.machine.config().poll_interval();
        info!(period_ms = period.as_millis() as u64, "sensor poller started");
        let mut ticks: u64 = 0;
        while !shutdown.load(Ordering::SeqCst) {
            match self.poll_once() {
                Ok(outcome) => trace!(tick = ticks, ?outcome, "poll"),
                Err(e) if e.is_fatal() => {
                    self.fail(&e);
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "poll tick failed"),
            }
            ticks += 1;
            self.machine.clock().sleep(period);
        }
        info!(ticks, "sensor poller stopped");
        Ok(())
    }

    /// Run the loop on a dedicated `sensor-poller` thread.
    pub fn spawn(
        self,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<JoinHandle<Result<(), FetchError>>> {
        thread::Builder::new()
            .name("sensor-poller".to_string())
            .spawn(move || self.run(&shutdown))
    }

    fn fail(&self, fault: &FetchError) {
        error!(error = %fault, "fatal fault, halting behaviors");
        self.machine.modes().halt();

        let hw = self.machine.hardware();
        // Best effort: the failing device may be the one we are calling.
        if let Err(e) = hw.actuators().drive_stop() {
            warn!(error = %e, "could not stop drive after fault");
        }
        if let Err(e) = hw.indicate_phase(IndicatorColor::Red) {
            warn!(error = %e, "could not show fault indicator");
        }

        let (component, message) = match fault {
            FetchError::SensorRead { sensor, details } => (sensor.clone(), details.clone()),
            FetchError::ActuatorFault { component, details } => {
                (component.clone(), details.clone())
            }
            other => ("poller".to_string(), other.to_string()),
        };
        self.machine
            .bus()
            .publish(Event::new(SOURCE, EventPayload::Fault { component, message }));
    }
}

//! Background temperature driver.
//!
//! One long-lived task perturbs the container temperature on a fixed
//! period and, through [`ContainerEngine::drive_cycle`], is the only place
//! destruction is evaluated and resets happen. Mass adjustments arriving
//! between cycles see pressure as of the last cycle — callers must
//! tolerate reads that are up to one period stale.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::engine::{ContainerEngine, CycleOutcome, DestructionCause};

/// Source of the per-cycle temperature delta.
///
/// Abstracted so tests can script exact sequences; production uses
/// [`UniformNoise`].
pub trait TemperatureNoise: Send {
    /// Next integer delta, uniform in `[-magnitude, magnitude]`.
    fn next_delta(&mut self, magnitude: i32) -> i32;
}

/// Thread-local-RNG-backed noise.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformNoise;

impl TemperatureNoise for UniformNoise {
    fn next_delta(&mut self, magnitude: i32) -> i32 {
        rand::rng().random_range(-magnitude..=magnitude)
    }
}

/// Tunables for the driver.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Time between cycles.
    pub period: Duration,
    /// Bound of the uniform temperature delta.
    pub delta_magnitude: i32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(2),
            delta_magnitude: 15,
        }
    }
}

/// The periodic temperature driver.
pub struct TemperatureDriver<N: TemperatureNoise> {
    engine: Arc<ContainerEngine>,
    config: DriverConfig,
    noise: N,
}

impl TemperatureDriver<UniformNoise> {
    /// Driver with uniform random noise.
    pub fn new(engine: Arc<ContainerEngine>, config: DriverConfig) -> Self {
        Self::with_noise(engine, config, UniformNoise)
    }
}

impl<N: TemperatureNoise> TemperatureDriver<N> {
    /// Driver with an explicit noise source.
    pub fn with_noise(engine: Arc<ContainerEngine>, config: DriverConfig, noise: N) -> Self {
        Self {
            engine,
            config,
            noise,
        }
    }

    /// Run one cycle: draw a delta and drive the engine.
    ///
    /// Exposed so tests can step the driver without waiting on the clock.
    pub fn cycle(&mut self) {
        let delta = self.noise.next_delta(self.config.delta_magnitude);
        match self.engine.drive_cycle(f64::from(delta)) {
            CycleOutcome::TemperatureChanged { delta, pressure } => {
                debug!(delta, pressure, "temperature perturbed");
            }
            CycleOutcome::Destroyed {
                cause: DestructionCause::Implosion,
                pressure,
            } => {
                warn!(pressure, "container imploded");
            }
            CycleOutcome::Destroyed {
                cause: DestructionCause::Explosion,
                pressure,
            } => {
                warn!(pressure, "container exploded");
            }
            CycleOutcome::Reset { pressure } => {
                info!(pressure, "container reset to initial conditions");
            }
        }
    }

    /// Run forever on the configured period.
    ///
    /// The first cycle runs one full period after start.
    pub async fn run(mut self) {
        let mut ticker = time::interval(self.config.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // An interval's first tick fires immediately; consume it so the
        // first cycle happens after one period, sleep-then-act.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.cycle();
        }
    }
}

impl<N: TemperatureNoise + 'static> TemperatureDriver<N> {
    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

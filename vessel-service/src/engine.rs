//! Container state engine.
//!
//! One [`ContainerEngine`] owns the container's physical state behind a
//! single mutex. Two writers exist: mass-adjustment calls arriving through
//! the dispatcher, and the periodic temperature driver. Everything inside
//! the lock is pure computation — no I/O, no awaiting — so no caller can
//! stall another by holding it.
//!
//! Destruction is single-writer by construction: only
//! [`drive_cycle`](ContainerEngine::drive_cycle) (crate-internal, reached
//! solely from the background driver) ever sets the destroyed flag or
//! resets the container. Mass adjustments observe the flag, never write it.

use std::sync::Mutex;

/// Volume divisor in the pressure derivation.
pub const MOLAR_VOLUME: f64 = 22.4;

/// The four pressure thresholds, fixed for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdLimits {
    /// Below this pressure the container implodes (checked by the driver).
    pub implosion: f64,
    /// Mass may be added only while pressure is strictly below this.
    pub lower: f64,
    /// Mass may be removed only while pressure is strictly above this.
    pub upper: f64,
    /// Above this pressure the container explodes (checked by the driver).
    pub explosion: f64,
}

impl Default for ThresholdLimits {
    fn default() -> Self {
        Self {
            implosion: 10.0,
            lower: 100.0,
            upper: 150.0,
            explosion: 200.0,
        }
    }
}

impl ThresholdLimits {
    fn is_ordered(&self) -> bool {
        self.implosion < self.lower && self.lower < self.upper && self.upper < self.explosion
    }
}

/// Construction parameters for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Temperature at start and after every reset.
    pub initial_temperature: f64,
    /// Mass at start and after every reset.
    pub initial_mass: f64,
    /// Threshold set, validated at construction.
    pub limits: ThresholdLimits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_temperature: 293.0,
            initial_mass: 10.0,
            limits: ThresholdLimits::default(),
        }
    }
}

/// Errors raised when constructing an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The threshold set violates `implosion < lower < upper < explosion`.
    #[error("threshold limits must satisfy implosion < lower < upper < explosion, got {limits:?}")]
    InvalidLimits {
        /// The rejected threshold set.
        limits: ThresholdLimits,
    },
}

/// Why a mass adjustment was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The container is currently destroyed.
    Destroyed,
    /// Pressure is already at or above the lower limit; no mass may be added.
    PressureTooHigh,
    /// Pressure is at or below the upper limit; no mass may be removed.
    PressureTooLow,
}

impl RejectReason {
    /// The reason string as it appears on the wire.
    pub const fn message(self) -> &'static str {
        match self {
            RejectReason::Destroyed => "Container destroyed.",
            RejectReason::PressureTooHigh => "Pressure too high to add mass.",
            RejectReason::PressureTooLow => "Pressure too low to remove mass.",
        }
    }
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of one mass adjustment.
///
/// A rejection is ordinary data on its way back to the caller, not an
/// error; nothing here is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MassAdjustment {
    /// The delta was applied; the pressure after the mutation.
    Applied {
        /// Pressure derived from the post-adjustment state.
        pressure: f64,
    },
    /// The delta was not applied.
    Rejected(RejectReason),
}

impl MassAdjustment {
    /// Whether the adjustment was applied.
    pub fn is_applied(&self) -> bool {
        matches!(self, MassAdjustment::Applied { .. })
    }
}

/// Which bound the pressure escaped through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestructionCause {
    /// Pressure fell below the implosion limit.
    Implosion,
    /// Pressure rose above the explosion limit.
    Explosion,
}

/// Outcome of one background driver cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// The container was destroyed on a prior cycle and has been reset to
    /// its initial conditions.
    Reset {
        /// Pressure after the reset.
        pressure: f64,
    },
    /// Pressure was out of bounds at the start of the cycle; the container
    /// is now destroyed and the cycle's temperature delta was not applied.
    Destroyed {
        /// Which bound was escaped.
        cause: DestructionCause,
        /// The out-of-bounds pressure that triggered destruction.
        pressure: f64,
    },
    /// Normal cycle: the temperature delta was applied.
    TemperatureChanged {
        /// The applied delta.
        delta: f64,
        /// Pressure after the temperature change.
        pressure: f64,
    },
}

struct CellState {
    temperature: f64,
    mass: f64,
    destroyed: bool,
}

impl CellState {
    fn pressure(&self) -> f64 {
        self.mass * self.temperature / MOLAR_VOLUME
    }
}

/// The container state behind its single lock.
pub struct ContainerEngine {
    config: EngineConfig,
    state: Mutex<CellState>,
}

impl ContainerEngine {
    /// Build an engine at its initial conditions.
    ///
    /// # Errors
    ///
    /// Rejects threshold sets that violate
    /// `implosion < lower < upper < explosion`.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        if !config.limits.is_ordered() {
            return Err(EngineError::InvalidLimits {
                limits: config.limits,
            });
        }
        let state = Mutex::new(CellState {
            temperature: config.initial_temperature,
            mass: config.initial_mass,
            destroyed: false,
        });
        Ok(Self { config, state })
    }

    /// Engine with the standard initial conditions and thresholds.
    pub fn with_defaults() -> Self {
        // Default limits are ordered; the constructor cannot fail.
        match Self::new(EngineConfig::default()) {
            Ok(engine) => engine,
            Err(_) => unreachable!("default limits are ordered"),
        }
    }

    /// The configured threshold set.
    pub fn limits(&self) -> ThresholdLimits {
        self.config.limits
    }

    /// Current derived pressure. Never fails.
    pub fn pressure(&self) -> f64 {
        self.lock().pressure()
    }

    /// Current destroyed flag. Never fails.
    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }

    /// Add mass.
    ///
    /// Applies iff the container is intact and pressure is strictly below
    /// the lower limit. The check runs against pre-mutation pressure only;
    /// a single large delta may overshoot the limit it respects, which is
    /// the specified behavior.
    pub fn increase_mass(&self, amount: f64) -> MassAdjustment {
        let mut state = self.lock();
        if state.destroyed {
            return MassAdjustment::Rejected(RejectReason::Destroyed);
        }
        if state.pressure() >= self.config.limits.lower {
            return MassAdjustment::Rejected(RejectReason::PressureTooHigh);
        }
        state.mass += amount;
        MassAdjustment::Applied {
            pressure: state.pressure(),
        }
    }

    /// Remove mass.
    ///
    /// Applies iff the container is intact and pressure is strictly above
    /// the upper limit; the same pre-mutation check discipline as
    /// [`increase_mass`](Self::increase_mass).
    pub fn decrease_mass(&self, amount: f64) -> MassAdjustment {
        let mut state = self.lock();
        if state.destroyed {
            return MassAdjustment::Rejected(RejectReason::Destroyed);
        }
        if state.pressure() <= self.config.limits.upper {
            return MassAdjustment::Rejected(RejectReason::PressureTooLow);
        }
        state.mass -= amount;
        MassAdjustment::Applied {
            pressure: state.pressure(),
        }
    }

    /// Advance one background cycle with the given temperature delta.
    ///
    /// Exactly one caller exists: the background temperature driver. Each
    /// cycle, in order: a destroyed container is reset; an intact container
    /// with out-of-bounds pressure is destroyed (the delta is discarded);
    /// otherwise the delta is applied. Destruction caused by the applied
    /// delta is therefore observed at the start of the *next* cycle, the
    /// same as destruction caused by a mass adjustment.
    pub(crate) fn drive_cycle(&self, delta: f64) -> CycleOutcome {
        let mut state = self.lock();
        if state.destroyed {
            state.temperature = self.config.initial_temperature;
            state.mass = self.config.initial_mass;
            state.destroyed = false;
            return CycleOutcome::Reset {
                pressure: state.pressure(),
            };
        }
        let pressure = state.pressure();
        if pressure < self.config.limits.implosion {
            state.destroyed = true;
            return CycleOutcome::Destroyed {
                cause: DestructionCause::Implosion,
                pressure,
            };
        }
        if pressure > self.config.limits.explosion {
            state.destroyed = true;
            return CycleOutcome::Destroyed {
                cause: DestructionCause::Explosion,
                pressure,
            };
        }
        state.temperature += delta;
        CycleOutcome::TemperatureChanged {
            delta,
            pressure: state.pressure(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CellState> {
        self.state.lock().expect("container state lock poisoned")
    }
}

impl std::fmt::Debug for ContainerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ContainerEngine")
            .field("temperature", &state.temperature)
            .field("mass", &state.mass)
            .field("destroyed", &state.destroyed)
            .field("pressure", &state.pressure())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_at(temperature: f64, mass: f64) -> ContainerEngine {
        ContainerEngine::new(EngineConfig {
            initial_temperature: temperature,
            initial_mass: mass,
            limits: ThresholdLimits::default(),
        })
        .expect("default limits are valid")
    }

    #[test]
    fn pressure_is_mass_times_temperature_over_molar_volume() {
        let engine = ContainerEngine::with_defaults();
        assert_eq!(engine.pressure(), 10.0 * 293.0 / 22.4);

        let engine = engine_at(100.0, 2.0);
        assert_eq!(engine.pressure(), 2.0 * 100.0 / 22.4);
    }

    #[test]
    fn increase_rejected_at_initial_conditions() {
        // 10 * 293 / 22.4 ≈ 130.8, already at or above the lower limit.
        let engine = ContainerEngine::with_defaults();
        assert_eq!(
            engine.increase_mass(5.0),
            MassAdjustment::Rejected(RejectReason::PressureTooHigh)
        );
        assert_eq!(
            RejectReason::PressureTooHigh.message(),
            "Pressure too high to add mass."
        );
        // The rejected delta must not have touched the state.
        assert_eq!(engine.pressure(), 10.0 * 293.0 / 22.4);
    }

    #[test]
    fn increase_applies_strictly_below_lower_limit() {
        // 10 * 223 / 22.4 ≈ 99.55 < 100.
        let engine = engine_at(223.0, 10.0);
        let outcome = engine.increase_mass(2.0);
        assert_eq!(
            outcome,
            MassAdjustment::Applied {
                pressure: 12.0 * 223.0 / 22.4
            }
        );
        // Visible to the very next read.
        assert_eq!(engine.pressure(), 12.0 * 223.0 / 22.4);
    }

    #[test]
    fn increase_rejected_just_above_lower_limit() {
        // 10 * 225 / 22.4 ≈ 100.45.
        let engine = engine_at(225.0, 10.0);
        assert_eq!(
            engine.increase_mass(0.1),
            MassAdjustment::Rejected(RejectReason::PressureTooHigh)
        );
    }

    #[test]
    fn decrease_rejected_at_initial_conditions() {
        // 130.8 is not strictly above the upper limit of 150.
        let engine = ContainerEngine::with_defaults();
        assert_eq!(
            engine.decrease_mass(1.0),
            MassAdjustment::Rejected(RejectReason::PressureTooLow)
        );
        assert_eq!(
            RejectReason::PressureTooLow.message(),
            "Pressure too low to remove mass."
        );
    }

    #[test]
    fn decrease_applies_strictly_above_upper_limit() {
        // 10 * 350 / 22.4 = 156.25 > 150.
        let engine = engine_at(350.0, 10.0);
        let outcome = engine.decrease_mass(3.0);
        assert_eq!(
            outcome,
            MassAdjustment::Applied {
                pressure: 7.0 * 350.0 / 22.4
            }
        );
    }

    #[test]
    fn adjustments_rejected_while_destroyed() {
        // 50 * 293 / 22.4 ≈ 654 > 200: the next cycle destroys.
        let engine = engine_at(293.0, 50.0);
        let outcome = engine.drive_cycle(0.0);
        assert!(matches!(
            outcome,
            CycleOutcome::Destroyed {
                cause: DestructionCause::Explosion,
                ..
            }
        ));
        assert!(engine.is_destroyed());

        assert_eq!(
            engine.increase_mass(1.0),
            MassAdjustment::Rejected(RejectReason::Destroyed)
        );
        assert_eq!(
            engine.decrease_mass(1.0),
            MassAdjustment::Rejected(RejectReason::Destroyed)
        );
        assert_eq!(RejectReason::Destroyed.message(), "Container destroyed.");
    }

    #[test]
    fn threshold_check_uses_pre_mutation_pressure_only() {
        // Intentional check-then-act: one large delta may overshoot the
        // limit it was checked against, and no re-check runs afterwards.
        let engine = engine_at(220.0, 10.0); // ≈ 98.2 < 100
        let outcome = engine.increase_mass(1000.0);
        assert!(outcome.is_applied());
        assert!(engine.pressure() > engine.limits().explosion);
        // Still not destroyed: only the driver evaluates destruction.
        assert!(!engine.is_destroyed());
    }

    #[test]
    fn implosion_evaluated_before_the_cycles_own_delta() {
        // 2 * 100 / 22.4 ≈ 8.9 < 10: destruction must win even though the
        // cycle's delta (+15) would have lifted pressure back in range.
        let engine = engine_at(100.0, 2.0);
        let outcome = engine.drive_cycle(15.0);
        assert_eq!(
            outcome,
            CycleOutcome::Destroyed {
                cause: DestructionCause::Implosion,
                pressure: 2.0 * 100.0 / 22.4
            }
        );
        assert!(engine.is_destroyed());
    }

    #[test]
    fn cycle_following_destruction_resets_to_initial_conditions() {
        let engine = engine_at(100.0, 2.0);
        assert!(matches!(
            engine.drive_cycle(0.0),
            CycleOutcome::Destroyed { .. }
        ));

        // Destroyed persists for the full period between cycles.
        assert!(engine.is_destroyed());

        let outcome = engine.drive_cycle(7.0);
        assert_eq!(
            outcome,
            CycleOutcome::Reset {
                pressure: 2.0 * 100.0 / 22.4
            }
        );
        assert!(!engine.is_destroyed());
        // Reset restores the engine's own initial conditions.
        assert_eq!(engine.pressure(), 2.0 * 100.0 / 22.4);
    }

    #[test]
    fn normal_cycle_applies_the_delta() {
        let engine = ContainerEngine::with_defaults();
        let outcome = engine.drive_cycle(-15.0);
        assert_eq!(
            outcome,
            CycleOutcome::TemperatureChanged {
                delta: -15.0,
                pressure: 10.0 * 278.0 / 22.4
            }
        );
        assert_eq!(engine.pressure(), 10.0 * 278.0 / 22.4);
    }

    #[test]
    fn delta_driven_overshoot_is_caught_on_the_next_cycle() {
        // 10 * 440 / 22.4 ≈ 196.4; +15 pushes past the explosion limit but
        // the cycle that applied it reports a normal change.
        let engine = engine_at(440.0, 10.0);
        let outcome = engine.drive_cycle(15.0);
        assert!(matches!(outcome, CycleOutcome::TemperatureChanged { .. }));
        assert!(!engine.is_destroyed());

        assert!(matches!(
            engine.drive_cycle(0.0),
            CycleOutcome::Destroyed {
                cause: DestructionCause::Explosion,
                ..
            }
        ));
    }

    #[test]
    fn unordered_limits_are_rejected() {
        let err = ContainerEngine::new(EngineConfig {
            limits: ThresholdLimits {
                implosion: 10.0,
                lower: 150.0,
                upper: 100.0,
                explosion: 200.0,
            },
            ..EngineConfig::default()
        })
        .expect_err("unordered limits must be rejected");
        assert!(matches!(err, EngineError::InvalidLimits { .. }));
    }

    #[test]
    fn concurrent_adjustments_never_lose_updates() {
        use std::sync::Arc;

        // Limits wide enough that every increment is accepted.
        let engine = Arc::new(
            ContainerEngine::new(EngineConfig {
                initial_temperature: 293.0,
                initial_mass: 10.0,
                limits: ThresholdLimits {
                    implosion: 10.0,
                    lower: 1.0e6,
                    upper: 2.0e6,
                    explosion: 3.0e6,
                },
            })
            .expect("limits are ordered"),
        );

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(engine.increase_mass(1.0).is_applied());
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().expect("worker thread panicked");
        }

        // 8 * 100 unit increments, none lost, none torn.
        assert_eq!(engine.pressure(), 810.0 * 293.0 / 22.4);
    }
}

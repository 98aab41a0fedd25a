//! Solver and world configuration.

use crate::math::Vec3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Switches and constants used by the contact and joint solver.
///
/// Passed explicitly into every pre-step and impulse pass, so several worlds
/// can run side by side with different settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Relaxation sweeps over all arbiters and joints per step.
    pub iterations: u32,
    /// Clamp the accumulated impulse rather than each instantaneous impulse.
    pub accumulate_impulses: bool,
    /// Seed each step with last step's impulses.
    pub warm_starting: bool,
    /// Baumgarte position correction. When off the bias factor is zero.
    pub position_correction: bool,
    /// Fraction of contact penetration corrected per second (times `1/dt`).
    pub contact_bias_factor: f32,
    /// Penetration tolerated before correction kicks in.
    pub allowed_penetration: f32,
    /// Approach speed above which restitution applies.
    pub restitution_threshold: f32,
    /// Tangential speed below which static friction applies.
    pub friction_threshold: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            accumulate_impulses: true,
            warm_starting: true,
            position_correction: true,
            contact_bias_factor: 0.2,
            allowed_penetration: 0.01,
            restitution_threshold: 1.0,
            friction_threshold: 1.0,
        }
    }
}

impl SolverConfig {
    /// Builder: set the iteration count.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    /// Builder: toggle warm starting.
    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Builder: toggle accumulated impulse clamping.
    pub fn with_accumulate_impulses(mut self, enabled: bool) -> Self {
        self.accumulate_impulses = enabled;
        self
    }

    /// Builder: toggle position correction.
    pub fn with_position_correction(mut self, enabled: bool) -> Self {
        self.position_correction = enabled;
        self
    }

    /// Contact bias factor, or zero when position correction is off.
    #[inline]
    pub fn effective_contact_bias(&self) -> f32 {
        if self.position_correction {
            self.contact_bias_factor
        } else {
            0.0
        }
    }
}

/// World-level settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WorldConfig {
    /// Gravity acceleration (m/s²).
    pub gravity: Vec3,
    pub solver: SolverConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            solver: SolverConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Builder: set gravity.
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Builder: replace the solver settings.
    pub fn with_solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }
}

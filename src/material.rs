//! Surface materials and the rules used to merge two of them at a contact.
//!
//! Every shape carries a [`Material`]. When two shapes touch, their friction
//! and restitution coefficients are merged into one [`CombinedMaterial`]
//! according to a [`CombineMode`]. Friction and restitution each have their
//! own mode, and when the two materials disagree the more aggressive mode wins
//! (`Average < Minimum < Multiply < Maximum`).

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ComplexField provides sqrt() for f32 in no_std via libm
#[allow(unused_imports)]
use nalgebra::ComplexField;

/// Policy for merging two coefficients into one.
///
/// Variants are declared in precedence order: [`CombineMode::effective`]
/// picks the later one when two materials disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CombineMode {
    /// Arithmetic mean.
    #[default]
    Average,
    /// Smaller of the two.
    Minimum,
    /// Product of the two.
    Multiply,
    /// Larger of the two.
    Maximum,
}

impl CombineMode {
    /// Merge two coefficients with this mode.
    #[inline]
    pub fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            CombineMode::Average => (a + b) * 0.5,
            CombineMode::Minimum => a.min(b),
            CombineMode::Multiply => a * b,
            CombineMode::Maximum => a.max(b),
        }
    }

    /// The mode used when two materials request different ones.
    #[inline]
    pub fn effective(a: CombineMode, b: CombineMode) -> CombineMode {
        a.max(b)
    }
}

/// Surface properties of a shape.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Material {
    /// Friction coefficient used while the contact is (nearly) at rest.
    pub static_friction: f32,
    /// Friction coefficient used while the contact is sliding.
    pub dynamic_friction: f32,
    /// Coefficient of restitution (0 = no bounce).
    pub restitution: f32,
    /// How friction coefficients are merged with another material.
    pub friction_combine: CombineMode,
    /// How restitution coefficients are merged with another material.
    pub restitution_combine: CombineMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            static_friction: 0.5,
            dynamic_friction: 0.5,
            restitution: 0.0,
            friction_combine: CombineMode::Average,
            restitution_combine: CombineMode::Average,
        }
    }
}

impl Material {
    /// Create a material with both friction coefficients set to `friction`.
    pub fn new(friction: f32, restitution: f32) -> Self {
        Self {
            static_friction: friction,
            dynamic_friction: friction,
            restitution,
            ..Self::default()
        }
    }

    /// Builder: set static and dynamic friction separately.
    pub fn with_friction(mut self, static_friction: f32, dynamic_friction: f32) -> Self {
        self.static_friction = static_friction.max(0.0);
        self.dynamic_friction = dynamic_friction.max(0.0);
        self
    }

    /// Builder: set restitution (clamped to `0.0..=1.0`).
    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution.clamp(0.0, 1.0);
        self
    }

    /// Builder: set the friction combine mode.
    pub fn with_friction_combine(mut self, mode: CombineMode) -> Self {
        self.friction_combine = mode;
        self
    }

    /// Builder: set the restitution combine mode.
    pub fn with_restitution_combine(mut self, mode: CombineMode) -> Self {
        self.restitution_combine = mode;
        self
    }

    /// Merge two materials into the coefficients used by one contact pair.
    pub fn combine(a: &Material, b: &Material) -> CombinedMaterial {
        let friction_mode = CombineMode::effective(a.friction_combine, b.friction_combine);
        let restitution_mode = CombineMode::effective(a.restitution_combine, b.restitution_combine);
        CombinedMaterial {
            static_friction: friction_mode.combine(a.static_friction, b.static_friction),
            dynamic_friction: friction_mode.combine(a.dynamic_friction, b.dynamic_friction),
            restitution: restitution_mode.combine(a.restitution, b.restitution),
        }
    }
}

/// Effective coefficients for one shape pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombinedMaterial {
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

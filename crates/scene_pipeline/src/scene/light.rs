//! Lighting system
//!
//! Light sources live in the scene graph like any other node: their position
//! and orientation come from the node's world transform, a light shines down
//! its local -Z axis.

use crate::foundation::math::utils::deg_to_rad;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LightType {
    /// Directional light (like sunlight)
    Directional,
    /// Point light (like a lightbulb)
    Point,
    /// Spot light (like a flashlight)
    Spot,
    /// Area light (emitting surface)
    Area,
}

/// Distance attenuation `1 / (constant + linear * d + quadratic * d^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Attenuation {
    /// Constant term
    pub constant: f32,
    /// Linear term
    pub linear: f32,
    /// Quadratic term
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

/// RGB color clamped to [0, 1] per channel
pub type Color = [f32; 3];

/// Clamp to `[min, max]`; NaN and infinities become 0
fn clamp_finite(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

fn clamp_color(color: Color) -> Color {
    color.map(|c| clamp_finite(c, 0.0, 1.0))
}

/// Light source
///
/// Setters clamp their input so that `radius >= 0`, every attenuation term
/// is `>= 0` and colors stay inside [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    light_type: LightType,
    intensity: f32,
    radius: f32,
    attenuation: Attenuation,
    spot_cutoff: f32,
    spot_exponent: f32,
    cast_shadow: bool,
    diffuse: Color,
    ambient: Color,
    specular: Color,
}

impl Light {
    /// Radius used when none is configured
    pub const DEFAULT_RADIUS: f32 = 100.0;

    /// Create a light with default parameters
    pub fn new(light_type: LightType) -> Self {
        Self {
            light_type,
            intensity: 1.0,
            radius: Self::DEFAULT_RADIUS,
            attenuation: Attenuation::default(),
            spot_cutoff: 25.0,
            spot_exponent: 1.0,
            cast_shadow: false,
            diffuse: [1.0, 1.0, 1.0],
            ambient: [0.0, 0.0, 0.0],
            specular: [1.0, 1.0, 1.0],
        }
    }

    /// Create a directional light
    pub fn directional(intensity: f32) -> Self {
        Self::new(LightType::Directional).with_intensity(intensity)
    }

    /// Create a point light
    pub fn point(intensity: f32, radius: f32) -> Self {
        Self::new(LightType::Point).with_intensity(intensity).with_radius(radius)
    }

    /// Create a spot light (`cutoff` in degrees, half-angle of the cone)
    pub fn spot(intensity: f32, radius: f32, cutoff: f32) -> Self {
        Self::new(LightType::Spot)
            .with_intensity(intensity)
            .with_radius(radius)
            .with_spot_cutoff(cutoff)
    }

    /// Set intensity (non-negative)
    #[must_use]
    pub fn with_intensity(mut self, intensity: f32) -> Self {
        self.intensity = intensity.max(0.0);
        self
    }

    /// Set the effect radius (non-negative)
    #[must_use]
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.set_radius(radius);
        self
    }

    /// Set attenuation terms (each non-negative)
    #[must_use]
    pub fn with_attenuation(mut self, constant: f32, linear: f32, quadratic: f32) -> Self {
        self.attenuation = Attenuation {
            constant: constant.max(0.0),
            linear: linear.max(0.0),
            quadratic: quadratic.max(0.0),
        };
        self
    }

    /// Set spot cone half-angle in degrees, clamped to [0, 90]
    #[must_use]
    pub fn with_spot_cutoff(mut self, cutoff: f32) -> Self {
        self.spot_cutoff = clamp_finite(cutoff, 0.0, 90.0);
        self
    }

    /// Set spot falloff exponent (non-negative)
    #[must_use]
    pub fn with_spot_exponent(mut self, exponent: f32) -> Self {
        self.spot_exponent = exponent.max(0.0);
        self
    }

    /// Request a shadow map
    #[must_use]
    pub fn with_cast_shadow(mut self, cast_shadow: bool) -> Self {
        self.cast_shadow = cast_shadow;
        self
    }

    /// Set diffuse color
    #[must_use]
    pub fn with_diffuse(mut self, color: Color) -> Self {
        self.diffuse = clamp_color(color);
        self
    }

    /// Set ambient color
    #[must_use]
    pub fn with_ambient(mut self, color: Color) -> Self {
        self.ambient = clamp_color(color);
        self
    }

    /// Set specular color
    #[must_use]
    pub fn with_specular(mut self, color: Color) -> Self {
        self.specular = clamp_color(color);
        self
    }

    /// Light type
    pub fn light_type(&self) -> LightType {
        self.light_type
    }

    /// Intensity
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Effect radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Set the effect radius (non-negative)
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.max(0.0);
    }

    /// Attenuation terms
    pub fn attenuation(&self) -> Attenuation {
        self.attenuation
    }

    /// Spot cone half-angle in degrees
    pub fn spot_cutoff(&self) -> f32 {
        self.spot_cutoff
    }

    /// Spot cone half-angle in radians
    pub fn spot_cutoff_radians(&self) -> f32 {
        deg_to_rad(self.spot_cutoff)
    }

    /// Spot falloff exponent
    pub fn spot_exponent(&self) -> f32 {
        self.spot_exponent
    }

    /// Whether a shadow map is requested
    pub fn cast_shadow(&self) -> bool {
        self.cast_shadow
    }

    /// Toggle shadow casting
    pub fn set_cast_shadow(&mut self, cast_shadow: bool) {
        self.cast_shadow = cast_shadow;
    }

    /// Diffuse color
    pub fn diffuse(&self) -> Color {
        self.diffuse
    }

    /// Ambient color
    pub fn ambient(&self) -> Color {
        self.ambient
    }

    /// Specular color
    pub fn specular(&self) -> Color {
        self.specular
    }

    /// Attenuation factor at `distance`
    pub fn attenuation_at(&self, distance: f32) -> f32 {
        let a = self.attenuation;
        let denominator = a.constant + a.linear * distance + a.quadratic * distance * distance;
        if denominator <= f32::EPSILON {
            1.0
        } else {
            (1.0 / denominator).min(1.0)
        }
    }

    /// Distance at which attenuation drops to `threshold`
    ///
    /// Solves `quadratic * d^2 + linear * d + constant = 1 / threshold`.
    /// Returns `None` when the light never falls below the threshold.
    pub fn cutoff_distance(&self, threshold: f32) -> Option<f32> {
        if threshold <= 0.0 {
            return None;
        }
        let a = self.attenuation;
        let c = a.constant - 1.0 / threshold;
        if c >= 0.0 {
            return Some(0.0);
        }

        if a.quadratic > f32::EPSILON {
            let discriminant = a.linear * a.linear - 4.0 * a.quadratic * c;
            Some((-a.linear + discriminant.sqrt()) / (2.0 * a.quadratic))
        } else if a.linear > f32::EPSILON {
            Some(-c / a.linear)
        } else {
            None
        }
    }
}

impl Default for Light {
    fn default() -> Self {
        Self::new(LightType::Point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let light = Light::new(LightType::Directional);
        assert_relative_eq!(light.radius(), 100.0);
        assert_eq!(light.attenuation(), Attenuation::default());
        assert!(!light.cast_shadow());
        assert_eq!(light.ambient(), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_invariants_are_clamped() {
        let light = Light::new(LightType::Spot)
            .with_radius(-5.0)
            .with_attenuation(-1.0, 0.5, -0.25)
            .with_diffuse([1.5, -0.2, 0.5])
            .with_spot_cutoff(120.0);

        assert_relative_eq!(light.radius(), 0.0);
        assert_eq!(
            light.attenuation(),
            Attenuation { constant: 0.0, linear: 0.5, quadratic: 0.0 }
        );
        assert_eq!(light.diffuse(), [1.0, 0.0, 0.5]);
        assert_relative_eq!(light.spot_cutoff(), 90.0);
    }

    #[test]
    fn test_non_finite_inputs_become_zero() {
        let light = Light::new(LightType::Spot)
            .with_diffuse([f32::NAN, 0.5, f32::INFINITY])
            .with_specular([f32::NEG_INFINITY, f32::NAN, 1.0])
            .with_ambient([f32::NAN; 3])
            .with_radius(f32::NAN)
            .with_spot_cutoff(f32::NAN);

        assert_eq!(light.diffuse(), [0.0, 0.5, 0.0]);
        assert_eq!(light.specular(), [0.0, 0.0, 1.0]);
        assert_eq!(light.ambient(), [0.0; 3]);
        assert_relative_eq!(light.radius(), 0.0);
        assert_relative_eq!(light.spot_cutoff(), 0.0);
    }

    #[test]
    fn test_attenuation_at() {
        let light = Light::point(1.0, 10.0).with_attenuation(1.0, 0.0, 1.0);
        assert_relative_eq!(light.attenuation_at(0.0), 1.0);
        assert_relative_eq!(light.attenuation_at(1.0), 0.5);
        assert_relative_eq!(light.attenuation_at(3.0), 0.1);
    }

    #[test]
    fn test_cutoff_distance() {
        let quadratic = Light::point(1.0, 10.0).with_attenuation(1.0, 0.0, 1.0);
        assert_relative_eq!(quadratic.cutoff_distance(0.1).unwrap(), 3.0, epsilon = 1e-4);

        let linear = Light::point(1.0, 10.0).with_attenuation(1.0, 1.0, 0.0);
        assert_relative_eq!(linear.cutoff_distance(0.5).unwrap(), 1.0, epsilon = 1e-5);

        let constant = Light::point(1.0, 10.0);
        assert!(constant.cutoff_distance(0.5).is_none());
    }
}

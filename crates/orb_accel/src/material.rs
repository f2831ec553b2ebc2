//! Surface material description carried through hit records.
//!
//! The accelerator never interprets materials; it only hands the
//! reference of the hit surface back to the shading stage.

use orb_math::Vec3;

/// A surface material reference.
///
/// Renderer-agnostic: just enough description for a shading stage to
/// pick up after a hit. Shading math itself lives outside this crate.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// Material name (for scene export and debugging)
    pub name: String,

    /// Diffuse/albedo color (RGB, 0-1)
    pub diffuse_color: Vec3,

    /// Emissive color (RGB, for light-emitting surfaces)
    pub emissive_color: Vec3,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            diffuse_color: Vec3::new(0.5, 0.5, 0.5), // Grey default
            emissive_color: Vec3::ZERO,
        }
    }
}

impl Material {
    /// Create a new material with just a name and diffuse color.
    pub fn new(name: impl Into<String>, diffuse_color: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse_color,
            ..Default::default()
        }
    }

    /// Check if this material is emissive.
    pub fn is_emissive(&self) -> bool {
        self.emissive_color.length_squared() > 0.0
    }
}

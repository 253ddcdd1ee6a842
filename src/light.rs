// Point light passed through to the render backend

use glam::{Vec3, Vec4};

/// A single point light with attenuation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    /// Light position in world space
    pub position: Vec3,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub ambient: Vec4,
    /// Attenuation coefficient
    pub attenuation: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            diffuse: Vec4::ONE,
            specular: Vec4::ONE,
            ambient: Vec4::splat(0.005),
            attenuation: 0.02,
        }
    }
}

impl Light {
    pub fn new(position: Vec3, diffuse: Vec4, specular: Vec4, ambient: Vec4, attenuation: f32) -> Self {
        Self {
            position,
            diffuse,
            specular,
            ambient,
            attenuation,
        }
    }

    /// Adds `step` to every ambient channel. Channels never go below zero.
    pub fn adjust_ambient(&mut self, step: f32) {
        self.ambient = (self.ambient + Vec4::splat(step)).max(Vec4::ZERO);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_adjusts_and_floors_at_zero() {
        let mut light = Light {
            ambient: Vec4::splat(0.15),
            ..Light::default()
        };
        light.adjust_ambient(0.1);
        assert!(light.ambient.abs_diff_eq(Vec4::splat(0.25), 1e-6));
        light.adjust_ambient(-1.0);
        assert_eq!(light.ambient, Vec4::ZERO);
    }
}

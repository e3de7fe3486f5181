//! Point light for the demo scene

use glam::Vec3;

/// A single point light.
#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(1.2, 1.0, 2.0),
            color: Vec3::ONE,
        }
    }
}

impl PointLight {
    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self { position, color }
    }

    /// Diffuse contribution: the light color at half influence.
    pub fn diffuse_color(&self) -> Vec3 {
        self.color * 0.5
    }

    /// Ambient contribution: a low fraction of the diffuse color.
    pub fn ambient_color(&self) -> Vec3 {
        self.diffuse_color() * 0.2
    }

    /// Specular contribution: the full light color.
    pub fn specular_color(&self) -> Vec3 {
        self.color
    }

    /// Move the light along its circular demo path at time `t` (seconds).
    pub fn orbit(&mut self, t: f32) {
        self.position.x = 1.0 + t.sin() * 2.0;
        self.position.y = (t * 0.5).sin();
        self.position.z = 1.0 + t.cos() * 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambient_is_dimmer_than_diffuse() {
        let light = PointLight::default();
        assert!(light.ambient_color().length() < light.diffuse_color().length());
        assert!(light.diffuse_color().length() < light.specular_color().length());
    }

    #[test]
    fn orbit_stays_on_the_demo_path() {
        let mut light = PointLight::default();
        light.orbit(0.0);
        assert_eq!(light.position, Vec3::new(1.0, 0.0, 3.0));

        light.orbit(std::f32::consts::FRAC_PI_2);
        assert!((light.position.x - 3.0).abs() < 1e-6);
    }
}

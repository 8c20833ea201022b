use serde::{Deserialize, Serialize};

/// Minimum-detectable-reflectivity envelope of the detector.
///
/// Between `distance_lower` and `distance_upper` the reflectivity floor is
/// interpolated linearly; returns weaker than the floor at their distance are
/// reported with zero intensity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReflectivityEnvelope {
    pub reflectivity_lower: f32,
    pub distance_lower: f32,
    pub reflectivity_upper: f32,
    pub distance_upper: f32,
}

impl Default for ReflectivityEnvelope {
    fn default() -> Self {
        Self {
            reflectivity_lower: 0.1,
            distance_lower: 50.0,
            reflectivity_upper: 0.9,
            distance_upper: 120.0,
        }
    }
}

impl ReflectivityEnvelope {
    /// The reflectivity floor at `distance`. Zero below `distance_lower`.
    pub fn minimum_reflectivity(&self, distance: f32) -> f32 {
        if distance >= self.distance_lower {
            self.reflectivity_lower
                + ((self.reflectivity_upper - self.reflectivity_lower) * distance)
                    / (self.distance_upper - self.distance_lower)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianNoiseConfig {
    pub mu: f32,
    pub sigma: f32,
}

impl Default for GaussianNoiseConfig {
    fn default() -> Self {
        Self { mu: 0.0, sigma: 0.01 }
    }
}

/// Distance-dependent systematic offset: `absolute + distance * relative / 100`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantNoiseConfig {
    pub absolute_offset: f32,
    pub relative_offset_percent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    pub gaussian: Option<GaussianNoiseConfig>,
    pub constant: Option<ConstantNoiseConfig>,
}

impl NoiseConfig {
    /// Whether any noise source is active, which decides if noisy
    /// location/distance fields are produced at all.
    pub fn any(&self) -> bool {
        self.gaussian.is_some() || self.constant.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RainConfig {
    /// Rainfall rate in mm/h.
    pub rainfall_rate: f32,
}

impl Default for RainConfig {
    fn default() -> Self {
        Self { rainfall_rate: 10.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DustConfig {
    /// Particle radius in micrometers.
    pub particle_radius_um: f32,
    /// Particles per cubic meter.
    pub particle_density: f32,
    /// Distance from the sensor to the near edge of the cloud.
    pub cloud_start: f32,
    /// Extent of the cloud along the ray.
    pub cloud_length: f32,
}

impl Default for DustConfig {
    fn default() -> Self {
        Self {
            particle_radius_um: 50.0,
            particle_density: 100_000.0,
            cloud_start: 5.0,
            cloud_length: 12.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherConfig {
    pub rain: Option<RainConfig>,
    pub dust: Option<DustConfig>,
}

/// Angular or pixel grid swept by an optical scanner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SweepPattern {
    /// Rotating scan head: horizontal field of view swept at `step_x` degrees
    /// per ray, vertical at `step_y`. Both intervals include their endpoints.
    Rotating {
        fov_x: f32,
        step_x: f32,
        fov_y: f32,
        step_y: f32,
    },
    /// Fixed camera-style sensor projecting a `res_x` by `res_y` pixel grid
    /// through a frame plane spanning `fov_x`/`fov_y` degrees.
    Static {
        res_x: usize,
        res_y: usize,
        fov_x: f32,
        fov_y: f32,
    },
}

impl Default for SweepPattern {
    fn default() -> Self {
        SweepPattern::Rotating {
            fov_x: 90.0,
            step_x: 1.0,
            fov_y: 45.0,
            step_y: 1.0,
        }
    }
}

/// Frame range for an animated rotating scan. Each frame covers the angular
/// fraction swept during one frame interval at `rotations_per_second`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSweep {
    pub frame_start: u32,
    pub frame_end: u32,
    pub frame_step: u32,
    pub frame_rate: f32,
    pub rotations_per_second: f32,
}

impl Default for FrameSweep {
    fn default() -> Self {
        Self {
            frame_start: 1,
            frame_end: 10,
            frame_step: 1,
            frame_rate: 24.0,
            rotations_per_second: 10.0,
        }
    }
}

/// Full configuration of an optical (lidar / time-of-flight) scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LidarConfig {
    pub sweep: SweepPattern,
    pub envelope: ReflectivityEnvelope,
    /// Recursion budget for mirror and glass sub-casts.
    pub max_reflection_depth: i32,
    pub noise: NoiseConfig,
    pub weather: WeatherConfig,
}

impl Default for LidarConfig {
    fn default() -> Self {
        Self {
            sweep: SweepPattern::default(),
            envelope: ReflectivityEnvelope::default(),
            max_reflection_depth: 10,
            noise: NoiseConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

/// One horizontal layer of the water column, relative to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterLayer {
    /// Lower boundary of the layer, measured downwards from the surface.
    pub depth: f32,
    /// Speed of sound within the layer, m/s.
    pub speed: f32,
    /// Density within the layer, kg/m^3.
    pub density: f32,
}

/// Full configuration of a side-scan sonar sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SonarConfig {
    /// Source level SL of the projector, dB.
    pub source_level: f32,
    /// Ambient noise level NL, dB.
    pub noise_level: f32,
    /// Directivity index DI, dB.
    pub directivity_index: f32,
    /// Processing gain PG, dB.
    pub processing_gain: f32,
    /// Minimum received level that still registers as an echo.
    pub reception_threshold: f32,
    pub max_distance: f32,
    /// Downward field of view, degrees.
    pub fov: f32,
    /// Angular step within the field of view, degrees.
    pub step: f32,
    /// Report hits at their true 3-D position instead of flattening them into
    /// the scan plane.
    pub mode_3d: bool,
    /// When flattening, keep the horizontal direction of each ray instead of
    /// projecting onto the port/starboard axis.
    pub keep_rotation: bool,
    /// Height of the water surface in world coordinates.
    pub surface_height: f32,
    /// Water column profile ordered by depth, surface first. Empty disables
    /// layered propagation.
    pub water_layers: Vec<WaterLayer>,
    pub noise: NoiseConfig,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            source_level: 200.0,
            noise_level: 50.0,
            directivity_index: 20.0,
            processing_gain: 10.0,
            reception_threshold: 10.0,
            max_distance: 100.0,
            fov: 45.0,
            step: 1.0,
            mode_3d: false,
            keep_rotation: false,
            surface_height: 10.0,
            water_layers: Vec::new(),
            noise: NoiseConfig::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn envelope_interpolates_between_bounds() {
        let envelope = ReflectivityEnvelope {
            reflectivity_lower: 0.0,
            distance_lower: 0.0,
            reflectivity_upper: 1.0,
            distance_upper: 20.0,
        };

        assert_relative_eq!(envelope.minimum_reflectivity(0.0), 0.0);
        assert_relative_eq!(envelope.minimum_reflectivity(10.0), 0.5);
        assert_relative_eq!(envelope.minimum_reflectivity(20.0), 1.0);
    }

    #[test]
    fn envelope_is_zero_below_the_lower_distance() {
        let envelope = ReflectivityEnvelope::default();
        assert_relative_eq!(envelope.minimum_reflectivity(49.9), 0.0);
        assert!(envelope.minimum_reflectivity(50.0) > 0.0);
    }
}

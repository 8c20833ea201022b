use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::config::{ConstantNoiseConfig, DustConfig};

/// One sample from N(mu, sigma). Degenerate parameters fall back to the mean.
pub fn gaussian(rng: &mut impl Rng, mu: f32, sigma: f32) -> f32 {
    match Normal::new(mu, sigma) {
        Ok(distribution) => distribution.sample(rng),
        Err(_) => mu,
    }
}

/// Systematic range offset of the detector.
#[inline]
pub fn constant_offset(config: &ConstantNoiseConfig, distance: f32) -> f32 {
    config.absolute_offset + distance * config.relative_offset_percent / 100.0
}

/// Range jitter from rain along a path of `distance`: a zero-mean gaussian
/// whose spread grows with distance and rainfall rate.
pub fn rain_range_noise(rng: &mut impl Rng, rainfall_rate: f32, distance: f32) -> f32 {
    gaussian(
        rng,
        0.0,
        0.02 * distance * (1.0 - (-rainfall_rate).exp()).powi(2),
    )
}

/// Reflectivity loss from rain backscatter, always `<= 0`.
pub fn rain_reflectivity_delta(rainfall_rate: f32, distance: f32) -> f32 {
    let backscatter_coefficient = 0.01 * rainfall_rate.powf(0.6);

    (-2.0 * backscatter_coefficient * distance).exp() - 1.0
}

/// What a dust cloud does to a return from `target_distance` away.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DustEffect {
    /// Target in front of the cloud, unaffected.
    None,
    /// The cloud is dense enough to read as a solid surface; the return moves
    /// to the cloud's near edge.
    CloudReturn { distance: f32, intensity: f32 },
    /// The beam passes through; reflectivity is scaled by this factor.
    Attenuation(f32),
}

/// Evaluate a dust cloud against the detector's reflectivity floor `r_min`
/// at the target's distance.
pub fn dust_effect(dust: &DustConfig, target_distance: f32, r_min: f32) -> DustEffect {
    let radius = dust.particle_radius_um * 1e-6;
    let density = dust.particle_density;
    let cloud_start = dust.cloud_start;

    if target_distance < cloud_start {
        return DustEffect::None;
    }

    let beta = radius * radius * density / 4.0;
    if beta > r_min {
        return DustEffect::CloudReturn {
            distance: cloud_start,
            intensity: beta,
        };
    }

    // Only the stretch of cloud in front of the target attenuates the return.
    let cloud_end = cloud_start + dust.cloud_length;
    let relevant_length = if target_distance < cloud_end {
        target_distance - cloud_start
    } else {
        dust.cloud_length
    };

    DustEffect::Attenuation(
        (-2.0 * std::f32::consts::PI * radius * radius * density * relevant_length).exp(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn constant_offset_mixes_absolute_and_relative_parts() {
        let config = ConstantNoiseConfig {
            absolute_offset: 0.5,
            relative_offset_percent: 2.0,
        };

        assert_relative_eq!(constant_offset(&config, 100.0), 2.5);
        assert_relative_eq!(constant_offset(&config, 0.0), 0.5);
    }

    #[test]
    fn gaussian_with_zero_spread_returns_the_mean() {
        let mut rng = rand::rng();
        assert_relative_eq!(gaussian(&mut rng, 3.0, 0.0), 3.0);
        // Invalid spread degrades to the mean instead of failing.
        assert_relative_eq!(gaussian(&mut rng, 3.0, -1.0), 3.0);
    }

    #[test]
    fn rain_delta_darkens_with_distance() {
        let near = rain_reflectivity_delta(10.0, 5.0);
        let far = rain_reflectivity_delta(10.0, 50.0);

        assert!(near <= 0.0);
        assert!(far < near);
        assert!(far >= -1.0);
    }

    #[test]
    fn dust_has_no_effect_in_front_of_the_cloud() {
        let dust = DustConfig {
            cloud_start: 10.0,
            ..DustConfig::default()
        };

        assert_eq!(dust_effect(&dust, 9.9, 0.0), DustEffect::None);
    }

    #[test]
    fn dense_dust_reads_as_a_surface_at_the_cloud_edge() {
        let dust = DustConfig {
            particle_radius_um: 50.0,
            particle_density: 1e9,
            cloud_start: 5.0,
            cloud_length: 10.0,
        };
        // beta = (50e-6)^2 * 1e9 / 4 = 0.625
        match dust_effect(&dust, 20.0, 0.5) {
            DustEffect::CloudReturn { distance, intensity } => {
                assert_relative_eq!(distance, 5.0);
                assert_relative_eq!(intensity, 0.625, epsilon = 1e-6);
            }
            other => panic!("expected a cloud return, got {other:?}"),
        }
    }

    #[test]
    fn thin_dust_attenuates_only_the_span_in_front_of_the_target() {
        let dust = DustConfig {
            particle_radius_um: 50.0,
            particle_density: 1000.0,
            cloud_start: 5.0,
            cloud_length: 10.0,
        };

        let alpha = |length: f32| {
            (-2.0 * std::f32::consts::PI * (50.0e-6f32).powi(2) * 1000.0 * length).exp()
        };
        // Target inside the cloud: only the 3 units in front of it count.
        match dust_effect(&dust, 8.0, 0.5) {
            DustEffect::Attenuation(factor) => {
                assert_relative_eq!(factor, alpha(3.0), epsilon = 1e-6);
            }
            other => panic!("expected attenuation, got {other:?}"),
        }
        // Target behind the cloud: the full length applies.
        match dust_effect(&dust, 50.0, 0.5) {
            DustEffect::Attenuation(factor) => {
                assert_relative_eq!(factor, alpha(10.0), epsilon = 1e-6);
            }
            other => panic!("expected attenuation, got {other:?}"),
        }
    }
}

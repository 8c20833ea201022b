use glam::{Quat, Vec3};
use itertools::Itertools;
use num_complex::Complex64;
use rayon::prelude::*;

use crate::{
    config::{FrameSweep, LidarConfig, SweepPattern},
    fresnel, math, noise,
    noise::DustEffect,
    scene::{MaterialProperty, MaterialResolver, RayCaster, ScanError, Scene, surface_reflectivity},
    sensors::{HitRecord, ScanFrame, Sensor, SensorPose},
};

/// Refractive index of air, used as the ambient medium for Snell's law.
pub const IOR_AIR: f32 = 1.000293;

/// Incoming-medium index handed to the Fresnel transmission term.
const FRESNEL_AMBIENT_IOR: f64 = 1.000292;

/// Incidence angles up to ~2 degrees off the normal return the glass surface
/// itself; a head-on beam reads the pane as a reflector.
const GRAZING_ANGLE_LIMIT: f32 = 0.034_906_6;

/// Sub-casts start 1mm along the new direction so rounding errors cannot
/// re-intersect the surface they left.
const SUBCAST_OFFSET: f32 = 1e-3;

/// Recursively trace one optical ray.
///
/// `current_ior` and `inside_material` carry the medium state across glass
/// boundaries; the initial cast starts in air, outside any solid. A negative
/// `remaining_depth` ends the recursion with no hit.
///
/// The returned record accumulates the full travelled distance of bent paths
/// while keeping the surface data of the brightest return.
pub fn cast_ray<S>(
    scene: &S,
    origin: Vec3,
    direction: Vec3,
    max_range: f32,
    current_ior: f32,
    inside_material: bool,
    remaining_depth: i32,
) -> Result<Option<HitRecord>, ScanError>
where
    S: RayCaster + MaterialResolver,
{
    if remaining_depth < 0 {
        return Ok(None);
    }

    let Some(hit) = scene.closest_hit(origin, direction, max_range) else {
        return Ok(None);
    };

    let normal = hit.normal;
    let normal_angle = direction.angle_between(normal);

    let material = scene.resolve_material(&hit)?;

    let mut record = HitRecord::from(hit);
    record.color = material.color();
    // Lambertian return: incidence cosine times the surface reflectivity.
    record.intensity = normal_angle.cos().abs() * material.reflectivity();

    match material {
        MaterialProperty::Opaque { metallic, .. } | MaterialProperty::Textured { metallic, .. }
            if metallic == 1.0 =>
        {
            let reflected = direction.reflect(normal.normalize());
            let new_range = max_range - record.distance;

            if new_range > 0.0 {
                let offset = reflected.normalize() * SUBCAST_OFFSET;
                match cast_ray(
                    scene,
                    record.location + offset,
                    reflected,
                    new_range,
                    current_ior,
                    inside_material,
                    remaining_depth - 1,
                )? {
                    Some(sub_hit) => {
                        // The scanner cannot tell a mirrored path apart from a
                        // straight one; it reports the summed distance along
                        // the original direction.
                        record.distance += sub_hit.distance;
                        record.color = sub_hit.color;
                        record.intensity = surface_reflectivity(sub_hit.color);
                        record.was_reflected = true;
                    }
                    // A dead-end mirror cast is invisible to the sensor.
                    None => return Ok(None),
                }
            }

            Ok(Some(record))
        }
        MaterialProperty::Glass { ior, .. } if ior > 0.0 => {
            let angle = (std::f32::consts::PI - normal_angle).abs();
            if angle <= GRAZING_ANGLE_LIMIT {
                return Ok(Some(record));
            }

            let new_range = max_range - record.distance;
            if new_range <= 0.0 {
                return Ok(Some(record));
            }

            let unit_normal = normal.normalize();

            let transmission = fresnel::t_unpolarized(
                Complex64::from(ior as f64),
                angle as f64,
                FRESNEL_AMBIENT_IOR,
            ) as f32;
            let reflectivity = 1.0 - transmission;

            // Mirror the ray at the pane, unless we are already inside the
            // medium.
            let reflected_hit = if inside_material {
                None
            } else {
                let reflected = direction.reflect(unit_normal);
                let offset = reflected.normalize() * SUBCAST_OFFSET;
                cast_ray(
                    scene,
                    record.location + offset,
                    reflected,
                    new_range,
                    current_ior,
                    inside_material,
                    remaining_depth - 1,
                )?
            };

            let mut intensity_reflected = 0.0;
            let reflected_hit = reflected_hit.map(|mut sub_hit| {
                sub_hit.was_reflected = true;
                // The ray bounces off the pane twice on this path.
                intensity_reflected =
                    surface_reflectivity(sub_hit.color) * reflectivity * reflectivity;
                sub_hit
            });

            // Send the ray through the pane.
            let direction = direction.normalize();
            let mut refraction_normal = unit_normal;
            if refraction_normal.dot(direction) > 0.0 {
                refraction_normal = -refraction_normal;
            }

            let n = if inside_material {
                ior / IOR_AIR
            } else {
                IOR_AIR / ior
            };

            let passthrough_hit = match math::refract(direction, refraction_normal, n) {
                Some(new_direction) => {
                    let offset = new_direction.normalize() * SUBCAST_OFFSET;
                    cast_ray(
                        scene,
                        record.location + offset,
                        new_direction,
                        new_range,
                        ior,
                        !inside_material,
                        remaining_depth - 1,
                    )?
                }
                None => None,
            };

            let mut intensity_passthrough = 0.0;
            if let Some(sub_hit) = &passthrough_hit {
                // The ray crosses the pane twice, out and back.
                intensity_passthrough =
                    surface_reflectivity(sub_hit.color) * transmission * transmission;
            }

            match (passthrough_hit, reflected_hit) {
                (Some(sub_hit), _)
                    if intensity_passthrough >= intensity_reflected
                        && intensity_passthrough > 0.0 =>
                {
                    record.distance += sub_hit.distance;
                    record.color = sub_hit.color;
                    record.intensity = intensity_passthrough;
                    record.was_reflected = true;

                    Ok(Some(record))
                }
                (_, Some(sub_hit)) if intensity_reflected > intensity_passthrough => {
                    record.distance += sub_hit.distance;
                    record.color = sub_hit.color;
                    record.intensity = intensity_reflected;
                    record.was_reflected = true;

                    Ok(Some(record))
                }
                // Neither branch returns energy; the pane itself stays dark.
                _ => Ok(None),
            }
        }
        _ => Ok(Some(record)),
    }
}

/// Scanning rangefinder sweeping an angular or pixel grid of optical rays.
#[derive(Debug, Clone, Default)]
pub struct Lidar {
    pub config: LidarConfig,
}

impl Lidar {
    pub fn new(config: LidarConfig) -> Self {
        Self { config }
    }

    /// One full pass over the configured grid.
    pub fn scan(&self, scene: &Scene, pose: SensorPose) -> Result<ScanFrame, ScanError> {
        let interval = match self.config.sweep {
            SweepPattern::Rotating { fov_x, .. } => (-fov_x / 2.0, fov_x / 2.0),
            SweepPattern::Static { .. } => (0.0, 0.0),
        };

        self.scan_interval(scene, pose, interval, 0)
    }

    /// A pass per frame. A rotating head only covers the angular fraction it
    /// sweeps within one frame interval; static sensors rescan the full grid.
    pub fn scan_animated(
        &self,
        scene: &Scene,
        pose: SensorPose,
        frames: &FrameSweep,
    ) -> Result<Vec<ScanFrame>, ScanError> {
        let mut passes = Vec::new();

        for frame in
            (frames.frame_start..=frames.frame_end).step_by(frames.frame_step.max(1) as usize)
        {
            let interval = match self.config.sweep {
                SweepPattern::Rotating { fov_x, .. } => {
                    let fraction =
                        (frames.rotations_per_second / frames.frame_rate * fov_x).min(360.0);
                    let start =
                        -fov_x / 2.0 + ((frame - frames.frame_start) as f32 * fraction) % 360.0;

                    (start, start + fraction)
                }
                SweepPattern::Static { .. } => (0.0, 0.0),
            };

            passes.push(self.scan_interval(scene, pose, interval, frame)?);
        }

        Ok(passes)
    }

    fn scan_interval(
        &self,
        scene: &Scene,
        pose: SensorPose,
        interval: (f32, f32),
        frame: u32,
    ) -> Result<ScanFrame, ScanError> {
        let start = std::time::Instant::now();

        let (x_range, y_range) = match self.config.sweep {
            SweepPattern::Rotating {
                step_x,
                fov_y,
                step_y,
                ..
            } => {
                let x_steps = ((interval.1 - interval.0) / step_x + 1.0) as usize;
                let y_steps = (fov_y / step_y + 1.0) as usize;

                (
                    math::linspace(interval.0, interval.1, x_steps),
                    math::linspace(-fov_y / 2.0, fov_y / 2.0, y_steps),
                )
            }
            SweepPattern::Static {
                res_x,
                res_y,
                fov_x,
                fov_y,
            } => {
                // Pixel grid on the frame plane one unit in front of the lens.
                let half_width = (fov_x.to_radians() / 2.0).tan();
                let half_height = (fov_y.to_radians() / 2.0).tan();

                (
                    math::linspace(-half_width, half_width, res_x),
                    math::linspace(half_height, -half_height, res_y),
                )
            }
        };

        let width = x_range.len();
        let height = y_range.len();
        log::info!("Scanning {} rays in frame {frame}", width * height);

        let grid: Vec<(usize, usize)> = (0..width).cartesian_product(0..height).collect();
        let records = grid
            .par_iter()
            .map(|&(index_x, index_y)| {
                let direction = match self.config.sweep {
                    SweepPattern::Rotating { .. } => {
                        let swing = Quat::from_axis_angle(Vec3::Y, x_range[index_x].to_radians())
                            * Quat::from_axis_angle(Vec3::X, y_range[index_y].to_radians());

                        pose.rotation * (swing * Vec3::NEG_Z)
                    }
                    SweepPattern::Static { .. } => {
                        pose.rotation * glam::vec3(x_range[index_x], y_range[index_y], -1.0)
                    }
                };

                self.trace_ray(scene, pose, direction, index_x, index_y)
            })
            .collect::<Result<Vec<_>, ScanError>>()?;

        log::info!(
            "Scanning frame {frame} took {} ms",
            start.elapsed().as_millis()
        );

        Ok(ScanFrame {
            frame,
            width,
            height,
            records,
        })
    }

    fn trace_ray(
        &self,
        scene: &Scene,
        pose: SensorPose,
        direction: Vec3,
        index_x: usize,
        index_y: usize,
    ) -> Result<Option<HitRecord>, ScanError> {
        let config = &self.config;
        let max_range = config.envelope.distance_upper;

        let Some(mut record) = cast_ray(
            scene,
            pose.position,
            direction,
            max_range,
            IOR_AIR,
            false,
            config.max_reflection_depth - 1,
        )?
        else {
            return Ok(None);
        };

        record.pixel = Some((index_x as u32, index_y as u32));

        // Framed sensors report the perpendicular distance to the sensor
        // plane, not the euclidean distance to the hit. Only the distance
        // changes, the location stays.
        if matches!(config.sweep, SweepPattern::Static { .. }) {
            record.distance =
                math::distance_point_to_plane(record.location, pose.position, pose.forward());
        }

        record.category_id = scene.category_id(record.target);
        record.part_id = scene.part_id(record.target, record.face_index);

        if record.was_reflected {
            // Place the point where the sensor believes it to be: the full
            // travelled distance along the outgoing direction.
            record.location = pose.position + direction.normalize() * record.distance;
        }

        let mut rng = rand::rng();

        let mut range_noise = config
            .noise
            .constant
            .map_or(0.0, |constant| noise::constant_offset(&constant, record.distance));

        let minimum_reflectivity = config.envelope.minimum_reflectivity(record.distance);

        let mut reflectivity_delta = 0.0;
        if let Some(rain) = config.weather.rain {
            range_noise += noise::rain_range_noise(&mut rng, rain.rainfall_rate, record.distance);
            reflectivity_delta = noise::rain_reflectivity_delta(rain.rainfall_rate, record.distance);
        }

        let mut reflectivity = record.intensity + reflectivity_delta;

        let mut attenuation = 1.0;
        if let Some(dust) = config.weather.dust {
            match noise::dust_effect(&dust, record.distance, minimum_reflectivity) {
                DustEffect::None => {}
                DustEffect::CloudReturn {
                    distance,
                    intensity,
                } => {
                    record.location = pose.position + direction.normalize() * distance;
                    record.distance = distance;
                    record.intensity = intensity;
                }
                DustEffect::Attenuation(alpha) => attenuation = alpha,
            }
        }

        reflectivity *= attenuation;

        // Too dim for the detector: the return is kept, its intensity is not.
        if reflectivity <= minimum_reflectivity {
            record.intensity = 0.0;
        }

        if let Some(gaussian) = config.noise.gaussian {
            range_noise += noise::gaussian(&mut rng, gaussian.mu, gaussian.sigma);
        }

        if config.noise.any() || config.weather.rain.is_some() {
            // The noisy point moves along the ray, not in a random direction.
            let noise_distance = record.distance + range_noise;
            record.noise_distance = Some(noise_distance);
            record.noise_location = Some(pose.position + direction.normalize() * noise_distance);
        }

        Ok(Some(record))
    }
}

impl Sensor for Lidar {
    fn sense(&self, scene: &Scene, pose: SensorPose) -> Result<ScanFrame, ScanError> {
        self.scan(scene, pose)
    }
}

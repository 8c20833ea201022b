use glam::{Quat, Vec3};
use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    config::SonarConfig,
    math, noise,
    scene::{MaterialResolver, RayCaster, ScanError, Scene, surface_reflectivity},
    sensors::{HitRecord, ScanFrame, Sensor, SensorPose},
};

/// A water-layer boundary in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayerBoundary {
    height: f32,
    speed: f32,
    density: f32,
}

/// Cast one acoustic ray and evaluate the sonar equation at the closest
/// surface. The echo only registers when the received level clears
/// `reception_threshold`; `intensity` is the received level normalized by the
/// emitted one.
#[allow(clippy::too_many_arguments)]
pub fn cast_ray<S>(
    scene: &S,
    origin: Vec3,
    direction: Vec3,
    max_range: f32,
    source_level: f32,
    noise_level: f32,
    directivity_index: f32,
    processing_gain: f32,
    reception_threshold: f32,
) -> Result<Option<HitRecord>, ScanError>
where
    S: RayCaster + MaterialResolver,
{
    let Some(hit) = scene.closest_hit(origin, direction, max_range) else {
        return Ok(None);
    };

    let material = scene.resolve_material(&hit)?;

    let mut record = HitRecord::from(hit);
    record.color = material.color();

    let transmission_loss = 10.0 * record.distance.log10();
    // The surface alpha stands in for the target strength, as the fraction of
    // incident energy returned.
    let target_strength = surface_reflectivity(record.color);

    let received_level = (source_level - 2.0 * transmission_loss - noise_level
        + directivity_index
        + processing_gain)
        * target_strength;

    if received_level > reception_threshold {
        record.intensity = received_level / source_level;
        Ok(Some(record))
    } else {
        Ok(None)
    }
}

/// Side-scan sonar sweeping a port/starboard fan of acoustic rays.
///
/// The fan spans the sensor's local X axis and opens downwards along local
/// `-Y`; orient the pose so the fan faces the sea floor. With a configured
/// water profile each ray is refracted and attenuated at every layer
/// boundary it crosses.
#[derive(Debug, Clone, Default)]
pub struct Sonar {
    pub config: SonarConfig,
}

impl Sonar {
    pub fn new(config: SonarConfig) -> Self {
        Self { config }
    }

    /// One pass at the start of the track.
    pub fn scan(&self, scene: &Scene, pose: SensorPose) -> Result<ScanFrame, ScanError> {
        self.scan_at(scene, pose, 0.0)
    }

    /// One pass, `along_track` units into the survey line. The along-track
    /// distance places flattened hits on the Y axis of the scan plane.
    pub fn scan_at(
        &self,
        scene: &Scene,
        pose: SensorPose,
        along_track: f32,
    ) -> Result<ScanFrame, ScanError> {
        let config = &self.config;
        let start = std::time::Instant::now();

        if pose.position.z > config.surface_height {
            return Err(ScanError::SensorAboveSurface);
        }

        let boundaries: Vec<LayerBoundary> = config
            .water_layers
            .iter()
            .map(|layer| LayerBoundary {
                height: config.surface_height - layer.depth,
                speed: layer.speed,
                density: layer.density,
            })
            .collect();

        // The walk starts at the first boundary below the sensor; without a
        // layer above it the medium at the sensor is unknown. No boundary
        // below at all means refraction cannot occur.
        let first_below = match boundaries
            .iter()
            .position(|boundary| boundary.height < pose.position.z)
        {
            Some(0) => return Err(ScanError::NoLayerAboveSensor),
            other => other,
        };

        let x_range = [-90.0f32, 90.0];
        let y_steps = ((config.fov / 2.0) / config.step + 1.0) as usize;
        let y_range = math::linspace(-89.999, -90.0 + config.fov / 2.0, y_steps);

        let width = x_range.len();
        let height = y_range.len();
        log::info!("Scanning {} sonar rays", width * height);

        let grid: Vec<(usize, usize)> = (0..width).cartesian_product(0..height).collect();
        let records = grid
            .par_iter()
            .map(|&(index_x, index_y)| {
                let swing = Quat::from_axis_angle(Vec3::Y, x_range[index_x].to_radians())
                    * Quat::from_axis_angle(Vec3::X, y_range[index_y].to_radians());
                let direction = (pose.rotation * (swing * Vec3::NEG_Z)).normalize();

                self.trace_ray(
                    scene,
                    pose,
                    direction,
                    x_range[index_x],
                    &boundaries,
                    first_below,
                    along_track,
                )
            })
            .collect::<Result<Vec<_>, ScanError>>()?;

        log::info!("Sonar sweep took {} ms", start.elapsed().as_millis());

        Ok(ScanFrame {
            frame: 0,
            width,
            height,
            records,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn trace_ray(
        &self,
        scene: &Scene,
        pose: SensorPose,
        direction: Vec3,
        fan_side: f32,
        boundaries: &[LayerBoundary],
        first_below: Option<usize>,
        along_track: f32,
    ) -> Result<Option<HitRecord>, ScanError> {
        let config = &self.config;

        let hit = match first_below {
            Some(first) => {
                self.cast_ray_layered(scene, pose.position, direction, boundaries, first)?
            }
            None => cast_ray(
                scene,
                pose.position,
                direction,
                config.max_distance,
                config.source_level,
                config.noise_level,
                config.directivity_index,
                config.processing_gain,
                config.reception_threshold,
            )?,
        };

        let Some(mut record) = hit else {
            return Ok(None);
        };

        record.category_id = scene.category_id(record.target);
        record.part_id = scene.part_id(record.target, record.face_index);

        let mut rng = rand::rng();
        let mut range_noise = config
            .noise
            .constant
            .map_or(0.0, |constant| noise::constant_offset(&constant, record.distance));
        if let Some(gaussian) = config.noise.gaussian {
            range_noise += noise::gaussian(&mut rng, gaussian.mu, gaussian.sigma);
        }

        let noise_distance = record.distance + range_noise;
        record.noise_distance = Some(noise_distance);
        record.noise_location = Some(pose.position + direction * noise_distance);

        if !config.mode_3d {
            // Collapse the fan into one scan plane.
            if config.keep_rotation {
                record.location = glam::vec3(direction.x, direction.y, 0.0).normalize_or_zero()
                    * record.distance
                    + pose.position;
            } else {
                record.location.x = if fan_side > 0.0 {
                    -record.distance
                } else {
                    record.distance
                };
                record.location.y = along_track;
                record.location.z = pose.position.z;
            }
        }

        Ok(Some(record))
    }

    /// Walk the water column from the sensor downwards, casting within each
    /// layer and refracting at every boundary crossed without a hit.
    fn cast_ray_layered(
        &self,
        scene: &Scene,
        origin: Vec3,
        direction: Vec3,
        boundaries: &[LayerBoundary],
        first_below: usize,
    ) -> Result<Option<HitRecord>, ScanError> {
        let config = &self.config;

        // Boundary crossings are ranged with the launch angle; refraction
        // does not update it on later layers.
        let angle = Vec3::NEG_Z.angle_between(direction);

        let mut remaining_distance = config.max_distance;
        let mut remaining_source_level = config.source_level;
        let mut distance_traveled = 0.0;
        let mut old_height = origin.z;
        let mut internal_origin = origin;
        let mut direction = direction;

        for layer_index in first_below..=boundaries.len() {
            // Past the last boundary only the sensor's range limits the ray.
            let new_range = if layer_index == boundaries.len() {
                remaining_distance
            } else {
                let range = (old_height - boundaries[layer_index].height) / angle.cos();
                old_height = boundaries[layer_index].height;
                range
            };

            let hit = cast_ray(
                scene,
                internal_origin,
                direction,
                remaining_distance.min(new_range),
                remaining_source_level,
                config.noise_level,
                config.directivity_index,
                config.processing_gain,
                config.reception_threshold,
            )?;

            if let Some(mut record) = hit {
                // The sub-cast only measured from the layer above; report the
                // whole way down from the sensor.
                record.distance += distance_traveled;
                return Ok(Some(record));
            }

            remaining_distance -= new_range;
            distance_traveled += new_range;

            if remaining_distance < 0.0 || layer_index == boundaries.len() {
                break;
            }

            // Refract at the horizontal boundary between this layer and the
            // one above.
            let normal = Vec3::Z;
            let speed_above = boundaries[layer_index - 1].speed;
            let speed_below = boundaries[layer_index].speed;

            let Some(new_direction) = math::refract(direction, normal, speed_below / speed_above)
            else {
                // Past the critical angle the energy never reaches the next
                // layer.
                break;
            };

            let incident_angle = normal.angle_between(direction);
            let refraction_angle = normal.angle_between(new_direction);

            // Part of the energy reflects off the boundary away from the
            // receiver; carry only the transmitted fraction onwards.
            let density_above = boundaries[layer_index - 1].density;
            let density_below = boundaries[layer_index].density;

            let denominator = density_below * speed_below * incident_angle.cos()
                + density_above * speed_above * refraction_angle.cos();
            let transmission = (4.0
                * density_above
                * speed_above
                * density_below
                * speed_below
                * incident_angle.cos()
                * refraction_angle.cos())
                / (denominator * denominator);

            internal_origin += direction * new_range;
            direction = new_direction;
            remaining_source_level *= transmission;
        }

        Ok(None)
    }
}

impl Sensor for Sonar {
    fn sense(&self, scene: &Scene, pose: SensorPose) -> Result<ScanFrame, ScanError> {
        self.scan(scene, pose)
    }
}

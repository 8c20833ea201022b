use glam::{Quat, Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::scene::{RayHit, ScanError, Scene, TargetId};

pub mod lidar;
pub mod sonar;

/// World-space pose of a sensor. The sensor looks along its local `-Z` axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for SensorPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl SensorPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// The sensor's zero direction in world space.
    #[inline]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }
}

/// One measured return.
///
/// `distance` is the total path length reported along the original ray
/// direction, even when the physical path bent through mirrors, glass or
/// water layers; consumers treat the record as a straight-line return.
#[derive(Debug, Clone, PartialEq)]
pub struct HitRecord {
    pub location: Vec3,
    pub normal: Vec3,
    pub face_index: usize,
    pub distance: f32,
    pub target: TargetId,
    /// RGBA of the surface; alpha doubles as reflectivity.
    pub color: Vec4,
    pub intensity: f32,
    pub noise_location: Option<Vec3>,
    pub noise_distance: Option<f32>,
    pub was_reflected: bool,
    /// Grid coordinates of the ray for image-like scans.
    pub pixel: Option<(u32, u32)>,
    pub category_id: Option<u32>,
    pub part_id: Option<u32>,
}

impl From<RayHit> for HitRecord {
    fn from(hit: RayHit) -> Self {
        Self {
            location: hit.location,
            normal: hit.normal,
            face_index: hit.face_index,
            distance: hit.distance,
            target: hit.target,
            color: Vec4::ZERO,
            intensity: 0.0,
            noise_location: None,
            noise_distance: None,
            was_reflected: false,
            pixel: None,
            category_id: None,
            part_id: None,
        }
    }
}

/// One scan pass over the sensor's full grid. `records` holds one slot per
/// ray, indexed `x * height + y`; rays without a return stay `None`.
#[derive(Debug, Clone)]
pub struct ScanFrame {
    pub frame: u32,
    pub width: usize,
    pub height: usize,
    pub records: Vec<Option<HitRecord>>,
}

impl ScanFrame {
    /// All returns of the pass, in ray order.
    pub fn hits(&self) -> impl Iterator<Item = &HitRecord> {
        self.records.iter().flatten()
    }
}

pub trait Sensor {
    /// Sweep the sensor's grid across the scene once.
    fn sense(&self, scene: &Scene, pose: SensorPose) -> Result<ScanFrame, ScanError>;
}

pub mod config;
pub mod fresnel;
pub mod math;
pub mod noise;
pub mod scene;
pub mod sensors;

pub use config::{LidarConfig, SonarConfig};
pub use scene::Scene;
pub use sensors::lidar::Lidar;
pub use sensors::sonar::Sonar;
pub use sensors::{HitRecord, ScanFrame, Sensor, SensorPose};

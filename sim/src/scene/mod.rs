use glam::Vec3;
use rustc_hash::FxHashMap;

pub mod material;
pub mod mesh;

pub use material::{Material, MaterialProperty, MaterialSlot, surface_reflectivity};
pub use mesh::TriangleMesh;

/// Index of a target within the scene it was built into.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TargetId(pub usize);

/// Closest intersection reported by a ray-intersection oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub location: Vec3,
    pub normal: Vec3,
    pub face_index: usize,
    pub distance: f32,
    pub target: TargetId,
}

/// Ray-intersection oracle: the closest surface point within `max_range`
/// across all targets. `direction` does not have to be normalized; reported
/// distances are euclidean.
pub trait RayCaster {
    fn closest_hit(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit>;
}

/// Resolves the surface material at one intersection.
pub trait MaterialResolver {
    fn resolve_material(&self, hit: &RayHit) -> Result<MaterialProperty, ScanError>;
}

#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    #[error("target {0} has no resolvable material for face {1}")]
    UnresolvableMaterial(String, usize),
    #[error("texture sampling on target {0} requires an active UV map")]
    MissingUvMap(String),
    #[error("texture on target {0} has no pixels")]
    EmptyTexture(String),
    #[error("target {name} maps {mapped} faces to materials but the mesh has {faces}")]
    FaceMaterialMismatch {
        name: String,
        mapped: usize,
        faces: usize,
    },
    #[error("target {name} references vertex {vertex} but only has {vertices}")]
    InvalidFaceIndex {
        name: String,
        vertex: u32,
        vertices: usize,
    },
    #[error("unknown target index {0}")]
    UnknownTarget(usize),
    #[error("at least one water layer must lie above the sensor")]
    NoLayerAboveSensor,
    #[error("sensor is above the water surface")]
    SensorAboveSurface,
}

/// One scannable object: a mesh with material slots and segmentation labels.
#[derive(Debug, Clone)]
pub struct Target {
    pub name: String,
    /// Top-level segmentation label, e.g. "chair". Defaults to the name.
    pub category: String,
    /// Child-level segmentation label, e.g. "leg". Falls back to the name of
    /// the material on the hit face when absent.
    pub part: Option<String>,
    pub mesh: TriangleMesh,
    pub materials: Vec<MaterialSlot>,
    /// Material slot index per face.
    pub face_materials: Vec<usize>,
}

impl Target {
    /// A target with a single material applied to every face.
    pub fn new(name: impl Into<String>, mesh: TriangleMesh, material: Material) -> Self {
        let name = name.into();
        let face_count = mesh.faces.len();

        Self {
            category: name.clone(),
            part: None,
            materials: vec![MaterialSlot {
                name: format!("{name}-material"),
                material,
            }],
            face_materials: vec![0; face_count],
            mesh,
            name,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_part(mut self, part: impl Into<String>) -> Self {
        self.part = Some(part.into());
        self
    }

    /// Replace the material table with explicit slots and a per-face mapping.
    pub fn with_materials(mut self, materials: Vec<MaterialSlot>, face_materials: Vec<usize>) -> Self {
        self.materials = materials;
        self.face_materials = face_materials;
        self
    }
}

/// All scannable geometry plus interned segmentation identifiers.
///
/// Implements both oracle traits the tracers consume; tests are free to swap
/// in synthetic implementations instead.
#[derive(Debug, Clone)]
pub struct Scene {
    targets: Vec<Target>,
    category_ids: FxHashMap<String, u32>,
    part_ids: FxHashMap<String, u32>,
}

impl Scene {
    /// Validate targets and intern category/part identifiers. Targets without
    /// any material are skipped, as they cannot produce a return.
    pub fn build(targets: Vec<Target>) -> Result<Self, ScanError> {
        let mut kept = Vec::with_capacity(targets.len());

        for target in targets {
            if target.materials.is_empty() {
                log::warn!("no material set for target {}, skipping", target.name);
                continue;
            }

            if target.face_materials.len() != target.mesh.faces.len() {
                return Err(ScanError::FaceMaterialMismatch {
                    name: target.name,
                    mapped: target.face_materials.len(),
                    faces: target.mesh.faces.len(),
                });
            }

            let vertices = target.mesh.vertices.len();
            for face in &target.mesh.faces {
                for &vertex in face {
                    if vertex as usize >= vertices {
                        return Err(ScanError::InvalidFaceIndex {
                            name: target.name,
                            vertex,
                            vertices,
                        });
                    }
                }
            }

            kept.push(target);
        }

        let mut category_ids = FxHashMap::default();
        let mut part_ids = FxHashMap::default();

        for target in &kept {
            let next = category_ids.len() as u32;
            category_ids.entry(target.category.clone()).or_insert(next);

            if let Some(part) = &target.part {
                let next = part_ids.len() as u32;
                part_ids.entry(part.clone()).or_insert(next);
            }
        }

        // Material names are part identifiers too, as the fallback for
        // targets without an explicit part label.
        for target in &kept {
            for slot in &target.materials {
                let next = part_ids.len() as u32;
                part_ids.entry(slot.name.clone()).or_insert(next);
            }
        }

        Ok(Self {
            targets: kept,
            category_ids,
            part_ids,
        })
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.get(id.0)
    }

    pub fn category_ids(&self) -> &FxHashMap<String, u32> {
        &self.category_ids
    }

    pub fn part_ids(&self) -> &FxHashMap<String, u32> {
        &self.part_ids
    }

    pub fn category_id(&self, id: TargetId) -> Option<u32> {
        let target = self.targets.get(id.0)?;
        self.category_ids.get(&target.category).copied()
    }

    pub fn part_id(&self, id: TargetId, face_index: usize) -> Option<u32> {
        let target = self.targets.get(id.0)?;

        match &target.part {
            Some(part) => self.part_ids.get(part).copied(),
            None => {
                let slot = *target.face_materials.get(face_index)?;
                let name = &target.materials.get(slot)?.name;
                self.part_ids.get(name).copied()
            }
        }
    }
}

impl RayCaster for Scene {
    fn closest_hit(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();

        let mut closest = None;
        let mut closest_distance = max_range;

        // Each target is only searched up to the current closest distance,
        // geometry further away can never win.
        for (index, target) in self.targets.iter().enumerate() {
            if let Some(hit) = target.mesh.closest_hit(origin, direction, closest_distance) {
                closest_distance = hit.distance;
                closest = Some(RayHit {
                    location: hit.location,
                    normal: hit.normal,
                    face_index: hit.face_index,
                    distance: hit.distance,
                    target: TargetId(index),
                });
            }
        }

        closest
    }
}

impl MaterialResolver for Scene {
    fn resolve_material(&self, hit: &RayHit) -> Result<MaterialProperty, ScanError> {
        let target = self
            .targets
            .get(hit.target.0)
            .ok_or(ScanError::UnknownTarget(hit.target.0))?;

        let slot = *target
            .face_materials
            .get(hit.face_index)
            .ok_or_else(|| ScanError::UnresolvableMaterial(target.name.clone(), hit.face_index))?;
        let slot = target
            .materials
            .get(slot)
            .ok_or_else(|| ScanError::UnresolvableMaterial(target.name.clone(), hit.face_index))?;

        match &slot.material {
            Material::Opaque { color, metallic } => Ok(MaterialProperty::Opaque {
                color: *color,
                metallic: *metallic,
            }),
            Material::Glass { color, ior } => Ok(MaterialProperty::Glass {
                color: *color,
                ior: *ior,
            }),
            Material::Textured { texture, metallic } => {
                let uv = target
                    .mesh
                    .uv_at(hit.face_index, hit.location)
                    .ok_or_else(|| ScanError::MissingUvMap(target.name.clone()))?;
                let color = material::sample_nearest(texture, uv)
                    .ok_or_else(|| ScanError::EmptyTexture(target.name.clone()))?;

                Ok(MaterialProperty::Textured {
                    color,
                    metallic: *metallic,
                })
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn wall(name: &str, z: f32) -> Target {
        Target::new(
            name,
            TriangleMesh::quad([
                glam::vec3(-5., -5., z),
                glam::vec3(5., -5., z),
                glam::vec3(5., 5., z),
                glam::vec3(-5., 5., z),
            ]),
            Material::Opaque {
                color: glam::vec4(1., 1., 1., 1.),
                metallic: 0.,
            },
        )
    }

    #[test]
    fn closest_hit_wins_across_targets() {
        let scene = Scene::build(vec![wall("far", -20.), wall("near", -10.)]).unwrap();

        let hit = scene
            .closest_hit(glam::Vec3::ZERO, glam::vec3(0., 0., -1.), 100.)
            .unwrap();

        assert_eq!(hit.target, TargetId(1));
        assert_eq!(scene.target(hit.target).unwrap().name, "near");
    }

    #[test]
    fn categories_and_parts_are_interned_densely() {
        let scene = Scene::build(vec![
            wall("a", -10.).with_category("wall"),
            wall("b", -20.).with_category("wall").with_part("back"),
            wall("c", -30.),
        ])
        .unwrap();

        assert_eq!(scene.category_id(TargetId(0)), Some(0));
        assert_eq!(scene.category_id(TargetId(1)), Some(0));
        assert_eq!(scene.category_id(TargetId(2)), Some(1));

        // Explicit part on b; a and c fall back to their material names.
        assert_eq!(scene.part_id(TargetId(1), 0), Some(0));
        assert_ne!(scene.part_id(TargetId(0), 0), scene.part_id(TargetId(2), 0));
    }

    #[test]
    fn targets_without_materials_are_skipped() {
        let mut bare = wall("bare", -10.);
        bare.materials.clear();
        bare.face_materials.clear();

        let scene = Scene::build(vec![bare]).unwrap();
        assert!(scene.targets().is_empty());
    }

    #[test]
    fn mismatched_face_mapping_is_rejected() {
        let mut broken = wall("broken", -10.);
        broken.face_materials.pop();

        assert!(matches!(
            Scene::build(vec![broken]),
            Err(ScanError::FaceMaterialMismatch { .. })
        ));
    }

    #[test]
    fn textured_target_resolves_the_pixel_under_the_hit() {
        let mut texture = image::RgbaImage::new(2, 2);
        texture.put_pixel(0, 0, image::Rgba([255, 0, 0, 255]));
        texture.put_pixel(1, 0, image::Rgba([0, 255, 0, 255]));
        texture.put_pixel(0, 1, image::Rgba([0, 0, 255, 255]));
        texture.put_pixel(1, 1, image::Rgba([255, 255, 0, 255]));

        let mut target = wall("papered", -10.);
        target.materials[0].material = Material::Textured {
            texture: std::sync::Arc::new(texture),
            metallic: 0.,
        };
        target.mesh.uvs = Some(vec![
            glam::vec2(0., 0.),
            glam::vec2(1., 0.),
            glam::vec2(1., 1.),
            glam::vec2(0., 1.),
        ]);
        let scene = Scene::build(vec![target]).unwrap();

        // A hit near the first corner of the quad lands on the (0, 0) texel.
        let hit = scene
            .closest_hit(glam::vec3(-4., -4.5, 0.), glam::vec3(0., 0., -1.), 100.)
            .unwrap();

        let property = scene.resolve_material(&hit).unwrap();
        assert_eq!(
            property,
            MaterialProperty::Textured {
                color: glam::vec4(1., 0., 0., 1.),
                metallic: 0.,
            }
        );
    }

    #[test]
    fn textured_target_without_uvs_fails_to_resolve() {
        let mut target = wall("papered", -10.);
        target.materials[0].material = Material::Textured {
            texture: std::sync::Arc::new(image::RgbaImage::new(2, 2)),
            metallic: 0.,
        };
        let scene = Scene::build(vec![target]).unwrap();

        let hit = scene
            .closest_hit(glam::Vec3::ZERO, glam::vec3(0., 0., -1.), 100.)
            .unwrap();

        assert!(matches!(
            scene.resolve_material(&hit),
            Err(ScanError::MissingUvMap(_))
        ));
    }
}

use glam::{Vec2, Vec4};
use image::RgbaImage;
use std::sync::Arc;

/// Surface description attached to a material slot of a target.
///
/// The alpha channel of a color doubles as the surface reflectivity: the
/// fraction of incident energy a perfectly aligned return would carry.
#[derive(Debug, Clone)]
pub enum Material {
    Opaque {
        color: Vec4,
        /// `1.0` makes the surface a perfect mirror.
        metallic: f32,
    },
    Glass {
        color: Vec4,
        /// Index of refraction, must be positive.
        ior: f32,
    },
    Textured {
        texture: Arc<RgbaImage>,
        metallic: f32,
    },
}

/// A named material slot. The name doubles as the fallback part identifier
/// for segmentation when a target declares none.
#[derive(Debug, Clone)]
pub struct MaterialSlot {
    pub name: String,
    pub material: Material,
}

/// Material resolved at one intersection point. For [`Material::Textured`]
/// the color has already been sampled at the hit's UV coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MaterialProperty {
    Opaque { color: Vec4, metallic: f32 },
    Glass { color: Vec4, ior: f32 },
    Textured { color: Vec4, metallic: f32 },
}

impl MaterialProperty {
    #[inline]
    pub fn color(&self) -> Vec4 {
        match *self {
            MaterialProperty::Opaque { color, .. }
            | MaterialProperty::Glass { color, .. }
            | MaterialProperty::Textured { color, .. } => color,
        }
    }

    #[inline]
    pub fn reflectivity(&self) -> f32 {
        surface_reflectivity(self.color())
    }
}

/// Alpha channel as surface reflectivity.
#[inline]
pub fn surface_reflectivity(color: Vec4) -> f32 {
    color.w
}

/// Sample the nearest pixel at a UV coordinate, wrapping coordinates outside
/// `[0, 1)` to the other side. `None` if the image has no pixels.
pub fn sample_nearest(texture: &RgbaImage, uv: Vec2) -> Option<Vec4> {
    let (width, height) = texture.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let u = uv.x.rem_euclid(1.0);
    let v = uv.y.rem_euclid(1.0);
    let x = (u * (width - 1) as f32).round() as u32;
    let y = (v * (height - 1) as f32).round() as u32;

    let pixel = texture.get_pixel(x, y);
    Some(Vec4::new(
        pixel[0] as f32 / 255.0,
        pixel[1] as f32 / 255.0,
        pixel[2] as f32 / 255.0,
        pixel[3] as f32 / 255.0,
    ))
}

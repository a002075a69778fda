//! Primitive shapes: circles, oriented rectangles, the field, obstacles
//!
//! Fish sub-shapes are fixed-size point arrays; everything here is a
//! plain value type so nothing is shared between rebuilds.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::{FIELD_HEIGHT, FIELD_WIDTH};
use crate::{heading, left_normal};

/// Four-point convex sub-shape
pub type Quad = [Vec3; 4];
/// Three-point convex sub-shape
pub type Triangle = [Vec3; 3];

/// A circle in the x/z plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: Vec3,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Whether two circles overlap (touching does not count)
    #[inline]
    pub fn overlaps(&self, other: &Circle) -> bool {
        let reach = self.radius + other.radius;
        self.center.distance_squared(other.center) < reach * reach
    }
}

/// Oriented rectangle (center, half extents along its own axes, rotation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub center: Vec3,
    /// Half extent along the rectangle's local x axis
    pub half_length: f32,
    /// Half extent along the rectangle's local z axis
    pub half_width: f32,
    /// Rotation of the local x axis (radians)
    #[serde(default)]
    pub rotation: f32,
}

impl Rect {
    pub fn axis_aligned(center: Vec3, half_length: f32, half_width: f32) -> Self {
        Self {
            center,
            half_length,
            half_width,
            rotation: 0.0,
        }
    }

    /// Corners in winding order
    pub fn corners(&self) -> Quad {
        let along = heading(self.rotation) * self.half_length;
        let across = left_normal(self.rotation) * self.half_width;
        [
            self.center + along + across,
            self.center - along + across,
            self.center - along - across,
            self.center + along - across,
        ]
    }
}

/// Rectangular playing field centered on the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field {
    /// Extent along x (mm)
    pub width: f32,
    /// Extent along z (mm)
    pub height: f32,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
        }
    }
}

impl Field {
    #[inline]
    pub fn half_width(&self) -> f32 {
        self.width / 2.0
    }

    #[inline]
    pub fn half_height(&self) -> f32 {
        self.height / 2.0
    }

    pub fn contains(&self, point: Vec3) -> bool {
        point.x.abs() <= self.half_width() && point.z.abs() <= self.half_height()
    }
}

/// Static obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Obstacle {
    Rect(Rect),
    Circle(Circle),
}

impl Obstacle {
    pub fn center(&self) -> Vec3 {
        match self {
            Obstacle::Rect(rect) => rect.center,
            Obstacle::Circle(circle) => circle.center,
        }
    }

    /// Circle enclosing the obstacle (broad-phase rejection)
    pub fn bounds(&self) -> Circle {
        match self {
            Obstacle::Rect(rect) => Circle::new(
                rect.center,
                (rect.half_length * rect.half_length + rect.half_width * rect.half_width).sqrt(),
            ),
            Obstacle::Circle(circle) => *circle,
        }
    }
}

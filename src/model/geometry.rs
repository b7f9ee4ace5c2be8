//! Footprints, the reference unit and scale-independent fractions.

use serde::{Deserialize, Serialize};
use crate::{Error, Result};

/// Axis-aligned bounding box of a candidate shape, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Footprint {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn left(&self) -> i32 { self.x }

    /// Exclusive right edge, saturating at the coordinate range.
    pub fn right(&self) -> i32 { self.x.saturating_add(self.width) }

    pub fn top(&self) -> i32 { self.y }

    /// Exclusive bottom edge, saturating at the coordinate range.
    pub fn bottom(&self) -> i32 { self.y.saturating_add(self.height) }

    /// Width and height are both non-negative.
    pub fn is_well_formed(&self) -> bool {
        self.width >= 0 && self.height >= 0
    }

    pub fn center_x(&self) -> f64 {
        self.x as f64 + self.width as f64 / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y as f64 + self.height as f64 / 2.0
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    /// Overlapping region, if the two boxes share any pixel.
    pub fn intersection(&self, other: &Footprint) -> Option<Footprint> {
        let left = self.left().max(other.left());
        let right = self.right().min(other.right());
        let top = self.top().max(other.top());
        let bottom = self.bottom().min(other.bottom());
        if left < right && top < bottom {
            Some(Footprint::new(left, top, right.saturating_sub(left), bottom.saturating_sub(top)))
        } else {
            None
        }
    }

    /// Intersection area divided by the smaller of the two areas.
    pub fn overlap_ratio(&self, other: &Footprint) -> f64 {
        let smaller = self.area().min(other.area());
        match self.intersection(other) {
            Some(common) if smaller > 0 => common.area() as f64 / smaller as f64,
            _ => 0.0,
        }
    }
}

/// A distance expressed as a fraction of the interline.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fraction(pub f64);

impl Fraction {
    pub fn value(self) -> f64 { self.0 }
}

impl std::fmt::Display for Fraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} il", self.0)
    }
}

/// The reference unit supplied by staff calibration: pixels per interline.
///
/// Read-only for the whole life of a page graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    interline: f64,
}

impl Scale {
    pub fn new(interline: f64) -> Result<Self> {
        if !interline.is_finite() || interline <= 0.0 {
            return Err(Error::InvalidGeometry(format!(
                "interline must be a positive number, got {interline}"
            )));
        }
        Ok(Self { interline })
    }

    pub fn interline(&self) -> f64 { self.interline }

    /// Pixel distance → interline fraction.
    pub fn to_fraction(&self, pixels: f64) -> f64 {
        pixels / self.interline
    }

    /// Interline fraction → pixel distance.
    pub fn to_pixels(&self, fraction: Fraction) -> f64 {
        fraction.0 * self.interline
    }
}

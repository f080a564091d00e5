//! Planar vectors, rectangles and playfield bounds.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Sub, SubAssign};

/// 2D vector in playfield units
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn distance_squared(self, other: Vec2) -> f32 {
        (self - other).length_squared()
    }

    #[inline]
    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or `None` for a zero vector
    #[inline]
    pub fn normalized(self) -> Option<Vec2> {
        let len = self.length();
        if len > f32::EPSILON {
            Some(self / len)
        } else {
            None
        }
    }

    /// Scale down to `max` length if longer
    #[inline]
    pub fn clamp_length(self, max: f32) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq > max * max && len_sq > 0.0 {
            self * (max / len_sq.sqrt())
        } else {
            self
        }
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    #[inline]
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f32> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x / rhs, self.y / rhs)
    }
}

/// Axis-aligned rectangle with integer-snapped origin, used for collisions
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    /// Rectangle of `size` at the floor of `position`
    pub fn at(position: Vec2, size: Vec2) -> Self {
        Self {
            x: position.x.floor(),
            y: position.y.floor(),
            w: size.x,
            h: size.y,
        }
    }

    /// Strict overlap; rectangles that only share an edge do not collide.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && other.x < self.x + self.w
            && self.y < other.y + other.h
            && other.y < self.y + self.h
    }
}

/// Playable area; entity positions are top-left corners.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Largest valid top-left corner for an entity of `size`
    #[inline]
    pub fn max_corner(&self, size: Vec2) -> Vec2 {
        Vec2::new((self.width - size.x).max(0.0), (self.height - size.y).max(0.0))
    }

    /// Clamp a top-left position so the entity stays fully inside
    #[inline]
    pub fn clamp(&self, position: Vec2, size: Vec2) -> Vec2 {
        let max = self.max_corner(size);
        let x = if position.x.is_finite() { position.x } else { 0.0 };
        let y = if position.y.is_finite() { position.y } else { 0.0 };
        Vec2::new(x.clamp(0.0, max.x), y.clamp(0.0, max.y))
    }

    #[inline]
    pub fn contains(&self, position: Vec2, size: Vec2) -> bool {
        let max = self.max_corner(size);
        (0.0..=max.x).contains(&position.x) && (0.0..=max.y).contains(&position.y)
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }

    /// Uniform random top-left position for an entity of `size`
    pub fn random_position<R: Rng + ?Sized>(&self, size: Vec2, rng: &mut R) -> Vec2 {
        let max = self.max_corner(size);
        Vec2::new(rng.gen::<f32>() * max.x, rng.gen::<f32>() * max.y)
    }
}

/// Uniform offset in `[-range_x, range_x] x [-range_y, range_y]`
pub fn jitter<R: Rng + ?Sized>(range_x: f32, range_y: f32, rng: &mut R) -> Vec2 {
    Vec2::new(
        (rng.gen::<f32>() * 2.0 - 1.0) * range_x,
        (rng.gen::<f32>() * 2.0 - 1.0) * range_y,
    )
}

/// Random unit vector
pub fn random_unit<R: Rng + ?Sized>(rng: &mut R) -> Vec2 {
    let angle = rng.gen::<f32>() * std::f32::consts::TAU;
    Vec2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized() {
        let v = Vec2::new(3.0, 4.0).normalized().unwrap();
        assert!((v.length() - 1.0).abs() < 1e-6);
        assert!(Vec2::ZERO.normalized().is_none());
    }

    #[test]
    fn test_rect_overlap_is_strict() {
        let a = Rect::at(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0));
        let b = Rect::at(Vec2::new(10.0, 0.0), Vec2::new(10.0, 10.0));
        let c = Rect::at(Vec2::new(9.5, 9.5), Vec2::new(10.0, 10.0));

        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::new(100.0, 50.0);
        let size = Vec2::new(10.0, 10.0);

        assert_eq!(bounds.clamp(Vec2::new(-5.0, 70.0), size), Vec2::new(0.0, 40.0));
        assert_eq!(bounds.clamp(Vec2::new(f32::NAN, 5.0), size), Vec2::new(0.0, 5.0));
        assert!(bounds.contains(Vec2::new(90.0, 40.0), size));
        assert!(!bounds.contains(Vec2::new(91.0, 40.0), size));
    }

    #[test]
    fn test_random_position_inside() {
        use rand::SeedableRng;
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(9);
        let bounds = Bounds::new(200.0, 100.0);
        let size = Vec2::new(20.0, 20.0);

        for _ in 0..200 {
            assert!(bounds.contains(bounds.random_position(size, &mut rng), size));
            let offset = jitter(5.0, 3.0, &mut rng);
            assert!(offset.x.abs() <= 5.0 && offset.y.abs() <= 3.0);
        }
        assert!((random_unit(&mut rng).length() - 1.0).abs() < 1e-5);
    }
}

//! 2D vector math for ball kinematics

use std::ops::{Add, Mul};

/// Immutable 2D vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

const DIAGONAL: f64 = std::f64::consts::FRAC_1_SQRT_2;

impl Vector2 {
    pub const NE: Vector2 = Vector2::new(DIAGONAL, -DIAGONAL);
    pub const NW: Vector2 = Vector2::new(-DIAGONAL, -DIAGONAL);
    pub const SE: Vector2 = Vector2::new(DIAGONAL, DIAGONAL);
    pub const SW: Vector2 = Vector2::new(-DIAGONAL, DIAGONAL);

    /// Unit diagonals the ball may travel along after a reset.
    /// Y grows downwards, so "north" is negative Y.
    pub const DIRECTIONS: [Vector2; 4] = [Self::NE, Self::NW, Self::SE, Self::SW];

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn scale(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Negate the horizontal component
    pub fn mirror_x(self) -> Self {
        Self::new(-self.x, self.y)
    }

    /// Negate the vertical component
    pub fn mirror_y(self) -> Self {
        Self::new(self.x, -self.y)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Mul<f64> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f64) -> Vector2 {
        self.scale(rhs)
    }
}

//! Three-axis vector used for calibration statistics
//!
//! Operations mutate in place and return `&mut Self` so the statistics in
//! [`crate::sensors::calibration`] read as short chains.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn reset(&mut self) -> &mut Self {
        *self = Self::ZERO;
        self
    }

    pub fn set(&mut self, other: Vector3) -> &mut Self {
        *self = other;
        self
    }

    pub fn add(&mut self, other: Vector3) -> &mut Self {
        self.x += other.x;
        self.y += other.y;
        self.z += other.z;
        self
    }

    pub fn subtract(&mut self, other: Vector3) -> &mut Self {
        self.x -= other.x;
        self.y -= other.y;
        self.z -= other.z;
        self
    }

    pub fn square(&mut self) -> &mut Self {
        self.x *= self.x;
        self.y *= self.y;
        self.z *= self.z;
        self
    }

    pub fn sqrt(&mut self) -> &mut Self {
        self.x = self.x.sqrt();
        self.y = self.y.sqrt();
        self.z = self.z.sqrt();
        self
    }

    pub fn scale(&mut self, factor: f64) -> &mut Self {
        self.x *= factor;
        self.y *= factor;
        self.z *= factor;
        self
    }

    pub fn divide(&mut self, divisor: f64) -> &mut Self {
        self.x /= divisor;
        self.y /= divisor;
        self.z /= divisor;
        self
    }

    /// Clamps every component to be at least zero (guards `sqrt` against rounding noise)
    pub fn clamp_non_negative(&mut self) -> &mut Self {
        self.x = self.x.max(0.0);
        self.y = self.y.max(0.0);
        self.z = self.z.max(0.0);
        self
    }

    pub fn squared(self) -> Vector3 {
        let mut v = self;
        v.square();
        v
    }

    /// Parses the persisted `"x,y,z"` text form, falling back to zero on any malformation
    pub fn parse_or_zero(text: &str) -> Vector3 {
        text.parse().unwrap_or(Vector3::ZERO)
    }
}

impl From<[f64; 3]> for Vector3 {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl From<Vector3> for [f64; 3] {
    fn from(v: Vector3) -> Self {
        [v.x, v.y, v.z]
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.8},{:.8},{:.8}", self.x, self.y, self.z)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum VectorParseError {
    #[error("Expected 3 components, found {0}")]
    ComponentCount(usize),

    #[error("Invalid component '{0}'")]
    InvalidComponent(String),
}

impl FromStr for Vector3 {
    type Err = VectorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return Err(VectorParseError::ComponentCount(parts.len()));
        }

        let mut values = [0.0; 3];
        for (value, part) in values.iter_mut().zip(&parts) {
            *value = part
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| VectorParseError::InvalidComponent(part.to_string()))?;
        }
        Ok(Vector3::from(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_operations_mutate_in_place() {
        let mut v = Vector3::new(1.0, 4.0, 9.0);
        v.sqrt().scale(2.0).subtract(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(v, Vector3::new(1.0, 3.0, 5.0));
    }

    #[test]
    fn text_form_uses_eight_decimals() {
        let v = Vector3::new(0.5, -1.25, 3.0);
        assert_eq!(v.to_string(), "0.50000000,-1.25000000,3.00000000");
        assert_eq!(v.to_string().parse::<Vector3>(), Ok(v));
    }

    #[test]
    fn malformed_text_falls_back_to_zero() {
        assert_eq!(Vector3::parse_or_zero(""), Vector3::ZERO);
        assert_eq!(Vector3::parse_or_zero("1,2"), Vector3::ZERO);
        assert_eq!(Vector3::parse_or_zero("1,abc,3"), Vector3::ZERO);
        assert_eq!(Vector3::parse_or_zero("1,NaN,3"), Vector3::ZERO);
        assert_eq!(Vector3::parse_or_zero(" 1, 2 ,3"), Vector3::new(1.0, 2.0, 3.0));
    }
}

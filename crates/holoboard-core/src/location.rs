use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A world name plus a 3D coordinate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub world: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(world: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            world: world.into(),
            x,
            y,
            z,
        }
    }

    /// Whether the location points into a world at all
    pub fn has_world(&self) -> bool {
        !self.world.trim().is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {}, {})", self.world, self.x, self.y, self.z)
    }
}

/// Parses the compact `world:x,y,z` form used on the admin surface.
impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidCommand(format!("expected world:x,y,z, got '{s}'"));

        let (world, coords) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        let parts: Vec<f64> = coords
            .split(',')
            .map(|part| part.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match parts.as_slice() {
            [x, y, z] if !world.trim().is_empty() => Ok(Self::new(world.trim(), *x, *y, *z)),
            _ => Err(invalid()),
        }
    }
}

use std::io::{self, Write};

use crate::error::HeatError;
use crate::grid::GridState;

/// Temperature range mapped onto the colour ramp.
pub const COLOR_RANGE: (f64, f64) = (0.0, 100.0);

/// A 2D cut through the grid at `z = size_z / 2`, sampled with
/// [`GridState::read`]. Row-major in `y`, so `values[y * width + x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct MidPlane {
    pub width: usize,
    pub height: usize,
    pub z: usize,
    pub values: Vec<f64>,
}

impl MidPlane {
    pub fn z(grid: &GridState) -> Result<Self, HeatError> {
        let dims = grid.dims();
        let z = dims.z / 2;
        let mut values = Vec::with_capacity(dims.x * dims.y);
        for y in 0..dims.y {
            for x in 0..dims.x {
                values.push(grid.read(x, y, z)?);
            }
        }
        Ok(MidPlane {
            width: dims.x,
            height: dims.y,
            z,
            values,
        })
    }

    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        (x < self.width && y < self.height).then(|| self.values[y * self.width + x])
    }

    /// Packed RGB triples in row order.
    pub fn to_rgb(&self) -> Vec<u8> {
        self.values
            .iter()
            .flat_map(|&t| {
                let (r, g, b) = temperature_to_rgb(t);
                [r, g, b]
            })
            .collect()
    }

    /// Binary PPM (`P6`): header `P6\n{width} {height}\n255\n`, then
    /// [`to_rgb`](Self::to_rgb).
    pub fn write_ppm<W: Write>(&self, mut out: W) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        out.write_all(&self.to_rgb())
    }
}

/// Blue (cold) to red (hot), clamped to [`COLOR_RANGE`]. NaN maps to cold.
pub fn temperature_to_rgb(temperature: f64) -> (u8, u8, u8) {
    let (low, high) = COLOR_RANGE;
    let level = (255.0 * (temperature - low) / (high - low)).floor();
    let level = if level.is_nan() { 0.0 } else { level.clamp(0.0, 255.0) };
    let c = level as u8;
    (c, 0, 255 - c)
}

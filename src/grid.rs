use crate::config::{self, SimulationParams};
use crate::error::{Axis, HeatError};

pub const BOUNDARY_TEMPERATURE: f64 = 300.0; // fixed Dirichlet faces
pub const INLET_TEMPERATURE: f64 = 100.0; // x == 0 face
pub const INITIAL_TEMPERATURE: f64 = 0.0; // true interior at t = 0

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dims {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl Dims {
    /// Total cell count, `None` if it does not fit in `usize`.
    pub fn checked_len(&self) -> Option<usize> {
        self.x.checked_mul(self.y)?.checked_mul(self.z)
    }

    /// Cells in one `x` plane.
    pub fn plane(&self) -> usize {
        self.y * self.z
    }

    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (x * self.y + y) * self.z + z
    }

    /// Interior cells exist only when every axis has at least 3 cells.
    pub fn has_interior(&self) -> bool {
        self.x >= 3 && self.y >= 3 && self.z >= 3
    }

    /// `x` planes updated by the stencil, `1..=x-2`.
    pub fn interior_x(&self) -> std::ops::Range<usize> {
        if self.has_interior() {
            1..self.x - 1
        } else {
            1..1
        }
    }

    pub fn is_boundary(&self, x: usize, y: usize, z: usize) -> bool {
        x == self.x - 1 || y == 0 || y == self.y - 1 || z == 0 || z == self.z - 1
    }

    /// Value a cell holds at construction.
    pub fn initial_value(&self, x: usize, y: usize, z: usize) -> f64 {
        if self.is_boundary(x, y, z) {
            BOUNDARY_TEMPERATURE
        } else if x == 0 {
            INLET_TEMPERATURE
        } else {
            INITIAL_TEMPERATURE
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Physics {
    pub alpha: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub dt: f64,
}

/// Temperature field of one simulation run.
///
/// `current` holds the state, `next` receives the stencil output of a step
/// before the scheduler commits its interior back into `current`. Layout is
/// x-major, `(x * size_y + y) * size_z + z`, so each `x` value owns one
/// contiguous plane and slabs along `x` are contiguous sub-slices.
#[derive(Clone, Debug)]
pub struct GridState {
    dims: Dims,
    physics: Physics,
    steps: usize,
    current: Vec<f64>,
    next: Vec<f64>,
    #[cfg(test)]
    pub(crate) fault: Option<crate::schedulers::Fault>,
}

fn checked_size(axis: Axis, value: i64) -> Result<usize, HeatError> {
    if value < 1 {
        return Err(HeatError::InvalidDimension { axis, value });
    }
    usize::try_from(value).map_err(|_| HeatError::InvalidDimension { axis, value })
}

// capacity overflow and allocator refusal both come back as `None`
fn zeroed(len: usize) -> Option<Vec<f64>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).ok()?;
    buffer.resize(len, 0.0);
    Some(buffer)
}

impl GridState {
    /// Validates the request, allocates both buffers and applies the
    /// boundary/initial policy to `current`. `next` starts at zero.
    pub fn new(params: &SimulationParams) -> Result<Self, HeatError> {
        let dims = Dims {
            x: checked_size(Axis::X, params.size_x)?,
            y: checked_size(Axis::Y, params.size_y)?,
            z: checked_size(Axis::Z, params.size_z)?,
        };
        if params.steps < 0 {
            return Err(HeatError::InvalidStepCount(params.steps));
        }
        let steps = usize::try_from(params.steps).map_err(|_| HeatError::InvalidStepCount(params.steps))?;
        let too_large = || HeatError::GridTooLarge {
            dims: (dims.x, dims.y, dims.z),
        };
        let len = dims.checked_len().ok_or_else(too_large)?;
        let current = zeroed(len).ok_or_else(too_large)?;
        let next = zeroed(len).ok_or_else(too_large)?;

        let mut grid = GridState {
            dims,
            physics: Physics {
                alpha: params.alpha,
                dx: params.dx,
                dy: params.dy,
                dz: params.dz,
                dt: params.dt,
            },
            steps,
            current,
            next,
            #[cfg(test)]
            fault: None,
        };
        grid.reset();
        Ok(grid)
    }

    /// Re-applies the initial/boundary policy to `current` and clears `next`.
    pub fn reset(&mut self) {
        let dims = self.dims;
        for x in 0..dims.x {
            for y in 0..dims.y {
                for z in 0..dims.z {
                    self.current[dims.index(x, y, z)] = dims.initial_value(x, y, z);
                }
            }
        }
        self.next.fill(0.0);
    }

    /// Temperature at `(x, y, z)` in the current state.
    pub fn read(&self, x: usize, y: usize, z: usize) -> Result<f64, HeatError> {
        let dims = self.dims;
        if x >= dims.x || y >= dims.y || z >= dims.z {
            return Err(HeatError::OutOfRange {
                x,
                y,
                z,
                dims: (dims.x, dims.y, dims.z),
            });
        }
        Ok(self.current[dims.index(x, y, z)])
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn has_interior(&self) -> bool {
        self.dims.has_interior()
    }

    /// Flat view of the current state, in layout order.
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// See [`config::stability_number`].
    pub fn stability_number(&self) -> f64 {
        let p = &self.physics;
        config::stability_number(p.alpha, p.dt, p.dx, p.dy, p.dz)
    }

    pub fn is_stable(&self) -> bool {
        self.stability_number() <= config::STABILITY_LIMIT
    }

    /// `(current, next)` for the schedulers.
    pub(crate) fn buffers_mut(&mut self) -> (&mut [f64], &mut [f64]) {
        (&mut self.current, &mut self.next)
    }
}

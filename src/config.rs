use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SIZE: i64 = 100; // cells per axis
pub const DEFAULT_STEPS: i64 = 1000;
pub const DEFAULT_ALPHA: f64 = 0.5; // diffusivity
pub const DEFAULT_SPACING: f64 = 1.0; // physical length of one cell
pub const DEFAULT_DT: f64 = 0.1;
/// Largest stability number for which the explicit 3D scheme stays bounded.
pub const STABILITY_LIMIT: f64 = 1.0 / 6.0;

/// `alpha*dt*(1/dx² + 1/dy² + 1/dz²)`, advisory only.
pub fn stability_number(alpha: f64, dt: f64, dx: f64, dy: f64, dz: f64) -> f64 {
    alpha * dt * (1.0 / (dx * dx) + 1.0 / (dy * dy) + 1.0 / (dz * dz))
}

/// Parameters of one simulation request.
///
/// Sizes and steps are signed so that malformed requests can be rejected by
/// [`GridState::new`](crate::grid::GridState::new) instead of wrapping.
/// JSON keys follow the request names (`sizeX`, `alpha`, `dt`, ...).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationParams {
    pub size_x: i64,
    pub size_y: i64,
    pub size_z: i64,
    pub alpha: f64,
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub dt: f64,
    pub steps: i64,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            size_x: DEFAULT_SIZE,
            size_y: DEFAULT_SIZE,
            size_z: DEFAULT_SIZE,
            alpha: DEFAULT_ALPHA,
            dx: DEFAULT_SPACING,
            dy: DEFAULT_SPACING,
            dz: DEFAULT_SPACING,
            dt: DEFAULT_DT,
            steps: DEFAULT_STEPS,
        }
    }
}

impl SimulationParams {
    /// Cube of `size` cells per side with default physics.
    pub fn cube(size: i64, steps: i64) -> Self {
        SimulationParams {
            size_x: size,
            size_y: size,
            size_z: size,
            steps,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, size_x: i64, size_y: i64, size_z: i64) -> Self {
        self.size_x = size_x;
        self.size_y = size_y;
        self.size_z = size_z;
        self
    }

    pub fn with_spacing(mut self, dx: f64, dy: f64, dz: f64) -> Self {
        self.dx = dx;
        self.dy = dy;
        self.dz = dz;
        self
    }

    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_steps(mut self, steps: i64) -> Self {
        self.steps = steps;
        self
    }

    /// See [`crate::config::stability_number`]. Nothing enforces [`STABILITY_LIMIT`].
    pub fn stability_number(&self) -> f64 {
        stability_number(self.alpha, self.dt, self.dx, self.dy, self.dz)
    }

    pub fn is_stable(&self) -> bool {
        self.stability_number() <= STABILITY_LIMIT
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let params = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(params)
    }
}

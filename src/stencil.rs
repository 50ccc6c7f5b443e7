use crate::grid::Physics;

/*
  7-point FTCS stencil

  next = T + alpha*dt*(d²T/dx² + d²T/dy² + d²T/dz²)

  Every scheduler goes through `update_plane`, so the sequential and the
  parallel paths execute the same floating point operations in the same
  order and produce bit-identical grids.
*/

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StencilKernel {
    factor: f64, // alpha * dt
    dx2: f64,
    dy2: f64,
    dz2: f64,
}

impl StencilKernel {
    pub fn new(physics: &Physics) -> Self {
        StencilKernel {
            factor: physics.alpha * physics.dt,
            dx2: physics.dx * physics.dx,
            dy2: physics.dy * physics.dy,
            dz2: physics.dz * physics.dz,
        }
    }

    /// Next value of one cell from itself and its six axis neighbours,
    /// given as `(minus, plus)` pairs per axis.
    #[inline(always)]
    pub fn update(&self, center: f64, x: (f64, f64), y: (f64, f64), z: (f64, f64)) -> f64 {
        let d_tx = (x.1 - 2.0 * center + x.0) / self.dx2;
        let d_ty = (y.1 - 2.0 * center + y.0) / self.dy2;
        let d_tz = (z.1 - 2.0 * center + z.0) / self.dz2;
        center + self.factor * (d_tx + d_ty + d_tz)
    }

    /// Applies the stencil to every interior `(y, z)` cell of one `x` plane.
    ///
    /// `prev`, `here` and `next` are the planes at `x-1`, `x` and `x+1`, each
    /// `ny * nz` long. Only interior cells of `out` are written.
    pub fn update_plane(
        &self,
        prev: &[f64],
        here: &[f64],
        next: &[f64],
        out: &mut [f64],
        ny: usize,
        nz: usize,
    ) {
        if ny < 3 || nz < 3 {
            return;
        }
        for y in 1..ny - 1 {
            for z in 1..nz - 1 {
                let idx = y * nz + z;
                out[idx] = self.update(
                    here[idx],
                    (prev[idx], next[idx]),
                    (here[idx - nz], here[idx + nz]),
                    (here[idx - 1], here[idx + 1]),
                );
            }
        }
    }
}

/// Copies the interior `(y, z)` cells of one plane; boundary cells of `dst`
/// are left alone.
pub fn commit_plane(src: &[f64], dst: &mut [f64], ny: usize, nz: usize) {
    if ny < 3 || nz < 3 {
        return;
    }
    for y in 1..ny - 1 {
        let row = y * nz;
        dst[row + 1..row + nz - 1].copy_from_slice(&src[row + 1..row + nz - 1]);
    }
}

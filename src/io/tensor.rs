// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Tensor I/O: the encoder's output shape for the learner, a flat row-major
//! `(Y, X)` `f64` buffer per plane, mirroring the `Matrix` type's own
//! flat-buffer-plus-shape representation rather than pulling in a tensor
//! crate the teacher never depended on.

use std::io::{self, Write};

use crate::matrix::Matrix;

#[derive(Debug, Clone)]
pub struct Tensor {
    pub width: usize,
    pub height: usize,
    /// Row-major `(y, x)` values, length `width * height`.
    pub data: Vec<f64>,
}

impl Tensor {
    /// Extract plane `z` of a `(X, Y, Z)` `Matrix` as a row-major `(Y, X)`
    /// tensor.
    pub fn from_matrix_plane(matrix: &Matrix, z: usize) -> Self {
        let shape = matrix.shape();
        let mut data = Vec::with_capacity(shape.x * shape.y);
        for y in 0..shape.y {
            for x in 0..shape.x {
                data.push(matrix.get(x, y, z));
            }
        }
        Tensor {
            width: shape.x,
            height: shape.y,
            data,
        }
    }

    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }
}

/// The encoder's per-stack output: horizontal and vertical normalized cost
/// maps, each `[0.0, 1.0]`.
#[derive(Debug, Clone)]
pub struct TensorPair {
    pub horizontal: Tensor,
    pub vertical: Tensor,
}

impl TensorPair {
    pub fn from_matrices(horizontal: &Matrix, vertical: &Matrix) -> Self {
        TensorPair {
            horizontal: Tensor::from_matrix_plane(horizontal, 0),
            vertical: Tensor::from_matrix_plane(vertical, 0),
        }
    }

    /// Serialize as `width, height` (little-endian `u64`) followed by the
    /// horizontal plane's row-major `f64` data, then the vertical plane's,
    /// matching the project file's own length-prefixed-field convention
    /// (`config::parse_project_file`) rather than pulling in a tensor/array
    /// serialization crate the teacher never depended on.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        w.write_all(&(self.horizontal.width as u64).to_le_bytes())?;
        w.write_all(&(self.horizontal.height as u64).to_le_bytes())?;
        for v in &self.horizontal.data {
            w.write_all(&v.to_le_bytes())?;
        }
        for v in &self.vertical.data {
            w.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Shape;

    #[test]
    fn extracts_row_major_plane() {
        let mut m = Matrix::new(Shape::new(2, 3, 1), 0.0);
        m.set(1, 2, 0, 5.0);
        let t = Tensor::from_matrix_plane(&m, 0);
        assert_eq!(t.width, 2);
        assert_eq!(t.height, 3);
        assert_eq!(t.get(1, 2), 5.0);
        assert_eq!(t.data.len(), 6);
    }

    #[test]
    fn write_to_encodes_shape_then_both_planes() {
        let h = Matrix::new(Shape::new(2, 1, 1), 0.25);
        let v = Matrix::new(Shape::new(2, 1, 1), 0.75);
        let pair = TensorPair::from_matrices(&h, &v);
        let mut buf = Vec::new();
        pair.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 8 + 8 + 2 * 8 + 2 * 8);
        let width = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        assert_eq!(width, 2);
        let first_h = f64::from_le_bytes(buf[16..24].try_into().unwrap());
        assert_eq!(first_h, 0.25);
    }
}

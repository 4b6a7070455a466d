//! Point cloud frames
//!
//! `RawFrame` is what the decoder hands to the converter; `RenderableFrame` is
//! what the converter hands to the frame cache and, by copy, to the renderer.

use serde::{Deserialize, Serialize};

/// 3D position, single precision
pub type Position = [f32; 3];

/// A single decoded LiDAR return
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RawPoint {
    /// Cartesian position (sensor frame)
    pub position: Position,

    /// Laser intensity reading
    pub intensity: f32,

    /// Laser ring number
    pub ring: u16,
}

impl RawPoint {
    pub fn new(x: f32, y: f32, z: f32, intensity: f32, ring: u16) -> Self {
        Self {
            position: [x, y, z],
            intensity,
            ring,
        }
    }

    /// True when none of x, y, z is NaN or infinite
    #[inline]
    pub fn has_finite_position(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
    }
}

/// Decoded point cloud message, prior to filtering
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawFrame {
    /// Source timestamp (microseconds)
    pub utime: i64,

    /// Points in wire order
    pub points: Vec<RawPoint>,
}

impl RawFrame {
    pub fn new(utime: i64, points: Vec<RawPoint>) -> Self {
        Self { utime, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Vertex cell list: one drawable primitive per point.
///
/// Stored in the packed legacy layout used by VTK-style cell arrays, where
/// every cell is written as `[npts, id]`. For vertex cells `npts` is always 1
/// and `id` is the index of the point the cell draws.
#[derive(Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VertexCells {
    packed: Vec<i64>,
}

impl Clone for VertexCells {
    fn clone(&self) -> Self {
        Self {
            packed: self.packed.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.packed.clone_from(&source.packed);
    }
}

impl VertexCells {
    /// Build cells `0..count`, one point each.
    pub fn with_count(count: usize) -> Self {
        let mut packed = Vec::with_capacity(count * 2);
        for i in 0..count {
            packed.push(1);
            packed.push(i as i64);
        }
        Self { packed }
    }

    /// Number of cells
    #[inline]
    pub fn len(&self) -> usize {
        self.packed.len() / 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.packed.is_empty()
    }

    /// Point index referenced by each cell, in cell order
    pub fn point_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.packed.chunks_exact(2).map(|cell| cell[1])
    }

    /// Packed `[1, id, 1, id, ...]` array
    pub fn as_packed(&self) -> &[i64] {
        &self.packed
    }

    pub fn clear(&mut self) {
        self.packed.clear();
    }
}

/// Filtered point cloud ready for display.
///
/// Positions, attribute arrays and vertex cells are parallel: entry `i` of
/// every array describes the same point, and cell `i` draws point `i`.
#[derive(Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct RenderableFrame {
    /// Point positions
    pub positions: Vec<Position>,

    /// `"intensity"` attribute array
    pub intensity: Vec<f32>,

    /// `"ring"` attribute array, widened from the 16-bit wire value
    pub ring: Vec<u32>,

    /// One vertex cell per point
    pub verts: VertexCells,
}

// Hand-written so `clone_from` reuses the destination's buffers.
impl Clone for RenderableFrame {
    fn clone(&self) -> Self {
        Self {
            positions: self.positions.clone(),
            intensity: self.intensity.clone(),
            ring: self.ring.clone(),
            verts: self.verts.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.positions.clone_from(&source.positions);
        self.intensity.clone_from(&source.intensity);
        self.ring.clone_from(&source.ring);
        self.verts.clone_from(&source.verts);
    }
}

impl RenderableFrame {
    /// Empty frame, used as the cache placeholder before the first publish
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pre-sized empty frame for `capacity` points
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            positions: Vec::with_capacity(capacity),
            intensity: Vec::with_capacity(capacity),
            ring: Vec::with_capacity(capacity),
            verts: VertexCells::default(),
        }
    }

    /// Number of points
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// All four parts describe the same number of points
    pub fn is_consistent(&self) -> bool {
        let n = self.positions.len();
        self.intensity.len() == n && self.ring.len() == n && self.verts.len() == n
    }

    /// Drop all points, keeping allocations
    pub fn clear(&mut self) {
        self.positions.clear();
        self.intensity.clear();
        self.ring.clear();
        self.verts.clear();
    }

    /// Positions as a flat `x, y, z, x, y, z, ...` byte buffer (native endian)
    pub fn position_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.positions.as_slice())
    }
}

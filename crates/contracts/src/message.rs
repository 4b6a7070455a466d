//! PointCloudMessage - wire-level point cloud
//!
//! Self-describing point cloud as carried on the transport: a flat byte blob
//! plus the field table needed to interpret it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Scalar type of a point field.
///
/// Codes match the `sensor_msgs/PointField` datatype constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PointFieldType {
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Float32 = 7,
    Float64 = 8,
}

impl PointFieldType {
    /// Parse a wire datatype code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Int8),
            2 => Some(Self::Uint8),
            3 => Some(Self::Int16),
            4 => Some(Self::Uint16),
            5 => Some(Self::Int32),
            6 => Some(Self::Uint32),
            7 => Some(Self::Float32),
            8 => Some(Self::Float64),
            _ => None,
        }
    }

    /// Wire datatype code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Size of one element in bytes
    pub fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Int32 | Self::Uint32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }
}

/// Layout of one named field inside a point record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointField {
    /// Field name (e.g. "x", "intensity", "ring")
    pub name: String,

    /// Byte offset from the start of the point record
    pub offset: u32,

    /// Element type
    pub datatype: PointFieldType,

    /// Number of elements
    pub count: u32,
}

impl PointField {
    pub fn new(name: impl Into<String>, offset: u32, datatype: PointFieldType) -> Self {
        Self {
            name: name.into(),
            offset,
            datatype,
            count: 1,
        }
    }

    /// Offset one past the last byte of this field
    pub fn end(&self) -> usize {
        self.offset as usize + self.datatype.size() * self.count.max(1) as usize
    }
}

/// Point cloud message as decoded from the transport
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointCloudMessage {
    /// Source timestamp (microseconds)
    pub utime: i64,

    /// Coordinate frame name
    pub frame_id: String,

    /// Rows (1 for unorganized clouds)
    pub height: u32,

    /// Points per row
    pub width: u32,

    /// Field table
    pub fields: Vec<PointField>,

    /// Byte order of `data`
    pub is_bigendian: bool,

    /// Bytes per point record
    pub point_step: u32,

    /// Bytes per row
    pub row_step: u32,

    /// Packed point records
    pub data: Bytes,

    /// True if the cloud is known to contain no invalid points
    pub is_dense: bool,
}

impl PointCloudMessage {
    /// Number of point records described by the header
    pub fn num_points(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&PointField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

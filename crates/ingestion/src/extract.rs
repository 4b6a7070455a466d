//! Field extraction: `PointCloudMessage` -> `RawFrame`

use contracts::{PointCloudMessage, PointField, PointFieldType, RawFrame, RawPoint};

use crate::error::{IngestionError, Result};

/// Read every point record of `msg` into a `RawFrame`.
///
/// `x`, `y` and `z` are required; `intensity` and `ring` default to 0 when the
/// message does not carry them. Values are converted from whatever scalar type
/// the field declares. Points with non-finite coordinates are kept here; they
/// are filtered later by [`convert`](crate::convert).
pub fn to_raw_frame(msg: &PointCloudMessage) -> Result<RawFrame> {
    let point_step = msg.point_step as usize;

    let x = locate(msg, "x", point_step)?;
    let y = locate(msg, "y", point_step)?;
    let z = locate(msg, "z", point_step)?;
    let intensity = locate_optional(msg, "intensity", point_step)?;
    let ring = locate_optional(msg, "ring", point_step)?;

    let width = msg.width as usize;
    let height = msg.height as usize;
    let num_points = width.saturating_mul(height);
    if num_points == 0 {
        return Ok(RawFrame::new(msg.utime, Vec::new()));
    }

    let row_len = width.saturating_mul(point_step);
    // row_step may include padding; never trust it to be smaller than a packed row
    let row_stride = (msg.row_step as usize).max(row_len);
    let expected = (height - 1)
        .saturating_mul(row_stride)
        .saturating_add(row_len);
    if msg.data.len() < expected {
        return Err(IngestionError::ShortData {
            expected,
            actual: msg.data.len(),
        });
    }

    let big_endian = msg.is_bigendian;
    let mut points = Vec::with_capacity(num_points);
    for row in 0..height {
        let row_data = &msg.data[row * row_stride..row * row_stride + row_len];
        for record in row_data.chunks_exact(point_step) {
            let position = [
                x.read(record, big_endian) as f32,
                y.read(record, big_endian) as f32,
                z.read(record, big_endian) as f32,
            ];
            let intensity = intensity.map_or(0.0, |f| f.read(record, big_endian) as f32);
            let ring = ring.map_or(0, |f| f.read(record, big_endian) as u16);
            points.push(RawPoint {
                position,
                intensity,
                ring,
            });
        }
    }

    Ok(RawFrame::new(msg.utime, points))
}

/// Where to find a scalar inside a point record
#[derive(Debug, Clone, Copy)]
struct FieldReader {
    offset: usize,
    datatype: PointFieldType,
}

impl FieldReader {
    /// Read the first element of the field as f64.
    ///
    /// `record` is always at least `point_step` bytes and the field was
    /// checked to fit inside it.
    fn read(&self, record: &[u8], big_endian: bool) -> f64 {
        let bytes = &record[self.offset..self.offset + self.datatype.size()];
        match self.datatype {
            PointFieldType::Int8 => bytes[0] as i8 as f64,
            PointFieldType::Uint8 => bytes[0] as f64,
            PointFieldType::Int16 => i16::from_ne_bytes(ordered(bytes, big_endian)) as f64,
            PointFieldType::Uint16 => u16::from_ne_bytes(ordered(bytes, big_endian)) as f64,
            PointFieldType::Int32 => i32::from_ne_bytes(ordered(bytes, big_endian)) as f64,
            PointFieldType::Uint32 => u32::from_ne_bytes(ordered(bytes, big_endian)) as f64,
            PointFieldType::Float32 => f32::from_ne_bytes(ordered(bytes, big_endian)) as f64,
            PointFieldType::Float64 => f64::from_ne_bytes(ordered(bytes, big_endian)),
        }
    }
}

/// Copy `bytes` into an array in native order
fn ordered<const N: usize>(bytes: &[u8], big_endian: bool) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    if big_endian != cfg!(target_endian = "big") {
        out.reverse();
    }
    out
}

fn locate(msg: &PointCloudMessage, name: &str, point_step: usize) -> Result<FieldReader> {
    locate_optional(msg, name, point_step)?
        .ok_or_else(|| IngestionError::MissingField(name.to_string()))
}

fn locate_optional(
    msg: &PointCloudMessage,
    name: &str,
    point_step: usize,
) -> Result<Option<FieldReader>> {
    msg.field(name)
        .map(|field| checked_reader(field, point_step))
        .transpose()
}

fn checked_reader(field: &PointField, point_step: usize) -> Result<FieldReader> {
    if field.end() > point_step {
        return Err(IngestionError::FieldOverrun {
            name: field.name.clone(),
            end: field.end(),
            point_step,
        });
    }
    Ok(FieldReader {
        offset: field.offset as usize,
        datatype: field.datatype,
    })
}

//! Point cloud wire codec
//!
//! Big-endian, LCM-style layout:
//!
//! ```text
//! fingerprint    u64
//! utime          i64
//! frame_id       string  (i32 length incl. NUL, bytes, NUL)
//! height, width  i32, i32
//! num_fields     i32
//!   name         string
//!   offset       i32
//!   datatype     i8
//!   count        i32
//! is_bigendian   i8
//! point_step     i32
//! row_step       i32
//! data           i32 length + bytes
//! is_dense       i8
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::{PointCloudMessage, PointField, PointFieldType};

use crate::error::{IngestionError, Result};

/// Type fingerprint written at the start of every point cloud message
pub const POINT_CLOUD_FINGERPRINT: u64 = 0x8c5a_1f0e_3b27_d946;

/// Serialize a message into its wire form
pub fn encode_message(msg: &PointCloudMessage) -> Bytes {
    let fields_len: usize = msg.fields.iter().map(|f| f.name.len() + 14).sum();
    let mut buf = BytesMut::with_capacity(64 + msg.frame_id.len() + fields_len + msg.data.len());

    buf.put_u64(POINT_CLOUD_FINGERPRINT);
    buf.put_i64(msg.utime);
    put_string(&mut buf, &msg.frame_id);
    buf.put_i32(msg.height as i32);
    buf.put_i32(msg.width as i32);

    buf.put_i32(msg.fields.len() as i32);
    for field in &msg.fields {
        put_string(&mut buf, &field.name);
        buf.put_i32(field.offset as i32);
        buf.put_i8(field.datatype.code() as i8);
        buf.put_i32(field.count as i32);
    }

    buf.put_i8(msg.is_bigendian as i8);
    buf.put_i32(msg.point_step as i32);
    buf.put_i32(msg.row_step as i32);
    buf.put_i32(msg.data.len() as i32);
    buf.put_slice(&msg.data);
    buf.put_i8(msg.is_dense as i8);

    buf.freeze()
}

/// Parse a wire payload.
///
/// Never panics on malformed input; every read is bounds-checked.
pub fn decode_message(payload: &[u8]) -> Result<PointCloudMessage> {
    let mut reader = WireReader::new(payload);

    let fingerprint = reader.u64()?;
    if fingerprint != POINT_CLOUD_FINGERPRINT {
        return Err(IngestionError::FingerprintMismatch {
            expected: POINT_CLOUD_FINGERPRINT,
            found: fingerprint,
        });
    }

    let utime = reader.i64()?;
    let frame_id = reader.string("frame_id")?;
    let height = reader.len("height")? as u32;
    let width = reader.len("width")? as u32;

    let num_fields = reader.len("num_fields")?;
    let mut fields = Vec::with_capacity(num_fields.min(16));
    for _ in 0..num_fields {
        let name = reader.string("field name")?;
        let offset = reader.len("field offset")? as u32;
        let code = reader.i8()?;
        let datatype = u8::try_from(code)
            .ok()
            .and_then(PointFieldType::from_code)
            .ok_or_else(|| IngestionError::UnknownDatatype {
                field: name.clone(),
                code,
            })?;
        let count = reader.len("field count")? as u32;
        fields.push(PointField {
            name,
            offset,
            datatype,
            count,
        });
    }

    let is_bigendian = reader.i8()? != 0;
    let point_step = reader.len("point_step")? as u32;
    let row_step = reader.len("row_step")? as u32;
    let data_len = reader.len("data")?;
    let data = Bytes::copy_from_slice(reader.bytes(data_len)?);
    let is_dense = reader.i8()? != 0;

    if reader.remaining() > 0 {
        return Err(IngestionError::TrailingBytes(reader.remaining()));
    }

    Ok(PointCloudMessage {
        utime,
        frame_id,
        height,
        width,
        fields,
        is_bigendian,
        point_step,
        row_step,
        data,
        is_dense,
    })
}

fn put_string(buf: &mut BytesMut, s: &str) {
    buf.put_i32(s.len() as i32 + 1);
    buf.put_slice(s.as_bytes());
    buf.put_u8(0);
}

/// Bounds-checked big-endian reader
struct WireReader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> WireReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if self.buf.remaining() < needed {
            return Err(IngestionError::Truncated {
                offset: self.offset,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    fn u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        self.offset += 8;
        Ok(self.buf.get_u64())
    }

    fn i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        self.offset += 8;
        Ok(self.buf.get_i64())
    }

    fn i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        self.offset += 4;
        Ok(self.buf.get_i32())
    }

    fn i8(&mut self) -> Result<i8> {
        self.ensure(1)?;
        self.offset += 1;
        Ok(self.buf.get_i8())
    }

    /// Non-negative i32 used as a size or count
    fn len(&mut self, what: &'static str) -> Result<usize> {
        let value = self.i32()?;
        usize::try_from(value).map_err(|_| IngestionError::InvalidLength {
            what,
            len: value as i64,
        })
    }

    fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        self.offset += n;
        Ok(head)
    }

    fn string(&mut self, what: &'static str) -> Result<String> {
        let len = self.len(what)?;
        if len == 0 {
            return Err(IngestionError::InvalidLength { what, len: 0 });
        }
        let raw = self.bytes(len)?;
        // Drop the NUL terminator
        let text = &raw[..len - 1];
        std::str::from_utf8(text)
            .map(str::to_owned)
            .map_err(|_| IngestionError::InvalidUtf8 { what })
    }
}

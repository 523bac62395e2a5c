//! Little-endian field readers for the telemetry region

use crate::{Result, TelemetryError};

/// Types that can be read from a fixed offset of the telemetry region.
pub trait Field: Sized {
    /// Width of the encoded value in bytes.
    const WIDTH: usize;

    /// Read this type from `data` at `offset`.
    fn read(data: &[u8], offset: usize) -> Result<Self>;
}

fn window<const N: usize>(data: &[u8], offset: usize) -> Result<[u8; N]> {
    offset
        .checked_add(N)
        .and_then(|end| data.get(offset..end))
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(TelemetryError::Memory { offset, len: N })
}

macro_rules! le_field {
    ($($ty:ty => $width:literal),* $(,)?) => {
        $(
            impl Field for $ty {
                const WIDTH: usize = $width;

                fn read(data: &[u8], offset: usize) -> Result<Self> {
                    Ok(<$ty>::from_le_bytes(window::<$width>(data, offset)?))
                }
            }
        )*
    };
}

le_field!(u32 => 4, i32 => 4, u64 => 8, i64 => 8, f32 => 4, f64 => 8);

impl Field for bool {
    const WIDTH: usize = 1;

    fn read(data: &[u8], offset: usize) -> Result<Self> {
        let [byte] = window::<1>(data, offset)?;
        Ok(byte != 0)
    }
}

/// Read a fixed-length string field.
///
/// The value ends at the first NUL byte (or at `len` when there is none).
/// Invalid UTF-8 sequences are replaced with U+FFFD.
pub fn read_str(data: &[u8], offset: usize, len: usize) -> Result<String> {
    let bytes = offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(TelemetryError::Memory { offset, len })?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

/// Read a speed stored in m/s and return its magnitude in km/h.
pub fn read_speed_kmh(data: &[u8], offset: usize) -> Result<f32> {
    Ok((f32::read(data, offset)? * super::layout::MS_TO_KMH).abs())
}

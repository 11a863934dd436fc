pub mod context;

use serde::{Deserialize, Serialize};

use crate::video::{Image, Video};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorFormat {
    Unknown,
    Rgb444,
    Yuv444,
    #[default]
    Yuv420,
}

pub type VideoOccupancyMap = Video<u8>;
pub type VideoGeometry = Video<u16>;
pub type VideoAttribute = Video<u16>;
pub type ImageOccupancyMap = Image<u8>;

/// Integer ceil of `a / b` for non-negative `a` and positive `b`.
#[inline]
pub(crate) fn ceil_div(a: i64, b: i64) -> i64 {
    (a + b - 1) / b
}

/// Checked conversion of a reconstructed quantity to an unsigned field.
#[inline]
pub(crate) fn to_usize(field: &'static str, value: i64) -> crate::error::Result<usize> {
    usize::try_from(value).map_err(|_| crate::error::Error::OutOfRange { field, value })
}

/// Checked conversion of a coded unsigned field to signed arithmetic.
#[inline]
pub(crate) fn to_i64(field: &'static str, value: usize) -> crate::error::Result<i64> {
    i64::try_from(value).map_err(|_| crate::error::Error::OutOfRange {
        field,
        value: i64::MAX,
    })
}

/// `1 << shift` as a positive `i64`.
#[inline]
pub(crate) fn pow2(field: &'static str, shift: u32) -> crate::error::Result<i64> {
    1i64.checked_shl(shift)
        .filter(|&v| v > 0)
        .ok_or(crate::error::Error::OutOfRange {
            field,
            value: shift as i64,
        })
}

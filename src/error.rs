use thiserror::Error;

use crate::patch::PatchType;
use crate::syntax::TileType;
use crate::video::VideoType;

/// Everything that can abort a decode. There is no local recovery: the first error
/// is propagated to the caller and the whole sequence is abandoned.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown patch type: tile type {tile_type:?}, patch mode {patch_mode}")]
    UnknownPatchType { tile_type: TileType, patch_mode: u8 },

    #[error("patch {index}: data unit does not carry a {patch_type:?} payload")]
    MismatchedDataUnit { index: usize, patch_type: PatchType },

    #[error("reference index {ref_index} is not active for frame afoc {afoc} ({active} active)")]
    ReferenceIndexOutOfRange {
        afoc: usize,
        ref_index: usize,
        active: usize,
    },

    #[error("frame afoc {afoc} cannot predict from afoc {ref_afoc}")]
    ForwardReference { afoc: usize, ref_afoc: i64 },

    #[error("reference frame afoc {0} has not been decoded")]
    MissingReferenceFrame(usize),

    #[error("reference patch {index} out of range, frame afoc {afoc} has {count} patches")]
    ReferencePatchOutOfRange {
        afoc: usize,
        index: i64,
        count: usize,
    },

    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: i64 },

    #[error("point local reconstruction mode {mode} is not in the catalog of {count} modes")]
    UnknownPlrMode { mode: usize, count: usize },

    #[error("point local reconstruction grid {width}x{height} does not match patch size {size_u0}x{size_v0}")]
    PlrGridMismatch {
        width: usize,
        height: usize,
        size_u0: usize,
        size_v0: usize,
    },

    #[error("{0} parameter set {1} not found")]
    MissingParameterSet(&'static str, usize),

    #[error("no {0} video bitstream")]
    MissingVideoBitstream(VideoType),

    #[error("unsupported: {0}")]
    Unsupported(&'static str),

    #[error("video decoding failed: {0}")]
    VideoDecoder(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

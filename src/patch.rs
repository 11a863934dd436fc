use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::syntax::{PatchModeITile, PatchModePTile, TileType};

/// Reconstruction path of one patch data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchType {
    Intra,
    Inter,
    Merge,
    Skip,
    Raw,
    Eom,
    End,
}

impl PatchType {
    pub fn from_tile_type_and_patch_mode(tile_type: TileType, patch_mode: u8) -> Result<Self> {
        let unknown = || Error::UnknownPatchType {
            tile_type,
            patch_mode,
        };
        let patch_type = match tile_type {
            TileType::Skip => PatchType::Skip,
            TileType::P => match PatchModePTile::try_from(patch_mode).map_err(|_| unknown())? {
                PatchModePTile::Skip => PatchType::Skip,
                PatchModePTile::Merge => PatchType::Merge,
                PatchModePTile::Inter => PatchType::Inter,
                PatchModePTile::Intra => PatchType::Intra,
                PatchModePTile::Raw => PatchType::Raw,
                PatchModePTile::Eom => PatchType::Eom,
                PatchModePTile::End => PatchType::End,
            },
            TileType::I => match PatchModeITile::try_from(patch_mode).map_err(|_| unknown())? {
                PatchModeITile::Intra => PatchType::Intra,
                PatchModeITile::Raw => PatchType::Raw,
                PatchModeITile::Eom => PatchType::Eom,
                PatchModeITile::End => PatchType::End,
            },
        };
        Ok(patch_type)
    }
}

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PatchOrientation {
    #[default]
    Default,
    Swap,
    Rot90,
    Rot180,
    Rot270,
    Mirror,
    MRot90,
    MRot180,
    MRot270,
}

/// A regular (projected) patch, as reconstructed by the decoder.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// index in the frame's regular patch list
    pub patch_index: usize,
    pub frame_index: usize,

    /// location in packed image (n * occupancy_resolution)
    pub uv0: (usize, usize),
    /// size of occupancy map (n * occupancy_resolution)
    pub size_uv0: (usize, usize),
    /// exact 2D size, only tracked when the patch size quantizer is on
    pub size_2d_in_pixel: (usize, usize),
    pub occupancy_resolution: usize,

    /// u1: tangential shift
    /// v1: bitangential shift
    pub uv1: (usize, usize),
    /// d1: depth shift
    pub d1: usize,
    /// size for depth, always in 0..=255
    pub size_d: usize,

    pub level_of_detail: (usize, usize),
    /// 0: related to min depth value, 1: related to the max value
    pub projection_mode: u8,
    /// x: normal axis, y: tangent axis, z: bitangent axis
    pub axes: (u8, u8, u8),
    /// rotation axis of a 45 degree projection, 0 when unused
    pub axis_of_additional_plane: u8,
    /// patch orientation in canvas atlas
    pub patch_orientation: PatchOrientation,

    /// index of the matched patch in the reference frame
    pub best_match_idx: Option<usize>,
    pub ref_atlas_frame_idx: Option<usize>,

    pub plr_level: bool,
    pub plr_mode_by_patch: u8,
    /// row-major, size_uv0.0 * size_uv0.1 entries
    pub plr_mode_by_block: Vec<u8>,
}

impl Patch {
    /// Sets normal axis, projection mode and 45 degree rotation axis from a projection id.
    pub(crate) fn set_projection(&mut self, projection_id: u8, projection_45_degree: bool) {
        let (plane, rotation_axis) = if projection_45_degree {
            (projection_id >> 2, projection_id & 0x03)
        } else {
            (projection_id, 0)
        };
        self.projection_mode = if plane < 3 { 0 } else { 1 };
        self.axis_of_additional_plane = rotation_axis;
        self.set_normal_axis(plane % 3);
    }

    fn set_normal_axis(&mut self, normal: u8) {
        self.axes = match normal {
            0 => (0, 2, 1),
            1 => (1, 2, 0),
            _ => (2, 0, 1),
        };
    }

    #[inline]
    pub fn normal_axis(&self) -> u8 {
        self.axes.0
    }

    /// Copies everything but the 2D/3D placement from `reference`.
    pub(crate) fn inherit_projection(&mut self, reference: &Patch) {
        self.projection_mode = reference.projection_mode;
        self.patch_orientation = reference.patch_orientation;
        self.axes = reference.axes;
        self.axis_of_additional_plane = reference.axis_of_additional_plane;
        self.level_of_detail = reference.level_of_detail;
    }

    /// Resets the per-block data to the current block size.
    pub(crate) fn alloc_one_layer_data(&mut self) {
        let block_count = self.size_uv0.0 * self.size_uv0.1;
        self.plr_mode_by_block.clear();
        self.plr_mode_by_block.resize(block_count, 0);
    }

    /// Point local reconstruction mode of block (u0, v0), in patch block units.
    pub fn plr_mode(&self, u0: usize, v0: usize) -> u8 {
        if self.plr_level {
            self.plr_mode_by_patch
        } else {
            self.plr_mode_by_block
                .get(v0 * self.size_uv0.0 + u0)
                .copied()
                .unwrap_or(0)
        }
    }

    /// Maps block (u, v) of the patch to a block index of the canvas, given the
    /// canvas width in blocks.
    pub fn patch_block_to_canvas_block(&self, u: usize, v: usize, canvas_stride: usize) -> usize {
        let (u0, v0) = self.uv0;
        let (size_u0, size_v0) = self.size_uv0;
        let (x, y) = match self.patch_orientation {
            PatchOrientation::Default => (u + u0, v + v0),
            PatchOrientation::Swap => (v + u0, u + v0),
            PatchOrientation::Rot90 => ((size_v0 - 1 - v) + u0, u + v0),
            PatchOrientation::Rot180 => ((size_u0 - 1 - u) + u0, (size_v0 - 1 - v) + v0),
            PatchOrientation::Rot270 => (v + u0, (size_u0 - 1 - u) + v0),
            PatchOrientation::Mirror => ((size_u0 - 1 - u) + u0, v + v0),
            PatchOrientation::MRot90 => ((size_v0 - 1 - v) + u0, (size_u0 - 1 - u) + v0),
            PatchOrientation::MRot180 => (u + u0, (size_v0 - 1 - v) + v0),
            PatchOrientation::MRot270 => (v + u0, u + v0),
        };
        x + canvas_stride * y
    }

    /// Maps pixel (u, v) of the patch to canvas pixel coordinates.
    pub fn patch_to_canvas(&self, u: usize, v: usize) -> (usize, usize) {
        let res = self.occupancy_resolution;
        let (x0, y0) = (self.uv0.0 * res, self.uv0.1 * res);
        let (width, height) = (self.size_uv0.0 * res, self.size_uv0.1 * res);
        match self.patch_orientation {
            PatchOrientation::Default => (x0 + u, y0 + v),
            PatchOrientation::Swap => (x0 + v, y0 + u),
            PatchOrientation::Rot90 => (x0 + (height - 1 - v), y0 + u),
            PatchOrientation::Rot180 => (x0 + (width - 1 - u), y0 + (height - 1 - v)),
            PatchOrientation::Rot270 => (x0 + v, y0 + (width - 1 - u)),
            PatchOrientation::Mirror => (x0 + (width - 1 - u), y0 + v),
            PatchOrientation::MRot90 => (x0 + (height - 1 - v), y0 + (width - 1 - u)),
            PatchOrientation::MRot180 => (x0 + u, y0 + (height - 1 - v)),
            PatchOrientation::MRot270 => (x0 + v, y0 + u),
        }
    }
}

/// Raw points patch: points coded directly, without projection.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPatch {
    pub uv0: (usize, usize),
    pub size_uv0: (usize, usize),
    pub uv1: (usize, usize),
    pub d1: usize,
    pub number_of_raw_points: usize,
    pub occupancy_resolution: usize,
    pub patch_in_auxiliary_video: bool,
}

/// Enhanced occupancy map patch: extra points hidden behind member patches.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EomPatch {
    pub uv0: (usize, usize),
    pub size_uv: (usize, usize),
    pub member_patches: Vec<usize>,
    pub edd_count_per_patch: Vec<usize>,
    /// sum of `edd_count_per_patch`
    pub edd_count: usize,
}

impl EomPatch {
    pub fn new(
        uv0: (usize, usize),
        size_uv: (usize, usize),
        members: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let (member_patches, edd_count_per_patch): (Vec<usize>, Vec<usize>) =
            members.into_iter().unzip();
        let edd_count = edd_count_per_patch.iter().sum();
        Self {
            uv0,
            size_uv,
            member_patches,
            edd_count_per_patch,
            edd_count,
        }
    }
}

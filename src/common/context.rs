use serde::Serialize;

use crate::error::{Error, Result};
use crate::patch::{EomPatch, Patch, RawPatch};
use crate::plr::{build_plr_modes, PointLocalReconstructionMode};
use crate::syntax::{
    AtlasFrameParameterSetRbsp, AtlasSequenceParameterSetRbsp, AtlasSyntax, AtlasTileLayerRbsp,
    NalUnitType, SeiPayload, SeiSmoothingParameters, V3CParameterSet,
};
use crate::video::{VideoBitstream, VideoType};

/// The syntax of one sequence plus everything reconstructed
/// from it.
#[derive(Debug, Default)]
pub struct Context {
    syntax: AtlasSyntax,
    /// Append-only, in decoding order.
    pub(crate) frames: Vec<FrameContext>,
    occupancy_packing_block_size: usize,
    occupancy_precision: usize,
    plr_modes: Vec<PointLocalReconstructionMode>,
}

impl Context {
    pub fn new(syntax: AtlasSyntax) -> Self {
        Self {
            syntax,
            ..Default::default()
        }
    }

    #[inline]
    pub fn syntax(&self) -> &AtlasSyntax {
        &self.syntax
    }

    #[inline]
    pub fn vps(&self) -> &V3CParameterSet {
        &self.syntax.vps
    }

    pub fn atlas_sequence_parameter_set(&self, id: usize) -> Result<&AtlasSequenceParameterSetRbsp> {
        self.syntax
            .atlas_sequence_parameter_sets
            .iter()
            .find(|asps| asps.atlas_sequence_parameter_set_id as usize == id)
            .ok_or(Error::MissingParameterSet("atlas sequence", id))
    }

    pub fn atlas_frame_parameter_set(&self, id: usize) -> Result<&AtlasFrameParameterSetRbsp> {
        self.syntax
            .atlas_frame_parameter_sets
            .iter()
            .find(|afps| afps.atlas_frame_parameter_set_id as usize == id)
            .ok_or(Error::MissingParameterSet("atlas frame", id))
    }

    #[inline]
    pub fn atlas_tile_layers(&self) -> &[AtlasTileLayerRbsp] {
        &self.syntax.atlas_tile_layers
    }

    #[inline]
    pub fn frames(&self) -> &[FrameContext] {
        &self.frames
    }

    pub fn frame_by_afoc(&self, afoc: usize) -> Option<&FrameContext> {
        self.frames.iter().rev().find(|f| f.afoc == afoc)
    }

    pub fn video_bitstream(&self, video_type: VideoType) -> Result<&VideoBitstream> {
        self.syntax
            .video_bitstreams
            .iter()
            .find(|vbs| vbs.video_type == video_type)
            .ok_or(Error::MissingVideoBitstream(video_type))
    }

    /// The prefix smoothing parameters SEI, if any.
    pub fn smoothing_parameters(&self) -> Option<&SeiSmoothingParameters> {
        self.syntax.seis.iter().find_map(|sei| match &sei.payload {
            SeiPayload::SmoothingParameters(sp) if sei.nal_unit_type == NalUnitType::PrefixSei => {
                Some(sp)
            }
            _ => None,
        })
    }

    #[inline]
    pub fn occupancy_packing_block_size(&self) -> usize {
        self.occupancy_packing_block_size
    }

    #[inline]
    pub(crate) fn set_occupancy_packing_block_size(&mut self, size: usize) {
        self.occupancy_packing_block_size = size;
    }

    #[inline]
    pub fn occupancy_precision(&self) -> usize {
        self.occupancy_precision
    }

    #[inline]
    pub(crate) fn set_occupancy_precision(&mut self, precision: usize) {
        self.occupancy_precision = precision;
    }

    #[inline]
    pub fn plr_modes(&self) -> &[PointLocalReconstructionMode] {
        &self.plr_modes
    }

    /// Builds the PLR mode catalog from ASPS 0.
    pub(crate) fn set_point_local_reconstruction(&mut self) -> Result<()> {
        let modes = build_plr_modes(&self.atlas_sequence_parameter_set(0)?.plr_information);
        self.plr_modes = modes;
        Ok(())
    }
}

/// One reconstructed atlas frame.
#[derive(Debug, Default, Clone, Serialize)]
pub struct FrameContext {
    pub index: usize,
    pub afoc: usize,
    pub width: u16,
    pub height: u16,
    pub lossless_geo: bool,
    pub lossless_geo_444: bool,
    pub use_raw_points_separate_video: bool,
    pub raw_patch_enabled_flag: bool,
    /// AFOC of every active reference, by reference index.
    pub ref_afoc_list: Vec<i64>,
    pub log2_patch_quantizer_size: (u8, u8),

    pub patches: Vec<Patch>,
    pub raw_patches: Vec<RawPatch>,
    pub eom_patches: Vec<EomPatch>,
    pub total_number_of_raw_points: usize,

    /// Full resolution occupancy, 0 or 1 per pixel.
    #[serde(skip)]
    pub occupancy_map: Vec<u32>,
    /// Patch index + 1 per packing block, 0 when empty.
    #[serde(skip)]
    pub block_to_patch: Vec<usize>,
}

impl FrameContext {
    #[inline]
    pub fn total_number_of_eom_points(&self) -> usize {
        self.eom_patches.iter().map(|eom| eom.edd_count).sum()
    }
}

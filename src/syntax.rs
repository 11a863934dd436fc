//! Structured atlas syntax, as handed over by the bitstream parser.
//!
//! Field names follow the V3C syntax tables (ISO/IEC 23090-5). Nothing here is read
//! bit by bit: the structs are filled by an external parser, or deserialized from a
//! JSON dump with [`AtlasSyntax::from_file`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::patch::PatchOrientation;
use crate::video::VideoBitstream;

/// Everything the patch reconstruction needs for one atlas of one V3C sequence.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasSyntax {
    pub vps: V3CParameterSet,
    pub atlas_sequence_parameter_sets: Vec<AtlasSequenceParameterSetRbsp>,
    pub atlas_frame_parameter_sets: Vec<AtlasFrameParameterSetRbsp>,
    /// One tile layer per atlas frame, in decoding order.
    pub atlas_tile_layers: Vec<AtlasTileLayerRbsp>,
    pub seis: Vec<SeiRbsp>,
    pub video_bitstreams: Vec<VideoBitstream>,
}

impl AtlasSyntax {
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

/// 8.3.2.1 V3C parameter set (single atlas)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct V3CParameterSet {
    pub v3c_parameter_set_id: u8,
    pub frame_width: u16,
    pub frame_height: u16,
    pub map_count_minus1: u8,
    pub multiple_map_streams_present_flag: bool,
    /// Indexed by map; map 0 is always absolute.
    pub map_absolute_coding_enable_flag: Vec<bool>,
    pub raw_patch_enabled_flag: bool,
    /// Raw points are carried in their own video (auxiliary video).
    pub raw_separate_video_present_flag: bool,
    pub lossless_geo: bool,
    pub lossless_geo_444: bool,
    pub occupancy_information: OccupancyInformation,
    pub geometry_information: GeometryInformation,
    pub attribute_information: AttributeInformation,
}

impl Default for V3CParameterSet {
    fn default() -> Self {
        Self {
            v3c_parameter_set_id: 0,
            frame_width: 0,
            frame_height: 0,
            map_count_minus1: 0,
            multiple_map_streams_present_flag: false,
            map_absolute_coding_enable_flag: vec![true],
            raw_patch_enabled_flag: false,
            raw_separate_video_present_flag: false,
            lossless_geo: false,
            lossless_geo_444: false,
            occupancy_information: OccupancyInformation::default(),
            geometry_information: GeometryInformation::default(),
            attribute_information: AttributeInformation::default(),
        }
    }
}

impl V3CParameterSet {
    pub(crate) fn map_absolute_coding_enabled(&self, map_index: usize) -> bool {
        map_index == 0
            || self
                .map_absolute_coding_enable_flag
                .get(map_index)
                .copied()
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyInformation {
    pub occupancy_codec_id: u8,
    pub lossy_occupancy_map_compression_threshold: u8,
    pub occupancy_nominal_2d_bitdepth_minus1: u8,
    pub occupancy_msb_align_flag: bool,
}

impl Default for OccupancyInformation {
    fn default() -> Self {
        Self {
            occupancy_codec_id: 1,
            lossy_occupancy_map_compression_threshold: 0,
            occupancy_nominal_2d_bitdepth_minus1: 7,
            occupancy_msb_align_flag: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeometryInformation {
    pub geometry_codec_id: u8,
    pub geometry_nominal_2d_bitdepth_minus1: u8,
    pub geometry_msb_align_flag: bool,
    pub geometry_3d_coordinates_bitdepth_minus1: u8,
}

impl Default for GeometryInformation {
    fn default() -> Self {
        Self {
            geometry_codec_id: 1,
            geometry_nominal_2d_bitdepth_minus1: 9,
            geometry_msb_align_flag: false,
            geometry_3d_coordinates_bitdepth_minus1: 9,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeInformation {
    pub attributes: Vec<AttributeInfo>,
}

impl AttributeInformation {
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeInfo {
    pub attribute_type_id: u8,
    pub attribute_codec_id: u8,
    pub attribute_nominal_2d_bitdepth_minus1: u8,
    pub attribute_msb_align_flag: bool,
    pub attribute_dimension_partitions_minus1: u8,
    pub attribute_map_absolute_coding_enabled_flag: bool,
}

impl Default for AttributeInfo {
    fn default() -> Self {
        Self {
            attribute_type_id: 0,
            attribute_codec_id: 1,
            attribute_nominal_2d_bitdepth_minus1: 7,
            attribute_msb_align_flag: false,
            attribute_dimension_partitions_minus1: 0,
            attribute_map_absolute_coding_enabled_flag: true,
        }
    }
}

/// 8.3.6.1.1 Atlas sequence parameter set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasSequenceParameterSetRbsp {
    pub atlas_sequence_parameter_set_id: u8,
    pub frame_width: u16,
    pub frame_height: u16,
    pub log2_patch_packing_block_size: u8,
    pub log2_max_atlas_frame_order_cnt_lsb_minus4: u8,
    pub ref_list_structs: Vec<RefListStruct>,
    pub use_eight_orientations_flag: bool,
    pub patch_size_quantizer_present_flag: bool,
    /// asps_45degree_projection_patch_present_flag
    pub projection_45_degree_patch_present_flag: bool,
    pub normal_axis_limits_quantization_enabled_flag: bool,
    pub normal_axis_max_delta_value_enabled_flag: bool,
    pub remove_duplicate_point_enabled_flag: bool,
    pub pixel_deinterleaving_flag: bool,
    pub raw_patch_enabled_flag: bool,
    pub eom_patch_enabled_flag: bool,
    pub eom_fix_bit_count_minus1: u8,
    /// asps_enhanced_occupancy_map_for_depth_flag
    pub enhanced_occupancy_map_for_depth_flag: bool,
    pub auxiliary_video_enabled_flag: bool,
    pub plr_enabled_flag: bool,
    pub plr_information: PlrInformation,
    pub surface_thickness_minus1: u8,
}

impl Default for AtlasSequenceParameterSetRbsp {
    fn default() -> Self {
        Self {
            atlas_sequence_parameter_set_id: 0,
            frame_width: 0,
            frame_height: 0,
            log2_patch_packing_block_size: 4,
            log2_max_atlas_frame_order_cnt_lsb_minus4: 4,
            ref_list_structs: Vec::new(),
            use_eight_orientations_flag: false,
            patch_size_quantizer_present_flag: false,
            projection_45_degree_patch_present_flag: false,
            normal_axis_limits_quantization_enabled_flag: true,
            normal_axis_max_delta_value_enabled_flag: true,
            remove_duplicate_point_enabled_flag: false,
            pixel_deinterleaving_flag: false,
            raw_patch_enabled_flag: false,
            eom_patch_enabled_flag: false,
            eom_fix_bit_count_minus1: 1,
            enhanced_occupancy_map_for_depth_flag: false,
            auxiliary_video_enabled_flag: false,
            plr_enabled_flag: false,
            plr_information: PlrInformation::default(),
            surface_thickness_minus1: 3,
        }
    }
}

/// Point local reconstruction information. One entry per signalled mode; the
/// implicit mode 0 is not part of the list.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlrInformation {
    pub modes: Vec<PlrModeInformation>,
    pub block_threshold_per_patch_minus1: u8,
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlrModeInformation {
    pub interpolate_flag: bool,
    pub filling_flag: bool,
    pub minimum_depth: u8,
    pub neighbour_minus1: u8,
}

/// 8.3.6.12 Reference list structure (short-term entries only)
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefListStruct {
    pub abs_delta_afoc_st: Vec<u8>,
    /// true: the entry points backwards (to a smaller afoc).
    pub strpf_entry_sign_flag: Vec<bool>,
}

impl RefListStruct {
    pub fn num_ref_entries(&self) -> usize {
        self.abs_delta_afoc_st.len()
    }

    /// Signed afoc distance of entry `i`; the reference afoc is `afoc - delta`.
    pub(crate) fn delta_afoc(&self, i: usize) -> i64 {
        let abs_delta = self.abs_delta_afoc_st[i] as i64;
        if self.strpf_entry_sign_flag.get(i).copied().unwrap_or(true) {
            abs_delta
        } else {
            -abs_delta
        }
    }
}

/// 8.3.6.2 Atlas frame parameter set
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasFrameParameterSetRbsp {
    pub atlas_frame_parameter_set_id: u8,
    pub atlas_sequence_parameter_set_id: u8,
    pub num_ref_idx_default_active_minus1: u8,
    pub raw_3d_offset_bitcount_explicit_mode_flag: bool,
}

/// 8.3.6.9 Atlas tile layer: one tile of one atlas frame.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasTileLayerRbsp {
    pub header: AtlasTileHeader,
    pub data_unit: AtlasTileDataUnit,
}

/// 8.3.6.11 Atlas tile header
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasTileHeader {
    pub atlas_frame_parameter_set_id: u8,
    pub id: u32,
    pub tile_type: TileType,
    pub atlas_frame_order_count_lsb: u32,
    pub ref_atlas_frame_list_sps_flag: bool,
    pub ref_atlas_frame_list_idx: u8,
    /// Used when `ref_atlas_frame_list_sps_flag` is false.
    pub ref_list_struct: RefListStruct,
    pub pos_min_d_quantizer: u8,
    pub pos_delta_max_d_quantizer: u8,
    /// log2 of the patch size quantizer, (x, y)
    pub patch_size_info_quantizer: (u8, u8),
    pub num_ref_idx_active_override_flag: bool,
    pub num_ref_idx_active_minus1: u8,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, TryFromPrimitive, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileType {
    /// Inter atlas tile
    P = 0,
    /// 1: Intra atlas tile
    I,
    /// 2: SKIP atlas tile
    Skip,
}

impl Default for TileType {
    fn default() -> Self {
        TileType::P
    }
}

/// 8.3.7.1 General atlas tile data unit
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasTileDataUnit {
    pub patch_information_data: Vec<PatchInformationData>,
}

#[derive(Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum PatchModeITile {
    /// 0: Non-predicted patch mode
    Intra = 0,
    /// 1: RAW point patch mode
    Raw = 1,
    /// 2: EOM point patch mode
    Eom = 2,
    /// 14: Patch termination mode
    End = 14,
}

#[derive(Debug, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub(crate) enum PatchModePTile {
    /// 0: Patch skip mode
    Skip = 0,
    /// 1: Patch merge mode
    Merge = 1,
    /// 2: Inter predicted patch mode
    Inter = 2,
    /// 3: Non-predicted patch mode
    Intra = 3,
    /// 4: RAW point patch mode
    Raw = 4,
    /// 5: EOM point patch mode
    Eom = 5,
    /// 14: Patch termination mode
    End = 14,
}

/// 8.3.7.2 Patch information data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchInformationData {
    pub patch_mode: u8,
    pub patch_data_unit: PatchDataUnit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PatchDataUnit {
    Intra(IntraPatchDataUnit),
    Inter(InterPatchDataUnit),
    Merge(MergePatchDataUnit),
    Skip,
    Raw(RawPatchDataUnit),
    Eom(EomPatchDataUnit),
    End,
}

/// 8.3.7.3 Patch data unit, used with I_INTRA and P_INTRA.
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntraPatchDataUnit {
    pub pos_2d: (usize, usize),
    /// Delta against the previous patch's size (in pixels when quantized).
    pub delta_size_2d: (i64, i64),
    /// (u, v)
    pub pos_3d: (usize, usize),
    pub pos_3d_min_z: usize,
    pub pos_3d_delta_max_z: usize,
    pub projection_id: u8,
    pub orientation_index: PatchOrientation,
    pub lod_enable_flag: bool,
    pub lod_scale_x_minus1: usize,
    pub lod_scale_y_idc: usize,
    pub plr_data: PlrData,
}

/// 8.3.7.5 Inter patch data unit
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterPatchDataUnit {
    pub ref_index: usize,
    /// Relative to the running prediction index.
    pub ref_patch_index: i64,
    pub pos_2d: (i64, i64),
    pub delta_size_2d: (i64, i64),
    pub pos_3d: (i64, i64),
    pub pos_3d_min_z: i64,
    pub pos_3d_delta_max_z: i64,
    pub plr_data: PlrData,
}

/// 8.3.7.4 Merge patch data unit
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergePatchDataUnit {
    pub ref_index: usize,
    pub override_2d_params_flag: bool,
    pub override_3d_params_flag: bool,
    pub override_plr_flag: bool,
    pub pos_2d: (i64, i64),
    pub delta_size_2d: (i64, i64),
    pub pos_3d: (i64, i64),
    pub pos_3d_min_z: i64,
    pub pos_3d_delta_max_z: i64,
    pub plr_data: PlrData,
}

/// 8.3.7.7 Raw patch data unit
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPatchDataUnit {
    pub patch_in_auxiliary_video_flag: bool,
    pub pos_2d: (usize, usize),
    pub size_2d: (usize, usize),
    /// (x, y, z), scaled unless the explicit bit count mode is on
    pub pos_3d: (usize, usize, usize),
    pub raw_points: usize,
}

/// 8.3.7.8 EOM patch data unit
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EomPatchDataUnit {
    pub patch_in_auxiliary_video_flag: bool,
    pub pos_2d: (usize, usize),
    pub size_2d: (usize, usize),
    pub associated_patches: Vec<usize>,
    /// EOM point count per associated patch
    pub points: Vec<usize>,
}

/// 8.3.7.9 Point local reconstruction data
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlrData {
    pub block_to_patch_map_width: usize,
    pub block_to_patch_map_height: usize,
    pub level_flag: bool,
    pub present_flag: bool,
    pub mode_minus1: u8,
    pub block_present_flag: Vec<bool>,
    pub block_mode_minus1: Vec<u8>,
}

#[derive(Debug, Default, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum NalUnitType {
    #[default]
    PrefixSei,
    SuffixSei,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeiRbsp {
    pub nal_unit_type: NalUnitType,
    pub payload: SeiPayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SeiPayload {
    SmoothingParameters(SeiSmoothingParameters),
}

/// Smoothing parameters SEI
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeiSmoothingParameters {
    pub geometry_smoothing_enabled_flag: bool,
    /// 0: grid smoothing, 1: patch block filtering
    pub geometry_smoothing_id: u8,
    pub geometry_smoothing_grid_size_minus2: u8,
    pub geometry_smoothing_threshold: u8,
    pub geometry_pbf_passes_count_minus1: u8,
    pub geometry_pbf_filter_size_minus1: u8,
    pub geometry_pbf_log2_threshold_minus1: u8,
    pub attribute_updates: Vec<AttributeSmoothingUpdate>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSmoothingUpdate {
    pub attribute_idx: usize,
    /// One entry per attribute dimension.
    pub dimensions: Vec<AttributeSmoothingParams>,
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeSmoothingParams {
    pub enabled_flag: bool,
    pub grid_size_minus2: u8,
    pub threshold: u8,
    pub threshold_difference: u32,
    pub threshold_variation: u32,
    pub local_entropy_threshold: u32,
}

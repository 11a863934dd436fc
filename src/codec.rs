//! Point cloud generation boundary: the parameters handed to a generator, the
//! point set it produces and the generator trait itself.

use cgmath::Vector3;
use serde::Serialize;

use crate::common::context::FrameContext;
use crate::common::{ColorFormat, VideoAttribute, VideoGeometry, VideoOccupancyMap};
use crate::error::Result;

pub type Point3D = Vector3<i16>;
pub type Color3B = Vector3<u8>;
pub type Color16bit = Vector3<u16>;

/// Reconstructed points of one frame.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PointSet3 {
    pub positions: Vec<Point3D>,
    pub colors: Vec<Color3B>,
    pub colors16bit: Vec<Color16bit>,
    /// (patch index, frame index) of every point
    pub point_patch_indexes: Vec<(usize, usize)>,
    pub with_colors: bool,
}

impl PointSet3 {
    #[inline]
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    pub fn add_point(&mut self, position: Point3D, color: Color16bit) {
        self.positions.push(position);
        self.colors16bit.push(color);
        self.colors.push(Color3B::new(0, 0, 0));
    }

    /// Lossless streams carry RGB in 16-bit samples: keep the low byte.
    pub fn copy_colors_16bit_to_8bit(&mut self) {
        self.colors = self
            .colors16bit
            .iter()
            .map(|c| Color3B::new(c.x as u8, c.y as u8, c.z as u8))
            .collect();
        self.with_colors = true;
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PbfParams {
    pub passes_count: u8,
    pub filter_size: u8,
    pub log2_threshold: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct ColorSmoothingParams {
    pub cgrid_size: usize,
    pub threshold_color_smoothing: u64,
    pub threshold_color_difference: u64,
    pub threshold_color_variation: u64,
    pub threshold_local_entropy: u64,
    pub radius2_color_smoothing: u64,
    pub neighbor_count_color_smoothing: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct GeometrySmoothingParams {
    pub grid_size: usize,
    pub threshold_smoothing: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct EomParams {
    pub fix_bitcount: u8,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize)]
pub struct PlrParams {
    pub number_of_modes: usize,
}

/// Everything a [`PointCloudGenerator`] needs besides the frame and its videos.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct GeneratePointCloudParams {
    pub occupancy_resolution: usize,
    pub occupancy_precision: usize,
    pub enable_size_quantization: bool,
    pub raw_point_color_format: ColorFormat,
    pub nb_thread: usize,
    pub multiple_streams: bool,
    pub absolute_d1: bool,
    pub surface_thickness: u8,
    pub threshold_lossy_om: u8,
    /// Set when color smoothing is on
    pub color_smoothing: Option<ColorSmoothingParams>,
    /// Set when grid based geometry smoothing is on
    pub geometry_smoothing: Option<GeometrySmoothingParams>,
    /// Set when enhanced occupancy map coding is on
    pub enhanced_occupancy_map: Option<EomParams>,
    pub remove_duplicate_points: bool,
    pub map_count_minus1: u8,
    pub point_local_reconstruction: Option<PlrParams>,
    pub single_map_pixel_interleaving: bool,
    pub use_additional_points_patch: bool,
    pub use_aux_separate_video: bool,
    pub geometry_bitdepth_3d: u8,
    /// Patch Block Filtering (pbf)
    pub pbf: Option<PbfParams>,
}

impl GeneratePointCloudParams {
    #[inline]
    pub fn flag_geometry_smoothing(&self) -> bool {
        self.geometry_smoothing.is_some() || self.pbf.is_some()
    }
}

/// Decoded and bit-depth converted video of one sequence.
#[derive(Debug, Default, Clone)]
pub struct DecodedVideos {
    pub occupancy: VideoOccupancyMap,
    /// One entry, or one per map when maps are coded in separate streams.
    pub geometry: Vec<VideoGeometry>,
    pub geometry_raw: Option<VideoGeometry>,
    /// Indexed by attribute; inner entries by map when coded separately.
    pub attributes: Vec<Vec<VideoAttribute>>,
    pub attributes_raw: Vec<Option<VideoAttribute>>,
}

/// Rebuilds points from reconstructed patches and decoded video.
///
/// Only [`PointCloudGenerator::generate_point_cloud`] and
/// [`PointCloudGenerator::convert_yuv_to_rgb`] are required; the post-processing
/// stages default to no-ops.
pub trait PointCloudGenerator {
    fn generate_point_cloud(
        &mut self,
        frame: &FrameContext,
        videos: &DecodedVideos,
        params: &GeneratePointCloudParams,
    ) -> Result<PointSet3>;

    fn color_point_cloud(
        &mut self,
        _reconstruct: &mut PointSet3,
        _frame: &FrameContext,
        _videos: &DecodedVideos,
        _params: &GeneratePointCloudParams,
    ) -> Result<()> {
        Ok(())
    }

    /// Grid smoothing followed by a color transfer using `filter`.
    fn smooth_geometry(
        &mut self,
        _reconstruct: &mut PointSet3,
        _params: &GeometrySmoothingParams,
        _filter: u8,
    ) -> Result<()> {
        Ok(())
    }

    fn smooth_color(
        &mut self,
        _reconstruct: &mut PointSet3,
        _params: &ColorSmoothingParams,
    ) -> Result<()> {
        Ok(())
    }

    /// 16-bit YUV444 to 8-bit RGB, for lossy streams.
    fn convert_yuv_to_rgb(&mut self, reconstruct: &mut PointSet3) -> Result<()>;
}

use log::{debug, info, trace};

use crate::codec::{
    ColorSmoothingParams, DecodedVideos, EomParams, GeneratePointCloudParams,
    GeometrySmoothingParams, PbfParams, PlrParams, PointCloudGenerator, PointSet3,
};
use crate::codec_trace;
use crate::common::context::{Context, FrameContext};
use crate::common::{ColorFormat, VideoAttribute, VideoGeometry, VideoOccupancyMap};
use crate::error::{Error, Result};
use crate::occupancy::{
    generate_block_to_patch_from_boundary_box, generate_block_to_patch_from_occupancy_map,
    generate_occupancy_map,
};
use crate::reconstruct::{reconstruct_patch_frame, PatchFrameParams};
use crate::reference::{derive_afoc, ReferenceFrameIndex};
use crate::trace::TraceSink;
use crate::video::{CodecId, Pixel, Video, VideoDecoder, VideoDecoderOptions, VideoType};
use crate::Params;

/// Drives the decode of one V3C sequence.
pub struct Decoder {
    pub params: Params,
}

impl Decoder {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Decodes one sequence: patch frames, then video, then point clouds.
    pub fn decode<V: VideoDecoder, G: PointCloudGenerator>(
        &self,
        context: &mut Context,
        video_decoder: &mut V,
        generator: &mut G,
    ) -> Result<Vec<PointSet3>> {
        self.create_patch_frames(context)?;

        let vps = context.vps();
        let oi = &vps.occupancy_information;
        let asps = context.atlas_sequence_parameter_set(0)?;
        let videos = self.decode_videos(context, video_decoder)?;

        if videos.occupancy.width() == 0 {
            return Err(Error::VideoDecoder("empty occupancy video".into()));
        }
        let occupancy_precision = vps.frame_width as usize / videos.occupancy.width() as usize;
        let threshold = oi.lossy_occupancy_map_compression_threshold;
        let eom_for_depth = asps.enhanced_occupancy_map_for_depth_flag;
        let packing_block_size = context.occupancy_packing_block_size();
        context.set_occupancy_precision(occupancy_precision);

        let gpc_params = self.generate_point_cloud_params(context)?;
        debug!("generate point cloud of {} frames: {:?}", context.frames().len(), gpc_params);
        let pbf_enabled = gpc_params.pbf.is_some();
        let from_occupancy = eom_for_depth && !pbf_enabled;

        let mut frames = std::mem::take(&mut context.frames);
        for frame in frames.iter_mut() {
            if !pbf_enabled {
                // video frames are in decoding order
                let image = videos.occupancy.frames.get(frame.index).ok_or_else(|| {
                    Error::VideoDecoder(format!("no occupancy frame for frame {}", frame.index))
                })?;
                generate_occupancy_map(frame, image, occupancy_precision, threshold)?;
            }
            if from_occupancy {
                generate_block_to_patch_from_occupancy_map(frame, packing_block_size)?;
            } else {
                generate_block_to_patch_from_boundary_box(frame, packing_block_size)?;
            }
        }
        context.frames = frames;

        let lossless = context.vps().lossless_geo;
        let mut reconstructs = Vec::with_capacity(context.frames().len());
        for frame in context.frames() {
            let mut reconstruct = generator.generate_point_cloud(frame, &videos, &gpc_params)?;
            generator.color_point_cloud(&mut reconstruct, frame, &videos, &gpc_params)?;
            if let Some(gs) = &gpc_params.geometry_smoothing {
                generator.smooth_geometry(
                    &mut reconstruct,
                    gs,
                    self.params.postprocess_smoothing_filter,
                )?;
            }
            if let Some(cs) = &gpc_params.color_smoothing {
                generator.smooth_color(&mut reconstruct, cs)?;
            }
            if lossless {
                reconstruct.copy_colors_16bit_to_8bit();
            } else {
                generator.convert_yuv_to_rgb(&mut reconstruct)?;
            }
            trace!(
                "frame {} (afoc {}): {} points",
                frame.index,
                frame.afoc,
                reconstruct.point_count()
            );
            reconstructs.push(reconstruct);
        }
        info!(
            "decoded sequence {}: {} frames",
            context.vps().v3c_parameter_set_id,
            reconstructs.len()
        );
        Ok(reconstructs)
    }

    /// Reconstructs the patches of every atlas frame, in decoding order.
    pub fn create_patch_frames(&self, context: &mut Context) -> Result<()> {
        let mut trace = self.params.trace.open(context.vps().v3c_parameter_set_id)?;
        codec_trace!(trace, "createPatchFrameDataStructure GOP start");

        let log2_packing_block_size = context.atlas_sequence_parameter_set(0)?.log2_patch_packing_block_size;
        context.set_occupancy_packing_block_size(1 << log2_packing_block_size);
        context.set_point_local_reconstruction()?;
        for (i, mode) in context.plr_modes().iter().enumerate() {
            codec_trace!(
                trace,
                "Plrm[{}]: Inter = {} Fill = {} minD1 = {} neighbor = {}",
                i,
                mode.interpolate,
                mode.filling,
                mode.min_d1,
                mode.neighbor
            );
        }

        let tile_count = context.atlas_tile_layers().len();
        codec_trace!(trace, "frameCount = {}", tile_count);
        let mut frames: Vec<FrameContext> = Vec::with_capacity(tile_count);
        let mut prev_afoc = None;
        for index in 0..tile_count {
            let frame = Self::create_patch_frame(context, index, &frames, &mut prev_afoc, trace.as_mut())?;
            frames.push(frame);
        }
        codec_trace!(trace, "createPatchFrameDataStructure GOP done");
        debug!("created {} patch frames", frames.len());
        context.frames = frames;
        Ok(())
    }

    /// Frame setup and patch reconstruction for tile layer `index`.
    fn create_patch_frame(
        context: &Context,
        index: usize,
        decoded: &[FrameContext],
        prev_afoc: &mut Option<(i64, u32)>,
        trace: &mut dyn TraceSink,
    ) -> Result<FrameContext> {
        let vps = context.vps();
        let atgl = &context.atlas_tile_layers()[index];
        let ath = &atgl.header;
        let afps = context.atlas_frame_parameter_set(ath.atlas_frame_parameter_set_id as usize)?;
        let asps =
            context.atlas_sequence_parameter_set(afps.atlas_sequence_parameter_set_id as usize)?;

        let log2_max_lsb = asps.log2_max_atlas_frame_order_cnt_lsb_minus4 as u32 + 4;
        let (afoc_msb, afoc) = derive_afoc(ath.atlas_frame_order_count_lsb, log2_max_lsb, *prev_afoc);
        *prev_afoc = Some((afoc_msb, ath.atlas_frame_order_count_lsb));
        let afoc = usize::try_from(afoc).map_err(|_| Error::OutOfRange {
            field: "atlas_frame_order_count",
            value: afoc,
        })?;
        if decoded.last().map_or(false, |f| f.afoc == afoc) {
            return Err(Error::Unsupported("multiple tiles per atlas frame"));
        }

        let refs = ReferenceFrameIndex::from_tile_header(afoc, index == 0, ath, asps, afps)?;
        codec_trace!(
            trace,
            "createPatchFrameDataStructure Tile {} / frame {} / AFOC {} / type {:?} / refs {:?}",
            ath.id,
            index,
            afoc,
            ath.tile_type,
            refs.ref_afocs()
        );

        let mut frame = FrameContext {
            index,
            afoc,
            width: asps.frame_width,
            height: asps.frame_height,
            lossless_geo: vps.lossless_geo,
            lossless_geo_444: vps.lossless_geo_444,
            use_raw_points_separate_video: vps.raw_separate_video_present_flag
                && asps.auxiliary_video_enabled_flag,
            raw_patch_enabled_flag: asps.raw_patch_enabled_flag,
            ref_afoc_list: refs.ref_afocs().to_vec(),
            log2_patch_quantizer_size: ath.patch_size_info_quantizer,
            ..Default::default()
        };

        let params = PatchFrameParams::new(
            vps,
            asps,
            afps,
            ath,
            context.occupancy_packing_block_size(),
            context.plr_modes(),
        )?;
        reconstruct_patch_frame(
            &mut frame,
            &atgl.data_unit.patch_information_data,
            ath.tile_type,
            &params,
            &refs,
            decoded,
            trace,
        )?;
        Ok(frame)
    }

    fn video_options(&self, context: &Context, codec_id: u8, bitdepth: u8, video_type: VideoType) -> Result<VideoDecoderOptions> {
        let intermediate_path = self.params.keep_intermediate_files.then(|| {
            let stem = self
                .params
                .syntax_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            self.params.syntax_path.with_file_name(format!(
                "{}_dec_GOF{}_{}.bin",
                stem,
                context.vps().v3c_parameter_set_id,
                video_type
            ))
        });
        Ok(VideoDecoderOptions {
            codec_id: CodecId::from_codec_id(codec_id)?,
            bytestream_video_coder: true,
            output_bitdepth: bitdepth,
            intermediate_path,
        })
    }

    fn decode_video<T: Pixel, V: VideoDecoder>(
        &self,
        context: &Context,
        video_decoder: &mut V,
        video_type: VideoType,
        codec_id: u8,
        decoded_bitdepth: u8,
    ) -> Result<Video<T>> {
        let bitstream = context.video_bitstream(video_type)?;
        debug!("*******Video Decoding: {} ******** size: {}", video_type, bitstream.len());
        let opts = self.video_options(context, codec_id, decoded_bitdepth, video_type)?;
        video_decoder.decompress::<T>(bitstream, &opts)
    }

    /// Decodes every video sub-bitstream and converts it to its nominal bit depth.
    fn decode_videos<V: VideoDecoder>(
        &self,
        context: &Context,
        video_decoder: &mut V,
    ) -> Result<DecodedVideos> {
        let vps = context.vps();
        let oi = &vps.occupancy_information;
        let gi = &vps.geometry_information;
        let ai = &vps.attribute_information;
        let map_count = vps.map_count_minus1 as usize + 1;
        let lossy_mpp = !vps.lossless_geo && vps.raw_patch_enabled_flag;
        let raw_separate = vps.raw_patch_enabled_flag && vps.raw_separate_video_present_flag;

        let mut occupancy: VideoOccupancyMap =
            self.decode_video(context, video_decoder, VideoType::Occupancy, oi.occupancy_codec_id, 8)?;
        occupancy.convert_bitdepth(
            8,
            oi.occupancy_nominal_2d_bitdepth_minus1 + 1,
            oi.occupancy_msb_align_flag,
        );

        let geometry_bitdepth = gi.geometry_nominal_2d_bitdepth_minus1 + 1;
        let geometry_types: Vec<VideoType> = if vps.multiple_map_streams_present_flag {
            if lossy_mpp {
                return Err(Error::Unsupported(
                    "lossy raw patches with multiple map streams",
                ));
            }
            (0..map_count).map(|m| VideoType::GeometryD(m as u8)).collect()
        } else {
            vec![VideoType::Geometry]
        };
        let mut geometry = Vec::with_capacity(geometry_types.len());
        for video_type in geometry_types {
            let video: VideoGeometry = self.decode_video(
                context,
                video_decoder,
                video_type,
                gi.geometry_codec_id,
                geometry_bitdepth,
            )?;
            geometry.push(video);
        }

        let geometry_raw = if raw_separate {
            Some(self.decode_video(
                context,
                video_decoder,
                VideoType::GeometryRaw,
                gi.geometry_codec_id,
                geometry_bitdepth,
            )?)
        } else {
            None
        };

        let mut attributes = Vec::with_capacity(ai.attribute_count());
        let mut attributes_raw = Vec::with_capacity(ai.attribute_count());
        for (index, info) in ai.attributes.iter().enumerate() {
            let bitdepth = info.attribute_nominal_2d_bitdepth_minus1 + 1;
            let mut videos = Vec::new();
            let mut raw = None;
            for partition in 0..=info.attribute_dimension_partitions_minus1 {
                trace!(
                    "Attribute AttrIdx = {}, AttrPartIdx = {}, AttributeTypeId = {}",
                    index,
                    partition,
                    info.attribute_type_id
                );
                let maps: Vec<Option<u8>> = if vps.multiple_map_streams_present_flag {
                    (0..map_count).map(|m| Some(m as u8)).collect()
                } else {
                    vec![None]
                };
                for map in maps {
                    let video_type = VideoType::Attribute {
                        index: index as u8,
                        partition,
                        map,
                    };
                    let video: VideoAttribute = self.decode_video(
                        context,
                        video_decoder,
                        video_type,
                        info.attribute_codec_id,
                        bitdepth,
                    )?;
                    videos.push(video);
                }
                if raw_separate {
                    let video_type = VideoType::AttributeRaw {
                        index: index as u8,
                        partition,
                    };
                    raw = Some(self.decode_video(
                        context,
                        video_decoder,
                        video_type,
                        info.attribute_codec_id,
                        bitdepth,
                    )?);
                }
            }
            attributes.push(videos);
            attributes_raw.push(raw);
        }

        Ok(DecodedVideos {
            occupancy,
            geometry,
            geometry_raw,
            attributes,
            attributes_raw,
        })
    }

    /// Gathers the point generation parameters from the parameter sets, the
    /// smoothing SEI and the reconstruction options.
    pub(crate) fn generate_point_cloud_params(
        &self,
        context: &Context,
    ) -> Result<GeneratePointCloudParams> {
        let vps = context.vps();
        let oi = &vps.occupancy_information;
        let gi = &vps.geometry_information;
        let asps = context.atlas_sequence_parameter_set(0)?;
        let opts = &self.params;

        let mut params = GeneratePointCloudParams {
            occupancy_resolution: context.occupancy_packing_block_size(),
            occupancy_precision: context.occupancy_precision(),
            enable_size_quantization: asps.patch_size_quantizer_present_flag,
            raw_point_color_format: if vps.lossless_geo_444 {
                ColorFormat::Yuv444
            } else {
                ColorFormat::Yuv420
            },
            nb_thread: opts.num_threads,
            multiple_streams: vps.multiple_map_streams_present_flag,
            absolute_d1: vps.map_count_minus1 == 0 || vps.map_absolute_coding_enabled(1),
            surface_thickness: asps.surface_thickness_minus1 + 1,
            threshold_lossy_om: oi.lossy_occupancy_map_compression_threshold,
            remove_duplicate_points: opts.duplicated_point_removal_type
                && asps.remove_duplicate_point_enabled_flag,
            map_count_minus1: vps.map_count_minus1,
            point_local_reconstruction: (opts.point_local_reconstruction_type
                && asps.plr_enabled_flag)
                .then(|| PlrParams {
                    number_of_modes: context.plr_modes().len(),
                }),
            single_map_pixel_interleaving: opts.pixel_deinterleaving_type
                && asps.pixel_deinterleaving_flag,
            use_additional_points_patch: opts.reconstruct_raw_type && vps.raw_patch_enabled_flag,
            use_aux_separate_video: asps.auxiliary_video_enabled_flag,
            enhanced_occupancy_map: (opts.reconstruction_eom_type
                && asps.enhanced_occupancy_map_for_depth_flag)
                .then(|| EomParams {
                    fix_bitcount: asps.eom_fix_bit_count_minus1 + 1,
                }),
            geometry_bitdepth_3d: gi.geometry_3d_coordinates_bitdepth_minus1 + 1,
            ..Default::default()
        };

        let Some(sp) = context.smoothing_parameters() else {
            return Ok(params);
        };
        if opts.apply_geo_smoothing_type && sp.geometry_smoothing_enabled_flag {
            match sp.geometry_smoothing_id {
                0 => {
                    params.geometry_smoothing = Some(GeometrySmoothingParams {
                        grid_size: sp.geometry_smoothing_grid_size_minus2 as usize + 2,
                        threshold_smoothing: sp.geometry_smoothing_threshold as u64,
                    })
                }
                1 => {
                    params.pbf = Some(PbfParams {
                        passes_count: sp.geometry_pbf_passes_count_minus1 + 1,
                        filter_size: sp.geometry_pbf_filter_size_minus1 + 1,
                        log2_threshold: sp.geometry_pbf_log2_threshold_minus1 + 1,
                    })
                }
                _ => {}
            }
        }
        if opts.apply_attr_smoothing_type {
            // the last enabled dimension wins
            for update in &sp.attribute_updates {
                for dim in update.dimensions.iter().filter(|d| d.enabled_flag) {
                    params.color_smoothing = Some(ColorSmoothingParams {
                        cgrid_size: dim.grid_size_minus2 as usize + 2,
                        threshold_color_smoothing: dim.threshold as u64,
                        threshold_color_difference: dim.threshold_difference as u64,
                        threshold_color_variation: dim.threshold_variation as u64,
                        threshold_local_entropy: dim.local_entropy_threshold as u64,
                        radius2_color_smoothing: 64,
                        neighbor_count_color_smoothing: 64,
                    });
                }
            }
        }
        Ok(params)
    }
}

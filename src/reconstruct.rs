//! Patch reconstruction: turns the patch data units of one atlas frame into
//! absolute patch descriptors.
//!
//! Units are consumed strictly in order. INTRA units carry their own fields (sizes
//! are still coded against the previous patch); INTER, MERGE and SKIP units are
//! deltas against a patch of a reference frame.

use log::debug;

use crate::codec_trace;
use crate::common::context::FrameContext;
use crate::common::{ceil_div, pow2, to_i64, to_usize};
use crate::error::{Error, Result};
use crate::patch::{EomPatch, Patch, PatchType, RawPatch};
use crate::plr::{resolve_plr, PointLocalReconstructionMode};
use crate::reference::ReferenceFrameIndex;
use crate::syntax::{
    AtlasFrameParameterSetRbsp, AtlasSequenceParameterSetRbsp, AtlasTileHeader,
    EomPatchDataUnit, InterPatchDataUnit, IntraPatchDataUnit, MergePatchDataUnit, PatchDataUnit,
    PatchInformationData, RawPatchDataUnit, TileType, V3CParameterSet,
};
use crate::trace::TraceSink;

/// Constants of one frame's patch reconstruction, gathered from the parameter sets.
#[derive(Debug, Clone)]
pub(crate) struct PatchFrameParams<'a> {
    pub(crate) packing_block_size: usize,
    pub(crate) min_level: i64,
    /// Largest 3D coordinate, doubled when 45 degree projection is on.
    pub(crate) max_3d_coordinate: i64,
    pub(crate) quantizer_size: (i64, i64),
    pub(crate) size_quantizer_present: bool,
    pub(crate) projection_45_degree: bool,
    /// Mode catalog, `None` when PLR is disabled.
    pub(crate) plr_modes: Option<&'a [PointLocalReconstructionMode]>,
    pub(crate) raw_3d_offset_explicit: bool,
    /// Scale of non-explicit raw patch 3D offsets.
    pub(crate) raw_3d_offset_level: usize,
}

impl<'a> PatchFrameParams<'a> {
    pub(crate) fn new(
        vps: &V3CParameterSet,
        asps: &AtlasSequenceParameterSetRbsp,
        afps: &AtlasFrameParameterSetRbsp,
        ath: &AtlasTileHeader,
        packing_block_size: usize,
        plr_modes: &'a [PointLocalReconstructionMode],
    ) -> Result<Self> {
        let gi = &vps.geometry_information;
        let max_3d_coordinate = pow2(
            "geometry_3d_coordinates_bitdepth",
            gi.geometry_3d_coordinates_bitdepth_minus1 as u32 + 1,
        )?;
        let max_3d_coordinate = if asps.projection_45_degree_patch_present_flag {
            max_3d_coordinate
                .checked_mul(2)
                .ok_or(Error::OutOfRange {
                    field: "max_3d_coordinate",
                    value: max_3d_coordinate,
                })?
        } else {
            max_3d_coordinate
        };
        let raw_3d_offset_level = pow2(
            "geometry_nominal_2d_bitdepth",
            gi.geometry_nominal_2d_bitdepth_minus1 as u32 + 1,
        )?;
        Ok(Self {
            packing_block_size,
            min_level: pow2("pos_min_d_quantizer", ath.pos_min_d_quantizer as u32)?,
            max_3d_coordinate,
            quantizer_size: (
                pow2("patch_size_x_info_quantizer", ath.patch_size_info_quantizer.0 as u32)?,
                pow2("patch_size_y_info_quantizer", ath.patch_size_info_quantizer.1 as u32)?,
            ),
            size_quantizer_present: asps.patch_size_quantizer_present_flag,
            projection_45_degree: asps.projection_45_degree_patch_present_flag,
            plr_modes: asps.plr_enabled_flag.then_some(plr_modes),
            raw_3d_offset_explicit: afps.raw_3d_offset_bitcount_explicit_mode_flag,
            raw_3d_offset_level: to_usize("raw_3d_offset_level", raw_3d_offset_level)?,
        })
    }

    /// 2D size in blocks and in pixels, `delta` applied to a base size. Pixel sizes
    /// are only tracked with the size quantizer.
    fn patch_size(
        &self,
        base_in_pixel: (usize, usize),
        base_size: (usize, usize),
        delta: (i64, i64),
    ) -> Result<((usize, usize), (usize, usize))> {
        if self.size_quantizer_present {
            let (qx, qy) = self.quantizer_size;
            let in_pixel = (
                offset_scaled("patch_size_2d_x_in_pixel", base_in_pixel.0, delta.0, qx)?,
                offset_scaled("patch_size_2d_y_in_pixel", base_in_pixel.1, delta.1, qy)?,
            );
            let block = self.packing_block_size;
            let size = (in_pixel.0.div_ceil(block), in_pixel.1.div_ceil(block));
            Ok((size, in_pixel))
        } else {
            let size = (
                offset("size_u0", base_size.0, delta.0)?,
                offset("size_v0", base_size.1, delta.1)?,
            );
            Ok((size, (0, 0)))
        }
    }

    /// D1 predicted from `ref_d1`. INTRA patches predict from the projection origin.
    fn d1(&self, projection_mode: u8, min_z: i64, ref_d1: i64) -> Result<usize> {
        let (level, max) = (self.min_level, self.max_3d_coordinate);
        let quantized = |base: i64| {
            (base / level)
                .checked_add(min_z)
                .and_then(|v| v.checked_mul(level))
        };
        let d1 = if projection_mode == 0 {
            quantized(ref_d1)
        } else {
            max.checked_sub(ref_d1)
                .and_then(quantized)
                .and_then(|v| max.checked_sub(v))
        };
        to_usize(
            "d1",
            d1.ok_or(Error::OutOfRange {
                field: "d1",
                value: min_z,
            })?,
        )
    }

    fn intra_d1(&self, projection_mode: u8, min_z: i64) -> Result<usize> {
        let origin = if projection_mode == 0 {
            0
        } else {
            self.max_3d_coordinate
        };
        self.d1(projection_mode, min_z, origin)
    }

    /// Depth range, always within 0..=255.
    fn size_d(&self, delta_max_z: i64, ref_size_d: usize) -> Result<usize> {
        let level = self.min_level;
        let size_d = delta_max_z
            .checked_add(ceil_div(to_i64("ref_size_d", ref_size_d)?, level))
            .and_then(|v| v.checked_mul(level))
            .ok_or(Error::OutOfRange {
                field: "size_d",
                value: delta_max_z,
            })?;
        Ok(size_d.clamp(0, 255) as usize)
    }
}

/// Rolling predictor state of one frame's patch loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PatchPredictors {
    pub(crate) prev_size_uv0: (usize, usize),
    pub(crate) prev_size_2d_in_pixel: (usize, usize),
    pub(crate) pred_index: i64,
}

impl PatchPredictors {
    fn update(&mut self, patch: &Patch) {
        self.prev_size_uv0 = patch.size_uv0;
        self.prev_size_2d_in_pixel = patch.size_2d_in_pixel;
    }
}

/// `base + delta * scale`, checked against overflow and negative results.
fn offset_scaled(field: &'static str, base: usize, delta: i64, scale: i64) -> Result<usize> {
    let value = delta
        .checked_mul(scale)
        .and_then(|d| i64::try_from(base).ok()?.checked_add(d))
        .ok_or(Error::OutOfRange {
            field,
            value: delta,
        })?;
    to_usize(field, value)
}

#[inline]
fn offset(field: &'static str, base: usize, delta: i64) -> Result<usize> {
    offset_scaled(field, base, delta, 1)
}

/// Reconstructs every patch of one frame into `frame`.
///
/// `decoded` are the frames reconstructed before this one. A SKIP tile without
/// units repeats the regular patches of reference 0.
pub(crate) fn reconstruct_patch_frame(
    frame: &mut FrameContext,
    units: &[PatchInformationData],
    tile_type: TileType,
    params: &PatchFrameParams,
    refs: &ReferenceFrameIndex,
    decoded: &[FrameContext],
    trace: &mut dyn TraceSink,
) -> Result<()> {
    let patch_types = if tile_type == TileType::Skip && units.is_empty() {
        let (_, ref_patches) = refs.reference_patches(decoded, &[], 0)?;
        vec![PatchType::Skip; ref_patches.len()]
    } else {
        let mut patch_types = Vec::with_capacity(units.len());
        for pid in units {
            let patch_type = PatchType::from_tile_type_and_patch_mode(tile_type, pid.patch_mode)?;
            if patch_type == PatchType::End {
                break;
            }
            patch_types.push(patch_type);
        }
        patch_types
    };

    let patch_count = patch_types.len();
    let raw_count = patch_types.iter().filter(|&&t| t == PatchType::Raw).count();
    let eom_count = patch_types.iter().filter(|&&t| t == PatchType::Eom).count();
    frame.patches = Vec::with_capacity(patch_count - raw_count - eom_count);
    frame.raw_patches = Vec::with_capacity(raw_count);
    frame.eom_patches = Vec::with_capacity(eom_count);
    frame.total_number_of_raw_points = 0;

    codec_trace!(trace, "Patches size                        = {}", patch_count - raw_count - eom_count);
    codec_trace!(trace, "non-regular Patches(raw, eom)       = {}, {}", raw_count, eom_count);
    codec_trace!(trace, "TileGroup Type                      = {:?}", tile_type);
    codec_trace!(trace, "OccupancyPackingBlockSize           = {}", params.packing_block_size);

    let mut pred = PatchPredictors::default();
    for (unit_index, &patch_type) in patch_types.iter().enumerate() {
        let unit = units.get(unit_index).map(|pid| &pid.patch_data_unit);
        let mismatch = || Error::MismatchedDataUnit {
            index: unit_index,
            patch_type,
        };
        codec_trace!(trace, "patch {} / {}: {:?}", unit_index, patch_count, patch_type);

        let patch_index = frame.patches.len();
        match patch_type {
            PatchType::Intra => {
                let Some(PatchDataUnit::Intra(pdu)) = unit else {
                    return Err(mismatch());
                };
                let mut patch = intra_patch(pdu, params, &mut pred, patch_index, frame.index)?;
                trace_patch(trace, "Intra", &patch);
                patch.alloc_one_layer_data();
                if let Some(modes) = params.plr_modes {
                    resolve_plr(&mut patch, &pdu.plr_data, modes)?;
                }
                frame.patches.push(patch);
            }
            PatchType::Inter => {
                let Some(PatchDataUnit::Inter(ipdu)) = unit else {
                    return Err(mismatch());
                };
                let mut patch = inter_patch(ipdu, params, &mut pred, refs, decoded, frame)?;
                trace_patch(trace, "Inter", &patch);
                patch.alloc_one_layer_data();
                if let Some(modes) = params.plr_modes {
                    resolve_plr(&mut patch, &ipdu.plr_data, modes)?;
                }
                frame.patches.push(patch);
            }
            PatchType::Merge => {
                let Some(PatchDataUnit::Merge(mpdu)) = unit else {
                    return Err(mismatch());
                };
                let (mut patch, override_plr) =
                    merge_patch(mpdu, params, &mut pred, refs, decoded, frame)?;
                trace_patch(trace, "Merge", &patch);
                match params.plr_modes {
                    Some(modes) if override_plr => {
                        patch.alloc_one_layer_data();
                        resolve_plr(&mut patch, &mpdu.plr_data, modes)?;
                    }
                    // keeps the reference's modes
                    Some(_) => {}
                    None => patch.alloc_one_layer_data(),
                }
                frame.patches.push(patch);
            }
            PatchType::Skip => {
                let mut patch = skip_patch(params, &mut pred, refs, decoded, frame)?;
                trace_patch(trace, "Skip", &patch);
                patch.alloc_one_layer_data();
                frame.patches.push(patch);
            }
            PatchType::Raw => {
                let Some(PatchDataUnit::Raw(rpdu)) = unit else {
                    return Err(mismatch());
                };
                let raw = raw_patch(rpdu, params)?;
                codec_trace!(
                    trace,
                    "Raw :UV = {:?}  size = {:?}  uvd1 = {:?} {} numPoints = {} ocmRes = {}",
                    raw.uv0,
                    raw.size_uv0,
                    raw.uv1,
                    raw.d1,
                    raw.number_of_raw_points,
                    raw.occupancy_resolution
                );
                frame.total_number_of_raw_points += raw.number_of_raw_points;
                frame.raw_patches.push(raw);
            }
            PatchType::Eom => {
                let Some(PatchDataUnit::Eom(epdu)) = unit else {
                    return Err(mismatch());
                };
                let eom = eom_patch(epdu)?;
                codec_trace!(
                    trace,
                    "EOM: U0V0 {:?}\tSizeU0V0 {:?}\tN= {},{}",
                    eom.uv0,
                    eom.size_uv,
                    eom.member_patches.len(),
                    eom.edd_count
                );
                frame.eom_patches.push(eom);
            }
            // the pre-scan stops at the first END
            PatchType::End => break,
        }
    }

    codec_trace!(trace, "patch {} / {}: end", frame.patches.len(), frame.patches.len());
    debug!(
        "frame {} (afoc {}): {} patches, {} raw patches ({} points), {} eom patches",
        frame.index,
        frame.afoc,
        frame.patches.len(),
        frame.raw_patches.len(),
        frame.total_number_of_raw_points,
        frame.eom_patches.len()
    );
    Ok(())
}

fn trace_patch(trace: &mut dyn TraceSink, kind: &str, patch: &Patch) {
    codec_trace!(
        trace,
        "patch({}) {}: UV0 {:?} UV1 {:?} D1={} S={:?} {} P={} O={:?} A={:?} Lod = {:?} Axis={} Ref={:?}/{:?}",
        kind,
        patch.patch_index,
        patch.uv0,
        patch.uv1,
        patch.d1,
        patch.size_uv0,
        patch.size_d,
        patch.projection_mode,
        patch.patch_orientation,
        patch.axes,
        patch.level_of_detail,
        patch.axis_of_additional_plane,
        patch.ref_atlas_frame_idx,
        patch.best_match_idx
    );
}

fn intra_patch(
    pdu: &IntraPatchDataUnit,
    params: &PatchFrameParams,
    pred: &mut PatchPredictors,
    patch_index: usize,
    frame_index: usize,
) -> Result<Patch> {
    let (size_uv0, size_2d_in_pixel) = params.patch_size(
        pred.prev_size_2d_in_pixel,
        pred.prev_size_uv0,
        pdu.delta_size_2d,
    )?;
    let level_of_detail = if pdu.lod_enable_flag {
        let x = pdu.lod_scale_x_minus1 + 1;
        (x, pdu.lod_scale_y_idc + if x > 1 { 1 } else { 2 })
    } else {
        (1, 1)
    };
    let mut patch = Patch {
        patch_index,
        frame_index,
        occupancy_resolution: params.packing_block_size,
        uv0: pdu.pos_2d,
        uv1: pdu.pos_3d,
        size_uv0,
        size_2d_in_pixel,
        size_d: params.size_d(to_i64("pos_3d_delta_max_z", pdu.pos_3d_delta_max_z)?, 0)?,
        level_of_detail,
        patch_orientation: pdu.orientation_index,
        ..Default::default()
    };
    patch.set_projection(pdu.projection_id, params.projection_45_degree);
    patch.d1 = params.intra_d1(patch.projection_mode, to_i64("pos_3d_min_z", pdu.pos_3d_min_z)?)?;
    pred.update(&patch);
    Ok(patch)
}

fn inter_patch(
    ipdu: &InterPatchDataUnit,
    params: &PatchFrameParams,
    pred: &mut PatchPredictors,
    refs: &ReferenceFrameIndex,
    decoded: &[FrameContext],
    frame: &FrameContext,
) -> Result<Patch> {
    let best_match = ipdu
        .ref_patch_index
        .checked_add(pred.pred_index)
        .ok_or(Error::OutOfRange {
            field: "ref_patch_index",
            value: ipdu.ref_patch_index,
        })?;
    pred.pred_index = best_match.saturating_add(1);
    let (_, reference) =
        refs.reference_patch(decoded, &frame.patches, ipdu.ref_index, best_match)?;

    let (size_uv0, size_2d_in_pixel) = params.patch_size(
        reference.size_2d_in_pixel,
        reference.size_uv0,
        ipdu.delta_size_2d,
    )?;
    let mut patch = Patch {
        patch_index: frame.patches.len(),
        frame_index: frame.index,
        occupancy_resolution: params.packing_block_size,
        uv0: (
            offset("u0", reference.uv0.0, ipdu.pos_2d.0)?,
            offset("v0", reference.uv0.1, ipdu.pos_2d.1)?,
        ),
        uv1: (
            offset("u1", reference.uv1.0, ipdu.pos_3d.0)?,
            offset("v1", reference.uv1.1, ipdu.pos_3d.1)?,
        ),
        size_uv0,
        size_2d_in_pixel,
        best_match_idx: Some(best_match as usize),
        ref_atlas_frame_idx: Some(ipdu.ref_index),
        ..Default::default()
    };
    patch.inherit_projection(reference);
    patch.d1 = params.d1(patch.projection_mode, ipdu.pos_3d_min_z, reference.d1 as i64)?;
    patch.size_d = params.size_d(ipdu.pos_3d_delta_max_z, reference.size_d)?;
    pred.update(&patch);
    Ok(patch)
}

/// MERGE reads the patch at the same index of the reference frame. Fields that are
/// not overridden are copied. Returns whether the unit's PLR data applies.
fn merge_patch(
    mpdu: &MergePatchDataUnit,
    params: &PatchFrameParams,
    pred: &mut PatchPredictors,
    refs: &ReferenceFrameIndex,
    decoded: &[FrameContext],
    frame: &FrameContext,
) -> Result<(Patch, bool)> {
    let patch_index = frame.patches.len();
    pred.pred_index = patch_index as i64;
    let (_, reference) =
        refs.reference_patch(decoded, &frame.patches, mpdu.ref_index, patch_index as i64)?;

    let mut patch = Patch {
        patch_index,
        frame_index: frame.index,
        occupancy_resolution: params.packing_block_size,
        best_match_idx: Some(patch_index),
        ref_atlas_frame_idx: Some(mpdu.ref_index),
        ..reference.clone()
    };
    let plr_enabled = params.plr_modes.is_some();
    let mut override_plr = false;
    if mpdu.override_2d_params_flag {
        patch.uv0 = (
            offset("u0", reference.uv0.0, mpdu.pos_2d.0)?,
            offset("v0", reference.uv0.1, mpdu.pos_2d.1)?,
        );
        (patch.size_uv0, patch.size_2d_in_pixel) = params.patch_size(
            reference.size_2d_in_pixel,
            reference.size_uv0,
            mpdu.delta_size_2d,
        )?;
        override_plr = plr_enabled;
    } else if mpdu.override_3d_params_flag {
        patch.uv1 = (
            offset("u1", reference.uv1.0, mpdu.pos_3d.0)?,
            offset("v1", reference.uv1.1, mpdu.pos_3d.1)?,
        );
        patch.d1 = params.d1(patch.projection_mode, mpdu.pos_3d_min_z, reference.d1 as i64)?;
        patch.size_d = params.size_d(mpdu.pos_3d_delta_max_z, reference.size_d)?;
        override_plr = plr_enabled && mpdu.override_plr_flag;
    }
    pred.update(&patch);
    Ok((patch, override_plr))
}

/// SKIP copies the patch at the same index of reference 0.
fn skip_patch(
    params: &PatchFrameParams,
    pred: &mut PatchPredictors,
    refs: &ReferenceFrameIndex,
    decoded: &[FrameContext],
    frame: &FrameContext,
) -> Result<Patch> {
    let patch_index = frame.patches.len();
    pred.pred_index = pred
        .pred_index
        .checked_add(to_i64("patch_index", patch_index)?)
        .ok_or(Error::OutOfRange {
            field: "pred_index",
            value: pred.pred_index,
        })?;
    let (_, reference) = refs.reference_patch(decoded, &frame.patches, 0, patch_index as i64)?;

    let (size_uv0, size_2d_in_pixel) =
        params.patch_size(reference.size_2d_in_pixel, reference.size_uv0, (0, 0))?;
    let mut patch = Patch {
        patch_index,
        frame_index: frame.index,
        occupancy_resolution: params.packing_block_size,
        uv0: reference.uv0,
        uv1: reference.uv1,
        size_uv0,
        size_2d_in_pixel,
        best_match_idx: Some(patch_index),
        ref_atlas_frame_idx: Some(0),
        ..Default::default()
    };
    patch.inherit_projection(reference);
    patch.d1 = params.d1(patch.projection_mode, 0, reference.d1 as i64)?;
    patch.size_d = params.size_d(0, reference.size_d)?;
    pred.update(&patch);
    Ok(patch)
}

fn raw_patch(rpdu: &RawPatchDataUnit, params: &PatchFrameParams) -> Result<RawPatch> {
    let level = if params.raw_3d_offset_explicit {
        1
    } else {
        params.raw_3d_offset_level
    };
    let scale = |field: &'static str, v: usize| {
        v.checked_mul(level).ok_or(Error::OutOfRange {
            field,
            value: v as i64,
        })
    };
    let (x, y, z) = rpdu.pos_3d;
    Ok(RawPatch {
        uv0: rpdu.pos_2d,
        size_uv0: rpdu.size_2d,
        uv1: (scale("raw_u1", x)?, scale("raw_v1", y)?),
        d1: scale("raw_d1", z)?,
        number_of_raw_points: rpdu.raw_points,
        occupancy_resolution: params.packing_block_size,
        patch_in_auxiliary_video: rpdu.patch_in_auxiliary_video_flag,
    })
}

fn eom_patch(epdu: &EomPatchDataUnit) -> Result<EomPatch> {
    if epdu.associated_patches.len() != epdu.points.len() || epdu.points.is_empty() {
        return Err(Error::OutOfRange {
            field: "eom_associated_patches",
            value: epdu.associated_patches.len() as i64,
        });
    }
    Ok(EomPatch::new(
        epdu.pos_2d,
        epdu.size_2d,
        epdu.associated_patches
            .iter()
            .copied()
            .zip(epdu.points.iter().copied()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::PatchOrientation;
    use crate::plr::build_plr_modes;
    use crate::syntax::{PlrData, PlrInformation, PlrModeInformation};
    use crate::trace::NullTrace;

    fn params() -> PatchFrameParams<'static> {
        PatchFrameParams {
            packing_block_size: 16,
            min_level: 4,
            max_3d_coordinate: 1024,
            quantizer_size: (1, 1),
            size_quantizer_present: false,
            projection_45_degree: false,
            plr_modes: None,
            raw_3d_offset_explicit: false,
            raw_3d_offset_level: 256,
        }
    }

    fn unit(patch_mode: u8, patch_data_unit: PatchDataUnit) -> PatchInformationData {
        PatchInformationData {
            patch_mode,
            patch_data_unit,
        }
    }

    fn intra(delta_size: (i64, i64), min_z: usize, delta_max_z: usize) -> PatchInformationData {
        unit(
            0,
            PatchDataUnit::Intra(IntraPatchDataUnit {
                delta_size_2d: delta_size,
                pos_3d_min_z: min_z,
                pos_3d_delta_max_z: delta_max_z,
                ..Default::default()
            }),
        )
    }

    fn end() -> PatchInformationData {
        unit(14, PatchDataUnit::End)
    }

    fn decode(
        frame: &mut FrameContext,
        units: &[PatchInformationData],
        tile_type: TileType,
        params: &PatchFrameParams,
        refs: &ReferenceFrameIndex,
        decoded: &[FrameContext],
    ) -> Result<()> {
        reconstruct_patch_frame(frame, units, tile_type, params, refs, decoded, &mut NullTrace)
    }

    /// Frame afoc 0 with `count` INTRA patches of growing size.
    fn intra_frame(params: &PatchFrameParams, count: usize) -> FrameContext {
        let mut units: Vec<_> = (0..count)
            .map(|i| {
                let mut pid = intra((1, 1), 2 + i, 10);
                if let PatchDataUnit::Intra(pdu) = &mut pid.patch_data_unit {
                    pdu.pos_2d = (i * 4, 0);
                    pdu.pos_3d = (i, 2 * i);
                    pdu.projection_id = (i % 6) as u8;
                    pdu.orientation_index = PatchOrientation::Swap;
                }
                pid
            })
            .collect();
        units.push(end());
        let mut frame = FrameContext::default();
        decode(
            &mut frame,
            &units,
            TileType::I,
            params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();
        frame
    }

    fn next_frame(afoc: usize) -> (FrameContext, ReferenceFrameIndex) {
        let frame = FrameContext {
            index: afoc,
            afoc,
            ..Default::default()
        };
        (frame, ReferenceFrameIndex::new(afoc, vec![afoc as i64 - 1]))
    }

    #[test]
    fn test_intra_then_inter_in_first_frame() {
        let params = params();
        let units = vec![
            unit(
                3,
                PatchDataUnit::Intra(IntraPatchDataUnit {
                    pos_2d: (0, 0),
                    delta_size_2d: (4, 4),
                    pos_3d_min_z: 2,
                    pos_3d_delta_max_z: 3,
                    ..Default::default()
                }),
            ),
            unit(2, PatchDataUnit::Inter(InterPatchDataUnit::default())),
            end(),
        ];
        let mut frame = FrameContext::default();
        decode(
            &mut frame,
            &units,
            TileType::P,
            &params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();

        assert_eq!(frame.patches.len(), 2);
        let (first, second) = (&frame.patches[0], &frame.patches[1]);
        assert_eq!(first.uv0, (0, 0));
        assert_eq!(first.size_uv0, (4, 4));
        assert_eq!(first.d1, 8);
        assert_eq!(first.size_d, 12);
        assert_eq!(first.projection_mode, 0);
        assert_eq!(second.best_match_idx, Some(0));
        assert_eq!(second.uv0, first.uv0);
        assert_eq!(second.uv1, first.uv1);
        assert_eq!(second.size_uv0, first.size_uv0);
        assert_eq!(second.d1, first.d1);
        assert_eq!(second.size_d, first.size_d);
        assert_eq!(second.axes, first.axes);
        assert_eq!(second.level_of_detail, first.level_of_detail);
    }

    #[test]
    fn test_raw_patch_offsets() {
        let mut params = params();
        let units = vec![unit(
            1,
            PatchDataUnit::Raw(RawPatchDataUnit {
                pos_3d: (1, 2, 0),
                size_2d: (2, 3),
                raw_points: 17,
                ..Default::default()
            }),
        )];
        let mut frame = FrameContext::default();
        let refs = ReferenceFrameIndex::bootstrap(0);
        decode(&mut frame, &units, TileType::I, &params, &refs, &[]).unwrap();
        assert!(frame.patches.is_empty());
        assert_eq!(frame.raw_patches.len(), 1);
        assert_eq!(frame.raw_patches[0].uv1, (256, 512));
        assert_eq!(frame.raw_patches[0].d1, 0);
        assert_eq!(frame.raw_patches[0].size_uv0, (2, 3));
        assert_eq!(frame.total_number_of_raw_points, 17);

        params.raw_3d_offset_explicit = true;
        let units = vec![units[0].clone(), units[0].clone()];
        decode(&mut frame, &units, TileType::I, &params, &refs, &[]).unwrap();
        assert_eq!(frame.raw_patches[0].uv1, (1, 2));
        assert_eq!(frame.total_number_of_raw_points, 34);
    }

    #[test]
    fn test_intra_axes_and_size_d_range() {
        for projection_45_degree in [false, true] {
            let mut params = params();
            params.projection_45_degree = projection_45_degree;
            params.max_3d_coordinate = if projection_45_degree { 2048 } else { 1024 };
            let ids: Vec<u8> = if projection_45_degree {
                (0..24).collect()
            } else {
                (0..6).collect()
            };
            for projection_id in ids {
                for delta_max_z in [0, 1, 63, 64, 1000] {
                    let mut pid = intra((1, 1), 3, delta_max_z);
                    if let PatchDataUnit::Intra(pdu) = &mut pid.patch_data_unit {
                        pdu.projection_id = projection_id;
                    }
                    let mut frame = FrameContext::default();
                    decode(
                        &mut frame,
                        &[pid],
                        TileType::I,
                        &params,
                        &ReferenceFrameIndex::bootstrap(0),
                        &[],
                    )
                    .unwrap();
                    let patch = &frame.patches[0];
                    assert!(patch.size_d <= 255);
                    assert_eq!(patch.size_d, (delta_max_z * 4).min(255));
                    let expected = match patch.normal_axis() {
                        0 => (2, 1),
                        1 => (2, 0),
                        _ => (0, 1),
                    };
                    assert_eq!((patch.axes.1, patch.axes.2), expected);
                    if patch.projection_mode == 0 {
                        assert_eq!(patch.d1, 12);
                    } else {
                        assert_eq!(patch.d1, params.max_3d_coordinate as usize - 12);
                    }
                }
            }
        }
    }

    #[test]
    fn test_inter_size_d_clamped() {
        let params = params();
        let reference = intra_frame(&params, 1);
        let (mut frame, refs) = next_frame(1);
        let units = vec![
            unit(
                2,
                PatchDataUnit::Inter(InterPatchDataUnit {
                    pos_3d_delta_max_z: -100,
                    ..Default::default()
                }),
            ),
            unit(
                2,
                PatchDataUnit::Inter(InterPatchDataUnit {
                    ref_patch_index: -1,
                    pos_3d_delta_max_z: 100,
                    ..Default::default()
                }),
            ),
        ];
        decode(&mut frame, &units, TileType::P, &params, &refs, &[reference]).unwrap();
        assert_eq!(frame.patches[0].size_d, 0);
        assert_eq!(frame.patches[1].size_d, 255);
    }

    #[test]
    fn test_quantized_patch_size() {
        let mut params = params();
        params.size_quantizer_present = true;
        params.quantizer_size = (8, 8);
        let units = vec![intra((5, 3), 0, 1), intra((-1, 0), 0, 1), end()];
        let mut frame = FrameContext::default();
        decode(
            &mut frame,
            &units,
            TileType::I,
            &params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();
        assert_eq!(frame.patches[0].size_2d_in_pixel, (40, 24));
        assert_eq!(frame.patches[0].size_uv0, (3, 2));
        assert_eq!(frame.patches[1].size_2d_in_pixel, (32, 24));
        assert_eq!(frame.patches[1].size_uv0, (2, 2));

        let (mut next, refs) = next_frame(1);
        let inter = unit(
            2,
            PatchDataUnit::Inter(InterPatchDataUnit {
                delta_size_2d: (1, -1),
                ..Default::default()
            }),
        );
        decode(&mut next, &[inter], TileType::P, &params, &refs, &[frame]).unwrap();
        assert_eq!(next.patches[0].size_2d_in_pixel, (48, 16));
        assert_eq!(next.patches[0].size_uv0, (3, 1));
    }

    #[test]
    fn test_inter_prediction_index() {
        let params = params();
        let reference = intra_frame(&params, 4);
        let (mut frame, refs) = next_frame(1);
        let units: Vec<_> = [0, 1, -1]
            .into_iter()
            .map(|ref_patch_index| {
                unit(
                    2,
                    PatchDataUnit::Inter(InterPatchDataUnit {
                        ref_patch_index,
                        ..Default::default()
                    }),
                )
            })
            .collect();
        decode(&mut frame, &units, TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        let best: Vec<_> = frame.patches.iter().map(|p| p.best_match_idx).collect();
        assert_eq!(best, vec![Some(0), Some(2), Some(2)]);
        for patch in &frame.patches {
            let matched = &reference.patches[patch.best_match_idx.unwrap()];
            assert_eq!(patch.uv0, matched.uv0);
            assert_eq!(patch.d1, matched.d1);
            assert_eq!(patch.patch_orientation, PatchOrientation::Swap);
            assert_eq!(patch.ref_atlas_frame_idx, Some(0));
        }

        // index 5 does not exist in the reference frame
        let (mut frame, refs) = next_frame(1);
        let out_of_range = unit(
            2,
            PatchDataUnit::Inter(InterPatchDataUnit {
                ref_patch_index: 5,
                ..Default::default()
            }),
        );
        assert!(matches!(
            decode(&mut frame, &[out_of_range], TileType::P, &params, &refs, &[reference]),
            Err(Error::ReferencePatchOutOfRange { index: 5, count: 4, .. })
        ));
    }

    #[test]
    fn test_skip_copies_reference() {
        let params = params();
        let reference = intra_frame(&params, 3);
        let (mut frame, refs) = next_frame(1);
        let units = vec![unit(0, PatchDataUnit::Skip); 3];
        decode(&mut frame, &units, TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        assert_eq!(frame.patches.len(), 3);
        for (patch, matched) in frame.patches.iter().zip(&reference.patches) {
            assert_eq!(patch.uv0, matched.uv0);
            assert_eq!(patch.uv1, matched.uv1);
            assert_eq!(patch.size_uv0, matched.size_uv0);
            assert_eq!(patch.axes, matched.axes);
            assert_eq!(patch.projection_mode, matched.projection_mode);
            assert_eq!(patch.patch_orientation, matched.patch_orientation);
            assert_eq!(patch.level_of_detail, matched.level_of_detail);
            // d1 and size_d are multiples of the min level
            assert_eq!(patch.d1, matched.d1);
            assert_eq!(patch.size_d, matched.size_d);
            assert_eq!(patch.frame_index, 1);
        }
    }

    #[test]
    fn test_skip_tile_repeats_reference_frame() {
        let params = params();
        let reference = intra_frame(&params, 2);
        let (mut frame, refs) = next_frame(1);
        decode(&mut frame, &[], TileType::Skip, &params, &refs, &[reference.clone()]).unwrap();
        assert_eq!(frame.patches.len(), 2);
        assert_eq!(frame.patches[1].uv0, reference.patches[1].uv0);
    }

    #[test]
    fn test_skip_recomputes_depth() {
        let params = params();
        let mut reference = intra_frame(&params, 1);
        reference.patches[0].d1 = 10;
        reference.patches[0].size_d = 9;
        let (mut frame, refs) = next_frame(1);
        decode(
            &mut frame,
            &[unit(0, PatchDataUnit::Skip)],
            TileType::P,
            &params,
            &refs,
            &[reference],
        )
        .unwrap();
        assert_eq!(frame.patches[0].d1, 8);
        assert_eq!(frame.patches[0].size_d, 12);
    }

    #[test]
    fn test_merge_without_override() {
        let params = params();
        let reference = intra_frame(&params, 2);
        let (mut frame, refs) = next_frame(1);
        let units = vec![
            unit(1, PatchDataUnit::Merge(MergePatchDataUnit::default())),
            unit(1, PatchDataUnit::Merge(MergePatchDataUnit::default())),
        ];
        decode(&mut frame, &units, TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        for (i, (patch, matched)) in frame.patches.iter().zip(&reference.patches).enumerate() {
            assert_eq!(patch.best_match_idx, Some(i));
            assert_eq!(patch.uv0, matched.uv0);
            assert_eq!(patch.size_uv0, matched.size_uv0);
            assert_eq!(patch.uv1, matched.uv1);
            assert_eq!(patch.d1, matched.d1);
            assert_eq!(patch.size_d, matched.size_d);
            assert_eq!(patch.patch_index, i);
            assert_eq!(patch.frame_index, 1);
        }
    }

    #[test]
    fn test_merge_overrides() {
        let params = params();
        let reference = intra_frame(&params, 1);
        let (mut frame, refs) = next_frame(1);
        let merge_2d = unit(
            1,
            PatchDataUnit::Merge(MergePatchDataUnit {
                override_2d_params_flag: true,
                pos_2d: (2, 1),
                delta_size_2d: (1, 0),
                pos_3d: (5, 5),
                ..Default::default()
            }),
        );
        decode(&mut frame, &[merge_2d], TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        let matched = &reference.patches[0];
        let patch = &frame.patches[0];
        assert_eq!(patch.uv0, (matched.uv0.0 + 2, matched.uv0.1 + 1));
        assert_eq!(patch.size_uv0, (matched.size_uv0.0 + 1, matched.size_uv0.1));
        // 3D fields are only read without a 2D override
        assert_eq!(patch.uv1, matched.uv1);

        let (mut frame, refs) = next_frame(1);
        let merge_3d = unit(
            1,
            PatchDataUnit::Merge(MergePatchDataUnit {
                override_3d_params_flag: true,
                pos_3d: (1, 2),
                pos_3d_min_z: 1,
                pos_3d_delta_max_z: -1,
                ..Default::default()
            }),
        );
        decode(&mut frame, &[merge_3d], TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        let patch = &frame.patches[0];
        assert_eq!(patch.uv0, matched.uv0);
        assert_eq!(patch.uv1, (matched.uv1.0 + 1, matched.uv1.1 + 2));
        assert_eq!(patch.d1, matched.d1 + 4);
        assert_eq!(patch.size_d, matched.size_d - 4);
    }

    #[test]
    fn test_merge_plr_override() {
        let plri = PlrInformation {
            modes: vec![PlrModeInformation::default(); 2],
            ..Default::default()
        };
        let modes = build_plr_modes(&plri);
        let mut params = params();
        params.plr_modes = Some(&modes);
        let level_plr = |mode_minus1| PlrData {
            level_flag: true,
            present_flag: true,
            mode_minus1,
            ..Default::default()
        };

        let mut pid = intra((2, 2), 0, 1);
        if let PatchDataUnit::Intra(pdu) = &mut pid.patch_data_unit {
            pdu.plr_data = level_plr(0);
        }
        let mut reference = FrameContext::default();
        decode(
            &mut reference,
            &[pid],
            TileType::I,
            &params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();
        assert_eq!(reference.patches[0].plr_mode_by_patch, 1);

        // no override: the reference's modes are kept
        let (mut frame, refs) = next_frame(1);
        let keep = unit(
            1,
            PatchDataUnit::Merge(MergePatchDataUnit {
                plr_data: level_plr(1),
                ..Default::default()
            }),
        );
        decode(&mut frame, &[keep], TileType::P, &params, &refs, &[reference.clone()]).unwrap();
        assert_eq!(frame.patches[0].plr_mode_by_patch, 1);

        // a 2D override always carries new modes
        let (mut frame, refs) = next_frame(1);
        let replace = unit(
            1,
            PatchDataUnit::Merge(MergePatchDataUnit {
                override_2d_params_flag: true,
                plr_data: level_plr(1),
                ..Default::default()
            }),
        );
        decode(&mut frame, &[replace], TileType::P, &params, &refs, &[reference]).unwrap();
        assert_eq!(frame.patches[0].plr_mode_by_patch, 2);
    }

    #[test]
    fn test_eom_patches() {
        let params = params();
        let eom = |patches: Vec<usize>, points: Vec<usize>| {
            unit(
                2,
                PatchDataUnit::Eom(EomPatchDataUnit {
                    associated_patches: patches,
                    points,
                    ..Default::default()
                }),
            )
        };
        let units = vec![
            intra((1, 1), 0, 1),
            eom(vec![0], vec![6]),
            eom(vec![0, 0], vec![2, 3]),
            end(),
        ];
        let mut frame = FrameContext::default();
        decode(
            &mut frame,
            &units,
            TileType::I,
            &params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();
        assert_eq!(frame.patches.len(), 1);
        assert_eq!(frame.eom_patches.len(), 2);
        assert_eq!(frame.eom_patches[0].edd_count, 6);
        assert_eq!(frame.eom_patches[1].edd_count, 5);
        assert_eq!(frame.total_number_of_eom_points(), 11);

        let mut frame = FrameContext::default();
        assert!(decode(
            &mut frame,
            &[eom(vec![0, 1], vec![1])],
            TileType::I,
            &params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .is_err());
    }

    #[test]
    fn test_structural_errors() {
        let params = params();
        let refs = ReferenceFrameIndex::bootstrap(0);
        let mut frame = FrameContext::default();

        // unknown I tile mode
        let bad_mode = unit(7, PatchDataUnit::End);
        assert!(matches!(
            decode(&mut frame, &[bad_mode], TileType::I, &params, &refs, &[]),
            Err(Error::UnknownPatchType { patch_mode: 7, .. })
        ));

        // mode and payload disagree
        let mismatch = unit(0, PatchDataUnit::Skip);
        assert!(matches!(
            decode(&mut frame, &[mismatch], TileType::I, &params, &refs, &[]),
            Err(Error::MismatchedDataUnit { index: 0, patch_type: PatchType::Intra })
        ));

        // INTER as the first patch of the first frame has nothing to read
        let inter = unit(2, PatchDataUnit::Inter(InterPatchDataUnit::default()));
        assert!(matches!(
            decode(&mut frame, &[inter.clone()], TileType::P, &params, &refs, &[]),
            Err(Error::ReferencePatchOutOfRange { index: 0, count: 0, .. })
        ));

        // reference index beyond the active list
        let (mut next, refs) = next_frame(1);
        let reference = intra_frame(&params, 1);
        let far = unit(
            2,
            PatchDataUnit::Inter(InterPatchDataUnit {
                ref_index: 1,
                ..Default::default()
            }),
        );
        assert!(matches!(
            decode(&mut next, &[far], TileType::P, &params, &refs, &[reference]),
            Err(Error::ReferenceIndexOutOfRange { ref_index: 1, .. })
        ));

        // units after END are never classified
        let units = vec![intra((1, 1), 0, 1), end(), unit(9, PatchDataUnit::End)];
        let mut frame = FrameContext::default();
        decode(&mut frame, &units, TileType::I, &params, &ReferenceFrameIndex::bootstrap(0), &[])
            .unwrap();
        assert_eq!(frame.patches.len(), 1);
    }

    /// One-patch frame afoc 0 in `projection_mode`, with the given depths.
    fn reference_frame(
        params: &PatchFrameParams,
        projection_mode: u8,
        d1: usize,
        size_d: usize,
    ) -> FrameContext {
        let plane = 3 * projection_mode;
        let mut pid = intra((2, 2), 0, 1);
        if let PatchDataUnit::Intra(pdu) = &mut pid.patch_data_unit {
            pdu.pos_2d = (4, 0);
            pdu.projection_id = if params.projection_45_degree {
                (plane << 2) | 1
            } else {
                plane
            };
        }
        let mut frame = FrameContext::default();
        decode(
            &mut frame,
            &[pid],
            TileType::I,
            params,
            &ReferenceFrameIndex::bootstrap(0),
            &[],
        )
        .unwrap();
        assert_eq!(frame.patches[0].projection_mode, projection_mode);
        frame.patches[0].d1 = d1;
        frame.patches[0].size_d = size_d;
        frame
    }

    fn predict(
        params: &PatchFrameParams,
        reference: &FrameContext,
        units: &[PatchInformationData],
    ) -> Result<FrameContext> {
        let (mut frame, refs) = next_frame(1);
        decode(
            &mut frame,
            units,
            TileType::P,
            params,
            &refs,
            std::slice::from_ref(reference),
        )?;
        Ok(frame)
    }

    #[test]
    fn test_depth_prediction_per_projection() {
        for projection_45_degree in [false, true] {
            let mut params = params();
            params.projection_45_degree = projection_45_degree;
            params.max_3d_coordinate = if projection_45_degree { 2048 } else { 1024 };
            let max = params.max_3d_coordinate as usize;
            for projection_mode in [0u8, 1] {
                // depth from the projection origin
                let depth = |d: usize| if projection_mode == 0 { d } else { max - d };
                for ref_depth in [20, 22] {
                    let reference = reference_frame(&params, projection_mode, depth(ref_depth), 9);
                    for delta_max_z in [-100, -3, 0, 1, 60, 1000] {
                        let inter = unit(
                            2,
                            PatchDataUnit::Inter(InterPatchDataUnit {
                                pos_3d_min_z: 1,
                                pos_3d_delta_max_z: delta_max_z,
                                ..Default::default()
                            }),
                        );
                        let merge = unit(
                            1,
                            PatchDataUnit::Merge(MergePatchDataUnit {
                                override_3d_params_flag: true,
                                pos_3d_min_z: 1,
                                pos_3d_delta_max_z: delta_max_z,
                                ..Default::default()
                            }),
                        );
                        let size_d = ((delta_max_z + 3) * 4).clamp(0, 255) as usize;
                        for pid in [inter, merge] {
                            let frame = predict(&params, &reference, &[pid]).unwrap();
                            let patch = &frame.patches[0];
                            assert_eq!(patch.projection_mode, projection_mode);
                            assert_eq!(patch.d1, depth(24));
                            assert_eq!(patch.size_d, size_d);
                        }
                    }
                    let frame = predict(&params, &reference, &[unit(0, PatchDataUnit::Skip)]).unwrap();
                    assert_eq!(frame.patches[0].d1, depth(20));
                    assert_eq!(frame.patches[0].size_d, 12);
                }
            }
        }
    }

    #[test]
    fn test_overflowing_fields_are_rejected() {
        let mut params = params();
        let reference = reference_frame(&params, 0, 20, 9);
        let inter = |ipdu: InterPatchDataUnit| unit(2, PatchDataUnit::Inter(ipdu));
        let field_of = |result: Result<FrameContext>| match result {
            Err(Error::OutOfRange { field, .. }) => field,
            other => panic!("unexpected {:?}", other.map(|f| f.patches.len())),
        };

        let size_d = inter(InterPatchDataUnit {
            pos_3d_delta_max_z: i64::MAX,
            ..Default::default()
        });
        assert_eq!(field_of(predict(&params, &reference, &[size_d])), "size_d");

        for min_z in [i64::MAX, i64::MIN] {
            let d1 = inter(InterPatchDataUnit {
                pos_3d_min_z: min_z,
                ..Default::default()
            });
            assert_eq!(field_of(predict(&params, &reference, &[d1])), "d1");
        }

        let u0 = inter(InterPatchDataUnit {
            pos_2d: (i64::MAX, 0),
            ..Default::default()
        });
        assert_eq!(field_of(predict(&params, &reference, &[u0])), "u0");

        let far = vec![
            inter(InterPatchDataUnit::default()),
            inter(InterPatchDataUnit {
                ref_patch_index: i64::MAX,
                ..Default::default()
            }),
        ];
        assert_eq!(field_of(predict(&params, &reference, &far)), "ref_patch_index");

        params.size_quantizer_present = true;
        params.quantizer_size = (8, 8);
        let size = inter(InterPatchDataUnit {
            delta_size_2d: (i64::MAX, 0),
            ..Default::default()
        });
        assert_eq!(
            field_of(predict(&params, &reference, &[size])),
            "patch_size_2d_x_in_pixel"
        );
    }

    #[test]
    fn test_params_from_parameter_sets() {
        let mut vps = V3CParameterSet::default();
        vps.geometry_information.geometry_nominal_2d_bitdepth_minus1 = 7;
        vps.geometry_information.geometry_3d_coordinates_bitdepth_minus1 = 9;
        let mut asps = AtlasSequenceParameterSetRbsp::default();
        let mut afps = AtlasFrameParameterSetRbsp::default();
        let mut ath = AtlasTileHeader {
            pos_min_d_quantizer: 2,
            patch_size_info_quantizer: (3, 4),
            ..Default::default()
        };
        let params = PatchFrameParams::new(&vps, &asps, &afps, &ath, 16, &[]).unwrap();
        assert_eq!(params.min_level, 4);
        assert_eq!(params.max_3d_coordinate, 1024);
        assert_eq!(params.quantizer_size, (8, 16));
        assert_eq!(params.raw_3d_offset_level, 256);
        assert!(params.plr_modes.is_none());

        let raw = unit(
            1,
            PatchDataUnit::Raw(RawPatchDataUnit {
                pos_3d: (1, 0, 2),
                ..Default::default()
            }),
        );
        let mut frame = FrameContext::default();
        let refs = ReferenceFrameIndex::bootstrap(0);
        decode(&mut frame, &[raw.clone()], TileType::I, &params, &refs, &[]).unwrap();
        assert_eq!(frame.raw_patches[0].uv1, (256, 0));
        assert_eq!(frame.raw_patches[0].d1, 512);

        afps.raw_3d_offset_bitcount_explicit_mode_flag = true;
        asps.projection_45_degree_patch_present_flag = true;
        let params = PatchFrameParams::new(&vps, &asps, &afps, &ath, 16, &[]).unwrap();
        assert_eq!(params.max_3d_coordinate, 2048);
        decode(&mut frame, &[raw], TileType::I, &params, &refs, &[]).unwrap();
        assert_eq!(frame.raw_patches[0].uv1, (1, 0));
        assert_eq!(frame.raw_patches[0].d1, 2);

        let field_of = |vps: &V3CParameterSet, ath: &AtlasTileHeader| {
            match PatchFrameParams::new(vps, &asps, &afps, ath, 16, &[]) {
                Err(Error::OutOfRange { field, .. }) => field,
                other => panic!("unexpected {:?}", other.map(|p| p.min_level)),
            }
        };
        ath.pos_min_d_quantizer = 63;
        assert_eq!(field_of(&vps, &ath), "pos_min_d_quantizer");
        ath.pos_min_d_quantizer = 0;
        ath.patch_size_info_quantizer = (64, 0);
        assert_eq!(field_of(&vps, &ath), "patch_size_x_info_quantizer");
        ath.patch_size_info_quantizer = (0, 0);
        vps.geometry_information.geometry_3d_coordinates_bitdepth_minus1 = 61;
        assert_eq!(field_of(&vps, &ath), "max_3d_coordinate");
        vps.geometry_information.geometry_3d_coordinates_bitdepth_minus1 = 62;
        assert_eq!(field_of(&vps, &ath), "geometry_3d_coordinates_bitdepth");
    }
}

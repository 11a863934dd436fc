//! Reference frame index: which previously decoded frame a predictive patch reads.

use crate::common::context::FrameContext;
use crate::error::{Error, Result};
use crate::patch::Patch;
use crate::syntax::{
    AtlasFrameParameterSetRbsp, AtlasSequenceParameterSetRbsp, AtlasTileHeader, RefListStruct,
    TileType,
};

/// Derives (afoc_msb, afoc_val) of a tile from its order count LSBs and those of
/// the previous tile in decoding order.
pub(crate) fn derive_afoc(lsb: u32, log2_max_lsb: u32, prev: Option<(i64, u32)>) -> (i64, i64) {
    let Some((prev_msb, prev_lsb)) = prev else {
        return (0, lsb as i64);
    };
    let max_lsb = 1i64 << log2_max_lsb;
    let (lsb_i, prev_lsb_i) = (lsb as i64, prev_lsb as i64);
    let msb = if lsb_i < prev_lsb_i && prev_lsb_i - lsb_i >= max_lsb / 2 {
        prev_msb + max_lsb
    } else if lsb_i > prev_lsb_i && lsb_i - prev_lsb_i > max_lsb / 2 {
        prev_msb - max_lsb
    } else {
        prev_msb
    };
    (msb, msb + lsb_i)
}

/// The reference list structure in force for a tile.
pub(crate) fn ref_list_struct<'a>(
    ath: &'a AtlasTileHeader,
    asps: &'a AtlasSequenceParameterSetRbsp,
) -> Result<&'a RefListStruct> {
    if ath.ref_atlas_frame_list_sps_flag {
        let idx = ath.ref_atlas_frame_list_idx as usize;
        asps.ref_list_structs
            .get(idx)
            .ok_or(Error::MissingParameterSet("reference list structure", idx))
    } else {
        Ok(&ath.ref_list_struct)
    }
}

/// NumRefIdxActive of a tile.
pub(crate) fn num_ref_idx_active(
    ath: &AtlasTileHeader,
    afps: &AtlasFrameParameterSetRbsp,
    ref_list: &RefListStruct,
) -> usize {
    match ath.tile_type {
        TileType::I => 0,
        _ if ath.num_ref_idx_active_override_flag => ath.num_ref_idx_active_minus1 as usize + 1,
        _ => {
            let default = afps.num_ref_idx_default_active_minus1 as usize + 1;
            match ref_list.num_ref_entries() {
                // nothing signalled, fall back to the previous frames in order
                0 => default,
                entries => entries.min(default),
            }
        }
    }
}

/// Where a reference index points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTarget {
    /// The frame being decoded, first frame only.
    Current,
    /// An earlier frame, by AFOC.
    Frame(usize),
}

/// Built once per frame, before its patches are reconstructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceFrameIndex {
    afoc: usize,
    ref_afocs: Vec<i64>,
    bootstrap: bool,
}

impl ReferenceFrameIndex {
    pub fn new(afoc: usize, ref_afocs: Vec<i64>) -> Self {
        Self {
            afoc,
            ref_afocs,
            bootstrap: false,
        }
    }

    /// The first frame has nothing to predict from but itself: reference 0 is the
    /// set of patches already reconstructed in the current frame.
    pub fn bootstrap(afoc: usize) -> Self {
        Self {
            afoc,
            ref_afocs: vec![afoc as i64],
            bootstrap: true,
        }
    }

    /// Reference list of a tile. Entries beyond the signalled list step back one
    /// frame each.
    pub(crate) fn from_tile_header(
        afoc: usize,
        first_frame: bool,
        ath: &AtlasTileHeader,
        asps: &AtlasSequenceParameterSetRbsp,
        afps: &AtlasFrameParameterSetRbsp,
    ) -> Result<Self> {
        if first_frame {
            return Ok(Self::bootstrap(afoc));
        }
        let ref_list = ref_list_struct(ath, asps)?;
        let count = num_ref_idx_active(ath, afps, ref_list);
        let ref_afocs = (0..count)
            .map(|i| {
                let delta = if i < ref_list.num_ref_entries() {
                    ref_list.delta_afoc(i)
                } else {
                    i as i64 + 1
                };
                afoc as i64 - delta
            })
            .collect();
        Ok(Self::new(afoc, ref_afocs))
    }

    #[inline]
    pub fn afoc(&self) -> usize {
        self.afoc
    }

    #[inline]
    pub fn ref_afocs(&self) -> &[i64] {
        &self.ref_afocs
    }

    pub fn resolve(&self, ref_index: usize) -> Result<RefTarget> {
        let ref_afoc = *self
            .ref_afocs
            .get(ref_index)
            .ok_or(Error::ReferenceIndexOutOfRange {
                afoc: self.afoc,
                ref_index,
                active: self.ref_afocs.len(),
            })?;
        if self.bootstrap && ref_afoc == self.afoc as i64 {
            return Ok(RefTarget::Current);
        }
        if ref_afoc >= self.afoc as i64 {
            return Err(Error::ForwardReference {
                afoc: self.afoc,
                ref_afoc,
            });
        }
        let ref_afoc = usize::try_from(ref_afoc).map_err(|_| Error::OutOfRange {
            field: "ref_afoc",
            value: ref_afoc,
        })?;
        Ok(RefTarget::Frame(ref_afoc))
    }

    /// Regular patches of reference `ref_index`, with the AFOC they belong to.
    /// `current` holds the patches reconstructed so far in the frame being decoded.
    pub(crate) fn reference_patches<'a>(
        &self,
        frames: &'a [FrameContext],
        current: &'a [Patch],
        ref_index: usize,
    ) -> Result<(usize, &'a [Patch])> {
        match self.resolve(ref_index)? {
            RefTarget::Current => Ok((self.afoc, current)),
            RefTarget::Frame(afoc) => frames
                .iter()
                .rev()
                .find(|f| f.afoc == afoc)
                .map(|frame| (afoc, &frame.patches[..]))
                .ok_or(Error::MissingReferenceFrame(afoc)),
        }
    }

    /// Patch `patch_index` of reference `ref_index`.
    pub(crate) fn reference_patch<'a>(
        &self,
        frames: &'a [FrameContext],
        current: &'a [Patch],
        ref_index: usize,
        patch_index: i64,
    ) -> Result<(usize, &'a Patch)> {
        let (ref_afoc, patches) = self.reference_patches(frames, current, ref_index)?;
        let patch = usize::try_from(patch_index)
            .ok()
            .and_then(|i| patches.get(i))
            .ok_or(Error::ReferencePatchOutOfRange {
                afoc: ref_afoc,
                index: patch_index,
                count: patches.len(),
            })?;
        Ok((ref_afoc, patch))
    }
}

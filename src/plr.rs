//! Point local reconstruction (PLR): per patch or per block choice of how missing
//! points between the two depth maps are interpolated or filled.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::patch::Patch;
use crate::syntax::{PlrData, PlrInformation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PointLocalReconstructionMode {
    pub interpolate: bool,
    pub filling: bool,
    pub min_d1: u8,
    pub neighbor: u8,
}

impl Default for PointLocalReconstructionMode {
    /// Mode 0: no interpolation, no filling.
    fn default() -> Self {
        Self {
            interpolate: false,
            filling: false,
            min_d1: 0,
            neighbor: 1,
        }
    }
}

/// Builds the mode catalog. Entry 0 is always the implicit no-op mode.
pub fn build_plr_modes(plri: &PlrInformation) -> Vec<PointLocalReconstructionMode> {
    std::iter::once(PointLocalReconstructionMode::default())
        .chain(plri.modes.iter().map(|m| PointLocalReconstructionMode {
            interpolate: m.interpolate_flag,
            filling: m.filling_flag,
            min_d1: m.minimum_depth,
            neighbor: m.neighbour_minus1 + 1,
        }))
        .collect()
}

#[inline]
fn plr_mode(present: bool, mode_minus1: u8, catalog_len: usize) -> Result<u8> {
    if !present {
        return Ok(0);
    }
    let mode = mode_minus1 as usize + 1;
    if mode >= catalog_len {
        return Err(Error::UnknownPlrMode {
            mode,
            count: catalog_len,
        });
    }
    Ok(mode as u8)
}

/// Attaches the PLR modes of `plrd` to `patch`. The per-block storage must already
/// match the patch size (see `Patch::alloc_one_layer_data`).
pub(crate) fn resolve_plr(
    patch: &mut Patch,
    plrd: &PlrData,
    modes: &[PointLocalReconstructionMode],
) -> Result<()> {
    patch.plr_level = plrd.level_flag;
    if plrd.level_flag {
        patch.plr_mode_by_patch = plr_mode(plrd.present_flag, plrd.mode_minus1, modes.len())?;
        return Ok(());
    }

    let (size_u0, size_v0) = patch.size_uv0;
    if plrd.block_to_patch_map_width != size_u0 || plrd.block_to_patch_map_height != size_v0 {
        return Err(Error::PlrGridMismatch {
            width: plrd.block_to_patch_map_width,
            height: plrd.block_to_patch_map_height,
            size_u0,
            size_v0,
        });
    }
    patch.plr_mode_by_patch = 0;
    for (i, block_mode) in patch.plr_mode_by_block.iter_mut().enumerate() {
        let present = plrd.block_present_flag.get(i).copied().unwrap_or(false);
        let mode_minus1 = match (present, plrd.block_mode_minus1.get(i)) {
            (false, _) => 0,
            (true, Some(&m)) => m,
            (true, None) => {
                return Err(Error::OutOfRange {
                    field: "plr_block_mode_minus1",
                    value: i as i64,
                })
            }
        };
        *block_mode = plr_mode(present, mode_minus1, modes.len())?;
    }
    Ok(())
}

//! Occupancy and block-to-patch maps of a reconstructed frame.

use log::trace;

use crate::common::context::FrameContext;
use crate::common::ImageOccupancyMap;
use crate::error::{Error, Result};

/// Upsamples the decoded occupancy plane to full resolution. A pixel is occupied
/// when its decoded value exceeds `threshold`.
pub(crate) fn generate_occupancy_map(
    frame: &mut FrameContext,
    image: &ImageOccupancyMap,
    occupancy_precision: usize,
    threshold: u8,
) -> Result<()> {
    if occupancy_precision == 0 {
        return Err(Error::OutOfRange {
            field: "occupancy_precision",
            value: 0,
        });
    }
    let (width, height) = (frame.width as usize, frame.height as usize);
    if image.width as usize * occupancy_precision < width
        || image.height as usize * occupancy_precision < height
    {
        return Err(Error::OutOfRange {
            field: "occupancy_map_width",
            value: image.width as i64,
        });
    }
    frame.occupancy_map = (0..height)
        .flat_map(|v| (0..width).map(move |u| (u, v)))
        .map(|(u, v)| {
            let value = image.value(0, u / occupancy_precision, v / occupancy_precision);
            u32::from(value > threshold)
        })
        .collect();
    Ok(())
}

fn block_grid(frame: &FrameContext, occupancy_resolution: usize) -> (usize, usize) {
    (
        frame.width as usize / occupancy_resolution,
        frame.height as usize / occupancy_resolution,
    )
}

/// Marks every block covered by a patch's bounding box with `patch_index + 1`.
/// Later patches win where boxes overlap.
pub(crate) fn generate_block_to_patch_from_boundary_box(
    frame: &mut FrameContext,
    occupancy_resolution: usize,
) -> Result<()> {
    let (stride, rows) = block_grid(frame, occupancy_resolution);
    let mut block_to_patch = vec![0; stride * rows];
    for (patch_index, patch) in frame.patches.iter().enumerate() {
        let (size_u0, size_v0) = patch.size_uv0;
        for v0 in 0..size_v0 {
            for u0 in 0..size_u0 {
                let block = patch.patch_block_to_canvas_block(u0, v0, stride);
                let slot = block_to_patch.get_mut(block).ok_or(Error::OutOfRange {
                    field: "patch_block",
                    value: block as i64,
                })?;
                *slot = patch_index + 1;
            }
        }
    }
    frame.block_to_patch = block_to_patch;
    Ok(())
}

/// Like [`generate_block_to_patch_from_boundary_box`], but a block is only
/// assigned when at least one of its pixels is occupied.
pub(crate) fn generate_block_to_patch_from_occupancy_map(
    frame: &mut FrameContext,
    occupancy_resolution: usize,
) -> Result<()> {
    let (stride, rows) = block_grid(frame, occupancy_resolution);
    let width = frame.width as usize;
    let mut block_to_patch = vec![0; stride * rows];
    for (patch_index, patch) in frame.patches.iter().enumerate() {
        let (size_u0, size_v0) = patch.size_uv0;
        for v0 in 0..size_v0 {
            for u0 in 0..size_u0 {
                let block = patch.patch_block_to_canvas_block(u0, v0, stride);
                let occupied = (0..occupancy_resolution)
                    .flat_map(|v1| (0..occupancy_resolution).map(move |u1| (u1, v1)))
                    .any(|(u1, v1)| {
                        let (x, y) = patch.patch_to_canvas(
                            u0 * occupancy_resolution + u1,
                            v0 * occupancy_resolution + v1,
                        );
                        frame
                            .occupancy_map
                            .get(x + width * y)
                            .map_or(false, |&o| o != 0)
                    });
                if occupied {
                    let slot = block_to_patch.get_mut(block).ok_or(Error::OutOfRange {
                        field: "patch_block",
                        value: block as i64,
                    })?;
                    *slot = patch_index + 1;
                }
            }
        }
    }
    trace!(
        "frame {}: {} of {} blocks assigned",
        frame.index,
        block_to_patch.iter().filter(|&&b| b != 0).count(),
        block_to_patch.len()
    );
    frame.block_to_patch = block_to_patch;
    Ok(())
}

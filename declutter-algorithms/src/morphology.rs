use rayon::prelude::*;

use crate::raster::{CellMask, HeightLayer, Raster};

/// Smooths a height layer with an equal-weight box filter of `(2 * radius + 1)^2` cells.
///
/// Each output cell is the mean of all non-empty input cells inside the window centered on it. The
/// window is clipped at the borders of the layer and empty cells are ignored, so a truncated window
/// averages only over the cells that actually exist. A cell stays empty only if its whole window is
/// empty. With `radius == 0` the input is returned unchanged.
pub fn smooth_heights(layer: &HeightLayer, radius: usize) -> HeightLayer {
    if radius == 0 {
        return layer.clone();
    }
    let width = layer.width();
    let height = layer.height();
    let mut smoothed = Raster::filled(width, height, None);
    if width == 0 {
        return smoothed;
    }

    smoothed
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(row, out_row)| {
            let row_start = row.saturating_sub(radius);
            let row_end = (row + radius).min(height - 1);
            for (col, out) in out_row.iter_mut().enumerate() {
                let col_start = col.saturating_sub(radius);
                let col_end = (col + radius).min(width - 1);
                let mut sum = 0.0;
                let mut count = 0usize;
                for window_row in row_start..=row_end {
                    for value in layer.as_slice()
                        [window_row * width + col_start..=window_row * width + col_end]
                        .iter()
                        .flatten()
                    {
                        sum += *value;
                        count += 1;
                    }
                }
                if count > 0 {
                    *out = Some(sum / count as f64);
                }
            }
        });
    smoothed
}

/// Grows all set cells of `mask` by `radius` cells in every direction, i.e. a binary dilation with a
/// square structuring element of `(2 * radius + 1)^2` cells
pub fn dilate(mask: &CellMask, radius: usize) -> CellMask {
    if radius == 0 {
        return mask.clone();
    }
    let width = mask.width();
    let height = mask.height();
    let mut dilated = Raster::filled(width, height, false);
    for index in mask.set_indices() {
        let (col, row) = mask.col_row(index);
        let row_end = (row + radius).min(height - 1);
        let col_end = (col + radius).min(width - 1);
        for target_row in row.saturating_sub(radius)..=row_end {
            for target_col in col.saturating_sub(radius)..=col_end {
                *dilated.at_mut(target_col, target_row) = true;
            }
        }
    }
    dilated
}

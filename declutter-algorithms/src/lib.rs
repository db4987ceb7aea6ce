#![warn(clippy::all)]
//! Algorithms that detect and remove elongated surface clutter from point clouds.
//!
//! Cables, ropes and thin raised bands lying on the ground are found by modelling the
//! local ground height on a 2D grid ("2.5D") and flagging the grid cells whose height
//! above ground, shape and linear alignment match a clutter signature. The entry point
//! is [`pipeline::remove_clutter`], which runs all stages in order.

// Bounding boxes in the horizontal plane.
pub mod bounds;
// Converts between pasture point buffers and the plain position slices the pipeline runs on.
pub mod buffers;
// Flags grid cells whose height above ground and point density match clutter.
pub mod classify;
// Connected components of the candidate mask and their principal-axis shape.
pub mod components;
// Run parameters with their defaults and validation.
pub mod config;
// Bins points into a 2D grid with a low and high height quantile per cell.
pub mod grid;
// Hough transform that finds long straight bands among candidate cells.
pub mod hough;
// Equal-weight box filtering of height layers and binary dilation of cell masks.
pub mod morphology;
// Runs all stages in order.
pub mod pipeline;
// Dense row-major 2D storage used for every per-cell layer.
pub mod raster;
// Maps points back onto the cell mask and partitions them into kept and removed.
pub mod removal;
// Record of a run that the surrounding system persists.
pub mod summary;

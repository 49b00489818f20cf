//! Rasterizing PDF size reduction.
//!
//! Every page of the input is rendered to a bitmap, shrunk, color-reduced and
//! re-encoded, then placed as a single full-page image in a fresh document
//! whose page boxes match the original. Merge and image-to-PDF helpers share
//! the same output writer.

pub mod config;
pub mod error;
pub mod pdf;
pub mod pipeline;
pub mod raster;
pub mod render;

//! Image conversion between OpenCV `Mat` frames and `image` buffers.
//!
//! Camera frames arrive as BGR `CV_8UC3` matrices; the pipeline works on RGB
//! buffers. Both directions swap the channel order.

use crate::{
    utils::safe_cast::{i32_to_u32, u32_to_i32},
    Error, Result,
};
use image::{Rgb, RgbImage};
use opencv::core::{Mat, Scalar, CV_8UC3};
use opencv::prelude::*;

/// Convert a BGR `CV_8UC3` Mat to an RGB image
///
/// # Errors
///
/// Returns an error if the Mat is not 8-bit three-channel or its data cannot
/// be accessed.
pub fn mat_to_rgb(mat: &Mat) -> Result<RgbImage> {
    if mat.empty() {
        return Ok(RgbImage::new(0, 0));
    }
    if mat.typ() != CV_8UC3 {
        return Err(Error::InvalidInput(format!(
            "Expected an 8-bit BGR frame, got Mat type {}",
            mat.typ()
        )));
    }

    let width = i32_to_u32(mat.cols())?;
    let height = i32_to_u32(mat.rows())?;

    // ROIs and padded rows are not continuous; copy those first
    let continuous;
    let source = if mat.is_continuous() {
        mat
    } else {
        continuous = mat.try_clone()?;
        &continuous
    };

    let bytes = source.data_bytes()?;
    let mut image = RgbImage::new(width, height);
    for (px, bgr) in image.pixels_mut().zip(bytes.chunks_exact(3)) {
        *px = Rgb([bgr[2], bgr[1], bgr[0]]);
    }
    Ok(image)
}

/// Convert an RGB image to a BGR `CV_8UC3` Mat
///
/// # Errors
///
/// Returns an error if the image is too large for OpenCV or Mat creation fails.
pub fn rgb_to_mat(image: &RgbImage) -> Result<Mat> {
    let rows = u32_to_i32(image.height())?;
    let cols = u32_to_i32(image.width())?;

    let mut mat = Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(0.0))?;
    let bytes = mat.data_bytes_mut()?;
    for (bgr, px) in bytes.chunks_exact_mut(3).zip(image.pixels()) {
        bgr[0] = px[2];
        bgr[1] = px[1];
        bgr[2] = px[0];
    }
    Ok(mat)
}

use motion_sentry::{Frame, Result};
use opencv::{
    core::{self, Mat, Scalar},
    imgproc,
    prelude::*,
};

/// Copies a BGR `Mat` from OpenCV into an RGB `Frame`, using `rgb` as scratch.
pub fn frame_from_bgr(bgr: &Mat, rgb: &mut Mat) -> opencv::Result<Result<Frame>> {
    imgproc::cvt_color(bgr, rgb, imgproc::COLOR_BGR2RGB, 0)?;
    let (width, height) = (rgb.cols() as u32, rgb.rows() as u32);
    let data = rgb.data_bytes()?.to_vec();
    Ok(Frame::from_rgb(width, height, data))
}

/// Writes `frame` into `bgr` in OpenCV's channel order.
pub fn frame_to_bgr(frame: &Frame, bgr: &mut Mat) -> opencv::Result<()> {
    let mut rgb = Mat::new_rows_cols_with_default(
        frame.height() as i32,
        frame.width() as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    imgproc::cvt_color(&rgb, bgr, imgproc::COLOR_RGB2BGR, 0)
}

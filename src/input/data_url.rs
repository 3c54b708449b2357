// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/input/data_url.rs - base64 数据 URL 帧解码
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use base64::{Engine, engine::general_purpose::STANDARD};
use thiserror::Error;
use tracing::debug;

use crate::frame::RgbNhwcFrame;

/// 入站帧必须以该标记开头，例如 `data:image/jpeg;base64,....`
pub const FRAME_MARKER: &str = "data:image";

#[derive(Error, Debug)]
pub enum DataUrlError {
  #[error("payload is not an encoded image")]
  MarkerMismatch,
  #[error("encoded image has no data section")]
  MissingData,
  #[error("base64 decode error: {0}")]
  Base64Error(#[from] base64::DecodeError),
  #[error("image decode error: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 将 `data:image/...;base64,<payload>` 形式的文本解码为 RGB 帧
pub fn decode_frame(payload: &str) -> Result<RgbNhwcFrame, DataUrlError> {
  if !payload.starts_with(FRAME_MARKER) {
    return Err(DataUrlError::MarkerMismatch);
  }

  let (_, encoded) = payload.split_once(',').ok_or(DataUrlError::MissingData)?;
  let bytes = STANDARD.decode(encoded.trim())?;
  debug!("帧数据大小: {} 字节", bytes.len());

  let image = image::load_from_memory(&bytes)?.to_rgb8();
  Ok(RgbNhwcFrame::from(image))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{ImageFormat, Rgb, RgbImage};
  use std::io::Cursor;

  fn png_data_url(image: &RgbImage) -> String {
    let mut bytes = Vec::new();
    image
      .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
      .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
  }

  #[test]
  fn test_decode_png_frame() {
    let image = RgbImage::from_pixel(8, 6, Rgb([200, 150, 100]));
    let frame = decode_frame(&png_data_url(&image)).unwrap();
    assert_eq!((frame.width(), frame.height()), (8, 6));
    assert_eq!(frame.pixel(7, 5), [200, 150, 100]);
  }

  #[test]
  fn test_reject_missing_marker() {
    let err = decode_frame("hello world").unwrap_err();
    assert!(matches!(err, DataUrlError::MarkerMismatch));
  }

  #[test]
  fn test_reject_missing_data_section() {
    let err = decode_frame("data:image/png;base64").unwrap_err();
    assert!(matches!(err, DataUrlError::MissingData));
  }

  #[test]
  fn test_reject_bad_base64() {
    let err = decode_frame("data:image/png;base64,@@@@").unwrap_err();
    assert!(matches!(err, DataUrlError::Base64Error(_)));
  }

  #[test]
  fn test_reject_non_image_bytes() {
    let payload = format!("data:image/png;base64,{}", STANDARD.encode(b"not an image"));
    let err = decode_frame(&payload).unwrap_err();
    assert!(matches!(err, DataUrlError::ImageError(_)));
  }
}

// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/frame.rs - NHWC 帧定义
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

use image::{ImageBuffer, Rgb, RgbImage};

use crate::input::AsNhwcFrame;

const RGB_CHANNELS: usize = 3;

/// 解码后的 RGB 帧，按 NHWC（行优先、通道交错）存放。
///
/// 摄像头帧的尺寸由客户端决定，因此形状在运行时确定。
#[derive(Debug, Clone)]
pub struct RgbNhwcFrame {
  width: usize,
  height: usize,
  data: Box<[u8]>,
}

impl RgbNhwcFrame {
  pub fn with_shape(height: usize, width: usize) -> Self {
    let data = vec![0u8; RGB_CHANNELS * width * height].into_boxed_slice();
    Self {
      width,
      height,
      data,
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  /// 读取 (x, y) 处的像素，调用方保证坐标在图像范围内
  pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
    let idx = (y * self.width + x) * RGB_CHANNELS;
    [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
  }

  pub fn to_rgb_image(&self) -> RgbImage {
    ImageBuffer::from_fn(self.width as u32, self.height as u32, |x, y| {
      Rgb(self.pixel(x as usize, y as usize))
    })
  }
}

impl From<RgbImage> for RgbNhwcFrame {
  fn from(image: RgbImage) -> Self {
    let (width, height) = image.dimensions();
    // RgbImage 的底层存储本身就是 NHWC
    Self {
      width: width as usize,
      height: height as usize,
      data: image.into_raw().into_boxed_slice(),
    }
  }
}

impl AsNhwcFrame for RgbNhwcFrame {
  fn as_nhwc(&self) -> &[u8] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_rgb_image_keeps_layout() {
    let mut image = RgbImage::new(4, 3);
    image.put_pixel(2, 1, Rgb([10, 20, 30]));
    let frame = RgbNhwcFrame::from(image);

    assert_eq!(frame.width(), 4);
    assert_eq!(frame.height(), 3);
    assert_eq!(frame.pixel(2, 1), [10, 20, 30]);
    assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    assert_eq!(frame.to_rgb_image().get_pixel(2, 1), &Rgb([10, 20, 30]));
  }

  #[test]
  fn test_with_shape_is_zeroed() {
    let frame = RgbNhwcFrame::with_shape(2, 5);
    assert_eq!((frame.width(), frame.height()), (5, 2));
    assert_eq!(frame.as_nhwc().len(), 30);
    assert!(frame.as_nhwc().iter().all(|&b| b == 0));
  }
}

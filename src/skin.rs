// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/skin.rs - 肤色采样与分类
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

//! 在鼻子周围的固定方形区域内取平均颜色，并映射到固定色板。

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::{frame::RgbNhwcFrame, keypoint::CanonicalLandmark};

/// 采样区域半宽（像素）
pub const SAMPLE_HALF_WIDTH: i64 = 15;

/// 无法采样时的肤色标签
pub const UNKNOWN_TONE: &str = "Unknown";

const FALLBACK_COLORS: &[&str] = &["Neutral Colors"];

/// 采样区域 [x1, y1, x2, y2)，源图像像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
  pub x1: i64,
  pub y1: i64,
  pub x2: i64,
  pub y2: i64,
}

impl Serialize for RegionBounds {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    [self.x1, self.y1, self.x2, self.y2].serialize(serializer)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinSample {
  /// (R, G, B)，取值 [0, 255]
  pub average_color: [f64; 3],
  pub region: RegionBounds,
}

/// 以规范序列第一个地标（鼻子）为中心采样。
///
/// 区域任一方向超出图像时返回 `None`，不做裁剪。
pub fn sample(frame: &RgbNhwcFrame, landmarks: &[CanonicalLandmark]) -> Option<SkinSample> {
  let nose = landmarks.first()?;
  let (x, y) = (nose.x.trunc() as i64, nose.y.trunc() as i64);
  let (w, h) = (frame.width() as i64, frame.height() as i64);
  let r = SAMPLE_HALF_WIDTH;

  if x < r || y < r || x > w - r || y > h - r {
    debug!("采样区域超出图像边界: 鼻子 ({}, {}), 图像 {}x{}", x, y, w, h);
    return None;
  }

  let region = RegionBounds {
    x1: x - r,
    y1: y - r,
    x2: x + r,
    y2: y + r,
  };

  let mut sum = [0u64; 3];
  for py in region.y1..region.y2 {
    for px in region.x1..region.x2 {
      let pixel = frame.pixel(px as usize, py as usize);
      for (acc, channel) in sum.iter_mut().zip(pixel) {
        *acc += channel as u64;
      }
    }
  }

  let count = ((region.x2 - region.x1) * (region.y2 - region.y1)) as f64;
  Some(SkinSample {
    average_color: sum.map(|s| s as f64 / count),
    region,
  })
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaletteEntry {
  pub label: String,
  pub reference: [f64; 3],
}

impl PaletteEntry {
  pub fn new(label: &str, reference: [f64; 3]) -> Self {
    Self {
      label: label.to_string(),
      reference,
    }
  }
}

/// 肤色色板，声明顺序决定距离相等时的归属
#[derive(Debug, Clone)]
pub struct Palette {
  entries: Vec<PaletteEntry>,
}

impl Default for Palette {
  fn default() -> Self {
    Self::new(vec![
      PaletteEntry::new("Fair", [255.0, 224.0, 189.0]),
      PaletteEntry::new("Wheatish", [255.0, 205.0, 148.0]),
      PaletteEntry::new("Dusky", [210.0, 161.0, 140.0]),
      PaletteEntry::new("Deep", [141.0, 85.0, 36.0]),
    ])
  }
}

impl Palette {
  pub fn new(entries: Vec<PaletteEntry>) -> Self {
    Self { entries }
  }

  /// 欧氏距离最近邻；距离相等时先声明者胜出
  pub fn classify(&self, sample: Option<&SkinSample>) -> &str {
    let Some(sample) = sample else {
      return UNKNOWN_TONE;
    };

    let mut best: Option<(&PaletteEntry, f64)> = None;
    for entry in &self.entries {
      let dist = color_distance(&sample.average_color, &entry.reference);
      if best.is_none_or(|(_, min)| dist < min) {
        best = Some((entry, dist));
      }
    }
    best.map_or(UNKNOWN_TONE, |(entry, _)| entry.label.as_str())
  }
}

fn color_distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
  a.iter()
    .zip(b)
    .map(|(x, y)| (x - y) * (x - y))
    .sum::<f64>()
    .sqrt()
}

/// 肤色对应的推荐颜色，未知标签返回单项兜底
pub fn color_recommendation(tone: &str) -> &'static [&'static str] {
  match tone {
    "Fair" => &["Royal Blue", "Deep Red", "Emerald Green", "Pastels"],
    "Wheatish" => &["Mustard Yellow", "Olive Green", "Warm Browns", "Teal"],
    "Dusky" => &["White", "Gold", "Bright Orange", "Earthy Tones"],
    "Deep" => &["Silver", "Cobalt Blue", "Pale Pink", "Wine Red"],
    _ => FALLBACK_COLORS,
  }
}

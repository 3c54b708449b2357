// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/metrics.rs - 人体测量指标
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

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::keypoint::{KeypointLayout, LandmarkId};

/// 腰宽为 0 时使用的肩腰比
pub const DEGENERATE_RATIO: f64 = 1.0;

pub const DEFAULT_RATIO_HIGH: f64 = 1.4;
pub const DEFAULT_RATIO_LOW: f64 = 1.1;
pub const DEFAULT_RATIO_BOUNDARY: f64 = 1.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BodyType {
  Ectomorph,
  Mesomorph,
  Endomorph,
}

impl BodyType {
  pub fn as_str(&self) -> &'static str {
    match self {
      BodyType::Ectomorph => "Ectomorph",
      BodyType::Mesomorph => "Mesomorph",
      BodyType::Endomorph => "Endomorph",
    }
  }
}

impl fmt::Display for BodyType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 肩腰比到体型的划分方式，每个进程只启用一种。
///
/// 比值恰好落在阈值上时归入中间一档（严格大于/小于才越界）。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyTypeScheme {
  /// `ratio > high` 为外胚型，`ratio < low` 为内胚型，其余为中胚型
  ThreeBucket { high: f64, low: f64 },
  /// `ratio > boundary` 为中胚型，其余为外胚型
  TwoBucket { boundary: f64 },
}

impl Default for BodyTypeScheme {
  fn default() -> Self {
    BodyTypeScheme::ThreeBucket {
      high: DEFAULT_RATIO_HIGH,
      low: DEFAULT_RATIO_LOW,
    }
  }
}

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SchemeError {
  #[error("体型阈值必须是有限数值: {0}")]
  NonFinite(f64),
  #[error("三档划分的下阈值 {low} 大于上阈值 {high}")]
  InvertedThresholds { high: f64, low: f64 },
}

impl BodyTypeScheme {
  /// 启动时检查阈值，避免某一档永远无法命中
  pub fn validate(&self) -> Result<(), SchemeError> {
    let finite = |value: f64| {
      if value.is_finite() {
        Ok(())
      } else {
        Err(SchemeError::NonFinite(value))
      }
    };

    match *self {
      BodyTypeScheme::ThreeBucket { high, low } => {
        finite(high)?;
        finite(low)?;
        if low > high {
          return Err(SchemeError::InvertedThresholds { high, low });
        }
        Ok(())
      }
      BodyTypeScheme::TwoBucket { boundary } => finite(boundary),
    }
  }

  pub fn two_bucket() -> Self {
    BodyTypeScheme::TwoBucket {
      boundary: DEFAULT_RATIO_BOUNDARY,
    }
  }

  pub fn classify(&self, ratio: f64) -> BodyType {
    match *self {
      BodyTypeScheme::ThreeBucket { high, low } => {
        if ratio > high {
          BodyType::Ectomorph
        } else if ratio < low {
          BodyType::Endomorph
        } else {
          BodyType::Mesomorph
        }
      }
      BodyTypeScheme::TwoBucket { boundary } => {
        if ratio > boundary {
          BodyType::Mesomorph
        } else {
          BodyType::Ectomorph
        }
      }
    }
  }
}

/// 单帧的体型指标，数值已保留两位小数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Metrics {
  pub body_type: BodyType,
  pub ratio: f64,
  pub shoulder_width: f64,
  pub waist_width: f64,
}

pub fn euclidean_distance(a: [f32; 2], b: [f32; 2]) -> f64 {
  let dx = a[0] as f64 - b[0] as f64;
  let dy = a[1] as f64 - b[1] as f64;
  (dx * dx + dy * dy).sqrt()
}

fn round2(value: f64) -> f64 {
  (value * 100.0).round() / 100.0
}

/// 直接从原始关键点的肩、髋两对坐标计算指标。
///
/// 任一关键点缺失时返回 `None`。分类使用未取整的比值。
pub fn compute_metrics(
  raw: &[[f32; 2]],
  layout: &KeypointLayout,
  scheme: &BodyTypeScheme,
) -> Option<Metrics> {
  let left_shoulder = layout.raw_point(raw, LandmarkId::LeftShoulder)?;
  let right_shoulder = layout.raw_point(raw, LandmarkId::RightShoulder)?;
  let left_hip = layout.raw_point(raw, LandmarkId::LeftHip)?;
  let right_hip = layout.raw_point(raw, LandmarkId::RightHip)?;

  let shoulder_width = euclidean_distance(left_shoulder, right_shoulder);
  let waist_width = euclidean_distance(left_hip, right_hip);
  let ratio = if waist_width > 0.0 {
    shoulder_width / waist_width
  } else {
    DEGENERATE_RATIO
  };

  Some(Metrics {
    body_type: scheme.classify(ratio),
    ratio: round2(ratio),
    shoulder_width: round2(shoulder_width),
    waist_width: round2(waist_width),
  })
}

// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/model.rs - 姿态估计模型
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

/// 推理能力。对分析流水线而言模型是不透明的：给定一帧，返回零个或多个关键点集合。
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Debug, Clone)]
pub struct PoseItem {
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，像素坐标
  /// 按检测器自身索引排列的 (x, y) 像素坐标
  pub keypoints: Box<[[f32; 2]]>,
}

#[derive(Debug, Clone, Default)]
pub struct PoseResult {
  pub items: Box<[PoseItem]>,
}

impl PoseResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// 只处理主要（第一个）检测结果，多人场景不在处理范围内
  pub fn primary(&self) -> Option<&PoseItem> {
    self.items.first()
  }
}

impl From<Vec<PoseItem>> for PoseResult {
  fn from(items: Vec<PoseItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

#[cfg(feature = "model_yolov8_pose")]
mod yolov8_pose;
#[cfg(feature = "model_yolov8_pose")]
pub use self::yolov8_pose::{Yolov8Pose, Yolov8PoseBuilder, Yolov8PoseError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_primary_is_first_item() {
    let result = PoseResult::from(vec![
      PoseItem {
        score: 0.9,
        bbox: [0.0; 4],
        keypoints: vec![[1.0, 2.0]].into_boxed_slice(),
      },
      PoseItem {
        score: 0.8,
        bbox: [0.0; 4],
        keypoints: vec![[3.0, 4.0]].into_boxed_slice(),
      },
    ]);
    assert!(!result.is_empty());
    assert_eq!(result.primary().unwrap().keypoints[0], [1.0, 2.0]);
  }

  #[test]
  fn test_empty_result_has_no_primary() {
    let result = PoseResult::default();
    assert!(result.is_empty());
    assert!(result.primary().is_none());
  }
}

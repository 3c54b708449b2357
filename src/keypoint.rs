// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/keypoint.rs - 关键点适配器
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

//! 将不同检测器的关键点排布统一为规范地标。
//!
//! 每种检测器对应一张 (语义地标 -> 原始索引) 的映射表，启动时校验。
//! 新增检测器只需要新增一张表。

use serde::{Serialize, Serializer, ser::SerializeTuple};
use thiserror::Error;

/// 规范地标标识，取值与 MediaPipe 33 点编号一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum LandmarkId {
  Nose = 0,
  LeftShoulder = 11,
  RightShoulder = 12,
  LeftHip = 23,
  RightHip = 24,
}

impl LandmarkId {
  /// 流水线所需的地标，鼻子必须排在第一位
  pub const PIPELINE: [LandmarkId; 5] = [
    LandmarkId::Nose,
    LandmarkId::LeftShoulder,
    LandmarkId::RightShoulder,
    LandmarkId::LeftHip,
    LandmarkId::RightHip,
  ];

  pub fn id(self) -> u32 {
    self as u32
  }
}

/// 少于该数量的规范地标不足以计算体型指标
pub const MIN_CANONICAL_LANDMARKS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanonicalLandmark {
  pub id: LandmarkId,
  pub x: f32,
  pub y: f32,
  /// 深度占位
  pub z: f32,
}

// 线上格式为 [id, x, y, z]
impl Serialize for CanonicalLandmark {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut tuple = serializer.serialize_tuple(4)?;
    tuple.serialize_element(&self.id.id())?;
    tuple.serialize_element(&self.x)?;
    tuple.serialize_element(&self.y)?;
    tuple.serialize_element(&self.z)?;
    tuple.end()
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorSchema {
  /// COCO 17 点（YOLOv8-Pose 等）
  Coco17,
  /// MediaPipe Pose 33 点
  Mediapipe33,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum KeypointError {
  #[error("{0:?} 映射表的第一项必须是鼻子")]
  NoseNotFirst(DetectorSchema),
  #[error("{0:?} 映射表缺少地标 {1:?}")]
  MissingLandmark(DetectorSchema, LandmarkId),
  #[error("{0:?} 映射表中地标 {1:?} 的索引 {2} 超出关键点数量 {3}")]
  IndexOutOfRange(DetectorSchema, LandmarkId, usize, usize),
}

/// 某一检测器的关键点排布
#[derive(Debug, Clone)]
pub struct KeypointLayout {
  pub schema: DetectorSchema,
  /// 检测器输出的关键点总数
  pub keypoint_count: usize,
  /// (规范地标, 原始索引)，按写入规范序列的顺序排列
  pub indices: [(LandmarkId, usize); 5],
}

const COCO17_LAYOUT: KeypointLayout = KeypointLayout {
  schema: DetectorSchema::Coco17,
  keypoint_count: 17,
  indices: [
    (LandmarkId::Nose, 0),
    (LandmarkId::LeftShoulder, 5),
    (LandmarkId::RightShoulder, 6),
    (LandmarkId::LeftHip, 11),
    (LandmarkId::RightHip, 12),
  ],
};

const MEDIAPIPE33_LAYOUT: KeypointLayout = KeypointLayout {
  schema: DetectorSchema::Mediapipe33,
  keypoint_count: 33,
  indices: [
    (LandmarkId::Nose, 0),
    (LandmarkId::LeftShoulder, 11),
    (LandmarkId::RightShoulder, 12),
    (LandmarkId::LeftHip, 23),
    (LandmarkId::RightHip, 24),
  ],
};

impl KeypointLayout {
  pub fn for_schema(schema: DetectorSchema) -> &'static KeypointLayout {
    match schema {
      DetectorSchema::Coco17 => &COCO17_LAYOUT,
      DetectorSchema::Mediapipe33 => &MEDIAPIPE33_LAYOUT,
    }
  }

  pub fn validate(&self) -> Result<(), KeypointError> {
    if self.indices[0].0 != LandmarkId::Nose {
      return Err(KeypointError::NoseNotFirst(self.schema));
    }
    for landmark in LandmarkId::PIPELINE {
      let (_, index) = self
        .indices
        .iter()
        .find(|(id, _)| *id == landmark)
        .ok_or(KeypointError::MissingLandmark(self.schema, landmark))?;
      if *index >= self.keypoint_count {
        return Err(KeypointError::IndexOutOfRange(
          self.schema,
          landmark,
          *index,
          self.keypoint_count,
        ));
      }
    }
    Ok(())
  }

  /// 原始关键点序列至少需要的长度
  pub fn required_len(&self) -> usize {
    self.indices.iter().map(|(_, i)| i + 1).max().unwrap_or(0)
  }

  pub fn raw_index(&self, landmark: LandmarkId) -> Option<usize> {
    self
      .indices
      .iter()
      .find(|(id, _)| *id == landmark)
      .map(|(_, i)| *i)
  }

  /// 按语义地标取原始坐标，序列过短时返回 `None`
  pub fn raw_point(&self, raw: &[[f32; 2]], landmark: LandmarkId) -> Option<[f32; 2]> {
    self.raw_index(landmark).and_then(|i| raw.get(i)).copied()
  }
}

/// 将原始关键点转换为规范地标序列。
///
/// 序列过短（人体未完整入镜）时返回空序列，这不是错误。
pub fn normalize(raw: &[[f32; 2]], layout: &KeypointLayout) -> Vec<CanonicalLandmark> {
  if raw.len() < layout.required_len() {
    return Vec::new();
  }

  layout
    .indices
    .iter()
    .map(|&(id, index)| CanonicalLandmark {
      id,
      x: raw[index][0],
      y: raw[index][1],
      z: 0.0,
    })
    .collect()
}

pub fn is_sufficient(landmarks: &[CanonicalLandmark]) -> bool {
  landmarks.len() >= MIN_CANONICAL_LANDMARKS
}

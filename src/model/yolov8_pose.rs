// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/model/yolov8_pose.rs - RKNN YOLOv8-Pose 模型
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

use std::sync::Mutex;

use image::imageops::{self, FilterType};
use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  input::AsNhwcFrame,
  model::{Model, PoseItem, PoseResult},
};

const YOLOV8_POSE_NUM_INPUTS: u32 = 1;
const YOLOV8_POSE_NUM_OUTPUTS: u32 = 1;
const YOLOV8_POSE_INPUT_W: u32 = 640;
const YOLOV8_POSE_INPUT_H: u32 = 640;
const YOLOV8_POSE_ANCHORS: usize = 8400;
const YOLOV8_POSE_KEYPOINTS: usize = 17;
// 4 个框坐标 + 1 个置信度 + 17 x (x, y, conf)
const YOLOV8_POSE_CHANNELS: usize = 4 + 1 + YOLOV8_POSE_KEYPOINTS * 3;
const YOLOV8_POSE_OBJECT_THRESH: f32 = 0.5;
const YOLOV8_POSE_NMS_THRESH: f32 = 0.45;

pub struct Yolov8Pose {
  // RKNN 上下文不可重入，多个会话共享同一实例时串行推理
  context: Mutex<Context>,
  confidence: f32,
  nms_threshold: f32,
}

#[derive(Error, Debug)]
pub enum Yolov8PoseError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(#[from] std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, rknpu::Error),
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("模型输出错误: {0}")]
  OutputError(String),
}

impl Yolov8PoseError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    Yolov8PoseError::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolov8PoseBuilder {
  model_path: String,
  flags: InitFlags,
  confidence: f32,
  nms_threshold: f32,
}

impl FromUrlWithScheme for Yolov8PoseBuilder {
  const SCHEME: &'static str = "yolov8pose";
}

impl FromUrl for Yolov8PoseBuilder {
  type Error = Yolov8PoseError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov8PoseError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    Ok(Yolov8PoseBuilder {
      model_path: url.path().to_string(),
      flags: InitFlags::default(),
      confidence: YOLOV8_POSE_OBJECT_THRESH,
      nms_threshold: YOLOV8_POSE_NMS_THRESH,
    })
  }
}

impl Yolov8PoseBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold;
    self
  }

  pub fn build(self) -> Result<Yolov8Pose, Yolov8PoseError> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)?;

    let num_inputs = context
      .num_inputs()
      .map_err(|e| Yolov8PoseError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| Yolov8PoseError::invalid("无法获取输出数量", e))?;

    if num_inputs != YOLOV8_POSE_NUM_INPUTS || num_outputs != YOLOV8_POSE_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        YOLOV8_POSE_NUM_INPUTS, YOLOV8_POSE_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(Yolov8PoseError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    info!("模型加载完成");
    Ok(Yolov8Pose {
      context: Mutex::new(context),
      confidence: self.confidence,
      nms_threshold: self.nms_threshold,
    })
  }
}

impl Model for Yolov8Pose {
  type Input = RgbNhwcFrame;
  type Output = PoseResult;
  type Error = Yolov8PoseError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    // 直接拉伸到模型输入尺寸，关键点再按比例映射回原图
    let resized;
    let data = if input.width() == YOLOV8_POSE_INPUT_W as usize
      && input.height() == YOLOV8_POSE_INPUT_H as usize
    {
      input.as_nhwc()
    } else {
      resized = imageops::resize(
        &input.to_rgb_image(),
        YOLOV8_POSE_INPUT_W,
        YOLOV8_POSE_INPUT_H,
        FilterType::Triangle,
      );
      resized.as_raw().as_slice()
    };
    let scale_x = input.width() as f32 / YOLOV8_POSE_INPUT_W as f32;
    let scale_y = input.height() as f32 / YOLOV8_POSE_INPUT_H as f32;

    let context = self.context.lock().unwrap_or_else(|e| e.into_inner());

    debug!("设置模型输入");
    context.set_input(0, data, TensorFormat::NHWC, TensorType::UInt8)?;

    debug!("执行模型推理");
    context.run()?;

    let output = context.get_outputs()?;
    let tensor = output.get_f32(0).map_err(|e| {
      error!("获取模型输出失败: {}", e);
      Yolov8PoseError::OutputError(e.to_string())
    })?;

    Ok(self.postprocess(tensor, scale_x, scale_y))
  }
}

impl Yolov8Pose {
  /// 输出张量为通道优先布局 [56, 8400]
  fn postprocess(&self, tensor: &[f32], scale_x: f32, scale_y: f32) -> PoseResult {
    if tensor.len() != YOLOV8_POSE_CHANNELS * YOLOV8_POSE_ANCHORS {
      error!(
        "输出大小不匹配: 期望 {}, 实际 {}",
        YOLOV8_POSE_CHANNELS * YOLOV8_POSE_ANCHORS,
        tensor.len()
      );
      return PoseResult::default();
    }

    let at = |channel: usize, anchor: usize| tensor[channel * YOLOV8_POSE_ANCHORS + anchor];

    let mut candidates = Vec::new();
    for anchor in 0..YOLOV8_POSE_ANCHORS {
      let score = at(4, anchor);
      if score.is_nan() || score < self.confidence {
        continue;
      }

      let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
      let bbox = [
        (cx - w / 2.0) * scale_x,
        (cy - h / 2.0) * scale_y,
        (cx + w / 2.0) * scale_x,
        (cy + h / 2.0) * scale_y,
      ];

      let keypoints = (0..YOLOV8_POSE_KEYPOINTS)
        .map(|k| {
          let base = 5 + k * 3;
          [at(base, anchor) * scale_x, at(base + 1, anchor) * scale_y]
        })
        .collect::<Vec<_>>()
        .into_boxed_slice();

      candidates.push(PoseItem {
        score,
        bbox,
        keypoints,
      });
    }

    let items = nms(candidates, self.nms_threshold);
    debug!("检测到 {} 个人体", items.len());
    PoseResult::from(items)
  }
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
  let h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
  let inter = w * h;
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - inter;
  if union <= 0.0 { 0.0 } else { inter / union }
}

/// 按置信度降序的贪心 NMS，结果第一项即主要检测
fn nms(mut candidates: Vec<PoseItem>, threshold: f32) -> Vec<PoseItem> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
  let mut kept: Vec<PoseItem> = Vec::new();
  for candidate in candidates {
    if kept.iter().all(|k| iou(&k.bbox, &candidate.bbox) <= threshold) {
      kept.push(candidate);
    }
  }
  kept
}

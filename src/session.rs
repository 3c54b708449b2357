// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/session.rs - 会话协调器
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

//! 单帧分析流水线与每连接的顺序会话循环。
//!
//! 一个连接内严格串行：接收 -> 解码 -> 推理 -> 推导 -> 响应，
//! 上一帧的结果发出之前不会开始处理下一帧。取消只在接收与推理两处被观察到。

use std::{fmt, future::Future, sync::Arc};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  frame::RgbNhwcFrame,
  input::{DataUrlError, decode_frame},
  keypoint::{
    CanonicalLandmark, DetectorSchema, KeypointError, KeypointLayout, is_sufficient, normalize,
  },
  metrics::{BodyTypeScheme, Metrics, SchemeError, compute_metrics},
  model::{Model, PoseResult},
  skin::{self, Palette, RegionBounds},
};

pub const SEARCHING_MESSAGE: &str = "Position yourself in frame";
pub const INVALID_FRAME_MESSAGE: &str = "Invalid frame format";
pub const UNDECODABLE_FRAME_MESSAGE: &str = "Could not decode frame";
pub const INFERENCE_FAILED_MESSAGE: &str = "Inference failed";

/// 出站消息，`status` 字段区分三种结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Outbound {
  Success {
    metrics: Metrics,
    skin_tone: String,
    landmarks: Vec<CanonicalLandmark>,
    skin_roi: Option<RegionBounds>,
  },
  Searching {
    message: String,
  },
  Error {
    message: String,
  },
}

impl Outbound {
  pub fn searching() -> Self {
    Outbound::Searching {
      message: SEARCHING_MESSAGE.to_string(),
    }
  }

  pub fn error(message: &str) -> Self {
    Outbound::Error {
      message: message.to_string(),
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, Outbound::Success { .. })
  }
}

/// 一帧完整的分析结果，各字段要么一起出现，要么整帧没有结果
#[derive(Debug, Clone, PartialEq)]
pub struct FrameAnalysis {
  pub metrics: Metrics,
  pub skin_tone: String,
  pub landmarks: Vec<CanonicalLandmark>,
  pub skin_roi: Option<RegionBounds>,
}

impl From<FrameAnalysis> for Outbound {
  fn from(analysis: FrameAnalysis) -> Self {
    Outbound::Success {
      metrics: analysis.metrics,
      skin_tone: analysis.skin_tone,
      landmarks: analysis.landmarks,
      skin_roi: analysis.skin_roi,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineConfig {
  pub schema: DetectorSchema,
  pub scheme: BodyTypeScheme,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      schema: DetectorSchema::Coco17,
      scheme: BodyTypeScheme::default(),
    }
  }
}

/// 流水线启动配置错误
#[derive(Error, Debug, PartialEq)]
pub enum PipelineError {
  #[error("关键点排布错误: {0}")]
  KeypointError(#[from] KeypointError),
  #[error("体型阈值错误: {0}")]
  SchemeError(#[from] SchemeError),
}

/// 单帧分析流水线。启动时构造一次，之后只读，由所有会话共享。
pub struct FramePipeline<M> {
  model: M,
  layout: &'static KeypointLayout,
  scheme: BodyTypeScheme,
  palette: Palette,
}

impl<M> FramePipeline<M> {
  pub fn new(model: M, config: PipelineConfig, palette: Palette) -> Result<Self, PipelineError> {
    let layout = KeypointLayout::for_schema(config.schema);
    layout.validate()?;
    config.scheme.validate()?;
    info!(
      "流水线就绪: 检测器排布 {:?}, 体型划分 {:?}",
      config.schema, config.scheme
    );
    Ok(Self {
      model,
      layout,
      scheme: config.scheme,
      palette,
    })
  }

  /// 由检测结果推导指标与肤色。
  ///
  /// 无检测、关键点不足或指标无法计算时整帧返回 `None`，不输出部分结果。
  pub fn derive(&self, frame: &RgbNhwcFrame, pose: &PoseResult) -> Option<FrameAnalysis> {
    let item = pose.primary()?;
    if pose.items.len() > 1 {
      debug!("检测到 {} 个人体，仅使用第一个", pose.items.len());
    }

    let landmarks = normalize(&item.keypoints, self.layout);
    if !is_sufficient(&landmarks) {
      debug!("关键点不足: {} 个原始关键点", item.keypoints.len());
      return None;
    }

    let metrics = compute_metrics(&item.keypoints, self.layout, &self.scheme)?;
    let sample = skin::sample(frame, &landmarks);
    let skin_tone = self.palette.classify(sample.as_ref()).to_string();
    debug!("指标: {:?}, 肤色: {}", metrics, skin_tone);

    Some(FrameAnalysis {
      metrics,
      skin_tone,
      landmarks,
      skin_roi: sample.map(|s| s.region),
    })
  }
}

impl<M> FramePipeline<M>
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult>,
{
  pub fn analyze(&self, frame: &RgbNhwcFrame) -> Result<Option<FrameAnalysis>, M::Error> {
    let pose = self.model.infer(frame)?;
    Ok(self.derive(frame, &pose))
  }
}

/// 流水线本身也是一个模型：输入一帧，输出一条出站消息
impl<M> Model for FramePipeline<M>
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult>,
{
  type Input = RgbNhwcFrame;
  type Output = Outbound;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    Ok(match self.analyze(input)? {
      Some(analysis) => analysis.into(),
      None => Outbound::searching(),
    })
  }
}

/// 会话状态机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  AwaitingFrame,
  Decoding,
  Detecting,
  NoDetection,
  HasDetection,
  Emitting,
  Closed,
}

/// 会话的双向传输通道，接收 `None` 表示对端断开
pub trait FrameTransport {
  type Error: fmt::Display;

  fn recv(&mut self) -> impl Future<Output = Option<String>> + Send;
  fn send(&mut self, message: &Outbound) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

pub struct Session<M> {
  pipeline: Arc<FramePipeline<M>>,
  state: SessionState,
  frames: u64,
}

impl<M> Session<M>
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult> + Send + Sync + 'static,
  M::Error: fmt::Display + Send + 'static,
{
  pub fn new(pipeline: Arc<FramePipeline<M>>) -> Self {
    Self {
      pipeline,
      state: SessionState::AwaitingFrame,
      frames: 0,
    }
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  fn transition(&mut self, next: SessionState) {
    debug!("会话状态: {:?} -> {:?}", self.state, next);
    self.state = next;
  }

  /// 处理一条入站消息，返回待发送的响应，此时状态停在 `Emitting`
  pub async fn handle(&mut self, payload: &str) -> Outbound {
    self.transition(SessionState::Decoding);
    let frame = match decode_frame(payload) {
      Ok(frame) => frame,
      Err(e) => {
        warn!("帧解码失败: {}", e);
        self.transition(SessionState::Emitting);
        let message = match e {
          DataUrlError::MarkerMismatch => INVALID_FRAME_MESSAGE,
          _ => UNDECODABLE_FRAME_MESSAGE,
        };
        return Outbound::error(message);
      }
    };
    debug!("帧解码完成: {}x{}", frame.width(), frame.height());

    self.transition(SessionState::Detecting);
    // 推理在阻塞线程池中执行
    let pipeline = self.pipeline.clone();
    let now = std::time::Instant::now();
    let analysis = tokio::task::spawn_blocking(move || pipeline.analyze(&frame)).await;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let outbound = match analysis {
      Ok(Ok(Some(analysis))) => {
        self.transition(SessionState::HasDetection);
        analysis.into()
      }
      Ok(Ok(None)) => {
        self.transition(SessionState::NoDetection);
        Outbound::searching()
      }
      Ok(Err(e)) => {
        error!("推理失败: {}", e);
        Outbound::error(INFERENCE_FAILED_MESSAGE)
      }
      Err(e) => {
        error!("推理任务异常结束: {}", e);
        Outbound::error(INFERENCE_FAILED_MESSAGE)
      }
    };

    self.transition(SessionState::Emitting);
    outbound
  }

  /// 会话主循环，直到对端断开或发送失败
  pub async fn run<T: FrameTransport + Send>(mut self, mut transport: T) -> u64 {
    info!("会话开始");
    loop {
      self.transition(SessionState::AwaitingFrame);
      let Some(payload) = transport.recv().await else {
        info!("客户端断开连接");
        break;
      };

      let outbound = self.handle(&payload).await;
      if let Err(e) = transport.send(&outbound).await {
        warn!("发送失败，丢弃本帧结果: {}", e);
        break;
      }
      self.frames += 1;
    }

    self.transition(SessionState::Closed);
    info!("会话结束，共处理 {} 帧", self.frames);
    self.frames
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{metrics::BodyType, model::PoseItem, skin::UNKNOWN_TONE};
  use image::{Rgb, RgbImage};

  struct NoModel;

  impl Model for NoModel {
    type Input = RgbNhwcFrame;
    type Output = PoseResult;
    type Error = std::convert::Infallible;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Ok(PoseResult::default())
    }
  }

  fn pipeline() -> FramePipeline<NoModel> {
    FramePipeline::new(NoModel, PipelineConfig::default(), Palette::default()).unwrap()
  }

  fn pose(keypoints: Vec<[f32; 2]>) -> PoseResult {
    PoseResult::from(vec![PoseItem {
      score: 0.9,
      bbox: [0.0, 0.0, 200.0, 200.0],
      keypoints: keypoints.into_boxed_slice(),
    }])
  }

  fn coco(nose: [f32; 2]) -> Vec<[f32; 2]> {
    let mut raw = vec![[0.0, 0.0]; 17];
    raw[0] = nose;
    raw[5] = [60.0, 80.0];
    raw[6] = [140.0, 80.0];
    raw[11] = [80.0, 150.0];
    raw[12] = [120.0, 150.0];
    raw
  }

  fn frame() -> RgbNhwcFrame {
    RgbNhwcFrame::from(RgbImage::from_pixel(200, 200, Rgb([255, 224, 189])))
  }

  #[test]
  fn test_derive_full_analysis() {
    let analysis = pipeline().derive(&frame(), &pose(coco([100.0, 40.0]))).unwrap();
    assert_eq!(analysis.metrics.ratio, 2.0);
    assert_eq!(analysis.metrics.body_type, BodyType::Ectomorph);
    assert_eq!(analysis.skin_tone, "Fair");
    assert_eq!(analysis.landmarks.len(), 5);
    assert_eq!(
      analysis.skin_roi,
      Some(RegionBounds {
        x1: 85,
        y1: 25,
        x2: 115,
        y2: 55
      })
    );
  }

  #[test]
  fn test_derive_nose_near_edge_is_unknown_tone() {
    let analysis = pipeline().derive(&frame(), &pose(coco([100.0, 5.0]))).unwrap();
    assert_eq!(analysis.skin_tone, UNKNOWN_TONE);
    assert_eq!(analysis.skin_roi, None);
    assert_eq!(analysis.landmarks.len(), 5);
  }

  #[test]
  fn test_derive_degrades_without_detection() {
    let pipeline = pipeline();
    assert!(pipeline.derive(&frame(), &PoseResult::default()).is_none());
    let mut short = coco([100.0, 40.0]);
    short.truncate(10);
    assert!(pipeline.derive(&frame(), &pose(short)).is_none());
  }

  #[test]
  fn test_pipeline_as_model_reports_searching() {
    let outbound = pipeline().infer(&frame()).unwrap();
    assert_eq!(outbound, Outbound::searching());
  }

  #[test]
  fn test_outbound_wire_format() {
    assert_eq!(
      serde_json::to_value(Outbound::searching()).unwrap(),
      serde_json::json!({"status": "searching", "message": "Position yourself in frame"})
    );
    assert_eq!(
      serde_json::to_value(Outbound::error(INVALID_FRAME_MESSAGE)).unwrap(),
      serde_json::json!({"status": "error", "message": "Invalid frame format"})
    );

    let analysis = pipeline().derive(&frame(), &pose(coco([100.0, 5.0]))).unwrap();
    let value = serde_json::to_value(Outbound::from(analysis)).unwrap();
    assert_eq!(value["status"], "success");
    assert_eq!(value["skin_tone"], "Unknown");
    assert!(value["skin_roi"].is_null());
    assert_eq!(value["landmarks"][0][0], 0);
    assert_eq!(value["metrics"]["body_type"], "Ectomorph");
  }

  #[tokio::test]
  async fn test_handle_rejects_non_image_payload() {
    let mut session = Session::new(Arc::new(pipeline()));
    let outbound = session.handle("hello").await;
    assert_eq!(outbound, Outbound::error(INVALID_FRAME_MESSAGE));
    assert_eq!(session.state(), SessionState::Emitting);

    let outbound = session.handle("data:image/png;base64,AAAA").await;
    assert_eq!(outbound, Outbound::error(UNDECODABLE_FRAME_MESSAGE));
  }

  #[test]
  fn test_pipeline_rejects_inverted_thresholds() {
    let config = PipelineConfig {
      schema: DetectorSchema::Coco17,
      scheme: BodyTypeScheme::ThreeBucket { high: 1.1, low: 1.4 },
    };
    assert!(matches!(
      FramePipeline::new(NoModel, config, Palette::default()),
      Err(PipelineError::SchemeError(SchemeError::InvertedThresholds { .. }))
    ));
  }

  struct BrokenModel;

  impl Model for BrokenModel {
    type Input = RgbNhwcFrame;
    type Output = PoseResult;
    type Error = String;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Err("output tensor unavailable".to_string())
    }
  }

  #[tokio::test]
  async fn test_backend_failure_is_reported_not_searching() {
    let pipeline =
      FramePipeline::new(BrokenModel, PipelineConfig::default(), Palette::default()).unwrap();
    assert!(pipeline.infer(&frame()).is_err());

    let mut session = Session::new(Arc::new(pipeline));
    let payload = {
      use base64::{Engine, engine::general_purpose::STANDARD};
      let mut bytes = Vec::new();
      RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
      format!("data:image/png;base64,{}", STANDARD.encode(bytes))
    };
    assert_eq!(
      session.handle(&payload).await,
      Outbound::error(INFERENCE_FAILED_MESSAGE)
    );
  }
}

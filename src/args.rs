// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/args.rs - 命令行公共参数
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

use clap::{Args, ValueEnum};

use crate::{
  keypoint::DetectorSchema,
  metrics::{BodyTypeScheme, DEFAULT_RATIO_BOUNDARY, DEFAULT_RATIO_HIGH, DEFAULT_RATIO_LOW},
  session::PipelineConfig,
};

/// 模型输出的关键点布局
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DetectorArg {
  Coco17,
  Mediapipe33,
}

impl From<DetectorArg> for DetectorSchema {
  fn from(arg: DetectorArg) -> Self {
    match arg {
      DetectorArg::Coco17 => DetectorSchema::Coco17,
      DetectorArg::Mediapipe33 => DetectorSchema::Mediapipe33,
    }
  }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodySchemeArg {
  ThreeBucket,
  TwoBucket,
}

/// 分析流水线参数，服务与离线分析共用
#[derive(Args, Debug, Clone)]
pub struct PipelineArgs {
  /// 模型输出的关键点布局
  #[arg(long, value_enum, default_value = "coco17")]
  pub detector: DetectorArg,

  /// 体型划分方式
  #[arg(long, value_enum, default_value = "three-bucket")]
  pub body_scheme: BodySchemeArg,

  /// 三档划分的上阈值
  #[arg(long, default_value_t = DEFAULT_RATIO_HIGH, value_name = "RATIO")]
  pub ratio_high: f64,

  /// 三档划分的下阈值
  #[arg(long, default_value_t = DEFAULT_RATIO_LOW, value_name = "RATIO")]
  pub ratio_low: f64,

  /// 两档划分的分界值
  #[arg(long, default_value_t = DEFAULT_RATIO_BOUNDARY, value_name = "RATIO")]
  pub ratio_boundary: f64,
}

impl PipelineArgs {
  pub fn scheme(&self) -> BodyTypeScheme {
    match self.body_scheme {
      BodySchemeArg::ThreeBucket => BodyTypeScheme::ThreeBucket {
        high: self.ratio_high,
        low: self.ratio_low,
      },
      BodySchemeArg::TwoBucket => BodyTypeScheme::TwoBucket {
        boundary: self.ratio_boundary,
      },
    }
  }

  /// 阈值的合法性由 `FramePipeline::new` 检查
  pub fn config(&self) -> PipelineConfig {
    PipelineConfig {
      schema: self.detector.into(),
      scheme: self.scheme(),
    }
  }
}

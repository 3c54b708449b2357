// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/bin/oneshot.rs - 单张图像离线分析
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

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use jingyi::{
  FromUrl,
  args::PipelineArgs,
  input::ImageFileInput,
  model::Yolov8PoseBuilder,
  output::{JsonOutput, OutputWrapper},
  session::FramePipeline,
  skin::Palette,
  task::{OneShotTask, Task},
};

/// Jingyi 离线分析参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 姿态模型地址，例如 yolov8pose:///path/model.rknn
  #[arg(long, value_name = "MODEL")]
  model: Url,
  /// 输入图像，例如 image:///path/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  input: Url,
  /// 输出地址，可重复：json:///out.json 或 image:///out.png；不指定时打印到标准输出
  #[arg(long, value_name = "OUTPUT")]
  output: Vec<Url>,
  #[command(flatten)]
  pipeline: PipelineArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("输入来源: {}", args.input);

  let input = ImageFileInput::from_url(&args.input)?;
  let model = Yolov8PoseBuilder::from_url(&args.model)?.build()?;
  let pipeline = FramePipeline::new(model, args.pipeline.config(), Palette::default())?;

  let mut outputs = args
    .output
    .iter()
    .map(OutputWrapper::from_url)
    .collect::<Result<Vec<_>, _>>()?;
  if outputs.is_empty() {
    outputs.push(OutputWrapper::JsonOutput(JsonOutput::stdout()));
  }

  OneShotTask.run_task(input.into_nhwc(), pipeline, outputs)
}

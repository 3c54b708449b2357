// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/bin/serve.rs - 分析服务入口
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

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use jingyi::{
  FromUrl,
  args::PipelineArgs,
  catalog::Catalog,
  model::Yolov8PoseBuilder,
  server::{AppState, serve},
  session::FramePipeline,
  skin::Palette,
};

/// Jingyi 分析服务参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 姿态模型地址，例如 yolov8pose:///path/model.rknn
  #[arg(long, value_name = "MODEL")]
  model: Url,

  /// 监听地址
  #[arg(long, default_value = "0.0.0.0:8000", value_name = "ADDR")]
  listen: SocketAddr,

  /// 商品目录 JSON 文件，不指定时使用内置目录
  #[arg(long, value_name = "PATH")]
  catalog: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  confidence: f32,

  #[command(flatten)]
  pipeline: PipelineArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  let args = Args::parse();

  info!("模型地址: {}", args.model);
  info!("监听地址: {}", args.listen);
  info!("体型划分: {:?}", args.pipeline.scheme());

  let model = Yolov8PoseBuilder::from_url(&args.model)?
    .confidence(args.confidence)
    .build()?;
  info!("模型加载完成");

  let pipeline = FramePipeline::new(model, args.pipeline.config(), Palette::default())?;

  let catalog = match &args.catalog {
    Some(path) => {
      info!("加载商品目录: {}", path.display());
      Catalog::from_json_file(path)?
    }
    None => Catalog::default(),
  };
  info!("商品目录共 {} 项", catalog.items().len());

  let listener = TcpListener::bind(args.listen).await?;
  serve(listener, Arc::new(AppState::new(pipeline, catalog))).await?;

  Ok(())
}

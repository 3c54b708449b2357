// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/server.rs - HTTP / WebSocket 服务
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

use std::{fmt, sync::Arc};

use axum::{
  Json, Router,
  extract::{Query, State, WebSocketUpgrade},
  response::Response,
  routing::get,
};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::{
  catalog::{Catalog, RecommendationQuery, RecommendationResult, filter},
  frame::RgbNhwcFrame,
  model::{Model, PoseResult},
  session::{FramePipeline, Session},
};

mod websocket;
pub use self::websocket::{WsTransport, WsTransportError};

#[derive(Error, Debug)]
pub enum ServerError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 所有连接共享的只读状态
pub struct AppState<M> {
  pub pipeline: Arc<FramePipeline<M>>,
  pub catalog: Arc<Catalog>,
}

impl<M> AppState<M> {
  pub fn new(pipeline: FramePipeline<M>, catalog: Catalog) -> Self {
    Self {
      pipeline: Arc::new(pipeline),
      catalog: Arc::new(catalog),
    }
  }
}

#[derive(Serialize)]
struct RootResponse {
  message: &'static str,
}

pub fn router<M>(state: Arc<AppState<M>>) -> Router
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult> + Send + Sync + 'static,
  M::Error: fmt::Display + Send + 'static,
{
  Router::new()
    .route("/", get(root))
    .route("/recommend", get(recommend::<M>))
    .route("/ws", get(websocket::<M>))
    .layer(CorsLayer::permissive())
    .with_state(state)
}

async fn root() -> Json<RootResponse> {
  Json(RootResponse {
    message: "Jingyi pose analysis backend is running",
  })
}

async fn recommend<M>(
  State(state): State<Arc<AppState<M>>>,
  Query(query): Query<RecommendationQuery>,
) -> Json<RecommendationResult> {
  let result = filter(&state.catalog, &query);
  info!(
    "推荐查询: 肤色 {}, 类别 {}, 关键词 '{}', 命中 {} 项",
    query.skin_tone,
    query.category,
    query.prompt,
    result.items.len()
  );
  Json(result)
}

async fn websocket<M>(ws: WebSocketUpgrade, State(state): State<Arc<AppState<M>>>) -> Response
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult> + Send + Sync + 'static,
  M::Error: fmt::Display + Send + 'static,
{
  let pipeline = state.pipeline.clone();
  ws.on_upgrade(move |socket| async move {
    Session::new(pipeline).run(WsTransport::new(socket)).await;
  })
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("无法监听中断信号: {}", e);
    std::future::pending::<()>().await;
  }
  info!("收到中断信号，准备退出...");
}

/// 在给定监听器上运行服务，直到收到 Ctrl-C
pub async fn serve<M>(listener: TcpListener, state: Arc<AppState<M>>) -> Result<(), ServerError>
where
  M: Model<Input = RgbNhwcFrame, Output = PoseResult> + Send + Sync + 'static,
  M::Error: fmt::Display + Send + 'static,
{
  info!("服务监听于 {}", listener.local_addr()?);
  axum::serve(listener, router(state))
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!("服务已停止");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{session::PipelineConfig, skin::Palette};
  use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode},
  };
  use tower::ServiceExt;

  struct NoModel;

  impl Model for NoModel {
    type Input = RgbNhwcFrame;
    type Output = PoseResult;
    type Error = std::convert::Infallible;

    fn infer(&self, _input: &Self::Input) -> Result<Self::Output, Self::Error> {
      Ok(PoseResult::default())
    }
  }

  fn app() -> Router {
    let pipeline =
      FramePipeline::new(NoModel, PipelineConfig::default(), Palette::default()).unwrap();
    router(Arc::new(AppState::new(pipeline, Catalog::default())))
  }

  async fn get_json(uri: &str) -> serde_json::Value {
    let response = app()
      .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
  }

  #[tokio::test]
  async fn test_root() {
    let value = get_json("/").await;
    assert_eq!(value["message"], "Jingyi pose analysis backend is running");
  }

  #[tokio::test]
  async fn test_recommend_defaults() {
    let value = get_json("/recommend").await;
    assert_eq!(value["body_advice"], "Tailored fits showcase your Ectomorph build.");
    assert_eq!(value["suggested_colors"][0], "Mustard Yellow");
    assert_eq!(value["recommendations"].as_array().unwrap().len(), 10);
  }

  #[tokio::test]
  async fn test_recommend_with_query() {
    let value =
      get_json("/recommend?skin_tone=Fair&body_type=Mesomorph&category=Formal&prompt=blue%20boots")
        .await;
    let names: Vec<_> = value["recommendations"]
      .as_array()
      .unwrap()
      .iter()
      .map(|i| i["name"].as_str().unwrap().to_string())
      .collect();
    assert_eq!(names, vec!["Navy Blue Blazer", "Suede Chelsea Boots"]);
    assert_eq!(value["body_advice"], "Tailored fits showcase your Mesomorph build.");
  }

  #[tokio::test]
  async fn test_websocket_route_requires_upgrade() {
    let response = app()
      .oneshot(Request::builder().uri("/ws").body(Body::empty()).unwrap())
      .await
      .unwrap();
    assert!(response.status().is_client_error());
  }
}

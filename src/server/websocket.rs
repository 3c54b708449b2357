// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/server/websocket.rs - WebSocket 帧传输
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

use axum::extract::ws::{Message, WebSocket};
use thiserror::Error;
use tracing::debug;

use crate::session::{FrameTransport, Outbound};

#[derive(Error, Debug)]
pub enum WsTransportError {
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("WebSocket 错误: {0}")]
  SocketError(#[from] axum::Error),
}

pub struct WsTransport {
  socket: WebSocket,
}

impl WsTransport {
  pub fn new(socket: WebSocket) -> Self {
    Self { socket }
  }
}

impl FrameTransport for WsTransport {
  type Error = WsTransportError;

  async fn recv(&mut self) -> Option<String> {
    loop {
      match self.socket.recv().await? {
        Ok(Message::Text(text)) => return Some(text.as_str().to_owned()),
        // 二进制帧按文本处理，非 UTF-8 内容会在解码阶段被判为格式错误
        Ok(Message::Binary(bytes)) => return Some(String::from_utf8_lossy(&bytes).into_owned()),
        Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
        Ok(Message::Close(_)) => return None,
        Err(e) => {
          debug!("WebSocket 接收错误: {}", e);
          return None;
        }
      }
    }
  }

  async fn send(&mut self, message: &Outbound) -> Result<(), Self::Error> {
    let json = serde_json::to_string(message)?;
    self.socket.send(Message::Text(json.into())).await?;
    Ok(())
  }
}

// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/output/draw.rs - 姿态与采样区域可视化
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

use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut},
  rect::Rect,
};

use crate::{
  keypoint::{CanonicalLandmark, LandmarkId},
  session::Outbound,
  skin::RegionBounds,
};

const LANDMARK_RADIUS: i32 = 4;
const LANDMARK_COLOR: [u8; 3] = [255, 0, 0];
const TORSO_COLOR: [u8; 3] = [0, 255, 0];
const ROI_COLOR: [u8; 3] = [0, 0, 255];

// 躯干连线：双肩、双髋以及两侧肩髋
const TORSO_EDGES: [(LandmarkId, LandmarkId); 4] = [
  (LandmarkId::LeftShoulder, LandmarkId::RightShoulder),
  (LandmarkId::LeftHip, LandmarkId::RightHip),
  (LandmarkId::LeftShoulder, LandmarkId::LeftHip),
  (LandmarkId::RightShoulder, LandmarkId::RightHip),
];

pub struct Draw {
  landmark_radius: i32,
  landmark_color: [u8; 3],
  torso_color: [u8; 3],
  roi_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      landmark_radius: LANDMARK_RADIUS,
      landmark_color: LANDMARK_COLOR,
      torso_color: TORSO_COLOR,
      roi_color: ROI_COLOR,
    }
  }
}

impl Draw {
  fn find(landmarks: &[CanonicalLandmark], id: LandmarkId) -> Option<&CanonicalLandmark> {
    landmarks.iter().find(|l| l.id == id)
  }

  fn draw_landmarks(&self, image: &mut RgbImage, landmarks: &[CanonicalLandmark]) {
    for (from, to) in TORSO_EDGES {
      if let (Some(a), Some(b)) = (Self::find(landmarks, from), Self::find(landmarks, to)) {
        draw_line_segment_mut(image, (a.x, a.y), (b.x, b.y), Rgb(self.torso_color));
      }
    }

    for landmark in landmarks {
      draw_filled_circle_mut(
        image,
        (landmark.x.round() as i32, landmark.y.round() as i32),
        self.landmark_radius,
        Rgb(self.landmark_color),
      );
    }
  }

  fn draw_region(&self, image: &mut RgbImage, region: &RegionBounds) {
    let width = (region.x2 - region.x1).max(1) as u32;
    let height = (region.y2 - region.y1).max(1) as u32;
    let rect = Rect::at(region.x1 as i32, region.y1 as i32).of_size(width, height);
    draw_hollow_rect_mut(image, rect, Rgb(self.roi_color));
  }

  /// 在图像上叠加一条出站消息，非成功消息不做绘制
  pub fn draw_outbound(&self, image: &mut RgbImage, result: &Outbound) {
    if let Outbound::Success {
      landmarks,
      skin_roi,
      ..
    } = result
    {
      self.draw_landmarks(image, landmarks);
      if let Some(region) = skin_roi {
        self.draw_region(image, region);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::metrics::{BodyType, Metrics};

  fn landmark(id: LandmarkId, x: f32, y: f32) -> CanonicalLandmark {
    CanonicalLandmark { id, x, y, z: 0.0 }
  }

  #[test]
  fn test_draw_success_marks_pixels() {
    let mut image = RgbImage::new(100, 100);
    let result = Outbound::Success {
      metrics: Metrics {
        body_type: BodyType::Mesomorph,
        ratio: 1.2,
        shoulder_width: 30.0,
        waist_width: 25.0,
      },
      skin_tone: "Fair".to_string(),
      landmarks: vec![
        landmark(LandmarkId::Nose, 50.0, 20.0),
        landmark(LandmarkId::LeftShoulder, 35.0, 40.0),
        landmark(LandmarkId::RightShoulder, 65.0, 40.0),
        landmark(LandmarkId::LeftHip, 38.0, 80.0),
        landmark(LandmarkId::RightHip, 62.0, 80.0),
      ],
      skin_roi: Some(RegionBounds {
        x1: 35,
        y1: 5,
        x2: 65,
        y2: 35,
      }),
    };

    Draw::default().draw_outbound(&mut image, &result);

    assert_eq!(image.get_pixel(50, 20).0, LANDMARK_COLOR);
    assert_eq!(image.get_pixel(50, 40).0, TORSO_COLOR);
    assert_eq!(image.get_pixel(35, 5).0, ROI_COLOR);
  }

  #[test]
  fn test_draw_searching_is_noop() {
    let mut image = RgbImage::new(10, 10);
    Draw::default().draw_outbound(&mut image, &Outbound::searching());
    assert!(image.pixels().all(|p| p.0 == [0, 0, 0]));
  }
}

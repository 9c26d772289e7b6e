// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/report.rs - 检测结果数据模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 三分类判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
  Authentic,
  Deepfake,
  Inconclusive,
}

impl Verdict {
  pub fn as_str(&self) -> &'static str {
    match self {
      Verdict::Authentic => "authentic",
      Verdict::Deepfake => "deepfake",
      Verdict::Inconclusive => "inconclusive",
    }
  }

  /// 状态徽章文案
  pub fn display_label(&self) -> &'static str {
    match self {
      Verdict::Authentic => "Authentic",
      Verdict::Deepfake => "Deepfake Detected",
      Verdict::Inconclusive => "Inconclusive",
    }
  }

  /// 叠加层标注文案
  pub fn overlay_label(&self) -> &'static str {
    match self {
      Verdict::Authentic => "AUTHENTIC",
      Verdict::Deepfake => "DEEPFAKE",
      Verdict::Inconclusive => "UNCERTAIN",
    }
  }

  pub fn severity(&self) -> u8 {
    match self {
      Verdict::Authentic => 0,
      Verdict::Inconclusive => 1,
      Verdict::Deepfake => 2,
    }
  }

  /// 叠加层颜色（RGB）：绿 / 红 / 琥珀
  pub fn color(&self) -> [u8; 3] {
    match self {
      Verdict::Authentic => [16, 185, 129],
      Verdict::Deepfake => [239, 68, 68],
      Verdict::Inconclusive => [245, 158, 11],
    }
  }
}

impl std::fmt::Display for Verdict {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// 媒体来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
  Image,
  Video,
  Webcam,
}

impl SourceKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      SourceKind::Image => "image",
      SourceKind::Video => "video",
      SourceKind::Webcam => "webcam",
    }
  }
}

impl std::fmt::Display for SourceKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// 归一化边界框，各分量为帧宽/高的比例。
/// 构造时收紧到 [0,1] 并保证框不越出帧。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
    let x = x.clamp(0.0, 1.0);
    let y = y.clamp(0.0, 1.0);
    let width = width.clamp(0.0, 1.0).min(1.0 - x);
    let height = height.clamp(0.0, 1.0).min(1.0 - y);
    BoundingBox {
      x,
      y,
      width,
      height,
    }
  }

  pub fn right(&self) -> f32 {
    self.x + self.width
  }

  pub fn bottom(&self) -> f32 {
    self.y + self.height
  }

  pub fn in_frame(&self) -> bool {
    (0.0..=1.0).contains(&self.x)
      && (0.0..=1.0).contains(&self.y)
      && self.width >= 0.0
      && self.height >= 0.0
      && self.right() <= 1.0 + f32::EPSILON
      && self.bottom() <= 1.0 + f32::EPSILON
  }

  /// 换算为像素坐标 [x_min, y_min, x_max, y_max]
  pub fn to_pixel_corners(&self, frame_w: u32, frame_h: u32) -> [i32; 4] {
    let (w, h) = (frame_w as f32, frame_h as f32);
    [
      (self.x * w).floor() as i32,
      (self.y * h).floor() as i32,
      (self.right() * w).ceil() as i32,
      (self.bottom() * h).ceil() as i32,
    ]
  }
}

/// 单张人脸的检测条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedFace {
  pub id: String,
  pub bounding_box: BoundingBox,
  pub confidence: f32,
  pub verdict: Verdict,
  pub manipulation_score: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifacts: Option<Vec<String>>,
}

/// 一次完整分析的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionReport {
  pub id: String,
  pub timestamp: DateTime<Utc>,
  pub source_kind: SourceKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub media_url: Option<String>,
  pub verdict: Verdict,
  pub confidence: f32,
  pub processing_time_ms: u64,
  pub faces: Vec<DetectedFace>,
}

/// 仪表盘历史表格中的一行
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
  pub id: String,
  pub timestamp: DateTime<Utc>,
  pub source_kind: SourceKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub thumbnail_url: Option<String>,
  pub verdict: Verdict,
  pub confidence: f32,
}

/// 实时检测循环每次改写的读数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
  pub verdict: Verdict,
  pub confidence: f32,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bounding_box_is_clamped_into_frame() {
    let bbox = BoundingBox::new(0.8, 0.9, 0.5, 0.5);
    assert!(bbox.in_frame());
    assert!(bbox.right() <= 1.0);
    assert!(bbox.bottom() <= 1.0);
  }

  #[test]
  fn bounding_box_negative_origin_is_clamped() {
    let bbox = BoundingBox::new(-0.2, -0.1, 0.4, 0.3);
    assert_eq!(bbox.x, 0.0);
    assert_eq!(bbox.y, 0.0);
    assert!(bbox.in_frame());
  }

  #[test]
  fn pixel_corners_cover_the_box() {
    let bbox = BoundingBox::new(0.25, 0.25, 0.50, 0.50);
    let [x_min, y_min, x_max, y_max] = bbox.to_pixel_corners(640, 480);
    assert_eq!((x_min, y_min), (160, 120));
    assert_eq!((x_max, y_max), (480, 360));
  }

  #[test]
  fn verdict_serializes_lowercase() {
    let json = serde_json::to_string(&Verdict::Deepfake).unwrap();
    assert_eq!(json, "\"deepfake\"");
    assert_eq!(Verdict::Inconclusive.as_str(), "inconclusive");
  }

  #[test]
  fn verdict_labels_match_the_product_copy() {
    assert_eq!(Verdict::Deepfake.display_label(), "Deepfake Detected");
    assert_eq!(Verdict::Inconclusive.overlay_label(), "UNCERTAIN");
    assert_eq!(Verdict::Authentic.color(), [16, 185, 129]);
  }
}

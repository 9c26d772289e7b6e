// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use thiserror::Error;

use crate::live::live_overlay_box;
use crate::report::{BoundingBox, DetectionReport, LiveReading, Verdict};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 2;

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体文件读取错误: {0}")]
  FontLoadError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  FontInvalid(#[from] ab_glyph::InvalidFont),
}

/// 在帧上绘制检测叠加层。
///
/// 未配置字体时只画边框不写文字。
pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Draw {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      font: None,
    }
  }
}

impl Draw {
  /// 从字体文件加载标签字体
  pub fn with_font_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  // 绘制一个边框，bbox 为归一化坐标
  fn draw_bbox(&self, image: &mut RgbImage, bbox: &BoundingBox, color: [u8; 3]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    let [mut x_min, mut y_min, mut x_max, mut y_max] =
      bbox.to_pixel_corners(image.width(), image.height());

    x_min = x_min.clamp(0, w - 1);
    y_min = y_min.clamp(0, h - 1);
    x_max = x_max.clamp(0, w - 1);
    y_max = y_max.clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    for thickness in 0..BOX_THICKNESS {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);

      for x in x_min_t..=x_max_t {
        let top = image.get_pixel_mut(x as u32, y_min_t as u32);
        *top = Rgb(color);
        let bottom = image.get_pixel_mut(x as u32, y_max_t as u32);
        *bottom = Rgb(color);
      }

      for y in y_min_t..=y_max_t {
        let left = image.get_pixel_mut(x_min_t as u32, y as u32);
        *left = Rgb(color);
        let right = image.get_pixel_mut(x_max_t as u32, y as u32);
        *right = Rgb(color);
      }
    }
  }

  // 在边框上方绘制 "LABEL (NN%)" 标签，无字体时跳过
  fn draw_label(&self, image: &mut RgbImage, bbox: &BoundingBox, text: &str, color: [u8; 3]) {
    let Some(font) = &self.font else {
      return;
    };

    let (w, _h) = (image.width() as i32, image.height() as i32);
    let [x_min, y_min, _, _] = bbox.to_pixel_corners(image.width(), image.height());

    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]);

    let text_width = (text.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    if label_width > 0 && label_height > 0 {
      let rect = imageproc::rect::Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(color));

      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        text,
      );
    }
  }

  fn overlay_text(verdict: Verdict, confidence: f32) -> String {
    format!(
      "{} ({}%)",
      verdict.overlay_label(),
      (confidence * 100.0).round() as u32
    )
  }

  /// 把一次分析的全部人脸框画到帧上
  pub fn draw_report(&self, image: &mut RgbImage, report: &DetectionReport) {
    for face in &report.faces {
      let color = face.verdict.color();
      self.draw_bbox(image, &face.bounding_box, color);
      let text = Draw::overlay_text(face.verdict, face.confidence);
      self.draw_label(image, &face.bounding_box, &text, color);
    }
  }

  /// 实时读数的叠加层：固定位置的人脸框加状态标签
  pub fn draw_live_reading(&self, image: &mut RgbImage, reading: &LiveReading) {
    let bbox = live_overlay_box();
    let color = reading.verdict.color();
    self.draw_bbox(image, &bbox, color);
    let text = Draw::overlay_text(reading.verdict, reading.confidence);
    self.draw_label(image, &bbox, &text, color);
  }
}

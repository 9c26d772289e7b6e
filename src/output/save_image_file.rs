// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::Path;

use image::{Rgb, RgbImage};
use thiserror::Error;
use tracing::warn;
use url::Url;

use crate::input::MediaSource;
use crate::output::Render;
use crate::output::draw::{Draw, DrawError};
use crate::report::{DetectionReport, LiveReading, SourceKind};
use crate::{FromUrl, FromUrlWithScheme};

// 无法取得原始媒体时使用的占位帧
const PLACEHOLDER_WIDTH: u32 = 640;
const PLACEHOLDER_HEIGHT: u32 = 480;
const PLACEHOLDER_COLOR: [u8; 3] = [17, 24, 39];

pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    // 可用 ?font=<path> 指定标签字体
    let mut draw = Draw::default();
    for (k, v) in uri.query_pairs() {
      if k == "font" {
        draw = draw.with_font_file(v.as_ref())?;
        break;
      }
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw,
    })
  }
}

impl SaveImageFileOutput {
  fn placeholder() -> RgbImage {
    RgbImage::from_pixel(
      PLACEHOLDER_WIDTH,
      PLACEHOLDER_HEIGHT,
      Rgb(PLACEHOLDER_COLOR),
    )
  }

  // 图片来源可取回原图作底；视频与摄像头没有可解码的帧，用占位帧
  fn base_image(&self, source: &MediaSource) -> RgbImage {
    if source.kind != SourceKind::Image {
      return SaveImageFileOutput::placeholder();
    }
    let Some(media_url) = &source.media_url else {
      return SaveImageFileOutput::placeholder();
    };
    let Ok(url) = Url::parse(media_url) else {
      return SaveImageFileOutput::placeholder();
    };
    match image::open(url.path()) {
      Ok(image) => image.into_rgb8(),
      Err(err) => {
        warn!("无法读取原始媒体 {}: {}", media_url, err);
        SaveImageFileOutput::placeholder()
      }
    }
  }

  fn save_image(&self, image: RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    warn!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<MediaSource, DetectionReport> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    source: &MediaSource,
    report: &DetectionReport,
  ) -> Result<(), Self::Error> {
    let mut image = self.base_image(source);
    self.draw.draw_report(&mut image, report);
    self.save_image(image)
  }
}

impl Render<MediaSource, LiveReading> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, _source: &MediaSource, reading: &LiveReading) -> Result<(), Self::Error> {
    let mut image = SaveImageFileOutput::placeholder();
    self.draw.draw_live_reading(&mut image, reading);
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::report::Verdict;
  use chrono::Utc;

  #[test]
  fn live_reading_is_saved_as_a_png() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let reading = LiveReading {
      verdict: Verdict::Authentic,
      confidence: 0.22,
    };
    output
      .render_result(&MediaSource::webcam(), &reading)
      .unwrap();
    assert!(path.exists());
  }

  #[test]
  fn report_for_a_missing_image_falls_back_to_the_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/report.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let source = MediaSource::new(
      SourceKind::Image,
      Some("a.png".to_string()),
      Some("image:///no/such/file.png".to_string()),
    );
    let report = DetectionReport {
      id: "r-1".to_string(),
      timestamp: Utc::now(),
      source_kind: SourceKind::Image,
      file_name: Some("a.png".to_string()),
      media_url: source.media_url.clone(),
      verdict: Verdict::Inconclusive,
      confidence: 0.5,
      processing_time_ms: 900,
      faces: Vec::new(),
    };
    output.render_result(&source, &report).unwrap();
    assert!(path.exists());
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("folder:///tmp/x").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }
}

// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/input/upload.rs - 上传文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::FromUrl;
use crate::input::MediaSource;
use crate::report::SourceKind;

/// 上传大小上限：10 MB
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "mov"];

#[derive(Error, Debug)]
pub enum UploadError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("不支持的媒体格式: {0}")]
  UnsupportedFormat(String),
  #[error("文件种类与方案不符: 期望 {expected}, 实际 {actual}")]
  KindMismatch {
    expected: SourceKind,
    actual: SourceKind,
  },
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("文件过大: {0} 字节，超出 10 MB 上限")]
  FileTooLarge(u64),
}

impl From<std::io::Error> for UploadError {
  fn from(err: std::io::Error) -> Self {
    UploadError::IoError(err)
  }
}

/// 按扩展名推断媒体种类
pub fn kind_for_extension(ext: &str) -> Option<SourceKind> {
  let ext = ext.to_ascii_lowercase();
  if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
    Some(SourceKind::Image)
  } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
    Some(SourceKind::Video)
  } else {
    None
  }
}

fn scheme_kind(scheme: &str) -> Option<SourceKind> {
  match scheme {
    "image" => Some(SourceKind::Image),
    "video" => Some(SourceKind::Video),
    _ => None,
  }
}

/// 待分析的上传文件，以 image://<path> 或 video://<path> 寻址。
#[derive(Debug)]
pub struct UploadSource {
  path: PathBuf,
  kind: SourceKind,
}

impl FromUrl for UploadSource {
  type Error = UploadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let expected = scheme_kind(url.scheme())
      .ok_or_else(|| UploadError::SchemeMismatch(url.scheme().to_string()))?;

    let decoded = urlencoding::decode(url.path())
      .map_err(|e| UploadError::UnsupportedFormat(e.to_string()))?;
    let path = PathBuf::from(decoded.as_ref());

    let ext = path
      .extension()
      .and_then(|e| e.to_str())
      .unwrap_or_default();
    let actual = kind_for_extension(ext).ok_or_else(|| {
      error!("无法识别的媒体扩展名: {:?}", path);
      UploadError::UnsupportedFormat(ext.to_string())
    })?;
    if actual != expected {
      return Err(UploadError::KindMismatch { expected, actual });
    }

    let metadata = std::fs::metadata(&path)?;
    if metadata.len() > MAX_UPLOAD_BYTES {
      return Err(UploadError::FileTooLarge(metadata.len()));
    }

    info!(
      "接收上传: {} ({}, {} 字节)",
      path.display(),
      actual,
      metadata.len()
    );
    Ok(UploadSource {
      path,
      kind: actual,
    })
  }
}

impl UploadSource {
  pub fn kind(&self) -> SourceKind {
    self.kind
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn file_name(&self) -> Option<String> {
    self
      .path
      .file_name()
      .and_then(|n| n.to_str())
      .map(|n| n.to_string())
  }

  pub fn to_media_source(&self) -> MediaSource {
    MediaSource::new(
      self.kind,
      self.file_name(),
      Some(format!("{}://{}", self.kind, self.path.display())),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url_for(path: &Path, scheme: &str) -> Url {
    Url::parse(&format!("{}://{}", scheme, path.display())).unwrap()
  }

  #[test]
  fn accepts_a_small_png_upload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("a.png");
    std::fs::write(&path, b"fake png bytes").unwrap();

    let source = UploadSource::from_url(&url_for(&path, "image")).unwrap();
    assert_eq!(source.kind(), SourceKind::Image);
    assert_eq!(source.file_name().as_deref(), Some("a.png"));

    let media = source.to_media_source();
    assert_eq!(media.kind, SourceKind::Image);
    assert_eq!(media.file_name.as_deref(), Some("a.png"));
  }

  #[test]
  fn rejects_an_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, b"hello").unwrap();

    let err = UploadSource::from_url(&url_for(&path, "image")).unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedFormat(_)));
  }

  #[test]
  fn rejects_a_video_file_behind_the_image_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"fake mp4").unwrap();

    let err = UploadSource::from_url(&url_for(&path, "image")).unwrap_err();
    assert!(matches!(err, UploadError::KindMismatch { .. }));
  }

  #[test]
  fn rejects_an_oversized_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.jpg");
    std::fs::write(&path, vec![0u8; (MAX_UPLOAD_BYTES + 1) as usize]).unwrap();

    let err = UploadSource::from_url(&url_for(&path, "image")).unwrap_err();
    assert!(matches!(err, UploadError::FileTooLarge(_)));
  }

  #[test]
  fn missing_files_surface_as_io_errors() {
    let url = Url::parse("video:///no/such/clip.mov").unwrap();
    let err = UploadSource::from_url(&url).unwrap_err();
    assert!(matches!(err, UploadError::IoError(_)));
  }
}

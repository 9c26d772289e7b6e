// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/input.rs - 媒体输入
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

use serde::{Deserialize, Serialize};

use crate::FromUrlWithScheme;
use crate::report::SourceKind;

mod upload;
pub use self::upload::{MAX_UPLOAD_BYTES, UploadError, UploadSource, kind_for_extension};

pub mod camera;
pub use self::camera::{CameraDevice, CameraError, CameraStream, SimulatedCamera};

/// 交给模型分析的媒体描述。不携带媒体内容本身，
/// 只有种类、文件名与可展示的 URL。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSource {
  pub kind: SourceKind,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub file_name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub media_url: Option<String>,
}

impl MediaSource {
  pub fn new(kind: SourceKind, file_name: Option<String>, media_url: Option<String>) -> Self {
    MediaSource {
      kind,
      file_name,
      media_url,
    }
  }

  /// 实时检测使用的摄像头来源
  pub fn webcam() -> Self {
    MediaSource {
      kind: SourceKind::Webcam,
      file_name: None,
      media_url: Some(format!("{}://user", SimulatedCamera::SCHEME)),
    }
  }
}

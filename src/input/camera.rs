// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/input/camera.rs - 模拟摄像头输入源
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
  #[error("Camera access denied. Please check your permissions.")]
  PermissionDenied,
  #[error("Camera not available.")]
  Unavailable,
}

/// 仅请求视频轨道的采集设备。获取失败必须是可恢复条件。
pub trait CameraDevice {
  fn acquire(&mut self) -> Result<CameraStream, CameraError>;
}

/// 已获取的摄像头视频流。
///
/// 原型中的流来自浏览器 getUserMedia，这里只以一个存活标记模拟
/// 其视频轨道。无论显式 stop 还是 Drop，轨道都会被停止。
#[derive(Debug)]
pub struct CameraStream {
  track: Arc<AtomicBool>,
}

impl CameraStream {
  fn open() -> (Self, Arc<AtomicBool>) {
    let track = Arc::new(AtomicBool::new(true));
    (
      CameraStream {
        track: Arc::clone(&track),
      },
      track,
    )
  }

  pub fn is_live(&self) -> bool {
    self.track.load(Ordering::SeqCst)
  }

  /// 停止全部轨道并释放设备
  pub fn stop(mut self) {
    self.release();
  }

  fn release(&mut self) {
    if self.track.swap(false, Ordering::SeqCst) {
      info!("摄像头轨道已停止");
    }
  }
}

impl Drop for CameraStream {
  fn drop(&mut self) {
    self.release();
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraAvailability {
  #[default]
  Granted,
  DenyPermission,
  Disconnected,
}

/// 模拟摄像头。可配置为正常授权，或以两类错误之一拒绝获取，
/// 用于演示与测试权限拒绝路径。克隆体共享轨道探针，
/// 便于在会话外观察流是否已释放。
#[derive(Clone)]
pub struct SimulatedCamera {
  availability: CameraAvailability,
  last_track: Arc<Mutex<Option<Arc<AtomicBool>>>>,
}

impl SimulatedCamera {
  pub fn new(availability: CameraAvailability) -> Self {
    SimulatedCamera {
      availability,
      last_track: Arc::new(Mutex::new(None)),
    }
  }

  pub fn granted() -> Self {
    SimulatedCamera::new(CameraAvailability::Granted)
  }

  pub fn denied() -> Self {
    SimulatedCamera::new(CameraAvailability::DenyPermission)
  }

  pub fn disconnected() -> Self {
    SimulatedCamera::new(CameraAvailability::Disconnected)
  }

  /// 最近一次授权的流当前是否存活（从未授权时为 None）
  pub fn last_stream_live(&self) -> Option<bool> {
    self
      .last_track
      .lock()
      .unwrap()
      .as_ref()
      .map(|track| track.load(Ordering::SeqCst))
  }
}

impl CameraDevice for SimulatedCamera {
  fn acquire(&mut self) -> Result<CameraStream, CameraError> {
    match self.availability {
      CameraAvailability::Granted => {
        let (stream, track) = CameraStream::open();
        *self.last_track.lock().unwrap() = Some(track);
        info!("摄像头视频流已获取");
        Ok(stream)
      }
      CameraAvailability::DenyPermission => {
        warn!("摄像头权限被拒绝");
        Err(CameraError::PermissionDenied)
      }
      CameraAvailability::Disconnected => {
        warn!("摄像头设备不可用");
        Err(CameraError::Unavailable)
      }
    }
  }
}

impl FromUrlWithScheme for SimulatedCamera {
  const SCHEME: &'static str = "camera";
}

impl FromUrl for SimulatedCamera {
  type Error = CameraError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      warn!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(CameraError::Unavailable);
    }

    let mut availability = CameraAvailability::Granted;
    for (k, v) in url.query_pairs() {
      if k == "deny" {
        availability = if v == "permission" {
          CameraAvailability::DenyPermission
        } else {
          CameraAvailability::Disconnected
        };
        break;
      }
    }

    Ok(SimulatedCamera::new(availability))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn granted_camera_yields_a_live_stream() {
    let mut camera = SimulatedCamera::granted();
    let stream = camera.acquire().unwrap();
    assert!(stream.is_live());
    assert_eq!(camera.last_stream_live(), Some(true));
  }

  #[test]
  fn stream_is_released_on_stop_and_on_drop() {
    let mut camera = SimulatedCamera::granted();
    let stream = camera.acquire().unwrap();
    stream.stop();
    assert_eq!(camera.last_stream_live(), Some(false));

    let stream = camera.acquire().unwrap();
    drop(stream);
    assert_eq!(camera.last_stream_live(), Some(false));
  }

  #[test]
  fn denied_camera_surfaces_a_recoverable_error() {
    let mut camera = SimulatedCamera::denied();
    assert_eq!(camera.acquire().unwrap_err(), CameraError::PermissionDenied);
    assert_eq!(camera.last_stream_live(), None);
  }

  #[test]
  fn deny_query_selects_the_failure_mode() {
    let url = Url::parse("camera://user?deny=permission").unwrap();
    let mut camera = SimulatedCamera::from_url(&url).unwrap();
    assert_eq!(camera.acquire().unwrap_err(), CameraError::PermissionDenied);

    let url = Url::parse("camera://user?deny=device").unwrap();
    let mut camera = SimulatedCamera::from_url(&url).unwrap();
    assert_eq!(camera.acquire().unwrap_err(), CameraError::Unavailable);

    let url = Url::parse("camera://user").unwrap();
    let mut camera = SimulatedCamera::from_url(&url).unwrap();
    assert!(camera.acquire().is_ok());
  }
}

// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/live.rs - 实时检测会话
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::input::camera::{CameraDevice, CameraError, CameraStream};
use crate::model::MockDeepfakeModel;
use crate::report::{BoundingBox, LiveReading};

/// 可注入的时钟，实时会话不直接读系统时间
pub trait Clock {
  fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// 周期评估定时器。start 后立即到期一次，此后每个周期到期一次；
/// cancel 之后不再触发。
#[derive(Debug)]
pub struct EvalTimer {
  period: Duration,
  next_due: Option<Instant>,
}

impl EvalTimer {
  pub fn new(period: Duration) -> Self {
    EvalTimer {
      period,
      next_due: None,
    }
  }

  pub fn period(&self) -> Duration {
    self.period
  }

  pub fn start(&mut self, now: Instant) {
    self.next_due = Some(now);
  }

  pub fn cancel(&mut self) {
    self.next_due = None;
  }

  pub fn is_active(&self) -> bool {
    self.next_due.is_some()
  }

  /// 到期则消费本次触发并顺延一个周期
  pub fn fire(&mut self, now: Instant) -> bool {
    match self.next_due {
      Some(due) if now >= due => {
        self.next_due = Some(now + self.period);
        true
      }
      _ => false,
    }
  }
}

/// 会话状态：摄像头关 / 摄像头开但未检测 / 检测中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
  Idle,
  CameraOn,
  Detecting,
}

/// 实时叠加层的固定人脸框位置
pub fn live_overlay_box() -> BoundingBox {
  BoundingBox::new(0.25, 0.20, 0.50, 0.60)
}

/// 实时检测会话。
///
/// 摄像头流是受限资源：camera_off 与 Drop 的所有退出路径都会
/// 释放它，同时取消周期评估，不留下悬空定时器。
pub struct LiveSession<D: CameraDevice, C: Clock = SystemClock> {
  camera: D,
  clock: C,
  model: MockDeepfakeModel,
  timer: EvalTimer,
  stream: Option<CameraStream>,
  reading: Option<LiveReading>,
  last_error: Option<String>,
}

impl<D: CameraDevice, C: Clock> LiveSession<D, C> {
  pub fn new(camera: D, clock: C, model: MockDeepfakeModel) -> Self {
    let period = model.policy().live_interval();
    LiveSession {
      camera,
      clock,
      model,
      timer: EvalTimer::new(period),
      stream: None,
      reading: None,
      last_error: None,
    }
  }

  pub fn state(&self) -> LiveState {
    match (&self.stream, self.timer.is_active()) {
      (None, _) => LiveState::Idle,
      (Some(_), false) => LiveState::CameraOn,
      (Some(_), true) => LiveState::Detecting,
    }
  }

  /// 请求获取摄像头。失败时留在 Idle 并保留可展示的错误信息。
  pub fn camera_on(&mut self) -> Result<(), CameraError> {
    if self.stream.is_some() {
      return Ok(());
    }
    match self.camera.acquire() {
      Ok(stream) => {
        self.stream = Some(stream);
        self.last_error = None;
        info!("摄像头已开启");
        Ok(())
      }
      Err(err) => {
        warn!("摄像头获取失败: {}", err);
        self.last_error = Some(err.to_string());
        Err(err)
      }
    }
  }

  /// 关闭摄像头：先取消周期评估，再停止视频流，回到 Idle。
  pub fn camera_off(&mut self) {
    self.timer.cancel();
    if let Some(stream) = self.stream.take() {
      stream.stop();
      info!("摄像头已关闭");
    }
    self.reading = None;
  }

  /// 开始检测：立即评估一次，之后按周期重评估。
  /// 摄像头未开启时不做任何事并返回 false。
  pub fn start_detection(&mut self) -> bool {
    if self.stream.is_none() {
      warn!("摄像头未开启，忽略检测请求");
      return false;
    }
    let now = self.clock.now();
    self.timer.start(now);
    self.poll();
    true
  }

  /// 停止检测：取消周期评估，摄像头保持开启。
  pub fn stop_detection(&mut self) {
    self.timer.cancel();
  }

  /// 推进会话。到期则重抽一次读数并返回，否则返回 None。
  /// 叠加层渲染方可按自身刷新节奏反复调用。
  pub fn poll(&mut self) -> Option<LiveReading> {
    self.stream.as_ref()?;
    let now = self.clock.now();
    if self.timer.fire(now) {
      let reading = self.model.live_reading();
      self.reading = Some(reading);
      debug!(
        "实时评估: {} ({:.0}%)",
        reading.verdict,
        reading.confidence * 100.0
      );
      Some(reading)
    } else {
      None
    }
  }

  /// 最近一次评估的读数
  pub fn reading(&self) -> Option<LiveReading> {
    self.reading
  }

  /// 最近一次摄像头错误的用户可见信息
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  pub fn has_stream(&self) -> bool {
    self.stream.is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::{Arc, Mutex};

  use crate::input::camera::SimulatedCamera;
  use crate::policy::DetectionPolicy;

  #[derive(Clone)]
  struct ManualClock(Arc<Mutex<Instant>>);

  impl ManualClock {
    fn new() -> Self {
      ManualClock(Arc::new(Mutex::new(Instant::now())))
    }

    fn advance(&self, delta: Duration) {
      *self.0.lock().unwrap() += delta;
    }
  }

  impl Clock for ManualClock {
    fn now(&self) -> Instant {
      *self.0.lock().unwrap()
    }
  }

  fn session_with(
    camera: SimulatedCamera,
  ) -> (LiveSession<SimulatedCamera, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 11);
    (LiveSession::new(camera, clock.clone(), model), clock)
  }

  fn period() -> Duration {
    DetectionPolicy::default().live_interval()
  }

  #[test]
  fn starting_detection_evaluates_immediately() {
    let (mut session, _clock) = session_with(SimulatedCamera::granted());
    session.camera_on().unwrap();
    assert_eq!(session.state(), LiveState::CameraOn);
    assert!(session.reading().is_none());

    assert!(session.start_detection());
    assert_eq!(session.state(), LiveState::Detecting);
    assert!(session.reading().is_some());
  }

  #[test]
  fn readings_rewrite_once_per_period() {
    let (mut session, clock) = session_with(SimulatedCamera::granted());
    session.camera_on().unwrap();
    session.start_detection();

    // 周期未满，不应有新评估
    clock.advance(period() / 2);
    assert!(session.poll().is_none());

    clock.advance(period());
    assert!(session.poll().is_some());
  }

  #[test]
  fn stopping_detection_cancels_the_schedule() {
    let (mut session, clock) = session_with(SimulatedCamera::granted());
    session.camera_on().unwrap();
    session.start_detection();
    session.stop_detection();
    assert_eq!(session.state(), LiveState::CameraOn);

    clock.advance(period() * 3);
    assert!(session.poll().is_none());
  }

  #[test]
  fn camera_off_during_detection_goes_straight_to_idle() {
    let (mut session, clock) = session_with(SimulatedCamera::granted());
    session.camera_on().unwrap();
    session.start_detection();

    session.camera_off();
    assert_eq!(session.state(), LiveState::Idle);
    assert!(!session.timer.is_active());
    assert!(session.reading().is_none());

    clock.advance(period() * 2);
    assert!(session.poll().is_none());
  }

  #[test]
  fn camera_off_releases_the_stream() {
    let (mut session, _clock) = session_with(SimulatedCamera::granted());
    session.camera_on().unwrap();
    session.camera_off();
    assert_eq!(session.camera.last_stream_live(), Some(false));
  }

  #[test]
  fn dropping_the_session_releases_the_stream() {
    let camera = SimulatedCamera::granted();
    let probe = camera.clone();
    let (mut session, _clock) = session_with(camera);
    session.camera_on().unwrap();
    session.start_detection();
    assert_eq!(probe.last_stream_live(), Some(true));

    drop(session);
    assert_eq!(probe.last_stream_live(), Some(false));
  }

  #[test]
  fn denied_camera_stays_idle_with_an_error_message() {
    let (mut session, _clock) = session_with(SimulatedCamera::denied());
    let err = session.camera_on().unwrap_err();
    assert_eq!(err, CameraError::PermissionDenied);
    assert_eq!(session.state(), LiveState::Idle);
    assert!(!session.has_stream());
    assert!(session.last_error().unwrap().contains("denied"));

    // 没有视频流时不允许开始检测
    assert!(!session.start_detection());
    assert_eq!(session.state(), LiveState::Idle);
  }

  #[test]
  fn timer_fire_consumes_the_due_slot() {
    let mut timer = EvalTimer::new(Duration::from_secs(3));
    let t0 = Instant::now();
    timer.start(t0);
    assert!(timer.fire(t0));
    assert!(!timer.fire(t0));
    assert!(timer.fire(t0 + Duration::from_secs(3)));
    timer.cancel();
    assert!(!timer.fire(t0 + Duration::from_secs(60)));
  }
}

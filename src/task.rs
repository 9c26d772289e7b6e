// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/task.rs - 任务
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

use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use std::{thread, time};

use tracing::{info, warn};

use crate::input::MediaSource;
use crate::input::camera::CameraDevice;
use crate::live::{LiveSession, SystemClock};
use crate::model::Model;
use crate::output::Render;
use crate::report::{DetectionReport, LiveReading};

pub trait Task<I, M, O>: Sized {
  type Report;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Report, Self::Error>;
}

/// 单次分析任务：可选地等待一段模拟分析延迟，推理一次，
/// 渲染一次，返回检测结果。
#[derive(Default, Debug)]
pub struct OneShotTask {
  delay: Option<Duration>,
}

impl OneShotTask {
  pub fn with_delay(mut self, delay: Option<Duration>) -> Self {
    self.delay = delay;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  M: Model<Input = MediaSource, Output = DetectionReport, Error = ME>,
  O: Render<MediaSource, DetectionReport, Error = RE>,
> Task<MediaSource, M, O> for OneShotTask
{
  type Report = DetectionReport;
  type Error = anyhow::Error;

  fn run_task(self, input: MediaSource, mut model: M, output: O) -> Result<DetectionReport, Self::Error> {
    info!("开始分析任务...");
    if let Some(delay) = self.delay {
      info!("模拟分析延迟: {:.2?}", delay);
      thread::sleep(delay);
    }
    let now = time::Instant::now();
    let report = model.infer(&input)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&input, &report)?;
    info!("渲染完成");

    Ok(report)
  }
}

/// 延迟执行的分析。与直接 sleep 不同，延迟期内可取消：
/// cancel 之后分析闭包不会运行，也不会有结果送达。
pub struct DeferredAnalysis<T> {
  handle: thread::JoinHandle<Option<T>>,
  cancel: mpsc::Sender<()>,
}

pub fn defer_analysis<T, F>(delay: Duration, job: F) -> DeferredAnalysis<T>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  let (cancel, rx) = mpsc::channel();
  let handle = thread::spawn(move || match rx.recv_timeout(delay) {
    Err(RecvTimeoutError::Timeout) => Some(job()),
    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
      info!("分析在延迟期内被取消");
      None
    }
  });
  DeferredAnalysis { handle, cancel }
}

impl<T> DeferredAnalysis<T> {
  /// 取消尚未开始的分析。延迟已过则不起作用。
  pub fn cancel(&self) {
    let _ = self.cancel.send(());
  }

  /// 等待任务结束。被取消时返回 None。
  pub fn join(self) -> Option<T> {
    let DeferredAnalysis { handle, cancel } = self;
    let result = match handle.join() {
      Ok(result) => result,
      Err(_) => {
        warn!("分析线程异常退出");
        None
      }
    };
    drop(cancel);
    result
  }
}

/// 持续检测任务：驱动实时会话直到评估次数达到上限或收到中断信号。
#[derive(Default, Debug)]
pub struct ContinuousTask {
  cycle_number: Option<usize>,
}

// 轮询实时会话的节拍
const POLL_TICK: Duration = Duration::from_millis(50);

impl ContinuousTask {
  pub fn with_cycle_number(mut self, cycle_number: Option<usize>) -> Self {
    self.cycle_number = cycle_number;
    self
  }

  pub fn run_session<D, O, RE>(
    self,
    session: &mut LiveSession<D, SystemClock>,
    output: O,
  ) -> Result<(), anyhow::Error>
  where
    D: CameraDevice,
    O: Render<MediaSource, LiveReading, Error = RE>,
    RE: std::error::Error + Sync + Send + 'static,
  {
    info!("开始任务...");
    let (tx, rx) = mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .expect("Error setting Ctrl-C handler");

    session.camera_on()?;
    session.start_detection();

    let source = MediaSource::webcam();
    let mut cycles = 0usize;
    loop {
      if let Some(reading) = session.poll() {
        cycles += 1;
        info!(
          "第 {} 次评估: {} ({:.0}%)",
          cycles,
          reading.verdict,
          reading.confidence * 100.0
        );
        output.render_result(&source, &reading)?;
        if self.cycle_number.map(|n| cycles >= n).unwrap_or(false) {
          info!("达到指定评估次数 {}, 退出任务循环", cycles);
          break;
        }
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
      thread::sleep(POLL_TICK);
    }

    session.camera_off();
    info!("任务完成，退出");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Arc;
  use std::sync::atomic::{AtomicBool, Ordering};

  use crate::model::MockDeepfakeModel;
  use crate::policy::DetectionPolicy;
  use crate::report::SourceKind;

  struct NullOutput;

  impl Render<MediaSource, DetectionReport> for NullOutput {
    type Error = std::convert::Infallible;

    fn render_result(
      &self,
      _source: &MediaSource,
      _report: &DetectionReport,
    ) -> Result<(), Self::Error> {
      Ok(())
    }
  }

  #[test]
  fn one_shot_task_returns_a_report_for_the_input() {
    let source = MediaSource::new(SourceKind::Image, Some("a.png".to_string()), None);
    let model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 21);
    let report = OneShotTask::default()
      .run_task(source, model, NullOutput)
      .unwrap();
    assert_eq!(report.source_kind, SourceKind::Image);
    assert_eq!(report.file_name.as_deref(), Some("a.png"));
  }

  #[test]
  fn deferred_analysis_completes_after_the_delay() {
    let pending = defer_analysis(Duration::from_millis(10), || 7u32);
    assert_eq!(pending.join(), Some(7));
  }

  #[test]
  fn cancelled_analysis_never_runs() {
    let ran = Arc::new(AtomicBool::new(false));
    let probe = Arc::clone(&ran);
    let pending = defer_analysis(Duration::from_secs(5), move || {
      probe.store(true, Ordering::SeqCst);
      1u32
    });
    pending.cancel();
    assert_eq!(pending.join(), None);
    assert!(!ran.load(Ordering::SeqCst));
  }
}

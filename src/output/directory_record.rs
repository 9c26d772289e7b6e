// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Datelike, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::debug;

use crate::history::DashboardStats;
use crate::input::MediaSource;
use crate::output::Render;
use crate::report::{DetectionReport, HistoryRow, LiveReading};
use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 把结果按日期目录追加为 JSON 记录。
/// 默认跳过没有人脸条目的结果，?always 则全部记录。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  record_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      record_counters: Arc::new(Mutex::new(0)),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn record_id(&self) -> u16 {
    let mut counter = self.record_counters.lock().unwrap();
    let id = *counter + 1;
    *counter = id;
    id
  }

  fn record_path(&self, stem: &str) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{}-{:04X}.json",
      stem,
      now.format("%H-%M-%S"),
      self.record_id()
    )))
  }

  fn write_json<T: serde::Serialize>(
    &self,
    stem: &str,
    value: &T,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let path = self.record_path(stem)?;
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(&path, json)?;
    debug!("记录写入: {}", path.display());
    Ok(path)
  }

  /// 仪表盘导出：历史记录与统计打包为一个 JSON 文件
  pub fn record_dashboard(
    &self,
    rows: &[HistoryRow],
    stats: &DashboardStats,
  ) -> Result<PathBuf, DirectoryRecordOutputError> {
    let export = serde_json::json!({
      "history": rows,
      "stats": stats,
    });
    self.write_json("dashboard", &export)
  }
}

impl Render<MediaSource, DetectionReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(
    &self,
    _source: &MediaSource,
    report: &DetectionReport,
  ) -> Result<(), Self::Error> {
    if self.always || !report.faces.is_empty() {
      self.write_json("report", report)?;
    }
    Ok(())
  }
}

impl Render<MediaSource, LiveReading> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, _source: &MediaSource, reading: &LiveReading) -> Result<(), Self::Error> {
    self.write_json("reading", reading)?;
    Ok(())
  }
}

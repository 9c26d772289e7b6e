// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/bin/analyze_oneshot.rs - 单次分析演示
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use bianzhen::{
  FromUrl, init_logging,
  input::UploadSource,
  model::MockDeepfakeModel,
  output::OutputWrapper,
  policy::DetectionPolicy,
  task::{OneShotTask, Task},
  view::{ResultStore, ResultsView},
};
use tracing::{info, warn};

/// Bianzhen 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源（image://<path> 或 video://<path>）
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径（image://<path> 或 folder://<dir>）
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 检测策略文件（JSON），缺省使用内置策略
  #[arg(long, value_name = "FILE")]
  pub policy: Option<PathBuf>,
  /// 随机种子，固定后结果可复现
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
  /// 跳过模拟分析延迟
  #[arg(long)]
  pub skip_delay: bool,
}

fn main() -> Result<()> {
  init_logging();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let policy = match &args.policy {
    Some(path) => DetectionPolicy::from_path(path)?,
    None => DetectionPolicy::default(),
  };

  let upload = UploadSource::from_url(&args.input)?;
  let source = upload.to_media_source();
  let model = match args.seed {
    Some(seed) => MockDeepfakeModel::with_seed(policy.clone(), seed),
    None => MockDeepfakeModel::new(policy.clone()),
  };
  let output = OutputWrapper::from_url(&args.output)?;

  let delay = if args.skip_delay {
    None
  } else {
    Some(policy.sample_delay(&mut rand::thread_rng()))
  };

  let report = OneShotTask::default()
    .with_delay(delay)
    .run_task(source, model, output)?;

  info!(
    "分析完成: {} ({:.0}%), 人脸 {} 个, 处理耗时 {} ms",
    report.verdict,
    report.confidence * 100.0,
    report.faces.len(),
    report.processing_time_ms
  );

  // 与产品一致：结果存入内存后跳转到结果页
  let mut store = ResultStore::new();
  let id = store.insert(report);
  match ResultsView::resolve(&store, &id) {
    ResultsView::Found(report) => info!("结果页: /results/{}", report.id),
    ResultsView::Missing { back_to } => warn!("结果缺失，返回 {}", back_to.path()),
  }

  Ok(())
}

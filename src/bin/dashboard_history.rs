// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/bin/dashboard_history.rs - 仪表盘历史演示
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
use rand::SeedableRng;
use rand::rngs::StdRng;
use url::Url;

use bianzhen::{
  FromUrl, init_logging,
  history::{DashboardStats, generate_history},
  output::DirectoryRecordOutput,
  policy::DetectionPolicy,
};
use tracing::info;

/// Bianzhen 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 历史记录条数
  #[arg(long, value_name = "COUNT", default_value = "10")]
  pub count: usize,
  /// 导出目录（folder://<dir>）
  #[arg(long, value_name = "OUTPUT", default_value = "folder:///tmp/bianzhen-dashboard")]
  pub output: Url,
  /// 检测策略文件（JSON），缺省使用内置策略
  #[arg(long, value_name = "FILE")]
  pub policy: Option<PathBuf>,
  /// 随机种子，固定后结果可复现
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
}

fn main() -> Result<()> {
  init_logging();

  let args = Args::parse();

  let policy = match &args.policy {
    Some(path) => DetectionPolicy::from_path(path)?,
    None => DetectionPolicy::default(),
  };

  let mut rng = match args.seed {
    Some(seed) => StdRng::seed_from_u64(seed),
    None => StdRng::from_entropy(),
  };

  let rows = generate_history(&policy, &mut rng, args.count);
  let stats = DashboardStats::collect(&rows);

  info!("历史记录: {} 条", stats.total_scans);
  info!(
    "判定分布: authentic {} / deepfake {} / inconclusive {}",
    stats.authentic_content, stats.deepfakes_detected, stats.inconclusive
  );
  info!("深伪占比: {:.1}%", stats.deepfake_ratio() * 100.0);
  for row in &rows {
    info!(
      "  {} {} {} ({:.0}%)",
      row.timestamp.format("%Y-%m-%d %H:%M"),
      row.source_kind,
      row.verdict,
      row.confidence * 100.0
    );
  }

  let output = DirectoryRecordOutput::from_url(&args.output)?;
  let path = output.record_dashboard(&rows, &stats)?;
  info!("导出文件: {}", path.display());

  Ok(())
}

// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/bin/live_demo.rs - 实时检测演示
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
  input::SimulatedCamera,
  live::{LiveSession, SystemClock},
  model::MockDeepfakeModel,
  output::OutputWrapper,
  policy::DetectionPolicy,
  task::ContinuousTask,
};
use tracing::info;

/// Bianzhen 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 摄像头来源（camera://user，?deny=permission|device 模拟获取失败）
  #[arg(long, value_name = "CAMERA", default_value = "camera://user")]
  pub camera: Url,
  /// 输出路径（image://<path> 或 folder://<dir>）
  #[arg(long, value_name = "OUTPUT", default_value = "folder:///tmp/bianzhen-live")]
  pub output: Url,
  /// 检测策略文件（JSON），缺省使用内置策略
  #[arg(long, value_name = "FILE")]
  pub policy: Option<PathBuf>,
  /// 随机种子，固定后结果可复现
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,
  /// 评估次数上限，缺省无限直到 Ctrl-C
  #[arg(long, value_name = "CYCLE_NUMBER")]
  pub cycle_number: Option<usize>,
}

fn main() -> Result<()> {
  init_logging();

  let args = Args::parse();

  info!("摄像头来源: {}", args.camera);
  info!("输出路径: {}", args.output);

  let policy = match &args.policy {
    Some(path) => DetectionPolicy::from_path(path)?,
    None => DetectionPolicy::default(),
  };

  let camera = SimulatedCamera::from_url(&args.camera)?;
  let model = match args.seed {
    Some(seed) => MockDeepfakeModel::with_seed(policy, seed),
    None => MockDeepfakeModel::new(policy),
  };
  let output = OutputWrapper::from_url(&args.output)?;

  let mut session = LiveSession::new(camera, SystemClock, model);

  ContinuousTask::default()
    .with_cycle_number(args.cycle_number)
    .run_session(&mut session, output)?;

  Ok(())
}

// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/history.rs - 模拟历史记录与仪表盘统计
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::{Datelike, Duration, Utc};
use rand::Rng;
use serde::Serialize;
use uuid::Uuid;

use crate::policy::DetectionPolicy;
use crate::report::{HistoryRow, SourceKind, Verdict};

// 历史记录中各来源的出现权重
const KIND_WEIGHT_IMAGE: u32 = 50;
const KIND_WEIGHT_VIDEO: u32 = 35;
const KIND_WEIGHT_WEBCAM: u32 = 15;

// 相邻两条记录的时间间隔（小时）
const GAP_HOURS: (i64, i64) = (2, 9);

fn synth_kind<R: Rng + ?Sized>(rng: &mut R) -> SourceKind {
  let total = KIND_WEIGHT_IMAGE + KIND_WEIGHT_VIDEO + KIND_WEIGHT_WEBCAM;
  let roll = rng.gen_range(0..total);
  if roll < KIND_WEIGHT_IMAGE {
    SourceKind::Image
  } else if roll < KIND_WEIGHT_IMAGE + KIND_WEIGHT_VIDEO {
    SourceKind::Video
  } else {
    SourceKind::Webcam
  }
}

fn synth_file_name<R: Rng + ?Sized>(rng: &mut R, kind: SourceKind) -> Option<String> {
  match kind {
    SourceKind::Image => Some(format!("photo_{:04}.jpg", rng.gen_range(0..10_000))),
    SourceKind::Video => Some(format!("clip_{:04}.mp4", rng.gen_range(0..10_000))),
    SourceKind::Webcam => None,
  }
}

/// 生成 count 条伪造历史记录，新的在前。
///
/// 每条记录独立按策略抽取判定与置信度；同一 count 的两次调用
/// 产生不同结果（除非调用方固定随机种子），不做缓存。
pub fn generate_history<R: Rng + ?Sized>(
  policy: &DetectionPolicy,
  rng: &mut R,
  count: usize,
) -> Vec<HistoryRow> {
  let mut timestamp = Utc::now();
  let mut rows = Vec::with_capacity(count);

  for _ in 0..count {
    let (verdict, confidence) = policy.sample_verdict(rng);
    let kind = synth_kind(rng);
    let id = Uuid::new_v4().to_string();
    let thumbnail_url = match kind {
      SourceKind::Webcam => None,
      _ => Some(format!("thumb://history/{}.png", id)),
    };

    rows.push(HistoryRow {
      id,
      timestamp,
      source_kind: kind,
      file_name: synth_file_name(rng, kind),
      thumbnail_url,
      verdict,
      confidence,
    });

    timestamp -= Duration::hours(rng.gen_range(GAP_HOURS.0..=GAP_HOURS.1));
  }

  rows
}

/// 仪表盘统计：总量与按星期分桶的扫描/深伪数量（周一起始）。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardStats {
  pub total_scans: usize,
  pub deepfakes_detected: usize,
  pub authentic_content: usize,
  pub inconclusive: usize,
  pub scans_by_weekday: [u32; 7],
  pub deepfakes_by_weekday: [u32; 7],
}

impl DashboardStats {
  pub fn collect(rows: &[HistoryRow]) -> Self {
    let mut stats = DashboardStats {
      total_scans: rows.len(),
      ..DashboardStats::default()
    };

    for row in rows {
      let day = row.timestamp.weekday().num_days_from_monday() as usize;
      stats.scans_by_weekday[day] += 1;
      match row.verdict {
        Verdict::Authentic => stats.authentic_content += 1,
        Verdict::Inconclusive => stats.inconclusive += 1,
        Verdict::Deepfake => {
          stats.deepfakes_detected += 1;
          stats.deepfakes_by_weekday[day] += 1;
        }
      }
    }

    stats
  }

  pub fn deepfake_ratio(&self) -> f32 {
    if self.total_scans == 0 {
      0.0
    } else {
      self.deepfakes_detected as f32 / self.total_scans as f32
    }
  }
}

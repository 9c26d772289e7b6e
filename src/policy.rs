// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/policy.rs - 检测策略配置
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::report::Verdict;

// 产品原型内联的三分类权重与各自的置信度区间
const DEFAULT_WEIGHT_AUTHENTIC: f32 = 0.70;
const DEFAULT_WEIGHT_DEEPFAKE: f32 = 0.20;
const DEFAULT_WEIGHT_INCONCLUSIVE: f32 = 0.10;
const DEFAULT_RANGE_AUTHENTIC: (f32, f32) = (0.10, 0.35);
const DEFAULT_RANGE_DEEPFAKE: (f32, f32) = (0.70, 0.99);
const DEFAULT_RANGE_INCONCLUSIVE: (f32, f32) = (0.40, 0.60);

const DEFAULT_LIVE_INTERVAL_MS: u64 = 3000;
const DEFAULT_DELAY_RANGE_MS: (u64, u64) = (2000, 4000);
const DEFAULT_MAX_FACES: u8 = 3;

const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Error, Debug)]
pub enum PolicyError {
  #[error("策略文件读取错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("策略文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("策略无效: {0}")]
  Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerdictWeights {
  pub authentic: f32,
  pub deepfake: f32,
  pub inconclusive: f32,
}

impl VerdictWeights {
  pub fn total(&self) -> f32 {
    self.authentic + self.deepfake + self.inconclusive
  }
}

impl Default for VerdictWeights {
  fn default() -> Self {
    VerdictWeights {
      authentic: DEFAULT_WEIGHT_AUTHENTIC,
      deepfake: DEFAULT_WEIGHT_DEEPFAKE,
      inconclusive: DEFAULT_WEIGHT_INCONCLUSIVE,
    }
  }
}

/// 闭区间 [lo, hi]，两端均在 [0,1] 内
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRange {
  pub lo: f32,
  pub hi: f32,
}

impl ConfidenceRange {
  pub fn new(lo: f32, hi: f32) -> Self {
    ConfidenceRange { lo, hi }
  }

  pub fn is_valid(&self) -> bool {
    (0.0..=1.0).contains(&self.lo) && (0.0..=1.0).contains(&self.hi) && self.lo <= self.hi
  }

  pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
    if self.lo >= self.hi {
      self.lo
    } else {
      rng.gen_range(self.lo..self.hi)
    }
  }
}

impl From<(f32, f32)> for ConfidenceRange {
  fn from((lo, hi): (f32, f32)) -> Self {
    ConfidenceRange::new(lo, hi)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceRanges {
  pub authentic: ConfidenceRange,
  pub deepfake: ConfidenceRange,
  pub inconclusive: ConfidenceRange,
}

impl ConfidenceRanges {
  pub fn for_verdict(&self, verdict: Verdict) -> ConfidenceRange {
    match verdict {
      Verdict::Authentic => self.authentic,
      Verdict::Deepfake => self.deepfake,
      Verdict::Inconclusive => self.inconclusive,
    }
  }
}

impl Default for ConfidenceRanges {
  fn default() -> Self {
    ConfidenceRanges {
      authentic: DEFAULT_RANGE_AUTHENTIC.into(),
      deepfake: DEFAULT_RANGE_DEEPFAKE.into(),
      inconclusive: DEFAULT_RANGE_INCONCLUSIVE.into(),
    }
  }
}

/// 检测策略：权重、置信度区间与演示节奏全部集中于此，
/// 不再散落为内联常量。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionPolicy {
  pub weights: VerdictWeights,
  pub confidence: ConfidenceRanges,
  /// 单次分析合成的人脸数量上限
  pub max_faces: u8,
  /// 深伪判定可附带的痕迹标签池
  pub artifact_pool: Vec<String>,
  /// 实时检测的重评估周期（毫秒）
  pub live_interval_ms: u64,
  /// 模拟分析延迟的取值区间（毫秒）
  pub delay_range_ms: (u64, u64),
}

impl Default for DetectionPolicy {
  fn default() -> Self {
    DetectionPolicy {
      weights: VerdictWeights::default(),
      confidence: ConfidenceRanges::default(),
      max_faces: DEFAULT_MAX_FACES,
      artifact_pool: vec![
        "Inconsistent lighting patterns".to_string(),
        "Unnatural facial expressions".to_string(),
        "Texture artifacts around face edges".to_string(),
        "Face boundary blending traces".to_string(),
      ],
      live_interval_ms: DEFAULT_LIVE_INTERVAL_MS,
      delay_range_ms: DEFAULT_DELAY_RANGE_MS,
    }
  }
}

impl DetectionPolicy {
  /// 从 JSON 文件加载并校验策略
  pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
    let path = path.as_ref();
    info!("加载策略文件: {}", path.display());
    let data = std::fs::read_to_string(path)?;
    let policy: DetectionPolicy = serde_json::from_str(&data)?;
    policy.validate()?;
    Ok(policy)
  }

  pub fn validate(&self) -> Result<(), PolicyError> {
    let w = &self.weights;
    if w.authentic < 0.0 || w.deepfake < 0.0 || w.inconclusive < 0.0 {
      return Err(PolicyError::Invalid("权重不得为负".to_string()));
    }
    if (w.total() - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
      return Err(PolicyError::Invalid(format!(
        "权重之和应为 1.0，实际 {:.4}",
        w.total()
      )));
    }
    for (name, range) in [
      ("authentic", self.confidence.authentic),
      ("deepfake", self.confidence.deepfake),
      ("inconclusive", self.confidence.inconclusive),
    ] {
      if !range.is_valid() {
        return Err(PolicyError::Invalid(format!(
          "置信度区间 {} 无效: [{}, {}]",
          name, range.lo, range.hi
        )));
      }
    }
    // 约定：深伪区间必须整体高于真实区间
    if self.confidence.deepfake.lo < self.confidence.authentic.hi {
      return Err(PolicyError::Invalid(
        "deepfake 置信度区间必须高于 authentic 区间".to_string(),
      ));
    }
    if self.delay_range_ms.0 > self.delay_range_ms.1 {
      return Err(PolicyError::Invalid(format!(
        "延迟区间无效: [{}, {}]",
        self.delay_range_ms.0, self.delay_range_ms.1
      )));
    }
    Ok(())
  }

  /// 按权重抽取判定结果，并在其区间内抽取置信度
  pub fn sample_verdict<R: Rng + ?Sized>(&self, rng: &mut R) -> (Verdict, f32) {
    let total = self.weights.total().max(f32::EPSILON);
    let roll = rng.gen_range(0.0..total);
    let verdict = if roll < self.weights.authentic {
      Verdict::Authentic
    } else if roll < self.weights.authentic + self.weights.deepfake {
      Verdict::Deepfake
    } else {
      Verdict::Inconclusive
    };
    let confidence = self.confidence.for_verdict(verdict).sample(rng);
    (verdict, confidence)
  }

  pub fn live_interval(&self) -> Duration {
    Duration::from_millis(self.live_interval_ms)
  }

  /// 抽取一次模拟分析延迟
  pub fn sample_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
    let (lo, hi) = self.delay_range_ms;
    let millis = if lo >= hi { lo } else { rng.gen_range(lo..hi) };
    Duration::from_millis(millis)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::SeedableRng;
  use rand::rngs::StdRng;

  #[test]
  fn default_policy_is_valid() {
    DetectionPolicy::default().validate().unwrap();
  }

  #[test]
  fn negative_weight_is_rejected() {
    let mut policy = DetectionPolicy::default();
    policy.weights.deepfake = -0.2;
    assert!(policy.validate().is_err());
  }

  #[test]
  fn weights_must_sum_to_one() {
    let mut policy = DetectionPolicy::default();
    policy.weights.authentic = 0.9;
    assert!(policy.validate().is_err());
  }

  #[test]
  fn deepfake_range_must_sit_above_authentic_range() {
    let mut policy = DetectionPolicy::default();
    policy.confidence.deepfake = ConfidenceRange::new(0.2, 0.5);
    assert!(policy.validate().is_err());
  }

  #[test]
  fn sampled_confidence_stays_in_the_verdict_range() {
    let policy = DetectionPolicy::default();
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
      let (verdict, confidence) = policy.sample_verdict(&mut rng);
      let range = policy.confidence.for_verdict(verdict);
      assert!(confidence >= range.lo && confidence <= range.hi);
      assert!((0.0..=1.0).contains(&confidence));
    }
  }

  #[test]
  fn sampling_is_deterministic_under_a_seed() {
    let policy = DetectionPolicy::default();
    let mut a = StdRng::seed_from_u64(42);
    let mut b = StdRng::seed_from_u64(42);
    for _ in 0..32 {
      assert_eq!(policy.sample_verdict(&mut a), policy.sample_verdict(&mut b));
    }
  }

  #[test]
  fn sample_delay_respects_the_configured_bounds() {
    let policy = DetectionPolicy::default();
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..50 {
      let delay = policy.sample_delay(&mut rng);
      assert!(delay >= Duration::from_millis(2000));
      assert!(delay < Duration::from_millis(4000));
    }
  }

  #[test]
  fn policy_round_trips_through_its_file_form() {
    let policy = DetectionPolicy::default();
    let json = serde_json::to_string_pretty(&policy).unwrap();
    let parsed: DetectionPolicy = serde_json::from_str(&json).unwrap();
    assert_eq!(policy, parsed);
  }

  #[test]
  fn from_path_rejects_an_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("policy.json");
    std::fs::write(&path, "{\"weights\":{\"authentic\":2.0,\"deepfake\":0.0,\"inconclusive\":0.0}}").unwrap();
    assert!(DetectionPolicy::from_path(&path).is_err());
  }
}

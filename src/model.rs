// 该文件是 Bianzhen （辨真） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::convert::Infallible;

use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;
use uuid::Uuid;

use crate::input::MediaSource;
use crate::policy::DetectionPolicy;
use crate::report::{BoundingBox, DetectedFace, DetectionReport, LiveReading, SourceKind, Verdict};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

// 人脸与父级判定不一致的概率
const FACE_VERDICT_FLIP: f64 = 0.15;
// 每张深伪人脸附带的痕迹标签数量
const ARTIFACTS_PER_FACE: usize = 2;

// 伪造处理耗时的取值区间（毫秒）
const PROCESSING_MS_IMAGE: (u64, u64) = (350, 1600);
const PROCESSING_MS_VIDEO: (u64, u64) = (1200, 3600);
const PROCESSING_MS_WEBCAM: (u64, u64) = (25, 45);

/// 模拟深伪检测模型。
///
/// 不做任何真实推理：判定、置信度、人脸框与痕迹标签全部按
/// 策略权重伪造，仅用于驱动演示产品。对声明的输入域是全函数，
/// 除随机源外没有副作用。
pub struct MockDeepfakeModel {
  policy: DetectionPolicy,
  rng: StdRng,
}

impl MockDeepfakeModel {
  pub fn new(policy: DetectionPolicy) -> Self {
    MockDeepfakeModel {
      policy,
      rng: StdRng::from_entropy(),
    }
  }

  /// 固定随机种子，测试与复现演示用
  pub fn with_seed(policy: DetectionPolicy, seed: u64) -> Self {
    MockDeepfakeModel {
      policy,
      rng: StdRng::seed_from_u64(seed),
    }
  }

  pub fn policy(&self) -> &DetectionPolicy {
    &self.policy
  }

  /// 实时循环的轻量评估：只抽取判定与置信度，不合成人脸。
  pub fn live_reading(&mut self) -> LiveReading {
    let (verdict, confidence) = self.policy.sample_verdict(&mut self.rng);
    LiveReading {
      verdict,
      confidence,
    }
  }

  fn synth_bounding_box(&mut self) -> BoundingBox {
    let x = self.rng.gen_range(0.05..0.60f32);
    let y = self.rng.gen_range(0.05..0.50f32);
    let width = self.rng.gen_range(0.15..0.40f32);
    let height = self.rng.gen_range(0.20..0.50f32);
    // BoundingBox::new 收紧尺寸，保证框不越出帧
    BoundingBox::new(x, y, width, height)
  }

  fn synth_artifacts(&mut self) -> Option<Vec<String>> {
    if self.policy.artifact_pool.is_empty() {
      return None;
    }
    let count = ARTIFACTS_PER_FACE.min(self.policy.artifact_pool.len());
    let MockDeepfakeModel { policy, rng } = self;
    let labels = policy
      .artifact_pool
      .choose_multiple(rng, count)
      .cloned()
      .collect::<Vec<_>>();
    Some(labels)
  }

  fn synth_face(&mut self, parent: Verdict) -> DetectedFace {
    let verdict = if self.rng.gen_bool(FACE_VERDICT_FLIP) {
      let (v, _) = self.policy.sample_verdict(&mut self.rng);
      v
    } else {
      parent
    };
    let confidence = self.policy.confidence.for_verdict(verdict).sample(&mut self.rng);
    let manipulation_score = self
      .policy
      .confidence
      .for_verdict(verdict)
      .sample(&mut self.rng);
    let artifacts = if verdict == Verdict::Deepfake {
      self.synth_artifacts()
    } else {
      None
    };

    DetectedFace {
      id: Uuid::new_v4().to_string(),
      bounding_box: self.synth_bounding_box(),
      confidence,
      verdict,
      manipulation_score,
      artifacts,
    }
  }

  fn synth_faces(&mut self, parent: Verdict) -> Vec<DetectedFace> {
    let count = self.rng.gen_range(0..=self.policy.max_faces) as usize;
    (0..count).map(|_| self.synth_face(parent)).collect()
  }

  fn synth_processing_time(&mut self, kind: SourceKind) -> u64 {
    let (lo, hi) = match kind {
      SourceKind::Image => PROCESSING_MS_IMAGE,
      SourceKind::Video => PROCESSING_MS_VIDEO,
      SourceKind::Webcam => PROCESSING_MS_WEBCAM,
    };
    self.rng.gen_range(lo..hi)
  }
}

impl Model for MockDeepfakeModel {
  type Input = MediaSource;
  type Output = DetectionReport;
  type Error = Infallible;

  fn infer(&mut self, input: &MediaSource) -> Result<DetectionReport, Infallible> {
    let (verdict, confidence) = self.policy.sample_verdict(&mut self.rng);
    let faces = self.synth_faces(verdict);
    let processing_time_ms = self.synth_processing_time(input.kind);

    debug!(
      "伪造检测结果: {} ({:.0}%), 人脸 {} 个",
      verdict,
      confidence * 100.0,
      faces.len()
    );

    Ok(DetectionReport {
      id: Uuid::new_v4().to_string(),
      timestamp: Utc::now(),
      source_kind: input.kind,
      file_name: input.file_name.clone(),
      media_url: input.media_url.clone(),
      verdict,
      confidence,
      processing_time_ms,
      faces,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn image_source(name: &str) -> MediaSource {
    MediaSource::new(SourceKind::Image, Some(name.to_string()), None)
  }

  #[test]
  fn report_echoes_kind_and_file_name() {
    let mut model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 1);
    let report = model.infer(&image_source("a.png")).unwrap();
    assert_eq!(report.source_kind, SourceKind::Image);
    assert_eq!(report.file_name.as_deref(), Some("a.png"));
  }

  #[test]
  fn generated_values_stay_in_range() {
    let mut model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 2);
    for _ in 0..100 {
      let report = model.infer(&image_source("a.png")).unwrap();
      assert!((0.0..=1.0).contains(&report.confidence));
      for face in &report.faces {
        assert!((0.0..=1.0).contains(&face.confidence));
        assert!((0.0..=1.0).contains(&face.manipulation_score));
        assert!(face.bounding_box.in_frame());
      }
    }
  }

  #[test]
  fn artifacts_only_accompany_deepfake_faces() {
    let mut model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 3);
    for _ in 0..100 {
      let report = model.infer(&image_source("b.jpg")).unwrap();
      for face in &report.faces {
        match face.verdict {
          Verdict::Deepfake => {
            let labels = face.artifacts.as_ref().unwrap();
            assert!(!labels.is_empty());
          }
          _ => assert!(face.artifacts.is_none()),
        }
      }
    }
  }

  #[test]
  fn seeded_models_reproduce_the_same_stream() {
    let source = image_source("c.webp");
    let mut a = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 9);
    let mut b = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 9);
    for _ in 0..10 {
      let ra = a.infer(&source).unwrap();
      let rb = b.infer(&source).unwrap();
      assert_eq!(ra.verdict, rb.verdict);
      assert_eq!(ra.confidence, rb.confidence);
      assert_eq!(ra.faces.len(), rb.faces.len());
    }
  }

  #[test]
  fn live_reading_uses_the_policy_ranges() {
    let policy = DetectionPolicy::default();
    let mut model = MockDeepfakeModel::with_seed(policy.clone(), 5);
    for _ in 0..100 {
      let reading = model.live_reading();
      let range = policy.confidence.for_verdict(reading.verdict);
      assert!(reading.confidence >= range.lo && reading.confidence <= range.hi);
    }
  }

  #[test]
  fn webcam_processing_time_matches_the_frame_budget() {
    let mut model = MockDeepfakeModel::with_seed(DetectionPolicy::default(), 6);
    let source = MediaSource::webcam();
    for _ in 0..20 {
      let report = model.infer(&source).unwrap();
      assert!((25..45).contains(&report.processing_time_ms));
    }
  }
}

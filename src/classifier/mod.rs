// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/classifier/mod.rs - 字母分类器
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

mod decision;
mod labels;
mod mlp;

pub use decision::{DecisionError, DecisionFn};
pub use labels::{default_labels, load_labels};
pub use mlp::{Activation, LayerWeights, MlpDecisionFn, MlpError, ModelArtifact};

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::landmark::{HAND_SIZE_FLOOR, LandmarkSet};

/// 字母分类错误
#[derive(Error, Debug)]
pub enum ClassifierError {
  /// 决策函数构件缺失，构造阶段的硬失败
  #[error("字母分类模型不存在: {0}")]
  ModelNotFound(String),
  /// 决策函数构件错误
  #[error("模型构件错误: {0}")]
  Model(#[from] MlpError),
  /// 标签表与决策函数输出维度不一致
  #[error("标签数 {labels} 与模型输出类别数 {classes} 不一致")]
  LabelMismatch {
    /// 标签表长度
    labels: usize,
    /// 决策函数输出类别数
    classes: usize,
  },
  /// 决策函数运行失败
  #[error("决策函数错误: {0}")]
  Decision(#[from] DecisionError),
}

/// 单次分类结果
///
/// 置信度是决策函数分配给该字母的概率质量，范围 [0,1]。
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  /// 预测字母
  pub letter: String,
  /// 置信度
  pub confidence: f32,
}

/// 字母分类器
///
/// 持有不可变的决策函数与标签表，以及可配置的置信度阈值。
/// 构造为原子操作：决策函数与标签表一起加载并校验索引对应关系，
/// 失败即整体失败，不存在半初始化状态。
pub struct LetterClassifier {
  /// 决策函数
  decision: Box<dyn DecisionFn>,
  /// 标签表，索引 i 对应输出向量第 i 位
  labels: Vec<String>,
  /// 置信度阈值
  threshold: f32,
}

impl LetterClassifier {
  /// 从构件文件与标签文件加载
  ///
  /// 构件缺失返回 [`ClassifierError::ModelNotFound`]；
  /// 标签文件缺失回退 A-Z（仅告警）。
  pub fn load(
    model_path: &str,
    labels_path: &str,
    threshold: f32,
  ) -> Result<Self, ClassifierError> {
    if !Path::new(model_path).exists() {
      return Err(ClassifierError::ModelNotFound(model_path.to_string()));
    }

    let decision = MlpDecisionFn::load(model_path)?;
    let labels = load_labels(labels_path);
    Self::from_parts(Box::new(decision), labels, threshold)
  }

  /// 由决策函数与标签表构造，校验长度一致
  pub fn from_parts(
    decision: Box<dyn DecisionFn>,
    labels: Vec<String>,
    threshold: f32,
  ) -> Result<Self, ClassifierError> {
    if labels.len() != decision.class_count() {
      return Err(ClassifierError::LabelMismatch {
        labels: labels.len(),
        classes: decision.class_count(),
      });
    }

    info!("字母分类器就绪: {} 类, 阈值 {:.2}", labels.len(), threshold);
    Ok(Self {
      decision,
      labels,
      threshold,
    })
  }

  /// 标签表
  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  /// 类别数
  pub fn class_count(&self) -> usize {
    self.labels.len()
  }

  /// 当前置信度阈值
  pub fn threshold(&self) -> f32 {
    self.threshold
  }

  /// 调整置信度阈值，不触及已训练的决策函数
  pub fn set_threshold(&mut self, threshold: f32) {
    self.threshold = threshold;
  }

  /// 置信度是否达到阈值，边界值视为达到
  pub fn is_confident(&self, confidence: f32) -> bool {
    confidence >= self.threshold
  }

  /// 内部归一化并求概率分布
  ///
  /// 退化关键点集（手掌尺寸低于下限）在归一化前拒绝，
  /// 按"无可用关键点"处理，不把巨值向量喂给决策函数。
  fn probabilities(&self, set: &LandmarkSet) -> Result<Option<Vec<f32>>, ClassifierError> {
    if set.hand_size() < HAND_SIZE_FLOOR {
      debug!("关键点集退化，视为无可用关键点");
      return Ok(None);
    }

    let probs = self.decision.evaluate(&set.normalized_features())?;
    Ok(Some(probs))
  }

  /// 预测字母与置信度
  ///
  /// 无关键点输入返回 `Ok(None)`，不是错误。
  pub fn predict(
    &self,
    landmarks: Option<&LandmarkSet>,
  ) -> Result<Option<Prediction>, ClassifierError> {
    let Some(set) = landmarks else {
      return Ok(None);
    };
    let Some(probs) = self.probabilities(set)? else {
      return Ok(None);
    };

    let mut best = 0usize;
    for (i, p) in probs.iter().enumerate() {
      if *p > probs[best] {
        best = i;
      }
    }

    Ok(Some(Prediction {
      letter: self.labels[best].clone(),
      confidence: probs[best],
    }))
  }

  /// 置信度最高的 k 个预测
  ///
  /// 按置信度降序返回 min(k, 类别数) 个结果；置信度相等时
  /// 保持标签索引升序（按索引序的稳定排序）。
  pub fn predict_top_k(
    &self,
    landmarks: Option<&LandmarkSet>,
    k: usize,
  ) -> Result<Vec<Prediction>, ClassifierError> {
    let Some(set) = landmarks else {
      return Ok(Vec::new());
    };
    let Some(probs) = self.probabilities(set)? else {
      return Ok(Vec::new());
    };

    let mut indices: Vec<usize> = (0..probs.len()).collect();
    indices.sort_by(|a, b| probs[*b].partial_cmp(&probs[*a]).unwrap_or(std::cmp::Ordering::Equal));
    indices.truncate(k.min(probs.len()));

    Ok(
      indices
        .into_iter()
        .map(|i| Prediction {
          letter: self.labels[i].clone(),
          confidence: probs[i],
        })
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::landmark::{FEATURE_LEN, LANDMARK_DIMS, Landmark, LANDMARK_COUNT};

  /// 返回固定概率分布的桩决策函数
  struct FixedDecision {
    probs: Vec<f32>,
  }

  impl DecisionFn for FixedDecision {
    fn class_count(&self) -> usize {
      self.probs.len()
    }

    fn evaluate(&self, _features: &[f32; FEATURE_LEN]) -> Result<Vec<f32>, DecisionError> {
      Ok(self.probs.clone())
    }
  }

  fn open_palm() -> LandmarkSet {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
      point.x = 0.4 + 0.01 * i as f32;
      point.y = 0.6 - 0.015 * i as f32;
      point.z = 0.002 * i as f32;
    }
    LandmarkSet::new(points)
  }

  fn classifier_with(probs: Vec<f32>, labels: Vec<&str>, threshold: f32) -> LetterClassifier {
    LetterClassifier::from_parts(
      Box::new(FixedDecision { probs }),
      labels.into_iter().map(String::from).collect(),
      threshold,
    )
    .unwrap()
  }

  #[test]
  fn predict_none_returns_none() {
    let classifier = classifier_with(vec![0.5, 0.5], vec!["A", "B"], 0.5);
    assert!(classifier.predict(None).unwrap().is_none());
    assert!(classifier.predict_top_k(None, 3).unwrap().is_empty());
  }

  #[test]
  fn predict_maps_argmax_to_label() {
    let classifier = classifier_with(vec![0.1, 0.7, 0.2], vec!["A", "B", "C"], 0.5);
    let prediction = classifier.predict(Some(&open_palm())).unwrap().unwrap();
    assert_eq!(prediction.letter, "B");
    assert!((prediction.confidence - 0.7).abs() < 1e-6);
  }

  #[test]
  fn top_k_sorted_without_duplicates() {
    let classifier = classifier_with(
      vec![0.05, 0.3, 0.1, 0.4, 0.15],
      vec!["A", "B", "C", "D", "E"],
      0.5,
    );
    let top = classifier.predict_top_k(Some(&open_palm()), 3).unwrap();

    assert_eq!(top.len(), 3);
    assert_eq!(top[0].letter, "D");
    assert_eq!(top[1].letter, "B");
    assert_eq!(top[2].letter, "E");
    for pair in top.windows(2) {
      assert!(pair[0].confidence >= pair[1].confidence);
    }
  }

  #[test]
  fn top_k_larger_than_classes_returns_all() {
    let classifier = classifier_with(vec![0.6, 0.4], vec!["A", "B"], 0.5);
    let top = classifier.predict_top_k(Some(&open_palm()), 10).unwrap();
    assert_eq!(top.len(), 2);
  }

  #[test]
  fn top_k_equal_confidence_keeps_label_order() {
    let classifier = classifier_with(vec![0.25, 0.25, 0.25, 0.25], vec!["A", "B", "C", "D"], 0.5);
    let top = classifier.predict_top_k(Some(&open_palm()), 4).unwrap();
    let letters: Vec<&str> = top.iter().map(|p| p.letter.as_str()).collect();
    assert_eq!(letters, vec!["A", "B", "C", "D"]);
  }

  #[test]
  fn is_confident_boundary_inclusive() {
    let classifier = classifier_with(vec![1.0], vec!["A"], 0.5);
    assert!(classifier.is_confident(0.5));
    assert!(classifier.is_confident(0.6));
    assert!(!classifier.is_confident(0.49));
  }

  #[test]
  fn threshold_is_adjustable() {
    let mut classifier = classifier_with(vec![1.0], vec!["A"], 0.5);
    classifier.set_threshold(0.8);
    assert_eq!(classifier.threshold(), 0.8);
    assert!(!classifier.is_confident(0.7));
  }

  #[test]
  fn label_mismatch_rejected_at_construction() {
    let result = LetterClassifier::from_parts(
      Box::new(FixedDecision {
        probs: vec![0.5, 0.5],
      }),
      vec!["A".to_string(), "B".to_string(), "C".to_string()],
      0.5,
    );
    assert!(matches!(
      result,
      Err(ClassifierError::LabelMismatch { labels: 3, classes: 2 })
    ));
  }

  #[test]
  fn degenerate_landmarks_predict_none() {
    let classifier = classifier_with(vec![0.5, 0.5], vec!["A", "B"], 0.5);
    // 所有关键点重合
    let set = LandmarkSet::new([Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT]);
    assert!(classifier.predict(Some(&set)).unwrap().is_none());
  }

  #[test]
  fn normalization_applied_before_decision() {
    /// 回显首个特征的桩，检查分类器内部确实做了归一化
    struct Probe;
    impl DecisionFn for Probe {
      fn class_count(&self) -> usize {
        2
      }
      fn evaluate(&self, features: &[f32; FEATURE_LEN]) -> Result<Vec<f32>, DecisionError> {
        // 手腕行必须已归零
        assert_eq!(&features[..LANDMARK_DIMS], &[0.0, 0.0, 0.0]);
        Ok(vec![1.0, 0.0])
      }
    }

    let classifier = LetterClassifier::from_parts(
      Box::new(Probe),
      vec!["A".to_string(), "B".to_string()],
      0.5,
    )
    .unwrap();
    let prediction = classifier.predict(Some(&open_palm())).unwrap().unwrap();
    assert_eq!(prediction.letter, "A");
  }
}

// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/pipeline.rs - 逐帧识别管线
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

use std::fmt;

use image::RgbImage;
use tracing::{debug, error};

use crate::classifier::LetterClassifier;
use crate::detector::HandPoseDetector;
use crate::landmark::{LandmarkSet, PixelRect};

/// 单帧决策的呈现层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionStatus {
  /// 未检测到手
  NoHand,
  /// 预测置信度达到阈值
  Confident,
  /// 有预测但置信度不足
  LowConfidence,
  /// 分类阶段失败，已捕获
  ClassificationError,
}

impl DecisionStatus {
  /// 状态的线格式字符串
  pub fn as_str(&self) -> &'static str {
    match self {
      DecisionStatus::NoHand => "no-hand",
      DecisionStatus::Confident => "confident",
      DecisionStatus::LowConfidence => "low-confidence",
      DecisionStatus::ClassificationError => "classification-error",
    }
  }
}

impl fmt::Display for DecisionStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// 单帧决策记录
///
/// 每处理一帧生成一份，不持久化。
#[derive(Debug, Clone)]
pub struct FrameDecision {
  /// 是否检测到手
  pub hand_detected: bool,
  /// 预测字母
  pub letter: Option<String>,
  /// 置信度
  pub confidence: f32,
  /// 呈现层级
  pub status: DecisionStatus,
  /// 手部外接框（像素坐标）
  pub bbox: Option<PixelRect>,
  /// 手部关键点（用于叠加绘制）
  pub landmarks: Option<LandmarkSet>,
  /// 人读状态信息
  pub message: String,
}

impl FrameDecision {
  fn no_hand(message: String) -> Self {
    Self {
      hand_detected: false,
      letter: None,
      confidence: 0.0,
      status: DecisionStatus::NoHand,
      bbox: None,
      landmarks: None,
      message,
    }
  }
}

/// 会话状态快照，仅用于状态展示
#[derive(Debug, Clone)]
pub struct SessionStatus {
  /// 最近一帧是否检测到手
  pub hand_detected: bool,
  /// 最近一次预测字母
  pub last_letter: Option<String>,
  /// 最近一次预测置信度
  pub last_confidence: f32,
}

/// 逐帧识别管线
///
/// 组合手部姿态检测与字母分类，输出单帧决策记录。
/// 每帧独立决策；会话状态只服务于展示，不回流到决策逻辑。
pub struct Pipeline {
  /// 手部姿态检测器
  detector: Box<dyn HandPoseDetector>,
  /// 字母分类器
  classifier: LetterClassifier,
  /// 外接框外扩比例
  bbox_padding: f32,
  /// 最近一次预测字母
  last_letter: Option<String>,
  /// 最近一次预测置信度
  last_confidence: f32,
  /// 最近一帧是否检测到手
  hand_detected: bool,
}

impl Pipeline {
  /// 组装管线
  pub fn new(
    detector: Box<dyn HandPoseDetector>,
    classifier: LetterClassifier,
    bbox_padding: f32,
  ) -> Self {
    Self {
      detector,
      classifier,
      bbox_padding,
      last_letter: None,
      last_confidence: 0.0,
      hand_detected: false,
    }
  }

  /// 字母分类器
  pub fn classifier(&self) -> &LetterClassifier {
    &self.classifier
  }

  /// 可变引用，用于运行中调整置信度阈值
  pub fn classifier_mut(&mut self) -> &mut LetterClassifier {
    &mut self.classifier
  }

  /// 处理一帧图像
  ///
  /// 决不向调用方传播帧内失败：检测失败与分类失败都被捕获并
  /// 转换为对应状态，帧循环持续运行。
  pub fn process_frame(&mut self, image: &RgbImage) -> FrameDecision {
    let landmarks = match self.detector.detect(image) {
      Ok(landmarks) => landmarks,
      Err(e) => {
        // 检测失败降级为"无手"视觉状态，不中断帧循环
        error!("手部检测失败: {}", e);
        self.hand_detected = false;
        return FrameDecision::no_hand(format!("检测失败: {}", e));
      }
    };

    let Some(set) = landmarks else {
      debug!("未检测到手");
      self.hand_detected = false;
      return FrameDecision::no_hand("未检测到手".to_string());
    };

    let bbox = set
      .bounding_box(self.bbox_padding)
      .to_pixels(image.width(), image.height());

    let prediction = match self.classifier.predict(Some(&set)) {
      Ok(prediction) => prediction,
      Err(e) => {
        error!("字母分类失败: {}", e);
        return FrameDecision {
          hand_detected: true,
          letter: None,
          confidence: 0.0,
          status: DecisionStatus::ClassificationError,
          bbox: Some(bbox),
          landmarks: Some(set),
          message: format!("分类错误: {}", e),
        };
      }
    };

    let Some(prediction) = prediction else {
      // 关键点退化：有手但没有可用预测，归入低置信层级
      return FrameDecision {
        hand_detected: true,
        letter: None,
        confidence: 0.0,
        status: DecisionStatus::LowConfidence,
        bbox: Some(bbox),
        landmarks: Some(set),
        message: "关键点退化，无可用预测".to_string(),
      };
    };

    let confident = self.classifier.is_confident(prediction.confidence);
    let status = if confident {
      DecisionStatus::Confident
    } else {
      DecisionStatus::LowConfidence
    };
    let message = if confident {
      format!("预测: {}", prediction.letter)
    } else {
      format!(
        "低置信度: {} ({:.1}%)",
        prediction.letter,
        prediction.confidence * 100.0
      )
    };

    // 会话状态仅供展示
    self.last_letter = Some(prediction.letter.clone());
    self.last_confidence = prediction.confidence;
    self.hand_detected = true;

    FrameDecision {
      hand_detected: true,
      letter: Some(prediction.letter),
      confidence: prediction.confidence,
      status,
      bbox: Some(bbox),
      landmarks: Some(set),
      message,
    }
  }

  /// 会话状态快照
  pub fn status(&self) -> SessionStatus {
    SessionStatus {
      hand_detected: self.hand_detected,
      last_letter: self.last_letter.clone(),
      last_confidence: self.last_confidence,
    }
  }

  /// 清空会话状态
  pub fn reset(&mut self) {
    self.last_letter = None;
    self.last_confidence = 0.0;
    self.hand_detected = false;
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use super::*;
  use crate::classifier::{DecisionError, DecisionFn};
  use crate::detector::{DetectorConfig, DetectorError};
  use crate::landmark::{FEATURE_LEN, LANDMARK_COUNT, Landmark};

  /// 固定返回结果的桩检测器
  struct StubDetector {
    landmarks: Option<LandmarkSet>,
    config: DetectorConfig,
  }

  impl StubDetector {
    fn new(landmarks: Option<LandmarkSet>) -> Self {
      Self {
        landmarks,
        config: DetectorConfig::default(),
      }
    }
  }

  impl HandPoseDetector for StubDetector {
    fn detect(&mut self, _image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError> {
      Ok(self.landmarks.clone())
    }

    fn config(&self) -> &DetectorConfig {
      &self.config
    }
  }

  /// 固定概率分布的桩决策函数
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

  /// 第一次调用失败、之后恢复的桩决策函数
  struct FlakyDecision {
    failed: Cell<bool>,
    probs: Vec<f32>,
  }

  impl DecisionFn for FlakyDecision {
    fn class_count(&self) -> usize {
      self.probs.len()
    }

    fn evaluate(&self, _features: &[f32; FEATURE_LEN]) -> Result<Vec<f32>, DecisionError> {
      if !self.failed.get() {
        self.failed.set(true);
        return Err(DecisionError::BadOutput("注入的失败".to_string()));
      }
      Ok(self.probs.clone())
    }
  }

  fn open_palm() -> LandmarkSet {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
      point.x = 0.35 + 0.012 * i as f32;
      point.y = 0.65 - 0.014 * i as f32;
      point.z = 0.001 * i as f32;
    }
    LandmarkSet::new(points)
  }

  fn classifier_b(confidence: f32, threshold: f32) -> LetterClassifier {
    // 标签 B 的概率固定为 confidence
    let mut probs = vec![0.0f32; 26];
    probs[1] = confidence;
    let rest = (1.0 - confidence) / 25.0;
    for (i, p) in probs.iter_mut().enumerate() {
      if i != 1 {
        *p = rest;
      }
    }
    LetterClassifier::from_parts(
      Box::new(FixedDecision { probs }),
      crate::classifier::default_labels(),
      threshold,
    )
    .unwrap()
  }

  fn frame() -> RgbImage {
    RgbImage::new(64, 64)
  }

  #[test]
  fn no_hand_frame_yields_no_hand_record() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(None)),
      classifier_b(0.95, 0.5),
      0.2,
    );

    let decision = pipeline.process_frame(&frame());
    assert!(!decision.hand_detected);
    assert_eq!(decision.status, DecisionStatus::NoHand);
    assert_eq!(decision.status.as_str(), "no-hand");
    assert!(decision.letter.is_none());
    assert_eq!(decision.confidence, 0.0);
    assert!(decision.bbox.is_none());
  }

  #[test]
  fn confident_prediction_record() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier_b(0.95, 0.5),
      0.2,
    );

    let decision = pipeline.process_frame(&frame());
    assert!(decision.hand_detected);
    assert_eq!(decision.status, DecisionStatus::Confident);
    assert_eq!(decision.letter.as_deref(), Some("B"));
    assert!((decision.confidence - 0.95).abs() < 1e-6);
    assert!(decision.bbox.is_some());
  }

  #[test]
  fn low_confidence_still_reports_letter() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier_b(0.4, 0.5),
      0.2,
    );

    let decision = pipeline.process_frame(&frame());
    assert!(decision.hand_detected);
    assert_eq!(decision.status, DecisionStatus::LowConfidence);
    assert_eq!(decision.letter.as_deref(), Some("B"));
    assert!((decision.confidence - 0.4).abs() < 1e-6);
  }

  #[test]
  fn classification_error_caught_and_recovers() {
    let classifier = LetterClassifier::from_parts(
      Box::new(FlakyDecision {
        failed: Cell::new(false),
        probs: {
          let mut probs = vec![0.0f32; 26];
          probs[1] = 1.0;
          probs
        },
      }),
      crate::classifier::default_labels(),
      0.5,
    )
    .unwrap();
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier,
      0.2,
    );

    // 第一帧：分类失败被捕获
    let decision = pipeline.process_frame(&frame());
    assert!(decision.hand_detected);
    assert_eq!(decision.status, DecisionStatus::ClassificationError);
    assert_eq!(decision.status.as_str(), "classification-error");
    assert!(decision.letter.is_none());
    assert_eq!(decision.confidence, 0.0);

    // 第二帧：恢复正常，无残留状态
    let decision = pipeline.process_frame(&frame());
    assert_eq!(decision.status, DecisionStatus::Confident);
    assert_eq!(decision.letter.as_deref(), Some("B"));
  }

  #[test]
  fn session_status_tracks_last_prediction() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier_b(0.9, 0.5),
      0.2,
    );

    assert!(pipeline.status().last_letter.is_none());
    pipeline.process_frame(&frame());

    let status = pipeline.status();
    assert!(status.hand_detected);
    assert_eq!(status.last_letter.as_deref(), Some("B"));
    assert!((status.last_confidence - 0.9).abs() < 1e-6);

    pipeline.reset();
    let status = pipeline.status();
    assert!(!status.hand_detected);
    assert!(status.last_letter.is_none());
    assert_eq!(status.last_confidence, 0.0);
  }

  #[test]
  fn threshold_adjustment_changes_tier() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier_b(0.4, 0.5),
      0.2,
    );

    let decision = pipeline.process_frame(&frame());
    assert_eq!(decision.status, DecisionStatus::LowConfidence);

    // 运行中调低阈值，同一预测进入置信层级
    pipeline.classifier_mut().set_threshold(0.3);
    let decision = pipeline.process_frame(&frame());
    assert_eq!(decision.status, DecisionStatus::Confident);
  }

  #[test]
  fn bbox_derived_from_landmarks_within_image() {
    let mut pipeline = Pipeline::new(
      Box::new(StubDetector::new(Some(open_palm()))),
      classifier_b(0.9, 0.5),
      0.2,
    );

    let decision = pipeline.process_frame(&frame());
    let bbox = decision.bbox.unwrap();
    assert!(bbox.x + bbox.width <= 64);
    assert!(bbox.y + bbox.height <= 64);
    assert!(bbox.width > 0 && bbox.height > 0);
  }
}

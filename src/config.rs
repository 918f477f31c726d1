// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/config.rs - 运行配置
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

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// 运行配置
///
/// 所有阈值与路径通过该结构体显式传入各构造函数，
/// 不使用进程级全局变量，便于并行构建多条独立管线。
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// 手部检测置信度阈值
  #[serde(default = "default_detection_confidence")]
  pub detection_confidence: f32,

  /// 手部跟踪置信度阈值（静态图模式下由后端忽略）
  #[serde(default = "default_tracking_confidence")]
  pub tracking_confidence: f32,

  /// 最大检测手数，本系统固定为 1
  #[serde(default = "default_max_hands")]
  pub max_hands: usize,

  /// 字母分类置信度阈值
  #[serde(default = "default_classify_confidence")]
  pub classify_confidence: f32,

  /// 外接框外扩比例
  #[serde(default = "default_bbox_padding")]
  pub bbox_padding: f32,

  /// 摄像头宽度
  #[serde(default = "default_camera_width")]
  pub camera_width: u32,

  /// 摄像头高度
  #[serde(default = "default_camera_height")]
  pub camera_height: u32,

  /// 手部关键点模型路径
  #[serde(default = "default_detector_model")]
  pub detector_model: String,

  /// 字母分类模型路径
  #[serde(default = "default_classifier_model")]
  pub classifier_model: String,

  /// 类别标签文件路径（缺失时回退到 A-Z）
  #[serde(default = "default_labels_path")]
  pub labels_path: String,
}

fn default_detection_confidence() -> f32 {
  0.3
}

fn default_tracking_confidence() -> f32 {
  0.3
}

fn default_max_hands() -> usize {
  1
}

fn default_classify_confidence() -> f32 {
  0.5
}

fn default_bbox_padding() -> f32 {
  0.2
}

fn default_camera_width() -> u32 {
  640
}

fn default_camera_height() -> u32 {
  480
}

fn default_detector_model() -> String {
  "models/hand_landmark.onnx".to_string()
}

fn default_classifier_model() -> String {
  "models/asl_landmark_model.json".to_string()
}

fn default_labels_path() -> String {
  "models/asl_landmark_model.txt".to_string()
}

impl Default for AppConfig {
  fn default() -> Self {
    serde_json::from_str("{}").expect("默认配置必定可解析")
  }
}

impl AppConfig {
  /// 从 JSON 文件加载配置，缺省字段使用默认值
  pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
      .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&text)
      .with_context(|| format!("无法解析配置文件: {}", path.display()))?;
    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_matches_expected_thresholds() {
    let config = AppConfig::default();
    assert_eq!(config.detection_confidence, 0.3);
    assert_eq!(config.classify_confidence, 0.5);
    assert_eq!(config.max_hands, 1);
    assert_eq!(config.camera_width, 640);
    assert_eq!(config.camera_height, 480);
  }

  #[test]
  fn partial_json_keeps_defaults_for_missing_fields() {
    let config: AppConfig =
      serde_json::from_str(r#"{"classify_confidence": 0.7, "camera_width": 1280}"#).unwrap();
    assert_eq!(config.classify_confidence, 0.7);
    assert_eq!(config.camera_width, 1280);
    assert_eq!(config.detection_confidence, 0.3);
    assert_eq!(config.bbox_padding, 0.2);
  }
}

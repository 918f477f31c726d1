// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/detector/mod.rs - 手部姿态检测模块
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

mod hand_onnx;

pub use hand_onnx::OnnxHandDetector;

use image::RgbImage;
use thiserror::Error;

use crate::config::AppConfig;
use crate::landmark::LandmarkSet;

/// 手部姿态检测错误
#[derive(Error, Debug)]
pub enum DetectorError {
  /// 模型文件缺失，构造阶段的硬失败
  #[error("手部关键点模型不存在: {0}")]
  ModelNotFound(String),
  /// 推理引擎错误
  #[error("推理引擎错误: {0}")]
  Engine(#[from] ort::Error),
  /// 模型输出形状或数值异常
  #[error("模型输出异常: {0}")]
  BadOutput(String),
}

/// 手部姿态检测配置
#[derive(Debug, Clone)]
pub struct DetectorConfig {
  /// 检测置信度阈值
  pub detection_confidence: f32,
  /// 跟踪置信度阈值（静态图模式下后端忽略）
  pub tracking_confidence: f32,
  /// 最大检测手数，本系统固定为 1
  pub max_hands: usize,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      detection_confidence: 0.3,
      tracking_confidence: 0.3,
      max_hands: 1,
    }
  }
}

impl DetectorConfig {
  /// 从运行配置提取检测相关字段
  pub fn from_app_config(config: &AppConfig) -> Self {
    Self {
      detection_confidence: config.detection_confidence,
      tracking_confidence: config.tracking_confidence,
      max_hands: config.max_hands,
    }
  }
}

/// 手部姿态检测器
///
/// 每帧返回是否检测到手以及 21 个关键点。`Ok(None)` 表示无手，
/// 属于正常结果而非错误。归一化与分类只依赖该契约，
/// 更换关键点检测后端不影响下游。
pub trait HandPoseDetector {
  /// 检测一帧图像中的手部关键点
  fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError>;

  /// 检测配置
  fn config(&self) -> &DetectorConfig;
}

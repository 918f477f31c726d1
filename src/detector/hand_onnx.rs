// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/detector/hand_onnx.rs - ONNX 手部关键点检测后端
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

use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tracing::{debug, info};

use super::{DetectorConfig, DetectorError, HandPoseDetector};
use crate::landmark::{FEATURE_LEN, LANDMARK_DIMS, LandmarkSet};

/// 模型输入边长
const HAND_INPUT_SIZE: u32 = 224;

/// 关键点输出张量名（21 × 3，输入像素坐标系）
const OUTPUT_LANDMARKS: &str = "ld_21_3d";

/// 手部存在分数输出张量名
const OUTPUT_HAND_FLAG: &str = "output_handflag";

/// 模型输入张量名
const INPUT_NAME: &str = "input";

/// ONNX 手部关键点检测器
///
/// 单手模型：输出 63 个关键点坐标与一个手部存在分数，
/// 存在分数低于配置阈值时视为无手。
pub struct OnnxHandDetector {
  /// 推理会话
  session: Session,
  /// 检测配置
  config: DetectorConfig,
}

impl OnnxHandDetector {
  /// 加载 ONNX 手部关键点模型
  pub fn load(model_path: &str, config: DetectorConfig) -> Result<Self, DetectorError> {
    if !Path::new(model_path).exists() {
      return Err(DetectorError::ModelNotFound(model_path.to_string()));
    }

    info!("加载手部关键点模型: {}", model_path);
    let session = Session::builder()?
      .with_optimization_level(GraphOptimizationLevel::Level3)?
      .commit_from_file(model_path)?;
    info!("手部关键点模型加载完成");

    Ok(Self { session, config })
  }

  /// 预处理：缩放到模型输入尺寸，像素归一到 [0,1]，NHWC 批量 1
  fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
      image,
      HAND_INPUT_SIZE,
      HAND_INPUT_SIZE,
      image::imageops::FilterType::Triangle,
    );

    let size = HAND_INPUT_SIZE as usize;
    let mut input = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
      input[[0, y as usize, x as usize, 0]] = pixel[0] as f32 / 255.0;
      input[[0, y as usize, x as usize, 1]] = pixel[1] as f32 / 255.0;
      input[[0, y as usize, x as usize, 2]] = pixel[2] as f32 / 255.0;
    }
    input
  }
}

impl HandPoseDetector for OnnxHandDetector {
  fn detect(&mut self, image: &RgbImage) -> Result<Option<LandmarkSet>, DetectorError> {
    let input = self.preprocess(image);

    debug!("执行手部关键点推理");
    let tensor = Tensor::from_array(input)?;
    let outputs = self.session.run(ort::inputs![INPUT_NAME => tensor])?;

    let flag: ndarray::ArrayViewD<f32> = outputs[OUTPUT_HAND_FLAG].try_extract_array()?;
    let presence = *flag
      .iter()
      .next()
      .ok_or_else(|| DetectorError::BadOutput("存在分数张量为空".to_string()))?;

    if presence < self.config.detection_confidence {
      debug!("手部存在分数 {:.3} 低于阈值，判定无手", presence);
      return Ok(None);
    }

    let raw: ndarray::ArrayViewD<f32> = outputs[OUTPUT_LANDMARKS].try_extract_array()?;
    if raw.len() != FEATURE_LEN {
      return Err(DetectorError::BadOutput(format!(
        "关键点张量长度应为 {}, 实际 {}",
        FEATURE_LEN,
        raw.len()
      )));
    }

    // 模型输出在输入像素坐标系，换算回 [0,1]，z 保持相对尺度
    let scale = HAND_INPUT_SIZE as f32;
    let mut features = [0.0f32; FEATURE_LEN];
    for (i, value) in raw.iter().enumerate() {
      features[i] = if i % LANDMARK_DIMS == 2 {
        value / scale
      } else {
        (value / scale).clamp(0.0, 1.0)
      };
    }

    debug!("检测到手部，存在分数 {:.3}", presence);
    Ok(Some(LandmarkSet::from_features(&features)))
  }

  fn config(&self) -> &DetectorConfig {
    &self.config
  }
}

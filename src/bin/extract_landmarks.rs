// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/bin/extract_landmarks.rs - 数据集关键点提取工具
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

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use shouyu::dataset::{format_row, scan_dataset, table_header};
use shouyu::detector::{DetectorConfig, HandPoseDetector, OnnxHandDetector};

/// 关键点提取参数配置
///
/// 遍历类别目录式数据集，对每张图片提取手部关键点，
/// 写出训练用关键点表（原始坐标，归一化由训练端执行）。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集路径（每个类别一个子目录）
  #[arg(long, value_name = "DIR", default_value = "data/asl_alphabet")]
  pub dataset: String,

  /// 输出关键点表路径
  #[arg(long, value_name = "FILE", default_value = "data/landmarks.csv")]
  pub output: String,

  /// 每类最多采样数（缺省全部）
  #[arg(long, value_name = "COUNT")]
  pub max_per_class: Option<usize>,

  /// 手部关键点 ONNX 模型路径
  #[arg(long, value_name = "FILE", default_value = "models/hand_landmark.onnx")]
  pub detector_model: String,

  /// 手部检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD")]
  pub detection_confidence: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("数据集路径: {}", args.dataset);
  info!("输出关键点表: {}", args.output);
  info!(
    "每类最多采样: {}",
    args
      .max_per_class
      .map(|n| n.to_string())
      .unwrap_or_else(|| "全部".to_string())
  );

  let classes = scan_dataset(&args.dataset)?;
  info!("发现 {} 个类别目录", classes.len());

  let detector_config = DetectorConfig {
    detection_confidence: args.detection_confidence,
    ..DetectorConfig::default()
  };
  let mut detector = OnnxHandDetector::load(&args.detector_model, detector_config)?;

  let file = File::create(&args.output)
    .with_context(|| format!("无法创建输出文件: {}", args.output))?;
  let mut writer = BufWriter::new(file);
  writeln!(writer, "{}", table_header())?;

  let mut total_processed = 0usize;
  let mut total_success = 0usize;
  let mut total_failed = 0usize;

  for class in &classes {
    let images: Vec<_> = match args.max_per_class {
      Some(max) => class.images.iter().take(max).collect(),
      None => class.images.iter().collect(),
    };
    info!("处理类别 {}: {} 张图片", class.label, images.len());

    let mut success = 0usize;
    let mut failed = 0usize;

    for path in images {
      total_processed += 1;

      let image = match image::open(path) {
        Ok(image) => image.to_rgb8(),
        Err(e) => {
          warn!("无法读取图片 {}: {}", path.display(), e);
          failed += 1;
          total_failed += 1;
          continue;
        }
      };

      match detector.detect(&image) {
        Ok(Some(landmarks)) => {
          // 每行一个样本，行内写完即完整，行序不敏感
          writeln!(writer, "{}", format_row(&class.label, &landmarks.to_features()))?;
          success += 1;
          total_success += 1;
        }
        Ok(None) => {
          failed += 1;
          total_failed += 1;
        }
        Err(e) => {
          warn!("图片 {} 提取失败: {}", path.display(), e);
          failed += 1;
          total_failed += 1;
        }
      }
    }

    info!("类别 {}: 成功 {} / 失败 {}", class.label, success, failed);
  }

  writer.flush()?;

  info!("提取完成!");
  info!("处理图片总数: {}", total_processed);
  info!("成功提取: {}", total_success);
  info!("提取失败: {}", total_failed);
  if total_processed > 0 {
    info!(
      "成功率: {:.1}%",
      total_success as f64 / total_processed as f64 * 100.0
    );
  }
  info!("关键点表已写入: {}", args.output);

  Ok(())
}

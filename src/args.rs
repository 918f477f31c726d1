// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;

/// Shouyu 手语字母识别参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源（图片文件或 V4L2 设备路径）
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  /// - V4L2: /dev/video0 或 v4l2:///dev/video0
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出路径
  /// 支持格式:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp
  /// - 其余路径视为记录目录（标注帧 + decisions.jsonl）
  #[arg(long, value_name = "OUTPUT")]
  pub output: String,

  /// JSON 配置文件路径，缺省使用内置默认配置
  #[arg(long, value_name = "FILE")]
  pub config: Option<String>,

  /// 手部关键点 ONNX 模型路径，覆盖配置文件
  #[arg(long, value_name = "FILE")]
  pub detector_model: Option<String>,

  /// 字母分类模型构件路径，覆盖配置文件
  #[arg(long, value_name = "FILE")]
  pub classifier_model: Option<String>,

  /// 类别标签文件路径，覆盖配置文件
  #[arg(long, value_name = "FILE")]
  pub labels: Option<String>,

  /// 手部检测置信度阈值 (0.0 - 1.0)，覆盖配置文件
  #[arg(long, value_name = "THRESHOLD")]
  pub detection_confidence: Option<f32>,

  /// 字母分类置信度阈值 (0.0 - 1.0)，覆盖配置文件
  #[arg(long, value_name = "THRESHOLD")]
  pub classify_confidence: Option<f32>,

  /// 叠加文字字体文件路径
  #[arg(
    long,
    value_name = "FILE",
    default_value = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"
  )]
  pub font: String,

  /// 最大处理帧数（仅对摄像头有效，0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,
}

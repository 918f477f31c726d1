// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/output/mod.rs - 输出模块
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

mod directory_record;
mod image_output;
mod visualizer;

pub use directory_record::DirectoryRecordOutput;
pub use image_output::ImageOutput;
pub use visualizer::Visualizer;

use anyhow::Result;
use image::RgbImage;

use crate::pipeline::FrameDecision;

/// 输出写入器 trait
pub trait OutputWriter {
  /// 写入一帧及其决策记录
  fn write_frame(&mut self, image: &RgbImage, decision: &FrameDecision) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 创建输出写入器
///
/// 图片扩展名写单帧标注图，其余路径视为记录目录。
pub fn create_output_writer(output_path: &str, font_path: &str) -> Result<Box<dyn OutputWriter>> {
  let lower = output_path.to_lowercase();

  if lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
  {
    Ok(Box::new(ImageOutput::new(output_path, font_path)?))
  } else {
    Ok(Box::new(DirectoryRecordOutput::new(output_path, font_path)?))
  }
}

// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/output/image_output.rs - 图片输出
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

use anyhow::{Context, Result};
use image::RgbImage;

use super::{OutputWriter, Visualizer};
use crate::pipeline::FrameDecision;

/// 图片输出，覆盖写入单帧标注图
pub struct ImageOutput {
  /// 输出路径
  output_path: String,
  /// 可视化工具
  visualizer: Visualizer,
}

impl ImageOutput {
  /// 创建一个新的图片输出
  pub fn new(output_path: &str, font_path: &str) -> Result<Self> {
    Ok(Self {
      output_path: output_path.to_string(),
      visualizer: Visualizer::new(font_path)?,
    })
  }
}

impl OutputWriter for ImageOutput {
  fn write_frame(&mut self, image: &RgbImage, decision: &FrameDecision) -> Result<()> {
    let mut output_image = image.clone();
    self.visualizer.draw_decision(&mut output_image, decision);

    output_image
      .save(&self.output_path)
      .with_context(|| format!("无法保存图片: {}", self.output_path))?;

    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

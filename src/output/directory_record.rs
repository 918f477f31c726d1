// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use image::RgbImage;

use super::{OutputWriter, Visualizer};
use crate::pipeline::FrameDecision;

/// 目录记录输出
///
/// 连续运行时把标注帧存入按日期分层的目录，并在同目录的
/// decisions.jsonl 中逐行追加决策记录。
pub struct DirectoryRecordOutput {
  /// 记录根目录
  directory: PathBuf,
  /// 可视化工具
  visualizer: Visualizer,
  /// 帧计数器
  frame_counter: u16,
}

impl DirectoryRecordOutput {
  /// 创建一个新的目录记录输出
  pub fn new(directory: &str, font_path: &str) -> Result<Self> {
    let directory = PathBuf::from(directory);
    std::fs::create_dir_all(&directory)
      .with_context(|| format!("无法创建记录目录: {}", directory.display()))?;

    Ok(Self {
      directory,
      visualizer: Visualizer::new(font_path)?,
      frame_counter: 0,
    })
  }

  /// 下一个帧编号
  fn frame_id(&mut self) -> u16 {
    self.frame_counter = self.frame_counter.wrapping_add(1);
    self.frame_counter
  }

  /// 当天的记录目录
  fn day_directory(&self) -> Result<PathBuf> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)
        .with_context(|| format!("无法创建记录目录: {}", directory.display()))?;
    }
    Ok(directory)
  }
}

impl OutputWriter for DirectoryRecordOutput {
  fn write_frame(&mut self, image: &RgbImage, decision: &FrameDecision) -> Result<()> {
    let now = Utc::now();
    let directory = self.day_directory()?;
    let frame_id = self.frame_id();

    let frame_path = directory.join(format!("{}-{:04X}.png", now.format("%H-%M-%S"), frame_id));

    let mut annotated = image.clone();
    self.visualizer.draw_decision(&mut annotated, decision);
    annotated
      .save(&frame_path)
      .with_context(|| format!("无法保存帧: {}", frame_path.display()))?;

    // 逐行追加决策记录，一行一条，无跨行状态
    let record = serde_json::json!({
      "time": now.to_rfc3339(),
      "frame": frame_path.file_name().and_then(|n| n.to_str()),
      "hand_detected": decision.hand_detected,
      "letter": decision.letter,
      "confidence": decision.confidence,
      "status": decision.status.as_str(),
      "message": decision.message,
    });

    let log_path = directory.join("decisions.jsonl");
    let mut log = OpenOptions::new()
      .create(true)
      .append(true)
      .open(&log_path)
      .with_context(|| format!("无法打开决策记录: {}", log_path.display()))?;
    writeln!(log, "{}", record).with_context(|| "无法写入决策记录".to_string())?;

    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}

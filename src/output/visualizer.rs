// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/output/visualizer.rs - 可视化模块
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

use ab_glyph::{FontArc, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
  draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut, draw_text_mut,
};
use imageproc::rect::Rect;

use crate::landmark::{HAND_CONNECTIONS, LandmarkSet};
use crate::pipeline::{DecisionStatus, FrameDecision};

/// 置信预测颜色
const COLOR_CONFIDENT: Rgb<u8> = Rgb([0, 255, 0]);
/// 低置信预测颜色
const COLOR_LOW: Rgb<u8> = Rgb([255, 165, 0]);
/// 错误状态颜色
const COLOR_ERROR: Rgb<u8> = Rgb([255, 0, 0]);
/// 无手提示颜色
const COLOR_NO_HAND: Rgb<u8> = Rgb([0, 0, 255]);
/// 骨架连线颜色
const COLOR_SKELETON: Rgb<u8> = Rgb([255, 0, 0]);
/// 关键点颜色
const COLOR_LANDMARK: Rgb<u8> = Rgb([0, 255, 0]);

/// 可视化工具
///
/// 在帧上叠加手部骨架、外接框与预测字母。
pub struct Visualizer {
  /// 字体
  font: FontArc,
  /// 正文字体大小
  font_scale: PxScale,
  /// 预测字母字体大小
  letter_scale: PxScale,
}

impl Visualizer {
  /// 由字体文件创建可视化工具
  pub fn new(font_path: &str) -> Result<Self> {
    let font_data =
      std::fs::read(font_path).with_context(|| format!("无法读取字体文件: {}", font_path))?;
    let font = FontArc::try_from_vec(font_data)
      .map_err(|e| anyhow::anyhow!("无法加载字体 {}: {}", font_path, e))?;

    Ok(Self {
      font,
      font_scale: PxScale::from(16.0),
      letter_scale: PxScale::from(48.0),
    })
  }

  /// 状态对应的叠加颜色
  fn status_color(status: DecisionStatus) -> Rgb<u8> {
    match status {
      DecisionStatus::Confident => COLOR_CONFIDENT,
      DecisionStatus::LowConfidence => COLOR_LOW,
      DecisionStatus::ClassificationError => COLOR_ERROR,
      DecisionStatus::NoHand => COLOR_NO_HAND,
    }
  }

  /// 绘制手部骨架与关键点
  fn draw_landmarks(&self, image: &mut RgbImage, landmarks: &LandmarkSet) {
    let width = image.width() as f32;
    let height = image.height() as f32;

    for (a, b) in HAND_CONNECTIONS {
      let pa = landmarks.points()[a];
      let pb = landmarks.points()[b];
      draw_line_segment_mut(
        image,
        (pa.x * width, pa.y * height),
        (pb.x * width, pb.y * height),
        COLOR_SKELETON,
      );
    }

    for point in landmarks.points() {
      let cx = (point.x * width) as i32;
      let cy = (point.y * height) as i32;
      draw_filled_circle_mut(image, (cx, cy), 2, COLOR_LANDMARK);
    }
  }

  /// 在图像上绘制单帧决策
  pub fn draw_decision(&self, image: &mut RgbImage, decision: &FrameDecision) {
    let color = Self::status_color(decision.status);

    if let Some(landmarks) = &decision.landmarks {
      self.draw_landmarks(image, landmarks);
    }

    if let Some(bbox) = &decision.bbox {
      if bbox.width > 0 && bbox.height > 0 {
        let rect = Rect::at(bbox.x as i32, bbox.y as i32).of_size(bbox.width, bbox.height);
        draw_hollow_rect_mut(image, rect, color);

        // 绘制第二个边框以增加可见度
        if bbox.x > 0 && bbox.y > 0 {
          let inner_rect = Rect::at(bbox.x as i32 + 1, bbox.y as i32 + 1)
            .of_size(bbox.width.saturating_sub(2), bbox.height.saturating_sub(2));
          draw_hollow_rect_mut(image, inner_rect, color);
        }
      }
    }

    // 预测字母置于右上角，置信度写在下方
    if let Some(letter) = &decision.letter {
      let x = image.width().saturating_sub(120) as i32;
      draw_text_mut(image, color, x, 20, self.letter_scale, &self.font, letter);

      let confidence_text = format!("{:.1}%", decision.confidence * 100.0);
      draw_text_mut(
        image,
        color,
        x,
        76,
        self.font_scale,
        &self.font,
        &confidence_text,
      );
    }

    // 状态信息置于左上角
    draw_text_mut(
      image,
      color,
      10,
      10,
      self.font_scale,
      &self.font,
      &decision.message,
    );
  }
}

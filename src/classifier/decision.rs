// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/classifier/decision.rs - 决策函数能力定义
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

use thiserror::Error;

use crate::landmark::FEATURE_LEN;

/// 决策函数运行错误
#[derive(Error, Debug)]
pub enum DecisionError {
  /// 输入形状不符
  #[error("输入特征长度应为 {expected}, 实际 {actual}")]
  BadInput {
    /// 期望长度
    expected: usize,
    /// 实际长度
    actual: usize,
  },
  /// 输出异常
  #[error("决策函数输出异常: {0}")]
  BadOutput(String),
}

/// 训练好的决策函数
///
/// 输入归一化后的 63 维特征向量，输出与标签表等长的概率分布
/// （非负，和约为 1）。分类器只依赖该契约，底层引擎可替换。
pub trait DecisionFn {
  /// 输出类别数，等于标签表长度
  fn class_count(&self) -> usize;

  /// 对单个归一化特征向量求概率分布
  fn evaluate(&self, features: &[f32; FEATURE_LEN]) -> Result<Vec<f32>, DecisionError>;
}

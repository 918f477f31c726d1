// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/classifier/labels.rs - 类别标签表
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

use tracing::{info, warn};

/// 默认标签表：A-Z 共 26 个字母
pub fn default_labels() -> Vec<String> {
  ('A'..='Z').map(|c| c.to_string()).collect()
}

/// 加载标签表文件
///
/// 每行一个标签，行序即决策函数输出索引序。文件缺失或不可读时
/// 回退到 A-Z 并告警（仅影响精度，不阻断构造）。
pub fn load_labels(path: impl AsRef<Path>) -> Vec<String> {
  let path = path.as_ref();

  let text = match std::fs::read_to_string(path) {
    Ok(text) => text,
    Err(e) => {
      warn!("标签文件不可用 ({}): {}, 回退到默认 A-Z", path.display(), e);
      return default_labels();
    }
  };

  let labels: Vec<String> = text
    .lines()
    .map(|line| line.trim().to_string())
    .filter(|line| !line.is_empty())
    .collect();

  if labels.is_empty() {
    warn!("标签文件为空: {}, 回退到默认 A-Z", path.display());
    return default_labels();
  }

  info!("加载 {} 个类别标签: {}", labels.len(), path.display());
  labels
}

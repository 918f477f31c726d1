// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/dataset.rs - 数据集与关键点表格式
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::landmark::{FEATURE_LEN, LANDMARK_COUNT};

/// 数据集中的一个类别目录
///
/// 目录名即类别标签，目录内为该类别的图片样本。
pub struct ClassDir {
  /// 类别标签
  pub label: String,
  /// 图片文件路径
  pub images: Vec<PathBuf>,
}

/// 扫描类别目录式数据集
///
/// 每个子目录为一个类别，类别按目录名排序，目录内图片按文件名排序。
pub fn scan_dataset(root: impl AsRef<Path>) -> Result<Vec<ClassDir>> {
  let root = root.as_ref();
  if !root.is_dir() {
    bail!("数据集目录不存在: {}", root.display());
  }

  let mut classes = Vec::new();
  for entry in std::fs::read_dir(root)
    .with_context(|| format!("无法读取数据集目录: {}", root.display()))?
  {
    let entry = entry?;
    let path = entry.path();
    if !path.is_dir() {
      continue;
    }

    let label = entry.file_name().to_string_lossy().to_string();

    let mut images = Vec::new();
    for entry in std::fs::read_dir(&path)
      .with_context(|| format!("无法读取类别目录: {}", path.display()))?
    {
      let entry = entry?;
      let path = entry.path();
      let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
          let ext = ext.to_lowercase();
          ext == "jpg" || ext == "jpeg" || ext == "png"
        })
        .unwrap_or(false);
      if is_image {
        images.push(path);
      }
    }
    images.sort();

    classes.push(ClassDir { label, images });
  }

  classes.sort_by(|a, b| a.label.cmp(&b.label));
  Ok(classes)
}

/// 关键点表头: label,x0,y0,z0,...,x20,y20,z20
pub fn table_header() -> String {
  let mut header = String::from("label");
  for i in 0..LANDMARK_COUNT {
    header.push_str(&format!(",x{},y{},z{}", i, i, i));
  }
  header
}

/// 格式化一行样本，行内无跨行状态，行序不敏感
pub fn format_row(label: &str, features: &[f32; FEATURE_LEN]) -> String {
  let mut row = String::from(label);
  for value in features {
    row.push(',');
    row.push_str(&value.to_string());
  }
  row
}

/// 已加载的关键点表
pub struct LandmarkTable {
  /// 每行的类别标签
  pub labels: Vec<String>,
  /// 每行的原始特征向量
  pub features: Vec<[f32; FEATURE_LEN]>,
}

impl LandmarkTable {
  /// 样本数
  pub fn len(&self) -> usize {
    self.labels.len()
  }

  /// 是否为空
  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }
}

/// 读取关键点表文件
pub fn read_table(path: impl AsRef<Path>) -> Result<LandmarkTable> {
  let path = path.as_ref();
  let text = std::fs::read_to_string(path)
    .with_context(|| format!("无法读取关键点表: {}", path.display()))?;

  let mut lines = text.lines();
  let header = lines.next().context("关键点表为空")?;
  if header != table_header() {
    bail!("关键点表头不匹配: {}", path.display());
  }

  let mut labels = Vec::new();
  let mut features = Vec::new();

  for (number, line) in lines.enumerate() {
    if line.trim().is_empty() {
      continue;
    }

    let mut fields = line.split(',');
    let label = fields
      .next()
      .with_context(|| format!("第 {} 行缺少标签", number + 2))?;

    let mut row = [0.0f32; FEATURE_LEN];
    for (i, slot) in row.iter_mut().enumerate() {
      let field = fields
        .next()
        .with_context(|| format!("第 {} 行缺少第 {} 列", number + 2, i + 2))?;
      *slot = field
        .trim()
        .parse::<f32>()
        .with_context(|| format!("第 {} 行第 {} 列不是数值: {}", number + 2, i + 2, field))?;
    }
    if fields.next().is_some() {
      bail!("第 {} 行列数过多", number + 2);
    }

    labels.push(label.to_string());
    features.push(row);
  }

  Ok(LandmarkTable { labels, features })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn header_has_64_columns() {
    let header = table_header();
    assert_eq!(header.split(',').count(), 1 + FEATURE_LEN);
    assert!(header.starts_with("label,x0,y0,z0,"));
    assert!(header.ends_with("x20,y20,z20"));
  }

  #[test]
  fn row_roundtrip() {
    let mut features = [0.0f32; FEATURE_LEN];
    for (i, value) in features.iter_mut().enumerate() {
      *value = 0.01 * i as f32 - 0.3;
    }

    let path = std::env::temp_dir().join(format!("shouyu-table-{}.csv", std::process::id()));
    let text = format!("{}\n{}\n", table_header(), format_row("W", &features));
    std::fs::write(&path, text).unwrap();

    let table = read_table(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(table.len(), 1);
    assert_eq!(table.labels[0], "W");
    for (a, b) in table.features[0].iter().zip(features.iter()) {
      assert!((a - b).abs() < 1e-5);
    }
  }

  #[test]
  fn rejects_bad_header() {
    let path = std::env::temp_dir().join(format!("shouyu-badhdr-{}.csv", std::process::id()));
    std::fs::write(&path, "foo,bar\n").unwrap();
    let result = read_table(&path);
    std::fs::remove_file(&path).ok();
    assert!(result.is_err());
  }

  #[test]
  fn scan_sorts_classes_by_label() {
    let root = std::env::temp_dir().join(format!("shouyu-ds-{}", std::process::id()));
    for class in ["C", "A", "B"] {
      std::fs::create_dir_all(root.join(class)).unwrap();
      std::fs::write(root.join(class).join("1.jpg"), b"x").unwrap();
      std::fs::write(root.join(class).join("skip.txt"), b"x").unwrap();
    }

    let classes = scan_dataset(&root).unwrap();
    std::fs::remove_dir_all(&root).ok();

    let labels: Vec<&str> = classes.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["A", "B", "C"]);
    assert_eq!(classes[0].images.len(), 1);
  }
}

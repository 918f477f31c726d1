// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/bin/train_model.rs - 字母分类模型训练工具
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

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shouyu::dataset::read_table;
use shouyu::train::{TrainConfig, prepare, train};

/// 模型训练参数配置
///
/// 读取关键点表，归一化后训练全连接分类网络，
/// 导出 JSON 权重构件与同名标签文件。
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 关键点表路径
  #[arg(long, value_name = "FILE", default_value = "data/landmarks.csv")]
  pub data: String,

  /// 输出模型构件路径
  #[arg(long, value_name = "FILE", default_value = "models/asl_landmark_model.json")]
  pub output: String,

  /// 隐藏层宽度，逗号分隔，空字符串表示纯 softmax 回归
  #[arg(long, value_name = "DIMS", default_value = "128,64")]
  pub hidden: String,

  /// 训练轮数
  #[arg(long, default_value = "100", value_name = "COUNT")]
  pub epochs: usize,

  /// 批大小
  #[arg(long, default_value = "32", value_name = "SIZE")]
  pub batch_size: usize,

  /// 学习率
  #[arg(long, default_value = "0.001", value_name = "RATE")]
  pub learning_rate: f32,

  /// 评估集比例 (0.0 - 1.0)
  #[arg(long, default_value = "0.2", value_name = "FRACTION")]
  pub eval_fraction: f32,

  /// 随机种子
  #[arg(long, default_value = "42", value_name = "SEED")]
  pub seed: u64,
}

/// 解析逗号分隔的隐藏层宽度
fn parse_hidden(text: &str) -> Result<Vec<usize>> {
  text
    .split(',')
    .map(str::trim)
    .filter(|part| !part.is_empty())
    .map(|part| {
      part
        .parse::<usize>()
        .with_context(|| format!("非法的隐藏层宽度: {}", part))
    })
    .collect()
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("关键点表: {}", args.data);
  info!("输出构件: {}", args.output);

  let table = read_table(&args.data)?;
  info!("加载 {} 条样本", table.len());

  let data = prepare(&table)?;
  info!("类别: {:?}", data.class_labels);

  let config = TrainConfig {
    hidden: parse_hidden(&args.hidden)?,
    epochs: args.epochs,
    batch_size: args.batch_size,
    learning_rate: args.learning_rate,
    eval_fraction: args.eval_fraction,
    seed: args.seed,
  };
  info!(
    "网络结构: 63 -> {:?} -> {}, {} 轮, 批大小 {}, 学习率 {}",
    config.hidden,
    data.class_labels.len(),
    config.epochs,
    config.batch_size,
    config.learning_rate
  );

  let (artifact, report) = train(&data, &config)?;

  info!("训练完成!");
  info!("训练样本: {}", report.train_samples);
  info!("评估样本: {}", report.eval_samples);
  info!("评估准确率: {:.2}%", report.accuracy * 100.0);
  for (label, accuracy) in &report.per_class {
    info!("  类别 {}: {:.2}%", label, accuracy * 100.0);
  }

  // 构件与标签文件一起导出，行序即输出索引序
  let output = Path::new(&args.output);
  if let Some(parent) = output.parent() {
    if !parent.as_os_str().is_empty() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }
  }
  artifact.save(output)?;
  info!("模型构件已写入: {}", args.output);

  let labels_path = output.with_extension("txt");
  std::fs::write(&labels_path, data.class_labels.join("\n"))
    .with_context(|| format!("无法写入标签文件: {}", labels_path.display()))?;
  info!("标签文件已写入: {}", labels_path.display());

  Ok(())
}

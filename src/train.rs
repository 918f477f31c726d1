// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/train.rs - 字母分类模型训练
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

use anyhow::{Result, bail};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::classifier::{Activation, LayerWeights, ModelArtifact};
use crate::dataset::LandmarkTable;
use crate::landmark::{FEATURE_LEN, normalize_features};

/// 训练配置
#[derive(Debug, Clone)]
pub struct TrainConfig {
  /// 隐藏层宽度，空表示纯 softmax 回归
  pub hidden: Vec<usize>,
  /// 训练轮数
  pub epochs: usize,
  /// 批大小
  pub batch_size: usize,
  /// 学习率
  pub learning_rate: f32,
  /// 留作评估的样本比例
  pub eval_fraction: f32,
  /// 随机种子，保证切分与初始化可复现
  pub seed: u64,
}

impl Default for TrainConfig {
  fn default() -> Self {
    Self {
      hidden: vec![128, 64],
      epochs: 100,
      batch_size: 32,
      learning_rate: 1e-3,
      eval_fraction: 0.2,
      seed: 42,
    }
  }
}

/// 准备好的训练数据
///
/// 特征已经过与推理端同一函数的归一化，归一化在整条链路中
/// 只发生这一次。
pub struct TrainingData {
  /// 类别标签，排序后即输出索引序
  pub class_labels: Vec<String>,
  /// 每个样本的类别索引
  pub targets: Vec<usize>,
  /// 每个样本的归一化特征
  pub features: Vec<[f32; FEATURE_LEN]>,
}

/// 把关键点表转换为训练数据
pub fn prepare(table: &LandmarkTable) -> Result<TrainingData> {
  if table.is_empty() {
    bail!("关键点表没有样本");
  }

  let mut class_labels: Vec<String> = table.labels.clone();
  class_labels.sort();
  class_labels.dedup();

  let targets = table
    .labels
    .iter()
    .map(|label| {
      class_labels
        .binary_search(label)
        .expect("标签必在排序表中")
    })
    .collect();

  let features = table
    .features
    .iter()
    .map(normalize_features)
    .collect();

  Ok(TrainingData {
    class_labels,
    targets,
    features,
  })
}

/// 评估报告
pub struct TrainReport {
  /// 训练样本数
  pub train_samples: usize,
  /// 评估样本数
  pub eval_samples: usize,
  /// 评估集整体准确率
  pub accuracy: f32,
  /// 各类别准确率
  pub per_class: Vec<(String, f32)>,
}

/// 一层全连接权重
struct Layer {
  w: Array2<f32>,
  b: Array1<f32>,
}

/// Xavier 均匀初始化
fn init_layer(rng: &mut StdRng, in_dim: usize, out_dim: usize) -> Layer {
  let limit = (6.0 / (in_dim + out_dim) as f32).sqrt();
  let mut w = Array2::zeros((out_dim, in_dim));
  for value in w.iter_mut() {
    *value = rng.random_range(-limit..limit);
  }
  Layer {
    w,
    b: Array1::zeros(out_dim),
  }
}

/// 按行 softmax，数值稳定
fn softmax_rows(z: &Array2<f32>) -> Array2<f32> {
  let mut out = z.clone();
  for mut row in out.rows_mut() {
    let max = row.iter().fold(f32::MIN, |acc, &v| acc.max(v));
    row.mapv_inplace(|v| (v - max).exp());
    let sum = row.sum();
    row.mapv_inplace(|v| v / sum);
  }
  out
}

/// 前向传播，返回各层线性输出与激活值（首元素为输入本身）
fn forward(layers: &[Layer], x: &Array2<f32>) -> (Vec<Array2<f32>>, Vec<Array2<f32>>) {
  let mut zs = Vec::with_capacity(layers.len());
  let mut activations = vec![x.clone()];

  for (index, layer) in layers.iter().enumerate() {
    let z = activations.last().expect("激活值非空").dot(&layer.w.t()) + &layer.b;
    let a = if index + 1 == layers.len() {
      softmax_rows(&z)
    } else {
      z.mapv(|v| v.max(0.0))
    };
    zs.push(z);
    activations.push(a);
  }

  (zs, activations)
}

/// 统计按行 argmax 的命中数
fn count_correct(probs: &Array2<f32>, targets: &[usize]) -> usize {
  probs
    .rows()
    .into_iter()
    .zip(targets)
    .filter(|(row, target)| {
      let mut best = 0usize;
      for (i, value) in row.iter().enumerate() {
        if *value > row[best] {
          best = i;
        }
      }
      best == **target
    })
    .count()
}

/// 训练字母分类模型并导出构件
///
/// 小批量梯度下降 + 交叉熵；评估集按配置比例随机切出，
/// 切分与初始化由种子决定，可复现。
pub fn train(data: &TrainingData, config: &TrainConfig) -> Result<(ModelArtifact, TrainReport)> {
  let class_count = data.class_labels.len();
  if class_count < 2 {
    bail!("训练至少需要两个类别, 实际 {}", class_count);
  }

  let mut rng = StdRng::seed_from_u64(config.seed);

  // 随机切分训练/评估集
  let mut indices: Vec<usize> = (0..data.features.len()).collect();
  indices.shuffle(&mut rng);
  let eval_count = ((indices.len() as f32 * config.eval_fraction) as usize)
    .min(indices.len().saturating_sub(1));
  let (eval_idx, train_idx) = indices.split_at(eval_count);

  if train_idx.is_empty() {
    bail!("切分后没有训练样本");
  }

  info!(
    "训练样本 {} 条, 评估样本 {} 条, {} 类",
    train_idx.len(),
    eval_idx.len(),
    class_count
  );

  // 组装网络: 若干 ReLU 隐藏层 + softmax 输出
  let mut dims = vec![FEATURE_LEN];
  dims.extend_from_slice(&config.hidden);
  dims.push(class_count);

  let mut layers = Vec::with_capacity(dims.len() - 1);
  for pair in dims.windows(2) {
    layers.push(init_layer(&mut rng, pair[0], pair[1]));
  }

  let to_matrix = |idx: &[usize]| {
    let mut matrix = Array2::zeros((idx.len(), FEATURE_LEN));
    for (row, &i) in idx.iter().enumerate() {
      for (col, value) in data.features[i].iter().enumerate() {
        matrix[[row, col]] = *value;
      }
    }
    matrix
  };
  let to_targets = |idx: &[usize]| -> Vec<usize> { idx.iter().map(|&i| data.targets[i]).collect() };

  let mut train_order: Vec<usize> = train_idx.to_vec();

  for epoch in 0..config.epochs {
    train_order.shuffle(&mut rng);

    for batch in train_order.chunks(config.batch_size) {
      let x = to_matrix(batch);
      let targets = to_targets(batch);
      let batch_len = batch.len() as f32;

      let (zs, activations) = forward(&layers, &x);

      // 输出层梯度: softmax + 交叉熵
      let mut delta = activations.last().expect("激活值非空").clone();
      for (row, &target) in targets.iter().enumerate() {
        delta[[row, target]] -= 1.0;
      }
      delta /= batch_len;

      // 逐层反传并更新
      for index in (0..layers.len()).rev() {
        let grad_w = delta.t().dot(&activations[index]);
        let grad_b = delta.sum_axis(Axis(0));

        if index > 0 {
          let mut next = delta.dot(&layers[index].w);
          // ReLU 导数
          for (value, z) in next.iter_mut().zip(zs[index - 1].iter()) {
            if *z <= 0.0 {
              *value = 0.0;
            }
          }
          delta = next;
        }

        layers[index].w = &layers[index].w - &(grad_w * config.learning_rate);
        layers[index].b = &layers[index].b - &(grad_b * config.learning_rate);
      }
    }

    if (epoch + 1) % 20 == 0 || epoch + 1 == config.epochs {
      let x = to_matrix(train_idx);
      let (_, activations) = forward(&layers, &x);
      let correct = count_correct(
        activations.last().expect("激活值非空"),
        &to_targets(train_idx),
      );
      info!(
        "第 {} 轮: 训练准确率 {:.2}%",
        epoch + 1,
        correct as f32 / train_idx.len() as f32 * 100.0
      );
    }
  }

  // 评估
  let (accuracy, per_class) = if eval_idx.is_empty() {
    (0.0, Vec::new())
  } else {
    let x = to_matrix(eval_idx);
    let targets = to_targets(eval_idx);
    let (_, activations) = forward(&layers, &x);
    let probs = activations.last().expect("激活值非空");

    let mut class_total = vec![0usize; class_count];
    let mut class_correct = vec![0usize; class_count];
    for (row, &target) in probs.rows().into_iter().zip(targets.iter()) {
      let mut best = 0usize;
      for (i, value) in row.iter().enumerate() {
        if *value > row[best] {
          best = i;
        }
      }
      class_total[target] += 1;
      if best == target {
        class_correct[target] += 1;
      }
    }

    let correct: usize = class_correct.iter().sum();
    let per_class = data
      .class_labels
      .iter()
      .enumerate()
      .filter(|(i, _)| class_total[*i] > 0)
      .map(|(i, label)| {
        (
          label.clone(),
          class_correct[i] as f32 / class_total[i] as f32,
        )
      })
      .collect();
    (correct as f32 / targets.len() as f32, per_class)
  };

  // 导出构件
  let layer_count = layers.len();
  let artifact = ModelArtifact {
    input_dim: FEATURE_LEN,
    layers: layers
      .iter()
      .enumerate()
      .map(|(index, layer)| LayerWeights {
        activation: if index + 1 == layer_count {
          Activation::Softmax
        } else {
          Activation::Relu
        },
        weights: layer
          .w
          .rows()
          .into_iter()
          .map(|row| row.to_vec())
          .collect(),
        bias: layer.b.to_vec(),
      })
      .collect(),
  };

  let report = TrainReport {
    train_samples: train_idx.len(),
    eval_samples: eval_idx.len(),
    accuracy,
    per_class,
  };

  Ok((artifact, report))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classifier::{DecisionFn, MlpDecisionFn};
  use crate::landmark::LANDMARK_DIMS;

  /// 两个线性可分的手形模式，带确定性扰动
  fn synthetic_table() -> LandmarkTable {
    let mut labels = Vec::new();
    let mut features = Vec::new();

    for sample in 0..60 {
      for (label, spread) in [("A", 0.1f32), ("B", 0.6f32)] {
        let mut row = [0.0f32; FEATURE_LEN];
        for i in 0..FEATURE_LEN / LANDMARK_DIMS {
          let jitter = ((sample * 7 + i * 3) % 11) as f32 / 110.0;
          row[i * LANDMARK_DIMS] = 0.5 + spread * (i as f32 / 21.0) + jitter * 0.02;
          row[i * LANDMARK_DIMS + 1] = 0.5 - spread * (i as f32 / 42.0) - jitter * 0.02;
          row[i * LANDMARK_DIMS + 2] = 0.01 * i as f32;
        }
        labels.push(label.to_string());
        features.push(row);
      }
    }

    LandmarkTable { labels, features }
  }

  #[test]
  fn prepare_sorts_labels_and_normalizes() {
    let table = LandmarkTable {
      labels: vec!["B".to_string(), "A".to_string(), "B".to_string()],
      features: vec![[0.5; FEATURE_LEN]; 3],
    };
    let data = prepare(&table).unwrap();

    assert_eq!(data.class_labels, vec!["A", "B"]);
    assert_eq!(data.targets, vec![1, 0, 1]);
    // 归一化后手腕行为零
    assert_eq!(&data.features[0][..LANDMARK_DIMS], &[0.0, 0.0, 0.0]);
  }

  #[test]
  fn train_separable_classes_to_high_accuracy() {
    let data = prepare(&synthetic_table()).unwrap();
    let config = TrainConfig {
      hidden: vec![],
      epochs: 300,
      batch_size: 16,
      learning_rate: 0.5,
      eval_fraction: 0.2,
      seed: 7,
    };

    let (artifact, report) = train(&data, &config).unwrap();
    assert!(report.eval_samples > 0);
    assert!(
      report.accuracy >= 0.9,
      "评估准确率过低: {}",
      report.accuracy
    );

    // 导出构件可被推理端直接加载使用
    let model = MlpDecisionFn::from_artifact(&artifact).unwrap();
    assert_eq!(model.class_count(), 2);
    let probs = model.evaluate(&data.features[0]).unwrap();
    assert_eq!(probs.len(), 2);
    let sum: f32 = probs.iter().sum();
    assert!((sum - 1.0).abs() < 1e-4);
  }

  #[test]
  fn train_rejects_single_class() {
    let table = LandmarkTable {
      labels: vec!["A".to_string(); 4],
      features: vec![[0.1; FEATURE_LEN]; 4],
    };
    let data = prepare(&table).unwrap();
    assert!(train(&data, &TrainConfig::default()).is_err());
  }
}

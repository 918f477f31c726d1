// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/classifier/mlp.rs - 全连接网络决策函数
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

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::{DecisionError, DecisionFn};
use crate::landmark::FEATURE_LEN;

/// 模型构件错误
#[derive(Error, Debug)]
pub enum MlpError {
  /// 构件文件缺失
  #[error("模型构件不存在: {0}")]
  NotFound(String),
  /// 构件读取失败
  #[error("模型构件读取失败: {0}")]
  Io(#[from] std::io::Error),
  /// 构件解析失败
  #[error("模型构件解析失败: {0}")]
  Parse(#[from] serde_json::Error),
  /// 构件内容无效
  #[error("模型构件无效: {0}")]
  Invalid(String),
}

/// 层激活函数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
  /// 隐藏层 ReLU
  Relu,
  /// 输出层 softmax
  Softmax,
}

/// 单层权重，权重矩阵按 [输出][输入] 存放
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerWeights {
  /// 激活函数
  pub activation: Activation,
  /// 权重矩阵
  pub weights: Vec<Vec<f32>>,
  /// 偏置
  pub bias: Vec<f32>,
}

/// 序列化的模型构件
///
/// 训练工具导出、推理端加载的唯一格式。输入宽度固定 63，
/// 最后一层 softmax 的宽度即类别数。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
  /// 输入特征宽度
  pub input_dim: usize,
  /// 各层权重，顺序即前向顺序
  pub layers: Vec<LayerWeights>,
}

impl ModelArtifact {
  /// 写入 JSON 构件文件
  pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MlpError> {
    let text = serde_json::to_string(self)?;
    std::fs::write(path, text)?;
    Ok(())
  }
}

/// 前向计算用的一层
struct DenseLayer {
  weights: Array2<f32>,
  bias: Array1<f32>,
  activation: Activation,
}

/// 全连接网络决策函数
///
/// 由 JSON 权重构件构造，前向为若干 ReLU 隐藏层接 softmax 输出。
pub struct MlpDecisionFn {
  layers: Vec<DenseLayer>,
  class_count: usize,
}

impl MlpDecisionFn {
  /// 从构件文件加载，构造为原子操作：校验失败即整体失败
  pub fn load(path: &str) -> Result<Self, MlpError> {
    if !Path::new(path).exists() {
      return Err(MlpError::NotFound(path.to_string()));
    }

    info!("加载字母分类模型构件: {}", path);
    let text = std::fs::read_to_string(path)?;
    let artifact: ModelArtifact = serde_json::from_str(&text)?;
    let model = Self::from_artifact(&artifact)?;
    info!(
      "字母分类模型加载完成: {} 层, {} 类",
      artifact.layers.len(),
      model.class_count
    );
    Ok(model)
  }

  /// 由内存构件构造
  pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, MlpError> {
    if artifact.input_dim != FEATURE_LEN {
      return Err(MlpError::Invalid(format!(
        "输入宽度应为 {}, 实际 {}",
        FEATURE_LEN, artifact.input_dim
      )));
    }
    if artifact.layers.is_empty() {
      return Err(MlpError::Invalid("层列表为空".to_string()));
    }

    let mut layers = Vec::with_capacity(artifact.layers.len());
    let mut input_dim = artifact.input_dim;

    for (index, layer) in artifact.layers.iter().enumerate() {
      let out_dim = layer.weights.len();
      if out_dim == 0 {
        return Err(MlpError::Invalid(format!("第 {} 层没有输出", index)));
      }
      if layer.bias.len() != out_dim {
        return Err(MlpError::Invalid(format!(
          "第 {} 层偏置长度 {} 与输出宽度 {} 不一致",
          index,
          layer.bias.len(),
          out_dim
        )));
      }

      let mut flat = Vec::with_capacity(out_dim * input_dim);
      for row in &layer.weights {
        if row.len() != input_dim {
          return Err(MlpError::Invalid(format!(
            "第 {} 层权重行宽 {} 与输入宽度 {} 不一致",
            index,
            row.len(),
            input_dim
          )));
        }
        flat.extend_from_slice(row);
      }

      let weights = Array2::from_shape_vec((out_dim, input_dim), flat)
        .map_err(|e| MlpError::Invalid(format!("第 {} 层权重形状错误: {}", index, e)))?;
      let bias = Array1::from_vec(layer.bias.clone());

      debug!("第 {} 层: {} -> {} ({:?})", index, input_dim, out_dim, layer.activation);
      layers.push(DenseLayer {
        weights,
        bias,
        activation: layer.activation,
      });
      input_dim = out_dim;
    }

    let last = layers.last().expect("层列表非空");
    if last.activation != Activation::Softmax {
      return Err(MlpError::Invalid("最后一层必须为 softmax".to_string()));
    }
    let class_count = last.bias.len();

    Ok(Self { layers, class_count })
  }
}

/// 数值稳定的 softmax
fn softmax(mut values: Array1<f32>) -> Array1<f32> {
  let max = values.iter().fold(f32::MIN, |acc, &v| acc.max(v));
  values.mapv_inplace(|v| (v - max).exp());
  let sum = values.sum();
  values.mapv_inplace(|v| v / sum);
  values
}

impl DecisionFn for MlpDecisionFn {
  fn class_count(&self) -> usize {
    self.class_count
  }

  fn evaluate(&self, features: &[f32; FEATURE_LEN]) -> Result<Vec<f32>, DecisionError> {
    let mut x = Array1::from_vec(features.to_vec());

    for layer in &self.layers {
      let mut z = layer.weights.dot(&x) + &layer.bias;
      match layer.activation {
        Activation::Relu => z.mapv_inplace(|v| v.max(0.0)),
        Activation::Softmax => z = softmax(z),
      }
      x = z;
    }

    if x.iter().any(|v| !v.is_finite()) {
      return Err(DecisionError::BadOutput("概率分布包含非有限值".to_string()));
    }
    Ok(x.to_vec())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn identity_like_artifact(classes: usize) -> ModelArtifact {
    // 单层 softmax，第 i 类的权重只看第 i 个特征
    let mut weights = vec![vec![0.0f32; FEATURE_LEN]; classes];
    for (i, row) in weights.iter_mut().enumerate() {
      row[i] = 10.0;
    }
    ModelArtifact {
      input_dim: FEATURE_LEN,
      layers: vec![LayerWeights {
        activation: Activation::Softmax,
        weights,
        bias: vec![0.0; classes],
      }],
    }
  }

  #[test]
  fn evaluate_returns_probability_distribution() {
    let model = MlpDecisionFn::from_artifact(&identity_like_artifact(4)).unwrap();
    let mut features = [0.0f32; FEATURE_LEN];
    features[2] = 1.0;

    let probs = model.evaluate(&features).unwrap();
    assert_eq!(probs.len(), 4);
    let sum: f32 = probs.iter().sum();
    assert!((sum - 1.0).abs() < 1e-5);
    assert!(probs.iter().all(|p| *p >= 0.0));

    // 第 2 个特征最大，第 2 类概率最高
    let argmax = probs
      .iter()
      .enumerate()
      .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
      .unwrap()
      .0;
    assert_eq!(argmax, 2);
  }

  #[test]
  fn artifact_roundtrip_through_json() {
    let artifact = identity_like_artifact(3);
    let text = serde_json::to_string(&artifact).unwrap();
    let parsed: ModelArtifact = serde_json::from_str(&text).unwrap();
    let model = MlpDecisionFn::from_artifact(&parsed).unwrap();
    assert_eq!(model.class_count(), 3);
  }

  #[test]
  fn rejects_wrong_input_dim() {
    let mut artifact = identity_like_artifact(3);
    artifact.input_dim = 10;
    assert!(matches!(
      MlpDecisionFn::from_artifact(&artifact),
      Err(MlpError::Invalid(_))
    ));
  }

  #[test]
  fn rejects_missing_softmax_tail() {
    let mut artifact = identity_like_artifact(3);
    artifact.layers[0].activation = Activation::Relu;
    assert!(matches!(
      MlpDecisionFn::from_artifact(&artifact),
      Err(MlpError::Invalid(_))
    ));
  }

  #[test]
  fn load_reports_missing_file() {
    let err = MlpDecisionFn::load("/nonexistent/model.json").unwrap_err();
    assert!(matches!(err, MlpError::NotFound(_)));
  }
}

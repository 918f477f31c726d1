// 该文件是 Shouyu （手语字母识别） 项目的一部分。
// src/landmark.rs - 手部关键点与特征向量
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

/// 单手关键点数量
pub const LANDMARK_COUNT: usize = 21;

/// 每个关键点的坐标数 (x, y, z)
pub const LANDMARK_DIMS: usize = 3;

/// 特征向量长度 (21 × 3)
pub const FEATURE_LEN: usize = LANDMARK_COUNT * LANDMARK_DIMS;

/// 手腕关键点索引，归一化以它为原点
pub const WRIST_INDEX: usize = 0;

/// 手掌尺寸下限，退化关键点时避免除零
pub const HAND_SIZE_FLOOR: f32 = 1e-6;

/// 手部骨架连接拓扑（MediaPipe 顺序）
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
  // 手腕到三个根部
  (0, 1),
  (0, 5),
  (0, 17),
  // 拇指
  (1, 2),
  (2, 3),
  (3, 4),
  // 食指
  (5, 6),
  (6, 7),
  (7, 8),
  // 中指
  (9, 10),
  (10, 11),
  (11, 12),
  // 无名指
  (13, 14),
  (14, 15),
  (15, 16),
  // 小指
  (17, 18),
  (18, 19),
  (19, 20),
  // 掌心横向
  (5, 9),
  (9, 13),
  (13, 17),
];

/// 单个手部关键点
///
/// x、y 为相对图像宽高的归一化坐标 ([0,1])，z 为相对深度。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Landmark {
  /// 横向坐标
  pub x: f32,
  /// 纵向坐标
  pub y: f32,
  /// 相对深度
  pub z: f32,
}

impl Landmark {
  /// 创建一个关键点
  pub fn new(x: f32, y: f32, z: f32) -> Self {
    Self { x, y, z }
  }
}

/// 一帧中检测到的完整手部关键点集合
///
/// 固定 21 个点，索引 0 为手腕。下游阶段不会原地修改它，
/// 归一化会生成新的特征向量。
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkSet {
  points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
  /// 由 21 个关键点创建集合
  pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
    Self { points }
  }

  /// 由 63 长度的扁平特征向量创建集合
  pub fn from_features(features: &[f32; FEATURE_LEN]) -> Self {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (point, row) in points.iter_mut().zip(features.chunks_exact(LANDMARK_DIMS)) {
      *point = Landmark::new(row[0], row[1], row[2]);
    }
    Self { points }
  }

  /// 由任意切片创建集合，长度必须为 63
  pub fn from_slice(values: &[f32]) -> Option<Self> {
    if values.len() != FEATURE_LEN {
      return None;
    }
    let mut features = [0.0f32; FEATURE_LEN];
    features.copy_from_slice(values);
    Some(Self::from_features(&features))
  }

  /// 所有关键点
  pub fn points(&self) -> &[Landmark] {
    &self.points
  }

  /// 手腕关键点
  pub fn wrist(&self) -> Landmark {
    self.points[WRIST_INDEX]
  }

  /// 展平为 63 长度特征向量，保持关键点索引顺序
  pub fn to_features(&self) -> [f32; FEATURE_LEN] {
    let mut features = [0.0f32; FEATURE_LEN];
    for (row, point) in features.chunks_exact_mut(LANDMARK_DIMS).zip(&self.points) {
      row[0] = point.x;
      row[1] = point.y;
      row[2] = point.z;
    }
    features
  }

  /// 手掌尺寸：以手腕为原点的最大关键点距离（未夹取）
  pub fn hand_size(&self) -> f32 {
    hand_size(&self.to_features())
  }

  /// 归一化特征向量，见 [`normalize_features`]
  pub fn normalized_features(&self) -> [f32; FEATURE_LEN] {
    normalize_features(&self.to_features())
  }

  /// 关键点外接框，按宽高比例外扩后夹取到 [0,1]
  pub fn bounding_box(&self, padding: f32) -> NormalizedRect {
    let mut x_min = f32::MAX;
    let mut x_max = f32::MIN;
    let mut y_min = f32::MAX;
    let mut y_max = f32::MIN;

    for point in &self.points {
      x_min = x_min.min(point.x);
      x_max = x_max.max(point.x);
      y_min = y_min.min(point.y);
      y_max = y_max.max(point.y);
    }

    let width = x_max - x_min;
    let height = y_max - y_min;

    NormalizedRect {
      x_min: (x_min - width * padding).max(0.0),
      y_min: (y_min - height * padding).max(0.0),
      x_max: (x_max + width * padding).min(1.0),
      y_max: (y_max + height * padding).min(1.0),
    }
  }
}

/// 归一化坐标下的矩形区域 ([0,1] 范围)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedRect {
  /// 左边界
  pub x_min: f32,
  /// 上边界
  pub y_min: f32,
  /// 右边界
  pub x_max: f32,
  /// 下边界
  pub y_max: f32,
}

impl NormalizedRect {
  /// 转换为像素矩形
  pub fn to_pixels(&self, width: u32, height: u32) -> PixelRect {
    let x1 = (self.x_min * width as f32) as u32;
    let y1 = (self.y_min * height as f32) as u32;
    let x2 = (self.x_max * width as f32) as u32;
    let y2 = (self.y_max * height as f32) as u32;

    PixelRect {
      x: x1.min(width),
      y: y1.min(height),
      width: x2.saturating_sub(x1),
      height: y2.saturating_sub(y1),
    }
  }
}

/// 像素坐标下的矩形区域
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
  /// 左上角 x 坐标
  pub x: u32,
  /// 左上角 y 坐标
  pub y: u32,
  /// 宽度
  pub width: u32,
  /// 高度
  pub height: u32,
}

/// 手掌尺寸：以手腕为原点的最大关键点范数（未夹取）
pub fn hand_size(features: &[f32; FEATURE_LEN]) -> f32 {
  let wx = features[0];
  let wy = features[1];
  let wz = features[2];

  let mut size = 0.0f32;
  for row in features.chunks_exact(LANDMARK_DIMS) {
    let dx = row[0] - wx;
    let dy = row[1] - wy;
    let dz = row[2] - wz;
    let norm = (dx * dx + dy * dy + dz * dz).sqrt();
    if norm > size {
      size = norm;
    }
  }
  size
}

/// 关键点归一化：平移、尺度不变的特征变换
///
/// 1. 将 63 长度向量视为 21 行 (x, y, z)；
/// 2. 每行减去手腕行，手腕成为原点；
/// 3. 手掌尺寸取各行欧氏范数的最大值，并以 [`HAND_SIZE_FLOOR`] 为下限；
/// 4. 每行除以手掌尺寸后按原顺序展平。
///
/// 训练与推理共用本函数，两条路径逐位一致。纯函数，可对多行独立调用。
pub fn normalize_features(features: &[f32; FEATURE_LEN]) -> [f32; FEATURE_LEN] {
  let mut out = *features;

  let wx = out[0];
  let wy = out[1];
  let wz = out[2];
  for row in out.chunks_exact_mut(LANDMARK_DIMS) {
    row[0] -= wx;
    row[1] -= wy;
    row[2] -= wz;
  }

  let mut size = 0.0f32;
  for row in out.chunks_exact(LANDMARK_DIMS) {
    let norm = (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt();
    if norm > size {
      size = norm;
    }
  }
  let size = size.max(HAND_SIZE_FLOOR);

  for value in out.iter_mut() {
    *value /= size;
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_features() -> [f32; FEATURE_LEN] {
    let mut features = [0.0f32; FEATURE_LEN];
    for (i, row) in features.chunks_exact_mut(LANDMARK_DIMS).enumerate() {
      row[0] = 0.3 + 0.01 * i as f32;
      row[1] = 0.5 - 0.02 * i as f32;
      row[2] = 0.001 * i as f32;
    }
    features
  }

  #[test]
  fn normalize_keeps_length_and_zeroes_wrist() {
    let normalized = normalize_features(&sample_features());
    assert_eq!(normalized.len(), FEATURE_LEN);
    assert_eq!(normalized[0], 0.0);
    assert_eq!(normalized[1], 0.0);
    assert_eq!(normalized[2], 0.0);
  }

  #[test]
  fn normalize_max_distance_is_one() {
    let normalized = normalize_features(&sample_features());
    let mut max_norm = 0.0f32;
    for row in normalized.chunks_exact(LANDMARK_DIMS) {
      let norm = (row[0] * row[0] + row[1] * row[1] + row[2] * row[2]).sqrt();
      max_norm = max_norm.max(norm);
    }
    assert!((max_norm - 1.0).abs() < 1e-5, "最大距离应为 1.0, 实际 {}", max_norm);
  }

  #[test]
  fn normalize_is_scale_invariant() {
    let features = sample_features();
    let mut scaled = features;
    // 以手腕为中心缩放 3 倍
    let (wx, wy, wz) = (features[0], features[1], features[2]);
    for row in scaled.chunks_exact_mut(LANDMARK_DIMS) {
      row[0] = wx + (row[0] - wx) * 3.0;
      row[1] = wy + (row[1] - wy) * 3.0;
      row[2] = wz + (row[2] - wz) * 3.0;
    }

    let a = normalize_features(&features);
    let b = normalize_features(&scaled);
    for (x, y) in a.iter().zip(b.iter()) {
      assert!((x - y).abs() < 1e-5);
    }
  }

  #[test]
  fn normalize_is_translation_invariant() {
    let features = sample_features();
    let mut shifted = features;
    for row in shifted.chunks_exact_mut(LANDMARK_DIMS) {
      row[0] += 0.17;
      row[1] -= 0.05;
      row[2] += 0.3;
    }

    let a = normalize_features(&features);
    let b = normalize_features(&shifted);
    for (x, y) in a.iter().zip(b.iter()) {
      assert!((x - y).abs() < 1e-5);
    }
  }

  #[test]
  fn normalize_degenerate_input_is_finite() {
    // 全部关键点重合，手掌尺寸夹取到下限
    let features = [0.42f32; FEATURE_LEN];
    let normalized = normalize_features(&features);
    for value in normalized {
      assert!(value.is_finite());
    }
  }

  #[test]
  fn features_roundtrip_through_landmark_set() {
    let features = sample_features();
    let set = LandmarkSet::from_features(&features);
    assert_eq!(set.to_features(), features);
    assert_eq!(set.points().len(), LANDMARK_COUNT);
    assert_eq!(set.wrist(), Landmark::new(features[0], features[1], features[2]));
  }

  #[test]
  fn from_slice_rejects_wrong_length() {
    assert!(LandmarkSet::from_slice(&[0.0; 62]).is_none());
    assert!(LandmarkSet::from_slice(&[0.0; FEATURE_LEN]).is_some());
  }

  #[test]
  fn bounding_box_padded_and_clamped() {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
      point.x = 0.1 + 0.002 * i as f32;
      point.y = 0.2 + 0.004 * i as f32;
    }
    let set = LandmarkSet::new(points);

    let rect = set.bounding_box(0.2);
    assert!(rect.x_min < 0.1);
    assert!(rect.y_max > 0.2 + 0.004 * 20.0);
    assert!(rect.x_min >= 0.0 && rect.y_min >= 0.0);
    assert!(rect.x_max <= 1.0 && rect.y_max <= 1.0);

    let pixels = rect.to_pixels(640, 480);
    assert!(pixels.x + pixels.width <= 640);
    assert!(pixels.y + pixels.height <= 480);
  }

  #[test]
  fn bounding_box_clamps_at_image_edge() {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (i, point) in points.iter_mut().enumerate() {
      point.x = 0.9 + 0.005 * i as f32;
      point.y = 0.01 * i as f32;
    }
    let set = LandmarkSet::new(points);
    let rect = set.bounding_box(0.2);
    assert_eq!(rect.x_max, 1.0);
    assert_eq!(rect.y_min, 0.0);
  }
}

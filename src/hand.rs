// 该文件是 Ishara （手语识别） 项目的一部分。
// src/hand.rs - 手部检测数据定义
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

use serde::{Deserialize, Serialize};

/// 每只手的关键点数量
pub const HAND_LANDMARK_COUNT: usize = 21;

/// 关键点索引（与 MediaPipe 手部模型一致）
pub mod landmarks {
  pub const WRIST: usize = 0;
  pub const THUMB_TIP: usize = 4;
  pub const INDEX_FINGER_TIP: usize = 8;
  pub const MIDDLE_FINGER_TIP: usize = 12;
  pub const RING_FINGER_TIP: usize = 16;
  pub const PINKY_TIP: usize = 20;

  /// 五个指尖，顺序为拇指、食指、中指、无名指、小指
  pub const FINGER_TIPS: [usize; 5] = [
    THUMB_TIP,
    INDEX_FINGER_TIP,
    MIDDLE_FINGER_TIP,
    RING_FINGER_TIP,
    PINKY_TIP,
  ];
}

/// 源图像像素坐标系下的轴对齐包围框
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl BoundingBox {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由关键点的最小/最大坐标计算包围框
  ///
  /// 无关键点或跨度超出 i32 范围时返回 None。
  pub fn from_landmarks(landmarks: &[Landmark]) -> Option<Self> {
    let first = landmarks.first()?;
    let (mut x_min, mut y_min, mut x_max, mut y_max) = (first.x, first.y, first.x, first.y);
    for lm in &landmarks[1..] {
      x_min = x_min.min(lm.x);
      y_min = y_min.min(lm.y);
      x_max = x_max.max(lm.x);
      y_max = y_max.max(lm.y);
    }
    Some(Self::new(
      x_min,
      y_min,
      x_max.checked_sub(x_min)?,
      y_max.checked_sub(y_min)?,
    ))
  }

  pub fn is_degenerate(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  /// 向四周扩展 offset 像素，结果可能超出图像范围
  ///
  /// 扩展后任一边超出 i32 范围时返回 None。
  pub fn expand(&self, offset: i32) -> Option<Self> {
    let margin = offset.checked_mul(2)?;
    let expanded = Self::new(
      self.x.checked_sub(offset)?,
      self.y.checked_sub(offset)?,
      self.width.checked_add(margin)?,
      self.height.checked_add(margin)?,
    );
    expanded.right()?;
    expanded.bottom()?;
    Some(expanded)
  }

  /// 右边缘 x + width
  pub fn right(&self) -> Option<i32> {
    self.x.checked_add(self.width)
  }

  /// 下边缘 y + height
  pub fn bottom(&self) -> Option<i32> {
    self.y.checked_add(self.height)
  }

  /// 闭区间包含判断：落在 x + width / y + height 上的点也算在框内
  pub fn contains(&self, x: i32, y: i32) -> bool {
    let (x, y) = (x as i64, y as i64);
    let (left, top) = (self.x as i64, self.y as i64);
    x >= left && x <= left + self.width as i64 && y >= top && y <= top + self.height as i64
  }

  pub fn center(&self) -> (f32, f32) {
    (
      self.x as f32 + self.width as f32 / 2.0,
      self.y as f32 + self.height as f32 / 2.0,
    )
  }
}

/// 源图像像素坐标系下的单个关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Landmark {
  pub index: usize,
  pub x: i32,
  pub y: i32,
}

impl Landmark {
  pub fn new(index: usize, x: i32, y: i32) -> Self {
    Self { index, x, y }
  }

  pub fn group(&self) -> Option<FingerGroup> {
    FingerGroup::of(self.index)
  }

  /// 两点之间的欧氏距离及中点
  pub fn distance_to(&self, other: &Landmark) -> (f32, (i32, i32)) {
    let (x0, y0) = (self.x as i64, self.y as i64);
    let (x1, y1) = (other.x as i64, other.y as i64);
    let dx = (x1 - x0) as f32;
    let dy = (y1 - y0) as f32;
    // 两个 i32 的平均值仍在 i32 范围内
    let center = (((x0 + x1) / 2) as i32, ((y0 + y1) / 2) as i32);
    (dx.hypot(dy), center)
  }
}

/// 关键点所属的手部分组
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerGroup {
  Palm,
  Thumb,
  Index,
  Middle,
  Ring,
  Pinky,
}

impl FingerGroup {
  pub fn of(index: usize) -> Option<Self> {
    match index {
      0 => Some(FingerGroup::Palm),
      1..=4 => Some(FingerGroup::Thumb),
      5..=8 => Some(FingerGroup::Index),
      9..=12 => Some(FingerGroup::Middle),
      13..=16 => Some(FingerGroup::Ring),
      17..=20 => Some(FingerGroup::Pinky),
      _ => None,
    }
  }
}

/// 检测器输出的一只手
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedHand {
  pub bbox: BoundingBox,
  pub landmarks: Vec<Landmark>,
}

impl DetectedHand {
  pub fn new(bbox: BoundingBox, landmarks: Vec<Landmark>) -> Self {
    Self { bbox, landmarks }
  }

  /// 仅有关键点时，由关键点推导包围框
  pub fn from_landmarks(landmarks: Vec<Landmark>) -> Option<Self> {
    let bbox = BoundingBox::from_landmarks(&landmarks)?;
    Some(Self { bbox, landmarks })
  }

  pub fn landmark(&self, index: usize) -> Option<&Landmark> {
    self.landmarks.iter().find(|lm| lm.index == index)
  }

  /// 各手指是否伸出，顺序为 [拇指, 食指, 中指, 无名指, 小指]
  ///
  /// 只有完整的 21 点手部才会判断，否则全部视为收起。
  pub fn fingers_up(&self) -> [bool; 5] {
    let mut fingers = [false; 5];
    if self.landmarks.len() != HAND_LANDMARK_COUNT {
      return fingers;
    }

    for (finger, &tip) in landmarks::FINGER_TIPS.iter().enumerate() {
      // 拇指朝向不同，比较水平方向
      let (tip_lm, base) = if finger == 0 {
        (self.landmark(tip), self.landmark(tip - 1))
      } else {
        (self.landmark(tip), self.landmark(tip - 2))
      };
      if let (Some(tip_lm), Some(base)) = (tip_lm, base) {
        fingers[finger] = if finger == 0 {
          tip_lm.x > base.x
        } else {
          tip_lm.y < base.y
        };
      }
    }
    fingers
  }
}

// 该文件是 Ishara （手语识别） 项目的一部分。
// src/remap.rs - 关键点到归一化画布的坐标映射
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
use tracing::trace;

use crate::{
  hand::{BoundingBox, Landmark},
  normalize::{NormalizedCanvas, ScaleAxis, ScaleContext},
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemapError {
  #[error("关键点 {index} ({x}, {y}) 超出包围框")]
  OutOfRange { index: usize, x: i32, y: i32 },
  #[error("关键点 {index} 映射到画布外: ({x}, {y})")]
  OutsideCanvas { index: usize, x: i64, y: i64 },
}

/// 画布坐标系下的关键点
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasPoint {
  pub index: usize,
  pub x: u32,
  pub y: u32,
}

/// 将源图像中的关键点映射到画布坐标
///
/// 先换算为相对裁剪区域（含 offset）的比例坐标，再按缩放轴放到画布上，
/// 与 [`crate::normalize::HandNormalizer::normalize`] 的缩放与居中保持一致。
pub fn remap_landmark(
  landmark: &Landmark,
  bbox: &BoundingBox,
  offset: i32,
  context: &ScaleContext,
) -> Result<CanvasPoint, RemapError> {
  if !bbox.contains(landmark.x, landmark.y) {
    return Err(RemapError::OutOfRange {
      index: landmark.index,
      x: landmark.x,
      y: landmark.y,
    });
  }

  // 在 i64 中计算，极端坐标下也不会溢出
  let offset = offset as i64;
  let span_x = (bbox.width as i64 + 2 * offset) as f64;
  let span_y = (bbox.height as i64 + 2 * offset) as f64;
  let norm_x = ((landmark.x as i64 - bbox.x as i64 + offset) as f64 / span_x).clamp(0.0, 1.0);
  let norm_y = ((landmark.y as i64 - bbox.y as i64 + offset) as f64 / span_y).clamp(0.0, 1.0);

  let size = context.canvas_size as f64;
  let extent = context.scaled_extent as f64;
  let gap = context.gap as f64;
  let (canvas_x, canvas_y) = match context.axis {
    ScaleAxis::Tall => (gap + norm_x * extent, norm_y * size),
    ScaleAxis::Wide => (norm_x * size, gap + norm_y * extent),
  };

  // 截断为整数像素
  let (x, y) = (canvas_x as i64, canvas_y as i64);
  let limit = context.canvas_size as i64;
  if !(0..limit).contains(&x) || !(0..limit).contains(&y) {
    return Err(RemapError::OutsideCanvas {
      index: landmark.index,
      x,
      y,
    });
  }

  Ok(CanvasPoint {
    index: landmark.index,
    x: x as u32,
    y: y as u32,
  })
}

/// 绑定单帧包围框与缩放参数的映射器
#[derive(Debug, Clone, Copy)]
pub struct LandmarkRemapper {
  bbox: BoundingBox,
  offset: i32,
  context: ScaleContext,
}

impl LandmarkRemapper {
  pub fn new(bbox: BoundingBox, offset: i32, context: ScaleContext) -> Self {
    Self {
      bbox,
      offset,
      context,
    }
  }

  pub fn remap(&self, landmark: &Landmark) -> Result<CanvasPoint, RemapError> {
    remap_landmark(landmark, &self.bbox, self.offset, &self.context)
  }

  /// 映射全部关键点，超出范围的点直接跳过
  pub fn remap_all(&self, landmarks: &[Landmark]) -> Vec<CanvasPoint> {
    landmarks
      .iter()
      .filter_map(|lm| match self.remap(lm) {
        Ok(point) => Some(point),
        Err(e) => {
          trace!("跳过关键点: {}", e);
          None
        }
      })
      .collect()
  }

  pub fn canvas_size(&self) -> u32 {
    self.context.canvas_size
  }
}

impl From<&NormalizedCanvas> for LandmarkRemapper {
  fn from(canvas: &NormalizedCanvas) -> Self {
    Self::new(canvas.bbox, canvas.offset, canvas.context)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn remapper(bbox: BoundingBox, offset: i32) -> LandmarkRemapper {
    let context = ScaleContext::compute(&bbox, 300).unwrap();
    LandmarkRemapper::new(bbox, offset, context)
  }

  #[test]
  fn bbox_center_maps_to_canvas_center_tall() {
    let remapper = remapper(BoundingBox::new(100, 100, 80, 160), 20);
    let point = remapper.remap(&Landmark::new(9, 140, 180)).unwrap();
    assert_eq!(point, CanvasPoint { index: 9, x: 150, y: 150 });
  }

  #[test]
  fn bbox_center_maps_to_pasted_center_wide() {
    let bbox = BoundingBox::new(40, 60, 200, 90);
    let remapper = remapper(bbox, 20);
    let ctx = ScaleContext::compute(&bbox, 300).unwrap();
    let point = remapper.remap(&Landmark::new(0, 140, 105)).unwrap();

    let expected_y = ctx.gap as f32 + ctx.scaled_extent as f32 / 2.0;
    assert!((point.x as f32 - 150.0).abs() <= 1.0);
    assert!((point.y as f32 - expected_y).abs() <= 1.0);
  }

  #[test]
  fn boundary_is_inclusive() {
    let remapper = remapper(BoundingBox::new(100, 100, 80, 160), 20);
    assert!(remapper.remap(&Landmark::new(8, 180, 260)).is_ok());
    assert!(remapper.remap(&Landmark::new(8, 100, 100)).is_ok());

    assert_eq!(
      remapper.remap(&Landmark::new(8, 181, 200)),
      Err(RemapError::OutOfRange {
        index: 8,
        x: 181,
        y: 200
      })
    );
    assert!(matches!(
      remapper.remap(&Landmark::new(8, 150, 261)),
      Err(RemapError::OutOfRange { .. })
    ));
  }

  #[test]
  fn far_edge_without_offset_falls_off_canvas() {
    // offset 为 0 时，x + w 映射到画布边界 300，需要丢弃
    let remapper = remapper(BoundingBox::new(0, 0, 100, 100), 0);
    assert!(matches!(
      remapper.remap(&Landmark::new(4, 100, 50)),
      Err(RemapError::OutsideCanvas { x: 300, .. })
    ));
    assert!(remapper.remap(&Landmark::new(4, 99, 50)).is_ok());
  }

  #[test]
  fn remap_all_skips_noise() {
    let remapper = remapper(BoundingBox::new(100, 100, 80, 160), 20);
    let points = remapper.remap_all(&[
      Landmark::new(0, 140, 260),
      Landmark::new(1, 500, 500),
      Landmark::new(2, 120, 120),
    ]);
    assert_eq!(points.len(), 2);
    assert_eq!(points[0].index, 0);
    assert_eq!(points[1].index, 2);
  }

  #[test]
  fn extreme_coordinates_are_rejected_without_overflow() {
    let bbox = BoundingBox::new(i32::MAX - 100, 0, 100, 100);
    let remapper = remapper(bbox, 20);
    assert!(matches!(
      remapper.remap(&Landmark::new(3, i32::MIN, i32::MIN)),
      Err(RemapError::OutOfRange { .. })
    ));
    // 框的右下角恰好是 i32::MAX
    let point = remapper.remap(&Landmark::new(3, i32::MAX, 100)).unwrap();
    assert!(point.x < 300 && point.y < 300);
  }
}

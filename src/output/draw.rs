// 该文件是 Ishara （手语识别） 项目的一部分。
// src/output/draw.rs - 归一化画布与手部框的可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::{
  hand::{BoundingBox, FingerGroup, Landmark},
  normalize::NormalizedCanvas,
  remap::{CanvasPoint, LandmarkRemapper, RemapError},
};

// 绘制常量
const LANDMARK_RADIUS: i32 = 3;
const PALM_RADIUS: i32 = 4; // 掌根点稍大
const LINE_THICKNESS: u32 = 2;
const GRID_DIVISIONS: u32 = 8;
const GRID_COLOR: [u8; 3] = [220, 220, 220]; // 浅灰色
const HAND_BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const HAND_BOX_THICKNESS: u32 = 4;

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("未知的关键点索引: {0}")]
  UnknownLandmark(usize),
  #[error(transparent)]
  Remap(#[from] RemapError),
}

pub struct Draw {
  landmark_radius: i32,
  palm_radius: i32,
  line_thickness: u32,
  grid_divisions: u32,
  grid_color: [u8; 3],
  hand_box_color: [u8; 3],
  hand_box_thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      landmark_radius: LANDMARK_RADIUS,
      palm_radius: PALM_RADIUS,
      line_thickness: LINE_THICKNESS,
      grid_divisions: GRID_DIVISIONS,
      grid_color: GRID_COLOR,
      hand_box_color: HAND_BOX_COLOR,
      hand_box_thickness: HAND_BOX_THICKNESS,
    }
  }
}

/// 各分组的显示颜色
pub fn group_color(group: FingerGroup) -> Rgb<u8> {
  match group {
    FingerGroup::Palm => Rgb([0, 255, 255]),   // 青色
    FingerGroup::Thumb => Rgb([0, 0, 255]),    // 蓝色
    FingerGroup::Index => Rgb([0, 255, 0]),    // 绿色
    FingerGroup::Middle => Rgb([255, 255, 0]), // 黄色
    FingerGroup::Ring => Rgb([255, 0, 0]),     // 红色
    FingerGroup::Pinky => Rgb([255, 0, 255]),  // 品红
  }
}

/// 同一手指内相邻点才连线，4、8、12、16、20 不与前一点相连
fn connects_to_previous(index: usize) -> bool {
  index > 0 && index % 4 != 0
}

impl Draw {
  pub fn with_grid_divisions(mut self, grid_divisions: u32) -> Self {
    self.grid_divisions = grid_divisions.max(1);
    self
  }

  /// 绘制等间距参考网格
  pub fn draw_grid(&self, canvas: &mut RgbImage) {
    let size = canvas.width().min(canvas.height());
    let spacing = size / self.grid_divisions;
    if spacing == 0 {
      return;
    }
    let end = size as f32;
    let color = Rgb(self.grid_color);
    for i in 1..self.grid_divisions {
      let pos = (i * spacing) as f32;
      draw_line_segment_mut(canvas, (0.0, pos), (end, pos), color);
      draw_line_segment_mut(canvas, (pos, 0.0), (pos, end), color);
    }
  }

  // 按线宽绘制线段，沿次方向平移叠加
  fn draw_thick_line(
    &self,
    canvas: &mut RgbImage,
    from: CanvasPoint,
    to: CanvasPoint,
    color: Rgb<u8>,
  ) {
    let (x0, y0) = (from.x as f32, from.y as f32);
    let (x1, y1) = (to.x as f32, to.y as f32);
    let horizontal = (x1 - x0).abs() >= (y1 - y0).abs();
    for t in 0..self.line_thickness {
      let d = t as f32;
      let (dx, dy) = if horizontal { (0.0, d) } else { (d, 0.0) };
      draw_line_segment_mut(canvas, (x0 + dx, y0 + dy), (x1 + dx, y1 + dy), color);
    }
  }

  fn draw_landmark(
    &self,
    canvas: &mut RgbImage,
    remapper: &LandmarkRemapper,
    landmarks: &[Landmark],
    landmark: &Landmark,
  ) -> Result<CanvasPoint, RenderError> {
    let group = landmark
      .group()
      .ok_or(RenderError::UnknownLandmark(landmark.index))?;
    let point = remapper.remap(landmark)?;
    let color = group_color(group);
    let radius = if group == FingerGroup::Palm {
      self.palm_radius
    } else {
      self.landmark_radius
    };
    draw_filled_circle_mut(canvas, (point.x as i32, point.y as i32), radius, color);

    if connects_to_previous(landmark.index) {
      let previous = landmarks
        .iter()
        .find(|lm| lm.index == landmark.index - 1)
        .map(|lm| remapper.remap(lm));
      match previous {
        Some(Ok(prev_point)) => self.draw_thick_line(canvas, prev_point, point, color),
        Some(Err(e)) => trace!("前一关键点不可用，跳过连线: {}", e),
        None => {}
      }
    }

    Ok(point)
  }

  /// 绘制全部关键点，单个关键点失败不影响其余关键点
  pub fn draw_landmarks(
    &self,
    canvas: &mut RgbImage,
    remapper: &LandmarkRemapper,
    landmarks: &[Landmark],
  ) -> Vec<CanvasPoint> {
    let mut drawn = Vec::with_capacity(landmarks.len());
    for landmark in landmarks {
      match self.draw_landmark(canvas, remapper, landmarks, landmark) {
        Ok(point) => drawn.push(point),
        Err(RenderError::Remap(e)) => trace!("跳过关键点: {}", e),
        Err(e) => {
          error!("绘制关键点 {} 出错: {}", landmark.index, e);
          continue;
        }
      }
    }
    drawn
  }

  /// 先画网格再画关键点，返回成功绘制的画布坐标
  pub fn render_canvas(
    &self,
    canvas: &mut NormalizedCanvas,
    landmarks: &[Landmark],
  ) -> Vec<CanvasPoint> {
    let remapper = LandmarkRemapper::from(&*canvas);
    self.draw_grid(&mut canvas.image);
    let drawn = self.draw_landmarks(&mut canvas.image, &remapper, landmarks);
    debug!("画布上绘制了 {}/{} 个关键点", drawn.len(), landmarks.len());
    drawn
  }

  /// 在源图像上绘制扩展后的手部框
  pub fn draw_hand_box(&self, image: &mut RgbImage, bbox: &BoundingBox, offset: i32) {
    let Some(expanded) = bbox.expand(offset) else {
      warn!("手部框超出坐标范围，跳过绘制: {:?}", bbox);
      return;
    };
    let color = Rgb(self.hand_box_color);
    for t in 0..self.hand_box_thickness as i32 {
      let width = expanded.width - 2 * t;
      let height = expanded.height - 2 * t;
      if width <= 0 || height <= 0 {
        break;
      }
      let rect = Rect::at(expanded.x + t, expanded.y + t).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(image, rect, color);
    }
  }
}

/// 画布关键点记录，作为数据集图像的附属文件
#[derive(Debug, Serialize)]
struct CanvasRecord<'a> {
  canvas_size: u32,
  label: &'a str,
  points: Vec<[u32; 3]>,
}

pub struct Record;

impl Record {
  pub fn record(
    &self,
    label: &str,
    canvas_size: u32,
    points: &[CanvasPoint],
    path: &std::path::Path,
  ) -> Result<(), std::io::Error> {
    let record = CanvasRecord {
      canvas_size,
      label,
      points: points.iter().map(|p| [p.index as u32, p.x, p.y]).collect(),
    };
    let data = serde_json::to_string_pretty(&record).map_err(std::io::Error::other)?;
    std::fs::write(path.with_extension("json"), data)?;
    Ok(())
  }
}

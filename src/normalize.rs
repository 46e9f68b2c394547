// 该文件是 Ishara （手语识别） 项目的一部分。
// src/normalize.rs - 手部区域归一化
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

use image::{Rgb, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::debug;

use crate::{config::PipelineConfig, hand::BoundingBox};

pub const CANVAS_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
  #[error("包围框尺寸无效: {width}x{height}")]
  DegenerateBoundingBox { width: i32, height: i32 },
  #[error("手部区域过小或超出画面: {width}x{height}")]
  InsufficientHandRegion { width: i32, height: i32 },
  #[error("画布尺寸必须大于 0")]
  EmptyCanvas,
}

/// 缩放时占满画布的轴
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAxis {
  /// 高大于宽：高度占满画布，水平方向居中
  Tall,
  /// 宽大于等于高：宽度占满画布，垂直方向居中
  Wide,
}

/// 单帧的缩放上下文，关键点映射必须使用与图像缩放相同的参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleContext {
  pub axis: ScaleAxis,
  /// h / w，使用未裁剪的包围框尺寸
  pub aspect_ratio: f32,
  /// 缩放系数 k
  pub scale: f32,
  /// 非主轴方向缩放后的尺寸（wCal 或 hCal）
  pub scaled_extent: u32,
  /// 非主轴方向的居中偏移（wGap 或 hGap）
  pub gap: u32,
  pub canvas_size: u32,
}

impl ScaleContext {
  /// 根据包围框计算缩放参数
  ///
  /// 缩放尺寸与偏移都向上取整，并限制在画布范围内。
  pub fn compute(bbox: &BoundingBox, canvas_size: u32) -> Result<Self, NormalizeError> {
    if canvas_size == 0 {
      return Err(NormalizeError::EmptyCanvas);
    }
    if bbox.is_degenerate() {
      return Err(NormalizeError::DegenerateBoundingBox {
        width: bbox.width,
        height: bbox.height,
      });
    }

    let (w, h) = (bbox.width as u64, bbox.height as u64);
    let size = canvas_size as u64;
    let aspect_ratio = h as f32 / w as f32;

    let (axis, scale, major, minor) = if h > w {
      (ScaleAxis::Tall, canvas_size as f32 / h as f32, h, w)
    } else {
      (ScaleAxis::Wide, canvas_size as f32 / w as f32, w, h)
    };

    // ceil(size * minor / major)，整数运算避免浮点误差
    let scaled_extent = (size * minor).div_ceil(major).clamp(1, size) as u32;
    let gap = (canvas_size - scaled_extent).div_ceil(2);

    Ok(Self {
      axis,
      aspect_ratio,
      scale,
      scaled_extent,
      gap,
      canvas_size,
    })
  }

  /// 缩放后图像的尺寸 (宽, 高)
  pub fn resized_dimensions(&self) -> (u32, u32) {
    match self.axis {
      ScaleAxis::Tall => (self.scaled_extent, self.canvas_size),
      ScaleAxis::Wide => (self.canvas_size, self.scaled_extent),
    }
  }

  /// 缩放后图像在画布上的粘贴位置 (x, y)
  pub fn paste_origin(&self) -> (u32, u32) {
    match self.axis {
      ScaleAxis::Tall => (self.gap, 0),
      ScaleAxis::Wide => (0, self.gap),
    }
  }
}

/// 归一化后的正方形画布及其缩放参数
#[derive(Debug, Clone)]
pub struct NormalizedCanvas {
  pub image: RgbImage,
  pub context: ScaleContext,
  pub bbox: BoundingBox,
  pub offset: i32,
}

/// 源图像上的裁剪区域，已限制在图像范围内
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
  pub x: u32,
  pub y: u32,
  pub width: u32,
  pub height: u32,
}

#[derive(Debug, Clone)]
pub struct HandNormalizer {
  offset: i32,
  canvas_size: u32,
  min_region: u32,
}

impl Default for HandNormalizer {
  fn default() -> Self {
    Self::from_config(&PipelineConfig::default())
  }
}

impl HandNormalizer {
  pub fn new(offset: i32, canvas_size: u32) -> Self {
    Self {
      offset,
      canvas_size,
      min_region: PipelineConfig::default().min_region,
    }
  }

  pub fn from_config(config: &PipelineConfig) -> Self {
    Self {
      offset: config.offset,
      canvas_size: config.canvas_size,
      min_region: config.min_region,
    }
  }

  pub fn with_min_region(mut self, min_region: u32) -> Self {
    self.min_region = min_region;
    self
  }

  pub fn offset(&self) -> i32 {
    self.offset
  }

  pub fn canvas_size(&self) -> u32 {
    self.canvas_size
  }

  /// 扩展包围框并限制到图像范围，区域过小时返回错误
  pub fn crop_region(
    &self,
    bbox: &BoundingBox,
    image_width: u32,
    image_height: u32,
  ) -> Result<CropRegion, NormalizeError> {
    let expanded = bbox
      .expand(self.offset)
      .ok_or(NormalizeError::DegenerateBoundingBox {
        width: bbox.width,
        height: bbox.height,
      })?;
    let x0 = expanded.x.max(0) as i64;
    let y0 = expanded.y.max(0) as i64;
    let x1 = (expanded.x as i64 + expanded.width as i64).min(image_width as i64);
    let y1 = (expanded.y as i64 + expanded.height as i64).min(image_height as i64);

    let width = x1 - x0;
    let height = y1 - y0;
    let min_region = self.min_region as i64;
    if width <= min_region || height <= min_region {
      return Err(NormalizeError::InsufficientHandRegion {
        width: width.max(0) as i32,
        height: height.max(0) as i32,
      });
    }

    Ok(CropRegion {
      x: x0 as u32,
      y: y0 as u32,
      width: width as u32,
      height: height as u32,
    })
  }

  pub fn normalize(
    &self,
    image: &RgbImage,
    bbox: &BoundingBox,
  ) -> Result<NormalizedCanvas, NormalizeError> {
    let context = ScaleContext::compute(bbox, self.canvas_size)?;
    let region = self.crop_region(bbox, image.width(), image.height())?;
    debug!(
      "裁剪区域: ({}, {}) {}x{}, 缩放轴: {:?}, k = {:.4}",
      region.x, region.y, region.width, region.height, context.axis, context.scale
    );

    let crop = image::imageops::crop_imm(image, region.x, region.y, region.width, region.height)
      .to_image();
    let (resized_w, resized_h) = context.resized_dimensions();
    let resized = image::imageops::resize(&crop, resized_w, resized_h, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(self.canvas_size, self.canvas_size, CANVAS_BACKGROUND);
    let (paste_x, paste_y) = context.paste_origin();
    image::imageops::replace(&mut canvas, &resized, paste_x as i64, paste_y as i64);

    Ok(NormalizedCanvas {
      image: canvas,
      context,
      bbox: *bbox,
      offset: self.offset,
    })
  }
}

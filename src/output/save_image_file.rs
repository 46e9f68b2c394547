// 该文件是 Ishara （手语识别） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  input::Frame,
  output::{Render, draw::Draw},
  recognition::FrameReport,
};

/// 保存标注后的源图像，归一化画布另存为 `<文件名>_canvas.png`
pub struct SaveImageFileOutput {
  path: PathBuf,
  offset: i32,
  draw: Draw,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let path = urlencoding::decode(uri.path())
      .map_err(|e| SaveImageFileError::PathEncoding(e.to_string()))?;
    let offset = uri
      .query_pairs()
      .find(|(k, _)| k == "offset")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(20);

    Ok(SaveImageFileOutput {
      path: PathBuf::from(path.as_ref()),
      offset,
      draw: Draw::default(),
    })
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>, offset: i32) -> Self {
    Self {
      path: path.into(),
      offset,
      draw: Draw::default(),
    }
  }

  pub fn canvas_path(&self) -> PathBuf {
    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "frame".to_string());
    self.path.with_file_name(format!("{}_canvas.png", stem))
  }

  fn save_image(&self, image: &image::RgbImage, path: &Path) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image.save(path).map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render<Frame, FrameReport> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &Frame, result: &FrameReport) -> Result<(), Self::Error> {
    let mut image = frame.image.clone();
    if let Some(hand) = &result.hand {
      self.draw.draw_hand_box(&mut image, &hand.bbox, self.offset);
    }
    self.save_image(&image, &self.path)?;

    match &result.canvas {
      Some(canvas) => self.save_image(&canvas.image, &self.canvas_path())?,
      None => warn!("第 {} 帧没有归一化画布，仅保存源图像", frame.index),
    }
    Ok(())
  }
}

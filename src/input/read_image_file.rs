// 该文件是 Ishara （手语识别） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};

use image::ImageReader;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, input::Frame};

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "gif", "webp"];

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Invalid path encoding: {0}")]
  PathEncoding(String),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("No image found in: {0}")]
  Empty(String),
}

/// 单个图像文件，或目录下按文件名排序的全部图像
pub struct ImageFileInput {
  paths: Vec<PathBuf>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

pub(crate) fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    .unwrap_or(false)
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    // 路径中可能含有阿拉伯文等非 ASCII 字符
    let path = urlencoding::decode(url.path())
      .map_err(|e| ImageFileInputError::PathEncoding(e.to_string()))?;
    Self::open(Path::new(path.as_ref()))
  }
}

impl ImageFileInput {
  pub fn open(path: &Path) -> Result<Self, ImageFileInputError> {
    let paths = if path.is_dir() {
      let mut paths = std::fs::read_dir(path)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_image_file(p))
        .collect::<Vec<_>>();
      paths.sort();
      paths
    } else {
      // 提前确认文件存在
      std::fs::metadata(path)?;
      vec![path.to_path_buf()]
    };

    if paths.is_empty() {
      return Err(ImageFileInputError::Empty(path.display().to_string()));
    }
    debug!("输入图像数量: {}", paths.len());

    Ok(Self { paths })
  }

  pub fn len(&self) -> usize {
    self.paths.len()
  }

  pub fn is_empty(&self) -> bool {
    self.paths.is_empty()
  }

  pub fn into_frames(self) -> ImageFileInputIter {
    ImageFileInputIter {
      paths: self.paths.into_iter(),
      index: 0,
    }
  }
}

pub struct ImageFileInputIter {
  paths: std::vec::IntoIter<PathBuf>,
  index: usize,
}

impl Iterator for ImageFileInputIter {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    // 读取失败的文件直接跳过
    for path in self.paths.by_ref() {
      let image = ImageReader::open(&path)
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());
      match image {
        Ok(image) => {
          let frame = Frame::new(image.into_rgb8(), self.index).with_source(path);
          self.index += 1;
          return Some(frame);
        }
        Err(e) => {
          error!("无法读取图像 {}: {}", path.display(), e);
        }
      }
    }
    None
  }
}

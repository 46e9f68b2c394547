// 该文件是 Ishara （手语识别） 项目的一部分。
// src/dataset.rs - 手势数据集存储
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

use std::{
  collections::BTreeMap,
  fs::File,
  io::{Cursor, Seek, Write},
  path::{Component, Path, PathBuf},
  time::SystemTime,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Local, Utc};
use image::{ImageFormat, RgbImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum DatasetError {
  #[error("无效的手势标签: '{0}'")]
  InvalidLabel(String),
  #[error("数据集中不存在手势 '{0}'")]
  SignNotFound(String),
  #[error("没有提供数据集图像")]
  EmptyRequest,
  #[error("数据集目录不存在: {0}")]
  NoDataset(String),
  #[error("Base64 解码错误: {0}")]
  Base64(#[from] base64::DecodeError),
  #[error("图像编码错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("请求解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("压缩包错误: {0}")]
  ZipError(#[from] zip::result::ZipError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 待保存的一张图像，`data` 为 `data:` URL 或纯 Base64 文本
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetImage {
  pub data: String,
  #[serde(default)]
  pub timestamp: Option<String>,
}

impl DatasetImage {
  pub fn from_data_url(data: impl Into<String>) -> Self {
    Self {
      data: data.into(),
      timestamp: None,
    }
  }

  /// 将画布编码为 JPEG 数据 URL
  pub fn from_canvas(canvas: &RgbImage) -> Result<Self, DatasetError> {
    let mut buffer = Cursor::new(Vec::new());
    canvas.write_to(&mut buffer, ImageFormat::Jpeg)?;
    let encoded = STANDARD.encode(buffer.into_inner());
    Ok(Self::from_data_url(format!("data:image/jpeg;base64,{}", encoded)))
  }

  pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
    self.timestamp = Some(timestamp.into());
    self
  }

  /// 解码图像字节，`data:` 前缀在逗号处截断
  pub fn decode(&self) -> Result<Vec<u8>, DatasetError> {
    let payload = match self.data.split_once(',') {
      Some((_, payload)) => payload,
      None => self.data.as_str(),
    };
    Ok(STANDARD.decode(payload.trim())?)
  }

  fn file_name(&self, index: usize) -> String {
    let timestamp = self
      .timestamp
      .clone()
      .unwrap_or_else(|| Utc::now().timestamp().to_string());
    let timestamp: String = timestamp
      .chars()
      .map(|c| match c {
        ':' | '.' | '/' | '\\' => '-',
        c => c,
      })
      .collect();
    format!("image_{}_{}.jpg", timestamp, index)
  }
}

/// 同一手势的一批图像
#[derive(Debug, Clone)]
pub struct SignBatch {
  pub sign: String,
  pub images: Vec<DatasetImage>,
}

impl SignBatch {
  pub fn new(sign: impl Into<String>, images: Vec<DatasetImage>) -> Self {
    Self {
      sign: sign.into(),
      images,
    }
  }
}

#[derive(Deserialize)]
struct SaveRequest {
  #[serde(default)]
  images: BTreeMap<String, Vec<DatasetImage>>,
}

/// 解析 `{"images": {"<手势>": [{"data": "...", "timestamp": "..."}]}}`
pub fn parse_save_request(data: &str) -> Result<Vec<SignBatch>, DatasetError> {
  let request: SaveRequest = serde_json::from_str(data)?;
  Ok(
    request
      .images
      .into_iter()
      .map(|(sign, images)| SignBatch::new(sign, images))
      .collect(),
  )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SaveSummary {
  pub total_images: usize,
  pub total_signs: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignStats {
  pub sign: String,
  pub image_count: usize,
  /// 最近一张图像的修改时间，RFC 3339 格式
  pub last_updated: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatasetStats {
  pub total_signs: usize,
  pub total_images: usize,
  pub dataset_size: u64,
  pub signs_data: Vec<SignStats>,
}

/// 以手势标签为子目录的数据集
#[derive(Debug, Clone)]
pub struct DatasetStore {
  root: PathBuf,
}

fn is_image_path(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

impl DatasetStore {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// 标签必须是单个普通路径分量
  pub fn sign_dir(&self, sign: &str) -> Result<PathBuf, DatasetError> {
    let sign = sign.trim();
    let mut components = Path::new(sign).components();
    match (components.next(), components.next()) {
      (Some(Component::Normal(_)), None) if !sign.contains(['/', '\\']) => {
        Ok(self.root.join(sign))
      }
      _ => Err(DatasetError::InvalidLabel(sign.to_string())),
    }
  }

  fn sign_images(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)? {
      let path = entry?.path();
      if path.is_file() && is_image_path(&path) {
        images.push(path);
      }
    }
    Ok(images)
  }

  /// 保存单张图像，返回写入的路径
  pub fn save_image(
    &self,
    sign: &str,
    image: &DatasetImage,
    index: usize,
  ) -> Result<PathBuf, DatasetError> {
    let dir = self.sign_dir(sign)?;
    std::fs::create_dir_all(&dir)?;
    let bytes = image.decode()?;
    let path = dir.join(image.file_name(index));
    std::fs::write(&path, bytes)?;
    debug!("保存图像 {} 到手势 '{}'", path.display(), sign);
    Ok(path)
  }

  /// 保存一批图像，单张失败只记录日志，返回成功保存的数量
  pub fn save_batch(&self, batch: &SignBatch) -> Result<usize, DatasetError> {
    let dir = self.sign_dir(&batch.sign)?;
    std::fs::create_dir_all(&dir)?;

    let mut saved = 0;
    for (index, image) in batch.images.iter().enumerate() {
      match self.save_image(&batch.sign, image, index) {
        Ok(_) => saved += 1,
        Err(e) => error!("保存手势 '{}' 的第 {} 张图像失败: {}", batch.sign, index, e),
      }
    }
    info!(
      "手势 '{}' 保存了 {}/{} 张图像",
      batch.sign,
      saved,
      batch.images.len()
    );
    Ok(saved)
  }

  /// 保存多个手势，没有成功保存任何图像的手势不计入
  pub fn save_dataset(&self, batches: &[SignBatch]) -> Result<SaveSummary, DatasetError> {
    if batches.iter().all(|batch| batch.images.is_empty()) {
      return Err(DatasetError::EmptyRequest);
    }

    let mut summary = SaveSummary::default();
    for batch in batches {
      match self.save_batch(batch) {
        Ok(0) => {}
        Ok(saved) => {
          summary.total_images += saved;
          summary.total_signs += 1;
        }
        Err(e) => error!("保存手势 '{}' 失败: {}", batch.sign, e),
      }
    }

    if summary.total_images == 0 {
      warn!("没有成功保存任何图像，请检查图像格式");
    }
    Ok(summary)
  }

  pub fn stats(&self) -> Result<DatasetStats, DatasetError> {
    let mut stats = DatasetStats::default();
    if !self.root.is_dir() {
      return Ok(stats);
    }

    for entry in std::fs::read_dir(&self.root)? {
      let dir = entry?.path();
      if !dir.is_dir() {
        continue;
      }
      let images = Self::sign_images(&dir)?;
      if images.is_empty() {
        continue;
      }

      let mut size = 0;
      let mut latest = SystemTime::UNIX_EPOCH;
      for image in &images {
        let metadata = std::fs::metadata(image)?;
        size += metadata.len();
        latest = latest.max(metadata.modified()?);
      }

      stats.dataset_size += size;
      stats.total_images += images.len();
      stats.total_signs += 1;
      stats.signs_data.push(SignStats {
        sign: dir
          .file_name()
          .map(|name| name.to_string_lossy().into_owned())
          .unwrap_or_default(),
        image_count: images.len(),
        last_updated: DateTime::<Local>::from(latest).to_rfc3339(),
      });
    }

    stats
      .signs_data
      .sort_by(|a, b| b.image_count.cmp(&a.image_count).then_with(|| a.sign.cmp(&b.sign)));
    Ok(stats)
  }

  /// 将全部手势图像打包为 zip，条目路径为 `<手势>/<文件名>`，返回写入的图像数量
  pub fn export<W: Write + Seek>(&self, writer: W) -> Result<usize, DatasetError> {
    if !self.root.is_dir() {
      return Err(DatasetError::NoDataset(self.root.display().to_string()));
    }

    let mut sign_dirs = Vec::new();
    for entry in std::fs::read_dir(&self.root)? {
      let dir = entry?.path();
      if dir.is_dir() {
        sign_dirs.push(dir);
      }
    }
    sign_dirs.sort();

    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut exported = 0;
    for dir in &sign_dirs {
      let Some(sign) = dir.file_name().and_then(|name| name.to_str()) else {
        warn!("跳过名称无法编码的目录: {}", dir.display());
        continue;
      };
      let mut images = Self::sign_images(dir)?;
      images.sort();
      for image in &images {
        let Some(name) = image.file_name().and_then(|name| name.to_str()) else {
          warn!("跳过名称无法编码的图像: {}", image.display());
          continue;
        };
        zip.start_file(format!("{}/{}", sign, name), options)?;
        std::io::copy(&mut File::open(image)?, &mut zip)?;
        exported += 1;
      }
      debug!("手势 '{}' 导出 {} 张图像", sign, images.len());
    }
    zip.finish()?.flush()?;

    info!("导出了 {} 个手势目录中的 {} 张图像", sign_dirs.len(), exported);
    Ok(exported)
  }

  /// 删除手势的全部图像及其目录，返回删除的图像数量
  pub fn delete_sign(&self, sign: &str) -> Result<usize, DatasetError> {
    let dir = self.sign_dir(sign)?;
    if !dir.is_dir() {
      return Err(DatasetError::SignNotFound(sign.to_string()));
    }

    let images = Self::sign_images(&dir)?;
    for image in &images {
      std::fs::remove_file(image)?;
    }
    std::fs::remove_dir(&dir)?;
    info!("删除手势 '{}' 的 {} 张图像", sign, images.len());
    Ok(images.len())
  }
}

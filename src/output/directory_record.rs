// 该文件是 Ishara （手语识别） 项目的一部分。
// src/output/directory_record.rs - 数据集目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use chrono::Utc;
use parking_lot::Mutex;
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  dataset::{DatasetError, DatasetImage, DatasetStore},
  input::Frame,
  output::{Render, draw::Record},
  recognition::FrameReport,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
  #[error("数据集错误: {0}")]
  DatasetError(#[from] DatasetError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 将归一化画布按手势标签写入数据集目录
///
/// `folder:///data/dataset?label=ب&record`：`label` 固定手势标签，
/// 省略时使用识别结果；`record` 额外写出关键点 JSON 附属文件。
pub struct DirectoryRecordOutput {
  store: DatasetStore,
  label: Option<String>,
  record: Option<Record>,
  frame_counter: Mutex<usize>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let directory = urlencoding::decode(uri.path())
      .map_err(|e| DirectoryRecordOutputError::PathEncoding(e.to_string()))?;
    let label = uri
      .query_pairs()
      .find(|(k, _)| k == "label")
      .map(|(_, v)| v.into_owned());
    let record = uri.query_pairs().any(|(k, _)| k == "record");

    let mut output = DirectoryRecordOutput::new(PathBuf::from(directory.as_ref()));
    if let Some(label) = label {
      output = output.with_label(label);
    }
    Ok(output.with_record(record))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>) -> Self {
    Self {
      store: DatasetStore::new(directory),
      label: None,
      record: None,
      frame_counter: Mutex::new(0),
    }
  }

  pub fn with_label(mut self, label: impl Into<String>) -> Self {
    self.label = Some(label.into());
    self
  }

  pub fn with_record(mut self, record: bool) -> Self {
    self.record = record.then_some(Record);
    self
  }

  pub fn store(&self) -> &DatasetStore {
    &self.store
  }

  fn frame_id(&self) -> usize {
    let mut counter = self.frame_counter.lock();
    *counter += 1;
    *counter
  }
}

impl Render<Frame, FrameReport> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &FrameReport) -> Result<(), Self::Error> {
    let Some(canvas) = &result.canvas else {
      debug!("第 {} 帧没有归一化画布，跳过记录", frame.index);
      return Ok(());
    };
    let label = match (&self.label, result.outcome.result()) {
      (Some(label), _) => label.as_str(),
      (None, Some(recognized)) => recognized.label.as_str(),
      (None, None) => {
        debug!("第 {} 帧没有手势标签，跳过记录", frame.index);
        return Ok(());
      }
    };

    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    let image = DatasetImage::from_canvas(&canvas.image)?.with_timestamp(timestamp);
    let path = self.store.save_image(label, &image, self.frame_id())?;
    if let Some(record) = &self.record {
      record.record(label, canvas.context.canvas_size, &result.points, &path)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_label_and_record_flags() {
    let url = url::Url::parse("folder:///data/dataset?label=%D8%A8&record").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert_eq!(output.label.as_deref(), Some("ب"));
    assert!(output.record.is_some());
    assert_eq!(output.store().root(), std::path::Path::new("/data/dataset"));

    let url = url::Url::parse("folder:///data/dataset").unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    assert!(output.label.is_none());
    assert!(output.record.is_none());
  }

  #[test]
  fn frame_ids_increase() {
    let output = DirectoryRecordOutput::new("/tmp");
    assert_eq!(output.frame_id(), 1);
    assert_eq!(output.frame_id(), 2);
  }
}

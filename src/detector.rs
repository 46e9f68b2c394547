// 该文件是 Ishara （手语识别） 项目的一部分。
// src/detector.rs - 手部关键点检测接口
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

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  hand::{BoundingBox, DetectedHand, Landmark},
  input::Frame,
};

/// 手部检测器：输入一帧，输出零到多只手
pub trait Detector {
  type Error;

  fn detect(&self, frame: &Frame) -> Result<Vec<DetectedHand>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum DetectorError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
  #[error("帧缺少来源文件，无法定位关键点文件")]
  MissingSource,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("关键点文件解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
struct HandJson {
  #[serde(default)]
  bbox: Option<[i32; 4]>,
  landmarks: Vec<[i32; 2]>,
}

#[derive(Deserialize, Debug)]
struct DetectionJson {
  #[serde(default)]
  hands: Vec<HandJson>,
}

impl HandJson {
  fn into_hand(self) -> Option<DetectedHand> {
    let landmarks: Vec<Landmark> = self
      .landmarks
      .iter()
      .enumerate()
      .map(|(index, [x, y])| Landmark::new(index, *x, *y))
      .collect();
    match self.bbox {
      Some([x, y, w, h]) => Some(DetectedHand::new(BoundingBox::new(x, y, w, h), landmarks)),
      None => {
        let hand = DetectedHand::from_landmarks(landmarks);
        if hand.is_none() && !self.landmarks.is_empty() {
          warn!("关键点跨度超出坐标范围，丢弃该手");
        }
        hand
      }
    }
  }
}

/// 解析关键点 JSON：`{"hands": [{"bbox": [x, y, w, h], "landmarks": [[x, y], ...]}]}`
///
/// `bbox` 可省略，此时由关键点推导。
pub fn parse_detections(data: &str) -> Result<Vec<DetectedHand>, serde_json::Error> {
  let detections: DetectionJson = serde_json::from_str(data)?;
  Ok(
    detections
      .hands
      .into_iter()
      .filter_map(HandJson::into_hand)
      .collect(),
  )
}

/// 从外部检测器导出的 JSON 附属文件中读取检测结果
///
/// `landmarks://` 表示与图像同目录同名的 `.json` 文件，
/// `landmarks:///dir` 表示在指定目录下按图像文件名查找。
#[derive(Debug, Clone)]
pub struct LandmarkFileDetector {
  directory: Option<PathBuf>,
  max_hands: usize,
}

impl FromUrlWithScheme for LandmarkFileDetector {
  const SCHEME: &'static str = "landmarks";
}

impl FromUrl for LandmarkFileDetector {
  type Error = DetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(DetectorError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let path = urlencoding::decode(url.path())
      .map_err(|e| DetectorError::PathEncoding(e.to_string()))?;
    let directory = if path.is_empty() || path == "/" {
      None
    } else {
      Some(PathBuf::from(path.as_ref()))
    };

    let max_hands = url
      .query_pairs()
      .find(|(k, _)| k == "max_hands")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(1);

    Ok(Self {
      directory,
      max_hands,
    })
  }
}

impl Default for LandmarkFileDetector {
  fn default() -> Self {
    Self {
      directory: None,
      max_hands: 1,
    }
  }
}

impl LandmarkFileDetector {
  pub fn with_directory(mut self, directory: impl Into<PathBuf>) -> Self {
    self.directory = Some(directory.into());
    self
  }

  pub fn with_max_hands(mut self, max_hands: usize) -> Self {
    self.max_hands = max_hands;
    self
  }

  fn sidecar_path(&self, source: &Path) -> PathBuf {
    match (&self.directory, source.file_name()) {
      (Some(dir), Some(name)) => dir.join(name).with_extension("json"),
      _ => source.with_extension("json"),
    }
  }
}

impl Detector for LandmarkFileDetector {
  type Error = DetectorError;

  fn detect(&self, frame: &Frame) -> Result<Vec<DetectedHand>, Self::Error> {
    let source = frame.source.as_deref().ok_or(DetectorError::MissingSource)?;
    let path = self.sidecar_path(source);
    if !path.exists() {
      debug!("关键点文件不存在，视为未检测到手: {}", path.display());
      return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(&path)?;
    let mut hands = parse_detections(&data)?;
    if hands.len() > self.max_hands {
      warn!(
        "检测到 {} 只手，仅保留前 {} 只",
        hands.len(),
        self.max_hands
      );
      hands.truncate(self.max_hands);
    }
    Ok(hands)
  }
}

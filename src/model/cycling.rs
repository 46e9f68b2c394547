// 该文件是 Ishara （手语识别） 项目的一部分。
// src/model/cycling.rs - 演示用循环分类器
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::{SystemTime, UNIX_EPOCH};

use image::RgbImage;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{ARABIC_ALPHABET, Classifier, ClassifierError, Prediction},
};

const CYCLING_CONFIDENCE: f32 = 0.9;

/// 没有可用模型时的替代分类器：按当前秒数轮流输出各个类别
#[derive(Debug, Clone)]
pub struct CyclingClassifier {
  num_classes: usize,
}

impl CyclingClassifier {
  pub fn new(num_classes: usize) -> Self {
    Self { num_classes }
  }

  pub fn predict_at(&self, unix_secs: u64) -> Result<Prediction, ClassifierError> {
    if self.num_classes == 0 {
      return Err(ClassifierError::Unavailable("类别数为 0".to_string()));
    }
    let index = (unix_secs % self.num_classes as u64) as usize;
    let mut probabilities = vec![0.0; self.num_classes];
    probabilities[index] = CYCLING_CONFIDENCE;
    Ok(Prediction {
      probabilities: probabilities.into_boxed_slice(),
      index,
    })
  }
}

impl Default for CyclingClassifier {
  fn default() -> Self {
    Self::new(ARABIC_ALPHABET.len())
  }
}

impl FromUrlWithScheme for CyclingClassifier {
  const SCHEME: &'static str = "cycle";
}

impl FromUrl for CyclingClassifier {
  type Error = ClassifierError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ClassifierError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let num_classes = url
      .query_pairs()
      .find(|(k, _)| k == "classes")
      .and_then(|(_, v)| v.parse().ok())
      .unwrap_or(ARABIC_ALPHABET.len());
    Ok(Self::new(num_classes))
  }
}

impl Classifier for CyclingClassifier {
  fn predict(&self, canvas: &RgbImage) -> Result<Prediction, ClassifierError> {
    let now = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map_err(|e| ClassifierError::Unavailable(e.to_string()))?;
    debug!(
      "循环分类器: 画布 {}x{}, 时间 {}s",
      canvas.width(),
      canvas.height(),
      now.as_secs()
    );
    self.predict_at(now.as_secs())
  }
}

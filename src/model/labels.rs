// 该文件是 Ishara （手语识别） 项目的一部分。
// src/model/labels.rs - 类别标签
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::Path;

use tracing::{info, warn};

use crate::model::Prediction;

/// 标签文件缺失时使用的 28 个阿拉伯字母
pub const ARABIC_ALPHABET: [&str; 28] = [
  "أ", "ب", "ت", "ث", "ج", "ح", "خ", "د", "ذ", "ر", "ز", "س", "ش", "ص", "ض", "ط", "ظ", "ع", "غ",
  "ف", "ق", "ك", "ل", "م", "ن", "ه", "و", "ي",
];

/// 与分类器输出索引对齐的标签列表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
  labels: Vec<String>,
}

impl Default for Labels {
  fn default() -> Self {
    Self {
      labels: ARABIC_ALPHABET.iter().map(|s| s.to_string()).collect(),
    }
  }
}

impl From<Vec<String>> for Labels {
  fn from(labels: Vec<String>) -> Self {
    Self { labels }
  }
}

impl Labels {
  /// 每行一个标签；文件缺失、无法读取或为空时回退到默认字母表
  pub fn load(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
      Ok(data) => {
        let labels = Self::parse(&data);
        if labels.is_empty() {
          warn!("标签文件为空: {}, 使用默认字母表", path.display());
          Self::default()
        } else {
          info!("加载了 {} 个标签", labels.len());
          labels
        }
      }
      Err(e) => {
        warn!("无法读取标签文件 {}: {}, 使用默认字母表", path.display(), e);
        Self::default()
      }
    }
  }

  pub fn parse(data: &str) -> Self {
    Self {
      labels: data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect(),
    }
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.labels.get(index).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  /// 概率最高的 k 个标签，没有对应标签的索引会被跳过
  pub fn top_predictions(&self, prediction: &Prediction, k: usize) -> Vec<(&str, f32)> {
    prediction
      .top_k(k)
      .into_iter()
      .filter_map(|(index, p)| self.get(index).map(|label| (label, p)))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_alphabet() {
    let labels = Labels::load("/nonexistent/labels.txt");
    assert_eq!(labels.len(), 28);
    assert_eq!(labels.get(0), Some("أ"));
    assert_eq!(labels.get(27), Some("ي"));
    assert_eq!(labels.get(28), None);
  }

  #[test]
  fn empty_file_falls_back_to_alphabet() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "\n  \n").unwrap();
    assert_eq!(Labels::load(file.path()), Labels::default());
  }

  #[test]
  fn loads_trimmed_lines() {
    let file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(file.path(), "نعم\n لا \n\nشكراً\n").unwrap();
    let labels = Labels::load(file.path());
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.get(1), Some("لا"));
  }

  #[test]
  fn top_predictions_skip_unknown_indices() {
    let labels = Labels::from(vec!["a".to_string(), "b".to_string()]);
    let prediction = Prediction::from_probabilities(vec![0.2, 0.1, 0.7]).unwrap();
    assert_eq!(labels.top_predictions(&prediction, 3), vec![("a", 0.2), ("b", 0.1)]);
  }
}

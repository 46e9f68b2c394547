// 该文件是 Ishara （手语识别） 项目的一部分。
// src/model.rs - 分类模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::RgbImage;
use thiserror::Error;

/// 手势分类器，输入归一化画布，输出各类别概率
pub trait Classifier {
  fn predict(&self, canvas: &RgbImage) -> Result<Prediction, ClassifierError>;
}

#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("分类器不可用: {0}")]
  Unavailable(String),
  #[error("分类器输出为空")]
  EmptyOutput,
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 分类结果：概率向量与最大概率的索引
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  pub probabilities: Box<[f32]>,
  pub index: usize,
}

impl Prediction {
  /// 由概率向量构造，索引取最大值所在位置
  pub fn from_probabilities(probabilities: Vec<f32>) -> Result<Self, ClassifierError> {
    let index = probabilities
      .iter()
      .enumerate()
      .filter(|(_, p)| p.is_finite())
      .max_by(|(_, a), (_, b)| a.total_cmp(b))
      .map(|(i, _)| i)
      .ok_or(ClassifierError::EmptyOutput)?;
    Ok(Self {
      probabilities: probabilities.into_boxed_slice(),
      index,
    })
  }

  pub fn confidence(&self) -> f32 {
    self.probabilities.get(self.index).copied().unwrap_or(0.0)
  }

  pub fn is_confident(&self, threshold: f32) -> bool {
    self.confidence() >= threshold
  }

  /// 概率最高的 k 个类别，按概率降序
  pub fn top_k(&self, k: usize) -> Vec<(usize, f32)> {
    let mut ranked: Vec<(usize, f32)> = self.probabilities.iter().copied().enumerate().collect();
    ranked.sort_by(|(_, a), (_, b)| b.total_cmp(a));
    ranked.truncate(k);
    ranked
  }
}

mod cycling;
mod labels;

pub use self::cycling::CyclingClassifier;
pub use self::labels::{ARABIC_ALPHABET, Labels};

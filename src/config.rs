// 该文件是 Ishara （手语识别） 项目的一部分。
// src/config.rs - 流水线参数配置
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

use std::{path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

const DEFAULT_OFFSET: i32 = 20;
const DEFAULT_CANVAS_SIZE: u32 = 300;
const DEFAULT_MIN_REGION: u32 = 10;
const DEFAULT_MIN_LANDMARKS: usize = 15;
const DEFAULT_COOLDOWN_SECS: f64 = 1.0;
const DEFAULT_HISTORY_CAPACITY: usize = 10;
const DEFAULT_GRID_DIVISIONS: u32 = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
  #[error("配置无效: {0}")]
  Invalid(String),
}

/// 归一化与识别流程的全部参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  /// 裁剪时包围框四周扩展的像素数
  pub offset: i32,
  /// 归一化画布边长
  pub canvas_size: u32,
  /// 裁剪区域的最小宽高（小于等于该值视为无效），为 0 时只要求区域非空
  pub min_region: u32,
  /// 可信检测所需的最少关键点数
  pub min_landmarks: usize,
  /// 两次识别之间的冷却时间（秒）
  pub cooldown_secs: f64,
  /// 识别历史保留条数，至少为 1
  pub history_capacity: usize,
  /// 参考网格的分段数
  pub grid_divisions: u32,
  /// 低于该置信度的分类结果不计入识别
  pub confidence_threshold: f32,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      offset: DEFAULT_OFFSET,
      canvas_size: DEFAULT_CANVAS_SIZE,
      min_region: DEFAULT_MIN_REGION,
      min_landmarks: DEFAULT_MIN_LANDMARKS,
      cooldown_secs: DEFAULT_COOLDOWN_SECS,
      history_capacity: DEFAULT_HISTORY_CAPACITY,
      grid_divisions: DEFAULT_GRID_DIVISIONS,
      confidence_threshold: 0.0,
    }
  }
}

impl PipelineConfig {
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    info!("加载配置文件: {}", path.display());
    let data = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&data)?;
    config.validate()?;
    Ok(config)
  }

  /// 未指定配置文件时使用默认配置
  pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
    match path {
      Some(path) => Self::from_json_file(path),
      None => Ok(Self::default()),
    }
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.offset < 0 {
      return Err(ConfigError::Invalid(format!(
        "offset 不能为负数: {}",
        self.offset
      )));
    }
    if self.canvas_size == 0 {
      return Err(ConfigError::Invalid("canvas_size 必须大于 0".to_string()));
    }
    if self.grid_divisions == 0 {
      return Err(ConfigError::Invalid("grid_divisions 必须大于 0".to_string()));
    }
    if self.history_capacity == 0 {
      return Err(ConfigError::Invalid("history_capacity 必须大于 0".to_string()));
    }
    if !self.cooldown_secs.is_finite() || self.cooldown_secs < 0.0 {
      return Err(ConfigError::Invalid(format!(
        "cooldown_secs 无效: {}",
        self.cooldown_secs
      )));
    }
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(ConfigError::Invalid(format!(
        "confidence_threshold 必须在 0.0 - 1.0 之间: {}",
        self.confidence_threshold
      )));
    }
    Ok(())
  }

  pub fn cooldown(&self) -> Duration {
    Duration::try_from_secs_f64(self.cooldown_secs).unwrap_or_default()
  }

  pub fn with_offset(mut self, offset: i32) -> Self {
    self.offset = offset;
    self
  }

  pub fn with_canvas_size(mut self, canvas_size: u32) -> Self {
    self.canvas_size = canvas_size;
    self
  }

  pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
    self.cooldown_secs = cooldown.as_secs_f64();
    self
  }

  pub fn with_min_landmarks(mut self, min_landmarks: usize) -> Self {
    self.min_landmarks = min_landmarks;
    self
  }

  pub fn with_history_capacity(mut self, history_capacity: usize) -> Self {
    self.history_capacity = history_capacity;
    self
  }

  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }
}

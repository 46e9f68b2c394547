// 该文件是 Ishara （手语识别） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧识别
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use url::Url;

use ishara::{
  FromUrl,
  config::PipelineConfig,
  detector::LandmarkFileDetector,
  model::{CyclingClassifier, Labels},
  recognition::RecognitionSession,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Ishara 单帧识别参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 手部检测器
  #[arg(long, value_name = "DETECTOR", default_value = "landmarks://")]
  pub detector: Url,
  /// 手势分类器
  #[arg(long, value_name = "MODEL", default_value = "cycle://")]
  pub model: Url,
  /// 标签文件，每行一个标签
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  /// JSON 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 裁剪边距，覆盖配置文件
  #[arg(long, value_name = "PIXELS")]
  pub offset: Option<i32>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("检测器: {}", args.detector);
  info!("分类器: {}", args.model);

  let mut config = PipelineConfig::load(args.config.as_deref())?;
  if let Some(offset) = args.offset {
    config = config.with_offset(offset);
  }
  config.validate()?;

  let labels = args.labels.map(Labels::load).unwrap_or_default();
  let input = ishara::input::InputWrapper::from_url(&args.input)?;
  let detector = LandmarkFileDetector::from_url(&args.detector)?;
  let classifier = CyclingClassifier::from_url(&args.model)?;
  let output = ishara::output::OutputWrapper::from_url(&args.output)?;

  let session = RecognitionSession::new(config, detector, classifier, labels);
  OneShotTask.run_task(input.into_frames(), session, output)?;

  Ok(())
}

// 该文件是 Ishara （手语识别） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复识别同一帧以测量耗时
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use clap::Parser;
use url::Url;

use ishara::{
  FromUrl,
  config::PipelineConfig,
  detector::LandmarkFileDetector,
  model::{CyclingClassifier, Labels},
  recognition::RecognitionSession,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Ishara 性能测试参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  #[arg(long, value_name = "DETECTOR", default_value = "landmarks://")]
  pub detector: Url,
  #[arg(long, value_name = "MODEL", default_value = "cycle://")]
  pub model: Url,
  #[arg(long, value_name = "FILE")]
  pub labels: Option<PathBuf>,
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 重复次数
  #[arg(long, value_name = "TIMES", default_value = "1000")]
  pub repeat: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("重复次数: {}", args.repeat);

  // 测量完整流程，关闭冷却
  let config = PipelineConfig::load(args.config.as_deref())?.with_cooldown(Duration::ZERO);
  config.validate()?;

  let labels = args.labels.map(Labels::load).unwrap_or_default();
  let input = ishara::input::InputWrapper::from_url(&args.input)?;
  let detector = LandmarkFileDetector::from_url(&args.detector)?;
  let classifier = CyclingClassifier::from_url(&args.model)?;
  let output = ishara::output::OutputWrapper::from_url(&args.output)?;

  let session = RecognitionSession::new(config, detector, classifier, labels);
  RepeatShotTask::default()
    .with_repeat_times(args.repeat)
    .run_task(input.into_frames(), session, output)?;

  Ok(())
}

// 该文件是 Ishara （手语识别） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续识别并拼接句子
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
  sentence::{detect_word_boundaries, suggest_words},
  speech::{SpeakingOutput, SpeechQueue},
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Ishara 连续识别参数
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
  /// 冷却时间（秒），覆盖配置文件
  #[arg(long, value_name = "SECONDS")]
  pub cooldown: Option<f64>,
  /// 识别结果播报方式，例如 log:// 或 command:///usr/bin/espeak-ng?arg=-v&arg=ar
  #[arg(long, value_name = "SPEAKER")]
  pub speak: Option<Url>,

  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let mut config = PipelineConfig::load(args.config.as_deref())?;
  if let Some(cooldown) = args.cooldown {
    config = config.with_cooldown(Duration::try_from_secs_f64(cooldown)?);
  }
  config.validate()?;

  let labels = args.labels.map(Labels::load).unwrap_or_default();
  let input = ishara::input::InputWrapper::from_url(&args.input)?;
  let detector = LandmarkFileDetector::from_url(&args.detector)?;
  let classifier = CyclingClassifier::from_url(&args.model)?;
  let output = ishara::output::OutputWrapper::from_url(&args.output)?;

  let session = RecognitionSession::new(config, detector, classifier, labels);
  let task = ContinuousTask::default().with_frame_number(args.frame_number);
  match &args.speak {
    Some(speaker) => {
      let output = SpeakingOutput::new(output, SpeechQueue::from_url(speaker)?);
      task.run_task(input.into_frames(), &session, output)?;
    }
    None => task.run_task(input.into_frames(), &session, output)?,
  }

  let signs: Vec<String> = session.history().into_iter().map(|r| r.label).collect();
  for sign in &signs {
    session.append_to_sentence(sign);
  }
  info!("识别序列: {:?}", signs);
  info!("单词切分: {:?}", detect_word_boundaries(&signs));
  info!("句子: '{}'", session.sentence());
  if let Some(last) = signs.last() {
    info!("候选词: {:?}", suggest_words(last));
  }

  Ok(())
}

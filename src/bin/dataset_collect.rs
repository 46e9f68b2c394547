// 该文件是 Ishara （手语识别） 项目的一部分。
// src/bin/dataset_collect.rs - 手势数据集采集与管理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{fs::File, io::BufWriter, path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use url::Url;

use ishara::{
  FromUrl,
  config::PipelineConfig,
  dataset::{DatasetStore, parse_save_request},
  detector::LandmarkFileDetector,
  model::{CyclingClassifier, Labels},
  output::DirectoryRecordOutput,
  recognition::RecognitionSession,
  task::{ContinuousTask, Task},
};
use tracing::{info, warn};

/// Ishara 数据集工具
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 数据集根目录
  #[arg(long, value_name = "DIR", default_value = "dataset")]
  pub dataset: PathBuf,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// 从图像中截取归一化手部画布并保存到指定手势
  Collect {
    /// 手势标签
    #[arg(long)]
    label: String,
    /// 输入来源
    #[arg(long, value_name = "SOURCE")]
    input: Url,
    #[arg(long, value_name = "DETECTOR", default_value = "landmarks://")]
    detector: Url,
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// 同时写出关键点 JSON 附属文件
    #[arg(long)]
    record: bool,
    #[arg(long, value_name = "FRAME_NUMBER")]
    frame_number: Option<usize>,
  },
  /// 导入 `{"images": {"<手势>": [{"data": "data:image/jpeg;base64,..."}]}}` 格式的 JSON
  Import {
    #[arg(long, value_name = "FILE")]
    file: PathBuf,
  },
  /// 将数据集按 `<手势>/<图像>` 结构打包为 zip
  Export {
    #[arg(long, value_name = "FILE", default_value = "arabic_sign_language_dataset.zip")]
    output: PathBuf,
  },
  /// 输出数据集统计
  Stats,
  /// 删除一个手势的全部图像
  Delete {
    #[arg(long)]
    label: String,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();
  let store = DatasetStore::new(&args.dataset);
  info!("数据集目录: {}", args.dataset.display());

  match args.command {
    Command::Collect {
      label,
      input,
      detector,
      config,
      record,
      frame_number,
    } => {
      // 采集时每帧都需要画布
      let config = PipelineConfig::load(config.as_deref())?.with_cooldown(Duration::ZERO);
      config.validate()?;
      store.sign_dir(&label)?;

      let input = ishara::input::InputWrapper::from_url(&input)?;
      let detector = LandmarkFileDetector::from_url(&detector)?;
      let session =
        RecognitionSession::new(config, detector, CyclingClassifier::default(), Labels::default());
      let output = DirectoryRecordOutput::new(&args.dataset)
        .with_label(label)
        .with_record(record);

      ContinuousTask::default()
        .with_frame_number(frame_number)
        .run_task(input.into_frames(), session, output)?;
    }
    Command::Import { file } => {
      let data = std::fs::read_to_string(&file)?;
      let batches = parse_save_request(&data)?;
      let summary = store.save_dataset(&batches)?;
      if summary.total_images == 0 {
        warn!("没有导入任何图像");
      }
      println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    Command::Export { output } => {
      let file = BufWriter::new(File::create(&output)?);
      let exported = store.export(file)?;
      info!("已导出 {} 张图像到 {}", exported, output.display());
    }
    Command::Stats => {
      let stats = store.stats()?;
      println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Command::Delete { label } => {
      let deleted = store.delete_sign(&label)?;
      info!("已删除手势 '{}' 的 {} 张图像", label, deleted);
    }
  }

  Ok(())
}

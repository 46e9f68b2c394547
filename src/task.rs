// 该文件是 Ishara （手语识别） 项目的一部分。
// src/task.rs - 任务执行器
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

use std::{
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  input::Frame,
  output::Render,
  recognition::{FrameReport, Recognize},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

fn log_report(frame: &Frame, report: &FrameReport) {
  let response = report.response();
  info!(
    "第 {} 帧: 状态 {}, 检测到手: {}, 文本: '{}'",
    frame.index, response.status, response.hand_detected, response.text
  );
}

pub struct OneShotTask;

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Recognize,
  O: Render<Frame, FrameReport, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let now = Instant::now();
    let report = model.process(&frame);
    let elapsed = now.elapsed();
    info!("识别完成，耗时: {:.2?}", elapsed);
    log_report(&frame, &report);
    output.render_result(&frame, &report)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Recognize,
  O: Render<Frame, FrameReport, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始识别...");
    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let report = model.process(&frame);
      let elapsed = now.elapsed();
      info!("({})识别完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(report);
    }

    if let Some(report) = last {
      log_report(&frame, &report);
      output.render_result(&frame, &report)?;
    }

    // 前两次包含预热开销，不计入平均
    if times.len() > 2 {
      let measured = &times[2..];
      warn!(
        "平均识别时间: {:.2?}",
        measured.iter().sum::<Duration>() / measured.len() as u32
      );
    } else {
      warn!("重复次数不足 3 次，不统计平均识别时间");
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Recognize,
  O: Render<Frame, FrameReport, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let mut processed = 0;
    let mut recognized = 0;
    for frame in input {
      processed += 1;
      let now = Instant::now();
      let report = model.process(&frame);
      let elapsed_a = now.elapsed();
      log_report(&frame, &report);
      if report.outcome.result().is_some() {
        recognized += 1;
      }
      output.render_result(&frame, &report)?;
      let elapsed_b = now.elapsed();
      info!("识别完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| processed >= n) {
        info!("达到指定帧数 {}, 退出任务循环", processed);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧，识别 {} 次", processed, recognized);
    Ok(())
  }
}

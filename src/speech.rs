// 该文件是 Ishara （手语识别） 项目的一部分。
// src/speech.rs - 后台语音播报
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
  process::Command,
  sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Sender},
  },
  thread::{self, JoinHandle},
};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, input::Frame, output::Render, recognition::FrameReport,
};

#[derive(Error, Debug)]
pub enum SpeechError {
  #[error("播报文本为空")]
  EmptyText,
  #[error("播报队列已关闭")]
  QueueClosed,
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("路径编码错误: {0}")]
  PathEncoding(String),
  #[error("无法启动语音程序: {0}")]
  IoError(#[from] std::io::Error),
  #[error("语音程序退出码异常: {0:?}")]
  CommandFailed(Option<i32>),
}

/// 语音引擎
pub trait Speaker: Send + 'static {
  fn speak(&self, text: &str) -> Result<(), SpeechError>;
}

/// 没有语音引擎时的替代实现，只记录日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSpeaker;

impl Speaker for LogSpeaker {
  fn speak(&self, text: &str) -> Result<(), SpeechError> {
    info!("播报: {}", text);
    Ok(())
  }
}

/// 调用外部 TTS 程序，文本作为最后一个参数
///
/// `command:///usr/bin/espeak-ng?arg=-v&arg=ar`
#[derive(Debug, Clone)]
pub struct CommandSpeaker {
  program: String,
  args: Vec<String>,
}

impl CommandSpeaker {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      args: Vec::new(),
    }
  }

  pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }
}

impl FromUrlWithScheme for CommandSpeaker {
  const SCHEME: &'static str = "command";
}

impl FromUrl for CommandSpeaker {
  type Error = SpeechError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SpeechError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }
    let program =
      urlencoding::decode(url.path()).map_err(|e| SpeechError::PathEncoding(e.to_string()))?;
    let args = url
      .query_pairs()
      .filter(|(k, _)| k == "arg")
      .map(|(_, v)| v.into_owned())
      .collect();
    Ok(Self {
      program: program.into_owned(),
      args,
    })
  }
}

impl Speaker for CommandSpeaker {
  fn speak(&self, text: &str) -> Result<(), SpeechError> {
    debug!("调用语音程序: {} {:?}", self.program, self.args);
    let status = Command::new(&self.program)
      .args(&self.args)
      .arg(text)
      .status()?;
    if status.success() {
      Ok(())
    } else {
      Err(SpeechError::CommandFailed(status.code()))
    }
  }
}

/// 播报队列：提交后立即返回，由后台线程依次播报
pub struct SpeechQueue {
  sender: Option<Sender<String>>,
  speaking: Arc<AtomicBool>,
  handle: Option<JoinHandle<()>>,
}

impl SpeechQueue {
  pub fn new<S: Speaker>(speaker: S) -> Self {
    let (sender, receiver) = mpsc::channel::<String>();
    let speaking = Arc::new(AtomicBool::new(false));
    let flag = speaking.clone();

    let handle = thread::spawn(move || {
      debug!("语音线程启动");
      for text in receiver {
        flag.store(true, Ordering::Release);
        if let Err(e) = speaker.speak(&text) {
          error!("播报失败: {}", e);
        }
        flag.store(false, Ordering::Release);
      }
      debug!("语音线程退出");
    });

    Self {
      sender: Some(sender),
      speaking,
      handle: Some(handle),
    }
  }

  /// 提交一段文本，空白文本会被拒绝
  pub fn speak(&self, text: &str) -> Result<(), SpeechError> {
    let text = text.trim();
    if text.is_empty() {
      return Err(SpeechError::EmptyText);
    }
    let sender = self.sender.as_ref().ok_or(SpeechError::QueueClosed)?;
    sender
      .send(text.to_string())
      .map_err(|_| SpeechError::QueueClosed)
  }

  pub fn is_speaking(&self) -> bool {
    self.speaking.load(Ordering::Acquire)
  }
}

impl FromUrl for SpeechQueue {
  type Error = SpeechError;

  /// `log://` 只记录日志，`command://` 调用外部程序
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "log" => Ok(Self::new(LogSpeaker)),
      scheme if scheme == CommandSpeaker::SCHEME => {
        Ok(Self::new(CommandSpeaker::from_url(url)?))
      }
      other => Err(SpeechError::SchemeMismatch(format!(
        "期望 'log' 或 '{}', 实际 '{}'",
        CommandSpeaker::SCHEME,
        other
      ))),
    }
  }
}

impl Default for SpeechQueue {
  fn default() -> Self {
    Self::new(LogSpeaker)
  }
}

impl Drop for SpeechQueue {
  fn drop(&mut self) {
    // 关闭通道后等待剩余文本播报完
    self.sender.take();
    if let Some(handle) = self.handle.take()
      && handle.join().is_err()
    {
      warn!("语音线程异常退出");
    }
  }
}

/// 在内层输出之前播报识别结果
pub struct SpeakingOutput<O> {
  inner: O,
  queue: SpeechQueue,
}

impl<O> SpeakingOutput<O> {
  pub fn new(inner: O, queue: SpeechQueue) -> Self {
    Self { inner, queue }
  }
}

impl<O: Render<Frame, FrameReport>> Render<Frame, FrameReport> for SpeakingOutput<O> {
  type Error = O::Error;

  fn render_result(&self, frame: &Frame, result: &FrameReport) -> Result<(), Self::Error> {
    if let Some(recognized) = result.outcome.result()
      && let Err(e) = self.queue.speak(&recognized.reshaped_label)
    {
      warn!("无法提交播报: {}", e);
    }
    self.inner.render_result(frame, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use parking_lot::Mutex;

  struct CollectSpeaker(Arc<Mutex<Vec<String>>>);

  impl Speaker for CollectSpeaker {
    fn speak(&self, text: &str) -> Result<(), SpeechError> {
      self.0.lock().push(text.to_string());
      Ok(())
    }
  }

  #[test]
  fn queue_speaks_in_order() {
    let spoken = Arc::new(Mutex::new(Vec::new()));
    {
      let queue = SpeechQueue::new(CollectSpeaker(spoken.clone()));
      queue.speak("مرحبا").unwrap();
      queue.speak("  شكراً ").unwrap();
    }
    assert_eq!(*spoken.lock(), vec!["مرحبا".to_string(), "شكراً".to_string()]);
  }

  #[test]
  fn empty_text_is_rejected() {
    let queue = SpeechQueue::default();
    assert!(matches!(queue.speak("   "), Err(SpeechError::EmptyText)));
  }

  #[test]
  fn command_speaker_from_url() {
    let url = Url::parse("command:///usr/bin/espeak-ng?arg=-v&arg=ar").unwrap();
    let speaker = CommandSpeaker::from_url(&url).unwrap();
    assert_eq!(speaker.program, "/usr/bin/espeak-ng");
    assert_eq!(speaker.args, vec!["-v", "ar"]);
  }

  #[test]
  fn queue_from_url() {
    assert!(SpeechQueue::from_url(&Url::parse("log://").unwrap()).is_ok());
    assert!(matches!(
      SpeechQueue::from_url(&Url::parse("http://example.com").unwrap()),
      Err(SpeechError::SchemeMismatch(_))
    ));
  }

  #[cfg(unix)]
  #[test]
  fn command_speaker_reports_exit_status() {
    assert!(CommandSpeaker::new("true").speak("نعم").is_ok());
    assert!(matches!(
      CommandSpeaker::new("false").speak("لا"),
      Err(SpeechError::CommandFailed(Some(1)))
    ));
  }
}

// 该文件是 Ishara （手语识别） 项目的一部分。
// src/recognition.rs - 单帧识别流程
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
  collections::VecDeque,
  fmt::Display,
  sync::atomic::{AtomicBool, Ordering},
  time::Instant,
};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  config::PipelineConfig,
  detector::Detector,
  hand::DetectedHand,
  input::Frame,
  model::{Classifier, Labels, Prediction},
  normalize::{HandNormalizer, NormalizeError, NormalizedCanvas},
  output::draw::Draw,
  remap::CanvasPoint,
  sentence::{SentenceBuilder, format_for_display},
};

/// 时间来源，测试中可替换为手动时钟
pub trait Clock {
  fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> Instant {
    Instant::now()
  }
}

/// 一次被接受的识别
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecognitionResult {
  pub label: String,
  pub confidence: f32,
  pub reshaped_label: String,
}

impl RecognitionResult {
  pub fn new(label: impl Into<String>, confidence: f32) -> Self {
    let label = label.into();
    let reshaped_label = format_for_display(&label);
    Self {
      label,
      confidence,
      reshaped_label,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
  /// 上一帧仍在处理，本帧被丢弃
  Busy,
  NoHand,
  /// 关键点数量不足，不调用分类器
  Unreliable { landmarks: usize },
  /// 冷却时间内，不重复识别
  CoolingDown,
  Rejected(NormalizeError),
  /// 分类器不可用、索引无对应标签或置信度不足
  Unclassified,
  Recognized(RecognitionResult),
}

impl RecognitionOutcome {
  pub fn hand_detected(&self) -> bool {
    match self {
      RecognitionOutcome::Busy | RecognitionOutcome::NoHand => false,
      RecognitionOutcome::Rejected(NormalizeError::DegenerateBoundingBox { .. }) => false,
      _ => true,
    }
  }

  pub fn text(&self) -> &str {
    match self {
      RecognitionOutcome::Recognized(result) => &result.label,
      _ => "",
    }
  }

  pub fn result(&self) -> Option<&RecognitionResult> {
    match self {
      RecognitionOutcome::Recognized(result) => Some(result),
      _ => None,
    }
  }

  pub fn is_busy(&self) -> bool {
    matches!(self, RecognitionOutcome::Busy)
  }
}

/// 单帧处理结果，附带用于诊断与保存的中间产物
#[derive(Debug, Clone)]
pub struct FrameReport {
  pub outcome: RecognitionOutcome,
  pub hand: Option<DetectedHand>,
  pub canvas: Option<NormalizedCanvas>,
  pub points: Vec<CanvasPoint>,
}

impl FrameReport {
  fn from_outcome(outcome: RecognitionOutcome) -> Self {
    Self {
      outcome,
      hand: None,
      canvas: None,
      points: Vec::new(),
    }
  }

  fn with_hand(mut self, hand: DetectedHand) -> Self {
    self.hand = Some(hand);
    self
  }

  pub fn response(&self) -> FrameResponse {
    let status = match self.outcome {
      RecognitionOutcome::Busy => "busy",
      RecognitionOutcome::Rejected(_) => "rejected",
      _ => "ok",
    };
    let result = self.outcome.result();
    // 未能分类时按零置信度返回
    let confidence = match &self.outcome {
      RecognitionOutcome::Unclassified => Some(0.0),
      _ => result.map(|r| r.confidence),
    };
    FrameResponse {
      status,
      hand_detected: self.outcome.hand_detected(),
      text: self.outcome.text().to_string(),
      confidence,
      reshaped_text: result.map(|r| r.reshaped_label.clone()),
    }
  }
}

/// 返回给调用方的精简结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameResponse {
  pub status: &'static str,
  pub hand_detected: bool,
  pub text: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub confidence: Option<f32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reshaped_text: Option<String>,
}

/// 逐帧识别的统一入口
pub trait Recognize {
  fn process(&self, frame: &Frame) -> FrameReport;
}

impl<T: Recognize + ?Sized> Recognize for &T {
  fn process(&self, frame: &Frame) -> FrameReport {
    (**self).process(frame)
  }
}

struct SessionState {
  last_accepted: Option<Instant>,
  history: VecDeque<RecognitionResult>,
  sentence: SentenceBuilder,
}

// 持有期间会话处于处理中，离开作用域时释放
struct BusyGuard<'a> {
  flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
  fn acquire(flag: &'a AtomicBool) -> Option<Self> {
    flag
      .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
      .ok()
      .map(|_| Self { flag })
  }
}

impl Drop for BusyGuard<'_> {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

/// 识别会话：同一时刻至多处理一帧，并维护冷却时间、历史记录与句子
pub struct RecognitionSession<D, C, K = SystemClock> {
  config: PipelineConfig,
  detector: D,
  classifier: C,
  labels: Labels,
  normalizer: HandNormalizer,
  draw: Draw,
  clock: K,
  busy: AtomicBool,
  state: Mutex<SessionState>,
}

impl<D, C> RecognitionSession<D, C, SystemClock> {
  pub fn new(config: PipelineConfig, detector: D, classifier: C, labels: Labels) -> Self {
    let normalizer = HandNormalizer::from_config(&config);
    let draw = Draw::default().with_grid_divisions(config.grid_divisions);
    let history = VecDeque::with_capacity(config.history_capacity);
    Self {
      config,
      detector,
      classifier,
      labels,
      normalizer,
      draw,
      clock: SystemClock,
      busy: AtomicBool::new(false),
      state: Mutex::new(SessionState {
        last_accepted: None,
        history,
        sentence: SentenceBuilder::new(),
      }),
    }
  }
}

impl<D, C, K> RecognitionSession<D, C, K> {
  pub fn with_clock<K2: Clock>(self, clock: K2) -> RecognitionSession<D, C, K2> {
    RecognitionSession {
      config: self.config,
      detector: self.detector,
      classifier: self.classifier,
      labels: self.labels,
      normalizer: self.normalizer,
      draw: self.draw,
      clock,
      busy: self.busy,
      state: self.state,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn labels(&self) -> &Labels {
    &self.labels
  }

  pub fn is_busy(&self) -> bool {
    self.busy.load(Ordering::Acquire)
  }

  /// 最近的识别结果，按时间先后
  pub fn history(&self) -> Vec<RecognitionResult> {
    self.state.lock().history.iter().cloned().collect()
  }

  pub fn last_result(&self) -> Option<RecognitionResult> {
    self.state.lock().history.back().cloned()
  }

  pub fn append_to_sentence(&self, text: &str) -> String {
    self.state.lock().sentence.push(text)
  }

  pub fn sentence(&self) -> String {
    self.state.lock().sentence.sentence()
  }

  pub fn clear_sentence(&self) {
    self.state.lock().sentence.clear();
    info!("句子已清空");
  }
}

impl<D, C, K> RecognitionSession<D, C, K>
where
  D: Detector,
  D::Error: Display,
  C: Classifier,
  K: Clock,
{
  fn cooling_down(&self, now: Instant) -> bool {
    self
      .state
      .lock()
      .last_accepted
      .is_some_and(|last| now.saturating_duration_since(last) < self.config.cooldown())
  }

  fn accept(&self, now: Instant, result: RecognitionResult) {
    let mut state = self.state.lock();
    state.last_accepted = Some(now);
    state.history.push_back(result);
    while state.history.len() > self.config.history_capacity {
      state.history.pop_front();
    }
  }

  fn classify(&self, now: Instant, prediction: &Prediction) -> RecognitionOutcome {
    match self.labels.get(prediction.index) {
      Some(label) if prediction.is_confident(self.config.confidence_threshold) => {
        let result = RecognitionResult::new(label, prediction.confidence());
        info!("识别结果: {} ({:.2})", result.label, result.confidence);
        self.accept(now, result.clone());
        RecognitionOutcome::Recognized(result)
      }
      Some(label) => {
        debug!(
          "置信度不足: {} ({:.2} < {:.2})",
          label,
          prediction.confidence(),
          self.config.confidence_threshold
        );
        RecognitionOutcome::Unclassified
      }
      None => {
        warn!("分类索引 {} 没有对应标签", prediction.index);
        RecognitionOutcome::Unclassified
      }
    }
  }

  fn run_cycle(&self, frame: &Frame) -> FrameReport {
    let hands = match self.detector.detect(frame) {
      Ok(hands) => hands,
      Err(e) => {
        error!("第 {} 帧手部检测失败: {}", frame.index, e);
        return FrameReport::from_outcome(RecognitionOutcome::NoHand);
      }
    };
    let Some(hand) = hands.into_iter().next() else {
      debug!("第 {} 帧未检测到手", frame.index);
      return FrameReport::from_outcome(RecognitionOutcome::NoHand);
    };

    let count = hand.landmarks.len();
    if count < self.config.min_landmarks {
      debug!(
        "关键点数量不足: {} < {}",
        count, self.config.min_landmarks
      );
      return FrameReport::from_outcome(RecognitionOutcome::Unreliable { landmarks: count })
        .with_hand(hand);
    }

    debug!("手指伸展状态: {:?}", hand.fingers_up());

    let now = self.clock.now();
    if self.cooling_down(now) {
      debug!("冷却时间内，跳过第 {} 帧", frame.index);
      return FrameReport::from_outcome(RecognitionOutcome::CoolingDown).with_hand(hand);
    }

    let mut canvas = match self.normalizer.normalize(&frame.image, &hand.bbox) {
      Ok(canvas) => canvas,
      Err(e) => {
        warn!("第 {} 帧归一化失败: {}", frame.index, e);
        return FrameReport::from_outcome(RecognitionOutcome::Rejected(e)).with_hand(hand);
      }
    };
    let points = self.draw.render_canvas(&mut canvas, &hand.landmarks);

    let outcome = match self.classifier.predict(&canvas.image) {
      Ok(prediction) => {
        debug!("候选: {:?}", self.labels.top_predictions(&prediction, 3));
        self.classify(now, &prediction)
      }
      Err(e) => {
        warn!("分类失败: {}", e);
        RecognitionOutcome::Unclassified
      }
    };

    FrameReport {
      outcome,
      hand: Some(hand),
      canvas: Some(canvas),
      points,
    }
  }
}

impl<D, C, K> Recognize for RecognitionSession<D, C, K>
where
  D: Detector,
  D::Error: Display,
  C: Classifier,
  K: Clock,
{
  fn process(&self, frame: &Frame) -> FrameReport {
    let Some(_guard) = BusyGuard::acquire(&self.busy) else {
      debug!("上一帧仍在处理，丢弃第 {} 帧", frame.index);
      return FrameReport::from_outcome(RecognitionOutcome::Busy);
    };
    self.run_cycle(frame)
  }
}

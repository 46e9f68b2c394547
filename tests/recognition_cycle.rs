// 该文件是 Ishara （手语识别） 项目的一部分。
// tests/recognition_cycle.rs - 识别流程集成测试
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
  convert::Infallible,
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc::{self, Receiver, Sender},
  },
  thread,
  time::{Duration, Instant},
};

use image::{Rgb, RgbImage};
use parking_lot::Mutex;

use ishara::{
  config::PipelineConfig,
  detector::Detector,
  hand::{BoundingBox, DetectedHand, Landmark},
  input::Frame,
  model::{Classifier, ClassifierError, Labels, Prediction},
  normalize::NormalizeError,
  recognition::{Clock, RecognitionOutcome, RecognitionSession, Recognize},
};

struct FixedDetector(Vec<DetectedHand>);

impl Detector for FixedDetector {
  type Error = Infallible;

  fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedHand>, Self::Error> {
    Ok(self.0.clone())
  }
}

/// 依次输出第 n 个类别，并统计调用次数
#[derive(Default)]
struct SequenceClassifier {
  calls: AtomicUsize,
}

impl Classifier for SequenceClassifier {
  fn predict(&self, canvas: &RgbImage) -> Result<Prediction, ClassifierError> {
    assert_eq!(canvas.dimensions(), (300, 300));
    let call = self.calls.fetch_add(1, Ordering::SeqCst);
    let mut probabilities = vec![0.0; 28];
    probabilities[call % 28] = 0.8;
    Prediction::from_probabilities(probabilities)
  }
}

struct FixedClassifier(Result<Vec<f32>, ()>);

impl Classifier for FixedClassifier {
  fn predict(&self, _canvas: &RgbImage) -> Result<Prediction, ClassifierError> {
    match &self.0 {
      Ok(probabilities) => Prediction::from_probabilities(probabilities.clone()),
      Err(()) => Err(ClassifierError::Unavailable("模型未加载".to_string())),
    }
  }
}

/// 进入分类后阻塞，直到测试放行
struct GateClassifier {
  entered: Mutex<Sender<()>>,
  release: Mutex<Receiver<()>>,
}

impl Classifier for GateClassifier {
  fn predict(&self, _canvas: &RgbImage) -> Result<Prediction, ClassifierError> {
    let _ = self.entered.lock().send(());
    let _ = self.release.lock().recv();
    Prediction::from_probabilities(vec![0.1, 0.9])
  }
}

struct ManualClock {
  base: Instant,
  elapsed: Mutex<Duration>,
}

impl ManualClock {
  fn new() -> Self {
    Self {
      base: Instant::now(),
      elapsed: Mutex::new(Duration::ZERO),
    }
  }

  fn advance(&self, by: Duration) {
    *self.elapsed.lock() += by;
  }
}

impl Clock for &ManualClock {
  fn now(&self) -> Instant {
    self.base + *self.elapsed.lock()
  }
}

fn frame() -> Frame {
  Frame::new(RgbImage::from_pixel(640, 480, Rgb([180, 140, 120])), 0)
}

/// 包围框 (100, 100, 80, 160) 内的一只手，9 号关键点位于中心 (140, 180)
fn hand_with(count: usize) -> DetectedHand {
  let landmarks = (0..count)
    .map(|i| {
      if i == 9 {
        Landmark::new(i, 140, 180)
      } else {
        Landmark::new(i, 100 + (i as i32 * 4) % 80, 100 + i as i32 * 7)
      }
    })
    .collect();
  DetectedHand::new(BoundingBox::new(100, 100, 80, 160), landmarks)
}

fn session_with<C: Classifier>(
  config: PipelineConfig,
  hands: Vec<DetectedHand>,
  classifier: C,
) -> RecognitionSession<FixedDetector, C> {
  RecognitionSession::new(config, FixedDetector(hands), classifier, Labels::default())
}

#[test]
fn recognizes_full_hand() {
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    SequenceClassifier::default(),
  );
  let report = session.process(&frame());

  let result = report.outcome.result().expect("应当识别成功");
  assert_eq!(result.label, "أ");
  assert!((result.confidence - 0.8).abs() < 1e-6);

  let canvas = report.canvas.as_ref().expect("应当生成画布");
  assert_eq!(canvas.image.dimensions(), (300, 300));
  assert_eq!(report.points.len(), 21);
  assert_eq!(session.history(), vec![result.clone()]);

  let response = report.response();
  assert!(response.hand_detected);
  assert_eq!(response.text, "أ");
}

#[test]
fn bbox_center_lands_on_canvas_center() {
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    SequenceClassifier::default(),
  );
  let report = session.process(&frame());
  let center = report
    .points
    .iter()
    .find(|p| p.index == 9)
    .expect("中心关键点应当被绘制");
  assert_eq!((center.x, center.y), (150, 150));
}

#[test]
fn no_hand_skips_classifier() {
  let session = session_with(PipelineConfig::default(), vec![], SequenceClassifier::default());
  let report = session.process(&frame());
  assert_eq!(report.outcome, RecognitionOutcome::NoHand);
  assert!(!report.response().hand_detected);
  assert!(session.history().is_empty());
}

#[test]
fn too_few_landmarks_is_unreliable() {
  let classifier = SequenceClassifier::default();
  let session = session_with(PipelineConfig::default(), vec![hand_with(14)], classifier);
  let report = session.process(&frame());
  assert_eq!(
    report.outcome,
    RecognitionOutcome::Unreliable { landmarks: 14 }
  );
  let response = report.response();
  assert!(response.hand_detected);
  assert_eq!(response.text, "");
  assert!(report.canvas.is_none());
  assert!(session.history().is_empty());
}

#[test]
fn cooldown_suppresses_rapid_repeats() {
  let clock = ManualClock::new();
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    SequenceClassifier::default(),
  )
  .with_clock(&clock);

  let first = session.process(&frame());
  assert!(first.outcome.result().is_some());

  clock.advance(Duration::from_millis(200));
  let second = session.process(&frame());
  assert_eq!(second.outcome, RecognitionOutcome::CoolingDown);
  assert_eq!(second.response().text, "");
  assert!(second.response().hand_detected);

  clock.advance(Duration::from_millis(900));
  let third = session.process(&frame());
  assert_eq!(third.outcome.text(), "ب");
  assert_eq!(session.history().len(), 2);
}

#[test]
fn history_is_bounded() {
  let config = PipelineConfig::default()
    .with_cooldown(Duration::ZERO)
    .with_history_capacity(3);
  let session = session_with(config, vec![hand_with(21)], SequenceClassifier::default());
  for _ in 0..5 {
    session.process(&frame());
  }
  let labels: Vec<String> = session.history().into_iter().map(|r| r.label).collect();
  assert_eq!(labels, vec!["ت", "ث", "ج"]);
  assert_eq!(session.last_result().map(|r| r.label).as_deref(), Some("ج"));
}

#[test]
fn second_frame_while_processing_is_busy() {
  let (entered_tx, entered_rx) = mpsc::channel();
  let (release_tx, release_rx) = mpsc::channel();
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    GateClassifier {
      entered: Mutex::new(entered_tx),
      release: Mutex::new(release_rx),
    },
  );

  thread::scope(|scope| {
    let first = scope.spawn(|| session.process(&frame()));
    entered_rx.recv().unwrap();
    assert!(session.is_busy());

    let second = session.process(&frame());
    assert_eq!(second.outcome, RecognitionOutcome::Busy);
    assert_eq!(second.response().status, "busy");
    assert!(session.history().is_empty());

    release_tx.send(()).unwrap();
    let first = first.join().unwrap();
    assert_eq!(first.outcome.text(), "ب");
  });

  assert!(!session.is_busy());
  assert_eq!(session.history().len(), 1);
}

#[test]
fn classifier_failure_is_unclassified() {
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    FixedClassifier(Err(())),
  );
  let report = session.process(&frame());
  assert_eq!(report.outcome, RecognitionOutcome::Unclassified);
  assert_eq!(report.response().text, "");
  assert_eq!(report.response().confidence, Some(0.0));
  assert!(report.canvas.is_some());
  assert!(session.history().is_empty());
  assert!(!session.is_busy());
}

#[test]
fn index_without_label_is_unclassified() {
  let mut probabilities = vec![0.0; 30];
  probabilities[29] = 1.0;
  let session = session_with(
    PipelineConfig::default(),
    vec![hand_with(21)],
    FixedClassifier(Ok(probabilities)),
  );
  assert_eq!(
    session.process(&frame()).outcome,
    RecognitionOutcome::Unclassified
  );
}

#[test]
fn low_confidence_is_unclassified() {
  let config = PipelineConfig::default().with_confidence_threshold(0.5);
  let session = session_with(
    config,
    vec![hand_with(21)],
    FixedClassifier(Ok(vec![0.4, 0.3, 0.3])),
  );
  assert_eq!(
    session.process(&frame()).outcome,
    RecognitionOutcome::Unclassified
  );
  assert!(session.history().is_empty());
}

#[test]
fn degenerate_and_clipped_boxes_are_rejected() {
  let mut degenerate = hand_with(21);
  degenerate.bbox = BoundingBox::new(100, 100, 0, 160);
  let session = session_with(
    PipelineConfig::default(),
    vec![degenerate],
    SequenceClassifier::default(),
  );
  let report = session.process(&frame());
  assert!(matches!(
    report.outcome,
    RecognitionOutcome::Rejected(NormalizeError::DegenerateBoundingBox { .. })
  ));
  assert!(!report.response().hand_detected);

  // 扩展后仅剩 5 像素宽位于画面内
  let mut clipped = hand_with(21);
  clipped.bbox = BoundingBox::new(655, 100, 80, 160);
  let session = session_with(
    PipelineConfig::default(),
    vec![clipped],
    SequenceClassifier::default(),
  );
  let report = session.process(&frame());
  assert!(matches!(
    report.outcome,
    RecognitionOutcome::Rejected(NormalizeError::InsufficientHandRegion { .. })
  ));
  assert!(report.response().hand_detected);
  assert_eq!(report.response().status, "rejected");
}

#[test]
fn extreme_boxes_are_rejected_per_frame() {
  let boxes = [
    BoundingBox::new(0, 0, i32::MAX, 100),
    BoundingBox::new(i32::MIN, i32::MIN, 100, 100),
    BoundingBox::new(i32::MAX - 5, 0, 5, 100),
  ];
  for bbox in boxes {
    let mut hand = hand_with(21);
    hand.bbox = bbox;
    hand.landmarks[0] = Landmark::new(0, i32::MIN, i32::MAX);
    let session = session_with(
      PipelineConfig::default(),
      vec![hand],
      SequenceClassifier::default(),
    );

    let report = session.process(&frame());
    assert!(
      matches!(
        report.outcome,
        RecognitionOutcome::Rejected(NormalizeError::DegenerateBoundingBox { .. })
      ),
      "{bbox:?}: {:?}",
      report.outcome
    );
    assert!(!report.response().hand_detected);
    assert!(!session.is_busy());
    assert!(session.history().is_empty());
  }
}

#[test]
fn sentence_is_kept_per_session() {
  let session = session_with(PipelineConfig::default(), vec![], SequenceClassifier::default());
  session.append_to_sentence("أ");
  session.append_to_sentence("ن");
  assert_eq!(session.append_to_sentence("ا"), "أنا");
  assert_eq!(session.sentence(), "أنا");
  session.clear_sentence();
  assert_eq!(session.sentence(), "");
}

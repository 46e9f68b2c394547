// 该文件是 Ishara （手语识别） 项目的一部分。
// tests/dataset_store.rs - 数据集存储集成测试
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

use image::{Rgb, RgbImage};

use ishara::dataset::{DatasetError, DatasetImage, DatasetStore, SaveSummary, SignBatch};

fn canvas_image(index: usize) -> DatasetImage {
  let canvas = RgbImage::from_pixel(300, 300, Rgb([255, 255, 255]));
  DatasetImage::from_canvas(&canvas)
    .unwrap()
    .with_timestamp(format!("2026-01-01T00:00:0{}.000Z", index))
}

#[test]
fn batch_save_tolerates_bad_images() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path());

  let batches = vec![
    SignBatch::new(
      "ب",
      vec![
        canvas_image(0),
        DatasetImage::from_data_url("data:image/jpeg;base64,@@not-base64@@"),
        canvas_image(2),
      ],
    ),
    SignBatch::new("أ", vec![canvas_image(0)]),
    // 全部失败的手势不计入
    SignBatch::new("ت", vec![DatasetImage::from_data_url("%%%")]),
    // 非法标签整体跳过
    SignBatch::new("../escape", vec![canvas_image(0)]),
  ];

  let summary = store.save_dataset(&batches).unwrap();
  assert_eq!(
    summary,
    SaveSummary {
      total_images: 3,
      total_signs: 2,
    }
  );

  let saved = dir.path().join("ب").join("image_2026-01-01T00-00-02-000Z_2.jpg");
  assert!(saved.is_file());
  assert!(!dir.path().join("escape").exists());
}

#[test]
fn empty_request_is_rejected() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path());
  assert!(matches!(
    store.save_dataset(&[]),
    Err(DatasetError::EmptyRequest)
  ));
  assert!(matches!(
    store.save_dataset(&[SignBatch::new("ب", vec![])]),
    Err(DatasetError::EmptyRequest)
  ));
}

#[test]
fn stats_sorted_by_image_count() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path());

  // 数据集目录不存在时统计为空
  let missing = DatasetStore::new(dir.path().join("missing"));
  assert_eq!(missing.stats().unwrap().total_signs, 0);

  store
    .save_batch(&SignBatch::new("أ", vec![canvas_image(0)]))
    .unwrap();
  store
    .save_batch(&SignBatch::new(
      "ب",
      vec![canvas_image(0), canvas_image(1), canvas_image(2)],
    ))
    .unwrap();
  std::fs::create_dir_all(dir.path().join("empty")).unwrap();
  std::fs::write(dir.path().join("ب").join("notes.txt"), "ignored").unwrap();

  let stats = store.stats().unwrap();
  assert_eq!(stats.total_signs, 2);
  assert_eq!(stats.total_images, 4);
  assert!(stats.dataset_size > 0);
  let order: Vec<(&str, usize)> = stats
    .signs_data
    .iter()
    .map(|s| (s.sign.as_str(), s.image_count))
    .collect();
  assert_eq!(order, vec![("ب", 3), ("أ", 1)]);
  assert!(!stats.signs_data[0].last_updated.is_empty());
}

#[test]
fn delete_sign_removes_images_and_directory() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path());
  store
    .save_batch(&SignBatch::new("ج", vec![canvas_image(0), canvas_image(1)]))
    .unwrap();

  assert_eq!(store.delete_sign("ج").unwrap(), 2);
  assert!(!dir.path().join("ج").exists());
  assert!(matches!(
    store.delete_sign("ج"),
    Err(DatasetError::SignNotFound(_))
  ));
  assert!(matches!(
    store.delete_sign(".."),
    Err(DatasetError::InvalidLabel(_))
  ));
}

#[test]
fn export_keeps_sign_folders() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path().join("dataset"));
  store
    .save_batch(&SignBatch::new("ب", vec![canvas_image(0), canvas_image(1)]))
    .unwrap();
  store
    .save_batch(&SignBatch::new("أ", vec![canvas_image(2)]))
    .unwrap();
  std::fs::write(store.root().join("ب").join("notes.txt"), "ignored").unwrap();
  std::fs::write(store.root().join("README.md"), "ignored").unwrap();

  let archive_path = dir.path().join("dataset.zip");
  let exported = store
    .export(std::fs::File::create(&archive_path).unwrap())
    .unwrap();
  assert_eq!(exported, 3);

  let mut archive = zip::ZipArchive::new(std::fs::File::open(&archive_path).unwrap()).unwrap();
  let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
  names.sort();
  assert_eq!(
    names,
    vec![
      "أ/image_2026-01-01T00-00-02-000Z_0.jpg",
      "ب/image_2026-01-01T00-00-00-000Z_0.jpg",
      "ب/image_2026-01-01T00-00-01-000Z_1.jpg",
    ]
  );

  let name = "ب/image_2026-01-01T00-00-01-000Z_1.jpg";
  let mut entry = archive.by_name(name).unwrap();
  assert_eq!(entry.compression(), zip::CompressionMethod::Deflated);
  let mut bytes = Vec::new();
  std::io::Read::read_to_end(&mut entry, &mut bytes).unwrap();
  let original = std::fs::read(store.root().join(name)).unwrap();
  assert_eq!(bytes, original);
}

#[test]
fn export_without_dataset_fails() {
  let dir = tempfile::tempdir().unwrap();
  let store = DatasetStore::new(dir.path().join("missing"));
  let buffer = std::io::Cursor::new(Vec::new());
  assert!(matches!(
    store.export(buffer),
    Err(DatasetError::NoDataset(_))
  ));
}

#[cfg(feature = "directory_record")]
mod directory_record {
  use std::convert::Infallible;

  use image::{Rgb, RgbImage};
  use ishara::{
    config::PipelineConfig,
    dataset::DatasetStore,
    detector::Detector,
    hand::{BoundingBox, DetectedHand, Landmark},
    input::Frame,
    model::{CyclingClassifier, Labels},
    output::{DirectoryRecordOutput, Render},
    recognition::{RecognitionSession, Recognize},
  };

  struct FixedDetector;

  impl Detector for FixedDetector {
    type Error = Infallible;

    fn detect(&self, _frame: &Frame) -> Result<Vec<DetectedHand>, Self::Error> {
      let landmarks = (0..21)
        .map(|i| Landmark::new(i, 100 + i as i32 * 3, 100 + i as i32 * 7))
        .collect();
      Ok(vec![DetectedHand::new(
        BoundingBox::new(100, 100, 80, 160),
        landmarks,
      )])
    }
  }

  #[test]
  fn records_canvas_with_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let session = RecognitionSession::new(
      PipelineConfig::default(),
      FixedDetector,
      CyclingClassifier::default(),
      Labels::default(),
    );
    let output = DirectoryRecordOutput::new(dir.path())
      .with_label("د")
      .with_record(true);

    let frame = Frame::new(RgbImage::from_pixel(640, 480, Rgb([90, 90, 90])), 0);
    let report = session.process(&frame);
    output.render_result(&frame, &report).unwrap();

    let sign_dir = dir.path().join("د");
    let mut files: Vec<String> = std::fs::read_dir(&sign_dir)
      .unwrap()
      .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    files.sort();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("_1.jpg"));
    assert!(files[1].ends_with("_1.json"));

    let record: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(sign_dir.join(&files[1])).unwrap()).unwrap();
    assert_eq!(record["label"], "د");
    assert_eq!(record["canvas_size"], 300);
    assert_eq!(record["points"].as_array().unwrap().len(), 21);

    let stats = DatasetStore::new(dir.path()).stats().unwrap();
    assert_eq!(stats.total_images, 1);
  }
}

// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// tests/classify.rs - 端到端分类流程测试
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

use fenlei::{
  aggregate::Strategy,
  category::MacroCategory,
  config::{Config, ConfigurationError},
  geometry::{Rect, ScaleContext, SourceSpace, to_device_space, to_source_space},
  observation::{InferencePayload, RawObservation},
  pipeline::Pipeline,
};

fn pipeline_with(config: Config) -> Pipeline {
  Pipeline::new(&config.into_settings().unwrap())
}

fn config_for(strategy: Strategy) -> Config {
  Config {
    strategy: strategy.name().to_string(),
    ..Config::default()
  }
}

#[test]
fn bottle_and_tissue_sum_all() {
  let response = pipeline_with(Config::default())
    .classify(vec![
      RawObservation::new("瓶子-可回收物", 0.9),
      RawObservation::new("纸巾-其他垃圾", 0.3),
    ])
    .unwrap();

  let scores = &response.scores_by_category;
  assert_eq!(scores.recyclable_item, 0.9);
  assert_eq!(scores.other_waste, 0.3);
  assert_eq!(scores.kitchen_waste, 0.0);
  assert_eq!(scores.hazardous_waste, 0.0);
  assert_eq!(response.major_category, Some(MacroCategory::RecyclableItem));
  assert!(response.is_recyclable);
}

#[test]
fn empty_request_for_every_strategy() {
  for strategy in Strategy::ALL {
    let response = pipeline_with(config_for(strategy))
      .classify(Vec::new())
      .unwrap();
    assert_eq!(response.major_category, None);
    assert_eq!(response.scores_by_category.total(), 0.0);
    assert!(!response.is_recyclable);
    assert!(response.annotated_observations.is_empty());
  }
}

#[test]
fn top_k_of_one_matches_top_1_max() {
  let observations = vec![
    RawObservation::new("果皮-厨余垃圾", 0.5),
    RawObservation::new("瓶子-可回收物", 0.9),
    RawObservation::new("电池-有害垃圾", 0.2),
  ];

  let top_k = pipeline_with(Config {
    top_k: 1,
    ..config_for(Strategy::TopKSum)
  })
  .classify(observations.clone())
  .unwrap();
  let top_1 = pipeline_with(config_for(Strategy::Top1Max))
    .classify(observations)
    .unwrap();

  assert_eq!(top_k.scores_by_category, top_1.scores_by_category);
  assert_eq!(top_k.major_category, top_1.major_category);
  assert_eq!(top_1.scores_by_category.recyclable_item, 0.9);
  assert_eq!(
    top_1
      .scores_by_category
      .iter()
      .filter(|(_, score)| *score > 0.0)
      .count(),
    1
  );
}

#[test]
fn normalized_sum_totals_one() {
  let response = pipeline_with(config_for(Strategy::NormalizedSum))
    .classify(vec![
      RawObservation::new("果皮-厨余垃圾", 3.0 / 7.0),
      RawObservation::new("瓶子-可回收物", 0.8),
      RawObservation::new("纸巾-其他垃圾", 0.05),
    ])
    .unwrap();
  assert!((response.scores_by_category.total() - 1.0).abs() < 1e-5);
  assert_eq!(response.major_category, Some(MacroCategory::RecyclableItem));
}

#[test]
fn equal_scores_break_ties_by_priority() {
  for _ in 0..3 {
    let response = pipeline_with(Config::default())
      .classify(vec![
        RawObservation::new("纸巾-其他垃圾", 0.4),
        RawObservation::new("果皮-厨余垃圾", 0.4),
        RawObservation::new("电池-有害垃圾", 0.4),
      ])
      .unwrap();
    assert_eq!(response.major_category, Some(MacroCategory::HazardousWaste));
    assert!(!response.is_recyclable);
  }
}

#[test]
fn configured_recyclable_key_drives_the_flag() {
  let config = Config::from_json(r#"{"recyclable_key": "kitchen-waste"}"#).unwrap();
  let response = pipeline_with(config)
    .classify(vec![RawObservation::new("果皮-厨余垃圾", 0.7)])
    .unwrap();
  assert!(response.is_recyclable);
}

#[test]
fn alias_overrides_come_from_config() {
  let config = Config::from_json(r#"{"aliases": {"香蕉皮": "kitchen-waste"}}"#).unwrap();
  let pipeline = pipeline_with(config);
  let response = pipeline
    .classify(vec![RawObservation::new("香蕉皮", 0.6)])
    .unwrap();
  assert_eq!(response.major_category, Some(MacroCategory::KitchenWaste));
}

#[test]
fn invalid_configuration_fails_at_startup() {
  assert!(matches!(
    config_for_name("majority-vote").into_settings(),
    Err(ConfigurationError::UnknownStrategy(_))
  ));
  assert!(matches!(
    Config::from_json(r#"{"aliases": {"香蕉皮": "compost"}}"#)
      .unwrap()
      .into_settings(),
    Err(ConfigurationError::Category(_))
  ));
  assert!(matches!(
    Config::from_json(r#"{"min_prob": 1.5}"#).unwrap().into_settings(),
    Err(ConfigurationError::OutOfRange { .. })
  ));
}

fn config_for_name(name: &str) -> Config {
  Config {
    strategy: name.to_string(),
    ..Config::default()
  }
}

#[test]
fn unknown_label_is_reported_not_dropped() {
  let err = pipeline_with(Config::default())
    .classify(vec![
      RawObservation::new("瓶子-可回收物", 0.9),
      RawObservation::new("unidentified object", 0.4),
    ])
    .unwrap_err();
  assert!(!err.is_client_error());
}

#[test]
fn detection_payload_end_to_end() {
  let payload = InferencePayload::from_json(
    r#"{
      "detections": [
        {"class_id": 0, "confidence": 0.88, "bbox": [120.0, 80.0, 360.0, 400.0]},
        {"class_id": 1, "confidence": 0.41, "bbox": [400.0, 300.0, 520.0, 460.0]}
      ],
      "names": {"0": "易拉罐-可回收物", "1": "电池-有害垃圾"}
    }"#,
  )
  .unwrap();
  let observations = payload.into_observations().unwrap();

  let mut config = Config::default();
  config.display.target_width = 640;
  config.display.device_pixel_ratio = 2.0;
  let pipeline = pipeline_with(config);
  let response = pipeline.classify(observations).unwrap();
  assert_eq!(response.major_category, Some(MacroCategory::RecyclableItem));

  let ctx = pipeline.scale_context(1280, 960).unwrap();
  let (boxes, captions) = response.device_annotations(&ctx);
  assert_eq!(boxes[0].to_array(), [120.0, 80.0, 360.0, 400.0]);
  assert_eq!(boxes[1].to_array(), [400.0, 300.0, 520.0, 460.0]);
  assert_eq!(captions[0], "易拉罐 可回收物 88%");
  assert_eq!(captions[1], "电池 有害垃圾 41%");
}

#[test]
fn device_round_trip_stays_within_one_pixel() {
  let bbox = Rect::<SourceSpace>::new(13.3, 7.9, 1017.6, 733.1);
  for source_width in [640, 1000, 1920, 4032] {
    for dpr in [1.0, 2.0, 3.0] {
      let ctx = ScaleContext::new(source_width, 640, dpr).unwrap();
      let back = to_source_space(&to_device_space(&bbox, &ctx), &ctx);
      let tolerance = 1.0 / (ctx.source_to_display() * dpr);
      for (a, b) in bbox.to_array().into_iter().zip(back.to_array()) {
        assert!((a - b).abs() <= tolerance, "{} vs {}", a, b);
      }
    }
  }
}

#[test]
fn zero_width_image_is_rejected_before_transform() {
  let pipeline = pipeline_with(Config::default());
  assert!(pipeline.scale_context(0, 480).is_err());
  assert!(ScaleContext::new(0, 640, 1.0).is_err());
}

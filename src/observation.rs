// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/observation.rs - 推理结果输入格式
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

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{Rect, SourceSpace};

/// 推理服务给出的单条结果：检测模式带框，分类模式不带框
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObservation {
  pub label: String,
  pub score: f32,
  #[serde(rename = "box", default, skip_serializing_if = "Option::is_none")]
  pub bbox: Option<Rect<SourceSpace>>,
}

impl RawObservation {
  pub fn new(label: impl Into<String>, score: f32) -> Self {
    Self {
      label: label.into(),
      score,
      bbox: None,
    }
  }

  pub fn with_box(mut self, bbox: Rect<SourceSpace>) -> Self {
    self.bbox = Some(bbox);
    self
  }
}

#[derive(Error, Debug)]
pub enum ObservationError {
  #[error("得分无效: 标签 '{label}' 的得分 {score} 不在 [0, 1] 范围内")]
  InvalidScore { label: String, score: f32 },
  #[error("检测框无效: 标签 '{0}' 的坐标不是有限值")]
  InvalidBox(String),
  #[error("推理结果解析错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 检测服务原生的单条检测记录
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionRecord {
  pub class_id: u32,
  #[serde(default)]
  pub class_name: Option<String>,
  pub confidence: f32,
  pub bbox: [f32; 4],
}

/// 推理服务返回的三种载荷，类别名称表的键为类别编号的文本形式
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InferencePayload {
  Observations(Vec<RawObservation>),
  Detections {
    detections: Vec<DetectionRecord>,
    #[serde(default)]
    names: BTreeMap<String, String>,
  },
  Classification {
    probs: Vec<f32>,
    #[serde(default)]
    names: BTreeMap<String, String>,
  },
}

fn class_name(names: &BTreeMap<String, String>, class_id: u32) -> String {
  names
    .get(&class_id.to_string())
    .cloned()
    .unwrap_or_else(|| class_id.to_string())
}

impl InferencePayload {
  pub fn from_json(text: &str) -> Result<Self, ObservationError> {
    Ok(serde_json::from_str(text)?)
  }

  /// 统一转换为 [`RawObservation`] 并检查得分与坐标
  pub fn into_observations(self) -> Result<Vec<RawObservation>, ObservationError> {
    let observations = match self {
      InferencePayload::Observations(observations) => observations,
      InferencePayload::Detections { detections, names } => detections
        .into_iter()
        .map(|record| RawObservation {
          label: record
            .class_name
            .unwrap_or_else(|| class_name(&names, record.class_id)),
          score: record.confidence,
          bbox: Some(Rect::from_array(record.bbox)),
        })
        .collect(),
      InferencePayload::Classification { probs, names } => probs
        .into_iter()
        .enumerate()
        .map(|(id, prob)| RawObservation::new(class_name(&names, id as u32), prob))
        .collect(),
    };

    for observation in &observations {
      validate(observation)?;
    }
    Ok(observations)
  }
}

fn validate(observation: &RawObservation) -> Result<(), ObservationError> {
  if !(0.0..=1.0).contains(&observation.score) {
    return Err(ObservationError::InvalidScore {
      label: observation.label.clone(),
      score: observation.score,
    });
  }
  if let Some(bbox) = &observation.bbox
    && !bbox.is_finite()
  {
    return Err(ObservationError::InvalidBox(observation.label.clone()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn plain_observation_list() {
    let payload = InferencePayload::from_json(
      r#"[{"label": "瓶子-可回收物", "score": 0.9, "box": [1, 2, 30, 40]},
          {"label": "纸巾-其他垃圾", "score": 0.3}]"#,
    )
    .unwrap();
    let observations = payload.into_observations().unwrap();
    assert_eq!(observations.len(), 2);
    assert_eq!(
      observations[0].bbox.unwrap().to_array(),
      [1.0, 2.0, 30.0, 40.0]
    );
    assert!(observations[1].bbox.is_none());
  }

  #[test]
  fn detection_payload_resolves_names() {
    let payload = InferencePayload::from_json(
      r#"{"detections": [
            {"class_id": 3, "confidence": 0.8, "bbox": [10, 10, 20, 20]},
            {"class_id": 7, "class_name": "电池-有害垃圾", "confidence": 0.4, "bbox": [0, 0, 5, 5]},
            {"class_id": 9, "confidence": 0.5, "bbox": [0, 0, 5, 5]}
          ],
          "names": {"3": "易拉罐-可回收物"}}"#,
    )
    .unwrap();
    let labels: Vec<_> = payload
      .into_observations()
      .unwrap()
      .into_iter()
      .map(|o| o.label)
      .collect();
    assert_eq!(labels, ["易拉罐-可回收物", "电池-有害垃圾", "9"]);
  }

  #[test]
  fn classification_payload_has_no_boxes() {
    let payload = InferencePayload::from_json(
      r#"{"probs": [0.1, 0.7, 0.2], "names": {"0": "果皮-厨余垃圾", "1": "纸箱-可回收物", "2": "烟头-其他垃圾"}}"#,
    )
    .unwrap();
    let observations = payload.into_observations().unwrap();
    assert_eq!(observations.len(), 3);
    assert!(observations.iter().all(|o| o.bbox.is_none()));
    assert_eq!(observations[1].label, "纸箱-可回收物");
    assert_eq!(observations[1].score, 0.7);
  }

  #[test]
  fn out_of_range_score_is_rejected() {
    let payload = InferencePayload::from_json(r#"[{"label": "x", "score": 1.5}]"#).unwrap();
    assert!(matches!(
      payload.into_observations(),
      Err(ObservationError::InvalidScore { .. })
    ));
  }

  #[test]
  fn malformed_json_is_rejected() {
    assert!(matches!(
      InferencePayload::from_json(r#"{"foo": 1}"#),
      Err(ObservationError::Json(_))
    ));
  }
}

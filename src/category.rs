// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/category.rs - 垃圾大类定义
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

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 四个固定的垃圾大类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MacroCategory {
  KitchenWaste,
  RecyclableItem,
  OtherWaste,
  HazardousWaste,
}

/// 类别键不属于四个大类
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("未知的垃圾类别 '{key}' (原始标签: '{label}')")]
pub struct UnknownCategoryError {
  pub label: String,
  pub key: String,
}

impl MacroCategory {
  pub const ALL: [MacroCategory; 4] = [
    MacroCategory::KitchenWaste,
    MacroCategory::RecyclableItem,
    MacroCategory::OtherWaste,
    MacroCategory::HazardousWaste,
  ];

  /// 分数相同时的决胜顺序：可回收物 > 有害垃圾 > 厨余垃圾 > 其他垃圾
  pub const PRIORITY: [MacroCategory; 4] = [
    MacroCategory::RecyclableItem,
    MacroCategory::HazardousWaste,
    MacroCategory::KitchenWaste,
    MacroCategory::OtherWaste,
  ];

  pub fn key(self) -> &'static str {
    match self {
      MacroCategory::KitchenWaste => "kitchen-waste",
      MacroCategory::RecyclableItem => "recyclable-item",
      MacroCategory::OtherWaste => "other-waste",
      MacroCategory::HazardousWaste => "hazardous-waste",
    }
  }

  /// 中文显示名称，同时也是标签中使用的规范写法
  pub fn display_name(self) -> &'static str {
    match self {
      MacroCategory::KitchenWaste => "厨余垃圾",
      MacroCategory::RecyclableItem => "可回收物",
      MacroCategory::OtherWaste => "其他垃圾",
      MacroCategory::HazardousWaste => "有害垃圾",
    }
  }

  /// 决胜顺序中的名次，数值越小优先级越高
  pub fn priority_rank(self) -> usize {
    match self {
      MacroCategory::RecyclableItem => 0,
      MacroCategory::HazardousWaste => 1,
      MacroCategory::KitchenWaste => 2,
      MacroCategory::OtherWaste => 3,
    }
  }

  fn index(self) -> usize {
    match self {
      MacroCategory::KitchenWaste => 0,
      MacroCategory::RecyclableItem => 1,
      MacroCategory::OtherWaste => 2,
      MacroCategory::HazardousWaste => 3,
    }
  }

  /// 解析规范键（英文键不区分大小写，或中文名称）
  pub fn from_key(key: &str) -> Option<Self> {
    let key = key.trim();
    Self::ALL.into_iter().find(|category| {
      category.key().eq_ignore_ascii_case(key) || category.display_name() == key
    })
  }
}

impl FromStr for MacroCategory {
  type Err = UnknownCategoryError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::from_key(s).ok_or_else(|| UnknownCategoryError {
      label: s.to_string(),
      key: s.trim().to_string(),
    })
  }
}

impl fmt::Display for MacroCategory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.key())
  }
}

/// 每个大类的得分，始终包含全部四个键
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CategoryScores {
  pub kitchen_waste: f32,
  pub recyclable_item: f32,
  pub other_waste: f32,
  pub hazardous_waste: f32,
}

impl CategoryScores {
  pub fn get(&self, category: MacroCategory) -> f32 {
    self.as_array()[category.index()]
  }

  pub fn add(&mut self, category: MacroCategory, score: f32) {
    let slot = match category {
      MacroCategory::KitchenWaste => &mut self.kitchen_waste,
      MacroCategory::RecyclableItem => &mut self.recyclable_item,
      MacroCategory::OtherWaste => &mut self.other_waste,
      MacroCategory::HazardousWaste => &mut self.hazardous_waste,
    };
    *slot += score;
  }

  pub fn total(&self) -> f32 {
    self.as_array().iter().sum()
  }

  pub fn iter(&self) -> impl Iterator<Item = (MacroCategory, f32)> + '_ {
    MacroCategory::ALL
      .into_iter()
      .map(move |category| (category, self.get(category)))
  }

  fn as_array(&self) -> [f32; 4] {
    [
      self.kitchen_waste,
      self.recyclable_item,
      self.other_waste,
      self.hazardous_waste,
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_english_and_chinese_keys() {
    assert_eq!(
      MacroCategory::from_key("recyclable-item"),
      Some(MacroCategory::RecyclableItem)
    );
    assert_eq!(
      MacroCategory::from_key(" Hazardous-Waste "),
      Some(MacroCategory::HazardousWaste)
    );
    assert_eq!(
      MacroCategory::from_key("厨余垃圾"),
      Some(MacroCategory::KitchenWaste)
    );
    assert_eq!(MacroCategory::from_key("瓶子"), None);
  }

  #[test]
  fn unknown_key_is_an_error() {
    let err = "garden-waste".parse::<MacroCategory>().unwrap_err();
    assert_eq!(err.key, "garden-waste");
  }

  #[test]
  fn priority_order_is_fixed() {
    for (rank, category) in MacroCategory::PRIORITY.iter().enumerate() {
      assert_eq!(category.priority_rank(), rank);
    }
  }

  #[test]
  fn scores_serialize_with_all_four_keys() {
    let mut scores = CategoryScores::default();
    scores.add(MacroCategory::OtherWaste, 0.25);
    let value = serde_json::to_value(scores).unwrap();
    let object = value.as_object().unwrap();
    assert_eq!(object.len(), 4);
    assert_eq!(object["other-waste"], 0.25);
    assert_eq!(object["kitchen-waste"], 0.0);
  }
}

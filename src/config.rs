// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/config.rs - 启动配置
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
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{Level, debug};

use crate::{
  aggregate::{AggregationParams, Aggregator, DEFAULT_MIN_PROB, DEFAULT_TOP_K, Strategy},
  category::{MacroCategory, UnknownCategoryError},
  logging::parse_log_level,
  normalize::AliasTable,
};

#[derive(Error, Debug)]
pub enum ConfigurationError {
  #[error("未知的聚合策略: '{0}'")]
  UnknownStrategy(String),
  #[error("参数 {name} 超出范围: {value}")]
  OutOfRange { name: &'static str, value: String },
  #[error("类别配置错误: {0}")]
  Category(#[from] UnknownCategoryError),
  #[error("配置文件读取错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("配置文件解析错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 配置文件内容，所有字段都有默认值
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  #[serde(default = "default_strategy")]
  pub strategy: String,
  #[serde(default = "default_top_k")]
  pub top_k: usize,
  #[serde(default = "default_min_prob")]
  pub min_prob: f32,
  #[serde(default = "default_recyclable_key")]
  pub recyclable_key: String,
  /// 原始标签 -> 大类键
  #[serde(default)]
  pub aliases: BTreeMap<String, String>,
  /// 大类键 -> 关键词列表，覆盖该类别的默认关键词
  #[serde(default)]
  pub keywords: BTreeMap<String, Vec<String>>,
  #[serde(default)]
  pub display: DisplayConfig,
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct DisplayConfig {
  /// 显示容器宽度（CSS 像素）
  #[serde(default = "default_target_width")]
  pub target_width: u32,
  #[serde(default = "default_device_pixel_ratio")]
  pub device_pixel_ratio: f32,
}

fn default_strategy() -> String {
  Strategy::default().name().to_string()
}

fn default_top_k() -> usize {
  DEFAULT_TOP_K
}

fn default_min_prob() -> f32 {
  DEFAULT_MIN_PROB
}

fn default_recyclable_key() -> String {
  MacroCategory::RecyclableItem.key().to_string()
}

fn default_log_level() -> String {
  "info".to_string()
}

fn default_target_width() -> u32 {
  640
}

fn default_device_pixel_ratio() -> f32 {
  1.0
}

impl Default for Config {
  fn default() -> Self {
    Self {
      strategy: default_strategy(),
      top_k: default_top_k(),
      min_prob: default_min_prob(),
      recyclable_key: default_recyclable_key(),
      aliases: BTreeMap::new(),
      keywords: BTreeMap::new(),
      display: DisplayConfig::default(),
      log_level: default_log_level(),
    }
  }
}

impl Default for DisplayConfig {
  fn default() -> Self {
    Self {
      target_width: default_target_width(),
      device_pixel_ratio: default_device_pixel_ratio(),
    }
  }
}

impl DisplayConfig {
  pub fn validate(&self) -> Result<(), ConfigurationError> {
    if self.target_width == 0 {
      return Err(ConfigurationError::OutOfRange {
        name: "display.target_width",
        value: self.target_width.to_string(),
      });
    }
    if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
      return Err(ConfigurationError::OutOfRange {
        name: "display.device_pixel_ratio",
        value: self.device_pixel_ratio.to_string(),
      });
    }
    Ok(())
  }
}

impl Config {
  pub fn from_json(text: &str) -> Result<Self, ConfigurationError> {
    Ok(serde_json::from_str(text)?)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    Self::from_json(&text)
  }

  /// 校验并构建只读的运行配置；任何错误都应在启动时终止进程
  pub fn into_settings(self) -> Result<Settings, ConfigurationError> {
    let strategy: Strategy = self.strategy.parse()?;
    let recyclable: MacroCategory = self.recyclable_key.parse()?;
    let params = AggregationParams {
      top_k: self.top_k,
      min_prob: self.min_prob,
    };
    self.display.validate()?;
    let log_level =
      parse_log_level(&self.log_level).ok_or_else(|| ConfigurationError::OutOfRange {
        name: "log_level",
        value: self.log_level.clone(),
      })?;

    let table = self
      .keywords
      .into_iter()
      .fold(
        AliasTable::builder().aliases(self.aliases),
        |builder, (key, tokens)| builder.keywords(key, tokens),
      )
      .build()?;

    let aggregator = Aggregator::new(Arc::new(table), strategy, params, recyclable)?;
    debug!(
      "配置校验通过: 策略 {}, top_k {}, min_prob {}, 可回收类别 {}",
      strategy, params.top_k, params.min_prob, recyclable
    );

    Ok(Settings {
      aggregator,
      display: self.display,
      log_level,
    })
  }
}

/// 校验后的运行配置，进程生命周期内不再改变
#[derive(Debug, Clone)]
pub struct Settings {
  pub aggregator: Aggregator,
  pub display: DisplayConfig,
  pub log_level: Level,
}

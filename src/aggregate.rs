// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/aggregate.rs - 大类得分聚合
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
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
  category::{CategoryScores, MacroCategory, UnknownCategoryError},
  config::ConfigurationError,
  normalize::AliasTable,
  observation::RawObservation,
};

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_PROB: f32 = 0.0;

/// 细粒度得分到大类得分的归约规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
  /// 所有观测得分按大类累加
  #[default]
  SumAll,
  /// 只累加得分最高的 K 个观测
  TopKSum,
  /// 只取得分最高的一个观测
  #[serde(rename = "top-1-max")]
  Top1Max,
  /// 先把得分归一化到总和为 1 再累加
  NormalizedSum,
}

impl Strategy {
  pub const ALL: [Strategy; 4] = [
    Strategy::SumAll,
    Strategy::TopKSum,
    Strategy::Top1Max,
    Strategy::NormalizedSum,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Strategy::SumAll => "sum-all",
      Strategy::TopKSum => "top-k-sum",
      Strategy::Top1Max => "top-1-max",
      Strategy::NormalizedSum => "normalized-sum",
    }
  }
}

impl FromStr for Strategy {
  type Err = ConfigurationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let name = s.trim();
    Self::ALL
      .into_iter()
      .find(|strategy| strategy.name().eq_ignore_ascii_case(name))
      .ok_or_else(|| ConfigurationError::UnknownStrategy(s.to_string()))
  }
}

impl<'de> Deserialize<'de> for Strategy {
  fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let name = String::deserialize(deserializer)?;
    name.parse().map_err(serde::de::Error::custom)
  }
}

impl fmt::Display for Strategy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregationParams {
  pub top_k: usize,
  /// 低于该得分的观测在任何策略之前被丢弃
  pub min_prob: f32,
}

impl Default for AggregationParams {
  fn default() -> Self {
    Self {
      top_k: DEFAULT_TOP_K,
      min_prob: DEFAULT_MIN_PROB,
    }
  }
}

impl AggregationParams {
  pub fn validate(&self) -> Result<(), ConfigurationError> {
    if self.top_k == 0 {
      return Err(ConfigurationError::OutOfRange {
        name: "top_k",
        value: self.top_k.to_string(),
      });
    }
    if !(0.0..=1.0).contains(&self.min_prob) {
      return Err(ConfigurationError::OutOfRange {
        name: "min_prob",
        value: self.min_prob.to_string(),
      });
    }
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
  pub scores_by_category: CategoryScores,
  /// 仅当过滤后没有任何观测时为空
  pub major_category: Option<MacroCategory>,
  pub is_recyclable: bool,
}

// 每个策略返回大类得分以及参与计分的大类
type Bucketed = (CategoryScores, Vec<MacroCategory>);

fn sum_all(scored: &[(MacroCategory, f32)]) -> Bucketed {
  let mut scores = CategoryScores::default();
  let mut contributors = Vec::with_capacity(MacroCategory::ALL.len());
  for &(category, score) in scored {
    scores.add(category, score);
    if !contributors.contains(&category) {
      contributors.push(category);
    }
  }
  (scores, contributors)
}

// 按得分降序；得分相同时按大类决胜顺序
fn sorted_desc(scored: &[(MacroCategory, f32)]) -> Vec<(MacroCategory, f32)> {
  let mut sorted = scored.to_vec();
  sorted.sort_by(|a, b| {
    b.1
      .total_cmp(&a.1)
      .then_with(|| a.0.priority_rank().cmp(&b.0.priority_rank()))
  });
  sorted
}

fn top_k_sum(scored: &[(MacroCategory, f32)], top_k: usize) -> Bucketed {
  let mut sorted = sorted_desc(scored);
  sorted.truncate(top_k);
  sum_all(&sorted)
}

fn top_1_max(scored: &[(MacroCategory, f32)]) -> Bucketed {
  top_k_sum(scored, 1)
}

fn normalized_sum(scored: &[(MacroCategory, f32)]) -> Bucketed {
  let total: f32 = scored.iter().map(|(_, score)| score).sum();
  if total > 0.0 {
    let rescaled: Vec<_> = scored
      .iter()
      .map(|&(category, score)| (category, score / total))
      .collect();
    sum_all(&rescaled)
  } else {
    sum_all(scored)
  }
}

/// 在参与计分的大类中选得分严格最大者；并列时按固定顺序
/// （可回收物 > 有害垃圾 > 厨余垃圾 > 其他垃圾）决胜。
fn select_major(scores: &CategoryScores, contributors: &[MacroCategory]) -> Option<MacroCategory> {
  MacroCategory::PRIORITY
    .into_iter()
    .filter(|category| contributors.contains(category))
    .fold(None, |best: Option<MacroCategory>, category| match best {
      Some(current) if scores.get(category) <= scores.get(current) => Some(current),
      _ => Some(category),
    })
}

/// 对已归类的 (大类, 得分) 序列做过滤与归约
pub fn reduce(
  scored: &[(MacroCategory, f32)],
  strategy: Strategy,
  params: &AggregationParams,
) -> (CategoryScores, Option<MacroCategory>) {
  let kept: Vec<_> = scored
    .iter()
    .copied()
    .filter(|(_, score)| *score >= params.min_prob)
    .collect();
  if kept.len() < scored.len() {
    debug!(
      "按最低得分 {} 过滤掉 {} 个观测",
      params.min_prob,
      scored.len() - kept.len()
    );
  }

  let (scores, contributors) = match strategy {
    Strategy::SumAll => sum_all(&kept),
    Strategy::TopKSum => top_k_sum(&kept, params.top_k),
    Strategy::Top1Max => top_1_max(&kept),
    Strategy::NormalizedSum => normalized_sum(&kept),
  };
  let major = select_major(&scores, &contributors);
  (scores, major)
}

/// 聚合引擎：持有只读别名表与启动时确定的策略参数
#[derive(Debug, Clone)]
pub struct Aggregator {
  table: Arc<AliasTable>,
  strategy: Strategy,
  params: AggregationParams,
  recyclable: MacroCategory,
}

impl Aggregator {
  pub fn new(
    table: Arc<AliasTable>,
    strategy: Strategy,
    params: AggregationParams,
    recyclable: MacroCategory,
  ) -> Result<Self, ConfigurationError> {
    params.validate()?;
    Ok(Self {
      table,
      strategy,
      params,
      recyclable,
    })
  }

  pub fn table(&self) -> &AliasTable {
    &self.table
  }

  pub fn strategy(&self) -> Strategy {
    self.strategy
  }

  pub fn params(&self) -> &AggregationParams {
    &self.params
  }

  pub fn recyclable(&self) -> MacroCategory {
    self.recyclable
  }

  /// 把每个观测归一化为大类；任何一个标签无法归类即失败
  pub fn categorize(
    &self,
    observations: &[RawObservation],
  ) -> Result<Vec<MacroCategory>, UnknownCategoryError> {
    observations
      .iter()
      .map(|observation| self.table.normalize(&observation.label))
      .collect()
  }

  /// 对已归类的观测计算聚合结果，`categories` 与 `observations` 一一对应
  pub(crate) fn aggregate_categorized(
    &self,
    observations: &[RawObservation],
    categories: &[MacroCategory],
  ) -> AggregationResult {
    debug_assert_eq!(observations.len(), categories.len());
    let scored: Vec<_> = categories
      .iter()
      .copied()
      .zip(observations.iter().map(|o| o.score))
      .collect();
    let (scores_by_category, major_category) = reduce(&scored, self.strategy, &self.params);
    let result = AggregationResult {
      scores_by_category,
      major_category,
      is_recyclable: major_category == Some(self.recyclable),
    };
    debug!(
      "聚合完成 ({}): 主类别 {:?}, 可回收 {}",
      self.strategy, result.major_category, result.is_recyclable
    );
    result
  }

  pub fn aggregate(
    &self,
    observations: &[RawObservation],
  ) -> Result<AggregationResult, UnknownCategoryError> {
    let categories = self.categorize(observations)?;
    Ok(self.aggregate_categorized(observations, &categories))
  }
}

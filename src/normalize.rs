// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/normalize.rs - 细粒度标签归一化
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

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::category::{MacroCategory, UnknownCategoryError};

/// 标签分隔符：半角连字符、全角连字符以及各种破折号
pub const LABEL_SEPARATORS: &[char] = &[
  '-', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}', '\u{2014}', '\u{2015}', '\u{FE63}',
  '\u{FF0D}',
];

// 同义写法折叠到规范类别
const SYNONYMS: &[(&str, MacroCategory)] = &[
  ("其他垃圾", MacroCategory::OtherWaste),
  ("其它垃圾", MacroCategory::OtherWaste),
  ("other waste", MacroCategory::OtherWaste),
  ("other-waste", MacroCategory::OtherWaste),
  ("可回收", MacroCategory::RecyclableItem),
  ("可回收垃圾", MacroCategory::RecyclableItem),
  ("recyclable", MacroCategory::RecyclableItem),
];

const DEFAULT_ALIASES: &[(&str, MacroCategory)] = &[
  ("厨余", MacroCategory::KitchenWaste),
  ("湿垃圾", MacroCategory::KitchenWaste),
  ("food waste", MacroCategory::KitchenWaste),
  ("kitchen waste", MacroCategory::KitchenWaste),
  ("recyclables", MacroCategory::RecyclableItem),
  ("干垃圾", MacroCategory::OtherWaste),
  ("residual waste", MacroCategory::OtherWaste),
  ("有害", MacroCategory::HazardousWaste),
  ("hazardous", MacroCategory::HazardousWaste),
  ("battery", MacroCategory::HazardousWaste),
  ("电池", MacroCategory::HazardousWaste),
];

const DEFAULT_KEYWORDS: &[(MacroCategory, &[&str])] = &[
  (
    MacroCategory::RecyclableItem,
    &[
      "recyclable",
      "可回收",
      "plastic",
      "glass",
      "metal",
      "paper",
      "can",
      "bottle",
    ],
  ),
  (MacroCategory::HazardousWaste, &["有害", "hazardous", "battery"]),
  (MacroCategory::KitchenWaste, &["厨余", "kitchen", "food"]),
  (
    MacroCategory::OtherWaste,
    &["其他垃圾", "其它垃圾", "干垃圾", "other waste", "other-waste"],
  ),
];

fn fold_key(s: &str) -> String {
  s.trim().to_lowercase()
}

/// 取标签中第一个分隔符之前的部分；为空时退回完整标签
pub fn label_head(raw_label: &str) -> &str {
  let head = raw_label
    .split(LABEL_SEPARATORS)
    .next()
    .unwrap_or_default()
    .trim();
  if head.is_empty() {
    raw_label.trim()
  } else {
    head
  }
}

/// 别名表：启动时构建，之后只读
#[derive(Debug, Clone)]
pub struct AliasTable {
  aliases: HashMap<String, MacroCategory>,
  // 按决胜顺序排列
  keywords: Vec<(MacroCategory, Vec<String>)>,
}

impl Default for AliasTable {
  fn default() -> Self {
    let aliases = DEFAULT_ALIASES
      .iter()
      .map(|(alias, category)| (fold_key(alias), *category))
      .collect();
    let keywords = MacroCategory::PRIORITY
      .into_iter()
      .map(|category| {
        let tokens = DEFAULT_KEYWORDS
          .iter()
          .find(|(c, _)| *c == category)
          .map(|(_, tokens)| tokens.iter().map(|t| fold_key(t)).collect())
          .unwrap_or_default();
        (category, tokens)
      })
      .collect();
    Self { aliases, keywords }
  }
}

impl AliasTable {
  pub fn builder() -> AliasTableBuilder {
    AliasTableBuilder::default()
  }

  pub fn len(&self) -> usize {
    self.aliases.len()
  }

  pub fn is_empty(&self) -> bool {
    self.aliases.is_empty()
  }

  pub fn keywords(&self, category: MacroCategory) -> &[String] {
    self
      .keywords
      .iter()
      .find(|(c, _)| *c == category)
      .map(|(_, tokens)| tokens.as_slice())
      .unwrap_or_default()
  }

  // 精确别名 -> 同义折叠 -> 规范键
  fn resolve(&self, candidate: &str) -> Option<MacroCategory> {
    let folded = fold_key(candidate);
    if folded.is_empty() {
      return None;
    }
    if let Some(category) = self.aliases.get(&folded) {
      return Some(*category);
    }
    if let Some((_, category)) = SYNONYMS.iter().find(|(synonym, _)| *synonym == folded) {
      return Some(*category);
    }
    MacroCategory::from_key(&folded)
  }

  // 先尝试相邻尾部分段的连接（最长优先），再从后往前逐段尝试
  fn resolve_segments(&self, segments: &[&str]) -> Option<MacroCategory> {
    let joined = (0..segments.len().saturating_sub(1))
      .find_map(|start| self.resolve(&segments[start..].join("-")));
    joined.or_else(|| segments.iter().rev().find_map(|segment| self.resolve(segment)))
  }

  fn match_keywords(&self, raw_label: &str) -> Option<MacroCategory> {
    let lower = raw_label.to_lowercase();
    self
      .keywords
      .iter()
      .find(|(_, tokens)| tokens.iter().any(|token| lower.contains(token.as_str())))
      .map(|(category, _)| *category)
  }

  /// 把原始细粒度标签归一化为四个大类之一
  pub fn normalize(&self, raw_label: &str) -> Result<MacroCategory, UnknownCategoryError> {
    // 规范键本身可能带连字符（如 `other-waste`），先整体匹配
    if let Some(category) = self.resolve(raw_label) {
      trace!("标签 '{}' 整体归类为 {}", raw_label, category);
      return Ok(category);
    }

    let head = label_head(raw_label);
    if let Some(category) = self.resolve(head) {
      trace!("标签 '{}' 由首段 '{}' 归类为 {}", raw_label, head, category);
      return Ok(category);
    }

    // `物品-类别` 形式的标签，类别在后面的分段中
    let segments = raw_label
      .split(LABEL_SEPARATORS)
      .map(str::trim)
      .filter(|segment| !segment.is_empty() && *segment != head)
      .collect::<Vec<_>>();
    if let Some(category) = self.resolve_segments(&segments) {
      trace!("标签 '{}' 由后续分段归类为 {}", raw_label, category);
      return Ok(category);
    }

    if let Some(category) = self.match_keywords(raw_label) {
      debug!("标签 '{}' 由关键词启发式归类为 {}", raw_label, category);
      return Ok(category);
    }

    Err(UnknownCategoryError {
      label: raw_label.to_string(),
      key: head.to_string(),
    })
  }
}

/// 在默认别名表之上叠加外部覆盖项
#[derive(Debug, Default)]
pub struct AliasTableBuilder {
  aliases: Vec<(String, String)>,
  keywords: Vec<(String, Vec<String>)>,
}

impl AliasTableBuilder {
  pub fn alias(mut self, raw: impl Into<String>, category_key: impl Into<String>) -> Self {
    self.aliases.push((raw.into(), category_key.into()));
    self
  }

  pub fn aliases<I, K, V>(mut self, aliases: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    self
      .aliases
      .extend(aliases.into_iter().map(|(k, v)| (k.into(), v.into())));
    self
  }

  /// 替换某个类别的关键词列表
  pub fn keywords<I, T>(mut self, category_key: impl Into<String>, tokens: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<String>,
  {
    self.keywords.push((
      category_key.into(),
      tokens.into_iter().map(Into::into).collect(),
    ));
    self
  }

  /// 所有覆盖项的目标类别必须落在四个大类之内
  pub fn build(self) -> Result<AliasTable, UnknownCategoryError> {
    let mut table = AliasTable::default();

    for (raw, key) in self.aliases {
      let category = MacroCategory::from_key(&key).ok_or_else(|| UnknownCategoryError {
        label: raw.clone(),
        key: key.clone(),
      })?;
      let folded = fold_key(&raw);
      if folded.is_empty() {
        continue;
      }
      table.aliases.insert(folded, category);
    }

    for (key, tokens) in self.keywords {
      let category = MacroCategory::from_key(&key).ok_or_else(|| UnknownCategoryError {
        label: key.clone(),
        key: key.clone(),
      })?;
      let tokens = tokens
        .iter()
        .map(|t| fold_key(t))
        .filter(|t| !t.is_empty())
        .collect();
      if let Some(slot) = table.keywords.iter_mut().find(|(c, _)| *c == category) {
        slot.1 = tokens;
      }
    }

    debug!("别名表构建完成，共 {} 个别名", table.len());
    Ok(table)
  }
}

// 该文件是 Jingyi （镜衣） 项目的一部分。
// src/catalog.rs - 服装目录与推荐过滤
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::skin::color_recommendation;

/// 匹配所有肤色的特殊标签
pub const ANY_TONE: &str = "Any";
/// 不按类别过滤
pub const ALL_CATEGORIES: &str = "All";

#[derive(Error, Debug)]
pub enum CatalogError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("目录格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
  pub id: u32,
  pub name: String,
  pub category: String,
  /// 十六进制颜色，例如 `#000080`
  pub color: String,
  pub price: u32,
  pub skin_tone_match: Vec<String>,
}

impl CatalogItem {
  fn new(
    id: u32,
    name: &str,
    category: &str,
    color: &str,
    price: u32,
    skin_tone_match: &[&str],
  ) -> Self {
    Self {
      id,
      name: name.to_string(),
      category: category.to_string(),
      color: color.to_string(),
      price,
      skin_tone_match: skin_tone_match.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// 标签精确匹配（区分大小写），`Any` 匹配所有肤色
  pub fn matches_tone(&self, tone: &str) -> bool {
    self
      .skin_tone_match
      .iter()
      .any(|t| t == ANY_TONE || t == tone)
  }

  fn search_text(&self) -> String {
    format!("{} {} {}", self.name, self.category, self.color).to_lowercase()
  }
}

/// 启动时加载一次的只读目录
#[derive(Debug, Clone)]
pub struct Catalog {
  items: Vec<CatalogItem>,
}

impl Default for Catalog {
  fn default() -> Self {
    Self::new(vec![
      CatalogItem::new(1, "Classic White Shirt", "Formal", "#ffffff", 2500, &["Any"]),
      CatalogItem::new(2, "Navy Blue Blazer", "Formal", "#000080", 8500, &["Fair", "Wheatish"]),
      CatalogItem::new(3, "Casual Denim Shirt", "Casual", "#5b7c99", 1800, &["Any"]),
      CatalogItem::new(4, "Traditional Kurta", "Ethnic", "#d4af37", 3500, &["Dusky", "Deep", "Wheatish"]),
      CatalogItem::new(5, "Black Polo T-Shirt", "Casual", "#000000", 1200, &["Any"]),
      CatalogItem::new(6, "Olive Green Bomber", "Casual", "#556b2f", 4500, &["Wheatish", "Dusky"]),
      CatalogItem::new(7, "Charcoal Grey Trousers", "Formal", "#36454f", 3200, &["Any"]),
      CatalogItem::new(8, "Silk Sherwani", "Ethnic", "#800000", 12000, &["Dusky", "Wheatish"]),
      CatalogItem::new(9, "Linen Summer Shirt", "Casual", "#f5f5dc", 2200, &["Fair", "Wheatish"]),
      CatalogItem::new(10, "Suede Chelsea Boots", "Formal", "#8b4513", 6000, &["Any"]),
    ])
  }
}

impl Catalog {
  pub fn new(items: Vec<CatalogItem>) -> Self {
    Self { items }
  }

  pub fn items(&self) -> &[CatalogItem] {
    &self.items
  }

  pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
    Ok(Self::new(serde_json::from_str(json)?))
  }

  /// 从 JSON 数组文件加载，条目格式与 [`CatalogItem`] 一致
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    let catalog = Self::from_json_str(&content)?;
    info!(
      "从 {} 加载了 {} 个目录条目",
      path.as_ref().display(),
      catalog.items.len()
    );
    Ok(catalog)
  }
}

fn default_skin_tone() -> String {
  "Wheatish".to_string()
}

fn default_body_type() -> String {
  "Ectomorph".to_string()
}

fn default_category() -> String {
  ALL_CATEGORIES.to_string()
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RecommendationQuery {
  #[serde(default = "default_skin_tone")]
  pub skin_tone: String,
  #[serde(default = "default_body_type")]
  pub body_type: String,
  #[serde(default = "default_category")]
  pub category: String,
  #[serde(default)]
  pub prompt: String,
}

impl Default for RecommendationQuery {
  fn default() -> Self {
    Self {
      skin_tone: default_skin_tone(),
      body_type: default_body_type(),
      category: default_category(),
      prompt: String::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
  #[serde(rename = "recommendations")]
  pub items: Vec<CatalogItem>,
  pub suggested_colors: Vec<String>,
  pub body_advice: String,
}

/// 按类别、肤色、关键词三道过滤，保持目录原有顺序。
///
/// 关键词按空白切分后转小写，任一关键词命中名称、类别或颜色即通过。
pub fn filter(catalog: &Catalog, query: &RecommendationQuery) -> RecommendationResult {
  let keywords = query
    .prompt
    .to_lowercase()
    .split_whitespace()
    .map(str::to_string)
    .collect::<Vec<_>>();

  let items = catalog
    .items
    .iter()
    .filter(|item| query.category == ALL_CATEGORIES || item.category == query.category)
    .filter(|item| item.matches_tone(&query.skin_tone))
    .filter(|item| {
      if keywords.is_empty() {
        return true;
      }
      let text = item.search_text();
      keywords.iter().any(|k| text.contains(k.as_str()))
    })
    .cloned()
    .collect();

  RecommendationResult {
    items,
    suggested_colors: color_recommendation(&query.skin_tone)
      .iter()
      .map(|c| c.to_string())
      .collect(),
    body_advice: format!("Tailored fits showcase your {} build.", query.body_type),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn query(skin_tone: &str, category: &str, prompt: &str) -> RecommendationQuery {
    RecommendationQuery {
      skin_tone: skin_tone.to_string(),
      category: category.to_string(),
      prompt: prompt.to_string(),
      ..Default::default()
    }
  }

  fn ids(result: &RecommendationResult) -> Vec<u32> {
    result.items.iter().map(|i| i.id).collect()
  }

  #[test]
  fn test_formal_fair_keeps_catalog_order() {
    let result = filter(&Catalog::default(), &query("Fair", "Formal", ""));
    assert_eq!(ids(&result), vec![1, 2, 7, 10]);
    assert!(result.items.iter().all(|i| i.category == "Formal"));
    assert_eq!(
      result.suggested_colors,
      vec!["Royal Blue", "Deep Red", "Emerald Green", "Pastels"]
    );
  }

  #[test]
  fn test_keywords_are_or_combined() {
    let result = filter(&Catalog::default(), &query("Fair", "All", "blue boots"));
    let names: Vec<_> = result.items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Navy Blue Blazer", "Suede Chelsea Boots"]);
  }

  #[test]
  fn test_keywords_are_case_insensitive_and_match_color() {
    let result = filter(&Catalog::default(), &query("Dusky", "All", "  KURTA  "));
    assert_eq!(ids(&result), vec![4]);
    let result = filter(&Catalog::default(), &query("Fair", "All", "#000080"));
    assert_eq!(ids(&result), vec![2]);
    let result = filter(&Catalog::default(), &query("Deep", "All", "ethnic"));
    assert_eq!(ids(&result), vec![4]);
  }

  #[test]
  fn test_tone_match_is_exact() {
    let result = filter(&Catalog::default(), &query("fair", "Formal", ""));
    assert_eq!(ids(&result), vec![1, 7, 10]);
    assert_eq!(result.suggested_colors, vec!["Neutral Colors"]);
  }

  #[test]
  fn test_unknown_tone_only_gets_any_items() {
    let result = filter(&Catalog::default(), &query("Unknown", "All", ""));
    assert_eq!(ids(&result), vec![1, 3, 5, 7, 10]);
  }

  #[test]
  fn test_no_matches_and_empty_catalog() {
    let result = filter(&Catalog::default(), &query("Fair", "Ethnic", ""));
    assert!(result.items.is_empty());
    let result = filter(&Catalog::new(Vec::new()), &RecommendationQuery::default());
    assert!(result.items.is_empty());
    assert_eq!(result.body_advice, "Tailored fits showcase your Ectomorph build.");
  }

  #[test]
  fn test_query_defaults_from_partial_json() {
    let query: RecommendationQuery = serde_json::from_str(r#"{"prompt": "shirt"}"#).unwrap();
    assert_eq!(query.skin_tone, "Wheatish");
    assert_eq!(query.body_type, "Ectomorph");
    assert_eq!(query.category, "All");
    assert_eq!(query.prompt, "shirt");
  }

  #[test]
  fn test_catalog_from_json() {
    let catalog = Catalog::from_json_str(
      r##"[{"id": 42, "name": "Red Scarf", "category": "Accessory",
            "color": "#ff0000", "price": 900, "skin_tone_match": ["Deep"]}]"##,
    )
    .unwrap();
    assert_eq!(catalog.items().len(), 1);
    assert!(catalog.items()[0].matches_tone("Deep"));
    assert!(!catalog.items()[0].matches_tone("Fair"));
    assert!(Catalog::from_json_str("{}").is_err());
  }

  #[test]
  fn test_result_wire_format() {
    let result = filter(&Catalog::default(), &query("Fair", "All", "boots"));
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["recommendations"][0]["name"], "Suede Chelsea Boots");
    assert_eq!(value["recommendations"][0]["skin_tone_match"][0], "Any");
    assert_eq!(value["body_advice"], "Tailored fits showcase your Ectomorph build.");
  }
}

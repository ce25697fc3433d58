// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/bin/classify.rs - 单张图片分类与标注
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

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use url::Url;

use fenlei::{
  FromUrl,
  config::Config,
  input::{ImageFileInput, ObservationFileInput},
  logging,
  output::{Render, SaveImageFileOutput},
  pipeline::Pipeline,
  render::load_font,
};

/// 垃圾分类结果聚合与标注
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理结果（json:///path/to/observations.json）
  #[arg(long, value_name = "SOURCE")]
  pub observations: Url,
  /// 源图像（image:///path/to/input.jpg）
  #[arg(long, value_name = "IMAGE")]
  pub image: Option<Url>,
  /// 标注图像输出（image:///path/to/output.png），需要同时指定 --image
  #[arg(long, value_name = "OUTPUT")]
  pub output: Option<Url>,
  /// 标签字体（TTF/OTF）
  #[arg(long, value_name = "FONT")]
  pub font: Option<PathBuf>,
  /// JSON 配置文件
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,
  /// 聚合策略: sum-all, top-k-sum, top-1-max, normalized-sum
  #[arg(long, env = "FENLEI_STRATEGY", value_name = "STRATEGY")]
  pub strategy: Option<String>,
  /// top-k-sum 策略保留的观测数
  #[arg(long, value_name = "K")]
  pub top_k: Option<usize>,
  /// 最低得分，低于该值的观测被丢弃 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD")]
  pub min_prob: Option<f32>,
  /// 显示容器宽度（CSS 像素）
  #[arg(long, value_name = "PIXELS")]
  pub target_width: Option<u32>,
  /// 设备像素比
  #[arg(long, value_name = "RATIO")]
  pub dpr: Option<f32>,
  /// 可回收类别的关键词，逗号分隔
  #[arg(
    long,
    env = "FENLEI_RECYCLABLE_KEYWORDS",
    value_delimiter = ',',
    value_name = "TOKENS"
  )]
  pub recyclable_keywords: Option<Vec<String>>,
  /// 输出更多日志（可重复）
  #[arg(short, long, action = clap::ArgAction::Count)]
  pub verbose: u8,
  /// 只输出警告与错误
  #[arg(short, long)]
  pub quiet: bool,
}

impl Args {
  fn apply_overrides(&self, config: &mut Config) {
    if let Some(strategy) = &self.strategy {
      config.strategy = strategy.clone();
    }
    if let Some(top_k) = self.top_k {
      config.top_k = top_k;
    }
    if let Some(min_prob) = self.min_prob {
      config.min_prob = min_prob;
    }
    if let Some(target_width) = self.target_width {
      config.display.target_width = target_width;
    }
    if let Some(dpr) = self.dpr {
      config.display.device_pixel_ratio = dpr;
    }
    if let Some(tokens) = &self.recyclable_keywords {
      config
        .keywords
        .insert(config.recyclable_key.clone(), tokens.clone());
    }
  }

  /// 读取配置文件（未指定时使用默认配置）并叠加命令行参数
  fn load_config(&self) -> Result<Config> {
    let mut config = match &self.config {
      Some(path) => Config::load(path)
        .with_context(|| format!("无法加载配置文件: {}", path.display()))?,
      None => Config::default(),
    };
    self.apply_overrides(&mut config);
    Ok(config)
  }
}

fn main() -> Result<()> {
  let args = Args::parse();

  // 日志级别来自配置，配置校验失败时由 anyhow 直接报告
  let settings = args.load_config()?.into_settings().context("配置无效")?;
  logging::init_logging(logging::resolve_level(
    args.verbose,
    args.quiet,
    settings.log_level,
  ));

  match &args.config {
    Some(path) => info!("配置文件: {}", path.display()),
    None => info!("未指定配置文件，使用默认配置"),
  }
  info!("聚合策略: {}", settings.aggregator.strategy());
  info!("推理结果: {}", args.observations);
  let pipeline = Pipeline::new(&settings);

  if args.output.is_some() && args.image.is_none() {
    bail!("指定 --output 时必须同时指定 --image");
  }

  // 先解码图像，尺寸无效时不进入后续流程
  let source = match &args.image {
    Some(url) => {
      let image = ImageFileInput::from_url(url)?.read()?;
      info!("源图像: {} ({}x{})", url, image.width(), image.height());
      Some(pipeline.prepare(image)?)
    }
    None => None,
  };

  let observations = ObservationFileInput::from_url(&args.observations)?.read()?;
  let response = pipeline.classify(observations)?;

  if let (Some(url), Some(source)) = (&args.output, &source) {
    let mut output = SaveImageFileOutput::from_url(url)?;
    if let Some(path) = &args.font {
      output = output.with_font(load_font(path)?);
    }
    output.render_result(source, &response)?;
  }

  println!("{}", serde_json::to_string_pretty(&response)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flags_override_config_file() {
    let path = std::env::temp_dir().join(format!("fenlei-classify-{}.json", std::process::id()));
    std::fs::write(
      &path,
      r#"{"strategy": "top-k-sum", "top_k": 4, "log_level": "warn"}"#,
    )
    .unwrap();

    let args = Args::try_parse_from([
      "classify",
      "--observations",
      "json:///tmp/observations.json",
      "--config",
      path.to_str().unwrap(),
      "--top-k",
      "2",
      "--dpr",
      "2",
    ])
    .unwrap();
    let config = args.load_config().unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(config.strategy, "top-k-sum");
    assert_eq!(config.top_k, 2);
    assert_eq!(config.display.device_pixel_ratio, 2.0);
    let settings = config.into_settings().unwrap();
    assert_eq!(
      logging::resolve_level(args.verbose, args.quiet, settings.log_level),
      tracing::Level::WARN
    );
  }

  #[test]
  fn missing_config_file_is_reported() {
    let args = Args::try_parse_from([
      "classify",
      "--observations",
      "json:///tmp/observations.json",
      "--config",
      "/nonexistent/fenlei.json",
    ])
    .unwrap();
    assert!(args.load_config().is_err());
  }
}

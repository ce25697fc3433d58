// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/output/save_image_file.rs - 保存标注图像文件
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

use std::path::{Path, PathBuf};

use ab_glyph::FontArc;
use image::RgbImage;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::Render,
  pipeline::{ClassifyResponse, SourceImage},
  render::Annotator,
  url_file_path,
};

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("文件路径不是有效的 UTF-8: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
}

/// 把标注后的画布保存为图片，格式由扩展名决定
pub struct SaveImageFileOutput {
  path: PathBuf,
  annotator: Annotator,
  font: Option<FontArc>,
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: url_file_path(uri)?,
      annotator: Annotator::default(),
      font: None,
    })
  }
}

impl SaveImageFileOutput {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn with_annotator(mut self, annotator: Annotator) -> Self {
    self.annotator = annotator;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    info!("保存标注图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render<SourceImage, ClassifyResponse> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(
    &self,
    frame: &SourceImage,
    result: &ClassifyResponse,
  ) -> Result<(), Self::Error> {
    let canvas = match &self.font {
      Some(font) => frame.annotate(result, &self.annotator, font),
      None => {
        warn!("未指定字体，跳过标注绘制，仅保存缩放后的画布");
        frame.canvas()
      }
    };
    self.save_image(&canvas)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::Config, pipeline::Pipeline};

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("json:///tmp/out.png").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn saves_resized_canvas_without_font() {
    let dir = std::env::temp_dir().join(format!("fenlei-output-{}", std::process::id()));
    let path = dir.join("标注 结果").join("out.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();
    assert_eq!(output.path(), path.as_path());

    let mut config = Config::default();
    config.display.target_width = 50;
    config.display.device_pixel_ratio = 2.0;
    let pipeline = Pipeline::new(&config.into_settings().unwrap());
    let response = pipeline.classify(Vec::new()).unwrap();
    let source = pipeline.prepare(RgbImage::new(200, 100)).unwrap();

    output.render_result(&source, &response).unwrap();
    let saved = image::open(&path).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!((saved.width(), saved.height()), (100, 50));
  }
}

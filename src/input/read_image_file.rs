// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageReader, RgbImage};
use tracing::debug;
use url::Url;

use super::{InputError, check_scheme};
use crate::{FromUrl, FromUrlWithScheme, geometry::InvalidImageError, url_file_path};

fn into_checked_rgb(image: DynamicImage) -> Result<RgbImage, InputError> {
  let image = image.to_rgb8();
  let (width, height) = image.dimensions();
  if width == 0 || height == 0 {
    return Err(InvalidImageError::InvalidDimensions { width, height }.into());
  }
  debug!("图像解码完成: {}x{}", width, height);
  Ok(image)
}

/// 解码上传的图像数据，格式由内容推断
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, InputError> {
  let image = ImageReader::new(Cursor::new(bytes))
    .with_guessed_format()?
    .decode()?;
  into_checked_rgb(image)
}

pub struct ImageFileInput {
  path: PathBuf,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme::<Self>(url)?;
    Ok(ImageFileInput {
      path: url_file_path(url)?,
    })
  }
}

impl ImageFileInput {
  pub fn read(&self) -> Result<RgbImage, InputError> {
    let image = ImageReader::open(&self.path)?
      .with_guessed_format()?
      .decode()?;
    into_checked_rgb(image)
  }
}

// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/render/image_surface.rs - 基于 RgbImage 的绘制目标
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use thiserror::Error;
use tracing::info;

use super::Surface;
use crate::geometry::{DeviceSpace, Rect};

#[derive(Error, Debug)]
pub enum RenderError {
  #[error("字体文件读取错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 从 TTF/OTF 文件加载字体
pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, RenderError> {
  let path = path.as_ref();
  let data = std::fs::read(path)?;
  let font = FontArc::try_from_vec(data)?;
  info!("已加载字体: {}", path.display());
  Ok(font)
}

/// 在图像上绘制描边矩形，每一圈向内收缩一个像素
pub fn stroke_rect_on(image: &mut RgbImage, rect: &Rect<DeviceSpace>, thickness: u32, color: [u8; 3]) {
  let x = rect.x1 as i32;
  let y = rect.y1 as i32;
  // 包含右下角像素
  let width = (rect.width() as u32).saturating_add(1);
  let height = (rect.height() as u32).saturating_add(1);

  for inset in 0..thickness {
    let w = width.saturating_sub(2 * inset);
    let h = height.saturating_sub(2 * inset);
    if w == 0 || h == 0 {
      break;
    }
    let ring = imageproc::rect::Rect::at(x + inset as i32, y + inset as i32).of_size(w, h);
    draw_hollow_rect_mut(image, ring, Rgb(color));
  }
}

pub fn fill_rect_on(image: &mut RgbImage, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]) {
  if width == 0 || height == 0 {
    return;
  }
  let rect = imageproc::rect::Rect::at(x, y).of_size(width, height);
  draw_filled_rect_mut(image, rect, Rgb(color));
}

/// 以 `image` 画布和 `ab_glyph` 字体实现的绘制目标
pub struct ImageSurface<'a> {
  image: &'a mut RgbImage,
  font: &'a FontArc,
  scale: PxScale,
}

impl<'a> ImageSurface<'a> {
  /// `font_px` 为设备像素下的字号
  pub fn new(image: &'a mut RgbImage, font: &'a FontArc, font_px: f32) -> Self {
    Self {
      image,
      font,
      scale: PxScale::from(font_px),
    }
  }
}

impl Surface for ImageSurface<'_> {
  fn width(&self) -> u32 {
    self.image.width()
  }

  fn height(&self) -> u32 {
    self.image.height()
  }

  fn stroke_rect(&mut self, rect: &Rect<DeviceSpace>, thickness: u32, color: [u8; 3]) {
    stroke_rect_on(self.image, rect, thickness, color);
  }

  fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]) {
    fill_rect_on(self.image, x, y, width, height, color);
  }

  fn text_size(&self, text: &str) -> (u32, u32) {
    text_size(self.scale, self.font, text)
  }

  fn draw_text(&mut self, x: i32, y: i32, text: &str, color: [u8; 3]) {
    draw_text_mut(&mut *self.image, Rgb(color), x, y, self.scale, self.font, text);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const RED: [u8; 3] = [255, 0, 0];

  #[test]
  fn stroke_covers_edges_and_leaves_interior() {
    let mut image = RgbImage::new(50, 50);
    let rect = Rect::<DeviceSpace>::new(10.0, 10.0, 30.0, 40.0);
    stroke_rect_on(&mut image, &rect, 2, RED);

    assert_eq!(image.get_pixel(10, 10).0, RED);
    assert_eq!(image.get_pixel(30, 40).0, RED);
    assert_eq!(image.get_pixel(11, 20).0, RED);
    assert_eq!(image.get_pixel(12, 20).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(9, 10).0, [0, 0, 0]);
  }

  #[test]
  fn stroke_outside_the_image_is_clipped() {
    let mut image = RgbImage::new(20, 20);
    let rect = Rect::<DeviceSpace>::new(-5.0, -5.0, 40.0, 40.0);
    stroke_rect_on(&mut image, &rect, 3, RED);
    assert_eq!(image.get_pixel(10, 10).0, [0, 0, 0]);
  }

  #[test]
  fn fill_rect_paints_the_area() {
    let mut image = RgbImage::new(20, 20);
    fill_rect_on(&mut image, 2, 3, 4, 5, RED);
    assert_eq!(image.get_pixel(2, 3).0, RED);
    assert_eq!(image.get_pixel(5, 7).0, RED);
    assert_eq!(image.get_pixel(6, 7).0, [0, 0, 0]);
    fill_rect_on(&mut image, 0, 0, 0, 5, [0, 255, 0]);
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
  }

  #[test]
  fn missing_font_file_is_an_io_error() {
    assert!(matches!(
      load_font("/nonexistent/font.ttf"),
      Err(RenderError::Io(_))
    ));
  }
}

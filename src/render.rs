// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/render.rs - 检测框标注绘制
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

use tracing::{trace, warn};

use crate::geometry::{DeviceSpace, Rect};

#[cfg(feature = "save_image_file")]
mod image_surface;
#[cfg(feature = "save_image_file")]
pub use self::image_surface::{ImageSurface, RenderError, load_font};

// 标注样式常量
const BOX_COLOR: [u8; 3] = [22, 163, 74]; // 绿色
const TEXT_COLOR: [u8; 3] = [255, 255, 255]; // 白色文本
const LABEL_PADDING: u32 = 4;
const MIN_STROKE_WIDTH: u32 = 2;
const STROKE_DIVISOR: f32 = 200.0;

/// 绘制目标。所有坐标均为画布设备像素。
pub trait Surface {
  fn width(&self) -> u32;
  fn height(&self) -> u32;

  /// 描边矩形，线宽向矩形内部扩展
  fn stroke_rect(&mut self, rect: &Rect<DeviceSpace>, thickness: u32, color: [u8; 3]);

  fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32, color: [u8; 3]);

  /// 按当前生效的字体度量文本的宽和高
  fn text_size(&self, text: &str) -> (u32, u32);

  /// `(x, y)` 为文本左上角
  fn draw_text(&mut self, x: i32, y: i32, text: &str, color: [u8; 3]);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnotationStyle {
  pub box_color: [u8; 3],
  pub text_color: [u8; 3],
  pub padding: u32,
  pub min_stroke_width: u32,
  pub stroke_divisor: f32,
}

impl Default for AnnotationStyle {
  fn default() -> Self {
    Self {
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
      padding: LABEL_PADDING,
      min_stroke_width: MIN_STROKE_WIDTH,
      stroke_divisor: STROKE_DIVISOR,
    }
  }
}

/// 无状态的标注绘制器；重复绘制前由调用方清空画布
#[derive(Debug, Clone, Default)]
pub struct Annotator {
  style: AnnotationStyle,
}

impl Annotator {
  pub fn new(style: AnnotationStyle) -> Self {
    Self { style }
  }

  pub fn style(&self) -> &AnnotationStyle {
    &self.style
  }

  /// 线宽取画布短边除以设备像素比再按比例缩小，向下取整，且不小于下限
  pub fn stroke_width(&self, width: u32, height: u32, device_pixel_ratio: f32) -> u32 {
    let short_side = width.min(height) as f32;
    let base = (short_side / device_pixel_ratio / self.style.stroke_divisor).floor();
    (base as u32).max(self.style.min_stroke_width)
  }

  pub fn render<S, L>(
    &self,
    surface: &mut S,
    device_pixel_ratio: f32,
    boxes: &[Rect<DeviceSpace>],
    labels: &[L],
  ) where
    S: Surface + ?Sized,
    L: AsRef<str>,
  {
    if boxes.len() != labels.len() {
      warn!(
        "检测框数量 ({}) 与标签数量 ({}) 不一致，只绘制前 {} 个",
        boxes.len(),
        labels.len(),
        boxes.len().min(labels.len())
      );
    }

    let thickness = self.stroke_width(surface.width(), surface.height(), device_pixel_ratio);
    for (rect, label) in boxes.iter().zip(labels) {
      trace!("绘制 {} 标签 '{}'", rect, label.as_ref());
      surface.stroke_rect(rect, thickness, self.style.box_color);
      self.draw_label(surface, rect, label.as_ref());
    }
  }

  // 标签底色块贴在框的上方，顶边不超出画布
  fn draw_label<S: Surface + ?Sized>(&self, surface: &mut S, rect: &Rect<DeviceSpace>, label: &str) {
    if label.is_empty() {
      return;
    }

    let padding = self.style.padding;
    let (text_width, text_height) = surface.text_size(label);
    let chip_width = text_width + 2 * padding;
    let chip_height = text_height + 2 * padding;

    let chip_x = rect.x1 as i32;
    let chip_y = (rect.y1 as i32 - chip_height as i32).max(0);

    surface.fill_rect(chip_x, chip_y, chip_width, chip_height, self.style.box_color);
    surface.draw_text(
      chip_x + padding as i32,
      chip_y + padding as i32,
      label,
      self.style.text_color,
    );
  }
}

// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/geometry.rs - 坐标空间与坐标变换
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

//! 三个坐标空间：
//! - 源图像像素空间 [`SourceSpace`]
//! - 缩放到容器后的显示空间 [`DisplaySpace`]
//! - 乘以设备像素比后的画布空间 [`DeviceSpace`]
//!
//! 矩形在类型上携带所属空间，只有经过 [`to_device_space`] 才能得到可绘制的矩形。

use std::fmt;
use std::marker::PhantomData;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

pub trait Space: Copy + fmt::Debug + Default {
  const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceSpace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplaySpace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceSpace;

impl Space for SourceSpace {
  const NAME: &'static str = "source";
}

impl Space for DisplaySpace {
  const NAME: &'static str = "display";
}

impl Space for DeviceSpace {
  const NAME: &'static str = "device";
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidImageError {
  #[error("源图像尺寸无效: {width}x{height}")]
  InvalidDimensions { width: u32, height: u32 },
  #[error("源图像宽度无效: {0}")]
  InvalidSourceWidth(u32),
  #[error("显示目标宽度无效: {0}")]
  InvalidTargetWidth(u32),
  #[error("缩放系数无效: {0}")]
  InvalidScale(f32),
  #[error("设备像素比无效: {0}")]
  InvalidDevicePixelRatio(f32),
}

/// 某个坐标空间中的矩形，保证 `x2 >= x1` 且 `y2 >= y1`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect<S: Space> {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
  _space: PhantomData<S>,
}

impl<S: Space> Rect<S> {
  /// 角点顺序颠倒时自动交换
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self {
      x1: x1.min(x2),
      y1: y1.min(y2),
      x2: x1.max(x2),
      y2: y1.max(y2),
      _space: PhantomData,
    }
  }

  pub fn from_array(bbox: [f32; 4]) -> Self {
    Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
  }

  pub fn to_array(&self) -> [f32; 4] {
    [self.x1, self.y1, self.x2, self.y2]
  }

  pub fn width(&self) -> f32 {
    self.x2 - self.x1
  }

  pub fn height(&self) -> f32 {
    self.y2 - self.y1
  }

  pub fn is_finite(&self) -> bool {
    self.to_array().iter().all(|v| v.is_finite())
  }

  /// 四个坐标各自取整
  pub fn round(&self) -> Self {
    Self::new(
      self.x1.round(),
      self.y1.round(),
      self.x2.round(),
      self.y2.round(),
    )
  }

  // 等比缩放并换到目标空间
  fn scale<T: Space>(&self, factor: f32) -> Rect<T> {
    Rect::new(
      self.x1 * factor,
      self.y1 * factor,
      self.x2 * factor,
      self.y2 * factor,
    )
  }
}

impl<S: Space> fmt::Display for Rect<S> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "[{:.1}, {:.1}, {:.1}, {:.1}]@{}",
      self.x1,
      self.y1,
      self.x2,
      self.y2,
      S::NAME
    )
  }
}

impl<S: Space> Serialize for Rect<S> {
  fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
    self.to_array().serialize(serializer)
  }
}

impl<'de, S: Space> Deserialize<'de> for Rect<S> {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    let bbox = <[f32; 4]>::deserialize(deserializer)?;
    let rect = Self::from_array(bbox);
    if !rect.is_finite() {
      return Err(D::Error::custom(format!("矩形坐标必须为有限值: {:?}", bbox)));
    }
    Ok(rect)
  }
}

/// 单张图片的缩放上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleContext {
  source_to_display: f32,
  device_pixel_ratio: f32,
}

fn check_device_pixel_ratio(device_pixel_ratio: f32) -> Result<(), InvalidImageError> {
  if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
    Ok(())
  } else {
    Err(InvalidImageError::InvalidDevicePixelRatio(
      device_pixel_ratio,
    ))
  }
}

impl ScaleContext {
  /// 按容器宽度计算缩放系数 `min(1, target_width / source_width)`，只缩小不放大
  pub fn new(
    source_width: u32,
    target_width: u32,
    device_pixel_ratio: f32,
  ) -> Result<Self, InvalidImageError> {
    if source_width == 0 {
      return Err(InvalidImageError::InvalidSourceWidth(source_width));
    }
    if target_width == 0 {
      return Err(InvalidImageError::InvalidTargetWidth(target_width));
    }
    check_device_pixel_ratio(device_pixel_ratio)?;

    let source_to_display = (target_width as f32 / source_width as f32).min(1.0);
    Ok(Self {
      source_to_display,
      device_pixel_ratio,
    })
  }

  pub fn from_factors(
    source_to_display: f32,
    device_pixel_ratio: f32,
  ) -> Result<Self, InvalidImageError> {
    if !(source_to_display.is_finite() && source_to_display > 0.0) {
      return Err(InvalidImageError::InvalidScale(source_to_display));
    }
    check_device_pixel_ratio(device_pixel_ratio)?;
    Ok(Self {
      source_to_display,
      device_pixel_ratio,
    })
  }

  pub fn source_to_display(&self) -> f32 {
    self.source_to_display
  }

  pub fn device_pixel_ratio(&self) -> f32 {
    self.device_pixel_ratio
  }

  /// 显示空间尺寸（CSS 像素）
  pub fn display_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
    let scale = |v: u32| ((v as f32 * self.source_to_display).round() as u32).max(1);
    (scale(source_width), scale(source_height))
  }

  /// 画布尺寸（设备像素）
  pub fn canvas_size(&self, source_width: u32, source_height: u32) -> (u32, u32) {
    let factor = self.source_to_display * self.device_pixel_ratio;
    let scale = |v: u32| ((v as f32 * factor).round() as u32).max(1);
    (scale(source_width), scale(source_height))
  }
}

pub fn to_display_space(bbox: &Rect<SourceSpace>, ctx: &ScaleContext) -> Rect<DisplaySpace> {
  bbox.scale(ctx.source_to_display)
}

/// 源图像坐标 -> 画布坐标。两级缩放之间不取整，只在最后一步取整。
pub fn to_device_space(bbox: &Rect<SourceSpace>, ctx: &ScaleContext) -> Rect<DeviceSpace> {
  to_display_space(bbox, ctx)
    .scale::<DeviceSpace>(ctx.device_pixel_ratio)
    .round()
}

/// [`to_device_space`] 的逆变换
pub fn to_source_space(bbox: &Rect<DeviceSpace>, ctx: &ScaleContext) -> Rect<SourceSpace> {
  bbox
    .scale::<DisplaySpace>(ctx.device_pixel_ratio.recip())
    .scale(ctx.source_to_display.recip())
}

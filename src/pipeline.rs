// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/pipeline.rs - 单次请求处理流程
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

//! 归一化 -> 聚合 -> 坐标变换 -> 标注绘制，一次请求顺序执行，不保留任何状态。

use std::time::Instant;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  aggregate::Aggregator,
  category::{CategoryScores, MacroCategory, UnknownCategoryError},
  config::{DisplayConfig, Settings},
  geometry::{DeviceSpace, InvalidImageError, Rect, ScaleContext, SourceSpace, to_device_space},
  input::InputError,
  normalize::label_head,
  observation::RawObservation,
};

#[cfg(feature = "save_image_file")]
use crate::render::{Annotator, ImageSurface};

/// 标签字号（CSS 像素），绘制时乘以设备像素比
pub const LABEL_FONT_SIZE: f32 = 14.0;

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("标签归类失败: {0}")]
  UnknownCategory(#[from] UnknownCategoryError),
  #[error("图像无效: {0}")]
  InvalidImage(#[from] InvalidImageError),
  #[error("输入错误: {0}")]
  Input(#[from] InputError),
}

impl PipelineError {
  /// 是否属于调用方输入问题（对应 4xx），其余为服务端问题（对应 5xx）
  pub fn is_client_error(&self) -> bool {
    match self {
      PipelineError::UnknownCategory(_) => false,
      PipelineError::InvalidImage(_) => true,
      PipelineError::Input(InputError::IoError(_)) => false,
      PipelineError::Input(_) => true,
    }
  }
}

fn serialize_pixel_box<S: Serializer>(
  bbox: &Option<Rect<SourceSpace>>,
  serializer: S,
) -> Result<S::Ok, S::Error> {
  bbox
    .map(|bbox| bbox.round().to_array().map(|v| v as i32))
    .serialize(serializer)
}

/// 输入观测及其归一化后的大类
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotatedObservation {
  pub label: String,
  pub score: f32,
  #[serde(
    rename = "box",
    skip_serializing_if = "Option::is_none",
    serialize_with = "serialize_pixel_box"
  )]
  pub bbox: Option<Rect<SourceSpace>>,
  pub category: MacroCategory,
}

impl AnnotatedObservation {
  /// 绘制在标签底色块中的文本
  pub fn caption(&self) -> String {
    format!(
      "{} {} {:.0}%",
      label_head(&self.label),
      self.category.display_name(),
      self.score * 100.0
    )
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifyResponse {
  pub major_category: Option<MacroCategory>,
  pub scores_by_category: CategoryScores,
  pub is_recyclable: bool,
  pub annotated_observations: Vec<AnnotatedObservation>,
}

impl ClassifyResponse {
  /// 带框观测变换到画布空间后的框以及对应的标签文本
  pub fn device_annotations(&self, ctx: &ScaleContext) -> (Vec<Rect<DeviceSpace>>, Vec<String>) {
    self
      .annotated_observations
      .iter()
      .filter_map(|observation| {
        observation
          .bbox
          .map(|bbox| (to_device_space(&bbox, ctx), observation.caption()))
      })
      .unzip()
  }
}

pub struct Pipeline {
  aggregator: Aggregator,
  display: DisplayConfig,
}

impl Pipeline {
  pub fn new(settings: &Settings) -> Self {
    Self {
      aggregator: settings.aggregator.clone(),
      display: settings.display,
    }
  }

  pub fn aggregator(&self) -> &Aggregator {
    &self.aggregator
  }

  pub fn display(&self) -> &DisplayConfig {
    &self.display
  }

  pub fn classify(
    &self,
    observations: Vec<RawObservation>,
  ) -> Result<ClassifyResponse, PipelineError> {
    let now = Instant::now();
    let categories = self.aggregator.categorize(&observations)?;
    let result = self
      .aggregator
      .aggregate_categorized(&observations, &categories);
    debug!("聚合耗时: {:.2?}", now.elapsed());

    info!(
      "{} 个观测 -> 主类别 {}",
      observations.len(),
      result
        .major_category
        .map(MacroCategory::display_name)
        .unwrap_or("无")
    );

    let annotated_observations = observations
      .into_iter()
      .zip(categories)
      .map(|(observation, category)| AnnotatedObservation {
        label: observation.label,
        score: observation.score,
        bbox: observation.bbox,
        category,
      })
      .collect();

    Ok(ClassifyResponse {
      major_category: result.major_category,
      scores_by_category: result.scores_by_category,
      is_recyclable: result.is_recyclable,
      annotated_observations,
    })
  }

  /// 由源图像尺寸与显示配置得到缩放上下文
  pub fn scale_context(&self, width: u32, height: u32) -> Result<ScaleContext, InvalidImageError> {
    if width == 0 || height == 0 {
      return Err(InvalidImageError::InvalidDimensions { width, height });
    }
    ScaleContext::new(
      width,
      self.display.target_width,
      self.display.device_pixel_ratio,
    )
  }

  #[cfg(any(feature = "read_image_file", feature = "save_image_file"))]
  pub fn prepare(&self, image: image::RgbImage) -> Result<SourceImage, InvalidImageError> {
    let ctx = self.scale_context(image.width(), image.height())?;
    Ok(SourceImage { image, ctx })
  }

  /// 处理一次上传：解码图像得到尺寸，校验推理结果并聚合
  #[cfg(feature = "read_image_file")]
  pub fn handle_upload(
    &self,
    image_bytes: &[u8],
    payload: crate::observation::InferencePayload,
  ) -> Result<(SourceImage, ClassifyResponse), PipelineError> {
    let image = crate::input::decode_image(image_bytes)?;
    let source = self.prepare(image)?;
    let observations = payload
      .into_observations()
      .map_err(InputError::from)?;
    let response = self.classify(observations)?;
    Ok((source, response))
  }
}

/// 已解码的源图像及其缩放上下文
#[cfg(any(feature = "read_image_file", feature = "save_image_file"))]
#[derive(Debug)]
pub struct SourceImage {
  pub image: image::RgbImage,
  pub ctx: ScaleContext,
}

#[cfg(any(feature = "read_image_file", feature = "save_image_file"))]
impl SourceImage {
  /// 源图像缩放到画布尺寸（显示尺寸乘以设备像素比），保持宽高比
  pub fn canvas(&self) -> image::RgbImage {
    let (width, height) = self.ctx.canvas_size(self.image.width(), self.image.height());
    image::imageops::resize(
      &self.image,
      width,
      height,
      image::imageops::FilterType::Triangle,
    )
  }

  /// 在画布上绘制所有带框观测
  #[cfg(feature = "save_image_file")]
  pub fn annotate(
    &self,
    response: &ClassifyResponse,
    annotator: &Annotator,
    font: &ab_glyph::FontArc,
  ) -> image::RgbImage {
    let now = Instant::now();
    let mut canvas = self.canvas();
    let (boxes, captions) = response.device_annotations(&self.ctx);
    let font_px = LABEL_FONT_SIZE * self.ctx.device_pixel_ratio();
    let mut surface = ImageSurface::new(&mut canvas, font, font_px);
    annotator.render(&mut surface, self.ctx.device_pixel_ratio(), &boxes, &captions);

    debug!(
      "绘制 {} 个检测框到 {}x{} 画布，耗时: {:.2?}",
      boxes.len(),
      canvas.width(),
      canvas.height(),
      now.elapsed()
    );
    canvas
  }
}

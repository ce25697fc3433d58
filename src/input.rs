// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/input.rs - 推理结果与图像输入
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

use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  geometry::InvalidImageError,
  observation::{InferencePayload, ObservationError, RawObservation},
  url_file_path,
};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, decode_image};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("文件路径不是有效的 UTF-8: {0}")]
  InvalidPath(#[from] std::string::FromUtf8Error),
  #[error("推理结果无效: {0}")]
  ObservationError(#[from] ObservationError),
  #[cfg(feature = "read_image_file")]
  #[error("无法读取图片: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("图像无效: {0}")]
  InvalidImage(#[from] InvalidImageError),
}

pub(crate) fn check_scheme<T: FromUrlWithScheme>(url: &Url) -> Result<(), InputError> {
  if url.scheme() != T::SCHEME {
    error!(
      "URI scheme mismatch: expected '{}', found '{}'",
      T::SCHEME,
      url.scheme()
    );
    return Err(InputError::SchemeMismatch {
      expected: T::SCHEME,
      found: url.scheme().to_string(),
    });
  }
  Ok(())
}

/// 从 JSON 文件读取推理服务的输出
#[derive(Debug, Clone)]
pub struct ObservationFileInput {
  path: PathBuf,
}

impl FromUrlWithScheme for ObservationFileInput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for ObservationFileInput {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    check_scheme::<Self>(url)?;
    Ok(Self {
      path: url_file_path(url)?,
    })
  }
}

impl ObservationFileInput {
  pub fn read(&self) -> Result<Vec<RawObservation>, InputError> {
    let text = std::fs::read_to_string(&self.path)?;
    let observations = InferencePayload::from_json(&text)?.into_observations()?;
    info!(
      "读取推理结果: {} ({} 条)",
      self.path.display(),
      observations.len()
    );
    Ok(observations)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn observation_input_requires_json_scheme() {
    let url = Url::parse("image:///tmp/a.json").unwrap();
    assert!(matches!(
      ObservationFileInput::from_url(&url),
      Err(InputError::SchemeMismatch {
        expected: "json",
        ..
      })
    ));
  }

  #[test]
  fn observation_input_reads_file() {
    let path = std::env::temp_dir().join(format!("fenlei-input-{}.json", std::process::id()));
    std::fs::write(&path, r#"[{"label": "瓶子-可回收物", "score": 0.9}]"#).unwrap();
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let observations = ObservationFileInput::from_url(&url).unwrap().read().unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(observations, [RawObservation::new("瓶子-可回收物", 0.9)]);
  }

  #[test]
  fn observation_input_reads_non_ascii_path() {
    let dir = std::env::temp_dir().join(format!("fenlei-输入-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("垃圾 观测.json");
    std::fs::write(&path, r#"[{"label": "电池-有害垃圾", "score": 0.7}]"#).unwrap();
    let url = Url::parse(&format!("json://{}", path.display())).unwrap();
    let observations = ObservationFileInput::from_url(&url).unwrap().read().unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!(observations, [RawObservation::new("电池-有害垃圾", 0.7)]);
  }

  #[test]
  fn missing_file_is_io_error() {
    let url = Url::parse("json:///nonexistent/observations.json").unwrap();
    assert!(matches!(
      ObservationFileInput::from_url(&url).unwrap().read(),
      Err(InputError::IoError(_))
    ));
  }
}

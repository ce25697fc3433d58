// 该文件是 Fenlei （垃圾分类） 项目的一部分。
// src/logging.rs - 日志初始化
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

use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// `-q` 优先；否则 `-v` 次数决定级别，未指定时使用配置文件中的级别
pub fn resolve_level(verbosity: u8, quiet: bool, config_level: Level) -> Level {
  if quiet {
    return Level::WARN;
  }
  match verbosity {
    0 => config_level,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  }
}

/// 日志写到 stderr，stdout 留给 JSON 结果
pub fn init_logging(level: Level) {
  let subscriber = FmtSubscriber::builder()
    .with_max_level(level)
    .with_target(false)
    .with_writer(std::io::stderr)
    .finish();

  if tracing::subscriber::set_global_default(subscriber).is_err() {
    tracing::warn!("日志系统已初始化，忽略重复初始化");
  }
}

/// 解析配置中的日志级别，无法识别时返回 `None`
pub fn parse_log_level(level: &str) -> Option<Level> {
  match level.trim().to_lowercase().as_str() {
    "trace" => Some(Level::TRACE),
    "debug" => Some(Level::DEBUG),
    "info" => Some(Level::INFO),
    "warn" | "warning" => Some(Level::WARN),
    "error" => Some(Level::ERROR),
    _ => None,
  }
}

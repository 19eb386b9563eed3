//! 错误类型
//!
//! 渲染管线中的所有错误都在单个文件的边界被捕获并转换为日志条目，
//! 不会中断监听器或宿主进程。

use std::path::{Path, PathBuf};
use thiserror::Error;

/// 管线结果类型
pub type Result<T> = std::result::Result<T, WikiError>;

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 输出目录缺失或配置无效
    Configuration,
    /// 找不到模板
    TemplateNotFound,
    /// 读写或权限错误
    Io,
    /// 无法开始监听
    WatchStart,
}

#[derive(Debug, Error)]
pub enum WikiError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Output path not found: {}", .0.display())]
    OutputDirMissing(PathBuf),

    #[error(
        "Template not found: {} (defaults tried: {})",
        .custom.display(),
        display_paths(.defaults)
    )]
    TemplateNotFound {
        custom: PathBuf,
        defaults: Vec<PathBuf>,
    },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot watch {}: {reason}", .path.display())]
    WatchStart { path: PathBuf, reason: String },
}

impl WikiError {
    /// 包装 IO 错误并附带出错的路径
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn watch_start(path: &Path, reason: impl ToString) -> Self {
        Self::WatchStart {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// 获取错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            WikiError::Configuration(_) | WikiError::OutputDirMissing(_) => {
                ErrorKind::Configuration
            }
            WikiError::TemplateNotFound { .. } => ErrorKind::TemplateNotFound,
            WikiError::Io { .. } => ErrorKind::Io,
            WikiError::WatchStart { .. } => ErrorKind::WatchStart,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "none".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

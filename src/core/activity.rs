//! 活动日志模块
//!
//! 每个配置拥有一份只追加、最新在前的日志，供展示层显示。
//! 任何线程都可以追加日志；展示层通过 [`Notice`] 通道在自己的线程上接收更新。

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// 带时间戳的日志条目
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub message: String,
    /// 是否为失败记录
    pub is_error: bool,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.message
        )
    }
}

/// 发给展示层的通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// 新的日志条目
    Log {
        configuration: String,
        entry: LogEntry,
    },
    /// 自动创建了链接目标文档
    DocumentCreated {
        configuration: String,
        path: PathBuf,
        /// 是否需要询问用户打开该文件
        ask_to_open: bool,
    },
}

/// 通知发送端
pub type NoticeSender = UnboundedSender<Notice>;
/// 通知接收端
pub type NoticeReceiver = UnboundedReceiver<Notice>;

/// 创建通知通道
pub fn notice_channel() -> (NoticeSender, NoticeReceiver) {
    mpsc::unbounded_channel()
}

/// 线程安全的活动日志
///
/// 克隆后共享同一份日志。
#[derive(Debug, Clone)]
pub struct ActivityLog {
    /// 所属配置名称
    configuration: String,
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    /// 容量上限，`None` 表示不限制
    capacity: Option<usize>,
    notices: Option<NoticeSender>,
}

impl ActivityLog {
    pub fn new(configuration: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            entries: Arc::new(Mutex::new(VecDeque::new())),
            capacity: None,
            notices: None,
        }
    }

    /// 限制日志条数，超出时丢弃最旧的条目
    pub fn with_capacity_limit(mut self, capacity: Option<usize>) -> Self {
        self.capacity = capacity;
        self
    }

    /// 将日志同时转发到展示层通道
    pub fn with_notices(mut self, notices: Option<NoticeSender>) -> Self {
        self.notices = notices;
        self
    }

    /// 以新的配置名称共享同一份日志
    pub fn renamed(&self, configuration: impl Into<String>) -> Self {
        Self {
            configuration: configuration.into(),
            ..self.clone()
        }
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    /// 记录一次成功的操作
    pub fn info(&self, message: impl Into<String>) {
        self.push(message.into(), false);
    }

    /// 记录一次失败
    pub fn error(&self, message: impl fmt::Display) {
        self.push(format!("Error: {}", message), true);
    }

    fn push(&self, message: String, is_error: bool) {
        if is_error {
            tracing::warn!(configuration = %self.configuration, "{}", message);
        } else {
            tracing::info!(configuration = %self.configuration, "{}", message);
        }

        let entry = LogEntry {
            timestamp: Local::now(),
            message,
            is_error,
        };

        {
            let mut entries = self.entries.lock();
            entries.push_front(entry.clone());
            if let Some(capacity) = self.capacity {
                entries.truncate(capacity);
            }
        }

        self.notify(Notice::Log {
            configuration: self.configuration.clone(),
            entry,
        });
    }

    /// 向展示层发送通知；接收端已关闭时静默忽略
    pub fn notify(&self, notice: Notice) {
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }

    /// 日志快照，最新在前
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    /// 日志消息快照，最新在前
    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

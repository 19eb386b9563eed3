//! Wiki 配置模块
//!
//! [`WikiConfig`] 是可持久化的配置记录；[`WikiConfiguration`] 把一条记录
//! 绑定到渲染器与监听会话上，并提供启动、停止、全量渲染等生命周期操作。

use crate::core::activity::{ActivityLog, NoticeSender};
use crate::core::renderer::{DocumentRenderer, RenderSummary, RendererOptions};
use crate::core::template::TemplateLoader;
use crate::core::watcher::{WatchSession, DEFAULT_DEBOUNCE};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// 配置记录
///
/// 由外部设置存储负责读写。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiConfig {
    /// 显示名称
    pub name: String,
    /// 源文档目录
    pub input_path: PathBuf,
    /// HTML 输出目录
    pub output_path: PathBuf,
    /// 检测到 wiki 链接时自动创建缺失的文档
    #[serde(default)]
    pub auto_create_new_files: bool,
    /// 自动创建后询问是否打开
    #[serde(default)]
    pub ask_to_open_new_files: bool,
}

impl WikiConfig {
    pub fn new(
        name: impl Into<String>,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_path: input_path.into(),
            output_path: output_path.into(),
            auto_create_new_files: false,
            ask_to_open_new_files: false,
        }
    }
}

/// 进程级的运行参数，由所有配置共享
#[derive(Debug, Clone)]
pub struct WikiOptions {
    /// 去抖间隔
    pub debounce: Duration,
    pub templates: TemplateLoader,
    /// 日志容量上限
    pub log_capacity: Option<usize>,
    /// 展示层通知通道
    pub notices: Option<NoticeSender>,
}

impl Default for WikiOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            templates: TemplateLoader::with_program_defaults(None),
            log_capacity: None,
            notices: None,
        }
    }
}

/// 一个活动的 wiki 配置
pub struct WikiConfiguration {
    config: WikiConfig,
    options: WikiOptions,
    log: ActivityLog,
    renderer: Arc<DocumentRenderer>,
    /// 同一时刻至多一个监听会话
    session: Mutex<Option<WatchSession>>,
}

impl WikiConfiguration {
    pub fn new(config: WikiConfig, options: WikiOptions) -> Self {
        let log = ActivityLog::new(config.name.clone())
            .with_capacity_limit(options.log_capacity)
            .with_notices(options.notices.clone());
        let renderer = Arc::new(build_renderer(&config, &options, log.clone()));

        Self {
            config,
            options,
            log,
            renderer,
            session: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WikiConfig {
        &self.config
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    pub fn renderer(&self) -> &Arc<DocumentRenderer> {
        &self.renderer
    }

    /// 替换配置记录
    ///
    /// 会先停止当前的监听，需要重新 [`start`](Self::start)。
    pub fn set_config(&mut self, config: WikiConfig) {
        self.stop();
        if config.name != self.config.name {
            self.log = self.log.renamed(config.name.clone());
        }
        self.renderer = Arc::new(build_renderer(&config, &self.options, self.log.clone()));
        self.config = config;
    }

    /// 开始（或重新开始）监听输入目录
    ///
    /// 已有的会话会先被完全释放。失败只记录日志。
    ///
    /// # Returns
    ///
    /// 是否成功建立监听
    pub fn start(&self) -> bool {
        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            previous.stop();
        }

        let input = &self.config.input_path;
        if !input.is_dir() {
            self.log
                .error(format!("Directory path does not exist: {}", input.display()));
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                self.log.error(format!("Cannot watch {}: {}", input.display(), e));
                return false;
            }
        };

        match WatchSession::start(input, self.renderer.clone(), self.options.debounce, runtime) {
            Ok(started) => {
                *session = Some(started);
                self.log.info(format!("Now watching: {}", input.display()));
                true
            }
            Err(e) => {
                self.log.error(e);
                false
            }
        }
    }

    /// 应用用户修改后的配置，等同于 [`start`](Self::start)
    pub fn apply(&self) -> bool {
        self.start()
    }

    /// 停止监听；没有活动会话时什么也不做
    pub fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            session.stop();
            self.log
                .info(format!("Stopped watching: {}", self.config.input_path.display()));
        }
    }

    /// 释放监听，可重复调用
    pub fn dispose(&self) {
        self.stop();
    }

    pub fn is_watching(&self) -> bool {
        self.session
            .lock()
            .as_ref()
            .map(WatchSession::is_active)
            .unwrap_or(false)
    }

    /// 渲染输入目录下的所有源文档
    pub fn render_all(&self) -> RenderSummary {
        self.renderer.render_all()
    }

    /// 渲染单个源文档
    pub fn render(&self, file: &Path) -> bool {
        self.renderer.render(file)
    }

    /// 删除单个源文档对应的输出
    pub fn delete(&self, file: &Path) -> bool {
        self.renderer.delete(file)
    }
}

impl Drop for WikiConfiguration {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for WikiConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WikiConfiguration")
            .field("config", &self.config)
            .field("watching", &self.is_watching())
            .finish_non_exhaustive()
    }
}

fn build_renderer(
    config: &WikiConfig,
    options: &WikiOptions,
    log: ActivityLog,
) -> DocumentRenderer {
    DocumentRenderer::new(
        RendererOptions {
            input_dir: config.input_path.clone(),
            output_dir: config.output_path.clone(),
            auto_create: config.auto_create_new_files,
            ask_to_open: config.ask_to_open_new_files,
        },
        options.templates.clone(),
        log,
    )
}

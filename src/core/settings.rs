//! 设置文件模块
//!
//! 保存所有 wiki 配置以及进程级参数
//!
//! ## 配置格式
//!
//! ```json
//! {
//!   "configurations": [
//!     {
//!       "name": "Notes",
//!       "input_path": "/home/me/notes",
//!       "output_path": "/home/me/notes-html",
//!       "auto_create_new_files": true,
//!       "ask_to_open_new_files": false
//!     }
//!   ],
//!   "debounce_ms": 1000,
//!   "default_template": null,
//!   "log_capacity": 500
//! }
//! ```

use crate::core::activity::NoticeSender;
use crate::core::template::TemplateLoader;
use crate::core::wiki::{WikiConfig, WikiOptions};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_debounce_ms() -> u64 {
    1000
}

/// 设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiSettings {
    /// 所有 wiki 配置
    #[serde(default)]
    pub configurations: Vec<WikiConfig>,

    /// 修改事件的去抖间隔（毫秒）
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// 默认模板路径，未设置时使用程序目录下的 `Templates/Layout.html`
    #[serde(default)]
    pub default_template: Option<PathBuf>,

    /// 每个配置保留的日志条数上限
    #[serde(default)]
    pub log_capacity: Option<usize>,
}

impl Default for WikiSettings {
    fn default() -> Self {
        Self {
            configurations: Vec::new(),
            debounce_ms: default_debounce_ms(),
            default_template: None,
            log_capacity: None,
        }
    }
}

impl WikiSettings {
    /// 默认设置文件位置
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mdwiki").join("settings.json"))
    }

    /// 从文件加载设置
    ///
    /// 文件不存在时返回默认设置；内容无法解析时返回错误，避免覆盖用户数据。
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid settings file: {}", path.display()))
    }

    /// 保存设置到文件
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings: {}", path.display()))?;
        Ok(())
    }

    /// 按名称查找配置
    pub fn find(&self, name: &str) -> Option<&WikiConfig> {
        self.configurations.iter().find(|c| c.name == name)
    }

    /// 添加配置，同名配置被替换
    ///
    /// # Returns
    ///
    /// 是否替换了已有配置
    pub fn upsert(&mut self, config: WikiConfig) -> bool {
        match self.configurations.iter_mut().find(|c| c.name == config.name) {
            Some(existing) => {
                *existing = config;
                true
            }
            None => {
                self.configurations.push(config);
                false
            }
        }
    }

    /// 按名称移除配置
    pub fn remove(&mut self, name: &str) -> Option<WikiConfig> {
        let index = self.configurations.iter().position(|c| c.name == name)?;
        Some(self.configurations.remove(index))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 构建运行参数
    pub fn options(&self, notices: Option<NoticeSender>) -> WikiOptions {
        WikiOptions {
            debounce: self.debounce(),
            templates: TemplateLoader::with_program_defaults(self.default_template.clone()),
            log_capacity: self.log_capacity,
            notices,
        }
    }
}

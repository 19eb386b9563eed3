//! HTML 模板模块
//!
//! 模板是带有两个替换标记的 HTML 文本：`{CONTENT}` 与 `{TITLE}`。
//!
//! ## 查找顺序
//!
//! 1. `<输入目录>/Templates/Layout.html`
//! 2. 程序自带的默认模板（候选路径依次尝试）
//!
//! 模板不做缓存，每次渲染都重新读取，修改自定义模板后下一次渲染立即生效。

use crate::core::error::{Result, WikiError};
use std::fs;
use std::path::{Path, PathBuf};

/// 正文替换标记
pub const CONTENT_MARKER: &str = "{CONTENT}";
/// 标题替换标记
pub const TITLE_MARKER: &str = "{TITLE}";

/// 模板相对于根目录的位置
pub const TEMPLATE_RELATIVE_PATH: &str = "Templates/Layout.html";

/// 已加载的模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// 模板来源
    pub source: PathBuf,
    text: String,
}

impl Template {
    pub fn new(source: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// 替换正文与标题标记
    ///
    /// 先替换正文再替换标题。
    pub fn render(&self, content: &str, title: &str) -> String {
        self.text
            .replace(CONTENT_MARKER, content)
            .replace(TITLE_MARKER, title)
    }
}

/// 模板加载器
#[derive(Debug, Clone, Default)]
pub struct TemplateLoader {
    /// 默认模板候选路径，按顺序尝试
    defaults: Vec<PathBuf>,
}

impl TemplateLoader {
    /// 使用给定的默认模板候选路径
    pub fn new(defaults: Vec<PathBuf>) -> Self {
        Self { defaults }
    }

    /// 程序默认位置：可执行文件所在目录，其次是当前工作目录
    ///
    /// # Arguments
    ///
    /// * `override_path` - 设置中显式指定的默认模板，优先于其他位置
    pub fn with_program_defaults(override_path: Option<PathBuf>) -> Self {
        let mut defaults = Vec::new();
        if let Some(path) = override_path {
            defaults.push(path);
        }
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            defaults.push(exe_dir.join(TEMPLATE_RELATIVE_PATH));
        }
        defaults.push(PathBuf::from(TEMPLATE_RELATIVE_PATH));
        Self { defaults }
    }

    pub fn defaults(&self) -> &[PathBuf] {
        &self.defaults
    }

    /// 解析当前生效的模板路径
    pub fn resolve(&self, input_root: &Path) -> Result<PathBuf> {
        let custom = input_root.join(TEMPLATE_RELATIVE_PATH);
        if custom.is_file() {
            return Ok(custom);
        }

        self.defaults
            .iter()
            .find(|p| p.is_file())
            .cloned()
            .ok_or_else(|| WikiError::TemplateNotFound {
                custom,
                defaults: self.defaults.clone(),
            })
    }

    /// 加载模板
    pub fn load(&self, input_root: &Path) -> Result<Template> {
        let path = self.resolve(input_root)?;
        let text = fs::read_to_string(&path).map_err(|e| match e.kind() {
            // resolve 与读取之间文件被删除
            std::io::ErrorKind::NotFound => WikiError::TemplateNotFound {
                custom: input_root.join(TEMPLATE_RELATIVE_PATH),
                defaults: self.defaults.clone(),
            },
            _ => WikiError::io(&path, e),
        })?;
        tracing::debug!("Loaded template {:?}", path);
        Ok(Template::new(path, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorKind;
    use tempfile::TempDir;

    fn write_template(root: &Path, text: &str) -> PathBuf {
        let path = root.join(TEMPLATE_RELATIVE_PATH);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_render_markers() {
        let template = Template::new("t.html", "<html>{TITLE}{CONTENT}</html>");
        assert_eq!(
            template.render("<h1>Hi</h1>", "note"),
            "<html>note<h1>Hi</h1></html>"
        );
    }

    #[test]
    fn test_render_replaces_every_marker() {
        let template = Template::new("t.html", "<title>{TITLE}</title><h1>{TITLE}</h1>{CONTENT}");
        assert_eq!(
            template.render("body", "x"),
            "<title>x</title><h1>x</h1>body"
        );
    }

    #[test]
    fn test_custom_template_preferred() {
        let input = TempDir::new().unwrap();
        let program = TempDir::new().unwrap();
        let default = write_template(program.path(), "default");
        let custom = write_template(input.path(), "custom");

        let loader = TemplateLoader::new(vec![default]);
        let template = loader.load(input.path()).unwrap();
        assert_eq!(template.text(), "custom");
        assert_eq!(template.source, custom);
    }

    #[test]
    fn test_falls_back_to_default() {
        let input = TempDir::new().unwrap();
        let program = TempDir::new().unwrap();
        let missing = program.path().join("nowhere.html");
        let default = write_template(program.path(), "default");

        let loader = TemplateLoader::new(vec![missing, default]);
        assert_eq!(loader.load(input.path()).unwrap().text(), "default");
    }

    #[test]
    fn test_not_found() {
        let input = TempDir::new().unwrap();
        let loader = TemplateLoader::new(vec![input.path().join("none.html")]);

        let err = loader.load(input.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TemplateNotFound);
    }

    #[test]
    fn test_no_caching_between_loads() {
        let input = TempDir::new().unwrap();
        let loader = TemplateLoader::default();

        write_template(input.path(), "v1");
        assert_eq!(loader.load(input.path()).unwrap().text(), "v1");

        write_template(input.path(), "v2");
        assert_eq!(loader.load(input.path()).unwrap().text(), "v2");
    }
}

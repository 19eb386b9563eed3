//! 文档渲染模块
//!
//! 渲染流程：加锁 → 加载模板 → 读取源文档 → 改写 wiki 链接 → 转换为 HTML → 套用模板 → 写入输出文件
//!
//! 每个配置拥有一把互斥锁，覆盖模板读取到文件写入的整个过程；
//! 删除输出文件也走同一把锁，因此同一输出路径上的渲染与删除总是有序的。
//! 不同配置的锁互相独立，可以并行渲染。

use crate::core::activity::{ActivityLog, Notice};
use crate::core::error::{Result, WikiError};
use crate::core::parser::{is_document, markdown_to_html, LinkRewriter, HTML_EXTENSION};
use crate::core::template::TemplateLoader;
use crate::core::watcher::{DocumentSink, SessionGate};
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// 渲染器参数
#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// 是否自动创建链接目标文档
    pub auto_create: bool,
    /// 自动创建后是否询问打开
    pub ask_to_open: bool,
}

/// 批量渲染汇总
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RenderSummary {
    /// 成功渲染的文件
    pub rendered: Vec<PathBuf>,
    /// 渲染失败的文件
    pub failed: Vec<PathBuf>,
    /// 无法列出输入目录时的错误次数
    pub errors: usize,
}

impl RenderSummary {
    pub fn has_errors(&self) -> bool {
        !self.failed.is_empty() || self.errors > 0
    }
}

/// 文档渲染器
#[derive(Debug)]
pub struct DocumentRenderer {
    options: RendererOptions,
    rewriter: LinkRewriter,
    templates: TemplateLoader,
    /// 配置级互斥锁
    lock: Arc<Mutex<()>>,
    log: ActivityLog,
}

impl DocumentRenderer {
    pub fn new(options: RendererOptions, templates: TemplateLoader, log: ActivityLog) -> Self {
        let rewriter = LinkRewriter::new(&options.input_dir, options.auto_create);
        Self {
            options,
            rewriter,
            templates,
            lock: Arc::new(Mutex::new(())),
            log,
        }
    }

    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    pub fn log(&self) -> &ActivityLog {
        &self.log
    }

    /// 计算输出路径
    ///
    /// 与源文档同名，扩展名替换为 `.html`，位于输出目录下。
    ///
    /// # Errors
    ///
    /// 输出目录不存在，或与输入目录相同时返回配置错误
    pub fn output_path(&self, file: &Path) -> Result<PathBuf> {
        let output_dir = &self.options.output_dir;
        if !output_dir.is_dir() {
            return Err(WikiError::OutputDirMissing(output_dir.clone()));
        }
        if same_directory(output_dir, &self.options.input_dir) {
            return Err(WikiError::Configuration(format!(
                "Output path must differ from input path: {}",
                output_dir.display()
            )));
        }

        let stem = file.file_stem().ok_or_else(|| {
            WikiError::Configuration(format!("Not a document path: {}", file.display()))
        })?;
        let mut name = stem.to_os_string();
        name.push(".");
        name.push(HTML_EXTENSION);
        Ok(output_dir.join(name))
    }

    /// 渲染单个文档，错误向上传递
    pub fn render_document(&self, file: &Path) -> Result<PathBuf> {
        let _guard = self.lock.lock();
        self.render_locked(file)
    }

    /// 渲染单个文档
    ///
    /// 任何错误都只记录到日志，不会向外传播。
    pub fn render(&self, file: &Path) -> bool {
        let result = self.render_document(file);
        self.report_render(file, result)
    }

    /// 删除源文档对应的输出文件，错误向上传递
    ///
    /// # Returns
    ///
    /// 被删除的输出文件；输出文件本就不存在时返回 `None`
    pub fn delete_document(&self, file: &Path) -> Result<Option<PathBuf>> {
        let _guard = self.lock.lock();
        self.delete_locked(file)
    }

    /// 删除源文档对应的输出文件
    pub fn delete(&self, file: &Path) -> bool {
        let result = self.delete_document(file);
        self.report_delete(result)
    }

    /// 渲染输入目录下（不递归）的所有源文档
    ///
    /// 输入目录无法读取时记录错误并计入 [`RenderSummary::errors`]。
    pub fn render_all(&self) -> RenderSummary {
        let mut summary = RenderSummary::default();

        let files = match self.list_documents() {
            Ok(files) => files,
            Err(e) => {
                self.log.error(e);
                summary.errors += 1;
                return summary;
            }
        };

        for file in files {
            if self.render(&file) {
                summary.rendered.push(file);
            } else {
                summary.failed.push(file);
            }
        }

        summary
    }

    /// 列出输入目录下的源文档，按文件名排序
    pub fn list_documents(&self) -> Result<Vec<PathBuf>> {
        let input_dir = &self.options.input_dir;
        let mut files = Vec::new();

        for entry in WalkDir::new(input_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| walk_error(input_dir, e))?;
            if entry.file_type().is_file() && is_document(entry.path()) {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    fn render_locked(&self, file: &Path) -> Result<PathBuf> {
        let template = self.templates.load(&self.options.input_dir)?;
        let html_path = self.output_path(file)?;

        // std 在 Windows 上以共享读写方式打开文件，编辑器仍可持有该文件
        let bytes = fs::read(file).map_err(|e| WikiError::io(file, e))?;
        // 非 UTF-8 文档按替换字符解码，仍然发布
        let data = String::from_utf8_lossy(&bytes);

        let rewrite = self.rewriter.rewrite(&data);
        for path in rewrite.created {
            self.log.info(format!("Created: {}", path.display()));
            self.log.notify(Notice::DocumentCreated {
                configuration: self.log.configuration().to_string(),
                path,
                ask_to_open: self.options.ask_to_open,
            });
        }
        for failure in rewrite.failures {
            self.log.error(failure);
        }

        let title = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = template.render(&markdown_to_html(&rewrite.doc.content), &title);

        fs::write(&html_path, output).map_err(|e| WikiError::io(&html_path, e))?;
        tracing::debug!("Wrote {:?} using template {:?}", html_path, template.source);
        Ok(html_path)
    }

    fn delete_locked(&self, file: &Path) -> Result<Option<PathBuf>> {
        let html_path = self.output_path(file)?;
        match fs::remove_file(&html_path) {
            Ok(()) => Ok(Some(html_path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WikiError::io(&html_path, e)),
        }
    }

    fn report_render(&self, file: &Path, result: Result<PathBuf>) -> bool {
        match result {
            Ok(_) => {
                self.log.info(format!("Updated: {}", file.display()));
                true
            }
            Err(e) => {
                self.log.error(e);
                false
            }
        }
    }

    fn report_delete(&self, result: Result<Option<PathBuf>>) -> bool {
        match result {
            Ok(Some(html_path)) => {
                self.log.info(format!("Deleted: {}", html_path.display()));
                true
            }
            Ok(None) => true,
            Err(e) => {
                self.log.error(e);
                false
            }
        }
    }
}

impl DocumentSink for DocumentRenderer {
    fn dispatch_render(&self, path: &Path, gate: &SessionGate) {
        let result = {
            let _guard = self.lock.lock();
            if !gate.is_open() {
                tracing::debug!("Session closed, skipping render of {:?}", path);
                return;
            }
            self.render_locked(path)
        };
        self.report_render(path, result);
    }

    fn dispatch_delete(&self, path: &Path, gate: &SessionGate) {
        let result = {
            let _guard = self.lock.lock();
            if !gate.is_open() {
                tracing::debug!("Session closed, skipping delete of {:?}", path);
                return;
            }
            self.delete_locked(path)
        };
        self.report_delete(result);
    }

    fn close_session(&self, gate: &SessionGate) {
        // 持锁关闭：正在进行的渲染完成后，不会再有新的渲染开始
        let _guard = self.lock.lock();
        gate.close();
    }
}

fn walk_error(root: &Path, e: walkdir::Error) -> WikiError {
    let path = e.path().unwrap_or(root).to_path_buf();
    let source = e
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    WikiError::io(path, source)
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

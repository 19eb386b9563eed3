//! Wiki 链接改写模块
//!
//! 将文档中的 wiki 链接改写为标准 Markdown 链接
//!
//! ## 链接格式
//!
//! ```markdown
//! [[目标]]            -> [目标](目标.html)
//! [[标题|目标]]       -> [标题](目标.html)
//! ```
//!
//! 链接从 `[[` 开始，到其后第一个 `]]` 结束；内部文本按第一个 `|` 分割。
//! 未闭合的 `[[` 原样保留。

use crate::core::error::{Result, WikiError};
use regex::Regex;
use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

static WIKI_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[(.*?)\]\]").expect("wiki link pattern is valid"));

/// 自动创建文档的占位正文
pub const PLACEHOLDER_BODY: &str = "TODO";

/// 源文档扩展名
pub const DOCUMENT_EXTENSION: &str = "md";

/// Wiki 链接结构
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink {
    /// 显示文本
    pub title: String,
    /// 目标标识（同时作为输出文件名）
    pub target: String,
}

impl WikiLink {
    /// 解析 `[[` 与 `]]` 之间的文本
    pub fn parse(inner: &str) -> Self {
        match inner.split_once('|') {
            Some((title, target)) => Self {
                title: title.to_string(),
                target: target.to_string(),
            },
            None => Self {
                title: inner.to_string(),
                target: inner.to_string(),
            },
        }
    }

    /// 转换为标准 Markdown 链接
    pub fn to_markdown(&self) -> String {
        format!("[{}]({}.html)", self.title, self.target)
    }
}

/// 解析文档中的所有 wiki 链接
pub fn parse_wiki_links(content: &str) -> Vec<WikiLink> {
    WIKI_LINK_RE
        .captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| WikiLink::parse(m.as_str()))
        .collect()
}

/// 改写后的文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenDoc {
    /// 改写后的 Markdown
    pub content: String,
    /// 遇到的所有链接目标
    pub targets: BTreeSet<String>,
}

/// 将所有 wiki 链接改写为 `[标题](目标.html)`
///
/// 纯函数，没有任何文件系统副作用。
pub fn rewrite_wiki_links(content: &str) -> RewrittenDoc {
    let mut targets = BTreeSet::new();

    let content = WIKI_LINK_RE
        .replace_all(content, |cap: &regex::Captures| {
            let link = WikiLink::parse(&cap[1]);
            targets.insert(link.target.clone());
            link.to_markdown()
        })
        .into_owned();

    RewrittenDoc { content, targets }
}

/// 为链接目标创建缺失的源文档
///
/// 文档内容为一行标题加占位正文。已存在的文件不会被覆盖。
///
/// # Returns
///
/// 新创建文件的路径；文件已存在时返回 `None`
pub fn create_missing_document(input_root: &Path, target: &str) -> Result<Option<PathBuf>> {
    let relative = Path::new(target);
    let escapes_root = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if target.trim().is_empty() || escapes_root {
        return Err(WikiError::Configuration(format!(
            "Link target cannot be used as a file name: '{}'",
            target
        )));
    }

    let path = input_root.join(format!("{}.{}", target, DOCUMENT_EXTENSION));
    let heading = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.to_string());

    // create_new 保证并发创建时不会覆盖已有文件
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(None),
        Err(e) => return Err(WikiError::io(&path, e)),
    };

    write!(file, "# {}\n\n{}", heading, PLACEHOLDER_BODY).map_err(|e| WikiError::io(&path, e))?;
    Ok(Some(path))
}

/// 单次改写的结果
#[derive(Debug)]
pub struct LinkRewrite {
    /// 改写后的文档
    pub doc: RewrittenDoc,
    /// 本次新创建的源文档
    pub created: Vec<PathBuf>,
    /// 创建失败的链接目标，不影响改写本身
    pub failures: Vec<WikiError>,
}

/// 带自动创建策略的链接改写器
#[derive(Debug, Clone)]
pub struct LinkRewriter {
    input_root: PathBuf,
    auto_create: bool,
}

impl LinkRewriter {
    pub fn new(input_root: impl Into<PathBuf>, auto_create: bool) -> Self {
        Self {
            input_root: input_root.into(),
            auto_create,
        }
    }

    /// 改写链接，并在启用自动创建时补全缺失的目标文档
    ///
    /// 创建失败只会被记录，改写总是成功。
    pub fn rewrite(&self, content: &str) -> LinkRewrite {
        let doc = rewrite_wiki_links(content);
        let mut created = Vec::new();
        let mut failures = Vec::new();

        if self.auto_create {
            for target in &doc.targets {
                match create_missing_document(&self.input_root, target) {
                    Ok(Some(path)) => {
                        tracing::debug!("Created linked document {:?}", path);
                        created.push(path);
                    }
                    Ok(None) => {}
                    Err(e) => failures.push(e),
                }
            }
        }

        LinkRewrite {
            doc,
            created,
            failures,
        }
    }
}

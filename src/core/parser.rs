//! 文档解析模块
//!
//! - [`wiki_link`] - `[[目标]]` / `[[标题|目标]]` 链接的解析与改写
//! - [`markdown_to_html`] - Markdown 到 HTML 片段的转换（基于 pulldown-cmark）

pub mod wiki_link;

pub use wiki_link::{
    create_missing_document, parse_wiki_links, rewrite_wiki_links, LinkRewrite, LinkRewriter,
    RewrittenDoc, WikiLink, DOCUMENT_EXTENSION,
};

use pulldown_cmark::{html, Options, Parser};
use std::path::Path;

/// 输出文档扩展名
pub const HTML_EXTENSION: &str = "html";

/// 路径是否为源文档（按扩展名判断）
pub fn is_document(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXTENSION)
}

/// 将 Markdown 转换为 HTML 片段
///
/// 转换引擎本身不做任何链接处理，wiki 链接需在调用前改写完成。
pub fn markdown_to_html(markdown: &str) -> String {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let parser = Parser::new_ext(markdown, options);

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading() {
        assert_eq!(markdown_to_html("# Hi"), "<h1>Hi</h1>\n");
    }

    #[test]
    fn test_rewritten_link_becomes_anchor() {
        let doc = rewrite_wiki_links("See [[Home|index]].");
        let html = markdown_to_html(&doc.content);
        assert!(html.contains(r#"<a href="index.html">Home</a>"#));
    }

    #[test]
    fn test_is_document() {
        assert!(is_document(Path::new("wiki/note.md")));
        assert!(!is_document(Path::new("wiki/note.md.swp")));
        assert!(!is_document(Path::new("wiki/Templates/Layout.html")));
        assert!(!is_document(Path::new("wiki/md")));
    }

    #[test]
    fn test_table_extension() {
        let html = markdown_to_html("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"));
    }
}

pub mod activity;
pub mod error;
pub mod host;
pub mod parser;
pub mod renderer;
pub mod settings;
pub mod template;
pub mod watcher;
pub mod wiki;

// 重新导出 parser 模块中的公共 API
pub use parser::{
    is_document, markdown_to_html, parse_wiki_links, rewrite_wiki_links, LinkRewriter,
    RewrittenDoc, WikiLink,
};

pub use activity::{notice_channel, ActivityLog, LogEntry, Notice, NoticeReceiver, NoticeSender};
pub use error::{ErrorKind, Result, WikiError};
pub use host::WikiHost;
pub use renderer::{DocumentRenderer, RenderSummary, RendererOptions};
pub use settings::WikiSettings;
pub use template::{Template, TemplateLoader};

// 重新导出 watcher 模块中的公共 API
pub use watcher::{
    run_dispatcher, Debouncer, DocumentSink, FileEvent, FileWatcher, SessionGate, WatchSession,
};

pub use wiki::{WikiConfig, WikiConfiguration, WikiOptions};

//! Wiki 配置集成测试：渲染、去抖、监听与多配置并行

use mdwiki::core::{
    TemplateLoader, WikiConfig, WikiConfiguration, WikiHost, WikiOptions, WikiSettings,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const LAYOUT: &str = "<html>{TITLE}{CONTENT}</html>";

/// 输入目录带自定义模板，输出目录已存在
fn wiki_dirs(root: &Path, name: &str) -> (PathBuf, PathBuf) {
    let input = root.join(name);
    let output = root.join(format!("{}-html", name));
    fs::create_dir_all(input.join("Templates")).unwrap();
    fs::create_dir_all(&output).unwrap();
    fs::write(input.join("Templates/Layout.html"), LAYOUT).unwrap();
    (input, output)
}

fn options(debounce_ms: u64) -> WikiOptions {
    WikiOptions {
        debounce: Duration::from_millis(debounce_ms),
        templates: TemplateLoader::default(),
        ..WikiOptions::default()
    }
}

/// 轮询直到条件成立或超时
async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}

fn read(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok()
}

#[test]
fn test_render_all_with_links() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    fs::write(input.join("index.md"), "# Home\n\nSee [[the garden|Garden]].").unwrap();
    fs::write(input.join("readme.txt"), "not a document").unwrap();

    let mut config = WikiConfig::new("Notes", &input, &output);
    config.auto_create_new_files = true;
    let wiki = WikiConfiguration::new(config, options(1000));

    let summary = wiki.render_all();
    assert!(!summary.has_errors());
    assert_eq!(summary.rendered, vec![input.join("index.md")]);

    let html = read(&output.join("index.html")).unwrap();
    assert!(html.starts_with("<html>index<h1>Home</h1>"));
    assert!(html.contains(r#"<a href="Garden.html">the garden</a>"#));

    // 目标文档被创建，但不在本轮渲染中
    let created = read(&input.join("Garden.md")).unwrap();
    assert_eq!(created, "# Garden\n\nTODO");
    assert!(!output.join("Garden.html").exists());
    assert!(!output.join("readme.html").exists());

    let messages = wiki.log().messages();
    assert!(messages
        .iter()
        .any(|m| m == &format!("Created: {}", input.join("Garden.md").display())));
}

#[test]
fn test_render_without_output_dir_is_logged() {
    let temp = TempDir::new().unwrap();
    let (input, _) = wiki_dirs(temp.path(), "notes");
    fs::write(input.join("a.md"), "a").unwrap();

    let wiki = WikiConfiguration::new(
        WikiConfig::new("Notes", &input, temp.path().join("missing")),
        options(1000),
    );

    assert!(!wiki.render(&input.join("a.md")));
    let entry = &wiki.log().entries()[0];
    assert!(entry.is_error);
    assert!(entry.message.starts_with("Error: "));
}

#[test]
fn test_render_all_missing_input_reports_error() {
    let temp = TempDir::new().unwrap();
    let (_, output) = wiki_dirs(temp.path(), "notes");

    let wiki = WikiConfiguration::new(
        WikiConfig::new("Notes", temp.path().join("nope"), &output),
        options(1000),
    );

    let summary = wiki.render_all();
    assert!(summary.has_errors());
    assert!(summary.rendered.is_empty());
    assert!(wiki.log().messages()[0].starts_with("Error: "));
}

#[test]
fn test_render_non_utf8_document() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    let note = input.join("cafe.md");
    fs::write(&note, b"# Caf\xe9").unwrap();

    let wiki = WikiConfiguration::new(WikiConfig::new("Notes", &input, &output), options(1000));
    assert!(wiki.render(&note));

    let html = read(&output.join("cafe.html")).unwrap();
    assert_eq!(html, "<html>cafe<h1>Caf\u{fffd}</h1>\n</html>");
}

#[test]
fn test_delete_removes_output() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    let note = input.join("note.md");
    fs::write(&note, "hello").unwrap();

    let wiki = WikiConfiguration::new(WikiConfig::new("Notes", &input, &output), options(1000));
    assert!(wiki.render(&note));
    assert!(output.join("note.html").exists());

    fs::remove_file(&note).unwrap();
    assert!(wiki.delete(&note));
    assert!(!output.join("note.html").exists());
    assert_eq!(
        wiki.log().messages()[0],
        format!("Deleted: {}", output.join("note.html").display())
    );

    // 输出已不存在时静默成功
    assert!(wiki.delete(&note));
}

#[tokio::test]
async fn test_start_on_missing_directory() {
    let temp = TempDir::new().unwrap();
    let input = temp.path().join("nowhere");
    let wiki = WikiConfiguration::new(
        WikiConfig::new("Ghost", &input, temp.path().join("out")),
        options(100),
    );

    assert!(!wiki.start());
    assert!(!wiki.is_watching());
    assert_eq!(
        wiki.log().messages()[0],
        format!("Error: Directory path does not exist: {}", input.display())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_renders_latest_content() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    let wiki = WikiConfiguration::new(WikiConfig::new("Notes", &input, &output), options(300));

    assert!(wiki.start());
    assert!(wiki.is_watching());

    let note = input.join("draft.md");
    for i in 0..5 {
        fs::write(&note, format!("# Version {}", i)).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    let html_path = output.join("draft.html");
    let rendered = wait_until(Duration::from_secs(10), || {
        read(&html_path).is_some_and(|html| html.contains("Version 4"))
    })
    .await;
    assert!(rendered, "draft.html was not rendered with the final content");

    // 快速连续的写入只触发一次渲染
    tokio::time::sleep(Duration::from_millis(500)).await;
    let updates = wiki
        .log()
        .messages()
        .iter()
        .filter(|m| m.starts_with("Updated: "))
        .count();
    assert_eq!(updates, 1, "rapid writes should render once");

    wiki.stop();
    assert!(!wiki.is_watching());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_deletes_output() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    let note = input.join("gone.md");
    fs::write(&note, "bye").unwrap();

    let wiki = WikiConfiguration::new(WikiConfig::new("Notes", &input, &output), options(100));
    assert!(wiki.render(&note));
    assert!(wiki.start());

    fs::remove_file(&note).unwrap();
    let html_path = output.join("gone.html");
    let deleted = wait_until(Duration::from_secs(10), || !html_path.exists()).await;
    assert!(deleted, "gone.html was not deleted");

    wiki.dispose();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_no_render_after_stop() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");
    let wiki = WikiConfiguration::new(WikiConfig::new("Notes", &input, &output), options(300));

    assert!(wiki.start());
    fs::write(input.join("late.md"), "late").unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    wiki.stop();

    tokio::time::sleep(Duration::from_millis(800)).await;
    assert!(!output.join("late.html").exists());
    assert_eq!(
        wiki.log().messages()[0],
        format!("Stopped watching: {}", input.display())
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_configurations_render_in_parallel() {
    let temp = TempDir::new().unwrap();
    let mut settings = WikiSettings::default();
    for name in ["alpha", "beta"] {
        let (input, output) = wiki_dirs(temp.path(), name);
        for i in 0..20 {
            let document = input.join(format!("{}-{}.md", name, i));
            fs::write(document, format!("# {} {}", name, i)).unwrap();
        }
        settings.upsert(WikiConfig::new(name, input, output));
    }

    let mut host = WikiHost::new(None);
    host.load(&settings);

    let tasks: Vec<_> = host
        .configurations()
        .iter()
        .cloned()
        .map(|wiki: Arc<WikiConfiguration>| {
            tokio::task::spawn_blocking(move || wiki.render_all())
        })
        .collect();

    for task in tasks {
        let summary = task.await.unwrap();
        assert_eq!(summary.rendered.len(), 20);
        assert!(!summary.has_errors());
    }

    for name in ["alpha", "beta"] {
        let output = temp.path().join(format!("{}-html", name));
        for i in 0..20 {
            let html = read(&output.join(format!("{}-{}.html", name, i))).unwrap();
            assert_eq!(
                html,
                format!("<html>{0}-{1}<h1>{0} {1}</h1>\n</html>", name, i)
            );
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_host_reload_replaces_watchers() {
    let temp = TempDir::new().unwrap();
    let (input, output) = wiki_dirs(temp.path(), "notes");

    let mut settings = WikiSettings {
        debounce_ms: 100,
        ..WikiSettings::default()
    };
    settings.upsert(WikiConfig::new("Notes", &input, &output));

    let mut host = WikiHost::new(None);
    host.reload(&settings);
    host.reload(&settings);
    assert_eq!(host.configurations().len(), 1);
    assert!(host.get("Notes").unwrap().is_watching());

    fs::write(input.join("once.md"), "once").unwrap();
    let html_path = output.join("once.html");
    assert!(wait_until(Duration::from_secs(10), || html_path.exists()).await);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let updates = host
        .get("Notes")
        .unwrap()
        .log()
        .messages()
        .iter()
        .filter(|m| m.starts_with("Updated: "))
        .count();
    assert_eq!(updates, 1);

    host.dispose_all();
}

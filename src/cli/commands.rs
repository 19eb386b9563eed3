use super::*;
use crate::core::{
    notice_channel, Notice, NoticeReceiver, RenderSummary, WikiConfig, WikiConfiguration, WikiHost,
    WikiSettings,
};
use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::{JoinError, JoinHandle};
use tracing::{info, warn};

/// 确定设置文件位置
pub fn settings_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => {
            WikiSettings::default_path().context("Cannot determine the configuration directory")
        }
    }
}

pub fn list(_args: ListArgs, settings_path: &Path) -> Result<()> {
    let settings = WikiSettings::from_file(settings_path)?;
    if settings.configurations.is_empty() {
        println!("No wikis configured. Use `mdwiki add` to create one.");
        return Ok(());
    }

    for config in &settings.configurations {
        println!("{}", config.name);
        println!("  input:  {}", config.input_path.display());
        println!("  output: {}", config.output_path.display());
        println!(
            "  auto-create: {}, ask-to-open: {}",
            config.auto_create_new_files, config.ask_to_open_new_files
        );
    }
    Ok(())
}

pub fn add(args: AddArgs, settings_path: &Path) -> Result<()> {
    let mut settings = WikiSettings::from_file(settings_path)?;

    if !args.input.is_dir() {
        warn!("Input directory does not exist yet: {:?}", args.input);
    }
    if !args.output.is_dir() {
        warn!("Output directory does not exist yet: {:?}", args.output);
    }

    let config = WikiConfig {
        name: args.name,
        input_path: args.input,
        output_path: args.output,
        auto_create_new_files: args.auto_create,
        ask_to_open_new_files: args.ask_to_open,
    };
    let name = config.name.clone();
    if settings.upsert(config) {
        info!("Replaced wiki '{}'", name);
    } else {
        info!("Added wiki '{}'", name);
    }

    settings.save(settings_path)
}

pub fn remove(args: RemoveArgs, settings_path: &Path) -> Result<()> {
    let mut settings = WikiSettings::from_file(settings_path)?;
    if settings.remove(&args.name).is_none() {
        anyhow::bail!("No wiki named '{}'", args.name);
    }
    info!("Removed wiki '{}'", args.name);
    settings.save(settings_path)
}

pub async fn render(args: RenderArgs, settings_path: &Path) -> Result<()> {
    let settings = select(WikiSettings::from_file(settings_path)?, &args.names)?;

    let mut host = WikiHost::new(None);
    host.load(&settings);

    // 不同配置互不干扰，并行渲染
    let tasks: Vec<_> = host
        .configurations()
        .iter()
        .cloned()
        .map(|wiki| tokio::task::spawn_blocking(move || render_one(wiki)))
        .collect();

    let mut failed = Vec::new();
    for task in tasks {
        let (wiki, summary) = task.await?;

        println!("\n=== {} ===", wiki.name());
        for entry in wiki.log().entries().iter().rev() {
            println!("{}", entry);
        }
        println!(
            "Rendered: {}, failed: {}",
            summary.rendered.len(),
            summary.failed.len()
        );
        if summary.has_errors() {
            failed.push(wiki.name().to_string());
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Rendering failed for: {}", failed.join(", "));
    }
    Ok(())
}

fn render_one(wiki: Arc<WikiConfiguration>) -> (Arc<WikiConfiguration>, RenderSummary) {
    let summary = wiki.render_all();
    (wiki, summary)
}

pub async fn watch(args: WatchArgs, settings_path: &Path) -> Result<()> {
    let settings = select(WikiSettings::from_file(settings_path)?, &args.names)?;
    if settings.configurations.is_empty() {
        anyhow::bail!("No wikis configured. Use `mdwiki add` to create one.");
    }

    let (tx, rx) = notice_channel();
    let mut host = WikiHost::new(Some(tx));
    host.reload(&settings);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    present(rx, shutdown, |path| tokio::spawn(prompt_open(path))).await;

    info!("Shutting down");
    host.dispose_all();
    Ok(())
}

type PromptTask = JoinHandle<Result<()>>;

/// 展示循环：打印日志，处理新建文档的询问，直到 Ctrl-C
///
/// 询问在独立任务中等待输入，期间仍然响应 Ctrl-C 并继续打印日志；
/// 同时至多一个询问，其余按顺序排队。
async fn present<S, P>(mut rx: NoticeReceiver, shutdown: S, start_prompt: P)
where
    S: Future<Output = ()>,
    P: Fn(PathBuf) -> PromptTask,
{
    tokio::pin!(shutdown);

    let mut prompts: VecDeque<PathBuf> = VecDeque::new();
    let mut prompt: Option<PromptTask> = None;

    loop {
        if prompt.is_none() {
            prompt = prompts.pop_front().map(&start_prompt);
        }

        tokio::select! {
            _ = &mut shutdown => break,
            result = wait_prompt(&mut prompt), if prompt.is_some() => {
                prompt = None;
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => warn!("Prompt failed: {}", e),
                    Err(e) => warn!("Prompt task failed: {}", e),
                }
            }
            notice = rx.recv() => match notice {
                Some(Notice::Log { configuration, entry }) => {
                    println!("[{}] {}", configuration, entry);
                }
                Some(Notice::DocumentCreated { path, ask_to_open: true, .. }) => {
                    prompts.push_back(path);
                }
                Some(Notice::DocumentCreated { .. }) => {}
                None => break,
            },
        }
    }

    if let Some(prompt) = prompt {
        prompt.abort();
    }
}

/// 等待当前询问结束；没有询问时永不完成
async fn wait_prompt(prompt: &mut Option<PromptTask>) -> Result<Result<()>, JoinError> {
    match prompt {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

/// 在独立线程中询问，退出时不必等待阻塞的标准输入
async fn prompt_open(path: PathBuf) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let _ = tx.send(ask_to_open(&path));
    });
    rx.await.context("Prompt thread exited unexpectedly")?
}

fn ask_to_open(path: &Path) -> Result<()> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    print!(
        "Do you want to open the newly created MD file '{}'? [y/N] ",
        name
    );
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    if matches!(answer.trim(), "y" | "Y" | "yes") {
        open_in_editor(path)?;
    }
    Ok(())
}

fn open_in_editor(path: &Path) -> Result<()> {
    let editor = std::env::var("VISUAL")
        .or_else(|_| std::env::var("EDITOR"))
        .context("Set $VISUAL or $EDITOR to open documents")?;

    std::process::Command::new(&editor)
        .arg(path)
        .spawn()
        .with_context(|| format!("Failed to launch {}", editor))?;
    Ok(())
}

/// 按名称筛选配置，名称为空时返回全部
fn select(mut settings: WikiSettings, names: &[String]) -> Result<WikiSettings> {
    if names.is_empty() {
        return Ok(settings);
    }

    for name in names {
        if settings.find(name).is_none() {
            anyhow::bail!("No wiki named '{}'", name);
        }
    }
    settings.configurations.retain(|c| names.contains(&c.name));
    Ok(settings)
}

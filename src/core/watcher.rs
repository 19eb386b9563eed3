//! 文件监听模块
//!
//! 使用 notify 库监听输入目录（不递归），将原始通知转换为 [`FileEvent`]，
//! 再经由按文件去抖的 [`Debouncer`] 分发给 [`DocumentSink`]。
//!
//! ## 事件流
//!
//! ```text
//! notify 回调线程 → 无界通道 → 分发任务（去抖） → spawn_blocking 渲染
//! ```
//!
//! 创建与修改事件使用同一个去抖间隔；删除事件取消该文件待执行的渲染并立即执行。

use crate::core::error::{Result, WikiError};
use crate::core::parser::is_document;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// 默认去抖间隔
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// 文件变化事件类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    /// 文件被创建
    Created(PathBuf),
    /// 文件被修改
    Modified(PathBuf),
    /// 文件被删除
    Deleted(PathBuf),
}

impl FileEvent {
    /// 获取事件涉及的路径
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Created(p) | FileEvent::Modified(p) | FileEvent::Deleted(p) => p,
        }
    }
}

/// 将 notify 事件转换为内部事件类型
///
/// 只保留源文档；重命名视为旧名删除加新名创建。
pub fn convert_event(event: &notify::Event) -> Vec<FileEvent> {
    let events = match event.kind {
        EventKind::Create(_) => event.paths.iter().cloned().map(FileEvent::Created).collect(),
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
            event.paths.iter().cloned().map(FileEvent::Modified).collect()
        }
        EventKind::Remove(_) => event.paths.iter().cloned().map(FileEvent::Deleted).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => convert_rename(mode, &event.paths),
        _ => Vec::new(),
    };

    events.into_iter().filter(|e| is_document(e.path())).collect()
}

fn convert_rename(mode: RenameMode, paths: &[PathBuf]) -> Vec<FileEvent> {
    match (mode, paths) {
        (RenameMode::Both, [from, to, ..]) => vec![
            FileEvent::Deleted(from.clone()),
            FileEvent::Created(to.clone()),
        ],
        (RenameMode::From, [from, ..]) => vec![FileEvent::Deleted(from.clone())],
        (RenameMode::To, [to, ..]) => vec![FileEvent::Created(to.clone())],
        // 平台没有给出方向，按文件是否仍存在判断
        (_, paths) => paths
            .iter()
            .map(|p| {
                if p.exists() {
                    FileEvent::Created(p.clone())
                } else {
                    FileEvent::Deleted(p.clone())
                }
            })
            .collect(),
    }
}

/// 监听会话的开关
///
/// 关闭后不会再开始新的渲染或删除。
#[derive(Debug)]
pub struct SessionGate {
    open: AtomicBool,
}

impl SessionGate {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// 去抖后事件的接收方
///
/// 方法在阻塞线程池中调用，可以执行同步 IO。
pub trait DocumentSink: Send + Sync + 'static {
    /// 渲染源文档；会话已关闭时不得开始
    fn dispatch_render(&self, path: &Path, gate: &SessionGate);

    /// 删除源文档对应的输出；会话已关闭时不得开始
    fn dispatch_delete(&self, path: &Path, gate: &SessionGate);

    /// 关闭会话，返回后不得再有新的渲染开始
    fn close_session(&self, gate: &SessionGate) {
        gate.close();
    }
}

/// 按文件去抖
///
/// 同一文件在间隔内的新事件会替换尚未触发的计时器。
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    sink: Arc<dyn DocumentSink>,
    gate: Arc<SessionGate>,
    runtime: Handle,
    /// 待触发的计时器，带代号以识别是否已被替换
    pending: Arc<Mutex<HashMap<PathBuf, (u64, JoinHandle<()>)>>>,
    next_id: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(
        delay: Duration,
        sink: Arc<dyn DocumentSink>,
        gate: Arc<SessionGate>,
        runtime: Handle,
    ) -> Self {
        Self {
            delay,
            sink,
            gate,
            runtime,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 处理一个文件事件
    pub fn handle(&self, event: FileEvent) {
        if !self.gate.is_open() {
            return;
        }

        match event {
            FileEvent::Created(path) | FileEvent::Modified(path) => self.schedule_render(path),
            FileEvent::Deleted(path) => {
                self.cancel(&path);
                let sink = self.sink.clone();
                let gate = self.gate.clone();
                self.runtime.spawn_blocking(move || sink.dispatch_delete(&path, &gate));
            }
        }
    }

    fn schedule_render(&self, path: PathBuf) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let sink = self.sink.clone();
        let gate = self.gate.clone();
        let pending = self.pending.clone();
        let key = path.clone();

        // 持锁插入，保证计时器触发时能看到自己的条目
        let mut map = self.pending.lock();
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            {
                let mut map = pending.lock();
                match map.get(&path) {
                    Some((current, _)) if *current == id => {
                        map.remove(&path);
                    }
                    _ => return,
                }
            }

            let result =
                tokio::task::spawn_blocking(move || sink.dispatch_render(&path, &gate)).await;
            if let Err(e) = result {
                tracing::error!("Render task failed: {}", e);
            }
        });

        if let Some((_, previous)) = map.insert(key.clone(), (id, task)) {
            tracing::debug!("Debounce reset for {:?}", key);
            previous.abort();
        }
    }

    /// 取消某个文件待触发的计时器
    pub fn cancel(&self, path: &Path) {
        if let Some((_, task)) = self.pending.lock().remove(path) {
            task.abort();
        }
    }

    /// 取消所有待触发的计时器
    pub fn cancel_all(&self) {
        for (_, (_, task)) in self.pending.lock().drain() {
            task.abort();
        }
    }

    /// 待触发的计时器数量
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// 运行分发循环，直到事件通道关闭
pub async fn run_dispatcher(mut rx: UnboundedReceiver<FileEvent>, debouncer: Debouncer) {
    while let Some(event) = rx.recv().await {
        tracing::debug!("File event: {:?}", event);
        debouncer.handle(event);
    }
    debouncer.cancel_all();
}

/// 文件监听器
///
/// 包装 notify 库；释放即关闭系统层面的监听句柄。
pub struct FileWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// 开始监听目录（不递归）
    ///
    /// # Arguments
    ///
    /// * `root` - 要监听的目录
    /// * `tx` - 转换后事件的发送端
    pub fn new(root: &Path, tx: UnboundedSender<FileEvent>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<notify::Event>| match result {
                Ok(event) => {
                    for file_event in convert_event(&event) {
                        let _ = tx.send(file_event);
                    }
                }
                Err(e) => {
                    tracing::error!("Watch error: {:?}", e);
                }
            },
        )
        .map_err(|e| WikiError::watch_start(root, e))?;

        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|e| WikiError::watch_start(root, e))?;
        tracing::debug!("Started watching: {:?}", root);

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        tracing::debug!("Stopped watching: {:?}", self.root);
    }
}

/// 一次活动的监听会话
///
/// 持有系统监听句柄、分发任务与去抖计时器；[`WatchSession::stop`] 或释放时全部回收。
pub struct WatchSession {
    watcher: Option<FileWatcher>,
    dispatcher: JoinHandle<()>,
    debouncer: Debouncer,
    sink: Arc<dyn DocumentSink>,
    gate: Arc<SessionGate>,
}

impl WatchSession {
    /// 建立监听会话
    ///
    /// # Errors
    ///
    /// 目录不存在或系统监听失败时返回 [`WikiError::WatchStart`]
    pub fn start(
        root: &Path,
        sink: Arc<dyn DocumentSink>,
        delay: Duration,
        runtime: Handle,
    ) -> Result<Self> {
        if !root.is_dir() {
            return Err(WikiError::watch_start(root, "Directory path does not exist"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let watcher = FileWatcher::new(root, tx)?;

        let gate = Arc::new(SessionGate::new());
        let debouncer = Debouncer::new(delay, sink.clone(), gate.clone(), runtime.clone());
        let dispatcher = runtime.spawn(run_dispatcher(rx, debouncer.clone()));

        Ok(Self {
            watcher: Some(watcher),
            dispatcher,
            debouncer,
            sink,
            gate,
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.watcher.as_ref().map(FileWatcher::root)
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// 停止监听
    ///
    /// 返回后不会再有由本会话触发的渲染开始。
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.watcher.take().is_none() {
            return;
        }
        self.dispatcher.abort();
        self.debouncer.cancel_all();
        self.sink.close_session(&self.gate);
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

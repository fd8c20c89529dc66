//! 桌面后端 - 通过外部命令发送通知和播放提示音
//!
//! - 通知：`notify-send --print-id`，同一 reminder 再次发布时带 `--replace-id`，
//!   ID 映射保存在收件箱旁的 `notification_ids.json`
//! - 提示音：`canberra-gtk-play`（可配置），每个提醒一个独立进程
//! - 振动：桌面设备没有振动马达
//! - 投递记录：间接路径写入收件箱，直接路径启动配置的应用命令

use anyhow::{anyhow, bail, Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{DesktopConfig, ReminderConfig};
use crate::reminder::channel::NotificationChannelSpec;
use crate::reminder::delivery::ActivationRequest;
use crate::reminder::inbox::ReminderInbox;
use crate::reminder::platform::{
    ActivationSurface, Haptics, NotificationCenter, Platform, RuntimeBridge, ToneId, TonePlayer,
};
use crate::reminder::presentation::{Priority, PresentationRecord};

const DEFAULT_NOTIFY_COMMAND: &str = "notify-send";
const DEFAULT_SOUND_COMMAND: &str = "canberra-gtk-play";
const NOTIFY_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// 解析命令路径：配置优先，其次 PATH
fn resolve_command(configured: Option<&str>, default: &str) -> Option<String> {
    if let Some(cmd) = configured {
        return Some(cmd.to_string());
    }
    which::which(default)
        .ok()
        .map(|p| p.to_string_lossy().to_string())
}

/// reminder_id -> 通知服务分配的 ID
///
/// 每次 `fire` 都是新进程，映射必须落盘才能在下一次发布时替换旧通知。
/// 读改写全程持有排他文件锁。
struct NotificationIdStore {
    path: PathBuf,
}

impl NotificationIdStore {
    fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// 加锁后把映射交给 `f`，映射有变化时写回
    fn update<T>(&self, f: impl FnOnce(&mut BTreeMap<i64, u32>) -> Result<T>) -> Result<T> {
        use fs2::FileExt;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        file.lock_exclusive()?;
        let result = self.update_locked(&mut file, f);
        file.unlock()?;
        result
    }

    fn update_locked<T>(
        &self,
        file: &mut File,
        f: impl FnOnce(&mut BTreeMap<i64, u32>) -> Result<T>,
    ) -> Result<T> {
        let mut content = String::new();
        file.read_to_string(&mut content)?;

        let before = parse_ids(&self.path, &content);
        let mut ids = before.clone();
        let value = f(&mut ids)?;

        if ids != before {
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(serde_json::to_string(&ids)?.as_bytes())?;
        }
        Ok(value)
    }

    fn snapshot(&self) -> BTreeMap<i64, u32> {
        match fs::read_to_string(&self.path) {
            Ok(content) => parse_ids(&self.path, &content),
            Err(_) => BTreeMap::new(),
        }
    }
}

/// 文件损坏时丢弃旧映射，最多多出一条重复通知
fn parse_ids(path: &Path, content: &str) -> BTreeMap<i64, u32> {
    if content.trim().is_empty() {
        return BTreeMap::new();
    }
    serde_json::from_str(content).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "Discarding unreadable notification id map");
        BTreeMap::new()
    })
}

/// 运行命令并在 `timeout` 内等待退出，返回 stdout
fn run_bounded(cmd: &str, args: &[String], timeout: Duration) -> Result<String> {
    let mut child = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("Failed to run {}", cmd))?;

    let status = wait_until(&mut child, Instant::now() + timeout)?;
    let Some(status) = status else {
        let _ = child.kill();
        let _ = child.wait();
        bail!("{} timed out after {}ms", cmd, timeout.as_millis());
    };

    let mut stdout = String::new();
    if let Some(mut out) = child.stdout.take() {
        out.read_to_string(&mut stdout)?;
    }
    if !status.success() {
        let mut stderr = String::new();
        if let Some(mut err) = child.stderr.take() {
            let _ = err.read_to_string(&mut stderr);
        }
        bail!("{} failed: {}", cmd, stderr.trim());
    }
    Ok(stdout)
}

/// 超过 deadline 仍未退出时返回 `None`
fn wait_until(child: &mut Child, deadline: Instant) -> Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        std::thread::sleep(NOTIFY_POLL_INTERVAL);
    }
}

pub struct DesktopNotificationCenter {
    app_name: String,
    notify_cmd: Option<String>,
    timeout: Duration,
    ids: NotificationIdStore,
}

impl DesktopNotificationCenter {
    /// `ids_path` 保存 reminder_id 到通知服务 ID 的映射
    pub fn new(config: &DesktopConfig, ids_path: PathBuf) -> Self {
        Self {
            app_name: config.app_name.clone(),
            notify_cmd: resolve_command(config.notify_command.as_deref(), DEFAULT_NOTIFY_COMMAND),
            timeout: config.notify_timeout(),
            ids: NotificationIdStore::new(ids_path),
        }
    }

    fn notify_args(&self, record: &PresentationRecord, replace: Option<u32>) -> Vec<String> {
        let urgency = match record.priority {
            Priority::High => "critical",
            Priority::Default => "normal",
        };
        let mut args = vec![
            format!("--app-name={}", self.app_name),
            format!("--urgency={}", urgency),
            format!("--category={}", record.category),
            // 支持同步提示的通知服务按这个 key 原地替换
            format!(
                "--hint=string:x-canonical-private-synchronous:reminder-{}",
                record.reminder_id
            ),
            "--print-id".to_string(),
        ];
        if let Some(id) = replace {
            args.push(format!("--replace-id={}", id));
        }
        args.push(record.title.clone());
        args.push(record.body.clone());
        args
    }
}

impl NotificationCenter for DesktopNotificationCenter {
    fn supports_channels(&self) -> bool {
        false
    }

    fn delete_channel(&self, _id: &str) -> Result<()> {
        Ok(())
    }

    fn create_channel(&self, _spec: &NotificationChannelSpec) -> Result<()> {
        Ok(())
    }

    fn notifications_enabled(&self) -> Option<bool> {
        None
    }

    fn post(&self, record: &PresentationRecord) -> Result<()> {
        let cmd = self
            .notify_cmd
            .as_deref()
            .ok_or_else(|| anyhow!("{} not found in PATH", DEFAULT_NOTIFY_COMMAND))?;

        self.ids.update(|ids| {
            let replace = ids.get(&record.reminder_id).copied();
            let stdout = run_bounded(cmd, &self.notify_args(record, replace), self.timeout)?;

            match stdout.trim().parse::<u32>() {
                Ok(id) => {
                    ids.insert(record.reminder_id, id);
                }
                Err(_) => debug!(cmd, "Notify command printed no notification id"),
            }
            Ok(())
        })
    }

    fn active(&self) -> Vec<i64> {
        self.ids.snapshot().into_keys().collect()
    }
}

/// 通过子进程播放提示音，每次播放一个独立进程
pub struct CommandTonePlayer {
    cmd: Option<String>,
    args: Vec<String>,
    next_id: AtomicU64,
    children: Mutex<HashMap<ToneId, Child>>,
}

impl CommandTonePlayer {
    pub fn new(config: &DesktopConfig) -> Self {
        Self {
            cmd: resolve_command(config.sound_command.as_deref(), DEFAULT_SOUND_COMMAND),
            args: config.sound_args.clone(),
            next_id: AtomicU64::new(1),
            children: Mutex::new(HashMap::new()),
        }
    }

    fn children(&self) -> MutexGuard<'_, HashMap<ToneId, Child>> {
        self.children.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl TonePlayer for CommandTonePlayer {
    fn play(&self) -> Result<ToneId> {
        let cmd = self
            .cmd
            .as_deref()
            .ok_or_else(|| anyhow!("{} not found in PATH", DEFAULT_SOUND_COMMAND))?;
        let child = Command::new(cmd)
            .args(&self.args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn {}", cmd))?;

        let id = ToneId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut children = self.children();
        // 顺手回收已经自然结束的进程
        children.retain(|_, c| matches!(c.try_wait(), Ok(None)));
        children.insert(id, child);
        Ok(id)
    }

    fn is_playing(&self, tone: ToneId) -> bool {
        match self.children().get_mut(&tone) {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    fn stop(&self, tone: ToneId) -> Result<()> {
        let child = self.children().remove(&tone);
        if let Some(mut child) = child {
            child.kill()?;
            let _ = child.wait();
        }
        Ok(())
    }
}

impl Drop for CommandTonePlayer {
    fn drop(&mut self) {
        for (_, mut child) in self.children().drain() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// 桌面设备没有振动马达
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn has_vibrator(&self) -> bool {
        false
    }

    fn vibrate(&self, _waveform: &[u64], _repeat: Option<usize>) -> Result<()> {
        bail!("no vibrator")
    }
}

/// 间接路径写收件箱，直接路径启动应用
pub struct InboxActivationSurface {
    inbox: ReminderInbox,
    app_command: Option<String>,
}

impl InboxActivationSurface {
    pub fn new(inbox: ReminderInbox, app_command: Option<String>) -> Self {
        Self { inbox, app_command }
    }
}

impl ActivationSurface for InboxActivationSurface {
    fn dispatch_deferred(&self, request: &ActivationRequest) -> Result<()> {
        self.inbox.append(request)?;
        debug!(path = %self.inbox.path().display(), "Activation request queued in inbox");
        Ok(())
    }

    fn start_direct(&self, request: &ActivationRequest) -> Result<()> {
        let cmd = self
            .app_command
            .as_deref()
            .ok_or_else(|| anyhow!("no application command configured"))?;
        let extras = serde_json::to_string(&request.extras)?;
        Command::new(cmd)
            .args(["--action", request.action.as_str(), "--extras", extras.as_str()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to start {}", cmd))?;
        Ok(())
    }
}

/// 运行时未注册监听
pub struct DetachedRuntime;

impl RuntimeBridge for DetachedRuntime {
    fn is_attached(&self) -> bool {
        false
    }

    fn invoke(&self, method: &str, _argument: &str) -> Result<()> {
        bail!("runtime not attached, cannot invoke {}", method)
    }
}

/// 已注册监听的运行时，调用只写日志
pub struct LoggingRuntime;

impl RuntimeBridge for LoggingRuntime {
    fn is_attached(&self) -> bool {
        true
    }

    fn invoke(&self, method: &str, argument: &str) -> Result<()> {
        info!(method, argument, "Runtime method invoked");
        Ok(())
    }
}

/// 按配置组装桌面后端
pub fn desktop_platform(config: &ReminderConfig) -> Platform {
    Platform {
        center: Arc::new(DesktopNotificationCenter::new(
            &config.desktop,
            config.notification_ids_path(),
        )),
        tone: Arc::new(CommandTonePlayer::new(&config.desktop)),
        haptics: Arc::new(NoHaptics),
        activation: Arc::new(InboxActivationSurface::new(
            ReminderInbox::new(config.inbox_path()),
            config.desktop.app_command.clone(),
        )),
        runtime: Arc::new(DetachedRuntime),
    }
}

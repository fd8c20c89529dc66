//! 提醒声音与振动
//!
//! 通知自带的声音经常不响，这里额外播放一次系统默认提示音并触发振动，
//! 5 秒后自动停止。声音和振动互不影响，任何失败只记录日志。

use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::error::{FeedbackKind, ReminderError};
use super::platform::{Haptics, TonePlayer};

/// 强振动波形：振-停-振-停-振
pub const ALERT_WAVEFORM: [u64; 6] = [0, 500, 200, 500, 200, 500];
/// 自动停止时间
pub const AUTO_STOP_AFTER: Duration = Duration::from_millis(5000);

/// 一次提醒反馈的状态
#[derive(Debug, Clone, PartialEq)]
pub struct AlertFeedbackSession {
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub auto_stop_deadline: DateTime<Utc>,
    pub vibration_waveform: Vec<u64>,
    /// `None` 表示波形不重复
    pub repeat: Option<usize>,
    pub stopped_at: Option<DateTime<Utc>>,
    pub failures: Vec<ReminderError>,
}

impl AlertFeedbackSession {
    fn start(waveform: Vec<u64>, auto_stop: Duration) -> Self {
        let started_at = Utc::now();
        let auto_stop =
            chrono::Duration::from_std(auto_stop).unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            active: true,
            started_at,
            auto_stop_deadline: started_at + auto_stop,
            vibration_waveform: waveform,
            repeat: None,
            stopped_at: None,
            failures: Vec::new(),
        }
    }
}

/// 正在进行的提醒反馈
///
/// 自动停止任务无法取消，丢弃句柄不影响它按时结束。
pub struct AlertHandle {
    session: Arc<Mutex<AlertFeedbackSession>>,
    sound: JoinHandle<()>,
    haptic: JoinHandle<()>,
}

impl AlertHandle {
    pub fn snapshot(&self) -> AlertFeedbackSession {
        lock(&self.session).clone()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.session).active
    }

    /// 等待声音自动停止和振动都结束
    pub async fn finished(self) -> AlertFeedbackSession {
        let _ = self.haptic.await;
        let _ = self.sound.await;
        lock(&self.session).clone()
    }
}

fn lock(session: &Mutex<AlertFeedbackSession>) -> std::sync::MutexGuard<'_, AlertFeedbackSession> {
    session.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct AlertFeedbackController {
    tone: Arc<dyn TonePlayer>,
    haptics: Arc<dyn Haptics>,
    waveform: Vec<u64>,
    auto_stop: Duration,
}

impl AlertFeedbackController {
    pub fn new(tone: Arc<dyn TonePlayer>, haptics: Arc<dyn Haptics>) -> Self {
        Self {
            tone,
            haptics,
            waveform: ALERT_WAVEFORM.to_vec(),
            auto_stop: AUTO_STOP_AFTER,
        }
    }

    pub fn with_auto_stop(mut self, auto_stop: Duration) -> Self {
        self.auto_stop = auto_stop;
        self
    }

    /// 开始播放提示音并振动（spawn 后立即返回）
    pub fn start_alert(&self, runtime: &Handle) -> AlertHandle {
        let session = Arc::new(Mutex::new(AlertFeedbackSession::start(
            self.waveform.clone(),
            self.auto_stop,
        )));

        let sound = runtime.spawn(run_tone(
            self.tone.clone(),
            self.auto_stop,
            session.clone(),
        ));
        let haptic = runtime.spawn(run_haptics(
            self.haptics.clone(),
            self.waveform.clone(),
            session.clone(),
        ));

        AlertHandle {
            session,
            sound,
            haptic,
        }
    }
}

async fn run_tone(
    tone: Arc<dyn TonePlayer>,
    auto_stop: Duration,
    session: Arc<Mutex<AlertFeedbackSession>>,
) {
    let playing = match tone.play() {
        Ok(id) => {
            info!(tone = id.0, "Alert tone started");
            Some(id)
        }
        Err(e) => {
            warn!(error = %e, "Failed to play alert tone");
            lock(&session).failures.push(ReminderError::feedback(FeedbackKind::Sound, e));
            None
        }
    };

    tokio::time::sleep(auto_stop).await;

    // 只停止本次会话启动的那一路声音
    if let Some(id) = playing.filter(|id| tone.is_playing(*id)) {
        match tone.stop(id) {
            Ok(()) => debug!(tone = id.0, "Alert tone stopped"),
            Err(e) => {
                warn!(tone = id.0, error = %e, "Failed to stop alert tone");
                lock(&session).failures.push(ReminderError::feedback(FeedbackKind::Sound, e));
            }
        }
    }

    // 无论 stop 是否成功，会话到期即结束
    let mut guard = lock(&session);
    guard.active = false;
    guard.stopped_at = Some(Utc::now());
}

async fn run_haptics(
    haptics: Arc<dyn Haptics>,
    waveform: Vec<u64>,
    session: Arc<Mutex<AlertFeedbackSession>>,
) {
    if !haptics.has_vibrator() {
        debug!("Device has no vibrator, skipping haptic alert");
        return;
    }

    match haptics.vibrate(&waveform, None) {
        Ok(()) => info!(waveform = ?waveform, "Haptic alert started"),
        Err(e) => {
            warn!(error = %e, "Failed to vibrate");
            lock(&session).failures.push(ReminderError::feedback(FeedbackKind::Haptic, e));
        }
    }
}

//! 内存后端 - 记录所有调用，支持注入失败
//!
//! 用于 dry-run 和测试。通知按 reminder_id 存储，重复发布会替换。

use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::reminder::channel::NotificationChannelSpec;
use crate::reminder::delivery::ActivationRequest;
use crate::reminder::platform::{
    ActivationSurface, ChannelNotFound, Haptics, NotificationCenter, Platform, RuntimeBridge,
    ToneId, TonePlayer,
};
use crate::reminder::presentation::PresentationRecord;

/// 可注入失败的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Failure {
    DeleteChannel,
    CreateChannel,
    Post,
    PlayTone,
    StopTone,
    Vibrate,
    DispatchDeferred,
    StartDirect,
    Invoke,
}

impl Failure {
    pub const ALL: [Failure; 9] = [
        Failure::DeleteChannel,
        Failure::CreateChannel,
        Failure::Post,
        Failure::PlayTone,
        Failure::StopTone,
        Failure::Vibrate,
        Failure::DispatchDeferred,
        Failure::StartDirect,
        Failure::Invoke,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Failure::DeleteChannel => "delete_channel",
            Failure::CreateChannel => "create_channel",
            Failure::Post => "post",
            Failure::PlayTone => "play",
            Failure::StopTone => "stop",
            Failure::Vibrate => "vibrate",
            Failure::DispatchDeferred => "dispatch_deferred",
            Failure::StartDirect => "start_direct",
            Failure::Invoke => "invoke",
        }
    }
}

/// 调用计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub posts: usize,
    pub tone_plays: usize,
    pub tone_stops: usize,
}

#[derive(Default)]
struct MemoryState {
    channels: BTreeMap<String, NotificationChannelSpec>,
    posted: BTreeMap<i64, PresentationRecord>,
    /// 正在播放的提示音
    tones: BTreeSet<ToneId>,
    next_tone: u64,
    stats: MemoryStats,
    vibrations: Vec<Vec<u64>>,
    deferred: Vec<ActivationRequest>,
    direct: Vec<ActivationRequest>,
    invocations: Vec<(String, String)>,
    /// 所有副作用调用的名称，按顺序
    calls: Vec<&'static str>,
    failures: HashSet<Failure>,
}

pub struct MemoryPlatform {
    state: Mutex<MemoryState>,
    supports_channels: bool,
    notifications_enabled: Option<bool>,
    has_vibrator: bool,
    tone_stops_by_itself: bool,
    attached: AtomicBool,
}

pub struct MemoryPlatformBuilder {
    supports_channels: bool,
    notifications_enabled: Option<bool>,
    has_vibrator: bool,
    tone_stops_by_itself: bool,
    runtime_attached: bool,
}

impl MemoryPlatformBuilder {
    pub fn supports_channels(mut self, value: bool) -> Self {
        self.supports_channels = value;
        self
    }

    pub fn notifications_enabled(mut self, value: Option<bool>) -> Self {
        self.notifications_enabled = value;
        self
    }

    pub fn has_vibrator(mut self, value: bool) -> Self {
        self.has_vibrator = value;
        self
    }

    /// 提示音播放后立即结束（短音效）
    pub fn tone_stops_by_itself(mut self, value: bool) -> Self {
        self.tone_stops_by_itself = value;
        self
    }

    pub fn runtime_attached(mut self, value: bool) -> Self {
        self.runtime_attached = value;
        self
    }

    pub fn build(self) -> Arc<MemoryPlatform> {
        Arc::new(MemoryPlatform {
            state: Mutex::new(MemoryState::default()),
            supports_channels: self.supports_channels,
            notifications_enabled: self.notifications_enabled,
            has_vibrator: self.has_vibrator,
            tone_stops_by_itself: self.tone_stops_by_itself,
            attached: AtomicBool::new(self.runtime_attached),
        })
    }
}

impl MemoryPlatform {
    pub fn new() -> Arc<Self> {
        Self::builder().build()
    }

    pub fn builder() -> MemoryPlatformBuilder {
        MemoryPlatformBuilder {
            supports_channels: true,
            notifications_enabled: Some(true),
            has_vibrator: true,
            tone_stops_by_itself: false,
            runtime_attached: false,
        }
    }

    /// 打包为 [`Platform`]
    pub fn platform(self: &Arc<Self>) -> Platform {
        Platform {
            center: self.clone(),
            tone: self.clone(),
            haptics: self.clone(),
            activation: self.clone(),
            runtime: self.clone(),
        }
    }

    pub fn fail(&self, failure: Failure) {
        self.lock().failures.insert(failure);
    }

    pub fn recover(&self, failure: Failure) {
        self.lock().failures.remove(&failure);
    }

    pub fn set_runtime_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::SeqCst);
    }

    pub fn channel_ids(&self) -> Vec<String> {
        self.lock().channels.keys().cloned().collect()
    }

    pub fn posted(&self, reminder_id: i64) -> Option<PresentationRecord> {
        self.lock().posted.get(&reminder_id).cloned()
    }

    /// 正在播放的提示音路数
    pub fn tones_playing(&self) -> usize {
        self.lock().tones.len()
    }

    pub fn stats(&self) -> MemoryStats {
        self.lock().stats
    }

    pub fn vibrations(&self) -> Vec<Vec<u64>> {
        self.lock().vibrations.clone()
    }

    pub fn deferred_requests(&self) -> Vec<ActivationRequest> {
        self.lock().deferred.clone()
    }

    pub fn direct_requests(&self) -> Vec<ActivationRequest> {
        self.lock().direct.clone()
    }

    pub fn invocations(&self) -> Vec<(String, String)> {
        self.lock().invocations.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// 记录调用，注入了失败时返回错误
    fn enter(&self, failure: Failure) -> Result<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.calls.push(failure.as_str());
        if state.failures.contains(&failure) {
            debug!(op = failure.as_str(), "Injected failure");
            bail!("injected {} failure", failure.as_str());
        }
        Ok(state)
    }
}

impl NotificationCenter for MemoryPlatform {
    fn supports_channels(&self) -> bool {
        self.supports_channels
    }

    fn delete_channel(&self, id: &str) -> Result<()> {
        let mut state = self.enter(Failure::DeleteChannel)?;
        match state.channels.remove(id) {
            Some(_) => Ok(()),
            None => Err(ChannelNotFound(id.to_string()).into()),
        }
    }

    fn create_channel(&self, spec: &NotificationChannelSpec) -> Result<()> {
        let mut state = self.enter(Failure::CreateChannel)?;
        // 渠道创建后不可修改，已存在时保持原样
        state
            .channels
            .entry(spec.id.clone())
            .or_insert_with(|| spec.clone());
        Ok(())
    }

    fn notifications_enabled(&self) -> Option<bool> {
        self.notifications_enabled
    }

    fn post(&self, record: &PresentationRecord) -> Result<()> {
        let mut state = self.enter(Failure::Post)?;
        state.stats.posts += 1;
        state.posted.insert(record.reminder_id, record.clone());
        Ok(())
    }

    fn active(&self) -> Vec<i64> {
        self.lock().posted.keys().copied().collect()
    }
}

impl TonePlayer for MemoryPlatform {
    fn play(&self) -> Result<ToneId> {
        let mut state = self.enter(Failure::PlayTone)?;
        state.stats.tone_plays += 1;
        state.next_tone += 1;
        let id = ToneId(state.next_tone);
        if !self.tone_stops_by_itself {
            state.tones.insert(id);
        }
        Ok(id)
    }

    fn is_playing(&self, tone: ToneId) -> bool {
        self.lock().tones.contains(&tone)
    }

    fn stop(&self, tone: ToneId) -> Result<()> {
        let mut state = self.enter(Failure::StopTone)?;
        state.stats.tone_stops += 1;
        state.tones.remove(&tone);
        Ok(())
    }
}

impl Haptics for MemoryPlatform {
    fn has_vibrator(&self) -> bool {
        self.has_vibrator
    }

    fn vibrate(&self, waveform: &[u64], _repeat: Option<usize>) -> Result<()> {
        let mut state = self.enter(Failure::Vibrate)?;
        state.vibrations.push(waveform.to_vec());
        Ok(())
    }
}

impl ActivationSurface for MemoryPlatform {
    fn dispatch_deferred(&self, request: &ActivationRequest) -> Result<()> {
        let mut state = self.enter(Failure::DispatchDeferred)?;
        state.deferred.push(request.clone());
        Ok(())
    }

    fn start_direct(&self, request: &ActivationRequest) -> Result<()> {
        let mut state = self.enter(Failure::StartDirect)?;
        state.direct.push(request.clone());
        Ok(())
    }
}

impl RuntimeBridge for MemoryPlatform {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    fn invoke(&self, method: &str, argument: &str) -> Result<()> {
        let mut state = self.enter(Failure::Invoke)?;
        state.invocations.push((method.to_string(), argument.to_string()));
        Ok(())
    }
}

//! 系统协作方 trait 定义
//!
//! 通知中心、提示音、振动、应用激活入口和应用运行时桥都通过这里的 trait 访问，
//! 具体实现见 `backends`。所有方法返回 `anyhow::Result`，由调用处转换为
//! [`ReminderError`](super::error::ReminderError) 并记录日志。

use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;

use super::channel::NotificationChannelSpec;
use super::delivery::ActivationRequest;
use super::presentation::PresentationRecord;

/// 删除不存在的通知渠道时返回
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("notification channel `{0}` not found")]
pub struct ChannelNotFound(pub String);

/// 系统通知中心
pub trait NotificationCenter: Send + Sync {
    /// 平台是否支持通知渠道
    fn supports_channels(&self) -> bool;

    /// 删除渠道；渠道不存在时返回 [`ChannelNotFound`]
    fn delete_channel(&self, id: &str) -> Result<()>;

    fn create_channel(&self, spec: &NotificationChannelSpec) -> Result<()>;

    /// 通知权限是否开启；`None` 表示平台无法查询
    fn notifications_enabled(&self) -> Option<bool>;

    /// 按 reminder_id 发布通知，同 ID 替换旧通知
    fn post(&self, record: &PresentationRecord) -> Result<()>;

    /// 当前仍在显示的通知 ID
    fn active(&self) -> Vec<i64>;
}

/// 一路提示音播放，由 [`TonePlayer::play`] 分配
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ToneId(pub u64);

/// 设备默认提示音
///
/// 每次 `play` 都是独立的一路声音，`is_playing` 和 `stop` 只作用于给定的那一路，
/// 重叠的提醒互不干扰。
pub trait TonePlayer: Send + Sync {
    fn play(&self) -> Result<ToneId>;

    fn is_playing(&self, tone: ToneId) -> bool;

    fn stop(&self, tone: ToneId) -> Result<()>;
}

/// 振动马达
pub trait Haptics: Send + Sync {
    fn has_vibrator(&self) -> bool;

    /// 按波形振动；`repeat` 为 `None` 表示不重复
    fn vibrate(&self, waveform: &[u64], repeat: Option<usize>) -> Result<()>;
}

/// 应用入口激活
pub trait ActivationSurface: Send + Sync {
    /// 通过延迟激活句柄间接发送（后台触发时的首选路径）
    fn dispatch_deferred(&self, request: &ActivationRequest) -> Result<()>;

    /// 直接启动应用入口（降级路径）
    fn start_direct(&self, request: &ActivationRequest) -> Result<()>;
}

/// 应用运行时的方法通道
pub trait RuntimeBridge: Send + Sync {
    /// 运行时是否已注册监听
    fn is_attached(&self) -> bool;

    fn invoke(&self, method: &str, argument: &str) -> Result<()>;
}

/// 一组平台协作方
#[derive(Clone)]
pub struct Platform {
    pub center: Arc<dyn NotificationCenter>,
    pub tone: Arc<dyn TonePlayer>,
    pub haptics: Arc<dyn Haptics>,
    pub activation: Arc<dyn ActivationSurface>,
    pub runtime: Arc<dyn RuntimeBridge>,
}

/// 判断错误是否为渠道不存在
pub fn is_channel_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ChannelNotFound>().is_some()
}

//! 通知渠道配置与迁移
//!
//! 渠道创建后不可修改，配置变更只能换新 ID：先删除旧渠道再按新配置创建。
//! 每次投递前都会调用 [`ChannelProvisioner::ensure_channel`]，升级后的配置无需重装即可生效。

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::composer::Labels;
use super::error::ReminderError;
use super::platform::{is_channel_not_found, NotificationCenter};

/// 当前渠道 ID
pub const CURRENT_CHANNEL_ID: &str = "note_reminders_v2";
/// 被 v2 取代的旧渠道 ID
pub const LEGACY_CHANNEL_ID: &str = "note_reminders";
/// 应用主题色（ARGB）
pub const THEME_COLOR: u32 = 0xFF2C_9678;
/// 通知自带振动波形（毫秒）
pub const CHANNEL_VIBRATION_PATTERN: [u64; 4] = [0, 300, 200, 300];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Default,
    /// 横幅 + 锁屏 + 声音
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundProfile {
    /// 系统默认通知音，按通知用途播放
    DeviceDefaultNotification,
    Silent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockscreenVisibility {
    Public,
    Private,
    Secret,
}

/// 通知渠道配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationChannelSpec {
    pub id: String,
    pub version: u32,
    /// 被本配置取代的旧渠道
    pub supersedes: Option<String>,
    pub display_name: String,
    pub description: String,
    pub importance: Importance,
    pub sound: SoundProfile,
    pub vibration_pattern: Vec<u64>,
    pub led_color: u32,
    pub lockscreen_visibility: LockscreenVisibility,
    pub badge_visible: bool,
    /// 是否绕过勿扰模式
    pub dnd_bypass: bool,
}

impl NotificationChannelSpec {
    /// v2 提醒渠道
    pub fn reminders(labels: &Labels, theme_color: u32) -> Self {
        Self {
            id: CURRENT_CHANNEL_ID.to_string(),
            version: 2,
            supersedes: Some(LEGACY_CHANNEL_ID.to_string()),
            display_name: labels.channel_name.to_string(),
            description: labels.channel_description.to_string(),
            importance: Importance::High,
            sound: SoundProfile::DeviceDefaultNotification,
            vibration_pattern: CHANNEL_VIBRATION_PATTERN.to_vec(),
            led_color: theme_color,
            lockscreen_visibility: LockscreenVisibility::Public,
            badge_visible: true,
            dnd_bypass: false,
        }
    }

    /// v1 旧渠道，只用于迁移测试和诊断
    pub fn legacy(labels: &Labels) -> Self {
        Self {
            id: LEGACY_CHANNEL_ID.to_string(),
            version: 1,
            supersedes: None,
            display_name: labels.channel_name.to_string(),
            description: labels.channel_description.to_string(),
            importance: Importance::Default,
            sound: SoundProfile::DeviceDefaultNotification,
            vibration_pattern: Vec::new(),
            led_color: THEME_COLOR,
            lockscreen_visibility: LockscreenVisibility::Private,
            badge_visible: true,
            dnd_bypass: false,
        }
    }
}

/// 渠道配置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOutcome {
    /// 平台不支持渠道，跳过
    Unsupported,
    Ready,
}

pub struct ChannelProvisioner {
    center: Arc<dyn NotificationCenter>,
}

impl ChannelProvisioner {
    pub fn new(center: Arc<dyn NotificationCenter>) -> Self {
        Self { center }
    }

    /// 幂等地确保渠道存在
    pub fn ensure_channel(
        &self,
        spec: &NotificationChannelSpec,
    ) -> Result<ChannelOutcome, ReminderError> {
        if !self.center.supports_channels() {
            return Ok(ChannelOutcome::Unsupported);
        }

        if let Some(legacy) = &spec.supersedes {
            match self.center.delete_channel(legacy) {
                Ok(()) => info!(channel = %legacy, "Deleted legacy notification channel"),
                Err(e) if is_channel_not_found(&e) => {
                    debug!(channel = %legacy, "Legacy notification channel already gone")
                }
                // 删除失败不影响新渠道创建
                Err(e) => warn!(channel = %legacy, error = %e, "Failed to delete legacy channel"),
            }
        }

        self.center
            .create_channel(spec)
            .map_err(|e| ReminderError::ChannelProvision(e.to_string()))?;

        debug!(channel = %spec.id, version = spec.version, "Notification channel ready");
        Ok(ChannelOutcome::Ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::backends::memory::{Failure, MemoryPlatform};
    use crate::reminder::composer::Locale;

    fn spec() -> NotificationChannelSpec {
        NotificationChannelSpec::reminders(&Labels::for_locale(Locale::ZhCn), THEME_COLOR)
    }

    #[test]
    fn test_reminders_channel_matches_outbound_fields() {
        let spec = spec();
        assert_eq!(spec.id, "note_reminders_v2");
        assert_eq!(spec.supersedes.as_deref(), Some("note_reminders"));
        assert_eq!(spec.importance, Importance::High);
        assert_eq!(spec.vibration_pattern, vec![0, 300, 200, 300]);
        assert_eq!(spec.lockscreen_visibility, LockscreenVisibility::Public);
        assert!(spec.badge_visible);
        assert!(!spec.dnd_bypass);
    }

    #[test]
    fn test_migrates_legacy_channel() {
        let platform = MemoryPlatform::new();
        let labels = Labels::for_locale(Locale::ZhCn);
        platform.create_channel(&NotificationChannelSpec::legacy(&labels)).unwrap();

        let provisioner = ChannelProvisioner::new(platform.clone());
        let outcome = provisioner.ensure_channel(&spec()).unwrap();

        assert_eq!(outcome, ChannelOutcome::Ready);
        assert_eq!(platform.channel_ids(), vec![CURRENT_CHANNEL_ID.to_string()]);
    }

    #[test]
    fn test_missing_legacy_channel_is_not_an_error() {
        let platform = MemoryPlatform::new();
        let provisioner = ChannelProvisioner::new(platform.clone());

        assert!(provisioner.ensure_channel(&spec()).is_ok());
        // 再次调用依然成功
        assert!(provisioner.ensure_channel(&spec()).is_ok());
        assert_eq!(platform.channel_ids(), vec![CURRENT_CHANNEL_ID.to_string()]);
    }

    #[test]
    fn test_unsupported_platform_is_noop() {
        let platform = MemoryPlatform::builder().supports_channels(false).build();
        let provisioner = ChannelProvisioner::new(platform.clone());

        assert_eq!(
            provisioner.ensure_channel(&spec()).unwrap(),
            ChannelOutcome::Unsupported
        );
        assert!(platform.channel_ids().is_empty());
    }

    #[test]
    fn test_create_failure_is_reported() {
        let platform = MemoryPlatform::new();
        platform.fail(Failure::CreateChannel);
        let provisioner = ChannelProvisioner::new(platform.clone());

        let err = provisioner.ensure_channel(&spec()).unwrap_err();
        assert!(matches!(err, ReminderError::ChannelProvision(_)));
    }

    #[test]
    fn test_delete_failure_still_creates_channel() {
        let platform = MemoryPlatform::new();
        platform.fail(Failure::DeleteChannel);
        let provisioner = ChannelProvisioner::new(platform.clone());

        assert!(provisioner.ensure_channel(&spec()).is_ok());
        assert_eq!(platform.channel_ids(), vec![CURRENT_CHANNEL_ID.to_string()]);
    }
}

//! 通知构建与发布
//!
//! 发布前检查通知权限，权限关闭时整个展示流程中止且不产生任何副作用。
//! 通知以 reminder_id 为键发布，同一 ID 重复发布只会替换。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use super::channel::{SoundProfile, CHANNEL_VIBRATION_PATTERN, CURRENT_CHANNEL_ID, THEME_COLOR};
use super::composer::ComposedContent;
use super::error::ReminderError;
use super::platform::NotificationCenter;
use super::trigger::ReminderTrigger;

/// 点击通知时携带的 action
pub const OPEN_NOTE_ACTION: &str = "OPEN_NOTE";
/// 通知类别
pub const REMINDER_CATEGORY: &str = "reminder";
/// 点击目标 request code 偏移，避免与全屏目标冲突
pub const TAP_REQUEST_OFFSET: i64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Default,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleVariant {
    /// 展开后显示完整正文
    BigText,
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationKind {
    /// 触发时在锁屏上拉起应用，不算用户“已读”
    FullScreen,
    /// 用户点击通知
    Tap,
}

/// 通知关联的跳转目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTarget {
    pub kind: NavigationKind,
    pub request_code: i64,
    pub action: Option<String>,
    pub reminder_id: i64,
}

impl NavigationTarget {
    pub fn full_screen(reminder_id: i64) -> Self {
        Self {
            kind: NavigationKind::FullScreen,
            request_code: reminder_id,
            action: None,
            reminder_id,
        }
    }

    pub fn tap(reminder_id: i64) -> Self {
        Self {
            kind: NavigationKind::Tap,
            request_code: reminder_id.saturating_add(TAP_REQUEST_OFFSET),
            action: Some(OPEN_NOTE_ACTION.to_string()),
            reminder_id,
        }
    }
}

/// LED 闪烁
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedBlink {
    pub color: u32,
    pub on_ms: u32,
    pub off_ms: u32,
}

/// 待发布的通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationRecord {
    pub reminder_id: i64,
    pub title: String,
    pub body: String,
    pub channel_id: String,
    pub color_theme: u32,
    /// 是否整体着色
    pub colorized: bool,
    pub priority: Priority,
    pub category: String,
    pub visibility_public: bool,
    pub style_variant: StyleVariant,
    pub sound: SoundProfile,
    pub vibration_pattern: Vec<u64>,
    pub led: LedBlink,
    pub show_when: DateTime<Utc>,
    pub only_alert_once: bool,
    /// 点击后自动移除
    pub auto_cancel: bool,
    pub full_screen: NavigationTarget,
    pub tap: NavigationTarget,
}

/// 应用在前台时的展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForegroundPresentation {
    pub banner: bool,
    /// 旧平台没有 banner，使用 alert
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl ForegroundPresentation {
    pub fn for_platform(supports_banner: bool) -> Self {
        Self {
            banner: supports_banner,
            alert: !supports_banner,
            sound: true,
            badge: true,
        }
    }
}

pub struct PresentationDispatcher {
    center: Arc<dyn NotificationCenter>,
    channel_id: String,
    color_theme: u32,
    vibration_pattern: Vec<u64>,
}

impl PresentationDispatcher {
    pub fn new(center: Arc<dyn NotificationCenter>) -> Self {
        Self {
            center,
            channel_id: CURRENT_CHANNEL_ID.to_string(),
            color_theme: THEME_COLOR,
            vibration_pattern: CHANNEL_VIBRATION_PATTERN.to_vec(),
        }
    }

    pub fn with_channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = channel_id.into();
        self
    }

    pub fn with_color_theme(mut self, color: u32) -> Self {
        self.color_theme = color;
        self
    }

    /// 权限检查；平台无法查询时视为允许
    pub fn preflight(&self) -> Result<(), ReminderError> {
        match self.center.notifications_enabled() {
            Some(false) => {
                error!("Notifications are disabled, reminder will not be shown");
                Err(ReminderError::PermissionDenied)
            }
            Some(true) | None => Ok(()),
        }
    }

    pub fn build(
        &self,
        trigger: &ReminderTrigger,
        content: &ComposedContent,
    ) -> PresentationRecord {
        PresentationRecord {
            reminder_id: trigger.reminder_id,
            title: content.title.clone(),
            body: content.body.clone(),
            channel_id: self.channel_id.clone(),
            color_theme: self.color_theme,
            colorized: false,
            priority: Priority::High,
            category: REMINDER_CATEGORY.to_string(),
            visibility_public: true,
            style_variant: StyleVariant::BigText,
            sound: SoundProfile::DeviceDefaultNotification,
            vibration_pattern: self.vibration_pattern.clone(),
            led: LedBlink {
                color: self.color_theme,
                on_ms: 1000,
                off_ms: 1000,
            },
            show_when: Utc::now(),
            only_alert_once: false,
            auto_cancel: true,
            full_screen: NavigationTarget::full_screen(trigger.reminder_id),
            tap: NavigationTarget::tap(trigger.reminder_id),
        }
    }

    /// 发布通知，失败只记录日志并返回错误
    pub fn post(&self, record: &PresentationRecord) -> Result<(), ReminderError> {
        match self.center.post(record) {
            Ok(()) => {
                info!(
                    reminder_id = record.reminder_id,
                    channel = %record.channel_id,
                    "Reminder notification posted"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    reminder_id = record.reminder_id,
                    error = %e,
                    "Failed to post reminder notification"
                );
                Err(ReminderError::Post(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminder::backends::memory::{Failure, MemoryPlatform};
    use crate::reminder::composer::ContentComposer;

    fn content(body: &str) -> ComposedContent {
        ContentComposer::default().compose(body)
    }

    #[test]
    fn test_build_record_fields() {
        let platform = MemoryPlatform::new();
        let dispatcher = PresentationDispatcher::new(platform);
        let trigger = ReminderTrigger::new(42, "Buy milk");

        let record = dispatcher.build(&trigger, &content("Buy milk"));

        assert_eq!(record.reminder_id, 42);
        assert_eq!(record.channel_id, "note_reminders_v2");
        assert_eq!(record.priority, Priority::High);
        assert_eq!(record.category, "reminder");
        assert!(record.visibility_public);
        assert_eq!(record.color_theme, 0xFF2C9678);
        assert_eq!(record.vibration_pattern, vec![0, 300, 200, 300]);
        assert_eq!(record.full_screen.request_code, 42);
        assert_eq!(record.full_screen.action, None);
        assert_eq!(record.tap.request_code, 10_042);
        assert_eq!(record.tap.action.as_deref(), Some("OPEN_NOTE"));
    }

    #[test]
    fn test_preflight_denied() {
        let platform = MemoryPlatform::builder().notifications_enabled(Some(false)).build();
        let dispatcher = PresentationDispatcher::new(platform);
        assert_eq!(dispatcher.preflight(), Err(ReminderError::PermissionDenied));
    }

    #[test]
    fn test_preflight_unknown_permission_allows() {
        let platform = MemoryPlatform::builder().notifications_enabled(None).build();
        let dispatcher = PresentationDispatcher::new(platform);
        assert!(dispatcher.preflight().is_ok());
    }

    #[test]
    fn test_repost_replaces() {
        let platform = MemoryPlatform::new();
        let dispatcher = PresentationDispatcher::new(platform.clone());
        let trigger = ReminderTrigger::new(7, "first");

        dispatcher.post(&dispatcher.build(&trigger, &content("first"))).unwrap();
        dispatcher.post(&dispatcher.build(&trigger, &content("second"))).unwrap();

        assert_eq!(platform.active(), vec![7]);
        assert_eq!(platform.posted(7).unwrap().body, "second");
    }

    #[test]
    fn test_post_failure_is_caught() {
        let platform = MemoryPlatform::new();
        platform.fail(Failure::Post);
        let dispatcher = PresentationDispatcher::new(platform.clone());
        let trigger = ReminderTrigger::new(7, "x");

        let result = dispatcher.post(&dispatcher.build(&trigger, &content("x")));
        assert!(matches!(result, Err(ReminderError::Post(_))));
        assert!(platform.active().is_empty());
    }

    #[test]
    fn test_foreground_presentation() {
        let modern = ForegroundPresentation::for_platform(true);
        assert!(modern.banner && !modern.alert && modern.sound && modern.badge);

        let legacy = ForegroundPresentation::for_platform(false);
        assert!(!legacy.banner && legacy.alert);
    }
}

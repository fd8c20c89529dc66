//! 提醒投递错误分类
//!
//! 每一类错误都在离产生点最近的地方被捕获并降级为日志，
//! 不会传播到系统回调入口。

use thiserror::Error;

/// 反馈失败的来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    Sound,
    Haptic,
}

impl std::fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::Sound => "sound",
            FeedbackKind::Haptic => "haptic",
        }
    }
}

/// 提醒投递错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReminderError {
    /// reminder_id == 0 的占位/测试触发
    #[error("invalid trigger: reminder_id {reminder_id} is reserved")]
    InvalidTrigger { reminder_id: i64 },

    /// 用户关闭了通知权限
    #[error("notifications are disabled for this app")]
    PermissionDenied,

    #[error("channel provisioning failed: {0}")]
    ChannelProvision(String),

    #[error("{kind} feedback failed: {message}")]
    Feedback { kind: FeedbackKind, message: String },

    #[error("posting notification failed: {0}")]
    Post(String),

    #[error("handoff dispatch failed: {0}")]
    HandoffDispatch(String),
}

impl ReminderError {
    /// 是否中止剩余的投递流程
    ///
    /// 只有无效触发和权限拒绝会中止；其余错误只影响出错的那一步。
    pub fn aborts(&self) -> bool {
        matches!(
            self,
            ReminderError::InvalidTrigger { .. } | ReminderError::PermissionDenied
        )
    }

    pub fn feedback(kind: FeedbackKind, err: impl std::fmt::Display) -> Self {
        ReminderError::Feedback {
            kind,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_invalid_trigger_and_permission_abort() {
        assert!(ReminderError::InvalidTrigger { reminder_id: 0 }.aborts());
        assert!(ReminderError::PermissionDenied.aborts());

        assert!(!ReminderError::ChannelProvision("x".into()).aborts());
        assert!(!ReminderError::feedback(FeedbackKind::Haptic, "x").aborts());
        assert!(!ReminderError::Post("x".into()).aborts());
        assert!(!ReminderError::HandoffDispatch("x".into()).aborts());
    }

    #[test]
    fn test_error_display() {
        let err = ReminderError::feedback(FeedbackKind::Sound, "no ringtone");
        assert_eq!(err.to_string(), "sound feedback failed: no ringtone");

        let err = ReminderError::InvalidTrigger { reminder_id: 0 };
        assert_eq!(err.to_string(), "invalid trigger: reminder_id 0 is reserved");
    }
}

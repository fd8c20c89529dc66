//! 提醒触发事件与过滤

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ReminderError;

/// 保留的无效提醒 ID（占位/测试触发）
pub const RESERVED_REMINDER_ID: i64 = 0;

/// 系统闹钟触发的提醒事件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderTrigger {
    pub reminder_id: i64,
    /// 原始笔记内容，可能为空
    pub raw_body: String,
    pub trigger_timestamp: DateTime<Utc>,
}

impl ReminderTrigger {
    pub fn new(reminder_id: i64, raw_body: impl Into<String>) -> Self {
        Self {
            reminder_id,
            raw_body: raw_body.into(),
            trigger_timestamp: Utc::now(),
        }
    }

    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.trigger_timestamp = ts;
        self
    }

    /// 从闹钟附带的 extras 解析
    ///
    /// 缺失的 `noteId` 视为 0，缺失的 `body` 视为空串，与系统 extras 的默认值一致。
    pub fn from_extras(extras: &serde_json::Value) -> Self {
        let reminder_id = extras
            .get("noteId")
            .and_then(|v| v.as_i64())
            .unwrap_or(RESERVED_REMINDER_ID);
        let raw_body = extras
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        Self::new(reminder_id, raw_body)
    }
}

/// 过滤占位触发
pub struct TriggerValidator;

impl TriggerValidator {
    /// 检查触发是否可以继续投递
    ///
    /// 返回的错误只用于日志，调用方收到后直接静默返回。
    pub fn check(trigger: &ReminderTrigger) -> Result<(), ReminderError> {
        if trigger.reminder_id == RESERVED_REMINDER_ID {
            debug!(reminder_id = trigger.reminder_id, "Ignoring placeholder trigger");
            return Err(ReminderError::InvalidTrigger {
                reminder_id: trigger.reminder_id,
            });
        }
        Ok(())
    }
}

//! 投递记录 - 通知应用持久层“提醒已触发”
//!
//! 首选通过延迟激活句柄间接发送（后台触发时系统可能禁止直接拉起应用），
//! 失败时退回直接启动应用入口。两条路都失败只记录日志，已显示的通知不受影响。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::composer::ComposedContent;
use super::error::ReminderError;
use super::platform::ActivationSurface;
use super::trigger::ReminderTrigger;

/// 投递记录请求的 action
pub const SAVE_REMINDER_ACTION: &str = "SAVE_REMINDER_NOTIFICATION";
/// 投递记录 request code 偏移
pub const SAVE_REQUEST_OFFSET: i64 = 20_000;

/// 投递记录附带的数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryExtras {
    pub reminder_id: i64,
    pub title: String,
    pub body: String,
    /// 触发时间（Unix 毫秒）
    pub trigger_time: i64,
    pub is_save_notification: bool,
}

/// 发往应用入口的激活请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub action: String,
    pub request_code: i64,
    pub extras: DeliveryExtras,
    pub created_at: DateTime<Utc>,
}

impl ActivationRequest {
    pub fn save_reminder(trigger: &ReminderTrigger, content: &ComposedContent) -> Self {
        Self {
            action: SAVE_REMINDER_ACTION.to_string(),
            request_code: trigger.reminder_id.saturating_add(SAVE_REQUEST_OFFSET),
            extras: DeliveryExtras {
                reminder_id: trigger.reminder_id,
                title: content.title.clone(),
                body: content.body.clone(),
                trigger_time: trigger.trigger_timestamp.timestamp_millis(),
                is_save_notification: true,
            },
            created_at: Utc::now(),
        }
    }
}

/// 投递记录最终走的路径
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryPath {
    Deferred,
    /// 间接发送失败后直接启动成功
    Direct,
    /// 两条路径都失败，记录丢失
    Lost(ReminderError),
}

pub struct DeliveryRecorder {
    surface: Arc<dyn ActivationSurface>,
}

impl DeliveryRecorder {
    pub fn new(surface: Arc<dyn ActivationSurface>) -> Self {
        Self { surface }
    }

    pub fn record(&self, request: &ActivationRequest) -> DeliveryPath {
        let reminder_id = request.extras.reminder_id;

        let deferred_err = match self.surface.dispatch_deferred(request) {
            Ok(()) => {
                info!(reminder_id, "Delivery record dispatched");
                return DeliveryPath::Deferred;
            }
            Err(e) => e,
        };

        warn!(
            reminder_id,
            error = %deferred_err,
            "Deferred dispatch failed, trying direct activation"
        );

        match self.surface.start_direct(request) {
            Ok(()) => {
                info!(reminder_id, "Delivery record sent by direct activation");
                DeliveryPath::Direct
            }
            Err(e) => {
                error!(reminder_id, error = %e, "Failed to record reminder delivery");
                DeliveryPath::Lost(ReminderError::HandoffDispatch(format!(
                    "deferred: {}; direct: {}",
                    deferred_err, e
                )))
            }
        }
    }

    /// 后台记录（spawn 后立即返回）
    pub fn record_async(
        self: &Arc<Self>,
        runtime: &Handle,
        request: ActivationRequest,
    ) -> JoinHandle<DeliveryPath> {
        let recorder = Arc::clone(self);
        runtime.spawn(async move { recorder.record(&request) })
    }
}

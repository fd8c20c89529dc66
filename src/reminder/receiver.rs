//! 闹钟触发入口
//!
//! 系统回调有执行时间限制：同步部分只做校验、渠道配置、权限检查和发布，
//! 提示音和投递记录作为独立任务 spawn 出去。任何错误都不会传出 [`ReminderReceiver::on_receive`]。

use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::channel::{ChannelProvisioner, NotificationChannelSpec};
use super::composer::{ContentComposer, Labels};
use super::delivery::{ActivationRequest, DeliveryPath, DeliveryRecorder};
use super::error::ReminderError;
use super::feedback::{AlertFeedbackController, AlertFeedbackSession, AlertHandle};
use super::platform::Platform;
use super::presentation::{PresentationDispatcher, PresentationRecord};
use super::trigger::{ReminderTrigger, TriggerValidator};
use crate::config::ReminderConfig;

/// 一次触发的处理状态
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerStatus {
    /// 占位触发，无任何副作用
    Ignored,
    PermissionDenied,
    Posted,
    PostFailed,
}

/// 一次触发的处理结果
///
/// 其中的后台任务已经在运行，丢弃结果不会取消它们。
pub struct TriggerOutcome {
    pub reminder_id: i64,
    pub status: TriggerStatus,
    pub record: Option<PresentationRecord>,
    /// 降级为日志的非致命错误
    pub errors: Vec<ReminderError>,
    pub alert: Option<AlertHandle>,
    pub delivery: Option<JoinHandle<DeliveryPath>>,
}

/// 后台任务结束后的结果
#[derive(Debug)]
pub struct SettledOutcome {
    pub status: TriggerStatus,
    pub alert: Option<AlertFeedbackSession>,
    pub delivery: Option<DeliveryPath>,
}

impl TriggerOutcome {
    fn skipped(reminder_id: i64, status: TriggerStatus, errors: Vec<ReminderError>) -> Self {
        Self {
            reminder_id,
            status,
            record: None,
            errors,
            alert: None,
            delivery: None,
        }
    }

    /// 等待提示音自动停止和投递记录完成
    pub async fn settle(self) -> SettledOutcome {
        let alert = match self.alert {
            Some(handle) => Some(handle.finished().await),
            None => None,
        };
        let delivery = match self.delivery {
            Some(task) => task.await.ok(),
            None => None,
        };
        SettledOutcome {
            status: self.status,
            alert,
            delivery,
        }
    }
}

pub struct ReminderReceiver {
    runtime: Handle,
    channel_spec: NotificationChannelSpec,
    provisioner: ChannelProvisioner,
    composer: ContentComposer,
    feedback: AlertFeedbackController,
    dispatcher: PresentationDispatcher,
    recorder: Arc<DeliveryRecorder>,
}

impl ReminderReceiver {
    pub fn new(platform: &Platform, config: &ReminderConfig, runtime: Handle) -> Self {
        let labels = Labels::for_locale(config.locale);
        let mut channel_spec = NotificationChannelSpec::reminders(&labels, config.theme_color);
        channel_spec.id = config.channel_id.clone();
        channel_spec.supersedes = config.legacy_channel_id.clone();

        Self {
            runtime,
            channel_spec,
            provisioner: ChannelProvisioner::new(platform.center.clone()),
            composer: ContentComposer::new(labels),
            feedback: AlertFeedbackController::new(platform.tone.clone(), platform.haptics.clone())
                .with_auto_stop(config.alert.auto_stop()),
            dispatcher: PresentationDispatcher::new(platform.center.clone())
                .with_channel_id(config.channel_id.clone())
                .with_color_theme(config.theme_color),
            recorder: Arc::new(DeliveryRecorder::new(platform.activation.clone())),
        }
    }

    /// 系统回调入口，无返回值
    pub fn on_receive(&self, trigger: ReminderTrigger) {
        let outcome = self.handle(trigger);
        debug!(
            reminder_id = outcome.reminder_id,
            status = ?outcome.status,
            errors = outcome.errors.len(),
            "Reminder trigger handled"
        );
    }

    /// 处理一次触发并返回结果
    pub fn handle(&self, trigger: ReminderTrigger) -> TriggerOutcome {
        let reminder_id = trigger.reminder_id;

        if let Err(e) = TriggerValidator::check(&trigger) {
            return TriggerOutcome::skipped(reminder_id, TriggerStatus::Ignored, vec![e]);
        }

        info!(reminder_id, ts = %trigger.trigger_timestamp, "Reminder alarm fired");

        let mut errors = Vec::new();

        if let Err(e) = self.provisioner.ensure_channel(&self.channel_spec) {
            warn!(reminder_id, error = %e, "Channel provisioning failed, posting anyway");
            errors.push(e);
        }

        if let Err(e) = self.dispatcher.preflight() {
            errors.push(e);
            return TriggerOutcome::skipped(reminder_id, TriggerStatus::PermissionDenied, errors);
        }

        let content = self.composer.compose(&trigger.raw_body);
        let record = self.dispatcher.build(&trigger, &content);

        let alert = self.feedback.start_alert(&self.runtime);

        if let Err(e) = self.dispatcher.post(&record) {
            errors.push(e);
            return TriggerOutcome {
                reminder_id,
                status: TriggerStatus::PostFailed,
                record: None,
                errors,
                alert: Some(alert),
                delivery: None,
            };
        }

        let request = ActivationRequest::save_reminder(&trigger, &content);
        let delivery = self.recorder.record_async(&self.runtime, request);

        TriggerOutcome {
            reminder_id,
            status: TriggerStatus::Posted,
            record: Some(record),
            errors,
            alert: Some(alert),
            delivery: Some(delivery),
        }
    }
}

//! Note Reminder - 笔记提醒通知投递

pub mod config;
pub mod reminder;

pub use config::ReminderConfig;
pub use reminder::{
    desktop_platform, ActivationRequest, AlertFeedbackController, ChannelProvisioner, ClickEvent,
    ContentComposer, DeliveryPath, DeliveryRecorder, MemoryPlatform, MethodResponse,
    NotificationChannelSpec, PayloadHandoffBridge, PendingPayload, Platform,
    PresentationDispatcher, PresentationRecord, ReminderError, ReminderInbox, ReminderReceiver,
    ReminderTrigger, RuntimeBridge, TriggerOutcome, TriggerStatus, TriggerValidator,
};

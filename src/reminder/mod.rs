//! 提醒通知投递
//!
//! 闹钟触发 → [`TriggerValidator`] → [`ChannelProvisioner`] / [`ContentComposer`]
//! → [`AlertFeedbackController`]（后台）+ [`PresentationDispatcher`]（发布）
//! → [`DeliveryRecorder`]（后台，尽力而为）。
//!
//! 通知点击 → [`PayloadHandoffBridge`] → 应用运行时。
//!
//! # 使用示例
//! ```ignore
//! use note_reminder::reminder::{MemoryPlatform, ReminderReceiver, ReminderTrigger};
//! use note_reminder::ReminderConfig;
//!
//! let platform = MemoryPlatform::new();
//! let receiver = ReminderReceiver::new(&platform.platform(), &ReminderConfig::default(), handle);
//! receiver.on_receive(ReminderTrigger::new(42, "Buy milk"));
//! ```

pub mod backends;
pub mod channel;
pub mod composer;
pub mod delivery;
pub mod error;
pub mod feedback;
pub mod handoff;
pub mod inbox;
pub mod platform;
pub mod presentation;
pub mod receiver;
pub mod trigger;

pub use backends::{desktop_platform, MemoryPlatform};
pub use channel::{ChannelOutcome, ChannelProvisioner, NotificationChannelSpec};
pub use composer::{ComposedContent, ContentComposer, Labels, Locale};
pub use delivery::{ActivationRequest, DeliveryExtras, DeliveryPath, DeliveryRecorder};
pub use error::{FeedbackKind, ReminderError};
pub use feedback::{AlertFeedbackController, AlertFeedbackSession, AlertHandle};
pub use handoff::{ClickEvent, HandoffReport, MethodResponse, PayloadHandoffBridge, PendingPayload};
pub use inbox::ReminderInbox;
pub use platform::{
    ActivationSurface, Haptics, NotificationCenter, Platform, RuntimeBridge, ToneId,
    TonePlayer,
};
pub use presentation::{ForegroundPresentation, PresentationDispatcher, PresentationRecord};
pub use receiver::{ReminderReceiver, SettledOutcome, TriggerOutcome, TriggerStatus};
pub use trigger::{ReminderTrigger, TriggerValidator};

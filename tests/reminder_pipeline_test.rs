//! 提醒投递端到端测试（内存后端）

use note_reminder::reminder::backends::memory::Failure;
use note_reminder::reminder::platform::NotificationCenter;
use note_reminder::{
    DeliveryPath, MemoryPlatform, ReminderConfig, ReminderReceiver, ReminderTrigger, TriggerStatus,
};
use std::time::Duration;
use tokio::runtime::Handle;

fn receiver(platform: &std::sync::Arc<MemoryPlatform>) -> ReminderReceiver {
    ReminderReceiver::new(
        &platform.platform(),
        &ReminderConfig::default(),
        Handle::current(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_reserved_id_never_touches_the_platform() {
    // Given: 一个空的内存平台
    let platform = MemoryPlatform::new();

    // When: 收到 reminder_id = 0 的触发
    let outcome = receiver(&platform).handle(ReminderTrigger::new(0, "placeholder"));
    let settled = outcome.settle().await;

    // Then: 没有渠道配置、发布或提示音
    assert_eq!(settled.status, TriggerStatus::Ignored);
    assert!(platform.calls().is_empty());
    assert!(platform.channel_ids().is_empty());
    assert_eq!(platform.stats().tone_plays, 0);
}

#[tokio::test(start_paused = true)]
async fn test_buy_milk_scenario() {
    let platform = MemoryPlatform::new();

    let outcome = receiver(&platform).handle(ReminderTrigger::new(
        42,
        "Buy milk and eggs today please remember",
    ));
    outcome.settle().await;

    let record = platform.posted(42).expect("notification posted");
    assert_eq!(record.title, "Buy milk and eggs to...");
    assert_eq!(record.body, "Buy milk and eggs today please remember");
    assert_eq!(record.channel_id, "note_reminders_v2");
    assert_eq!(record.vibration_pattern, vec![0, 300, 200, 300]);
    assert_eq!(platform.channel_ids(), vec!["note_reminders_v2".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_trigger_replaces_notification() {
    let platform = MemoryPlatform::new();
    let receiver = receiver(&platform);

    receiver.handle(ReminderTrigger::new(42, "first")).settle().await;
    receiver.handle(ReminderTrigger::new(42, "second")).settle().await;
    receiver.handle(ReminderTrigger::new(43, "other")).settle().await;

    assert_eq!(platform.active(), vec![42, 43]);
    assert_eq!(platform.posted(42).unwrap().body, "second");
    assert_eq!(platform.stats().posts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_alert_stops_within_deadline_even_if_stop_fails() {
    let platform = MemoryPlatform::new();
    platform.fail(Failure::StopTone);
    let started = tokio::time::Instant::now();

    let settled = receiver(&platform)
        .handle(ReminderTrigger::new(1, "x"))
        .settle()
        .await;

    let alert = settled.alert.expect("alert started");
    assert!(!alert.active);
    assert!(started.elapsed() >= Duration::from_millis(5000));
    assert!(started.elapsed() < Duration::from_millis(5100));
}

#[tokio::test(start_paused = true)]
async fn test_delivery_falls_back_to_direct_activation() {
    let platform = MemoryPlatform::new();
    platform.fail(Failure::DispatchDeferred);

    let settled = receiver(&platform)
        .handle(ReminderTrigger::new(8, "x"))
        .settle()
        .await;

    assert_eq!(settled.delivery, Some(DeliveryPath::Direct));
    let direct = platform.direct_requests();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].action, "SAVE_REMINDER_NOTIFICATION");
    assert!(direct[0].extras.is_save_notification);
}

#[tokio::test(start_paused = true)]
async fn test_lost_delivery_leaves_notification_visible() {
    // Given: 两条投递记录路径都会失败
    let platform = MemoryPlatform::new();
    platform.fail(Failure::DispatchDeferred);
    platform.fail(Failure::StartDirect);

    // When: 触发提醒
    let settled = receiver(&platform)
        .handle(ReminderTrigger::new(8, "x"))
        .settle()
        .await;

    // Then: 记录丢失，但通知仍在
    assert_eq!(settled.status, TriggerStatus::Posted);
    assert!(matches!(settled.delivery, Some(DeliveryPath::Lost(_))));
    assert_eq!(platform.active(), vec![8]);
}

#[tokio::test(start_paused = true)]
async fn test_permission_denied_has_no_presentation_effects() {
    let platform = MemoryPlatform::builder()
        .notifications_enabled(Some(false))
        .build();

    let settled = receiver(&platform)
        .handle(ReminderTrigger::new(3, "x"))
        .settle()
        .await;

    assert_eq!(settled.status, TriggerStatus::PermissionDenied);
    assert!(settled.alert.is_none());
    assert!(settled.delivery.is_none());
    assert!(platform.active().is_empty());
    assert!(platform.vibrations().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_custom_config_is_applied() {
    let platform = MemoryPlatform::new();
    let mut config = ReminderConfig::default();
    config.locale = note_reminder::reminder::Locale::En;
    config.alert.auto_stop_ms = 1000;

    let receiver = ReminderReceiver::new(&platform.platform(), &config, Handle::current());
    let started = tokio::time::Instant::now();
    receiver.handle(ReminderTrigger::new(2, "")).settle().await;

    assert_eq!(platform.posted(2).unwrap().title, "Note reminder");
    assert!(started.elapsed() < Duration::from_millis(5000));
}

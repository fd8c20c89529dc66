//! 通知点击 → 应用运行时
//!
//! 点击时同时做两件事：
//! 1. 运行时监听已注册时，立即调用 `openNote`；
//! 2. 无论 1 是否成功，都把 payload 写入 [`PendingPayload`]。
//!
//! 冷启动时运行时注册监听后调用一次 `getInitialPayload` 取走缓存；热启动只依赖 1。
//! 两条路径可能都成功，同一次点击可能被处理两次，由运行时去重。

use serde_json::Value;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, warn};

use super::platform::RuntimeBridge;

/// 运行时方法通道名称
pub const BRIDGE_CHANNEL: &str = "note_reminder/native_alarm";
pub const OPEN_NOTE_METHOD: &str = "openNote";
pub const GET_INITIAL_PAYLOAD_METHOD: &str = "getInitialPayload";

/// 进程级单槽缓存
///
/// 写入方（点击处理）和清空方（运行时查询）都运行在主执行上下文，
/// 锁只为满足 `Sync`，不会出现竞争。
#[derive(Debug, Default)]
pub struct PendingPayload {
    slot: Mutex<Option<String>>,
}

static GLOBAL_PENDING: OnceLock<Arc<PendingPayload>> = OnceLock::new();

impl PendingPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程共享实例
    pub fn global() -> Arc<PendingPayload> {
        GLOBAL_PENDING
            .get_or_init(|| Arc::new(PendingPayload::new()))
            .clone()
    }

    /// 写入新值，覆盖未读取的旧值
    pub fn store(&self, value: impl Into<String>) {
        let value = value.into();
        let mut slot = self.slot.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.replace(value) {
            debug!(previous = %previous, "Overwriting unread pending payload");
        }
    }

    /// 读取并清空
    pub fn take(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).take()
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().unwrap_or_else(|p| p.into_inner()).is_none()
    }
}

/// 通知点击事件
#[derive(Debug, Clone, Default)]
pub struct ClickEvent {
    pub user_info: serde_json::Map<String, Value>,
}

impl ClickEvent {
    pub fn from_user_info(user_info: Value) -> Self {
        match user_info {
            Value::Object(map) => Self { user_info: map },
            _ => Self::default(),
        }
    }

    pub fn with_payload(payload: impl Into<String>) -> Self {
        let mut user_info = serde_json::Map::new();
        user_info.insert("payload".to_string(), Value::String(payload.into()));
        Self { user_info }
    }

    /// 提取提醒标识：`payload` → `noteIdString` → `noteId`
    pub fn payload(&self) -> Option<String> {
        let as_string = |key: &str| {
            self.user_info
                .get(key)
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        as_string("payload")
            .or_else(|| as_string("noteIdString"))
            .or_else(|| {
                self.user_info
                    .get("noteId")
                    .and_then(|v| v.as_i64())
                    .map(|id| id.to_string())
            })
    }
}

/// 一次点击的交付结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffReport {
    pub payload: String,
    /// `openNote` 是否已调用成功
    pub pushed: bool,
    pub cached: bool,
}

/// 运行时方法调用的应答
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Value(Value),
    NotImplemented,
}

pub struct PayloadHandoffBridge {
    runtime: Arc<dyn RuntimeBridge>,
    pending: Arc<PendingPayload>,
}

impl PayloadHandoffBridge {
    pub fn new(runtime: Arc<dyn RuntimeBridge>, pending: Arc<PendingPayload>) -> Self {
        Self { runtime, pending }
    }

    /// 处理通知点击；事件中没有标识时返回 `None`
    pub fn on_click(&self, event: &ClickEvent) -> Option<HandoffReport> {
        let Some(payload) = event.payload() else {
            warn!(user_info = ?event.user_info, "Notification click carried no payload");
            return None;
        };

        let pushed = if self.runtime.is_attached() {
            match self.runtime.invoke(OPEN_NOTE_METHOD, &payload) {
                Ok(()) => {
                    info!(payload = %payload, "Pushed openNote to runtime");
                    true
                }
                Err(e) => {
                    warn!(payload = %payload, error = %e, "Failed to push openNote");
                    false
                }
            }
        } else {
            debug!(payload = %payload, "Runtime listener not attached, caching only");
            false
        };

        self.pending.store(payload.clone());

        Some(HandoffReport {
            payload,
            pushed,
            cached: true,
        })
    }

    /// 冷启动查询：返回并清空缓存
    pub fn get_initial_payload(&self) -> Option<String> {
        let payload = self.pending.take();
        debug!(payload = ?payload, "Runtime queried initial payload");
        payload
    }

    /// 应答运行时的方法调用
    pub fn handle_method_call(&self, method: &str) -> MethodResponse {
        match method {
            GET_INITIAL_PAYLOAD_METHOD => MethodResponse::Value(
                self.get_initial_payload()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            ),
            _ => MethodResponse::NotImplemented,
        }
    }
}

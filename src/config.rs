//! 配置加载 - `~/.config/note-reminder/config.json`
//!
//! 所有字段都有默认值，文件不存在时使用默认配置。
//! 可通过环境变量 `NOTE_REMINDER_CONFIG` 指定其他路径。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::reminder::channel::{CURRENT_CHANNEL_ID, LEGACY_CHANNEL_ID, THEME_COLOR};
use crate::reminder::composer::Locale;
use crate::reminder::feedback::AUTO_STOP_AFTER;

pub const CONFIG_ENV: &str = "NOTE_REMINDER_CONFIG";

/// 配置目录
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("note-reminder")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 提示音自动停止时间（毫秒），最长 5000
    pub auto_stop_ms: u64,
}

impl AlertConfig {
    /// 超过上限的配置按上限处理
    pub fn auto_stop(&self) -> Duration {
        Duration::from_millis(self.auto_stop_ms).min(AUTO_STOP_AFTER)
    }
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            auto_stop_ms: AUTO_STOP_AFTER.as_millis() as u64,
        }
    }
}

/// 桌面后端使用的外部命令
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesktopConfig {
    pub app_name: String,
    /// 默认在 PATH 中查找 notify-send
    pub notify_command: Option<String>,
    /// 等待通知命令退出的上限（毫秒），超时视为发布失败
    pub notify_timeout_ms: u64,
    /// 默认在 PATH 中查找 canberra-gtk-play
    pub sound_command: Option<String>,
    pub sound_args: Vec<String>,
    /// 直接激活时启动的应用命令
    pub app_command: Option<String>,
}

impl Default for DesktopConfig {
    fn default() -> Self {
        Self {
            app_name: "Note Reminder".to_string(),
            notify_command: None,
            notify_timeout_ms: 3000,
            sound_command: None,
            sound_args: vec!["--id=message-new-instant".to_string()],
            app_command: None,
        }
    }
}

impl DesktopConfig {
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_millis(self.notify_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub locale: Locale,
    pub theme_color: u32,
    pub channel_id: String,
    /// 需要迁移删除的旧渠道
    pub legacy_channel_id: Option<String>,
    pub alert: AlertConfig,
    pub desktop: DesktopConfig,
    /// 投递记录收件箱，默认在配置目录下
    pub inbox_path: Option<PathBuf>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            theme_color: THEME_COLOR,
            channel_id: CURRENT_CHANNEL_ID.to_string(),
            legacy_channel_id: Some(LEGACY_CHANNEL_ID.to_string()),
            alert: AlertConfig::default(),
            desktop: DesktopConfig::default(),
            inbox_path: None,
        }
    }
}

impl ReminderConfig {
    /// 配置文件路径（环境变量优先）
    pub fn path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| config_dir().join("config.json"))
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path())
    }

    /// 文件不存在时返回默认配置，格式错误时报错
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: ReminderConfig = serde_json::from_str(&content)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        Ok(config)
    }

    pub fn inbox_path(&self) -> PathBuf {
        self.inbox_path
            .clone()
            .unwrap_or_else(|| config_dir().join("inbox.jsonl"))
    }

    /// 桌面通知 ID 映射，和收件箱放在同一目录
    pub fn notification_ids_path(&self) -> PathBuf {
        self.inbox_path().with_file_name("notification_ids.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReminderConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, ReminderConfig::default());
        assert_eq!(config.channel_id, "note_reminders_v2");
        assert_eq!(config.alert.auto_stop(), Duration::from_millis(5000));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"locale": "en", "alert": {"auto_stop_ms": 3000}}"#).unwrap();

        let config = ReminderConfig::load_from(&path).unwrap();
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.alert.auto_stop_ms, 3000);
        assert_eq!(config.alert.auto_stop(), Duration::from_millis(3000));
        assert_eq!(config.theme_color, THEME_COLOR);
    }

    #[test]
    fn test_auto_stop_is_capped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"alert": {"auto_stop_ms": 60000}}"#).unwrap();

        let config = ReminderConfig::load_from(&path).unwrap();
        assert_eq!(config.alert.auto_stop(), Duration::from_millis(5000));
    }

    #[test]
    fn test_notification_ids_live_next_to_inbox() {
        let config = ReminderConfig {
            inbox_path: Some(PathBuf::from("/tmp/reminders/inbox.jsonl")),
            ..ReminderConfig::default()
        };
        assert_eq!(
            config.notification_ids_path(),
            PathBuf::from("/tmp/reminders/notification_ids.json")
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = ReminderConfig::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid config"));
    }
}

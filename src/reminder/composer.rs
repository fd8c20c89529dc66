//! 通知标题/正文生成
//!
//! 纯函数：标题取笔记内容前 20 个字符，正文为完整内容，空内容时使用本地化兜底文案。

use serde::{Deserialize, Serialize};

/// 标题截断长度（按字符计）
pub const TITLE_MAX_CHARS: usize = 20;

const ELLIPSIS: &str = "...";

/// 兜底文案语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en")]
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::ZhCn => "zh-CN",
            Locale::En => "en",
        }
    }
}

/// 本地化文案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    /// 空内容时的标题
    pub fallback_title: &'static str,
    /// 空内容时的正文
    pub fallback_body: &'static str,
    pub channel_name: &'static str,
    pub channel_description: &'static str,
}

impl Labels {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::ZhCn => Self {
                fallback_title: "笔记提醒",
                fallback_body: "您有一条新的笔记提醒，点击查看详情",
                channel_name: "笔记提醒",
                channel_description: "重要笔记提醒通知",
            },
            Locale::En => Self {
                fallback_title: "Note reminder",
                fallback_body: "You have a new note reminder, tap to view",
                channel_name: "Note reminders",
                channel_description: "Important note reminder notifications",
            },
        }
    }
}

/// 生成后的展示内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedContent {
    pub title: String,
    pub body: String,
}

pub struct ContentComposer {
    labels: Labels,
}

impl ContentComposer {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    pub fn compose(&self, raw_body: &str) -> ComposedContent {
        ComposedContent {
            title: self.derive_title(raw_body),
            body: self.derive_body(raw_body),
        }
    }

    pub fn derive_title(&self, body: &str) -> String {
        if body.is_empty() {
            return self.labels.fallback_title.to_string();
        }
        // 按字符截断，避免切在多字节字符中间
        if body.chars().count() > TITLE_MAX_CHARS {
            let head: String = body.chars().take(TITLE_MAX_CHARS).collect();
            format!("{}{}", head, ELLIPSIS)
        } else {
            body.to_string()
        }
    }

    pub fn derive_body(&self, body: &str) -> String {
        if body.is_empty() {
            self.labels.fallback_body.to_string()
        } else {
            body.to_string()
        }
    }
}

impl Default for ContentComposer {
    fn default() -> Self {
        Self::new(Labels::for_locale(Locale::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncates_long_body() {
        let composer = ContentComposer::default();
        let body = "abcdefghijklmnopqrstuvwxy"; // 25 chars
        assert_eq!(composer.derive_title(body), "abcdefghijklmnopqrst...");
    }

    #[test]
    fn test_title_keeps_short_body() {
        let composer = ContentComposer::default();
        assert_eq!(composer.derive_title("0123456789"), "0123456789");
        // 恰好 20 个字符不截断
        let exact = "a".repeat(20);
        assert_eq!(composer.derive_title(&exact), exact);
    }

    #[test]
    fn test_title_fallback_for_empty_body() {
        let composer = ContentComposer::new(Labels::for_locale(Locale::En));
        assert_eq!(composer.derive_title(""), "Note reminder");
        assert_eq!(
            composer.derive_body(""),
            "You have a new note reminder, tap to view"
        );
    }

    #[test]
    fn test_title_counts_chars_not_bytes() {
        let composer = ContentComposer::default();
        let body = "记得明天上午十点去医院复查顺便把上次的检查报告带上还有医保卡";
        let title = composer.derive_title(body);
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + 3);
        assert!(title.starts_with("记得明天上午十点去医院复查顺便把上次的检"));
    }

    #[test]
    fn test_compose_keeps_full_body() {
        let composer = ContentComposer::default();
        let content = composer.compose("Buy milk and eggs today please remember");
        assert_eq!(content.title, "Buy milk and eggs to...");
        assert_eq!(content.body, "Buy milk and eggs today please remember");
    }

    #[test]
    fn test_locale_serde() {
        let locale: Locale = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(locale, Locale::En);
        assert_eq!(serde_json::to_string(&Locale::ZhCn).unwrap(), "\"zh-CN\"");
    }
}

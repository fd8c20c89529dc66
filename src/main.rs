//! Note Reminder CLI
//!
//! 把笔记提醒作为系统通知投递，并模拟通知点击交回应用运行时

use anyhow::Result;
use clap::{Parser, Subcommand};
use note_reminder::reminder::backends::{DetachedRuntime, LoggingRuntime};
use note_reminder::reminder::handoff::GET_INITIAL_PAYLOAD_METHOD;
use note_reminder::{
    desktop_platform, ClickEvent, MemoryPlatform, MethodResponse, PayloadHandoffBridge,
    PendingPayload, ReminderConfig, ReminderInbox, ReminderReceiver, ReminderTrigger,
    RuntimeBridge,
};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "note-reminder")]
#[command(about = "Note Reminder - 笔记提醒通知投递")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 投递一次提醒触发
    Fire {
        /// 提醒 ID（0 为保留值，会被忽略）
        #[arg(long)]
        id: i64,
        /// 笔记内容
        #[arg(long, default_value = "")]
        body: String,
        /// 使用内存后端，不调用系统命令
        #[arg(long)]
        dry_run: bool,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 模拟一次通知点击
    Click {
        /// 点击事件携带的 payload
        #[arg(long)]
        payload: String,
        /// 运行时监听已注册
        #[arg(long)]
        attached: bool,
    },
    /// 查看投递记录收件箱
    Inbox {
        /// 显示最近 N 条
        #[arg(long, short, default_value = "20")]
        limit: usize,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 查看当前配置
    Config {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 通过 RUST_LOG 控制日志级别，例如: RUST_LOG=debug note-reminder fire --id 1
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("note_reminder=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();
    let config = ReminderConfig::load()?;

    match cli.command {
        Commands::Fire {
            id,
            body,
            dry_run,
            json,
        } => {
            let memory = MemoryPlatform::new();
            let platform = if dry_run {
                memory.platform()
            } else {
                desktop_platform(&config)
            };

            let receiver = ReminderReceiver::new(&platform, &config, Handle::current());
            let outcome = receiver.handle(ReminderTrigger::new(id, body));
            let record = outcome.record.clone();
            let errors: Vec<String> = outcome.errors.iter().map(|e| e.to_string()).collect();

            // 等待后台任务，避免进程提前退出
            let settled = outcome.settle().await;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "status": format!("{:?}", settled.status),
                        "record": record,
                        "errors": errors,
                        "delivery": settled.delivery.map(|d| format!("{:?}", d)),
                    }))?
                );
            } else {
                println!("状态: {:?}", settled.status);
                if let Some(record) = record {
                    println!("  标题: {}", record.title);
                    println!("  正文: {}", record.body);
                    println!("  渠道: {}", record.channel_id);
                }
                if let Some(delivery) = settled.delivery {
                    println!("  投递记录: {:?}", delivery);
                }
                for error in errors {
                    println!("  ⚠️ {}", error);
                }
            }
        }
        Commands::Click { payload, attached } => {
            let runtime: Arc<dyn RuntimeBridge> = if attached {
                Arc::new(LoggingRuntime)
            } else {
                Arc::new(DetachedRuntime)
            };
            let bridge = PayloadHandoffBridge::new(runtime, PendingPayload::global());

            match bridge.on_click(&ClickEvent::with_payload(payload)) {
                Some(report) => {
                    println!("payload: {}", report.payload);
                    println!("  openNote 已推送: {}", report.pushed);
                    println!("  已缓存: {}", report.cached);
                }
                None => println!("点击事件没有 payload"),
            }

            for attempt in 1..=2 {
                let value = match bridge.handle_method_call(GET_INITIAL_PAYLOAD_METHOD) {
                    MethodResponse::Value(v) => v.to_string(),
                    MethodResponse::NotImplemented => "not implemented".to_string(),
                };
                println!("  getInitialPayload #{}: {}", attempt, value);
            }
        }
        Commands::Inbox { limit, json } => {
            let inbox = ReminderInbox::new(config.inbox_path());
            let records = inbox.read_recent(limit);

            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("收件箱为空: {}", inbox.path().display());
            } else {
                println!("最近 {} 条投递记录:\n", records.len());
                for record in records {
                    println!(
                        "  [{}] #{} {}",
                        record.created_at.format("%Y-%m-%d %H:%M:%S"),
                        record.extras.reminder_id,
                        record.extras.title
                    );
                }
            }
        }
        Commands::Config { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("配置文件: {}", ReminderConfig::path().display());
                println!("  语言: {}", config.locale.as_str());
                println!("  渠道: {}", config.channel_id);
                println!("  主题色: {:#010X}", config.theme_color);
                println!("  自动停止: {}ms", config.alert.auto_stop_ms);
                println!("  收件箱: {}", config.inbox_path().display());
            }
        }
    }

    Ok(())
}

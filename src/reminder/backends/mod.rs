//! 平台后端实现

pub mod desktop;
pub mod memory;

pub use desktop::{desktop_platform, DesktopNotificationCenter, DetachedRuntime, LoggingRuntime};
pub use memory::{Failure, MemoryPlatform};

//! # Anim Actions
//!
//! 为动画对象挂载 "开始" / "结束" 回调动作，调用方无需实现完整的通知接收者接口。
//!
//! ## 架构概述
//!
//! ```text
//! 调用方                     ActionRegistry                  引擎线程
//!   │                              │                            │
//!   │── set_began(handle, f) ────►│ ensure_identifier           │
//!   │                              │ 创建记录 + 安装代理 ───────►│ handle.delegate
//!   │                              │                            │
//!   │                              │◄── animation_did_start ────│
//!   │                              │ 取出动作 / 按策略移除记录   │
//!   │◄══ MainLoop 上异步执行 f ════│                            │
//! ```
//!
//! ## 核心类型
//!
//! - [`AnimationHandle`]：动画对象引用，带关联存储与通知接收者槽位
//! - [`ActionRegistry`]：标识符 -> 代理记录 的旁路表
//! - [`MainQueue`] / [`MainLoop`]：主线程派发
//! - [`AnimationDriver`]：无头动画驱动器（测试与演示用的引擎）
//!
//! ## 使用示例
//!
//! ```ignore
//! use anim_actions::{ActionRegistry, AnimationHandle, began_action, main_queue};
//!
//! let (queue, main_loop) = main_queue(Default::default());
//! let registry = ActionRegistry::new(queue);
//!
//! let animation = AnimationHandle::new("opacity", 1.0);
//! registry.set_began(&animation, began_action(|| println!("began")));
//!
//! // 引擎在任意线程上通知开始后，在主线程上：
//! main_loop.run_pending();
//! ```
//!
//! ## 模块结构
//!
//! - [`handle`]：动画句柄与通知接收者接口
//! - [`identity`]：身份键分配
//! - [`action`]：动作类型
//! - [`dispatch`]：主线程派发
//! - [`registry`]：动作注册表与生命周期管理
//! - [`driver`]：无头动画驱动器
//! - [`error`]：错误类型定义

pub mod action;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod handle;
pub mod identity;
mod proxy;
pub mod registry;

// 重导出核心类型
pub use action::{ActionPair, BeganAction, FinishedAction, began_action, finished_action};
pub use dispatch::{Dispatcher, MainLoop, MainQueue, MainQueueConfig, Task, main_queue};
pub use driver::{AnimationDriver, DriverEvent, PlaybackId, PlaybackState};
pub use error::{DispatchError, DispatchResult};
pub use handle::{AnimationDelegate, AnimationHandle};
pub use identity::{Identifier, ensure_identifier, identifier_of};
pub use registry::{ActionRegistry, HandleActions};

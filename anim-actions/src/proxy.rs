//! # Proxy 模块
//!
//! 代理接收者：注册表替调用方安装到动画句柄上的 [`AnimationDelegate`]。
//!
//! ## 状态机
//!
//! ```text
//! Idle ──(挂载动作)──► Armed ──(引擎通知)──► Delivered / Removed
//! ```
//!
//! - 开始通知：派发开始动作；若此刻没有结束动作，立即移除记录
//! - 结束通知：派发结束动作（带 `finished` 标志），无条件移除记录
//!
//! 动作在收到通知时从注册表中取出，取出后在主线程异步执行。
//! 通知之前清除动作可以阻止其执行；已派发的动作不会被取消。

use std::sync::{Arc, Weak};

use crate::action::ActionPair;
use crate::handle::{AnimationDelegate, AnimationHandle};
use crate::identity::Identifier;
use crate::registry::RegistryShared;

/// 代理记录（注册表中的条目）
pub(crate) struct ProxyRecord {
    /// 记录序号，区分同一标识符先后创建的记录
    pub(crate) serial: u64,
    /// 已挂载的动作
    pub(crate) actions: ActionPair,
    /// 安装在句柄上的代理
    pub(crate) proxy: Arc<dyn AnimationDelegate>,
}

impl std::fmt::Debug for ProxyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyRecord")
            .field("serial", &self.serial)
            .field("actions", &self.actions)
            .finish()
    }
}

/// 代理接收者
///
/// 只持有注册表的弱引用：注册表销毁后，代理收到的通知全部忽略。
pub(crate) struct ActionProxy {
    identifier: Identifier,
    serial: u64,
    registry: Weak<RegistryShared>,
}

impl ActionProxy {
    pub(crate) fn new(identifier: Identifier, serial: u64, registry: Weak<RegistryShared>) -> Self {
        Self {
            identifier,
            serial,
            registry,
        }
    }
}

impl AnimationDelegate for ActionProxy {
    fn animation_did_start(&self, animation: &AnimationHandle) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        if let Some(action) = registry.take_began(self.identifier, self.serial, animation) {
            registry.dispatch(Box::new(move || action()));
        }
    }

    fn animation_did_stop(&self, animation: &AnimationHandle, finished: bool) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        if let Some(action) = registry.take_finished(self.identifier, self.serial, animation) {
            let animation = animation.clone();
            registry.dispatch(Box::new(move || action(&animation, finished)));
        }
    }
}

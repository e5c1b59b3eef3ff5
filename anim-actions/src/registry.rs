//! # Registry 模块
//!
//! 动作注册表：标识符 -> 代理记录 的旁路表，并负责代理记录的生命周期。
//!
//! ## 生命周期
//!
//! - 首次挂载动作（开始或结束）时创建记录，并把代理安装为句柄的通知接收者
//! - 两个动作都被清除时，移除记录并从句柄上卸下代理
//! - 收到结束通知后无条件移除记录；收到开始通知时若没有结束动作也会移除
//!
//! 注册表需要显式构造并注入到使用方，内部所有读-改-写都在同一把锁内完成。
//!
//! ```rust,ignore
//! let (queue, main_loop) = main_queue(MainQueueConfig::default());
//! let registry = ActionRegistry::new(queue);
//!
//! registry.set_began(&animation, began_action(|| println!("began")));
//! registry.actions(&animation).set_finished(None);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error};

use crate::action::{BeganAction, FinishedAction};
use crate::dispatch::{Dispatcher, Task};
use crate::handle::{AnimationDelegate, AnimationHandle};
use crate::identity::{Identifier, ensure_identifier, identifier_of};
use crate::proxy::{ActionProxy, ProxyRecord};

/// 动作槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Began,
    Finished,
}

/// 记录表
#[derive(Debug, Default)]
pub(crate) struct RecordTable {
    records: HashMap<Identifier, ProxyRecord>,
    next_serial: u64,
}

/// 注册表共享状态
pub(crate) struct RegistryShared {
    table: Mutex<RecordTable>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl RegistryShared {
    fn lock(&self) -> MutexGuard<'_, RecordTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 移除记录，并在代理仍是句柄的接收者时将其卸下
    fn remove_record(table: &mut RecordTable, identifier: Identifier, animation: &AnimationHandle) {
        if let Some(record) = table.records.remove(&identifier) {
            let detached = animation.detach_delegate_if(&record.proxy);
            debug!(
                identifier = %identifier,
                serial = record.serial,
                detached = detached,
                "移除动作代理记录"
            );
        }
    }

    /// 开始通知：取出开始动作，没有结束动作时移除记录
    ///
    /// 序号不匹配说明该代理的记录已被移除（可能已有新记录），直接忽略。
    pub(crate) fn take_began(
        &self,
        identifier: Identifier,
        serial: u64,
        animation: &AnimationHandle,
    ) -> Option<BeganAction> {
        let mut table = self.lock();
        let record = table
            .records
            .get(&identifier)
            .filter(|record| record.serial == serial)?;

        let began = record.actions.began.clone();
        if record.actions.finished.is_none() {
            Self::remove_record(&mut table, identifier, animation);
        }
        began
    }

    /// 结束通知：取出结束动作，并无条件移除记录
    pub(crate) fn take_finished(
        &self,
        identifier: Identifier,
        serial: u64,
        animation: &AnimationHandle,
    ) -> Option<FinishedAction> {
        let mut table = self.lock();
        let record = table
            .records
            .get(&identifier)
            .filter(|record| record.serial == serial)?;

        let finished = record.actions.finished.clone();
        Self::remove_record(&mut table, identifier, animation);
        finished
    }

    /// 派发到主线程
    ///
    /// # Panics
    ///
    /// 主线程循环不存在时 panic：这是宿主环境的配置错误，不可恢复。
    pub(crate) fn dispatch(&self, task: Task) {
        if let Err(e) = self.dispatcher.dispatch_async(task) {
            error!(error = %e, "动画回调派发失败");
            panic!("动画回调派发失败: {e}");
        }
    }
}

/// 动作注册表
///
/// 克隆开销极低，所有克隆共享同一张记录表。
#[derive(Clone)]
pub struct ActionRegistry {
    shared: Arc<RegistryShared>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("records", &self.len())
            .finish()
    }
}

impl ActionRegistry {
    /// 创建注册表
    ///
    /// # 参数
    /// - `dispatcher`: 主线程派发器，所有动作都通过它执行
    pub fn new<D>(dispatcher: D) -> Self
    where
        D: Dispatcher + 'static,
    {
        Self::with_shared_dispatcher(Arc::new(dispatcher))
    }

    /// 使用共享的派发器创建注册表
    pub fn with_shared_dispatcher(dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            shared: Arc::new(RegistryShared {
                table: Mutex::new(RecordTable::default()),
                dispatcher,
            }),
        }
    }

    /// 获取句柄的动作视图
    pub fn actions<'a>(&'a self, handle: &'a AnimationHandle) -> HandleActions<'a> {
        HandleActions {
            registry: self,
            handle,
        }
    }

    // ========== 挂载 / 清除 ==========

    /// 设置开始动作
    ///
    /// 句柄没有记录时创建记录，并把代理安装为句柄的通知接收者
    /// （覆盖已有的接收者）。已有记录时只替换动作，不重新安装代理。
    pub fn set_began(&self, handle: &AnimationHandle, action: BeganAction) {
        self.set_slot(handle, |record| record.actions.began = Some(action));
    }

    /// 设置结束动作
    pub fn set_finished(&self, handle: &AnimationHandle, action: FinishedAction) {
        self.set_slot(handle, |record| record.actions.finished = Some(action));
    }

    /// 清除开始动作
    ///
    /// 结束动作也为空时，移除记录并卸下代理。没有记录时什么也不做。
    pub fn clear_began(&self, handle: &AnimationHandle) {
        self.clear_slot(handle, Slot::Began);
    }

    /// 清除结束动作
    pub fn clear_finished(&self, handle: &AnimationHandle) {
        self.clear_slot(handle, Slot::Finished);
    }

    /// 设置或清除开始动作（`None` 表示清除）
    pub fn assign_began(&self, handle: &AnimationHandle, action: Option<BeganAction>) {
        match action {
            Some(action) => self.set_began(handle, action),
            None => self.clear_began(handle),
        }
    }

    /// 设置或清除结束动作（`None` 表示清除）
    pub fn assign_finished(&self, handle: &AnimationHandle, action: Option<FinishedAction>) {
        match action {
            Some(action) => self.set_finished(handle, action),
            None => self.clear_finished(handle),
        }
    }

    // ========== 查询 ==========

    /// 获取开始动作
    pub fn began(&self, handle: &AnimationHandle) -> Option<BeganAction> {
        let identifier = identifier_of(handle)?;
        self.shared
            .lock()
            .records
            .get(&identifier)
            .and_then(|record| record.actions.began.clone())
    }

    /// 获取结束动作
    pub fn finished(&self, handle: &AnimationHandle) -> Option<FinishedAction> {
        let identifier = identifier_of(handle)?;
        self.shared
            .lock()
            .records
            .get(&identifier)
            .and_then(|record| record.actions.finished.clone())
    }

    /// 句柄当前是否有记录
    pub fn contains(&self, handle: &AnimationHandle) -> bool {
        identifier_of(handle)
            .is_some_and(|identifier| self.shared.lock().records.contains_key(&identifier))
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.shared.lock().records.len()
    }

    /// 是否没有任何记录
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ========== 内部实现 ==========

    fn set_slot<F>(&self, handle: &AnimationHandle, update: F)
    where
        F: FnOnce(&mut ProxyRecord),
    {
        let identifier = ensure_identifier(handle);
        let mut table = self.shared.lock();
        let RecordTable {
            records,
            next_serial,
        } = &mut *table;

        let record = records.entry(identifier).or_insert_with(|| {
            *next_serial += 1;
            let serial = *next_serial;
            let proxy: Arc<dyn AnimationDelegate> = Arc::new(ActionProxy::new(
                identifier,
                serial,
                Arc::downgrade(&self.shared),
            ));
            handle.set_delegate(Some(proxy.clone()));
            debug!(identifier = %identifier, serial = serial, "创建动作代理记录");

            ProxyRecord {
                serial,
                actions: Default::default(),
                proxy,
            }
        });

        update(record);
    }

    fn clear_slot(&self, handle: &AnimationHandle, slot: Slot) {
        let Some(identifier) = identifier_of(handle) else {
            return;
        };
        let mut table = self.shared.lock();
        let Some(record) = table.records.get_mut(&identifier) else {
            return;
        };

        match slot {
            Slot::Began => record.actions.began = None,
            Slot::Finished => record.actions.finished = None,
        }

        if record.actions.is_empty() {
            RegistryShared::remove_record(&mut table, identifier, handle);
        }
    }
}

/// 单个句柄的动作视图
///
/// 把开始 / 结束动作表现为句柄上的两个可空属性：
/// 写入 `None` 等价于清除，写入 `Some` 等价于设置。
#[derive(Debug, Clone, Copy)]
pub struct HandleActions<'a> {
    registry: &'a ActionRegistry,
    handle: &'a AnimationHandle,
}

impl HandleActions<'_> {
    /// 开始动作
    pub fn began(&self) -> Option<BeganAction> {
        self.registry.began(self.handle)
    }

    /// 设置开始动作（`None` 表示清除）
    pub fn set_began(&self, action: Option<BeganAction>) {
        self.registry.assign_began(self.handle, action);
    }

    /// 结束动作
    pub fn finished(&self) -> Option<FinishedAction> {
        self.registry.finished(self.handle)
    }

    /// 设置结束动作（`None` 表示清除）
    pub fn set_finished(&self, action: Option<FinishedAction>) {
        self.registry.assign_finished(self.handle, action);
    }
}

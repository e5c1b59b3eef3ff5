//! # Handle 模块
//!
//! 动画句柄：由动画引擎持有的动画对象的共享引用。
//!
//! ## 核心概念
//!
//! - `AnimationHandle`: 动画对象引用，克隆开销极低，相等性按对象身份判断
//! - `AnimationDelegate`: 引擎的通知接收者（开始 / 结束）
//! - 关联存储：按类型挂在句柄上的元数据，生命周期与句柄一致
//!
//! 本模块不拥有动画的生命周期，只负责在句柄上附加元数据和通知接收者。

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// 动画通知接收者
///
/// 引擎在动画开始和结束时调用。两个方法默认都是空实现，
/// 实现者只需覆盖关心的通知。
///
/// 引擎可能在任意线程上调用这些方法。
pub trait AnimationDelegate: Send + Sync {
    /// 动画已开始
    fn animation_did_start(&self, _animation: &AnimationHandle) {}

    /// 动画已结束
    ///
    /// # 参数
    /// - `animation`: 结束的动画
    /// - `finished`: `true` 表示正常播放完成，`false` 表示被移除或打断
    fn animation_did_stop(&self, _animation: &AnimationHandle, _finished: bool) {}
}

type AssociatedValue = Arc<dyn Any + Send + Sync>;

struct HandleInner {
    /// 动画属性路径（仅用于显示）
    key_path: String,
    /// 动画时长（秒）
    duration: f32,
    /// 当前通知接收者（后写者胜）
    delegate: Mutex<Option<Arc<dyn AnimationDelegate>>>,
    /// 关联存储（TypeId -> 值）
    associated: Mutex<HashMap<TypeId, AssociatedValue>>,
}

/// 动画句柄
///
/// 对引擎持有的动画对象的共享引用。`Clone` 只增加引用计数，
/// 所有克隆指向同一个动画对象。
///
/// 句柄没有可用作映射键的原生身份字段；需要稳定键时，
/// 通过关联存储挂载一个生成的标识符（见 [`crate::identity`]）。
#[derive(Clone)]
pub struct AnimationHandle {
    inner: Arc<HandleInner>,
}

impl std::fmt::Debug for AnimationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationHandle")
            .field("key_path", &self.inner.key_path)
            .field("duration", &self.inner.duration)
            .field("has_delegate", &self.has_delegate())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 判断两个通知接收者是否为同一对象（只比较数据指针）
pub(crate) fn same_delegate(a: &Arc<dyn AnimationDelegate>, b: &Arc<dyn AnimationDelegate>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl AnimationHandle {
    /// 创建新的动画句柄
    ///
    /// # 参数
    /// - `key_path`: 被动画的属性路径，例如 `"opacity"`
    /// - `duration`: 动画时长（秒），负值按 0 处理
    pub fn new(key_path: impl Into<String>, duration: f32) -> Self {
        Self {
            inner: Arc::new(HandleInner {
                key_path: key_path.into(),
                duration: duration.max(0.0),
                delegate: Mutex::new(None),
                associated: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// 属性路径
    pub fn key_path(&self) -> &str {
        &self.inner.key_path
    }

    /// 动画时长（秒）
    pub fn duration(&self) -> f32 {
        self.inner.duration
    }

    /// 是否指向同一个动画对象
    pub fn ptr_eq(&self, other: &AnimationHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // ========== 通知接收者 ==========

    /// 设置通知接收者
    ///
    /// 后写者胜：任何写入都会覆盖之前的接收者，包括注册表安装的代理。
    pub fn set_delegate(&self, delegate: Option<Arc<dyn AnimationDelegate>>) {
        *lock(&self.inner.delegate) = delegate;
    }

    /// 获取当前通知接收者
    ///
    /// 返回克隆的引用，调用方在回调时不会持有句柄内部的锁。
    pub fn delegate(&self) -> Option<Arc<dyn AnimationDelegate>> {
        lock(&self.inner.delegate).clone()
    }

    /// 是否设置了通知接收者
    pub fn has_delegate(&self) -> bool {
        lock(&self.inner.delegate).is_some()
    }

    /// 当前接收者是否就是 `delegate`
    pub fn is_delegate(&self, delegate: &Arc<dyn AnimationDelegate>) -> bool {
        lock(&self.inner.delegate)
            .as_ref()
            .is_some_and(|current| same_delegate(current, delegate))
    }

    /// 仅当当前接收者就是 `expected` 时将其移除
    ///
    /// # 返回
    /// - `true`: 已移除
    /// - `false`: 当前接收者是其他对象（或为空），未做修改
    pub fn detach_delegate_if(&self, expected: &Arc<dyn AnimationDelegate>) -> bool {
        let mut slot = lock(&self.inner.delegate);
        match slot.as_ref() {
            Some(current) if same_delegate(current, expected) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    // ========== 关联存储 ==========

    /// 读取类型为 `T` 的关联值
    pub fn associated<T>(&self) -> Option<T>
    where
        T: Any + Send + Sync + Clone,
    {
        lock(&self.inner.associated)
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
            .cloned()
    }

    /// 写入类型为 `T` 的关联值（覆盖已有值）
    pub fn set_associated<T>(&self, value: T)
    where
        T: Any + Send + Sync,
    {
        lock(&self.inner.associated).insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// 读取类型为 `T` 的关联值，不存在时用 `init` 生成并写入
    ///
    /// 读取与写入在同一把锁内完成，并发调用只会生成一次。
    pub fn associated_or_insert_with<T, F>(&self, init: F) -> T
    where
        T: Any + Send + Sync + Clone,
        F: FnOnce() -> T,
    {
        let mut associated = lock(&self.inner.associated);
        if let Some(existing) = associated
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
        {
            return existing.clone();
        }

        let value = init();
        associated.insert(TypeId::of::<T>(), Arc::new(value.clone()));
        value
    }
}

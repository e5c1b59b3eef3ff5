//! # Dispatch 模块
//!
//! 主线程派发：把回调投递到指定线程异步执行。
//!
//! ## 核心概念
//!
//! - `Dispatcher`: 派发接口，`dispatch_async(task)` 立即返回
//! - `MainQueue`: 基于 channel 的派发端，可克隆，可跨线程使用
//! - `MainLoop`: 接收端，绑定在创建它的线程上（即"主线程"），不能移动到其他线程
//!
//! ```text
//! 引擎线程                     主线程
//!   │                            │
//!   │── dispatch_async(task) ──►│ channel
//!   │   (立即返回)               │ run_pending() / run_until()
//!   │                            │── task() ──►
//! ```

use std::marker::PhantomData;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{DispatchError, DispatchResult};

/// 派发到主线程的任务
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// 主线程派发接口
///
/// 实现者保证任务最终在同一个指定线程上按提交顺序执行。
/// `dispatch_async` 不阻塞，也不会同步执行任务。
pub trait Dispatcher: Send + Sync {
    /// 提交任务，立即返回
    fn dispatch_async(&self, task: Task) -> DispatchResult<()>;
}

/// 主线程队列配置
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MainQueueConfig {
    /// 每次 `run_pending` 最多执行的任务数（0 表示不限）
    #[serde(default)]
    pub max_tasks_per_pass: usize,
}

/// 主线程队列（派发端）
#[derive(Clone)]
pub struct MainQueue {
    sender: Sender<Task>,
}

impl std::fmt::Debug for MainQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainQueue").finish_non_exhaustive()
    }
}

impl Dispatcher for MainQueue {
    fn dispatch_async(&self, task: Task) -> DispatchResult<()> {
        self.sender
            .send(task)
            .map_err(|_| DispatchError::MainLoopGone)
    }
}

/// 主线程循环（接收端）
///
/// 在哪个线程创建，哪个线程就是指定线程。类型本身是 `!Send`，
/// 因此任务只可能在该线程上执行。
pub struct MainLoop {
    receiver: Receiver<Task>,
    thread: ThreadId,
    config: MainQueueConfig,
    /// 禁止跨线程移动
    _not_send: PhantomData<*const ()>,
}

impl std::fmt::Debug for MainLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("thread", &self.thread)
            .field("config", &self.config)
            .finish()
    }
}

/// 在当前线程上创建主线程队列
///
/// # 返回
/// - `MainQueue`: 派发端，可克隆后交给注册表或其他线程
/// - `MainLoop`: 接收端，只能在当前线程上运行
pub fn main_queue(config: MainQueueConfig) -> (MainQueue, MainLoop) {
    let (sender, receiver) = mpsc::channel();
    let main_loop = MainLoop {
        receiver,
        thread: thread::current().id(),
        config,
        _not_send: PhantomData,
    };
    (MainQueue { sender }, main_loop)
}

impl MainLoop {
    /// 指定线程的 ID
    pub fn designated_thread(&self) -> ThreadId {
        self.thread
    }

    /// 执行当前已排队的任务（不等待新任务）
    ///
    /// 受 `max_tasks_per_pass` 限制。
    ///
    /// # 返回
    /// 本次执行的任务数
    pub fn run_pending(&self) -> usize {
        let budget = match self.config.max_tasks_per_pass {
            0 => usize::MAX,
            n => n,
        };

        let mut executed = 0;
        while executed < budget {
            match self.receiver.try_recv() {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        if executed > 0 {
            trace!(executed = executed, "主线程任务已执行");
        }
        executed
    }

    /// 在 `duration` 内持续执行到达的任务
    ///
    /// # 返回
    /// 期间执行的任务数
    pub fn run_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut executed = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(task) => {
                    task();
                    executed += 1;
                }
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        executed + self.run_pending()
    }

    /// 执行任务直到 `done` 返回 `true` 或超时
    ///
    /// 每执行一个任务后重新检查 `done`。
    ///
    /// # 返回
    /// - `true`: 条件已满足
    /// - `false`: 超时（或所有派发端都已销毁）时条件仍未满足
    pub fn run_until<F>(&self, mut done: F, timeout: Duration) -> bool
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + timeout;

        loop {
            if done() {
                return true;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            match self.receiver.recv_timeout(remaining) {
                Ok(task) => task(),
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    return done();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch_is_not_synchronous() {
        let (queue, main_loop) = main_queue(MainQueueConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        queue
            .dispatch_async(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        // 提交后不会立即执行
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(main_loop.run_pending(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tasks_run_in_submission_order() {
        let (queue, main_loop) = main_queue(MainQueueConfig::default());
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for i in 0..5 {
            let order = order.clone();
            queue
                .dispatch_async(Box::new(move || order.lock().unwrap().push(i)))
                .unwrap();
        }

        main_loop.run_pending();
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_tasks_run_on_designated_thread() {
        let (queue, main_loop) = main_queue(MainQueueConfig::default());
        let seen = Rc::new(RefCell::new(None));
        let (tx, rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            queue
                .dispatch_async(Box::new(move || {
                    tx.send(thread::current().id()).unwrap();
                }))
                .unwrap();
            thread::current().id()
        });
        let worker_thread = worker.join().unwrap();

        let s = seen.clone();
        assert!(main_loop.run_until(
            move || {
                if let Ok(id) = rx.try_recv() {
                    *s.borrow_mut() = Some(id);
                }
                s.borrow().is_some()
            },
            Duration::from_secs(1),
        ));

        let ran_on = seen.borrow().unwrap();
        assert_eq!(ran_on, main_loop.designated_thread());
        assert_ne!(ran_on, worker_thread);
    }

    #[test]
    fn test_run_pending_respects_budget() {
        let (queue, main_loop) = main_queue(MainQueueConfig {
            max_tasks_per_pass: 2,
        });

        for _ in 0..5 {
            queue.dispatch_async(Box::new(|| {})).unwrap();
        }

        assert_eq!(main_loop.run_pending(), 2);
        assert_eq!(main_loop.run_pending(), 2);
        assert_eq!(main_loop.run_pending(), 1);
        assert_eq!(main_loop.run_pending(), 0);
    }

    #[test]
    fn test_run_until_times_out() {
        let (_queue, main_loop) = main_queue(MainQueueConfig::default());
        assert!(!main_loop.run_until(|| false, Duration::from_millis(20)));
    }

    #[test]
    fn test_run_for_drains_arrivals() {
        let (queue, main_loop) = main_queue(MainQueueConfig::default());
        let counter = Arc::new(AtomicUsize::new(0));

        let c = counter.clone();
        queue
            .dispatch_async(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert_eq!(main_loop.run_for(Duration::from_millis(10)), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_after_loop_dropped_fails() {
        let (queue, main_loop) = main_queue(MainQueueConfig::default());
        drop(main_loop);

        assert_eq!(
            queue.dispatch_async(Box::new(|| {})),
            Err(DispatchError::MainLoopGone)
        );
    }

    #[test]
    fn test_config_defaults_from_empty_json() {
        let config: MainQueueConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, MainQueueConfig::default());
        assert_eq!(config.max_tasks_per_pass, 0);
    }
}

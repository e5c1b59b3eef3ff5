//! # Action 模块
//!
//! 动画开始 / 结束回调动作的类型定义。

use std::sync::Arc;

use crate::handle::AnimationHandle;

/// 动画开始动作（无参数）
pub type BeganAction = Arc<dyn Fn() + Send + Sync>;

/// 动画结束动作
///
/// 参数为结束的动画和引擎给出的 `finished` 标志。
pub type FinishedAction = Arc<dyn Fn(&AnimationHandle, bool) + Send + Sync>;

/// 包装闭包为 [`BeganAction`]
pub fn began_action<F>(action: F) -> BeganAction
where
    F: Fn() + Send + Sync + 'static,
{
    Arc::new(action)
}

/// 包装闭包为 [`FinishedAction`]
pub fn finished_action<F>(action: F) -> FinishedAction
where
    F: Fn(&AnimationHandle, bool) + Send + Sync + 'static,
{
    Arc::new(action)
}

/// 动作对
///
/// 每个动画最多一个开始动作、一个结束动作。
#[derive(Clone, Default)]
pub struct ActionPair {
    /// 开始动作
    pub began: Option<BeganAction>,
    /// 结束动作
    pub finished: Option<FinishedAction>,
}

impl ActionPair {
    /// 两个槽位是否都为空
    pub fn is_empty(&self) -> bool {
        self.began.is_none() && self.finished.is_none()
    }
}

impl std::fmt::Debug for ActionPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionPair")
            .field("began", &self.began.is_some())
            .field("finished", &self.finished.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_action_pair_is_empty() {
        let mut pair = ActionPair::default();
        assert!(pair.is_empty());

        pair.began = Some(began_action(|| {}));
        assert!(!pair.is_empty());

        pair.began = None;
        pair.finished = Some(finished_action(|_, _| {}));
        assert!(!pair.is_empty());
    }

    #[test]
    fn test_finished_action_receives_arguments() {
        let seen = Arc::new(AtomicBool::new(false));
        let handle = AnimationHandle::new("opacity", 1.0);

        let expected = handle.clone();
        let flag = seen.clone();
        let action = finished_action(move |animation, finished| {
            assert!(animation.ptr_eq(&expected));
            flag.store(finished, Ordering::SeqCst);
        });

        action(&handle, true);
        assert!(seen.load(Ordering::SeqCst));
    }

    #[test]
    fn test_action_pair_debug() {
        let pair = ActionPair {
            began: Some(began_action(|| {})),
            finished: None,
        };
        assert_eq!(
            format!("{:?}", pair),
            "ActionPair { began: true, finished: false }"
        );
    }
}

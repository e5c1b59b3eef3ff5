//! # Error 模块
//!
//! 定义 anim-actions 中使用的错误类型。
//!
//! 注册表操作本身是全函数（缺少标识符、缺少记录都属于正常状态），
//! 因此这里只有宿主环境相关的错误。

use thiserror::Error;

/// 主线程派发错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// 主线程循环已被销毁，无法再投递回调
    #[error("主线程循环已销毁，无法派发回调")]
    MainLoopGone,
}

/// Result 类型别名
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            DispatchError::MainLoopGone.to_string(),
            "主线程循环已销毁，无法派发回调"
        );
    }
}

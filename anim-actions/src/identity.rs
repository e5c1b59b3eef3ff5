//! # Identity 模块
//!
//! 为动画句柄分配稳定的身份键。
//!
//! 句柄本身没有可用作映射键的身份字段，因此首次挂载动作时生成一个
//! 随机 UUID，存入句柄的关联存储。之后同一句柄总是返回同一个标识符。

use uuid::Uuid;

use crate::handle::AnimationHandle;

/// 动画标识符
///
/// 进程内唯一的随机 128 位标识符（UUID v4），一经分配不会被重新分配或复用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier(Uuid);

impl Identifier {
    /// 生成新的随机标识符
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// 获取内部 UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:X}", self.0.hyphenated())
    }
}

/// 确保句柄带有标识符
///
/// 已有标识符时原样返回；否则生成新标识符并写入句柄的关联存储。
/// 读取与写入是原子的，并发调用只会生成一个标识符。
pub fn ensure_identifier(handle: &AnimationHandle) -> Identifier {
    handle.associated_or_insert_with(Identifier::generate)
}

/// 读取句柄的标识符（不会分配新标识符）
pub fn identifier_of(handle: &AnimationHandle) -> Option<Identifier> {
    handle.associated::<Identifier>()
}

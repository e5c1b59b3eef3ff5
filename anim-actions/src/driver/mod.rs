//! # Driver 模块
//!
//! 无头动画驱动器，在没有平台动画引擎的环境（测试、演示宿主）中
//! 扮演引擎的角色。
//!
//! 驱动器只负责 **时间轴管理**：
//! - 按添加顺序推进每个动画的已过时间
//! - 首次推进时通知 `animation_did_start`
//! - 结束时通知 `animation_did_stop(finished)`
//!
//! 通知总是发给句柄在 **通知时刻** 的接收者，因此调用方在添加动画之后
//! 直接改写接收者，也会立即生效。

mod playback;
mod system;

pub use playback::{Playback, PlaybackId, PlaybackState};
pub use system::AnimationDriver;

/// 驱动器事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverEvent {
    /// 动画开始
    Started(PlaybackId),
    /// 动画结束
    Stopped {
        /// 播放 ID
        id: PlaybackId,
        /// 是否正常播放完成
        finished: bool,
    },
}

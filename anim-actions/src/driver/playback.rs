//! # Playback 模块
//!
//! 单个动画的播放进度。
//!
//! 只记录时间轴：延迟、已过时间、状态。不做插值，属性值由引擎外部决定。

use crate::handle::AnimationHandle;

/// 播放 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaybackId(pub u64);

impl PlaybackId {
    /// 创建新的播放 ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for PlaybackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlaybackId({})", self.0)
    }
}

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// 等待开始（有延迟）
    #[default]
    Pending,
    /// 正在播放
    Playing,
    /// 已暂停
    Paused,
    /// 已完成
    Completed,
    /// 已跳过（中途结束）
    Skipped,
}

impl PlaybackState {
    /// 是否为活跃状态（需要更新）
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Playing)
    }

    /// 是否已结束
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }
}

/// 动画播放实例
#[derive(Debug, Clone)]
pub struct Playback {
    /// 播放 ID
    pub id: PlaybackId,
    /// 被播放的动画
    pub handle: AnimationHandle,
    /// 延迟启动（秒）
    pub delay: f32,
    /// 当前状态
    pub state: PlaybackState,
    /// 当前进度（0.0 - 1.0，线性）
    pub progress: f32,
    /// 是否已经开始过
    started: bool,
    /// 已经过的时间
    elapsed: f32,
}

impl Playback {
    /// 创建新的播放实例
    pub fn new(id: PlaybackId, handle: AnimationHandle) -> Self {
        Self {
            id,
            handle,
            delay: 0.0,
            state: PlaybackState::Pending,
            progress: 0.0,
            started: false,
            elapsed: 0.0,
        }
    }

    /// 设置延迟
    pub fn with_delay(mut self, delay: f32) -> Self {
        self.delay = delay.max(0.0);
        self
    }

    /// 动画时长（秒）
    pub fn duration(&self) -> f32 {
        self.handle.duration()
    }

    /// 是否已经开始过
    pub fn has_started(&self) -> bool {
        self.started
    }

    /// 更新播放进度
    ///
    /// # 返回
    /// - `true`: 仍在进行中
    /// - `false`: 已结束
    pub fn update(&mut self, dt: f32) -> bool {
        match self.state {
            PlaybackState::Pending => {
                self.elapsed += dt;
                if self.elapsed >= self.delay {
                    self.state = PlaybackState::Playing;
                    self.started = true;
                    self.elapsed -= self.delay;
                    self.update_playing()
                } else {
                    true
                }
            }
            PlaybackState::Playing => {
                self.elapsed += dt;
                self.update_playing()
            }
            PlaybackState::Paused => true,
            PlaybackState::Completed | PlaybackState::Skipped => false,
        }
    }

    fn update_playing(&mut self) -> bool {
        let duration = self.duration();
        if duration <= 0.0 || self.elapsed >= duration {
            self.progress = 1.0;
            self.state = PlaybackState::Completed;
            return false;
        }

        self.progress = self.elapsed / duration;
        true
    }

    /// 跳过（中途结束）
    pub fn skip(&mut self) {
        if !self.state.is_finished() {
            self.state = PlaybackState::Skipped;
        }
    }

    /// 暂停
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// 恢复
    pub fn resume(&mut self) {
        if self.state == PlaybackState::Paused {
            self.state = PlaybackState::Playing;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playback(duration: f32) -> Playback {
        Playback::new(PlaybackId::new(1), AnimationHandle::new("opacity", duration))
    }

    #[test]
    fn test_playback_lifecycle() {
        let mut p = playback(1.0);
        assert_eq!(p.state, PlaybackState::Pending);
        assert!(!p.has_started());

        assert!(p.update(0.5));
        assert_eq!(p.state, PlaybackState::Playing);
        assert!(p.has_started());
        assert!((p.progress - 0.5).abs() < 0.001);

        assert!(!p.update(0.6));
        assert_eq!(p.state, PlaybackState::Completed);
        assert_eq!(p.progress, 1.0);
    }

    #[test]
    fn test_playback_delay() {
        let mut p = playback(1.0).with_delay(0.5);

        assert!(p.update(0.3));
        assert_eq!(p.state, PlaybackState::Pending);
        assert!(!p.has_started());

        assert!(p.update(0.3));
        assert_eq!(p.state, PlaybackState::Playing);
        assert!((p.progress - 0.1).abs() < 0.001);
    }

    #[test]
    fn test_zero_duration_completes_on_first_update() {
        let mut p = playback(0.0);

        assert!(!p.update(0.0));
        assert!(p.has_started());
        assert_eq!(p.state, PlaybackState::Completed);
    }

    #[test]
    fn test_pause_resume() {
        let mut p = playback(1.0);
        p.update(0.2);

        p.pause();
        assert_eq!(p.state, PlaybackState::Paused);
        assert!(p.update(5.0));
        assert!((p.progress - 0.2).abs() < 0.001);

        p.resume();
        assert!(p.update(0.3));
        assert!((p.progress - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_skip_before_start() {
        let mut p = playback(1.0);
        p.skip();

        assert_eq!(p.state, PlaybackState::Skipped);
        assert!(!p.has_started());
        assert!(!p.update(0.1));
    }
}

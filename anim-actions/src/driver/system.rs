//! # System 模块
//!
//! 无头动画驱动器：推进时间轴，并在开始 / 结束时通知句柄当前的接收者。
//!
//! ```rust,ignore
//! let mut driver = AnimationDriver::new();
//! let id = driver.add(animation.clone());
//!
//! // 每帧推进
//! for event in driver.update(dt) {
//!     // DriverEvent::Started / DriverEvent::Stopped
//! }
//! ```

use tracing::trace;

use super::DriverEvent;
use super::playback::{Playback, PlaybackId, PlaybackState};
use crate::handle::AnimationHandle;

/// 待投递的通知
enum Notification {
    Start(AnimationHandle),
    Stop(AnimationHandle, bool),
}

impl Notification {
    /// 投递给句柄当前的接收者（在通知时刻读取，而非添加时刻）
    fn deliver(self) {
        match self {
            Self::Start(handle) => {
                if let Some(delegate) = handle.delegate() {
                    delegate.animation_did_start(&handle);
                }
            }
            Self::Stop(handle, finished) => {
                if let Some(delegate) = handle.delegate() {
                    delegate.animation_did_stop(&handle, finished);
                }
            }
        }
    }
}

/// 动画驱动器
///
/// 可以在任意线程上驱动；通知在调用 `update` / `remove` 的线程上同步发出。
pub struct AnimationDriver {
    /// 播放中的动画（按添加顺序）
    playbacks: Vec<Playback>,
    /// 下一个播放 ID
    next_id: u64,
    /// 待返回的事件
    events: Vec<DriverEvent>,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("playbacks", &self.playbacks.len())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl AnimationDriver {
    /// 创建新的驱动器
    pub fn new() -> Self {
        Self {
            playbacks: Vec::new(),
            next_id: 1,
            events: Vec::new(),
        }
    }

    fn next_playback_id(&mut self) -> PlaybackId {
        let id = PlaybackId::new(self.next_id);
        self.next_id += 1;
        id
    }

    // ========== 播放控制 ==========

    /// 添加动画，下一次 `update` 时开始
    pub fn add(&mut self, handle: AnimationHandle) -> PlaybackId {
        self.add_with_delay(handle, 0.0)
    }

    /// 添加动画，延迟 `delay` 秒后开始
    pub fn add_with_delay(&mut self, handle: AnimationHandle, delay: f32) -> PlaybackId {
        let id = self.next_playback_id();
        trace!(id = %id, key_path = handle.key_path(), delay = delay, "添加动画");
        self.playbacks
            .push(Playback::new(id, handle).with_delay(delay));
        id
    }

    /// 推进所有动画
    ///
    /// # 返回
    /// 本次（以及此前 `remove` 产生的）事件列表
    pub fn update(&mut self, dt: f32) -> Vec<DriverEvent> {
        let mut notifications = Vec::new();

        for playback in &mut self.playbacks {
            let was_started = playback.has_started();
            if playback.state.is_active() {
                playback.update(dt);
            }

            if !was_started && playback.has_started() {
                self.events.push(DriverEvent::Started(playback.id));
                notifications.push(Notification::Start(playback.handle.clone()));
            }

            if playback.state.is_finished() {
                let finished = playback.state == PlaybackState::Completed;
                self.events.push(DriverEvent::Stopped {
                    id: playback.id,
                    finished,
                });
                notifications.push(Notification::Stop(playback.handle.clone(), finished));
            }
        }

        self.playbacks.retain(|p| !p.state.is_finished());

        for notification in notifications {
            notification.deliver();
        }

        std::mem::take(&mut self.events)
    }

    /// 按 `dt` 逐帧推进，直到没有未结束的动画
    ///
    /// 最多推进 `max_frames` 帧（至少一帧）。
    ///
    /// # 返回
    /// 所有帧的事件；超出帧数预算时返回 `None`，此前的通知已经发出
    pub fn run_to_end(&mut self, dt: f32, max_frames: usize) -> Option<Vec<DriverEvent>> {
        let mut events = Vec::new();
        for _ in 0..max_frames.max(1) {
            events.extend(self.update(dt));
            if !self.has_active_animations() {
                return Some(events);
            }
        }

        trace!(
            max_frames = max_frames,
            active = self.active_count(),
            "帧数预算耗尽"
        );
        None
    }

    /// 移除动画（中途结束，`finished = false`）
    ///
    /// 结束通知立即发出。
    ///
    /// # 返回
    /// 动画是否存在
    pub fn remove(&mut self, id: PlaybackId) -> bool {
        let Some(index) = self.playbacks.iter().position(|p| p.id == id) else {
            return false;
        };

        let playback = self.playbacks.remove(index);
        self.events.push(DriverEvent::Stopped {
            id,
            finished: false,
        });
        Notification::Stop(playback.handle, false).deliver();
        true
    }

    /// 跳过所有动画，下一次 `update` 时以 `finished = false` 结束
    pub fn skip_all(&mut self) {
        for playback in &mut self.playbacks {
            playback.skip();
        }
    }

    /// 暂停动画
    pub fn pause(&mut self, id: PlaybackId) {
        if let Some(playback) = self.playbacks.iter_mut().find(|p| p.id == id) {
            playback.pause();
        }
    }

    /// 恢复动画
    pub fn resume(&mut self, id: PlaybackId) {
        if let Some(playback) = self.playbacks.iter_mut().find(|p| p.id == id) {
            playback.resume();
        }
    }

    // ========== 查询方法 ==========

    /// 是否有未结束的动画
    pub fn has_active_animations(&self) -> bool {
        !self.playbacks.is_empty()
    }

    /// 未结束的动画数量
    pub fn active_count(&self) -> usize {
        self.playbacks.len()
    }

    /// 获取动画的当前进度（0.0 - 1.0）
    pub fn progress(&self, id: PlaybackId) -> Option<f32> {
        self.playbacks
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.progress)
    }

    /// 丢弃所有动画和事件（不发出通知）
    pub fn clear(&mut self) {
        self.playbacks.clear();
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::AnimationDelegate;
    use std::sync::{Arc, Mutex};

    /// 记录收到的通知
    #[derive(Default)]
    struct RecordingDelegate {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingDelegate {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl AnimationDelegate for RecordingDelegate {
        fn animation_did_start(&self, animation: &AnimationHandle) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("start:{}", animation.key_path()));
        }

        fn animation_did_stop(&self, animation: &AnimationHandle, finished: bool) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("stop:{}:{}", animation.key_path(), finished));
        }
    }

    fn with_recorder(key_path: &str, duration: f32) -> (AnimationHandle, Arc<RecordingDelegate>) {
        let handle = AnimationHandle::new(key_path, duration);
        let recorder = Arc::new(RecordingDelegate::default());
        handle.set_delegate(Some(recorder.clone()));
        (handle, recorder)
    }

    #[test]
    fn test_driver_creation() {
        let driver = AnimationDriver::new();
        assert!(!driver.has_active_animations());
        assert_eq!(driver.active_count(), 0);
    }

    #[test]
    fn test_start_and_stop_notifications() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("opacity", 1.0);
        let id = driver.add(handle);

        let events = driver.update(0.5);
        assert_eq!(events, vec![DriverEvent::Started(id)]);
        assert_eq!(recorder.calls(), vec!["start:opacity"]);

        let events = driver.update(0.6);
        assert_eq!(
            events,
            vec![DriverEvent::Stopped {
                id,
                finished: true
            }]
        );
        assert_eq!(recorder.calls(), vec!["start:opacity", "stop:opacity:true"]);
        assert!(!driver.has_active_animations());
    }

    #[test]
    fn test_zero_duration_emits_both_in_one_update() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("position", 0.0);
        let id = driver.add(handle);

        let events = driver.update(0.016);
        assert_eq!(
            events,
            vec![
                DriverEvent::Started(id),
                DriverEvent::Stopped {
                    id,
                    finished: true
                }
            ]
        );
        assert_eq!(
            recorder.calls(),
            vec!["start:position", "stop:position:true"]
        );
    }

    #[test]
    fn test_remove_stops_unfinished() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("opacity", 1.0);
        let id = driver.add(handle);
        driver.update(0.1);

        assert!(driver.remove(id));
        assert!(!driver.remove(id));
        assert_eq!(recorder.calls(), vec!["start:opacity", "stop:opacity:false"]);

        let events = driver.update(0.1);
        assert_eq!(
            events,
            vec![DriverEvent::Stopped {
                id,
                finished: false
            }]
        );
    }

    #[test]
    fn test_skip_all() {
        let mut driver = AnimationDriver::new();
        let (a, a_recorder) = with_recorder("a", 1.0);
        let (b, b_recorder) = with_recorder("b", 1.0);
        driver.add(a);
        driver.update(0.1);
        driver.add(b);

        driver.skip_all();
        driver.update(0.1);

        assert_eq!(a_recorder.calls(), vec!["start:a", "stop:a:false"]);
        // 从未开始的动画只收到结束通知
        assert_eq!(b_recorder.calls(), vec!["stop:b:false"]);
        assert!(!driver.has_active_animations());
    }

    #[test]
    fn test_delegate_read_at_notification_time() {
        let mut driver = AnimationDriver::new();
        let (handle, first) = with_recorder("opacity", 1.0);
        driver.add(handle.clone());

        let second = Arc::new(RecordingDelegate::default());
        handle.set_delegate(Some(second.clone()));
        driver.update(2.0);

        assert!(first.calls().is_empty());
        assert_eq!(second.calls(), vec!["start:opacity", "stop:opacity:true"]);
    }

    #[test]
    fn test_no_delegate_is_silent() {
        let mut driver = AnimationDriver::new();
        let id = driver.add(AnimationHandle::new("opacity", 0.5));

        let events = driver.update(1.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], DriverEvent::Started(id));
    }

    #[test]
    fn test_progress_and_pause() {
        let mut driver = AnimationDriver::new();
        let id = driver.add(AnimationHandle::new("opacity", 1.0));

        driver.update(0.25);
        assert!((driver.progress(id).unwrap() - 0.25).abs() < 0.001);

        driver.pause(id);
        driver.update(0.5);
        assert!((driver.progress(id).unwrap() - 0.25).abs() < 0.001);

        driver.resume(id);
        driver.update(0.25);
        assert!((driver.progress(id).unwrap() - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_run_to_end_completes() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("opacity", 0.5);
        let id = driver.add(handle);

        let events = driver.run_to_end(0.25, 4).unwrap();
        assert_eq!(events.first(), Some(&DriverEvent::Started(id)));
        assert_eq!(
            events.last(),
            Some(&DriverEvent::Stopped { id, finished: true })
        );
        assert_eq!(recorder.calls().len(), 2);
    }

    #[test]
    fn test_run_to_end_respects_frame_budget() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("opacity", f32::INFINITY);
        driver.add(handle);

        assert!(driver.run_to_end(0.25, 1000).is_none());
        assert!(driver.has_active_animations());
        // 开始通知已经发出，结束通知没有
        assert_eq!(recorder.calls().len(), 1);
    }

    #[test]
    fn test_clear_is_silent() {
        let mut driver = AnimationDriver::new();
        let (handle, recorder) = with_recorder("opacity", 1.0);
        driver.add(handle);

        driver.clear();
        assert!(driver.update(1.0).is_empty());
        assert!(recorder.calls().is_empty());
    }
}

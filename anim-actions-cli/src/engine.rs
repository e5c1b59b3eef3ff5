//! # Engine 模块
//!
//! 在独立线程上运行 [`AnimationDriver`]，模拟平台动画引擎：
//! 通知在引擎线程上发出，与主线程无关。

use std::sync::mpsc;
use std::thread::{self, JoinHandle, ThreadId};

use anim_actions::{AnimationDriver, AnimationHandle, DriverEvent, PlaybackId};
use anyhow::{Context, Result, anyhow};
use tracing::debug;

enum EngineCommand {
    Add(AnimationHandle, mpsc::Sender<PlaybackId>),
    Step(f32, mpsc::Sender<Vec<DriverEvent>>),
    RunToEnd(f32, usize, mpsc::Sender<Option<Vec<DriverEvent>>>),
}

/// 引擎线程
///
/// 每个命令都会等待引擎线程处理完成后返回，因此返回时相应的通知已经发出。
pub struct EngineThread {
    commands: Option<mpsc::Sender<EngineCommand>>,
    worker: Option<JoinHandle<()>>,
    thread: ThreadId,
}

impl EngineThread {
    /// 启动引擎线程
    pub fn spawn() -> Result<Self> {
        let (tx, rx) = mpsc::channel::<EngineCommand>();
        let worker = thread::Builder::new()
            .name("animation-engine".to_string())
            .spawn(move || serve(rx))
            .context("无法启动引擎线程")?;
        let thread = worker.thread().id();

        Ok(Self {
            commands: Some(tx),
            worker: Some(worker),
            thread,
        })
    }

    /// 引擎线程 ID
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }

    /// 添加动画
    pub fn add(&self, handle: &AnimationHandle) -> Result<PlaybackId> {
        self.request(|reply| EngineCommand::Add(handle.clone(), reply))
    }

    /// 推进一帧
    pub fn step(&self, dt: f32) -> Result<Vec<DriverEvent>> {
        self.request(|reply| EngineCommand::Step(dt, reply))
    }

    /// 按 `dt` 逐帧推进，直到所有动画结束
    ///
    /// 超过 `max_frames` 帧仍未结束时返回错误。
    pub fn run_to_end(&self, dt: f32, max_frames: usize) -> Result<Vec<DriverEvent>> {
        self.request(|reply| EngineCommand::RunToEnd(dt, max_frames, reply))?
            .ok_or_else(|| anyhow!("动画在 {max_frames} 帧内未结束"))
    }

    fn request<T, F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(mpsc::Sender<T>) -> EngineCommand,
    {
        let commands = self.commands.as_ref().context("引擎线程已关闭")?;
        let (reply, response) = mpsc::channel();
        commands
            .send(build(reply))
            .context("引擎线程已退出")?;
        response.recv().context("引擎线程未返回结果")
    }
}

impl Drop for EngineThread {
    fn drop(&mut self) {
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(commands: mpsc::Receiver<EngineCommand>) {
    let mut driver = AnimationDriver::new();

    for command in commands {
        match command {
            EngineCommand::Add(handle, reply) => {
                let _ = reply.send(driver.add(handle));
            }
            EngineCommand::Step(dt, reply) => {
                let events = driver.update(dt);
                log_events(&events);
                let _ = reply.send(events);
            }
            EngineCommand::RunToEnd(dt, max_frames, reply) => {
                let events = driver.run_to_end(dt, max_frames);
                if let Some(events) = &events {
                    log_events(events);
                }
                let _ = reply.send(events);
            }
        }
    }
}

fn log_events(events: &[DriverEvent]) {
    for event in events {
        match event {
            DriverEvent::Started(id) => debug!(id = %id, "引擎: 动画开始"),
            DriverEvent::Stopped { id, finished } => {
                debug!(id = %id, finished = *finished, "引擎: 动画结束")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_thread_runs_driver() {
        let engine = EngineThread::spawn().unwrap();
        let handle = AnimationHandle::new("opacity", 0.5);
        let id = engine.add(&handle).unwrap();

        let events = engine.run_to_end(0.25, 8).unwrap();
        assert_eq!(events.first(), Some(&DriverEvent::Started(id)));
        assert_eq!(
            events.last(),
            Some(&DriverEvent::Stopped { id, finished: true })
        );
    }

    #[test]
    fn test_engine_thread_stops_at_frame_budget() {
        let engine = EngineThread::spawn().unwrap();
        engine
            .add(&AnimationHandle::new("opacity", f32::INFINITY))
            .unwrap();

        let err = engine.run_to_end(0.25, 100).unwrap_err();
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn test_engine_thread_is_separate() {
        let engine = EngineThread::spawn().unwrap();
        assert_ne!(engine.thread_id(), thread::current().id());
    }
}

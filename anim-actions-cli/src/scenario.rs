//! # Scenario 模块
//!
//! 演示场景：每个场景使用独立的注册表、主线程循环和引擎线程，
//! 运行结束后给出一组检查结果。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, ThreadId};

use anim_actions::{
    ActionRegistry, AnimationDelegate, AnimationHandle, BeganAction, FinishedAction, MainLoop,
    began_action, finished_action, main_queue,
};
use anyhow::Result;
use clap::ValueEnum;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::engine::EngineThread;

/// 场景类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScenarioKind {
    /// 开始与结束动作都挂载
    BeganFinished,
    /// 只挂载开始动作
    BeganOnly,
    /// 通知前清除两个动作
    Cleared,
    /// 挂载动作后调用方再设置自己的接收者
    DelegateAfter,
    /// 调用方先设置自己的接收者再挂载动作
    DelegateBefore,
    /// 开始通知之后才挂载结束动作
    LateFinished,
}

impl ScenarioKind {
    /// 所有场景
    pub fn all() -> &'static [ScenarioKind] {
        &[
            Self::BeganFinished,
            Self::BeganOnly,
            Self::Cleared,
            Self::DelegateAfter,
            Self::DelegateBefore,
            Self::LateFinished,
        ]
    }

    /// 场景名称（与命令行参数一致）
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeganFinished => "began-finished",
            Self::BeganOnly => "began-only",
            Self::Cleared => "cleared",
            Self::DelegateAfter => "delegate-after",
            Self::DelegateBefore => "delegate-before",
            Self::LateFinished => "late-finished",
        }
    }

    /// 场景说明
    pub fn description(&self) -> &'static str {
        match self {
            Self::BeganFinished => "开始只触发 began，结束只触发 finished(anim, true)，之后无记录",
            Self::BeganOnly => "只有 began 时，开始通知后记录立即回收",
            Self::Cleared => "通知前清除两个动作，之后都不会触发",
            Self::DelegateAfter => "记录创建后被调用方的接收者整体替换，动作不再触发",
            Self::DelegateBefore => "挂载动作覆盖调用方先前的接收者，动作正常触发",
            Self::LateFinished => "开始通知之后挂载的结束动作仍然触发",
        }
    }
}

/// 单项检查
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// 检查内容
    pub description: String,
    /// 是否通过
    pub passed: bool,
}

/// 场景报告
#[derive(Debug, Clone)]
pub struct ScenarioReport {
    /// 场景类型
    pub kind: ScenarioKind,
    /// 检查结果
    pub checks: Vec<Check>,
}

impl ScenarioReport {
    fn new(kind: ScenarioKind) -> Self {
        Self {
            kind,
            checks: Vec::new(),
        }
    }

    fn check(&mut self, description: impl Into<String>, passed: bool) {
        let description = description.into();
        if !passed {
            warn!(scenario = self.kind.name(), check = %description, "检查未通过");
        }
        self.checks.push(Check {
            description,
            passed,
        });
    }

    /// 是否全部通过
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|check| check.passed)
    }
}

/// 动作探针：记录调用次数、执行线程与结束参数
#[derive(Default)]
struct Probe {
    began: AtomicUsize,
    finished: AtomicUsize,
    threads: Mutex<Vec<ThreadId>>,
    finished_args: Mutex<Vec<(AnimationHandle, bool)>>,
}

impl Probe {
    fn began_action(self: &Arc<Self>) -> BeganAction {
        let probe = self.clone();
        began_action(move || {
            info!("began 动作执行");
            probe.record_thread();
            probe.began.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn finished_action(self: &Arc<Self>) -> FinishedAction {
        let probe = self.clone();
        finished_action(move |animation, finished| {
            info!(key_path = animation.key_path(), finished = finished, "finished 动作执行");
            probe.record_thread();
            if let Ok(mut args) = probe.finished_args.lock() {
                args.push((animation.clone(), finished));
            }
            probe.finished.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn record_thread(&self) {
        if let Ok(mut threads) = self.threads.lock() {
            threads.push(thread::current().id());
        }
    }

    fn began_count(&self) -> usize {
        self.began.load(Ordering::SeqCst)
    }

    fn finished_count(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }

    fn all_on(&self, thread: ThreadId) -> bool {
        self.threads
            .lock()
            .map(|threads| threads.iter().all(|id| *id == thread))
            .unwrap_or(false)
    }

    fn any_on(&self, thread: ThreadId) -> bool {
        self.threads
            .lock()
            .map(|threads| threads.contains(&thread))
            .unwrap_or(false)
    }

    fn last_finished_args(&self) -> Option<(AnimationHandle, bool)> {
        self.finished_args
            .lock()
            .ok()
            .and_then(|args| args.last().cloned())
    }
}

/// 调用方自己的接收者
#[derive(Default)]
struct ForeignDelegate {
    notifications: AtomicUsize,
}

impl AnimationDelegate for ForeignDelegate {
    fn animation_did_start(&self, _animation: &AnimationHandle) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }

    fn animation_did_stop(&self, _animation: &AnimationHandle, _finished: bool) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}

impl ForeignDelegate {
    fn count(&self) -> usize {
        self.notifications.load(Ordering::SeqCst)
    }
}

/// 场景运行环境
struct Stage<'a> {
    config: &'a AppConfig,
    registry: ActionRegistry,
    main_loop: MainLoop,
    engine: EngineThread,
    probe: Arc<Probe>,
}

impl<'a> Stage<'a> {
    fn new(config: &'a AppConfig) -> Result<Self> {
        let (queue, main_loop) = main_queue(config.main_queue.clone());
        Ok(Self {
            config,
            registry: ActionRegistry::new(queue),
            main_loop,
            engine: EngineThread::spawn()?,
            probe: Arc::new(Probe::default()),
        })
    }

    fn animation(&self, key_path: &str) -> AnimationHandle {
        AnimationHandle::new(key_path, self.config.playback.duration_secs)
    }

    fn tick(&self) -> f32 {
        self.config.playback.tick_secs
    }

    /// 在引擎线程上播放到所有动画结束
    fn run_to_end(&self) -> Result<()> {
        self.engine
            .run_to_end(self.tick(), self.config.playback.frame_budget())?;
        Ok(())
    }

    /// 在主线程上等待，直到探针计数达到预期
    fn wait_for(&self, began: usize, finished: usize) -> bool {
        let probe = &self.probe;
        self.main_loop.run_until(
            || probe.began_count() >= began && probe.finished_count() >= finished,
            self.config.callback_timeout(),
        )
    }

    /// 在主线程上静默观察一段时间，执行期间到达的回调
    fn settle(&self) {
        self.main_loop.run_for(self.config.quiet_period());
    }

    fn on_main_thread(&self) -> bool {
        self.probe.all_on(self.main_loop.designated_thread())
    }
}

/// 运行单个场景
pub fn run(kind: ScenarioKind, config: &AppConfig) -> Result<ScenarioReport> {
    info!(scenario = kind.name(), "运行场景");
    let stage = Stage::new(config)?;
    let mut report = ScenarioReport::new(kind);

    match kind {
        ScenarioKind::BeganFinished => began_finished(&stage, &mut report)?,
        ScenarioKind::BeganOnly => began_only(&stage, &mut report)?,
        ScenarioKind::Cleared => cleared(&stage, &mut report)?,
        ScenarioKind::DelegateAfter => delegate_after(&stage, &mut report)?,
        ScenarioKind::DelegateBefore => delegate_before(&stage, &mut report)?,
        ScenarioKind::LateFinished => late_finished(&stage, &mut report)?,
    }

    Ok(report)
}

fn began_finished(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("A.opacity");
    let view = stage.registry.actions(&animation);
    view.set_began(Some(stage.probe.began_action()));
    view.set_finished(Some(stage.probe.finished_action()));

    report.check("读取到已设置的 began", view.began().is_some());
    report.check("读取到已设置的 finished", view.finished().is_some());

    stage.engine.add(&animation)?;
    stage.engine.step(stage.tick())?;
    report.check("开始后 began 执行", stage.wait_for(1, 0));
    report.check("开始后 finished 未执行", stage.probe.finished_count() == 0);

    stage.run_to_end()?;
    report.check("结束后 finished 执行", stage.wait_for(1, 1));
    stage.settle();

    report.check("began 恰好执行一次", stage.probe.began_count() == 1);
    report.check("finished 恰好执行一次", stage.probe.finished_count() == 1);
    report.check(
        "finished 收到 (A, true)",
        stage
            .probe
            .last_finished_args()
            .is_some_and(|(anim, finished)| anim.ptr_eq(&animation) && finished),
    );
    report.check("回调在主线程上执行", stage.on_main_thread());
    report.check(
        "回调未在引擎线程上执行",
        !stage.probe.any_on(stage.engine.thread_id()),
    );
    report.check("注册表中不再有 A", !stage.registry.contains(&animation));
    Ok(())
}

fn began_only(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("B.opacity");
    stage
        .registry
        .set_began(&animation, stage.probe.began_action());

    stage.engine.add(&animation)?;
    stage.engine.step(stage.tick())?;
    report.check(
        "开始通知后记录立即移除",
        !stage.registry.contains(&animation),
    );
    report.check("began 执行", stage.wait_for(1, 0));

    stage.run_to_end()?;
    stage.settle();
    report.check("began 恰好执行一次", stage.probe.began_count() == 1);
    report.check("注册表为空", stage.registry.is_empty());
    Ok(())
}

fn cleared(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("C.opacity");
    let view = stage.registry.actions(&animation);
    view.set_began(Some(stage.probe.began_action()));
    view.set_finished(Some(stage.probe.finished_action()));
    view.set_began(None);
    view.set_finished(None);

    report.check("清除后注册表中没有 C", !stage.registry.contains(&animation));
    report.check("清除后代理已卸下", !animation.has_delegate());

    stage.engine.add(&animation)?;
    stage.run_to_end()?;
    stage.settle();

    report.check("began 未执行", stage.probe.began_count() == 0);
    report.check("finished 未执行", stage.probe.finished_count() == 0);
    Ok(())
}

fn delegate_after(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("D.opacity");
    let foreign = Arc::new(ForeignDelegate::default());

    stage
        .registry
        .set_began(&animation, stage.probe.began_action());
    stage
        .registry
        .set_finished(&animation, stage.probe.finished_action());
    animation.set_delegate(Some(foreign.clone()));

    stage.engine.add(&animation)?;
    stage.run_to_end()?;
    stage.settle();

    report.check("began 未执行", stage.probe.began_count() == 0);
    report.check("finished 未执行", stage.probe.finished_count() == 0);
    report.check("调用方接收者收到开始与结束", foreign.count() == 2);
    Ok(())
}

fn delegate_before(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("E.opacity");
    let foreign = Arc::new(ForeignDelegate::default());

    animation.set_delegate(Some(foreign.clone()));
    stage
        .registry
        .set_began(&animation, stage.probe.began_action());
    stage
        .registry
        .set_finished(&animation, stage.probe.finished_action());

    stage.engine.add(&animation)?;
    stage.run_to_end()?;

    report.check("began 与 finished 都执行", stage.wait_for(1, 1));
    report.check("调用方接收者未收到通知", foreign.count() == 0);
    report.check("注册表为空", stage.registry.is_empty());
    Ok(())
}

fn late_finished(stage: &Stage<'_>, report: &mut ScenarioReport) -> Result<()> {
    let animation = stage.animation("F.opacity");
    stage
        .registry
        .set_began(&animation, stage.probe.began_action());

    stage.engine.add(&animation)?;
    stage.engine.step(stage.tick())?;
    report.check("开始通知后记录移除", !stage.registry.contains(&animation));

    stage
        .registry
        .set_finished(&animation, stage.probe.finished_action());
    report.check("结束动作重新创建记录", stage.registry.contains(&animation));

    stage.run_to_end()?;
    report.check("began 与 finished 都执行", stage.wait_for(1, 1));
    report.check("注册表为空", stage.registry.is_empty());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.playback.duration_secs = 0.5;
        config.playback.tick_secs = 0.25;
        config.quiet_period_ms = 20;
        config
    }

    #[test]
    fn test_scenario_names_unique() {
        let mut names: Vec<&str> = ScenarioKind::all().iter().map(|k| k.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ScenarioKind::all().len());
    }

    #[test]
    fn test_scenario_names_match_value_enum() {
        for kind in ScenarioKind::all() {
            let parsed = ScenarioKind::from_str(kind.name(), false).unwrap();
            assert_eq!(parsed, *kind);
        }
    }

    #[test]
    fn test_all_scenarios_pass() {
        let config = fast_config();
        for kind in ScenarioKind::all() {
            let report = run(*kind, &config).unwrap();
            let failed: Vec<_> = report.checks.iter().filter(|c| !c.passed).collect();
            assert!(failed.is_empty(), "{}: {:?}", kind.name(), failed);
        }
    }
}

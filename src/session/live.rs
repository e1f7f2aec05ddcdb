//! Frame loops on a single-threaded tokio runtime.
//!
//! The session lives in one `Rc<RefCell<_>>` cell. Loops borrow it once per
//! frame and never across an await point.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::{JoinHandle, LocalSet};
use tokio::time::{Instant, MissedTickBehavior};

use super::{EditorSession, ExportStep};
use crate::constants::PLAYBACK_TICK_INTERVAL_MS;
use crate::core::export::ExportMode;

/// Shared handle to the live editor session.
#[derive(Clone)]
pub struct LiveSession {
    inner: Rc<RefCell<EditorSession>>,
}

impl LiveSession {
    pub fn new(session: EditorSession) -> Self {
        Self {
            inner: Rc::new(RefCell::new(session)),
        }
    }

    /// Read the session. Panics if called from inside `update`.
    pub fn with<R>(&self, f: impl FnOnce(&EditorSession) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Mutate the session. Panics if called from inside another borrow.
    pub fn update<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Mutate the session unless it is already borrowed.
    pub fn try_update<R>(&self, f: impl FnOnce(&mut EditorSession) -> R) -> Option<R> {
        match self.inner.try_borrow_mut() {
            Ok(mut session) => Some(f(&mut session)),
            Err(_) => None,
        }
    }

    /// Advance the transport every 16 ms. Must be called inside a `LocalSet`.
    pub fn start_playback_loop(&self) -> FrameTask {
        let live = self.clone();
        let handle = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(PLAYBACK_TICK_INTERVAL_MS));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                if live.try_update(|session| session.playback_tick(Instant::now())).is_none() {
                    tracing::debug!("Playback tick skipped: session busy");
                }
            }
        });
        FrameTask::new("playback", handle)
    }

    /// Render at the configured preview rate. While a deterministic export
    /// is running each frame advances the export instead. Must be called
    /// inside a `LocalSet`.
    pub fn start_render_loop(&self) -> FrameTask {
        let live = self.clone();
        let fps = self.with(|session| session.config().render_fps.max(1));
        let handle = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(Duration::from_secs_f64(1.0 / fps as f64));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                live.try_update(render_tick);
            }
        });
        FrameTask::new("render", handle)
    }
}

fn render_tick(session: &mut EditorSession) {
    if session.export_mode() == Some(ExportMode::Deterministic) {
        if session.export_step() == ExportStep::Finished {
            tracing::debug!("Deterministic export completed in render loop");
        }
    } else {
        session.render_frame();
    }
}

/// A spawned frame loop. Dropping it (or calling `cancel`) aborts the loop.
pub struct FrameTask {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
}

impl FrameTask {
    fn new(name: &'static str, handle: JoinHandle<()>) -> Self {
        tracing::debug!(task = name, "Frame task started");
        Self {
            name,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!(task = self.name, "Frame task cancelled");
        }
    }
}

impl Drop for FrameTask {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Current-thread tokio runtime with a `LocalSet` for `!Send` frame loops.
pub struct EditorRuntime {
    runtime: tokio::runtime::Runtime,
    local: LocalSet,
}

impl EditorRuntime {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            local: LocalSet::new(),
        })
    }

    /// Drive `future` to completion along with any spawned frame loops.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.local.block_on(&self.runtime, future)
    }
}

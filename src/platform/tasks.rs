//! Schedulable tasks
//!
//! The session owns two recurring tasks: the world tick and the jump frame
//! loop. It never touches timers itself. Starting or cancelling a task
//! queues a `TaskCommand` that the host applies with its own primitive
//! (`setInterval`/`requestAnimationFrame` in the browser, `ManualClock`
//! natively). Callbacks carry their handle, so anything still in flight
//! after a cancel is recognised as stale and ignored.

use crate::consts::{FRAME_MS, WORLD_TICK_MS};

/// Which recurring task a handle belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Fixed-period world advance
    WorldTick,
    /// One jump physics step per display frame
    JumpFrame,
}

impl TaskKind {
    pub fn cadence(self) -> Cadence {
        match self {
            TaskKind::WorldTick => Cadence::EveryMs(WORLD_TICK_MS),
            TaskKind::JumpFrame => Cadence::EveryFrame,
        }
    }
}

/// How often the host should fire a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cadence {
    EveryMs(u32),
    EveryFrame,
}

/// Identifies one started task. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub id: u64,
    pub kind: TaskKind,
}

/// Instruction for the host scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskCommand {
    Start { handle: TaskHandle, cadence: Cadence },
    Cancel(TaskHandle),
}

/// The session's live tasks plus the commands not yet picked up by the host
#[derive(Debug, Default)]
pub struct TaskSet {
    next_id: u64,
    world: Option<TaskHandle>,
    jump: Option<TaskHandle>,
    outbox: Vec<TaskCommand>,
}

impl TaskSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: TaskKind) -> &mut Option<TaskHandle> {
        match kind {
            TaskKind::WorldTick => &mut self.world,
            TaskKind::JumpFrame => &mut self.jump,
        }
    }

    /// Start a task of `kind`, replacing any running one
    pub fn start(&mut self, kind: TaskKind) -> TaskHandle {
        self.cancel(kind);
        self.next_id += 1;
        let handle = TaskHandle {
            id: self.next_id,
            kind,
        };
        *self.slot(kind) = Some(handle);
        self.outbox.push(TaskCommand::Start {
            handle,
            cadence: kind.cadence(),
        });
        handle
    }

    /// Cancel the running task of `kind`, if any
    pub fn cancel(&mut self, kind: TaskKind) {
        if let Some(handle) = self.slot(kind).take() {
            self.outbox.push(TaskCommand::Cancel(handle));
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel(TaskKind::WorldTick);
        self.cancel(TaskKind::JumpFrame);
    }

    pub fn current(&self, kind: TaskKind) -> Option<TaskHandle> {
        match kind {
            TaskKind::WorldTick => self.world,
            TaskKind::JumpFrame => self.jump,
        }
    }

    /// Whether a callback for `handle` should still run
    pub fn is_current(&self, handle: TaskHandle) -> bool {
        self.current(handle.kind) == Some(handle)
    }

    /// Take the commands queued since the last drain
    pub fn drain(&mut self) -> Vec<TaskCommand> {
        std::mem::take(&mut self.outbox)
    }
}

#[derive(Debug, Clone, Copy)]
struct Interval {
    handle: TaskHandle,
    period_ms: f64,
    next_due_ms: f64,
}

/// Deterministic host scheduler on a virtual clock.
///
/// Fires interval tasks on their period and frame tasks on a fixed display
/// refresh, in time order. Used by the native build and by tests.
#[derive(Debug)]
pub struct ManualClock {
    now_ms: f64,
    frame_ms: f64,
    next_frame_ms: f64,
    intervals: Vec<Interval>,
    frame_tasks: Vec<TaskHandle>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(FRAME_MS)
    }
}

impl ManualClock {
    pub fn new(frame_ms: f64) -> Self {
        Self {
            now_ms: 0.0,
            frame_ms,
            next_frame_ms: frame_ms,
            intervals: Vec::new(),
            frame_tasks: Vec::new(),
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// No task is scheduled
    pub fn is_idle(&self) -> bool {
        self.intervals.is_empty() && self.frame_tasks.is_empty()
    }

    /// Apply start/cancel commands drained from a session
    pub fn apply(&mut self, commands: impl IntoIterator<Item = TaskCommand>) {
        for command in commands {
            match command {
                TaskCommand::Start {
                    handle,
                    cadence: Cadence::EveryMs(period),
                } => {
                    let period_ms = period as f64;
                    self.intervals.push(Interval {
                        handle,
                        period_ms,
                        next_due_ms: self.now_ms + period_ms,
                    });
                }
                TaskCommand::Start {
                    handle,
                    cadence: Cadence::EveryFrame,
                } => self.frame_tasks.push(handle),
                TaskCommand::Cancel(handle) => {
                    self.intervals.retain(|i| i.handle != handle);
                    self.frame_tasks.retain(|h| *h != handle);
                }
            }
        }
    }

    /// Jump to the next instant anything is due and return what fires,
    /// intervals first. Empty when idle.
    pub fn advance(&mut self) -> Vec<TaskHandle> {
        let next_interval = self
            .intervals
            .iter()
            .map(|i| i.next_due_ms)
            .fold(f64::INFINITY, f64::min);
        let next_frame = if self.frame_tasks.is_empty() {
            f64::INFINITY
        } else {
            self.next_frame_ms
        };
        let now = next_interval.min(next_frame);
        if !now.is_finite() {
            return Vec::new();
        }
        self.now_ms = now;

        let mut due = Vec::new();
        for interval in &mut self.intervals {
            if interval.next_due_ms <= now {
                interval.next_due_ms += interval.period_ms;
                due.push(interval.handle);
            }
        }
        if next_frame <= now {
            due.extend(self.frame_tasks.iter().copied());
        }
        // Display refresh keeps its phase whether or not anyone listens
        while self.next_frame_ms <= now {
            self.next_frame_ms += self.frame_ms;
        }
        due
    }
}

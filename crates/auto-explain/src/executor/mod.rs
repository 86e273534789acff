//! Executor interface: the four execution phases, their hook slots, and the
//! per-statement descriptor observers operate on.
//!
//! The engine supplies a [`StandardExecutor`]; observers install themselves
//! into the [`ExecutorHooks`] table of an [`Executor`]. Every phase entry
//! point dispatches to the installed hook if there is one, otherwise to the
//! standard implementation.
//!
//! ```rust,ignore
//! use auto_explain::executor::{ExecFlags, Executor, QueryDesc, ScanDirection};
//!
//! let executor = Executor::new(MyEngine::default());
//! let mut desc = QueryDesc::new("SELECT 1");
//! executor.executor_start(&mut desc, ExecFlags::empty())?;
//! executor.executor_run(&mut desc, ScanDirection::Forward, 0, true)?;
//! executor.executor_finish(&mut desc)?;
//! executor.executor_end(&mut desc)?;
//! ```

mod instrument;

pub use instrument::{InstrumentOptions, Instrumentation};

use crate::error::ExecResult;
use bitflags::bitflags;
use std::any::Any;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

bitflags! {
    /// Flags passed to the start phase.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExecFlags: u32 {
        /// Plan-only: the statement will be described, never executed.
        const EXPLAIN_ONLY = 1 << 0;
        /// Caller may request a rescan.
        const REWIND = 1 << 1;
        /// Caller may fetch backwards.
        const BACKWARD = 1 << 2;
        /// Caller may mark/restore positions.
        const MARK = 1 << 3;
        /// Do not fire AFTER triggers at finish.
        const SKIP_TRIGGERS = 1 << 4;
        /// Create the target relation without populating it.
        const WITH_NO_DATA = 1 << 5;
    }
}

/// Direction for a run phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanDirection {
    Backward,
    NoMovement,
    #[default]
    Forward,
}

/// Per-statement resource scope.
///
/// Created by the standard start phase and dropped by the standard end
/// phase; anything allocated here lives exactly as long as the statement.
#[derive(Debug, Default)]
pub struct ExecutorState {
    /// Whole-statement elapsed-time accumulator, if any observer asked for one.
    pub total_time: Option<Instrumentation>,
    /// Rows processed so far.
    pub processed: u64,
}

impl ExecutorState {
    /// Create an empty scope.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Descriptor for one statement invocation.
///
/// Nested statements (triggers, functions) get their own descriptor and run
/// inside the dynamic extent of their parent's run/finish call.
pub struct QueryDesc {
    /// Statement text as submitted.
    pub source_text: String,
    /// Engine-owned plan tree, opaque to observers.
    pub plan: Option<Arc<dyn Any + Send + Sync>>,
    /// Per-node counters the executor should maintain.
    pub instrument_options: InstrumentOptions,
    /// Statement resource scope; `None` before start and after end.
    pub estate: Option<ExecutorState>,
}

impl QueryDesc {
    /// Create a descriptor with no plan attached.
    pub fn new(source_text: impl Into<String>) -> Self {
        Self {
            source_text: source_text.into(),
            plan: None,
            instrument_options: InstrumentOptions::empty(),
            estate: None,
        }
    }

    /// Attach the engine's plan tree.
    pub fn with_plan<P: Any + Send + Sync>(mut self, plan: P) -> Self {
        self.plan = Some(Arc::new(plan));
        self
    }

    /// Borrow the plan tree as a concrete type.
    pub fn plan<P: Any>(&self) -> Option<&P> {
        self.plan.as_deref().and_then(|p| p.downcast_ref::<P>())
    }

    /// The statement's elapsed-time accumulator, if allocated.
    pub fn total_time(&self) -> Option<&Instrumentation> {
        self.estate.as_ref()?.total_time.as_ref()
    }

    /// Mutable access to the elapsed-time accumulator, if allocated.
    pub fn total_time_mut(&mut self) -> Option<&mut Instrumentation> {
        self.estate.as_mut()?.total_time.as_mut()
    }
}

impl fmt::Debug for QueryDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDesc")
            .field("source_text", &self.source_text)
            .field("has_plan", &self.plan.is_some())
            .field("instrument_options", &self.instrument_options)
            .field("estate", &self.estate)
            .finish()
    }
}

/// The engine's default behavior for each phase.
pub trait StandardExecutor: Send + Sync {
    /// Prepare the statement for execution.
    fn start(&self, desc: &mut QueryDesc, eflags: ExecFlags) -> ExecResult;

    /// Produce up to `count` rows (`0` means all). May be called repeatedly.
    fn run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
        execute_once: bool,
    ) -> ExecResult;

    /// Run AFTER triggers and other end-of-statement work.
    fn finish(&self, desc: &mut QueryDesc) -> ExecResult;

    /// Release the statement's resources.
    fn end(&self, desc: &mut QueryDesc) -> ExecResult;
}

/// Start-phase hook.
pub type StartHook = Arc<dyn Fn(&mut QueryDesc, ExecFlags) -> ExecResult + Send + Sync>;
/// Run-phase hook.
pub type RunHook =
    Arc<dyn Fn(&mut QueryDesc, ScanDirection, u64, bool) -> ExecResult + Send + Sync>;
/// Finish-phase hook.
pub type FinishHook = Arc<dyn Fn(&mut QueryDesc) -> ExecResult + Send + Sync>;
/// End-phase hook.
pub type EndHook = Arc<dyn Fn(&mut QueryDesc) -> ExecResult + Send + Sync>;

/// The four hook slots.
///
/// Each slot holds the head of a chain: whoever installed last is called
/// first and is responsible for calling whatever it replaced.
#[derive(Clone, Default)]
pub struct ExecutorHooks {
    pub start: Option<StartHook>,
    pub run: Option<RunHook>,
    pub finish: Option<FinishHook>,
    pub end: Option<EndHook>,
}

impl ExecutorHooks {
    /// Whether no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.run.is_none() && self.finish.is_none() && self.end.is_none()
    }

    /// Slot-by-slot identity comparison.
    pub fn same_as(&self, other: &ExecutorHooks) -> bool {
        fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
        }
        same(&self.start, &other.start)
            && same(&self.run, &other.run)
            && same(&self.finish, &other.finish)
            && same(&self.end, &other.end)
    }
}

impl fmt::Debug for ExecutorHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutorHooks")
            .field("start", &self.start.is_some())
            .field("run", &self.run.is_some())
            .field("finish", &self.finish.is_some())
            .field("end", &self.end.is_some())
            .finish()
    }
}

/// Phase entry points for one session.
///
/// The hook table lock is released before a hook is invoked, so nested
/// statements can re-enter the executor from inside a run or finish call.
pub struct Executor {
    hooks: RwLock<ExecutorHooks>,
    standard: Arc<dyn StandardExecutor>,
}

impl Executor {
    /// Create an executor with empty hook slots.
    pub fn new<S: StandardExecutor + 'static>(standard: S) -> Self {
        Self::with_standard_arc(Arc::new(standard))
    }

    /// Create an executor from an Arc-wrapped standard implementation.
    pub fn with_standard_arc(standard: Arc<dyn StandardExecutor>) -> Self {
        Self {
            hooks: RwLock::new(ExecutorHooks::default()),
            standard,
        }
    }

    /// The engine's default implementation.
    pub fn standard(&self) -> Arc<dyn StandardExecutor> {
        Arc::clone(&self.standard)
    }

    /// Snapshot of the current hook slots.
    pub fn hooks(&self) -> ExecutorHooks {
        self.read_hooks().clone()
    }

    /// Mutate the hook slots.
    ///
    /// Only meant for load/unload, never while statements are executing.
    pub fn update_hooks<R>(&self, f: impl FnOnce(&mut ExecutorHooks) -> R) -> R {
        let mut hooks = self.hooks.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut hooks)
    }

    fn read_hooks(&self) -> RwLockReadGuard<'_, ExecutorHooks> {
        self.hooks.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start phase.
    pub fn executor_start(&self, desc: &mut QueryDesc, eflags: ExecFlags) -> ExecResult {
        let hook = self.read_hooks().start.clone();
        match hook {
            Some(hook) => hook(desc, eflags),
            None => self.standard.start(desc, eflags),
        }
    }

    /// Run phase.
    pub fn executor_run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
        execute_once: bool,
    ) -> ExecResult {
        let hook = self.read_hooks().run.clone();
        match hook {
            Some(hook) => hook(desc, direction, count, execute_once),
            None => self.standard.run(desc, direction, count, execute_once),
        }
    }

    /// Finish phase.
    pub fn executor_finish(&self, desc: &mut QueryDesc) -> ExecResult {
        let hook = self.read_hooks().finish.clone();
        match hook {
            Some(hook) => hook(desc),
            None => self.standard.finish(desc),
        }
    }

    /// End phase.
    pub fn executor_end(&self, desc: &mut QueryDesc) -> ExecResult {
        let hook = self.read_hooks().end.clone();
        match hook {
            Some(hook) => hook(desc),
            None => self.standard.end(desc),
        }
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("hooks", &*self.read_hooks())
            .finish_non_exhaustive()
    }
}

use crate::error::ExecResult;
use crate::executor::{ExecFlags, ExecutorHooks, QueryDesc, ScanDirection, StandardExecutor};
use std::sync::Arc;

/// The link behind this observer in each phase's hook chain.
///
/// Holds whatever occupied the four slots when the observer was installed.
/// Each `call_*` method forwards to that hook, or to the engine default when
/// the slot was empty, exactly once per invocation.
pub struct HookChain {
    prev: ExecutorHooks,
    standard: Arc<dyn StandardExecutor>,
}

impl HookChain {
    pub fn new(prev: ExecutorHooks, standard: Arc<dyn StandardExecutor>) -> Self {
        Self { prev, standard }
    }

    /// The slots as they were before this observer was installed.
    pub fn previous(&self) -> &ExecutorHooks {
        &self.prev
    }

    pub fn call_start(&self, desc: &mut QueryDesc, eflags: ExecFlags) -> ExecResult {
        match &self.prev.start {
            Some(prev) => prev(desc, eflags),
            None => self.standard.start(desc, eflags),
        }
    }

    pub fn call_run(
        &self,
        desc: &mut QueryDesc,
        direction: ScanDirection,
        count: u64,
        execute_once: bool,
    ) -> ExecResult {
        match &self.prev.run {
            Some(prev) => prev(desc, direction, count, execute_once),
            None => self.standard.run(desc, direction, count, execute_once),
        }
    }

    pub fn call_finish(&self, desc: &mut QueryDesc) -> ExecResult {
        match &self.prev.finish {
            Some(prev) => prev(desc),
            None => self.standard.finish(desc),
        }
    }

    pub fn call_end(&self, desc: &mut QueryDesc) -> ExecResult {
        match &self.prev.end {
            Some(prev) => prev(desc),
            None => self.standard.end(desc),
        }
    }
}

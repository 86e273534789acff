use std::sync::atomic::{AtomicUsize, Ordering};

/// Nesting depth of run/finish calls for one session.
///
/// Zero means no statement is executing; a nested statement starts while its
/// parent is inside run or finish, so it observes a depth of at least one.
#[derive(Debug, Default)]
pub struct DepthTracker {
    level: AtomicUsize,
}

impl DepthTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current depth.
    pub fn current(&self) -> usize {
        self.level.load(Ordering::Relaxed)
    }

    /// Whether no run/finish call is in progress.
    pub fn is_top_level(&self) -> bool {
        self.current() == 0
    }

    /// Increment the depth until the returned guard is dropped.
    pub fn enter(&self) -> DepthGuard<'_> {
        self.level.fetch_add(1, Ordering::Relaxed);
        DepthGuard { level: &self.level }
    }

    /// Run `f` one level deeper.
    ///
    /// The depth is restored on every exit path: normal return, an `Err`
    /// propagated by `f`, or a panic unwinding through it. The outcome of
    /// `f` is returned untouched.
    pub fn nested<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }
}

/// Restores the depth when dropped.
#[must_use = "the depth is restored as soon as the guard is dropped"]
#[derive(Debug)]
pub struct DepthGuard<'a> {
    level: &'a AtomicUsize,
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.level.fetch_sub(1, Ordering::Relaxed);
    }
}

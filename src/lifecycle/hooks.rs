//! Callbacks run on successful exchanges.

/// Invoked after every successful transport exchange, e.g. to reset an
/// idle-session timer.
pub trait SuccessHook: Send + Sync {
    fn on_success(&self);
}

impl<F> SuccessHook for F
where
    F: Fn() + Send + Sync,
{
    fn on_success(&self) {
        (self)()
    }
}

use tokio::task::JoinHandle;

/// The running state of the NCM core task.
pub(crate) enum CoreState {
    /// The core task is still running.
    Running(JoinHandle<()>),

    /// The core task has finished and was joined.
    Done,
}

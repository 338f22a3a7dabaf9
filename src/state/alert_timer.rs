use tokio::task::JoinHandle;

/// Tracks the single authoritative alert-clear task.
#[derive(Default)]
pub(crate) struct AlertTimer {
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl AlertTimer {
    /// Cancels the pending clear task and returns the generation for the next one.
    pub(crate) fn supersede(&mut self) -> u64 {
        self.cancel();
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub(crate) fn arm(&mut self, handle: JoinHandle<()>) {
        self.pending = Some(handle);
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub(crate) fn finish(&mut self, generation: u64) {
        if self.is_current(generation) {
            self.pending = None;
        }
    }

    pub(crate) fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Drop for AlertTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

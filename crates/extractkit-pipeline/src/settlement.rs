//! One-shot outcome cell for a run.

use extractkit_core::PipelineError;

/// Records the first failure of a run. Later rejections are ignored.
#[derive(Debug, Default)]
pub struct Settlement {
    failure: Option<PipelineError>,
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` until a failure has been recorded.
    pub fn is_pending(&self) -> bool {
        self.failure.is_none()
    }

    /// Record `err` if nothing has been recorded yet. Returns whether `err`
    /// won; a losing error is dropped.
    pub fn reject(&mut self, err: PipelineError) -> bool {
        if self.failure.is_some() {
            return false;
        }
        self.failure = Some(err);
        true
    }

    pub fn failure(&self) -> Option<&PipelineError> {
        self.failure.as_ref()
    }

    /// Resolve to `value`, or to the recorded failure.
    pub fn finish<T>(self, value: T) -> Result<T, PipelineError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(value),
        }
    }
}

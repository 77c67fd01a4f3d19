/// Stages of a single document's trip through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Validating,
    Computing,
    Embedding,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Validating => "Validating document",
            Phase::Computing => "Running backend",
            Phase::Embedding => "Embedding results",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    PhaseStart(Phase),
    PhaseFinish(Phase),

    BatchStart { documents: u64 },
    DocumentFinished { success: bool },
    BatchFinish,

    Message(String),
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

/// Forwards pipeline events to an optional callback.
///
/// Callbacks must be `Send + Sync` because batch runs report from worker threads.
#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Reports `phase` around `work` and returns its value.
    pub fn phase<T>(&self, phase: Phase, work: impl FnOnce() -> T) -> T {
        self.report(Progress::PhaseStart(phase));
        let value = work();
        self.report(Progress::PhaseFinish(phase));
        value
    }
}

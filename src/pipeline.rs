//! Minimal dispatch pipeline.
//!
//! Stages run in registration order in front of a terminal sink (typically
//! the reducer/store). Each stage receives the action and a [`Next`]
//! continuation; calling `next.run(action)` hands the action to the rest of
//! the chain, and whatever the sink returns flows back out of `dispatch`.

use std::fmt;

/// A stage in the dispatch pipeline.
pub trait Middleware<A, R>: Send + Sync {
    /// Handles one action. Call `next.run(action)` to continue the chain.
    fn handle(&self, action: A, next: Next<'_, A, R>) -> R;
}

type Sink<A, R> = dyn Fn(A) -> R + Send + Sync;

/// The remainder of the pipeline after the current stage.
pub struct Next<'a, A, R> {
    stages: &'a [Box<dyn Middleware<A, R>>],
    sink: &'a Sink<A, R>,
}

impl<'a, A, R> Next<'a, A, R> {
    /// Forward the action to the next stage, or to the sink.
    pub fn run(self, action: A) -> R {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.handle(
                action,
                Next {
                    stages: rest,
                    sink: self.sink,
                },
            ),
            None => (self.sink)(action),
        }
    }
}

/// Adapts a closure into a [`Middleware`].
pub struct FnMiddleware<F>(F);

/// Wraps a closure `(action, next) -> result` as a pipeline stage.
pub fn middleware_fn<A, R, F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(A, Next<'a, A, R>) -> R + Send + Sync,
{
    FnMiddleware(f)
}

impl<A, R, F> Middleware<A, R> for FnMiddleware<F>
where
    F: for<'a> Fn(A, Next<'a, A, R>) -> R + Send + Sync,
{
    fn handle(&self, action: A, next: Next<'_, A, R>) -> R {
        (self.0)(action, next)
    }
}

/// Ordered middleware chain ending in a sink.
pub struct Pipeline<A, R> {
    stages: Vec<Box<dyn Middleware<A, R>>>,
    sink: Box<Sink<A, R>>,
}

impl<A, R> fmt::Debug for Pipeline<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl<A, R> Pipeline<A, R> {
    /// Creates a pipeline with no stages in front of `sink`.
    pub fn new<S>(sink: S) -> Self
    where
        S: Fn(A) -> R + Send + Sync + 'static,
    {
        Self {
            stages: Vec::new(),
            sink: Box::new(sink),
        }
    }

    /// Appends a stage. Stages added earlier see actions first.
    #[must_use]
    pub fn with_stage<M>(mut self, stage: M) -> Self
    where
        M: Middleware<A, R> + 'static,
    {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages in front of the sink.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if actions go straight to the sink.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs one action through every stage and the sink.
    pub fn dispatch(&self, action: A) -> R {
        Next {
            stages: &self.stages,
            sink: self.sink.as_ref(),
        }
        .run(action)
    }
}

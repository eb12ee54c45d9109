//! Cascade evaluation for one flow.
//!
//! An [`Evaluation`] owns the flow's state for the duration of one rooting
//! call. Every appended record (the root invocation and anything `then`
//! dispatches) is queued, and the queue is drained in append order:
//!
//! 1. Match each synchronization's `when` with the record anchored at one
//!    position and strictly older records at the others
//! 2. Refine the frames through the synchronization's `where` pipeline
//! 3. Resolve and dispatch every `then` entry per surviving frame
//!
//! Failures in step 2 and unbound variables in step 3 are reported and
//! isolated. Only the firing limit aborts the cascade.

use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use concord_debug::{TraceEvent, TraceLevel, Tracer};
use concord_foundation::{
    ActionRef, Error, ErrorContext, FlowId, Record, Result, SemanticLimit,
};
use futures::FutureExt;

use crate::concept::Concept;
use crate::engine::EngineInner;
use crate::flow::FlowState;
use crate::frames::Frames;
use crate::sync::Synchronization;

/// One rooting call's evaluation of a flow.
pub(crate) struct Evaluation<'a> {
    engine: &'a EngineInner,
    flow: FlowId,
    state: &'a mut FlowState,
    pending: VecDeque<usize>,
    /// `then` dispatches made on behalf of this rooting call.
    firings: usize,
}

impl<'a> Evaluation<'a> {
    pub(crate) fn new(engine: &'a EngineInner, flow: FlowId, state: &'a mut FlowState) -> Self {
        Self {
            engine,
            flow,
            state,
            pending: VecDeque::new(),
            firings: 0,
        }
    }

    fn tracer(&self) -> &Tracer {
        &self.engine.tracer
    }

    /// Performs the rooting action and runs its cascade to a fixpoint.
    ///
    /// Returns the rooting action's own output, which may be an `{error}` record.
    pub(crate) async fn root(mut self, action: &ActionRef, input: Record) -> Result<Record> {
        let concept = self.engine.registry.read().action_target(action)?;
        let output = perform(concept, action, input.clone()).await;
        self.append(action.clone(), input, output.clone());

        self.drain().await?;

        if self.tracer().admits(TraceLevel::Verbose) {
            self.tracer().record(TraceEvent::FlowSettled {
                flow: self.flow,
                records: self.state.log.len(),
            });
        }
        Ok(output)
    }

    async fn drain(&mut self) -> Result<()> {
        while let Some(index) = self.pending.pop_front() {
            let syncs: Vec<Arc<Synchronization>> = self.engine.registry.read().syncs().to_vec();
            for sync in &syncs {
                self.evaluate(sync, index).await?;
            }
        }
        Ok(())
    }

    fn append(&mut self, action: ActionRef, input: Record, output: Record) {
        let index = self.state.append(self.flow, action, input, output);
        if self.tracer().admits(TraceLevel::Trace) {
            let record = &self.state.log[index];
            self.tracer().record(TraceEvent::Invocation {
                flow: self.flow,
                seq: record.seq,
                action: record.action.clone(),
                input: record.input.clone(),
                output: record.output.clone(),
            });
        }
        self.pending.push_back(index);
    }

    // =========================================================================
    // Per-synchronization evaluation
    // =========================================================================

    async fn evaluate(&mut self, sync: &Synchronization, index: usize) -> Result<()> {
        let frames = Frames::match_anchored(sync.when(), &self.state.log, index);

        if self.tracer().admits(TraceLevel::Verbose) {
            self.tracer().record(TraceEvent::MatchAttempt {
                flow: self.flow,
                sync: sync.name().clone(),
                seq: index as u64,
                matched: frames.len(),
            });
        }
        if frames.is_empty() {
            return Ok(());
        }

        let engine = self.engine;
        let refined = AssertUnwindSafe(
            sync.refinement()
                .run(frames, sync.vars(), |query| engine.registry.read().query(query)),
        )
        .catch_unwind()
        .await;

        let frames = match refined {
            Ok(Ok(frames)) => frames,
            Ok(Err(error)) => {
                self.refinement_failed(sync, error.to_string());
                return Ok(());
            }
            Err(panic) => {
                self.refinement_failed(sync, format!("panicked: {}", panic_message(panic.as_ref())));
                return Ok(());
            }
        };

        if self.tracer().admits(TraceLevel::Verbose) {
            let rows = frames
                .iter()
                .map(|frame| {
                    frame
                        .iter()
                        .map(|(var, value)| (sync.vars().name(var).to_string(), value.clone()))
                        .collect()
                })
                .collect();
            self.tracer().record(TraceEvent::Refined {
                flow: self.flow,
                sync: sync.name().clone(),
                frames: rows,
            });
        }

        for frame in &frames {
            for then in sync.then() {
                match then.input.resolve(frame) {
                    Ok(input) => self.dispatch(sync, &then.action, input).await?,
                    Err(var) => self.tracer().record(TraceEvent::BindingDefect {
                        flow: self.flow,
                        sync: sync.name().clone(),
                        action: then.action.clone(),
                        variable: sync.vars().name(var).to_string(),
                    }),
                }
            }
        }
        Ok(())
    }

    fn refinement_failed(&self, sync: &Synchronization, message: String) {
        self.tracer().record(TraceEvent::RefinementFailed {
            flow: self.flow,
            sync: sync.name().clone(),
            message,
        });
    }

    async fn dispatch(&mut self, sync: &Synchronization, action: &ActionRef, input: Record) -> Result<()> {
        let limit = self.engine.config.max_firings_per_call;
        self.firings += 1;
        if self.firings > limit {
            self.tracer().record(TraceEvent::LimitExceeded {
                flow: self.flow,
                limit,
            });
            return Err(Error::limit_exceeded(SemanticLimit::MaxFirings {
                limit,
                sync: Some(sync.name().to_string()),
            })
            .with_context(
                ErrorContext::new()
                    .with_sync(sync.name().to_string())
                    .with_flow(self.flow)
                    .with_frame(action.to_string()),
            ));
        }

        if self.tracer().admits(TraceLevel::Verbose) {
            self.tracer().record(TraceEvent::Dispatch {
                flow: self.flow,
                sync: sync.name().clone(),
                action: action.clone(),
                input: input.clone(),
            });
        }

        let concept = self.engine.registry.read().action_target(action)?;
        let output = perform(concept, action, input.clone()).await;
        self.append(action.clone(), input, output);
        Ok(())
    }
}

/// Awaits an action, normalizing rejections and panics into `{error}` records.
async fn perform(concept: Arc<dyn Concept>, action: &ActionRef, input: Record) -> Record {
    match AssertUnwindSafe(concept.perform(action.name(), input))
        .catch_unwind()
        .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(failure)) => Record::error(failure.message()),
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!(target: "concord::engine", %action, "action panicked: {message}");
            Record::error(format!("{action} panicked: {message}"))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

//! Structured computation tracing.
//!
//! The evaluator narrates each step of a computation as a [`TraceEvent`]
//! delivered to a caller-supplied [`TraceSink`]. Sinks decide what to do with
//! the events: drop them ([`NoopTrace`]), keep them for assertions
//! ([`RecordingTrace`]), or forward them to `tracing` ([`LogTrace`]).
//!
//! Any `FnMut(TraceEvent)` closure is also a sink.

use super::types::DocId;
use serde::Serialize;
use tracing::debug;

/// One discounted-gain step at a 1-indexed position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GainStep {
    /// 1-indexed rank position
    pub position: usize,
    /// Document at this position (`None` in the ideal gain sequence)
    pub doc_id: Option<DocId>,
    /// Relevance assigned to the position
    pub relevance: f64,
    /// log2(position + 1)
    pub discount: f64,
    /// relevance / discount
    pub gain: f64,
    /// Cumulative gain including this step
    pub running_total: f64,
}

/// Event emitted while scoring a ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// Batch evaluation moved on to a new query.
    QueryStarted { query_id: String },
    /// A judged document received its relevance (ideal order, 1-indexed rank).
    RelevanceAssigned {
        rank: usize,
        doc_id: DocId,
        relevance: f64,
    },
    /// One position of the ranked list contributed to DCG.
    DcgStep(GainStep),
    /// The ranked list ended before the cutoff; positions `first..=last` add 0.
    Padded { first: usize, last: usize },
    /// One position of the ideal ordering contributed to IDCG.
    IdcgStep(GainStep),
    /// Final values for the current query.
    Completed { dcg: f64, idcg: f64, ndcg: f64 },
    /// The current query could not be scored and was left out of the average.
    QueryFailed { query_id: String, error: String },
}

/// Receiver of trace events.
pub trait TraceSink {
    /// Handles one event.
    fn record(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTrace;

impl TraceSink for NoopTrace {
    #[inline]
    fn record(&mut self, _event: TraceEvent) {}
}

/// Sink that keeps every event in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingTrace {
    pub events: Vec<TraceEvent>,
}

impl RecordingTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// DCG steps in emission order.
    pub fn dcg_steps(&self) -> Vec<&GainStep> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::DcgStep(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// IDCG steps in emission order.
    pub fn idcg_steps(&self) -> Vec<&GainStep> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::IdcgStep(step) => Some(step),
                _ => None,
            })
            .collect()
    }

    /// The `Completed` events, one per scored query.
    pub fn completions(&self) -> Vec<(f64, f64, f64)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Completed { dcg, idcg, ndcg } => Some((*dcg, *idcg, *ndcg)),
                _ => None,
            })
            .collect()
    }
}

impl TraceSink for RecordingTrace {
    fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Sink that forwards events to `tracing` at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTrace;

impl TraceSink for LogTrace {
    fn record(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::QueryStarted { query_id } => debug!("=== Query {} ===", query_id),
            TraceEvent::RelevanceAssigned {
                rank,
                doc_id,
                relevance,
            } => debug!("  Ideal {}: {} -> relevance {:.3}", rank, doc_id, relevance),
            TraceEvent::DcgStep(step) => debug!(
                "  DCG pos {}: {} rel={:.3} log2({}+1)={:.3} gain={:.3} total={:.3}",
                step.position,
                step.doc_id.as_ref().map(DocId::as_str).unwrap_or("<empty>"),
                step.relevance,
                step.position,
                step.discount,
                step.gain,
                step.running_total
            ),
            TraceEvent::Padded { first, last } => {
                debug!("  DCG pos {}..={}: <empty> (zero-padded)", first, last)
            }
            TraceEvent::IdcgStep(step) => debug!(
                "  IDCG pos {}: rel={:.3} log2({}+1)={:.3} gain={:.3} total={:.3}",
                step.position,
                step.relevance,
                step.position,
                step.discount,
                step.gain,
                step.running_total
            ),
            TraceEvent::Completed { dcg, idcg, ndcg } => {
                debug!("  DCG={:.3} IDCG={:.3} NDCG={:.3}", dcg, idcg, ndcg)
            }
            TraceEvent::QueryFailed { query_id, error } => {
                debug!("  Query {} failed: {}", query_id, error)
            }
        }
    }
}

impl<F> TraceSink for F
where
    F: FnMut(TraceEvent),
{
    fn record(&mut self, event: TraceEvent) {
        self(event)
    }
}

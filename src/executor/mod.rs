//! Query executor - pull-based operator trees.
//!
//! Every operator implements [`Executor`], whose one interesting method is
//! `fetch_next`: produce the next tuple or `None` at end of stream. The
//! [`Operator`] wrapper owns a boxed executor plus the shared iteration
//! state machine (closed / open / open-with-lookahead) and exposes the
//! uniform `open` / `has_next` / `next` / `rewind` / `close` contract that
//! the rest of the engine composes trees out of.

pub mod aggregate;
pub mod delete;
pub mod error;
pub mod filter;
pub mod insert;
pub mod join;
pub mod predicate;
pub mod project;
pub mod scan;
pub mod sort;

pub use aggregate::{Aggregate, AggOp};
pub use delete::Delete;
pub use error::{ExecutorError, ExecutorResult};
pub use filter::Filter;
pub use insert::Insert;
pub use join::Join;
pub use predicate::{JoinPredicate, Op, Predicate};
pub use project::Project;
pub use scan::SeqScan;
pub use sort::OrderBy;

use std::sync::Arc;

use crate::schema::TupleDesc;
use crate::tuple::Tuple;

/// A node in the pull-based execution tree.
///
/// Implementations only deal in `fetch_next`; lookahead buffering and
/// open/closed bookkeeping live in [`Operator`]. `close` must be safe to
/// call at any time, including repeatedly or after a failed `open`, and
/// must close any child operators.
pub trait Executor {
    /// Acquire resources and position the stream at its first tuple.
    fn open(&mut self) -> ExecutorResult<()>;

    /// Produce the next tuple, or `None` at end of stream.
    fn fetch_next(&mut self) -> ExecutorResult<Option<Tuple>>;

    /// Restart the stream from the beginning.
    fn rewind(&mut self) -> ExecutorResult<()>;

    /// Release resources. Idempotent.
    fn close(&mut self) -> ExecutorResult<()>;

    /// Schema of the tuples this executor produces.
    fn tuple_desc(&self) -> &Arc<TupleDesc>;
}

/// An executor plus the shared iteration state machine.
///
/// `has_next` is idempotent: it buffers one lookahead tuple which the
/// following `next` consumes. `next` past the end of the stream fails with
/// [`ExecutorError::NoSuchTuple`]; iteration on a closed operator fails
/// with [`ExecutorError::NotOpen`].
pub struct Operator {
    exec: Box<dyn Executor>,
    open: bool,
    lookahead: Option<Tuple>,
}

impl Operator {
    /// Wrap a concrete executor.
    pub fn new(exec: impl Executor + 'static) -> Self {
        Operator {
            exec: Box::new(exec),
            open: false,
            lookahead: None,
        }
    }

    /// Open the underlying executor. Opening an open operator is a no-op.
    pub fn open(&mut self) -> ExecutorResult<()> {
        if self.open {
            return Ok(());
        }
        self.exec.open()?;
        self.open = true;
        self.lookahead = None;
        Ok(())
    }

    /// Whether another tuple is available. Idempotent between `next` calls.
    pub fn has_next(&mut self) -> ExecutorResult<bool> {
        self.ensure_open()?;
        if self.lookahead.is_none() {
            self.lookahead = self.exec.fetch_next()?;
        }
        Ok(self.lookahead.is_some())
    }

    /// The next tuple. Fails with [`ExecutorError::NoSuchTuple`] when the
    /// stream is exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> ExecutorResult<Tuple> {
        if self.has_next()? {
            Ok(self.lookahead.take().expect("lookahead present"))
        } else {
            Err(ExecutorError::NoSuchTuple)
        }
    }

    /// The next tuple, or `None` at end of stream. What operators use to
    /// pull from their children.
    pub fn next_opt(&mut self) -> ExecutorResult<Option<Tuple>> {
        self.ensure_open()?;
        if let Some(tuple) = self.lookahead.take() {
            return Ok(Some(tuple));
        }
        self.exec.fetch_next()
    }

    /// Restart iteration from the beginning.
    pub fn rewind(&mut self) -> ExecutorResult<()> {
        self.ensure_open()?;
        self.lookahead = None;
        self.exec.rewind()
    }

    /// Close the operator tree below this node. Idempotent, and safe after
    /// a failed `open`. Close-time errors are swallowed except transaction
    /// aborts, which propagate.
    pub fn close(&mut self) -> ExecutorResult<()> {
        self.open = false;
        self.lookahead = None;
        match self.exec.close() {
            Ok(()) => Ok(()),
            Err(e) if e.is_aborted() => Err(e),
            Err(e) => {
                tracing::debug!(error = %e, "swallowed error during close");
                Ok(())
            }
        }
    }

    /// Schema of the tuples this operator produces.
    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        self.exec.tuple_desc()
    }

    fn ensure_open(&self) -> ExecutorResult<()> {
        if self.open {
            Ok(())
        } else {
            Err(ExecutorError::NotOpen)
        }
    }
}

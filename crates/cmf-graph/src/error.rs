//! Error types for graph assembly and execution.
//!
//! Every failure of a `run` call surfaces as a [`GraphError`]; its
//! [`GraphError::code`] gives the positive status number callers outside
//! Rust expect. Empty regions are not errors: a branch whose region holds
//! no points is skipped.

use cmf_core::Rectangle;
use thiserror::Error;

use crate::node::NodeId;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors raised while building or pulling through a filter graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Plug and socket capabilities do not fit together.
    #[error("connector mismatch between socket {socket:?} and plug {plug:?}: {reason}")]
    ConnectorMismatch {
        /// Socket connector nick.
        socket: String,
        /// Plug connector nick.
        plug: String,
        /// First failed check.
        reason: String,
    },

    /// A request was issued through a plug without a remote socket.
    #[error("plug {index} of node {node} is not connected")]
    NotConnected {
        /// Consuming node.
        node: NodeId,
        /// Plug index.
        index: usize,
    },

    /// Plug is already linked and replacing was not requested.
    #[error("plug {index} of node {node} is already connected")]
    AlreadyConnected {
        /// Consuming node.
        node: NodeId,
        /// Plug index.
        index: usize,
    },

    /// No registered backend matches the pattern.
    #[error("no filter backend registered for {0:?}")]
    BackendUnresolved(String),

    /// Fan-out plug count differs from the number of declared regions.
    #[error("node {node} has {plugs} connected plugs but {regions} regions")]
    UpstreamCountMismatch {
        /// Fan-out node.
        node: NodeId,
        /// Connected plugs.
        plugs: usize,
        /// Declared regions.
        regions: usize,
    },

    /// An image source could not provide samples.
    #[error("image source failed: {0}")]
    IoFailure(#[source] cmf_core::Error),

    /// The requested point has no sample.
    #[error("no sample at ({x}, {y})")]
    NoSample {
        /// Native x.
        x: i64,
        /// Native y.
        y: i64,
    },

    /// Node id does not refer to a live node.
    #[error("no such node: {0}")]
    NoSuchNode(NodeId),

    /// Plug selector did not resolve.
    #[error("node {node} has no plug {selector}")]
    NoSuchPlug {
        /// Node searched.
        node: NodeId,
        /// Selector as text.
        selector: String,
    },

    /// Socket selector did not resolve.
    #[error("node {node} has no socket {selector}")]
    NoSuchSocket {
        /// Node searched.
        node: NodeId,
        /// Selector as text.
        selector: String,
    },

    /// Connecting would close a loop.
    #[error("connecting node {from} to node {to} would create a cycle")]
    Cycle {
        /// Producer.
        from: NodeId,
        /// Consumer.
        to: NodeId,
    },

    /// Options rejected by the backend.
    #[error("invalid options for {registration}: {reason}")]
    InvalidOptions {
        /// Backend registration.
        registration: String,
        /// Why they were rejected.
        reason: String,
    },

    /// Backend context could not be built.
    #[error("context for node {node} failed: {reason}")]
    Context {
        /// Node whose context failed.
        node: NodeId,
        /// Failure description.
        reason: String,
    },

    /// A fan-out branch failed; the other branches were still attempted.
    #[error("branch {index} failed for {roi}: {source}")]
    BranchFailed {
        /// Plug index of the branch.
        index: usize,
        /// Region the branch was asked for.
        roi: Rectangle,
        /// Branch error.
        #[source]
        source: Box<GraphError>,
    },

    /// Request nesting exceeded the configured limit.
    #[error("recursion depth {0} exceeded")]
    RecursionLimit(usize),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(String),

    /// Error from core image types.
    #[error(transparent)]
    Core(#[from] cmf_core::Error),

    /// Error from the ICC layer.
    #[cfg(feature = "icc")]
    #[error(transparent)]
    Icc(#[from] cmf_icc::IccError),
}

impl GraphError {
    /// Creates an [`GraphError::InvalidOptions`] error.
    pub fn invalid_options(registration: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            registration: registration.into(),
            reason: reason.into(),
        }
    }

    /// Creates a [`GraphError::Context`] error.
    pub fn context(node: NodeId, reason: impl Into<String>) -> Self {
        Self::Context {
            node,
            reason: reason.into(),
        }
    }

    /// Numeric status, always `>= 1`.
    pub fn code(&self) -> i32 {
        match self {
            Self::ConnectorMismatch { .. } => 1,
            Self::NotConnected { .. } => 2,
            Self::AlreadyConnected { .. } => 3,
            Self::BackendUnresolved(_) => 4,
            Self::UpstreamCountMismatch { .. } => 5,
            Self::IoFailure(_) | Self::NoSample { .. } => 6,
            Self::NoSuchNode(_) | Self::NoSuchPlug { .. } | Self::NoSuchSocket { .. } => 7,
            Self::Cycle { .. } => 8,
            Self::InvalidOptions { .. } => 9,
            Self::Context { .. } => 10,
            Self::BranchFailed { source, .. } => source.code(),
            Self::RecursionLimit(_) => 11,
            Self::Config(_) => 12,
            Self::Core(_) => 13,
            #[cfg(feature = "icc")]
            Self::Icc(_) => 14,
        }
    }

    /// Innermost error, looking through fan-out wrappers.
    pub fn root_cause(&self) -> &GraphError {
        match self {
            Self::BranchFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl From<serde_yaml::Error> for GraphError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_positive() {
        let errs = [
            GraphError::BackendUnresolved("x".into()),
            GraphError::RecursionLimit(3),
            GraphError::Config("bad".into()),
            GraphError::IoFailure(cmf_core::Error::NoData),
        ];
        for e in &errs {
            assert!(e.code() >= 1, "{e}");
        }
    }

    #[test]
    fn test_branch_failure_keeps_cause() {
        let err = GraphError::BranchFailed {
            index: 1,
            roi: Rectangle::from_size(2.0, 2.0),
            source: Box::new(GraphError::IoFailure(cmf_core::Error::NoData)),
        };
        assert_eq!(err.code(), 6);
        assert!(matches!(err.root_cause(), GraphError::IoFailure(_)));
    }
}

//! Skein error handling.
//!
//! One crate-wide error enum covers every failure mode of construction and
//! recovery. All variants are fatal to the operation that raised them; the
//! partially-built tree may still be inspected for diagnostics, but must not
//! be treated as complete.

use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all skein failure modes.
#[derive(Debug, Error, Diagnostic)]
pub enum SkeinError {
    /// A hole was requested on a tree with no holes left.
    #[error("no open holes remain in the derivation tree")]
    #[diagnostic(
        code(skein::no_holes),
        help("check `any_holes()` before asking for the BFS-first hole")
    )]
    NoHoles,

    /// Finalization was attempted while holes remain open.
    #[error("derivation tree is incomplete: {open} hole(s) still open")]
    #[diagnostic(
        code(skein::incomplete_tree),
        help("every hole must be filled before the tree can be finalized")
    )]
    IncompleteTree { open: usize },

    /// A supplied production index is out of range for its candidate set.
    #[error("selection index {index} out of range: {available} candidate(s) for `{origin}`")]
    #[diagnostic(code(skein::invalid_selection_index))]
    InvalidSelectionIndex {
        index: usize,
        available: usize,
        origin: String,
    },

    /// A pattern terminal needs synthesis but no synthesizer is configured.
    #[error("terminal `{terminal}` has no literal value and no synthesizer is configured")]
    #[diagnostic(
        code(skein::unsupported_terminal),
        help("pattern terminals require a TerminalSynthesizer on the builder")
    )]
    UnsupportedTerminal { terminal: String },

    /// Recovery could not align a node's expansion to any known production.
    #[error("no production matches the expansion of node `{label}`")]
    #[diagnostic(code(skein::no_matching_production))]
    NoMatchingProduction { label: String },

    /// Recovery found more than one structurally identical production.
    /// Signals duplicate productions in the grammar model; never resolved
    /// heuristically.
    #[error("{count} productions match the expansion of node `{label}`")]
    #[diagnostic(
        code(skein::ambiguous_production),
        help("the grammar contains structurally duplicate productions for this origin")
    )]
    AmbiguousProduction { label: String, count: usize },

    /// A symbol was referenced that the grammar does not define.
    #[error("unknown symbol `{name}`")]
    #[diagnostic(code(skein::unknown_symbol))]
    UnknownSymbol { name: String },
}

/// How a policy-driven build ended. Hitting the step cap is a normal
/// outcome, not an error: holes may remain on the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    /// No holes remain; the tree can be finalized.
    Complete,
    /// The step cap was reached first; holes may remain.
    CapReached,
}

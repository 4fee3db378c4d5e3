//! Tree builder: turns production choices into concrete nodes and drives a
//! [`DerivationTree`] to completion.
//!
//! Three driving modes share one node-construction path: absolute-index
//! replay against the global production table, relative-index replay against
//! each hole's candidate list, and policy-driven generation. All three
//! consume holes in the canonical BFS order, so their sequences interoperate
//! with recovery.

use crate::derivation::{DerivationTree, HoleId, NodeKind, PendingChild, PendingNode};
use crate::errors::{BuildStatus, SkeinError};
use crate::grammar::{Grammar, Production, Symbol, TermPattern, TerminalDef};
use crate::policy::{ChoicePolicy, HoleView};
use crate::tree::Token;

/// Produces a concrete literal for a pattern terminal. Consulted only for
/// terminals with no fixed literal value.
pub trait TerminalSynthesizer {
    fn synthesize(&mut self, def: &TerminalDef) -> Token;
}

/// Audit record for one relative-replay step: the local index consumed, the
/// hole it was applied to, and the production (global index) it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub local_index: usize,
    pub path: Vec<usize>,
    pub production: usize,
}

/// Outcome of a policy-driven build: the local indices chosen at each step
/// (replayable through [`TreeBuilder::apply_relative`]) and how the run
/// ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyTrace {
    pub chosen: Vec<usize>,
    pub status: BuildStatus,
}

/// Applies productions to holes, materializing terminals as it goes.
pub struct TreeBuilder<'g> {
    grammar: &'g Grammar,
    synthesizer: Option<Box<dyn TerminalSynthesizer + 'g>>,
}

impl<'g> TreeBuilder<'g> {
    pub fn new(grammar: &'g Grammar) -> Self {
        Self {
            grammar,
            synthesizer: None,
        }
    }

    /// Attach a synthesizer for pattern terminals.
    pub fn with_synthesizer(
        grammar: &'g Grammar,
        synthesizer: Box<dyn TerminalSynthesizer + 'g>,
    ) -> Self {
        Self {
            grammar,
            synthesizer: Some(synthesizer),
        }
    }

    /// A fresh tree with one open hole for `start_symbol`.
    pub fn start(&self, start_symbol: &str) -> Result<DerivationTree, SkeinError> {
        if self.grammar.candidates(start_symbol).is_empty() {
            return Err(SkeinError::UnknownSymbol {
                name: start_symbol.to_string(),
            });
        }
        Ok(DerivationTree::new(start_symbol))
    }

    /// Apply one production (by global index) to one hole.
    pub fn apply_production(
        &mut self,
        tree: &mut DerivationTree,
        hole: HoleId,
        index: usize,
    ) -> Result<(), SkeinError> {
        let grammar = self.grammar;
        let production = grammar
            .production(index)
            .ok_or_else(|| SkeinError::InvalidSelectionIndex {
                index,
                available: grammar.len(),
                origin: tree.hole_symbol(hole).to_string(),
            })?;
        let node = self.pending_node(production)?;
        tree.fill(hole, node);
        Ok(())
    }

    /// Absolute-index replay: each index selects directly from the global
    /// production table; the target hole is the BFS-minimal open hole whose
    /// symbol equals the production's origin.
    pub fn apply_absolute(
        &mut self,
        tree: &mut DerivationTree,
        indices: &[usize],
    ) -> Result<(), SkeinError> {
        let grammar = self.grammar;
        for &index in indices {
            let production =
                grammar
                    .production(index)
                    .ok_or_else(|| SkeinError::InvalidSelectionIndex {
                        index,
                        available: grammar.len(),
                        origin: "<production table>".to_string(),
                    })?;
            let hole = tree.first_hole_for(&production.origin).ok_or_else(|| {
                SkeinError::InvalidSelectionIndex {
                    index,
                    available: 0,
                    origin: production.origin.clone(),
                }
            })?;
            let node = self.pending_node(production)?;
            tree.fill(hole, node);
        }
        Ok(())
    }

    /// Relative-index replay: each integer indexes the candidate list of the
    /// BFS-first hole's symbol at the moment it is consumed. Returns the
    /// audit trail giving each step its resolved meaning.
    pub fn apply_relative(
        &mut self,
        tree: &mut DerivationTree,
        indices: &[usize],
    ) -> Result<Vec<ReplayStep>, SkeinError> {
        let grammar = self.grammar;
        let mut steps = Vec::with_capacity(indices.len());
        for &local_index in indices {
            let hole = tree.bfs_first_hole()?;
            let symbol = tree.hole_symbol(hole).to_string();
            let candidates = grammar.candidates(&symbol);
            let global = *candidates.get(local_index).ok_or_else(|| {
                SkeinError::InvalidSelectionIndex {
                    index: local_index,
                    available: candidates.len(),
                    origin: symbol.clone(),
                }
            })?;
            // Candidate indexes are positions in the production table.
            let production = grammar.production(global).unwrap();
            steps.push(ReplayStep {
                local_index,
                path: tree.hole_path(hole).to_vec(),
                production: global,
            });
            let node = self.pending_node(production)?;
            tree.fill(hole, node);
        }
        Ok(steps)
    }

    /// Policy-driven generation: invoke `policy` per hole until no holes
    /// remain or the step cap is reached. The recorded local indices use the
    /// same encoding as relative replay.
    pub fn apply_policy(
        &mut self,
        tree: &mut DerivationTree,
        policy: &mut dyn ChoicePolicy,
        step_cap: Option<usize>,
    ) -> Result<PolicyTrace, SkeinError> {
        let grammar = self.grammar;
        let mut chosen = Vec::new();
        while tree.any_holes() {
            if step_cap.is_some_and(|cap| chosen.len() >= cap) {
                return Ok(PolicyTrace {
                    chosen,
                    status: BuildStatus::CapReached,
                });
            }
            let hole = tree.bfs_first_hole()?;
            let symbol = tree.hole_symbol(hole).to_string();
            let candidate_indices = grammar.candidates(&symbol);
            if candidate_indices.is_empty() {
                return Err(SkeinError::UnknownSymbol { name: symbol });
            }
            // Candidate indexes are positions in the production table.
            let candidates: Vec<&Production> = candidate_indices
                .iter()
                .map(|&i| grammar.production(i).unwrap())
                .collect();
            let view = HoleView {
                symbol: &symbol,
                path: tree.hole_path(hole),
            };
            let local_index = policy.choose(&candidates, &view);
            if local_index >= candidates.len() {
                return Err(SkeinError::InvalidSelectionIndex {
                    index: local_index,
                    available: candidates.len(),
                    origin: symbol,
                });
            }
            chosen.push(local_index);
            let node = self.pending_node(candidates[local_index])?;
            tree.fill(hole, node);
        }
        Ok(PolicyTrace {
            chosen,
            status: BuildStatus::Complete,
        })
    }

    /// Build the concrete node for one production: terminals materialize
    /// (unless filtered out), nonterminals become open children, and the
    /// wrapper kind follows the hidden-prefix and expand1 rules.
    fn pending_node(&mut self, production: &Production) -> Result<PendingNode, SkeinError> {
        let grammar = self.grammar;
        let mut children = Vec::with_capacity(production.expansion.len());
        for sym in &production.expansion {
            match sym {
                Symbol::Terminal(name) => {
                    let def =
                        grammar
                            .terminal(name)
                            .ok_or_else(|| SkeinError::UnknownSymbol {
                                name: name.clone(),
                            })?;
                    if !def.filter_out || production.options.keep_all_tokens {
                        children.push(PendingChild::Token(self.materialize(def)?));
                    }
                }
                Symbol::Nonterminal(_) => children.push(PendingChild::Open(sym.clone())),
            }
        }

        let label = production.label();
        let inline = production.alias.is_none()
            && (Grammar::is_hidden(label)
                || (production.options.expand1 && children.len() == 1));
        Ok(PendingNode {
            label: label.to_string(),
            kind: if inline {
                NodeKind::Inline
            } else {
                NodeKind::Normal
            },
            children,
        })
    }

    fn materialize(&mut self, def: &TerminalDef) -> Result<Token, SkeinError> {
        match &def.pattern {
            TermPattern::Literal(text) => Ok(Token::new(&def.name, text)),
            TermPattern::Regex(_) => match self.synthesizer.as_mut() {
                Some(synthesizer) => Ok(synthesizer.synthesize(def)),
                None => Err(SkeinError::UnsupportedTerminal {
                    terminal: def.name.clone(),
                }),
            },
        }
    }
}

//! Derivation recovery: given a finished tree built by any producer,
//! recompute the canonical production-index sequence and the terminal values
//! at dynamic-pattern positions.
//!
//! Recovery is the inverse of the builder. Both sides share the grammar's
//! candidate ordering and the `(path length, path)` canonical order, so a
//! recovered sequence replays into an equivalent tree.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::errors::SkeinError;
use crate::grammar::{Grammar, Symbol, TermPattern};
use crate::tree::{Token, Tree, TreeChild};

/// One expansion position as reported by the tree matcher.
///
/// `hidden` is `Some` only for filtered-out terminal positions the matcher
/// reinstated: those occupy no visible child slot and carry the literal
/// value that would have stood there. Terminals present as visible children
/// carry `None`; their value is read from the child itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedSymbol {
    pub symbol: Symbol,
    pub hidden: Option<Token>,
}

impl MatchedSymbol {
    pub fn visible(symbol: Symbol) -> Self {
        Self {
            symbol,
            hidden: None,
        }
    }

    pub fn filtered(token: Token) -> Self {
        Self {
            symbol: Symbol::Terminal(token.terminal.clone()),
            hidden: Some(token),
        }
    }
}

/// External collaborator: recovers, for an already-built node, the literal
/// ordered expansion that produced it, aligned 1:1 with the production's
/// symbols and with filtered terminal positions reinstated.
///
/// Implementations must be idempotent: matching the same node twice returns
/// the same expansion.
pub trait TreeMatcher {
    fn match_expansion(
        &self,
        node: &Tree,
        grammar: &Grammar,
    ) -> Result<Vec<MatchedSymbol>, SkeinError>;
}

/// Result of recovery: global production indices in canonical BFS order,
/// plus the dynamic terminal values keyed by `(*node_path,
/// expansion_position)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recovery {
    pub indices: Vec<usize>,
    pub terminals: BTreeMap<Vec<usize>, Token>,
}

/// Inverts the builder: tree in, index sequence out.
pub struct DerivationRecovery<'g, M> {
    grammar: &'g Grammar,
    matcher: M,
}

impl<'g, M: TreeMatcher> DerivationRecovery<'g, M> {
    pub fn new(grammar: &'g Grammar, matcher: M) -> Self {
        Self { grammar, matcher }
    }

    pub fn recover(&self, tree: &Tree) -> Result<Recovery, SkeinError> {
        let mut recorded: Vec<(Vec<usize>, usize)> = Vec::new();
        let mut terminals: BTreeMap<Vec<usize>, Token> = BTreeMap::new();
        // Depth-first with an explicit stack; index assignment is keyed by
        // path, so traversal order does not affect the result.
        let mut work: Vec<(&Tree, Vec<usize>)> = vec![(tree, Vec::new())];

        while let Some((node, path)) = work.pop() {
            let expansion = self.matcher.match_expansion(node, self.grammar)?;

            let matches: Vec<usize> = self
                .grammar
                .candidates_for_label(&node.label)
                .iter()
                .copied()
                .filter(|&i| {
                    // Candidate indexes come from the production table.
                    let candidate = &self.grammar.production(i).unwrap().expansion;
                    candidate.len() == expansion.len()
                        && candidate
                            .iter()
                            .zip(&expansion)
                            .all(|(sym, matched)| *sym == matched.symbol)
                })
                .collect();

            let global = match matches.len() {
                1 => matches[0],
                0 => {
                    // Self/expand1 escape: a transparent single-child wrapper
                    // contributes no index and consumes no path component.
                    if let Some(sole) = self.transparent_child(node, &expansion) {
                        work.push((sole, path));
                        continue;
                    }
                    return Err(SkeinError::NoMatchingProduction {
                        label: node.label.clone(),
                    });
                }
                count => {
                    return Err(SkeinError::AmbiguousProduction {
                        label: node.label.clone(),
                        count,
                    });
                }
            };
            recorded.push((path.clone(), global));

            // Walk expansion positions against the visible children.
            let mut pending = Vec::new();
            let mut cursor = 0usize;
            for (position, part) in expansion.iter().enumerate() {
                if let Some(token) = &part.hidden {
                    self.record_terminal(&mut terminals, &path, position, token);
                    continue;
                }
                let child =
                    node.children
                        .get(cursor)
                        .ok_or_else(|| SkeinError::NoMatchingProduction {
                            label: node.label.clone(),
                        })?;
                match (&part.symbol, child) {
                    (Symbol::Terminal(_), TreeChild::Token(token)) => {
                        self.record_terminal(&mut terminals, &path, position, token);
                    }
                    (Symbol::Nonterminal(_), TreeChild::Tree(subtree)) => {
                        let mut child_path = path.clone();
                        child_path.push(cursor);
                        pending.push((subtree, child_path));
                    }
                    // The matcher's expansion disagrees with the tree shape.
                    _ => {
                        return Err(SkeinError::NoMatchingProduction {
                            label: node.label.clone(),
                        })
                    }
                }
                cursor += 1;
            }
            work.extend(pending.into_iter().rev());
        }

        // Canonical BFS order shared with the builder.
        recorded.sort_by(|(a, _), (b, _)| (a.len(), a).cmp(&(b.len(), b)));
        Ok(Recovery {
            indices: recorded.into_iter().map(|(_, index)| index).collect(),
            terminals,
        })
    }

    /// The sole child of a transparent wrapper, if the escape applies: the
    /// matched expansion has exactly one symbol whose name matches the
    /// node's own label directly or through the alias relation.
    fn transparent_child<'t>(
        &self,
        node: &'t Tree,
        expansion: &[MatchedSymbol],
    ) -> Option<&'t Tree> {
        if expansion.len() != 1
            || !self
                .grammar
                .name_matches(expansion[0].symbol.name(), &node.label)
        {
            return None;
        }
        match node.children.as_slice() {
            [TreeChild::Tree(sole)] => Some(sole),
            _ => None,
        }
    }

    /// Only dynamic-pattern terminals are recorded; fixed literals are
    /// recoverable from the grammar.
    fn record_terminal(
        &self,
        terminals: &mut BTreeMap<Vec<usize>, Token>,
        path: &[usize],
        position: usize,
        token: &Token,
    ) {
        let is_dynamic = self
            .grammar
            .terminal(&token.terminal)
            .is_some_and(|def| matches!(def.pattern, TermPattern::Regex(_)));
        if is_dynamic {
            let mut key = path.to_vec();
            key.push(position);
            terminals.insert(key, token.clone());
        }
    }
}

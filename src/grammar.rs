//! Grammar model consumed by the builder and recovery.
//!
//! The grammar is treated as immutable once built: a production's position
//! in the global table is its global index, and the per-origin candidate
//! lists are precomputed in the one canonical order (descending expansion
//! length, stable) that relative replay, policies, and recovery all share.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::SkeinError;

/// Reserved prefix marking productions whose nodes are always inlined
/// (spliced into the parent) during finalization.
pub const HIDDEN_PREFIX: char = '_';

// ============================================================================
// SYMBOLS AND TERMINALS
// ============================================================================

/// One grammar symbol. Identity is kind plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
}

impl Symbol {
    pub fn terminal(name: impl Into<String>) -> Self {
        Symbol::Terminal(name.into())
    }

    pub fn nonterminal(name: impl Into<String>) -> Self {
        Symbol::Nonterminal(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(name) | Symbol::Nonterminal(name) => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }
}

/// How a terminal's concrete text is obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TermPattern {
    /// A fixed string; self-materializes during building.
    Literal(String),
    /// A dynamic pattern; requires the external terminal synthesizer.
    Regex(String),
}

/// Definition of one terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalDef {
    pub name: String,
    pub pattern: TermPattern,
    /// Whether occurrences of this terminal are hidden from trees unless a
    /// production opts to keep all tokens.
    pub filter_out: bool,
}

// ============================================================================
// PRODUCTIONS
// ============================================================================

/// Per-production options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionOptions {
    /// Keep filtered-out terminals as children of nodes from this production.
    pub keep_all_tokens: bool,
    /// If the production yields exactly one child after filtering, collapse
    /// the node into that child instead of wrapping it.
    pub expand1: bool,
}

/// One rewrite rule: an origin nonterminal plus an ordered expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub origin: String,
    pub expansion: Vec<Symbol>,
    pub alias: Option<String>,
    pub options: ProductionOptions,
}

impl Production {
    /// The label a node built from this production carries.
    pub fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.origin)
    }
}

// ============================================================================
// GRAMMAR
// ============================================================================

/// An immutable production table with precomputed candidate indexes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grammar {
    productions: Vec<Production>,
    terminals: HashMap<String, TerminalDef>,
    /// Origin name -> global indices, descending expansion length.
    by_origin: HashMap<String, Vec<usize>>,
    /// Origin or alias name -> global indices, descending expansion length.
    /// Recovery looks nodes up by label, which may be an alias.
    by_label: HashMap<String, Vec<usize>>,
    /// Alias name -> origins that use it.
    alias_origins: HashMap<String, Vec<String>>,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    /// The production at a global index.
    pub fn production(&self, index: usize) -> Option<&Production> {
        self.productions.get(index)
    }

    /// Number of productions in the global table.
    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    pub fn terminal(&self, name: &str) -> Option<&TerminalDef> {
        self.terminals.get(name)
    }

    /// Global indices of productions whose origin is `origin`, in the
    /// canonical candidate order.
    pub fn candidates(&self, origin: &str) -> &[usize] {
        self.by_origin.get(origin).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Like [`Grammar::candidates`], but the name may also be an alias.
    pub fn candidates_for_label(&self, label: &str) -> &[usize] {
        self.by_label.get(label).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `name` matches `label` directly or through the alias relation.
    /// Used by recovery's self-rule escape.
    pub fn name_matches(&self, name: &str, label: &str) -> bool {
        if name == label {
            return true;
        }
        self.alias_origins
            .get(label)
            .is_some_and(|origins| origins.iter().any(|o| o == name))
    }

    /// Whether nodes with this label are always inlined during finalization.
    pub fn is_hidden(label: &str) -> bool {
        label.starts_with(HIDDEN_PREFIX)
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental grammar construction with validation at `build()`.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    productions: Vec<Production>,
    terminals: HashMap<String, TerminalDef>,
}

impl GrammarBuilder {
    /// Define a literal terminal that is kept in trees.
    pub fn terminal(mut self, name: &str, literal: &str) -> Self {
        self.terminals.insert(
            name.to_string(),
            TerminalDef {
                name: name.to_string(),
                pattern: TermPattern::Literal(literal.to_string()),
                filter_out: false,
            },
        );
        self
    }

    /// Define a literal terminal that is normally filtered out of trees.
    pub fn filtered_terminal(mut self, name: &str, literal: &str) -> Self {
        self.terminals.insert(
            name.to_string(),
            TerminalDef {
                name: name.to_string(),
                pattern: TermPattern::Literal(literal.to_string()),
                filter_out: true,
            },
        );
        self
    }

    /// Define a dynamic pattern terminal.
    pub fn pattern_terminal(mut self, name: &str, regex: &str, filter_out: bool) -> Self {
        self.terminals.insert(
            name.to_string(),
            TerminalDef {
                name: name.to_string(),
                pattern: TermPattern::Regex(regex.to_string()),
                filter_out,
            },
        );
        self
    }

    /// Add a production with default options and no alias.
    pub fn production(self, origin: &str, expansion: Vec<Symbol>) -> Self {
        self.production_with(origin, expansion, None, ProductionOptions::default())
    }

    /// Add a production with an alias and/or options.
    pub fn production_with(
        mut self,
        origin: &str,
        expansion: Vec<Symbol>,
        alias: Option<&str>,
        options: ProductionOptions,
    ) -> Self {
        self.productions.push(Production {
            origin: origin.to_string(),
            expansion,
            alias: alias.map(str::to_string),
            options,
        });
        self
    }

    /// Validate references and precompute the candidate indexes.
    pub fn build(self) -> Result<Grammar, SkeinError> {
        let mut by_origin: HashMap<String, Vec<usize>> = HashMap::new();
        let mut by_label: HashMap<String, Vec<usize>> = HashMap::new();
        let mut alias_origins: HashMap<String, Vec<String>> = HashMap::new();

        for (i, prod) in self.productions.iter().enumerate() {
            by_origin.entry(prod.origin.clone()).or_default().push(i);
            by_label.entry(prod.origin.clone()).or_default().push(i);
            if let Some(alias) = &prod.alias {
                by_label.entry(alias.clone()).or_default().push(i);
                let origins = alias_origins.entry(alias.clone()).or_default();
                if !origins.contains(&prod.origin) {
                    origins.push(prod.origin.clone());
                }
            }
        }

        // Every referenced symbol must be defined.
        for prod in &self.productions {
            for sym in &prod.expansion {
                let known = match sym {
                    Symbol::Terminal(name) => self.terminals.contains_key(name),
                    Symbol::Nonterminal(name) => by_origin.contains_key(name),
                };
                if !known {
                    return Err(SkeinError::UnknownSymbol {
                        name: sym.name().to_string(),
                    });
                }
            }
        }

        // Canonical candidate order: descending expansion length, stable on
        // table order. Shared by relative replay, policies, and recovery.
        let expansion_len = |i: &usize| self.productions[*i].expansion.len();
        for indices in by_origin.values_mut() {
            indices.sort_by_key(|i| std::cmp::Reverse(expansion_len(i)));
        }
        for indices in by_label.values_mut() {
            indices.sort_by_key(|i| std::cmp::Reverse(expansion_len(i)));
        }

        Ok(Grammar {
            productions: self.productions,
            terminals: self.terminals,
            by_origin,
            by_label,
            alias_origins,
        })
    }
}

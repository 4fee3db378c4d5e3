//! Shared helpers for the integration suites: toy grammars, a hand-built
//! tree matcher, a text renderer, and a seeded synthesizer.
#![allow(dead_code)] // each integration binary uses a different subset

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use skein::build::TerminalSynthesizer;
use skein::grammar::{Grammar, Symbol, TermPattern, TerminalDef};
use skein::recover::{MatchedSymbol, TreeMatcher};
use skein::tree::{Token, Tree, TreeChild};
use skein::SkeinError;

pub fn nt(name: &str) -> Symbol {
    Symbol::nonterminal(name)
}

pub fn t(name: &str) -> Symbol {
    Symbol::terminal(name)
}

/// The shared example grammar:
/// `start: a a | "x"` and `a: "a"`, with global indices
/// 0 = `start -> a a`, 1 = `a -> "a"`, 2 = `start -> "x"`.
pub fn scenario_grammar() -> Grammar {
    Grammar::builder()
        .terminal("X", "x")
        .terminal("A", "a")
        .production("start", vec![nt("a"), nt("a")])
        .production("a", vec![t("A")])
        .production("start", vec![t("X")])
        .build()
        .unwrap()
}

/// Renders a finished tree to text by concatenating its tokens. Stands in
/// for the external unparser in round-trip checks.
pub fn render(tree: &Tree) -> String {
    tree.tokens().iter().map(|t| t.value.as_str()).collect()
}

/// Hand-built tree matcher for toy grammars: aligns each candidate
/// production's expansion against a node's visible children, reinstating
/// filtered-out terminals from their literal values. Falls back to a
/// single-symbol self expansion for transparent wrapper artifacts.
pub struct AlignmentMatcher;

impl AlignmentMatcher {
    fn align(
        grammar: &Grammar,
        production_index: usize,
        node: &Tree,
    ) -> Option<Vec<MatchedSymbol>> {
        let production = grammar.production(production_index)?;
        let mut out = Vec::with_capacity(production.expansion.len());
        let mut cursor = 0usize;
        for sym in &production.expansion {
            match sym {
                Symbol::Terminal(name) => {
                    let def = grammar.terminal(name)?;
                    if def.filter_out && !production.options.keep_all_tokens {
                        let value = match &def.pattern {
                            TermPattern::Literal(text) => text.clone(),
                            TermPattern::Regex(_) => String::new(),
                        };
                        out.push(MatchedSymbol::filtered(Token::new(name, value)));
                        continue;
                    }
                    match node.children.get(cursor) {
                        Some(TreeChild::Token(token)) if token.terminal == *name => {
                            out.push(MatchedSymbol::visible(sym.clone()));
                            cursor += 1;
                        }
                        _ => return None,
                    }
                }
                Symbol::Nonterminal(_) => match node.children.get(cursor) {
                    Some(TreeChild::Tree(_)) => {
                        out.push(MatchedSymbol::visible(sym.clone()));
                        cursor += 1;
                    }
                    _ => return None,
                },
            }
        }
        (cursor == node.children.len()).then_some(out)
    }
}

impl TreeMatcher for AlignmentMatcher {
    fn match_expansion(
        &self,
        node: &Tree,
        grammar: &Grammar,
    ) -> Result<Vec<MatchedSymbol>, SkeinError> {
        for &index in grammar.candidates_for_label(&node.label) {
            if let Some(expansion) = Self::align(grammar, index, node) {
                return Ok(expansion);
            }
        }
        // Wrapper artifact: a node whose sole child repeats itself.
        if let [TreeChild::Tree(sole)] = node.children.as_slice() {
            if grammar.name_matches(&sole.label, &node.label) {
                return Ok(vec![MatchedSymbol::visible(Symbol::nonterminal(
                    node.label.clone(),
                ))]);
            }
        }
        Err(SkeinError::NoMatchingProduction {
            label: node.label.clone(),
        })
    }
}

/// Seeded word synthesizer for pattern terminals, in the spirit of the
/// classic "random lowercase word" test builder.
pub struct RandomWordSynthesizer {
    rng: Xoshiro256StarStar,
}

impl RandomWordSynthesizer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }
}

impl TerminalSynthesizer for RandomWordSynthesizer {
    fn synthesize(&mut self, def: &TerminalDef) -> Token {
        let len = self.rng.gen_range(1..4);
        let word: String = (0..len)
            .map(|_| char::from(b'a' + self.rng.gen_range(0..26u8)))
            .collect();
        Token::new(&def.name, word)
    }
}

//! Finished tree types.
//!
//! A [`Tree`] is the externally visible result of a completed derivation:
//! inline wrappers have been spliced away and every child is either a
//! concrete token or a resolved subtree.

use serde::{Deserialize, Serialize};

/// A concrete terminal occurrence: the terminal's name plus its text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub terminal: String,
    pub value: String,
}

impl Token {
    pub fn new(terminal: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            terminal: terminal.into(),
            value: value.into(),
        }
    }
}

/// One child of a finished tree node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeChild {
    Token(Token),
    Tree(Tree),
}

/// A finished tree node: a production label plus ordered children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub label: String,
    pub children: Vec<TreeChild>,
}

impl Tree {
    pub fn new(label: impl Into<String>, children: Vec<TreeChild>) -> Self {
        Self {
            label: label.into(),
            children,
        }
    }

    /// All tokens in source order. Iterative so deeply nested trees do not
    /// exhaust the call stack.
    pub fn tokens(&self) -> Vec<&Token> {
        let mut tokens = Vec::new();
        let mut stack: Vec<&TreeChild> = self.children.iter().rev().collect();
        while let Some(child) = stack.pop() {
            match child {
                TreeChild::Token(token) => tokens.push(token),
                TreeChild::Tree(tree) => stack.extend(tree.children.iter().rev()),
            }
        }
        tokens
    }

    /// Indented debug rendering.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        let mut stack: Vec<(usize, Part<'_>)> = vec![(0, Part::Tree(self))];
        while let Some((depth, part)) = stack.pop() {
            for _ in 0..depth {
                out.push_str("  ");
            }
            match part {
                Part::Tree(tree) => {
                    out.push_str(&tree.label);
                    out.push('\n');
                    for child in tree.children.iter().rev() {
                        let part = match child {
                            TreeChild::Tree(t) => Part::Tree(t),
                            TreeChild::Token(t) => Part::Token(t),
                        };
                        stack.push((depth + 1, part));
                    }
                }
                Part::Token(token) => {
                    out.push_str(&token.terminal);
                    out.push(' ');
                    out.push_str(&format!("{:?}", token.value));
                    out.push('\n');
                }
            }
        }
        out
    }
}

enum Part<'a> {
    Tree(&'a Tree),
    Token(&'a Token),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_in_source_order() {
        let tree = Tree::new(
            "start",
            vec![
                TreeChild::Tree(Tree::new(
                    "a",
                    vec![TreeChild::Token(Token::new("A", "a"))],
                )),
                TreeChild::Token(Token::new("X", "x")),
            ],
        );
        let values: Vec<&str> = tree.tokens().iter().map(|t| t.value.as_str()).collect();
        assert_eq!(values, vec!["a", "x"]);
    }

    #[test]
    fn pretty_shows_nesting() {
        let tree = Tree::new(
            "start",
            vec![TreeChild::Tree(Tree::new(
                "a",
                vec![TreeChild::Token(Token::new("A", "a"))],
            ))],
        );
        let rendered = tree.pretty();
        assert!(rendered.starts_with("start\n"));
        assert!(rendered.contains("  a\n"));
        assert!(rendered.contains("    A \"a\"\n"));
    }
}

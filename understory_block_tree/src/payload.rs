// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-kind option state.
//!
//! The tree treats a [`Payload`] as opaque: option panels read and write it,
//! emitters turn it into text, and structure code never looks inside.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::kind::BlockKind;

/// A single `import module as alias` entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    /// Dotted module path.
    pub module: String,
    /// Alias bound by the import.
    pub alias: String,
    /// Whether the entry is emitted.
    pub enabled: bool,
}

impl ImportEntry {
    fn disabled(module: &str, alias: &str) -> Self {
        Self {
            module: module.to_string(),
            alias: alias.to_string(),
            enabled: false,
        }
    }
}

/// Option state of a block, tagged by kind family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Options of a `class` block.
    Class {
        /// Class name.
        name: String,
        /// Base classes.
        bases: Vec<String>,
    },
    /// Options of a `def` block.
    Def {
        /// Function name.
        name: String,
        /// Parameter list.
        params: Vec<String>,
    },
    /// Condition of an `if`, `elif`, or `while` block.
    Condition(String),
    /// The `target in iterable` part of a `for` block.
    ForLine(String),
    /// The clause after `except`; empty for a bare `except:`.
    Except(String),
    /// Returned expressions.
    Return(Vec<String>),
    /// Import entries; a fixed set of common modules plus user entries.
    Import(Vec<ImportEntry>),
    /// A raw source line (also used by `break`, `continue`, `pass`, and decorators).
    Line(String),
    /// Kinds without options (`else`, `try`, `finally`, holders).
    None,
}

impl Payload {
    /// Option state a freshly created block of `kind` starts with.
    pub fn default_for(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Class => Self::Class {
                name: "VpClass".to_string(),
                bases: Vec::new(),
            },
            BlockKind::Def => Self::Def {
                name: "vp_func".to_string(),
                params: Vec::new(),
            },
            BlockKind::If => Self::Condition(r#""__home__" == "__main__""#.to_string()),
            BlockKind::Elif => Self::Condition("False".to_string()),
            BlockKind::While => Self::Condition("False".to_string()),
            BlockKind::For => Self::ForLine("i in range(10)".to_string()),
            BlockKind::Except => Self::Except(String::new()),
            BlockKind::Return => Self::Return(Vec::new()),
            BlockKind::Import => Self::Import(
                [
                    ("numpy", "np"),
                    ("pandas", "pd"),
                    ("matplotlib.pyplot", "plt"),
                    ("seaborn", "sns"),
                    ("os", "os"),
                    ("sys", "sys"),
                    ("time", "time"),
                    ("datetime", "datetime"),
                    ("random", "random"),
                    ("math", "math"),
                ]
                .iter()
                .map(|(module, alias)| ImportEntry::disabled(module, alias))
                .collect(),
            ),
            BlockKind::Break => Self::Line("break".to_string()),
            BlockKind::Continue => Self::Line("continue".to_string()),
            BlockKind::Pass => Self::Line("pass".to_string()),
            BlockKind::Property => Self::Line("@property".to_string()),
            BlockKind::Code => Self::Line(String::new()),
            BlockKind::Else
            | BlockKind::ForElse
            | BlockKind::Try
            | BlockKind::Finally
            | BlockKind::Holder => Self::None,
        }
    }

    /// The payload a class's default `def` body starts with: `__init__(self)`.
    pub fn class_init() -> Self {
        Self::Def {
            name: "__init__".to_string(),
            params: alloc::vec!["self".to_string()],
        }
    }

    /// Returns true if this payload variant is valid for `kind`.
    pub fn fits(&self, kind: BlockKind) -> bool {
        matches!(
            (self, kind),
            (Self::Class { .. }, BlockKind::Class)
                | (Self::Def { .. }, BlockKind::Def)
                | (
                    Self::Condition(_),
                    BlockKind::If | BlockKind::Elif | BlockKind::While
                )
                | (Self::ForLine(_), BlockKind::For)
                | (Self::Except(_), BlockKind::Except)
                | (Self::Return(_), BlockKind::Return)
                | (Self::Import(_), BlockKind::Import)
                | (
                    Self::Line(_),
                    BlockKind::Break
                        | BlockKind::Continue
                        | BlockKind::Pass
                        | BlockKind::Property
                        | BlockKind::Code
                )
                | (
                    Self::None,
                    BlockKind::Else
                        | BlockKind::ForElse
                        | BlockKind::Try
                        | BlockKind::Finally
                        | BlockKind::Holder
                )
        )
    }
}

// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A toy Python emitter for the block tree demos.
//!
//! Real editors supply their own templates; this one is just enough to show
//! indentation following the tree.

use understory_block_tree::{BlockKind, LineEmitter, Payload};

/// Collects one Python source line per block.
#[derive(Clone, Debug, Default)]
pub struct PythonEmitter {
    lines: Vec<String>,
}

impl PythonEmitter {
    /// Create an empty emitter.
    pub fn new() -> Self {
        Self::default()
    }

    /// The emitted source, one line per entry.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The emitted source as a single string.
    pub fn source(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    fn push(&mut self, depth: u32, text: String) {
        let indent = "    ".repeat(depth as usize);
        self.lines.push(format!("{indent}{text}"));
    }
}

impl LineEmitter for PythonEmitter {
    fn line(&mut self, kind: BlockKind, payload: &Payload, depth: u32) {
        let keyword = kind.keyword().unwrap_or_default();
        match payload {
            Payload::Class { name, bases } if bases.is_empty() => {
                self.push(depth, format!("class {name}:"));
            }
            Payload::Class { name, bases } => {
                self.push(depth, format!("class {name}({}):", bases.join(", ")));
            }
            Payload::Def { name, params } => {
                self.push(depth, format!("def {name}({}):", params.join(", ")));
            }
            Payload::Condition(cond) | Payload::ForLine(cond) => {
                self.push(depth, format!("{keyword} {cond}:"));
            }
            Payload::Except(clause) if clause.is_empty() => self.push(depth, "except:".into()),
            Payload::Except(clause) => self.push(depth, format!("except {clause}:")),
            Payload::Return(values) if values.is_empty() => self.push(depth, "return".into()),
            Payload::Return(values) => self.push(depth, format!("return {}", values.join(", "))),
            Payload::Import(entries) => {
                for entry in entries.iter().filter(|e| e.enabled) {
                    self.push(depth, format!("import {} as {}", entry.module, entry.alias));
                }
            }
            Payload::Line(text) => self.push(depth, text.clone()),
            Payload::None => self.push(depth, format!("{keyword}:")),
        }
    }
}

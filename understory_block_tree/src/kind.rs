// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Block kinds and the small table of per-kind behavior.
//!
//! Structure code only ever asks one question of a kind,
//! [`BlockKind::is_container`]. Everything else here exists for factories,
//! renderers, and emitters.

/// The closed set of block kinds.
///
/// A block's kind is fixed when it is created.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// `class Name(bases):`
    Class,
    /// `def name(params):`
    Def,
    /// `if cond:`
    If,
    /// `elif cond:`
    Elif,
    /// `else:` following an `if`/`elif`.
    Else,
    /// `for target in iterable:`
    For,
    /// `else:` following a `for`.
    ForElse,
    /// `while cond:`
    While,
    /// `try:`
    Try,
    /// `except clause:`
    Except,
    /// `finally:`
    Finally,
    /// `return values`
    Return,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `pass`
    Pass,
    /// One or more `import module as alias` lines.
    Import,
    /// A raw line of code typed by the user.
    Code,
    /// A decorator line such as `@property`.
    Property,
    /// Body anchor of a container: "after the body, back at the container's level".
    Holder,
}

impl BlockKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 19] = [
        Self::Class,
        Self::Def,
        Self::If,
        Self::Elif,
        Self::Else,
        Self::For,
        Self::ForElse,
        Self::While,
        Self::Try,
        Self::Except,
        Self::Finally,
        Self::Return,
        Self::Break,
        Self::Continue,
        Self::Pass,
        Self::Import,
        Self::Code,
        Self::Property,
        Self::Holder,
    ];

    /// Returns true for kinds that own an indented body.
    ///
    /// Container blocks are created with a [`Holder`](Self::Holder) anchor and
    /// a default body, and are the only valid targets of a nested attach.
    pub const fn is_container(self) -> bool {
        matches!(
            self,
            Self::Class
                | Self::Def
                | Self::If
                | Self::Elif
                | Self::Else
                | Self::For
                | Self::ForElse
                | Self::While
                | Self::Try
                | Self::Except
                | Self::Finally
        )
    }

    /// Kind of the statement auto-inserted as a new container's body.
    pub const fn default_body(self) -> Option<Self> {
        match self {
            Self::Class => Some(Self::Def),
            Self::Def => Some(Self::Return),
            k if k.is_container() => Some(Self::Pass),
            _ => None,
        }
    }

    /// Leading keyword of the emitted line, if the kind has a fixed one.
    pub const fn keyword(self) -> Option<&'static str> {
        Some(match self {
            Self::Class => "class",
            Self::Def => "def",
            Self::If => "if",
            Self::Elif => "elif",
            Self::Else | Self::ForElse => "else",
            Self::For => "for",
            Self::While => "while",
            Self::Try => "try",
            Self::Except => "except",
            Self::Finally => "finally",
            Self::Return => "return",
            Self::Break => "break",
            Self::Continue => "continue",
            Self::Pass => "pass",
            Self::Import => "import",
            Self::Code | Self::Property | Self::Holder => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_container_has_a_default_body() {
        for kind in BlockKind::ALL {
            assert_eq!(
                kind.is_container(),
                kind.default_body().is_some(),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn default_bodies_follow_the_editor() {
        assert_eq!(BlockKind::Class.default_body(), Some(BlockKind::Def));
        assert_eq!(BlockKind::Def.default_body(), Some(BlockKind::Return));
        assert_eq!(BlockKind::While.default_body(), Some(BlockKind::Pass));
        assert_eq!(BlockKind::Code.default_body(), None);
    }

    #[test]
    fn holder_is_not_a_container() {
        assert!(!BlockKind::Holder.is_container());
        assert_eq!(BlockKind::Holder.keyword(), None);
    }
}

//! Symbol nodes and the handles that address them.
//!
//! Symbols live in the [`SymbolTable`](crate::SymbolTable) arena and refer to
//! each other by [`SymbolId`]. A symbol's parent link and its children map are
//! both plain ids, so the tree has no shared mutable aliasing.

use std::collections::BTreeMap;
use std::fmt;

use bitflags::bitflags;
use smallvec::SmallVec;
use tarn_lexer::Location;

/// Index of a symbol in the table arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The unnamed root every other symbol descends from.
    pub const ROOT: Self = Self(0);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolId({})", self.0)
    }
}

/// Identifies a source file within one build.
///
/// Assigned by the build orchestrator; the table only stores it.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug, Default)]
pub struct FileId(u32);

impl FileId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// The token a symbol (or a diagnostic) belongs to.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Debug)]
pub struct TokenSite {
    pub file: FileId,
    pub location: Location,
}

impl TokenSite {
    #[inline]
    pub const fn new(file: FileId, location: Location) -> Self {
        TokenSite { file, location }
    }
}

/// What a symbol declares.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SymbolKind {
    Module,
    Type,
    /// A declared generic parameter, or one of the synthesized `#i` leaves.
    TypeParam,
    Field,
    Function,
    FunctionParam,
    /// A labeled position of a named tuple.
    TupleParam,
    Local,
}

impl SymbolKind {
    /// Parameters and locals are scoped to a body and never indexed by name.
    #[inline]
    pub fn is_scoped(self) -> bool {
        matches!(
            self,
            SymbolKind::FunctionParam | SymbolKind::TupleParam | SymbolKind::Local
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Module => "module",
            SymbolKind::Type => "type",
            SymbolKind::TypeParam => "type_param",
            SymbolKind::Field => "field",
            SymbolKind::Function => "fun",
            SymbolKind::FunctionParam => "param",
            SymbolKind::TupleParam => "tuple_param",
            SymbolKind::Local => "local",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    /// Declaration qualifiers.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Qualifiers: u16 {
        const PUB = 1 << 0;
        const STATIC = 1 << 1;
        const MUT = 1 << 2;
        const CONST = 1 << 3;
        const INTERFACE = 1 << 4;
        const ENUM = 1 << 5;
        const EXTERN = 1 << 6;
        /// Marks the return slot of a function signature.
        const RETURN = 1 << 7;
    }
}

impl Qualifiers {
    /// Lowercase names of the set bits, in declaration order.
    pub fn tags(self) -> impl Iterator<Item = String> {
        self.iter_names().map(|(name, _)| name.to_ascii_lowercase())
    }
}

/// Label of one tuple position.
///
/// An empty name leaves the position unlabeled.
#[derive(Clone, Eq, PartialEq, Hash, Debug, Default)]
pub struct TupleField {
    pub name: String,
    pub site: Option<TokenSite>,
}

impl TupleField {
    pub fn new(name: impl Into<String>, site: Option<TokenSite>) -> Self {
        TupleField {
            name: name.into(),
            site,
        }
    }
}

/// A node of the symbol tree.
///
/// Build one with [`Symbol::new`] and the `with_*` methods, then hand it to
/// [`SymbolTable::add_or_reject`](crate::SymbolTable::add_or_reject). The
/// full name, ordinal, and children are owned by the table.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    pub parent: SymbolId,
    /// Declared type of a field, parameter, or function (a lambda).
    pub type_ref: Option<SymbolId>,
    pub qualifiers: Qualifiers,
    /// Names of the generic parameters this symbol declares.
    pub generic_params: SmallVec<[String; 2]>,
    /// Non-empty only for specializations; `parent` is then the concrete symbol.
    pub type_args: SmallVec<[SymbolId; 2]>,
    /// Parallel to `type_args`; empty when the tuple is unlabeled.
    pub tuple_names: SmallVec<[String; 2]>,
    pub site: Option<TokenSite>,
    pub comments: Vec<String>,
    pub constraints: Vec<String>,
    pub requires: Option<String>,
    pub(crate) full_name: String,
    pub(crate) ordinal: u32,
    pub(crate) children: BTreeMap<String, SmallVec<[SymbolId; 1]>>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, parent: SymbolId, name: impl Into<String>) -> Self {
        Symbol {
            kind,
            name: name.into(),
            parent,
            type_ref: None,
            qualifiers: Qualifiers::empty(),
            generic_params: SmallVec::new(),
            type_args: SmallVec::new(),
            tuple_names: SmallVec::new(),
            site: None,
            comments: Vec::new(),
            constraints: Vec::new(),
            requires: None,
            full_name: String::new(),
            ordinal: 0,
            children: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_site(mut self, site: TokenSite) -> Self {
        self.site = Some(site);
        self
    }

    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    #[must_use]
    pub fn with_type(mut self, type_ref: SymbolId) -> Self {
        self.type_ref = Some(type_ref);
        self
    }

    #[must_use]
    pub fn with_generic_params<S: Into<String>>(
        mut self,
        params: impl IntoIterator<Item = S>,
    ) -> Self {
        self.generic_params = params.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_comments(mut self, comments: Vec<String>) -> Self {
        self.comments = comments;
        self
    }

    /// Computed by the table; empty until the symbol is inserted.
    #[inline]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Position among the parent's children at insertion time.
    #[inline]
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    #[inline]
    pub fn is_specialized(&self) -> bool {
        !self.type_args.is_empty()
    }

    #[inline]
    pub fn is_pub(&self) -> bool {
        self.qualifiers.contains(Qualifiers::PUB)
    }

    /// Children grouped by simple name (functions overload, so each name maps
    /// to a list).
    pub fn children(&self) -> &BTreeMap<String, SmallVec<[SymbolId; 1]>> {
        &self.children
    }

    /// Every child id, ordered by name then insertion.
    pub fn child_ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.children.values().flatten().copied()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.full_name)
    }
}

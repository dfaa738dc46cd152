//! The symbol arena, duplicate rejection, diagnostics, and name lookup.

use std::fmt::Write as _;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tarn_lexer::Annotation;
use tracing::debug;

use crate::symbol::{Symbol, SymbolId, SymbolKind, TokenSite};

#[allow(
    clippy::cast_possible_truncation,
    reason = "symbol counts are far smaller than u32::MAX"
)]
#[inline]
pub(crate) fn to_u32(n: usize) -> u32 {
    n as u32
}

/// Name of the empty-tuple root every tuple specializes.
pub const TUPLE_ROOT_NAME: &str = "()";
/// Name of the root every lambda type specializes.
pub const LAMBDA_ROOT_NAME: &str = "$lambda";

/// Arena-backed symbol tree.
///
/// # Invariants
///
/// - Children are only inserted through [`SymbolTable::add_or_reject`]: a
///   non-function name is unique per parent, and same-named functions differ
///   in parameter types.
/// - Specializing the same concrete symbol with the same arguments returns
///   the same id, except for named tuples (see
///   [`SymbolTable::create_specialized_type`]).
/// - A token site carries at most one error annotation.
///
/// The table is rebuilt from scratch by every generate pass and is read-only
/// afterwards.
#[derive(Clone, Debug)]
pub struct SymbolTable {
    pub(crate) symbols: Vec<Symbol>,
    pub(crate) tuple_root: SymbolId,
    pub(crate) lambda_root: SymbolId,
    /// Full name -> symbol. Stale after insertion until `generate_lookup`.
    lookup: FxHashMap<String, SymbolId>,
    /// Full name -> specialization, for unnamed specializations.
    pub(crate) specializations: FxHashMap<String, SymbolId>,
    /// Synthesized `#i` parameters, indexed by position.
    pub(crate) generic_params: Vec<SymbolId>,
    pub(crate) generic_constructors: Vec<Option<SymbolId>>,
    diagnostics: FxHashMap<TokenSite, SmallVec<[Annotation; 1]>>,
    error_count: usize,
    warning_count: usize,
    no_compiler_checks: bool,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    /// A table holding the root, the tuple root `()`, and the lambda root.
    pub fn new() -> Self {
        let mut table = SymbolTable {
            symbols: vec![Symbol::new(SymbolKind::Module, SymbolId::ROOT, "")],
            tuple_root: SymbolId::ROOT,
            lambda_root: SymbolId::ROOT,
            lookup: FxHashMap::default(),
            specializations: FxHashMap::default(),
            generic_params: Vec::new(),
            generic_constructors: Vec::new(),
            diagnostics: FxHashMap::default(),
            error_count: 0,
            warning_count: 0,
            no_compiler_checks: false,
        };
        table.tuple_root = table.insert(Symbol::new(
            SymbolKind::Type,
            SymbolId::ROOT,
            TUPLE_ROOT_NAME,
        ));
        table.lambda_root = table.insert(Symbol::new(
            SymbolKind::Type,
            SymbolId::ROOT,
            LAMBDA_ROOT_NAME,
        ));
        table
    }

    /// Downgrade every rejection to a warning.
    pub fn set_no_compiler_checks(&mut self, enabled: bool) {
        self.no_compiler_checks = enabled;
    }

    pub fn no_compiler_checks(&self) -> bool {
        self.no_compiler_checks
    }

    #[inline]
    pub fn root(&self) -> SymbolId {
        SymbolId::ROOT
    }

    #[inline]
    pub fn tuple_root(&self) -> SymbolId {
        self.tuple_root
    }

    #[inline]
    pub fn lambda_root(&self) -> SymbolId {
        self.lambda_root
    }

    /// # Panics
    ///
    /// Panics if `id` was not produced by this table.
    #[inline]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Mutable access for frontends that fill in properties after insertion.
    ///
    /// Call [`SymbolTable::finalize_full_name`] after changing anything that
    /// affects naming (name, type, generic parameters).
    #[inline]
    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        // The root always exists.
        false
    }

    /// Every symbol in the arena, in creation order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolId::from_raw(to_u32(i)), s))
    }

    /// The first child of `parent` named `name`.
    pub fn child(&self, parent: SymbolId, name: &str) -> Option<SymbolId> {
        self.get(parent).children.get(name)?.first().copied()
    }

    pub fn full_name(&self, id: SymbolId) -> &str {
        &self.get(id).full_name
    }

    /// Insert `symbol` under its parent unless it collides with a sibling.
    ///
    /// A non-function collides with any existing child of the same name. A
    /// function collides with a same-named non-function, or with a
    /// same-named function whose parameter types are identical. On a
    /// collision both sites get a "Duplicate symbol" diagnostic and `None` is
    /// returned.
    #[tracing::instrument(
        level = "trace",
        skip_all,
        fields(kind = %symbol.kind, name = %symbol.name)
    )]
    pub fn add_or_reject(&mut self, symbol: Symbol) -> Option<SymbolId> {
        if let Some(existing) = self.find_conflict(&symbol) {
            let message = format!("Duplicate symbol `{}`", self.compute_full_name(&symbol));
            debug!(%message, "rejected");
            let existing_site = self.get(existing).site;
            self.reject(symbol.site, message.clone());
            self.reject(existing_site, message);
            return None;
        }
        Some(self.insert(symbol))
    }

    fn find_conflict(&self, symbol: &Symbol) -> Option<SymbolId> {
        let siblings = self.get(symbol.parent).children.get(&symbol.name)?;
        let &primary = siblings.first()?;
        if symbol.kind != SymbolKind::Function || self.get(primary).kind != SymbolKind::Function {
            return Some(primary);
        }
        let signature = self.signature_of(symbol.type_ref);
        siblings.iter().copied().find(|&sibling| {
            let sibling = self.get(sibling);
            sibling.kind == SymbolKind::Function && self.signature_of(sibling.type_ref) == signature
        })
    }

    /// Unconditionally attach `symbol` to its parent.
    fn insert(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId::from_raw(to_u32(self.symbols.len()));
        symbol.full_name = self.compute_full_name(&symbol);
        let parent = &mut self.symbols[symbol.parent.index()];
        symbol.ordinal = to_u32(parent.children.values().map(SmallVec::len).sum());
        parent
            .children
            .entry(symbol.name.clone())
            .or_default()
            .push(id);
        self.symbols.push(symbol);
        id
    }

    /// Add a symbol that is reachable only through its id (specializations
    /// and synthesized parameters), not through its parent's children.
    pub(crate) fn push_detached(&mut self, mut symbol: Symbol) -> SymbolId {
        let id = SymbolId::from_raw(to_u32(self.symbols.len()));
        if symbol.full_name.is_empty() {
            symbol.full_name = self.compute_full_name(&symbol);
        }
        self.symbols.push(symbol);
        id
    }

    /// Attach a child without the duplicate check. Only for children whose
    /// uniqueness the caller already established.
    pub(crate) fn insert_unchecked(&mut self, symbol: Symbol) -> SymbolId {
        self.insert(symbol)
    }

    /// Recompute the full name of `id` and of everything below it.
    ///
    /// Cached specializations keep the key they were created under.
    pub fn finalize_full_name(&mut self, id: SymbolId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let name = self.compute_full_name(self.get(id));
            let symbol = &mut self.symbols[id.index()];
            symbol.full_name = name;
            stack.extend(symbol.child_ids());
        }
    }

    pub(crate) fn compute_full_name(&self, symbol: &Symbol) -> String {
        if symbol.is_specialized() {
            let args = self.type_list(&symbol.type_args, &symbol.tuple_names);
            if symbol.parent == self.tuple_root {
                return format!("({args})");
            }
            let mut name = format!("{}<{args}>", self.base_name(symbol.parent));
            if symbol.kind == SymbolKind::Function {
                name.push_str(&self.signature_text(symbol.type_ref));
            }
            return name;
        }
        let mut name = self.prefix(symbol.parent);
        name.push_str(&symbol.name);
        match symbol.kind {
            SymbolKind::Type if !symbol.generic_params.is_empty() => {
                let _ = write!(name, "`{}", symbol.generic_params.len());
            }
            SymbolKind::Function => name.push_str(&self.signature_text(symbol.type_ref)),
            _ => {}
        }
        name
    }

    /// `parent.` or nothing for children of the root.
    fn prefix(&self, parent: SymbolId) -> String {
        if parent == SymbolId::ROOT {
            String::new()
        } else {
            format!("{}.", self.get(parent).full_name)
        }
    }

    /// Full name without the generic arity or signature suffix.
    fn base_name(&self, id: SymbolId) -> String {
        let symbol = self.get(id);
        let mut name = self.prefix(symbol.parent);
        name.push_str(&symbol.name);
        name
    }

    /// `T1,T2` or `a T1,b T2`.
    fn type_list(&self, args: &[SymbolId], names: &[String]) -> String {
        let mut text = String::new();
        for (i, &arg) in args.iter().enumerate() {
            if i > 0 {
                text.push(',');
            }
            if let Some(label) = names.get(i).filter(|n| !n.is_empty()) {
                text.push_str(label);
                text.push(' ');
            }
            text.push_str(&self.get(arg).full_name);
        }
        text
    }

    /// Add an annotation to `site`. An error is dropped if the site already
    /// has one.
    pub fn add_annotation(&mut self, site: TokenSite, annotation: Annotation) -> bool {
        let list = self.diagnostics.entry(site).or_default();
        if annotation.is_error() {
            if list.iter().any(Annotation::is_error) {
                return false;
            }
            self.error_count += 1;
        } else if matches!(annotation, Annotation::Warning(_)) {
            self.warning_count += 1;
        }
        list.push(annotation);
        true
    }

    /// Record a hard error at `site` (a warning under `no_compiler_checks`).
    ///
    /// Returns `false` if the site already carried an error.
    pub fn reject(&mut self, site: Option<TokenSite>, message: impl Into<String>) -> bool {
        let message = message.into();
        let annotation = if self.no_compiler_checks {
            Annotation::Warning(message)
        } else {
            Annotation::CompileError(message)
        };
        self.record(site, annotation)
    }

    /// Record a warning at `site`.
    pub fn warn(&mut self, site: Option<TokenSite>, message: impl Into<String>) -> bool {
        self.record(site, Annotation::Warning(message.into()))
    }

    fn record(&mut self, site: Option<TokenSite>, annotation: Annotation) -> bool {
        if let Some(site) = site {
            return self.add_annotation(site, annotation);
        }
        // Built-in symbols have no token; count the diagnostic anyway.
        debug!(?annotation, "diagnostic without a token site");
        if annotation.is_error() {
            self.error_count += 1;
        } else {
            self.warning_count += 1;
        }
        true
    }

    /// Every annotated site.
    pub fn diagnostics(&self) -> impl Iterator<Item = (TokenSite, &[Annotation])> {
        self.diagnostics
            .iter()
            .map(|(site, list)| (*site, list.as_slice()))
    }

    pub fn annotations_at(&self, site: TokenSite) -> &[Annotation] {
        self.diagnostics.get(&site).map_or(&[], SmallVec::as_slice)
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Rebuild the full-name index.
    ///
    /// Call once every non-parameter symbol is in. [`SymbolTable::lookup`]
    /// does not see anything inserted afterwards until this runs again.
    #[tracing::instrument(level = "debug", skip_all, fields(symbols = self.symbols.len()))]
    pub fn generate_lookup(&mut self) {
        self.lookup.clear();
        for (i, symbol) in self.symbols.iter().enumerate().skip(1) {
            if symbol.kind.is_scoped() {
                continue;
            }
            self.lookup
                .entry(symbol.full_name.clone())
                .or_insert(SymbolId::from_raw(to_u32(i)));
        }
    }

    /// Find a symbol by full name in the index built by
    /// [`SymbolTable::generate_lookup`].
    pub fn lookup(&self, full_name: &str) -> Option<SymbolId> {
        self.lookup.get(full_name).copied()
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

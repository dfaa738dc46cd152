//! Symbol collection and header verification for declaration files.
//!
//! Collection runs in two phases over all units. Phase one declares every
//! module and type so that phase two can resolve references to types
//! declared later or in other files.

use std::path::Path;

use rustc_hash::FxHashSet;
use tarn_lexer::Location;
use tarn_symbols::{
    FileId, Qualifiers, Symbol, SymbolId, SymbolKind, SymbolTable, TokenSite, TupleField,
};
use tracing::trace;

use super::parser::{Decl, DeclKind, DeclTree, Name, TypeExpr};
use crate::frontend::SourceUnit;

pub const BUILTIN_MODULE: &str = "builtin";
pub const BUILTIN_TYPES: &[&str] = &["int", "float", "bool", "str", "byte"];
/// Non-public placeholder that unresolved type references point at.
pub const UNKNOWN_TYPE: &str = "unknown";

fn qualifiers(is_pub: bool) -> Qualifiers {
    if is_pub {
        Qualifiers::PUB
    } else {
        Qualifiers::empty()
    }
}

fn default_module(path: &str) -> &str {
    Path::new(path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("main")
}

/// The module `name`, created on first use. Same-named modules merge.
fn module(
    table: &mut SymbolTable,
    name: &str,
    site: Option<TokenSite>,
    qualifiers: Qualifiers,
) -> SymbolId {
    if let Some(id) = table.child(SymbolId::ROOT, name) {
        return id;
    }
    let mut symbol =
        Symbol::new(SymbolKind::Module, SymbolId::ROOT, name).with_qualifiers(qualifiers);
    symbol.site = site;
    table.add_or_reject(symbol).unwrap_or(SymbolId::ROOT)
}

struct Builtins {
    module: SymbolId,
    unknown: SymbolId,
}

fn declare_builtins(table: &mut SymbolTable) -> Builtins {
    let module = module(table, BUILTIN_MODULE, None, Qualifiers::EXTERN);
    for name in BUILTIN_TYPES {
        table.add_or_reject(
            Symbol::new(SymbolKind::Type, module, *name).with_qualifiers(Qualifiers::PUB),
        );
    }
    let unknown = table
        .add_or_reject(Symbol::new(SymbolKind::Type, module, UNKNOWN_TYPE))
        .unwrap_or(module);
    Builtins { module, unknown }
}

/// The unknown-type placeholder of a table built by this frontend.
pub fn unknown_type(table: &SymbolTable) -> Option<SymbolId> {
    let module = table.child(SymbolId::ROOT, BUILTIN_MODULE)?;
    table.child(module, UNKNOWN_TYPE)
}

struct Collector<'t> {
    table: &'t mut SymbolTable,
    builtins: Builtins,
    file: FileId,
}

/// Where members of the current statement go.
#[derive(Clone, Copy)]
enum Owner {
    Module(SymbolId),
    Type(SymbolId),
    /// The enclosing type was rejected; its members are skipped.
    Rejected,
}

impl Owner {
    fn parent(self) -> Option<SymbolId> {
        match self {
            Owner::Module(id) | Owner::Type(id) => Some(id),
            Owner::Rejected => None,
        }
    }
}

impl Collector<'_> {
    fn site(&self, location: Location) -> Option<TokenSite> {
        Some(TokenSite::new(self.file, location))
    }

    /// Phase one: modules, types, and their type parameters.
    fn declare_types(&mut self, path: &str, tree: &DeclTree) -> Vec<Option<SymbolId>> {
        let mut current = module(self.table, default_module(path), None, Qualifiers::empty());
        let mut types = Vec::with_capacity(tree.decls.len());
        for decl in &tree.decls {
            let declared = match &decl.kind {
                DeclKind::Module => {
                    let site = self.site(decl.name.location);
                    current = module(self.table, &decl.name.text, site, Qualifiers::empty());
                    None
                }
                DeclKind::Type {
                    generics,
                    constraints,
                } => self.declare_type(current, decl, generics, constraints),
                DeclKind::Field { .. } | DeclKind::Function { .. } => None,
            };
            types.push(declared);
        }
        types
    }

    fn declare_type(
        &mut self,
        module: SymbolId,
        decl: &Decl,
        generics: &[Name],
        constraints: &[String],
    ) -> Option<SymbolId> {
        let mut symbol = Symbol::new(SymbolKind::Type, module, &decl.name.text)
            .with_qualifiers(qualifiers(decl.is_pub))
            .with_generic_params(generics.iter().map(|g| g.text.clone()))
            .with_comments(decl.comments.clone());
        symbol.site = self.site(decl.name.location);
        symbol.constraints = constraints.to_vec();
        let id = self.table.add_or_reject(symbol)?;
        for (index, generic) in generics.iter().enumerate() {
            let leaf = self.table.generic_param(index);
            let mut param = Symbol::new(SymbolKind::TypeParam, id, &generic.text).with_type(leaf);
            param.site = self.site(generic.location);
            self.table.add_or_reject(param);
        }
        trace!(name = self.table.full_name(id), "declared type");
        Some(id)
    }

    /// Phase two: fields and functions.
    fn declare_members(&mut self, path: &str, tree: &DeclTree, types: &[Option<SymbolId>]) {
        let mut module_id = module(self.table, default_module(path), None, Qualifiers::empty());
        let mut owner = Owner::Module(module_id);
        let mut generics: &[Name] = &[];
        for (decl, declared) in tree.decls.iter().zip(types) {
            match &decl.kind {
                DeclKind::Module => {
                    module_id = self
                        .table
                        .child(SymbolId::ROOT, &decl.name.text)
                        .unwrap_or(module_id);
                    owner = Owner::Module(module_id);
                    generics = &[];
                }
                DeclKind::Type { generics: g, .. } => {
                    owner = declared.map_or(Owner::Rejected, Owner::Type);
                    generics = g.as_slice();
                }
                DeclKind::Field { ty } => {
                    let Some(parent) = owner.parent() else {
                        continue;
                    };
                    let scope = Scope { module: module_id, generics };
                    let ty = self.resolve(&scope, ty);
                    let mut symbol = Symbol::new(SymbolKind::Field, parent, &decl.name.text)
                        .with_qualifiers(qualifiers(decl.is_pub))
                        .with_type(ty)
                        .with_comments(decl.comments.clone());
                    symbol.site = self.site(decl.name.location);
                    self.table.add_or_reject(symbol);
                }
                DeclKind::Function { .. } => {
                    let Some(parent) = owner.parent() else {
                        continue;
                    };
                    let scope = Scope { module: module_id, generics };
                    self.declare_function(parent, &scope, decl);
                }
            }
        }
    }

    fn declare_function(&mut self, parent: SymbolId, scope: &Scope<'_>, decl: &Decl) {
        let DeclKind::Function {
            params,
            returns,
            requires,
        } = &decl.kind
        else {
            return;
        };
        let site = self.site(decl.name.location);
        let param_types: Vec<SymbolId> =
            params.iter().map(|p| self.resolve(scope, &p.ty)).collect();
        let returns = match returns {
            None => Ok(self.table.tuple_root()),
            Some(expr @ TypeExpr::Tuple { .. }) => Ok(self.resolve(scope, expr)),
            Some(expr) => {
                let ty = self.resolve(scope, expr);
                self.table.create_tuple(&[ty], None)
            }
        };
        let lambda = returns.and_then(|returns| {
            let params = self.table.create_tuple(&param_types, None)?;
            self.table.create_lambda(params, returns)
        });
        let lambda = match lambda {
            Ok(lambda) => lambda,
            Err(error) => {
                self.table.reject(site, error.to_string());
                return;
            }
        };

        let mut symbol = Symbol::new(SymbolKind::Function, parent, &decl.name.text)
            .with_qualifiers(qualifiers(decl.is_pub))
            .with_type(lambda)
            .with_comments(decl.comments.clone());
        symbol.site = site;
        symbol.requires.clone_from(requires);
        let Some(func) = self.table.add_or_reject(symbol) else {
            return;
        };
        for (param, ty) in params.iter().zip(param_types) {
            let mut symbol = Symbol::new(SymbolKind::FunctionParam, func, &param.name.text)
                .with_type(ty);
            symbol.site = self.site(param.name.location);
            self.table.add_or_reject(symbol);
        }
    }

    /// Resolve a type reference; unresolvable references are rejected and
    /// resolve to the unknown placeholder.
    fn resolve(&mut self, scope: &Scope<'_>, expr: &TypeExpr) -> SymbolId {
        match expr {
            TypeExpr::Named {
                path,
                location,
                args,
            } => self.resolve_named(scope, path, *location, args),
            TypeExpr::Tuple { location, fields } => {
                let types: Vec<SymbolId> =
                    fields.iter().map(|f| self.resolve(scope, &f.ty)).collect();
                let labels: Option<Vec<TupleField>> =
                    fields.iter().any(|f| f.label.is_some()).then(|| {
                        fields
                            .iter()
                            .map(|f| match &f.label {
                                Some(label) => {
                                    TupleField::new(&label.text, self.site(label.location))
                                }
                                None => TupleField::new("", self.site(f.ty.location())),
                            })
                            .collect()
                    });
                match self.table.create_tuple(&types, labels.as_deref()) {
                    Ok(tuple) => tuple,
                    Err(error) => {
                        self.table.reject(self.site(*location), error.to_string());
                        self.builtins.unknown
                    }
                }
            }
        }
    }

    fn resolve_named(
        &mut self,
        scope: &Scope<'_>,
        path: &str,
        location: Location,
        args: &[TypeExpr],
    ) -> SymbolId {
        let site = self.site(location);
        if args.is_empty() {
            if let Some(index) = scope.generics.iter().position(|g| g.text == path) {
                return self.table.generic_param(index);
            }
        }
        let Some(base) = self.find_type(scope.module, path, args.len()) else {
            self.table.reject(site, format!("Unknown type `{path}`"));
            return self.builtins.unknown;
        };
        let declared = self.table.get(base).generic_params.len();
        if declared != args.len() {
            self.table.reject(
                site,
                format!(
                    "Type `{path}` takes {declared} type arguments but {} were given",
                    args.len()
                ),
            );
            return self.builtins.unknown;
        }
        if args.is_empty() {
            return base;
        }
        let args: Vec<SymbolId> = args.iter().map(|a| self.resolve(scope, a)).collect();
        match self.table.create_specialized_type(base, &args, None) {
            Ok(specialized) => specialized,
            Err(error) => {
                self.table.reject(site, error.to_string());
                self.builtins.unknown
            }
        }
    }

    /// Module-local types, then built-ins, then qualified full names.
    fn find_type(&self, module: SymbolId, path: &str, arity: usize) -> Option<SymbolId> {
        let is_type = |id: &SymbolId| self.table.get(*id).kind == SymbolKind::Type;
        if !path.contains('.') {
            return self
                .table
                .child(module, path)
                .filter(is_type)
                .or_else(|| {
                    self.table
                        .child(self.builtins.module, path)
                        .filter(|id| is_type(id) && self.table.get(*id).is_pub())
                });
        }
        let generic = format!("{path}`{arity}");
        self.table
            .lookup(path)
            .or_else(|| self.table.lookup(&generic))
            .filter(is_type)
    }
}

struct Scope<'a> {
    module: SymbolId,
    generics: &'a [Name],
}

/// Populate `table` from every unit.
#[tracing::instrument(level = "debug", skip_all, fields(units = units.len()))]
pub fn build_symbols(units: &[SourceUnit<DeclTree>], table: &mut SymbolTable) {
    let builtins = declare_builtins(table);
    let mut collector = Collector {
        table,
        builtins,
        file: FileId::new(0),
    };
    let mut declared = Vec::with_capacity(units.len());
    for unit in units {
        collector.file = unit.file;
        declared.push(collector.declare_types(&unit.path, &unit.tree));
    }
    collector.table.generate_lookup();
    for (unit, types) in units.iter().zip(&declared) {
        collector.file = unit.file;
        collector.declare_members(&unit.path, &unit.tree, types);
    }
}

/// Leaf types `ty` is built from: concrete types of specializations and
/// tuple or lambda members, never the tuple or lambda roots themselves.
fn exposed_types(table: &SymbolTable, ty: SymbolId, out: &mut Vec<SymbolId>) {
    let symbol = table.get(ty);
    if symbol.is_specialized() {
        if symbol.parent != table.tuple_root() && symbol.parent != table.lambda_root() {
            out.push(symbol.parent);
        }
        for &arg in &symbol.type_args {
            exposed_types(table, arg, out);
        }
    } else if symbol.kind == SymbolKind::Type
        && ty != table.tuple_root()
        && ty != table.lambda_root()
    {
        out.push(ty);
    }
}

/// Public fields and functions of modules and of public types must only
/// expose public types.
#[tracing::instrument(level = "debug", skip_all)]
pub fn verify_header(table: &mut SymbolTable) {
    let unknown = unknown_type(table);
    let mut violations = Vec::new();
    for (_, symbol) in table.symbols() {
        if !symbol.is_pub() || !matches!(symbol.kind, SymbolKind::Field | SymbolKind::Function) {
            continue;
        }
        let owner = table.get(symbol.parent);
        let exported = match owner.kind {
            SymbolKind::Module => !owner.qualifiers.contains(Qualifiers::EXTERN),
            SymbolKind::Type => owner.is_pub(),
            _ => false,
        };
        let Some(ty) = symbol.type_ref.filter(|_| exported) else {
            continue;
        };
        let mut leaves = Vec::new();
        exposed_types(table, ty, &mut leaves);
        let mut reported = FxHashSet::default();
        for leaf in leaves {
            let leaf_symbol = table.get(leaf);
            if leaf_symbol.is_pub() || Some(leaf) == unknown || !reported.insert(leaf) {
                continue;
            }
            violations.push((
                symbol.site,
                format!(
                    "Public `{}` exposes non-public type `{}`",
                    symbol.full_name(),
                    leaf_symbol.full_name()
                ),
            ));
        }
    }
    for (site, message) in violations {
        table.reject(site, message);
    }
}

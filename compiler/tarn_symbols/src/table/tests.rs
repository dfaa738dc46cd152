use super::*;
use crate::symbol::{FileId, Qualifiers};
use pretty_assertions::assert_eq;
use tarn_lexer::Location;

fn site(line: u32, column: u32) -> TokenSite {
    TokenSite::new(FileId::new(0), Location::new(line, column))
}

fn module(table: &mut SymbolTable, name: &str) -> SymbolId {
    table
        .add_or_reject(Symbol::new(SymbolKind::Module, SymbolId::ROOT, name))
        .unwrap()
}

fn ty(table: &mut SymbolTable, parent: SymbolId, name: &str) -> SymbolId {
    table
        .add_or_reject(Symbol::new(SymbolKind::Type, parent, name))
        .unwrap()
}

/// `fun name(params..)` under `parent`, returning nothing.
fn function(
    table: &mut SymbolTable,
    parent: SymbolId,
    name: &str,
    params: &[SymbolId],
    at: TokenSite,
) -> Option<SymbolId> {
    let params = table.create_tuple(params, None).unwrap();
    let lambda = table.create_lambda(params, table.tuple_root()).unwrap();
    table.add_or_reject(
        Symbol::new(SymbolKind::Function, parent, name)
            .with_type(lambda)
            .with_site(at),
    )
}

#[test]
fn new_table_has_roots() {
    let table = SymbolTable::new();
    assert_eq!(table.full_name(table.root()), "");
    assert_eq!(table.full_name(table.tuple_root()), "()");
    assert_eq!(table.full_name(table.lambda_root()), "$lambda");
    assert_eq!(table.len(), 3);
    assert_eq!(table.error_count(), 0);
}

#[test]
fn full_names_follow_nesting() {
    let mut table = SymbolTable::new();
    let geo = module(&mut table, "geo");
    let pair = table
        .add_or_reject(
            Symbol::new(SymbolKind::Type, geo, "Pair").with_generic_params(["A", "B"]),
        )
        .unwrap();
    let point = ty(&mut table, geo, "Point");
    let int = ty(&mut table, geo, "int");
    let x = table
        .add_or_reject(Symbol::new(SymbolKind::Field, point, "x").with_type(int))
        .unwrap();

    assert_eq!(table.full_name(geo), "geo");
    assert_eq!(table.full_name(pair), "geo.Pair`2");
    assert_eq!(table.full_name(x), "geo.Point.x");
    assert_eq!(table.get(x).type_ref, Some(int));
}

#[test]
fn duplicate_type_is_rejected_on_both_sites() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "m");
    let first = table
        .add_or_reject(Symbol::new(SymbolKind::Type, m, "Foo").with_site(site(0, 5)))
        .unwrap();
    let second = table.add_or_reject(Symbol::new(SymbolKind::Type, m, "Foo").with_site(site(3, 5)));

    assert!(second.is_none());
    assert_eq!(table.child(m, "Foo"), Some(first));
    let expected = [Annotation::CompileError("Duplicate symbol `m.Foo`".into())];
    assert_eq!(table.annotations_at(site(0, 5)), &expected);
    assert_eq!(table.annotations_at(site(3, 5)), &expected);
    assert_eq!(table.error_count(), 2);
}

#[test]
fn functions_overload_on_parameter_types() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "m");
    let int = ty(&mut table, m, "int");
    let str_ = ty(&mut table, m, "str");

    let by_int = function(&mut table, m, "f", &[int], site(1, 4));
    let by_str = function(&mut table, m, "f", &[str_], site(2, 4));
    assert!(by_int.is_some());
    assert!(by_str.is_some());
    assert_eq!(table.get(m).children()["f"].len(), 2);
    assert_eq!(table.full_name(by_int.unwrap()), "m.f(m.int)");

    let again = function(&mut table, m, "f", &[int], site(3, 4));
    assert!(again.is_none());
    assert!(table.annotations_at(site(1, 4))[0].is_error());
    assert!(table.annotations_at(site(3, 4))[0].is_error());
    assert!(table.annotations_at(site(2, 4)).is_empty());
}

#[test]
fn function_collides_with_field_of_same_name() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "m");
    table
        .add_or_reject(Symbol::new(SymbolKind::Field, m, "g").with_site(site(0, 0)))
        .unwrap();
    assert!(function(&mut table, m, "g", &[], site(1, 0)).is_none());
    assert_eq!(table.error_count(), 2);
}

#[test]
fn reject_never_double_stamps() {
    let mut table = SymbolTable::new();
    assert!(table.reject(Some(site(0, 0)), "first"));
    assert!(!table.reject(Some(site(0, 0)), "second"));
    assert!(table.warn(Some(site(0, 0)), "still allowed"));
    assert_eq!(
        table.annotations_at(site(0, 0)),
        &[
            Annotation::CompileError("first".into()),
            Annotation::Warning("still allowed".into()),
        ]
    );
    assert_eq!(table.error_count(), 1);
    assert_eq!(table.warning_count(), 1);
}

#[test]
fn no_compiler_checks_downgrades_to_warnings() {
    let mut table = SymbolTable::new();
    table.set_no_compiler_checks(true);
    let m = module(&mut table, "m");
    table
        .add_or_reject(Symbol::new(SymbolKind::Type, m, "T").with_site(site(0, 0)))
        .unwrap();
    assert!(table
        .add_or_reject(Symbol::new(SymbolKind::Type, m, "T").with_site(site(1, 0)))
        .is_none());
    assert_eq!(table.error_count(), 0);
    assert_eq!(table.warning_count(), 2);
    assert!(matches!(
        table.annotations_at(site(1, 0)),
        [Annotation::Warning(_)]
    ));
}

#[test]
fn reject_without_site_is_counted() {
    let mut table = SymbolTable::new();
    assert!(table.reject(None, "builtin problem"));
    assert_eq!(table.error_count(), 1);
    assert_eq!(table.diagnostics().count(), 0);
}

#[test]
fn lookup_is_two_phase_and_skips_scoped_symbols() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "m");
    let t = ty(&mut table, m, "T");
    assert_eq!(table.lookup("m.T"), None);

    table.generate_lookup();
    assert_eq!(table.lookup("m.T"), Some(t));
    assert_eq!(table.lookup("m"), Some(m));

    let f = function(&mut table, m, "f", &[t], site(0, 0)).unwrap();
    let p = table
        .add_or_reject(Symbol::new(SymbolKind::FunctionParam, f, "p").with_type(t))
        .unwrap();
    // Stale until rebuilt.
    assert_eq!(table.lookup("m.f(m.T)"), None);
    table.generate_lookup();
    assert_eq!(table.lookup("m.f(m.T)"), Some(f));
    assert_eq!(table.lookup(table.full_name(p)), None);
}

#[test]
fn finalize_full_name_updates_descendants() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "old");
    let t = ty(&mut table, m, "T");
    let field = table
        .add_or_reject(Symbol::new(SymbolKind::Field, t, "x"))
        .unwrap();

    table.get_mut(m).name = "new".to_string();
    assert_eq!(table.full_name(field), "old.T.x");
    table.finalize_full_name(m);
    assert_eq!(table.full_name(m), "new");
    assert_eq!(table.full_name(t), "new.T");
    assert_eq!(table.full_name(field), "new.T.x");
}

#[test]
fn ordinals_count_siblings() {
    let mut table = SymbolTable::new();
    let m = module(&mut table, "m");
    let a = ty(&mut table, m, "B");
    let b = ty(&mut table, m, "A");
    assert_eq!(table.get(a).ordinal(), 0);
    assert_eq!(table.get(b).ordinal(), 1);
    assert!(table
        .get(m)
        .child_ids()
        .all(|id| table.get(id).qualifiers == Qualifiers::empty()));
}

use crate::symbol::{FileId, TokenSite};
use crate::{Symbol, SymbolError, SymbolId, SymbolKind, SymbolTable, TupleField};
use pretty_assertions::assert_eq;
use tarn_lexer::{Annotation, Location};

struct Fixture {
    table: SymbolTable,
    module: SymbolId,
    int: SymbolId,
    str_: SymbolId,
    /// `m.Pair[A, B]` with field `first A`.
    pair: SymbolId,
    first: SymbolId,
}

fn fixture() -> Fixture {
    let mut table = SymbolTable::new();
    let module = table
        .add_or_reject(Symbol::new(SymbolKind::Module, SymbolId::ROOT, "m"))
        .unwrap();
    let int = table
        .add_or_reject(Symbol::new(SymbolKind::Type, SymbolId::ROOT, "int"))
        .unwrap();
    let str_ = table
        .add_or_reject(Symbol::new(SymbolKind::Type, SymbolId::ROOT, "str"))
        .unwrap();
    let pair = table
        .add_or_reject(
            Symbol::new(SymbolKind::Type, module, "Pair").with_generic_params(["A", "B"]),
        )
        .unwrap();
    let a = table.generic_param(0);
    let first = table
        .add_or_reject(Symbol::new(SymbolKind::Field, pair, "first").with_type(a))
        .unwrap();
    Fixture {
        table,
        module,
        int,
        str_,
        pair,
        first,
    }
}

fn labels(names: &[&str]) -> Vec<TupleField> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| {
            let site = TokenSite::new(FileId::new(1), Location::new(0, 4 * i as u32));
            TupleField::new(*n, Some(site))
        })
        .collect()
}

#[test]
fn specialization_is_memoized() {
    let Fixture {
        mut table,
        pair,
        int,
        str_,
        ..
    } = fixture();
    let once = table.create_specialized_type(pair, &[int, str_], None).unwrap();
    let twice = table.create_specialized_type(pair, &[int, str_], None).unwrap();
    assert_eq!(once, twice);
    assert_eq!(table.full_name(once), "m.Pair<int,str>");
    assert_eq!(table.get(once).parent, pair);

    let other = table.create_specialized_type(pair, &[str_, int], None).unwrap();
    assert_ne!(once, other);
}

#[test]
fn empty_arguments_return_the_concrete_symbol() {
    let Fixture {
        mut table, pair, ..
    } = fixture();
    assert_eq!(table.create_specialized_type(pair, &[], None), Ok(pair));
    assert_eq!(table.create_tuple(&[], None), Ok(table.tuple_root()));
}

#[test]
fn unnamed_tuples_are_shared_named_tuples_are_not() {
    let Fixture {
        mut table,
        int,
        str_,
        ..
    } = fixture();
    let plain = table.create_tuple(&[int, str_], None).unwrap();
    assert_eq!(table.create_tuple(&[int, str_], None), Ok(plain));
    assert_eq!(table.full_name(plain), "(int,str)");

    let ab = table
        .create_tuple(&[int, str_], Some(&labels(&["a", "b"])))
        .unwrap();
    let xy = table
        .create_tuple(&[int, str_], Some(&labels(&["x", "y"])))
        .unwrap();
    assert_ne!(ab, xy);
    assert_ne!(ab, plain);
    assert_eq!(table.full_name(ab), "(a int,b str)");
    assert_eq!(table.full_name(xy), "(x int,y str)");

    // Even identical labels produce a fresh instance.
    let ab_again = table
        .create_tuple(&[int, str_], Some(&labels(&["a", "b"])))
        .unwrap();
    assert_ne!(ab, ab_again);

    // Labels become tuple parameters.
    let a = table.child(ab, "a").unwrap();
    assert_eq!(table.get(a).kind, SymbolKind::TupleParam);
    assert_eq!(table.get(a).type_ref, Some(int));
}

#[test]
fn empty_labels_keep_the_tuple_unnamed() {
    let Fixture {
        mut table,
        int,
        str_,
        ..
    } = fixture();
    let plain = table.create_tuple(&[int, str_], None).unwrap();
    let blank = table
        .create_tuple(&[int, str_], Some(&labels(&["", ""])))
        .unwrap();
    assert_eq!(plain, blank);
}

#[test]
fn duplicate_tuple_labels_are_diagnosed() {
    let Fixture {
        mut table,
        int,
        str_,
        ..
    } = fixture();
    let fields = labels(&["a", "a"]);
    let tuple = table
        .create_tuple(&[int, str_], Some(&fields))
        .unwrap();
    assert_eq!(table.full_name(tuple), "(a int,a str)");
    assert!(table.annotations_at(fields[0].site.unwrap()).is_empty());
    assert_eq!(
        table.annotations_at(fields[1].site.unwrap()),
        &[Annotation::CompileError("Duplicate tuple field name `a`".into())]
    );
}

#[test]
fn precondition_violations() {
    let Fixture {
        mut table,
        module,
        pair,
        int,
        str_,
        ..
    } = fixture();
    let special = table.create_specialized_type(pair, &[int, str_], None).unwrap();
    assert_eq!(
        table.create_specialized_type(special, &[int], None),
        Err(SymbolError::AlreadySpecialized("m.Pair<int,str>".into()))
    );
    assert_eq!(
        table.create_specialized_type(module, &[int], None),
        Err(SymbolError::NotSpecializable {
            kind: SymbolKind::Module,
            name: "m".into()
        })
    );
    assert_eq!(
        table.create_tuple(&[int, str_], Some(&labels(&["a"]))),
        Err(SymbolError::TupleNameCount {
            expected: 2,
            found: 1
        })
    );
    assert_eq!(
        table.create_lambda(int, table.tuple_root()),
        Err(SymbolError::NotATuple("int".into()))
    );
}

#[test]
fn lambda_type_is_its_tuple() {
    let Fixture {
        mut table,
        int,
        str_,
        ..
    } = fixture();
    let params = table.create_tuple(&[int, str_], None).unwrap();
    let returns = table.create_tuple(&[int], None).unwrap();
    let lambda = table.create_lambda(params, returns).unwrap();
    let pair = table.create_tuple(&[params, returns], None).unwrap();

    assert_eq!(table.get(lambda).type_ref, Some(pair));
    assert_eq!(table.get(lambda).parent, table.lambda_root());
    assert_eq!(table.full_name(pair), "((int,str),(int))");
    assert_eq!(table.create_lambda(params, returns), Ok(lambda));
}

#[test]
fn function_signature_and_name_come_from_lambda() {
    let Fixture {
        mut table,
        module,
        int,
        str_,
        ..
    } = fixture();
    let params = table.create_tuple(&[int, str_], None).unwrap();
    let returns = table.create_tuple(&[str_], None).unwrap();
    let lambda = table.create_lambda(params, returns).unwrap();
    let f = table
        .add_or_reject(Symbol::new(SymbolKind::Function, module, "f").with_type(lambda))
        .unwrap();
    assert_eq!(table.full_name(f), "m.f(int,str)");
    assert_eq!(table.function_signature(f).as_slice(), &[int, str_]);
    assert_eq!(table.function_returns(f), Some(returns));

    // Functions without a lambda type have an empty signature.
    let g = table
        .add_or_reject(Symbol::new(SymbolKind::Function, module, "g"))
        .unwrap();
    assert_eq!(table.full_name(g), "m.g()");
    assert!(table.function_signature(g).is_empty());
}

#[test]
fn replacing_generic_params() {
    let Fixture {
        mut table,
        int,
        str_,
        pair,
        first,
        ..
    } = fixture();
    let a = table.generic_param(0);
    let b = table.generic_param(1);

    // Non-generic types come back unchanged.
    assert_eq!(table.replace_generic_type_params(int, &[str_]), Ok(int));
    let ints = table.create_tuple(&[int, int], None).unwrap();
    assert_eq!(table.replace_generic_type_params(ints, &[str_]), Ok(ints));

    // Leaves are replaced positionally; missing arguments leave the leaf.
    assert_eq!(table.replace_generic_type_params(a, &[int]), Ok(int));
    assert_eq!(table.replace_generic_type_params(b, &[int]), Ok(b));

    let generic = table.create_tuple(&[a, b], None).unwrap();
    let concrete = table.replace_generic_type_params(generic, &[int, str_]).unwrap();
    assert_eq!(Ok(concrete), table.create_tuple(&[int, str_], None));

    // Specializing a field re-specializes its type.
    let first_int = table.create_specialized_type(first, &[int, str_], None).unwrap();
    assert_eq!(table.get(first_int).type_ref, Some(int));
    assert_eq!(table.full_name(first_int), "m.Pair`2.first<int,str>");

    // Nested: Pair<#1,#0> becomes Pair<str,int>.
    let swapped = table.create_specialized_type(pair, &[b, a], None).unwrap();
    let applied = table.replace_generic_type_params(swapped, &[int, str_]).unwrap();
    assert_eq!(Ok(applied), table.create_specialized_type(pair, &[str_, int], None));
}

#[test]
fn generic_params_and_constructors() {
    let mut table = SymbolTable::new();
    let second = table.generic_param(1);
    let first = table.generic_param(0);
    assert_eq!(table.full_name(first), "#0");
    assert_eq!(table.full_name(second), "#1");
    assert_eq!(table.generic_param(1), second);
    assert_eq!(table.generic_param_index(second), Some(1));
    assert_eq!(table.generic_param_index(table.tuple_root()), None);

    let ctor = table.generic_param_constructor(0).unwrap();
    assert_eq!(table.generic_param_constructor(0), Ok(ctor));
    assert_eq!(table.full_name(ctor), "#0.new()");
    assert!(table.function_signature(ctor).is_empty());
    let returns = table.function_returns(ctor).unwrap();
    assert_eq!(table.full_name(returns), "(#0)");
}

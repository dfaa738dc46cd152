use super::*;
use crate::Symbol;
use pretty_assertions::assert_eq;

fn build() -> SymbolTable {
    let mut table = SymbolTable::new();
    let builtin = table
        .add_or_reject(
            Symbol::new(SymbolKind::Module, SymbolId::ROOT, "builtin")
                .with_qualifiers(Qualifiers::EXTERN),
        )
        .unwrap();
    let int = table
        .add_or_reject(
            Symbol::new(SymbolKind::Type, builtin, "int").with_qualifiers(Qualifiers::PUB),
        )
        .unwrap();

    let geo = table
        .add_or_reject(Symbol::new(SymbolKind::Module, SymbolId::ROOT, "geo"))
        .unwrap();
    let point = table
        .add_or_reject(
            Symbol::new(SymbolKind::Type, geo, "Point")
                .with_qualifiers(Qualifiers::PUB)
                .with_comments(vec!["A point.".into(), "In 2D.".into()]),
        )
        .unwrap();
    table
        .add_or_reject(
            Symbol::new(SymbolKind::Field, point, "x")
                .with_qualifiers(Qualifiers::PUB)
                .with_type(int),
        )
        .unwrap();
    table
        .add_or_reject(Symbol::new(SymbolKind::Field, point, "hidden").with_type(int))
        .unwrap();
    table
        .add_or_reject(Symbol::new(SymbolKind::Type, geo, "Private"))
        .unwrap();

    let params = table.create_tuple(&[int], None).unwrap();
    let lambda = table.create_lambda(params, params).unwrap();
    let f = table
        .add_or_reject(
            Symbol::new(SymbolKind::Function, geo, "twice")
                .with_qualifiers(Qualifiers::PUB)
                .with_type(lambda),
        )
        .unwrap();
    table.get_mut(f).requires = Some("n ok".into());
    table
        .add_or_reject(Symbol::new(SymbolKind::FunctionParam, f, "n").with_type(int))
        .unwrap();

    // A module with nothing public is left out.
    let empty = table
        .add_or_reject(Symbol::new(SymbolKind::Module, SymbolId::ROOT, "quiet"))
        .unwrap();
    table
        .add_or_reject(Symbol::new(SymbolKind::Type, empty, "Q"))
        .unwrap();
    table
}

#[test]
fn header_lists_public_symbols_in_declaration_order() {
    let table = build();
    let header = table.header_symbols();
    assert_eq!(header.len(), 1);
    let geo = &header[0];
    assert_eq!(geo.name, "geo");
    assert_eq!(geo.tags, vec!["module"]);

    let names: Vec<&str> = geo.symbols.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["geo.Point", "geo.twice(builtin.int)"]);

    let point = &geo.symbols[0];
    assert_eq!(point.tags, vec!["type", "pub"]);
    assert_eq!(point.comments, "A point.\nIn 2D.");
    assert_eq!(point.symbols.len(), 1);
    assert_eq!(point.symbols[0].type_name, "builtin.int");

    let twice = &geo.symbols[1];
    assert_eq!(twice.type_name, "(builtin.int)");
    assert_eq!(twice.requires, "n ok");
    assert_eq!(twice.symbols[0].name, "geo.twice(builtin.int).n");
}

#[test]
fn header_serializes_type_key_and_skips_empty_fields() {
    let table = build();
    let json = serde_json::to_value(table.header_symbols()).unwrap();
    let point = &json[0]["symbols"][0];
    assert_eq!(point["symbols"][0]["type"], "builtin.int");
    assert!(point.get("requires").is_none());
    assert!(point.get("constraints").is_none());

    let back: Vec<HeaderSymbol> = serde_json::from_value(json).unwrap();
    assert_eq!(back, table.header_symbols());
}

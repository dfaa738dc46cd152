use super::*;

fn ident(name: &str) -> Token {
    Token::new(name, Location::new(0, 0), TokenKind::Identifier)
}

#[test]
fn lexer_owned_flags_are_not_writable() {
    let mut token = ident("x");
    token.set_line_flags(TokenFlags::BEGIN_OF_LINE);

    token.set_flags(TokenFlags::END_OF_LINE | TokenFlags::BOLD);
    assert!(token.has_flag(TokenFlags::BOLD));
    assert!(!token.has_flag(TokenFlags::END_OF_LINE));

    token.clear_flags(TokenFlags::all());
    assert!(token.has_flag(TokenFlags::BEGIN_OF_LINE));
    assert!(!token.has_flag(TokenFlags::BOLD));
}

#[test]
fn first_error_wins() {
    let mut token = ident("x");
    assert!(token.add_annotation(Annotation::ParseError("expected type".into())));
    assert!(!token.add_annotation(Annotation::CompileError("duplicate".into())));
    assert_eq!(token.annotations().len(), 1);
    assert_eq!(token.subtype, TokenSubtype::Error);
}

#[test]
fn warnings_and_links_stack() {
    let mut token = ident("x");
    assert!(token.add_annotation(Annotation::Warning("unused".into())));
    assert_eq!(token.subtype, TokenSubtype::Warning);
    assert!(token.add_annotation(Annotation::Url("https://example.com".into())));
    assert!(token.add_annotation(Annotation::VerifyError("bad".into())));
    assert_eq!(token.subtype, TokenSubtype::Error);
    assert_eq!(token.annotations().len(), 3);

    token.clear_annotations();
    assert!(token.annotations().is_empty());
    assert_eq!(token.subtype, TokenSubtype::Normal);
}

#[test]
fn stripped_keeps_position_and_line_flags_only() {
    let mut token = ident("name");
    token.set_line_flags(TokenFlags::BEGIN_OF_LINE | TokenFlags::END_OF_LINE);
    token.set_flags(TokenFlags::GRAYED);
    token.add_annotation(Annotation::CompileError("oops".into()));

    let copy = token.stripped();
    assert_eq!(copy.name(), "name");
    assert_eq!(copy.kind, TokenKind::Identifier);
    assert_eq!(
        copy.flags(),
        TokenFlags::BEGIN_OF_LINE | TokenFlags::END_OF_LINE
    );
    assert!(copy.annotations().is_empty());
    assert_eq!(copy.subtype, TokenSubtype::Normal);
}

#[test]
fn end_and_meta_tokens() {
    let end = Token::end(Location::new(3, 7));
    assert!(end.is_end());
    assert_eq!(end.end_column(), 7);

    let meta = Token::meta(";", Location::new(1, 4));
    assert!(meta.has_flag(TokenFlags::META));
    assert!(!meta.is_end());
}

#[test]
fn location_ordering_is_line_major() {
    assert!(Location::new(0, 99) < Location::new(1, 0));
    assert!(Location::new(2, 3) < Location::new(2, 4));
    assert_eq!(Location::new(0, 0).to_string(), "1:1");
}

// tests/parser_tests.rs

use std::sync::OnceLock;

use dhall_syntax::ast::{
    Builtin, Constant, Expression, File, FilePrefix, ImportMode, ImportType, NonEmpty, Operator,
    Scheme, TextLiteral,
};
use dhall_syntax::{AstError, ParseError, ParseOptions, Parser, SourceContext};

// The standard grammar is loaded once and shared by every test.
fn parser() -> &'static Parser {
    static PARSER: OnceLock<Parser> = OnceLock::new();
    PARSER.get_or_init(|| Parser::standard().expect("standard grammar loads"))
}

fn parse(input: &str) -> Expression {
    match parser().parse(input) {
        Ok(expr) => expr,
        Err(e) => panic!("failed to parse {:?}: {:?}", input, miette::Report::new(e)),
    }
}

fn var(name: &str) -> Expression {
    Expression::var(name, 0)
}

fn builtin(name: &str) -> Expression {
    Expression::Builtin(Builtin::from_name(name).unwrap())
}

fn record(fields: Vec<(&str, Expression)>) -> Expression {
    Expression::RecordLiteral(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

// ---
// Binders and de Bruijn indices
// ---

#[test]
fn test_inner_binder_shadows_outer() {
    let natural = builtin("Natural");
    assert_eq!(
        parse("λ(x : Natural) → λ(x : Natural) → x"),
        Expression::lambda(
            "x",
            natural.clone(),
            Expression::lambda("x", natural, Expression::var("x", 0))
        )
    );
}

#[test]
fn test_lambda_body_refers_to_its_binder() {
    assert_eq!(
        parse("λ(x : T) → x"),
        Expression::lambda("x", var("T"), var("x"))
    );
}

#[test]
fn test_explicit_index_is_kept() {
    assert_eq!(
        parse(r"\(x : Natural) -> \(x : Natural) -> x@1"),
        Expression::lambda(
            "x",
            builtin("Natural"),
            Expression::lambda("x", builtin("Natural"), Expression::var("x", 1))
        )
    );
}

#[test]
fn test_arrow_binds_an_anonymous_variable() {
    assert_eq!(
        parse("∀(a : Type) → a → a"),
        Expression::forall(
            "a",
            Expression::Constant(Constant::Type),
            Expression::forall("_", var("a"), var("a"))
        )
    );
}

#[test]
fn test_let_bindings_nest_to_the_right() {
    let expected = Expression::Let(
        "x".to_string(),
        None,
        Box::new(Expression::natural(1)),
        Box::new(Expression::Let(
            "y".to_string(),
            Some(Box::new(builtin("Natural"))),
            Box::new(var("x")),
            Box::new(var("y")),
        )),
    );
    assert_eq!(parse("let x = 1 let y : Natural = x in y"), expected);
}

#[test]
fn test_free_variables_can_be_rejected() {
    let strict = Parser::standard().unwrap().with_options(ParseOptions {
        reject_free_variables: true,
        ..ParseOptions::default()
    });
    assert!(strict.parse("λ(x : Natural) → x").is_ok());
    assert!(strict.parse("λ(x : Natural) → λ(x : Natural) → x@1").is_ok());
    let err = strict.parse("λ(x : Natural) → x@1").unwrap_err();
    assert!(matches!(
        err,
        ParseError::Ast(AstError::UnboundVariable { ref name, index: 1, .. }) if name == "x"
    ));
    // Lenient by default.
    assert_eq!(parse("y"), var("y"));
}

#[test]
fn test_binder_scope_ends_with_its_body() {
    let strict = Parser::standard().unwrap().with_options(ParseOptions {
        reject_free_variables: true,
        ..ParseOptions::default()
    });
    assert!(strict.parse("[λ(x : Bool) → x, x]").is_err());
}

// ---
// Operators and application
// ---

#[test]
fn test_operators_fold_left() {
    let one_plus_two = Expression::op(Expression::natural(1), Operator::Plus, Expression::natural(2));
    assert_eq!(
        parse("1 + 2 + 3"),
        Expression::op(one_plus_two, Operator::Plus, Expression::natural(3))
    );
}

#[test]
fn test_operator_precedence() {
    assert_eq!(
        parse("1 + 2 * 3"),
        Expression::op(
            Expression::natural(1),
            Operator::Plus,
            Expression::op(Expression::natural(2), Operator::Times, Expression::natural(3))
        )
    );
    assert_eq!(
        parse("a || b && c"),
        Expression::op(
            var("a"),
            Operator::Or,
            Expression::op(var("b"), Operator::And, var("c"))
        )
    );
}

#[test]
fn test_application_folds_left() {
    assert_eq!(
        parse("f a b"),
        Expression::app(Expression::app(var("f"), var("a")), var("b"))
    );
    assert_eq!(
        parse("Natural/even 2"),
        Expression::app(builtin("Natural/even"), Expression::natural(2))
    );
}

#[test]
fn test_keywords_are_not_variables() {
    assert!(parser().parse("let if = 1 in if").is_err());
    assert_eq!(parse("iffy"), var("iffy"));
    assert_eq!(parse("`if`"), var("if"));
}

// ---
// Literals
// ---

#[test]
fn test_numeric_literals() {
    assert_eq!(parse("0x2A"), Expression::natural(42));
    assert_eq!(parse("-5"), Expression::IntegerLiteral(-5));
    assert_eq!(parse("+5"), Expression::IntegerLiteral(5));
    assert!(matches!(parse("1.5e3"), Expression::DoubleLiteral(d) if d.0 == 1500.0));
    assert!(matches!(parse("-Infinity"), Expression::DoubleLiteral(d) if d.0 == f64::NEG_INFINITY));
}

#[test]
fn test_natural_overflow_is_reported() {
    let err = parser().parse("18446744073709551616").unwrap_err();
    assert!(matches!(
        err,
        ParseError::Ast(AstError::NumericOverflow { kind: "Natural", .. })
    ));
}

#[test]
fn test_double_quoted_interpolation() {
    let expected = Expression::TextLiteral(TextLiteral {
        chunks: vec![("foo".to_string(), var("x")), ("bar".to_string(), var("y"))],
        trailing: "baz".to_string(),
    });
    assert_eq!(parse(r#""foo${x}bar${y}baz""#), expected);
}

#[test]
fn test_double_quoted_escapes() {
    assert_eq!(parse(r#""a\nbé\"\$""#), Expression::text("a\nbé\"$"));
}

#[test]
fn test_unicode_escapes_must_be_scalar_values() {
    assert_eq!(parse(r#""\u0041\u{1F600}\u{000041}""#), Expression::text("A\u{1F600}A"));
    for source in [r#""\uD800""#, r#""\u{DFFF}""#, r#""\u{110000}""#, r#""\uFFFF""#] {
        match parser().parse(source) {
            Err(ParseError::Syntax(_)) => {}
            other => panic!("expected a syntax error for {}, got {:?}", source, other),
        }
    }
}

#[test]
fn test_single_quoted_text_is_dedented() {
    let source = "''\n    foo\n      bar\n    ''";
    assert_eq!(parse(source), Expression::text("foo\n  bar\n"));
}

#[test]
fn test_single_quoted_escapes_and_crlf() {
    assert_eq!(parse("''\r\nx '''y ''${z}''"), Expression::text("x ''y ${z}"));
}

#[test]
fn test_single_quoted_interpolation() {
    let expected = Expression::TextLiteral(TextLiteral {
        chunks: vec![("a ".to_string(), var("b"))],
        trailing: "\n".to_string(),
    });
    assert_eq!(parse("''\n  a ${b}\n  ''"), expected);
}

// ---
// Records, unions and lists
// ---

#[test]
fn test_record_fields_keep_written_order() {
    assert_eq!(
        parse(r#"{ b = 1, a = "x" }"#),
        record(vec![("b", Expression::natural(1)), ("a", Expression::text("x"))])
    );
    assert_eq!(parse("{=}"), Expression::RecordLiteral(Vec::new()));
    assert_eq!(parse("{}"), Expression::RecordType(Vec::new()));
}

#[test]
fn test_record_sugar() {
    assert_eq!(
        parse("{ a.b.c = 1 }"),
        record(vec![(
            "a",
            record(vec![("b", record(vec![("c", Expression::natural(1))]))])
        )])
    );
    assert_eq!(parse("{ x, y = 2 }"), record(vec![("x", var("x")), ("y", Expression::natural(2))]));
}

#[test]
fn test_keywords_cannot_be_punned() {
    assert_eq!(parse("{ Some = 1 }"), record(vec![("Some", Expression::natural(1))]));
    assert!(matches!(parser().parse("{ Some }"), Err(ParseError::Syntax(_))));
    assert!(matches!(parser().parse("{ if }"), Err(ParseError::Syntax(_))));
}

#[test]
fn test_record_types_and_unions() {
    assert_eq!(
        parse("{ name : Text, age : Natural }"),
        Expression::RecordType(vec![
            ("name".to_string(), builtin("Text")),
            ("age".to_string(), builtin("Natural")),
        ])
    );
    assert_eq!(
        parse("< Left : Natural | Right >"),
        Expression::UnionType(vec![
            ("Left".to_string(), Some(builtin("Natural"))),
            ("Right".to_string(), None),
        ])
    );
}

#[test]
fn test_lists() {
    assert_eq!(
        parse("[1, 2]"),
        Expression::NonEmptyList(Box::new(NonEmpty {
            head: Expression::natural(1),
            tail: vec![Expression::natural(2)],
        }))
    );
    assert_eq!(
        parse("[] : List Natural"),
        Expression::EmptyList(Box::new(Expression::app(builtin("List"), builtin("Natural"))))
    );
}

#[test]
fn test_selectors_and_projections() {
    assert_eq!(
        parse("r.a.{ b, c }"),
        Expression::ProjectByLabels(
            Box::new(Expression::Field(Box::new(var("r")), "a".to_string())),
            vec!["b".to_string(), "c".to_string()]
        )
    );
    assert_eq!(
        parse("T::{ x = 1 }"),
        Expression::Completion(Box::new(var("T")), Box::new(record(vec![("x", Expression::natural(1))])))
    );
}

#[test]
fn test_with_updates_nested_fields() {
    let expected = Expression::With(
        Box::new(var("r")),
        NonEmpty {
            head: "a".to_string(),
            tail: vec!["b".to_string()],
        },
        Box::new(Expression::natural(1)),
    );
    assert_eq!(parse("r with a.b = 1"), expected);
}

// ---
// Keyword forms
// ---

#[test]
fn test_merge_annotation_stays_in_the_node() {
    assert_eq!(
        parse("merge h u : Bool"),
        Expression::Merge(Box::new(var("h")), Box::new(var("u")), Some(Box::new(builtin("Bool"))))
    );
    assert_eq!(
        parse("(merge h u) : Bool"),
        Expression::Annotation(
            Box::new(Expression::Merge(Box::new(var("h")), Box::new(var("u")), None)),
            Box::new(builtin("Bool"))
        )
    );
}

#[test]
fn test_if_some_and_assert() {
    assert_eq!(
        parse("if True then Some 1 else None Natural"),
        Expression::If(
            Box::new(builtin("True")),
            Box::new(Expression::Some(Box::new(Expression::natural(1)))),
            Box::new(Expression::app(builtin("None"), builtin("Natural")))
        )
    );
    assert_eq!(
        parse("assert : 1 === 1"),
        Expression::Assert(Box::new(Expression::op(
            Expression::natural(1),
            Operator::Equivalent,
            Expression::natural(1)
        )))
    );
}

// ---
// Imports
// ---

fn import_type(expr: Expression) -> (ImportType, ImportMode) {
    match expr {
        Expression::Import(import) => (import.import_type, import.mode),
        other => panic!("expected an import, got {:?}", other),
    }
}

#[test]
fn test_local_imports() {
    let (ty, mode) = import_type(parse("./foo/bar.dhall"));
    assert_eq!(
        ty,
        ImportType::Local(FilePrefix::Here, File::from_components(vec!["foo".into(), "bar.dhall".into()]))
    );
    assert_eq!(mode, ImportMode::Code);

    let (ty, _) = import_type(parse(r#"~/"my dir"/x"#));
    assert_eq!(
        ty,
        ImportType::Local(FilePrefix::Home, File::from_components(vec!["my dir".into(), "x".into()]))
    );
}

#[test]
fn test_remote_import() {
    let (ty, _) = import_type(parse("https://example.com/a/package.dhall?v=1"));
    match ty {
        ImportType::Remote(url) => {
            assert_eq!(url.scheme, Scheme::Https);
            assert_eq!(url.authority, "example.com");
            assert_eq!(url.path.components().collect::<Vec<_>>(), vec!["a", "package.dhall"]);
            assert_eq!(url.query.as_deref(), Some("v=1"));
            assert!(url.headers.is_none());
        }
        other => panic!("expected a remote import, got {:?}", other),
    }
}

#[test]
fn test_env_import_modes_and_hash() {
    let (ty, mode) = import_type(parse("env:HOME as Text"));
    assert_eq!(ty, ImportType::Env("HOME".to_string()));
    assert_eq!(mode, ImportMode::RawText);

    let hash = "0".repeat(64);
    match parse(&format!("missing sha256:{} as Location", hash)) {
        Expression::Import(import) => {
            assert_eq!(import.import_type, ImportType::Missing);
            assert_eq!(import.mode, ImportMode::Location);
            assert_eq!(import.hash.map(|h| h.to_string()), Some(hash));
        }
        other => panic!("expected an import, got {:?}", other),
    }
}

#[test]
fn test_import_alternative() {
    assert_eq!(
        parse("env:FOO ? 1"),
        Expression::op(
            Expression::Import(dhall_syntax::ast::Import {
                import_type: ImportType::Env("FOO".to_string()),
                mode: ImportMode::Code,
                hash: None,
            }),
            Operator::Alternative,
            Expression::natural(1)
        )
    );
}

// ---
// Whitespace, errors and guards
// ---

#[test]
fn test_comments_are_whitespace() {
    assert_eq!(
        parse("-- leading\n{- block {- nested -} -} 1 + 2 -- trailing"),
        Expression::op(Expression::natural(1), Operator::Plus, Expression::natural(2))
    );
}

#[test]
fn test_trailing_input_is_a_syntax_error() {
    let err = parser().parse("1 )").unwrap_err();
    match err {
        ParseError::Syntax(e) => {
            assert_eq!(e.line, 1);
            assert!(e.offset >= 1);
        }
        other => panic!("expected a syntax error, got {:?}", other),
    }
}

#[test]
fn test_nesting_is_bounded() {
    let shallow = Parser::standard().unwrap().with_options(ParseOptions {
        max_depth: 5,
        ..ParseOptions::default()
    });
    assert!(shallow.parse("[[1]]").is_ok());
    let err = shallow.parse("[[[[[[[[1]]]]]]]]").unwrap_err();
    assert!(matches!(err, ParseError::Ast(AstError::TooDeep { limit: 5 })));
}

#[test]
fn test_deep_nesting_fails_cleanly_on_a_small_stack() {
    fn nested(depth: usize) -> String {
        format!("{}x", "λ(x : T) → ".repeat(depth))
    }
    let run = |source: String| {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || parser().parse(&source).map(|_| ()))
            .unwrap()
            .join()
            .unwrap()
    };

    assert!(run(nested(300)).is_ok());
    let err = run(nested(1000)).unwrap_err();
    assert!(
        matches!(err, ParseError::TreeTooDeep { .. } | ParseError::Ast(AstError::TooDeep { .. })),
        "unexpected {:?}",
        err
    );
}

#[test]
fn test_parsing_is_deterministic() {
    let source = "let f = λ(x : Natural) → x + 1 in { a = f 1, b = [f 2] }";
    assert_eq!(parse(source), parse(source));
}

#[test]
fn test_parse_tree_is_available() {
    let tree = parser()
        .parse_tree(&SourceContext::anonymous("1 + 2"))
        .unwrap();
    assert_eq!(tree.rule(), "complete-expression");
    assert_eq!(tree.span.end, 5);
}

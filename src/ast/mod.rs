//! Typed Dhall syntax tree.
//!
//! This is the contract with downstream consumers (type checker, evaluator,
//! pretty printer). Variables carry de Bruijn indices; source positions are
//! not part of the tree.

mod import;

pub use import::{
    File, FilePrefix, Import, ImportMode, ImportType, Scheme, Sha256Digest, Url,
};

use serde::{Deserialize, Serialize};

// ============================================================================
// EXPRESSIONS
// ============================================================================

/// A Dhall expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Variable(Variable),
    /// `λ(name : domain) → body`
    Lambda(String, Box<Expression>, Box<Expression>),
    /// `∀(name : domain) → body`; `A → B` is `∀(_ : A) → B`.
    Forall(String, Box<Expression>, Box<Expression>),
    /// `let name : annotation = value in body`
    Let(
        String,
        Option<Box<Expression>>,
        Box<Expression>,
        Box<Expression>,
    ),
    If(Box<Expression>, Box<Expression>, Box<Expression>),
    /// `merge handler union : annotation`
    Merge(Box<Expression>, Box<Expression>, Option<Box<Expression>>),
    /// `toMap record : annotation`
    ToMap(Box<Expression>, Option<Box<Expression>>),
    /// `[] : T`
    EmptyList(Box<Expression>),
    NonEmptyList(Box<NonEmpty<Expression>>),
    Annotation(Box<Expression>, Box<Expression>),
    Operator(Box<Expression>, Operator, Box<Expression>),
    Application(Box<Expression>, Box<Expression>),
    Field(Box<Expression>, String),
    ProjectByLabels(Box<Expression>, Vec<String>),
    ProjectByType(Box<Expression>, Box<Expression>),
    /// `T::r`
    Completion(Box<Expression>, Box<Expression>),
    Assert(Box<Expression>),
    /// `e with a.b.c = v`
    With(Box<Expression>, NonEmpty<String>, Box<Expression>),
    DoubleLiteral(Double),
    NaturalLiteral(u64),
    IntegerLiteral(i64),
    TextLiteral(TextLiteral),
    /// Fields in written order.
    RecordType(Vec<(String, Expression)>),
    /// Fields in written order.
    RecordLiteral(Vec<(String, Expression)>),
    /// Alternatives in written order.
    UnionType(Vec<(String, Option<Expression>)>),
    Import(Import),
    Some(Box<Expression>),
    Builtin(Builtin),
    Constant(Constant),
}

impl Expression {
    pub fn var(name: impl Into<String>, index: u64) -> Self {
        Expression::Variable(Variable {
            name: name.into(),
            index,
        })
    }

    pub fn natural(n: u64) -> Self {
        Expression::NaturalLiteral(n)
    }

    pub fn text(text: impl Into<String>) -> Self {
        Expression::TextLiteral(TextLiteral::plain(text))
    }

    pub fn op(left: Expression, op: Operator, right: Expression) -> Self {
        Expression::Operator(Box::new(left), op, Box::new(right))
    }

    pub fn app(function: Expression, argument: Expression) -> Self {
        Expression::Application(Box::new(function), Box::new(argument))
    }

    pub fn lambda(name: impl Into<String>, domain: Expression, body: Expression) -> Self {
        Expression::Lambda(name.into(), Box::new(domain), Box::new(body))
    }

    pub fn forall(name: impl Into<String>, domain: Expression, body: Expression) -> Self {
        Expression::Forall(name.into(), Box::new(domain), Box::new(body))
    }
}

/// A variable reference: `name@index`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    /// Number of nearer binders of the same name to skip.
    pub index: u64,
}

/// An `f64` compared by bit pattern, so `NaN` equals itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Double(pub f64);

impl PartialEq for Double {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

/// Text with interpolations: `chunks` are `(prefix, expression)` pairs in
/// order, followed by the `trailing` suffix.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLiteral {
    pub chunks: Vec<(String, Expression)>,
    pub trailing: String,
}

impl TextLiteral {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            trailing: text.into(),
        }
    }
}

/// A list with at least one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonEmpty<T> {
    pub head: T,
    pub tail: Vec<T>,
}

impl<T> NonEmpty<T> {
    pub fn new(head: T) -> Self {
        Self {
            head,
            tail: Vec::new(),
        }
    }

    pub fn from_vec(mut items: Vec<T>) -> Option<Self> {
        if items.is_empty() {
            return None;
        }
        let head = items.remove(0);
        Some(Self { head, tail: items })
    }

    pub fn len(&self) -> usize {
        1 + self.tail.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        std::iter::once(&self.head).chain(self.tail.iter())
    }

    pub fn into_vec(self) -> Vec<T> {
        let mut items = Vec::with_capacity(1 + self.tail.len());
        items.push(self.head);
        items.extend(self.tail);
        items
    }
}

// ============================================================================
// OPERATORS, BUILTINS, CONSTANTS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Or,
    Plus,
    TextAppend,
    ListAppend,
    And,
    CombineRecordTerms,
    Prefer,
    CombineRecordTypes,
    Times,
    Equal,
    NotEqual,
    Equivalent,
    Alternative,
}

impl Operator {
    /// The ASCII spelling.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Or => "||",
            Operator::Plus => "+",
            Operator::TextAppend => "++",
            Operator::ListAppend => "#",
            Operator::And => "&&",
            Operator::CombineRecordTerms => "/\\",
            Operator::Prefer => "//",
            Operator::CombineRecordTypes => "//\\\\",
            Operator::Times => "*",
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Equivalent => "===",
            Operator::Alternative => "?",
        }
    }
}

macro_rules! named_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($text => Some($name::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

named_enum! {
    /// Built-in functions and types.
    Builtin {
        NaturalBuild => "Natural/build",
        NaturalFold => "Natural/fold",
        NaturalIsZero => "Natural/isZero",
        NaturalEven => "Natural/even",
        NaturalOdd => "Natural/odd",
        NaturalToInteger => "Natural/toInteger",
        NaturalShow => "Natural/show",
        NaturalSubtract => "Natural/subtract",
        IntegerToDouble => "Integer/toDouble",
        IntegerShow => "Integer/show",
        IntegerNegate => "Integer/negate",
        IntegerClamp => "Integer/clamp",
        DoubleShow => "Double/show",
        ListBuild => "List/build",
        ListFold => "List/fold",
        ListLength => "List/length",
        ListHead => "List/head",
        ListLast => "List/last",
        ListIndexed => "List/indexed",
        ListReverse => "List/reverse",
        TextShow => "Text/show",
        TextReplace => "Text/replace",
        Bool => "Bool",
        Optional => "Optional",
        Natural => "Natural",
        Integer => "Integer",
        Double => "Double",
        Text => "Text",
        List => "List",
        True => "True",
        False => "False",
        None => "None",
    }
}

named_enum! {
    /// Universe constants.
    Constant {
        Type => "Type",
        Kind => "Kind",
        Sort => "Sort",
    }
}

//! # AST Builder
//!
//! ## Purpose
//! Converts the generic parse tree of the standard grammar into a typed
//! `Expression`. Dispatch is by rule name; single-child wrapper nodes pass
//! through.
//!
//! ## Invariants
//! - Operator, application, selector and `with` chains fold left
//! - Variables resolve against a binder stack that is pushed when entering
//!   a binder body and truncated on the way out, on success or failure
//! - Numeric literals are range checked; nothing is silently truncated

mod import;
mod text;

use tracing::debug;

use crate::ast::{Builtin, Constant, Double, Expression, NonEmpty, Operator};
use crate::errors::AstError;
use crate::parser::ParseOptions;
use crate::syntax::{ParseTree, Span};

/// Operator chain rules, loosest first.
const OPERATOR_LEVELS: &[(&str, Operator)] = &[
    ("equivalent-expression", Operator::Equivalent),
    ("import-alt-expression", Operator::Alternative),
    ("or-expression", Operator::Or),
    ("plus-expression", Operator::Plus),
    ("text-append-expression", Operator::TextAppend),
    ("list-append-expression", Operator::ListAppend),
    ("and-expression", Operator::And),
    ("combine-expression", Operator::CombineRecordTerms),
    ("prefer-expression", Operator::Prefer),
    ("combine-types-expression", Operator::CombineRecordTypes),
    ("times-expression", Operator::Times),
    ("equal-expression", Operator::Equal),
    ("not-equal-expression", Operator::NotEqual),
];

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

/// Rules that are a plain wrapper when they have a single child.
const PASS_THROUGH: &[&str] = &[
    "complete-expression",
    "annotated-expression",
    "application-expression",
    "completion-expression",
    "selector-expression",
];

/// Build an expression with default options.
pub fn build(tree: &ParseTree) -> Result<Expression, AstError> {
    Builder::new(ParseOptions::default()).build(tree)
}

/// Stateful tree walker. One builder handles one tree at a time.
#[derive(Debug)]
pub struct Builder {
    options: ParseOptions,
    scope: Vec<String>,
    depth: usize,
}

impl Builder {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            scope: Vec::new(),
            depth: 0,
        }
    }

    pub fn build(&mut self, tree: &ParseTree) -> Result<Expression, AstError> {
        debug!(nodes = tree.size(), "building expression");
        self.scope.clear();
        self.depth = 0;
        self.expression(tree)
    }

    // ========================================================================
    // DISPATCH
    // ========================================================================

    fn expression(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        if self.depth >= self.options.max_depth {
            return Err(AstError::TooDeep {
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        let result = stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.dispatch(unwrap_pass_through(node))
        });
        self.depth -= 1;
        result
    }

    fn dispatch(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let children = node.children();
        match node.rule() {
            "lambda-expression" => {
                let (name, domain, body) = self.binder(node)?;
                Ok(Expression::Lambda(name, domain, body))
            }
            "forall-expression" => {
                let (name, domain, body) = self.binder(node)?;
                Ok(Expression::Forall(name, domain, body))
            }
            "arrow-expression" => {
                let domain = self.expression(child(node, 0)?)?;
                let body = self.scoped(|b| {
                    b.scope.push("_".to_string());
                    b.expression(child(node, 1)?)
                })?;
                Ok(Expression::Forall("_".to_string(), Box::new(domain), Box::new(body)))
            }
            "if-expression" => Ok(Expression::If(
                Box::new(self.expression(child(node, 0)?)?),
                Box::new(self.expression(child(node, 1)?)?),
                Box::new(self.expression(child(node, 2)?)?),
            )),
            "let-expression" => self.scoped(|b| b.let_expression(node)),
            "with-expression" => self.with_expression(node),
            "empty-list-literal" => Ok(Expression::EmptyList(Box::new(
                self.expression(child(node, 0)?)?,
            ))),
            "assert-expression" => Ok(Expression::Assert(Box::new(
                self.expression(child(node, 0)?)?,
            ))),
            "annotated-expression" => self.annotated(node),
            "application-expression" => {
                let (first, rest) = split_first(node)?;
                let mut acc = self.expression(first)?;
                for argument in rest {
                    acc = Expression::app(acc, self.expression(argument)?);
                }
                Ok(acc)
            }
            "merge-expression" => Ok(Expression::Merge(
                Box::new(self.expression(child(node, 0)?)?),
                Box::new(self.expression(child(node, 1)?)?),
                None,
            )),
            "some-expression" => Ok(Expression::Some(Box::new(
                self.expression(child(node, 0)?)?,
            ))),
            "to-map-expression" => Ok(Expression::ToMap(
                Box::new(self.expression(child(node, 0)?)?),
                None,
            )),
            "completion-expression" => Ok(Expression::Completion(
                Box::new(self.expression(child(node, 0)?)?),
                Box::new(self.expression(child(node, 1)?)?),
            )),
            "selector-expression" => self.selectors(node),
            "double-literal" => self.double(node),
            "natural-literal" => Ok(Expression::NaturalLiteral(natural(node)?)),
            "integer-literal" => Ok(Expression::IntegerLiteral(integer(node)?)),
            "double-quote-literal" => Ok(Expression::TextLiteral(self.double_quoted(node)?)),
            "single-quote-literal" => Ok(Expression::TextLiteral(self.single_quoted(node)?)),
            "empty-record-type" => Ok(Expression::RecordType(Vec::new())),
            "empty-record-literal" => Ok(Expression::RecordLiteral(Vec::new())),
            "record-type" => {
                let mut fields = Vec::with_capacity(children.len());
                for entry in children {
                    let name = label(child(entry, 0)?)?;
                    fields.push((name, self.expression(child(entry, 1)?)?));
                }
                Ok(Expression::RecordType(fields))
            }
            "record-literal" => {
                let mut fields = Vec::with_capacity(children.len());
                for entry in children {
                    fields.push(self.record_literal_entry(entry)?);
                }
                Ok(Expression::RecordLiteral(fields))
            }
            "union-type" => {
                let mut alternatives = Vec::with_capacity(children.len());
                for entry in children {
                    let name = label(child(entry, 0)?)?;
                    let payload = match entry.children().get(1) {
                        Some(ty) => Some(self.expression(ty)?),
                        None => None,
                    };
                    alternatives.push((name, payload));
                }
                Ok(Expression::UnionType(alternatives))
            }
            "non-empty-list-literal" => {
                let items = children
                    .iter()
                    .map(|item| self.expression(item))
                    .collect::<Result<Vec<_>, _>>()?;
                NonEmpty::from_vec(items)
                    .map(|items| Expression::NonEmptyList(Box::new(items)))
                    .ok_or_else(|| shape(node, "list has no elements"))
            }
            "variable" => {
                let name = label(child(node, 0)?)?;
                let index = match children.get(1) {
                    Some(index) => natural(index)?,
                    None => 0,
                };
                self.variable(name, index, node.span)
            }
            "builtin" => {
                let name = token(node)?;
                if let Some(builtin) = Builtin::from_name(name) {
                    return Ok(Expression::Builtin(builtin));
                }
                Constant::from_name(name)
                    .map(Expression::Constant)
                    .ok_or_else(|| shape(node, format!("unknown builtin `{}`", name)))
            }
            "import" => self.import(node),
            rule => match operator_for(rule) {
                Some(op) => {
                    let (first, rest) = split_first(node)?;
                    let mut acc = self.expression(first)?;
                    for operand in rest {
                        acc = Expression::op(acc, op, self.expression(operand)?);
                    }
                    Ok(acc)
                }
                None => Err(shape(node, "not an expression")),
            },
        }
    }

    // ========================================================================
    // BINDERS AND SCOPE
    // ========================================================================

    /// Run `f` and restore the binder stack afterwards.
    fn scoped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, AstError>,
    ) -> Result<T, AstError> {
        let base = self.scope.len();
        let result = f(self);
        self.scope.truncate(base);
        result
    }

    /// `λ(x : A) → b` and `∀(x : A) → B`
    fn binder(
        &mut self,
        node: &ParseTree,
    ) -> Result<(String, Box<Expression>, Box<Expression>), AstError> {
        let name = label(child(node, 0)?)?;
        let domain = self.expression(child(node, 1)?)?;
        let body = self.scoped(|b| {
            b.scope.push(name.clone());
            b.expression(child(node, 2)?)
        })?;
        Ok((name, Box::new(domain), Box::new(body)))
    }

    /// Bindings nest to the right: `let a = 1 let b = 2 in e` is
    /// `let a = 1 in let b = 2 in e`. Each value sees the earlier names.
    fn let_expression(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let (body, bindings) = node
            .children()
            .split_last()
            .ok_or_else(|| shape(node, "missing body"))?;
        let mut built = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let parts = binding.children();
            let name = label(child(binding, 0)?)?;
            let (annotation, value) = match parts.len() {
                2 => (None, self.expression(&parts[1])?),
                3 => (
                    Some(Box::new(self.expression(&parts[1])?)),
                    self.expression(&parts[2])?,
                ),
                _ => return Err(shape(binding, "expected a name, an optional type and a value")),
            };
            self.scope.push(name.clone());
            built.push((name, annotation, value));
        }
        let mut acc = self.expression(body)?;
        for (name, annotation, value) in built.into_iter().rev() {
            acc = Expression::Let(name, annotation, Box::new(value), Box::new(acc));
        }
        Ok(acc)
    }

    fn variable(&self, name: String, index: u64, span: Span) -> Result<Expression, AstError> {
        if self.options.reject_free_variables {
            let bound = self.scope.iter().filter(|n| **n == name).count();
            let bound = u64::try_from(bound).unwrap_or(u64::MAX);
            if index >= bound {
                return Err(AstError::UnboundVariable { name, index, span });
            }
        }
        Ok(Expression::var(name, index))
    }

    // ========================================================================
    // COMPOUND FORMS
    // ========================================================================

    fn with_expression(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let (first, clauses) = split_first(node)?;
        let mut acc = self.expression(first)?;
        for clause in clauses {
            let path = child(clause, 0)?
                .children()
                .iter()
                .map(label)
                .collect::<Result<Vec<_>, _>>()?;
            let path = NonEmpty::from_vec(path).ok_or_else(|| shape(clause, "empty update path"))?;
            let value = self.expression(child(clause, 1)?)?;
            acc = Expression::With(Box::new(acc), path, Box::new(value));
        }
        Ok(acc)
    }

    /// `merge x y : T` and `toMap x : T` keep the annotation in the node;
    /// anything else, including a parenthesized merge, is an annotation.
    fn annotated(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let operand = child(node, 0)?;
        let annotation = child(node, 1)?;
        let keyword = bare_keyword_form(operand);
        match keyword.rule() {
            "merge-expression" => Ok(Expression::Merge(
                Box::new(self.expression(child(keyword, 0)?)?),
                Box::new(self.expression(child(keyword, 1)?)?),
                Some(Box::new(self.expression(annotation)?)),
            )),
            "to-map-expression" => Ok(Expression::ToMap(
                Box::new(self.expression(child(keyword, 0)?)?),
                Some(Box::new(self.expression(annotation)?)),
            )),
            _ => Ok(Expression::Annotation(
                Box::new(self.expression(operand)?),
                Box::new(self.expression(annotation)?),
            )),
        }
    }

    fn selectors(&mut self, node: &ParseTree) -> Result<Expression, AstError> {
        let (first, selectors) = split_first(node)?;
        let mut acc = self.expression(first)?;
        for selector in selectors {
            acc = match selector.rule() {
                "any-label" => Expression::Field(Box::new(acc), label(selector)?),
                "labels" => Expression::ProjectByLabels(
                    Box::new(acc),
                    selector
                        .children()
                        .iter()
                        .map(label)
                        .collect::<Result<_, _>>()?,
                ),
                "type-selector" => Expression::ProjectByType(
                    Box::new(acc),
                    Box::new(self.expression(child(selector, 0)?)?),
                ),
                _ => return Err(shape(selector, "not a selector")),
            };
        }
        Ok(acc)
    }

    /// `{ a.b.c = v }` nests; `{ x }` puns to `{ x = x }`. The grammar
    /// only allows a pun on a label that can also be a variable.
    fn record_literal_entry(&mut self, entry: &ParseTree) -> Result<(String, Expression), AstError> {
        let parts = entry.children();
        let split = parts
            .iter()
            .position(|p| !matches!(p.rule(), "any-label-or-some" | "any-label"))
            .unwrap_or(parts.len());
        let (labels, value) = parts.split_at(split);
        let labels = labels.iter().map(label).collect::<Result<Vec<_>, _>>()?;
        let (head, path) = labels
            .split_first()
            .ok_or_else(|| shape(entry, "record field without a name"))?;
        match value {
            [] if path.is_empty() => Ok((head.clone(), self.variable(head.clone(), 0, entry.span)?)),
            [value] => {
                let mut acc = self.expression(value)?;
                for name in path.iter().rev() {
                    acc = Expression::RecordLiteral(vec![(name.clone(), acc)]);
                }
                Ok((head.clone(), acc))
            }
            _ => Err(shape(entry, "malformed record field")),
        }
    }

    fn double(&self, node: &ParseTree) -> Result<Expression, AstError> {
        let text = token(node)?;
        let value = match text {
            "NaN" => f64::NAN,
            "Infinity" => f64::INFINITY,
            "-Infinity" => f64::NEG_INFINITY,
            _ => {
                let value: f64 = text
                    .parse()
                    .map_err(|_| shape(node, format!("`{}` is not a Double", text)))?;
                if !value.is_finite() {
                    return Err(AstError::NumericOverflow {
                        literal: text.to_string(),
                        kind: "Double",
                        span: node.span,
                    });
                }
                value
            }
        };
        Ok(Expression::DoubleLiteral(Double(value)))
    }
}

// ============================================================================
// PRIVATE HELPERS
// ============================================================================

fn operator_for(rule: &str) -> Option<Operator> {
    OPERATOR_LEVELS
        .iter()
        .find(|(name, _)| *name == rule)
        .map(|(_, op)| *op)
}

fn unwrap_pass_through(mut node: &ParseTree) -> &ParseTree {
    loop {
        let passes = PASS_THROUGH.contains(&node.rule()) || operator_for(node.rule()).is_some();
        match node.children() {
            [only] if passes => node = only,
            _ => return node,
        }
    }
}

/// The merge or toMap node an annotation applies to directly, if any.
fn bare_keyword_form(mut node: &ParseTree) -> &ParseTree {
    loop {
        let level = node.rule() == "application-expression" || operator_for(node.rule()).is_some();
        match node.children() {
            [only] if level => node = only,
            _ => return node,
        }
    }
}

fn shape(node: &ParseTree, message: impl Into<String>) -> AstError {
    AstError::UnexpectedShape {
        rule: node.rule().to_string(),
        message: message.into(),
        span: node.span,
    }
}

fn child(node: &ParseTree, index: usize) -> Result<&ParseTree, AstError> {
    node.children()
        .get(index)
        .ok_or_else(|| shape(node, format!("missing child {}", index)))
}

fn split_first(node: &ParseTree) -> Result<(&ParseTree, &[ParseTree]), AstError> {
    node.children()
        .split_first()
        .ok_or_else(|| shape(node, "no children"))
}

fn token(node: &ParseTree) -> Result<&str, AstError> {
    node.text().ok_or_else(|| shape(node, "expected a token"))
}

/// Label text with quoting backticks removed.
fn label(node: &ParseTree) -> Result<String, AstError> {
    let text = token(node)?;
    let unquoted = text
        .strip_prefix('`')
        .and_then(|t| t.strip_suffix('`'))
        .unwrap_or(text);
    Ok(unquoted.to_string())
}

fn parse_natural(text: &str) -> Option<u64> {
    match text.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn natural(node: &ParseTree) -> Result<u64, AstError> {
    let text = token(node)?;
    parse_natural(text).ok_or_else(|| AstError::NumericOverflow {
        literal: text.to_string(),
        kind: "Natural",
        span: node.span,
    })
}

fn integer(node: &ParseTree) -> Result<i64, AstError> {
    let text = token(node)?;
    let overflow = || AstError::NumericOverflow {
        literal: text.to_string(),
        kind: "Integer",
        span: node.span,
    };
    let (negative, digits) = if let Some(digits) = text.strip_prefix('-') {
        (true, digits)
    } else if let Some(digits) = text.strip_prefix('+') {
        (false, digits)
    } else {
        return Err(shape(node, "Integer literal without a sign"));
    };
    let magnitude = parse_natural(digits).ok_or_else(overflow)? as i128;
    let value = if negative { -magnitude } else { magnitude };
    i64::try_from(value).map_err(|_| overflow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn leaf(rule: &str, text: &str) -> ParseTree {
        ParseTree::leaf(Arc::from(rule), Span::new(0, text.len()), text)
    }

    #[test]
    fn naturals_are_range_checked() {
        assert_eq!(natural(&leaf("natural-literal", "0x10")).unwrap(), 16);
        assert_eq!(
            natural(&leaf("natural-literal", "18446744073709551615")).unwrap(),
            u64::MAX
        );
        assert!(matches!(
            natural(&leaf("natural-literal", "18446744073709551616")),
            Err(AstError::NumericOverflow { kind: "Natural", .. })
        ));
    }

    #[test]
    fn integers_allow_the_full_i64_range() {
        assert_eq!(
            integer(&leaf("integer-literal", "-9223372036854775808")).unwrap(),
            i64::MIN
        );
        assert!(matches!(
            integer(&leaf("integer-literal", "+9223372036854775808")),
            Err(AstError::NumericOverflow { kind: "Integer", .. })
        ));
        assert_eq!(integer(&leaf("integer-literal", "-0x10")).unwrap(), -16);
    }

    #[test]
    fn quoted_labels_lose_their_backticks() {
        assert_eq!(label(&leaf("any-label", "`foo bar`")).unwrap(), "foo bar");
        assert_eq!(label(&leaf("any-label", "plain")).unwrap(), "plain");
    }

    #[test]
    fn unknown_rules_are_reported() {
        let err = build(&leaf("mystery", "?")).unwrap_err();
        assert!(matches!(err, AstError::UnexpectedShape { ref rule, .. } if rule == "mystery"));
    }
}

//! Grammar notation compiler.
//!
//! Reads the textual notation with pest, checks it, and lowers groups,
//! options and repetitions into plain productions over generated helper
//! nonterminals (`rule~1`, `rule~2`, ...). Inline rules that reduce to a
//! single character class are substituted into their use sites.

use miette::{NamedSource, SourceSpan};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace};

use super::{
    fingerprint, CharClass, GrammarDefinition, NodeKind, Nonterminal, NonterminalId, Production,
    Symbol, Terminal,
};
use crate::errors::GrammarError;

#[derive(Parser)]
#[grammar = "grammar/notation.pest"]
struct NotationParser;

// ============================================================================
// NOTATION MODEL
// ============================================================================

#[derive(Debug, Clone)]
struct RuleDecl {
    name: String,
    kind: NodeKind,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone)]
struct Alternative {
    items: Vec<Item>,
    exclude: Option<String>,
}

#[derive(Debug, Clone)]
struct Item {
    element: Element,
    min: usize,
    max: Option<usize>,
    restriction: Vec<Look>,
}

impl Item {
    fn is_single(&self) -> bool {
        self.min == 1 && self.max == Some(1) && self.restriction.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Element {
    Literal(String),
    Range(char, char),
    Ref(String),
    Group(Vec<Alternative>),
    Optional(Vec<Alternative>),
}

#[derive(Debug, Clone)]
enum Look {
    Literal(String),
    Range(char, char),
    Ref(String),
}

#[derive(Debug, Default)]
struct Notation {
    start: Option<String>,
    rules: Vec<RuleDecl>,
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Compile grammar notation into a `GrammarDefinition`.
pub fn compile(source: &str) -> Result<GrammarDefinition, GrammarError> {
    let notation = read_notation(source)?;
    let rules = RuleSet::new(&notation.rules)?;

    let start_name = notation.start.as_deref().ok_or(GrammarError::MissingStart)?;
    if rules.get(start_name).is_none() {
        return Err(GrammarError::UnknownStart {
            rule: start_name.to_string(),
        });
    }
    rules.check_references()?;
    rules.check_reachable(start_name)?;

    let mut lowering = Lowering::new(&rules);
    let start = lowering.nonterminal_for(start_name);
    lowering.run()?;

    let grammar = GrammarDefinition {
        start,
        nonterminals: lowering.nonterminals,
        productions: lowering.productions,
        fingerprint: fingerprint(source),
    };
    grammar.check_repetitions()?;

    debug!(
        rules = notation.rules.len(),
        nonterminals = grammar.nonterminals.len(),
        productions = grammar.productions.len(),
        "compiled grammar"
    );
    Ok(grammar)
}

/// Style warnings for a grammar source that compiles.
pub fn lint(source: &str) -> Result<Vec<String>, GrammarError> {
    let notation = read_notation(source)?;
    let mut warnings = Vec::new();

    for rule in notation.rules.iter().filter(|r| r.kind == NodeKind::Token) {
        let open_ended = rule.alternatives.iter().any(|alt| {
            alt.items
                .last()
                .map(|item| item.max.is_none() && item.restriction.is_empty())
                .unwrap_or(false)
        });
        if open_ended {
            warnings.push(format!(
                "token rule `{}` ends with an unbounded repetition and no follow restriction",
                rule.name
            ));
        }
    }

    let mut used_as_symbol = HashSet::new();
    for rule in &notation.rules {
        for alt in &rule.alternatives {
            collect_symbol_refs(&alt.items, &mut used_as_symbol);
        }
    }
    for rule in &notation.rules {
        let is_start = notation.start.as_deref() == Some(rule.name.as_str());
        if !is_start && !used_as_symbol.contains(rule.name.as_str()) {
            warnings.push(format!(
                "rule `{}` is only used by restrictions or exclusions",
                rule.name
            ));
        }
    }
    Ok(warnings)
}

fn collect_symbol_refs<'a>(items: &'a [Item], out: &mut HashSet<&'a str>) {
    for item in items {
        match &item.element {
            Element::Ref(name) => {
                out.insert(name.as_str());
            }
            Element::Group(alts) | Element::Optional(alts) => {
                for alt in alts {
                    collect_symbol_refs(&alt.items, out);
                }
            }
            Element::Literal(_) | Element::Range(..) => {}
        }
    }
}

// ============================================================================
// NOTATION READER
// ============================================================================

fn read_notation(source: &str) -> Result<Notation, GrammarError> {
    let pairs = NotationParser::parse(Rule::grammar, source)
        .map_err(|e| convert_parse_error(e, source))?;

    let mut notation = Notation::default();
    for pair in pairs.flat_map(|p| p.into_inner()) {
        match pair.as_rule() {
            Rule::start_directive => {
                notation.start = pair.into_inner().next().map(|n| n.as_str().to_string());
            }
            Rule::rule => notation.rules.push(read_rule(pair, source)?),
            _ => {}
        }
    }
    Ok(notation)
}

fn read_rule(pair: Pair<Rule>, source: &str) -> Result<RuleDecl, GrammarError> {
    let mut decl = RuleDecl {
        name: String::new(),
        kind: NodeKind::Normal,
        alternatives: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::modifier => {
                decl.kind = match inner.as_str() {
                    "@silent" => NodeKind::Silent,
                    "@token" => NodeKind::Token,
                    _ => NodeKind::Inline,
                }
            }
            Rule::name => decl.name = inner.as_str().to_string(),
            Rule::alternatives => decl.alternatives = read_alternatives(inner, source)?,
            _ => {}
        }
    }
    Ok(decl)
}

fn read_alternatives(pair: Pair<Rule>, source: &str) -> Result<Vec<Alternative>, GrammarError> {
    pair.into_inner()
        .map(|alt| -> Result<Alternative, GrammarError> {
            let mut alternative = Alternative {
                items: Vec::new(),
                exclude: None,
            };
            for inner in alt.into_inner() {
                match inner.as_rule() {
                    Rule::item => alternative.items.push(read_item(inner, source)?),
                    Rule::exclusion => {
                        alternative.exclude =
                            inner.into_inner().next().map(|n| n.as_str().to_string())
                    }
                    _ => {}
                }
            }
            Ok(alternative)
        })
        .collect()
}

fn read_item(pair: Pair<Rule>, source: &str) -> Result<Item, GrammarError> {
    let mut item = Item {
        element: Element::Literal(String::new()),
        min: 1,
        max: Some(1),
        restriction: Vec::new(),
    };
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::repeat => {
                let (min, max) = read_repeat(&inner, source)?;
                item.min = min;
                item.max = max;
            }
            Rule::element => item.element = read_element(inner, source)?,
            Rule::restriction => {
                item.restriction = inner
                    .into_inner()
                    .map(|look| read_look(look, source))
                    .collect::<Result<_, _>>()?
            }
            _ => {}
        }
    }
    Ok(item)
}

fn read_repeat(pair: &Pair<Rule>, source: &str) -> Result<(usize, Option<usize>), GrammarError> {
    let text = pair.as_str();
    let number = |digits: &str| -> Result<usize, GrammarError> {
        digits
            .parse::<usize>()
            .map_err(|_| notation_error(pair, source, format!("repetition count `{}` is too large", digits)))
    };
    let (min, max) = match text.split_once('*') {
        Some((lo, hi)) => {
            let min = if lo.is_empty() { 0 } else { number(lo)? };
            let max = if hi.is_empty() { None } else { Some(number(hi)?) };
            (min, max)
        }
        None => {
            let n = number(text)?;
            (n, Some(n))
        }
    };
    match max {
        Some(0) => Err(notation_error(pair, source, "repetition can never match".to_string())),
        Some(max) if max < min => Err(notation_error(
            pair,
            source,
            format!("repetition `{}` has a maximum below its minimum", text),
        )),
        _ => Ok((min, max)),
    }
}

fn read_element(pair: Pair<Rule>, source: &str) -> Result<Element, GrammarError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| GrammarError::Artifact {
            message: "empty grammar element".to_string(),
        })?;
    match inner.as_rule() {
        Rule::literal => Ok(Element::Literal(literal_text(inner))),
        Rule::range => {
            let (lo, hi) = read_range(inner, source)?;
            Ok(Element::Range(lo, hi))
        }
        Rule::name => Ok(Element::Ref(inner.as_str().to_string())),
        Rule::group => Ok(Element::Group(read_nested(inner, source)?)),
        Rule::option => Ok(Element::Optional(read_nested(inner, source)?)),
        _ => Err(notation_error(&inner, source, "unexpected element".to_string())),
    }
}

fn read_nested(pair: Pair<Rule>, source: &str) -> Result<Vec<Alternative>, GrammarError> {
    match pair.into_inner().next() {
        Some(alternatives) => read_alternatives(alternatives, source),
        None => Ok(Vec::new()),
    }
}

fn read_look(pair: Pair<Rule>, source: &str) -> Result<Look, GrammarError> {
    let inner = pair
        .into_inner()
        .next()
        .ok_or_else(|| GrammarError::Artifact {
            message: "empty restriction".to_string(),
        })?;
    match inner.as_rule() {
        Rule::literal => Ok(Look::Literal(literal_text(inner))),
        Rule::range => {
            let (lo, hi) = read_range(inner, source)?;
            Ok(Look::Range(lo, hi))
        }
        _ => Ok(Look::Ref(inner.as_str().to_string())),
    }
}

fn literal_text(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .next()
        .map(|body| body.as_str().to_string())
        .unwrap_or_default()
}

fn read_range(pair: Pair<Rule>, source: &str) -> Result<(char, char), GrammarError> {
    let bounds: Vec<char> = pair
        .clone()
        .into_inner()
        .map(|hex| {
            u32::from_str_radix(hex.as_str(), 16)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| {
                    notation_error(
                        &hex,
                        source,
                        format!("%x{} is not a Unicode scalar value", hex.as_str()),
                    )
                })
        })
        .collect::<Result<_, _>>()?;
    match bounds.as_slice() {
        [c] => Ok((*c, *c)),
        [lo, hi] if lo <= hi => Ok((*lo, *hi)),
        _ => Err(notation_error(&pair, source, "empty character range".to_string())),
    }
}

fn notation_error(pair: &Pair<Rule>, source: &str, message: String) -> GrammarError {
    let span = pair.as_span();
    GrammarError::Notation {
        message,
        src: NamedSource::new("grammar", source.to_string()),
        span: SourceSpan::new(span.start().into(), span.end() - span.start()),
    }
}

fn convert_parse_error(error: pest::error::Error<Rule>, source: &str) -> GrammarError {
    let (start, len) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, 0),
        pest::error::InputLocation::Span((start, end)) => (start, end - start),
    };
    GrammarError::Notation {
        message: error.variant.message().to_string(),
        src: NamedSource::new("grammar", source.to_string()),
        span: SourceSpan::new(start.into(), len),
    }
}

// ============================================================================
// RULE CHECKS
// ============================================================================

struct RuleSet<'a> {
    rules: &'a [RuleDecl],
    index: HashMap<&'a str, usize>,
}

impl<'a> RuleSet<'a> {
    fn new(rules: &'a [RuleDecl]) -> Result<Self, GrammarError> {
        let mut index = HashMap::new();
        for (i, rule) in rules.iter().enumerate() {
            if index.insert(rule.name.as_str(), i).is_some() {
                return Err(GrammarError::DuplicateRule {
                    rule: rule.name.clone(),
                });
            }
            if rule.alternatives.is_empty() {
                return Err(GrammarError::EmptyAlternatives {
                    rule: rule.name.clone(),
                });
            }
        }
        Ok(Self { rules, index })
    }

    fn get(&self, name: &str) -> Option<&'a RuleDecl> {
        self.index.get(name).map(|&i| &self.rules[i])
    }

    fn check_references(&self) -> Result<(), GrammarError> {
        for rule in self.rules {
            let mut refs = Vec::new();
            references(&rule.alternatives, &mut refs);
            if let Some(missing) = refs.into_iter().find(|r| self.get(r).is_none()) {
                return Err(GrammarError::UndefinedNonterminal {
                    rule: rule.name.clone(),
                    reference: missing.to_string(),
                });
            }
        }
        Ok(())
    }

    fn check_reachable(&self, start: &str) -> Result<(), GrammarError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(name) = queue.pop_front() {
            if !seen.insert(name) {
                continue;
            }
            if let Some(rule) = self.get(name) {
                let mut refs = Vec::new();
                references(&rule.alternatives, &mut refs);
                queue.extend(refs);
            }
        }
        match self.rules.iter().find(|r| !seen.contains(r.name.as_str())) {
            Some(rule) => Err(GrammarError::Unreachable {
                rule: rule.name.clone(),
            }),
            None => Ok(()),
        }
    }

    /// The character class an inline rule reduces to, if it does.
    fn rule_class(&self, name: &str, visiting: &mut Vec<String>) -> Option<CharClass> {
        let rule = self.get(name)?;
        if rule.kind != NodeKind::Inline || visiting.iter().any(|v| v == name) {
            return None;
        }
        visiting.push(name.to_string());
        let class = self.alternatives_class(&rule.alternatives, visiting);
        visiting.pop();
        class
    }

    fn alternatives_class(
        &self,
        alternatives: &[Alternative],
        visiting: &mut Vec<String>,
    ) -> Option<CharClass> {
        let mut class = CharClass::default();
        for alt in alternatives {
            let [item] = alt.items.as_slice() else {
                return None;
            };
            if alt.exclude.is_some() || !item.is_single() {
                return None;
            }
            class = class.union(&self.element_class(&item.element, visiting)?);
        }
        Some(class)
    }

    fn element_class(&self, element: &Element, visiting: &mut Vec<String>) -> Option<CharClass> {
        match element {
            Element::Literal(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(CharClass::single(c)),
                    _ => None,
                }
            }
            Element::Range(lo, hi) => Some(CharClass::range(*lo, *hi)),
            Element::Ref(name) => self.rule_class(name, visiting),
            Element::Group(alts) => self.alternatives_class(alts, visiting),
            Element::Optional(_) => None,
        }
    }

    /// The finite set of literals a rule matches, if it is one.
    fn literal_set(&self, name: &str, visiting: &mut Vec<String>) -> Option<Vec<String>> {
        let rule = self.get(name)?;
        if visiting.iter().any(|v| v == name) {
            return None;
        }
        visiting.push(name.to_string());
        let mut literals = Vec::new();
        for alt in &rule.alternatives {
            let [item] = alt.items.as_slice() else {
                visiting.pop();
                return None;
            };
            if alt.exclude.is_some() || !item.is_single() {
                visiting.pop();
                return None;
            }
            match &item.element {
                Element::Literal(text) => literals.push(text.clone()),
                Element::Ref(other) => match self.literal_set(other, visiting) {
                    Some(more) => literals.extend(more),
                    None => {
                        visiting.pop();
                        return None;
                    }
                },
                _ => {
                    visiting.pop();
                    return None;
                }
            }
        }
        visiting.pop();
        Some(literals)
    }
}

fn references<'a>(alternatives: &'a [Alternative], out: &mut Vec<&'a str>) {
    for alt in alternatives {
        if let Some(excluded) = &alt.exclude {
            out.push(excluded);
        }
        for item in &alt.items {
            for look in &item.restriction {
                if let Look::Ref(name) = look {
                    out.push(name);
                }
            }
            match &item.element {
                Element::Ref(name) => out.push(name),
                Element::Group(alts) | Element::Optional(alts) => references(alts, out),
                Element::Literal(_) | Element::Range(..) => {}
            }
        }
    }
}

// ============================================================================
// LOWERING
// ============================================================================

struct Lowering<'r, 'a> {
    rules: &'r RuleSet<'a>,
    nonterminals: Vec<Nonterminal>,
    productions: Vec<Production>,
    ids: HashMap<String, NonterminalId>,
    pending: VecDeque<(&'a RuleDecl, NonterminalId)>,
    helper_counts: HashMap<String, usize>,
}

impl<'r, 'a> Lowering<'r, 'a> {
    fn new(rules: &'r RuleSet<'a>) -> Self {
        Self {
            rules,
            nonterminals: Vec::new(),
            productions: Vec::new(),
            ids: HashMap::new(),
            pending: VecDeque::new(),
            helper_counts: HashMap::new(),
        }
    }

    fn run(&mut self) -> Result<(), GrammarError> {
        while let Some((decl, id)) = self.pending.pop_front() {
            trace!(rule = %decl.name, "lowering rule");
            for alt in &decl.alternatives {
                let symbols = self.lower_sequence(&decl.name, &alt.items)?;
                let exclude = self.resolve_exclusion(&decl.name, alt)?;
                self.add_production(id, symbols, exclude);
            }
        }
        Ok(())
    }

    /// Id of a named rule, scheduling it for lowering on first use.
    fn nonterminal_for(&mut self, name: &str) -> NonterminalId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.nonterminals.len();
        let kind = self.rules.get(name).map(|r| r.kind).unwrap_or(NodeKind::Normal);
        self.nonterminals.push(Nonterminal {
            name: name.to_string(),
            kind,
            productions: Vec::new(),
        });
        self.ids.insert(name.to_string(), id);
        if let Some(decl) = self.rules.get(name) {
            self.pending.push_back((decl, id));
        }
        id
    }

    fn helper(&mut self, owner: &str, kind: NodeKind) -> NonterminalId {
        let count = self.helper_counts.entry(owner.to_string()).or_insert(0);
        *count += 1;
        let id = self.nonterminals.len();
        self.nonterminals.push(Nonterminal {
            name: format!("{}~{}", owner, count),
            kind,
            productions: Vec::new(),
        });
        id
    }

    fn add_production(&mut self, lhs: NonterminalId, symbols: Vec<Symbol>, exclude: Vec<String>) {
        let id = self.productions.len();
        self.productions.push(Production {
            lhs,
            symbols,
            exclude,
        });
        self.nonterminals[lhs].productions.push(id);
    }

    fn lower_sequence(&mut self, owner: &str, items: &[Item]) -> Result<Vec<Symbol>, GrammarError> {
        let mut symbols = Vec::new();
        for item in items {
            symbols.extend(self.lower_item(owner, item)?);
        }
        Ok(symbols)
    }

    fn lower_item(&mut self, owner: &str, item: &Item) -> Result<Vec<Symbol>, GrammarError> {
        let looks = self.resolve_looks(owner, &item.restriction)?;
        let base = self.lower_element(owner, &item.element)?;

        let mut symbols = vec![base.clone(); item.min];
        match item.max {
            None => symbols.push(self.repeat_helper(owner, base)),
            Some(max) if max > item.min => symbols.push(self.optional_chain(owner, base, max - item.min)),
            Some(_) => {}
        }
        if let Some(last) = symbols.last_mut() {
            last.not_followed_by = looks;
        }
        Ok(symbols)
    }

    fn lower_element(&mut self, owner: &str, element: &Element) -> Result<Symbol, GrammarError> {
        match element {
            Element::Literal(text) if text.is_empty() => Err(GrammarError::EmptyLiteral {
                rule: owner.to_string(),
            }),
            Element::Literal(text) => Ok(Symbol::terminal(Terminal::Literal(text.clone()))),
            Element::Range(lo, hi) => Ok(Symbol::terminal(Terminal::Class(CharClass::range(*lo, *hi)))),
            Element::Ref(name) => match self.rules.rule_class(name, &mut Vec::new()) {
                Some(class) => Ok(Symbol::terminal(Terminal::Class(class))),
                None => Ok(Symbol::nonterminal(self.nonterminal_for(name))),
            },
            Element::Group(alts) => {
                if let Some(class) = self.rules.alternatives_class(alts, &mut Vec::new()) {
                    return Ok(Symbol::terminal(Terminal::Class(class)));
                }
                if let [alt] = alts.as_slice() {
                    if let ([item], None) = (alt.items.as_slice(), &alt.exclude) {
                        if item.is_single() {
                            return self.lower_element(owner, &item.element);
                        }
                    }
                }
                let helper = self.helper(owner, NodeKind::Inline);
                self.lower_alternatives_into(owner, helper, alts)?;
                Ok(Symbol::nonterminal(helper))
            }
            Element::Optional(alts) => {
                let helper = self.helper(owner, NodeKind::Inline);
                self.lower_alternatives_into(owner, helper, alts)?;
                self.add_production(helper, Vec::new(), Vec::new());
                Ok(Symbol::nonterminal(helper))
            }
        }
    }

    fn lower_alternatives_into(
        &mut self,
        owner: &str,
        helper: NonterminalId,
        alts: &[Alternative],
    ) -> Result<(), GrammarError> {
        for alt in alts {
            let symbols = self.lower_sequence(owner, &alt.items)?;
            let exclude = self.resolve_exclusion(owner, alt)?;
            self.add_production(helper, symbols, exclude);
        }
        Ok(())
    }

    /// `R = R x / ε`
    fn repeat_helper(&mut self, owner: &str, base: Symbol) -> Symbol {
        let helper = self.helper(owner, NodeKind::Repeat);
        self.add_production(helper, vec![Symbol::nonterminal(helper), base], Vec::new());
        self.add_production(helper, Vec::new(), Vec::new());
        Symbol::nonterminal(helper)
    }

    /// Up to `count` further copies of `base`: `O = x [O']`, innermost first.
    fn optional_chain(&mut self, owner: &str, base: Symbol, count: usize) -> Symbol {
        let mut next: Option<Symbol> = None;
        for _ in 0..count {
            let helper = self.helper(owner, NodeKind::Inline);
            let mut symbols = vec![base.clone()];
            symbols.extend(next.take());
            self.add_production(helper, symbols, Vec::new());
            self.add_production(helper, Vec::new(), Vec::new());
            next = Some(Symbol::nonterminal(helper));
        }
        next.unwrap_or_else(|| base.clone())
    }

    fn resolve_exclusion(&self, owner: &str, alt: &Alternative) -> Result<Vec<String>, GrammarError> {
        let Some(target) = &alt.exclude else {
            return Ok(Vec::new());
        };
        let mut literals = self
            .rules
            .literal_set(target, &mut Vec::new())
            .ok_or_else(|| GrammarError::NotALiteralSet {
                rule: owner.to_string(),
                target: target.clone(),
            })?;
        if literals.iter().any(String::is_empty) {
            return Err(GrammarError::EmptyLiteral {
                rule: target.clone(),
            });
        }
        literals.sort();
        literals.dedup();
        Ok(literals)
    }

    fn resolve_looks(&self, owner: &str, looks: &[Look]) -> Result<Vec<Terminal>, GrammarError> {
        looks
            .iter()
            .map(|look| match look {
                Look::Literal(text) if text.is_empty() => Err(GrammarError::EmptyLiteral {
                    rule: owner.to_string(),
                }),
                Look::Literal(text) => Ok(Terminal::Literal(text.clone())),
                Look::Range(lo, hi) => Ok(Terminal::Class(CharClass::range(*lo, *hi))),
                Look::Ref(name) => self
                    .rules
                    .rule_class(name, &mut Vec::new())
                    .map(Terminal::Class)
                    .ok_or_else(|| GrammarError::NotACharClass {
                        rule: owner.to_string(),
                        target: name.clone(),
                    }),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolKind;

    #[test]
    fn compiles_rules_and_generates_helpers() {
        let grammar = compile(
            r#"
            %start list
            list = "[" [ item *( "," item ) ] "]" ;
            @token item = 1*DIGIT ;
            @inline DIGIT = %x30-39 ;
            "#,
        )
        .unwrap();

        assert_eq!(grammar.start_name(), "list");
        let names: Vec<&str> = grammar.nonterminals.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"item"));
        assert!(names.contains(&"list~1"));
        // DIGIT reduces to a class and is substituted, never emitted
        assert!(!names.contains(&"DIGIT"));

        let item = grammar.nonterminal_id("item").unwrap();
        let production = &grammar.productions[grammar.nonterminals[item].productions[0]];
        assert!(matches!(
            &production.symbols[0].kind,
            SymbolKind::Terminal(Terminal::Class(class)) if class.contains('5')
        ));
        let repeat = match production.symbols[1].kind {
            SymbolKind::Nonterminal(id) => id,
            _ => panic!("expected a repeat helper"),
        };
        assert_eq!(grammar.nonterminals[repeat].kind, NodeKind::Repeat);
        assert_eq!(grammar.nonterminals[repeat].owner(), "item");
    }

    #[test]
    fn helper_numbering_is_deterministic() {
        let source = "%start s\ns = *\"a\" [ \"b\" ] *( \"c\" \"d\" ) ;";
        assert_eq!(compile(source).unwrap(), compile(source).unwrap());
    }

    #[test]
    fn rejects_undefined_references() {
        let err = compile("%start s\ns = t ;").unwrap_err();
        assert!(matches!(
            err,
            GrammarError::UndefinedNonterminal { ref rule, ref reference } if rule == "s" && reference == "t"
        ));
    }

    #[test]
    fn rejects_unreachable_rules() {
        let err = compile("%start s\ns = \"a\" ;\nt = \"b\" ;").unwrap_err();
        assert!(matches!(err, GrammarError::Unreachable { ref rule } if rule == "t"));
    }

    #[test]
    fn rejects_empty_rules() {
        let err = compile("%start s\ns = ;").unwrap_err();
        assert!(matches!(err, GrammarError::EmptyAlternatives { ref rule } if rule == "s"));
    }

    #[test]
    fn rejects_duplicates_and_unknown_start() {
        assert!(matches!(
            compile("%start s\ns = \"a\" ;\ns = \"b\" ;"),
            Err(GrammarError::DuplicateRule { .. })
        ));
        assert!(matches!(
            compile("%start nope\ns = \"a\" ;"),
            Err(GrammarError::UnknownStart { .. })
        ));
        assert!(matches!(compile("s = \"a\" ;"), Err(GrammarError::MissingStart)));
    }

    #[test]
    fn rejects_bad_exclusions_and_restrictions() {
        assert!(matches!(
            compile("%start s\ns = 1*%x61-7A - word ;\nword = 1*\"a\" ;"),
            Err(GrammarError::NotALiteralSet { .. })
        ));
        assert!(matches!(
            compile("%start s\ns = \"a\" !t ;\nt = \"bc\" ;"),
            Err(GrammarError::NotACharClass { .. })
        ));
    }

    #[test]
    fn rejects_nullable_repetition() {
        let err = compile("%start s\ns = *e ;\ne = [ \"a\" ] ;").unwrap_err();
        assert!(matches!(err, GrammarError::NullableRepetition { ref rule } if rule == "s"));
    }

    #[test]
    fn notation_errors_point_into_the_source() {
        let err = compile("%start s\ns = \"a\" \n").unwrap_err();
        assert!(matches!(err, GrammarError::Notation { .. }));
        assert!(matches!(
            compile("%start s\ns = %xD800 ;"),
            Err(GrammarError::Notation { .. })
        ));
    }

    #[test]
    fn exclusions_resolve_through_rule_references() {
        let grammar = compile(
            "%start s\ns = 1*%x61-7A !%x61-7A - reserved ;\nreserved = kw / \"z\" ;\nkw = \"if\" / \"in\" ;",
        )
        .unwrap();
        let s = &grammar.productions[grammar.nonterminals[grammar.start].productions[0]];
        assert_eq!(s.exclude, vec!["if", "in", "z"]);
    }

    #[test]
    fn lint_flags_open_ended_tokens() {
        let warnings = lint("%start s\n@token s = 1*\"a\" ;").unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("`s`"));
        assert!(lint("%start s\n@token s = 1*\"a\" !\"a\" ;").unwrap().is_empty());
    }
}

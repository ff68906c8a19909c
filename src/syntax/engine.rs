//! Scannerless Earley parser over a `GrammarDefinition`.
//!
//! Recognition works on characters, with multi-character literal terminals,
//! follow restrictions checked whenever a symbol is passed, and exclusions
//! checked on completion. Nullable nonterminals are handled with the
//! Aycock-Horspool prediction rule.
//!
//! Tree extraction counts derivations per `(nonterminal, span)` with
//! saturating arithmetic. Silent and token nodes count as one derivation
//! because their inner shape never reaches the tree. More than one counted
//! derivation for a node that is materialized is reported as ambiguity.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{ParseTree, Span};
use crate::errors::{GrammarError, ParseError, SourceContext, SyntaxError};
use crate::grammar::{
    CharClass, GrammarDefinition, NodeKind, NonterminalId, ProductionId, SymbolKind, Terminal,
};

/// Default bound on tree extraction recursion.
pub const DEFAULT_MAX_TREE_DEPTH: usize = 4096;

/// Minimum stack space to reserve before recursive calls (32 KB).
const MIN_STACK_RED_ZONE: usize = 32 * 1024;

/// Stack size to grow to when running low (1 MB).
const STACK_GROWTH_SIZE: usize = 1024 * 1024;

// ============================================================================
// PREPARED GRAMMAR
// ============================================================================

#[derive(Debug, Clone)]
enum Matcher {
    Literal(Vec<char>),
    Class(CharClass),
}

impl Matcher {
    fn from_terminal(terminal: &Terminal) -> Self {
        match terminal {
            Terminal::Literal(text) => Matcher::Literal(text.chars().collect()),
            Terminal::Class(class) => Matcher::Class(class.clone()),
        }
    }

    /// End position if this terminal matches `input` at `pos`.
    fn match_at(&self, input: &[char], pos: usize) -> Option<usize> {
        match self {
            Matcher::Literal(chars) => {
                let end = pos + chars.len();
                (end <= input.len() && input[pos..end] == chars[..]).then_some(end)
            }
            Matcher::Class(class) => match input.get(pos) {
                Some(&c) if class.contains(c) => Some(pos + 1),
                _ => None,
            },
        }
    }

    /// Start position if this terminal matches `input` ending at `end`.
    fn match_before(&self, input: &[char], end: usize) -> Option<usize> {
        match self {
            Matcher::Literal(chars) => {
                let start = end.checked_sub(chars.len())?;
                (input[start..end] == chars[..]).then_some(start)
            }
            Matcher::Class(class) => {
                let start = end.checked_sub(1)?;
                class.contains(input[start]).then_some(start)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Step {
    Scan(Matcher),
    Call(NonterminalId),
}

#[derive(Debug, Clone)]
struct PreparedSymbol {
    step: Step,
    not_followed_by: Vec<Matcher>,
}

/// A grammar prepared for parsing. Immutable and shareable across threads.
#[derive(Debug, Clone)]
pub struct Engine {
    grammar: GrammarDefinition,
    names: Vec<Arc<str>>,
    symbols: Vec<Vec<PreparedSymbol>>,
    nullable: Vec<bool>,
    max_tree_depth: usize,
}

// ============================================================================
// PUBLIC API
// ============================================================================

impl Engine {
    pub fn new(grammar: GrammarDefinition) -> Result<Self, GrammarError> {
        grammar.validate()?;
        let names = grammar
            .nonterminals
            .iter()
            .map(|nt| Arc::from(nt.owner()))
            .collect();
        let symbols = grammar
            .productions
            .iter()
            .map(|production| {
                production
                    .symbols
                    .iter()
                    .map(|symbol| PreparedSymbol {
                        step: match &symbol.kind {
                            SymbolKind::Terminal(terminal) => Step::Scan(Matcher::from_terminal(terminal)),
                            SymbolKind::Nonterminal(id) => Step::Call(*id),
                        },
                        not_followed_by: symbol.not_followed_by.iter().map(Matcher::from_terminal).collect(),
                    })
                    .collect()
            })
            .collect();
        let nullable = grammar.nullable();
        Ok(Self {
            grammar,
            names,
            symbols,
            nullable,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        })
    }

    /// Whether the text of `start..end` is one of the production's excluded words.
    fn excluded(&self, production: ProductionId, input: &[char], start: usize, end: usize) -> bool {
        let exclude = &self.grammar.productions[production].exclude;
        if exclude.is_empty() {
            return false;
        }
        let text = &input[start..end];
        exclude
            .iter()
            .any(|word| word.chars().eq(text.iter().copied()))
    }

    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    pub fn grammar(&self) -> &GrammarDefinition {
        &self.grammar
    }

    /// Parse `input` from the grammar's start rule.
    pub fn parse(&self, input: &str) -> Result<ParseTree, ParseError> {
        self.parse_source(&SourceContext::anonymous(input), self.grammar.start)
    }

    /// Parse `input` from a named rule.
    pub fn parse_from(&self, input: &str, start: &str) -> Result<ParseTree, ParseError> {
        let start = self
            .grammar
            .nonterminal_id(start)
            .ok_or_else(|| GrammarError::UnknownStart {
                rule: start.to_string(),
            })?;
        self.parse_source(&SourceContext::anonymous(input), start)
    }

    pub fn parse_source(
        &self,
        source: &SourceContext,
        start: NonterminalId,
    ) -> Result<ParseTree, ParseError> {
        let input: Vec<char> = source.content.chars().collect();
        let mut offsets: Vec<usize> = source.content.char_indices().map(|(i, _)| i).collect();
        offsets.push(source.content.len());

        let chart = Recognizer::new(self, &input, &offsets).run(start);
        let accepted = self.grammar.nonterminals[start]
            .productions
            .iter()
            .any(|&p| chart.completed(self, p, 0, input.len()) && !self.excluded(p, &input, 0, input.len()));
        if !accepted {
            let furthest = chart.furthest;
            let expected = chart.expected_at(self, furthest);
            debug!(offset = offsets[furthest], "syntax error");
            return Err(SyntaxError::new(source, offsets[furthest], expected).into());
        }
        trace!(
            items = chart.sets.iter().map(|s| s.items.len()).sum::<usize>(),
            "recognized input"
        );

        let index = CompletionIndex::build(self, &chart, &input);
        let mut forest = Forest {
            engine: self,
            input: &input,
            offsets: &offsets,
            chart: &chart,
            index: &index,
            counts: HashMap::new(),
            prefixes: HashMap::new(),
            repeats_done: HashSet::new(),
        };
        let mut roots = forest.build_nonterminal(start, 0, input.len(), 0)?;
        match roots.len() {
            1 => Ok(roots.remove(0)),
            _ => Ok(ParseTree::node(
                self.names[start].clone(),
                Span::new(0, source.content.len()),
                roots,
            )),
        }
    }
}

// ============================================================================
// RECOGNIZER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Item {
    production: u32,
    dot: u32,
    origin: u32,
}

impl Item {
    fn new(production: ProductionId, dot: usize, origin: usize) -> Self {
        Self {
            production: production as u32,
            dot: dot as u32,
            origin: origin as u32,
        }
    }

    fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }
}

#[derive(Debug, Default)]
struct EarleySet {
    items: Vec<Item>,
    seen: HashSet<Item>,
    /// Items whose next symbol is the keyed nonterminal.
    waiting: HashMap<NonterminalId, Vec<Item>>,
}

struct Chart {
    sets: Vec<EarleySet>,
    furthest: usize,
}

impl Chart {
    fn contains(&self, pos: usize, item: Item) -> bool {
        self.sets[pos].seen.contains(&item)
    }

    fn completed(&self, engine: &Engine, production: ProductionId, origin: usize, end: usize) -> bool {
        let len = engine.symbols[production].len();
        self.contains(end, Item::new(production, len, origin))
    }

    /// Owner rule names of items that were waiting on a terminal at `pos`.
    fn expected_at(&self, engine: &Engine, pos: usize) -> Vec<String> {
        let mut visible = Vec::new();
        let mut silent = Vec::new();
        for item in &self.sets[pos].items {
            let scanning = matches!(
                engine.symbols[item.production as usize].get(item.dot as usize),
                Some(PreparedSymbol {
                    step: Step::Scan(_),
                    ..
                })
            );
            if !scanning {
                continue;
            }
            let lhs = engine.grammar.productions[item.production as usize].lhs;
            let name = engine.names[lhs].to_string();
            match engine.grammar.nonterminals[lhs].kind {
                NodeKind::Silent => silent.push(name),
                _ => visible.push(name),
            }
        }
        let mut names = if visible.is_empty() { silent } else { visible };
        names.sort();
        names.dedup();
        names
    }
}

struct Recognizer<'e> {
    engine: &'e Engine,
    input: &'e [char],
    offsets: &'e [usize],
    sets: Vec<EarleySet>,
}

impl<'e> Recognizer<'e> {
    fn new(engine: &'e Engine, input: &'e [char], offsets: &'e [usize]) -> Self {
        let sets = (0..=input.len()).map(|_| EarleySet::default()).collect();
        Self {
            engine,
            input,
            offsets,
            sets,
        }
    }

    fn add(&mut self, pos: usize, item: Item) {
        let set = &mut self.sets[pos];
        if !set.seen.insert(item) {
            return;
        }
        if let Some(PreparedSymbol {
            step: Step::Call(next),
            ..
        }) = self.engine.symbols[item.production as usize].get(item.dot as usize)
        {
            set.waiting.entry(*next).or_default().push(item);
        }
        set.items.push(item);
    }

    fn follow_allowed(&self, symbol: &PreparedSymbol, pos: usize) -> bool {
        symbol
            .not_followed_by
            .iter()
            .all(|look| look.match_at(self.input, pos).is_none())
    }

    fn run(mut self, start: NonterminalId) -> Chart {
        let engine = self.engine;
        for &p in &engine.grammar.nonterminals[start].productions {
            self.add(0, Item::new(p, 0, 0));
        }

        let mut furthest = 0;
        for pos in 0..=self.input.len() {
            if self.sets[pos].items.is_empty() {
                continue;
            }
            furthest = pos;
            let mut next = 0;
            while next < self.sets[pos].items.len() {
                let item = self.sets[pos].items[next];
                next += 1;
                match engine.symbols[item.production as usize].get(item.dot as usize) {
                    Some(symbol) => match &symbol.step {
                        Step::Call(callee) => {
                            for &p in &engine.grammar.nonterminals[*callee].productions {
                                self.add(pos, Item::new(p, 0, pos));
                            }
                            if engine.nullable[*callee] && self.follow_allowed(symbol, pos) {
                                self.add(pos, item.advance());
                            }
                        }
                        Step::Scan(matcher) => {
                            if let Some(end) = matcher.match_at(self.input, pos) {
                                if self.follow_allowed(symbol, end) {
                                    self.add(end, item.advance());
                                }
                            }
                        }
                    },
                    None => self.complete(pos, item),
                }
            }
        }
        Chart {
            sets: self.sets,
            furthest,
        }
    }

    fn complete(&mut self, pos: usize, item: Item) {
        let engine = self.engine;
        let production = &engine.grammar.productions[item.production as usize];
        let origin = item.origin as usize;
        if engine.excluded(item.production as usize, self.input, origin, pos) {
            return;
        }
        let waiting = self.sets[origin]
            .waiting
            .get(&production.lhs)
            .cloned()
            .unwrap_or_default();
        for parent in waiting {
            let symbol = &engine.symbols[parent.production as usize][parent.dot as usize];
            if self.follow_allowed(symbol, pos) {
                self.add(pos, parent.advance());
            }
        }
        trace!(
            rule = %engine.names[production.lhs],
            start = self.offsets[origin],
            end = self.offsets[pos],
            "completed"
        );
    }
}

// ============================================================================
// DERIVATION COUNTING AND TREE EXTRACTION
// ============================================================================

/// Completed `(nonterminal, start, end)` spans, indexed by end.
struct CompletionIndex {
    starts: HashMap<(NonterminalId, usize), Vec<usize>>,
    ends: HashMap<(NonterminalId, usize), Vec<usize>>,
    completed: HashSet<(NonterminalId, usize, usize)>,
}

impl CompletionIndex {
    fn build(engine: &Engine, chart: &Chart, input: &[char]) -> Self {
        let mut index = CompletionIndex {
            starts: HashMap::new(),
            ends: HashMap::new(),
            completed: HashSet::new(),
        };
        for (end, set) in chart.sets.iter().enumerate() {
            for item in &set.items {
                let production = item.production as usize;
                if (item.dot as usize) < engine.symbols[production].len() {
                    continue;
                }
                let lhs = engine.grammar.productions[production].lhs;
                let start = item.origin as usize;
                if !engine.excluded(production, input, start, end) && index.completed.insert((lhs, start, end)) {
                    index.starts.entry((lhs, end)).or_default().push(start);
                    index.ends.entry((lhs, start)).or_default().push(end);
                }
            }
        }
        for starts in index.starts.values_mut() {
            starts.sort_unstable();
        }
        index
    }

    fn starts(&self, nonterminal: NonterminalId, end: usize) -> &[usize] {
        self.starts
            .get(&(nonterminal, end))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

fn saturating(n: u32) -> u8 {
    n.min(2) as u8
}

struct Forest<'a> {
    engine: &'a Engine,
    input: &'a [char],
    offsets: &'a [usize],
    chart: &'a Chart,
    index: &'a CompletionIndex,
    counts: HashMap<(NonterminalId, usize, usize), u8>,
    prefixes: HashMap<(ProductionId, usize, usize, usize), u8>,
    repeats_done: HashSet<(NonterminalId, usize)>,
}

impl<'a> Forest<'a> {
    fn guard(&self, depth: usize) -> Result<(), ParseError> {
        if depth > self.engine.max_tree_depth {
            return Err(ParseError::TreeTooDeep {
                limit: self.engine.max_tree_depth,
            });
        }
        Ok(())
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.offsets[start], self.offsets[end])
    }

    fn ambiguous(&self, nonterminal: NonterminalId, start: usize, end: usize) -> ParseError {
        GrammarError::Ambiguous {
            rule: self.engine.names[nonterminal].to_string(),
            span: self.span(start, end),
        }
        .into()
    }

    /// Number of distinct tree shapes for `nonterminal` over `start..end`, capped at 2.
    fn count(&mut self, nonterminal: NonterminalId, start: usize, end: usize, depth: usize) -> Result<u8, ParseError> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.count_impl(nonterminal, start, end, depth)
        })
    }

    fn count_impl(&mut self, nonterminal: NonterminalId, start: usize, end: usize, depth: usize) -> Result<u8, ParseError> {
        if !self.index.completed.contains(&(nonterminal, start, end)) {
            return Ok(0);
        }
        if let Some(&n) = self.counts.get(&(nonterminal, start, end)) {
            return Ok(n);
        }
        self.guard(depth)?;
        let n = match self.engine.grammar.nonterminals[nonterminal].kind {
            NodeKind::Silent | NodeKind::Token => 1,
            NodeKind::Repeat => {
                self.fill_repeat(nonterminal, start, depth)?;
                return Ok(self.counts.get(&(nonterminal, start, end)).copied().unwrap_or(0));
            }
            NodeKind::Normal | NodeKind::Inline => {
                // A derivation of this span through itself contributes nothing.
                self.counts.insert((nonterminal, start, end), 0);
                let mut total = 0u32;
                for &p in &self.engine.grammar.nonterminals[nonterminal].productions {
                    if self.engine.excluded(p, self.input, start, end) {
                        continue;
                    }
                    let len = self.engine.symbols[p].len();
                    total += self.prefix(p, len, start, end, depth + 1)? as u32;
                    if total >= 2 {
                        break;
                    }
                }
                saturating(total)
            }
        };
        self.counts.insert((nonterminal, start, end), n);
        Ok(n)
    }

    /// Ways the first `dot` symbols of `production` (started at `start`) span `start..end`.
    fn prefix(&mut self, production: ProductionId, dot: usize, start: usize, end: usize, depth: usize) -> Result<u8, ParseError> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.prefix_impl(production, dot, start, end, depth)
        })
    }

    fn prefix_impl(&mut self, production: ProductionId, dot: usize, start: usize, end: usize, depth: usize) -> Result<u8, ParseError> {
        if dot == 0 {
            return Ok((start == end) as u8);
        }
        if !self.chart.contains(end, Item::new(production, dot, start)) {
            return Ok(0);
        }
        let key = (production, dot, start, end);
        if let Some(&n) = self.prefixes.get(&key) {
            return Ok(n);
        }
        self.guard(depth)?;
        self.prefixes.insert(key, 0);
        let engine = self.engine;
        let n = match &engine.symbols[production][dot - 1].step {
            Step::Scan(matcher) => match matcher.match_before(self.input, end) {
                Some(before) if before >= start => self.prefix(production, dot - 1, start, before, depth + 1)?,
                _ => 0,
            },
            Step::Call(callee) => {
                let mut total = 0u32;
                for &mid in self.index.starts(*callee, end) {
                    if mid < start {
                        continue;
                    }
                    // The part before `mid` is checked first: for a right
                    // recursive rule it rules out the span being counted.
                    let before = self.prefix(production, dot - 1, start, mid, depth + 1)?;
                    if before == 0 {
                        continue;
                    }
                    let inner = self.count(*callee, mid, end, depth + 1)?;
                    total += inner as u32 * before as u32;
                    if total >= 2 {
                        break;
                    }
                }
                saturating(total)
            }
        };
        self.prefixes.insert(key, n);
        Ok(n)
    }

    /// Counts for every end of a repeat helper started at `start`, computed
    /// left to right so long repetitions do not recurse.
    fn fill_repeat(&mut self, repeat: NonterminalId, start: usize, depth: usize) -> Result<(), ParseError> {
        if !self.repeats_done.insert((repeat, start)) {
            return Ok(());
        }
        let ends = self.index.ends.get(&(repeat, start)).cloned().unwrap_or_default();
        let recursive = self.engine.grammar.nonterminals[repeat].productions[0];
        let engine = self.engine;
        let element = engine.symbols[recursive][1].step.clone();

        let mut ways: HashMap<usize, u8> = HashMap::new();
        let mut sorted = ends;
        sorted.sort_unstable();
        for end in sorted {
            let n = if end == start {
                1
            } else if !self.chart.contains(end, Item::new(recursive, 2, start)) {
                0
            } else {
                match &element {
                    Step::Scan(matcher) => match matcher.match_before(self.input, end) {
                        Some(before) if before >= start => ways.get(&before).copied().unwrap_or(0),
                        _ => 0,
                    },
                    Step::Call(callee) => {
                        let mut total = 0u32;
                        for &mid in self.index.starts(*callee, end) {
                            if mid < start {
                                continue;
                            }
                            let before = ways.get(&mid).copied().unwrap_or(0);
                            if before == 0 {
                                continue;
                            }
                            total += before as u32 * self.count(*callee, mid, end, depth + 1)? as u32;
                            if total >= 2 {
                                break;
                            }
                        }
                        saturating(total)
                    }
                }
            };
            ways.insert(end, n);
            self.counts.insert((repeat, start, end), n);
        }
        Ok(())
    }

    fn build_nonterminal(&mut self, nonterminal: NonterminalId, start: usize, end: usize, depth: usize) -> Result<Vec<ParseTree>, ParseError> {
        stacker::maybe_grow(MIN_STACK_RED_ZONE, STACK_GROWTH_SIZE, || {
            self.build_nonterminal_impl(nonterminal, start, end, depth)
        })
    }

    fn build_nonterminal_impl(&mut self, nonterminal: NonterminalId, start: usize, end: usize, depth: usize) -> Result<Vec<ParseTree>, ParseError> {
        self.guard(depth)?;
        let engine = self.engine;
        let name = &engine.names[nonterminal];
        match engine.grammar.nonterminals[nonterminal].kind {
            NodeKind::Silent => Ok(Vec::new()),
            NodeKind::Token => {
                let text: String = self.input[start..end].iter().collect();
                Ok(vec![ParseTree::leaf(name.clone(), self.span(start, end), text)])
            }
            NodeKind::Repeat => self.build_repeat(nonterminal, start, end, depth),
            kind @ (NodeKind::Normal | NodeKind::Inline) => {
                let mut chosen = None;
                for &p in &engine.grammar.nonterminals[nonterminal].productions {
                    if engine.excluded(p, self.input, start, end) {
                        continue;
                    }
                    let len = engine.symbols[p].len();
                    let n = self.prefix(p, len, start, end, depth + 1)?;
                    if n == 0 {
                        continue;
                    }
                    if n > 1 || chosen.is_some() {
                        return Err(self.ambiguous(nonterminal, start, end));
                    }
                    chosen = Some(p);
                }
                let production = chosen.ok_or_else(|| self.ambiguous(nonterminal, start, end))?;
                let children = self.build_production(production, start, end, depth + 1)?;
                if kind == NodeKind::Inline {
                    return Ok(children);
                }
                let span = self.span(start, end);
                if children.is_empty() {
                    let text: String = self.input[start..end].iter().collect();
                    Ok(vec![ParseTree::leaf(name.clone(), span, text)])
                } else {
                    Ok(vec![ParseTree::node(name.clone(), span, children)])
                }
            }
        }
    }

    fn build_production(&mut self, production: ProductionId, start: usize, end: usize, depth: usize) -> Result<Vec<ParseTree>, ParseError> {
        let engine = self.engine;
        let lhs = engine.grammar.productions[production].lhs;
        let mut parts: Vec<Vec<ParseTree>> = Vec::new();
        let mut pos = end;
        for dot in (1..=engine.symbols[production].len()).rev() {
            match &engine.symbols[production][dot - 1].step {
                Step::Scan(matcher) => {
                    pos = matcher
                        .match_before(self.input, pos)
                        .ok_or_else(|| self.ambiguous(lhs, start, end))?;
                }
                Step::Call(callee) => {
                    let mut chosen = None;
                    for &mid in self.index.starts(*callee, pos) {
                        if mid < start {
                            continue;
                        }
                        if self.prefix(production, dot - 1, start, mid, depth + 1)? == 0
                            || self.count(*callee, mid, pos, depth + 1)? == 0
                        {
                            continue;
                        }
                        if chosen.is_some() {
                            return Err(self.ambiguous(lhs, start, end));
                        }
                        chosen = Some(mid);
                    }
                    let mid = chosen.ok_or_else(|| self.ambiguous(lhs, start, end))?;
                    parts.push(self.build_nonterminal(*callee, mid, pos, depth + 1)?);
                    pos = mid;
                }
            }
        }
        Ok(parts.into_iter().rev().flatten().collect())
    }

    fn build_repeat(&mut self, repeat: NonterminalId, start: usize, end: usize, depth: usize) -> Result<Vec<ParseTree>, ParseError> {
        self.fill_repeat(repeat, start, depth)?;
        let engine = self.engine;
        let recursive = engine.grammar.nonterminals[repeat].productions[0];
        let element = engine.symbols[recursive][1].step.clone();
        let mut parts: Vec<Vec<ParseTree>> = Vec::new();
        let mut pos = end;
        while pos > start {
            match &element {
                Step::Scan(matcher) => {
                    pos = matcher
                        .match_before(self.input, pos)
                        .ok_or_else(|| self.ambiguous(repeat, start, end))?;
                }
                Step::Call(callee) => {
                    let mut chosen = None;
                    for &mid in self.index.starts(*callee, pos) {
                        if mid < start || self.counts.get(&(repeat, start, mid)).copied().unwrap_or(0) == 0 {
                            continue;
                        }
                        if self.count(*callee, mid, pos, depth + 1)? == 0 {
                            continue;
                        }
                        if chosen.is_some() {
                            return Err(self.ambiguous(repeat, start, end));
                        }
                        chosen = Some(mid);
                    }
                    let mid = chosen.ok_or_else(|| self.ambiguous(repeat, start, end))?;
                    parts.push(self.build_nonterminal(*callee, mid, pos, depth + 1)?);
                    pos = mid;
                }
            }
        }
        Ok(parts.into_iter().rev().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::compile;

    fn engine(source: &str) -> Engine {
        Engine::new(compile(source).unwrap()).unwrap()
    }

    #[test]
    fn parses_the_whole_input() {
        let engine = engine("%start s\ns = \"a\" b ;\n@token b = \"b\" ;");
        let tree = engine.parse("ab").unwrap();
        assert_eq!(tree.rule(), "s");
        assert_eq!(tree.span, Span::new(0, 2));
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].text(), Some("b"));
    }

    #[test]
    fn trailing_input_is_a_syntax_error() {
        let engine = engine("%start s\ns = \"a\" b ;\nb = \"b\" ;");
        match engine.parse("abb") {
            Err(ParseError::Syntax(err)) => {
                assert_eq!(err.offset, 2);
                assert_eq!(err.column, 3);
            }
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn syntax_error_lists_expected_rules() {
        let engine = engine("%start s\ns = \"a\" b ;\nb = \"b\" ;");
        match engine.parse("ac") {
            Err(ParseError::Syntax(err)) => {
                assert_eq!(err.offset, 1);
                assert_eq!(err.expected, vec!["b".to_string()]);
            }
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[test]
    fn reports_ambiguous_grammars() {
        let engine = engine("%start e\ne = e \"+\" e / \"a\" ;");
        assert!(engine.parse("a+a").is_ok());
        assert!(matches!(
            engine.parse("a+a+a"),
            Err(ParseError::Grammar(GrammarError::Ambiguous { ref rule, .. })) if rule == "e"
        ));
    }

    #[test]
    fn follow_restrictions_enforce_longest_match() {
        let loose = engine("%start s\ns = 1*word ;\n@token word = 1*%x61-7A ;");
        assert!(matches!(
            loose.parse("abc"),
            Err(ParseError::Grammar(GrammarError::Ambiguous { .. }))
        ));

        let strict = engine("%start s\ns = 1*word ;\n@token word = 1*%x61-7A !%x61-7A ;");
        let tree = strict.parse("abc").unwrap();
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].text(), Some("abc"));
    }

    #[test]
    fn exclusions_reject_reserved_words() {
        let engine = engine(
            "%start s\n@token s = 1*%x61-7A !%x61-7A - keyword ;\nkeyword = \"if\" / \"in\" ;",
        );
        assert!(matches!(engine.parse("if"), Err(ParseError::Syntax(_))));
        assert_eq!(engine.parse("iff").unwrap().text(), Some("iff"));
    }

    #[test]
    fn silent_rules_hide_internal_ambiguity() {
        let engine = engine("%start s\ns = ws \"x\" ws ;\n@silent ws = *( \" \" / \"  \" ) ;");
        let tree = engine.parse("  x ").unwrap();
        assert_eq!(tree.text(), Some("  x "));
    }

    #[test]
    fn repetition_children_are_spliced_in_order() {
        let engine = engine("%start list\nlist = item *( \",\" item ) ;\n@token item = %x30-39 ;");
        let tree = engine.parse("1,2,3").unwrap();
        let items: Vec<&str> = tree.children().iter().filter_map(ParseTree::text).collect();
        assert_eq!(items, vec!["1", "2", "3"]);
    }

    #[test]
    fn parse_from_selects_a_start_rule() {
        let engine = engine("%start s\ns = b b ;\n@token b = \"b\" ;");
        assert_eq!(engine.parse_from("b", "b").unwrap().text(), Some("b"));
        assert!(matches!(
            engine.parse_from("b", "missing"),
            Err(ParseError::Grammar(GrammarError::UnknownStart { .. }))
        ));
    }

    #[test]
    fn spans_are_byte_offsets() {
        let engine = engine("%start s\ns = \"λ\" b ;\n@token b = \"x\" ;");
        let tree = engine.parse("λx").unwrap();
        assert_eq!(tree.children()[0].span, Span::new(2, 3));
    }

    #[test]
    fn tree_depth_is_bounded() {
        let engine = engine("%start e\ne = \"(\" e \")\" / \"x\" ;").with_max_tree_depth(8);
        let nested = format!("{}x{}", "(".repeat(20), ")".repeat(20));
        assert!(matches!(
            engine.parse(&nested),
            Err(ParseError::TreeTooDeep { limit: 8 })
        ));
        assert!(engine.parse("(x)").is_ok());
    }

    #[test]
    fn right_recursive_rules_terminate() {
        let right = engine("%start s\ns = \"x\" s / \"y\" ;");
        let tree = right.parse("xxy").unwrap();
        assert_eq!(tree.rule(), "s");
        assert_eq!(tree.children().len(), 1);
        assert_eq!(tree.children()[0].children().len(), 1);

        let infix = engine("%start e\ne = t \"+\" e / t ;\n@token t = \"a\" ;");
        let tree = infix.parse("a+a+a").unwrap();
        assert_eq!(tree.children().len(), 2);
    }

    #[test]
    fn deep_trees_do_not_exhaust_the_stack() {
        let engine = engine("%start e\ne = \"(\" e \")\" / \"x\" ;").with_max_tree_depth(1_000_000);
        let nested = format!("{}x{}", "(".repeat(2000), ")".repeat(2000));
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || engine.parse(&nested).map(|tree| tree.span.end))
            .unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), 4001);
    }
}

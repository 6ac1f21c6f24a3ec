//! Expansion of a regular-expression pattern into every string it matches.
//!
//! Character classes are restricted to a fixed alphabet and unbounded
//! repetitions are cut off at a maximum depth, so the candidate set is always
//! finite. Candidates are produced lazily in a deterministic order.

use regex_syntax::{
    hir::{Class, Hir, HirKind},
    Parser,
};
use std::iter;
use thiserror::Error;

pub const DEFAULT_ALPHABET: &str = "[a-z0-9]";
pub const DEFAULT_MAX_REPEAT: u32 = 3;

const MAX_ALPHABET_LEN: usize = 4096;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("Invalid pattern: {0}")]
    Syntax(#[from] Box<regex_syntax::Error>),
    #[error("Alphabet must be a single character class, got: {0}")]
    AlphabetNotClass(String),
    #[error("Alphabet {0} has no characters")]
    EmptyAlphabet(String),
    #[error("Alphabet {0} has more than {max} characters", max = MAX_ALPHABET_LEN)]
    AlphabetTooLarge(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Literal(String),
    Set(Vec<char>),
    Concat(Vec<Node>),
    Alternation(Vec<Node>),
    Repeat { sub: Box<Node>, min: u32, max: u32 },
}

type Strings<'a> = Box<dyn Iterator<Item = String> + Send + 'a>;

impl Node {
    fn count(&self) -> u64 {
        match self {
            Node::Literal(_) => 1,
            Node::Set(chars) => chars.len() as u64,
            Node::Concat(parts) => parts.iter().fold(1u64, |acc, n| acc.saturating_mul(n.count())),
            Node::Alternation(branches) => branches.iter().fold(0u64, |acc, n| acc.saturating_add(n.count())),
            Node::Repeat { sub, min, max } => {
                let per = sub.count();
                (*min..=*max).fold(0u64, |acc, k| acc.saturating_add(per.saturating_pow(k)))
            }
        }
    }

    fn strings(&self) -> Strings<'_> {
        match self {
            Node::Literal(s) => Box::new(iter::once(s.clone())),
            Node::Set(chars) => Box::new(chars.iter().map(|c| c.to_string())),
            Node::Concat(parts) => concat(parts),
            Node::Alternation(branches) => Box::new(branches.iter().flat_map(|n| n.strings())),
            Node::Repeat { sub, min, max } => Box::new((*min..=*max).flat_map(move |k| repeat(sub, k))),
        }
    }
}

fn concat(parts: &[Node]) -> Strings<'_> {
    match parts.split_first() {
        None => Box::new(iter::once(String::new())),
        Some((first, rest)) => Box::new(
            first
                .strings()
                .flat_map(move |head| concat(rest).map(move |tail| format!("{head}{tail}"))),
        ),
    }
}

fn repeat(sub: &Node, times: u32) -> Strings<'_> {
    if times == 0 {
        return Box::new(iter::once(String::new()));
    }
    Box::new(
        sub.strings()
            .flat_map(move |head| repeat(sub, times - 1).map(move |tail| format!("{head}{tail}"))),
    )
}

#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    root: Node,
}

impl Pattern {
    pub fn parse(pattern: &str, alphabet: &str, max_repeat: u32) -> Result<Self, PatternError> {
        let alphabet = parse_alphabet(alphabet)?;
        let hir = Parser::new().parse(pattern).map_err(Box::new)?;
        let root = lower(&hir, &alphabet, max_repeat);
        Ok(Self { source: pattern.to_string(), root })
    }

    pub fn with_defaults(pattern: &str) -> Result<Self, PatternError> {
        Self::parse(pattern, DEFAULT_ALPHABET, DEFAULT_MAX_REPEAT)
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Number of candidates `candidates()` yields, saturating at `u64::MAX`.
    pub fn count(&self) -> u64 {
        self.root.count()
    }

    pub fn candidates(&self) -> impl Iterator<Item = String> + Send + '_ {
        self.root.strings()
    }
}

fn parse_alphabet(alphabet: &str) -> Result<Vec<char>, PatternError> {
    let hir = Parser::new().parse(alphabet).map_err(Box::new)?;
    let chars = match hir.kind() {
        HirKind::Class(Class::Unicode(class)) => {
            let size: usize = class
                .ranges()
                .iter()
                .map(|r| (r.end() as usize).saturating_sub(r.start() as usize) + 1)
                .sum();
            if size > MAX_ALPHABET_LEN {
                return Err(PatternError::AlphabetTooLarge(alphabet.to_string()));
            }
            class.ranges().iter().flat_map(|r| r.start()..=r.end()).collect::<Vec<_>>()
        }
        HirKind::Class(Class::Bytes(class)) => class
            .ranges()
            .iter()
            .flat_map(|r| r.start()..=r.end())
            .map(char::from)
            .collect(),
        // A single-character alphabet parses as a literal.
        HirKind::Literal(lit) if String::from_utf8_lossy(&lit.0).chars().count() == 1 => {
            String::from_utf8_lossy(&lit.0).chars().collect()
        }
        _ => return Err(PatternError::AlphabetNotClass(alphabet.to_string())),
    };

    if chars.is_empty() {
        return Err(PatternError::EmptyAlphabet(alphabet.to_string()));
    }
    Ok(chars)
}

fn lower(hir: &Hir, alphabet: &[char], max_repeat: u32) -> Node {
    match hir.kind() {
        HirKind::Empty | HirKind::Look(_) => Node::Literal(String::new()),
        HirKind::Literal(lit) => Node::Literal(String::from_utf8_lossy(&lit.0).into_owned()),
        HirKind::Class(class) => Node::Set(alphabet.iter().copied().filter(|c| class_contains(class, *c)).collect()),
        HirKind::Repetition(rep) => {
            let max = rep.max.unwrap_or_else(|| rep.min.max(max_repeat));
            Node::Repeat {
                sub: Box::new(lower(&rep.sub, alphabet, max_repeat)),
                min: rep.min,
                max,
            }
        }
        HirKind::Capture(cap) => lower(&cap.sub, alphabet, max_repeat),
        HirKind::Concat(subs) => Node::Concat(subs.iter().map(|h| lower(h, alphabet, max_repeat)).collect()),
        HirKind::Alternation(subs) => Node::Alternation(subs.iter().map(|h| lower(h, alphabet, max_repeat)).collect()),
    }
}

fn class_contains(class: &Class, c: char) -> bool {
    match class {
        Class::Unicode(class) => class.ranges().iter().any(|r| r.start() <= c && c <= r.end()),
        Class::Bytes(class) => u8::try_from(c).is_ok_and(|b| class.ranges().iter().any(|r| r.start() <= b && b <= r.end())),
    }
}

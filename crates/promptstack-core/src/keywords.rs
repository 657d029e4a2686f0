//! Keyword extraction: turns document text into a weighted keyword set.
//!
//! Markdown control constructs are stripped first so that fences, link
//! targets and emphasis markers never surface as keywords. What remains is
//! split on non-alphanumeric boundaries, lower-cased and filtered:
//!
//! - tokens shorter than 3 characters are dropped,
//! - tokens that are mostly digits are dropped,
//! - tokens in [`STOP_WORDS`] are dropped.
//!
//! The resulting [`KeywordSet`] remembers first-occurrence order, which makes
//! [`KeywordSet::top`] deterministic when frequencies tie.

use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

/// Minimum keyword length, in characters.
pub const MIN_KEYWORD_LEN: usize = 3;

/// Common English words plus prompt and code filler that carry no topical signal.
pub const STOP_WORDS: &[&str] = &[
    // English
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "he", "in",
    "is", "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "this",
    "but", "they", "you", "we", "your", "my", "our", "their", "his", "her", "him", "me", "us",
    "them", "what", "which", "who", "whom", "when", "where", "why", "how", "all", "each",
    "every", "both", "few", "more", "most", "other", "some", "such", "no", "nor", "not", "only",
    "own", "same", "so", "than", "too", "very", "can", "just", "should", "now", "do", "does",
    "did", "don", "doesn", "didn", "couldn", "wouldn", "into", "about", "also", "any", "been",
    "being", "could", "would", "then", "there", "these", "those", "here", "out", "over", "use",
    "using", "used", "one", "two",
    // Prompt filler
    "please", "make", "sure", "want", "need", "like", "write", "following", "given", "provide",
    "example", "examples", "output", "input",
    // Code filler
    "code", "function", "method", "class", "variable", "string", "number", "boolean", "array",
    "object", "null", "undefined", "true", "false", "return", "else", "while", "case", "break",
    "continue", "import", "export", "const", "let", "var", "new", "super", "extends", "static",
    "public", "private", "protected", "async", "await", "try", "catch", "finally", "throw",
    "throws", "interface", "type", "enum", "implements", "abstract", "final", "override",
    "package", "struct", "func", "defer", "select", "range", "chan", "map", "append", "len",
    "cap", "copy", "delete", "close", "print", "println", "fmt", "log", "error", "errors",
    "panic", "recover", "self", "impl", "pub", "mut", "use", "mod", "crate",
];

static STOP_WORD_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| STOP_WORDS.iter().copied().collect());

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(```|~~~).*?(?:```|~~~|\z)").expect("static regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]*`").expect("static regex"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("static regex"));
static HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]{0,3}#{1,6}[ \t]+").expect("static regex"));
static LIST_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*(?:[-*+]|\d+[.)])[ \t]+").expect("static regex"));
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[*_~]+").expect("static regex"));

/// Word → frequency map in first-occurrence order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    counts: IndexMap<String, u32>,
}

impl KeywordSet {
    /// An empty keyword set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one occurrence of `word`. The caller is responsible for filtering.
    pub fn insert(&mut self, word: impl Into<String>) {
        *self.counts.entry(word.into()).or_insert(0) += 1;
    }

    /// Frequency of `word`, or 0 when absent.
    pub fn frequency(&self, word: &str) -> u32 {
        self.counts.get(word).copied().unwrap_or(0)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    /// Number of distinct keywords.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Iterate `(keyword, frequency)` in first-occurrence order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(word, count)| (word.as_str(), *count))
    }

    /// The `n` most frequent keywords; ties keep first-occurrence order.
    pub fn top(&self, n: usize) -> Vec<&str> {
        let mut ranked: Vec<(&str, u32)> = self.iter().collect();
        // Stable sort: equal frequencies stay in insertion order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.into_iter().take(n).map(|(word, _)| word).collect()
    }
}

impl<S: Into<String>> FromIterator<S> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeywordSet::new();
        for word in iter {
            set.insert(word);
        }
        set
    }
}

/// Extract the keyword set of a document.
pub fn extract_keywords(text: &str) -> KeywordSet {
    let stripped = strip_markdown(text);
    tokenize(&stripped).filter(|token| is_keyword(token)).collect()
}

/// Remove Markdown control constructs, keeping link text.
pub fn strip_markdown(text: &str) -> String {
    let text = FENCED_CODE.replace_all(text, " ");
    let text = INLINE_CODE.replace_all(&text, " ");
    let text = LINK.replace_all(&text, " $1 ");
    let text = HEADER.replace_all(&text, "");
    let text = LIST_BULLET.replace_all(&text, "");
    EMPHASIS.replace_all(&text, " ").into_owned()
}

/// Lower-cased tokens split on non-alphanumeric boundaries.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn is_keyword(token: &str) -> bool {
    token.chars().count() >= MIN_KEYWORD_LEN
        && !is_mostly_numeric(token)
        && !STOP_WORD_SET.contains(token)
}

fn is_mostly_numeric(token: &str) -> bool {
    let (digits, total) = token.chars().fold((0usize, 0usize), |(digits, total), c| {
        (digits + usize::from(c.is_numeric()), total + 1)
    });
    digits * 2 > total
}

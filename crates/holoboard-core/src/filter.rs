//! Regex filter chain applied to captured output.
//!
//! Filters are written as `pattern=replacement`. They run in order, each one
//! seeing the output of the previous one, and after every replacement runs of
//! blank lines are collapsed into a single line break so that filters which
//! blank out whole lines do not leave gaps on the display.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

use crate::capture::LINE_SEPARATOR;
use crate::error::{Error, Result};

static COLOR_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([0-9a-fk-orA-FK-OR])").expect("valid color code pattern"));

static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\r?\n){2,}").expect("valid blank line pattern"));

/// Normalize a filter half: `\n` escapes become line breaks and `&` color
/// codes become `§` codes.
pub fn normalize(text: &str) -> String {
    let text = text.replace("\\n", LINE_SEPARATOR);
    COLOR_CODE.replace_all(&text, "§$1").into_owned()
}

/// One compiled `pattern=replacement` pair
#[derive(Debug, Clone)]
pub struct Filter {
    definition: String,
    pattern: Regex,
    replacement: String,
}

impl Filter {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self> {
        let normalized = normalize(pattern);
        let compiled = Regex::new(&normalized).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        let definition = if replacement.is_empty() {
            pattern.to_string()
        } else {
            format!("{pattern}={replacement}")
        };

        Ok(Self {
            definition,
            pattern: compiled,
            replacement: normalize(replacement),
        })
    }

    /// Parse `pattern=replacement`; a missing replacement deletes matches.
    pub fn parse(definition: &str) -> Result<Self> {
        match definition.split_once('=') {
            Some((pattern, replacement)) => Self::new(pattern, replacement),
            None => Self::new(definition, ""),
        }
    }

    /// The textual form this filter was built from
    pub fn definition(&self) -> &str {
        &self.definition
    }

    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, self.replacement.as_str())
    }
}

/// Ordered filters; empty means passthrough
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Filter>,
    /// Definitions kept verbatim for a chain that failed to compile
    disabled: Vec<String>,
}

impl FilterChain {
    pub fn new(filters: Vec<Filter>) -> Self {
        Self {
            filters,
            disabled: Vec::new(),
        }
    }

    /// A passthrough chain that still reports `definitions`, so they can be
    /// written back unchanged.
    pub fn disabled<S: AsRef<str>>(definitions: &[S]) -> Self {
        Self {
            filters: Vec::new(),
            disabled: definitions.iter().map(|d| d.as_ref().to_string()).collect(),
        }
    }

    pub fn is_disabled(&self) -> bool {
        !self.disabled.is_empty()
    }

    /// Compile every definition, failing on the first bad pattern.
    pub fn parse<S: AsRef<str>>(definitions: &[S]) -> Result<Self> {
        definitions
            .iter()
            .map(|d| Filter::parse(d.as_ref()))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn apply(&self, text: &str) -> String {
        let mut filtered = text.to_string();
        for filter in &self.filters {
            let replaced = filter.apply(&filtered).into_owned();
            filtered = BLANK_LINES
                .replace_all(&replaced, LINE_SEPARATOR)
                .into_owned();
        }
        filtered
    }

    pub fn definitions(&self) -> Vec<String> {
        if self.is_disabled() {
            return self.disabled.clone();
        }
        self.filters
            .iter()
            .map(|f| f.definition().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NL: &str = LINE_SEPARATOR;

    #[test]
    fn test_empty_chain_is_identity() {
        let chain = FilterChain::default();
        let text = format!("a{NL}{NL}{NL}b{NL}");
        assert_eq!(chain.apply(&text), text);
    }

    #[test]
    fn test_disabled_chain_keeps_definitions() {
        let chain = FilterChain::disabled(&["ok=fine", "([a-z]=x"]);
        assert!(chain.is_disabled());
        assert!(chain.is_empty());
        assert_eq!(chain.apply("ok"), "ok");
        assert_eq!(chain.definitions(), vec!["ok=fine", "([a-z]=x"]);
        assert!(!FilterChain::default().is_disabled());
    }

    #[test]
    fn test_filters_apply_in_order() {
        let chain = FilterChain::parse(&["a=b", "b=c"]).unwrap();
        assert_eq!(chain.apply("a"), "c");

        let swapped = FilterChain::parse(&["b=c", "a=b"]).unwrap();
        assert_eq!(swapped.apply("a"), "b");
    }

    #[test]
    fn test_missing_replacement_deletes() {
        let chain = FilterChain::parse(&["\\s*\\(.*\\)"]).unwrap();
        assert_eq!(chain.apply("Steve (admin)"), "Steve");
    }

    #[test]
    fn test_split_on_first_equals() {
        let filter = Filter::parse("x=a=b").unwrap();
        assert_eq!(filter.apply("x"), "a=b");
        assert_eq!(filter.definition(), "x=a=b");
    }

    #[test]
    fn test_capture_groups_in_replacement() {
        let chain = FilterChain::parse(&["(\\w+): (\\d+)=$2 $1"]).unwrap();
        assert_eq!(chain.apply("Alex: 12"), "12 Alex");
    }

    #[test]
    fn test_blank_lines_collapse_after_filter() {
        let chain = FilterChain::parse(&["(?m)^#.*$"]).unwrap();
        let text = format!("one{NL}# hidden{NL}two{NL}");
        assert_eq!(chain.apply(&text), format!("one{NL}two{NL}"));
    }

    #[test]
    fn test_normalize_color_codes_and_newlines() {
        assert_eq!(normalize("&aGreen&r"), "§aGreen§r");
        assert_eq!(normalize("a\\nb"), format!("a{NL}b"));
        assert_eq!(normalize("Tom & Jerry"), "Tom & Jerry");
    }

    #[test]
    fn test_replacement_is_normalized() {
        let chain = FilterChain::parse(&["Online=&aOnline"]).unwrap();
        assert_eq!(chain.apply("Online: 3"), "§aOnline: 3");
    }

    #[test]
    fn test_invalid_pattern_fails_at_parse() {
        let err = FilterChain::parse(&["ok=fine", "([a-z]=x"]).unwrap_err();
        assert!(err.is_format_error());
        assert!(matches!(err, Error::InvalidPattern { ref pattern, .. } if pattern == "([a-z]"));
    }

    #[test]
    fn test_definitions_round_trip() {
        let defs = vec!["a=b".to_string(), "drop".to_string()];
        let chain = FilterChain::parse(&defs).unwrap();
        assert_eq!(chain.definitions(), defs);
        assert_eq!(chain.len(), 2);
    }
}

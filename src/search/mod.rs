mod lexer;
mod parser;

use lexer::tokenize;
use parser::parse_tokens;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchParseError {
    #[error("unterminated quoted phrase")]
    UnterminatedPhrase,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("empty group")]
    EmptyGroup,
    #[error("operator '{0}' missing an operand")]
    DanglingOperator(&'static str),
}

/// Boolean search grammar AST: bare terms and quoted phrases combine under
/// AND/OR/NOT with the usual precedence (NOT > AND > OR), parens override
/// it, and adjacent terms with no explicit operator are joined with an
/// implicit AND — e.g. `rust backend` means `rust AND backend`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Term(String),
    Phrase(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

/// An empty search expression matches everything (§4.E edge case).
pub fn parse(raw: &str) -> Result<Option<Expr>, SearchParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let tokens = tokenize(trimmed)?;
    if tokens.is_empty() {
        return Ok(None);
    }
    Ok(Some(parse_tokens(tokens)?))
}

/// Splits text into a lowercase token set on anything that isn't a letter,
/// digit, underscore, hyphen, `#`, or `+` — chosen so tokens like `c++` and
/// `node-js` survive as single tokens rather than fragmenting (§4.E).
pub fn tokenize_record_text(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '_' | '-' | '#' | '+')))
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Evaluates an expression against one record's lowercased full text and
/// its pre-split token set. Bare terms containing `*` are wildcard
/// substring matches (the term is split on `*` and every fragment must
/// appear, in order, within the full text); bare terms without `*` match
/// as whole tokens; phrases match as a literal substring of the full text.
pub fn matches(expr: &Expr, full_text: &str, tokens: &std::collections::HashSet<String>) -> bool {
    match expr {
        Expr::Term(term) => match_term(term, full_text, tokens),
        Expr::Phrase(phrase) => full_text.contains(&phrase.to_lowercase()),
        Expr::Not(inner) => !matches(inner, full_text, tokens),
        Expr::And(a, b) => matches(a, full_text, tokens) && matches(b, full_text, tokens),
        Expr::Or(a, b) => matches(a, full_text, tokens) || matches(b, full_text, tokens),
    }
}

fn match_term(term: &str, full_text: &str, tokens: &std::collections::HashSet<String>) -> bool {
    let lower = term.to_lowercase();
    if !lower.contains('*') {
        return tokens.contains(&lower) || full_text.contains(&lower);
    }
    tokens.iter().any(|t| wildcard_match(&lower, t)) || wildcard_match(&lower, full_text)
}

/// Splits `pattern` on `*` and requires the fragments to appear in order in
/// `text`; the first fragment is anchored to the start of `text` unless
/// empty (i.e. the pattern starts with `*`), and the last is anchored to
/// the end unless the pattern itself ends with `*` (§4.E).
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    let anchor_start = !segments.first().is_some_and(|s| s.is_empty());
    let anchor_end = !pattern.ends_with('*');

    let mut cursor = 0;
    for (idx, fragment) in segments.iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        let is_last = idx == segments.len() - 1;
        if idx == 0 && anchor_start {
            if !text[cursor..].starts_with(fragment) {
                return false;
            }
            cursor += fragment.len();
        } else if is_last && anchor_end {
            if fragment.len() > text.len() {
                return false;
            }
            let start_pos = text.len() - fragment.len();
            if start_pos < cursor || !text[start_pos..].eq(*fragment) {
                return false;
            }
        } else {
            match text[cursor..].find(fragment) {
                Some(pos) => cursor += pos + fragment.len(),
                None => return false,
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idx(text: &str) -> (String, std::collections::HashSet<String>) {
        (text.to_lowercase(), tokenize_record_text(text))
    }

    #[test]
    fn empty_expression_matches_everything() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("   ").unwrap().is_none());
    }

    #[test]
    fn implicit_and_between_bare_terms() {
        let expr = parse("rust backend").unwrap().unwrap();
        let (text, tokens) = idx("Senior Rust Backend Engineer");
        assert!(matches(&expr, &text, &tokens));
        let (text2, tokens2) = idx("Senior Rust Frontend Engineer");
        assert!(!matches(&expr, &text2, &tokens2));
    }

    #[test]
    fn explicit_or_and_not() {
        let expr = parse("rust OR golang NOT junior").unwrap().unwrap();
        let (text, tokens) = idx("Senior Golang Engineer");
        assert!(matches(&expr, &text, &tokens));
        let (text2, tokens2) = idx("Junior Golang Engineer");
        assert!(!matches(&expr, &text2, &tokens2));
    }

    #[test]
    fn quoted_phrase_matches_as_literal_substring() {
        let expr = parse("\"machine learning\"").unwrap().unwrap();
        let (text, tokens) = idx("Machine Learning Engineer");
        assert!(matches(&expr, &text, &tokens));
        let (text2, tokens2) = idx("Learning Machine Operator");
        assert!(!matches(&expr, &text2, &tokens2));
    }

    #[test]
    fn parens_override_precedence() {
        let expr = parse("(rust OR python) AND senior").unwrap().unwrap();
        let (text, tokens) = idx("Senior Python Developer");
        assert!(matches(&expr, &text, &tokens));
        let (text2, tokens2) = idx("Junior Python Developer");
        assert!(!matches(&expr, &text2, &tokens2));
    }

    #[test]
    fn wildcard_requires_ordered_fragments() {
        let expr = parse("dev*oper").unwrap().unwrap();
        let (text, tokens) = idx("developer wanted");
        assert!(matches(&expr, &text, &tokens));
        let (text2, tokens2) = idx("operator wanted");
        assert!(!matches(&expr, &text2, &tokens2));
    }

    #[test]
    fn symbolic_operators_are_accepted() {
        let expr = parse("rust && !junior").unwrap().unwrap();
        let (text, tokens) = idx("Senior Rust Engineer");
        assert!(matches(&expr, &text, &tokens));
    }

    #[test]
    fn unterminated_phrase_is_an_error() {
        assert_eq!(parse("\"unterminated"), Err(SearchParseError::UnterminatedPhrase));
    }

    #[test]
    fn unbalanced_parens_is_an_error() {
        assert_eq!(parse("(rust AND python"), Err(SearchParseError::UnbalancedParens));
    }
}

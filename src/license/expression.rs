use std::iter::Peekable;
use std::slice;

use crate::decisions::DecisionState;
use crate::models::PolicyVerdict;

/// Evaluate a license or SPDX expression against the license decisions.
///
/// A single identifier is `Pass` when permitted, `Error` when restricted
/// (restriction wins if both were recorded) and `Warn` otherwise.
///
/// Compound expressions follow SPDX precedence (anything that does not parse
/// as a whole is `Warn`):
/// - `AND` binds tighter than `OR`
/// - Parentheses override precedence
/// - `WITH` exception clauses are recognised but the base license is evaluated
/// - `/` is read as `OR`, as some ecosystems write it
///
/// Examples: `MIT`, `Apache-2.0 OR MIT`, `(Apache-2.0 OR MIT) AND BSD-3-Clause`
pub fn evaluate(state: &DecisionState, expr: &str) -> PolicyVerdict {
    // Whole-string lookup first so names containing spaces ("MIT License") resolve
    if let Some(verdict) = decided(state, expr) {
        return verdict;
    }

    let tokens = tokenize(&expr.replace('/', " OR "));
    let mut terms = Terms {
        tokens: tokens.iter().peekable(),
        state,
    };
    match terms.any_of() {
        Some(verdict) if terms.tokens.peek().is_none() => verdict,
        // empty, unbalanced or with trailing tokens: not something we can decide
        _ => PolicyVerdict::Warn,
    }
}

fn decided(state: &DecisionState, id: &str) -> Option<PolicyVerdict> {
    if state.is_restricted(id) {
        Some(PolicyVerdict::Error)
    } else if state.is_permitted(id) {
        Some(PolicyVerdict::Pass)
    } else {
        None
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    /// A license name; adjacent words are joined, so `MIT License` is one name.
    Name(String),
    And,
    Or,
    With,
    Open,
    Close,
}

fn tokenize(expr: &str) -> Vec<Token> {
    let spaced = expr.replace('(', " ( ").replace(')', " ) ");
    let mut tokens = Vec::new();
    for word in spaced.split_whitespace() {
        let token = match word {
            "(" => Token::Open,
            ")" => Token::Close,
            "AND" => Token::And,
            "OR" => Token::Or,
            "WITH" => Token::With,
            _ => match tokens.last_mut() {
                Some(Token::Name(name)) => {
                    name.push(' ');
                    name.push_str(word);
                    continue;
                }
                _ => Token::Name(word.to_string()),
            },
        };
        tokens.push(token);
    }
    tokens
}

/// Recursive descent over the token stream. Each rule returns `None` on a
/// syntax error.
///
/// ```text
/// any_of := all_of ( "OR" all_of )*
/// all_of := term ( "AND" term )*
/// term   := "(" any_of ")" | name ( "WITH" name )?
/// ```
struct Terms<'t, 's> {
    tokens: Peekable<slice::Iter<'t, Token>>,
    state: &'s DecisionState,
}

impl Terms<'_, '_> {
    fn any_of(&mut self) -> Option<PolicyVerdict> {
        let mut verdict = self.all_of()?;
        while self.tokens.next_if_eq(&&Token::Or).is_some() {
            verdict = verdict_or(verdict, self.all_of()?);
        }
        Some(verdict)
    }

    fn all_of(&mut self) -> Option<PolicyVerdict> {
        let mut verdict = self.term()?;
        while self.tokens.next_if_eq(&&Token::And).is_some() {
            verdict = verdict_and(verdict, self.term()?);
        }
        Some(verdict)
    }

    fn term(&mut self) -> Option<PolicyVerdict> {
        match self.tokens.next()? {
            Token::Open => {
                let verdict = self.any_of()?;
                self.tokens.next_if_eq(&&Token::Close)?;
                Some(verdict)
            }
            Token::Name(name) => {
                // the exception is named but only the base license is decided
                if self.tokens.next_if_eq(&&Token::With).is_some() {
                    self.tokens.next_if(|t| matches!(t, Token::Name(_)))?;
                }
                Some(decided(self.state, name).unwrap_or(PolicyVerdict::Warn))
            }
            _ => None,
        }
    }
}

/// Most permissive of two verdicts (OR).
pub fn verdict_or(a: PolicyVerdict, b: PolicyVerdict) -> PolicyVerdict {
    match (a, b) {
        (PolicyVerdict::Pass, _) | (_, PolicyVerdict::Pass) => PolicyVerdict::Pass,
        (PolicyVerdict::Warn, _) | (_, PolicyVerdict::Warn) => PolicyVerdict::Warn,
        _ => PolicyVerdict::Error,
    }
}

/// Most restrictive of two verdicts (AND).
fn verdict_and(a: PolicyVerdict, b: PolicyVerdict) -> PolicyVerdict {
    match (a, b) {
        (PolicyVerdict::Error, _) | (_, PolicyVerdict::Error) => PolicyVerdict::Error,
        (PolicyVerdict::Warn, _) | (_, PolicyVerdict::Warn) => PolicyVerdict::Warn,
        _ => PolicyVerdict::Pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decisions::{Decisions, FetchError, Fetcher, Txn};
    use std::io;

    struct NoFetch;

    impl Fetcher for NoFetch {
        fn fetch(&self, location: &str) -> Result<String, FetchError> {
            Err(FetchError::Read {
                location: location.to_string(),
                source: io::ErrorKind::NotFound.into(),
            })
        }
    }

    fn policy() -> Decisions<NoFetch> {
        let mut d = Decisions::new(NoFetch);
        d.permit("MIT", Txn::default())
            .permit("Apache-2.0", Txn::default())
            .permit("BSD-3-Clause", Txn::default())
            .restrict("GPL-3.0", Txn::default())
            .restrict("GPL-2.0", Txn::default());
        d
    }

    #[test]
    fn test_single_ids() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "MIT"), PolicyVerdict::Pass);
        assert_eq!(evaluate(d.state(), "GPL-3.0"), PolicyVerdict::Error);
        assert_eq!(evaluate(d.state(), "MPL-2.0"), PolicyVerdict::Warn);
    }

    #[test]
    fn test_free_text_name_resolves() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "MIT License"), PolicyVerdict::Pass);
        assert_eq!(evaluate(d.state(), "Apache License, Version 2.0"), PolicyVerdict::Pass);
    }

    #[test]
    fn test_or_takes_most_permissive() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "MIT OR GPL-3.0"), PolicyVerdict::Pass);
        assert_eq!(evaluate(d.state(), "MPL-2.0 OR GPL-3.0"), PolicyVerdict::Warn);
    }

    #[test]
    fn test_and_takes_most_restrictive() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "MIT AND GPL-3.0"), PolicyVerdict::Error);
        assert_eq!(evaluate(d.state(), "MIT AND BSD-3-Clause"), PolicyVerdict::Pass);
    }

    #[test]
    fn test_and_precedence_over_or_without_parens() {
        let d = policy();
        // MIT OR (GPL-3.0 AND BSD-3-Clause)
        assert_eq!(
            evaluate(d.state(), "MIT OR GPL-3.0 AND BSD-3-Clause"),
            PolicyVerdict::Pass
        );
    }

    #[test]
    fn test_parentheses_force_or_before_and() {
        let d = policy();
        assert_eq!(
            evaluate(d.state(), "(MIT OR GPL-3.0) AND GPL-3.0"),
            PolicyVerdict::Error
        );
    }

    #[test]
    fn test_slash_separator() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "MIT/GPL-3.0"), PolicyVerdict::Pass);
    }

    #[test]
    fn test_with_exception_uses_base_license() {
        let d = policy();
        assert_eq!(
            evaluate(d.state(), "GPL-2.0 WITH Classpath-exception-2.0"),
            PolicyVerdict::Error
        );
    }

    #[test]
    fn test_restriction_wins_over_permission() {
        let mut d = policy();
        d.permit("GPL-3.0", Txn::default());
        assert_eq!(evaluate(d.state(), "GPL-3.0"), PolicyVerdict::Error);
    }

    #[test]
    fn test_empty_expression_is_undecided() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "   "), PolicyVerdict::Warn);
    }

    #[test]
    fn test_multi_word_names_inside_expressions() {
        let d = policy();
        assert_eq!(evaluate(d.state(), "Some Custom License OR MIT"), PolicyVerdict::Pass);
        assert_eq!(evaluate(d.state(), "MIT License AND GPL-3.0"), PolicyVerdict::Error);
        assert_eq!(
            evaluate(d.state(), "(MIT License OR GPL-3.0) AND BSD-3-Clause"),
            PolicyVerdict::Pass
        );
    }

    #[test]
    fn test_malformed_expressions_are_undecided() {
        let d = policy();
        // trailing tokens after a complete expression
        assert_eq!(evaluate(d.state(), "GPL-3.0 ) MIT"), PolicyVerdict::Warn);
        assert_eq!(evaluate(d.state(), "MIT AND"), PolicyVerdict::Warn);
        assert_eq!(evaluate(d.state(), "(MIT OR GPL-3.0"), PolicyVerdict::Warn);
        assert_eq!(evaluate(d.state(), "GPL-2.0 WITH"), PolicyVerdict::Warn);
        assert_eq!(evaluate(d.state(), "OR MIT"), PolicyVerdict::Warn);
    }
}

//! Subject patterns.
//!
//! Subjects are `.`-separated tokens. `*` matches exactly one token and may
//! appear anywhere; `>` matches one or more trailing tokens and may only be
//! the last token. Wildcards must be whole tokens.

/// Validate a subject pattern, returning a description of the first problem.
pub fn validate_subject(subject: &str) -> Result<(), String> {
    if subject.is_empty() {
        return Err("subject cannot be empty".into());
    }
    if subject.chars().any(char::is_whitespace) {
        return Err(format!("subject {subject:?} cannot contain whitespace"));
    }

    let tokens: Vec<&str> = subject.split('.').collect();
    let last = tokens.len() - 1;
    for (i, token) in tokens.iter().enumerate() {
        if token.is_empty() {
            return Err(format!("subject {subject:?} has an empty token"));
        }
        if token.len() > 1 && (token.contains('*') || token.contains('>')) {
            return Err(format!(
                "subject {subject:?} has a wildcard that is not a whole token"
            ));
        }
        if *token == ">" && i != last {
            return Err(format!(
                "subject {subject:?} can only use '>' as the last token"
            ));
        }
    }
    Ok(())
}

/// True when the subject contains a `*` or `>` token.
pub fn is_wildcard(subject: &str) -> bool {
    subject.split('.').any(|t| t == "*" || t == ">")
}

/// True when every subject matched by `subject` is also matched by `pattern`,
/// i.e. `subject` equals or is narrower than `pattern`.
pub fn subject_contains(pattern: &str, subject: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let subject: Vec<&str> = subject.split('.').collect();

    for (i, p) in pattern.iter().enumerate() {
        if *p == ">" {
            return subject.len() > i;
        }
        let Some(s) = subject.get(i) else {
            return false;
        };
        match *p {
            "*" => {
                if *s == ">" {
                    return false;
                }
            }
            literal => {
                if *s != literal {
                    return false;
                }
            }
        }
    }
    pattern.len() == subject.len()
}

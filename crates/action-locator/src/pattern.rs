//! Structural locator patterns.
//!
//! A CSS subset: tag, `*`, `#id`, `.class`, attribute conditions
//! (`[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`, `[a|=v]`) with an
//! optional ` i` flag, descendant and `>` child combinators, and comma
//! separated groups. Pseudo-classes and sibling combinators are rejected.

use std::fmt;

use crate::errors::LocatorError;

/// Read access to an element tree, enough to evaluate a pattern.
pub trait PatternTree {
    type Id: Copy;

    fn tag(&self, id: Self::Id) -> &str;
    fn attr(&self, id: Self::Id, name: &str) -> Option<&str>;
    fn parent(&self, id: Self::Id) -> Option<Self::Id>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Eq,
    Prefix,
    Suffix,
    Contains,
    Word,
    Dash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    key: String,
    op: AttrOp,
    value: String,
    ignore_case: bool,
}

impl AttrCondition {
    fn matches(&self, actual: Option<&str>) -> bool {
        let Some(actual) = actual else {
            return false;
        };
        if self.op == AttrOp::Exists {
            return true;
        }
        let (actual, expected) = if self.ignore_case {
            (actual.to_lowercase(), self.value.to_lowercase())
        } else {
            (actual.to_string(), self.value.clone())
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Eq => actual == expected,
            AttrOp::Prefix => !expected.is_empty() && actual.starts_with(&expected),
            AttrOp::Suffix => !expected.is_empty() && actual.ends_with(&expected),
            AttrOp::Contains => !expected.is_empty() && actual.contains(&expected),
            AttrOp::Word => actual.split_whitespace().any(|w| w == expected),
            AttrOp::Dash => actual == expected || actual.starts_with(&format!("{expected}-")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct PatternStep {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

impl PatternStep {
    fn matches<T: PatternTree>(&self, tree: &T, node: T::Id) -> bool {
        if let Some(tag) = &self.tag {
            if !tree.tag(node).eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if tree.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = tree.attr(node, "class").unwrap_or("");
            if !self
                .classes
                .iter()
                .all(|class| class_attr.split_whitespace().any(|c| c == class))
            {
                return false;
            }
        }
        self.attrs
            .iter()
            .all(|cond| cond.matches(tree.attr(node, &cond.key)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PatternPart {
    step: PatternStep,
    combinator: Option<Combinator>,
}

/// A parsed, reusable locator pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorPattern {
    source: String,
    groups: Vec<Vec<PatternPart>>,
}

impl LocatorPattern {
    pub fn parse(source: &str) -> Result<Self, LocatorError> {
        let fail = |reason: &str| LocatorError::InvalidPattern {
            pattern: source.to_string(),
            reason: reason.to_string(),
        };
        let groups = split_groups(source).map_err(|r| fail(r))?;
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            parsed.push(parse_chain(&group).map_err(|r| fail(r))?);
        }
        Ok(Self {
            source: source.trim().to_string(),
            groups: parsed,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True when any group matches `node`.
    pub fn matches<T: PatternTree>(&self, tree: &T, node: T::Id) -> bool {
        self.groups
            .iter()
            .any(|chain| matches_chain(tree, node, chain))
    }
}

impl fmt::Display for LocatorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn matches_chain<T: PatternTree>(tree: &T, node: T::Id, parts: &[PatternPart]) -> bool {
    let Some(last) = parts.last() else {
        return false;
    };
    if !last.step.matches(tree, node) {
        return false;
    }

    let mut current = node;
    for idx in (1..parts.len()).rev() {
        let prev = &parts[idx - 1].step;
        let combinator = parts[idx].combinator.unwrap_or(Combinator::Descendant);
        let matched = match combinator {
            Combinator::Child => tree.parent(current).filter(|p| prev.matches(tree, *p)),
            Combinator::Descendant => {
                let mut cursor = tree.parent(current);
                let mut found = None;
                while let Some(parent) = cursor {
                    if prev.matches(tree, parent) {
                        found = Some(parent);
                        break;
                    }
                    cursor = tree.parent(parent);
                }
                found
            }
        };
        let Some(matched) = matched else {
            return false;
        };
        current = matched;
    }
    true
}

fn split_groups(source: &str) -> Result<Vec<String>, &'static str> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in source.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                if depth == 0 {
                    return Err("unbalanced ']'");
                }
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                let trimmed = current.trim();
                if trimmed.is_empty() {
                    return Err("empty selector group");
                }
                groups.push(trimmed.to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if depth != 0 || quote.is_some() {
        return Err("unterminated attribute condition");
    }
    let trimmed = current.trim();
    if trimmed.is_empty() {
        return Err("empty selector group");
    }
    groups.push(trimmed.to_string());
    Ok(groups)
}

fn tokenize(group: &str) -> Result<Vec<String>, &'static str> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    let flush = |current: &mut String, tokens: &mut Vec<String>| {
        if !current.trim().is_empty() {
            tokens.push(current.trim().to_string());
        }
        current.clear();
    };

    for ch in group.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' if depth > 0 => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.checked_sub(1).ok_or("unbalanced ']'")?;
                current.push(ch);
            }
            '>' if depth == 0 => {
                flush(&mut current, &mut tokens);
                tokens.push(">".into());
            }
            '+' | '~' if depth == 0 => return Err("sibling combinators are not supported"),
            c if c.is_whitespace() && depth == 0 => flush(&mut current, &mut tokens),
            _ => current.push(ch),
        }
    }
    flush(&mut current, &mut tokens);
    Ok(tokens)
}

fn parse_chain(group: &str) -> Result<Vec<PatternPart>, &'static str> {
    let mut parts: Vec<PatternPart> = Vec::new();
    let mut pending: Option<Combinator> = None;
    for token in tokenize(group)? {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err("dangling '>'");
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let step = parse_step(&token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(PatternPart { step, combinator });
    }
    if parts.is_empty() || pending.is_some() {
        return Err("incomplete selector");
    }
    Ok(parts)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn parse_ident(src: &str, start: usize) -> Option<(String, usize)> {
    let bytes = src.as_bytes();
    if start >= bytes.len() || !is_ident_byte(bytes[start]) {
        return None;
    }
    let mut end = start + 1;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    Some((src.get(start..end)?.to_string(), end))
}

fn parse_step(part: &str) -> Result<PatternStep, &'static str> {
    let bytes = part.as_bytes();
    let mut i = 0usize;
    let mut step = PatternStep::default();

    while i < bytes.len() {
        match bytes[i] {
            b'*' => {
                if step.universal || step.tag.is_some() {
                    return Err("misplaced '*'");
                }
                step.universal = true;
                i += 1;
            }
            b'#' => {
                let (id, next) = parse_ident(part, i + 1).ok_or("invalid id")?;
                if step.id.replace(id).is_some() {
                    return Err("duplicate id");
                }
                i = next;
            }
            b'.' => {
                let (class, next) = parse_ident(part, i + 1).ok_or("invalid class")?;
                step.classes.push(class);
                i = next;
            }
            b'[' => {
                let (cond, next) = parse_attr(part, i)?;
                step.attrs.push(cond);
                i = next;
            }
            b':' => return Err("pseudo-classes are not supported"),
            _ => {
                if step.tag.is_some()
                    || step.universal
                    || step.id.is_some()
                    || !step.classes.is_empty()
                    || !step.attrs.is_empty()
                {
                    return Err("unexpected character");
                }
                let (tag, next) = parse_ident(part, i).ok_or("unexpected character")?;
                step.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
        }
    }
    Ok(step)
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn parse_attr(src: &str, open: usize) -> Result<(AttrCondition, usize), &'static str> {
    let bytes = src.as_bytes();
    let mut i = skip_ws(bytes, open + 1);

    let key_start = i;
    while i < bytes.len() && (is_ident_byte(bytes[i]) || bytes[i] == b':') {
        i += 1;
    }
    if key_start == i {
        return Err("missing attribute name");
    }
    let key = src
        .get(key_start..i)
        .ok_or("missing attribute name")?
        .to_ascii_lowercase();

    i = skip_ws(bytes, i);
    match bytes.get(i) {
        Some(b']') => {
            return Ok((
                AttrCondition {
                    key,
                    op: AttrOp::Exists,
                    value: String::new(),
                    ignore_case: false,
                },
                i + 1,
            ))
        }
        None => return Err("unterminated attribute condition"),
        _ => {}
    }

    let (op, next) = match (bytes.get(i), bytes.get(i + 1)) {
        (Some(b'='), _) => (AttrOp::Eq, i + 1),
        (Some(b'^'), Some(b'=')) => (AttrOp::Prefix, i + 2),
        (Some(b'$'), Some(b'=')) => (AttrOp::Suffix, i + 2),
        (Some(b'*'), Some(b'=')) => (AttrOp::Contains, i + 2),
        (Some(b'~'), Some(b'=')) => (AttrOp::Word, i + 2),
        (Some(b'|'), Some(b'=')) => (AttrOp::Dash, i + 2),
        _ => return Err("unknown attribute operator"),
    };
    i = skip_ws(bytes, next);

    let (value, after) = parse_attr_value(src, i)?;
    i = skip_ws(bytes, after);

    let mut ignore_case = false;
    if let Some(flag) = bytes.get(i) {
        if flag.eq_ignore_ascii_case(&b'i') || flag.eq_ignore_ascii_case(&b's') {
            ignore_case = flag.eq_ignore_ascii_case(&b'i');
            i = skip_ws(bytes, i + 1);
        }
    }
    if bytes.get(i) != Some(&b']') {
        return Err("unterminated attribute condition");
    }
    Ok((
        AttrCondition {
            key,
            op,
            value,
            ignore_case,
        },
        i + 1,
    ))
}

fn parse_attr_value(src: &str, start: usize) -> Result<(String, usize), &'static str> {
    let bytes = src.as_bytes();
    match bytes.get(start) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let mut i = start + 1;
            while i < bytes.len() {
                if bytes[i] == b'\\' {
                    i = (i + 2).min(bytes.len());
                    continue;
                }
                if bytes[i] == q {
                    let raw = src.get(start + 1..i).ok_or("invalid attribute value")?;
                    return Ok((raw.replace("\\", ""), i + 1));
                }
                i += 1;
            }
            Err("unterminated quoted value")
        }
        Some(_) => {
            let mut i = start;
            while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b']' {
                i += 1;
            }
            let raw = src.get(start..i).ok_or("invalid attribute value")?;
            Ok((raw.to_string(), i))
        }
        None => Err("missing attribute value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Tree {
        nodes: Vec<(&'static str, HashMap<&'static str, &'static str>, Option<usize>)>,
    }

    impl PatternTree for Tree {
        type Id = usize;

        fn tag(&self, id: usize) -> &str {
            self.nodes[id].0
        }

        fn attr(&self, id: usize, name: &str) -> Option<&str> {
            self.nodes[id].1.get(name).copied()
        }

        fn parent(&self, id: usize) -> Option<usize> {
            self.nodes[id].2
        }
    }

    fn tree() -> Tree {
        Tree {
            nodes: vec![
                ("body", HashMap::new(), None),
                (
                    "div",
                    HashMap::from([("class", "cdk-overlay-container")]),
                    Some(0),
                ),
                (
                    "div",
                    HashMap::from([("class", "cdk-overlay-pane wide"), ("role", "listbox")]),
                    Some(1),
                ),
                ("mat-option", HashMap::from([("role", "option")]), Some(2)),
                (
                    "input",
                    HashMap::from([("name", "applicant.FirstName"), ("id", "fn")]),
                    Some(0),
                ),
            ],
        }
    }

    #[test]
    fn case_insensitive_contains() {
        let t = tree();
        let p = LocatorPattern::parse("input[name*='firstname' i]").unwrap();
        assert!(p.matches(&t, 4));
        let strict = LocatorPattern::parse("input[name*='firstname']").unwrap();
        assert!(!strict.matches(&t, 4));
    }

    #[test]
    fn descendant_and_child_combinators() {
        let t = tree();
        let desc = LocatorPattern::parse(".cdk-overlay-container mat-option").unwrap();
        assert!(desc.matches(&t, 3));
        let child = LocatorPattern::parse(".cdk-overlay-container > mat-option").unwrap();
        assert!(!child.matches(&t, 3));
        let pane = LocatorPattern::parse("[role=\"listbox\"] > [role=\"option\"]").unwrap();
        assert!(pane.matches(&t, 3));
    }

    #[test]
    fn groups_ids_and_classes() {
        let t = tree();
        let p = LocatorPattern::parse("select, #fn").unwrap();
        assert!(p.matches(&t, 4));
        let classes = LocatorPattern::parse("div.cdk-overlay-pane.wide").unwrap();
        assert!(classes.matches(&t, 2));
        assert!(!classes.matches(&t, 1));
        let fuzzy = LocatorPattern::parse("[class*=\"overlay\"] [role=\"option\"]").unwrap();
        assert!(fuzzy.matches(&t, 3));
    }

    #[test]
    fn rejects_malformed_patterns() {
        for bad in [
            "",
            "input[name*='x'",
            "div >",
            "a:hover",
            "a + b",
            "input[name~~x]",
            ", div",
        ] {
            let err = LocatorPattern::parse(bad).unwrap_err();
            assert!(matches!(err, LocatorError::InvalidPattern { .. }), "{bad}");
        }
    }

    #[test]
    fn quoted_values_keep_commas_and_spaces() {
        let p = LocatorPattern::parse("input[placeholder*='Date, of Birth' i], textarea").unwrap();
        assert_eq!(p.groups.len(), 2);
    }
}

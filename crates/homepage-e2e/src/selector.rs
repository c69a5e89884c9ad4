//! CSS selector subset used by the scenarios
//!
//! Supports type, universal, `#id`, `.class` and attribute selectors
//! (`[a]`, `[a=v]`, `[a^=v]`, `[a$=v]`, `[a*=v]`, `[a~=v]`), descendant and
//! child combinators, and comma separated groups. Pseudo-classes are not
//! supported and are reported as errors.

use crate::dom::Element;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid selector {selector:?} at offset {offset}: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub offset: usize,
    pub reason: &'static str,
}

/// A parsed selector list (`a, b > c`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Compounds left to right; `combinators[i]` joins `compounds[i]` to `compounds[i + 1]`
    compounds: Vec<Compound>,
    combinators: Vec<Combinator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrSelector>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrSelector {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Suffix(String),
    Substring(String),
    Word(String),
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        Parser {
            source: selector,
            chars: selector.char_indices().collect(),
            pos: 0,
        }
        .parse_list()
    }

    /// Does `element` match any alternative of this selector list?
    pub fn matches(&self, element: Element<'_>) -> bool {
        self.alternatives
            .iter()
            .any(|complex| complex.matches_at(element, complex.compounds.len() - 1))
    }
}

impl Complex {
    fn matches_at(&self, element: Element<'_>, index: usize) -> bool {
        if !self.compounds[index].matches(element) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => element
                .parent()
                .is_some_and(|parent| self.matches_at(parent, index - 1)),
            Combinator::Descendant => element
                .ancestors()
                .any(|ancestor| self.matches_at(ancestor, index - 1)),
        }
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && self.attrs.is_empty()
    }

    fn matches(&self, element: Element<'_>) -> bool {
        if let Some(tag) = &self.tag
            && tag != "*"
            && !element.name().eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = &self.id
            && element.attr("id") != Some(id.as_str())
        {
            return false;
        }
        if !self
            .classes
            .iter()
            .all(|class| element.classes().any(|c| c == class))
        {
            return false;
        }
        self.attrs.iter().all(|attr| {
            let Some(value) = element.attr(&attr.name) else {
                return false;
            };
            match &attr.op {
                AttrOp::Exists => true,
                AttrOp::Equals(v) => value == v,
                AttrOp::Prefix(v) => !v.is_empty() && value.starts_with(v.as_str()),
                AttrOp::Suffix(v) => !v.is_empty() && value.ends_with(v.as_str()),
                AttrOp::Substring(v) => !v.is_empty() && value.contains(v.as_str()),
                AttrOp::Word(v) => value.split_whitespace().any(|w| w == v),
            }
        })
    }
}

struct Parser<'s> {
    source: &'s str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, reason: &'static str) -> SelectorError {
        let offset = self
            .chars
            .get(self.pos)
            .map(|(offset, _)| *offset)
            .unwrap_or(self.source.len());
        SelectorError {
            selector: self.source.to_string(),
            offset,
            reason,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_list(mut self) -> Result<Selector, SelectorError> {
        let mut alternatives = Vec::new();
        loop {
            self.skip_whitespace();
            alternatives.push(self.parse_complex()?);
            match self.bump() {
                None => break,
                Some(',') => continue,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.error("unexpected character"));
                }
            }
        }
        Ok(Selector { alternatives })
    }

    fn parse_complex(&mut self) -> Result<Complex, SelectorError> {
        let mut compounds = vec![self.parse_compound()?];
        let mut combinators = Vec::new();
        loop {
            let had_space = self.skip_whitespace();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_whitespace();
                    Combinator::Child
                }
                Some(_) if had_space => Combinator::Descendant,
                Some(_) => return Err(self.error("unexpected character")),
            };
            combinators.push(combinator);
            compounds.push(self.parse_compound()?);
        }
        Ok(Complex {
            compounds,
            combinators,
        })
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
            compound.tag = Some("*".to_string());
        } else if self.peek().is_some_and(is_ident_char) {
            compound.tag = Some(self.parse_ident()?.to_ascii_lowercase());
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.parse_ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.parse_ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr()?);
                }
                Some(':') => return Err(self.error("pseudo-classes are not supported")),
                _ => break,
            }
        }
        if compound.is_empty() {
            return Err(self.error("expected a selector"));
        }
        Ok(compound)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let mut ident = String::new();
        while let Some(c) = self.peek().filter(|c| is_ident_char(*c)) {
            ident.push(c);
            self.pos += 1;
        }
        if ident.is_empty() {
            return Err(self.error("expected an identifier"));
        }
        Ok(ident)
    }

    fn parse_attr(&mut self) -> Result<AttrSelector, SelectorError> {
        self.skip_whitespace();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_whitespace();
        let op: fn(String) -> AttrOp = match self.bump() {
            Some(']') => {
                return Ok(AttrSelector {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => AttrOp::Equals,
            Some(c @ ('^' | '$' | '*' | '~')) => {
                if self.bump() != Some('=') {
                    self.pos -= 1;
                    return Err(self.error("expected '='"));
                }
                match c {
                    '^' => AttrOp::Prefix,
                    '$' => AttrOp::Suffix,
                    '*' => AttrOp::Substring,
                    _ => AttrOp::Word,
                }
            }
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                return Err(self.error("expected an attribute operator"));
            }
        };
        self.skip_whitespace();
        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some('\\') => match self.bump() {
                            Some(c) => value.push(c),
                            None => return Err(self.error("unterminated string")),
                        },
                        Some(c) => value.push(c),
                        None => return Err(self.error("unterminated string")),
                    }
                }
                value
            }
            _ => self.parse_ident()?,
        };
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(AttrSelector {
            name,
            op: op(value),
        })
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_' || !c.is_ascii()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    const PAGE: &str = r##"<!DOCTYPE html>
<html><body>
<header id="header">
  <nav class="main-nav wide" aria-label="Main">
    <a href="/">Home</a>
    <a href="#about">About</a>
    <span><a href="/blog" data-kind="post list">Blog</a></span>
  </nav>
</header>
<main><h1 class="hero-title">Hi</h1></main>
</body></html>"##;

    fn hrefs(doc: &Document, selector: &str) -> Vec<String> {
        doc.select(selector)
            .unwrap()
            .into_iter()
            .filter_map(|el| el.attr("href").map(str::to_string))
            .collect()
    }

    #[test]
    fn descendant_and_child_combinators() {
        let doc = Document::parse(PAGE);
        assert_eq!(hrefs(&doc, "header nav a"), ["/", "#about", "/blog"]);
        assert_eq!(hrefs(&doc, "nav > a"), ["/", "#about"]);
        assert_eq!(hrefs(&doc, "header > a"), Vec::<String>::new());
    }

    #[test]
    fn attribute_operators() {
        let doc = Document::parse(PAGE);
        assert_eq!(hrefs(&doc, r##"a[href="#about"]"##), ["#about"]);
        assert_eq!(hrefs(&doc, "a[href^='#']"), ["#about"]);
        assert_eq!(hrefs(&doc, "a[href$=log]"), ["/blog"]);
        assert_eq!(hrefs(&doc, r#"[data-kind~="list"]"#), ["/blog"]);
        assert_eq!(hrefs(&doc, "[data-kind*=st]"), ["/blog"]);
        assert_eq!(doc.select("nav[aria-label]").unwrap().len(), 1);
    }

    #[test]
    fn ids_classes_and_groups() {
        let doc = Document::parse(PAGE);
        assert_eq!(doc.select("#header").unwrap().len(), 1);
        assert_eq!(doc.select("nav.main-nav.wide").unwrap().len(), 1);
        assert_eq!(doc.select("nav.narrow").unwrap().len(), 0);
        let names: Vec<_> = doc
            .select("h1, header, h2")
            .unwrap()
            .into_iter()
            .map(|el| el.name().to_string())
            .collect();
        assert_eq!(names, ["header", "h1"], "results come back in document order");
        assert_eq!(doc.select("MAIN H1").unwrap().len(), 1);
    }

    #[test]
    fn rejects_unsupported_syntax() {
        for bad in ["", "a:hover", "a[href", "a[href=", "a,", "a + b", "[href ! x]", "a['x]"] {
            assert!(Selector::parse(bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn error_points_at_offending_character() {
        let err = Selector::parse("nav a:first-child").unwrap_err();
        assert_eq!(err.offset, 5);
    }
}

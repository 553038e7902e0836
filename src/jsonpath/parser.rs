//! Path expression parser using nom.
//!
//! Grammar (informal):
//!
//! ```text
//! template  := (text | '{' path '}')*       -- or a bare path without braces
//! path      := ws ('$' | '@' | identifier)? segment* ws
//! segment   := '..' (identifier | '*')
//!            | '.' (identifier | '*')
//!            | '[' ws selector ws ']'
//! selector  := '?(' ws '@' segment* (ws op ws literal)? ws ')'
//!            | '*' | quoted | slice | integer
//! ```

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map, map_res, opt, recognize, value},
    multi::many0,
    number::complete::double,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::PathError;

/// A single navigation step
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name` or `['name']`
    Child(String),
    /// `.*` or `[*]`
    Wildcard,
    /// `..name`
    Descendant(String),
    /// `..*`
    DescendantWildcard,
    /// `[n]`, negative counts from the end
    Index(i64),
    /// `[start:end:step]`
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    /// `[?(@.key op literal)]`
    Filter(FilterExpr),
}

/// Filter predicate applied to each candidate element
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpr {
    /// Path relative to the candidate (`@`)
    pub path: Vec<Segment>,
    /// Comparison; `None` means an existence test
    pub condition: Option<(CmpOp, Literal)>,
}

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Literal on the right-hand side of a filter comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

/// A compiled path expression
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPath {
    pub(crate) source: String,
    pub(crate) segments: Vec<Segment>,
}

impl JsonPath {
    /// Parse a single path expression (no surrounding braces)
    pub fn parse(expression: &str) -> Result<Self, PathError> {
        match all_consuming(path_expr)(expression) {
            Ok((_, segments)) => Ok(Self {
                source: expression.to_string(),
                segments,
            }),
            Err(e) => Err(PathError::Syntax {
                path: expression.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Original expression text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Parsed segments
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the path addresses at most one node
    pub fn is_definite(&self) -> bool {
        self.segments
            .iter()
            .all(|segment| matches!(segment, Segment::Child(_) | Segment::Index(_)))
    }
}

/// Piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text copied to the output
    Text(String),
    /// Evaluated expression
    Path(JsonPath),
}

/// A template mixing literal text and `{path}` expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub(crate) source: String,
    pub(crate) parts: Vec<TemplatePart>,
}

impl Template {
    /// Parse an expression as found in configuration
    ///
    /// Without any `{` outside quoted literals the whole string is a single
    /// path, so `$.status` and `v` work as well as `{.status}`.
    pub fn parse(expression: &str) -> Result<Self, PathError> {
        if find_unquoted(expression, '{').is_none() {
            return Ok(Self {
                source: expression.to_string(),
                parts: vec![TemplatePart::Path(JsonPath::parse(expression)?)],
            });
        }

        let mut parts = Vec::new();
        let mut rest = expression;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(TemplatePart::Text(rest[..open].to_string()));
            }

            let inner = &rest[open + 1..];
            let close = find_unquoted(inner, '}').ok_or_else(|| PathError::Syntax {
                path: expression.to_string(),
                reason: "unclosed '{'".to_string(),
            })?;

            let path = JsonPath::parse(&inner[..close]).map_err(|e| match e {
                PathError::Syntax { reason, .. } => PathError::Syntax {
                    path: expression.to_string(),
                    reason,
                },
                other => other,
            })?;
            parts.push(TemplatePart::Path(path));
            rest = &inner[close + 1..];
        }

        if !rest.is_empty() {
            parts.push(TemplatePart::Text(rest.to_string()));
        }

        Ok(Self {
            source: expression.to_string(),
            parts,
        })
    }

    /// Original expression text
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Template pieces in order
    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }
}

/// Byte offset of the first `target` outside a quoted span
///
/// A quote without a closing partner is ordinary text.
fn find_unquoted(input: &str, target: char) -> Option<usize> {
    let mut chars = input.char_indices();
    while let Some((pos, c)) = chars.next() {
        if c == target {
            return Some(pos);
        }
        if c == '\'' || c == '"' {
            if let Some(len) = input[pos + 1..].find(c) {
                let end = pos + 1 + len;
                while chars.next().is_some_and(|(next, _)| next < end) {}
            }
        }
    }
    None
}

fn path_expr(input: &str) -> IResult<&str, Vec<Segment>> {
    let (input, _) = multispace0(input)?;
    let (input, anchor) = opt(alt((char('$'), char('@'))))(input)?;
    let (input, head) = if anchor.is_some() {
        (input, None)
    } else {
        opt(map(identifier, |name: &str| Segment::Child(name.to_string())))(input)?
    };
    let (input, mut segments) = many0(segment)(input)?;
    let (input, _) = multispace0(input)?;

    if let Some(head) = head {
        segments.insert(0, head);
    }

    Ok((input, segments))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_' || c == '-')(input)
}

fn segment(input: &str) -> IResult<&str, Segment> {
    alt((descendant_segment, child_segment, bracket_segment))(input)
}

fn descendant_segment(input: &str) -> IResult<&str, Segment> {
    preceded(
        tag(".."),
        alt((
            value(Segment::DescendantWildcard, char('*')),
            map(identifier, |name: &str| Segment::Descendant(name.to_string())),
        )),
    )(input)
}

fn child_segment(input: &str) -> IResult<&str, Segment> {
    preceded(
        char('.'),
        alt((
            value(Segment::Wildcard, char('*')),
            map(identifier, |name: &str| Segment::Child(name.to_string())),
        )),
    )(input)
}

fn bracket_segment(input: &str) -> IResult<&str, Segment> {
    delimited(
        pair(char('['), multispace0),
        alt((
            filter_selector,
            value(Segment::Wildcard, char('*')),
            map(quoted, Segment::Child),
            slice_selector,
            map(integer, Segment::Index),
        )),
        pair(multispace0, char(']')),
    )(input)
}

fn filter_selector(input: &str) -> IResult<&str, Segment> {
    map(
        delimited(
            pair(tag("?("), multispace0),
            pair(
                preceded(char('@'), many0(segment)),
                opt(preceded(
                    multispace0,
                    pair(comparison, preceded(multispace0, literal)),
                )),
            ),
            pair(multispace0, char(')')),
        ),
        |(path, condition)| Segment::Filter(FilterExpr { path, condition }),
    )(input)
}

fn slice_selector(input: &str) -> IResult<&str, Segment> {
    map(
        tuple((
            opt(integer),
            preceded(multispace0, char(':')),
            opt(preceded(multispace0, integer)),
            opt(preceded(
                pair(multispace0, char(':')),
                opt(preceded(multispace0, integer)),
            )),
        )),
        |(start, _, end, step)| Segment::Slice {
            start,
            end,
            step: step.flatten(),
        },
    )(input)
}

fn integer(input: &str) -> IResult<&str, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |s: &str| {
        s.parse::<i64>()
    })(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        alt((
            delimited(char('\''), opt(is_not("'")), char('\'')),
            delimited(char('"'), opt(is_not("\"")), char('"')),
        )),
        |s: Option<&str>| s.unwrap_or_default().to_string(),
    )(input)
}

fn comparison(input: &str) -> IResult<&str, CmpOp> {
    alt((
        value(CmpOp::Eq, tag("==")),
        value(CmpOp::Ne, tag("!=")),
        value(CmpOp::Le, tag("<=")),
        value(CmpOp::Ge, tag(">=")),
        value(CmpOp::Lt, tag("<")),
        value(CmpOp::Gt, tag(">")),
    ))(input)
}

fn literal(input: &str) -> IResult<&str, Literal> {
    alt((
        value(Literal::Null, tag("null")),
        value(Literal::Bool(true), tag("true")),
        value(Literal::Bool(false), tag("false")),
        map(quoted, Literal::String),
        map(double, Literal::Number),
    ))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(expr: &str) -> Vec<Segment> {
        JsonPath::parse(expr).unwrap().segments
    }

    #[test]
    fn test_parse_dotted() {
        assert_eq!(
            segments(".a.b"),
            vec![
                Segment::Child("a".to_string()),
                Segment::Child("b".to_string())
            ]
        );
        assert_eq!(segments("$.a"), vec![Segment::Child("a".to_string())]);
        assert_eq!(segments("v"), vec![Segment::Child("v".to_string())]);
        assert_eq!(segments(" $ "), vec![]);
    }

    #[test]
    fn test_parse_brackets() {
        assert_eq!(
            segments(".items[*]"),
            vec![Segment::Child("items".to_string()), Segment::Wildcard]
        );
        assert_eq!(segments("$[-1]"), vec![Segment::Index(-1)]);
        assert_eq!(
            segments("$['dotted.key']"),
            vec![Segment::Child("dotted.key".to_string())]
        );
        assert_eq!(
            segments("$[1:3]"),
            vec![Segment::Slice {
                start: Some(1),
                end: Some(3),
                step: None
            }]
        );
        assert_eq!(
            segments("$[::2]"),
            vec![Segment::Slice {
                start: None,
                end: None,
                step: Some(2)
            }]
        );
    }

    #[test]
    fn test_parse_descendant() {
        assert_eq!(
            segments("$..name"),
            vec![Segment::Descendant("name".to_string())]
        );
        assert_eq!(segments("$..*"), vec![Segment::DescendantWildcard]);
    }

    #[test]
    fn test_parse_filter() {
        let parsed = segments(r#".values[?(@.state == "ACTIVE")]"#);
        assert_eq!(parsed.len(), 2);
        match &parsed[1] {
            Segment::Filter(filter) => {
                assert_eq!(filter.path, vec![Segment::Child("state".to_string())]);
                assert_eq!(
                    filter.condition,
                    Some((CmpOp::Eq, Literal::String("ACTIVE".to_string())))
                );
            }
            other => panic!("expected filter, got {:?}", other),
        }

        let parsed = segments("$[?(@.count>=5)]");
        match &parsed[0] {
            Segment::Filter(filter) => {
                assert_eq!(filter.condition, Some((CmpOp::Ge, Literal::Number(5.0))));
            }
            other => panic!("expected filter, got {:?}", other),
        }

        let parsed = segments("$[?(@.enabled)]");
        match &parsed[0] {
            Segment::Filter(filter) => assert!(filter.condition.is_none()),
            other => panic!("expected filter, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            JsonPath::parse("$.a["),
            Err(PathError::Syntax { .. })
        ));
        assert!(matches!(
            JsonPath::parse("$.a.b c"),
            Err(PathError::Syntax { .. })
        ));
        assert!(matches!(
            Template::parse("{.a"),
            Err(PathError::Syntax { .. })
        ));
    }

    #[test]
    fn test_parse_template() {
        let template = Template::parse("planet-{ .location }").unwrap();
        assert_eq!(template.parts().len(), 2);
        assert_eq!(template.parts()[0], TemplatePart::Text("planet-".to_string()));
        assert!(matches!(template.parts()[1], TemplatePart::Path(_)));

        let bare = Template::parse("$.status").unwrap();
        assert_eq!(bare.parts().len(), 1);
    }

    #[test]
    fn test_parse_template_braces_inside_literals() {
        let template = Template::parse(r#"{.items[?(@.name == "a}b")].v}"#).unwrap();
        assert_eq!(template.parts().len(), 1);
        assert!(matches!(template.parts()[0], TemplatePart::Path(_)));

        let template = Template::parse("id-{.items[?(@.name == '{x}')].v}-end").unwrap();
        assert_eq!(template.parts().len(), 3);
        assert_eq!(template.parts()[2], TemplatePart::Text("-end".to_string()));

        let bare = Template::parse(r#"$.items[?(@.name == "a{b")].v"#).unwrap();
        assert_eq!(bare.parts().len(), 1);

        let text = Template::parse("it's-{.a}").unwrap();
        assert_eq!(text.parts()[0], TemplatePart::Text("it's-".to_string()));
    }

    #[test]
    fn test_find_unquoted() {
        assert_eq!(find_unquoted(r#""}"}"#, '}'), Some(3));
        assert_eq!(find_unquoted("'}'", '}'), None);
        assert_eq!(find_unquoted("a'}", '}'), Some(2));
    }
}

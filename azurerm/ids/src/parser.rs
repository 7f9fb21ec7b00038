//! Template-driven matcher turning ID strings into named segment values.

use std::collections::HashMap;

use crate::error::ParseError;
use crate::segment::{example_id, Segment, SegmentKind};

/// Values extracted from an ID string, keyed by segment name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseResult {
    parsed: HashMap<&'static str, String>,
    raw_input: String,
}

impl ParseResult {
    pub fn get(&self, segment: &str) -> Option<&str> {
        self.parsed.get(segment).map(String::as_str)
    }

    /// Fetch a value that must have been parsed
    pub fn require(&self, id_type: &'static str, segment: &'static str) -> Result<String, ParseError> {
        self.parsed
            .get(segment)
            .cloned()
            .ok_or(ParseError::MissingParsedValue { id_type, segment })
    }

    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }

    /// Iterate over `(segment name, value)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.parsed.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Failure {
    Missing,
    InvalidConstant(String),
    Trailing(usize),
}

/// Furthest point reached while matching; the reported error comes from here.
#[derive(Debug, Default)]
struct Furthest {
    position: Option<(usize, Failure)>,
}

impl Furthest {
    fn record(&mut self, segment_index: usize, failure: Failure) {
        match &self.position {
            Some((index, _)) if *index >= segment_index => {}
            _ => self.position = Some((segment_index, failure)),
        }
    }
}

/// Matches input strings against an ordered segment template.
#[derive(Debug, Clone)]
pub struct Parser {
    id_type: &'static str,
    segments: Vec<Segment>,
}

impl Parser {
    pub fn new(id_type: &'static str, segments: Vec<Segment>) -> Self {
        Self { id_type, segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Parse `input`; with `insensitively` the literal segments ignore ASCII case.
    ///
    /// Literal and constant values are always returned in their canonical casing.
    pub fn parse(&self, input: &str, insensitively: bool) -> Result<ParseResult, ParseError> {
        if input.trim().is_empty() {
            return Err(ParseError::Empty {
                id_type: self.id_type,
            });
        }

        let trimmed = input.strip_prefix('/').unwrap_or(input);
        let tokens: Vec<&str> = trimmed.split('/').collect();

        let mut parsed = Vec::with_capacity(self.segments.len());
        let mut furthest = Furthest::default();

        if self.match_from(0, 0, &tokens, insensitively, &mut parsed, &mut furthest) {
            return Ok(ParseResult {
                parsed: parsed.into_iter().collect(),
                raw_input: input.to_string(),
            });
        }

        Err(self.error_for(furthest, &tokens, input))
    }

    fn match_from(
        &self,
        segment_index: usize,
        token_index: usize,
        tokens: &[&str],
        insensitively: bool,
        parsed: &mut Vec<(&'static str, String)>,
        furthest: &mut Furthest,
    ) -> bool {
        let Some(segment) = self.segments.get(segment_index) else {
            if token_index == tokens.len() {
                return true;
            }
            furthest.record(segment_index, Failure::Trailing(token_index));
            return false;
        };

        let Some(token) = tokens.get(token_index).copied() else {
            furthest.record(segment_index, Failure::Missing);
            return false;
        };

        match segment.kind() {
            SegmentKind::Static | SegmentKind::ResourceProvider => {
                let expected = segment.fixed_value().unwrap_or_default();
                if !literal_matches(expected, token, insensitively) {
                    furthest.record(segment_index, Failure::Missing);
                    return false;
                }
                parsed.push((segment.name(), expected.to_string()));
            }
            SegmentKind::Constant => {
                if token.is_empty() {
                    furthest.record(segment_index, Failure::Missing);
                    return false;
                }
                let Some(value) = segment
                    .possible_values()
                    .iter()
                    .find(|v| literal_matches(v, token, insensitively))
                else {
                    furthest.record(segment_index, Failure::InvalidConstant(token.to_string()));
                    return false;
                };
                parsed.push((segment.name(), value.to_string()));
            }
            SegmentKind::Scope => {
                return self.match_scope(
                    segment,
                    segment_index,
                    token_index,
                    tokens,
                    insensitively,
                    parsed,
                    furthest,
                );
            }
            SegmentKind::SubscriptionId | SegmentKind::ResourceGroup | SegmentKind::UserSpecified => {
                if token.is_empty() {
                    furthest.record(segment_index, Failure::Missing);
                    return false;
                }
                parsed.push((segment.name(), token.to_string()));
            }
        }

        if self.match_from(
            segment_index + 1,
            token_index + 1,
            tokens,
            insensitively,
            parsed,
            furthest,
        ) {
            return true;
        }

        parsed.pop();
        false
    }

    // Longest scope first, so nested IDs keep as much of the input as the rest of the template allows.
    #[allow(clippy::too_many_arguments)]
    fn match_scope(
        &self,
        segment: &Segment,
        segment_index: usize,
        token_index: usize,
        tokens: &[&str],
        insensitively: bool,
        parsed: &mut Vec<(&'static str, String)>,
        furthest: &mut Furthest,
    ) -> bool {
        for end in (token_index + 1..=tokens.len()).rev() {
            let scope_tokens = &tokens[token_index..end];
            if scope_tokens.iter().any(|t| t.is_empty()) {
                continue;
            }

            parsed.push((segment.name(), format!("/{}", scope_tokens.join("/"))));
            if self.match_from(
                segment_index + 1,
                end,
                tokens,
                insensitively,
                parsed,
                furthest,
            ) {
                return true;
            }
            parsed.pop();
        }

        furthest.record(segment_index, Failure::Missing);
        false
    }

    fn error_for(&self, furthest: Furthest, tokens: &[&str], input: &str) -> ParseError {
        let Some((segment_index, failure)) = furthest.position else {
            return ParseError::Empty {
                id_type: self.id_type,
            };
        };

        match failure {
            Failure::Trailing(token_index) => ParseError::UnexpectedTrailingSegments {
                id_type: self.id_type,
                input: input.to_string(),
                trailing: tokens[token_index..].join("/"),
            },
            Failure::InvalidConstant(value) => {
                let segment = &self.segments[segment_index];
                ParseError::InvalidConstant {
                    id_type: self.id_type,
                    segment: segment.name(),
                    value,
                    possible_values: segment.possible_values(),
                    input: input.to_string(),
                }
            }
            Failure::Missing => ParseError::SegmentNotSpecified {
                id_type: self.id_type,
                segment: self.segments[segment_index].name(),
                expected: example_id(&self.segments),
                input: input.to_string(),
            },
        }
    }
}

fn literal_matches(expected: &str, token: &str, insensitively: bool) -> bool {
    if insensitively {
        expected.eq_ignore_ascii_case(token)
    } else {
        expected == token
    }
}

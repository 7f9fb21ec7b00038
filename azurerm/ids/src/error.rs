//! Error types for resource ID parsing and validation

use thiserror::Error;

/// Errors returned when an input does not match a resource ID template
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing to parse
    #[error("parsing the {id_type} ID: the input was empty")]
    Empty { id_type: &'static str },

    /// A segment was missing, empty, or a literal did not match
    #[error(
        "parsing the {id_type} ID {input:?}: the segment {segment:?} was missing or did not match\n\n\
         Expected an ID that matched:\n\n> {expected}"
    )]
    SegmentNotSpecified {
        id_type: &'static str,
        segment: &'static str,
        expected: String,
        input: String,
    },

    /// A constant segment held a value outside its possible values
    #[error(
        "parsing the {id_type} ID {input:?}: the value {value:?} for the segment {segment:?} \
         must be one of {possible_values:?}"
    )]
    InvalidConstant {
        id_type: &'static str,
        segment: &'static str,
        value: String,
        possible_values: &'static [&'static str],
        input: String,
    },

    /// The input continued after the last template segment
    #[error("parsing the {id_type} ID {input:?}: unexpected trailing segments {trailing:?}")]
    UnexpectedTrailingSegments {
        id_type: &'static str,
        input: String,
        trailing: String,
    },

    /// A parse result did not carry a value the ID type needs
    #[error("building the {id_type} ID: the parsed value for {segment:?} was missing")]
    MissingParsedValue {
        id_type: &'static str,
        segment: &'static str,
    },
}

impl ParseError {
    /// The name of the segment the error is about, if any
    pub fn segment(&self) -> Option<&'static str> {
        match self {
            ParseError::SegmentNotSpecified { segment, .. }
            | ParseError::InvalidConstant { segment, .. }
            | ParseError::MissingParsedValue { segment, .. } => Some(segment),
            ParseError::Empty { .. } | ParseError::UnexpectedTrailingSegments { .. } => None,
        }
    }

    pub fn id_type(&self) -> &'static str {
        match self {
            ParseError::Empty { id_type }
            | ParseError::SegmentNotSpecified { id_type, .. }
            | ParseError::InvalidConstant { id_type, .. }
            | ParseError::UnexpectedTrailingSegments { id_type, .. }
            | ParseError::MissingParsedValue { id_type, .. } => id_type,
        }
    }
}

/// Errors produced by the schema validation adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("expected {key:?} to be a string")]
    NotAString { key: String },

    #[error("{key:?} is not a valid ID: {source}")]
    Invalid {
        key: String,
        #[source]
        source: ParseError,
    },
}

// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Type dictionary text parser.
//!
//! Parses the canonical dictionary format in a single forward scan:
//!
//! ```text
//! 35 com.app.Person {
//!     java.lang.String com.app.Person#name,
//!     int com.app.Person#age,
//!     [list] addresses (
//!         java.lang.String street,
//!     ),
//! }
//! ```
//!
//! Each entry is `typeId typeName { member* }`, each member line ends with
//! `,`, qualifiers are separated with `#`, complex members nest their member
//! list in `( )`.  Whitespace between tokens is free-form; the assembler in
//! [`super::assembler`] emits one canonical shape of it.

use std::fmt;

use crate::member::{
    self, MemberDescriptor, KEYWORD_ENUM, KEYWORD_PRIMITIVE, TYPE_COMPLEX,
};
use crate::resolving::FieldLengthResolver;

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

pub const TYPE_START: char = '{';
pub const TYPE_END: char = '}';
pub const MEMBER_TERMINATOR: char = ',';
pub const COMPLEX_START: char = '(';
pub const COMPLEX_END: char = ')';

// ---------------------------------------------------------------------------
// ParseError
// ---------------------------------------------------------------------------

/// Malformed dictionary text. `position` is the character offset at which
/// the scan could not continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input ended inside an unfinished entry or member.
    IncompleteInput { position: usize },
    /// An entry does not start with a type id.
    MissingTypeId { position: usize },
    /// A type id token is not a valid positive integer.
    InvalidTypeId { position: usize, token: String },
    /// A type id is not followed by a type name.
    MissingTypeName { position: usize },
    /// A type name is not followed by a `{ }` body.
    MissingTypeBody { position: usize },
    /// A member type is not followed by a member name.
    MissingMemberName { position: usize },
    /// A member line starts with a terminator instead of a type.
    MissingMemberType { position: usize },
    /// The `enum` keyword is not followed by a constant name.
    MissingEnumName { position: usize },
    /// The `primitive` keyword is not followed by a definition.
    MissingPrimitiveDefinition { position: usize },
    /// A member is not terminated with `,`.
    MissingMemberTerminator { position: usize },
    /// A complex member name is not followed by a `( )` member list.
    MissingComplexTypeDefinition { position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::IncompleteInput { position }
            | ParseError::MissingTypeId { position }
            | ParseError::InvalidTypeId { position, .. }
            | ParseError::MissingTypeName { position }
            | ParseError::MissingTypeBody { position }
            | ParseError::MissingMemberName { position }
            | ParseError::MissingMemberType { position }
            | ParseError::MissingEnumName { position }
            | ParseError::MissingPrimitiveDefinition { position }
            | ParseError::MissingMemberTerminator { position }
            | ParseError::MissingComplexTypeDefinition { position } => *position,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::IncompleteInput { position } => {
                write!(f, "incomplete input at offset {}", position)
            }
            ParseError::MissingTypeId { position } => {
                write!(f, "missing type id at offset {}", position)
            }
            ParseError::InvalidTypeId { position, token } => {
                write!(f, "invalid type id \"{}\" at offset {}", token, position)
            }
            ParseError::MissingTypeName { position } => {
                write!(f, "missing type name at offset {}", position)
            }
            ParseError::MissingTypeBody { position } => {
                write!(f, "missing type body at offset {}", position)
            }
            ParseError::MissingMemberName { position } => {
                write!(f, "missing member name at offset {}", position)
            }
            ParseError::MissingMemberType { position } => {
                write!(f, "missing member type at offset {}", position)
            }
            ParseError::MissingEnumName { position } => {
                write!(f, "missing enum constant name at offset {}", position)
            }
            ParseError::MissingPrimitiveDefinition { position } => {
                write!(f, "missing primitive definition at offset {}", position)
            }
            ParseError::MissingMemberTerminator { position } => {
                write!(f, "missing member terminator ',' at offset {}", position)
            }
            ParseError::MissingComplexTypeDefinition { position } => {
                write!(f, "missing complex member definition at offset {}", position)
            }
        }
    }
}

impl std::error::Error for ParseError {}

// ---------------------------------------------------------------------------
// TypeDictionaryEntry
// ---------------------------------------------------------------------------

/// One parsed dictionary entry, before resolution into a type definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDictionaryEntry {
    pub type_id: u64,
    pub type_name: String,
    pub members: Vec<MemberDescriptor>,
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse a full dictionary text into its entries.
pub fn parse_type_dictionary(
    input: &str,
    length_resolver: &dyn FieldLengthResolver,
) -> Result<Vec<TypeDictionaryEntry>, ParseError> {
    Scanner::new(input, length_resolver).parse_all()
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    lengths: &'a dyn FieldLengthResolver,
}

impl<'a> Scanner<'a> {
    fn new(input: &str, lengths: &'a dyn FieldLengthResolver) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            lengths,
        }
    }

    fn parse_all(mut self) -> Result<Vec<TypeDictionaryEntry>, ParseError> {
        let mut entries = Vec::new();
        loop {
            self.skip_whitespace();
            if self.at_end() {
                return Ok(entries);
            }
            entries.push(self.parse_entry()?);
        }
    }

    // -- entry --------------------------------------------------------------

    fn parse_entry(&mut self) -> Result<TypeDictionaryEntry, ParseError> {
        let id_pos = self.pos;
        let id_token = self.read_token();
        if id_token.is_empty() {
            return Err(ParseError::MissingTypeId { position: id_pos });
        }
        let type_id: u64 = id_token.parse().map_err(|_| ParseError::InvalidTypeId {
            position: id_pos,
            token: id_token,
        })?;
        if type_id == 0 {
            return Err(ParseError::InvalidTypeId {
                position: id_pos,
                token: "0".to_string(),
            });
        }

        self.skip_whitespace();
        let name_pos = self.pos;
        let type_name = self.read_token();
        if type_name.is_empty() || type_name.starts_with(TYPE_START) {
            return Err(ParseError::MissingTypeName { position: name_pos });
        }

        self.skip_whitespace();
        if !self.consume(TYPE_START) {
            return Err(ParseError::MissingTypeBody { position: self.pos });
        }
        let members = self.parse_members(TYPE_END)?;
        Ok(TypeDictionaryEntry {
            type_id,
            type_name,
            members,
        })
    }

    // -- members ------------------------------------------------------------

    fn parse_members(&mut self, closer: char) -> Result<Vec<MemberDescriptor>, ParseError> {
        let mut members = Vec::new();
        loop {
            self.skip_whitespace();
            if self.consume(closer) {
                return Ok(members);
            }
            if self.at_end() {
                return Err(ParseError::IncompleteInput { position: self.pos });
            }
            members.push(self.parse_member()?);
        }
    }

    fn parse_member(&mut self) -> Result<MemberDescriptor, ParseError> {
        let type_pos = self.pos;
        let type_name = self.read_token_until_member_delimiter();
        if type_name.is_empty() {
            return Err(ParseError::MissingMemberType { position: type_pos });
        }

        let descriptor = match type_name.as_str() {
            KEYWORD_PRIMITIVE => {
                // the definition runs to the terminator and may contain spaces
                self.skip_inline_whitespace();
                let def_pos = self.pos;
                let definition = self.read_until_terminator().trim().to_string();
                if definition.is_empty() {
                    return Err(ParseError::MissingPrimitiveDefinition { position: def_pos });
                }
                let length = self.lengths.resolve_fixed_length(&definition);
                return self.terminated(MemberDescriptor::primitive(definition, length));
            }
            KEYWORD_ENUM => {
                self.skip_inline_whitespace();
                let name_pos = self.pos;
                let name = self.read_token_until_member_delimiter();
                if name.is_empty() {
                    return Err(ParseError::MissingEnumName { position: name_pos });
                }
                MemberDescriptor::enum_constant(name)
            }
            TYPE_COMPLEX => {
                self.skip_inline_whitespace();
                let name_pos = self.pos;
                let identifier = self.read_token_until_member_delimiter();
                if identifier.is_empty() {
                    return Err(ParseError::MissingMemberName { position: name_pos });
                }
                self.skip_whitespace();
                if !self.consume(COMPLEX_START) {
                    return Err(ParseError::MissingComplexTypeDefinition { position: self.pos });
                }
                let nested = self.parse_members(COMPLEX_END)?;
                let (qualifier, name) = member::split_full_qualified_field_name(&identifier);
                MemberDescriptor::complex_field(
                    qualifier.map(str::to_string),
                    name,
                    nested,
                    self.lengths.variable_min_length(TYPE_COMPLEX),
                    self.lengths.variable_max_length(TYPE_COMPLEX),
                )
            }
            _ if member::is_variable_length_type(&type_name) => {
                self.skip_inline_whitespace();
                let name_pos = self.pos;
                let identifier = self.read_token_until_member_delimiter();
                if identifier.is_empty() {
                    return Err(ParseError::MissingMemberName { position: name_pos });
                }
                let (qualifier, name) = member::split_full_qualified_field_name(&identifier);
                MemberDescriptor::variable_length_field(
                    type_name.clone(),
                    qualifier.map(str::to_string),
                    name,
                    self.lengths.variable_min_length(&type_name),
                    self.lengths.variable_max_length(&type_name),
                )
            }
            _ => {
                self.skip_inline_whitespace();
                let name_pos = self.pos;
                let identifier = self.read_token_until_member_delimiter();
                if identifier.is_empty() {
                    return Err(ParseError::MissingMemberName { position: name_pos });
                }
                let (qualifier, name) = member::split_full_qualified_field_name(&identifier);
                let is_reference = !member::is_primitive_type_name(&type_name);
                let length = if is_reference {
                    self.lengths.reference_length()
                } else {
                    self.lengths.resolve_fixed_length(&type_name)
                };
                MemberDescriptor::simple_field(
                    type_name,
                    qualifier.map(str::to_string),
                    name,
                    is_reference,
                    length,
                    length,
                )
            }
        };
        self.terminated(descriptor)
    }

    fn terminated(&mut self, m: MemberDescriptor) -> Result<MemberDescriptor, ParseError> {
        self.skip_whitespace();
        if !self.consume(MEMBER_TERMINATOR) {
            return Err(ParseError::MissingMemberTerminator { position: self.pos });
        }
        Ok(m)
    }

    // -- scanning primitives ------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn consume(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn skip_inline_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c == ' ' || c == '\t') {
            self.pos += 1;
        }
    }

    /// Read a whitespace-delimited token.
    fn read_token(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if !c.is_whitespace()) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Read a token delimited by whitespace or any member structure symbol.
    fn read_token_until_member_delimiter(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if !c.is_whitespace()
                && c != MEMBER_TERMINATOR
                && c != TYPE_END
                && c != COMPLEX_START
                && c != COMPLEX_END
        ) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Read raw text up to (not including) the member terminator or closer.
    fn read_until_terminator(&mut self) -> String {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(c) if c != MEMBER_TERMINATOR && c != TYPE_END
        ) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolving::StandardLengthResolver;

    fn parse(input: &str) -> Result<Vec<TypeDictionaryEntry>, ParseError> {
        parse_type_dictionary(input, &StandardLengthResolver)
    }

    #[test]
    fn parses_simple_entry() {
        let entries = parse(
            "35 com.app.Person {\n\
             \tjava.lang.String com.app.Person#name,\n\
             \tint com.app.Person#age,\n\
             }\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.type_id, 35);
        assert_eq!(e.type_name, "com.app.Person");
        assert_eq!(e.members.len(), 2);
        assert_eq!(e.members[0].identifier(), "com.app.Person#name");
        assert!(e.members[0].is_reference());
        assert_eq!(e.members[1].qualifier(), Some("com.app.Person"));
        assert!(!e.members[1].is_reference());
        assert_eq!(e.members[1].persistent_max_length(), 4);
    }

    #[test]
    fn parses_primitive_definition_with_spaces() {
        let entries = parse("6 int {\n\tprimitive int,\n}\n").unwrap();
        assert!(entries[0].members[0].is_primitive_definition());
        assert_eq!(entries[0].members[0].persistent_min_length(), 4);
    }

    #[test]
    fn parses_enum_constants() {
        let entries = parse(
            "40 com.app.Color {\n\tenum RED,\n\tenum GREEN,\n\tint rgb,\n}\n",
        )
        .unwrap();
        let members = &entries[0].members;
        assert!(members[0].is_enum_constant());
        assert_eq!(members[1].name(), Some("GREEN"));
        assert!(members[2].is_instance_member());
    }

    #[test]
    fn parses_nested_complex_member() {
        let entries = parse(
            "50 com.app.Order {\n\
             \t[list] items (\n\
             \t\tjava.lang.String sku,\n\
             \t\tint count,\n\
             \t),\n\
             }\n",
        )
        .unwrap();
        let items = &entries[0].members[0];
        assert_eq!(items.type_name(), TYPE_COMPLEX);
        match items {
            MemberDescriptor::GenericComplexField { nested, .. } => {
                assert_eq!(nested.len(), 2);
                assert_eq!(nested[0].name(), Some("sku"));
            }
            other => panic!("expected complex member, got {:?}", other),
        }
        assert!(items.has_references());
    }

    #[test]
    fn parses_variable_length_members() {
        let entries = parse("7 com.app.Blob {\n\t[byte] data,\n\t[char] text,\n}\n").unwrap();
        assert!(entries[0].members[0].is_variable_length());
        assert_eq!(entries[0].members[1].type_name(), "[char]");
    }

    #[test]
    fn parses_multiple_entries_with_loose_whitespace() {
        let entries = parse("6 int { primitive int, }  35 com.app.Person { }").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[1].members.is_empty());
    }

    #[test]
    fn error_invalid_type_id() {
        let err = parse("abc com.app.Person { }").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTypeId { position: 0, .. }));
    }

    #[test]
    fn error_zero_type_id() {
        let err = parse("0 com.app.Person { }").unwrap_err();
        assert!(matches!(err, ParseError::InvalidTypeId { .. }));
    }

    #[test]
    fn error_missing_type_body() {
        let err = parse("35 com.app.Person").unwrap_err();
        assert!(matches!(err, ParseError::MissingTypeBody { .. }));
    }

    #[test]
    fn error_missing_member_terminator() {
        let err = parse("35 com.app.Person {\n\tint age\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingMemberTerminator { .. }));
    }

    #[test]
    fn error_missing_member_name() {
        let err = parse("35 com.app.Person {\n\tint ,\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingMemberName { .. }));
    }

    #[test]
    fn error_missing_enum_name() {
        let err = parse("40 com.app.Color {\n\tenum ,\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingEnumName { .. }));
    }

    #[test]
    fn error_missing_primitive_definition() {
        let err = parse("6 int {\n\tprimitive ,\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingPrimitiveDefinition { .. }));
    }

    #[test]
    fn error_missing_complex_definition() {
        let err = parse("50 com.app.Order {\n\t[list] items,\n}\n").unwrap_err();
        assert!(matches!(err, ParseError::MissingComplexTypeDefinition { .. }));
    }

    #[test]
    fn error_incomplete_input() {
        let err = parse("35 com.app.Person {\n\tint age,\n").unwrap_err();
        assert!(matches!(err, ParseError::IncompleteInput { .. }));
    }

    #[test]
    fn error_position_is_reported() {
        let err = parse("xyz").unwrap_err();
        assert_eq!(err.position(), 0);
    }
}

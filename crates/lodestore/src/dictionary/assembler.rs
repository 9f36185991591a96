// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 lodestore contributors

//! Canonical type dictionary text emission, the inverse of the parser.

use crate::dictionary::definition::TypeDefinition;
use crate::dictionary::parser::{
    COMPLEX_END, COMPLEX_START, MEMBER_TERMINATOR, TYPE_END, TYPE_START,
};
use crate::member::{
    full_qualified_field_name, MemberDescriptor, KEYWORD_ENUM, KEYWORD_PRIMITIVE, TYPE_COMPLEX,
};

const INDENT: char = '\t';

/// Assemble the full dictionary text for the given definitions.  Callers are
/// expected to pass definitions ordered by type id; the assembler preserves
/// the given order.
pub fn assemble_dictionary<'a, I>(definitions: I) -> String
where
    I: IntoIterator<Item = &'a TypeDefinition>,
{
    let mut out = String::new();
    for definition in definitions {
        assemble_definition(&mut out, definition);
    }
    out
}

/// Append one entry: `typeId typeName {\n members }\n`.
pub fn assemble_definition(out: &mut String, definition: &TypeDefinition) {
    out.push_str(&definition.type_id().to_string());
    out.push(' ');
    out.push_str(definition.type_name());
    out.push(' ');
    out.push(TYPE_START);
    out.push('\n');
    for m in definition.all_members() {
        assemble_member(out, m, 1);
    }
    out.push(TYPE_END);
    out.push('\n');
}

fn assemble_member(out: &mut String, m: &MemberDescriptor, depth: usize) {
    for _ in 0..depth {
        out.push(INDENT);
    }
    match m {
        MemberDescriptor::PrimitiveDefinition { definition, .. } => {
            out.push_str(KEYWORD_PRIMITIVE);
            out.push(' ');
            out.push_str(definition);
        }
        MemberDescriptor::EnumConstant { persisted_name, .. } => {
            out.push_str(KEYWORD_ENUM);
            out.push(' ');
            out.push_str(persisted_name);
        }
        MemberDescriptor::GenericComplexField {
            qualifier,
            field_name,
            nested,
            ..
        } => {
            out.push_str(TYPE_COMPLEX);
            out.push(' ');
            out.push_str(&full_qualified_field_name(qualifier.as_deref(), field_name));
            out.push(' ');
            out.push(COMPLEX_START);
            out.push('\n');
            for n in nested {
                assemble_member(out, n, depth + 1);
            }
            for _ in 0..depth {
                out.push(INDENT);
            }
            out.push(COMPLEX_END);
        }
        other => {
            out.push_str(other.type_name());
            out.push(' ');
            out.push_str(&other.identifier());
        }
    }
    out.push(MEMBER_TERMINATOR);
    out.push('\n');
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::parser::parse_type_dictionary;
    use crate::resolving::StandardLengthResolver;

    fn person() -> TypeDefinition {
        TypeDefinition::new(
            35,
            "com.app.Person",
            vec![
                MemberDescriptor::simple_field(
                    "java.lang.String",
                    Some("com.app.Person".to_string()),
                    "name",
                    true,
                    8,
                    8,
                ),
                MemberDescriptor::simple_field("int", Some("com.app.Person".to_string()), "age", false, 4, 4),
            ],
        )
    }

    #[test]
    fn assembles_canonical_entry() {
        let mut out = String::new();
        assemble_definition(&mut out, &person());
        assert_eq!(
            out,
            "35 com.app.Person {\n\
             \tjava.lang.String com.app.Person#name,\n\
             \tint com.app.Person#age,\n\
             }\n"
        );
    }

    #[test]
    fn assembled_text_reparses_identically() {
        let order = TypeDefinition::new(
            50,
            "com.app.Order",
            vec![MemberDescriptor::complex_field(
                None,
                "items",
                vec![
                    MemberDescriptor::simple_field("java.lang.String", None, "sku", true, 8, 8),
                    MemberDescriptor::simple_field("int", None, "count", false, 4, 4),
                ],
                0,
                u64::MAX,
            )],
        );
        let text = assemble_dictionary([&person(), &order]);
        let entries = parse_type_dictionary(&text, &StandardLengthResolver).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].type_id, 35);
        assert_eq!(entries[1].type_name, "com.app.Order");
        let reparsed = TypeDefinition::new(
            entries[1].type_id,
            entries[1].type_name.clone(),
            entries[1].members.clone(),
        );
        assert!(reparsed.equals_description(&order));
    }

    #[test]
    fn assembles_primitive_and_enum_members() {
        let mut out = String::new();
        assemble_definition(
            &mut out,
            &TypeDefinition::new(
                6,
                "int",
                vec![MemberDescriptor::primitive("int", 4)],
            ),
        );
        assemble_definition(
            &mut out,
            &TypeDefinition::new(
                40,
                "com.app.Color",
                vec![
                    MemberDescriptor::enum_constant("RED"),
                    MemberDescriptor::enum_constant("GREEN"),
                ],
            ),
        );
        assert!(out.contains("\tprimitive int,\n"));
        assert!(out.contains("\tenum RED,\n"));
        let entries = parse_type_dictionary(&out, &StandardLengthResolver).unwrap();
        assert_eq!(entries.len(), 2);
    }
}

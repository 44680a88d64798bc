//! Parsing utilities for table and field attributes
//!
//! This module handles the parsing of `#[table]`, `#[primary_key]`,
//! `#[soft_delete]` and the serde attributes that decide column names, and
//! validates table and column names.

use proc_macro2::{Span, TokenStream, TokenTree};
use quote::ToTokens;
use syn::{Attribute, Data, Error, Fields, Ident, Meta, Result, Type};

/// Validate table name and return syn::Error for better proc macro error handling
pub fn validate_table_name_syn(name: &str, span: Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid table name '{}': {}", name, e)))
}

/// Validate column name and return syn::Error for better proc macro error handling
pub fn validate_field_name_syn(name: &str, span: Span) -> Result<()> {
    validate_identifier(name)
        .map_err(|e| Error::new(span, format!("Invalid field name '{}': {}", name, e)))
}

/// Validation logic that mirrors store_object::validation
fn validate_identifier(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".to_string());
    }

    // PostgreSQL limit
    if name.len() > 63 {
        return Err(format!(
            "Name '{}' is too long: {} characters (max 63)",
            name,
            name.len()
        ));
    }

    let first_char = name
        .chars()
        .next()
        .ok_or_else(|| "Name cannot be empty".to_string())?;
    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(format!(
            "Name '{}' must start with a letter or underscore",
            name
        ));
    }

    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(format!("Name '{}' contains invalid characters: only alphanumeric characters and underscores are allowed", name));
    }

    if is_reserved_keyword(name) {
        return Err(format!("Name '{}' is a reserved SQL keyword", name));
    }

    Ok(())
}

/// Same list as store_object::validation
fn is_reserved_keyword(name: &str) -> bool {
    const RESERVED_KEYWORDS: &[&str] = &[
        "SELECT",
        "INSERT",
        "UPDATE",
        "DELETE",
        "FROM",
        "WHERE",
        "JOIN",
        "INNER",
        "LEFT",
        "RIGHT",
        "FULL",
        "OUTER",
        "ON",
        "AS",
        "AND",
        "OR",
        "NOT",
        "NULL",
        "TRUE",
        "FALSE",
        "CASE",
        "WHEN",
        "THEN",
        "ELSE",
        "END",
        "IF",
        "EXISTS",
        "IN",
        "LIKE",
        "BETWEEN",
        "ORDER",
        "BY",
        "GROUP",
        "HAVING",
        "LIMIT",
        "OFFSET",
        "UNION",
        "ALL",
        "DISTINCT",
        "CREATE",
        "DROP",
        "ALTER",
        "TABLE",
        "INDEX",
        "VIEW",
        "SCHEMA",
        "PRIMARY",
        "FOREIGN",
        "REFERENCES",
        "UNIQUE",
        "CHECK",
        "DEFAULT",
        "CONSTRAINT",
        "COLUMN",
        "RETURNING",
        "CONFLICT",
        "EXCLUDED",
    ];

    RESERVED_KEYWORDS.contains(&name.to_ascii_uppercase().as_str())
}

/// One `key` or `key = "value"` entry of an attribute list
#[derive(Debug, Clone, PartialEq, Eq)]
struct AttributeArg {
    key: String,
    value: Option<String>,
}

/// Read `key = "value"` and bare `key` entries from an attribute's tokens
///
/// Parenthesized groups such as serde's `rename(serialize = "..")` are
/// skipped.
fn parse_attribute_args(tokens: &TokenStream) -> Vec<AttributeArg> {
    let mut args = Vec::new();
    let mut tokens = tokens.clone().into_iter().peekable();

    while let Some(token) = tokens.next() {
        let TokenTree::Ident(key) = token else {
            continue;
        };
        let mut value = None;

        if let Some(TokenTree::Punct(punct)) = tokens.peek() {
            if punct.as_char() == '=' {
                tokens.next(); // consume '='
                if let Some(TokenTree::Literal(lit)) = tokens.next() {
                    value = Some(lit.to_string().trim_matches('"').to_string());
                }
            }
        }

        if let Some(TokenTree::Group(_)) = tokens.peek() {
            tokens.next();
            continue;
        }

        args.push(AttributeArg {
            key: key.to_string(),
            value,
        });
    }

    args
}

fn attribute_args(attr: &Attribute) -> Vec<AttributeArg> {
    match &attr.meta {
        Meta::List(meta_list) => parse_attribute_args(&meta_list.tokens),
        _ => Vec::new(),
    }
}

#[derive(Debug)]
pub struct TableInfo {
    pub name: String,
}

pub fn parse_table_attributes(attrs: &[Attribute]) -> Result<TableInfo> {
    let mut table_name = None;

    for attr in attrs {
        if attr.path().is_ident("table") {
            for arg in attribute_args(attr) {
                if arg.key == "name" {
                    table_name = arg.value;
                }
            }
        } else if attr.path().is_ident("serde")
            && attribute_args(attr).iter().any(|arg| arg.key == "rename_all")
        {
            return Err(Error::new_spanned(
                attr,
                "serde(rename_all) is not supported on models: rename fields individually",
            ));
        }
    }

    let table_name = table_name.ok_or_else(|| {
        Error::new(
            Span::call_site(),
            "table attribute is required: add #[table(name = \"table_name\")] to your struct",
        )
    })?;

    validate_table_name_syn(&table_name, Span::call_site())?;

    Ok(TableInfo { name: table_name })
}

/// The field carrying the deletion marker
#[derive(Debug)]
pub struct SoftDeleteInfo {
    pub ident: Ident,
    /// Serialized name
    pub field: String,
    /// `#[soft_delete(column = "...")]`
    pub column: Option<String>,
}

#[derive(Debug)]
pub struct FieldInfo {
    pub primary_key_field: Ident,
    pub primary_key_column: String,
    pub primary_key_type: Type,
    /// Serialized names of every persisted field, in declaration order
    pub columns: Vec<String>,
    pub soft_delete: Option<SoftDeleteInfo>,
}

pub fn parse_field_attributes(data: &Data) -> Result<FieldInfo> {
    let Data::Struct(data_struct) = data else {
        return Err(named_fields_required());
    };
    let Fields::Named(fields_named) = &data_struct.fields else {
        return Err(named_fields_required());
    };

    let mut primary_key = None;
    let mut columns = Vec::new();
    let mut soft_delete: Option<SoftDeleteInfo> = None;

    for field in &fields_named.named {
        let field_name = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "Field must have a name"))?;

        let serde_args: Vec<AttributeArg> = field
            .attrs
            .iter()
            .filter(|attr| attr.path().is_ident("serde"))
            .flat_map(attribute_args)
            .collect();

        if serde_args.iter().any(|arg| arg.key == "skip") {
            if has_attribute(&field.attrs, "primary_key") || has_attribute(&field.attrs, "soft_delete")
            {
                return Err(Error::new_spanned(
                    field_name,
                    "primary key and soft delete fields cannot be skipped by serde",
                ));
            }
            continue;
        }

        let column = serde_args
            .iter()
            .find(|arg| arg.key == "rename")
            .and_then(|arg| arg.value.clone())
            .unwrap_or_else(|| field_name.to_string());
        validate_field_name_syn(&column, field_name.span())?;

        if has_attribute(&field.attrs, "primary_key") {
            if primary_key.is_some() {
                return Err(Error::new_spanned(
                    field_name,
                    "only one field can be marked #[primary_key]",
                ));
            }
            primary_key = Some((field_name.clone(), column.clone(), field.ty.clone()));
        }

        if let Some(attr) = find_attribute(&field.attrs, "soft_delete") {
            if soft_delete.is_some() {
                return Err(Error::new_spanned(
                    field_name,
                    "only one field can be marked #[soft_delete]",
                ));
            }
            if !is_optional_type(&field.ty) {
                return Err(Error::new_spanned(
                    &field.ty,
                    "#[soft_delete] field must be Option<DateTime<Utc>>",
                ));
            }
            let marker_column = attribute_args(attr)
                .into_iter()
                .find(|arg| arg.key == "column")
                .and_then(|arg| arg.value);
            if let Some(marker_column) = &marker_column {
                validate_field_name_syn(marker_column, field_name.span())?;
            }
            soft_delete = Some(SoftDeleteInfo {
                ident: field_name.clone(),
                field: column.clone(),
                column: marker_column,
            });
        }

        columns.push(column);
    }

    let (primary_key_field, primary_key_column, primary_key_type) =
        primary_key.ok_or_else(|| {
            Error::new(
                Span::call_site(),
                "a #[primary_key] field is required",
            )
        })?;

    Ok(FieldInfo {
        primary_key_field,
        primary_key_column,
        primary_key_type,
        columns,
        soft_delete,
    })
}

fn named_fields_required() -> Error {
    Error::new(
        Span::call_site(),
        "TableMetadata can only be derived for structs with named fields",
    )
}

fn is_optional_type(ty: &Type) -> bool {
    ty.to_token_stream()
        .to_string()
        .replace(' ', "")
        .starts_with("Option<")
}

pub fn has_attribute(attrs: &[Attribute], name: &str) -> bool {
    attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn find_attribute<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attrs.iter().find(|attr| attr.path().is_ident(name))
}

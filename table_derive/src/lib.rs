//! Procedural macros for record metadata
//!
//! This crate provides the `#[model]` macro and `TableMetadata` derive. The
//! derive implements `TableMetadata`, `SoftDeletable` for records with a
//! `#[soft_delete]` field, and `Entity`, which selects the repository type.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod codegen;
mod model_macro;
mod parsing;

use codegen::{generate_entity_impl, generate_soft_deletable_impl, generate_table_metadata_impl};
use model_macro::model_attribute;
use parsing::{parse_field_attributes, parse_table_attributes};

/// Derive macro for TableMetadata trait
///
/// Note: It's recommended to use the `#[model]` attribute macro instead,
/// which automatically includes this derive along with the serde derives.
///
/// Manual usage:
/// ```ignore
/// #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, TableMetadata)]
/// #[table(name = "invoices")]
/// pub struct Invoice {
///     #[primary_key]
///     pub id: i64,
///
///     pub total_cents: i64,
///
///     #[soft_delete(column = "removed_at")]
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
///
/// Column names are the serialized field names, so `#[serde(rename = "...")]`
/// renames the column too. The marker column defaults to the configured
/// `soft-delete.column-name` unless `column` is given.
#[proc_macro_derive(TableMetadata, attributes(table, primary_key, soft_delete))]
pub fn derive_table_metadata(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;

    let table_info = match parse_table_attributes(&input.attrs) {
        Ok(attrs) => attrs,
        Err(e) => return e.to_compile_error().into(),
    };

    let field_info = match parse_field_attributes(&input.data) {
        Ok(info) => info,
        Err(e) => return e.to_compile_error().into(),
    };

    let table_metadata_impl = generate_table_metadata_impl(name, &table_info, &field_info);
    let soft_deletable_impl = generate_soft_deletable_impl(name, &field_info);
    let entity_impl = generate_entity_impl(name, &field_info);

    let expanded = quote::quote! {
        #table_metadata_impl
        #soft_deletable_impl
        #entity_impl
    };

    TokenStream::from(expanded)
}

/// Convenience attribute macro that adds all necessary derives for a record
///
/// Usage:
/// ```ignore
/// use table_derive::model;
///
/// #[model]
/// #[table(name = "posts")]
/// pub struct Post {
///     #[primary_key]
///     pub id: Uuid,
///     pub title: String,
///     #[soft_delete]
///     pub deleted_at: Option<DateTime<Utc>>,
/// }
/// ```
#[proc_macro_attribute]
pub fn model(attr: TokenStream, item: TokenStream) -> TokenStream {
    model_attribute(attr, item)
}

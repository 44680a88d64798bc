//! Code generation for record metadata
//!
//! Emits the `TableMetadata` impl, the `SoftDeletable` impl for records with
//! a marker field, and the `Entity` impl that picks the repository type.

use proc_macro2::TokenStream;
use quote::quote;
use syn::Ident;

use crate::parsing::{FieldInfo, TableInfo};

pub fn generate_table_metadata_impl(
    name: &Ident,
    table_info: &TableInfo,
    field_info: &FieldInfo,
) -> TokenStream {
    let table_name = &table_info.name;
    let primary_key_field = &field_info.primary_key_field;
    let primary_key_column = &field_info.primary_key_column;
    let primary_key_type = &field_info.primary_key_type;
    let columns = &field_info.columns;

    let soft_delete_methods = match &field_info.soft_delete {
        Some(marker) => {
            let field = &marker.field;
            let column_override = marker.column.as_ref().map(|column| {
                quote! {
                    fn soft_delete_column() -> Option<&'static str> {
                        Some(#column)
                    }
                }
            });
            quote! {
                fn supports_soft_delete() -> bool {
                    true
                }

                fn soft_delete_field() -> Option<&'static str> {
                    Some(#field)
                }

                #column_override
            }
        }
        None => quote! {},
    };

    quote! {
        impl store_object::TableMetadata for #name {
            type Id = #primary_key_type;

            fn table_name() -> &'static str {
                #table_name
            }

            fn primary_key_field() -> &'static str {
                #primary_key_column
            }

            fn columns() -> Vec<&'static str> {
                vec![#(#columns),*]
            }

            fn extract_id(&self) -> Self::Id {
                ::std::clone::Clone::clone(&self.#primary_key_field)
            }

            #soft_delete_methods
        }
    }
}

pub fn generate_soft_deletable_impl(name: &Ident, field_info: &FieldInfo) -> TokenStream {
    let Some(marker) = &field_info.soft_delete else {
        return quote! {};
    };
    let field = &marker.ident;

    quote! {
        impl store_object::SoftDeletable for #name {
            fn deleted_at(&self) -> Option<store_object::chrono::DateTime<store_object::chrono::Utc>> {
                self.#field
            }

            fn set_deleted_at(
                &mut self,
                deleted_at: Option<store_object::chrono::DateTime<store_object::chrono::Utc>>,
            ) {
                self.#field = deleted_at;
            }
        }
    }
}

/// Soft-deletable records get the decorator, everything else the plain store
pub fn generate_entity_impl(name: &Ident, field_info: &FieldInfo) -> TokenStream {
    let repository = if field_info.soft_delete.is_some() {
        quote! { store_object::SoftDeleteStore<Self, B> }
    } else {
        quote! { store_object::GenericStore<Self, B> }
    };

    quote! {
        impl store_object::Entity for #name {
            type Repository<B> = #repository
            where
                B: store_object::StorageBackend<Self> + 'static;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::{parse_field_attributes, parse_table_attributes};
    use syn::{parse_quote, DeriveInput};

    fn expand(input: DeriveInput) -> String {
        let table_info = parse_table_attributes(&input.attrs).unwrap();
        let field_info = parse_field_attributes(&input.data).unwrap();
        let tokens = [
            generate_table_metadata_impl(&input.ident, &table_info, &field_info),
            generate_soft_deletable_impl(&input.ident, &field_info),
            generate_entity_impl(&input.ident, &field_info),
        ];
        tokens
            .iter()
            .map(|t| t.to_string().replace(' ', ""))
            .collect()
    }

    #[test]
    fn test_soft_deletable_record_gets_decorator() {
        let code = expand(parse_quote! {
            #[table(name = "posts")]
            struct Post {
                #[primary_key]
                id: i64,
                #[soft_delete]
                deleted_at: Option<DateTime<Utc>>,
            }
        });

        assert!(code.contains("implstore_object::SoftDeletableforPost"));
        assert!(code.contains("typeRepository<B>=store_object::SoftDeleteStore<Self,B>"));
        assert!(code.contains("fnsoft_delete_field()->Option<&'staticstr>{Some(\"deleted_at\")}"));
        assert!(!code.contains("fnsoft_delete_column"));
    }

    #[test]
    fn test_column_override_is_emitted() {
        let code = expand(parse_quote! {
            #[table(name = "invoices")]
            struct Invoice {
                #[primary_key]
                id: i64,
                #[soft_delete(column = "removed_at")]
                deleted_at: Option<DateTime<Utc>>,
            }
        });

        assert!(code.contains("fnsoft_delete_column()->Option<&'staticstr>{Some(\"removed_at\")}"));
    }

    #[test]
    fn test_plain_record_gets_generic_store() {
        let code = expand(parse_quote! {
            #[table(name = "labels")]
            struct Label {
                #[primary_key]
                id: i64,
                name: String,
            }
        });

        assert!(code.contains("typeRepository<B>=store_object::GenericStore<Self,B>"));
        assert!(!code.contains("SoftDeletable"));
        assert!(code.contains("vec![\"id\",\"name\"]"));
    }
}

//! Implementation of the Mapped derive macro.
//!
//! Generates the `Entity`, `Persist` and `Mapped` impls for a struct: an accessor
//! table keyed by field name plus the ordered field list the stage engine walks.

use std::sync::OnceLock;

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type};

/// Parsed definition of a struct with `#[derive(Mapped)]`.
#[derive(Debug)]
pub struct MappedDef {
    /// The struct name.
    pub name: Ident,
    /// Table name.
    pub table: String,
    /// Persisted fields in declaration order.
    pub fields: Vec<MappedFieldDef>,
}

/// One persisted field.
#[derive(Debug)]
pub struct MappedFieldDef {
    /// The field name.
    pub name: Ident,
    /// The field type.
    pub ty: Type,
    /// Row name, if overridden.
    pub column: Option<String>,
    /// Whether the field is part of the primary key.
    pub primary_key: bool,
}

fn identifier_regex() -> Option<&'static regex::Regex> {
    static RE: OnceLock<Option<regex::Regex>> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

fn check_identifier(lit: &LitStr) -> Result<String> {
    let value = lit.value();
    let valid = identifier_regex().is_some_and(|re| re.is_match(&value));
    if valid {
        Ok(value)
    } else {
        Err(Error::new_spanned(
            lit,
            format!("`{value}` is not a valid SQL identifier"),
        ))
    }
}

/// Parse a `DeriveInput` into a `MappedDef`.
pub fn parse_mapped(input: &DeriveInput) -> Result<MappedDef> {
    let name = input.ident.clone();

    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Mapped cannot be derived for generic structs",
        ));
    }

    let mut table = None;
    for attr in &input.attrs {
        if !attr.path().is_ident("stage") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                table = Some(check_identifier(&lit)?);
                Ok(())
            } else {
                let attr_name = meta.path.to_token_stream().to_string();
                Err(Error::new_spanned(
                    &meta.path,
                    format!(
                        "unknown stage attribute `{attr_name}` on struct. \
                         Valid attributes are: table"
                    ),
                ))
            }
        })?;
    }

    let fields = match &input.data {
        Data::Struct(data) => parse_mapped_fields(&data.fields)?,
        Data::Enum(_) => {
            return Err(Error::new_spanned(
                input,
                "Mapped can only be derived for structs, not enums",
            ));
        }
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Mapped can only be derived for structs, not unions",
            ));
        }
    };

    Ok(MappedDef {
        table: table.unwrap_or_else(|| to_snake_case(&name.to_string())),
        name,
        fields,
    })
}

fn parse_mapped_fields(fields: &Fields) -> Result<Vec<MappedFieldDef>> {
    match fields {
        Fields::Named(named) => {
            let mut parsed = Vec::new();
            for field in &named.named {
                if let Some(def) = parse_mapped_field(field)? {
                    parsed.push(def);
                }
            }
            Ok(parsed)
        }
        Fields::Unnamed(_) => Err(Error::new_spanned(
            fields,
            "Mapped requires a struct with named fields",
        )),
        Fields::Unit => Ok(Vec::new()),
    }
}

/// Parse one field. Returns `None` for `#[stage(skip)]`.
fn parse_mapped_field(field: &Field) -> Result<Option<MappedFieldDef>> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut column = None;
    let mut primary_key = false;
    let mut skip = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("stage") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("primary_key") {
                primary_key = true;
            } else if path.is_ident("skip") {
                skip = true;
            } else if path.is_ident("column") {
                let lit: LitStr = meta.value()?.parse()?;
                column = Some(check_identifier(&lit)?);
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown stage attribute `{attr_name}`. \
                         Valid attributes are: primary_key, column, skip"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    if skip && primary_key {
        return Err(Error::new_spanned(
            field,
            "a skipped field cannot be a primary key",
        ));
    }
    if skip {
        return Ok(None);
    }

    Ok(Some(MappedFieldDef {
        name,
        ty: field.ty.clone(),
        column,
        primary_key,
    }))
}

/// `OrderLine` -> `order_line`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev_lower = i > 0 && (chars[i - 1].is_lowercase() || chars[i - 1].is_ascii_digit());
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

/// Generate the `Entity`, `Persist` and `Mapped` implementations.
pub fn generate_mapped_impl(def: &MappedDef) -> TokenStream {
    let name = &def.name;
    let table = &def.table;

    let read_arms = def.fields.iter().map(|field| {
        let ident = &field.name;
        let key = ident.to_string();
        quote! {
            #key => ::std::result::Result::Ok(::sqlstage::Persist::to_datum(&self.#ident)),
        }
    });

    let write_arms = def.fields.iter().map(|field| {
        let ident = &field.name;
        let ty = &field.ty;
        let key = ident.to_string();
        quote! {
            #key => {
                self.#ident = <#ty as ::sqlstage::Persist>::from_datum(datum)?;
                ::std::result::Result::Ok(())
            }
        }
    });

    let descriptors = def.fields.iter().map(|field| {
        let ty = &field.ty;
        let key = field.name.to_string();
        let column = field.column.clone().unwrap_or_else(|| key.clone());
        let primary_key = field.primary_key;
        quote! {
            ::sqlstage::FieldDescriptor::new(#key, <#ty as ::sqlstage::Persist>::type_ref())
                .column(#column)
                .primary_key(#primary_key)
        }
    });

    quote! {
        #[automatically_derived]
        impl ::sqlstage::Entity for #name {
            fn entity_type(&self) -> ::sqlstage::TypeRef {
                <Self as ::sqlstage::Persist>::type_ref()
            }

            #[allow(clippy::match_single_binding)]
            fn read_field(&self, field: &str) -> ::sqlstage::Result<::sqlstage::Datum> {
                match field {
                    #(#read_arms)*
                    _ => ::std::result::Result::Err(
                        ::sqlstage::FieldAccessError::unknown_field(
                            ::std::any::type_name::<Self>(),
                            field,
                        )
                        .into(),
                    ),
                }
            }

            #[allow(clippy::match_single_binding, unused_variables)]
            fn write_field(
                &mut self,
                field: &str,
                datum: ::sqlstage::Datum,
            ) -> ::sqlstage::Result<()> {
                match field {
                    #(#write_arms)*
                    _ => ::std::result::Result::Err(
                        ::sqlstage::FieldAccessError::unknown_field(
                            ::std::any::type_name::<Self>(),
                            field,
                        )
                        .into(),
                    ),
                }
            }

            fn clone_entity(&self) -> ::std::boxed::Box<dyn ::sqlstage::Entity> {
                ::std::boxed::Box::new(::std::clone::Clone::clone(self))
            }

            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        #[automatically_derived]
        impl ::sqlstage::Persist for #name {
            fn type_ref() -> ::sqlstage::TypeRef {
                ::sqlstage::TypeRef::record::<Self>()
            }

            fn to_datum(&self) -> ::sqlstage::Datum {
                ::sqlstage::Datum::Object(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
            }

            fn from_datum(datum: ::sqlstage::Datum) -> ::sqlstage::Result<Self> {
                datum.into_record::<Self>()
            }
        }

        #[automatically_derived]
        impl ::sqlstage::Mapped for #name {
            const TABLE_NAME: &'static str = #table;

            fn fields() -> ::std::vec::Vec<::sqlstage::FieldDescriptor> {
                ::std::vec![#(#descriptors),*]
            }
        }
    }
}

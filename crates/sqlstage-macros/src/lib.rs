//! Procedural macros for sqlstage.
//!
//! `#[derive(Mapped)]` builds the accessor table the stage engine uses in place of
//! runtime reflection.
//!
//! # Attributes
//!
//! - `#[stage(table = "name")]` on the struct: table name (default: snake_case struct name).
//! - `#[stage(primary_key)]` on a field: part of the table's identity.
//! - `#[stage(column = "name")]` on a field: override the row name.
//! - `#[stage(skip)]` on a field: not persisted; hydrated as `Default::default()`.
//!
//! The struct must also implement `Debug`, `Clone` and `Default`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod mapped_derive;

/// Derive `Entity`, `Persist` and `Mapped` for a named-field struct.
#[proc_macro_derive(Mapped, attributes(stage))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match mapped_derive::parse_mapped(&input) {
        Ok(def) => mapped_derive::generate_mapped_impl(&def).into(),
        Err(err) => err.to_compile_error().into(),
    }
}

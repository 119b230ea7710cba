use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::Ident;

use proc_macro_crate::{crate_name, FoundCrate};

mod hierarchy;
mod object;

// =============================================================================
// Crate path resolution
// =============================================================================

fn tagcast_crate_path() -> TokenStream2 {
    match crate_name("tagcast") {
        Ok(FoundCrate::Itself) => {
            quote!(::tagcast)
        }
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Err(_) => quote!(::tagcast),
    }
}

// =============================================================================
// Entry points
// =============================================================================

/// Declare a hierarchy: its root, and every type's ordered children.
///
/// ```ignore
/// hierarchy! {
///     pub mod shape_tags for Shape {
///         Circle;
///         Polygon {
///             Triangle;
///             Square;
///         }
///     }
/// }
/// ```
///
/// Implements `Node<Shape>` for every listed type, with its tag computed at
/// compile time, and emits `shape_tags` with the flat `DEFINITIONS` table and
/// shape constants. A type listed twice, or a tag that does not fit the
/// root's `TagStore` width, is a compile error.
#[proc_macro]
pub fn hierarchy(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as hierarchy::HierarchyInput);
    let krate = tagcast_crate_path();
    hierarchy::expand(input, &krate)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Object layout: the root's tag store and the embedded bases.
///
/// - `#[object(tag)]` on a `TagStore<uN>` field makes the struct a hierarchy
///   root with `uN` tags.
/// - `#[object(base)]` on a field makes the struct extend that field's type.
///   The first base is also reachable through `Deref`.
#[proc_macro_derive(Object, attributes(object))]
pub fn derive_object(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as syn::DeriveInput);
    let krate = tagcast_crate_path();
    object::expand(input, &krate)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

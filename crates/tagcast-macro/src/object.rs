//! `#[derive(Object)]`: `Root` for the tag field, `Extends` for each base.
//!
//! Role fields must be private, and a struct with bases gets an empty `Drop`
//! impl, so safe code can neither move a base out nor replace it from outside
//! the defining module.

use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::spanned::Spanned;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, Member, PathArguments, Result, Type, Visibility,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Tag,
    Base,
}

fn field_role(field: &syn::Field) -> Result<Option<Role>> {
    let mut role = None;
    for attr in field.attrs.iter().filter(|a| a.path().is_ident("object")) {
        attr.parse_nested_meta(|meta| {
            let this = if meta.path.is_ident("tag") {
                Role::Tag
            } else if meta.path.is_ident("base") {
                Role::Base
            } else {
                return Err(meta.error("expected `tag` or `base`"));
            };
            if role.replace(this).is_some() {
                return Err(meta.error("a field is either the tag store or one base"));
            }
            Ok(())
        })?;
    }
    Ok(role)
}

/// The `uN` in a `TagStore<uN>` field type.
fn tag_repr(ty: &Type) -> Result<&Type> {
    let err = || syn::Error::new(ty.span(), "`#[object(tag)]` field must be a `TagStore<uN>`");
    let Type::Path(path) = ty else {
        return Err(err());
    };
    let last = path.path.segments.last().ok_or_else(err)?;
    if last.ident != "TagStore" {
        return Err(err());
    }
    let PathArguments::AngleBracketed(args) = &last.arguments else {
        return Err(err());
    };
    match args.args.first() {
        Some(GenericArgument::Type(repr)) if args.args.len() == 1 => Ok(repr),
        _ => Err(err()),
    }
}

pub(crate) fn expand(input: DeriveInput, krate: &TokenStream2) -> Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "`Object` types can not be generic: every type needs one constant tag",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(name, "`Object` can only be derived for structs"));
    };

    let members: Vec<(Member, &syn::Field)> = match &data.fields {
        Fields::Named(fields) => fields
            .named
            .iter()
            .filter_map(|f| f.ident.clone().map(|i| (Member::Named(i), f)))
            .collect(),
        Fields::Unnamed(fields) => fields
            .unnamed
            .iter()
            .enumerate()
            .map(|(i, f)| (Member::from(i), f))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let mut tag_field = None;
    let mut bases = Vec::new();
    for (member, field) in &members {
        let role = field_role(field)?;
        // Outside code could swap a visible base or tag store for one built
        // for another type.
        if role.is_some() && !matches!(field.vis, Visibility::Inherited) {
            return Err(syn::Error::new_spanned(
                &field.vis,
                "`#[object(tag)]` and `#[object(base)]` fields must be private",
            ));
        }
        match role {
            Some(Role::Tag) => {
                if tag_field.is_some() {
                    return Err(syn::Error::new_spanned(
                        field,
                        "only one `#[object(tag)]` field: a root owns exactly one tag store",
                    ));
                }
                tag_field = Some((member, tag_repr(&field.ty)?));
            }
            Some(Role::Base) => bases.push((member, &field.ty)),
            None => {}
        }
    }

    if tag_field.is_none() && bases.is_empty() {
        return Err(syn::Error::new_spanned(
            name,
            "`Object` needs a `#[object(tag)]` field (a root) or at least one `#[object(base)]` field",
        ));
    }

    let root_impl = tag_field.map(|(member, repr)| {
        quote! {
            unsafe impl #krate::Root for #name {
                type Repr = #repr;

                #[inline]
                fn tag_store(&self) -> &#krate::TagStore<#repr> {
                    &self.#member
                }
            }
        }
    });

    let base_impls = bases.iter().map(|(member, ty)| {
        quote! {
            unsafe impl #krate::Extends<#ty> for #name {
                const OFFSET: usize = ::core::mem::offset_of!(#name, #member);
            }

            impl ::core::convert::AsRef<#ty> for #name {
                #[inline]
                fn as_ref(&self) -> &#ty {
                    &self.#member
                }
            }
        }
    });

    // Shared access only: handing out `&mut Base` would let a caller swap
    // the base (and its tag store) for one built for another type.
    let deref_impl = bases.first().map(|(member, ty)| {
        quote! {
            impl ::core::ops::Deref for #name {
                type Target = #ty;

                #[inline]
                fn deref(&self) -> &#ty {
                    &self.#member
                }
            }
        }
    });

    // A `Drop` impl forbids moving a base out of the object (E0509): the
    // moved base would keep this type's tag.
    let drop_impl = (!bases.is_empty()).then(|| {
        quote! {
            impl ::core::ops::Drop for #name {
                #[inline]
                fn drop(&mut self) {}
            }
        }
    });

    Ok(quote! {
        #root_impl
        #(#base_impls)*
        #deref_impl
        #drop_impl
    })
}

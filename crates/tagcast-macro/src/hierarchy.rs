//! `hierarchy!` parsing and code generation.

use std::collections::HashMap;

use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::{quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::{braced, token, Ident, Path, Result, Token, Visibility};

/// Each level costs at least one bit and the root bit is always set.
const MAX_DEPTH: usize = 63;

pub(crate) struct NodeDecl {
    pub(crate) ty: Path,
    pub(crate) children: Vec<NodeDecl>,
}

pub(crate) struct HierarchyInput {
    vis: Visibility,
    module: Ident,
    root: Path,
    nodes: Vec<NodeDecl>,
}

impl Parse for HierarchyInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let vis: Visibility = input.parse()?;
        input.parse::<Token![mod]>()?;
        let module: Ident = input.parse()?;
        input.parse::<Token![for]>()?;
        let root = Path::parse_mod_style(input)?;
        let content;
        braced!(content in input);
        let nodes = parse_nodes(&content)?;
        Ok(Self {
            vis,
            module,
            root,
            nodes,
        })
    }
}

fn parse_nodes(input: ParseStream) -> Result<Vec<NodeDecl>> {
    let mut nodes = Vec::new();
    while !input.is_empty() {
        let ty = Path::parse_mod_style(input)?;

        // Children or semicolon
        let children = if input.peek(token::Brace) {
            let content;
            braced!(content in input);
            parse_nodes(&content)?
        } else {
            input.parse::<Token![;]>()?;
            Vec::new()
        };
        nodes.push(NodeDecl { ty, children });
    }
    Ok(nodes)
}

// =============================================================================
// Tree analysis (runs at macro expansion time)
// =============================================================================

/// Flattened node, parents before children.
struct FlatNode<'a> {
    ty: &'a Path,
    name: String,
    /// Index of the parent in the flat list (`None` for the root).
    parent: Option<usize>,
    /// 1-based position among siblings (0 for the root).
    position: usize,
    siblings: usize,
    depth: usize,
    children: Vec<usize>,
}

fn type_name(path: &Path) -> String {
    path.segments
        .last()
        .map(|s| s.ident.to_string())
        .unwrap_or_default()
}

fn flatten<'a>(input: &'a HierarchyInput) -> Result<Vec<FlatNode<'a>>> {
    let mut flat = vec![FlatNode {
        ty: &input.root,
        name: type_name(&input.root),
        parent: None,
        position: 0,
        siblings: 0,
        depth: 0,
        children: Vec::new(),
    }];
    flatten_children(&input.nodes, 0, &mut flat)?;

    // Names become the runtime identity of a type, so they must be unique
    // even when the paths differ.
    let mut seen: HashMap<String, &Path> = HashMap::new();
    for node in &flat {
        if let Some(first) = seen.insert(node.name.clone(), node.ty) {
            let first = first.to_token_stream().to_string();
            return Err(syn::Error::new_spanned(
                node.ty,
                format!(
                    "type `{}` is declared more than once in this hierarchy (first as `{}`)",
                    node.name, first
                ),
            ));
        }
    }
    Ok(flat)
}

fn flatten_children<'a>(nodes: &'a [NodeDecl], parent: usize, out: &mut Vec<FlatNode<'a>>) -> Result<()> {
    let depth = out[parent].depth + 1;
    if depth > MAX_DEPTH && !nodes.is_empty() {
        return Err(syn::Error::new_spanned(
            &nodes[0].ty,
            format!("hierarchy deeper than {} levels can not fit in a 64-bit tag", MAX_DEPTH),
        ));
    }
    for (i, node) in nodes.iter().enumerate() {
        let idx = out.len();
        out.push(FlatNode {
            ty: &node.ty,
            name: type_name(&node.ty),
            parent: Some(parent),
            position: i + 1,
            siblings: nodes.len(),
            depth,
            children: Vec::new(),
        });
        out[parent].children.push(idx);
        flatten_children(&node.children, idx, out)?;
    }
    Ok(())
}

// =============================================================================
// Code generation
// =============================================================================

/// `unsafe impl Node<Root> for Ty`, plus a forced evaluation of its tag so
/// that overflow is reported where the hierarchy is declared.
fn generate_node_impl(flat: &[FlatNode<'_>], node: &FlatNode<'_>, root: &Path, krate: &TokenStream2) -> TokenStream2 {
    let ty = node.ty;
    let name_lit = syn::LitStr::new(&node.name, Span::call_site());
    let depth = node.depth as u8;

    let (tag, root_offset) = match node.parent {
        None => (quote!(#krate::encode::ROOT_TAG), quote!(0)),
        Some(p) => {
            let parent = flat[p].ty;
            let position = node.position as u32;
            let siblings = node.siblings as u32;
            let overflow_msg = format!(
                "tag overflow in hierarchy `{}`: `{}` does not fit in the root's tag width",
                flat[0].name, node.name
            );
            let tag = quote! {
                match #krate::encode::child_tag_within(
                    <#parent as #krate::Node<#root>>::TAG,
                    #krate::encode::Step::new(#position, #siblings),
                    <<#root as #krate::Root>::Repr as #krate::TagRepr>::BITS,
                ) {
                    ::core::option::Option::Some(tag) => tag,
                    ::core::option::Option::None => ::core::panic!(#overflow_msg),
                }
            };
            let root_offset = quote! {
                <#ty as #krate::Extends<#parent>>::OFFSET + <#parent as #krate::Node<#root>>::ROOT_OFFSET
            };
            (tag, root_offset)
        }
    };

    quote! {
        unsafe impl #krate::Node<#root> for #ty {
            const NAME: &'static str = #name_lit;
            const DEPTH: u8 = #depth;
            const TAG: u64 = #tag;
            const ROOT_OFFSET: usize = #root_offset;
        }

        const _: u64 = <#ty as #krate::Node<#root>>::TAG;
    }
}

/// Generate `TypeDef` entries, parents before children.
fn generate_defs(flat: &[FlatNode<'_>], krate: &TokenStream2) -> Vec<TokenStream2> {
    flat.iter()
        .map(|node| {
            let name_lit = syn::LitStr::new(&node.name, Span::call_site());
            let parent = match node.parent {
                Some(p) => {
                    let parent_lit = syn::LitStr::new(&flat[p].name, Span::call_site());
                    quote!(::core::option::Option::Some(#parent_lit))
                }
                None => quote!(::core::option::Option::None),
            };
            let children = node
                .children
                .iter()
                .map(|&c| syn::LitStr::new(&flat[c].name, Span::call_site()));
            quote! {
                #krate::TypeDef::new(#name_lit, #parent, &[#(#children),*]),
            }
        })
        .collect()
}

pub(crate) fn expand(input: HierarchyInput, krate: &TokenStream2) -> Result<TokenStream2> {
    // 1. Flatten tree and analyze shape
    let flat = flatten(&input)?;
    let tree_depth = flat.iter().map(|n| n.depth).max().unwrap_or(0) + 1;
    let node_count = flat.len();

    // 2. Node impls
    let root = &input.root;
    let impls = flat
        .iter()
        .map(|node| generate_node_impl(&flat, node, root, krate));

    // 3. TypeDef entries
    let defs = generate_defs(&flat, krate);

    // 4. Assemble
    let vis = &input.vis;
    let module = &input.module;

    Ok(quote! {
        #(#impls)*

        #vis mod #module {
            #[allow(unused_imports)]
            use super::*;

            /// Number of tree levels in this hierarchy.
            pub const TREE_DEPTH: usize = #tree_depth;

            /// Total number of types.
            pub const NODE_COUNT: usize = #node_count;

            /// Tag width of the root's `TagStore`.
            pub const WIDTH: u32 = <<#root as #krate::Root>::Repr as #krate::TagRepr>::BITS;

            /// Flat `TypeDef` table (for the runtime `Hierarchy`).
            pub const DEFINITIONS: &'static [#krate::TypeDef<'static>] = &[
                #(#defs)*
            ];

            /// Validate and allocate `DEFINITIONS` at run time.
            pub fn hierarchy() -> ::core::result::Result<#krate::Hierarchy, #krate::HierarchyError> {
                #krate::Hierarchy::build(DEFINITIONS, WIDTH)
            }
        }
    })
}

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{
    parse_macro_input, FnArg, ImplItem, ImplItemFn, ItemImpl, LitStr, Result as SynResult,
    Visibility,
};

/// Generate a `webdispatch::binder::Controller` impl from an inherent impl block.
///
/// Every `pub fn` taking `&self` becomes an action named in PascalCase
/// (`fn test_model` is action `TestModel`). `#[action("Name")]` overrides the
/// name and `#[action(skip)]` keeps a public method out of the table.
///
/// ```rust,ignore
/// use webdispatch::{controller, Response};
///
/// struct Users;
///
/// #[controller]
/// impl Users {
///     pub fn get(&self, id: i64) -> Response { /* .. */ }
///
///     #[action("Lookup")]
///     pub fn find_by_name(&self, name: String) -> Response { /* .. */ }
/// }
/// ```
#[proc_macro_attribute]
pub fn controller(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            Span::call_site(),
            "#[controller] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let mut input = parse_macro_input!(item as ItemImpl);
    match expand(&mut input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &mut ItemImpl) -> SynResult<proc_macro2::TokenStream> {
    if let Some((_, path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] goes on an inherent impl block",
        ));
    }

    let mut actions = Vec::new();
    for item in &mut input.items {
        let ImplItem::Fn(method) = item else {
            continue;
        };
        let Some(name) = action_name(method)? else {
            continue;
        };
        if actions.iter().any(|(existing, _): &(String, _)| *existing == name) {
            return Err(syn::Error::new_spanned(
                &method.sig.ident,
                format!("duplicate action name {name:?}"),
            ));
        }
        actions.push((name, method.sig.ident.clone()));
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let names: Vec<&String> = actions.iter().map(|(name, _)| name).collect();
    let arms = actions.iter().map(|(name, ident)| {
        quote! {
            #name => ::std::option::Option::Some(
                ::webdispatch::binder::Endpoint::method(self, <#self_ty>::#ident)
            ),
        }
    });

    Ok(quote! {
        #input

        impl #impl_generics ::webdispatch::binder::Controller for #self_ty #where_clause {
            fn action(
                self: ::std::sync::Arc<Self>,
                name: &str,
            ) -> ::std::option::Option<::webdispatch::binder::Endpoint> {
                match name {
                    #(#arms)*
                    _ => ::std::option::Option::None,
                }
            }

            fn actions(&self) -> &'static [&'static str] {
                &[#(#names),*]
            }
        }
    })
}

/// Action name for a method, stripping any `#[action]` attribute.
fn action_name(method: &mut ImplItemFn) -> SynResult<Option<String>> {
    let mut explicit = None;
    let mut skip = false;
    let mut error = None;

    method.attrs.retain(|attr| {
        if !attr.path().is_ident("action") {
            return true;
        }
        let parsed = attr.parse_args_with(|input: syn::parse::ParseStream<'_>| {
            if input.peek(LitStr) {
                let lit: LitStr = input.parse()?;
                explicit = Some(lit.value());
            } else {
                let ident: syn::Ident = input.parse()?;
                if ident != "skip" {
                    return Err(syn::Error::new_spanned(ident, "expected a name or `skip`"));
                }
                skip = true;
            }
            Ok(())
        });
        if let Err(err) = parsed {
            error = Some(err);
        }
        false
    });

    if let Some(err) = error {
        return Err(err);
    }
    if skip {
        return Ok(None);
    }

    let takes_ref_self = matches!(
        method.sig.inputs.first(),
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none()
    );
    if !takes_ref_self {
        if explicit.is_some() {
            return Err(syn::Error::new_spanned(
                &method.sig,
                "actions must take `&self`",
            ));
        }
        return Ok(None);
    }
    if explicit.is_none() && !matches!(method.vis, Visibility::Public(_)) {
        return Ok(None);
    }

    Ok(Some(
        explicit.unwrap_or_else(|| pascal_case(&method.sig.ident.to_string())),
    ))
}

fn pascal_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

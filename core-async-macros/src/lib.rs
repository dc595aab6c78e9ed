use proc_macro::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Ident, ItemFn, Token};

/// Runs an `async fn` test on a fresh current-thread runtime.
///
/// `#[core_async::test(start_paused)]` starts the runtime with a paused clock
/// so timers auto-advance whenever every task is idle.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Test)
}

#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    expand(attr, item, MacroKind::Main)
}

enum MacroKind {
    Test,
    Main,
}

#[derive(Default)]
struct Options {
    start_paused: bool,
}

fn parse_options(attr: TokenStream, kind: &MacroKind) -> syn::Result<Options> {
    let mut options = Options::default();
    if attr.is_empty() {
        return Ok(options);
    }

    let idents = Punctuated::<Ident, Token![,]>::parse_terminated.parse(attr)?;
    for ident in idents {
        match (ident.to_string().as_str(), kind) {
            ("start_paused", MacroKind::Test) => options.start_paused = true,
            _ => {
                return Err(syn::Error::new_spanned(
                    &ident,
                    "unsupported core_async attribute argument (expected `start_paused` on tests)",
                ))
            }
        }
    }
    Ok(options)
}

fn expand(attr: TokenStream, item: TokenStream, kind: MacroKind) -> TokenStream {
    let options = match parse_options(attr, &kind) {
        Ok(options) => options,
        Err(err) => return err.to_compile_error().into(),
    };

    let input = parse_macro_input!(item as ItemFn);

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            input.sig.fn_token,
            "core_async attribute macros require `async fn`",
        )
        .to_compile_error()
        .into();
    }

    let mut sync_sig = input.sig.clone();
    sync_sig.asyncness = None;

    let attrs = input.attrs;
    let vis = input.vis;
    let block = input.block;

    let runner = if options.start_paused {
        quote!(core_async::runtime::block_on_paused)
    } else {
        quote!(core_async::runtime::block_on)
    };

    let expanded = match kind {
        MacroKind::Test => quote! {
            #(#attrs)*
            #[test]
            #vis #sync_sig {
                #runner(async move #block)
            }
        },
        MacroKind::Main => quote! {
            #(#attrs)*
            #vis #sync_sig {
                #runner(async move #block)
            }
        },
    };

    expanded.into()
}

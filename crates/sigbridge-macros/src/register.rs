use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Ident, ItemFn, LitStr, Token, parse_macro_input};

struct RegisterArgs {
    capability: Ident,
    name: LitStr,
}

impl Parse for RegisterArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let capability: Ident = input.parse()?;
        input.parse::<Token![,]>()?;
        let name: LitStr = input.parse()?;
        // Allow a trailing comma.
        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }
        Ok(Self { capability, name })
    }
}

/// Implementation of `#[register_adapter(capability, "name")]`.
///
/// Leaves the decorated function unchanged and appends a
/// `#[::sigbridge_core::linkme::distributed_slice]` static that wires the function
/// into `ADAPTER_REGISTRY` in `sigbridge-core`.
pub fn register_adapter(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as RegisterArgs);
    let func = parse_macro_input!(item as ItemFn);

    if !func.sig.inputs.is_empty() {
        return syn::Error::new_spanned(
            &func.sig.inputs,
            "adapter constructors must not take arguments",
        )
        .into_compile_error()
        .into();
    }

    if args.name.value().trim().is_empty() {
        return syn::Error::new(args.name.span(), "adapter type name must not be empty")
            .into_compile_error()
            .into();
    }

    let fn_name = &func.sig.ident;
    let fn_name_upper = fn_name.to_string().to_uppercase();
    let static_name = Ident::new(
        &format!("_ADAPTER_REGISTER_{fn_name_upper}"),
        Span::call_site(),
    );
    let name = &args.name;

    let registration = match args.capability.to_string().as_str() {
        "external_system" => quote!(
            ::sigbridge_core::AdapterRegistration::external_system(#name, #fn_name)
        ),
        "process_model" => quote!(
            ::sigbridge_core::AdapterRegistration::process_model(#name, #fn_name)
        ),
        other => {
            return syn::Error::new(
                args.capability.span(),
                format!(
                    "unknown adapter capability `{other}`, \
                     expected one of: external_system, process_model"
                ),
            )
            .into_compile_error()
            .into();
        }
    };

    quote! {
        #func

        #[::sigbridge_core::linkme::distributed_slice(::sigbridge_core::ADAPTER_REGISTRY)]
        #[linkme(crate = ::sigbridge_core::linkme)]
        static #static_name: ::sigbridge_core::AdapterRegistration = #registration;
    }
    .into()
}

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Signature, Type};

/// Transform an asynchronous test into a synchronous one running against a
/// fresh in-memory store, and inject dependencies.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`] and
/// `crate::store::Db`, both backed by the same store.
///
/// `#[backend_test(registered)]` registers `RegisterRequest::example()`
/// through the API before the test body runs.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    // Extract type information and reject invalid function signatures.
    let test_args = match check_sig(item_fn.sig.clone()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    // Register the example user if needed.
    let maybe_register = match parse_macro_input!(args as Option<Ident>) {
        Some(arg) if arg == "registered" => quote! {{
            let response = rocket_client
                .post("/api/v1/register")
                .header(rocket::http::ContentType::JSON)
                .body(rocket::serde::json::json!(crate::model::api::RegisterRequest::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(rocket::http::Status::Created, response.status());
        }},
        Some(arg) => {
            return syn::Error::new(arg.span(), "Expected no argument or `registered`")
                .into_compile_error()
                .into();
        }
        None => quote! {},
    };

    // Rewrite the test function.
    quote! {
        #[test]
        fn #name() {
            /// Test setup.
            async fn setup() -> (rocket::local::asynchronous::Client, crate::store::Db) {
                log4rs_test_utils::test_logging::init_logging_once_for(["matchday_backend"], None, None);

                let db = crate::store::Db::new(std::sync::Arc::new(crate::store::MemoryStore::new()));
                let rocket_client = rocket::local::asynchronous::Client::tracked(crate::test_rocket(db.clone()))
                    .await
                    .unwrap();

                #maybe_register

                (rocket_client, db)
            }

            /// The test itself.
            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("rocket-worker-test-thread")
                .worker_threads(1)
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                #[allow(unused_variables)]
                let (rocket_client, db) = setup().await;
                #new_name(#(#test_args),*).await;
            });
        }
    }
    .into()
}

/// Ensure the wrapped test is async, extract parameters to inject, and reject unknown parameters.
fn check_sig(sig: Signature) -> Result<Vec<TokenStream2>, syn::Error> {
    if sig.asyncness.is_none() {
        return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
    }

    let mut has_client = false;
    let mut has_db = false;
    let mut args = vec![];

    for input in &sig.inputs {
        if let FnArg::Typed(pat_type) = input {
            if let (Pat::Ident(_), Type::Path(type_path)) = (&*pat_type.pat, &*pat_type.ty) {
                // The last path segment names the type, however it was imported.
                let type_ident = type_path.path.segments.last().map(|s| s.ident.clone());
                if let Some(type_ident) = type_ident {
                    if type_ident == "Client" {
                        if has_client {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `rocket::local::asynchronous::Client`",
                            ));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    } else if type_ident == "Db" {
                        if has_db {
                            return Err(syn::Error::new(
                                input.span(),
                                "Test cannot accept more than one `Db`",
                            ));
                        }
                        has_db = true;
                        args.push(quote! { db });
                        continue;
                    }
                }
            }
        }

        return Err(syn::Error::new(
            input.span(),
            "Expected one of `client_ident: Client` or `db_ident: Db`",
        ));
    }

    Ok(args)
}

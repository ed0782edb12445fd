use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, spanned::Spanned, FnArg, GenericArgument, Ident, ItemFn, Pat, PathArguments,
    Type,
};

/// Run an async test against a fresh database, injecting its dependencies,
/// and drop the database afterwards whether or not the test panicked.
///
/// Parameters may be a [`rocket::local::asynchronous::Client`], a
/// [`mongodb::Database`], and any number of `crate::model::mongodb::Coll<T>`.
///
/// `#[backend_test(committee)]`, `#[backend_test(resident)]` and
/// `#[backend_test(vendor)]` log the client in as an example profile of that
/// role first.
///
/// The tests need a MongoDB replica set, so they are ignored by default; run
/// them with `cargo test -- --ignored`.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);

    let injected = match Injected::from_fn(&item_fn) {
        Ok(injected) => injected,
        Err(err) => return err.into_compile_error().into(),
    };

    let login = match parse_macro_input!(args as Option<Ident>) {
        Some(role) => match login_as(&role) {
            Ok(login) => login,
            Err(err) => return err.into_compile_error().into(),
        },
        None => quote! {},
    };

    // The test keeps its name; the body is renamed and called from it.
    let name = item_fn.sig.ident.clone();
    let body_name = format_ident!("{}_body", name);
    item_fn.sig.ident = body_name.clone();

    let Injected {
        args,
        coll_idents,
        coll_types,
    } = injected;

    quote! {
        #[test]
        #[ignore = "requires a MongoDB replica set at the configured db_uri"]
        fn #name() {
            use rocket::futures::FutureExt;

            #item_fn

            let runtime = rocket::tokio::runtime::Builder::new_multi_thread()
                .thread_name("backend-test")
                .enable_all()
                .build()
                .unwrap();

            runtime.block_on(async {
                let db_client = crate::db_client().await;
                let db_name = crate::database();
                let db = db_client.database(&db_name);
                let rocket_client = rocket::local::asynchronous::Client::tracked(
                    crate::rocket_for_db(db_client.clone(), &db_name).await,
                )
                .await
                .unwrap();

                #login

                #(
                    let #coll_idents = crate::model::mongodb::Coll::<#coll_types>::from_db(&db);
                )*

                let outcome = std::panic::AssertUnwindSafe(
                    #body_name(#(#args,)* #(#coll_idents),*)
                )
                .catch_unwind()
                .await;

                db.drop(None).await.unwrap();
                if let Err(cause) = outcome {
                    std::panic::resume_unwind(cause);
                }
            });
        }
    }
    .into()
}

/// Insert the example profile for `role` and log the client in with it.
fn login_as(role: &Ident) -> Result<TokenStream2, syn::Error> {
    let variant = match role.to_string().as_str() {
        "committee" => quote! { Committee },
        "resident" => quote! { Resident },
        "vendor" => quote! { Vendor },
        _ => {
            return Err(syn::Error::new(
                role.span(),
                "Expected one of `committee`, `resident` or `vendor`",
            ))
        }
    };

    // Scoped so the response's borrow of the client ends before the client
    // is handed to the test.
    Ok(quote! {{
        let role = crate::model::common::Role::#variant;
        crate::model::mongodb::Coll::<crate::model::db::NewProfile>::from_db(&db)
            .insert_one(crate::model::db::NewProfile::example(role), None)
            .await
            .unwrap();

        let response = rocket_client
            .post(uri!(crate::api::auth::login))
            .header(rocket::http::ContentType::JSON)
            .body(rocket::serde::json::json!(crate::model::api::auth::LoginRequest::example(role)).to_string())
            .dispatch()
            .await;
        assert_eq!(rocket::http::Status::Ok, response.status(), "login as {}", stringify!(#role));
    }})
}

/// What the test function asks to be given.
struct Injected {
    /// Leading `Client`/`Database` arguments, in declaration order.
    args: Vec<TokenStream2>,
    coll_idents: Vec<Ident>,
    coll_types: Vec<Ident>,
}

impl Injected {
    fn from_fn(item_fn: &ItemFn) -> Result<Self, syn::Error> {
        let sig = &item_fn.sig;
        if sig.asyncness.is_none() {
            return Err(syn::Error::new(sig.span(), "Test must be marked `async`"));
        }

        let mut injected = Injected {
            args: vec![],
            coll_idents: vec![],
            coll_types: vec![],
        };
        let mut seen_client = false;
        let mut seen_db = false;

        for input in &sig.inputs {
            let Some((ident, ty)) = typed_param(input) else {
                return Err(unexpected(input));
            };

            if let Some(type_ident) = ty.path.get_ident() {
                if type_ident == "Client" && !seen_client {
                    seen_client = true;
                    injected.args.push(quote! { rocket_client });
                    continue;
                }
                if type_ident == "Database" && !seen_db {
                    seen_db = true;
                    injected.args.push(quote! { db.clone() });
                    continue;
                }
                if type_ident == "Client" || type_ident == "Database" {
                    return Err(syn::Error::new(
                        input.span(),
                        format!("Test cannot accept more than one `{type_ident}`"),
                    ));
                }
            } else if let Some(coll_type) = collection_type(ty) {
                injected.coll_idents.push(ident.clone());
                injected.coll_types.push(coll_type.clone());
                continue;
            }

            return Err(unexpected(input));
        }

        Ok(injected)
    }
}

/// The name and path type of a `name: Type` parameter.
fn typed_param(input: &FnArg) -> Option<(&Ident, &syn::TypePath)> {
    let FnArg::Typed(pat_type) = input else {
        return None;
    };
    let Pat::Ident(pat_ident) = &*pat_type.pat else {
        return None;
    };
    let Type::Path(type_path) = &*pat_type.ty else {
        return None;
    };
    Some((&pat_ident.ident, type_path))
}

/// `T` in `Coll<T>`, however `Coll` is qualified.
fn collection_type(ty: &syn::TypePath) -> Option<&Ident> {
    let last = ty.path.segments.last()?;
    if last.ident != "Coll" {
        return None;
    }
    let PathArguments::AngleBracketed(generics) = &last.arguments else {
        return None;
    };
    match generics.args.first()? {
        GenericArgument::Type(Type::Path(inner)) => inner.path.get_ident(),
        _ => None,
    }
}

fn unexpected(input: &FnArg) -> syn::Error {
    syn::Error::new(
        input.span(),
        "Expected one of `client_ident: Client`, `db_ident: Database` or `collection_ident: Coll<T>`",
    )
}

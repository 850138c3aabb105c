//! `#[derive(Injectable)]` expansion.

use darling::ast::{Data, Style};
use darling::util::{Ignored, Override};
use darling::{FromDeriveInput, FromField, FromMeta};
use proc_macro2::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::{DeriveInput, Expr, GenericArgument, Generics, Ident, LitStr, Path, PathArguments, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(injectable), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: Ident,
    generics: Generics,
    data: Data<Ignored, InjectField>,
    #[darling(default, rename = "crate")]
    krate: Option<Path>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<Ident>,
    ty: Type,
    #[darling(default)]
    default: Option<Override<DefaultExpr>>,
    #[darling(default)]
    key: Option<LitStr>,
}

/// Right-hand side of `#[inject(default = ...)]`, kept verbatim.
struct DefaultExpr(Expr);

impl FromMeta for DefaultExpr {
    fn from_expr(expr: &Expr) -> darling::Result<Self> {
        Ok(Self(expr.clone()))
    }
}

enum Shape<'a> {
    Required(&'a Type),
    Optional(&'a Type),
    Scalar,
}

pub(crate) fn expand(input: &DeriveInput) -> darling::Result<TokenStream> {
    let input = InjectableInput::from_derive_input(input)?;
    let krate = input
        .krate
        .clone()
        .unwrap_or_else(|| syn::parse_quote!(::sandiq));
    let ident = &input.ident;

    let fields = input
        .data
        .as_ref()
        .take_struct()
        .ok_or_else(|| darling::Error::unsupported_shape("enum"))?;

    let mut errors = darling::Error::accumulator();
    let mut arguments = Vec::new();
    let mut initializers = Vec::new();

    for (position, field) in fields.fields.iter().enumerate() {
        let Some(name) = field.ident.as_ref() else {
            continue;
        };
        let label = LitStr::new(&name.unraw().to_string(), name.span());

        let shape = classify(&field.ty);
        let (argument, initializer) = match (shape, &field.default, &field.key) {
            (Shape::Required(_), Some(_), _) | (Shape::Optional(_), Some(_), _) => {
                errors.push(
                    darling::Error::custom("use Option<Arc<T>> for a dependency that may be absent")
                        .with_span(&field.ty),
                );
                continue;
            }
            (Shape::Scalar, _, Some(key)) => {
                errors.push(
                    darling::Error::custom("`key` only applies to Arc<T> and Option<Arc<T>> fields")
                        .with_span(key),
                );
                continue;
            }
            (Shape::Required(inner), None, None) => (
                quote!(.class::<#inner>(#label)),
                quote!(#name: args.object(#position)?),
            ),
            (Shape::Required(_), None, Some(key)) => (
                quote!(.class_key(#label, #key)),
                quote!(#name: args.object(#position)?),
            ),
            (Shape::Optional(inner), None, None) => (
                quote!(.optional_class::<#inner>(#label)),
                quote!(#name: args.optional(#position)?),
            ),
            (Shape::Optional(_), None, Some(key)) => (
                quote!(.optional_class_key(#label, #key)),
                quote!(#name: args.optional(#position)?),
            ),
            (Shape::Scalar, None, None) => {
                let ty = &field.ty;
                (
                    quote!(.scalar::<#ty>(#label)),
                    quote!(#name: args.value(#position)?),
                )
            }
            (Shape::Scalar, Some(default), None) => {
                let ty = &field.ty;
                let value = match default {
                    Override::Inherit => quote!(<#ty as ::core::default::Default>::default()),
                    Override::Explicit(DefaultExpr(expr)) => quote!(#expr),
                };
                (
                    quote!(.scalar_or::<#ty>(#label, #value)),
                    quote!(#name: args.value(#position)?),
                )
            }
        };
        arguments.push(argument);
        initializers.push(initializer);
    }
    errors.finish()?;

    let construct = match fields.style {
        Style::Unit => quote!(Self),
        _ => quote!(Self { #(#initializers,)* }),
    };
    let args_binding = if initializers.is_empty() {
        quote!(_args)
    } else {
        quote!(args)
    };

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let implementation = quote! {
        impl #impl_generics #krate::autowire::Injectable for #ident #ty_generics #where_clause {
            fn definition() -> #krate::definition::Definition {
                #krate::definition::Definition::builder(::std::any::type_name::<Self>())
                    #(#arguments)*
                    .build(|#args_binding: #krate::definition::Args| {
                        ::core::result::Result::Ok(#construct)
                    })
            }
        }
    };

    let registration = if input.generics.params.is_empty() {
        quote! {
            #krate::inventory::submit! {
                #krate::autowire::AutowireEntry::of::<#ident>()
            }
        }
    } else {
        TokenStream::new()
    };

    Ok(quote! {
        #implementation
        #registration
    })
}

fn classify(ty: &Type) -> Shape<'_> {
    if let Some(inner) = generic_argument(ty, "Arc") {
        return Shape::Required(inner);
    }
    match generic_argument(ty, "Option").and_then(|inner| generic_argument(inner, "Arc")) {
        Some(inner) => Shape::Optional(inner),
        None => Shape::Scalar,
    }
}

/// `T` in `Wrapper<T>`, matched on the last path segment.
fn generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) if arguments.args.len() == 1 => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand_str(input: DeriveInput) -> String {
        expand(&input).map(|tokens| tokens.to_string()).unwrap_or_else(|e| e.write_errors().to_string())
    }

    #[test]
    fn classifies_field_types() {
        let arc: Type = syn::parse_quote!(std::sync::Arc<Logger>);
        let optional: Type = syn::parse_quote!(Option<Arc<Cache>>);
        let scalar: Type = syn::parse_quote!(Option<String>);

        assert!(matches!(classify(&arc), Shape::Required(_)));
        assert!(matches!(classify(&optional), Shape::Optional(_)));
        assert!(matches!(classify(&scalar), Shape::Scalar));
    }

    #[test]
    fn expands_arguments_in_field_order() {
        let output = expand_str(syn::parse_quote! {
            struct Service {
                logger: Arc<Logger>,
                cache: Option<Arc<Cache>>,
                #[inject(default = 3)]
                retries: u32,
            }
        });

        let class = output.find("class :: < Logger >").unwrap();
        let optional = output.find("optional_class :: < Cache >").unwrap();
        let scalar = output.find("scalar_or :: < u32 >").unwrap();
        assert!(class < optional && optional < scalar);
        assert!(output.contains("inventory :: submit"));
    }

    #[test]
    fn custom_crate_path_and_key() {
        let output = expand_str(syn::parse_quote! {
            #[injectable(crate = "crate::di")]
            struct Report {
                #[inject(key = "db.reporting")]
                db: Arc<Connection>,
            }
        });

        assert!(output.contains("crate :: di :: autowire :: Injectable"));
        assert!(output.contains("class_key (\"db\" , \"db.reporting\")"));
    }

    #[test]
    fn generic_structs_are_not_submitted() {
        let output = expand_str(syn::parse_quote! {
            struct Holder<T: Send + Sync + 'static> {
                inner: Arc<T>,
            }
        });
        assert!(!output.contains("inventory"));
        assert!(output.contains("for Holder < T >"));
        assert!(output.contains("Ok (Self { inner : args . object (0usize) ? , })"));
    }

    #[test]
    fn default_accepts_any_expression() {
        let output = expand_str(syn::parse_quote! {
            struct Logger {
                #[inject(default = String::from("/tmp/log"))]
                path: String,
                #[inject(default = 25)]
                port: u16,
                #[inject(default)]
                verbose: bool,
            }
        });

        assert!(!output.contains("compile_error"), "{output}");
        assert!(output.contains("scalar_or :: < String > (\"path\" , String :: from (\"/tmp/log\"))"));
        assert!(output.contains("scalar_or :: < u16 > (\"port\" , 25)"));
        assert!(output.contains("< bool as :: core :: default :: Default > :: default ()"));
    }

    #[test]
    fn unit_struct_builds_self() {
        let output = expand_str(syn::parse_quote! {
            struct Heartbeat;
        });
        assert!(output.contains("_args"));
        assert!(output.contains("Ok (Self)"));
    }

    #[test]
    fn key_on_scalar_is_rejected() {
        let output = expand_str(syn::parse_quote! {
            struct Bad {
                #[inject(key = "x")]
                name: String,
            }
        });
        assert!(output.contains("compile_error"));
    }
}

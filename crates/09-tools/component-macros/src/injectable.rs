//! `#[derive(Injectable)]` 实现

use crate::utils::{extract_generic_type, is_option_type, slot_shape, SlotShape};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Field, Fields, Ident, LitStr, Result};

/// 结构体级别的 `#[injectable(...)]` 参数
#[derive(Default)]
struct ClassArgs {
    singleton: bool,
    creatable: bool,
    default: bool,
    disposable: bool,
    extends: Option<Ident>,
    post_construct: Vec<Ident>,
    pre_destroy: Vec<Ident>,
}

impl ClassArgs {
    fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("singleton") {
                    args.singleton = true;
                } else if meta.path.is_ident("creatable") {
                    args.creatable = true;
                } else if meta.path.is_ident("default") {
                    args.default = true;
                } else if meta.path.is_ident("disposable") {
                    args.disposable = true;
                } else if meta.path.is_ident("extends") {
                    let lit: LitStr = meta.value()?.parse()?;
                    args.extends = Some(lit.parse()?);
                } else if meta.path.is_ident("post_construct") {
                    let lit: LitStr = meta.value()?.parse()?;
                    args.post_construct.push(lit.parse()?);
                } else if meta.path.is_ident("pre_destroy") {
                    let lit: LitStr = meta.value()?.parse()?;
                    args.pre_destroy.push(lit.parse()?);
                } else {
                    return Err(meta.error("不支持的 injectable 参数"));
                }
                Ok(())
            })?;
        }
        Ok(args)
    }
}

/// 字段级别的 `#[inject(...)]` 参数
#[derive(Default)]
struct FieldArgs {
    optional: bool,
    group_updates: bool,
    named: Option<LitStr>,
    qualifiers: Vec<(LitStr, Option<LitStr>)>,
}

impl FieldArgs {
    /// 字段没有 `#[inject]` 时返回 `None`
    fn parse(field: &Field) -> Result<Option<Self>> {
        let mut found = None;
        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
            let args = found.get_or_insert_with(Self::default);
            // 允许裸写 #[inject]
            if matches!(attr.meta, syn::Meta::Path(_)) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("optional") {
                    args.optional = true;
                } else if meta.path.is_ident("group_updates") {
                    args.group_updates = true;
                } else if meta.path.is_ident("named") {
                    args.named = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("qualifier") {
                    // qualifier = "name" 或 qualifier("name", "value")
                    if meta.input.peek(syn::Token![=]) {
                        args.qualifiers.push((meta.value()?.parse()?, None));
                    } else {
                        let content;
                        syn::parenthesized!(content in meta.input);
                        let name: LitStr = content.parse()?;
                        let value = if content.peek(syn::Token![,]) {
                            content.parse::<syn::Token![,]>()?;
                            Some(content.parse()?)
                        } else {
                            None
                        };
                        args.qualifiers.push((name, value));
                    }
                } else {
                    return Err(meta.error("不支持的 inject 参数"));
                }
                Ok(())
            })?;
        }
        Ok(found)
    }

    fn modifiers(&self) -> TokenStream {
        let optional = self.optional.then(|| quote!(.optional()));
        let group_updates = self.group_updates.then(|| quote!(.group_updates()));
        let named = self.named.as_ref().map(|name| quote!(.named(#name)));
        let qualifiers = self.qualifiers.iter().map(|(name, value)| {
            let value = match value {
                Some(value) => quote!(::std::option::Option::Some(#value.to_string())),
                None => quote!(::std::option::Option::None),
            };
            quote!(.qualifier(di_abstractions::Qualifier::new(#name, #value)))
        });
        quote!(#named #optional #group_updates #(#qualifiers)*)
    }
}

/// 生成单个注入字段的声明
fn field_declaration(field: &Field, args: &FieldArgs) -> Result<TokenStream> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "只支持具名字段"))?;
    let name = ident.to_string();

    // Option<S> 字段直接赋值，可被反注入清空；其他字段只在有值时覆盖
    let (payload, setter) = match extract_generic_type(&field.ty) {
        Some(inner) if is_option_type(&field.ty) => {
            (inner, quote!(|this: &mut Self, value| this.#ident = value))
        }
        _ => (
            &field.ty,
            quote!(|this: &mut Self, value| {
                if let ::std::option::Option::Some(value) = value {
                    this.#ident = value;
                }
            }),
        ),
    };

    let declare = match slot_shape(payload) {
        SlotShape::Object(class) => quote!(object_field::<#class, _>(#name, #setter)),
        SlotShape::Provider(class) => quote!(provider_field::<#class, _>(#name, #setter)),
        SlotShape::Plain(ty) => quote!(field::<#ty, _>(#name, #setter)),
    };
    let modifiers = args.modifiers();
    Ok(quote! {
        class.#declare.inject() #modifiers;
    })
}

fn lifecycle_method(method: &Ident, marker: TokenStream) -> TokenStream {
    let name = method.to_string();
    quote! {
        class
            .method(#name, |this: &mut Self, _| {
                this.#method();
                ::std::result::Result::Ok(::std::option::Option::None)
            })
            #marker;
    }
}

/// 实现 #[derive(Injectable)] 宏
pub fn derive_injectable_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            struct_name,
            "Injectable 只能派生在结构体上",
        ));
    };

    let class_args = ClassArgs::parse(&input.attrs)?;

    let mut fields = Vec::new();
    if let Fields::Named(named) = &data.fields {
        for field in &named.named {
            if let Some(args) = FieldArgs::parse(field)? {
                fields.push(field_declaration(field, &args)?);
            }
        }
    } else if data.fields.iter().any(|field| {
        field.attrs.iter().any(|attr| attr.path().is_ident("inject"))
    }) {
        return Err(syn::Error::new_spanned(
            &data.fields,
            "#[inject] 只支持具名字段",
        ));
    }

    let singleton = class_args.singleton.then(|| quote!(class.singleton();));
    let creatable = class_args.creatable.then(|| quote!(class.creatable();));
    let disposable = class_args.disposable.then(|| quote!(class.disposable();));
    let constructor = class_args
        .default
        .then(|| quote!(class.default_constructor();));
    let parent = class_args
        .extends
        .as_ref()
        .map(|field| quote!(class.extends(|this: &mut Self| &mut this.#field);));
    let post_construct = class_args
        .post_construct
        .iter()
        .map(|method| lifecycle_method(method, quote!(.post_construct())));
    let pre_destroy = class_args
        .pre_destroy
        .iter()
        .map(|method| lifecycle_method(method, quote!(.pre_destroy())));

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics di_abstractions::Injectable for #struct_name #ty_generics #where_clause {
            fn describe(class: &mut di_abstractions::ClassBuilder<Self>) {
                #singleton
                #creatable
                #disposable
                #parent
                #constructor
                #(#fields)*
                #(#post_construct)*
                #(#pre_destroy)*
            }
        }
    })
}

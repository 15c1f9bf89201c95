extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::*;

/// What `#[msgpack(...)]` says about one field.
struct FieldAttrs {
    tag: Option<String>,
    embed: bool,
}

impl FieldAttrs {
    fn parse(field: &Field) -> Result<Self> {
        let mut attrs = FieldAttrs {
            tag: None,
            embed: false,
        };
        for attr in &field.attrs {
            if !attr.path().is_ident("msgpack") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("tag") {
                    let lit: LitStr = meta.value()?.parse()?;
                    attrs.tag = Some(lit.value());
                    Ok(())
                } else if meta.path.is_ident("embed") {
                    attrs.embed = true;
                    Ok(())
                } else {
                    Err(meta.error("expected `tag = \"...\"` or `embed`"))
                }
            })?;
        }
        Ok(attrs)
    }

    fn ignored(&self) -> bool { self.tag.as_deref() == Some("-") }

    /// Embedded without a wire name of its own, so its fields are promoted.
    fn promoted(&self) -> bool {
        self.embed
            && self
                .tag
                .as_deref()
                .and_then(|t| t.split(',').next())
                .map_or(true, str::is_empty)
    }
}

/// One declared field, with everything the generated impls need.
struct DeclaredField {
    /// `self.<member>`
    member: Member,
    /// declared name, or position for tuple fields
    name: String,
    ty: Type,
    public: bool,
    attrs: FieldAttrs,
}

fn declared_fields(fields: &Fields) -> Result<Vec<DeclaredField>> {
    fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let (member, name) = match &field.ident {
                Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
                None => (Member::Unnamed(Index::from(i)), i.to_string()),
            };
            Ok(DeclaredField {
                member,
                name,
                ty: field.ty.clone(),
                public: matches!(field.vis, Visibility::Public(_)),
                attrs: FieldAttrs::parse(field)?,
            })
        })
        .collect()
}

fn record_impl(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream2> {
    let name = &ast.ident;
    let name_str = name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let fields = declared_fields(&data.fields)?;

    let decls = fields.iter().map(|f| {
        let field_name = &f.name;
        let public = f.public;
        let mut decl = quote! { ::mpack::record::FieldDecl::new(#field_name, #public) };
        if let Some(tag) = &f.attrs.tag {
            decl = quote! { #decl.tag(#tag) };
        }
        if f.attrs.embed {
            let ty = &f.ty;
            decl = quote! { #decl.embed(<#ty as ::mpack::record::Embed>::embedded_info) };
        }
        decl
    });

    // encodable fields: public, not ignored, not flattened away
    let direct: Vec<(usize, &DeclaredField)> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.public && !f.attrs.ignored() && !f.attrs.promoted())
        .collect();
    let direct_idx: Vec<Index> = direct.iter().map(|(i, _)| Index::from(*i)).collect();
    let direct_member: Vec<&Member> = direct.iter().map(|(_, f)| &f.member).collect();

    let embedded: Vec<(usize, &DeclaredField)> = fields
        .iter()
        .enumerate()
        .filter(|(_, f)| f.public && f.attrs.embed && !f.attrs.ignored())
        .collect();
    let embed_idx: Vec<Index> = embedded.iter().map(|(i, _)| Index::from(*i)).collect();
    let embed_member: Vec<&Member> = embedded.iter().map(|(_, f)| &f.member).collect();

    let zero_members: Vec<&Member> = fields
        .iter()
        .filter(|f| f.public && !f.attrs.ignored())
        .map(|f| &f.member)
        .collect();

    Ok(quote! {
        impl #impl_generics ::mpack::record::Record for #name #ty_generics #where_clause {
            fn record_info() -> ::mpack::record::RecordInfo {
                ::mpack::record::RecordInfo {
                    name: #name_str,
                    type_id: ::std::any::TypeId::of::<Self>(),
                    fields: ::std::vec![#(#decls),*],
                }
            }
        }

        impl #impl_generics ::mpack::record::RecordFields for #name #ty_generics #where_clause {
            fn field(&self, index: usize) -> ::std::option::Option<&dyn ::mpack::encoding::Encode> {
                match index {
                    #(#direct_idx => ::std::option::Option::Some(&self.#direct_member),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn field_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn ::mpack::encoding::Decode> {
                match index {
                    #(#direct_idx => ::std::option::Option::Some(&mut self.#direct_member),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn embedded(&self, index: usize) -> ::std::option::Option<&dyn ::mpack::record::RecordFields> {
                match index {
                    #(#embed_idx => ::mpack::record::Embed::as_embedded(&self.#embed_member),)*
                    _ => ::std::option::Option::None,
                }
            }

            fn embedded_mut(&mut self, index: usize) -> ::std::option::Option<&mut dyn ::mpack::record::RecordFields> {
                match index {
                    #(#embed_idx => ::std::option::Option::Some(::mpack::record::Embed::as_embedded_mut(&mut self.#embed_member)),)*
                    _ => ::std::option::Option::None,
                }
            }
        }

        impl #impl_generics ::mpack::record::Embed for #name #ty_generics #where_clause {
            fn embedded_info() -> ::mpack::record::RecordInfo {
                <Self as ::mpack::record::Record>::record_info()
            }

            fn as_embedded(&self) -> ::std::option::Option<&dyn ::mpack::record::RecordFields> {
                ::std::option::Option::Some(self)
            }

            fn as_embedded_mut(&mut self) -> &mut dyn ::mpack::record::RecordFields { self }
        }

        impl #impl_generics ::mpack::encoding::Encode for #name #ty_generics #where_clause {
            fn encode(&self, enc: &mut ::mpack::encoding::Encoder<'_>) -> ::mpack::errors::Result<()> {
                enc.encode_record(self)
            }

            fn kind(&self) -> ::mpack::encoding::Kind { ::mpack::encoding::Kind::Record }

            fn wire_kind(&self, enc: &::mpack::encoding::Encoder<'_>) -> ::mpack::encoding::Kind {
                if enc.has_extension::<Self>() {
                    ::mpack::encoding::Kind::Ext
                } else {
                    ::mpack::encoding::Kind::Record
                }
            }

            fn is_zero(&self) -> bool {
                true #(&& ::mpack::encoding::Encode::is_zero(&self.#zero_members))*
            }
        }

        impl #impl_generics ::mpack::encoding::Decode for #name #ty_generics #where_clause {
            fn decode_into(&mut self, dec: &mut ::mpack::encoding::Decoder<'_, '_>) -> ::mpack::errors::Result<()> {
                dec.decode_record(self)
            }

            fn kind(&self) -> ::mpack::encoding::Kind { ::mpack::encoding::Kind::Record }
        }
    })
}

/// Derives the record capability: `Record`, `RecordFields`, `Embed`, `Encode` and
/// `Decode`.
///
/// Field attributes:
///
/// * `#[msgpack(tag = "name")]` - wire name; `"name,omitempty"` also omits zero values
///   from maps, `"-"` excludes the field.
/// * `#[msgpack(embed)]` - flatten the field's own fields into this record. The field
///   type must be a record, or a `Box` or `Option` of one.
#[proc_macro_derive(Record, attributes(msgpack))]
pub fn record_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    let out = match &ast.data {
        Data::Struct(data) => record_impl(&ast, data),
        _ => Err(Error::new(
            Span::call_site(),
            "Record can only be derived for structs",
        )),
    };

    out.unwrap_or_else(Error::into_compile_error).into()
}

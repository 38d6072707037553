//! Implementation of `#[derive(Bind)]`.

use std::collections::HashSet;

use proc_macro2::{Delimiter, Literal, Span, TokenStream as TokenStream2, TokenTree};
use quote::{quote, quote_spanned};
use unsynn::*;

keyword! {
    KStruct = "struct";
    KPub = "pub";
}

unsynn! {
    /// Visibility: `pub`, `pub(...)` or nothing
    enum Vis {
        PubIn(Cons<KPub, ParenthesisGroup>),
        Pub(KPub),
    }

    /// An attribute: `#[...]`
    struct Attribute {
        _pound: Pound,
        content: BracketGroup,
    }

    /// A struct with named fields. The body is split into fields by hand
    /// since field types may contain commas inside `<...>`.
    struct StructDef {
        attrs: Vec<Attribute>,
        _vis: Option<Vis>,
        _kw_struct: KStruct,
        name: Ident,
        body: BraceGroup,
    }

    /// One named field
    struct FieldDef {
        attrs: Vec<Attribute>,
        vis: Option<Vis>,
        name: Ident,
        _colon: Colon,
        ty: Vec<TokenTree>,
    }
}

const UNSUPPORTED: &str =
    "`#[derive(Bind)]` supports non-generic structs with named fields only";

pub fn derive_bind(input: TokenStream2) -> TokenStream2 {
    let mut iter = input.to_token_iter();
    let def: StructDef = match iter.parse() {
        Ok(def) => def,
        Err(_) => return quote! { compile_error!(#UNSUPPORTED); },
    };

    match expand_struct(&def) {
        Ok(tokens) => tokens,
        Err(err) => err,
    }
}

fn expand_struct(def: &StructDef) -> std::result::Result<TokenStream2, TokenStream2> {
    let name = &def.name;
    let name_str = name.to_string();

    let mut docs = Vec::new();
    for attr in &def.attrs {
        let tokens = attr_tokens(attr);
        if let Some(doc) = doc_literal(&tokens) {
            docs.push(doc);
        } else if is_form_attr(&tokens) {
            return Err(error(
                name.span(),
                "`#[form(...)]` is only supported on fields",
            ));
        }
    }

    let mut fields = Vec::new();
    let mut seen_keys = HashSet::new();
    for tokens in split_fields(def.body.0.stream()) {
        let mut iter = tokens.to_token_iter();
        let field: FieldDef = iter
            .parse()
            .map_err(|err| error(name.span(), &err.to_string()))?;
        let options = FieldOptions::from_field(&field)?;

        if !options.is_skipped() && !options.has_flag("FLATTEN") {
            let key = options.effective_name(&field);
            if !seen_keys.insert(key.clone()) {
                return Err(error(
                    field.name.span(),
                    &format!("two fields of `{name_str}` are addressed as `{key}`"),
                ));
            }
        }

        fields.push(expand_field(name, &field, &options));
    }

    let fields = if fields.is_empty() {
        quote! { &[] }
    } else {
        quote! { &const { [#(#fields),*] } }
    };

    Ok(quote! {
        #[automatically_derived]
        impl ::formbind::Bind for #name {
            const SHAPE: &'static ::formbind::Shape = &const {
                ::formbind::Shape {
                    id: ::formbind::Shape::id_of::<#name>(),
                    type_identifier: #name_str,
                    def: ::formbind::Def::Struct(::formbind::StructType {
                        fields: #fields,
                    }),
                    doc: &[#(#docs),*],
                }
            };
        }
    })
}

fn expand_field(parent: &Ident, field: &FieldDef, options: &FieldOptions) -> TokenStream2 {
    let ident = &field.name;
    let name_str = field_name(field);
    let ty = &field.ty;
    let docs = &options.docs;

    let rename = match &options.rename {
        Some(key) => quote! { ::core::option::Option::Some(#key) },
        None => quote! { ::core::option::Option::None },
    };

    let flags = options
        .flags
        .iter()
        .map(|flag| Ident::new(flag, Span::call_site()));

    // Skipped fields may hold types that know nothing about binding.
    let (shape, get_mut) = if options.is_skipped() {
        (
            quote! { || <() as ::formbind::Bind>::SHAPE },
            quote! { |_| ::core::option::Option::None },
        )
    } else {
        (
            quote! { || <#(#ty)* as ::formbind::Bind>::SHAPE },
            quote! {
                |parent| {
                    parent
                        .downcast_mut::<#parent>()
                        .map(|parent| &mut parent.#ident as &mut dyn ::core::any::Any)
                }
            },
        )
    };

    quote! {
        ::formbind::Field {
            name: #name_str,
            rename: #rename,
            shape: #shape,
            flags: ::formbind::FieldFlags::empty()#(.union(::formbind::FieldFlags::#flags))*,
            get_mut: #get_mut,
            doc: &[#(#docs),*],
        }
    }
}

#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    flags: Vec<&'static str>,
    docs: Vec<Literal>,
}

impl FieldOptions {
    fn from_field(field: &FieldDef) -> std::result::Result<Self, TokenStream2> {
        let mut options = FieldOptions::default();
        if field.vis.is_none() {
            options.add_flag("PRIVATE");
        }
        if field.ty.is_empty() {
            return Err(error(field.name.span(), "expected a type after `:`"));
        }

        for attr in &field.attrs {
            let tokens = attr_tokens(attr);
            if let Some(doc) = doc_literal(&tokens) {
                options.docs.push(doc);
            } else if is_form_attr(&tokens) {
                options.parse_form_attr(&tokens, field.name.span())?;
            }
        }
        Ok(options)
    }

    fn parse_form_attr(
        &mut self,
        tokens: &[TokenTree],
        span: Span,
    ) -> std::result::Result<(), TokenStream2> {
        let [_, TokenTree::Group(group)] = tokens else {
            return Err(error(span, "expected `#[form(...)]`"));
        };
        if group.delimiter() != Delimiter::Parenthesis {
            return Err(error(group.span(), "expected `#[form(...)]`"));
        }

        let inner: Vec<TokenTree> = group.stream().into_iter().collect();
        for item in inner.split(|tt| matches!(tt, TokenTree::Punct(p) if p.as_char() == ',')) {
            match item {
                [] => {}
                [TokenTree::Ident(ident)] if ident == "skip" => self.add_flag("SKIP"),
                [TokenTree::Ident(ident)] if ident == "flatten" => self.add_flag("FLATTEN"),
                [TokenTree::Ident(ident)] if ident == "required" => self.add_flag("REQUIRED"),
                [
                    TokenTree::Ident(ident),
                    TokenTree::Punct(eq),
                    TokenTree::Literal(lit),
                ] if ident == "rename" && eq.as_char() == '=' => {
                    let Some(key) = string_value(lit) else {
                        return Err(error(lit.span(), "`rename` expects a string literal"));
                    };
                    if key == "-" {
                        self.add_flag("SKIP");
                    } else if key.is_empty() {
                        return Err(error(lit.span(), "`rename` must not be empty"));
                    } else if key.contains('.') {
                        return Err(error(lit.span(), "`rename` must not contain `.`"));
                    } else {
                        self.rename = Some(key);
                    }
                }
                [first, ..] => {
                    let msg = format!(
                        "unknown `form` attribute `{first}`; expected `rename`, `skip`, `flatten` or `required`"
                    );
                    return Err(error(first.span(), &msg));
                }
            }
        }
        Ok(())
    }

    fn add_flag(&mut self, flag: &'static str) {
        if !self.has_flag(flag) {
            self.flags.push(flag);
        }
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|known| *known == flag)
    }

    fn is_skipped(&self) -> bool {
        self.has_flag("SKIP")
    }

    fn effective_name(&self, field: &FieldDef) -> String {
        self.rename.clone().unwrap_or_else(|| field_name(field))
    }
}

/// Splits the inside of a struct body on top-level commas.
fn split_fields(body: TokenStream2) -> Vec<TokenStream2> {
    let mut fields = Vec::new();
    let mut current: Vec<TokenTree> = Vec::new();
    let mut depth = 0usize;
    let mut after_dash = false;

    for tt in body {
        if let TokenTree::Punct(p) = &tt {
            match p.as_char() {
                ',' if depth == 0 => {
                    fields.push(current.drain(..).collect());
                    after_dash = false;
                    continue;
                }
                '<' => depth += 1,
                // `->` in fn pointer types does not close a generic list
                '>' if !after_dash => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        after_dash = matches!(&tt, TokenTree::Punct(p) if p.as_char() == '-');
        current.push(tt);
    }
    if !current.is_empty() {
        fields.push(current.into_iter().collect());
    }
    fields
}

fn attr_tokens(attr: &Attribute) -> Vec<TokenTree> {
    attr.content.0.stream().into_iter().collect()
}

fn is_form_attr(tokens: &[TokenTree]) -> bool {
    matches!(tokens.first(), Some(TokenTree::Ident(ident)) if ident == "form")
}

fn doc_literal(tokens: &[TokenTree]) -> Option<Literal> {
    match tokens {
        [TokenTree::Ident(ident), TokenTree::Punct(eq), TokenTree::Literal(lit)]
            if ident == "doc" && eq.as_char() == '=' =>
        {
            Some(lit.clone())
        }
        _ => None,
    }
}

fn string_value(lit: &Literal) -> Option<String> {
    let repr = lit.to_string();
    let inner = repr.strip_prefix('"')?.strip_suffix('"')?;
    if inner.contains('\\') {
        return None;
    }
    Some(inner.to_owned())
}

fn field_name(field: &FieldDef) -> String {
    let name = field.name.to_string();
    match name.strip_prefix("r#") {
        Some(raw) => raw.to_owned(),
        None => name,
    }
}

fn error(span: Span, msg: &str) -> TokenStream2 {
    quote_spanned! { span =>
        compile_error!(#msg);
    }
}

use syn::spanned::Spanned;
use syn::{Attribute, Error, ExprPath, LitStr, Result, Token};

pub const INJECT: &str = "inject";
pub const INJECTABLE: &str = "injectable";

pub enum DefaultDefinition {
    Default,
    Expr(ExprPath),
}

#[derive(Default)]
pub struct FieldAttributes {
    pub named: Option<LitStr>,
    pub nullable: bool,
    pub default: Option<DefaultDefinition>,
    pub member: bool,
    pub supertype: bool,
}

impl FieldAttributes {
    pub fn from_attributes(attributes: &[Attribute]) -> Result<Self> {
        let mut result = Self::default();
        for attribute in attributes.iter().filter(|attr| attr.path().is_ident(INJECT)) {
            result.parse(attribute)?;
        }

        result.validate(attributes)?;
        Ok(result)
    }

    fn parse(&mut self, attribute: &Attribute) -> Result<()> {
        attribute.parse_nested_meta(|meta| {
            if meta.path.is_ident("named") {
                self.named = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("nullable") {
                self.nullable = true;
            } else if meta.path.is_ident("default") {
                if meta.input.peek(Token![=]) {
                    let expr: LitStr = meta.value()?.parse()?;
                    self.default = Some(DefaultDefinition::Expr(expr.parse()?));
                } else {
                    self.default = Some(DefaultDefinition::Default);
                }
            } else if meta.path.is_ident("member") {
                self.member = true;
            } else if meta.path.is_ident("supertype") {
                self.supertype = true;
            } else {
                return Err(meta.error("Unsupported inject attribute!"));
            }

            Ok(())
        })
    }

    fn validate(&self, attributes: &[Attribute]) -> Result<()> {
        let span = attributes
            .iter()
            .find(|attr| attr.path().is_ident(INJECT))
            .map(|attr| attr.span());

        let error = |message: &str| match span {
            Some(span) => Err(Error::new(span, message)),
            None => Ok(()),
        };

        if self.member && self.supertype {
            return error("A field can't be both a member and a supertype!");
        }

        if self.default.is_some() && (self.named.is_some() || self.nullable) {
            return error("Default fields are not injected and can't be qualified!");
        }

        if self.supertype && (self.named.is_some() || self.nullable) {
            return error("Supertype fields are not injected and can't be qualified!");
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct InjectableAttributes {
    pub scope: Option<LitStr>,
    pub constructor: Option<ExprPath>,
}

impl InjectableAttributes {
    pub fn from_attributes(attributes: &[Attribute]) -> Result<Self> {
        let mut result = Self::default();
        for attribute in attributes
            .iter()
            .filter(|attr| attr.path().is_ident(INJECTABLE))
        {
            attribute.parse_nested_meta(|meta| {
                if meta.path.is_ident("scope") {
                    result.scope = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("constructor") {
                    let expr: LitStr = meta.value()?.parse()?;
                    result.constructor = Some(expr.parse()?);
                } else {
                    return Err(meta.error("Unsupported injectable attribute!"));
                }

                Ok(())
            })?;
        }

        Ok(result)
    }
}

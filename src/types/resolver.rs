//! Type resolver
//!
//! Builds the name table once from alias, struct, library and built-in
//! declarations, then answers `resolve` queries without further mutation.

use super::{
    ContainerKind, GenericBindings, LibraryEntity, Param, ScalarType, StructEntity, SymbolKind,
    TemplateEntity, TypeDescriptor, TypeExpr,
};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Aliases the language ships with
const BUILTIN_ALIASES: &[(&str, ScalarType)] = &[("PubKeyHash", ScalarType::Ripemd160)];

/// `type Name = Target;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDecl {
    /// Alias name
    pub name: String,
    /// Target type string
    pub ty: String,
}

impl AliasDecl {
    /// Create an alias declaration
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        AliasDecl {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

#[derive(Debug, Clone)]
enum Symbol {
    Scalar(ScalarType),
    Struct(StructEntity),
    Library(LibraryEntity),
}

/// Name → type table for one contract interface
#[derive(Debug, Clone)]
pub struct TypeResolver {
    symbols: HashMap<String, Symbol>,
    /// Alias name → alias-free target
    aliases: HashMap<String, TypeExpr>,
}

impl TypeResolver {
    /// Resolver that only knows the built-in scalars, aliases and containers
    pub fn builtin() -> Self {
        let mut symbols = scalar_symbols();
        for kind in [ContainerKind::Map, ContainerKind::Set] {
            symbols.insert(kind.name().to_string(), Symbol::Library(kind.entity()));
        }
        TypeResolver {
            symbols,
            aliases: BUILTIN_ALIASES
                .iter()
                .map(|(name, ty)| (name.to_string(), TypeExpr::scalar(*ty)))
                .collect(),
        }
    }

    /// Build the table from artifact declarations.
    ///
    /// Every alias is resolved here, so a cyclic or dangling alias fails
    /// construction rather than the first lookup. Alias order is irrelevant.
    pub fn new(
        aliases: &[AliasDecl],
        structs: Vec<StructEntity>,
        libraries: Vec<LibraryEntity>,
    ) -> Result<Self> {
        let mut symbols = scalar_symbols();

        let mut declare = |name: &str, symbol: Symbol| -> Result<()> {
            if symbols.contains_key(name) {
                return Err(Error::resolution(name, "declared more than once"));
            }
            symbols.insert(name.to_string(), symbol);
            Ok(())
        };

        for entity in structs {
            declare(&entity.name.clone(), Symbol::Struct(entity))?;
        }
        for entity in libraries {
            declare(&entity.name.clone(), Symbol::Library(entity))?;
        }
        for kind in [ContainerKind::Map, ContainerKind::Set] {
            if !symbols.contains_key(kind.name()) {
                symbols.insert(kind.name().to_string(), Symbol::Library(kind.entity()));
            }
        }

        let mut raw_aliases = HashMap::new();
        for alias in aliases {
            if symbols.contains_key(&alias.name) || raw_aliases.contains_key(&alias.name) {
                return Err(Error::resolution(&alias.name, "declared more than once"));
            }
            raw_aliases.insert(alias.name.clone(), TypeExpr::parse(&alias.ty)?);
        }
        // Artifacts that already declare a built-in alias keep their own
        for (name, ty) in BUILTIN_ALIASES {
            if !symbols.contains_key(*name) && !raw_aliases.contains_key(*name) {
                raw_aliases.insert(name.to_string(), TypeExpr::scalar(*ty));
            }
        }

        let mut resolver = TypeResolver {
            symbols,
            aliases: raw_aliases,
        };

        let mut resolved = HashMap::with_capacity(resolver.aliases.len());
        for name in resolver.aliases.keys() {
            let mut chain = Vec::new();
            let target = resolver.canonicalize(&TypeExpr::named(name.clone()), &[], &mut chain)?;
            resolved.insert(name.clone(), target);
        }
        resolver.aliases = resolved;

        // Canonicalize declared slot types with the template's own generics in scope
        let names: Vec<String> = resolver
            .symbols
            .iter()
            .filter(|(_, s)| !matches!(s, Symbol::Scalar(_)))
            .map(|(n, _)| n.clone())
            .collect();
        for name in names {
            let canonical = match resolver.symbols.get(&name) {
                Some(Symbol::Struct(s)) => {
                    let entity = TemplateEntity::Struct(s.clone());
                    resolver.canonicalize_entity(&entity)?
                }
                Some(Symbol::Library(l)) => {
                    let entity = TemplateEntity::Library(l.clone());
                    resolver.canonicalize_entity(&entity)?
                }
                _ => continue,
            };
            let symbol = match canonical {
                TemplateEntity::Struct(s) => Symbol::Struct(s),
                TemplateEntity::Library(l) => Symbol::Library(l),
            };
            resolver.symbols.insert(name, symbol);
        }

        tracing::debug!(
            symbols = resolver.symbols.len(),
            aliases = resolver.aliases.len(),
            "type table built"
        );

        Ok(resolver)
    }

    fn canonicalize_entity(&self, entity: &TemplateEntity) -> Result<TemplateEntity> {
        let scope = entity.generic_types().to_vec();
        let mut failure = None;
        let canonical = entity.map_slot_types(|ty| {
            let mut chain = Vec::new();
            match self.canonicalize(ty, &scope, &mut chain) {
                Ok(t) => t,
                Err(e) => {
                    failure.get_or_insert(e);
                    ty.clone()
                }
            }
        });
        match failure {
            Some(Error::ResolutionError { name, reason }) => Err(Error::resolution(
                name,
                format!("{} (in declaration of `{}`)", reason, entity.name()),
            )),
            Some(e) => Err(e),
            None => Ok(canonical),
        }
    }

    /// Rewrite `ty` to its alias-free form.
    ///
    /// `scope` holds generic parameter names that stay opaque; `chain` is the
    /// alias path being followed, used for cycle detection.
    fn canonicalize(
        &self,
        ty: &TypeExpr,
        scope: &[String],
        chain: &mut Vec<String>,
    ) -> Result<TypeExpr> {
        if ty.args.is_empty() && scope.iter().any(|p| *p == ty.name) {
            return Ok(ty.clone());
        }

        let args = ty
            .args
            .iter()
            .map(|a| self.canonicalize(a, scope, chain))
            .collect::<Result<Vec<_>>>()?;

        if let Some(target) = self.aliases.get(&ty.name) {
            if chain.iter().any(|n| *n == ty.name) {
                chain.push(ty.name.clone());
                return Err(Error::resolution(
                    &ty.name,
                    format!("cyclic alias: {}", chain.join(" -> ")),
                ));
            }
            chain.push(ty.name.clone());
            let mut resolved = self.canonicalize(target, &[], chain)?;
            chain.pop();

            if !args.is_empty() {
                if !resolved.args.is_empty() {
                    return Err(Error::resolution(
                        &ty.name,
                        "alias already fixes its type arguments",
                    ));
                }
                resolved.args = args;
                self.check_template_arity(&resolved)?;
            }
            return Ok(resolved.with_outer_dims(&ty.dims));
        }

        match self.symbols.get(&ty.name) {
            Some(Symbol::Scalar(_)) if !args.is_empty() => Err(Error::resolution(
                &ty.name,
                "scalar types take no type arguments",
            )),
            Some(_) => {
                let canonical = TypeExpr {
                    name: ty.name.clone(),
                    args,
                    dims: ty.dims.clone(),
                };
                self.check_template_arity(&canonical)?;
                Ok(canonical)
            }
            None => Err(Error::resolution(&ty.name, "unknown type")),
        }
    }

    fn check_template_arity(&self, ty: &TypeExpr) -> Result<()> {
        if ty.args.is_empty() {
            return Ok(());
        }
        let expected = match self.template(&ty.name) {
            Some(t) => t.generic_types().len(),
            None => 0,
        };
        if expected != ty.args.len() {
            return Err(Error::resolution(
                ty.to_string(),
                format!(
                    "expects {} type arguments, got {}",
                    expected,
                    ty.args.len()
                ),
            ));
        }
        Ok(())
    }

    /// Resolve a type string into its descriptor
    pub fn resolve(&self, name: &str) -> Result<TypeDescriptor> {
        let ty = TypeExpr::parse(name)?;
        let mut descriptor = self.resolve_expr(&ty)?;
        descriptor.declared = name.to_string();
        Ok(descriptor)
    }

    /// Resolve a parsed type into its descriptor
    pub fn resolve_expr(&self, ty: &TypeExpr) -> Result<TypeDescriptor> {
        let final_type = self.resolve_type(ty)?;

        let mut generic_bindings = GenericBindings::default();
        let kind = if final_type.is_array() {
            SymbolKind::Array
        } else {
            match self.symbols.get(&final_type.name) {
                Some(Symbol::Scalar(t)) => SymbolKind::Scalar(*t),
                Some(Symbol::Struct(_)) => SymbolKind::Struct,
                Some(Symbol::Library(_)) => SymbolKind::Library,
                None => return Err(Error::resolution(&final_type.name, "unknown type")),
            }
        };

        if let Some(template) = self.template(&final_type.name) {
            for (param, arg) in template.generic_types().iter().zip(&final_type.args) {
                generic_bindings = generic_bindings.bind(template.name(), param, arg)?;
            }
        }

        Ok(TypeDescriptor {
            declared: ty.to_string(),
            final_type,
            kind,
            generic_bindings,
        })
    }

    /// Alias-free canonical form of a type
    pub fn resolve_type(&self, ty: &TypeExpr) -> Result<TypeExpr> {
        let mut chain = Vec::new();
        self.canonicalize(ty, &[], &mut chain)
    }

    /// Struct declaration by name
    pub fn struct_entity(&self, name: &str) -> Option<&StructEntity> {
        match self.symbols.get(name) {
            Some(Symbol::Struct(s)) => Some(s),
            _ => None,
        }
    }

    /// Every declared struct, in no particular order
    pub fn structs(&self) -> impl Iterator<Item = &StructEntity> {
        self.symbols.values().filter_map(|s| match s {
            Symbol::Struct(s) => Some(s),
            _ => None,
        })
    }

    /// Library declaration by name
    pub fn library_entity(&self, name: &str) -> Option<&LibraryEntity> {
        match self.symbols.get(name) {
            Some(Symbol::Library(l)) => Some(l),
            _ => None,
        }
    }

    /// Struct or library declaration by name
    pub fn template(&self, name: &str) -> Option<TemplateEntity> {
        match self.symbols.get(name) {
            Some(Symbol::Struct(s)) => Some(TemplateEntity::Struct(s.clone())),
            Some(Symbol::Library(l)) => Some(TemplateEntity::Library(l.clone())),
            _ => None,
        }
    }

    /// Declared aliases with their resolved targets
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &TypeExpr)> {
        self.aliases.iter().map(|(n, t)| (n.as_str(), t))
    }
}

fn scalar_symbols() -> HashMap<String, Symbol> {
    ScalarType::ALL
        .iter()
        .map(|t| (t.name().to_string(), Symbol::Scalar(*t)))
        .collect()
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Convenience for tests and tooling: a struct with scalar-string field types
pub fn struct_decl(name: &str, fields: &[(&str, &str)], generics: &[&str]) -> Result<StructEntity> {
    Ok(StructEntity {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(n, t)| Param::new(*n, t))
            .collect::<Result<Vec<_>>>()?,
        generic_types: generics.iter().map(|g| g.to_string()).collect(),
    })
}

/// Convenience for tests and tooling: a library with params and properties
pub fn library_decl(
    name: &str,
    params: &[(&str, &str)],
    properties: &[(&str, &str)],
    generics: &[&str],
) -> Result<LibraryEntity> {
    let parse = |slots: &[(&str, &str)]| {
        slots
            .iter()
            .map(|(n, t)| Param::new(*n, t))
            .collect::<Result<Vec<_>>>()
    };
    Ok(LibraryEntity {
        name: name.to_string(),
        params: parse(params)?,
        properties: parse(properties)?,
        generic_types: generics.iter().map(|g| g.to_string()).collect(),
    })
}

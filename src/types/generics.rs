//! Generic parameter binding
//!
//! Templates are instantiated by structurally matching their declared slot
//! types against concrete types. `unify` is pure: it takes bindings by value
//! and hands back the extended set, so a failed match leaves the caller's
//! bindings untouched.

use super::{Param, TemplateEntity, TypeExpr, TypeResolver};
use crate::error::{Error, Result};

/// Deepest chain of nested generic instantiations accepted
pub const MAX_INSTANTIATION_DEPTH: usize = 32;

/// Ordered map from generic parameter name to concrete type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericBindings {
    entries: Vec<(String, TypeExpr)>,
}

impl GenericBindings {
    /// Concrete type bound to `param`
    pub fn get(&self, param: &str) -> Option<&TypeExpr> {
        self.entries
            .iter()
            .find(|(name, _)| name == param)
            .map(|(_, ty)| ty)
    }

    /// Bindings extended with `param = ty`.
    ///
    /// Rebinding to an equal type is a no-op; rebinding to a different type
    /// fails with [`Error::GenericConflict`].
    pub fn bind(&self, template: &str, param: &str, ty: &TypeExpr) -> Result<GenericBindings> {
        match self.get(param) {
            Some(existing) if existing == ty => Ok(self.clone()),
            Some(existing) => Err(Error::GenericConflict {
                template: template.to_string(),
                param: param.to_string(),
                first: existing.to_string(),
                second: ty.to_string(),
            }),
            None => {
                let mut next = self.clone();
                next.entries.push((param.to_string(), ty.clone()));
                Ok(next)
            }
        }
    }

    /// Iterate bindings in the order they were made
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeExpr)> {
        self.entries.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace bound parameter names inside `ty`.
    ///
    /// Dimensions written at the use site wrap the bound type's own:
    /// `T[3]` with `T = int[2]` is `int[3][2]`.
    pub fn substitute(&self, ty: &TypeExpr) -> TypeExpr {
        if ty.args.is_empty() {
            if let Some(bound) = self.get(&ty.name) {
                return bound.clone().with_outer_dims(&ty.dims);
            }
        }
        TypeExpr {
            name: ty.name.clone(),
            args: ty.args.iter().map(|a| self.substitute(a)).collect(),
            dims: ty.dims.clone(),
        }
    }
}

fn is_param(params: &[String], ty: &TypeExpr) -> bool {
    ty.args.is_empty() && params.iter().any(|p| *p == ty.name)
}

/// Whether `pattern` mentions any of `params`
pub fn mentions_params(params: &[String], pattern: &TypeExpr) -> bool {
    is_param(params, pattern) || pattern.args.iter().any(|a| mentions_params(params, a))
}

/// Match `pattern` (written in terms of `params`) against `concrete`.
pub fn unify(
    template: &str,
    params: &[String],
    pattern: &TypeExpr,
    concrete: &TypeExpr,
    bindings: GenericBindings,
) -> Result<GenericBindings> {
    let mismatch = || Error::type_mismatch(template, pattern.to_string(), concrete.to_string());

    if is_param(params, pattern) {
        let outer = pattern.dims.len();
        if concrete.dims.len() < outer {
            return Err(mismatch());
        }
        if concrete.dims[..outer] != pattern.dims[..] {
            let (expected, actual) = pattern
                .dims
                .iter()
                .zip(&concrete.dims)
                .find(|(e, a)| e != a)
                .map(|(e, a)| (*e, *a))
                .unwrap_or_default();
            return Err(Error::length_mismatch(template, expected, actual));
        }
        let bound = TypeExpr {
            name: concrete.name.clone(),
            args: concrete.args.clone(),
            dims: concrete.dims[outer..].to_vec(),
        };
        return bindings.bind(template, &pattern.name, &bound);
    }

    if pattern.name != concrete.name || pattern.args.len() != concrete.args.len() {
        return Err(mismatch());
    }
    if pattern.dims != concrete.dims {
        if pattern.dims.len() == concrete.dims.len() {
            if let Some((e, a)) = pattern.dims.iter().zip(&concrete.dims).find(|(e, a)| e != a) {
                return Err(Error::length_mismatch(template, *e, *a));
            }
        }
        return Err(mismatch());
    }

    pattern
        .args
        .iter()
        .zip(&concrete.args)
        .try_fold(bindings, |acc, (p, c)| unify(template, params, p, c, acc))
}

/// A template with every generic parameter bound
#[derive(Debug, Clone, PartialEq)]
pub struct Instantiation {
    /// Concrete type name with arguments, e.g. `Box<int>`
    pub concrete: TypeExpr,
    /// Parameter bindings, in template declaration order
    pub bindings: GenericBindings,
    /// Declaration with every slot type substituted
    pub entity: TemplateEntity,
}

/// Binds template parameters against the declarations held by a resolver
pub struct GenericDeducer<'a> {
    resolver: &'a TypeResolver,
}

impl<'a> GenericDeducer<'a> {
    /// Create a deducer over `resolver`
    pub fn new(resolver: &'a TypeResolver) -> Self {
        GenericDeducer { resolver }
    }

    /// Instantiate the struct or library named by `ty` (dimensions ignored)
    pub fn deduce(&self, ty: &TypeExpr) -> Result<Instantiation> {
        self.deduce_at(ty, 0)
    }

    fn deduce_at(&self, ty: &TypeExpr, depth: usize) -> Result<Instantiation> {
        let ty = self.resolver.resolve_type(ty)?.base();
        let template = self.template(&ty.name)?;
        let params = template.generic_types();

        if ty.args.is_empty() && !params.is_empty() {
            return Err(Error::resolution(
                &ty.name,
                format!("generic parameters <{}> are not bound", params.join(",")),
            ));
        }
        if ty.args.len() != params.len() {
            return Err(Error::resolution(
                ty.to_string(),
                format!(
                    "expects {} type arguments, got {}",
                    params.len(),
                    ty.args.len()
                ),
            ));
        }

        let bindings = params
            .iter()
            .zip(&ty.args)
            .try_fold(GenericBindings::default(), |acc, (param, arg)| {
                acc.bind(template.name(), param, arg)
            })?;

        self.instantiate(&template, bindings, depth)
    }

    /// Infer the parameters of a generic template from observed slot types.
    ///
    /// `observed[i]` is the concrete type seen for `slots[i]`, or `None` when
    /// the value carries no usable type information (an empty array, an object
    /// matching no declared struct). Slots whose declared type does not mention a parameter are
    /// left for the flattener to check.
    pub fn infer(
        &self,
        name: &str,
        slots: &[Param],
        observed: &[Option<TypeExpr>],
    ) -> Result<Instantiation> {
        let template = self.template(name)?;
        let params = template.generic_types().to_vec();

        let mut bindings = GenericBindings::default();
        for (slot, seen) in slots.iter().zip(observed) {
            let Some(seen) = seen else { continue };
            if !mentions_params(&params, &slot.ty) {
                continue;
            }
            bindings = unify(template.name(), &params, &slot.ty, seen, bindings)?;
        }

        if let Some(unbound) = params.iter().find(|p| bindings.get(p).is_none()) {
            return Err(Error::resolution(
                name,
                format!("cannot infer generic parameter `{}` from the argument", unbound),
            ));
        }

        // Declaration order for the concrete type arguments
        let ordered = params.iter().try_fold(GenericBindings::default(), |acc, p| {
            match bindings.get(p) {
                Some(ty) => acc.bind(name, p, ty),
                None => Ok(acc),
            }
        })?;

        tracing::debug!(template = name, bindings = ordered.len(), "inferred generic parameters");
        self.instantiate(&template, ordered, 0)
    }

    fn template(&self, name: &str) -> Result<TemplateEntity> {
        self.resolver
            .template(name)
            .ok_or_else(|| Error::resolution(name, "not a struct or library"))
    }

    fn instantiate(
        &self,
        template: &TemplateEntity,
        bindings: GenericBindings,
        depth: usize,
    ) -> Result<Instantiation> {
        if depth > MAX_INSTANTIATION_DEPTH {
            return Err(Error::resolution(
                template.name(),
                "generic instantiation nests too deeply",
            ));
        }

        let entity = template.map_slot_types(|ty| bindings.substitute(ty));

        for slot in entity.slot_types() {
            if !slot.args.is_empty() {
                self.deduce_at(slot, depth + 1)?;
            }
        }

        let concrete = TypeExpr {
            name: template.name().to_string(),
            args: template
                .generic_types()
                .iter()
                .filter_map(|p| bindings.get(p).cloned())
                .collect(),
            dims: Vec::new(),
        };

        Ok(Instantiation {
            concrete,
            bindings,
            entity,
        })
    }
}

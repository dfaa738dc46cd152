//! Generic specialization, tuples, lambdas, and synthesized parameters.
//!
//! Generic parameters are positional: inside a generic definition the i-th
//! declared parameter is referenced through the shared leaf `#i` (see
//! [`SymbolTable::generic_param`]). Specializing replaces those leaves with
//! the supplied type arguments.
//!
//! Specializations are cached by full name, so the same concrete symbol and
//! the same arguments give back the same [`SymbolId`]. Named tuples are the
//! exception: their labels are part of the type identity the user sees, so
//! each request makes a fresh symbol even when the names collide.

use smallvec::SmallVec;

use crate::error::SymbolError;
use crate::symbol::{Symbol, SymbolId, SymbolKind, TupleField};
use crate::table::SymbolTable;

impl SymbolTable {
    /// Specialize `concrete` over `type_args`.
    ///
    /// `concrete` must be an unspecialized type, function, or field. With no
    /// arguments it is returned as is. `fields` labels tuple positions and
    /// must match `type_args` in length.
    ///
    /// The concrete symbol's own type is re-specialized over the same
    /// arguments; specializing the lambda root instead takes its single
    /// tuple argument as the type.
    #[tracing::instrument(level = "trace", skip(self, fields))]
    pub fn create_specialized_type(
        &mut self,
        concrete: SymbolId,
        type_args: &[SymbolId],
        fields: Option<&[TupleField]>,
    ) -> Result<SymbolId, SymbolError> {
        let base = self.get(concrete);
        if base.is_specialized() {
            return Err(SymbolError::AlreadySpecialized(base.full_name.clone()));
        }
        if !matches!(
            base.kind,
            SymbolKind::Type | SymbolKind::Function | SymbolKind::Field
        ) {
            return Err(SymbolError::NotSpecializable {
                kind: base.kind,
                name: base.full_name.clone(),
            });
        }
        if let Some(fields) = fields {
            if fields.len() != type_args.len() {
                return Err(SymbolError::TupleNameCount {
                    expected: type_args.len(),
                    found: fields.len(),
                });
            }
        }
        if type_args.is_empty() {
            return Ok(concrete);
        }

        let mut symbol = Symbol::new(base.kind, concrete, base.name.clone());
        symbol.qualifiers = base.qualifiers;
        symbol.site = base.site;
        let base_type = base.type_ref;
        symbol.type_args = type_args.iter().copied().collect();
        if let Some(fields) = fields.filter(|f| f.iter().any(|field| !field.name.is_empty())) {
            symbol.tuple_names = fields.iter().map(|f| f.name.clone()).collect();
        }
        symbol.type_ref = if concrete == self.lambda_root {
            type_args.first().copied()
        } else {
            match base_type {
                Some(ty) => Some(self.replace_generic_type_params(ty, type_args)?),
                None => None,
            }
        };

        let full_name = self.compute_full_name(&symbol);
        let named = full_name.contains(' ');
        if !named {
            if let Some(&cached) = self.specializations.get(&full_name) {
                return Ok(cached);
            }
        }
        symbol.full_name.clone_from(&full_name);
        let id = self.push_detached(symbol);
        if !named {
            self.specializations.insert(full_name, id);
        } else if let Some(fields) = fields {
            self.add_tuple_fields(id, fields);
        }
        Ok(id)
    }

    /// Add one `TupleParam` child per labeled position. A repeated label is
    /// rejected at its own site; the tuple is kept.
    fn add_tuple_fields(&mut self, tuple: SymbolId, fields: &[TupleField]) {
        let types = self.get(tuple).type_args.clone();
        for (field, &ty) in fields.iter().zip(&types) {
            if field.name.is_empty() {
                continue;
            }
            if self.child(tuple, &field.name).is_some() {
                self.reject(
                    field.site,
                    format!("Duplicate tuple field name `{}`", field.name),
                );
                continue;
            }
            let mut param =
                Symbol::new(SymbolKind::TupleParam, tuple, field.name.clone()).with_type(ty);
            param.site = field.site;
            self.insert_unchecked(param);
        }
    }

    /// Whether `id` is the empty tuple or a tuple specialization.
    pub fn is_tuple(&self, id: SymbolId) -> bool {
        let symbol = self.get(id);
        id == self.tuple_root || (symbol.parent == self.tuple_root && symbol.is_specialized())
    }

    /// The tuple `(types..)`, optionally labeled.
    ///
    /// No types gives the empty tuple root.
    pub fn create_tuple(
        &mut self,
        types: &[SymbolId],
        fields: Option<&[TupleField]>,
    ) -> Result<SymbolId, SymbolError> {
        self.create_specialized_type(self.tuple_root, types, fields)
    }

    /// The lambda type taking `params` and returning `returns`.
    ///
    /// Both sides must be tuples. The lambda is the lambda root specialized
    /// over the tuple `(params,returns)`, and its type is that tuple.
    pub fn create_lambda(
        &mut self,
        params: SymbolId,
        returns: SymbolId,
    ) -> Result<SymbolId, SymbolError> {
        for side in [params, returns] {
            if !self.is_tuple(side) {
                return Err(SymbolError::NotATuple(self.get(side).full_name.clone()));
            }
        }
        let pair = self.create_tuple(&[params, returns], None)?;
        self.create_specialized_type(self.lambda_root, &[pair], None)
    }

    /// Substitute `args[i]` for every `#i` leaf inside `ty`.
    ///
    /// Returns `ty` itself when nothing changes, so cached identities hold.
    /// Leaves without a matching argument stay as they are.
    pub fn replace_generic_type_params(
        &mut self,
        ty: SymbolId,
        args: &[SymbolId],
    ) -> Result<SymbolId, SymbolError> {
        if let Some(index) = self.generic_param_index(ty) {
            return Ok(args.get(index).copied().unwrap_or(ty));
        }
        let symbol = self.get(ty);
        if !symbol.is_specialized() {
            return Ok(ty);
        }
        let (concrete, old_args, names) = (
            symbol.parent,
            symbol.type_args.clone(),
            symbol.tuple_names.clone(),
        );
        let mut new_args: SmallVec<[SymbolId; 2]> = SmallVec::with_capacity(old_args.len());
        for &arg in &old_args {
            new_args.push(self.replace_generic_type_params(arg, args)?);
        }
        if new_args == old_args {
            return Ok(ty);
        }
        let fields: Vec<TupleField> = names
            .iter()
            .map(|n| TupleField::new(n.clone(), None))
            .collect();
        let fields = (!fields.is_empty()).then_some(fields.as_slice());
        self.create_specialized_type(concrete, &new_args, fields)
    }

    /// The shared generic-parameter leaf `#index`.
    pub fn generic_param(&mut self, index: usize) -> SymbolId {
        while self.generic_params.len() <= index {
            let name = format!("#{}", self.generic_params.len());
            let id = self.push_detached(Symbol::new(SymbolKind::TypeParam, SymbolId::ROOT, name));
            self.generic_params.push(id);
        }
        self.generic_params[index]
    }

    /// Position of `id` if it is one of the `#i` leaves.
    pub fn generic_param_index(&self, id: SymbolId) -> Option<usize> {
        self.generic_params.iter().position(|&p| p == id)
    }

    /// The synthetic `new` function of `#index`, typed `()(#index)`.
    pub fn generic_param_constructor(&mut self, index: usize) -> Result<SymbolId, SymbolError> {
        if let Some(&Some(ctor)) = self.generic_constructors.get(index) {
            return Ok(ctor);
        }
        let param = self.generic_param(index);
        let returns = self.create_tuple(&[param], None)?;
        let lambda = self.create_lambda(self.tuple_root, returns)?;
        let ctor =
            self.push_detached(Symbol::new(SymbolKind::Function, param, "new").with_type(lambda));
        if self.generic_constructors.len() <= index {
            self.generic_constructors.resize(index + 1, None);
        }
        self.generic_constructors[index] = Some(ctor);
        Ok(ctor)
    }

    /// Parameter types of a function, read from its lambda type.
    pub fn function_signature(&self, func: SymbolId) -> SmallVec<[SymbolId; 4]> {
        self.signature_of(self.get(func).type_ref)
    }

    /// Return tuple of a function, if it has a lambda type.
    pub fn function_returns(&self, func: SymbolId) -> Option<SymbolId> {
        let pair = self.lambda_pair(self.get(func).type_ref)?;
        self.get(pair).type_args.get(1).copied()
    }

    pub(crate) fn signature_of(&self, lambda: Option<SymbolId>) -> SmallVec<[SymbolId; 4]> {
        self.params_tuple(lambda)
            .map(|params| self.get(params).type_args.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `(T1,T2)` for a lambda-typed symbol, `()` otherwise.
    pub(crate) fn signature_text(&self, lambda: Option<SymbolId>) -> String {
        self.params_tuple(lambda).map_or_else(
            || crate::table::TUPLE_ROOT_NAME.to_string(),
            |params| self.get(params).full_name.clone(),
        )
    }

    fn params_tuple(&self, lambda: Option<SymbolId>) -> Option<SymbolId> {
        let pair = self.lambda_pair(lambda)?;
        self.get(pair).type_args.first().copied()
    }

    fn lambda_pair(&self, lambda: Option<SymbolId>) -> Option<SymbolId> {
        let lambda = self.get(lambda?);
        if lambda.parent != self.lambda_root || !lambda.is_specialized() {
            return None;
        }
        lambda.type_ref
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;

use std::marker::PhantomData;

use crate::{
    context::EventContext,
    definition::ObjectDefinition,
    error::{Error, Result},
    store::{Field, KinematicStore, PairField},
};

/// A validated per-role quantity of a candidate
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FieldRef {
    role: usize,
    field: Field,
}

impl FieldRef {
    pub fn role(&self) -> usize {
        self.role
    }

    pub fn field(&self) -> Field {
        self.field
    }

    pub fn get<E: KinematicStore>(&self, ctx: &EventContext<'_, E>) -> Option<f64> {
        ctx.value(self.role, self.field)
    }
}

/// A validated pair quantity of a candidate
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct PairRef {
    roles: (usize, usize),
    field: PairField,
}

impl PairRef {
    pub fn get<E: KinematicStore>(&self, ctx: &EventContext<'_, E>) -> Option<f64> {
        ctx.pair_value(self.roles.0, self.roles.1, self.field)
    }
}

/// Resolves candidate quantities against the schema of an event store
///
/// Every role of the definition is checked against all object kinds
/// that can fill it, so a quantity that an event store cannot provide
/// is rejected when the analysis is configured.
#[derive(Clone, Debug)]
pub struct FieldTable<E> {
    definition: ObjectDefinition,
    store: PhantomData<fn() -> E>,
}

impl<E: KinematicStore> FieldTable<E> {
    pub fn new(definition: ObjectDefinition) -> Self {
        Self {
            definition,
            store: PhantomData,
        }
    }

    pub fn resolve(&self, role: usize, field: Field) -> Result<FieldRef> {
        self.check_role(role)?;
        let kinds = self.definition.roles()[role].kinds();
        if let Some(kind) = kinds.into_iter().find(|k| !E::provides(*k, field)) {
            return Err(Error::MissingField { role, kind, field });
        }
        Ok(FieldRef { role, field })
    }

    pub fn resolve_pair(&self, a: usize, b: usize, field: PairField) -> Result<PairRef> {
        self.check_role(a)?;
        self.check_role(b)?;
        let roles = self.definition.roles();
        for ka in roles[a].kinds() {
            for kb in roles[b].kinds() {
                if !E::provides_pair(ka, kb, field) {
                    return Err(Error::MissingPairField {
                        roles: (a, b),
                        kinds: (ka, kb),
                        field,
                    });
                }
            }
        }
        Ok(PairRef {
            roles: (a, b),
            field,
        })
    }

    fn check_role(&self, role: usize) -> Result<()> {
        if role < self.definition.len() {
            Ok(())
        } else {
            Err(Error::NoSuchRole {
                role,
                definition: self.definition.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::IdPredicateSet,
        definition::CandidateAssignment,
        event::{EventBuilder, EventIdentity, FinalStateEvent},
        label::ObjectKind,
    };

    #[test]
    fn test_resolve() {
        let definition: ObjectDefinition = "l,met".parse().unwrap();
        let table = FieldTable::<FinalStateEvent>::new(definition);
        assert!(table.resolve(0, Field::Charge).is_ok());
        assert!(table.resolve(1, Field::Pt).is_ok());
        match table.resolve(1, Field::Eta) {
            Err(Error::MissingField { role: 1, kind: ObjectKind::MissingEnergy, field: Field::Eta }) => {}
            res => panic!("unexpected result {res:?}"),
        }
        assert!(matches!(table.resolve(2, Field::Pt), Err(Error::NoSuchRole { .. })));
        assert!(table.resolve_pair(0, 1, PairField::TransverseMass).is_ok());
        assert!(table.resolve_pair(0, 3, PairField::Mass).is_err());
    }

    #[test]
    fn test_resolve_pair_schema() {
        let table = FieldTable::<FinalStateEvent>::new("l,met".parse().unwrap());
        match table.resolve_pair(0, 1, PairField::DeltaR) {
            Err(Error::MissingPairField {
                roles: (0, 1),
                kinds: (ObjectKind::Electron, ObjectKind::MissingEnergy),
                field: PairField::DeltaR,
            }) => {}
            res => panic!("unexpected result {res:?}"),
        }
        assert!(table.resolve_pair(0, 1, PairField::DeltaPhi).is_ok());

        let table = FieldTable::<FinalStateEvent>::new("l,*".parse().unwrap());
        assert!(table.resolve_pair(0, 1, PairField::DeltaR).is_ok());
    }

    #[test]
    fn test_lookup() {
        let definition: ObjectDefinition = "l,met".parse().unwrap();
        let table = FieldTable::<FinalStateEvent>::new(definition);
        let pt = table.resolve(0, Field::Pt).unwrap();
        let mt = table.resolve_pair(0, 1, PairField::TransverseMass).unwrap();

        let mut builder = EventBuilder::new(EventIdentity::new(1, 1, 1));
        builder.add_object(particle_id::ParticleID::new(13), [30., 30., 0., 0.]);
        builder.missing_pt([-20., 0.]);
        let event = builder.build();
        let ids = IdPredicateSet::new();
        let mut ctx = EventContext::new(&event, &ids);
        ctx.bind(CandidateAssignment::new(vec![
            "m".parse().unwrap(),
            "met".parse().unwrap(),
        ]));
        assert_eq!(pt.get(&ctx), Some(30.));
        let mt = mt.get(&ctx).unwrap();
        assert!((mt - (4. * 30. * 20. as f64).sqrt()).abs() < 1e-9);
    }
}

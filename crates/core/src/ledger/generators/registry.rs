//! Charge type to generator dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use super::{
    AuthoritiesGenerator, BusinessTripGenerator, CommonGenerator, ConversionGenerator,
    GenerationContext, LedgerGenerator, ReserveGenerator, SalaryGenerator,
};
use crate::ledger::charge::{ChargeData, ChargeType};
use crate::ledger::error::GenerationError;
use crate::ledger::posting::PostingDraft;

/// Lookup table from charge type to generator.
#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: HashMap<ChargeType, Arc<dyn LedgerGenerator>>,
}

impl GeneratorRegistry {
    /// Creates a registry with no generators.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a registry with a generator for every charge type.
    #[must_use]
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CommonGenerator));
        registry.register(Arc::new(ConversionGenerator));
        registry.register(Arc::new(SalaryGenerator));
        registry.register(Arc::new(BusinessTripGenerator));
        registry.register(Arc::new(ReserveGenerator));
        registry.register(Arc::new(AuthoritiesGenerator));
        registry
    }

    /// Registers a generator for every charge type it declares, replacing earlier entries.
    pub fn register(&mut self, generator: Arc<dyn LedgerGenerator>) {
        for charge_type in generator.charge_types() {
            self.generators.insert(*charge_type, Arc::clone(&generator));
        }
    }

    /// Returns the generator for a charge type.
    #[must_use]
    pub fn get(&self, charge_type: ChargeType) -> Option<&Arc<dyn LedgerGenerator>> {
        self.generators.get(&charge_type)
    }

    /// Generates postings with the generator registered for the charge's type.
    pub fn generate(
        &self,
        data: &ChargeData,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<PostingDraft>, GenerationError> {
        let charge = &data.charge;
        let generator = self
            .get(charge.charge_type)
            .ok_or(GenerationError::UnsupportedChargeType {
                charge_id: charge.id,
                charge_type: charge.charge_type,
            })?;

        generator.generate(data, ctx)
    }
}

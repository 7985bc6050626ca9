use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use herdbook_core::{AnimalId, DomainError, DomainResult};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    Usd,
    Ves,
    Cop,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Ves => "VES",
            Currency::Cop => "COP",
        }
    }
}

/// How the sale price is quoted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceBasis {
    PerKilo,
    #[default]
    PerHead,
    Lot,
}

impl PriceBasis {
    pub fn label(self) -> &'static str {
        match self {
            PriceBasis::PerKilo => "per kg",
            PriceBasis::PerHead => "per head",
            PriceBasis::Lot => "lot",
        }
    }
}

/// Commercial terms shared by every animal in one sale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleTerms {
    pub price: Decimal,
    pub currency: Currency,
    pub basis: PriceBasis,
    pub buyer: String,
    pub buyer_phone: String,
    pub destination: String,
    pub transport_guide: String,
    pub plate: String,
    pub notes: String,
}

impl SaleTerms {
    pub fn validate(&self) -> DomainResult<()> {
        if self.price.is_sign_negative() {
            return Err(DomainError::validation("sale price cannot be negative"));
        }
        Ok(())
    }

    /// Ledger detail1: `"<price> <currency> (<basis>)"`.
    pub fn price_detail(&self) -> String {
        format!(
            "{} {} ({})",
            self.price.normalize(),
            self.currency.code(),
            self.basis.label()
        )
    }

    /// Ledger detail2: buyer and destination.
    pub fn buyer_detail(&self) -> String {
        let buyer = if self.buyer_phone.trim().is_empty() {
            self.buyer.clone()
        } else {
            format!("{} ({})", self.buyer, self.buyer_phone)
        };
        format!("Buyer: {} | Dest: {}", buyer, self.destination)
    }

    /// Ledger notes: transport references followed by free notes.
    pub fn notes_detail(&self) -> String {
        if self.plate.trim().is_empty() {
            format!("Guide: {} | {}", self.transport_guide, self.notes)
        } else {
            format!(
                "Guide: {} | Plate: {} | {}",
                self.transport_guide, self.plate, self.notes
            )
        }
    }
}

/// One sale transaction covering one or more animals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrder {
    pub date: NaiveDate,
    pub animal_ids: Vec<AnimalId>,
    pub terms: SaleTerms,
}

impl SaleOrder {
    /// Checks that do not need the registry: a non-empty selection without repeats and
    /// valid terms.
    pub fn validate(&self) -> DomainResult<()> {
        if self.animal_ids.is_empty() {
            return Err(DomainError::validation("select at least one animal to sell"));
        }
        for (idx, id) in self.animal_ids.iter().enumerate() {
            if self.animal_ids[..idx].contains(id) {
                return Err(DomainError::validation(format!(
                    "animal {id} is selected more than once"
                )));
            }
        }
        self.terms.validate()
    }
}

use crate::domain::{CurrencyCode, Decimal, Shipment};
use serde::Serialize;
use std::collections::BTreeMap;

use super::{div, mul, Diagnostics, OverflowError};

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// The shipment recorded a positive rate for the currency.
    Recorded,
    /// Missing or zero; the primary currency's rate was used instead.
    PrimaryFallback,
    /// The primary rate was missing too; the reference currency's rate was used.
    ReferenceFallback,
    /// No usable rate at all; 1 was used.
    Unit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRate {
    pub currency: CurrencyCode,
    pub rate: Decimal,
    pub source: RateSource,
}

impl ResolvedRate {
    pub fn is_fallback(&self) -> bool {
        self.source != RateSource::Recorded
    }
}

/// Resolves local-currency rates from a shipment's recorded rate table.
///
/// Every resolved rate is positive, so callers may divide by it.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyResolver<'a> {
    rates: &'a BTreeMap<CurrencyCode, Decimal>,
    primary: &'a CurrencyCode,
    reference: &'a CurrencyCode,
}

impl<'a> CurrencyResolver<'a> {
    pub fn new(
        rates: &'a BTreeMap<CurrencyCode, Decimal>,
        primary: &'a CurrencyCode,
        reference: &'a CurrencyCode,
    ) -> Self {
        Self {
            rates,
            primary,
            reference,
        }
    }

    pub fn for_shipment(shipment: &'a Shipment, reference: &'a CurrencyCode) -> Self {
        Self::new(&shipment.exchange_rates, &shipment.primary_currency, reference)
    }

    fn recorded(&self, currency: &CurrencyCode) -> Option<Decimal> {
        self.rates.get(currency).copied().filter(|r| r.is_positive())
    }

    /// Rate of the shipment's primary currency.
    ///
    /// Falls back to the reference currency's rate, then to 1.
    pub fn primary_rate(&self) -> ResolvedRate {
        if let Some(rate) = self.recorded(self.primary) {
            return ResolvedRate {
                currency: self.primary.clone(),
                rate,
                source: RateSource::Recorded,
            };
        }
        match self.recorded(self.reference) {
            Some(rate) => ResolvedRate {
                currency: self.primary.clone(),
                rate,
                source: RateSource::ReferenceFallback,
            },
            None => ResolvedRate {
                currency: self.primary.clone(),
                rate: Decimal::one(),
                source: RateSource::Unit,
            },
        }
    }

    /// Rate used for a currency with no recorded rate.
    pub fn fallback_rate(&self, currency: &CurrencyCode) -> ResolvedRate {
        let primary = self.primary_rate();
        let source = match primary.source {
            RateSource::Recorded => RateSource::PrimaryFallback,
            other => other,
        };
        ResolvedRate {
            currency: currency.clone(),
            rate: primary.rate,
            source,
        }
    }

    pub fn resolve(&self, currency: &CurrencyCode) -> ResolvedRate {
        if currency == self.primary {
            return self.primary_rate();
        }
        match self.recorded(currency) {
            Some(rate) => ResolvedRate {
                currency: currency.clone(),
                rate,
                source: RateSource::Recorded,
            },
            None => self.fallback_rate(currency),
        }
    }

    /// Resolve a rate and record a warning when a fallback was taken.
    pub(crate) fn resolve_noted(
        &self,
        currency: &CurrencyCode,
        diagnostics: &mut Diagnostics,
    ) -> Decimal {
        let resolved = self.resolve(currency);
        diagnostics.note_rate(&resolved);
        resolved.rate
    }

    /// Convert `amount` in `from` into the primary currency, normalizing
    /// through the reference currency.
    pub(crate) fn to_primary(
        &self,
        amount: Decimal,
        from: &CurrencyCode,
        diagnostics: &mut Diagnostics,
    ) -> Result<Decimal, OverflowError> {
        if from == self.primary {
            return Ok(amount);
        }
        let from_rate = self.resolve_noted(from, diagnostics);
        let reference_rate = self.resolve_noted(self.reference, diagnostics);
        let primary_rate = self.resolve_noted(self.primary, diagnostics);

        let in_reference = if from == self.reference {
            amount
        } else {
            div(mul(amount, from_rate, "conversion")?, reference_rate, "conversion")?
        };
        if self.primary == self.reference {
            Ok(in_reference)
        } else {
            div(mul(in_reference, reference_rate, "conversion")?, primary_rate, "conversion")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rates(entries: &[(&str, &str)]) -> BTreeMap<CurrencyCode, Decimal> {
        entries
            .iter()
            .map(|(c, r)| (CurrencyCode::new(c), d(r)))
            .collect()
    }

    #[test]
    fn test_resolve_recorded_rate() {
        let table = rates(&[("USD", "1000"), ("EUR", "1100")]);
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &usd, &usd);

        let resolved = resolver.resolve(&CurrencyCode::new("EUR"));
        assert_eq!(resolved.rate, d("1100"));
        assert_eq!(resolved.source, RateSource::Recorded);
        assert!(!resolved.is_fallback());
    }

    #[test]
    fn test_missing_rate_falls_back_to_primary() {
        let table = rates(&[("EUR", "1100"), ("USD", "1000")]);
        let eur = CurrencyCode::new("EUR");
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &eur, &usd);

        let resolved = resolver.resolve(&CurrencyCode::new("GBP"));
        assert_eq!(resolved.rate, d("1100"));
        assert_eq!(resolved.source, RateSource::PrimaryFallback);
    }

    #[test]
    fn test_zero_rate_is_treated_as_missing() {
        let table = rates(&[("USD", "1000"), ("EUR", "0")]);
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &usd, &usd);

        let resolved = resolver.resolve(&CurrencyCode::new("EUR"));
        assert_eq!(resolved.rate, d("1000"));
        assert!(resolved.is_fallback());
    }

    #[test]
    fn test_missing_primary_uses_reference_then_unit() {
        let table = rates(&[("USD", "950")]);
        let eur = CurrencyCode::new("EUR");
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &eur, &usd);
        let primary = resolver.primary_rate();
        assert_eq!(primary.rate, d("950"));
        assert_eq!(primary.source, RateSource::ReferenceFallback);

        let empty = BTreeMap::new();
        let resolver = CurrencyResolver::new(&empty, &eur, &usd);
        let primary = resolver.primary_rate();
        assert_eq!(primary.rate, Decimal::one());
        assert_eq!(primary.source, RateSource::Unit);
    }

    #[test]
    fn test_to_primary_normalizes_through_reference() {
        let table = rates(&[("USD", "1000"), ("EUR", "1100"), ("GBP", "1250")]);
        let eur = CurrencyCode::new("EUR");
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &eur, &usd);
        let mut diagnostics = Diagnostics::default();

        // 1100 GBP -> 1375 USD -> 1250 EUR
        let converted = resolver
            .to_primary(d("1100"), &CurrencyCode::new("GBP"), &mut diagnostics)
            .unwrap();
        assert_eq!(converted, d("1250"));
        assert!(diagnostics.into_warnings().is_empty());
    }

    #[test]
    fn test_to_primary_reports_overflow() {
        let table = rates(&[("USD", "1000"), ("EUR", "0.0001"), ("GBP", "1000000")]);
        let eur = CurrencyCode::new("EUR");
        let usd = CurrencyCode::new("USD");
        let resolver = CurrencyResolver::new(&table, &eur, &usd);
        let mut diagnostics = Diagnostics::default();

        let err = resolver
            .to_primary(
                d("10000000000000000000000"),
                &CurrencyCode::new("GBP"),
                &mut diagnostics,
            )
            .unwrap_err();
        assert_eq!(err.step, "conversion");
    }
}

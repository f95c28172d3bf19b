//! Static country reference data.

use rust_decimal::Decimal;

use crate::enums::RateOperation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Country {
    pub code: &'static str,
    pub name: &'static str,
    pub currency: &'static str,
    pub phone_prefix: &'static str,
}

pub const COUNTRIES: &[Country] = &[
    Country { code: "VE", name: "Venezuela", currency: "VES", phone_prefix: "+58" },
    Country { code: "CO", name: "Colombia", currency: "COP", phone_prefix: "+57" },
    Country { code: "PE", name: "Perú", currency: "PEN", phone_prefix: "+51" },
    Country { code: "EC", name: "Ecuador", currency: "USD", phone_prefix: "+593" },
    Country { code: "PA", name: "Panamá", currency: "USD", phone_prefix: "+507" },
    Country { code: "US", name: "Estados Unidos", currency: "USD", phone_prefix: "+1" },
];

pub fn find(code: &str) -> Option<&'static Country> {
    COUNTRIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Detect the country from an international phone number.
///
/// Longer prefixes win, so `+593…` is Ecuador rather than a shorter match.
pub fn from_phone(phone: &str) -> Option<&'static Country> {
    let phone = phone.trim();
    COUNTRIES.iter()
        .filter(|c| phone.starts_with(c.phone_prefix))
        .max_by_key(|c| c.phone_prefix.len())
}

/// Default route table used to seed an empty store.
pub fn default_rates() -> Vec<(&'static str, &'static str, Decimal, RateOperation)> {
    const TABLE: &[(&str, &str, i64, u32)] = &[
        ("VE", "CO", 8, 5),
        ("VE", "PE", 9, 5),
        ("VE", "EC", 27, 6),
        ("VE", "US", 27, 6),
        ("CO", "VE", 20, 0),
        ("CO", "PE", 85, 2),
        ("CO", "EC", 24, 5),
        ("CO", "US", 24, 5),
        ("PE", "VE", 11800, 0),
        ("PE", "CO", 118, 2),
        ("PE", "EC", 28, 5),
        ("PE", "US", 28, 5),
        ("EC", "VE", 37000, 0),
        ("EC", "CO", 4200, 0),
        ("EC", "PE", 357, 2),
        ("EC", "US", 1, 0),
        ("US", "VE", 37000, 0),
        ("US", "CO", 4200, 0),
        ("US", "PE", 357, 2),
        ("US", "EC", 1, 0),
    ];

    TABLE.iter()
        .map(|&(origin, destination, mantissa, scale)| {
            (origin, destination, Decimal::new(mantissa, scale), RateOperation::Multiply)
        })
        .collect()
}

/// Default payer-side methods per origin country.
pub fn default_origin_methods() -> Vec<(&'static str, &'static str)> {
    vec![
        ("VE", "Pago Móvil"),
        ("VE", "Transferencia Bancaria"),
        ("CO", "Nequi"),
        ("CO", "Bancolombia"),
        ("PE", "Yape"),
        ("PE", "BCP"),
        ("EC", "Transferencia Bancaria"),
        ("US", "Zelle")
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        assert_eq!(from_phone("+593991234567").map(|c| c.code), Some("EC"));
        assert_eq!(from_phone("+5072345678").map(|c| c.code), Some("PA"));
        assert_eq!(from_phone("+573000000000").map(|c| c.code), Some("CO"));
        assert_eq!(from_phone("+14155550100").map(|c| c.code), Some("US"));
        assert!(from_phone("+449999").is_none());
    }

    #[test]
    fn test_default_rates_keep_source_values() {
        let rates = default_rates();
        let ve_co = rates
            .iter()
            .find(|(o, d, _, _)| *o == "VE" && *d == "CO")
            .unwrap();
        assert_eq!(ve_co.2, Decimal::new(8, 5));
        assert_eq!(ve_co.2.to_string(), "0.00008");
        assert_eq!(rates.len(), 20);
    }
}

//! Proptest generators for property-based testing.

use proptest::prelude::*;

use postcheck_core::{AddressId, AddressRecord, Observation, Outcome, Postcode};

/// Generate a six-digit postcode.
pub fn postcode() -> impl Strategy<Value = Postcode> {
    "[0-9]{6}".prop_map(|s| Postcode::new(s).unwrap_or_else(|e| panic!("{e}")))
}

/// Generate an address id shaped like a directory GUID.
pub fn address_id() -> impl Strategy<Value = AddressId> {
    "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}"
        .prop_map(|s| AddressId::new(s).unwrap_or_else(|e| panic!("{e}")))
}

/// Generate an address string free of table delimiters.
pub fn address_text() -> impl Strategy<Value = String> {
    "[а-яА-Я0-9 ,.]{1,40}".prop_map(String::from)
}

/// Generate up to `max` addresses of `target`, with distinct ids.
pub fn address_set(target: Postcode, max: usize) -> impl Strategy<Value = Vec<AddressRecord>> {
    prop::collection::btree_map(address_id(), address_text(), 0..=max).prop_map(move |map| {
        map.into_iter()
            .map(|(id, address)| AddressRecord::new(id, address, target.clone()))
            .collect()
    })
}

/// Generate an oracle outcome: some postcode, or one of the two failures.
pub fn observation() -> impl Strategy<Value = Observation> {
    prop_oneof![
        3 => postcode().prop_map(Outcome::Found),
        1 => Just(Outcome::TransientError),
        1 => Just(Outcome::NoData),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_address_set_ids_unique(records in address_set(Postcode::new("101000").unwrap(), 20)) {
            let ids: std::collections::HashSet<_> = records.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(ids.len(), records.len());
            prop_assert!(records.len() <= 20);
        }

        #[test]
        fn test_postcodes_are_six_digits(p in postcode()) {
            prop_assert_eq!(p.as_str().len(), 6);
        }
    }
}

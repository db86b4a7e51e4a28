// Scheduling and inventory consistency
pub mod codes;
pub mod diary;
pub mod inventory_ledger;
pub mod scheduling;

// Stock documents
pub mod delivery_challans;
pub mod purchase_orders;

// Catalog and call log
pub mod calls;
pub mod products;
pub mod sites;

use serde::{Deserialize, Deserializer};

/// For clearable fields of update requests: a missing field stays `None`,
/// an explicit `null` becomes `Some(None)`. Pair with `#[serde(default)]`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Changes {
        #[serde(default, deserialize_with = "nullable")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn nullable_tells_absent_from_null() {
        let absent: Changes = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.notes, None);

        let cleared: Changes = serde_json::from_str(r#"{"notes":null}"#).unwrap();
        assert_eq!(cleared.notes, Some(None));

        let set: Changes = serde_json::from_str(r#"{"notes":"gate code 4411"}"#).unwrap();
        assert_eq!(set.notes, Some(Some("gate code 4411".to_string())));
    }
}

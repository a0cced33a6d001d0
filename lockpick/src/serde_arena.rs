//! Serde adapters for maps keyed by `Location`, which JSON can't use as
//! object keys. Both are written as flat lists.

pub mod tumblers {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::location::Location;
    use crate::tumbler::Tumbler;

    pub fn serialize<S>(value: &BTreeMap<Location, Tumbler>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(value.values())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<Location, Tumbler>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let tumblers = Vec::<Tumbler>::deserialize(deserializer)?;
        Ok(tumblers.into_iter().map(|t| (t.location(), t)).collect())
    }
}

pub mod bindings {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serializer};

    use crate::level::Binding;
    use crate::location::Location;

    pub fn serialize<S>(
        value: &BTreeMap<Location, BTreeMap<Location, i32>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(value.iter().flat_map(|(from, targets)| {
            targets.iter().map(|(to, difference)| Binding {
                from: *from,
                to: *to,
                difference: *difference,
            })
        }))
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<BTreeMap<Location, BTreeMap<Location, i32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut graph: BTreeMap<Location, BTreeMap<Location, i32>> = BTreeMap::new();
        for binding in Vec::<Binding>::deserialize(deserializer)? {
            graph
                .entry(binding.from)
                .or_default()
                .insert(binding.to, binding.difference);
        }
        Ok(graph)
    }
}

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Stable identifier of a building, usually minted by the data collaborator.
    BuildingId
);
string_id!(
    /// Identifier of a building sub-feature (a window).
    FeatureId
);
string_id!(
    /// Identifier of a transient analysis marker.
    MarkerId
);

#[cfg(test)]
mod tests {
    use super::BuildingId;

    #[test]
    fn ids_order_lexicographically() {
        let mut ids = vec![BuildingId::new("b"), BuildingId::new("a"), BuildingId::new("c")];
        ids.sort();
        let got: Vec<&str> = ids.iter().map(|i| i.as_str()).collect();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[test]
    fn displays_raw_id() {
        let id = BuildingId::new("mgm-grand-detroit");
        assert_eq!(id.to_string(), "mgm-grand-detroit");
        assert_eq!(BuildingId::from("x").as_str(), "x");
    }
}

//! Domain primitives: identifiers, CurrencyCode, GroupTag, ComputationStatus.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a fresh random identifier.
            pub fn new_v4() -> Self {
                $name(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map($name)
            }
        }
    };
}

uuid_id!(
    /// Identifier of an import consignment.
    ShipmentId
);
uuid_id!(
    /// Identifier of a line item within a shipment.
    LineItemId
);
uuid_id!(
    /// Identifier of an incidental expense.
    ExpenseId
);
uuid_id!(
    /// Identifier of a co-shipped supplier in a consolidated shipment.
    ParticipantId
);

/// ISO-style currency code (e.g., "USD", "EUR"), always upper-case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a CurrencyCode, normalizing case and surrounding whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        CurrencyCode(code.as_ref().trim().to_ascii_uppercase())
    }

    /// Get the code as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CurrencyCode {
    fn from(value: String) -> Self {
        CurrencyCode::new(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(value: CurrencyCode) -> Self {
        value.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group tag scoping incidental expenses to line items.
///
/// The empty tag is the general pool shared by every item.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct GroupTag(String);

impl GroupTag {
    pub fn new(tag: impl AsRef<str>) -> Self {
        GroupTag(tag.as_ref().trim().to_string())
    }

    /// The general (untagged) pool.
    pub fn general() -> Self {
        GroupTag(String::new())
    }

    pub fn is_general(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GroupTag {
    fn from(value: String) -> Self {
        GroupTag::new(value)
    }
}

impl From<GroupTag> for String {
    fn from(value: GroupTag) -> Self {
        value.0
    }
}

impl std::fmt::Display for GroupTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Computation status of a shipment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputationStatus {
    /// Inputs recorded, no computation committed yet.
    #[default]
    Draft,
    /// A computation run committed every derived field.
    Computed,
}

impl ComputationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComputationStatus::Draft => "draft",
            ComputationStatus::Computed => "computed",
        }
    }
}

impl FromStr for ComputationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ComputationStatus::Draft),
            "computed" => Ok(ComputationStatus::Computed),
            other => Err(format!("unknown computation status: {}", other)),
        }
    }
}

impl std::fmt::Display for ComputationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

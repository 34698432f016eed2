use crate::validation::ValidationError;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new instance without validation; callers are responsible for conformity.
            pub fn new(value: String) -> Self {
                Self(value)
            }

            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if !Regex::new($pattern).expect("invalid regex").is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

const OPAQUE_ID: &str = r"^[A-Za-z0-9_.:@-]{1,128}$";

newtype!(
    UserId,
    "Stable user identity key (uuid or legacy integer key).",
    OPAQUE_ID
);
newtype!(
    CertificationId,
    "Identifier of a purchasable certification.",
    OPAQUE_ID
);
newtype!(
    PurchaseId,
    "Locally generated purchase token, also used as the payment receipt.",
    OPAQUE_ID
);
newtype!(AttemptId, "Identifier of an exam attempt.", OPAQUE_ID);
newtype!(
    OrderRef,
    "Order reference issued by the external payment processor.",
    OPAQUE_ID
);
newtype!(
    PaymentRef,
    "Payment reference reported by the payment processor after checkout.",
    OPAQUE_ID
);
newtype!(Currency, "ISO 4217 currency code.", r"^[A-Z]{3}$");
newtype!(
    Timestamp,
    "UTC RFC3339 timestamp with `Z` suffix.",
    r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d{1,9})?Z$"
);

impl PurchaseId {
    /// Generates a fresh random purchase id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl AttemptId {
    /// Generates a fresh random attempt id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Numeric form of the id, present only for legacy serial attempt keys.
    pub fn as_serial(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl Timestamp {
    /// Current UTC time at second precision.
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self("INR".to_string())
    }
}

/// Case-normalized email address.
///
/// Parsing trims surrounding whitespace and lower-cases the address, so two
/// spellings of the same mailbox always compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Parses and normalizes an email address.
    pub fn parse(value: impl AsRef<str>) -> Result<Self, ValidationError> {
        let normalized = value.as_ref().trim().to_lowercase();
        let re = Regex::new(r"^[^\s@]+@[^\s@]+$").expect("invalid regex");
        if !re.is_match(&normalized) {
            return Err(ValidationError::PatternMismatch {
                field: "Email",
                value: value.as_ref().to_string(),
            });
        }
        Ok(Self(normalized))
    }

    /// Returns the normalized address.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `@`, used as a fallback display name.
    pub fn local_part(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Email::parse(value)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

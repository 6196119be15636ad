//! # Party Identifiers
//!
//! Validated newtypes for the identifiers that appear on a ZATCA invoice.
//!
//! ## Security Invariant
//!
//! A [`VatNumber`] can only be constructed through [`VatNumber::new`] (or
//! deserialization, which routes through it). Every VAT number reaching the
//! TLV encoder or the XML builder is therefore exactly 15 ASCII digits.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Saudi VAT registration number.
///
/// # Validation
///
/// - Must be exactly 15 characters
/// - Every character must be an ASCII digit
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VatNumber(String);

impl VatNumber {
    /// Number of digits in a VAT registration number.
    pub const LENGTH: usize = 15;

    /// Create a VAT number from a string value, validating the 15-digit format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidVatNumber`] if the string is not
    /// exactly 15 digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.len() != Self::LENGTH || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidVatNumber(s));
        }
        Ok(Self(s))
    }

    /// Access the VAT number string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for VatNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<VatNumber> for String {
    fn from(value: VatNumber) -> Self {
        value.0
    }
}

impl std::fmt::Display for VatNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scheme of a non-VAT party identifier (`schemeID` attribute in UBL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IdScheme {
    /// Commercial registration number.
    Crn,
    /// Ministry of Municipal and Rural Affairs license.
    Mom,
    /// Ministry of Labor and Social Development license.
    Mls,
    /// MISA license.
    Sag,
    /// National ID.
    Nat,
    /// GCC ID.
    Gcc,
    /// Iqama number.
    Iqa,
    /// Passport ID.
    Pas,
    /// Tax identification number.
    Tin,
    /// Any other identifier.
    Oth,
}

impl IdScheme {
    /// The scheme code as written in the `schemeID` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Crn => "CRN",
            Self::Mom => "MOM",
            Self::Mls => "MLS",
            Self::Sag => "SAG",
            Self::Nat => "NAT",
            Self::Gcc => "GCC",
            Self::Iqa => "IQA",
            Self::Pas => "PAS",
            Self::Tin => "TIN",
            Self::Oth => "OTH",
        }
    }
}

impl std::fmt::Display for IdScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheme-tagged identifier such as a commercial registration number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyIdentifier {
    /// Identifier scheme.
    pub scheme: IdScheme,
    /// Identifier value.
    pub value: String,
}

impl PartyIdentifier {
    /// Create an identifier, rejecting empty values.
    pub fn new(scheme: IdScheme, value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField(format!("{scheme} identifier")));
        }
        Ok(Self { scheme, value })
    }
}

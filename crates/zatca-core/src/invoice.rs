//! # Invoice Data Model
//!
//! The canonical invoice representation fed to the UBL builder, and the
//! draft form callers submit before totals and chain fields are known.
//!
//! ## Invariants
//!
//! - Line: `subtotal == round(quantity * unit_price)`,
//!   `vat_amount == round(subtotal * vat_rate / 100)`,
//!   `total == subtotal + vat_amount`.
//! - Document: `subtotal` is the sum of line subtotals, `vat_amount` is the
//!   sum of the per-rate VAT subtotals, `total == subtotal + vat_amount`.
//!
//! Figures that violate an invariant are rejected, never corrected.

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::amount::{add_amounts, ensure_non_negative, round_money, sum_amounts, vat_for};
use crate::chain::ChainLink;
use crate::error::ValidationError;
use crate::identity::{PartyIdentifier, VatNumber};

/// Currency used when a draft does not name one.
pub const DEFAULT_CURRENCY: &str = "SAR";

/// Unit of measure used when a line does not name one.
pub const DEFAULT_UNIT_CODE: &str = "PCE";

/// ZATCA invoice transaction type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    /// Tax invoice (B2B), cleared by the authority.
    Standard,
    /// Simplified tax invoice (B2C), reported after issue.
    Simplified,
}

impl InvoiceType {
    /// The subtype code carried in `InvoiceTypeCode/@name`.
    pub fn subtype_code(&self) -> &'static str {
        match self {
            Self::Standard => "0100000",
            Self::Simplified => "0200000",
        }
    }

    /// Upper-case name used in logs and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Simplified => "SIMPLIFIED",
        }
    }
}

impl std::fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of document, mapped to the UN/CEFACT 1001 type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    /// Tax invoice (388).
    #[default]
    Invoice,
    /// Credit note (381).
    CreditNote,
    /// Debit note (383).
    DebitNote,
}

impl DocumentKind {
    /// Text content of `InvoiceTypeCode`.
    pub fn type_code(&self) -> &'static str {
        match self {
            Self::Invoice => "388",
            Self::CreditNote => "381",
            Self::DebitNote => "383",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::CreditNote => "credit note",
            Self::DebitNote => "debit note",
        }
    }

    /// Whether the document must reference an earlier invoice.
    pub fn requires_billing_reference(&self) -> bool {
        !matches!(self, Self::Invoice)
    }
}

/// Payment means, mapped to the UN/ECE 4461 code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMeans {
    /// In cash (10).
    #[default]
    Cash,
    /// Credit (30).
    Credit,
    /// Bank transfer (42).
    BankTransfer,
    /// Bank card (48).
    BankCard,
}

impl PaymentMeans {
    /// Text content of `PaymentMeansCode`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cash => "10",
            Self::Credit => "30",
            Self::BankTransfer => "42",
            Self::BankCard => "48",
        }
    }
}

/// VAT category of a line or subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaxCategory {
    /// Standard rated (S).
    Standard,
    /// Zero rated (Z).
    Zero,
}

impl TaxCategory {
    /// Category for a VAT rate in percent.
    pub fn for_rate(rate: Decimal) -> Self {
        if rate.is_zero() {
            Self::Zero
        } else {
            Self::Standard
        }
    }

    /// UN/ECE 5305 category code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Standard => "S",
            Self::Zero => "Z",
        }
    }
}

/// Reference from a credit or debit note to the invoice it adjusts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingReference {
    /// Number of the original invoice.
    pub invoice_number: String,
    /// Reason for issuing the note.
    pub reason: String,
}

/// Postal address of a party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street name.
    pub street: String,
    /// Building number.
    pub building_number: String,
    /// District (city subdivision).
    pub district: String,
    /// City name.
    pub city: String,
    /// Postal code.
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
}

impl Address {
    /// Check required fields and the country code format.
    pub fn validate(&self, party: &str) -> Result<(), ValidationError> {
        for (name, value) in [
            ("street", &self.street),
            ("buildingNumber", &self.building_number),
            ("city", &self.city),
            ("postalCode", &self.postal_code),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::EmptyField(format!("{party}.address.{name}")));
            }
        }
        let cc = &self.country_code;
        if cc.len() != 2 || !cc.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidCountryCode(cc.clone()));
        }
        Ok(())
    }
}

/// Seller or buyer identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfo {
    /// Registered legal name.
    pub legal_name: String,
    /// VAT registration number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<VatNumber>,
    /// Other scheme-tagged identifier, e.g. a commercial registration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<PartyIdentifier>,
    /// Postal address.
    pub address: Address,
}

impl PartyInfo {
    fn validate(&self, party: &str) -> Result<(), ValidationError> {
        if self.legal_name.trim().is_empty() {
            return Err(ValidationError::EmptyField(format!("{party}.legalName")));
        }
        self.address.validate(party)
    }
}

/// One row of the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Item name.
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Invoiced quantity.
    pub quantity: Decimal,
    /// UN/ECE Rec 20 unit code.
    #[serde(default = "default_unit_code")]
    pub unit_code: String,
    /// Net price per unit.
    pub unit_price: Decimal,
    /// VAT rate in percent.
    pub vat_rate: Decimal,
    /// VAT on this line.
    pub vat_amount: Decimal,
    /// Net amount (`quantity * unit_price`).
    pub subtotal: Decimal,
    /// Gross amount (`subtotal + vat_amount`).
    pub total: Decimal,
}

fn default_unit_code() -> String {
    DEFAULT_UNIT_CODE.to_string()
}

impl LineItem {
    /// Build a line, deriving subtotal, VAT and total from the inputs.
    ///
    /// # Errors
    ///
    /// Rejects empty names, non-positive quantities, negative prices and
    /// VAT rates outside `0..=100`.
    pub fn new(
        name: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        vat_rate: Decimal,
    ) -> Result<Self, ValidationError> {
        let name = name.into();
        check_line_inputs(&name, quantity, unit_price, vat_rate)?;
        let subtotal = line_subtotal(&name, quantity, unit_price)?;
        let vat_amount = vat_for(subtotal, vat_rate, &format!("{name}.vatAmount"))?;
        let total = add_amounts(&format!("{name}.total"), subtotal, vat_amount)?;
        Ok(Self {
            name,
            description: None,
            quantity,
            unit_code: default_unit_code(),
            unit_price,
            vat_rate,
            vat_amount,
            subtotal,
            total,
        })
    }

    /// Attach a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Override the unit of measure.
    pub fn with_unit_code(mut self, unit_code: impl Into<String>) -> Self {
        self.unit_code = unit_code.into();
        self
    }

    /// Check the line invariants against the supplied figures.
    ///
    /// `position` is the 1-based line number used in error messages.
    pub fn validate(&self, position: usize) -> Result<(), ValidationError> {
        check_line_inputs(&self.name, self.quantity, self.unit_price, self.vat_rate)?;
        let prefix = format!("line[{position}]");
        for (field, value) in [
            ("vatAmount", self.vat_amount),
            ("subtotal", self.subtotal),
            ("total", self.total),
        ] {
            ensure_non_negative(&format!("{prefix}.{field}"), value)?;
        }

        let subtotal = line_subtotal(&self.name, self.quantity, self.unit_price)?;
        expect_equal(&format!("{prefix}.subtotal"), subtotal, self.subtotal)?;
        let vat = vat_for(self.subtotal, self.vat_rate, &format!("{prefix}.vatAmount"))?;
        expect_equal(&format!("{prefix}.vatAmount"), vat, self.vat_amount)?;
        let field = format!("{prefix}.total");
        let total = add_amounts(&field, self.subtotal, self.vat_amount)?;
        expect_equal(&field, total, self.total)
    }

    /// VAT category implied by the rate.
    pub fn tax_category(&self) -> TaxCategory {
        TaxCategory::for_rate(self.vat_rate)
    }
}

fn check_line_inputs(
    name: &str,
    quantity: Decimal,
    unit_price: Decimal,
    vat_rate: Decimal,
) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyField("line.name".into()));
    }
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveQuantity {
            line: name.to_string(),
            value: quantity.to_string(),
        });
    }
    ensure_non_negative(&format!("{name}.unitPrice"), unit_price)?;
    ensure_non_negative(&format!("{name}.vatRate"), vat_rate)?;
    if vat_rate > Decimal::ONE_HUNDRED {
        return Err(ValidationError::InvalidVatRate {
            field: format!("{name}.vatRate"),
            value: vat_rate.to_string(),
        });
    }
    Ok(())
}

fn line_subtotal(name: &str, quantity: Decimal, unit_price: Decimal) -> Result<Decimal, ValidationError> {
    quantity
        .checked_mul(unit_price)
        .map(round_money)
        .ok_or_else(|| ValidationError::Overflow(format!("{name}.subtotal")))
}

fn expect_equal(field: &str, expected: Decimal, actual: Decimal) -> Result<(), ValidationError> {
    if expected != actual {
        return Err(ValidationError::AmountMismatch {
            field: field.to_string(),
            expected: crate::amount::format_amount(expected),
            actual: actual.to_string(),
        });
    }
    Ok(())
}

/// VAT figures for one rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxSubtotal {
    /// VAT rate in percent.
    pub rate: Decimal,
    /// Sum of line subtotals at this rate.
    pub taxable_amount: Decimal,
    /// VAT due on `taxable_amount`.
    pub tax_amount: Decimal,
}

impl TaxSubtotal {
    /// VAT category implied by the rate.
    pub fn category(&self) -> TaxCategory {
        TaxCategory::for_rate(self.rate)
    }
}

/// Document totals derived from the line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTotals {
    /// Sum of line subtotals.
    pub subtotal: Decimal,
    /// Sum of per-rate VAT.
    pub vat_amount: Decimal,
    /// `subtotal + vat_amount`.
    pub total: Decimal,
    /// One entry per distinct VAT rate, ascending by rate.
    pub by_rate: Vec<TaxSubtotal>,
}

impl InvoiceTotals {
    /// Aggregate line items into document totals.
    pub fn from_lines(lines: &[LineItem]) -> Result<Self, ValidationError> {
        let mut groups: BTreeMap<Decimal, Decimal> = BTreeMap::new();
        for line in lines {
            let taxable = groups.entry(line.vat_rate.normalize()).or_insert(Decimal::ZERO);
            *taxable = add_amounts("taxableAmount", *taxable, line.subtotal)?;
        }

        let mut by_rate = Vec::with_capacity(groups.len());
        for (rate, taxable_amount) in groups {
            let tax_amount = vat_for(taxable_amount, rate, "vatAmount")?;
            by_rate.push(TaxSubtotal {
                rate,
                taxable_amount,
                tax_amount,
            });
        }

        let subtotal = sum_amounts("subtotal", lines.iter().map(|l| l.subtotal))?;
        let vat_amount = sum_amounts("vatAmount", by_rate.iter().map(|g| g.tax_amount))?;
        Ok(Self {
            subtotal,
            vat_amount,
            total: add_amounts("total", subtotal, vat_amount)?,
            by_rate,
        })
    }
}

/// The canonical invoice fed to the UBL builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDocument {
    /// Invoice number, unique per seller.
    pub invoice_number: String,
    /// Document UUID (correlation id).
    pub uuid: Uuid,
    /// Issue timestamp; split into `IssueDate` and `IssueTime`.
    pub issued_at: DateTime<Utc>,
    /// Payment due date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Standard or simplified.
    pub invoice_type: InvoiceType,
    /// Invoice, credit note or debit note.
    #[serde(default)]
    pub kind: DocumentKind,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Payment means.
    #[serde(default)]
    pub payment_means: PaymentMeans,
    /// Original invoice for credit and debit notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_reference: Option<BillingReference>,
    /// Net total.
    pub subtotal: Decimal,
    /// VAT total.
    pub vat_amount: Decimal,
    /// Gross total.
    pub total: Decimal,
    /// Lines in display order.
    pub line_items: Vec<LineItem>,
    /// Seller.
    pub seller: PartyInfo,
    /// Buyer; optional for simplified invoices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buyer: Option<PartyInfo>,
    /// Invoice counter value (ICV) in the seller's chain.
    pub invoice_counter_value: u64,
    /// Hash of the seller's previous invoice (PIH).
    pub previous_invoice_hash: String,
}

impl InvoiceDocument {
    /// Check every document and line invariant.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant. Nothing is corrected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.invoice_number.trim().is_empty() {
            return Err(ValidationError::EmptyField("invoiceNumber".into()));
        }
        validate_currency(&self.currency)?;

        self.seller.validate("seller")?;
        if self.seller.vat_number.is_none() {
            return Err(ValidationError::MissingSellerVat);
        }
        match (&self.invoice_type, &self.buyer) {
            (InvoiceType::Standard, Some(buyer)) if buyer.vat_number.is_some() => {
                buyer.validate("buyer")?
            }
            (InvoiceType::Standard, _) => return Err(ValidationError::MissingBuyerVat),
            (InvoiceType::Simplified, Some(buyer)) => buyer.validate("buyer")?,
            (InvoiceType::Simplified, None) => {}
        }

        if self.kind.requires_billing_reference() {
            match &self.billing_reference {
                Some(r) if !r.invoice_number.trim().is_empty() && !r.reason.trim().is_empty() => {}
                _ => return Err(ValidationError::MissingBillingReference(self.kind.label())),
            }
        }

        if self.invoice_counter_value == 0 {
            return Err(ValidationError::InvalidCounterValue(0));
        }
        if self.previous_invoice_hash.is_empty()
            || general_purpose::STANDARD
                .decode(&self.previous_invoice_hash)
                .is_err()
        {
            return Err(ValidationError::InvalidPreviousHash(
                self.previous_invoice_hash.clone(),
            ));
        }

        if self.line_items.is_empty() {
            return Err(ValidationError::NoLineItems);
        }
        for (i, line) in self.line_items.iter().enumerate() {
            line.validate(i + 1)?;
        }

        for (field, value) in [
            ("subtotal", self.subtotal),
            ("vatAmount", self.vat_amount),
            ("total", self.total),
        ] {
            ensure_non_negative(field, value)?;
        }
        let totals = InvoiceTotals::from_lines(&self.line_items)?;
        expect_equal("subtotal", totals.subtotal, self.subtotal)?;
        expect_equal("vatAmount", totals.vat_amount, self.vat_amount)?;
        let total = add_amounts("total", self.subtotal, self.vat_amount)?;
        expect_equal("total", total, self.total)
    }

    /// Totals derived from the line items.
    pub fn totals(&self) -> Result<InvoiceTotals, ValidationError> {
        InvoiceTotals::from_lines(&self.line_items)
    }

    /// The buyer party to emit, if any.
    ///
    /// Simplified invoices omit the customer party unless the buyer carries
    /// a VAT number.
    pub fn customer_party(&self) -> Option<&PartyInfo> {
        let buyer = self.buyer.as_ref()?;
        match self.invoice_type {
            InvoiceType::Standard => Some(buyer),
            InvoiceType::Simplified if buyer.vat_number.is_some() => Some(buyer),
            InvoiceType::Simplified => None,
        }
    }

    /// `IssueDate` text (`YYYY-MM-DD`).
    pub fn issue_date(&self) -> String {
        self.issued_at.format("%Y-%m-%d").to_string()
    }

    /// `IssueTime` text (`HH:MM:SS`).
    pub fn issue_time(&self) -> String {
        self.issued_at.format("%H:%M:%S").to_string()
    }

    /// Issue timestamp as carried in the QR payload (`YYYY-MM-DDTHH:MM:SSZ`).
    pub fn qr_timestamp(&self) -> String {
        self.issued_at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// The chain position this document was built for.
    pub fn chain_link(&self) -> ChainLink {
        ChainLink {
            invoice_counter_value: self.invoice_counter_value,
            previous_invoice_hash: self.previous_invoice_hash.clone(),
        }
    }
}

fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
        return Err(ValidationError::InvalidCurrency(code.to_string()));
    }
    Ok(())
}

/// A line as submitted by a caller, before figures are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineDraft {
    /// Item name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Quantity.
    pub quantity: Decimal,
    /// Unit of measure.
    #[serde(default)]
    pub unit_code: Option<String>,
    /// Net price per unit.
    pub unit_price: Decimal,
    /// VAT rate in percent.
    pub vat_rate: Decimal,
}

/// An invoice as submitted by a caller: no totals, no chain fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    /// Invoice number, unique per seller.
    pub invoice_number: String,
    /// Document UUID; generated when absent.
    #[serde(default)]
    pub uuid: Option<Uuid>,
    /// Issue timestamp.
    pub issued_at: DateTime<Utc>,
    /// Payment due date.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Standard or simplified.
    pub invoice_type: InvoiceType,
    /// Invoice, credit note or debit note.
    #[serde(default)]
    pub kind: DocumentKind,
    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Payment means.
    #[serde(default)]
    pub payment_means: PaymentMeans,
    /// Original invoice for credit and debit notes.
    #[serde(default)]
    pub billing_reference: Option<BillingReference>,
    /// Lines in display order.
    pub lines: Vec<LineDraft>,
    /// Seller.
    pub seller: PartyInfo,
    /// Buyer.
    #[serde(default)]
    pub buyer: Option<PartyInfo>,
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl InvoiceDraft {
    /// Derive line and document figures, attach the chain position, and
    /// validate the result.
    pub fn into_document(self, link: &ChainLink) -> Result<InvoiceDocument, ValidationError> {
        let mut line_items = Vec::with_capacity(self.lines.len());
        for draft in self.lines {
            let mut line = LineItem::new(draft.name, draft.quantity, draft.unit_price, draft.vat_rate)?;
            line.description = draft.description;
            if let Some(unit) = draft.unit_code {
                line.unit_code = unit;
            }
            line_items.push(line);
        }
        let totals = InvoiceTotals::from_lines(&line_items)?;

        let doc = InvoiceDocument {
            invoice_number: self.invoice_number,
            uuid: self.uuid.unwrap_or_else(Uuid::new_v4),
            issued_at: self.issued_at,
            due_date: self.due_date,
            invoice_type: self.invoice_type,
            kind: self.kind,
            currency: self.currency,
            payment_means: self.payment_means,
            billing_reference: self.billing_reference,
            subtotal: totals.subtotal,
            vat_amount: totals.vat_amount,
            total: totals.total,
            line_items,
            seller: self.seller,
            buyer: self.buyer,
            invoice_counter_value: link.invoice_counter_value,
            previous_invoice_hash: link.previous_invoice_hash.clone(),
        };
        doc.validate()?;
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::GENESIS_PREVIOUS_HASH;
    use crate::identity::IdScheme;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn address() -> Address {
        Address {
            street: "King Fahd Road".into(),
            building_number: "1234".into(),
            district: "Al Olaya".into(),
            city: "Riyadh".into(),
            postal_code: "12211".into(),
            country_code: "SA".into(),
        }
    }

    fn seller() -> PartyInfo {
        PartyInfo {
            legal_name: "Test Company Ltd".into(),
            vat_number: Some(VatNumber::new("310122393500003").unwrap()),
            identifier: Some(PartyIdentifier::new(IdScheme::Crn, "1010010000").unwrap()),
            address: address(),
        }
    }

    fn genesis() -> ChainLink {
        ChainLink {
            invoice_counter_value: 1,
            previous_invoice_hash: GENESIS_PREVIOUS_HASH.to_string(),
        }
    }

    fn draft() -> InvoiceDraft {
        InvoiceDraft {
            invoice_number: "INV-0001".into(),
            uuid: None,
            issued_at: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            due_date: None,
            invoice_type: InvoiceType::Simplified,
            kind: DocumentKind::Invoice,
            currency: "SAR".into(),
            payment_means: PaymentMeans::Cash,
            billing_reference: None,
            lines: vec![LineDraft {
                name: "Consulting".into(),
                description: None,
                quantity: d("2"),
                unit_code: None,
                unit_price: d("50"),
                vat_rate: d("15"),
            }],
            seller: seller(),
            buyer: None,
        }
    }

    #[test]
    fn line_item_new_derives_figures() {
        let line = LineItem::new("Widget", d("3"), d("33.33"), d("15")).unwrap();
        assert_eq!(line.subtotal, d("99.99"));
        assert_eq!(line.vat_amount, d("15.00"));
        assert_eq!(line.total, d("114.99"));
        assert_eq!(line.unit_code, "PCE");
        line.validate(1).unwrap();
    }

    #[test]
    fn line_item_rejects_wrong_subtotal() {
        let mut line = LineItem::new("Widget", d("2"), d("50"), d("15")).unwrap();
        line.subtotal = d("99.00");
        let err = line.validate(1).unwrap_err();
        assert!(matches!(err, ValidationError::AmountMismatch { ref field, .. } if field == "line[1].subtotal"));
    }

    #[test]
    fn line_item_rejects_wrong_total() {
        let mut line = LineItem::new("Widget", d("2"), d("50"), d("15")).unwrap();
        line.total = d("114.00");
        let err = line.validate(2).unwrap_err();
        assert!(matches!(err, ValidationError::AmountMismatch { ref field, .. } if field == "line[2].total"));
    }

    #[test]
    fn huge_line_reports_overflow() {
        let err = LineItem::new("x", d("1"), Decimal::MAX, d("0.01")).unwrap_err();
        assert_eq!(err, ValidationError::Overflow("x.total".into()));
    }

    #[test]
    fn totals_over_two_half_max_lines_report_overflow() {
        let half = Decimal::MAX / d("2") + Decimal::ONE;
        let lines = vec![
            LineItem::new("a", d("1"), half, d("0")).unwrap(),
            LineItem::new("b", d("1"), half, d("0")).unwrap(),
        ];
        let err = InvoiceTotals::from_lines(&lines).unwrap_err();
        assert_eq!(err, ValidationError::Overflow("taxableAmount".into()));

        let mut draft = draft();
        let line = draft.lines[0].clone();
        draft.lines = vec![
            LineDraft { quantity: d("1"), unit_price: half, vat_rate: d("0"), ..line.clone() },
            LineDraft { quantity: d("1"), unit_price: half, vat_rate: d("0"), ..line },
        ];
        assert!(matches!(
            draft.into_document(&genesis()),
            Err(ValidationError::Overflow(_))
        ));
    }

    #[test]
    fn line_item_rejects_zero_quantity_and_negative_price() {
        assert!(matches!(
            LineItem::new("Widget", d("0"), d("5"), d("15")),
            Err(ValidationError::NonPositiveQuantity { .. })
        ));
        assert!(matches!(
            LineItem::new("Widget", d("1"), d("-5"), d("15")),
            Err(ValidationError::NegativeAmount { .. })
        ));
        assert!(matches!(
            LineItem::new("Widget", d("1"), d("5"), d("101")),
            Err(ValidationError::InvalidVatRate { .. })
        ));
    }

    #[test]
    fn draft_converts_to_valid_document() {
        let doc = draft().into_document(&genesis()).unwrap();
        assert_eq!(doc.subtotal, d("100"));
        assert_eq!(doc.vat_amount, d("15.00"));
        assert_eq!(doc.total, d("115.00"));
        assert_eq!(doc.invoice_counter_value, 1);
        assert_eq!(doc.previous_invoice_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(doc.uuid.get_version_num(), 4);
    }

    #[test]
    fn document_rejects_total_of_114() {
        let mut doc = draft().into_document(&genesis()).unwrap();
        doc.total = d("114.00");
        let err = doc.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::AmountMismatch {
                field: "total".into(),
                expected: "115.00".into(),
                actual: "114.00".into(),
            }
        );
    }

    #[test]
    fn document_rejects_vat_not_matching_rate() {
        let mut doc = draft().into_document(&genesis()).unwrap();
        doc.vat_amount = d("14.00");
        doc.total = d("114.00");
        assert!(matches!(
            doc.validate(),
            Err(ValidationError::AmountMismatch { ref field, .. }) if field == "vatAmount"
        ));
    }

    #[test]
    fn standard_invoice_requires_buyer_vat() {
        let mut d = draft();
        d.invoice_type = InvoiceType::Standard;
        assert_eq!(
            d.clone().into_document(&genesis()).unwrap_err(),
            ValidationError::MissingBuyerVat
        );

        let mut buyer = seller();
        buyer.legal_name = "Buyer Co".into();
        buyer.vat_number = None;
        d.buyer = Some(buyer.clone());
        assert_eq!(
            d.clone().into_document(&genesis()).unwrap_err(),
            ValidationError::MissingBuyerVat
        );

        buyer.vat_number = Some(VatNumber::new("300000000000003").unwrap());
        d.buyer = Some(buyer);
        assert!(d.into_document(&genesis()).is_ok());
    }

    #[test]
    fn seller_vat_is_required() {
        let mut d = draft();
        d.seller.vat_number = None;
        assert_eq!(
            d.into_document(&genesis()).unwrap_err(),
            ValidationError::MissingSellerVat
        );
    }

    #[test]
    fn simplified_omits_customer_without_vat() {
        let mut d = draft();
        let mut buyer = seller();
        buyer.vat_number = None;
        d.buyer = Some(buyer.clone());
        let doc = d.clone().into_document(&genesis()).unwrap();
        assert!(doc.customer_party().is_none());

        buyer.vat_number = Some(VatNumber::new("300000000000003").unwrap());
        d.buyer = Some(buyer);
        let doc = d.into_document(&genesis()).unwrap();
        assert!(doc.customer_party().is_some());
    }

    #[test]
    fn credit_note_requires_billing_reference() {
        let mut d = draft();
        d.kind = DocumentKind::CreditNote;
        assert_eq!(
            d.clone().into_document(&genesis()).unwrap_err(),
            ValidationError::MissingBillingReference("credit note")
        );
        d.billing_reference = Some(BillingReference {
            invoice_number: "INV-0000".into(),
            reason: "Returned goods".into(),
        });
        assert!(d.into_document(&genesis()).is_ok());
    }

    #[test]
    fn chain_fields_are_checked() {
        let bad_counter = ChainLink {
            invoice_counter_value: 0,
            previous_invoice_hash: GENESIS_PREVIOUS_HASH.into(),
        };
        assert_eq!(
            draft().into_document(&bad_counter).unwrap_err(),
            ValidationError::InvalidCounterValue(0)
        );
        let bad_hash = ChainLink {
            invoice_counter_value: 1,
            previous_invoice_hash: "not base64!".into(),
        };
        assert!(matches!(
            draft().into_document(&bad_hash),
            Err(ValidationError::InvalidPreviousHash(_))
        ));
    }

    #[test]
    fn totals_group_by_rate() {
        let lines = vec![
            LineItem::new("A", d("1"), d("10"), d("15")).unwrap(),
            LineItem::new("B", d("1"), d("20"), d("0")).unwrap(),
            LineItem::new("C", d("1"), d("30"), d("15.00")).unwrap(),
        ];
        let totals = InvoiceTotals::from_lines(&lines).unwrap();
        assert_eq!(totals.by_rate.len(), 2);
        assert_eq!(totals.by_rate[0].rate, d("0"));
        assert_eq!(totals.by_rate[0].category(), TaxCategory::Zero);
        assert_eq!(totals.by_rate[1].taxable_amount, d("40"));
        assert_eq!(totals.by_rate[1].tax_amount, d("6.00"));
        assert_eq!(totals.total, d("66.00"));
    }

    #[test]
    fn timestamp_components() {
        let mut doc = draft().into_document(&genesis()).unwrap();
        doc.issued_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(doc.issue_date(), "2024-03-09");
        assert_eq!(doc.issue_time(), "14:05:07");
        assert_eq!(doc.qr_timestamp(), "2024-03-09T14:05:07Z");
    }

    #[test]
    fn draft_deserializes_from_camel_case_json() {
        let json = r#"{
            "invoiceNumber": "INV-7",
            "issuedAt": "2023-01-01T00:00:00Z",
            "invoiceType": "SIMPLIFIED",
            "lines": [{"name": "Tea", "quantity": "2", "unitPrice": "5.00", "vatRate": "15"}],
            "seller": {
                "legalName": "Test Company Ltd",
                "vatNumber": "310122393500003",
                "address": {"street": "S", "buildingNumber": "1", "district": "D",
                            "city": "Riyadh", "postalCode": "12211", "countryCode": "SA"}
            }
        }"#;
        let draft: InvoiceDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.currency, "SAR");
        let doc = draft.into_document(&genesis()).unwrap();
        assert_eq!(doc.total, d("11.50"));
    }

    proptest! {
        #[test]
        fn constructed_lines_satisfy_invariants(
            qty_milli in 1u32..1_000_000,
            price_cents in 0u32..10_000_000,
            rate in prop::sample::select(vec![0u32, 5, 15]),
        ) {
            let quantity = Decimal::new(qty_milli as i64, 3);
            let unit_price = Decimal::new(price_cents as i64, 2);
            let line = LineItem::new("Item", quantity, unit_price, Decimal::from(rate)).unwrap();
            prop_assert_eq!(line.subtotal, round_money(quantity * unit_price));
            prop_assert_eq!(line.total, line.subtotal + line.vat_amount);
            prop_assert!(line.validate(1).is_ok());
        }

        #[test]
        fn tampered_subtotals_are_rejected(
            qty in 1u32..1000,
            price_cents in 1u32..1_000_000,
            delta_cents in 1i64..10_000,
        ) {
            let mut line = LineItem::new(
                "Item",
                Decimal::from(qty),
                Decimal::new(price_cents as i64, 2),
                Decimal::from(15),
            ).unwrap();
            line.subtotal += Decimal::new(delta_cents, 2);
            prop_assert!(line.validate(1).is_err());
        }
    }
}

//! # Invoice XML Builder
//!
//! Renders a validated [`InvoiceDocument`] as a UBL 2.1 `Invoice`.
//!
//! ## Element Order
//!
//! ZATCA schema validation is order- and whitespace-sensitive, so the
//! top-level sequence is fixed:
//!
//! 1. `ext:UBLExtensions` (signature placeholder block)
//! 2. `UBLVersionID`, `ProfileID`, `ID`, `UUID`, `IssueDate`, `IssueTime`
//! 3. `InvoiceTypeCode` with the subtype in `@name`
//! 4. `DocumentCurrencyCode`, `TaxCurrencyCode`
//! 5. `BillingReference` (credit and debit notes only)
//! 6. `AdditionalDocumentReference` for ICV, PIH, KSA-2 and QR
//! 7. `Signature`, `AccountingSupplierParty`, `AccountingCustomerParty`
//! 8. `Delivery`, `PaymentMeans`, `AllowanceCharge`
//! 9. `TaxTotal` (summary), `TaxTotal` (per-rate subtotals)
//! 10. `LegalMonetaryTotal`, then one `InvoiceLine` per line item
//!
//! Amounts carry 2 decimals and quantities 6.
//!
//! ## Security Invariant
//!
//! The builder is a pure function of the document. The UUID, timestamp,
//! ICV and PIH all come from the input, so identical input yields
//! byte-identical output and the invoice hash is reproducible.

use rust_decimal::Decimal;
use zatca_core::amount::{format_amount, format_percent, format_quantity};
use zatca_core::{
    generate_zatca_qr_code, InvoiceDocument, InvoiceTotals, LineItem, PartyInfo, QrParams,
    TaxCategory, ZatcaError,
};

use crate::signature::UNSIGNED_EXTENSIONS;
use crate::writer::XmlWriter;

/// UBL version emitted in `UBLVersionID`.
pub const UBL_VERSION: &str = "2.1";

/// Business process profile emitted in `ProfileID`.
pub const PROFILE_ID: &str = "reporting:1.0";

const NS_INVOICE: &str = "urn:oasis:names:specification:ubl:schema:xsd:Invoice-2";
const NS_CAC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonAggregateComponents-2";
const NS_CBC: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonBasicComponents-2";
const NS_EXT: &str = "urn:oasis:names:specification:ubl:schema:xsd:CommonExtensionComponents-2";

const SIGNATURE_ID: &str = "urn:oasis:names:specification:ubl:signature:Invoice";
const SIGNATURE_METHOD: &str = "urn:oasis:names:specification:ubl:dsig:enveloped:xades";

/// Build the canonical UBL XML for `doc`.
///
/// # Errors
///
/// - [`ZatcaError::Validation`] if the document violates any invariant.
/// - [`ZatcaError::Encoding`] if the embedded QR payload cannot be encoded.
///
/// No partial document is ever returned.
pub fn build_invoice_xml(doc: &InvoiceDocument) -> Result<String, ZatcaError> {
    doc.validate()?;
    let totals = doc.totals()?;
    let qr = generate_zatca_qr_code(&QrParams::from_document(doc))?;

    let mut w = XmlWriter::new();
    w.open(
        "Invoice",
        &[
            ("xmlns", NS_INVOICE),
            ("xmlns:cac", NS_CAC),
            ("xmlns:cbc", NS_CBC),
            ("xmlns:ext", NS_EXT),
        ],
    );
    w.raw_block(UNSIGNED_EXTENSIONS);

    write_header(&mut w, doc);
    write_document_references(&mut w, doc, &qr);
    write_signature_reference(&mut w);

    w.open("cac:AccountingSupplierParty", &[]);
    write_party(&mut w, &doc.seller);
    w.close("cac:AccountingSupplierParty");
    if let Some(buyer) = doc.customer_party() {
        w.open("cac:AccountingCustomerParty", &[]);
        write_party(&mut w, buyer);
        w.close("cac:AccountingCustomerParty");
    }

    write_delivery_and_payment(&mut w, doc);
    write_allowance_charge(&mut w, doc, &totals);
    write_tax_totals(&mut w, doc, &totals);
    write_monetary_total(&mut w, doc);
    for (i, line) in doc.line_items.iter().enumerate() {
        write_line(&mut w, &doc.currency, i + 1, line);
    }

    w.close("Invoice");
    tracing::debug!(
        invoice_number = %doc.invoice_number,
        counter = doc.invoice_counter_value,
        lines = doc.line_items.len(),
        "invoice XML built"
    );
    Ok(w.finish())
}

fn write_header(w: &mut XmlWriter, doc: &InvoiceDocument) {
    w.leaf("cbc:UBLVersionID", &[], UBL_VERSION);
    w.leaf("cbc:ProfileID", &[], PROFILE_ID);
    w.leaf("cbc:ID", &[], &doc.invoice_number);
    w.leaf("cbc:UUID", &[], &doc.uuid.hyphenated().to_string());
    w.leaf("cbc:IssueDate", &[], &doc.issue_date());
    w.leaf("cbc:IssueTime", &[], &doc.issue_time());
    w.leaf(
        "cbc:InvoiceTypeCode",
        &[("name", doc.invoice_type.subtype_code())],
        doc.kind.type_code(),
    );
    w.leaf("cbc:DocumentCurrencyCode", &[], &doc.currency);
    w.leaf("cbc:TaxCurrencyCode", &[], &doc.currency);

    if let Some(reference) = &doc.billing_reference {
        w.open("cac:BillingReference", &[]);
        w.open("cac:InvoiceDocumentReference", &[]);
        w.leaf("cbc:ID", &[], &reference.invoice_number);
        w.close("cac:InvoiceDocumentReference");
        w.close("cac:BillingReference");
    }
}

fn write_document_references(w: &mut XmlWriter, doc: &InvoiceDocument, qr: &str) {
    w.open("cac:AdditionalDocumentReference", &[]);
    w.leaf("cbc:ID", &[], "ICV");
    w.leaf("cbc:UUID", &[], &doc.invoice_counter_value.to_string());
    w.close("cac:AdditionalDocumentReference");

    write_embedded_reference(w, "PIH", &doc.previous_invoice_hash);

    w.open("cac:AdditionalDocumentReference", &[]);
    w.leaf("cbc:ID", &[], "KSA-2");
    w.leaf("cbc:DocumentTypeCode", &[], doc.invoice_type.subtype_code());
    w.close("cac:AdditionalDocumentReference");

    write_embedded_reference(w, "QR", qr);
}

fn write_embedded_reference(w: &mut XmlWriter, id: &str, payload: &str) {
    w.open("cac:AdditionalDocumentReference", &[]);
    w.leaf("cbc:ID", &[], id);
    w.open("cac:Attachment", &[]);
    w.leaf(
        "cbc:EmbeddedDocumentBinaryObject",
        &[("mimeCode", "text/plain")],
        payload,
    );
    w.close("cac:Attachment");
    w.close("cac:AdditionalDocumentReference");
}

fn write_signature_reference(w: &mut XmlWriter) {
    w.open("cac:Signature", &[]);
    w.leaf("cbc:ID", &[], SIGNATURE_ID);
    w.leaf("cbc:SignatureMethod", &[], SIGNATURE_METHOD);
    w.close("cac:Signature");
}

fn write_party(w: &mut XmlWriter, party: &PartyInfo) {
    w.open("cac:Party", &[]);
    if let Some(id) = &party.identifier {
        w.open("cac:PartyIdentification", &[]);
        w.leaf("cbc:ID", &[("schemeID", id.scheme.as_str())], &id.value);
        w.close("cac:PartyIdentification");
    }

    let address = &party.address;
    w.open("cac:PostalAddress", &[]);
    w.leaf("cbc:StreetName", &[], &address.street);
    w.leaf("cbc:BuildingNumber", &[], &address.building_number);
    if !address.district.trim().is_empty() {
        w.leaf("cbc:CitySubdivisionName", &[], &address.district);
    }
    w.leaf("cbc:CityName", &[], &address.city);
    w.leaf("cbc:PostalZone", &[], &address.postal_code);
    w.open("cac:Country", &[]);
    w.leaf("cbc:IdentificationCode", &[], &address.country_code);
    w.close("cac:Country");
    w.close("cac:PostalAddress");

    if let Some(vat) = &party.vat_number {
        w.open("cac:PartyTaxScheme", &[]);
        w.leaf("cbc:CompanyID", &[], vat.as_str());
        write_vat_scheme(w, false);
        w.close("cac:PartyTaxScheme");
    }

    w.open("cac:PartyLegalEntity", &[]);
    w.leaf("cbc:RegistrationName", &[], &party.legal_name);
    w.close("cac:PartyLegalEntity");
    w.close("cac:Party");
}

fn write_delivery_and_payment(w: &mut XmlWriter, doc: &InvoiceDocument) {
    w.open("cac:Delivery", &[]);
    w.leaf("cbc:ActualDeliveryDate", &[], &doc.issue_date());
    w.close("cac:Delivery");

    w.open("cac:PaymentMeans", &[]);
    w.leaf("cbc:PaymentMeansCode", &[], doc.payment_means.code());
    if let Some(due) = doc.due_date {
        w.leaf("cbc:PaymentDueDate", &[], &due.format("%Y-%m-%d").to_string());
    }
    if let Some(reference) = &doc.billing_reference {
        w.leaf("cbc:InstructionNote", &[], &reference.reason);
    }
    w.close("cac:PaymentMeans");
}

fn write_allowance_charge(w: &mut XmlWriter, doc: &InvoiceDocument, totals: &InvoiceTotals) {
    // Document-level discounts are not modelled; ZATCA still expects the element.
    let rate = totals
        .by_rate
        .last()
        .map(|g| g.rate)
        .unwrap_or(Decimal::ZERO);
    w.open("cac:AllowanceCharge", &[]);
    w.leaf("cbc:ChargeIndicator", &[], "false");
    w.leaf("cbc:AllowanceChargeReason", &[], "discount");
    w.leaf(
        "cbc:Amount",
        &[("currencyID", doc.currency.as_str())],
        &format_amount(Decimal::ZERO),
    );
    write_tax_category(w, "cac:TaxCategory", TaxCategory::for_rate(rate), rate, true);
    w.close("cac:AllowanceCharge");
}

fn write_tax_totals(w: &mut XmlWriter, doc: &InvoiceDocument, totals: &InvoiceTotals) {
    let currency = [("currencyID", doc.currency.as_str())];
    let vat = format_amount(doc.vat_amount);

    w.open("cac:TaxTotal", &[]);
    w.leaf("cbc:TaxAmount", &currency, &vat);
    w.close("cac:TaxTotal");

    w.open("cac:TaxTotal", &[]);
    w.leaf("cbc:TaxAmount", &currency, &vat);
    for group in &totals.by_rate {
        w.open("cac:TaxSubtotal", &[]);
        w.leaf(
            "cbc:TaxableAmount",
            &currency,
            &format_amount(group.taxable_amount),
        );
        w.leaf("cbc:TaxAmount", &currency, &format_amount(group.tax_amount));
        write_tax_category(w, "cac:TaxCategory", group.category(), group.rate, true);
        w.close("cac:TaxSubtotal");
    }
    w.close("cac:TaxTotal");
}

fn write_monetary_total(w: &mut XmlWriter, doc: &InvoiceDocument) {
    let currency = [("currencyID", doc.currency.as_str())];
    let zero = format_amount(Decimal::ZERO);
    w.open("cac:LegalMonetaryTotal", &[]);
    w.leaf("cbc:LineExtensionAmount", &currency, &format_amount(doc.subtotal));
    w.leaf("cbc:TaxExclusiveAmount", &currency, &format_amount(doc.subtotal));
    w.leaf("cbc:TaxInclusiveAmount", &currency, &format_amount(doc.total));
    w.leaf("cbc:AllowanceTotalAmount", &currency, &zero);
    w.leaf("cbc:PrepaidAmount", &currency, &zero);
    w.leaf("cbc:PayableAmount", &currency, &format_amount(doc.total));
    w.close("cac:LegalMonetaryTotal");
}

fn write_line(w: &mut XmlWriter, currency: &str, position: usize, line: &LineItem) {
    let currency = [("currencyID", currency)];
    w.open("cac:InvoiceLine", &[]);
    w.leaf("cbc:ID", &[], &position.to_string());
    w.leaf(
        "cbc:InvoicedQuantity",
        &[("unitCode", line.unit_code.as_str())],
        &format_quantity(line.quantity),
    );
    w.leaf("cbc:LineExtensionAmount", &currency, &format_amount(line.subtotal));

    w.open("cac:TaxTotal", &[]);
    w.leaf("cbc:TaxAmount", &currency, &format_amount(line.vat_amount));
    w.leaf("cbc:RoundingAmount", &currency, &format_amount(line.total));
    w.close("cac:TaxTotal");

    w.open("cac:Item", &[]);
    if let Some(description) = &line.description {
        w.leaf("cbc:Description", &[], description);
    }
    w.leaf("cbc:Name", &[], &line.name);
    write_tax_category(
        w,
        "cac:ClassifiedTaxCategory",
        line.tax_category(),
        line.vat_rate,
        false,
    );
    w.close("cac:Item");

    w.open("cac:Price", &[]);
    w.leaf("cbc:PriceAmount", &currency, &format_amount(line.unit_price));
    w.close("cac:Price");
    w.close("cac:InvoiceLine");
}

fn write_tax_category(
    w: &mut XmlWriter,
    element: &str,
    category: TaxCategory,
    rate: Decimal,
    with_scheme: bool,
) {
    w.open(element, &[]);
    if with_scheme {
        w.leaf(
            "cbc:ID",
            &[("schemeID", "UN/ECE 5305"), ("schemeAgencyID", "6")],
            category.code(),
        );
    } else {
        w.leaf("cbc:ID", &[], category.code());
    }
    w.leaf("cbc:Percent", &[], &format_percent(rate));
    write_vat_scheme(w, with_scheme);
    w.close(element);
}

fn write_vat_scheme(w: &mut XmlWriter, with_scheme: bool) {
    w.open("cac:TaxScheme", &[]);
    if with_scheme {
        w.leaf(
            "cbc:ID",
            &[("schemeID", "UN/ECE 5153"), ("schemeAgencyID", "6")],
            "VAT",
        );
    } else {
        w.leaf("cbc:ID", &[], "VAT");
    }
    w.close("cac:TaxScheme");
}

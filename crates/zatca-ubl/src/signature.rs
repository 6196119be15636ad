//! # Signature Placeholder Block
//!
//! The `ext:UBLExtensions` block of an unsigned invoice. It carries the
//! XAdES enveloped-signature skeleton with literal placeholder tokens that
//! the external signing stage replaces. Nothing in this crate signs.

/// Digest of the invoice body.
pub const PLACEHOLDER_DIGEST_VALUE: &str = "[PLACEHOLDER_DIGEST_VALUE]";
/// Digest of the XAdES signed properties.
pub const PLACEHOLDER_SIGNED_PROPERTIES_DIGEST: &str = "[PLACEHOLDER_SIGNED_PROPERTIES_DIGEST]";
/// ECDSA signature value.
pub const PLACEHOLDER_SIGNATURE_VALUE: &str = "[PLACEHOLDER_SIGNATURE_VALUE]";
/// Base64 X.509 signing certificate.
pub const PLACEHOLDER_CERTIFICATE: &str = "[PLACEHOLDER_CERTIFICATE]";
/// Signing timestamp.
pub const PLACEHOLDER_SIGNING_TIME: &str = "[PLACEHOLDER_SIGNING_TIME]";
/// Digest of the signing certificate.
pub const PLACEHOLDER_CERTIFICATE_DIGEST: &str = "[PLACEHOLDER_CERTIFICATE_DIGEST]";
/// Certificate issuer distinguished name.
pub const PLACEHOLDER_ISSUER_NAME: &str = "[PLACEHOLDER_ISSUER_NAME]";
/// Certificate serial number.
pub const PLACEHOLDER_SERIAL_NUMBER: &str = "[PLACEHOLDER_SERIAL_NUMBER]";

/// Every placeholder token in the block.
pub const PLACEHOLDERS: [&str; 8] = [
    PLACEHOLDER_DIGEST_VALUE,
    PLACEHOLDER_SIGNED_PROPERTIES_DIGEST,
    PLACEHOLDER_SIGNATURE_VALUE,
    PLACEHOLDER_CERTIFICATE,
    PLACEHOLDER_SIGNING_TIME,
    PLACEHOLDER_CERTIFICATE_DIGEST,
    PLACEHOLDER_ISSUER_NAME,
    PLACEHOLDER_SERIAL_NUMBER,
];

/// Whether `xml` still carries any unsigned placeholder token.
pub fn has_placeholders(xml: &str) -> bool {
    PLACEHOLDERS.iter().any(|p| xml.contains(p))
}

/// The unsigned extension block, indented relative to its own root.
pub(crate) const UNSIGNED_EXTENSIONS: &str = r##"<ext:UBLExtensions>
    <ext:UBLExtension>
        <ext:ExtensionURI>urn:oasis:names:specification:ubl:dsig:enveloped:xades</ext:ExtensionURI>
        <ext:ExtensionContent>
            <sig:UBLDocumentSignatures xmlns:sig="urn:oasis:names:specification:ubl:schema:xsd:CommonSignatureComponents-2" xmlns:sac="urn:oasis:names:specification:ubl:schema:xsd:SignatureAggregateComponents-2" xmlns:sbc="urn:oasis:names:specification:ubl:schema:xsd:SignatureBasicComponents-2">
                <sac:SignatureInformation>
                    <cbc:ID>urn:oasis:names:specification:ubl:signature:1</cbc:ID>
                    <sbc:ReferencedSignatureID>urn:oasis:names:specification:ubl:signature:Invoice</sbc:ReferencedSignatureID>
                    <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" Id="signature">
                        <ds:SignedInfo>
                            <ds:CanonicalizationMethod Algorithm="http://www.w3.org/2006/12/xml-c14n11"/>
                            <ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256"/>
                            <ds:Reference Id="invoiceSignedData" URI="">
                                <ds:Transforms>
                                    <ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xpath-19991116">
                                        <ds:XPath>not(//ancestor-or-self::ext:UBLExtensions)</ds:XPath>
                                    </ds:Transform>
                                    <ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xpath-19991116">
                                        <ds:XPath>not(//ancestor-or-self::cac:Signature)</ds:XPath>
                                    </ds:Transform>
                                    <ds:Transform Algorithm="http://www.w3.org/TR/1999/REC-xpath-19991116">
                                        <ds:XPath>not(//ancestor-or-self::cac:AdditionalDocumentReference[cbc:ID='QR'])</ds:XPath>
                                    </ds:Transform>
                                    <ds:Transform Algorithm="http://www.w3.org/2006/12/xml-c14n11"/>
                                </ds:Transforms>
                                <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
                                <ds:DigestValue>[PLACEHOLDER_DIGEST_VALUE]</ds:DigestValue>
                            </ds:Reference>
                            <ds:Reference Type="http://www.w3.org/2000/09/xmldsig#SignatureProperties" URI="#xadesSignedProperties">
                                <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
                                <ds:DigestValue>[PLACEHOLDER_SIGNED_PROPERTIES_DIGEST]</ds:DigestValue>
                            </ds:Reference>
                        </ds:SignedInfo>
                        <ds:SignatureValue>[PLACEHOLDER_SIGNATURE_VALUE]</ds:SignatureValue>
                        <ds:KeyInfo>
                            <ds:X509Data>
                                <ds:X509Certificate>[PLACEHOLDER_CERTIFICATE]</ds:X509Certificate>
                            </ds:X509Data>
                        </ds:KeyInfo>
                        <ds:Object>
                            <xades:QualifyingProperties xmlns:xades="http://uri.etsi.org/01903/v1.3.2#" Target="signature">
                                <xades:SignedProperties Id="xadesSignedProperties">
                                    <xades:SignedSignatureProperties>
                                        <xades:SigningTime>[PLACEHOLDER_SIGNING_TIME]</xades:SigningTime>
                                        <xades:SigningCertificate>
                                            <xades:Cert>
                                                <xades:CertDigest>
                                                    <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
                                                    <ds:DigestValue>[PLACEHOLDER_CERTIFICATE_DIGEST]</ds:DigestValue>
                                                </xades:CertDigest>
                                                <xades:IssuerSerial>
                                                    <ds:X509IssuerName>[PLACEHOLDER_ISSUER_NAME]</ds:X509IssuerName>
                                                    <ds:X509SerialNumber>[PLACEHOLDER_SERIAL_NUMBER]</ds:X509SerialNumber>
                                                </xades:IssuerSerial>
                                            </xades:Cert>
                                        </xades:SigningCertificate>
                                    </xades:SignedSignatureProperties>
                                </xades:SignedProperties>
                            </xades:QualifyingProperties>
                        </ds:Object>
                    </ds:Signature>
                </sac:SignatureInformation>
            </sig:UBLDocumentSignatures>
        </ext:ExtensionContent>
    </ext:UBLExtension>
</ext:UBLExtensions>"##;

//! KHQR payment payload encoding.
//!
//! Builds the EMVCo merchant-presented TLV string that Bakong-compatible
//! banking apps scan, terminated by a CRC-16 field computed over everything
//! before it (including the `6304` prefix of the checksum field itself).

use bigdecimal::{BigDecimal, RoundingMode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub mod crc;
pub mod tlv;

use crc::crc16_hex;
use tlv::{format_tlv, Field, MAX_VALUE_LEN};

const PAYLOAD_FORMAT_INDICATOR: &str = "01";
const POINT_OF_INITIATION_DYNAMIC: &str = "12";
const BAKONG_DOMAIN: &str = "bakong.com.kh";
const MERCHANT_CATEGORY_GENERAL: &str = "5999";
const COUNTRY_CODE: &str = "KH";
const MERCHANT_CITY: &str = "Phnom Penh";
const CRC_PREFIX: &str = "6304";

/// EMVCo caps the transaction amount field at 13 characters.
pub const MAX_AMOUNT_LEN: usize = 13;

/// Room left for the merchant id once the nested domain field is accounted for.
pub const MAX_MERCHANT_ID_LEN: usize = MAX_VALUE_LEN - (4 + BAKONG_DOMAIN.len()) - 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KhqrError {
    #[error("amount must be a finite number, got {0}")]
    NonFiniteAmount(String),
    #[error("amount must not be negative, got {0}")]
    NegativeAmount(String),
    #[error("amount {0} does not fit in {} characters", MAX_AMOUNT_LEN)]
    AmountTooLarge(String),
    #[error("merchant name must not be empty")]
    EmptyMerchantName,
    #[error("merchant name is {0} bytes, limit is {}", MAX_VALUE_LEN)]
    MerchantNameTooLong(usize),
    #[error("merchant id must not be empty")]
    EmptyMerchantId,
    #[error("merchant id is {0} bytes, limit is {}", MAX_MERCHANT_ID_LEN)]
    MerchantIdTooLong(usize),
    #[error("unsupported currency: {0}")]
    UnknownCurrency(String),
    #[error("payload truncated at byte {offset}")]
    Truncated { offset: usize },
    #[error("invalid length {found:?} at byte {offset}")]
    BadLength { offset: usize, found: String },
    #[error("payload has no checksum field")]
    MissingChecksum,
    #[error("checksum mismatch: payload carries {found}, computed {expected}")]
    ChecksumMismatch { expected: String, found: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Khr,
}

impl Currency {
    /// ISO 4217 numeric code carried in tag 53.
    pub fn numeric_code(&self) -> &'static str {
        match self {
            Currency::Usd => "840",
            Currency::Khr => "116",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Khr => "KHR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = KhqrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "KHR" => Ok(Currency::Khr),
            _ => Err(KhqrError::UnknownCurrency(s.to_string())),
        }
    }
}

/// A validated request for one payment payload.
///
/// Construction is the only place input is checked; once built, [`encode`]
/// always yields a well-formed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingRequest {
    merchant_identifier: String,
    merchant_name: String,
    amount: BigDecimal,
    currency: Currency,
}

impl EncodingRequest {
    pub fn new(
        merchant_identifier: impl Into<String>,
        merchant_name: impl Into<String>,
        amount: BigDecimal,
        currency: Currency,
    ) -> Result<Self, KhqrError> {
        let merchant_identifier = merchant_identifier.into();
        let merchant_name = merchant_name.into();

        if merchant_identifier.is_empty() {
            return Err(KhqrError::EmptyMerchantId);
        }
        if merchant_identifier.len() > MAX_MERCHANT_ID_LEN {
            return Err(KhqrError::MerchantIdTooLong(merchant_identifier.len()));
        }
        if merchant_name.is_empty() {
            return Err(KhqrError::EmptyMerchantName);
        }
        if merchant_name.len() > MAX_VALUE_LEN {
            return Err(KhqrError::MerchantNameTooLong(merchant_name.len()));
        }
        if amount < BigDecimal::from(0) {
            return Err(KhqrError::NegativeAmount(amount.to_string()));
        }

        let amount = amount.with_scale_round(2, RoundingMode::HalfUp);
        let rendered = render_cents(&amount);
        if rendered.len() > MAX_AMOUNT_LEN {
            return Err(KhqrError::AmountTooLarge(rendered));
        }

        Ok(Self {
            merchant_identifier,
            merchant_name,
            amount,
            currency,
        })
    }

    /// Convenience for callers holding a float total, such as a cart sum.
    pub fn from_f64(
        merchant_identifier: impl Into<String>,
        merchant_name: impl Into<String>,
        amount: f64,
        currency: Currency,
    ) -> Result<Self, KhqrError> {
        if !amount.is_finite() {
            return Err(KhqrError::NonFiniteAmount(amount.to_string()));
        }
        let amount = BigDecimal::from_str(&amount.to_string())
            .map_err(|_| KhqrError::NonFiniteAmount(amount.to_string()))?;
        Self::new(merchant_identifier, merchant_name, amount, currency)
    }

    pub fn merchant_identifier(&self) -> &str {
        &self.merchant_identifier
    }

    pub fn merchant_name(&self) -> &str {
        &self.merchant_name
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Amount with exactly two fractional digits and no separators.
    pub fn formatted_amount(&self) -> String {
        render_cents(&self.amount)
    }
}

/// Render a non-negative amount the way tag 54 carries it: `digits.dd`, half-up.
pub fn format_amount(amount: &BigDecimal) -> String {
    render_cents(&amount.with_scale_round(2, RoundingMode::HalfUp))
}

// Plain `digits.dd` rendering of a non-negative value already at scale 2.
fn render_cents(amount: &BigDecimal) -> String {
    let (digits, _) = amount.as_bigint_and_exponent();
    let digits = format!("{:0>3}", digits.to_string());
    let (whole, cents) = digits.split_at(digits.len() - 2);
    format!("{}.{}", whole, cents)
}

/// Assemble the payload for a validated request.
pub fn encode(request: &EncodingRequest) -> String {
    let merchant_account = format_tlv("00", BAKONG_DOMAIN)
        + &format_tlv("01", &request.merchant_identifier);

    let mut qr = String::with_capacity(128);
    qr.push_str(&format_tlv("00", PAYLOAD_FORMAT_INDICATOR));
    qr.push_str(&format_tlv("01", POINT_OF_INITIATION_DYNAMIC));
    qr.push_str(&format_tlv("29", &merchant_account));
    qr.push_str(&format_tlv("52", MERCHANT_CATEGORY_GENERAL));
    qr.push_str(&format_tlv("53", request.currency.numeric_code()));
    qr.push_str(&format_tlv("54", &request.formatted_amount()));
    qr.push_str(&format_tlv("58", COUNTRY_CODE));
    qr.push_str(&format_tlv("59", &request.merchant_name));
    qr.push_str(&format_tlv("60", MERCHANT_CITY));
    qr.push_str(CRC_PREFIX);

    let crc = crc16_hex(&qr);
    qr.push_str(&crc);
    qr
}

/// Validate and encode in one step.
pub fn generate(
    merchant_identifier: &str,
    merchant_name: &str,
    amount: BigDecimal,
    currency: Currency,
) -> Result<String, KhqrError> {
    let request = EncodingRequest::new(merchant_identifier, merchant_name, amount, currency)?;
    Ok(encode(&request))
}

/// Check the trailing checksum and return the decoded fields, checksum included.
pub fn verify(payload: &str) -> Result<Vec<Field>, KhqrError> {
    if payload.len() < CRC_PREFIX.len() + 4 {
        return Err(KhqrError::MissingChecksum);
    }
    let split = payload.len() - 4;
    let (body, found) = match (payload.get(..split), payload.get(split..)) {
        (Some(body), Some(found)) => (body, found),
        _ => return Err(KhqrError::MissingChecksum),
    };
    if !body.ends_with(CRC_PREFIX) {
        return Err(KhqrError::MissingChecksum);
    }

    let expected = crc16_hex(body);
    if expected != found {
        return Err(KhqrError::ChecksumMismatch {
            expected,
            found: found.to_string(),
        });
    }

    tlv::decode(payload)
}

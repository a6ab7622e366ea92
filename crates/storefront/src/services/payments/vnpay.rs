//! VNPay redirect signing and return verification.
//!
//! Parameters are sorted by key (ordinal), empty values are dropped, keys
//! and values are form-encoded and joined with `&`. The HMAC-SHA512 of that
//! string, in lowercase hex, is sent as `vnp_SecureHash`.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sha2::Sha512;

use super::PaymentError;
use crate::config::VnpayConfig;

const VERSION: &str = "2.1.0";
const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Response code VNPay uses for a successful payment.
pub const SUCCESS_CODE: &str = "00";

/// Prefix of the payment reference stored on VNPay orders.
pub const REFERENCE_PREFIX: &str = "VNP-";

/// Vietnam has no daylight saving; VNPay timestamps are always UTC+7.
const VIETNAM_OFFSET_SECS: i32 = 7 * 60 * 60;

/// Payment reference for a VNPay transaction number.
#[must_use]
pub fn payment_reference(transaction_no: &str) -> String {
    format!("{REFERENCE_PREFIX}{transaction_no}")
}

/// One payment to redirect the customer to.
#[derive(Debug, Clone)]
pub struct PaymentRequest<'a> {
    /// Order total in dong.
    pub amount: Decimal,
    pub order_info: &'a str,
    /// Merchant-side reference, unique per attempt.
    pub txn_ref: &'a str,
    pub ip_addr: &'a str,
    pub return_url: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Fields read from a verified return request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReturn {
    pub response_code: String,
    pub transaction_no: Option<String>,
    pub txn_ref: Option<String>,
    pub bank_code: Option<String>,
    /// `vnp_Amount` as sent: dong times 100.
    pub amount: Option<String>,
}

impl PaymentReturn {
    /// Whether VNPay reports the payment as successful.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_code == SUCCESS_CODE
    }

    /// Customer-facing explanation of the response code.
    #[must_use]
    pub fn message(&self) -> &'static str {
        response_message(&self.response_code)
    }

    /// Whether VNPay charged exactly `total` dong.
    #[must_use]
    pub fn charged(&self, total: Decimal) -> bool {
        self.amount
            .as_deref()
            .and_then(|a| a.parse::<Decimal>().ok())
            .is_some_and(|a| a == gateway_amount(total))
    }
}

/// `vnp_Amount` for a dong total.
fn gateway_amount(total: Decimal) -> Decimal {
    (total * Decimal::ONE_HUNDRED).trunc()
}

/// Build the signed payment page URL.
///
/// # Errors
///
/// Returns `PaymentError::InvalidAmount` for a non-positive amount.
pub fn payment_url(config: &VnpayConfig, request: &PaymentRequest<'_>) -> Result<String, PaymentError> {
    if request.amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidAmount);
    }

    // Amount is sent in hundredths of a dong.
    let amount = gateway_amount(request.amount);

    let mut params = BTreeMap::new();
    params.insert("vnp_Version", VERSION.to_string());
    params.insert("vnp_Command", "pay".to_string());
    params.insert("vnp_TmnCode", config.tmn_code.clone());
    params.insert("vnp_Amount", amount.to_string());
    params.insert("vnp_CreateDate", format_create_date(request.created_at));
    params.insert("vnp_CurrCode", "VND".to_string());
    params.insert("vnp_IpAddr", request.ip_addr.to_string());
    params.insert("vnp_Locale", "vn".to_string());
    params.insert("vnp_OrderInfo", request.order_info.to_string());
    params.insert("vnp_OrderType", "other".to_string());
    params.insert("vnp_ReturnUrl", request.return_url.to_string());
    params.insert("vnp_TxnRef", request.txn_ref.to_string());

    let query = sign_data(params.iter().map(|(k, v)| (*k, v.as_str())));
    let hash = hmac_sha512(config.hash_secret.expose_secret(), &query);

    Ok(format!("{}?{query}&{SECURE_HASH}={hash}", config.payment_url))
}

/// Verify a return request's signature and read its outcome.
///
/// Only `vnp_` parameters are signed; the hash fields themselves are
/// excluded. The hash comparison ignores case.
///
/// # Errors
///
/// Returns `PaymentError::InvalidSignature` if the hash is missing or does
/// not match, and `PaymentError::Api` if the response code is missing.
pub fn verify_return(
    config: &VnpayConfig,
    params: &BTreeMap<String, String>,
) -> Result<PaymentReturn, PaymentError> {
    let received = params
        .get(SECURE_HASH)
        .ok_or(PaymentError::InvalidSignature)?;

    let signed = params
        .iter()
        .filter(|(k, _)| k.starts_with("vnp_") && *k != SECURE_HASH && *k != SECURE_HASH_TYPE)
        .map(|(k, v)| (k.as_str(), v.as_str()));
    let expected = hmac_sha512(config.hash_secret.expose_secret(), &sign_data(signed));

    if !constant_time_compare(&expected, &received.to_ascii_lowercase()) {
        return Err(PaymentError::InvalidSignature);
    }

    let field = |key: &str| params.get(key).filter(|v| !v.is_empty()).cloned();
    let response_code = field("vnp_ResponseCode").ok_or_else(|| PaymentError::Api {
        gateway: "VNPay",
        message: "return is missing vnp_ResponseCode".to_string(),
    })?;

    Ok(PaymentReturn {
        response_code,
        transaction_no: field("vnp_TransactionNo"),
        txn_ref: field("vnp_TxnRef"),
        bank_code: field("vnp_BankCode"),
        amount: field("vnp_Amount"),
    })
}

/// Customer-facing message for a VNPay response code.
#[must_use]
pub fn response_message(code: &str) -> &'static str {
    match code {
        "00" => "Payment successful",
        "07" => "Transaction flagged as suspected fraud",
        "09" => "Card or account is not registered for internet banking",
        "10" => "Card or account verification failed more than 3 times",
        "11" => "Payment window expired",
        "12" => "Card or account is locked",
        "13" => "Incorrect transaction authentication password",
        "24" => "Payment cancelled by customer",
        "51" => "Insufficient account balance",
        "65" => "Account exceeded its daily transaction limit",
        "75" => "Paying bank is under maintenance",
        "79" => "Too many incorrect payment password attempts",
        _ => "Payment failed. Please try again.",
    }
}

/// Sorted, encoded `key=value&...` string over non-empty values.
///
/// Callers pass parameters already in key order (`BTreeMap` iteration).
fn sign_data<'a>(params: impl Iterator<Item = (&'a str, &'a str)>) -> String {
    params
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_encode(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

fn hmac_sha512(key: &str, data: &str) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let Ok(mut mac) = Hmac::<Sha512>::new_from_slice(key.as_bytes()) else {
        return String::new();
    };
    mac.update(data.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn format_create_date(at: DateTime<Utc>) -> String {
    FixedOffset::east_opt(VIETNAM_OFFSET_SECS)
        .map_or_else(
            || at.format("%Y%m%d%H%M%S").to_string(),
            |offset| at.with_timezone(&offset).format("%Y%m%d%H%M%S").to_string(),
        )
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

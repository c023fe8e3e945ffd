//! Voucher identity types
//!
//! A voucher is identified by its type and number, `(voucherType, voucherNo)`,
//! within the store of its financial year. The voucher type also decides which
//! of the two ledgers (receipts or payments) the record lives in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// One of the two voucher ledgers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ledger {
    /// Money in
    Receipt,
    /// Money out
    Payment,
}

impl Ledger {
    /// The ledger a counter voucher for this ledger is written into
    pub fn opposite(&self) -> Self {
        match self {
            Ledger::Receipt => Ledger::Payment,
            Ledger::Payment => Ledger::Receipt,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ledger::Receipt => "receipt",
            Ledger::Payment => "payment",
        }
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ledger {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receipt" | "receipts" => Ok(Ledger::Receipt),
            "payment" | "payments" => Ok(Ledger::Payment),
            other => Err(CoreError::validation(format!("Unknown ledger: {}", other))),
        }
    }
}

/// Voucher type discriminator
///
/// `CE_RV` is the counter entry booked in the payment ledger for a receipt
/// voucher and `CE_PV` the counter entry booked in the receipt ledger for a
/// payment voucher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoucherType {
    #[serde(rename = "RV")]
    Rv,
    #[serde(rename = "PV")]
    Pv,
    #[serde(rename = "CE_RV")]
    CeRv,
    #[serde(rename = "CE_PV")]
    CePv,
}

impl VoucherType {
    pub const ALL: [VoucherType; 4] = [
        VoucherType::Rv,
        VoucherType::Pv,
        VoucherType::CeRv,
        VoucherType::CePv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VoucherType::Rv => "RV",
            VoucherType::Pv => "PV",
            VoucherType::CeRv => "CE_RV",
            VoucherType::CePv => "CE_PV",
        }
    }

    /// The ledger that stores vouchers of this type
    pub fn ledger(&self) -> Ledger {
        match self {
            VoucherType::Rv | VoucherType::CePv => Ledger::Receipt,
            VoucherType::Pv | VoucherType::CeRv => Ledger::Payment,
        }
    }

    /// Returns true for generated counter entries
    pub fn is_counter_entry(&self) -> bool {
        matches!(self, VoucherType::CeRv | VoucherType::CePv)
    }

    /// Type of the counter voucher mirroring a voucher of this type
    ///
    /// Counter entries are never mirrored again.
    pub fn counter_type(&self) -> Option<VoucherType> {
        match self {
            VoucherType::Rv => Some(VoucherType::CeRv),
            VoucherType::Pv => Some(VoucherType::CePv),
            VoucherType::CeRv | VoucherType::CePv => None,
        }
    }
}

impl fmt::Display for VoucherType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoucherType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoucherType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| CoreError::UnknownVoucherType(s.to_string()))
    }
}

/// Voucher number, assigned monotonically per voucher type by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoucherNo(i64);

impl VoucherNo {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The number following this one
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for VoucherNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VoucherNo {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<VoucherNo> for i64 {
    fn from(no: VoucherNo) -> i64 {
        no.0
    }
}

/// Identity of a voucher within one financial year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherKey {
    pub voucher_type: VoucherType,
    pub voucher_no: VoucherNo,
}

impl VoucherKey {
    pub fn new(voucher_type: VoucherType, voucher_no: impl Into<VoucherNo>) -> Self {
        Self {
            voucher_type,
            voucher_no: voucher_no.into(),
        }
    }

    pub fn ledger(&self) -> Ledger {
        self.voucher_type.ledger()
    }

    /// Key of the counter voucher mirroring this voucher, if the type mirrors
    pub fn counter_key(&self) -> Option<VoucherKey> {
        self.voucher_type
            .counter_type()
            .map(|t| VoucherKey::new(t, self.voucher_no))
    }
}

impl fmt::Display for VoucherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.voucher_type, self.voucher_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voucher_type_ledgers() {
        assert_eq!(VoucherType::Rv.ledger(), Ledger::Receipt);
        assert_eq!(VoucherType::CePv.ledger(), Ledger::Receipt);
        assert_eq!(VoucherType::Pv.ledger(), Ledger::Payment);
        assert_eq!(VoucherType::CeRv.ledger(), Ledger::Payment);
    }

    #[test]
    fn test_counter_type_lands_in_opposite_ledger() {
        for t in [VoucherType::Rv, VoucherType::Pv] {
            let counter = t.counter_type().unwrap();
            assert!(counter.is_counter_entry());
            assert_eq!(counter.ledger(), t.ledger().opposite());
        }
        assert_eq!(VoucherType::CeRv.counter_type(), None);
    }

    #[test]
    fn test_voucher_type_parsing() {
        assert_eq!("CE_RV".parse::<VoucherType>().unwrap(), VoucherType::CeRv);
        assert!(matches!(
            "JV".parse::<VoucherType>(),
            Err(CoreError::UnknownVoucherType(_))
        ));
    }

    #[test]
    fn test_voucher_key_display() {
        let key = VoucherKey::new(VoucherType::Pv, 7);
        assert_eq!(key.to_string(), "PV/7");
        assert_eq!(key.counter_key(), Some(VoucherKey::new(VoucherType::CePv, 7)));
    }
}

//! Core data types shared by the calculators and the ledger stores

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::AnalyticsError;

/// Ticker symbol using Arc<str> for cheap cloning
///
/// Symbols are cloned into every accumulator, holding and price map key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of a stock transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "Buy",
            Side::Sell => "Sell",
        }
    }
}

impl FromStr for Side {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Side::Buy),
            "sell" => Ok(Side::Sell),
            other => Err(AnalyticsError::InvalidTransaction(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

/// A single buy or sell of a stock. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub symbol: Symbol,
    pub side: Side,
    pub shares: Money,
    pub price: Money,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        symbol: Symbol,
        side: Side,
        shares: Money,
        price: Money,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            symbol,
            side,
            shares,
            price,
            timestamp,
        }
    }

    pub fn buy(symbol: &str, shares: Money, price: Money, timestamp: DateTime<Utc>) -> Self {
        Self::new(Symbol::new(symbol), Side::Buy, shares, price, timestamp)
    }

    pub fn sell(symbol: &str, shares: Money, price: Money, timestamp: DateTime<Utc>) -> Self {
        Self::new(Symbol::new(symbol), Side::Sell, shares, price, timestamp)
    }

    /// Execution value of the trade: shares x price
    pub fn notional(&self) -> Money {
        self.shares * self.price
    }

    /// Shares and price must both be strictly positive, and their product
    /// must fit in a decimal
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.shares.is_positive() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "{} {}: shares must be > 0, got {}",
                self.side.as_str(),
                self.symbol,
                self.shares
            )));
        }
        if !self.price.is_positive() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "{} {}: price must be > 0, got {}",
                self.side.as_str(),
                self.symbol,
                self.price
            )));
        }
        if self.shares.checked_mul(self.price).is_none() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "{} {}: notional of {} x {} is out of range",
                self.side.as_str(),
                self.symbol,
                self.shares,
                self.price
            )));
        }
        Ok(())
    }
}

/// Direction of a cash movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CashKind {
    Deposit,
    Withdrawal,
}

impl CashKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashKind::Deposit => "Deposit",
            CashKind::Withdrawal => "Withdrawal",
        }
    }
}

impl FromStr for CashKind {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deposit" => Ok(CashKind::Deposit),
            "withdrawal" => Ok(CashKind::Withdrawal),
            other => Err(AnalyticsError::InvalidTransaction(format!(
                "unknown cash transaction type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub amount: Money,
    pub kind: CashKind,
    pub timestamp: DateTime<Utc>,
}

impl CashTransaction {
    pub fn new(amount: Money, kind: CashKind, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: None,
            amount,
            kind,
            timestamp,
        }
    }

    /// Amount with the sign of its effect on the cash balance
    pub fn signed_amount(&self) -> Money {
        match self.kind {
            CashKind::Deposit => self.amount,
            CashKind::Withdrawal => -self.amount,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.amount.is_positive() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "{}: amount must be > 0, got {}",
                self.kind.as_str(),
                self.amount
            )));
        }
        Ok(())
    }
}

/// Latest known quote for a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub symbol: Symbol,
    pub display_name: String,
    pub current_price: Money,
}

impl PriceSnapshot {
    pub fn new(symbol: &str, display_name: impl Into<String>, current_price: Money) -> Self {
        Self {
            symbol: Symbol::new(symbol),
            display_name: display_name.into(),
            current_price,
        }
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !self.current_price.is_positive() {
            return Err(AnalyticsError::InvalidTransaction(format!(
                "price for {} must be > 0, got {}",
                self.symbol, self.current_price
            )));
        }
        Ok(())
    }
}

/// Current price snapshots keyed by symbol
pub type PriceMap = HashMap<Symbol, PriceSnapshot>;

/// Build a [`PriceMap`] from snapshots; a later snapshot for the same symbol wins
pub fn price_map(snapshots: impl IntoIterator<Item = PriceSnapshot>) -> PriceMap {
    snapshots
        .into_iter()
        .map(|snapshot| (snapshot.symbol.clone(), snapshot))
        .collect()
}

// ============================================================================
// Money Type - Precise Decimal Arithmetic for Monetary Values
// ============================================================================

/// Decimal wrapper for prices, share counts, cost basis and cash.
///
/// Weighted-average cost accounting divides running cost by running shares
/// on every sell, so binary floating point would drift the basis away from
/// the ledger. Division by zero yields zero, which is the neutral value every
/// ratio in this crate falls back to. Arithmetic saturates at the decimal
/// bounds instead of panicking; ingestion rejects trades whose notional
/// would not fit, see [`Money::checked_mul`].
///
/// # Example
/// ```
/// use portfolio_analytics::Money;
/// let cost = Money::from_i64(2200);
/// let shares = Money::from_i64(20);
/// assert_eq!((cost / shares).to_f64(), 110.0);
/// ```
#[derive(Debug, Clone, Copy, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::str")] Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Money(value)
    }

    /// Convert to f64 for ratio and statistics calculations
    pub fn to_f64(self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.0.to_f64().unwrap_or(0.0)
    }

    pub fn from_i64(value: i64) -> Self {
        Money(Decimal::from(value))
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn round_dp(self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    pub fn inner(self) -> Decimal {
        self.0
    }

    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        self.0.checked_mul(rhs.0).map(Money)
    }

    /// Bound matching the sign of an overflowed result
    fn saturated(negative: bool) -> Self {
        if negative {
            Money(Decimal::MIN)
        } else {
            Money(Decimal::MAX)
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Money)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Money::from_i64(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Money {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Money {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl std::hash::Hash for Money {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_sub(rhs.0);
    }
}

impl Mul for Money {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self::Output {
        Money(self.0.saturating_mul(rhs.0))
    }
}

impl Div for Money {
    type Output = Self;
    fn div(self, rhs: Self) -> Self::Output {
        if rhs.0.is_zero() {
            return Money::ZERO;
        }
        match self.0.checked_div(rhs.0) {
            Some(value) => Money(value),
            None => Money::saturated(self.0.is_sign_negative() != rhs.0.is_sign_negative()),
        }
    }
}

impl Neg for Money {
    type Output = Self;
    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

impl<'a> std::iter::Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Money::ZERO, |acc, x| acc + *x)
    }
}

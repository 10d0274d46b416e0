use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A monetary value stored as a signed number of cents.
/// It is using internally an i64 in order to avoid floating point rounding
/// error. The i64 (8 bytes) has a smaller memory footprint than
/// BigNumber/Decimal crates. Precision is two places past the decimal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Amount {
    cents: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount parsing error: {0}")]
    Parse(String),

    #[error("Overflow error while creating Amount")]
    Overflow,

    #[error("Underflow error while creating Amount")]
    Underflow,
}

impl Amount {
    pub const ZERO: Amount = Amount { cents: 0 };

    pub const fn from_cents(cents: i64) -> Self {
        Amount { cents }
    }

    pub const fn cents(&self) -> i64 {
        self.cents
    }

    pub fn is_positive(&self) -> bool {
        self.cents > 0
    }

    pub fn add(&self, other: &Amount) -> Result<Amount, AmountError> {
        match self.cents.checked_add(other.cents) {
            Some(total) => Ok(Amount { cents: total }),
            None => Err(AmountError::Overflow)?,
        }
    }

    pub fn sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        match self.cents.checked_sub(other.cents) {
            Some(total) => Ok(Amount { cents: total }),
            None => Err(AmountError::Underflow)?,
        }
    }

    pub fn negated(&self) -> Result<Amount, AmountError> {
        match self.cents.checked_neg() {
            Some(cents) => Ok(Amount { cents }),
            None => Err(AmountError::Overflow)?,
        }
    }
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(AmountError::Parse(s.into()))?
        }

        let mut parts = s.split('.');
        let left_part = parts.next().unwrap(); // Ok to unwrap as the first part always exists
        let decimal_part = parts.next();

        // Checking for extra '.'
        if parts.next().is_some() {
            Err(AmountError::Parse(s.into()))?
        }

        // Checking if integer part is empty (ex: ".05")
        let left_str = if left_part.is_empty() { "0" } else { left_part };

        let total: i64 = match decimal_part {
            None => {
                // No decimal part - try to convert and multiply by 100
                let parsed = left_str.parse::<i64>();
                match parsed {
                    Ok(v) => match v.checked_mul(100) {
                        Some(val) => val,
                        None => Err(AmountError::Overflow)?, // Overflow when multiplying
                    },
                    Err(_) => Err(AmountError::Parse(s.into()))?,
                }
            }
            Some(dec_str) => {
                let mut dec_str = dec_str.to_owned();
                if dec_str.is_empty() {
                    dec_str = String::from("00");
                }
                if !dec_str.chars().all(|c| c.is_ascii_digit()) {
                    Err(AmountError::Parse(s.into()))?
                }

                // Ensure 2 digits for the decimal part
                if dec_str.len() > 2 {
                    dec_str.truncate(2);
                } else if dec_str.len() < 2 {
                    dec_str.push('0');
                }

                let combined_str = format!("{}{}", left_str, dec_str);
                let total = combined_str.parse::<i64>();

                match total {
                    Ok(v) => v,
                    Err(_) => Err(AmountError::Parse(s.into()))?,
                }
            }
        };

        Ok(Self { cents: total })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let negative = self.cents < 0;
        let abs_val = self.cents.unsigned_abs();

        let left_part = abs_val / 100;
        let decimal_part = abs_val % 100;

        if negative {
            write!(f, "-{}.{:02}", left_part, decimal_part)
        } else {
            write!(f, "{}.{:02}", left_part, decimal_part)
        }
    }
}

// Persisted record fields hold amounts as decimal text, so serde goes
// through Display/FromStr rather than the raw cent count.
impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::{Amount, AmountError};
    use std::str::FromStr;

    #[test]
    fn test_that_valid_string_can_be_parsed() {
        let amount = Amount::from_str("0");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 0);

        let amount = Amount::from_str("0.");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 0);

        let amount = Amount::from_str(".0");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 0);

        let amount = Amount::from_str("5");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 500);

        let amount = Amount::from_str("5.1");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 510);

        let amount = Amount::from_str("5.1234");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 512);

        let amount = Amount::from_str(".05");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 5);

        let amount = Amount::from_str("-.05");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, -5);

        let amount = Amount::from_str("05.05");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, 505);

        let amount = Amount::from_str("-12345.1234567");
        assert!(amount.is_ok());
        assert_eq!(amount.unwrap().cents, -1234512);
    }

    #[test]
    fn test_that_invalid_string_parsing_returns_error() {
        let amount = Amount::from_str("test");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        let amount = Amount::from_str("123.12test");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        let amount = Amount::from_str("12test.123");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        let amount = Amount::from_str("1 .1 2");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        let amount = Amount::from_str("");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        let amount = Amount::from_str("1.2.3");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        // Overflow testing
        let amount = Amount::from_str("9223372036854775808");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Parse(_)));

        // Max i64, will be * 100
        let amount = Amount::from_str("9223372036854775807");
        assert!(amount.is_err());
        assert!(matches!(amount.err().unwrap(), AmountError::Overflow));
    }

    #[test]
    fn test_that_amount_can_be_added() {
        let amount = Amount::from_str("200.12").unwrap();
        let amount_2 = Amount::from_str("100.02").unwrap();

        let sum = amount.add(&amount_2);
        assert!(sum.is_ok());
        assert_eq!(sum.unwrap().to_string(), "300.14");

        let amount = Amount::from_str("-200.12").unwrap();
        let sum = amount.add(&amount_2);
        assert!(sum.is_ok());
        assert_eq!(sum.unwrap().to_string(), "-100.10");
    }

    #[test]
    fn test_that_amount_can_be_substracted() {
        let amount = Amount::from_str("200.12").unwrap();
        let amount_2 = Amount::from_str("100.02").unwrap();

        let diff = amount.sub(&amount_2);
        assert!(diff.is_ok());
        assert_eq!(diff.unwrap().to_string(), "100.10");

        let amount = Amount::from_str("-200.12").unwrap();
        let diff = amount.sub(&amount_2);
        assert!(diff.is_ok());
        assert_eq!(diff.unwrap().to_string(), "-300.14");
    }

    #[test]
    fn test_that_overflow_returns_error() {
        let amount = Amount::from_cents(i64::MAX);
        let one = Amount::from_str("0.01").unwrap();

        let sum = amount.add(&one);
        assert!(sum.is_err());
        assert!(matches!(sum.err().unwrap(), AmountError::Overflow));
    }

    #[test]
    fn test_that_underflow_returns_error() {
        let amount = Amount::from_cents(i64::MIN);
        let one = Amount::from_str("0.01").unwrap();

        let diff = amount.sub(&one);
        assert!(diff.is_err());
        assert!(matches!(diff.err().unwrap(), AmountError::Underflow));
    }

    #[test]
    fn test_that_display_keeps_two_decimal_places() {
        assert_eq!(Amount::from_cents(0).to_string(), "0.00");
        assert_eq!(Amount::from_cents(10000).to_string(), "100.00");
        assert_eq!(Amount::from_cents(-7).to_string(), "-0.07");
        assert_eq!(Amount::from_cents(123456).to_string(), "1234.56");
    }

    #[test]
    fn test_that_negated_flips_the_sign() {
        let amount = Amount::from_str("12.50").unwrap();
        assert_eq!(amount.negated().unwrap().to_string(), "-12.50");
        assert_eq!(amount.negated().unwrap().negated().unwrap(), amount);
    }
}

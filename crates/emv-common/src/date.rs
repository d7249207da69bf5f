//! BCD coded dates found in certificates and CA key tables

use std::fmt;

/// Month granularity expiry date; valid through the last day of the month
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Expiry {
    year: u16,
    month: u8,
}

fn bcd(byte: u8) -> Option<u8> {
    let (hi, lo) = (byte >> 4, byte & 0x0F);
    (hi <= 9 && lo <= 9).then_some(hi * 10 + lo)
}

// Two digit years: 50-99 are 19xx, 00-49 are 20xx
fn full_year(yy: u8) -> u16 {
    if yy >= 50 {
        1900 + u16::from(yy)
    } else {
        2000 + u16::from(yy)
    }
}

impl Expiry {
    pub fn new(year: u16, month: u8) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// Decode the `MMYY` certificate expiration date format
    pub fn from_mmyy(bcd_date: &[u8]) -> Option<Self> {
        match bcd_date {
            [mm, yy] => Self::new(full_year(bcd(*yy)?), bcd(*mm)?),
            _ => None,
        }
    }

    /// Decode a `YYMMDD` date, dropping the day
    pub fn from_yymmdd(bcd_date: &[u8]) -> Option<Self> {
        match bcd_date {
            [yy, mm, dd] => {
                bcd(*dd)?;
                Self::new(full_year(bcd(*yy)?), bcd(*mm)?)
            }
            _ => None,
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// True once `as_of` lies in a later month than this expiry
    pub fn is_expired(&self, as_of: Expiry) -> bool {
        as_of > *self
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:04}", self.month, self.year)
    }
}

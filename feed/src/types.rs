use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

use crate::errors::{FeedError, ParseTickErr};

/// Field separator of the line form.
const SEPARATOR: char = '|';

/// Format used when rendering tick timestamps on the console.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// A single price observation for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: Option<f64>,
}

impl Tick {
    /// Builds a tick, rejecting an empty symbol or one holding the line separator.
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        price: Option<f64>,
    ) -> Result<Self, FeedError> {
        let symbol = symbol.into();
        check_symbol(&symbol)?;
        Ok(Self {
            symbol,
            timestamp,
            price,
        })
    }

    /// Pipe-delimited form: `symbol|timestamp_millis|price`.
    ///
    /// An absent price leaves the last field empty.
    pub fn to_line(&self) -> String {
        let price = self.price.map(|p| p.to_string()).unwrap_or_default();
        format!(
            "{}|{}|{}",
            self.symbol,
            self.timestamp.timestamp_millis(),
            price
        )
    }

    pub fn from_line(s: &str) -> Result<Self, ParseTickErr> {
        let parts: Vec<&str> = s.trim_end().split(SEPARATOR).collect();
        if parts.len() != 3 {
            return Err(ParseTickErr::NotEnoughFields);
        }
        if parts[0].is_empty() {
            return Err(ParseTickErr::EmptySymbol);
        }
        let millis: i64 = parts[1]
            .parse()
            .map_err(|_| ParseTickErr::InvalidTimestamp(parts[1].to_string()))?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| ParseTickErr::InvalidTimestamp(parts[1].to_string()))?;
        let price = match parts[2] {
            "" => None,
            p => Some(p.parse::<f64>()?),
        };
        Ok(Tick {
            symbol: parts[0].to_string(),
            timestamp,
            price,
        })
    }
}

/// Rejects symbols that cannot appear in a tick.
pub fn check_symbol(symbol: &str) -> Result<(), FeedError> {
    if symbol.is_empty() {
        return Err(FeedError::EmptySymbol);
    }
    if symbol.contains(SEPARATOR) {
        return Err(FeedError::InvalidSymbol(symbol.to_string()));
    }
    Ok(())
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] ",
            self.symbol,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )?;
        if let Some(price) = self.price {
            write!(f, "{:.2}", price)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    #[test]
    fn new_rejects_empty_symbol() {
        assert!(matches!(
            Tick::new("", at(0), Some(1.0)),
            Err(FeedError::EmptySymbol)
        ));
    }

    #[test]
    fn new_rejects_separator_in_symbol() {
        assert!(matches!(
            Tick::new("AA|A", at(0), Some(1.0)),
            Err(FeedError::InvalidSymbol(s)) if s == "AA|A"
        ));
    }

    #[test]
    fn display_renders_symbol_timestamp_and_price() {
        let tick = Tick::new("AAAA", at(1_700_000_000_123), Some(42.5)).unwrap();
        assert_eq!(tick.to_string(), "AAAA [2023-11-14 22:13:20.123] 42.50");
    }

    #[test]
    fn display_leaves_absent_price_blank() {
        let tick = Tick::new("BBBB", at(0), None).unwrap();
        assert_eq!(tick.to_string(), "BBBB [1970-01-01 00:00:00.000] ");
    }

    #[test]
    fn line_keeps_absent_price() {
        let tick = Tick::new("CCC", at(5), None).unwrap();
        assert_eq!(tick.to_line(), "CCC|5|");
        assert_eq!(Tick::from_line(&tick.to_line()).unwrap(), tick);
    }

    #[test]
    fn from_line_rejects_bad_input() {
        assert!(matches!(
            Tick::from_line("AAAA|1"),
            Err(ParseTickErr::NotEnoughFields)
        ));
        assert!(matches!(
            Tick::from_line("|1|2.0"),
            Err(ParseTickErr::EmptySymbol)
        ));
        assert!(matches!(
            Tick::from_line("AAAA|soon|2.0"),
            Err(ParseTickErr::InvalidTimestamp(_))
        ));
        assert!(matches!(
            Tick::from_line("AAAA|1|cheap"),
            Err(ParseTickErr::InvalidPrice(_))
        ));
    }

    #[test]
    fn equality_is_structural() {
        let a = Tick::new("AAAA", at(1), Some(1.0)).unwrap();
        let b = Tick::new("AAAA", at(1), Some(1.0)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, Tick::new("AAAA", at(2), Some(1.0)).unwrap());
    }
}

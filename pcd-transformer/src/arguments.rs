use std::{fmt, path::PathBuf};

use crate::{error::ParseError, registers::Register};

/// A value that can be read from one command line token.
pub trait ArgValue: Sized + fmt::Display {
    fn parse_arg(token: &str) -> Result<Self, String>;
}

macro_rules! integer_arg {
    ($($ty:ty),*) => {
        $(
            impl ArgValue for $ty {
                fn parse_arg(token: &str) -> Result<Self, String> {
                    token.parse().map_err(|e| format!("{e}"))
                }
            }
        )*
    };
}

integer_arg!(u8, u16, u32, i32, usize);

macro_rules! float_arg {
    ($($ty:ty),*) => {
        $(
            impl ArgValue for $ty {
                fn parse_arg(token: &str) -> Result<Self, String> {
                    let value: $ty = token.parse().map_err(|e| format!("{e}"))?;
                    if value.is_finite() {
                        Ok(value)
                    } else {
                        Err("value must be finite".to_string())
                    }
                }
            }
        )*
    };
}

float_arg!(f32, f64);

impl ArgValue for Register {
    fn parse_arg(token: &str) -> Result<Self, String> {
        token.parse()
    }
}

/// A `0` or `1` flag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bit(pub bool);

impl ArgValue for Bit {
    fn parse_arg(token: &str) -> Result<Self, String> {
        match token {
            "0" => Ok(Self(false)),
            "1" => Ok(Self(true)),
            _ => Err("expected 0 or 1".to_string()),
        }
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(self.0))
    }
}

/// Scanner channel, two bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel(pub u8);

impl ArgValue for Channel {
    fn parse_arg(token: &str) -> Result<Self, String> {
        let channel: u8 = token.parse().map_err(|e| format!("{e}"))?;
        if channel <= 3 {
            Ok(Self(channel))
        } else {
            Err("scanner channel must be between 0 and 3".to_string())
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cursor over the tokens following one flag.
pub struct Arguments<'a> {
    flag: &'a str,
    tokens: &'a [String],
    position: usize,
}

impl<'a> Arguments<'a> {
    /// `position` is the index of the first token after the flag.
    pub fn new(flag: &'a str, tokens: &'a [String], position: usize) -> Self {
        Self {
            flag,
            tokens,
            position,
        }
    }

    pub fn flag(&self) -> &'a str {
        self.flag
    }

    /// Index of the next unread token.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The next unread token, if any, without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).map(String::as_str)
    }

    pub fn token(&mut self, name: &'static str) -> Result<&'a str, ParseError> {
        let token = self
            .tokens
            .get(self.position)
            .ok_or_else(|| ParseError::MissingArgument {
                flag: self.flag.to_string(),
                name,
            })?;
        self.position += 1;
        Ok(token.as_str())
    }

    pub fn value<T: ArgValue>(&mut self, name: &'static str) -> Result<T, ParseError> {
        let token = self.token(name)?;
        T::parse_arg(token).map_err(|reason| self.invalid(name, token, reason))
    }

    pub fn path(&mut self, name: &'static str) -> Result<PathBuf, ParseError> {
        self.token(name).map(PathBuf::from)
    }

    /// Reads one token holding exactly `N` comma separated numbers.
    pub fn list<const N: usize>(&mut self, name: &'static str) -> Result<[f64; N], ParseError> {
        let token = self.token(name)?;
        let parts: Vec<&str> = token.split(',').collect();
        if parts.len() != N {
            return Err(self.invalid(
                name,
                token,
                format!("expected {N} comma separated values"),
            ));
        }
        let mut values = [0.0; N];
        for (value, part) in values.iter_mut().zip(parts) {
            *value = f64::parse_arg(part.trim()).map_err(|reason| self.invalid(name, token, reason))?;
        }
        Ok(values)
    }

    pub fn invalid(&self, name: &'static str, token: &str, reason: String) -> ParseError {
        ParseError::InvalidValue {
            flag: self.flag.to_string(),
            name,
            token: token.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn reads_typed_values_in_order() {
        let tokens = tokens(&["-set_classification", "7", "2.5"]);
        let mut args = Arguments::new("set_classification", &tokens, 1);
        assert_eq!(args.value::<u8>("class").unwrap(), 7);
        assert_eq!(args.value::<f64>("scale").unwrap(), 2.5);
        assert_eq!(args.position(), 3);
        assert_eq!(
            args.value::<f64>("missing"),
            Err(ParseError::MissingArgument {
                flag: "set_classification".to_string(),
                name: "missing",
            })
        );
    }

    #[test]
    fn rejects_out_of_range_enumerants() {
        let tokens = tokens(&["256", "nan", "4", "2"]);
        let mut args = Arguments::new("set_classification", &tokens, 0);
        let err = args.value::<u8>("class").unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { ref token, .. } if token == "256"));
        assert!(args.value::<f64>("value").is_err());
        assert!(args.value::<Channel>("channel").is_err());
        assert!(args.value::<Bit>("flag").is_err());
    }

    #[test]
    fn reads_comma_separated_lists() {
        let tokens = tokens(&["1,2,3", "1,2"]);
        let mut args = Arguments::new("transform_matrix", &tokens, 0);
        assert_eq!(args.list::<3>("row").unwrap(), [1.0, 2.0, 3.0]);
        assert!(args.list::<3>("row").is_err());
    }
}

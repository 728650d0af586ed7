//! Coercion of expanded condition text into the boolean, numeric and
//! version domains.
//!
//! Every coercion is a total function returning `Option`: text that does not
//! fit a domain is simply not a member of it.

use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use rust_decimal::Decimal;

static DECIMAL_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-]?)(\d*)(?:\.(\d*))?$").expect("valid regex"));

static HEX_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0[xX]([0-9a-fA-F]+)$").expect("valid regex"));

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\.(\d+)(?:\.(\d+))?(?:\.(\d+))?$").expect("valid regex")
});

/// Boolean reading of a value.
///
/// `true`, `on` and `yes` are true; `false`, `off`, `no` and the empty
/// string are false (all case-insensitive). Anything else is not a boolean.
///
/// # Examples
///
/// ```
/// use buildcond::value::to_bool;
///
/// assert_eq!(to_bool("Yes"), Some(true));
/// assert_eq!(to_bool(""), Some(false));
/// assert_eq!(to_bool("maybe"), None);
/// ```
pub fn to_bool(text: &str) -> Option<bool> {
    if text.is_empty() {
        return Some(false);
    }
    const TRUE: [&str; 3] = ["true", "on", "yes"];
    const FALSE: [&str; 3] = ["false", "off", "no"];

    if TRUE.iter().any(|t| text.eq_ignore_ascii_case(t)) {
        Some(true)
    } else if FALSE.iter().any(|f| text.eq_ignore_ascii_case(f)) {
        Some(false)
    } else {
        None
    }
}

/// Numeric reading of a value: a decimal number with an optional sign and
/// decimal point, or a `0x` hexadecimal integer. `.` is always the decimal
/// point, whatever the host locale.
///
/// # Examples
///
/// ```
/// use buildcond::value::to_number;
/// use rust_decimal::Decimal;
///
/// assert_eq!(to_number("10"), to_number("10.0"));
/// assert_eq!(to_number("0x10"), Some(Decimal::from(16)));
/// assert_eq!(to_number("1.2.3"), None);
/// ```
pub fn to_number(text: &str) -> Option<Decimal> {
    if let Some(caps) = HEX_NUMBER.captures(text) {
        let value = u64::from_str_radix(&caps[1], 16).ok()?;
        return Some(Decimal::from(value));
    }

    let caps = DECIMAL_NUMBER.captures(text)?;
    let sign = &caps[1];
    let whole = caps.get(2).map_or("", |m| m.as_str());
    let fraction = caps.get(3).map_or("", |m| m.as_str());
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    // Normalized so that `5.`, `.5` and `+5` parse.
    let normalized = format!(
        "{}{}{}{}",
        if sign == "-" { "-" } else { "" },
        if whole.is_empty() { "0" } else { whole },
        if fraction.is_empty() { "" } else { "." },
        fraction
    );
    Decimal::from_str(&normalized).ok()
}

/// A dotted version with two to four non-negative components.
///
/// Missing components order before present ones, so `1.0 < 1.0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub build: Option<u32>,
    pub revision: Option<u32>,
}

impl Version {
    pub fn new(major: u32, minor: u32) -> Self {
        Version {
            major,
            minor,
            build: None,
            revision: None,
        }
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = VERSION.captures(s).ok_or(())?;
        let component = |i: usize| -> Result<Option<u32>, ()> {
            caps.get(i)
                .map(|m| m.as_str().parse::<u32>().map_err(|_| ()))
                .transpose()
        };
        let major = component(1)?.ok_or(())?;
        let minor = component(2)?.ok_or(())?;

        Ok(Version {
            major,
            minor,
            build: component(3)?,
            revision: component(4)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(build) = self.build {
            write!(f, ".{}", build)?;
            if let Some(revision) = self.revision {
                write!(f, ".{}", revision)?;
            }
        }
        Ok(())
    }
}

/// Version reading of a value.
pub fn to_version(text: &str) -> Option<Version> {
    text.parse().ok()
}

/// Case-insensitive string equality, one character at a time.
///
/// Characters are folded with their single-character uppercase mapping, so
/// `ä` matches `Ä` but `ß` does not match `SS`. Pure ASCII input takes the
/// byte-wise fast path.
///
/// # Examples
///
/// ```
/// use buildcond::value::eq_ignore_case;
///
/// assert!(eq_ignore_case("Debug", "DEBUG"));
/// assert!(eq_ignore_case("Ärger", "ärger"));
/// assert!(!eq_ignore_case("straße", "STRASSE"));
/// ```
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars().map(fold_case).eq(b.chars().map(fold_case))
}

fn fold_case(c: char) -> char {
    let mut upper = c.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => c,
    }
}

use std::{fmt, str::FromStr};

use crate::{error::MqlError, path::AttributePath};

/// Placement of NULLs in an order term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullOrder {
    /// Whatever the underlying engine does
    #[default]
    Default,
    /// NULLs come first
    First,
    /// NULLs come last
    Last,
}

/// One `ORDER BY` term.
///
/// # Examples
///
/// ```
/// use mql_lang::sort::{NullOrder, Order};
///
/// let order: Order = "e.hiredAt desc nulls last".parse().unwrap();
/// assert!(order.descending);
/// assert_eq!(order.null_order, NullOrder::Last);
/// assert_eq!(order.path.to_string(), "e.hiredAt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub path: AttributePath,
    pub descending: bool,
    pub null_order: NullOrder,
}

impl Order {
    pub fn asc(path: AttributePath) -> Self {
        Order {
            path,
            descending: false,
            null_order: NullOrder::Default,
        }
    }

    pub fn desc(path: AttributePath) -> Self {
        Order {
            path,
            descending: true,
            null_order: NullOrder::Default,
        }
    }

    pub fn nulls(mut self, null_order: NullOrder) -> Self {
        self.null_order = null_order;
        self
    }

    fn direction(&self) -> &'static str {
        if self.descending { "DESC" } else { "ASC" }
    }

    /// Renders the term for `path`, which is this term's path after alias
    /// qualification.
    pub fn render(&self, path: &AttributePath) -> String {
        let term = format!("{} {}", path, self.direction());
        match self.null_order {
            NullOrder::Default => term,
            NullOrder::First => {
                format!("(CASE WHEN {} IS NULL THEN 0 ELSE 1 END) ASC, {}", path, term)
            }
            NullOrder::Last => {
                format!("(CASE WHEN {} IS NULL THEN 0 ELSE 1 END) DESC, {}", path, term)
            }
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render(&self.path))
    }
}

/// Parses `<path> [asc|desc] [nulls first|last]`, case-insensitively.
impl FromStr for Order {
    type Err = MqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MqlError::configuration(format!("Invalid order term '{}'", s));

        let words: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
        let (path, rest) = match s.split_whitespace().next() {
            Some(first) => (first, &words[1..]),
            None => return Err(invalid()),
        };

        let path = AttributePath::parse(path).map_err(|_| invalid())?;
        let (descending, rest) = match rest.first().map(String::as_str) {
            Some("asc") => (false, &rest[1..]),
            Some("desc") => (true, &rest[1..]),
            _ => (false, rest),
        };

        let null_order = match rest {
            [] => NullOrder::Default,
            [nulls, which] if nulls == "nulls" => match which.as_str() {
                "first" => NullOrder::First,
                "last" => NullOrder::Last,
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        };

        Ok(Order {
            path,
            descending,
            null_order,
        })
    }
}

use serde::Serialize;
use crate::core::error::{Error, Result};
use crate::reference::predicate::RefPredicate;

/// A reference scope as written by a caller:
/// - none / empty: the whole edition
/// - `1.2`: exactly that reference
/// - `1.2*`: that reference and everything under it
/// - `1.2-1.5`: inclusive range
#[derive(Debug, Clone, Serialize)]
pub struct RefScope {
    pub text: Option<String>,
    #[serde(skip)]
    pub predicate: RefPredicate,
}

impl RefScope {
    pub fn whole() -> Self {
        RefScope { text: None, predicate: RefPredicate::All }
    }

    pub fn parse(scope: Option<&str>) -> Result<Self> {
        let text = match scope.map(str::trim) {
            None | Some("") => return Ok(Self::whole()),
            Some(text) => text,
        };

        let predicate = if let Some((start, end)) = text.split_once('-') {
            if start.is_empty() || end.is_empty() {
                return Err(Error::invalid_argument(format!("incomplete reference range '{}'", text)));
            }
            RefPredicate::range(start, end)?
        } else if let Some(prefix) = text.strip_suffix('*') {
            RefPredicate::prefix(prefix)?
        } else {
            RefPredicate::exact(text)?
        };

        Ok(RefScope { text: Some(text.to_string()), predicate })
    }

    pub fn is_whole(&self) -> bool {
        self.predicate.is_all()
    }
}

//! Download actions and the search predicates they stand for.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Errors turning command line input into a search predicate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    /// The action name is not one of [`Action::ALL`].
    #[error("unknown action `{0}` (expected one of: {names})", names = Action::names())]
    Unknown(String),

    /// `institution` was chosen without an institution code.
    #[error("institution action given without specified institution")]
    MissingInstitution,

    /// `query` was chosen without a query string.
    #[error("query action given without specified query")]
    MissingQuery,
}

/// What to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Every record with geographic data.
    GeodataExists,
    /// The entire corpus.
    All,
    /// Every record of one institution.
    Institution,
    /// A free-form query.
    Query,
    /// Every record with a color annotation.
    ColorExists,
    /// Every record with a keyword.
    KeywordExists,
}

impl Action {
    /// Every action, in help-text order.
    pub const ALL: [Self; 6] = [
        Self::GeodataExists,
        Self::All,
        Self::Institution,
        Self::Query,
        Self::ColorExists,
        Self::KeywordExists,
    ];

    /// Command line name of the action.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::GeodataExists => "geodata-exists",
            Self::All => "all",
            Self::Institution => "institution",
            Self::Query => "query",
            Self::ColorExists => "color-exists",
            Self::KeywordExists => "keyword-exists",
        }
    }

    /// Comma separated list of every action name.
    #[must_use]
    pub fn names() -> String {
        Self::ALL
            .iter()
            .map(|action| action.name())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Builds the search predicate for this action.
    ///
    /// `institution` and `query` are only consulted by the actions that need
    /// them; blank values count as missing. Queries are passed on verbatim.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::MissingInstitution`] or
    /// [`ActionError::MissingQuery`] when the action's argument is absent.
    pub fn predicate(
        self,
        institution: Option<&str>,
        query: Option<&str>,
    ) -> Result<String, ActionError> {
        fn non_blank(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        match self {
            Self::GeodataExists => Ok("geoDataExists=j".to_string()),
            Self::All => Ok("*".to_string()),
            Self::Institution => non_blank(institution)
                .map(|code| format!("serviceOrganization={code}"))
                .ok_or(ActionError::MissingInstitution),
            Self::Query => query
                .filter(|q| !q.trim().is_empty())
                .map(str::to_string)
                .ok_or(ActionError::MissingQuery),
            Self::ColorExists => Ok("itemColor=*".to_string()),
            Self::KeywordExists => Ok("itemKeyWord=*".to_string()),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| ActionError::Unknown(s.to_string()))
    }
}

use crate::error::{FunnelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Months with a tab in the funnel spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Month {
    Janeiro,
    Fevereiro,
    Marco,
    Abril,
    Maio,
    Junho,
    Julho,
    Agosto,
    Setembro,
    Outubro,
    Novembro,
    Dezembro,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Janeiro,
        Month::Fevereiro,
        Month::Marco,
        Month::Abril,
        Month::Maio,
        Month::Junho,
        Month::Julho,
        Month::Agosto,
        Month::Setembro,
        Month::Outubro,
        Month::Novembro,
        Month::Dezembro,
    ];

    /// Stable lowercase identifier, used in cache keys.
    pub fn id(self) -> &'static str {
        match self {
            Month::Janeiro => "janeiro",
            Month::Fevereiro => "fevereiro",
            Month::Marco => "marco",
            Month::Abril => "abril",
            Month::Maio => "maio",
            Month::Junho => "junho",
            Month::Julho => "julho",
            Month::Agosto => "agosto",
            Month::Setembro => "setembro",
            Month::Outubro => "outubro",
            Month::Novembro => "novembro",
            Month::Dezembro => "dezembro",
        }
    }

    /// Name of the sheet tab holding this month.
    pub fn tab_name(self) -> &'static str {
        match self {
            Month::Janeiro => "Janeiro",
            Month::Fevereiro => "Fevereiro",
            Month::Marco => "Março",
            Month::Abril => "Abril",
            Month::Maio => "Maio",
            Month::Junho => "Junho",
            Month::Julho => "Julho",
            Month::Agosto => "Agosto",
            Month::Setembro => "Setembro",
            Month::Outubro => "Outubro",
            Month::Novembro => "Novembro",
            Month::Dezembro => "Dezembro",
        }
    }

    /// 1-based calendar number.
    pub fn number(self) -> u32 {
        Month::ALL
            .iter()
            .position(|m| *m == self)
            .map(|idx| idx as u32 + 1)
            .unwrap_or(1)
    }

    /// Resolves a human-readable month name ("Março", "marco", " JUNHO ").
    pub fn from_name(name: &str) -> Result<Month> {
        let wanted = name.trim().to_lowercase();
        Month::ALL
            .into_iter()
            .find(|m| m.id() == wanted || m.tab_name().to_lowercase() == wanted)
            .ok_or_else(|| FunnelError::UnknownMonth(name.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tab_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Month::from_name("Março").unwrap(), Month::Marco);
        assert_eq!(Month::from_name("marco").unwrap(), Month::Marco);
        assert_eq!(Month::from_name(" JUNHO ").unwrap(), Month::Junho);
        assert_eq!(Month::from_name("dezembro").unwrap(), Month::Dezembro);
    }

    #[test]
    fn test_unknown_month_is_config_error() {
        let err = Month::from_name("Smarch").unwrap_err();
        assert!(matches!(err, FunnelError::UnknownMonth(ref m) if m == "Smarch"));
        assert!(err.is_config_error());
        assert!(Month::from_name("").is_err());
    }

    #[test]
    fn test_numbers_and_tabs() {
        assert_eq!(Month::Janeiro.number(), 1);
        assert_eq!(Month::Dezembro.number(), 12);
        assert_eq!(Month::Marco.tab_name(), "Março");
        assert_eq!(Month::Marco.to_string(), "Março");
    }
}

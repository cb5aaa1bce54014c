//! Positional column layout of the monthly funnel sheet.
//!
//! The standard layout is a fixed table of zero-based offsets ending at
//! column `U`. Inserting a column in the sheet means renumbering every
//! field after it here. [`ColumnSchema::from_header`] derives the same
//! table from the header row instead, so a moved column fails loudly.
//!
//! | Field                 | Col | Index | Header               |
//! |-----------------------|-----|-------|----------------------|
//! | `funil`               | A   | 0     | Funil                |
//! | `periodo`             | B   | 1     | Período              |
//! | `invested`            | C   | 2     | Investido            |
//! | `trafficRevenue`      | D   | 3     | Faturamento Tráfego  |
//! | `trafficRoas`         | E   | 4     | ROAS Tráfego         |
//! | `students`            | F   | 5     | Alunos               |
//! | `forms`               | G   | 6     | Formulários          |
//! | `formFillRate`        | H   | 7     | Taxa Preenchimento   |
//! | `qualified`           | I   | 8     | Qualificados         |
//! | `scheduledCalls`      | J   | 9     | Agendamentos         |
//! | `schedulingRate`      | K   | 10    | Taxa Agendamento     |
//! | `callsCompleted`      | L   | 11    | Calls Realizadas     |
//! | `attendanceRate`      | M   | 12    | Taxa Comparecimento  |
//! | `sales`               | N   | 13    | Vendas               |
//! | `salesConversionRate` | O   | 14    | Taxa Conversão       |
//! | `ascensionRate`       | P   | 15    | Taxa Ascensão        |
//! | `monetizationSale`    | Q   | 16    | Venda Monetização    |
//! | `deposit`             | R   | 17    | Entrada              |
//! | `funnelRevenue`       | S   | 18    | Faturamento Funil    |
//! | `funnelProfit`        | T   | 19    | Lucro Funil          |
//! | `funnelRoas`          | U   | 20    | ROAS Funil           |

use crate::error::{FunnelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Last column of the standard layout, used to bound the fetch range.
pub const STANDARD_LAST_COLUMN: &str = "U";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    Funil,
    Periodo,
    Invested,
    TrafficRevenue,
    TrafficRoas,
    Students,
    Forms,
    FormFillRate,
    Qualified,
    ScheduledCalls,
    SchedulingRate,
    CallsCompleted,
    AttendanceRate,
    Sales,
    SalesConversionRate,
    AscensionRate,
    MonetizationSale,
    Deposit,
    FunnelRevenue,
    FunnelProfit,
    FunnelRoas,
}

impl Field {
    /// Every field in sheet order.
    pub const ALL: [Field; 21] = [
        Field::Funil,
        Field::Periodo,
        Field::Invested,
        Field::TrafficRevenue,
        Field::TrafficRoas,
        Field::Students,
        Field::Forms,
        Field::FormFillRate,
        Field::Qualified,
        Field::ScheduledCalls,
        Field::SchedulingRate,
        Field::CallsCompleted,
        Field::AttendanceRate,
        Field::Sales,
        Field::SalesConversionRate,
        Field::AscensionRate,
        Field::MonetizationSale,
        Field::Deposit,
        Field::FunnelRevenue,
        Field::FunnelProfit,
        Field::FunnelRoas,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Funil => "funil",
            Field::Periodo => "periodo",
            Field::Invested => "invested",
            Field::TrafficRevenue => "trafficRevenue",
            Field::TrafficRoas => "trafficRoas",
            Field::Students => "students",
            Field::Forms => "forms",
            Field::FormFillRate => "formFillRate",
            Field::Qualified => "qualified",
            Field::ScheduledCalls => "scheduledCalls",
            Field::SchedulingRate => "schedulingRate",
            Field::CallsCompleted => "callsCompleted",
            Field::AttendanceRate => "attendanceRate",
            Field::Sales => "sales",
            Field::SalesConversionRate => "salesConversionRate",
            Field::AscensionRate => "ascensionRate",
            Field::MonetizationSale => "monetizationSale",
            Field::Deposit => "deposit",
            Field::FunnelRevenue => "funnelRevenue",
            Field::FunnelProfit => "funnelProfit",
            Field::FunnelRoas => "funnelRoas",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Header texts accepted for this field. The first entry is canonical.
    pub fn expected_headers(self) -> &'static [&'static str] {
        match self {
            Field::Funil => &["funil", "produto"],
            Field::Periodo => &["período", "periodo"],
            Field::Invested => &["investido", "investimento"],
            Field::TrafficRevenue => &["faturamento tráfego", "faturamento trafego"],
            Field::TrafficRoas => &["roas tráfego", "roas trafego"],
            Field::Students => &["alunos", "leads"],
            Field::Forms => &["formulários", "formularios"],
            Field::FormFillRate => &["taxa preenchimento", "taxa de preenchimento"],
            Field::Qualified => &["qualificados"],
            Field::ScheduledCalls => &["agendamentos", "calls agendadas"],
            Field::SchedulingRate => &["taxa agendamento", "taxa de agendamento"],
            Field::CallsCompleted => &["calls realizadas"],
            Field::AttendanceRate => &["taxa comparecimento", "taxa de comparecimento"],
            Field::Sales => &["vendas"],
            Field::SalesConversionRate => &[
                "taxa conversão",
                "taxa conversao",
                "taxa de conversão",
                "taxa de conversao",
            ],
            Field::AscensionRate => &["taxa ascensão", "taxa ascensao", "taxa de ascensão"],
            Field::MonetizationSale => &["venda monetização", "venda monetizacao"],
            Field::Deposit => &["entrada"],
            Field::FunnelRevenue => &["faturamento funil"],
            Field::FunnelProfit => &["lucro funil"],
            Field::FunnelRoas => &["roas funil"],
        }
    }

    /// Funnel ROAS is recomputed from revenue and investment, never read.
    pub fn is_derived(self) -> bool {
        matches!(self, Field::FunnelRoas)
    }

    /// Label fields carry text rather than numbers.
    pub fn is_label(self) -> bool {
        matches!(self, Field::Funil | Field::Periodo)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMode {
    /// Hard-coded offsets of the standard layout.
    #[default]
    Fixed,
    /// Offsets derived from the header row.
    HeaderMatched,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<(Field, usize)>,
    last_column: String,
}

impl ColumnSchema {
    /// The standard layout (columns `A` through `U`).
    pub fn standard() -> Self {
        Self {
            columns: Field::ALL
                .into_iter()
                .enumerate()
                .map(|(idx, field)| (field, idx))
                .collect(),
            last_column: STANDARD_LAST_COLUMN.to_string(),
        }
    }

    /// Builds a schema by locating each field's header text in `header`.
    ///
    /// Derived fields are optional; every other field must be present.
    pub fn from_header(header: &[String]) -> Result<Self> {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let mut columns = Vec::with_capacity(Field::ALL.len());

        for field in Field::ALL {
            let position = normalized
                .iter()
                .position(|h| field.expected_headers().contains(&h.as_str()));

            match position {
                Some(idx) => columns.push((field, idx)),
                None if field.is_derived() => {}
                None => {
                    return Err(FunnelError::MissingHeader {
                        field: field.name().to_string(),
                        expected: field.expected_headers()[0].to_string(),
                    })
                }
            }
        }

        let max_index = columns.iter().map(|(_, idx)| *idx).max().unwrap_or(0);
        let schema = Self {
            columns,
            last_column: index_to_column_letter(max_index),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn index_of(&self, field: Field) -> Option<usize> {
        self.columns
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, idx)| *idx)
    }

    pub fn has_field(&self, name: &str) -> bool {
        Field::from_name(name).is_some_and(|field| self.index_of(field).is_some())
    }

    pub fn columns(&self) -> &[(Field, usize)] {
        &self.columns
    }

    /// Field name to index map, for diagnostics.
    pub fn as_map(&self) -> BTreeMap<&'static str, usize> {
        self.columns
            .iter()
            .map(|(field, idx)| (field.name(), *idx))
            .collect()
    }

    pub fn last_column(&self) -> &str {
        &self.last_column
    }

    /// Checks that indices are unique and fall inside the last-column bound.
    pub fn validate(&self) -> Result<()> {
        let bound = column_letter_to_index(&self.last_column).ok_or_else(|| {
            FunnelError::InvalidSchema(format!("invalid last column '{}'", self.last_column))
        })?;

        let mut seen = HashSet::new();
        for (field, idx) in &self.columns {
            if !seen.insert(*idx) {
                return Err(FunnelError::InvalidSchema(format!(
                    "column {} is mapped more than once (at field '{}')",
                    idx,
                    field.name()
                )));
            }
            if *idx > bound {
                return Err(FunnelError::InvalidSchema(format!(
                    "field '{}' at index {} lies beyond last column {}",
                    field.name(),
                    idx,
                    self.last_column
                )));
            }
        }

        Ok(())
    }
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self::standard()
    }
}

fn normalize_header(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// `"A"` -> 0, `"U"` -> 20, `"AA"` -> 26.
pub fn column_letter_to_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }

    let mut index = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let value = (c.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index.checked_mul(26)?.checked_add(value)?;
    }
    Some(index - 1)
}

pub fn index_to_column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard_header() -> Vec<String> {
        [
            "Funil",
            "Período",
            "Investido",
            "Faturamento Tráfego",
            "ROAS Tráfego",
            "Alunos",
            "Formulários",
            "Taxa Preenchimento",
            "Qualificados",
            "Agendamentos",
            "Taxa Agendamento",
            "Calls Realizadas",
            "Taxa Comparecimento",
            "Vendas",
            "Taxa Conversão",
            "Taxa Ascensão",
            "Venda Monetização",
            "Entrada",
            "Faturamento Funil",
            "Lucro Funil",
            "ROAS Funil",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_standard_layout() {
        let schema = ColumnSchema::standard();
        assert_eq!(schema.index_of(Field::Funil), Some(0));
        assert_eq!(schema.index_of(Field::Periodo), Some(1));
        assert_eq!(schema.index_of(Field::Invested), Some(2));
        assert_eq!(schema.index_of(Field::FunnelRevenue), Some(18));
        assert_eq!(schema.index_of(Field::FunnelRoas), Some(20));
        assert_eq!(schema.last_column(), "U");
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_has_field() {
        let schema = ColumnSchema::standard();
        assert!(schema.has_field("funil"));
        assert!(schema.has_field("salesConversionRate"));
        assert!(!schema.has_field("refunds"));
        assert_eq!(schema.as_map().len(), 21);
    }

    #[test]
    fn test_header_matching_reproduces_standard_layout() {
        let schema = ColumnSchema::from_header(&standard_header()).unwrap();
        assert_eq!(schema, ColumnSchema::standard());
    }

    #[test]
    fn test_header_matching_follows_moved_columns() {
        let mut header = standard_header();
        header.insert(5, "Cliques".to_string());
        let schema = ColumnSchema::from_header(&header).unwrap();
        assert_eq!(schema.index_of(Field::TrafficRoas), Some(4));
        assert_eq!(schema.index_of(Field::Students), Some(6));
        assert_eq!(schema.index_of(Field::FunnelRoas), Some(21));
        assert_eq!(schema.last_column(), "V");
    }

    #[test]
    fn test_header_matching_is_case_and_space_insensitive() {
        let mut header = standard_header();
        header[2] = "  INVESTIDO ".to_string();
        header[18] = "faturamento   funil".to_string();
        let schema = ColumnSchema::from_header(&header).unwrap();
        assert_eq!(schema.index_of(Field::Invested), Some(2));
        assert_eq!(schema.index_of(Field::FunnelRevenue), Some(18));
    }

    #[test]
    fn test_missing_header_is_an_error() {
        let mut header = standard_header();
        header.remove(13);
        match ColumnSchema::from_header(&header) {
            Err(FunnelError::MissingHeader { field, .. }) => assert_eq!(field, "sales"),
            other => panic!("expected MissingHeader, got {:?}", other),
        }
    }

    #[test]
    fn test_derived_header_is_optional() {
        let mut header = standard_header();
        header.pop();
        let schema = ColumnSchema::from_header(&header).unwrap();
        assert_eq!(schema.index_of(Field::FunnelRoas), None);
        assert_eq!(schema.last_column(), "T");
    }

    #[test]
    fn test_validate_rejects_duplicates_and_overflow() {
        let duplicated = ColumnSchema {
            columns: vec![(Field::Funil, 0), (Field::Periodo, 0)],
            last_column: "U".to_string(),
        };
        assert!(duplicated.validate().is_err());

        let overflow = ColumnSchema {
            columns: vec![(Field::Funil, 0), (Field::Periodo, 30)],
            last_column: "U".to_string(),
        };
        assert!(overflow.validate().is_err());
    }

    #[test]
    fn test_column_letters() {
        assert_eq!(column_letter_to_index("A"), Some(0));
        assert_eq!(column_letter_to_index("u"), Some(20));
        assert_eq!(column_letter_to_index("AA"), Some(26));
        assert_eq!(column_letter_to_index("A1"), None);
        assert_eq!(column_letter_to_index(&"Z".repeat(15)), None);
        assert_eq!(index_to_column_letter(20), "U");
        assert_eq!(index_to_column_letter(27), "AB");
    }
}

//! Normal-form levels and inheritance modes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Progressive relational decomposition level of a column or table.
///
/// The numeric value mirrors the classic naming: a column in
/// `FirstNormalForm` embeds another entity's identity (a forward relation),
/// a column in `ThirdNormalForm` embeds a one-to-many fact (a multivalued
/// relation), and a `FourthNormalForm` column is a terminal attribute.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NormalForm {
    /// Repeating column group (`amount-1`, `amount-2`, ...).
    Unnormalized = 0,
    /// Embedded many-to-one reference (`donor--name`).
    FirstNormalForm = 1,
    /// Embedded one-to-many fact (`address--city`).
    ThirdNormalForm = 3,
    /// Fully decomposed.
    FourthNormalForm = 4,
}

impl NormalForm {
    /// All levels in ascending order.
    pub const ALL: [NormalForm; 4] = [
        NormalForm::Unnormalized,
        NormalForm::FirstNormalForm,
        NormalForm::ThirdNormalForm,
        NormalForm::FourthNormalForm,
    ];

    /// Numeric level (0, 1, 3, 4).
    pub fn level(self) -> u8 {
        self as u8
    }

    /// Short label used in logs and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            NormalForm::Unnormalized => "UNF",
            NormalForm::FirstNormalForm => "1NF",
            NormalForm::ThirdNormalForm => "3NF",
            NormalForm::FourthNormalForm => "4NF",
        }
    }
}

impl fmt::Display for NormalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NormalForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "unf" | "unnormalized" => Ok(NormalForm::Unnormalized),
            "1" | "1nf" | "first" => Ok(NormalForm::FirstNormalForm),
            "3" | "3nf" | "third" => Ok(NormalForm::ThirdNormalForm),
            "4" | "4nf" | "fourth" => Ok(NormalForm::FourthNormalForm),
            other => Err(format!("unknown normal form: {other}")),
        }
    }
}

/// How parent/child entity types share tables.
///
/// - <https://martinfowler.com/eaaCatalog/singleTableInheritance.html>
/// - <https://martinfowler.com/eaaCatalog/classTableInheritance.html>
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InheritanceMode {
    /// Every type in a hierarchy shares one flat attribute set.
    #[default]
    SingleTable,
    /// Each type keeps only its own descriptors.
    ClassTable,
}

impl InheritanceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            InheritanceMode::SingleTable => "single table inheritance",
            InheritanceMode::ClassTable => "class table inheritance",
        }
    }
}

impl fmt::Display for InheritanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

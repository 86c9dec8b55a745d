use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug)]
pub enum IonParsingError {
    UnsupportedSeries {
        series: char,
    },
    ParsingError {
        error: String,
        context: Option<&'static str>,
    },
}

impl Display for IonParsingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Terminus of the peptide that retains the charge after fragmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IonSeries {
    B,
    Y,
}

impl IonSeries {
    pub fn as_char(&self) -> char {
        match self {
            IonSeries::B => 'b',
            IonSeries::Y => 'y',
        }
    }
}

/// Compact fragment annotation ("cut info"), written as `y7` or `b5^2`.
///
/// Charge 1 is implied when there is no `^` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IonLabel {
    pub series: IonSeries,
    pub ordinal: u8,
    pub charge: u8,
}

impl IonLabel {
    pub fn new(series: IonSeries, ordinal: u8, charge: u8) -> Self {
        Self {
            series,
            ordinal,
            charge,
        }
    }
}

impl Display for IonLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.charge > 1 {
            write!(f, "{}{}^{}", self.series.as_char(), self.ordinal, self.charge)
        } else {
            write!(f, "{}{}", self.series.as_char(), self.ordinal)
        }
    }
}

impl FromStr for IonLabel {
    type Err = IonParsingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let series = match chars.next() {
            Some('b') => IonSeries::B,
            Some('y') => IonSeries::Y,
            Some(other) => return Err(IonParsingError::UnsupportedSeries { series: other }),
            None => {
                return Err(IonParsingError::ParsingError {
                    error: s.to_string(),
                    context: Some("Empty string"),
                });
            }
        };
        let rest = chars.as_str();
        let (ordinal_chunk, charge_chunk) = match rest.split_once('^') {
            Some((o, c)) => (o, Some(c)),
            None => (rest, None),
        };
        let ordinal = ordinal_chunk
            .parse::<u8>()
            .map_err(|e| IonParsingError::ParsingError {
                error: format!("{ordinal_chunk} -> {e:?}"),
                context: Some("Unable to parse the ordinal number"),
            })?;
        let charge = match charge_chunk {
            Some(c) => c.parse::<u8>().map_err(|e| IonParsingError::ParsingError {
                error: format!("{c} -> {e:?}"),
                context: Some("Unable to parse the charge"),
            })?,
            None => 1,
        };

        Ok(IonLabel::new(series, ordinal, charge))
    }
}

/// A single fragment to extract.
///
/// `rank` is the position of the fragment in the library intensity
/// ordering, 1 being the most intense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragmentDescriptor {
    pub label: String,
    pub mz: f64,
    pub rank: u16,
    pub charge: u8,
}

impl FragmentDescriptor {
    pub fn new(label: impl Into<String>, mz: f64, rank: u16, charge: u8) -> Self {
        Self {
            label: label.into(),
            mz,
            rank,
            charge,
        }
    }

    pub fn ion_label(&self) -> Result<IonLabel, IonParsingError> {
        self.label.parse()
    }
}

use serde::{Deserialize, Serialize};

use crate::core::calculator::{format_amount, round_to};
use crate::core::error::{CalcError, Result};
use crate::core::factors::{FactorTable, Region};

/// How a footprint total relates to its regional average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComparisonVerdict {
    /// `false` covers both below and exactly equal.
    pub above: bool,
    /// Percentage deviation from the average, 1 decimal.
    pub magnitude: f64,
    pub region: Region,
    pub average: f64,
}

impl ComparisonVerdict {
    /// e.g. "6.8% higher than the India average of 1.9 tonnes CO2/year"
    pub fn describe(&self) -> String {
        let direction = if self.above { "higher" } else { "lower" };
        format!(
            "{}% {} than the {} average of {} tonnes CO2/year",
            format_amount(self.magnitude),
            direction,
            self.region,
            format_amount(self.average)
        )
    }
}

pub fn compare(table: &FactorTable, total: f64, region: Region) -> Result<ComparisonVerdict> {
    if !total.is_finite() || total < 0.0 {
        return Err(CalcError::InvalidInput(format!(
            "footprint total must be a non-negative number, got {total}"
        )));
    }

    let average = table.average(region)?;
    if average == 0.0 {
        return Err(CalcError::DivisionByZero(format!(
            "average footprint for {region} is zero"
        )));
    }

    let ratio = total / average;
    let (above, magnitude) = if total > average {
        (true, round_to((ratio - 1.0) * 100.0, 1))
    } else {
        (false, round_to((1.0 - ratio) * 100.0, 1))
    };

    Ok(ComparisonVerdict {
        above,
        magnitude,
        region,
        average,
    })
}

use serde::{Deserialize, Serialize};

use crate::core::error::{CalcError, Result};
use crate::core::factors::{Category, DietType, FactorTable, Region, TransportMode};

const DAYS_PER_YEAR: f64 = 365.0;
const MONTHS_PER_YEAR: f64 = 12.0;
const WEEKS_PER_YEAR: f64 = 52.0;
const KG_PER_TONNE: f64 = 1000.0;

/// Raw lifestyle answers for one calculation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleInput {
    pub region: Region,
    pub transport_mode: TransportMode,
    /// km per day
    pub daily_distance_km: f64,
    /// kWh per month for the whole household
    pub monthly_electricity_kwh: f64,
    pub diet: DietType,
    pub meals_per_day: u32,
    /// kg per week for the whole household
    pub weekly_waste_kg: f64,
    pub household_size: u32,
}

impl Default for LifestyleInput {
    fn default() -> Self {
        LifestyleInput {
            region: Region::India,
            transport_mode: TransportMode::Car,
            daily_distance_km: 10.0,
            monthly_electricity_kwh: 200.0,
            diet: DietType::Vegetarian,
            meals_per_day: 3,
            weekly_waste_kg: 5.0,
            household_size: 3,
        }
    }
}

impl LifestyleInput {
    fn validate(&self) -> Result<()> {
        let quantities = [
            ("daily distance", self.daily_distance_km),
            ("monthly electricity", self.monthly_electricity_kwh),
            ("weekly waste", self.weekly_waste_kg),
        ];
        for (name, value) in quantities {
            if value.is_nan() || value.is_infinite() {
                return Err(CalcError::InvalidInput(format!("{name} must be a finite number")));
            }
            if value < 0.0 {
                return Err(CalcError::InvalidInput(format!(
                    "{name} cannot be negative, got {value}"
                )));
            }
        }
        if self.household_size == 0 {
            return Err(CalcError::DivisionByZero(
                "household size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Annual emissions per category in tonnes CO2, each rounded to 2 decimals.
///
/// `total` is the rounded sum of the already-rounded categories, so it can
/// differ from rounding the exact sum by up to 0.02.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootprintResult {
    pub transportation: f64,
    pub electricity: f64,
    pub diet: f64,
    pub waste: f64,
    pub total: f64,
}

impl FootprintResult {
    pub fn emissions(&self, category: Category) -> f64 {
        match category {
            Category::Transportation => self.transportation,
            Category::Electricity => self.electricity,
            Category::Diet => self.diet,
            Category::Waste => self.waste,
        }
    }

    /// Category emissions in canonical order.
    pub fn by_category(&self) -> [(Category, f64); 4] {
        Category::ALL.map(|category| (category, self.emissions(category)))
    }
}

/// Round to `places` decimals from the exact binary value, ties to even.
/// `0.365` is stored just below the tie and rounds to `0.36`.
pub fn round_to(value: f64, places: usize) -> f64 {
    format!("{:.*}", places, value).parse().unwrap_or(value)
}

/// Decimal rendering that always keeps a fractional digit: `2.0`, `0.36`.
pub fn format_amount(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

fn to_tonnes(kg: f64) -> f64 {
    round_to(kg / KG_PER_TONNE, 2)
}

/// Estimate annual emissions for `input` using the factors of its region.
pub fn compute(table: &FactorTable, input: &LifestyleInput) -> Result<FootprintResult> {
    input.validate()?;
    let factors = table.region(input.region)?;
    let household = f64::from(input.household_size);

    let yearly_distance = input.daily_distance_km * DAYS_PER_YEAR * input.transport_mode.multiplier();
    let yearly_electricity = input.monthly_electricity_kwh * MONTHS_PER_YEAR / household;
    let yearly_meals = f64::from(input.meals_per_day) * DAYS_PER_YEAR;
    let yearly_waste = input.weekly_waste_kg * WEEKS_PER_YEAR / household;

    let transportation = to_tonnes(factors.transportation * yearly_distance);
    let electricity = to_tonnes(factors.electricity * yearly_electricity);
    let diet = to_tonnes(factors.diet_factor(input.diet)? * yearly_meals);
    let waste = to_tonnes(factors.waste * yearly_waste);

    let total = round_to(transportation + electricity + diet + waste, 2);

    Ok(FootprintResult {
        transportation,
        electricity,
        diet,
        waste,
        total,
    })
}

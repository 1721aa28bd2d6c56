use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::error::{CalcError, Result};

/// Regions with a built-in emission profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum Region {
    #[default]
    India,
    #[serde(rename = "United States")]
    UnitedStates,
    #[serde(rename = "European Union")]
    EuropeanUnion,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::India, Region::UnitedStates, Region::EuropeanUnion];

    pub fn as_str(&self) -> &'static str {
        match self {
            Region::India => "India",
            Region::UnitedStates => "United States",
            Region::EuropeanUnion => "European Union",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "india" | "in" => Ok(Region::India),
            "united states" | "united-states" | "us" | "usa" => Ok(Region::UnitedStates),
            "european union" | "european-union" | "eu" => Ok(Region::EuropeanUnion),
            _ => Err(CalcError::InvalidInput(format!("unknown region: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DietType {
    Vegetarian,
    #[serde(rename = "Non-vegetarian")]
    NonVegetarian,
    Vegan,
}

impl DietType {
    pub const ALL: [DietType; 3] = [DietType::Vegetarian, DietType::NonVegetarian, DietType::Vegan];

    pub fn as_str(&self) -> &'static str {
        match self {
            DietType::Vegetarian => "Vegetarian",
            DietType::NonVegetarian => "Non-vegetarian",
            DietType::Vegan => "Vegan",
        }
    }
}

impl fmt::Display for DietType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DietType {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "vegetarian" | "veg" => Ok(DietType::Vegetarian),
            "non-vegetarian" | "non vegetarian" | "nonvegetarian" | "non-veg" => {
                Ok(DietType::NonVegetarian)
            }
            "vegan" => Ok(DietType::Vegan),
            _ => Err(CalcError::InvalidInput(format!("unknown diet type: {s}"))),
        }
    }
}

/// Primary mode of daily transportation.
///
/// Unrecognised modes are kept as `Other` and weighted like a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportMode {
    Car,
    PublicTransit,
    WalkingCycling,
    Mixed,
    Other(String),
}

impl TransportMode {
    /// Dimensionless share of the distance that is charged at the car factor.
    pub fn multiplier(&self) -> f64 {
        match self {
            TransportMode::Car => 1.0,
            TransportMode::PublicTransit => 0.6,
            TransportMode::WalkingCycling => 0.1,
            TransportMode::Mixed => 0.8,
            TransportMode::Other(_) => 1.0,
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportMode::Car => f.write_str("Car"),
            TransportMode::PublicTransit => f.write_str("Public Transit"),
            TransportMode::WalkingCycling => f.write_str("Walking/Cycling"),
            TransportMode::Mixed => f.write_str("Mixed"),
            TransportMode::Other(name) => f.write_str(name),
        }
    }
}

impl FromStr for TransportMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mode = match s.trim().to_lowercase().as_str() {
            "car" => TransportMode::Car,
            "public transit" | "public-transit" | "transit" | "public" => TransportMode::PublicTransit,
            "walking/cycling" | "walking" | "cycling" | "walk" | "bike" => {
                TransportMode::WalkingCycling
            }
            "mixed" => TransportMode::Mixed,
            _ => TransportMode::Other(s.trim().to_string()),
        };
        Ok(mode)
    }
}

impl From<String> for TransportMode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl From<TransportMode> for String {
    fn from(mode: TransportMode) -> Self {
        mode.to_string()
    }
}

/// Emission categories in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Transportation,
    Electricity,
    Diet,
    Waste,
}

impl Category {
    /// Canonical order; also the tie-break order for the highest category.
    pub const ALL: [Category; 4] = [
        Category::Transportation,
        Category::Electricity,
        Category::Diet,
        Category::Waste,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Transportation => "Transportation",
            Category::Electricity => "Electricity",
            Category::Diet => "Diet",
            Category::Waste => "Waste",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CalcError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "transportation" | "transport" => Ok(Category::Transportation),
            "electricity" => Ok(Category::Electricity),
            "diet" => Ok(Category::Diet),
            "waste" => Ok(Category::Waste),
            _ => Err(CalcError::InvalidInput(format!("unknown category: {s}"))),
        }
    }
}

/// Emission coefficients for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFactors {
    /// kgCO2 per km
    pub transportation: f64,
    /// kgCO2 per kWh
    pub electricity: f64,
    /// kgCO2 per meal
    pub diet: BTreeMap<DietType, f64>,
    /// kgCO2 per kg of waste
    pub waste: f64,
    /// National average footprint, tonnes CO2 per year
    pub average: f64,
}

impl RegionFactors {
    pub fn diet_factor(&self, diet: DietType) -> Result<f64> {
        self.diet
            .get(&diet)
            .copied()
            .ok_or_else(|| CalcError::InvalidInput(format!("no diet factor for {diet}")))
    }

    fn validate(&self, region: Region) -> Result<()> {
        let named = [
            ("transportation", self.transportation),
            ("electricity", self.electricity),
            ("waste", self.waste),
            ("average", self.average),
        ];
        let diet = self.diet.iter().map(|(d, v)| (d.as_str(), *v));

        for (name, value) in named.into_iter().chain(diet) {
            if !value.is_finite() || value < 0.0 {
                return Err(CalcError::InvalidInput(format!(
                    "{region}: {name} factor must be a non-negative number, got {value}"
                )));
            }
        }

        for diet in DietType::ALL {
            self.diet_factor(diet)?;
        }

        Ok(())
    }
}

/// Per-region emission factors. The built-in table can be swapped for one
/// loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorTable {
    regions: BTreeMap<Region, RegionFactors>,
}

impl Default for FactorTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FactorTable {
    pub fn builtin() -> Self {
        let mut regions = BTreeMap::new();

        regions.insert(
            Region::India,
            region_factors(0.14, 0.82, [0.7, 1.5, 0.5], 0.1, 1.9),
        );
        regions.insert(
            Region::UnitedStates,
            region_factors(0.18, 0.42, [0.8, 1.8, 0.6], 0.12, 15.2),
        );
        regions.insert(
            Region::EuropeanUnion,
            region_factors(0.16, 0.28, [0.75, 1.6, 0.55], 0.09, 6.4),
        );

        FactorTable { regions }
    }

    pub fn new(regions: BTreeMap<Region, RegionFactors>) -> Result<Self> {
        let table = FactorTable { regions };
        table.validate()?;
        Ok(table)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let table: FactorTable = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn region(&self, region: Region) -> Result<&RegionFactors> {
        self.regions
            .get(&region)
            .ok_or_else(|| CalcError::InvalidInput(format!("no emission factors for {region}")))
    }

    pub fn average(&self, region: Region) -> Result<f64> {
        Ok(self.region(region)?.average)
    }

    pub fn regions(&self) -> impl Iterator<Item = (Region, &RegionFactors)> {
        self.regions.iter().map(|(r, f)| (*r, f))
    }

    fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(CalcError::InvalidInput("factor table has no regions".to_string()));
        }
        for (region, factors) in &self.regions {
            factors.validate(*region)?;
        }
        Ok(())
    }
}

fn region_factors(
    transportation: f64,
    electricity: f64,
    [vegetarian, non_vegetarian, vegan]: [f64; 3],
    waste: f64,
    average: f64,
) -> RegionFactors {
    let diet = BTreeMap::from([
        (DietType::Vegetarian, vegetarian),
        (DietType::NonVegetarian, non_vegetarian),
        (DietType::Vegan, vegan),
    ]);

    RegionFactors {
        transportation,
        electricity,
        diet,
        waste,
        average,
    }
}

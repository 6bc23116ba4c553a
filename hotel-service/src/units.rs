use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementType {
    Weight,
    Volume,
    Count,
}

/// Units inventory is tracked in. Each converts to the base unit of its
/// measurement type: grams, milliliters, or single pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasurementUnit {
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "gram")]
    Gram,
    #[serde(rename = "a 100 gram")]
    A100Gram,
    #[serde(rename = "a 150 gram")]
    A150Gram,
    #[serde(rename = "a 200 gram")]
    A200Gram,
    #[serde(rename = "quarter kg")]
    QuarterKg,
    #[serde(rename = "half kg")]
    HalfKg,
    #[serde(rename = "one third kg")]
    OneThirdKg,
    #[serde(rename = "flour pack")]
    FlourPack,
    #[serde(rename = "liter")]
    Liter,
    #[serde(rename = "milliliter")]
    Milliliter,
    #[serde(rename = "juice glass")]
    JuiceGlass,
    #[serde(rename = "tea cup")]
    TeaCup,
    #[serde(rename = "soda botel")]
    SodaBotel,
    #[serde(rename = "plastic soda botel")]
    PlasticSodaBotel,
    #[serde(rename = "piece")]
    Piece,
    #[serde(rename = "bunch")]
    Bunch,
    #[serde(rename = "tray")]
    Tray,
    #[serde(rename = "dozen")]
    Dozen,
    #[serde(rename = "sausage pack")]
    SausagePack,
}

impl MeasurementUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementUnit::Kg => "kg",
            MeasurementUnit::Gram => "gram",
            MeasurementUnit::A100Gram => "a 100 gram",
            MeasurementUnit::A150Gram => "a 150 gram",
            MeasurementUnit::A200Gram => "a 200 gram",
            MeasurementUnit::QuarterKg => "quarter kg",
            MeasurementUnit::HalfKg => "half kg",
            MeasurementUnit::OneThirdKg => "one third kg",
            MeasurementUnit::FlourPack => "flour pack",
            MeasurementUnit::Liter => "liter",
            MeasurementUnit::Milliliter => "milliliter",
            MeasurementUnit::JuiceGlass => "juice glass",
            MeasurementUnit::TeaCup => "tea cup",
            MeasurementUnit::SodaBotel => "soda botel",
            MeasurementUnit::PlasticSodaBotel => "plastic soda botel",
            MeasurementUnit::Piece => "piece",
            MeasurementUnit::Bunch => "bunch",
            MeasurementUnit::Tray => "tray",
            MeasurementUnit::Dozen => "dozen",
            MeasurementUnit::SausagePack => "sausage pack",
        }
    }

    /// Amount of the base unit one of `self` stands for.
    pub fn value(&self) -> f64 {
        match self {
            MeasurementUnit::Kg => 1000.0,
            MeasurementUnit::Gram => 1.0,
            MeasurementUnit::A100Gram => 100.0,
            MeasurementUnit::A150Gram => 150.0,
            MeasurementUnit::A200Gram => 200.0,
            MeasurementUnit::QuarterKg => 250.0,
            MeasurementUnit::HalfKg => 500.0,
            MeasurementUnit::OneThirdKg => 750.0,
            MeasurementUnit::FlourPack => 2000.0,
            MeasurementUnit::Liter => 1000.0,
            MeasurementUnit::Milliliter => 1.0,
            MeasurementUnit::JuiceGlass => 350.0,
            MeasurementUnit::TeaCup => 300.0,
            MeasurementUnit::SodaBotel => 300.0,
            MeasurementUnit::PlasticSodaBotel => 500.0,
            MeasurementUnit::Piece => 1.0,
            MeasurementUnit::Bunch => 1.0,
            MeasurementUnit::Tray => 30.0,
            MeasurementUnit::Dozen => 12.0,
            MeasurementUnit::SausagePack => 22.0,
        }
    }

    pub fn measurement_type(&self) -> MeasurementType {
        match self {
            MeasurementUnit::Kg
            | MeasurementUnit::Gram
            | MeasurementUnit::A100Gram
            | MeasurementUnit::A150Gram
            | MeasurementUnit::A200Gram
            | MeasurementUnit::QuarterKg
            | MeasurementUnit::HalfKg
            | MeasurementUnit::OneThirdKg
            | MeasurementUnit::FlourPack => MeasurementType::Weight,
            MeasurementUnit::Liter
            | MeasurementUnit::Milliliter
            | MeasurementUnit::JuiceGlass
            | MeasurementUnit::TeaCup
            | MeasurementUnit::SodaBotel
            | MeasurementUnit::PlasticSodaBotel => MeasurementType::Volume,
            MeasurementUnit::Piece
            | MeasurementUnit::Bunch
            | MeasurementUnit::Tray
            | MeasurementUnit::Dozen
            | MeasurementUnit::SausagePack => MeasurementType::Count,
        }
    }
}

impl fmt::Display for MeasurementUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_same_measurement_type(a: MeasurementUnit, b: MeasurementUnit) -> bool {
    a.measurement_type() == b.measurement_type()
}

/// Cost of `amount` of `unit` for an item whose `cost` is quoted per `item_unit`.
pub fn issue_cost(cost: f64, item_unit: MeasurementUnit, amount: f64, unit: MeasurementUnit) -> f64 {
    cost * amount * (unit.value() / item_unit.value())
}

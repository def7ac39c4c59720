//! Catalogue of supported LCIA methods.
//!
//! Impact indicators in model files are usually named after an
//! Environmental Footprint method, either by code (`EFV3_CLIMATE_CHANGE`)
//! or by the full `('EF v3.0', category, indicator)` triple. The catalogue
//! maps both to a short label suitable for reports.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EfVersion {
    #[serde(rename = "EF v3.0")]
    V30,
    #[serde(rename = "EF v3.1")]
    V31,
}

impl EfVersion {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            EfVersion::V30 => "EF v3.0",
            EfVersion::V31 => "EF v3.1",
        }
    }

    fn code_prefix(self) -> &'static str {
        match self {
            EfVersion::V30 => "EFV3",
            EfVersion::V31 => "EFV31",
        }
    }
}

struct Entry {
    suffix: &'static str,
    category: &'static str,
    indicator: &'static str,
    short_name: &'static str,
    in_v31: bool,
}

const fn entry(
    suffix: &'static str,
    category: &'static str,
    indicator: &'static str,
    short_name: &'static str,
    in_v31: bool,
) -> Entry {
    Entry {
        suffix,
        category,
        indicator,
        short_name,
        in_v31,
    }
}

const CTUE: &str = "comparative toxic unit for ecosystems (CTUe)";
const CTUH: &str = "comparative toxic unit for human (CTUh)";
const GWP: &str = "global warming potential (GWP100)";

#[rustfmt::skip]
const ENTRIES: &[Entry] = &[
    entry("ACIDIFICATION", "acidification", "accumulated exceedance (AE)", "Acidification (AE)", true),
    entry("CLIMATE_CHANGE", "climate change", GWP, "Climate change (GWP100)", true),
    entry("CLIMATE_CHANGE_BIOGENIC", "climate change: biogenic", GWP, "Climate change: biogenic (GWP100)", true),
    entry("CLIMATE_CHANGE_FOSSIL", "climate change: fossil", GWP, "Climate change: fossil (GWP100)", true),
    entry(
        "CLIMATE_CHANGE_LAND_USE",
        "climate change: land use and land use change",
        GWP,
        "Climate change: land use/land use change (GWP100)",
        true,
    ),
    entry("ECOTOXICITY_FRESHWATER", "ecotoxicity: freshwater", CTUE, "Ecotoxicity: freshwater (CTUe)", true),
    entry(
        "ECOTOXICITY_FRESHWATER_INORGANICS",
        "ecotoxicity: freshwater, inorganics",
        CTUE,
        "Ecotoxicity: freshwater, inorganics (CTUe)",
        true,
    ),
    entry(
        "ECOTOXICITY_FRESHWATER_METALS",
        "ecotoxicity: freshwater, metals",
        CTUE,
        "Ecotoxicity: freshwater, metals (CTUe)",
        false,
    ),
    entry(
        "ECOTOXICITY_FRESHWATER_ORGANICS",
        "ecotoxicity: freshwater, organics",
        CTUE,
        "Ecotoxicity: freshwater, organics (CTUe)",
        true,
    ),
    entry(
        "EUTROPHICATION_FRESHWATER",
        "eutrophication: freshwater",
        "fraction of nutrients reaching freshwater end compartment (P)",
        "Eutrophication: freshwater (kgPeq)",
        true,
    ),
    entry(
        "EUTROPHICATION_MARINE",
        "eutrophication: marine",
        "fraction of nutrients reaching marine end compartment (N)",
        "Eutrophication: marine (N)",
        true,
    ),
    entry(
        "EUTROPHICATION_TERRESTRIAL",
        "eutrophication: terrestrial",
        "accumulated exceedance (AE)",
        "Eutrophication: terrestrial (AE)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_CARCINOGENIC",
        "human toxicity: carcinogenic",
        CTUH,
        "Human toxicity: carcinogenic (CTUh)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_CARCINOGENIC_INORGANICS",
        "human toxicity: carcinogenic, inorganics",
        CTUH,
        "Human toxicity: carcinogenic, inorganics (CTUh)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_CARCINOGENIC_METALS",
        "human toxicity: carcinogenic, metals",
        CTUH,
        "Human toxicity: carcinogenic, metals (CTUh)",
        false,
    ),
    entry(
        "HUMAN_TOXICITY_CARCINOGENIC_ORGANICS",
        "human toxicity: carcinogenic, organics",
        CTUH,
        "Human toxicity: carcinogenic, organics (CTUh)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_NON_CARCINOGENIC",
        "human toxicity: non-carcinogenic",
        CTUH,
        "Human toxicity: non-carcinogenic (CTUh)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_NON_CARCINOGENIC_INORGANICS",
        "human toxicity: non-carcinogenic, inorganics",
        CTUH,
        "Human toxicity: non-carcinogenic, inorganics (CTUh)",
        true,
    ),
    entry(
        "HUMAN_TOXICITY_NON_CARCINOGENIC_METALS",
        "human toxicity: non-carcinogenic, metals",
        CTUH,
        "Human toxicity: non-carcinogenic, metals (CTUh)",
        false,
    ),
    entry(
        "HUMAN_TOXICITY_NON_CARCINOGENIC_ORGANICS",
        "human toxicity: non-carcinogenic, organics",
        CTUH,
        "Human toxicity: non-carcinogenic, organics (CTUh)",
        true,
    ),
    entry(
        "IONISING_RADIATION",
        "ionising radiation: human health",
        "human exposure efficiency relative to u235",
        "Ionising radiation: human health (kBqU235)",
        true,
    ),
    entry("LAND_USE", "land use", "soil quality index", "Land use (soil quality index)", true),
    entry(
        "MATERIAL_RESOURCES",
        "material resources: metals/minerals",
        "abiotic depletion potential (ADP): elements (ultimate reserves)",
        "Resource use, metals and minerals (kgSbeq)",
        true,
    ),
    entry(
        "ENERGY_RESOURCES",
        "energy resources: non-renewable",
        "abiotic depletion potential (ADP): fossil fuels",
        "Energy use, energy carriers (MJ)",
        true,
    ),
    entry("OZONE_DEPLETION", "ozone depletion", "ozone depletion potential (ODP)", "Ozone depletion (ODP)", true),
    entry(
        "PARTICULATE_MATTER_FORMATION",
        "particulate matter formation",
        "impact on human health",
        "Particulate matter formation: impact on human health (disease incidences)",
        true,
    ),
    entry(
        "PHOTOCHEMICAL_OZONE_FORMATION",
        "photochemical oxidant formation: human health",
        "tropospheric ozone concentration increase",
        "Photochemical ozone formation (kgNMVOCeq)",
        true,
    ),
    entry(
        "WATER_USE",
        "water use",
        "user deprivation potential (deprivation-weighted water consumption)",
        "Depr.-weighted water cons. (kg world eq. deprived)",
        true,
    ),
];

/// One indicator of one EF method version
#[derive(Clone, Copy)]
pub struct ImpactMethod {
    version: EfVersion,
    entry: &'static Entry,
}

impl ImpactMethod {
    /// Every known method, EF v3.0 first
    pub fn all() -> impl Iterator<Item = ImpactMethod> {
        let v30 = ENTRIES.iter().map(|entry| ImpactMethod {
            version: EfVersion::V30,
            entry,
        });
        let v31 = ENTRIES
            .iter()
            .filter(|e| e.in_v31)
            .map(|entry| ImpactMethod {
                version: EfVersion::V31,
                entry,
            });
        v30.chain(v31)
    }

    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all().find(|m| m.code() == code)
    }

    /// Parse a `('EF v3.0', category, indicator)` triple; typographic quotes are accepted
    #[must_use]
    pub fn from_full_name(name: &str) -> Option<Self> {
        let normalized = normalize_quotes(name);
        Self::all().find(|m| m.full_name() == normalized)
    }

    /// Resolve an indicator name given either as a code or a full name
    #[must_use]
    pub fn lookup(name: &str) -> Option<Self> {
        Self::from_code(name).or_else(|| Self::from_full_name(name))
    }

    #[must_use]
    pub fn version(&self) -> EfVersion {
        self.version
    }

    #[must_use]
    pub fn code(&self) -> String {
        format!("{}_{}", self.version.code_prefix(), self.entry.suffix)
    }

    #[must_use]
    pub fn category(&self) -> &'static str {
        self.entry.category
    }

    #[must_use]
    pub fn indicator(&self) -> &'static str {
        self.entry.indicator
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!(
            "('{}', '{}', '{}')",
            self.version.label(),
            self.entry.category,
            self.entry.indicator
        )
    }

    #[must_use]
    pub fn short_name(&self) -> &'static str {
        self.entry.short_name
    }
}

impl fmt::Debug for ImpactMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ImpactMethod").field(&self.code()).finish()
    }
}

impl PartialEq for ImpactMethod {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version && std::ptr::eq(self.entry, other.entry)
    }
}

impl Eq for ImpactMethod {}

/// Short label for an indicator name, or the name itself when it is not a known method
#[must_use]
pub fn display_name(indicator: &str) -> String {
    ImpactMethod::lookup(indicator)
        .map(|m| m.short_name().to_string())
        .unwrap_or_else(|| indicator.to_string())
}

fn normalize_quotes(name: &str) -> String {
    name.replace(['\u{2018}', '\u{2019}'], "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_sizes() {
        let all: Vec<_> = ImpactMethod::all().collect();
        let v30 = all.iter().filter(|m| m.version() == EfVersion::V30).count();
        let v31 = all.iter().filter(|m| m.version() == EfVersion::V31).count();
        assert_eq!(v30, 28);
        assert_eq!(v31, 25);
    }

    #[test]
    fn test_code_and_full_name_agree() {
        let method = ImpactMethod::from_code("EFV3_CLIMATE_CHANGE").unwrap();
        assert_eq!(
            method.full_name(),
            "('EF v3.0', 'climate change', 'global warming potential (GWP100)')"
        );
        assert_eq!(ImpactMethod::from_full_name(&method.full_name()), Some(method));
        assert_eq!(method.short_name(), "Climate change (GWP100)");
    }

    #[test]
    fn test_typographic_quotes() {
        let name = "(\u{2018}EF v3.1\u{2019}, \u{2018}land use\u{2019}, \u{2018}soil quality index\u{2019})";
        let method = ImpactMethod::lookup(name).unwrap();
        assert_eq!(method.code(), "EFV31_LAND_USE");
    }

    #[test]
    fn test_metals_only_in_v30() {
        assert!(ImpactMethod::from_code("EFV3_ECOTOXICITY_FRESHWATER_METALS").is_some());
        assert!(ImpactMethod::from_code("EFV31_ECOTOXICITY_FRESHWATER_METALS").is_none());
    }

    #[test]
    fn test_display_name_falls_back() {
        assert_eq!(
            display_name("EFV31_WATER_USE"),
            "Depr.-weighted water cons. (kg world eq. deprived)"
        );
        assert_eq!(display_name("custom_indicator"), "custom_indicator");
    }
}

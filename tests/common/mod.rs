//! Common test utilities: an occurrence-style parameter set and its catalog

#![allow(dead_code)]

use search_bridge::{SearchParameter, SortField, StaticFieldCatalog, ValueType, Vocabulary};
use std::sync::{Arc, Once};
use strum::{EnumIter, IntoStaticStr};

pub const BASIS_OF_RECORD: Vocabulary = &[
    "PRESERVED_SPECIMEN",
    "FOSSIL_SPECIMEN",
    "LIVING_SPECIMEN",
    "HUMAN_OBSERVATION",
    "MACHINE_OBSERVATION",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OccurrenceParameter {
    Country,
    Year,
    EventDate,
    BasisOfRecord,
    DatasetKey,
    Elevation,
    Geometry,
    ScientificName,
    Unmapped,
}

impl SearchParameter for OccurrenceParameter {
    fn name(&self) -> &'static str {
        (*self).into()
    }

    fn value_type(&self) -> ValueType {
        match self {
            OccurrenceParameter::Year => ValueType::Integer,
            OccurrenceParameter::EventDate => ValueType::Date,
            OccurrenceParameter::BasisOfRecord => ValueType::Enum(BASIS_OF_RECORD),
            OccurrenceParameter::DatasetKey => ValueType::Uuid,
            OccurrenceParameter::Elevation => ValueType::Double,
            _ => ValueType::Text,
        }
    }
}

pub fn catalog() -> StaticFieldCatalog<OccurrenceParameter> {
    StaticFieldCatalog::builder()
        .field(OccurrenceParameter::Country, "country")
        .field(OccurrenceParameter::Year, "year")
        .date_field(OccurrenceParameter::EventDate, "eventDate")
        .field(OccurrenceParameter::BasisOfRecord, "basisOfRecord")
        .field(OccurrenceParameter::DatasetKey, "datasetKey")
        .field(OccurrenceParameter::Elevation, "elevation")
        .spatial_field(OccurrenceParameter::Geometry, "scoordinates")
        .field(OccurrenceParameter::ScientificName, "scientificName")
        .cardinality("basisOfRecord", BASIS_OF_RECORD.len())
        .cardinality("country", 250)
        .sort(SortField::desc("created"))
        .highlight_field("scientificName")
        .exclude_result_field("all")
        .build()
}

pub fn shared_catalog() -> Arc<StaticFieldCatalog<OccurrenceParameter>> {
    Arc::new(catalog())
}

static TRACING: Once = Once::new();

/// Install a test-writer subscriber once per test binary
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .try_init();
    });
}

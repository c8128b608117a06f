//! Static filter catalog

use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    CategoricalMulti,
    CategoricalSingle,
    NumericRange,
    TextListPrefix,
    TextListContains,
    TextListExact,
}

impl FilterKind {
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::CategoricalMulti | Self::CategoricalSingle)
    }

    pub fn is_text_list(self) -> bool {
        matches!(
            self,
            Self::TextListPrefix | Self::TextListContains | Self::TextListExact
        )
    }
}

/// Scalar type of the values a filter binds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    Text,
    Integer,
    Number,
}

/// Position of a filter on a drill-down axis; higher level is more specific
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Hierarchy {
    pub axis: &'static str,
    pub level: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    /// Stable key used by the HTTP API
    pub key: &'static str,
    /// Display label
    pub label: &'static str,
    /// Column expression. Static text, never derived from input.
    pub column: &'static str,
    pub kind: FilterKind,
    pub case_sensitive: bool,
    pub param_prefix: char,
    pub value_type: ScalarType,
    pub hierarchy: Option<Hierarchy>,
}

const UKTZED_AXIS: &str = "uktzed";

/// All filters in predicate emission order
pub static CATALOG: &[FilterSpec] = &[
    FilterSpec {
        key: "direction",
        label: "Напрямок",
        column: "napryamok",
        kind: FilterKind::CategoricalMulti,
        case_sensitive: true,
        param_prefix: 'd',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "years",
        label: "Рік",
        column: "EXTRACT(YEAR FROM data_deklaracii)",
        kind: FilterKind::CategoricalMulti,
        case_sensitive: true,
        param_prefix: 'y',
        value_type: ScalarType::Integer,
        hierarchy: None,
    },
    FilterSpec {
        key: "countries",
        label: "Країна-партнер",
        column: "kraina_partner",
        kind: FilterKind::CategoricalMulti,
        case_sensitive: true,
        param_prefix: 'c',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "customs_office",
        label: "Митниця",
        column: "mytnytsia",
        kind: FilterKind::CategoricalSingle,
        case_sensitive: false,
        param_prefix: 'm',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "uktzed_group",
        label: "Група УКТЗЕД",
        column: "SUBSTR(kod_uktzed, 1, 2)",
        kind: FilterKind::CategoricalMulti,
        case_sensitive: true,
        param_prefix: 'g',
        value_type: ScalarType::Text,
        hierarchy: Some(Hierarchy {
            axis: UKTZED_AXIS,
            level: 1,
        }),
    },
    FilterSpec {
        key: "uktzed_position",
        label: "Товарна позиція УКТЗЕД",
        column: "SUBSTR(kod_uktzed, 1, 4)",
        kind: FilterKind::CategoricalMulti,
        case_sensitive: true,
        param_prefix: 'p',
        value_type: ScalarType::Text,
        hierarchy: Some(Hierarchy {
            axis: UKTZED_AXIS,
            level: 2,
        }),
    },
    FilterSpec {
        key: "weight",
        label: "Вага нетто, кг",
        column: "vaha_netto_kg",
        kind: FilterKind::NumericRange,
        case_sensitive: true,
        param_prefix: 'w',
        value_type: ScalarType::Number,
        hierarchy: None,
    },
    FilterSpec {
        key: "customs_value",
        label: "Митна вартість, грн",
        column: "mytna_vartist_hrn",
        kind: FilterKind::NumericRange,
        case_sensitive: true,
        param_prefix: 'v',
        value_type: ScalarType::Number,
        hierarchy: None,
    },
    FilterSpec {
        key: "uktzed_codes",
        label: "Коди УКТЗЕД",
        column: "kod_uktzed",
        kind: FilterKind::TextListPrefix,
        case_sensitive: true,
        param_prefix: 'k',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "companies",
        label: "Назва компанії",
        column: "nazva_kompanii",
        kind: FilterKind::TextListContains,
        case_sensitive: false,
        param_prefix: 'n',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "goods",
        label: "Опис товару",
        column: "opis_tovaru",
        kind: FilterKind::TextListContains,
        case_sensitive: false,
        param_prefix: 'o',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "trademarks",
        label: "Торгова марка",
        column: "torgova_marka",
        kind: FilterKind::TextListContains,
        case_sensitive: false,
        param_prefix: 't',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
    FilterSpec {
        key: "edrpou",
        label: "Код ЄДРПОУ",
        column: "kod_edrpou",
        kind: FilterKind::TextListExact,
        case_sensitive: true,
        param_prefix: 'e',
        value_type: ScalarType::Text,
        hierarchy: None,
    },
];

/// Look up a filter by its API key
pub fn find(key: &str) -> Option<&'static FilterSpec> {
    CATALOG.iter().find(|spec| spec.key == key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_keys_and_prefixes_unique() {
        let keys: HashSet<_> = CATALOG.iter().map(|s| s.key).collect();
        let prefixes: HashSet<_> = CATALOG.iter().map(|s| s.param_prefix).collect();
        assert_eq!(keys.len(), CATALOG.len());
        assert_eq!(prefixes.len(), CATALOG.len());
    }

    #[test]
    fn test_find() {
        let spec = find("customs_office").unwrap();
        assert_eq!(spec.kind, FilterKind::CategoricalSingle);
        assert!(!spec.case_sensitive);
        assert!(find("nope").is_none());
    }

    #[test]
    fn test_uktzed_hierarchy_levels() {
        let group = find("uktzed_group").and_then(|s| s.hierarchy).unwrap();
        let position = find("uktzed_position").and_then(|s| s.hierarchy).unwrap();
        assert_eq!(group.axis, position.axis);
        assert!(position.level > group.level);
    }
}

//! Search filter option sets.
//!
//! Every filter the registry understands is a closed set of short codes
//! (`NSW`, `PRV`, `ACT`, ...). Codes are what travel on the wire and in the
//! address bar; labels are for display. Anything outside a set is rejected
//! at parse time, so a [`SearchFilters`] value can only ever hold members of
//! its enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::LookupError;

/// Declares a code-backed option enum with its wire codes and display labels.
macro_rules! option_set {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => ($code:literal, $label:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every option, in display order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Wire/URL code (e.g. `"NSW"`).
            pub fn code(self) -> &'static str {
                match self {
                    $( $name::$variant => $code ),+
                }
            }

            /// Human-readable label.
            pub fn label(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }

            /// Parse a wire code. Matching is exact; unknown codes yield `None`.
            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $( $code => Some($name::$variant), )+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.code())
            }
        }

        impl FromStr for $name {
            type Err = LookupError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Self::from_code(s).ok_or_else(|| {
                    LookupError::InvalidInput(format!(
                        "unknown {} '{s}'",
                        stringify!($name)
                    ))
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

option_set! {
    /// Australian state or territory of a business's main address.
    AustralianState {
        Nsw => ("NSW", "New South Wales"),
        Vic => ("VIC", "Victoria"),
        Qld => ("QLD", "Queensland"),
        Wa => ("WA", "Western Australia"),
        Sa => ("SA", "South Australia"),
        Tas => ("TAS", "Tasmania"),
        Nt => ("NT", "Northern Territory"),
        Act => ("ACT", "Australian Capital Territory"),
        Aat => ("AAT", "Australian Antarctic Territory"),
    }
}

option_set! {
    /// Registered entity type.
    EntityType {
        Individual => ("IND", "Individual/Sole Trader"),
        PrivateCompany => ("PRV", "Australian Private Company"),
        PublicCompany => ("PUB", "Australian Public Company"),
        FamilyPartnership => ("FPT", "Family Partnership"),
        OtherPartnership => ("PTR", "Other Partnership"),
        OtherTrust => ("TRT", "Other Trust"),
        DiscretionaryTradingTrust => ("DTT", "Discretionary Trading Trust"),
        DiscretionaryInvestmentTrust => ("DIT", "Discretionary Investment Trust"),
        SelfManagedSuperFund => ("SMF", "Self-Managed Super Fund"),
        Government => ("GOV", "Government Entity"),
        StateGovernment => ("SGE", "State Government Entity"),
        StrataTitle => ("STR", "Strata-title"),
        OtherIncorporated => ("OIE", "Other Incorporated Entity"),
        OtherUnincorporated => ("UIE", "Other Unincorporated Entity"),
        Cooperative => ("COP", "Co-operative"),
    }
}

option_set! {
    /// ABN registration status.
    AbnStatus {
        Active => ("ACT", "Active"),
        Cancelled => ("CAN", "Cancelled"),
    }
}

option_set! {
    /// Query strategy the backend uses to run a search.
    Technique {
        /// Default strategy.
        Native => ("native", "Native"),
        Optimized => ("optimized", "Optimized"),
    }
}

option_set! {
    /// Search surface: the filtered form or the AI chat.
    SearchMode {
        /// Default mode.
        Standard => ("standard", "Standard"),
        Ai => ("ai", "AI"),
    }
}

impl Default for Technique {
    fn default() -> Self {
        Self::Native
    }
}

impl Default for SearchMode {
    fn default() -> Self {
        Self::Standard
    }
}

/// Default page size for result lists.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size the registry serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Names one of the [`SearchFilters`] fields.
///
/// The string form matches the URL parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    State,
    EntityType,
    AbnStatus,
    Technique,
}

impl FilterKey {
    /// Every filter, in URL order.
    pub const ALL: &'static [FilterKey] = &[
        FilterKey::State,
        FilterKey::EntityType,
        FilterKey::AbnStatus,
        FilterKey::Technique,
    ];

    /// URL parameter name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::EntityType => "entityType",
            Self::AbnStatus => "abnStatus",
            Self::Technique => "technique",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active search filters.
///
/// `None` means "no filter". The technique is never absent: unset and
/// `native` are the same thing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<AustralianState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abn_status: Option<AbnStatus>,
    #[serde(default)]
    pub technique: Technique,
}

impl SearchFilters {
    /// No filters, native technique.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state filter.
    pub fn state(mut self, state: AustralianState) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the entity type filter.
    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_type = Some(entity_type);
        self
    }

    /// Set the ABN status filter.
    pub fn abn_status(mut self, status: AbnStatus) -> Self {
        self.abn_status = Some(status);
        self
    }

    /// Set the search technique.
    pub fn technique(mut self, technique: Technique) -> Self {
        self.technique = technique;
        self
    }

    /// Assign one filter from its code.
    ///
    /// An empty or unknown value clears the filter (the technique falls back
    /// to native). Returns whether the stored value changed.
    pub fn set(&mut self, key: FilterKey, value: &str) -> bool {
        let before = *self;
        let value = value.trim();
        match key {
            FilterKey::State => self.state = AustralianState::from_code(value),
            FilterKey::EntityType => self.entity_type = EntityType::from_code(value),
            FilterKey::AbnStatus => self.abn_status = AbnStatus::from_code(value),
            FilterKey::Technique => {
                self.technique = Technique::from_code(value).unwrap_or_default()
            }
        }
        *self != before
    }

    /// Current code for one filter, or `None` when unset.
    ///
    /// The technique reports `None` while it holds the default.
    pub fn get(&self, key: FilterKey) -> Option<&'static str> {
        match key {
            FilterKey::State => self.state.map(AustralianState::code),
            FilterKey::EntityType => self.entity_type.map(EntityType::code),
            FilterKey::AbnStatus => self.abn_status.map(AbnStatus::code),
            FilterKey::Technique => {
                (self.technique != Technique::default()).then(|| self.technique.code())
            }
        }
    }

    /// Whether no filter is set (technique at its default).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_means_nothing_set() {
        assert!(SearchFilters::new().is_empty());
        assert!(SearchFilters::new().technique(Technique::Native).is_empty());
        assert!(!SearchFilters::new().state(AustralianState::Vic).is_empty());
        assert!(!SearchFilters::new().technique(Technique::Optimized).is_empty());
    }

    #[test]
    fn codes_round_trip() {
        for state in AustralianState::ALL {
            assert_eq!(AustralianState::from_code(state.code()), Some(*state));
        }
        for entity in EntityType::ALL {
            assert_eq!(EntityType::from_code(entity.code()), Some(*entity));
        }
        assert_eq!(EntityType::ALL.len(), 15);
        assert_eq!(AustralianState::ALL.len(), 9);
    }

    #[test]
    fn code_matching_is_exact() {
        assert_eq!(AustralianState::from_code("nsw"), None);
        assert_eq!(AustralianState::from_code(""), None);
        assert!("XYZ".parse::<AbnStatus>().is_err());
    }

    #[test]
    fn act_is_both_a_state_and_a_status() {
        assert_eq!(AustralianState::from_code("ACT"), Some(AustralianState::Act));
        assert_eq!(AbnStatus::from_code("ACT"), Some(AbnStatus::Active));
        assert_eq!(AbnStatus::Active.label(), "Active");
    }

    #[test]
    fn set_unknown_value_clears_filter() {
        let mut filters = SearchFilters::new().state(AustralianState::Vic);
        assert!(filters.set(FilterKey::State, "Victoria"));
        assert_eq!(filters.state, None);
    }

    #[test]
    fn set_technique_empty_means_native() {
        let mut filters = SearchFilters::new().technique(Technique::Optimized);
        filters.set(FilterKey::Technique, "");
        assert_eq!(filters.technique, Technique::Native);
        assert_eq!(filters.get(FilterKey::Technique), None);
    }

    #[test]
    fn serde_uses_codes() {
        let filters = SearchFilters::new()
            .state(AustralianState::Qld)
            .entity_type(EntityType::PrivateCompany);
        let json = serde_json::to_value(filters).unwrap();
        assert_eq!(json["state"], "QLD");
        assert_eq!(json["entityType"], "PRV");
        assert_eq!(json["technique"], "native");
        assert!(json.get("abnStatus").is_none());
    }
}

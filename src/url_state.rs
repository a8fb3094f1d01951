//! Address-bar query string ⇄ [`SearchState`].
//!
//! The results page keeps its whole state in the URL:
//! `q`, `state`, `entityType`, `abnStatus`, `page`, `limit`, `mode`,
//! `technique`. All are optional.
//!
//! - [`decode`] never fails. Absent, empty, unknown or malformed values
//!   fall back to the default for that field.
//! - [`encode`] writes only fields that differ from their default, in a
//!   fixed order, so equal states always produce the same string and
//!   `decode(&encode(s)) == s`.

use url::form_urlencoded;

use crate::types::{
    AbnStatus, AustralianState, EntityType, PageRequest, SearchFilters, SearchMode, SearchState,
    Technique,
};

const Q: &str = "q";
const STATE: &str = "state";
const ENTITY_TYPE: &str = "entityType";
const ABN_STATUS: &str = "abnStatus";
const PAGE: &str = "page";
const LIMIT: &str = "limit";
const MODE: &str = "mode";
const TECHNIQUE: &str = "technique";

/// Parse a query string (with or without a leading `?`).
///
/// The first occurrence of a repeated parameter wins.
pub fn decode(query_string: &str) -> SearchState {
    let raw = query_string.strip_prefix('?').unwrap_or(query_string);

    let mut query: Option<String> = None;
    let mut state: Option<Option<AustralianState>> = None;
    let mut entity_type: Option<Option<EntityType>> = None;
    let mut abn_status: Option<Option<AbnStatus>> = None;
    let mut page: Option<Option<u32>> = None;
    let mut limit: Option<Option<u32>> = None;
    let mut mode: Option<Option<SearchMode>> = None;
    let mut technique: Option<Option<Technique>> = None;

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        let value = value.trim();
        match key.as_ref() {
            Q => {
                query.get_or_insert_with(|| value.to_string());
            }
            STATE => {
                state.get_or_insert(AustralianState::from_code(value));
            }
            ENTITY_TYPE => {
                entity_type.get_or_insert(EntityType::from_code(value));
            }
            ABN_STATUS => {
                abn_status.get_or_insert(AbnStatus::from_code(value));
            }
            PAGE => {
                page.get_or_insert(parse_positive(value));
            }
            LIMIT => {
                limit.get_or_insert(parse_positive(value).filter(|l| PageRequest::is_valid_limit(*l)));
            }
            MODE => {
                mode.get_or_insert(SearchMode::from_code(value));
            }
            TECHNIQUE => {
                technique.get_or_insert(Technique::from_code(value));
            }
            _ => {}
        }
    }

    let defaults = PageRequest::default();
    SearchState {
        query: query.unwrap_or_default(),
        filters: SearchFilters {
            state: state.flatten(),
            entity_type: entity_type.flatten(),
            abn_status: abn_status.flatten(),
            technique: technique.flatten().unwrap_or_default(),
        },
        pagination: PageRequest::new(
            page.flatten().unwrap_or(defaults.page()),
            limit.flatten().unwrap_or(defaults.limit()),
        ),
        mode: mode.flatten().unwrap_or_default(),
    }
}

/// Serialize `state` into the minimal query string (no leading `?`).
///
/// The default state encodes to the empty string.
pub fn encode(state: &SearchState) -> String {
    let defaults = PageRequest::default();
    let mut out = form_urlencoded::Serializer::new(String::new());

    let query = state.query();
    if !query.is_empty() {
        out.append_pair(Q, query);
    }
    if let Some(s) = state.filters.state {
        out.append_pair(STATE, s.code());
    }
    if let Some(e) = state.filters.entity_type {
        out.append_pair(ENTITY_TYPE, e.code());
    }
    if let Some(a) = state.filters.abn_status {
        out.append_pair(ABN_STATUS, a.code());
    }
    if state.pagination.page() != defaults.page() {
        out.append_pair(PAGE, &state.pagination.page().to_string());
    }
    if state.pagination.limit() != defaults.limit() {
        out.append_pair(LIMIT, &state.pagination.limit().to_string());
    }
    if state.mode != SearchMode::default() {
        out.append_pair(MODE, state.mode.code());
    }
    if state.filters.technique != Technique::default() {
        out.append_pair(TECHNIQUE, state.filters.technique.code());
    }
    out.finish()
}

/// Positive integer, or `None` for zero, negatives, fractions and junk.
fn parse_positive(value: &str) -> Option<u32> {
    value.parse::<u32>().ok().filter(|n| *n >= 1)
}

impl SearchState {
    /// Shorthand for [`decode`].
    pub fn from_query_string(query_string: &str) -> Self {
        decode(query_string)
    }

    /// Shorthand for [`encode`].
    pub fn to_query_string(&self) -> String {
        encode(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DEFAULT_PAGE_SIZE, FilterKey};

    #[test]
    fn decode_bakery_scenario() {
        let state = decode("q=bakery&state=NSW&page=3");
        assert_eq!(state.query(), "bakery");
        assert_eq!(state.filters.state, Some(AustralianState::Nsw));
        assert_eq!(state.filters.entity_type, None);
        assert_eq!(state.filters.abn_status, None);
        assert_eq!(state.filters.technique, Technique::Native);
        assert_eq!(state.pagination.page(), 3);
        assert_eq!(state.pagination.limit(), DEFAULT_PAGE_SIZE);
        assert_eq!(state.mode, SearchMode::Standard);
    }

    #[test]
    fn decode_empty_is_default() {
        assert_eq!(decode(""), SearchState::default());
        assert_eq!(decode("?"), SearchState::default());
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let state = decode("page=-2&limit=abc&state=Narnia&mode=turbo&technique=&entityType=prv");
        assert_eq!(state, SearchState::default());

        assert_eq!(decode("page=0").pagination.page(), 1);
        assert_eq!(decode("page=2.5").pagination.page(), 1);
        assert_eq!(decode("limit=1000").pagination.limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn decode_accepts_leading_question_mark_and_encoding() {
        let state = decode("?q=fish+%26+chips&mode=ai");
        assert_eq!(state.query(), "fish & chips");
        assert_eq!(state.mode, SearchMode::Ai);
    }

    #[test]
    fn first_occurrence_wins() {
        let state = decode("state=VIC&state=QLD");
        assert_eq!(state.filters.state, Some(AustralianState::Vic));
    }

    #[test]
    fn encode_default_is_empty() {
        assert_eq!(encode(&SearchState::default()), "");
    }

    #[test]
    fn encode_is_minimal_and_ordered() {
        let mut state = SearchState::new().with_query("bakery");
        state.set_filter(FilterKey::Technique, "optimized");
        state.set_filter(FilterKey::State, "SA");
        state.set_page(2);
        assert_eq!(encode(&state), "q=bakery&state=SA&page=2&technique=optimized");
    }

    #[test]
    fn round_trip_non_default_fields() {
        let state = SearchState::new()
            .with_query("a&b=c")
            .with_filters(
                SearchFilters::new()
                    .state(AustralianState::Tas)
                    .entity_type(EntityType::Cooperative)
                    .abn_status(AbnStatus::Cancelled)
                    .technique(Technique::Optimized),
            )
            .with_page(7)
            .with_limit(50)
            .with_mode(SearchMode::Ai);
        assert_eq!(decode(&encode(&state)), state);
    }

    #[test]
    fn explicit_defaults_decode_like_absent() {
        assert_eq!(
            decode("page=1&limit=20&mode=standard&technique=native"),
            SearchState::default()
        );
    }
}

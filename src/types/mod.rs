//! Public types for the abn-lookup API.

mod business;
mod filters;
mod params;
mod response;

pub use business::{ABN_LEN, Business, BusinessName, normalize_abn};
pub use filters::{
    AbnStatus, AustralianState, DEFAULT_PAGE_SIZE, EntityType, FilterKey, MAX_PAGE_SIZE,
    SearchFilters, SearchMode, Technique,
};
pub use params::{PageRequest, SearchState};
pub use response::{
    ApiResponse, BusinessDetailResponse, PaginatedResponse, Pagination, SearchMeta,
    SearchResponse,
};

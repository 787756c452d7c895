//! Record parser
//!
//! Pure functions that turn raw responses into records:
//! - [`parse_api_response`] / [`clean_api_record`] for the search API
//! - [`parse_detail_body`] for detail pages
//!
//! Nothing here touches the network or shared state.

mod api;
mod detail;

pub use api::{clean_api_record, parse_api_response, resolve_detail_url, ApiCodeError, ApiPage};
pub use detail::{
    parse_detail_body, FIELD_INFO_DATE, FIELD_PAGE_TITLE, FIELD_PROJECT_CODE, MAX_FULL_TEXT_CHARS,
    MAX_KEY_CHARS, MAX_LIST_VALUE_CHARS,
};

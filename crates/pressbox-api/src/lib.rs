#![forbid(unsafe_code)]
//! Pressbox wire contract: machine-readable error taxonomy, response DTOs,
//! and query-parameter parsing shared by the server and its clients.

mod dto;
mod errors;
mod params;

pub use dto::{
    AuthorDto, CommentDto, CommentModerationDto, CommentRequestDto, CreatePostRequestDto,
    EditorActionDto, LoginRequestDto, LoginResponseDto, PostDetailDto, PostListItemDto,
    RegisterRequestDto, SearchHitDto, SearchResponseDto, SessionUserDto, SlugCheckDto,
    UpdatePostRequestDto, ViewTotalsDto,
};
pub use errors::{ApiError, ApiErrorCode};
pub use params::{
    parse_list_posts_params, parse_search_params, ListPostsParams, SearchParams,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, MIN_SEARCH_QUERY_LEN,
};

pub const API_VERSION: &str = "v1";
pub const CRATE_NAME: &str = "pressbox-api";

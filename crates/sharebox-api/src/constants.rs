/// Prefix of every API route.
pub const API_PREFIX: &str = "/api";

/// Cookie carrying the access token when no `Authorization` header is sent.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Multipart field holding the uploaded file.
pub const FILE_FIELD: &str = "file";

/// Route under which the local store's objects are served.
pub const LOCAL_MEDIA_ROUTE: &str = "/media";

/// Headroom above the upload limit for multipart framing.
pub const MULTIPART_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Cheap structural sanity check for a bearer token: exactly three
/// dot-separated segments, i.e. exactly two `.` characters.
///
/// This is syntactic only. Claims are never inspected; the sole source of
/// truth for validity is the backend's acceptance of the token on a live
/// call. The check exists to keep obvious garbage out of the session store
/// and the persistent cookies.
pub fn is_valid_token(token: &str) -> bool {
    token.bytes().filter(|&b| b == b'.').count() == 2
}

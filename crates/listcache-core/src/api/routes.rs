//! Route builders for the shopping-list backend.
//!
//! Every builder returns a path relative to the API base (leading slash,
//! no base). `join_api` glues the two together.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Shop used for new lists and for list ids with no known shop.
pub const DEFAULT_SHOP_ID: &str = "NO-TR-001";

/// Known list ids and the shop they belong to.
/// List ids do not encode their shop, so the backend needs it passed along.
const SHOP_BY_LIST_ID: &[(&str, &str)] = &[
    ("abc123", "NO-TR-001"),
    ("def456", "NO-TR-001"),
    ("ghi789", "NO-OS-001"),
    ("jkl012", "NO-BG-001"),
];

/// Look up the shop a list belongs to, falling back to the default shop
pub fn shop_id_for_list(list_id: &str) -> &'static str {
    SHOP_BY_LIST_ID
        .iter()
        .find(|(id, _)| *id == list_id)
        .map(|(_, shop)| *shop)
        .unwrap_or(DEFAULT_SHOP_ID)
}

/// Characters escaped in a path or query component: everything except the
/// set JavaScript's `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode a single path or query component
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// Join the API base and a route, collapsing slashes at the seam
pub fn join_api(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

pub fn lists_route(shop_id: &str) -> String {
    format!("/lists_get?shopId={}", encode_component(shop_id))
}

pub fn list_route(list_id: &str) -> String {
    format!(
        "/list_get?listId={}&shopId={}",
        encode_component(list_id),
        shop_id_for_list(list_id)
    )
}

pub fn item_update_route(list_id: &str, item_id: &str) -> String {
    format!(
        "/item_update/{}/{}",
        encode_component(list_id),
        encode_component(item_id)
    )
}

pub fn list_complete_route(list_id: &str) -> String {
    format!("/list_complete/{}", encode_component(list_id))
}

pub fn list_create_route(shop_id: &str) -> String {
    format!("/list_create?shopId={}", encode_component(shop_id))
}

pub fn list_delete_route(list_id: &str) -> String {
    format!(
        "/list_delete/{}?shopId={}",
        encode_component(list_id),
        shop_id_for_list(list_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_api_collapses_slashes() {
        assert_eq!(join_api("/api/", "/lists_get"), "/api/lists_get");
        assert_eq!(join_api("http://host/api", "item_update/1/2"), "http://host/api/item_update/1/2");
        assert_eq!(join_api("http://host/api///", "//x"), "http://host/api/x");
    }

    #[test]
    fn test_encode_component() {
        assert_eq!(encode_component("abc123"), "abc123");
        assert_eq!(encode_component("a b/c"), "a%20b%2Fc");
        assert_eq!(encode_component("æ"), "%C3%A6");
        assert_eq!(encode_component("it's(ok)"), "it's(ok)");
        assert_eq!(encode_component("a&b=c?d#e"), "a%26b%3Dc%3Fd%23e");
    }

    #[test]
    fn test_shop_lookup() {
        assert_eq!(shop_id_for_list("ghi789"), "NO-OS-001");
        assert_eq!(shop_id_for_list("unknown"), DEFAULT_SHOP_ID);
    }

    #[test]
    fn test_routes() {
        assert_eq!(item_update_route("1", "2"), "/item_update/1/2");
        assert_eq!(list_complete_route("l 1"), "/list_complete/l%201");
        assert_eq!(list_route("jkl012"), "/list_get?listId=jkl012&shopId=NO-BG-001");
        assert_eq!(list_delete_route("abc123"), "/list_delete/abc123?shopId=NO-TR-001");
        assert_eq!(lists_route("NO-TR-001"), "/lists_get?shopId=NO-TR-001");
        assert_eq!(list_create_route("NO-OS-001"), "/list_create?shopId=NO-OS-001");
    }
}

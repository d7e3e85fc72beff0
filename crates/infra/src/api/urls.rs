//! URL construction and parsing for the upstream REST layout.
//!
//! The upstream keys every resource by a trailing path segment
//! (`.../pokemon/25/`) and pages its index with `offset`/`limit` query
//! parameters. Canonical URLs keep the trailing slash so cache keys stay
//! stable across call sites.

/// Canonical URL for one entity: `{base}/{resource}/{id}/`.
pub fn entity_url(base: &str, resource: &str, id: u32) -> String {
    format!("{}/{}/{}/", base.trim_end_matches('/'), resource, id)
}

/// Index page URL: `{base}/{resource}/?offset={offset}&limit={limit}`.
pub fn index_url(base: &str, resource: &str, offset: u64, limit: u64) -> String {
    format!("{}/{}/?offset={}&limit={}", base.trim_end_matches('/'), resource, offset, limit)
}

/// Parse the numeric ID out of a resource URL's trailing path segment.
pub fn trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_url_keeps_one_trailing_slash() {
        assert_eq!(
            entity_url("https://pokeapi.co/api/v2/", "pokemon", 25),
            "https://pokeapi.co/api/v2/pokemon/25/"
        );
        assert_eq!(
            entity_url("https://pokeapi.co/api/v2", "pokemon", 25),
            "https://pokeapi.co/api/v2/pokemon/25/"
        );
    }

    #[test]
    fn index_url_carries_offset_and_limit() {
        assert_eq!(
            index_url("https://pokeapi.co/api/v2", "pokemon", 200, 100),
            "https://pokeapi.co/api/v2/pokemon/?offset=200&limit=100"
        );
    }

    #[test]
    fn trailing_id_handles_optional_slash() {
        assert_eq!(trailing_id("https://pokeapi.co/api/v2/pokemon/25/"), Some(25));
        assert_eq!(trailing_id("https://pokeapi.co/api/v2/pokemon/25"), Some(25));
        assert_eq!(trailing_id("https://pokeapi.co/api/v2/pokemon/pikachu/"), None);
    }
}

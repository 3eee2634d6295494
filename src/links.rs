use url::Url;

use crate::error::Result;

pub fn short_path(recipe_id: i64) -> String {
    format!("/s/{}/", recipe_id)
}

/// Redirect target for a short link.
pub fn canonical_path(recipe_id: i64) -> String {
    format!("/recipes/{}/", recipe_id)
}

pub fn short_link(base_url: &str, recipe_id: i64) -> Result<Url> {
    let base = Url::parse(base_url)?;
    Ok(base.join(&short_path(recipe_id))?)
}

/// Recipe id from a `/s/<id>/` path.
pub fn parse_short_path(path: &str) -> Option<i64> {
    path.strip_prefix("/s/")?
        .trim_end_matches('/')
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_absolute_short_links() {
        let url = short_link("https://food.example.org", 42).unwrap();
        assert_eq!(url.as_str(), "https://food.example.org/s/42/");
    }

    #[test]
    fn parses_short_paths() {
        assert_eq!(parse_short_path("/s/42/"), Some(42));
        assert_eq!(parse_short_path("/s/42"), Some(42));
        assert_eq!(parse_short_path("/s/abc/"), None);
        assert_eq!(parse_short_path("/recipes/42/"), None);
        assert_eq!(parse_short_path("/s/0/"), None);
    }

    #[test]
    fn rejects_invalid_base_url() {
        assert!(short_link("not a url", 1).is_err());
    }
}

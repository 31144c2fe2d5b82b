use reqwest::Url;

/// Build `?k=v&...` from pairs, skipping `None` and empty values.
///
/// Returns an empty string when every pair was skipped.
pub fn build_query<I, K>(params: I) -> String
where
    I: IntoIterator<Item = (K, Option<String>)>,
    K: AsRef<str>,
{
    // A throwaway URL gives us the form-urlencoded serializer.
    let mut url = match Url::parse("http://query.invalid/") {
        Ok(url) => url,
        Err(_) => return String::new(),
    };

    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in params {
            match value {
                Some(v) if !v.is_empty() => {
                    pairs.append_pair(key.as_ref(), &v);
                }
                _ => {}
            }
        }
    }

    match url.query() {
        Some(q) if !q.is_empty() => format!("?{}", q),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_missing_and_empty_values() {
        let q = build_query([
            ("group_id", Some("7".to_string())),
            ("status", None),
            ("search", Some(String::new())),
        ]);
        assert_eq!(q, "?group_id=7");
    }

    #[test]
    fn empty_when_nothing_survives() {
        assert_eq!(build_query([("id", None::<String>)]), "");
    }

    #[test]
    fn encodes_values() {
        let q = build_query([("status", Some("pending review".to_string()))]);
        assert_eq!(q, "?status=pending+review");
    }
}

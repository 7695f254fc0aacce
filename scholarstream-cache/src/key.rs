use std::collections::BTreeMap;
use std::fmt;

/// One component of a [`QueryKey`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Text(String),
    /// Query-string style parameters, ordered so equal filters hash equally.
    Params(BTreeMap<String, String>),
}

/// Structured cache address: a resource name followed by parameters.
///
/// `["scholarships", {country=UK}]` and `["myApplications", "a@b.c"]` are
/// typical keys. Invalidation matches on key prefixes, so
/// `["scholarships"]` covers every filtered scholarship list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    parts: Vec<KeyPart>,
}

impl QueryKey {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            parts: vec![KeyPart::Text(resource.into())],
        }
    }

    /// Append a plain segment (an id, an email, ...).
    pub fn with(mut self, segment: impl Into<String>) -> Self {
        self.parts.push(KeyPart::Text(segment.into()));
        self
    }

    /// Append a parameter map. Empty values are dropped so that an unset
    /// filter and an empty filter address the same entry.
    pub fn with_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        self.parts.push(KeyPart::Params(map));
        self
    }

    pub fn resource(&self) -> &str {
        match self.parts.first() {
            Some(KeyPart::Text(name)) => name,
            _ => "",
        }
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.parts.starts_with(&prefix.parts)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            match part {
                KeyPart::Text(text) => f.write_str(text)?,
                KeyPart::Params(params) => {
                    f.write_str("{")?;
                    for (j, (k, v)) in params.iter().enumerate() {
                        if j > 0 {
                            f.write_str("&")?;
                        }
                        write!(f, "{k}={v}")?;
                    }
                    f.write_str("}")?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_matching() {
        let list = QueryKey::new("scholarships").with_params([("country", "UK")]);
        assert!(list.starts_with(&QueryKey::new("scholarships")));
        assert!(!list.starts_with(&QueryKey::new("scholarship")));

        let mine = QueryKey::new("myApplications").with("a@b.c");
        assert!(mine.starts_with(&QueryKey::new("myApplications")));
        assert!(!mine.starts_with(&QueryKey::new("myApplications").with("x@y.z")));
    }

    #[test]
    fn empty_params_are_dropped() {
        let a = QueryKey::new("scholarships").with_params([("search", ""), ("country", "UK")]);
        let b = QueryKey::new("scholarships").with_params([("country", "UK")]);
        assert_eq!(a, b);
    }

    #[test]
    fn display_is_readable() {
        let key = QueryKey::new("scholarships").with_params([("search", "law"), ("country", "UK")]);
        assert_eq!(key.to_string(), "scholarships:{country=UK&search=law}");
        assert_eq!(
            QueryKey::new("myApplications").with("a@b.c").to_string(),
            "myApplications:a@b.c"
        );
        assert_eq!(key.resource(), "scholarships");
    }
}

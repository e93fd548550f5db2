use serde::Serialize;

/// Keyword filters sent as URL query parameters, in insertion order.
/// Repeated keys are kept (`?term=a&term=b`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl ToString) {
        self.pairs.push((key.into(), value.to_string()));
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Builds a query from `key=value` strings as typed on the command line.
    pub fn parse_pairs<I, S>(items: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut q = Query::new();
        for item in items {
            let (k, v) = crate::parse::parse_param(item.as_ref())?;
            q.push(k, v);
        }
        Ok(q)
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for Query {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut q = Query::new();
        for (k, v) in iter {
            q.push(k, v);
        }
        q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_order_and_duplicates() {
        let q = Query::new().param("term", "2024").param("page", 2).param("term", "2025");
        assert_eq!(q.len(), 3);
        assert_eq!(q.get("term"), Some("2024"));
        assert_eq!(q.pairs()[1], ("page".to_string(), "2".to_string()));
    }

    #[test]
    fn parse_pairs_rejects_missing_equals() {
        assert!(Query::parse_pairs(["begin_date=01/01/2024", "oops"]).is_err());
        let q = Query::parse_pairs(["a=1", "b=x=y"]).unwrap();
        assert_eq!(q.get("b"), Some("x=y"));
    }
}

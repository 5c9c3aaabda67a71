//! Rendering of directory address components into a single lookup string.
//!
//! The directory stores each level of an address as a type abbreviation
//! (`_s`, e.g. "ул") and a name (`_f`, e.g. "Ленина"). The lookup service
//! expects one comma-separated line, so empty levels must not leave stray
//! separators behind.

use serde::{Deserialize, Serialize};

/// Address levels of one directory row. Missing levels are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    pub region: (String, String),
    pub area: (String, String),
    pub city: (String, String),
    pub quarter: (String, String),
    pub place: (String, String),
    pub terr: (String, String),
    pub street: (String, String),
    pub housenum: String,
    pub buildnum: String,
    pub strucnum: String,
}

impl AddressComponents {
    /// Key the directory rows are ordered by: the name of every level,
    /// then the house parts.
    pub fn sort_key(&self) -> [&str; 10] {
        [
            &self.region.1,
            &self.area.1,
            &self.city.1,
            &self.quarter.1,
            &self.place.1,
            &self.terr.1,
            &self.street.1,
            &self.housenum,
            &self.buildnum,
            &self.strucnum,
        ]
    }

    /// Render as `"<type> <name>, ..., house, building, structure"`.
    pub fn compose(&self) -> String {
        let levels = [
            &self.region,
            &self.area,
            &self.city,
            &self.quarter,
            &self.place,
            &self.terr,
            &self.street,
        ];
        let mut parts: Vec<String> = levels
            .iter()
            .map(|(kind, name)| format!("{kind} {name}"))
            .collect();
        parts.push(self.housenum.clone());
        parts.push(self.buildnum.clone());
        parts.push(self.strucnum.clone());

        collapse_separators(&parts.join(", "))
            .replace('"', "")
            .trim_matches(|c: char| c == ',' || c.is_whitespace())
            .to_string()
    }
}

/// Replace every run of two or more `,`/` ` characters with `", "`.
fn collapse_separators(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut run = String::new();

    let flush = |run: &mut String, out: &mut String| {
        if run.chars().count() >= 2 {
            out.push_str(", ");
        } else {
            out.push_str(run);
        }
        run.clear();
    };

    for c in input.chars() {
        if c == ',' || c == ' ' {
            run.push(c);
        } else {
            flush(&mut run, &mut out);
            out.push(c);
        }
    }
    flush(&mut run, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(kind: &str, name: &str) -> (String, String) {
        (kind.to_string(), name.to_string())
    }

    #[test]
    fn test_compose_skips_empty_levels() {
        let components = AddressComponents {
            region: pair("г", "Москва"),
            street: pair("ул", "Тверская"),
            housenum: "7".into(),
            ..Default::default()
        };
        assert_eq!(components.compose(), "г Москва, ул Тверская, 7");
    }

    #[test]
    fn test_compose_strips_quotes_and_edges() {
        let components = AddressComponents {
            region: pair("обл", "Московская"),
            place: pair("снт", "\"Ромашка\""),
            ..Default::default()
        };
        assert_eq!(components.compose(), "обл Московская, снт Ромашка");
    }

    #[test]
    fn test_compose_without_leading_levels() {
        let components = AddressComponents {
            city: pair("г", "Тула"),
            street: pair("ул", "Мира"),
            housenum: "3".into(),
            buildnum: "1".into(),
            ..Default::default()
        };
        assert_eq!(components.compose(), "г Тула, ул Мира, 3, 1");
    }

    #[test]
    fn test_compose_all_empty() {
        assert_eq!(AddressComponents::default().compose(), "");
    }

    #[test]
    fn test_collapse_keeps_single_separators() {
        assert_eq!(collapse_separators("a b,c"), "a b,c");
        assert_eq!(collapse_separators("a ,  , b"), "a, b");
    }
}

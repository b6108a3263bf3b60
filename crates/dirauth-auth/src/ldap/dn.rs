//! Distinguished name parsing for group membership values
//!
//! Only the two nearest components of a `memberOf` value are used:
//! `CN=<department>,OU=<organization>,...`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    #[error("distinguished name is empty")]
    Empty,

    #[error("expected at least 2 components, found {0}")]
    TooFewComponents(usize),

    #[error("dangling escape at end of distinguished name")]
    DanglingEscape,
}

/// Department and organization taken from a `memberOf` DN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupPath {
    pub department: String,
    pub organization: String,
}

impl GroupPath {
    /// Parse `CN=Dept,OU=Org,...`. A missing `CN=` / `OU=` prefix leaves the
    /// component as is; trailing components are ignored.
    pub fn parse(member_of: &str) -> Result<Self, DnError> {
        let components = split_components(member_of)?;

        match components.as_slice() {
            [first, second, ..] => Ok(Self {
                department: strip_type(first, "CN="),
                organization: strip_type(second, "OU="),
            }),
            other => Err(DnError::TooFewComponents(other.len())),
        }
    }
}

fn strip_type(component: &str, prefix: &str) -> String {
    component
        .strip_prefix(prefix)
        .unwrap_or(component)
        .to_string()
}

/// Split a DN on unescaped commas, resolving `\,` and `\XX` escapes and
/// trimming whitespace around each component.
pub fn split_components(dn: &str) -> Result<Vec<String>, DnError> {
    if dn.trim().is_empty() {
        return Err(DnError::Empty);
    }

    let bytes = dn.as_bytes();
    let mut components = Vec::new();
    let mut current: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while let Some(&byte) = bytes.get(i) {
        match byte {
            b'\\' => {
                let next = *bytes.get(i + 1).ok_or(DnError::DanglingEscape)?;
                let pair = bytes.get(i + 2).and_then(|&lo| Some((hex_value(next)?, hex_value(lo)?)));
                match pair {
                    Some((hi, lo)) => {
                        current.push((hi << 4) | lo);
                        i += 3;
                    }
                    None => {
                        current.push(next);
                        i += 2;
                    }
                }
            }
            b',' => {
                components.push(finish_component(&mut current));
                i += 1;
            }
            _ => {
                current.push(byte);
                i += 1;
            }
        }
    }
    components.push(finish_component(&mut current));

    Ok(components)
}

fn finish_component(buf: &mut Vec<u8>) -> String {
    let component = String::from_utf8_lossy(buf).trim().to_string();
    buf.clear();
    component
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_department_and_organization() {
        let path = GroupPath::parse("CN=Eng,OU=Product,DC=x,DC=com").unwrap();
        assert_eq!(path.department, "Eng");
        assert_eq!(path.organization, "Product");
    }

    #[test]
    fn test_trailing_components_ignored() {
        let short = GroupPath::parse("CN=Eng,OU=Product").unwrap();
        let long = GroupPath::parse("CN=Eng,OU=Product,OU=Corp,DC=a,DC=b,DC=c").unwrap();
        assert_eq!(short, long);
    }

    #[test]
    fn test_missing_prefixes_keep_component() {
        let path = GroupPath::parse("OU=Eng,CN=Product,DC=x").unwrap();
        assert_eq!(path.department, "OU=Eng");
        assert_eq!(path.organization, "CN=Product");
    }

    #[test]
    fn test_prefix_match_is_literal() {
        let path = GroupPath::parse("cn=Eng,ou=Product").unwrap();
        assert_eq!(path.department, "cn=Eng");
        assert_eq!(path.organization, "ou=Product");
    }

    #[test]
    fn test_too_few_components() {
        assert_eq!(
            GroupPath::parse("CN=Eng"),
            Err(DnError::TooFewComponents(1))
        );
        assert_eq!(GroupPath::parse(""), Err(DnError::Empty));
        assert_eq!(GroupPath::parse("   "), Err(DnError::Empty));
    }

    #[test]
    fn test_escaped_comma_stays_in_component() {
        let path = GroupPath::parse(r"CN=Sales\, EMEA,OU=Field,DC=x").unwrap();
        assert_eq!(path.department, "Sales, EMEA");
        assert_eq!(path.organization, "Field");

        assert_eq!(
            GroupPath::parse(r"CN=Sales\, EMEA"),
            Err(DnError::TooFewComponents(1))
        );
    }

    #[test]
    fn test_hex_escapes() {
        let components = split_components(r"CN=R\2CD,OU=\E7\A0\94\E5\8F\91").unwrap();
        assert_eq!(components, vec!["CN=R,D", "OU=研发"]);
    }

    #[test]
    fn test_whitespace_around_components() {
        let path = GroupPath::parse("CN=Eng , OU=Product , DC=x").unwrap();
        assert_eq!(path.department, "Eng");
        assert_eq!(path.organization, "Product");
    }

    #[test]
    fn test_non_ascii_values() {
        let path = GroupPath::parse("CN=研发部,OU=技术中心,DC=example,DC=net").unwrap();
        assert_eq!(path.department, "研发部");
        assert_eq!(path.organization, "技术中心");
    }

    #[test]
    fn test_dangling_escape() {
        assert_eq!(split_components("CN=Eng\\"), Err(DnError::DanglingEscape));
    }

    #[test]
    fn test_empty_components_are_kept() {
        let components = split_components("CN=Eng,,DC=x").unwrap();
        assert_eq!(components, vec!["CN=Eng", "", "DC=x"]);
        let path = GroupPath::parse("CN=Eng,,DC=x").unwrap();
        assert_eq!(path.organization, "");
    }
}

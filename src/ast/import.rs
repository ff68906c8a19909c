use serde::{Deserialize, Serialize};
use std::fmt;

use super::Expression;

/// `import-type [sha256:…] [as Text | as Location]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Import {
    pub import_type: ImportType,
    pub mode: ImportMode,
    pub hash: Option<Sha256Digest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImportType {
    Missing,
    Local(FilePrefix, File),
    Remote(Url),
    Env(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportMode {
    Code,
    RawText,
    Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilePrefix {
    /// `/`
    Absolute,
    /// `./`
    Here,
    /// `../`
    Parent,
    /// `~/`
    Home,
}

/// A path split into directory components and a file name.
///
/// `directory` is stored innermost first: `/a/b/c` has directory `["b", "a"]`
/// and file `"c"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct File {
    pub directory: Vec<String>,
    pub file: String,
}

impl File {
    /// Build from path components in written order.
    pub fn from_components(mut components: Vec<String>) -> Self {
        let file = components.pop().unwrap_or_default();
        components.reverse();
        Self {
            directory: components,
            file,
        }
    }

    /// Path components in written order.
    pub fn components(&self) -> impl Iterator<Item = &str> {
        self.directory
            .iter()
            .rev()
            .map(String::as_str)
            .chain(std::iter::once(self.file.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    Http,
    Https,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Url {
    pub scheme: Scheme,
    pub authority: String,
    pub path: File,
    pub query: Option<String>,
    /// `using` clause.
    pub headers: Option<Box<Expression>>,
}

/// A decoded `sha256:` digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sha256Digest(pub [u8; 32]);

impl Sha256Digest {
    /// Decode 64 hexadecimal digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = hex.as_bytes();
        if bytes.len() != 64 {
            return None;
        }
        let mut digest = [0u8; 32];
        for (i, pair) in bytes.chunks(2).enumerate() {
            digest[i] = (hex_value(pair[0])? << 4) | hex_value(pair[1])?;
        }
        Some(Self(digest))
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sha256:{}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_directories_are_stored_innermost_first() {
        let file = File::from_components(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(file.directory, vec!["b", "a"]);
        assert_eq!(file.file, "c");
        assert_eq!(file.components().collect::<Vec<_>>(), vec!["a", "b", "c"]);
    }

    #[test]
    fn digests_decode_from_hex() {
        let hex = "00ff".repeat(16);
        let digest = Sha256Digest::from_hex(&hex).unwrap();
        assert_eq!(digest.0[0], 0x00);
        assert_eq!(digest.0[1], 0xff);
        assert_eq!(digest.to_string(), hex);
        assert!(Sha256Digest::from_hex("abc").is_none());
        assert!(Sha256Digest::from_hex(&"zz".repeat(32)).is_none());
    }
}

//! Platform identifiers and host detection.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Operating-system family recognised inside a platform identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Os {
    /// Linux, including gnu and musl tags.
    Linux,
    /// macOS.
    Darwin,
    /// Windows.
    Windows,
}

impl Os {
    /// Map a single identifier token to an OS family.
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "linux" | "gnu" | "musl" => Some(Self::Linux),
            "darwin" | "macos" | "apple" => Some(Self::Darwin),
            "windows" | "win32" | "mingw32" => Some(Self::Windows),
            _ => None,
        }
    }

    /// Whether `family` names this OS. `unix` covers Linux and Darwin.
    #[must_use]
    pub fn is_family(self, family: &str) -> bool {
        match family {
            "unix" => matches!(self, Self::Linux | Self::Darwin),
            other => Self::from_token(other) == Some(self),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

/// CPU architecture recognised inside a platform identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// 64-bit x86.
    X86_64,
    /// 64-bit ARM.
    Aarch64,
    /// 32-bit x86.
    I686,
    /// 64-bit RISC-V.
    Riscv64,
}

impl Arch {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "x86_64" | "amd64" | "x64" => Some(Self::X86_64),
            "aarch64" | "arm64" => Some(Self::Aarch64),
            "i686" | "i386" | "x86" => Some(Self::I686),
            "riscv64" => Some(Self::Riscv64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86_64 => write!(f, "x86_64"),
            Self::Aarch64 => write!(f, "aarch64"),
            Self::I686 => write!(f, "i686"),
            Self::Riscv64 => write!(f, "riscv64"),
        }
    }
}

/// An opaque platform tag such as `linux-x86_64` or `aarch64-darwin`.
///
/// Two identifiers are equal only when their raw tags are equal. The tag is
/// also split on `-` so predicates can ask about the OS family or the CPU
/// architecture; tokens that mean nothing to us are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlatformId {
    raw: String,
    os: Option<Os>,
    arch: Option<Arch>,
}

impl PlatformId {
    /// Parse a platform tag.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPlatform`] if the tag is empty or contains
    /// whitespace.
    pub fn new(tag: &str) -> Result<Self, ConfigError> {
        let raw = tag.trim();
        if raw.is_empty() || raw.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPlatform(tag.to_string()));
        }
        let lowered = raw.to_ascii_lowercase();
        let mut os = None;
        let mut arch = None;
        for token in lowered.split('-') {
            os = os.or_else(|| Os::from_token(token));
            arch = arch.or_else(|| Arch::from_token(token));
        }
        Ok(Self {
            raw: raw.to_string(),
            os,
            arch,
        })
    }

    /// Detect the platform this binary runs on, in `<arch>-<os>` form.
    #[must_use]
    pub fn detect() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let tag = format!("{}-{os}", std::env::consts::ARCH);
        let lowered = tag.to_ascii_lowercase();
        Self {
            os: lowered.split('-').find_map(Os::from_token),
            arch: lowered.split('-').find_map(Arch::from_token),
            raw: tag,
        }
    }

    /// The raw tag as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed OS family, if the tag names one.
    #[must_use]
    pub const fn os(&self) -> Option<Os> {
        self.os
    }

    /// Parsed architecture, if the tag names one.
    #[must_use]
    pub const fn arch(&self) -> Option<Arch> {
        self.arch
    }

    /// Whether this identifier belongs to the named OS family
    /// (`darwin`, `linux`, `windows`, `unix`, or an alias such as `macos`).
    #[must_use]
    pub fn is_family(&self, family: &str) -> bool {
        self.os
            .is_some_and(|os| os.is_family(&family.to_ascii_lowercase()))
    }

    /// Whether this identifier names the given architecture (aliases allowed).
    #[must_use]
    pub fn is_arch(&self, arch: &str) -> bool {
        let wanted = Arch::from_token(&arch.to_ascii_lowercase());
        wanted.is_some() && wanted == self.arch
    }

    /// Whether the OS family is Darwin.
    #[must_use]
    pub fn is_darwin(&self) -> bool {
        self.os == Some(Os::Darwin)
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PlatformId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PlatformId {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<PlatformId> for String {
    fn from(value: PlatformId) -> Self {
        value.raw
    }
}

/// Returns true if `family` is a family name a predicate may use.
#[must_use]
pub fn is_known_family(family: &str) -> bool {
    let lowered = family.to_ascii_lowercase();
    lowered == "unix" || Os::from_token(&lowered).is_some()
}

/// Returns true if `arch` is an architecture name a predicate may use.
#[must_use]
pub fn is_known_arch(arch: &str) -> bool {
    Arch::from_token(&arch.to_ascii_lowercase()).is_some()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn detect_returns_parseable_tag() {
        let p = PlatformId::detect();
        assert!(!p.as_str().is_empty());
        assert_eq!(PlatformId::new(p.as_str()).unwrap(), p);
    }

    #[test]
    fn parses_os_first_tags() {
        let p = PlatformId::new("linux-x86_64").unwrap();
        assert_eq!(p.os(), Some(Os::Linux));
        assert_eq!(p.arch(), Some(Arch::X86_64));
    }

    #[test]
    fn parses_arch_first_tags() {
        let p = PlatformId::new("aarch64-darwin").unwrap();
        assert!(p.is_darwin());
        assert!(p.is_arch("arm64"));
    }

    #[test]
    fn tags_are_opaque_for_equality() {
        let a = PlatformId::new("linux-x86_64").unwrap();
        let b = PlatformId::new("x86_64-linux").unwrap();
        assert_ne!(a, b);
        assert_eq!(a.os(), b.os());
    }

    #[test]
    fn unknown_tokens_are_ignored() {
        let p = PlatformId::new("wasm32-unknown").unwrap();
        assert_eq!(p.os(), None);
        assert_eq!(p.arch(), None);
        assert!(!p.is_family("linux"));
    }

    #[test]
    fn empty_tag_is_rejected() {
        assert!(PlatformId::new("").is_err());
        assert!(PlatformId::new("   ").is_err());
        assert!(PlatformId::new("linux x86_64").is_err());
    }

    #[test]
    fn unix_family_covers_linux_and_darwin() {
        assert!(PlatformId::new("x86_64-linux").unwrap().is_family("unix"));
        assert!(PlatformId::new("x86_64-darwin").unwrap().is_family("unix"));
        assert!(!PlatformId::new("x86_64-windows").unwrap().is_family("unix"));
    }

    #[test]
    fn macos_alias_is_darwin_family() {
        let p = PlatformId::new("macos-arm64").unwrap();
        assert!(p.is_family("darwin"));
        assert!(p.is_family("macos"));
    }

    #[test]
    fn serde_round_trips_as_plain_string() {
        let p = PlatformId::new("aarch64-darwin").unwrap();
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, "\"aarch64-darwin\"");
        let back: PlatformId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn known_family_and_arch_names() {
        assert!(is_known_family("Darwin"));
        assert!(is_known_family("unix"));
        assert!(!is_known_family("beos"));
        assert!(is_known_arch("amd64"));
        assert!(!is_known_arch("m68k"));
    }

    #[test]
    fn os_display() {
        assert_eq!(Os::Linux.to_string(), "linux");
        assert_eq!(Os::Darwin.to_string(), "darwin");
        assert_eq!(Arch::Aarch64.to_string(), "aarch64");
    }
}

use super::*;
use serde::Deserialize;
use serde::Serialize;

/// Unambiguous code alphabet: no 0/O or 1/I lookalikes.
const ALPHABET: &[u8; 32] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
/// Characters per code. 6 × 5 bits = 30 bits of code space.
const LENGTH: usize = 6;
const BITS: u32 = 5 * LENGTH as u32;
/// Tag bit that keeps party keys disjoint from the zero "no group" key.
const TAG: u32 = 1 << BITS;

/// Integer matchmaking pool key understood by the match service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(u32);

impl GroupKey {
    pub fn inner(&self) -> u32 {
        self.0
    }
}

impl From<u32> for GroupKey {
    fn from(key: u32) -> Self {
        Self(key)
    }
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Short shareable code naming a private matchmaking pool.
///
/// The code ↔ key mapping is a pure bijection, so every client that types
/// the same code lands in the same pool without any coordination.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartyCode(u32);

impl PartyCode {
    /// Fresh random code for a host.
    pub fn random() -> Self {
        Self(rand::random_range(0..TAG))
    }
    /// Parses user input, ignoring surrounding whitespace, case, and dashes.
    pub fn parse(s: &str) -> Result<Self, CodecError> {
        let chars = s
            .trim()
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect::<Vec<_>>();
        if chars.len() != LENGTH {
            return Err(CodecError::InvalidCode(s.to_string()));
        }
        chars.into_iter().try_fold(0u32, |acc, c| {
            ALPHABET
                .iter()
                .position(|a| *a as char == c)
                .map(|digit| acc << 5 | digit as u32)
                .ok_or_else(|| CodecError::InvalidCode(s.to_string()))
        })
        .map(Self)
    }
    /// Pool key for this code.
    pub fn group(&self) -> GroupKey {
        GroupKey(TAG | self.0)
    }
    /// Recovers the code behind a pool key, if the key is a party key.
    pub fn from_group(key: GroupKey) -> Option<Self> {
        match key.0 & !(TAG - 1) == TAG {
            true => Some(Self(key.0 & (TAG - 1))),
            false => None,
        }
    }
}

impl From<PartyCode> for String {
    fn from(code: PartyCode) -> Self {
        (0..LENGTH)
            .rev()
            .map(|i| ALPHABET[(code.0 >> (5 * i) & 0x1f) as usize] as char)
            .collect()
    }
}

impl TryFrom<String> for PartyCode {
    type Error = CodecError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl std::fmt::Display for PartyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(*self))
    }
}

impl std::fmt::Debug for PartyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PartyCode").field(&String::from(*self)).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn code_survives_group_round_trip() {
        for _ in 0..256 {
            let code = PartyCode::random();
            assert_eq!(PartyCode::from_group(code.group()), Some(code));
            assert_eq!(PartyCode::parse(&code.to_string()).unwrap(), code);
        }
    }
    #[test]
    fn independent_parses_share_a_group() {
        let a = PartyCode::parse("k7qx2m").unwrap();
        let b = PartyCode::parse(" K7Q-X2M ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.group(), b.group());
        assert_eq!(a.to_string(), "K7QX2M");
    }
    #[test]
    fn distinct_codes_have_distinct_groups() {
        let a = PartyCode::parse("222222").unwrap();
        let b = PartyCode::parse("222223").unwrap();
        assert_ne!(a.group(), b.group());
        assert_ne!(a.group().inner(), 0);
    }
    #[test]
    fn ambiguous_characters_are_rejected() {
        assert!(PartyCode::parse("O0I1AB").is_err());
        assert!(PartyCode::parse("SHORT").is_err());
        assert!(PartyCode::parse("TOOLONGX").is_err());
    }
    #[test]
    fn foreign_keys_are_not_parties() {
        assert_eq!(PartyCode::from_group(GroupKey::from(0)), None);
        assert_eq!(PartyCode::from_group(GroupKey::from(42)), None);
    }
}

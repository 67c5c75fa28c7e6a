use std::fmt;
use std::str::FromStr;

/// Known JID servers on WhatsApp.
pub const DEFAULT_USER_SERVER: &str = "s.whatsapp.net";
pub const GROUP_SERVER: &str = "g.us";

/// JID represents a WhatsApp user/entity ID (user@server).
///
/// The gateway builds these as the fully-qualified destination identifier:
/// normalized phone number + network suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Jid {
    pub user: String,
    pub server: String,
}

impl Jid {
    /// New regular JID (user@server).
    pub fn new(user: impl Into<String>, server: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            server: server.into(),
        }
    }

    /// JID for a normalized phone number on the default user server.
    pub fn user_jid(number: impl Into<String>) -> Self {
        Self::new(number, DEFAULT_USER_SERVER)
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.server.is_empty()
    }

    pub fn is_group(&self) -> bool {
        self.server == GROUP_SERVER
    }
}

impl FromStr for Jid {
    type Err = JidParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '@');
        let first = parts.next().unwrap_or("");
        match parts.next() {
            Some(server) if !server.is_empty() => Ok(Self::new(first, server)),
            Some(_) => Err(JidParseError),
            // No '@': a bare server JID.
            None => Ok(Self::new("", first)),
        }
    }
}

#[derive(Debug)]
pub struct JidParseError;

impl fmt::Display for JidParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid JID format")
    }
}

impl std::error::Error for JidParseError {}

impl fmt::Display for Jid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.user.is_empty() {
            write!(f, "{}", self.server)
        } else {
            write!(f, "{}@{}", self.user, self.server)
        }
    }
}

impl serde::Serialize for Jid {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for Jid {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Jid::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jid_new_and_display() {
        let j = Jid::user_jid("919876543210");
        assert_eq!(j.to_string(), "919876543210@s.whatsapp.net");
        assert!(!j.is_empty());
        assert!(!j.is_group());
    }

    #[test]
    fn jid_parse_roundtrip() {
        let s = "123456789@g.us";
        let j: Jid = s.parse().unwrap();
        assert_eq!(j.user, "123456789");
        assert_eq!(j.server, "g.us");
        assert!(j.is_group());
        assert_eq!(j.to_string(), s);
    }

    #[test]
    fn jid_parse_server_only() {
        let j: Jid = "g.us".parse().unwrap();
        assert_eq!(j.user, "");
        assert_eq!(j.server, "g.us");
        assert_eq!(j.to_string(), "g.us");
    }

    #[test]
    fn jid_parse_empty_server_rejected() {
        assert!("123@".parse::<Jid>().is_err());
    }
}

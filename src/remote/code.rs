use std::fmt;

/// Status reported by a running instance or by the client on its behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ResultCode(pub u16);

impl ResultCode {
    pub const OK: Self = Self(0x0000);
    pub const NOT_CONNECTED: Self = Self(0x0001);
    pub const CONNECT_FAILED: Self = Self(0x0002);
    pub const TIMEOUT: Self = Self(0x0003);
    pub const NO_SERVERS: Self = Self(0x0004);
    pub const AUTH_FAILED: Self = Self(0x0010);
    pub const PERMISSION_DENIED: Self = Self(0x0011);
    pub const USER_EXISTS: Self = Self(0x0020);
    pub const UNKNOWN_USER: Self = Self(0x0021);
    pub const INVALID_REQUEST: Self = Self(0x0022);
    pub const PROTOCOL: Self = Self(0x0030);
    pub const SERVER_ERROR: Self = Self(0x0040);

    #[must_use]
    pub fn is_ok(self) -> bool {
        self == Self::OK
    }

    /// `Ok(())` for [`ResultCode::OK`], the code itself otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_ok() { Ok(()) } else { Err(self) }
    }

    /// Human-readable description.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::OK => "ok",
            Self::NOT_CONNECTED => "not connected",
            Self::CONNECT_FAILED => "unable to reach any server",
            Self::TIMEOUT => "timed out",
            Self::NO_SERVERS => "no servers configured",
            Self::AUTH_FAILED => "authentication failed",
            Self::PERMISSION_DENIED => "insufficient privileges",
            Self::USER_EXISTS => "user already exists",
            Self::UNKNOWN_USER => "unknown user",
            Self::INVALID_REQUEST => "invalid request",
            Self::PROTOCOL => "unexpected response from server",
            Self::SERVER_ERROR => "internal server error",
            _ => "unknown error",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}:{}", self.0, self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_hex_then_text() {
        assert_eq!(ResultCode::USER_EXISTS.to_string(), "0020:user already exists");
        assert_eq!(ResultCode(0xBEEF).to_string(), "BEEF:unknown error");
    }

    #[test]
    fn only_ok_converts_to_ok() {
        assert!(ResultCode::OK.into_result().is_ok());
        assert_eq!(
            ResultCode::TIMEOUT.into_result(),
            Err(ResultCode::TIMEOUT)
        );
    }
}

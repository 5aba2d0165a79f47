use crate::error::{CrediarioError, Result};
use chrono::{DateTime, Duration, Utc};

/// An authenticated operator.
///
/// Carries its own issue time and lifetime; every privileged service call
/// checks it against the clock instead of reading ambient state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub name: String,
    pub issued_at: DateTime<Utc>,
    pub ttl: Duration,
}

impl Session {
    pub fn login(email: &str, password: &str, now: DateTime<Utc>, ttl: Duration) -> Result<Self> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(CrediarioError::Unauthorized);
        }
        let name = email.split('@').next().unwrap_or(email).to_string();
        Ok(Self {
            email: email.to_string(),
            name,
            issued_at: now,
            ttl,
        })
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + self.ttl
    }

    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now >= self.issued_at && now < self.expires_at()
    }

    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.is_valid(now) {
            Ok(())
        } else {
            Err(CrediarioError::SessionExpired)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_login_derives_name() {
        let now = Utc::now();
        let session = Session::login("ana@loja.com", "secret", now, Duration::hours(24)).unwrap();
        assert_eq!(session.name, "ana");
        assert_eq!(session.expires_at(), now + Duration::hours(24));
    }

    #[test]
    fn test_blank_credentials_are_refused() {
        let now = Utc::now();
        assert!(matches!(
            Session::login("", "secret", now, Duration::hours(24)),
            Err(CrediarioError::Unauthorized)
        ));
        assert!(matches!(
            Session::login("ana@loja.com", "", now, Duration::hours(24)),
            Err(CrediarioError::Unauthorized)
        ));
    }

    #[test]
    fn test_session_expires_after_ttl() {
        let issued = Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap();
        let session = Session::login("ana@loja.com", "x", issued, Duration::hours(24)).unwrap();
        assert!(session.validate(issued + Duration::hours(23)).is_ok());
        assert!(matches!(
            session.validate(issued + Duration::hours(24)),
            Err(CrediarioError::SessionExpired)
        ));
    }
}

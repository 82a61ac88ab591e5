//! Credential resolver backed by configured tokens.
//!
//! One admin key covers every auction; team tokens are scoped to a single
//! auction and team.

use crate::ports::{Credential, CredentialResolver};
use parking_lot::RwLock;
use shared_types::{AuctionId, TeamId};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StaticCredentials {
    admin_key: Option<String>,
    team_tokens: RwLock<HashMap<AuctionId, Vec<(String, TeamId)>>>,
}

impl StaticCredentials {
    pub fn new(admin_key: Option<String>) -> Self {
        Self {
            admin_key: admin_key.filter(|key| !key.is_empty()),
            team_tokens: RwLock::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_team_token(
        self,
        auction_id: AuctionId,
        team_id: TeamId,
        token: impl Into<String>,
    ) -> Self {
        self.insert_team_token(auction_id, team_id, token);
        self
    }

    /// Register or replace the token of one team.
    pub fn insert_team_token(
        &self,
        auction_id: AuctionId,
        team_id: TeamId,
        token: impl Into<String>,
    ) {
        let mut tokens = self.team_tokens.write();
        let entries = tokens.entry(auction_id).or_default();
        entries.retain(|(_, existing)| existing != &team_id);
        entries.push((token.into(), team_id));
    }

    pub fn team_token_count(&self) -> usize {
        self.team_tokens.read().values().map(Vec::len).sum()
    }
}

impl CredentialResolver for StaticCredentials {
    fn resolve(&self, auction_id: &AuctionId, token: &str) -> Option<Credential> {
        if let Some(admin_key) = &self.admin_key {
            if constant_time_compare(admin_key, token) {
                return Some(Credential::admin());
            }
        }

        let tokens = self.team_tokens.read();
        let mut found = None;
        // Compare against every entry so timing does not reveal position.
        for (expected, team_id) in tokens.get(auction_id)?.iter() {
            if constant_time_compare(expected, token) && found.is_none() {
                found = Some(team_id.clone());
            }
        }
        found.map(Credential::team)
    }
}

/// Compare two secrets in constant time, lengths included.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;

    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Role;

    fn credentials() -> StaticCredentials {
        StaticCredentials::new(Some("admin-secret".into()))
            .with_team_token(AuctionId::from("ipl"), TeamId::from("csk"), "csk-token")
            .with_team_token(AuctionId::from("ipl"), TeamId::from("mi"), "mi-token")
    }

    #[test]
    fn test_admin_key_works_for_any_auction() {
        let creds = credentials();
        assert_eq!(
            creds.resolve(&AuctionId::from("wpl"), "admin-secret"),
            Some(Credential::admin())
        );
    }

    #[test]
    fn test_team_token_scoped_to_auction() {
        let creds = credentials();
        let resolved = creds.resolve(&AuctionId::from("ipl"), "mi-token").unwrap();
        assert_eq!(resolved.role, Role::Team);
        assert_eq!(resolved.team_id, Some(TeamId::from("mi")));
        assert!(creds.resolve(&AuctionId::from("wpl"), "mi-token").is_none());
    }

    #[test]
    fn test_unknown_token_rejected() {
        assert!(credentials().resolve(&AuctionId::from("ipl"), "guess").is_none());
    }

    #[test]
    fn test_empty_admin_key_disabled() {
        let creds = StaticCredentials::new(Some(String::new()));
        assert!(creds.resolve(&AuctionId::from("ipl"), "").is_none());
    }

    #[test]
    fn test_replacing_team_token() {
        let creds = credentials();
        creds.insert_team_token(AuctionId::from("ipl"), TeamId::from("csk"), "rotated");
        assert!(creds.resolve(&AuctionId::from("ipl"), "csk-token").is_none());
        assert!(creds.resolve(&AuctionId::from("ipl"), "rotated").is_some());
        assert_eq!(creds.team_token_count(), 2);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }
}

//! Reps, accounts, and the book that ties them together.
//!
//! RULE: an account references its owner by rep id. Reps never embed
//! their accounts; everything a rep "has" is derived from the book.

use crate::types::{AccountId, Money, PendingId, RepId};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    Smb,
    #[default]
    MidMarket,
    Enterprise,
}

impl Segment {
    pub const ALL: [Segment; 3] = [Segment::Smb, Segment::MidMarket, Segment::Enterprise];

    /// Parse the spellings found in CRM exports (`SMB`, `Mid-Market`, ...).
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match key.as_str() {
            "smb" | "smallbusiness" => Some(Self::Smb),
            "midmarket" | "mm" => Some(Self::MidMarket),
            "enterprise" | "ent" => Some(Self::Enterprise),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Smb => "SMB",
            Self::MidMarket => "Mid-Market",
            Self::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rep {
    pub id:        RepId,
    pub name:      String,
    pub segment:   Segment,
    pub territory: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id:              AccountId,
    pub name:            String,
    pub owner_id:        RepId,
    pub current_arr:     Money,
    pub internal_tam:    Money,
    pub health_score:    f64,
    pub churn_risk:      f64,
    pub territory:       String,
    pub segment:         Segment,
    pub products_owned:  Vec<String>,
    pub lifecycle_stage: String,
}

impl Account {
    /// Remaining opportunity in the account. TAM below ARR counts as zero.
    pub fn whitespace(&self) -> Money {
        (self.internal_tam - self.current_arr).max(0.0)
    }

    /// Healthy enough to hand to another rep without a retention plan.
    pub fn is_transferable(&self) -> bool {
        self.churn_risk < 0.3 && self.health_score > 70.0
    }
}

/// A complete set of reps and the accounts they own.
/// Both the baseline and the working scenario are a `Book`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub reps:     Vec<Rep>,
    pub accounts: Vec<Account>,
}

impl Book {
    pub fn rep(&self, id: &str) -> Option<&Rep> {
        self.reps.iter().find(|r| r.id == id)
    }

    /// Rep names are unique ignoring ASCII case.
    pub fn rep_by_name(&self, name: &str) -> Option<&Rep> {
        let name = name.trim();
        self.reps.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub fn account_by_name(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name == name)
    }

    pub fn accounts_of<'a>(&'a self, rep_id: &'a str) -> impl Iterator<Item = &'a Account> + 'a {
        self.accounts.iter().filter(move |a| a.owner_id == rep_id)
    }

    pub fn total_arr(&self) -> Money {
        self.accounts.iter().map(|a| a.current_arr).sum()
    }

    pub fn total_tam(&self) -> Money {
        self.accounts.iter().map(|a| a.internal_tam).sum()
    }

    /// Distinct territories across accounts, first-appearance order.
    pub fn territories(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for account in &self.accounts {
            if !out.contains(&account.territory) {
                out.push(account.territory.clone());
            }
        }
        out
    }

    /// Next free sequential id with the given prefix (`rep-`, `acc-`).
    pub(crate) fn next_id<'a>(prefix: &str, existing: impl Iterator<Item = &'a str>) -> String {
        let max = existing
            .filter_map(|id| id.strip_prefix(prefix))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("{prefix}{}", max + 1)
    }

    pub(crate) fn next_rep_id(&self) -> RepId {
        Self::next_id("rep-", self.reps.iter().map(|r| r.id.as_str()))
    }

    pub(crate) fn next_account_id(&self) -> AccountId {
        Self::next_id("acc-", self.accounts.iter().map(|a| a.id.as_str()))
    }
}

/// A new account waiting to be routed to a rep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAccount {
    pub id:        PendingId,
    pub name:      String,
    pub arr:       Money,
    pub tam:       Money,
    pub territory: String,
    pub segment:   Segment,
}

/// Caller-supplied fields for a pending account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPendingAccount {
    pub name:      String,
    pub arr:       Money,
    /// Defaults to three times ARR when absent or zero.
    #[serde(default)]
    pub tam:       Option<Money>,
    #[serde(default)]
    pub territory: Option<String>,
    #[serde(default)]
    pub segment:   Segment,
}

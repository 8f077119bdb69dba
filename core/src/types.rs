//! Shared primitive types used across the engine.

/// A stable, unique identifier for a rep (`rep-1`, `rep-2`, ...).
pub type RepId = String;

/// A stable, unique identifier for an account (`acc-1`, `acc-2`, ...).
pub type AccountId = String;

/// Identifier of a queued, not-yet-assigned account.
pub type PendingId = String;

/// Monetary amount in whole currency units. ARR is annualized.
pub type Money = f64;

/// A percentage on the 0–100 scale. Capacity may exceed 100.
pub type Percent = f64;

/// Compact currency label for human-readable text: `$1.2M`, `$150K`, `$900`.
pub fn format_money(amount: Money) -> String {
    let abs = amount.abs();
    let sign = if amount < 0.0 { "-" } else { "" };
    if abs >= 1_000_000.0 {
        format!("{sign}${:.1}M", abs / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{sign}${:.0}K", abs / 1_000.0)
    } else {
        format!("{sign}${abs:.0}")
    }
}

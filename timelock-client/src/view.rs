//! Locked/unlocked views over fetched vaults, amount and countdown formatting

use std::{fmt::Display, sync::Arc, time::Duration};

use serde::{Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use crate::{
    clock::{Clock, SystemClock},
    error::ValidationError,
    rpc::TokenHolding,
    state::Vault,
};

/// Display-ready vault; `is_locked` and `time_left` are derived from `now`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultView {
    #[serde(serialize_with = "as_string")]
    pub address: Pubkey,
    /// Serialized as a string so u64 survives JSON consumers
    #[serde(serialize_with = "as_string")]
    pub amount: u64,
    #[serde(serialize_with = "as_optional_string")]
    pub mint: Option<Pubkey>,
    pub unlock_timestamp: i64,
    pub is_locked: bool,
    pub time_left: String,
}

impl VaultView {
    pub fn new(vault: &Vault, now: i64) -> Self {
        Self {
            address: vault.address,
            amount: vault.amount,
            mint: vault.kind.mint().copied(),
            unlock_timestamp: vault.unlock_timestamp,
            is_locked: is_locked(vault.unlock_timestamp, now),
            time_left: format_countdown_at(vault.unlock_timestamp, now),
        }
    }
}

fn as_string<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn as_optional_string<T: Display, S: Serializer>(
    value: &Option<T>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

/// Disjoint locked/unlocked partition, each ascending by unlock time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultList {
    pub locked: Vec<VaultView>,
    pub unlocked: Vec<VaultView>,
}

impl VaultList {
    pub fn len(&self) -> usize {
        self.locked.len() + self.unlocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Token balance offered for locking
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenView {
    #[serde(serialize_with = "as_string")]
    pub mint: Pubkey,
    #[serde(serialize_with = "as_string")]
    pub account: Pubkey,
    #[serde(serialize_with = "as_string")]
    pub amount: u64,
    pub decimals: u8,
    pub ui_amount: String,
}

impl From<&TokenHolding> for TokenView {
    fn from(holding: &TokenHolding) -> Self {
        Self {
            mint: holding.mint,
            account: holding.account,
            amount: holding.amount,
            decimals: holding.decimals,
            ui_amount: format_amount(holding.amount, holding.decimals),
        }
    }
}

/// Locked only while the unlock time is strictly in the future
pub fn is_locked(unlock_timestamp: i64, now: i64) -> bool {
    unlock_timestamp > now
}

pub fn partition(vaults: &[Vault], now: i64) -> VaultList {
    let (mut locked, mut unlocked): (Vec<_>, Vec<_>) = vaults
        .iter()
        .map(|vault| VaultView::new(vault, now))
        .partition(|view| view.is_locked);

    // stable: ties keep fetch order
    locked.sort_by_key(|view| view.unlock_timestamp);
    unlocked.sort_by_key(|view| view.unlock_timestamp);

    VaultList { locked, unlocked }
}

/// Base units to a decimal string with at least one fractional digit
///
/// `format_amount(1_500_000_000, 9) == "1.5"`
pub fn format_amount(amount: u64, decimals: u8) -> String {
    let decimals = usize::from(decimals);
    let digits = format!("{amount:0>width$}", width = decimals + 1);
    let (whole, fraction) = digits.split_at(digits.len() - decimals);
    let fraction = fraction.trim_end_matches('0');

    if fraction.is_empty() {
        format!("{whole}.0")
    } else {
        format!("{whole}.{fraction}")
    }
}

/// Decimal string to base units, the inverse of [`format_amount`]
///
/// `parse_ui_amount("1.5", 9) == Ok(1_500_000_000)`. Rejects zero, signs,
/// exponents, more fractional digits than `decimals`, and overflow.
pub fn parse_ui_amount(input: &str, decimals: u8) -> Result<u64, ValidationError> {
    let invalid = || ValidationError::InvalidAmount(input.to_string());
    let trimmed = input.trim();
    let (whole, fraction) = trimmed.split_once('.').unwrap_or((trimmed, ""));

    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > usize::from(decimals) {
        return Err(ValidationError::TooManyDecimals {
            input: input.to_string(),
            decimals,
        });
    }

    let scale = 10u64.checked_pow(u32::from(decimals)).ok_or_else(invalid)?;
    let whole = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| invalid())?
    };
    let fraction = if fraction.is_empty() {
        0
    } else {
        let padding = 10u64.pow((usize::from(decimals) - fraction.len()) as u32);
        fraction.parse::<u64>().map_err(|_| invalid())? * padding
    };

    let amount = whole
        .checked_mul(scale)
        .and_then(|base| base.checked_add(fraction))
        .ok_or_else(invalid)?;
    if amount == 0 {
        return Err(ValidationError::ZeroAmount);
    }
    Ok(amount)
}

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Remaining time as `"1d 1h 1m 1s"`, leading zero units omitted;
/// empty once the unlock time is reached
pub fn format_countdown_at(unlock_timestamp: i64, now: i64) -> String {
    let remaining = unlock_timestamp.saturating_sub(now);
    if remaining <= 0 {
        return String::new();
    }

    let parts = [
        (remaining / DAY, 'd'),
        (remaining % DAY / HOUR, 'h'),
        (remaining % HOUR / MINUTE, 'm'),
        (remaining % MINUTE, 's'),
    ];
    let first = parts.iter().position(|(value, _)| *value > 0).unwrap_or(3);

    parts[first..]
        .iter()
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// [`format_countdown_at`] against the system clock
pub fn format_countdown(unlock_timestamp: i64) -> String {
    format_countdown_at(unlock_timestamp, SystemClock.unix_timestamp())
}

pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// Live countdown for one displayed vault
///
/// The tick task stops on its own once the vault unlocks and is aborted
/// when the handle is dropped. A vault that is already unlocked gets no task.
pub struct CountdownHandle {
    receiver: watch::Receiver<String>,
    task: Option<JoinHandle<()>>,
}

impl CountdownHandle {
    pub fn current(&self) -> String {
        self.receiver.borrow().clone()
    }

    /// Wait for the next recomputed value; `None` once the countdown ended
    pub async fn changed(&mut self) -> Option<String> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.receiver.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

pub fn spawn_countdown(unlock_timestamp: i64, clock: Arc<dyn Clock>) -> CountdownHandle {
    let initial = format_countdown_at(unlock_timestamp, clock.unix_timestamp());
    let unlocked = initial.is_empty();
    let (sender, receiver) = watch::channel(initial);

    if unlocked {
        // sender dropped here, so `changed` reports the end right away
        return CountdownHandle {
            receiver,
            task: None,
        };
    }

    let task = tokio::spawn(async move {
        let mut ticker = interval(COUNTDOWN_TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let time_left = format_countdown_at(unlock_timestamp, clock.unix_timestamp());
            let unlocked = time_left.is_empty();
            if sender.send(time_left).is_err() || unlocked {
                break;
            }
        }
    });

    CountdownHandle {
        receiver,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::NATIVE_DECIMALS, state::VaultKind, testing::ManualClock};

    const NOW: i64 = 1_700_000_000;

    fn vault(unlock_timestamp: i64) -> Vault {
        Vault {
            address: Pubkey::new_unique(),
            owner: Pubkey::new_unique(),
            kind: VaultKind::Native,
            amount: 1,
            unlock_timestamp,
            bump: 255,
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(1_000_000_000, 9), "1.0");
        assert_eq!(format_amount(1_500_000_000, 9), "1.5");
        assert_eq!(format_amount(0, 9), "0.0");
        assert_eq!(format_amount(1, 9), "0.000000001");
        assert_eq!(format_amount(123_456, 6), "0.123456");
        assert_eq!(format_amount(42, 0), "42.0");
        assert_eq!(format_amount(u64::MAX, 9), "18446744073.709551615");
    }

    #[test]
    fn test_parse_ui_amount() {
        assert_eq!(parse_ui_amount("1.5", NATIVE_DECIMALS), Ok(1_500_000_000));
        assert_eq!(parse_ui_amount("1", NATIVE_DECIMALS), Ok(1_000_000_000));
        assert_eq!(parse_ui_amount(" 0.000000001 ", NATIVE_DECIMALS), Ok(1));
        assert_eq!(parse_ui_amount(".25", 2), Ok(25));
        assert_eq!(parse_ui_amount("3.", 2), Ok(300));
        assert_eq!(parse_ui_amount("42", 0), Ok(42));
        assert_eq!(parse_ui_amount("18446744073.709551615", 9), Ok(u64::MAX));
    }

    #[test]
    fn test_parse_ui_amount_inverts_format() {
        for (amount, decimals) in [(1_500_000_000, 9), (1, 9), (123_456, 6), (42, 0), (u64::MAX, 9)] {
            assert_eq!(parse_ui_amount(&format_amount(amount, decimals), decimals), Ok(amount));
        }
    }

    #[test]
    fn test_parse_ui_amount_rejects() {
        assert_eq!(parse_ui_amount("0.0", 9), Err(ValidationError::ZeroAmount));
        assert_eq!(
            parse_ui_amount("0.0000000001", 9),
            Err(ValidationError::TooManyDecimals {
                input: "0.0000000001".to_string(),
                decimals: 9
            })
        );
        assert_eq!(
            parse_ui_amount("1.5", 0),
            Err(ValidationError::TooManyDecimals {
                input: "1.5".to_string(),
                decimals: 0
            })
        );
        for input in ["", ".", "-1", "+1", "1e9", "1.2.3", "abc", "1 000", "18446744073.709551616"] {
            assert_eq!(
                parse_ui_amount(input, 9),
                Err(ValidationError::InvalidAmount(input.to_string())),
                "{input:?}"
            );
        }
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(format_countdown_at(NOW + 90_061, NOW), "1d 1h 1m 1s");
        assert_eq!(format_countdown_at(NOW, NOW), "");
        assert_eq!(format_countdown_at(NOW - 5, NOW), "");
        assert_eq!(format_countdown_at(NOW + 61, NOW), "1m 1s");
        assert_eq!(format_countdown_at(NOW + 3_600, NOW), "1h 0m 0s");
        assert_eq!(format_countdown_at(NOW + 7, NOW), "7s");
        assert_eq!(format_countdown_at(i64::MAX, i64::MIN), format_countdown_at(i64::MAX, 0));

        assert_eq!(format_countdown(0), "");
        let far = format_countdown(i64::MAX);
        assert!(far.contains("d ") && far.ends_with('s'));
    }

    #[test]
    fn test_equal_time_is_unlocked() {
        assert!(!is_locked(NOW, NOW));
        assert!(is_locked(NOW + 1, NOW));
        assert!(!is_locked(NOW - 1, NOW));
    }

    #[test]
    fn test_partition_total_and_disjoint() {
        let vaults = vec![vault(NOW + 30), vault(NOW), vault(NOW - 30), vault(NOW + 1)];

        let list = partition(&vaults, NOW);

        assert_eq!(list.len(), vaults.len());
        for v in &vaults {
            let in_locked = list.locked.iter().filter(|x| x.address == v.address).count();
            let in_unlocked = list.unlocked.iter().filter(|x| x.address == v.address).count();
            assert_eq!(in_locked + in_unlocked, 1);
        }
        assert!(list.locked.iter().all(|v| v.is_locked && !v.time_left.is_empty()));
        assert!(list.unlocked.iter().all(|v| !v.is_locked && v.time_left.is_empty()));
    }

    #[test]
    fn test_partition_orders_ascending_and_stable() {
        let a = vault(NOW + 50);
        let b = vault(NOW + 10);
        let c = vault(NOW + 50);
        let d = vault(NOW - 1);
        let e = vault(NOW - 100);

        let list = partition(&[a.clone(), b.clone(), c.clone(), d.clone(), e.clone()], NOW);

        let locked: Vec<_> = list.locked.iter().map(|v| v.address).collect();
        let unlocked: Vec<_> = list.unlocked.iter().map(|v| v.address).collect();
        assert_eq!(locked, vec![b.address, a.address, c.address]);
        assert_eq!(unlocked, vec![e.address, d.address]);
    }

    #[test]
    fn test_view_serializes_strings() {
        let mint = Pubkey::new_unique();
        let mut token = vault(NOW + 1);
        token.kind = VaultKind::Token(mint);
        token.amount = u64::MAX;

        let json = serde_json::to_value(VaultView::new(&token, NOW)).unwrap();

        assert_eq!(json["address"], token.address.to_string());
        assert_eq!(json["amount"], u64::MAX.to_string());
        assert_eq!(json["mint"], mint.to_string());
        assert_eq!(json["unlock_timestamp"], NOW + 1);
        assert_eq!(json["is_locked"], true);
        assert_eq!(json["time_left"], "1s");

        let native = serde_json::to_value(VaultView::new(&vault(NOW), NOW)).unwrap();
        assert!(native["mint"].is_null());
    }

    #[test]
    fn test_token_view_formats_ui_amount() {
        let holding = TokenHolding {
            account: Pubkey::new_unique(),
            mint: Pubkey::new_unique(),
            amount: 2_500_000,
            decimals: 6,
        };

        let json = serde_json::to_value(TokenView::from(&holding)).unwrap();

        assert_eq!(json["mint"], holding.mint.to_string());
        assert_eq!(json["amount"], "2500000");
        assert_eq!(json["decimals"], 6);
        assert_eq!(json["ui_amount"], "2.5");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_and_stops_on_unlock() {
        let clock = ManualClock::at(NOW);
        let mut handle = spawn_countdown(NOW + 2, clock.clone());
        assert_eq!(handle.current(), "2s");

        clock.advance(1);
        assert_eq!(handle.changed().await.as_deref(), Some("1s"));

        clock.advance(1);
        assert_eq!(handle.changed().await.as_deref(), Some(""));

        assert_eq!(handle.changed().await, None);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_cancels_tick() {
        let clock = ManualClock::at(NOW);
        let handle = spawn_countdown(NOW + 3_600, clock);
        let mut receiver = handle.subscribe();

        drop(handle);

        assert!(receiver.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_unlocked_countdown_spawns_nothing() {
        let clock = ManualClock::at(NOW);
        let mut handle = spawn_countdown(NOW - 10, clock);

        assert!(handle.is_finished());
        assert_eq!(handle.current(), "");
        assert_eq!(handle.changed().await, None);
    }
}

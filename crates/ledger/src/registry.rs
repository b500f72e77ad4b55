//! Account registry: registration, login, admin status and role changes,
//! and the referral network views.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use taskripple_storage::{AccountRecord, AccountStatus, LedgerStorage, Role, StorageError};
use tracing::{debug, info};

use crate::atomic::settle;
use crate::config::MAX_COMMISSION_LEVELS;
use crate::error::{LedgerError, OrMissing};
use crate::ids;

/// Shown in place of a name when an account id does not resolve.
pub const UNKNOWN_USER: &str = "Unknown User";

/// Referral codes drawn before registration gives up on finding a free one.
const REFERRAL_CODE_ATTEMPTS: usize = 16;

/// Input to [`register`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub secret: String,
    /// Referral code of the referring account. An unknown code is ignored.
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// One level of an account's downline.
#[derive(Debug, Clone, Serialize)]
pub struct DownlineLevel {
    /// 1 for direct referrals.
    pub level: u8,
    pub accounts: Vec<AccountRecord>,
}

/// Create a PENDING account with a zero balance and a fresh referral code.
pub async fn register<S: LedgerStorage>(
    storage: &S,
    registration: Registration,
) -> Result<AccountRecord, LedgerError> {
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome = register_in(storage, &mut snapshot, registration).await;
    let account = settle(storage, snapshot, "register", outcome).await?;
    info!(
        account_id = %account.id,
        referrer_id = account.referrer_id.as_deref().unwrap_or("-"),
        "account registered"
    );
    Ok(account)
}

async fn register_in<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
    registration: Registration,
) -> Result<AccountRecord, LedgerError> {
    if storage
        .find_account_by_email(snapshot, &registration.email)
        .await?
        .is_some()
    {
        return Err(LedgerError::DuplicateEmail(registration.email));
    }

    let referrer_id = match registration.referral_code.as_deref() {
        Some(code) if !code.is_empty() => {
            let referrer = storage.find_account_by_referral_code(snapshot, code).await?;
            if referrer.is_none() {
                debug!(code, "ignoring unknown referral code");
            }
            referrer.map(|a| a.id)
        }
        _ => None,
    };

    let referral_code = fresh_referral_code(storage, snapshot).await?;
    let account = AccountRecord {
        id: ids::new_id(),
        full_name: registration.full_name,
        email: registration.email,
        phone: registration.phone,
        secret: registration.secret,
        role: Role::User,
        status: AccountStatus::Pending,
        balance: Decimal::ZERO,
        referrer_id,
        referral_code,
        created_at: ids::now_rfc3339(),
    };
    storage.insert_account(snapshot, account.clone()).await?;
    Ok(account)
}

async fn fresh_referral_code<S: LedgerStorage>(
    storage: &S,
    snapshot: &mut S::Snapshot,
) -> Result<String, LedgerError> {
    for _ in 0..REFERRAL_CODE_ATTEMPTS {
        let code = ids::referral_code();
        if storage
            .find_account_by_referral_code(snapshot, &code)
            .await?
            .is_none()
        {
            return Ok(code);
        }
    }
    Err(StorageError::Conflict("could not allocate a unique referral code".to_string()).into())
}

/// The account whose email and secret both match exactly.
pub async fn authenticate<S: LedgerStorage>(
    storage: &S,
    email: &str,
    secret: &str,
) -> Result<AccountRecord, LedgerError> {
    storage
        .list_accounts()
        .await?
        .into_iter()
        .find(|a| a.email == email && a.secret == secret)
        .ok_or(LedgerError::InvalidCredentials)
}

/// Set an account's status. Returns `None` for an unknown id. Never
/// touches the balance.
pub async fn set_status<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
    status: AccountStatus,
) -> Result<Option<AccountRecord>, LedgerError> {
    update_field(storage, account_id, "set_status", |account| {
        account.status = status;
    })
    .await
}

/// Set an account's role. Returns `None` for an unknown id.
pub async fn set_role<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
    role: Role,
) -> Result<Option<AccountRecord>, LedgerError> {
    update_field(storage, account_id, "set_role", |account| {
        account.role = role;
    })
    .await
}

async fn update_field<S, F>(
    storage: &S,
    account_id: &str,
    operation: &'static str,
    apply: F,
) -> Result<Option<AccountRecord>, LedgerError>
where
    S: LedgerStorage,
    F: FnOnce(&mut AccountRecord) + Send,
{
    let mut snapshot = storage.begin_snapshot().await?;
    let outcome: Result<Option<AccountRecord>, LedgerError> = async {
        let mut account = match storage.get_account_for_update(&mut snapshot, account_id).await {
            Ok(account) => account,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        apply(&mut account);
        storage.update_account(&mut snapshot, account.clone()).await?;
        Ok(Some(account))
    }
    .await;
    let updated = settle(storage, snapshot, operation, outcome).await?;
    match &updated {
        Some(account) => info!(
            operation,
            account_id,
            status = ?account.status,
            role = ?account.role,
            "account updated"
        ),
        None => debug!(operation, account_id, "unknown account, nothing to update"),
    }
    Ok(updated)
}

pub async fn get<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
) -> Result<AccountRecord, LedgerError> {
    storage
        .get_account(account_id)
        .await
        .or_missing(|| LedgerError::AccountNotFound(account_id.to_string()))
}

/// All accounts in registration order.
pub async fn list<S: LedgerStorage>(storage: &S) -> Result<Vec<AccountRecord>, LedgerError> {
    Ok(storage.list_accounts().await?)
}

/// The account's full name, or [`UNKNOWN_USER`] for a dangling id.
pub async fn display_name<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
) -> Result<String, LedgerError> {
    match storage.get_account(account_id).await {
        Ok(account) => Ok(account.full_name),
        Err(e) if e.is_not_found() => Ok(UNKNOWN_USER.to_string()),
        Err(e) => Err(e.into()),
    }
}

/// Accounts whose referrer is `account_id`, in registration order.
pub async fn direct_referrals<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
) -> Result<Vec<AccountRecord>, LedgerError> {
    Ok(storage
        .list_accounts()
        .await?
        .into_iter()
        .filter(|a| a.referrer_id.as_deref() == Some(account_id))
        .collect())
}

/// The accounts below `account_id`, grouped by depth, down to the deepest
/// commission level. Empty levels are omitted.
pub async fn downline<S: LedgerStorage>(
    storage: &S,
    account_id: &str,
) -> Result<Vec<DownlineLevel>, LedgerError> {
    let accounts = storage.list_accounts().await?;
    let mut levels = Vec::new();
    let mut frontier: Vec<String> = vec![account_id.to_string()];

    for level in 1..=MAX_COMMISSION_LEVELS {
        let members: Vec<AccountRecord> = accounts
            .iter()
            .filter(|a| {
                a.referrer_id
                    .as_ref()
                    .is_some_and(|referrer| frontier.contains(referrer))
            })
            .cloned()
            .collect();
        if members.is_empty() {
            break;
        }
        frontier = members.iter().map(|a| a.id.clone()).collect();
        levels.push(DownlineLevel {
            level: level as u8,
            accounts: members,
        });
    }
    Ok(levels)
}

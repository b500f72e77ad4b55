//! Ledger configuration.
//!
//! Every field has a default, so an absent or partial file is valid. The
//! file is TOML:
//!
//! ```toml
//! activation_fee = "25.00"
//! min_withdrawal = "5.00"
//! referral_rates = ["5", "4", "3", "2", "1"]
//!
//! [admin]
//! email = "admin@taskripple.com"
//! secret = "admin123"
//! full_name = "Super Admin"
//! phone = "0000000000"
//! referral_code = "ADMIN001"
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Deepest upline level that can ever receive a commission.
pub const MAX_COMMISSION_LEVELS: usize = 5;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "TASKRIPPLE_CONFIG";

// ── Types ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    /// Amount recorded on every activation deposit.
    pub activation_fee: Decimal,
    /// Smallest withdrawal a caller may request.
    pub min_withdrawal: Decimal,
    /// Commission paid per upline level, level 1 first.
    pub referral_rates: Vec<Decimal>,
    pub admin: AdminSeed,
}

/// `[admin]` section: the administrator created on an empty store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdminSeed {
    pub id: String,
    pub email: String,
    pub secret: String,
    pub full_name: String,
    pub phone: String,
    pub referral_code: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            activation_fee: Decimal::from(25),
            min_withdrawal: Decimal::from(5),
            referral_rates: [5, 4, 3, 2, 1].into_iter().map(Decimal::from).collect(),
            admin: AdminSeed::default(),
        }
    }
}

impl Default for AdminSeed {
    fn default() -> Self {
        Self {
            id: "admin-001".to_string(),
            email: "admin@taskripple.com".to_string(),
            secret: "admin123".to_string(),
            full_name: "Super Admin".to_string(),
            phone: "0000000000".to_string(),
            referral_code: "ADMIN001".to_string(),
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────────

impl LedgerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, LedgerError> {
        let config: LedgerConfig =
            toml::from_str(content).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, LedgerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("could not read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            LedgerError::Config(msg) => {
                LedgerError::Config(format!("'{}': {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Load from `path` if given, else from `$TASKRIPPLE_CONFIG` if set, else
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, LedgerError> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Check amounts and the rate table. All problems are reported at once.
    pub fn validate(&self) -> Result<(), LedgerError> {
        let mut errors: Vec<String> = Vec::new();

        if self.activation_fee <= Decimal::ZERO {
            errors.push(format!(
                "activation_fee must be positive, got {}",
                self.activation_fee
            ));
        }
        if self.min_withdrawal < Decimal::ZERO {
            errors.push(format!(
                "min_withdrawal must not be negative, got {}",
                self.min_withdrawal
            ));
        }
        if self.referral_rates.len() > MAX_COMMISSION_LEVELS {
            errors.push(format!(
                "referral_rates has {} entries, at most {} levels are paid",
                self.referral_rates.len(),
                MAX_COMMISSION_LEVELS
            ));
        }
        for (i, rate) in self.referral_rates.iter().enumerate() {
            if *rate <= Decimal::ZERO {
                errors.push(format!("referral_rates[{}] must be positive, got {}", i, rate));
            }
        }
        if self.admin.email.trim().is_empty() {
            errors.push("admin.email must not be empty".to_string());
        }
        if self.admin.referral_code.trim().is_empty() {
            errors.push("admin.referral_code must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::Config(errors.join("; ")))
        }
    }
}

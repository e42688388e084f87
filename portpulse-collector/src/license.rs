/**
 * LICENCE - Contrôle d'admission du collecteur
 *
 * RÔLE :
 * Décide à chaque tour de boucle combien d'appareils ont le droit d'être
 * interrogés. La licence est un jeton base32 signé (ed25519) rangé dans la
 * note du réglage portant le nom du service; le payload décodé contient
 * "<logiciel>:<nombre d'appareils>" et le nom du client.
 *
 * FONCTIONNEMENT :
 * - clé publique fixe compilée dans le binaire
 * - autorisé seulement si client décodé == réglage "company" ET nom du
 *   logiciel == nom du réglage licence
 * - tout échec (décodage, signature, forme) => non licencié, jamais fatal
 *
 * UTILITÉ :
 * Porte pure : aucune écriture, juste deux lectures de réglages par tour.
 */
use data_encoding::BASE32;
use ed25519_dalek::{Signature, VerifyingKey, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{Store, StoreError};

/// Service identity: the version-stamp setting, the license row and the
/// software name inside the license payload all carry this name.
pub const SERVICE_NAME: &str = "PortPulse Collector";

/// Setting holding the licensed customer name.
pub const CUSTOMER_SETTING: &str = "company";

const PUBLIC_KEY_B32: &str = "4EQ6BGGVMAEAWXJNTJGQSJ6K6EJSDCT7R5MSTUQGP324IUHEBMLA====";

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub authorized: bool,
    /// Hard cap on the active device set. 1 when unlicensed, or when the
    /// licensed count is unparsable.
    pub device_cap: usize,
}

impl Admission {
    pub fn unlicensed() -> Self {
        Self {
            authorized: false,
            device_cap: 1,
        }
    }
}

#[derive(Debug, Error)]
pub enum LicenseError {
    #[error("setting {0:?} is missing")]
    MissingSetting(&'static str),
    #[error("malformed license token: {0}")]
    Encoding(String),
    #[error("compiled-in public key is invalid")]
    BadKey,
    #[error("license signature verification failed")]
    BadSignature,
    #[error("malformed license payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("license payload has no device count")]
    MissingCount,
    #[error("license does not match this installation")]
    Mismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Deserialize)]
struct LicensePayload {
    /// `"<software name>:<device count>"`.
    software: String,
    customer: String,
}

/// Admission check against the compiled-in public key.
pub async fn check(store: &dyn Store) -> Admission {
    match builtin_key() {
        Ok(key) => check_with_key(store, &key).await,
        Err(e) => {
            warn!("license check impossible: {e}");
            Admission::unlicensed()
        }
    }
}

/// Admission check with an explicit verifying key (tests inject their own).
pub async fn check_with_key(store: &dyn Store, key: &VerifyingKey) -> Admission {
    match evaluate(store, key).await {
        Ok(device_cap) => {
            info!("{SERVICE_NAME}: license is valid for {device_cap} devices");
            Admission {
                authorized: true,
                device_cap,
            }
        }
        Err(e) => {
            warn!("license check failed: {e}");
            Admission::unlicensed()
        }
    }
}

async fn evaluate(store: &dyn Store, key: &VerifyingKey) -> Result<usize, LicenseError> {
    let customer = store
        .setting(CUSTOMER_SETTING)
        .await?
        .ok_or(LicenseError::MissingSetting(CUSTOMER_SETTING))?;
    let license_row = store
        .setting(SERVICE_NAME)
        .await?
        .ok_or(LicenseError::MissingSetting(SERVICE_NAME))?;

    let payload = verify_token(&license_row.note, key)?;
    let (software_name, count_text) = payload
        .software
        .split_once(':')
        .ok_or(LicenseError::MissingCount)?;

    if payload.customer != customer.value || software_name != license_row.name {
        return Err(LicenseError::Mismatch);
    }

    // An unparsable count keeps the license valid but caps the fleet at 1.
    Ok(count_text.parse().unwrap_or(1))
}

/// Decodes `base32(payload_json || signature)` and verifies the signature.
fn verify_token(token: &str, key: &VerifyingKey) -> Result<LicensePayload, LicenseError> {
    let raw = BASE32
        .decode(token.trim().as_bytes())
        .map_err(|e| LicenseError::Encoding(e.to_string()))?;
    if raw.len() <= SIGNATURE_LENGTH {
        return Err(LicenseError::Encoding("token too short".into()));
    }
    let (payload, sig_bytes) = raw.split_at(raw.len() - SIGNATURE_LENGTH);
    let signature = Signature::from_slice(sig_bytes).map_err(|_| LicenseError::BadSignature)?;
    key.verify_strict(payload, &signature)
        .map_err(|_| LicenseError::BadSignature)?;
    Ok(serde_json::from_slice(payload)?)
}

fn builtin_key() -> Result<VerifyingKey, LicenseError> {
    let raw = BASE32
        .decode(PUBLIC_KEY_B32.as_bytes())
        .map_err(|_| LicenseError::BadKey)?;
    let bytes: [u8; PUBLIC_KEY_LENGTH] = raw.try_into().map_err(|_| LicenseError::BadKey)?;
    VerifyingKey::from_bytes(&bytes).map_err(|_| LicenseError::BadKey)
}

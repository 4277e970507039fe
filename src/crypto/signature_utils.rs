use k256::ecdsa::{RecoveryId, Signature};

use crate::core::errors::WalletError;

/// Offset Ethereum adds to the recovery id in the trailing `v` byte.
pub const V_OFFSET: u8 = 27;

/// Ensure ECDSA signature uses low-S value (s <= n/2) to avoid malleability.
///
/// Negating `s` mirrors the nonce point, so the recovery id's y-parity is
/// flipped along with it.
pub fn ensure_low_s(sig: Signature, recid: RecoveryId) -> (Signature, RecoveryId) {
    match sig.normalize_s() {
        Some(normalized) => (
            normalized,
            RecoveryId::new(!recid.is_y_odd(), recid.is_x_reduced()),
        ),
        None => (sig, recid),
    }
}

/// Map a trailing `v` byte (0/1 or 27/28) to a recovery id.
pub fn recovery_id_from_v(v: u8) -> Result<RecoveryId, WalletError> {
    let raw = match v {
        0 | 1 => v,
        27 | 28 => v - V_OFFSET,
        other => {
            return Err(WalletError::InvalidSignature(format!(
                "unsupported recovery byte {}",
                other
            )))
        }
    };
    RecoveryId::from_byte(raw)
        .ok_or_else(|| WalletError::InvalidSignature(format!("invalid recovery id {}", raw)))
}

/// Encode a recovery id as the Ethereum `v` byte (27/28).
pub fn v_from_recovery_id(recid: RecoveryId) -> u8 {
    V_OFFSET + u8::from(recid.is_y_odd())
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;

    #[test]
    fn test_ensure_low_s_is_idempotent() {
        let sk = SigningKey::from_slice(&[1u8; 32]).expect("secret key");
        let (sig, recid) = sk.sign_prehash_recoverable(&[2u8; 32]).expect("sign");
        let (normalized, rid) = ensure_low_s(sig, recid);
        assert!(normalized.normalize_s().is_none());
        let (again, rid2) = ensure_low_s(normalized, rid);
        assert_eq!(again, normalized);
        assert_eq!(rid, rid2);
    }

    #[test]
    fn test_recovery_id_from_v() {
        assert!(!recovery_id_from_v(0).unwrap().is_y_odd());
        assert!(recovery_id_from_v(1).unwrap().is_y_odd());
        assert!(!recovery_id_from_v(27).unwrap().is_y_odd());
        assert!(recovery_id_from_v(28).unwrap().is_y_odd());
        assert!(matches!(recovery_id_from_v(29), Err(WalletError::InvalidSignature(_))));
        assert!(matches!(recovery_id_from_v(37), Err(WalletError::InvalidSignature(_))));
    }

    #[test]
    fn test_v_roundtrip() {
        for v in [27u8, 28] {
            assert_eq!(v_from_recovery_id(recovery_id_from_v(v).unwrap()), v);
        }
    }
}

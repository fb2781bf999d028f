use crate::*;
use sharks::{Share, Sharks};
use std::collections::BTreeMap;
use std::convert::TryFrom;
use zeroize::Zeroizing;

/// One custodian's fragment of an election private key.
///
/// The share body is a Shamir share over GF(256) whose first byte is the share's x-coordinate
/// (`index`). The remaining fields let reconstruction refuse shares that belong to another
/// election or another dealing.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyShare {
    pub election_id: String,
    pub index: u8,
    pub threshold: u8,
    pub public_key_fingerprint: String,

    #[serde(with = "hex_bytes")]
    pub share: Vec<u8>,
}

impl std::fmt::Debug for KeyShare {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("KeyShare")
            .field("election_id", &self.election_id)
            .field("index", &self.index)
            .field("threshold", &self.threshold)
            .field("public_key_fingerprint", &self.public_key_fingerprint)
            .finish_non_exhaustive()
    }
}

impl Drop for KeyShare {
    fn drop(&mut self) {
        use zeroize::Zeroize;
        self.share.zeroize();
    }
}

/// Split `secret` into `num_shares` Shamir shares, any `threshold` of which recover it.
pub fn deal_secret_shares(threshold: u8, num_shares: u8, secret: &[u8]) -> Vec<Vec<u8>> {
    let sharks = Sharks(threshold);
    let dealer = sharks.dealer(secret);

    let mut all_shares = Vec::with_capacity(num_shares as usize);
    for s in dealer.take(num_shares as usize) {
        all_shares.push(Vec::from(&s));
    }

    all_shares
}

/// Recover a secret from raw Shamir shares
pub fn recover_secret_shares(
    threshold: u8,
    shares: &[&[u8]],
) -> Result<Zeroizing<Vec<u8>>, Error> {
    let mut parsed = Vec::with_capacity(shares.len());
    for share in shares {
        let share = Share::try_from(*share)
            .map_err(|e| Error::Reconstruction(format!("malformed share: {}", e)))?;
        parsed.push(share);
    }

    let sharks = Sharks(threshold);
    let secret = sharks
        .recover(parsed.iter())
        .map_err(|e| Error::Reconstruction(e.to_string()))?;

    Ok(Zeroizing::new(secret))
}

/// Deal an election private key to custodians
pub(crate) fn split_private_key(
    election_id: &str,
    private_key: &ElectionPrivateKey,
    threshold: u8,
    num_shares: u8,
) -> Result<Vec<KeyShare>, Error> {
    let secret = private_key.to_secret_der()?;
    let shares = deal_secret_shares(threshold, num_shares, &secret)
        .into_iter()
        .map(|share| KeyShare {
            election_id: election_id.to_owned(),
            index: share[0],
            threshold,
            public_key_fingerprint: private_key.fingerprint().to_owned(),
            share,
        })
        .collect();

    Ok(shares)
}

/// Rebuild an election private key from custodian shares.
///
/// Fails closed: too few distinct shares is `InsufficientShares`, anything inconsistent or
/// corrupt is `Reconstruction`.
pub(crate) fn combine_private_key(
    election_id: &str,
    shares: &[KeyShare],
) -> Result<ElectionPrivateKey, Error> {
    if shares.len() < MIN_THRESHOLD as usize {
        return Err(Error::InsufficientShares(
            MIN_THRESHOLD as usize,
            shares.len(),
        ));
    }

    let first = &shares[0];
    let threshold = first.threshold;
    let fingerprint = &first.public_key_fingerprint;

    // Distinct x-coordinates, each seen once
    let mut by_index: BTreeMap<u8, &KeyShare> = BTreeMap::new();
    for share in shares {
        if share.election_id != election_id {
            return Err(Error::Reconstruction(format!(
                "share {} belongs to election {}",
                share.index, share.election_id
            )));
        }
        if share.threshold != threshold || &share.public_key_fingerprint != fingerprint {
            return Err(Error::Reconstruction(format!(
                "share {} comes from a different key dealing",
                share.index
            )));
        }
        if share.share.len() < 2 || share.share[0] != share.index || share.index == 0 {
            return Err(Error::Reconstruction(format!(
                "share {} is malformed",
                share.index
            )));
        }
        if let Some(seen) = by_index.get(&share.index) {
            if seen.share != share.share {
                return Err(Error::Reconstruction(format!(
                    "conflicting shares for index {}",
                    share.index
                )));
            }
        }
        by_index.insert(share.index, share);
    }

    if threshold < MIN_THRESHOLD {
        return Err(Error::Reconstruction(format!(
            "shares were dealt with threshold {}, below the minimum of {}",
            threshold, MIN_THRESHOLD
        )));
    }
    if by_index.len() < threshold as usize {
        return Err(Error::InsufficientShares(threshold as usize, by_index.len()));
    }

    let raw: Vec<&[u8]> = by_index.values().map(|s| s.share.as_slice()).collect();
    let secret = recover_secret_shares(threshold, &raw)?;
    let private_key = ElectionPrivateKey::from_secret_der(&secret)?;

    if private_key.fingerprint() != fingerprint.as_str() {
        return Err(Error::Reconstruction(
            "recovered key does not match the dealt public key".into(),
        ));
    }

    Ok(private_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::fixture;

    #[test]
    fn shamir_recovers_with_any_quorum() {
        let secret = b"election private key material";
        let shares = deal_secret_shares(3, 5, secret);
        assert_eq!(shares.len(), 5);

        let quorum = [&shares[4][..], &shares[1][..], &shares[2][..]];
        let recovered = recover_secret_shares(3, &quorum).unwrap();
        assert_eq!(recovered.as_slice(), &secret[..]);
    }

    #[test]
    fn combine_rejects_foreign_election() {
        let fixture = fixture();
        let mut shares: Vec<KeyShare> = fixture.shares[..3].to_vec();
        shares[1].election_id = "E2".to_owned();

        assert!(matches!(
            combine_private_key("E1", &shares),
            Err(Error::Reconstruction(_))
        ));
    }

    #[test]
    fn duplicate_shares_count_once() {
        let fixture = fixture();
        let shares = vec![
            fixture.shares[0].clone(),
            fixture.shares[0].clone(),
            fixture.shares[1].clone(),
        ];

        assert!(matches!(
            combine_private_key("E1", &shares),
            Err(Error::InsufficientShares(3, 2))
        ));
    }

    #[test]
    fn corrupted_share_fails_closed() {
        let fixture = fixture();
        let mut shares: Vec<KeyShare> = fixture.shares[..3].to_vec();
        let last = shares[2].share.len() - 1;
        shares[2].share[last] ^= 0xff;
        shares[2].share[1] ^= 0x01;

        assert!(matches!(
            combine_private_key("E1", &shares),
            Err(Error::Reconstruction(_))
        ));
    }

    #[test]
    fn lowered_threshold_is_refused() {
        let fixture = fixture();
        let mut shares: Vec<KeyShare> = fixture.shares[..3].to_vec();
        for share in shares.iter_mut() {
            share.threshold = 2;
        }

        assert!(matches!(
            combine_private_key("E1", &shares),
            Err(Error::Reconstruction(_))
        ));
    }

    #[test]
    fn share_debug_hides_body() {
        let share = &fixture().shares[0];
        let debug = format!("{:?}", share);
        assert!(!debug.contains(&hex::encode(&share.share)));
    }
}

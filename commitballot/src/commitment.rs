use crate::*;
use digest::Digest as Hasher;
use rand::{CryptoRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::convert::TryInto;
use std::str::FromStr;

/// Prefix mixed into every commitment so digests from this scheme cannot collide with
/// SHA-256 digests of any other encoding.
pub const COMMITMENT_DOMAIN: &[u8] = b"commitballot/commitment/v1";

/// Length of a commitment digest in bytes
pub const DIGEST_LEN: usize = 32;

/// Number of random bytes in a generated secret
pub const DEFAULT_SECRET_BYTES: usize = 32;

/// Secrets are never generated with less than 128 bits of entropy
pub const MIN_SECRET_BYTES: usize = 16;

/// A commitment to a (choice, secret) pair
///
/// The digest is binding (it cannot be opened to a second choice) and hiding (without the
/// secret it says nothing about the choice).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| Error::DigestBadLen)?;
        Ok(Digest(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl FromStr for Digest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| Error::DigestBadHex)?;
        Digest::from_bytes(&bytes)
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Digest({})", hex::encode(self.0))
    }
}

impl Serialize for Digest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Digest::from_str(&s).map_err(de::Error::custom)
    }
}

/// A voter's blinding value
///
/// The protocol only ever holds a secret for the duration of the reveal that consumes it.
/// Keeping it between the two phases is up to the voter.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(secret: impl Into<String>) -> Self {
        Secret(secret.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Secret {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("Secret(..)")
    }
}

/// Encode (choice, secret) unambiguously
///
/// Layout: `COMMITMENT_DOMAIN || len(choice) || choice || len(secret) || secret`, with each
/// length as a big-endian u64.
pub fn encode_commitment(choice: &str, secret: &str) -> Vec<u8> {
    let mut encoded =
        Vec::with_capacity(COMMITMENT_DOMAIN.len() + 16 + choice.len() + secret.len());
    encoded.extend_from_slice(COMMITMENT_DOMAIN);
    for field in [choice, secret].iter() {
        encoded.extend_from_slice(&(field.len() as u64).to_be_bytes());
        encoded.extend_from_slice(field.as_bytes());
    }
    encoded
}

/// Commit to a choice
pub fn commit(choice: &str, secret: &str) -> Digest {
    let hash = Sha256::digest(&encode_commitment(choice, secret));
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&hash);
    Digest(bytes)
}

/// Check a disclosed (choice, secret) pair against a recorded digest
pub fn verify(digest: &Digest, choice: &str, secret: &str) -> bool {
    commit(choice, secret) == *digest
}

/// Generate a fresh secret from the operating system's entropy source
pub fn generate_secret() -> Secret {
    let mut csprng = rand::rngs::OsRng {};
    generate_secret_with(&mut csprng, DEFAULT_SECRET_BYTES)
}

/// Generate a secret of `num_bytes` random bytes (at least `MIN_SECRET_BYTES`), hex encoded.
pub fn generate_secret_with<R: RngCore + CryptoRng>(rng: &mut R, num_bytes: usize) -> Secret {
    let mut bytes = vec![0u8; num_bytes.max(MIN_SECRET_BYTES)];
    rng.fill_bytes(&mut bytes);
    Secret(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    #[test]
    fn test_commit_verify() {
        let secret = generate_secret();
        let digest = commit("A", secret.as_str());

        assert!(verify(&digest, "A", secret.as_str()));
        assert!(!verify(&digest, "B", secret.as_str()));
        assert!(!verify(&digest, "A", "not the secret"));
        assert!(!verify(&digest, "a", secret.as_str()));
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 over the length-prefixed encoding
        assert_eq!(
            commit("A", "s1").to_string(),
            "b9bb9a3c6de5f102951aac1ea94b4eaaca2b4c0f74d11efef7ea4b9de1f5f324"
        );

        let encoded = encode_commitment("A", "s1");
        assert_eq!(&encoded[..COMMITMENT_DOMAIN.len()], COMMITMENT_DOMAIN);
        assert_eq!(encoded.len(), COMMITMENT_DOMAIN.len() + 8 + 1 + 8 + 2);
    }

    #[test]
    fn test_concatenation_ambiguity() {
        assert_ne!(commit("ab", "c"), commit("a", "bc"));
        assert_ne!(commit("ab", "cd"), commit("a", "bcd"));
        assert_ne!(commit("", "abc"), commit("abc", ""));
        assert_ne!(commit("a", ""), commit("", "a"));

        assert_eq!(
            commit("ab", "c").to_string(),
            "6d6444d6a900f89fc8ad15e60cf2091e6718d541296d48222eda9e1201dbe66d"
        );
        assert_eq!(
            commit("a", "bc").to_string(),
            "ad39fabd959e44cb8c00515dd51eb5e5940a5d1d2fdcf3c64bb09f5a3571bcc7"
        );
    }

    #[test]
    fn test_distinct_pairs_distinct_digests() {
        let mut rng = rand::thread_rng();
        let mut seen = HashSet::new();
        let mut digests = HashSet::new();

        for _ in 0..2000 {
            let choice_len = rng.gen_range(0, 6);
            let secret_len = rng.gen_range(0, 6);
            let choice: String = (0..choice_len)
                .map(|_| rng.gen_range(b'a', b'd') as char)
                .collect();
            let secret: String = (0..secret_len)
                .map(|_| rng.gen_range(b'a', b'd') as char)
                .collect();

            // Every split point of the same concatenation
            let joined = format!("{}{}", choice, secret);
            for split in 0..=joined.len() {
                let pair = (joined[..split].to_string(), joined[split..].to_string());
                if seen.insert(pair.clone()) {
                    assert!(digests.insert(commit(&pair.0, &pair.1)));
                }
            }
        }
        assert_eq!(seen.len(), digests.len());
    }

    #[test]
    fn test_generate_secret() {
        let secret = generate_secret();
        assert_eq!(secret.as_str().len(), DEFAULT_SECRET_BYTES * 2);
        assert!(hex::decode(secret.as_str()).is_ok());
        assert_ne!(generate_secret(), secret);

        // Never below 128 bits
        let mut rng = rand::thread_rng();
        let short = generate_secret_with(&mut rng, 4);
        assert_eq!(short.as_str().len(), MIN_SECRET_BYTES * 2);

        assert_eq!(format!("{:?}", secret), "Secret(..)");
    }

    #[test]
    fn test_digest_parse() {
        let digest = commit("yes", "salt");
        let parsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);

        assert!(matches!("zz".parse::<Digest>(), Err(Error::DigestBadHex)));
        assert!(matches!("abcd".parse::<Digest>(), Err(Error::DigestBadLen)));

        let json = serde_json::to_string(&digest).unwrap();
        assert_eq!(json, format!("\"{}\"", digest));
        let back: Digest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, digest);
    }
}
